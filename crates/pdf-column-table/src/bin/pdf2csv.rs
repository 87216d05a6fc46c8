use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use pdf_column_table::{
    ExtractOptions, ExtractionReport, LayoutParams, PageSelection, QualityMode,
    extract_pdf_to_csv, split_pdf_pages,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "pdf2csv",
    version,
    about = "Rebuild column tables from positioned PDF text and write them as CSV"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Extract one table per page and write all rows to a CSV file.
    Extract(ExtractArgs),
    /// Split a document into single-page PDFs.
    Split(SplitArgs),
}

#[derive(Debug, Args)]
struct ExtractArgs {
    /// Input PDF path.
    #[arg(short, long)]
    input: PathBuf,

    /// Output CSV path. Defaults to the input path with a .csv extension.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Page selection like 3-5,8.
    #[arg(long)]
    pages: Option<String>,

    /// Output delimiter character.
    #[arg(long, default_value = ",")]
    delimiter: char,

    /// How to treat pages with fragments spanning several columns:
    /// best-effort, strict or skip-ambiguous.
    #[arg(long, default_value = "best-effort")]
    quality: String,

    /// Maximum horizontal gap between glyphs of one line, relative to glyph width.
    #[arg(long, default_value_t = 1.0)]
    char_margin: f64,

    /// Maximum vertical gap between lines of one text box, relative to line height.
    #[arg(long, default_value_t = 0.5)]
    line_margin: f64,

    /// Gap that inserts a word space, relative to glyph size.
    #[arg(long, default_value_t = 0.1)]
    word_margin: f64,

    /// Enable verbose warning output.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Args)]
struct SplitArgs {
    /// Input PDF path.
    #[arg(short, long)]
    input: PathBuf,

    /// Directory that receives page-<n>.pdf files.
    #[arg(short, long)]
    output_dir: PathBuf,

    /// Number of leading pages to leave out.
    #[arg(long, default_value_t = 2)]
    skip: u32,
}

fn parse_options(args: &ExtractArgs) -> Result<ExtractOptions> {
    let pages = args
        .pages
        .as_deref()
        .map(PageSelection::from_str)
        .transpose()
        .map_err(|error| anyhow!("invalid page selection: {error}"))
        .context("failed to parse --pages")?;

    let quality_mode = QualityMode::from_str(&args.quality)
        .map_err(|error| anyhow!(error))
        .context("failed to parse --quality")?;

    if !args.delimiter.is_ascii() {
        anyhow::bail!("delimiter must be a single ASCII character");
    }

    Ok(ExtractOptions {
        pages,
        delimiter: args.delimiter as u8,
        quality_mode,
        layout: LayoutParams {
            char_margin: args.char_margin,
            line_margin: args.line_margin,
            word_margin: args.word_margin,
            ..LayoutParams::default()
        },
    })
}

fn log_report(report: &ExtractionReport, verbose: bool) {
    if report.warnings.is_empty() {
        return;
    }

    eprintln!("warning: {} issue(s) detected", report.warnings.len());
    if verbose {
        for warning in &report.warnings {
            eprintln!(
                "  - {:?} page={:?} count={:?}: {}",
                warning.code, warning.page, warning.count, warning.message
            );
        }
    }
}

fn run_extract(args: &ExtractArgs) -> Result<ExtractionReport> {
    let options = parse_options(args)?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| pdf_column_table::csv_path_for_page(&args.input));
    extract_pdf_to_csv(&args.input, &output, &options)
        .with_context(|| format!("failed to extract tables from '{}'", args.input.display()))
}

fn run_split(args: &SplitArgs) -> Result<usize> {
    let pages = split_pdf_pages(&args.input, &args.output_dir, args.skip)
        .with_context(|| format!("failed to split '{}'", args.input.display()))?;
    Ok(pages.len())
}

fn main() -> ExitCode {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("pdf_column_table=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Extract(args) => match run_extract(&args) {
            Ok(report) => {
                log_report(&report, args.verbose);
                if report.row_count > 0 {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::from(2)
                }
            }
            Err(error) => {
                eprintln!("error: {error:#}");
                ExitCode::from(1)
            }
        },
        Commands::Split(args) => match run_split(&args) {
            Ok(0) => ExitCode::from(2),
            Ok(_) => ExitCode::SUCCESS,
            Err(error) => {
                eprintln!("error: {error:#}");
                ExitCode::from(1)
            }
        },
    }
}

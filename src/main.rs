use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use clap::{Args, Parser, Subcommand};
use idsp_pipeline::models::EXECUTION_DATE_FORMAT;
use idsp_pipeline::scheduler::RunLock;
use idsp_pipeline::{
    DocumentFailurePolicy, PipelineConfig, RunContext, csv_pipeline, dataset, discovery,
    http_client, run_forever, run_once,
};
use pdf_column_table::QualityMode;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "idsp-pipeline",
    version,
    about = "Download weekly IDSP outbreak reports and turn their tables into a CSV dataset"
)]
struct Cli {
    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Discover, extract and aggregate once.
    Run,
    /// Run every Tuesday at 00:00 UTC until interrupted.
    Schedule,
    /// Download reports newer than the ledger's last week.
    Discover,
    /// Split and extract the reports of one run directory.
    Extract,
    /// Append one run's page records to the dataset.
    Aggregate,
}

#[derive(Debug, Args)]
struct Settings {
    /// Directory holding the ledger, the dataset and one directory per run.
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// Page listing the weekly reports.
    #[arg(long, global = true)]
    source_url: Option<String>,

    /// Execution date naming the run directory, like 2017-04-18T00:00:00.
    /// Defaults to now.
    #[arg(long, global = true)]
    execution_date: Option<String>,

    /// What to do when one report fails: skip or abort.
    #[arg(long, global = true, default_value = "skip")]
    failure_policy: String,

    /// How to treat pages with fragments spanning several columns:
    /// best-effort, strict or skip-ambiguous.
    #[arg(long, global = true, default_value = "best-effort")]
    quality: String,

    /// Leading pages of each report left out of extraction.
    #[arg(long, global = true)]
    skip_pages: Option<u32>,
}

fn build_config(settings: &Settings) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::from_env();
    if let Some(base_dir) = &settings.base_dir {
        config.base_dir.clone_from(base_dir);
    }
    if let Some(source_url) = &settings.source_url {
        config.source_url.clone_from(source_url);
    }
    if let Some(skip_pages) = settings.skip_pages {
        config.front_matter_pages = skip_pages;
    }
    config.failure_policy = DocumentFailurePolicy::from_str(&settings.failure_policy)
        .context("failed to parse --failure-policy")?;
    config.extract.quality_mode = QualityMode::from_str(&settings.quality)
        .map_err(|error| anyhow!(error))
        .context("failed to parse --quality")?;

    config.validate().context("invalid pipeline configuration")?;
    Ok(config)
}

fn parse_execution_date(value: Option<&str>) -> Result<DateTime<Utc>> {
    let Some(value) = value else {
        return Ok(Utc::now().trunc_subsecs(0));
    };

    if let Ok(date) = DateTime::parse_from_rfc3339(value) {
        return Ok(date.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, EXECUTION_DATE_FORMAT)
        .map(|date| date.and_utc())
        .with_context(|| format!("invalid execution date '{value}'"))
}

/// Single stages share the lock of full runs on the same base directory.
fn acquire_lock(ctx: &RunContext) -> Result<RunLock> {
    let path = ctx.config.lock_path();
    RunLock::acquire(&path)
        .with_context(|| format!("failed to lock '{}'", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli.settings)?;
    let execution_date = parse_execution_date(cli.settings.execution_date.as_deref())?;
    let ctx = RunContext::new(config, execution_date);

    match cli.command {
        Commands::Run => {
            let client = http_client()?;
            let outcome = run_once(&ctx, &client).await.context("run failed")?;
            println!(
                "Downloaded {} report(s), extracted {} document(s) ({} failed), appended {} page file(s)",
                outcome.discovery.downloaded.len(),
                outcome.summary.documents.len(),
                outcome.summary.failed_documents(),
                outcome.aggregate.files
            );
        }
        Commands::Schedule => {
            let client = http_client()?;
            info!(base_dir = %ctx.base_dir().display(), "starting weekly schedule");
            run_forever(ctx.config, client)
                .await
                .context("scheduler stopped")?;
        }
        Commands::Discover => {
            let _lock = acquire_lock(&ctx)?;
            let client = http_client()?;
            let report = discovery::discover_new_reports(&ctx, &client)
                .await
                .context("discovery failed")?;
            println!(
                "Found {} report(s), downloaded {}",
                report.found,
                report.downloaded.len()
            );
            if let Some(failure) = report.failed {
                eprintln!("warning: discovery stopped early: {failure}");
            }
        }
        Commands::Extract => {
            let _lock = acquire_lock(&ctx)?;
            let summary = csv_pipeline::extract_run(&ctx)
                .await
                .context("extraction failed")?;
            println!(
                "Extracted {} document(s) ({} failed), {} row(s)",
                summary.documents.len(),
                summary.failed_documents(),
                summary.row_count()
            );
        }
        Commands::Aggregate => {
            let _lock = acquire_lock(&ctx)?;
            let report = dataset::aggregate_run(&ctx).context("aggregation failed")?;
            println!(
                "Appended {} page file(s) to '{}'",
                report.files,
                ctx.config.dataset_path().display()
            );
        }
    }

    Ok(())
}

use std::fs;
use std::path::{Path, PathBuf};

use pdf_column_table::{
    ExtractOptions, csv_path_for_page, extract_pages, split_pdf_pages, write_tables_to_bytes,
};
use tracing::{error, info, warn};

use crate::config::{DocumentFailurePolicy, RunContext};
use crate::error::PipelineError;
use crate::models::{DocumentSummary, PageSummary, RunSummary};

/// Page tables of one document, rendered but not yet written.
struct RenderedDocument {
    pages: Vec<PageSummary>,
    records: Vec<(PathBuf, Vec<u8>)>,
}

/// Splits and extracts every report in the run directory off the async
/// runtime.
pub async fn extract_run(ctx: &RunContext) -> Result<RunSummary, PipelineError> {
    let ctx = ctx.clone();
    tokio::task::spawn_blocking(move || extract_run_blocking(&ctx)).await?
}

pub fn extract_run_blocking(ctx: &RunContext) -> Result<RunSummary, PipelineError> {
    let run_dir = ctx.run_dir();
    fs::create_dir_all(&run_dir)?;

    let mut summary = RunSummary {
        execution_date: ctx.execution_label(),
        documents: Vec::new(),
    };

    for pdf in list_documents(&run_dir)? {
        let document = document_name(&pdf);
        info!(document, "extracting report");

        match render_document(ctx, &pdf).and_then(|rendered| {
            write_records(&rendered.records)?;
            Ok(rendered)
        }) {
            Ok(rendered) => {
                info!(
                    document,
                    pages = rendered.pages.len(),
                    records = rendered.records.len(),
                    "report extracted"
                );
                summary.documents.push(DocumentSummary {
                    document,
                    pages: rendered.pages,
                    error: None,
                    error_code: None,
                });
            }
            Err(document_error) => {
                if ctx.config.failure_policy == DocumentFailurePolicy::AbortRun {
                    error!(document, code = document_error.code(), "{document_error}");
                    return Err(document_error);
                }
                warn!(
                    document,
                    code = document_error.code(),
                    "skipping report: {document_error}"
                );
                summary.documents.push(DocumentSummary {
                    document,
                    pages: Vec::new(),
                    error: Some(document_error.to_string()),
                    error_code: Some(document_error.code().to_string()),
                });
            }
        }
    }

    write_summary(&ctx.summary_path(), &summary)?;
    Ok(summary)
}

/// Reports directly inside `run_dir`, by file name.
pub fn list_documents(run_dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let mut documents = Vec::new();
    for entry in fs::read_dir(run_dir)? {
        let path = entry?.path();
        let is_pdf = path
            .extension()
            .is_some_and(|extension| extension.eq_ignore_ascii_case("pdf"));
        if is_pdf && path.is_file() {
            documents.push(path);
        }
    }
    documents.sort();
    Ok(documents)
}

fn render_document(ctx: &RunContext, pdf: &Path) -> Result<RenderedDocument, PipelineError> {
    let page_dir = ctx.run_dir().join(document_name(pdf));
    let split = split_pdf_pages(pdf, &page_dir, ctx.config.front_matter_pages)
        .map_err(|source| PipelineError::extract(pdf, source))?;

    // Split files hold exactly one page each.
    let options = ExtractOptions {
        pages: None,
        ..ctx.config.extract.clone()
    };

    let mut rendered = RenderedDocument {
        pages: Vec::with_capacity(split.len()),
        records: Vec::new(),
    };

    for page in split {
        let (extractions, mut warnings) = extract_pages(&page.path, &options)
            .map_err(|source| PipelineError::extract(&page.path, source))?;
        for warning in &mut warnings {
            // Numbered within the split file; report the source page instead.
            warning.page = Some(page.page_number);
            warn!(
                page = page.page_number,
                code = ?warning.code,
                count = warning.count,
                "{}",
                warning.message
            );
        }

        let rows = extractions
            .iter()
            .map(|extraction| extraction.table.row_count())
            .sum::<usize>();
        let columns = extractions
            .iter()
            .map(|extraction| extraction.table.column_count)
            .max()
            .unwrap_or_default();
        let dropped_fragments = extractions
            .iter()
            .map(|extraction| extraction.dropped.len())
            .sum::<usize>();

        if rows > 0 {
            let bytes = write_tables_to_bytes(
                extractions.iter().map(|extraction| &extraction.table),
                options.delimiter,
            )
            .map_err(|source| PipelineError::extract(&page.path, source))?;
            rendered.records.push((csv_path_for_page(&page.path), bytes));
        }

        rendered.pages.push(PageSummary {
            page: page.page_number,
            rows,
            columns,
            dropped_fragments,
            warnings,
        });
    }

    Ok(rendered)
}

/// Writes every record file of one document, or none of them.
fn write_records(records: &[(PathBuf, Vec<u8>)]) -> Result<(), PipelineError> {
    for (index, (path, bytes)) in records.iter().enumerate() {
        if let Err(write_error) = fs::write(path, bytes) {
            for (written, _) in &records[..index] {
                if let Err(remove_error) = fs::remove_file(written) {
                    warn!(path = %written.display(), "failed to remove record file: {remove_error}");
                }
            }
            return Err(PipelineError::Io(write_error));
        }
    }
    Ok(())
}

fn document_name(pdf: &Path) -> String {
    pdf.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn write_summary(path: &Path, summary: &RunSummary) -> Result<(), PipelineError> {
    let json = serde_json::to_vec_pretty(summary)?;
    fs::write(path, json)?;
    Ok(())
}

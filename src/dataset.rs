use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::RunContext;
use crate::error::PipelineError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateReport {
    pub files: usize,
    pub bytes: usize,
}

/// Appends this run's page records to the shared dataset file.
pub fn aggregate_run(ctx: &RunContext) -> Result<AggregateReport, PipelineError> {
    let files = page_records(&ctx.run_dir())?;
    append_records(&ctx.config.dataset_path(), &files)
}

/// Page record files under `run_dir`, ordered by document directory and
/// then by page number.
pub fn page_records(run_dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    if !run_dir.exists() {
        return Ok(Vec::new());
    }

    let mut records: Vec<(PathBuf, u32, PathBuf)> = Vec::new();

    for entry in fs::read_dir(run_dir)? {
        let document_dir = entry?.path();
        if !document_dir.is_dir() {
            continue;
        }
        for page_entry in fs::read_dir(&document_dir)? {
            let path = page_entry?.path();
            if let Some(page) = page_number(&path) {
                records.push((document_dir.clone(), page, path));
            }
        }
    }

    records.sort_by(|left, right| left.0.cmp(&right.0).then(left.1.cmp(&right.1)));
    Ok(records.into_iter().map(|(_, _, path)| path).collect())
}

pub fn append_records(dataset: &Path, files: &[PathBuf]) -> Result<AggregateReport, PipelineError> {
    if let Some(parent) = dataset.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut report = AggregateReport::default();
    if files.is_empty() {
        return Ok(report);
    }

    let mut output = OpenOptions::new().create(true).append(true).open(dataset)?;
    for file in files {
        let mut bytes = fs::read(file)?;
        if bytes.is_empty() {
            continue;
        }
        if bytes.last() != Some(&b'\n') {
            bytes.push(b'\n');
        }
        output.write_all(&bytes)?;
        report.files += 1;
        report.bytes += bytes.len();
    }
    output.flush()?;

    info!(
        dataset = %dataset.display(),
        files = report.files,
        bytes = report.bytes,
        "appended page records"
    );
    Ok(report)
}

/// `7` for `page-7.csv`; `None` for anything else.
fn page_number(path: &Path) -> Option<u32> {
    let is_csv = path
        .extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("csv"));
    if !is_csv {
        return None;
    }
    path.file_stem()?
        .to_str()?
        .strip_prefix("page-")?
        .parse()
        .ok()
}

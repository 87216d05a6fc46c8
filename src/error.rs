use std::path::PathBuf;

use pdf_column_table::ExtractError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ledger error: {0}")]
    Ledger(#[from] csv::Error),

    #[error("extraction failed for '{path}': {source}")]
    Extract {
        path: PathBuf,
        #[source]
        source: ExtractError,
    },

    #[error("another run holds the lock at '{0}'")]
    RunInProgress(PathBuf),

    #[error("background task failed: {0}")]
    Task(String),
}

impl PipelineError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Upstream(_) => "upstream_error",
            Self::Parse(_) => "parse_error",
            Self::Config(_) => "config_error",
            Self::Io(_) => "io_error",
            Self::Ledger(_) => "ledger_error",
            Self::Extract {
                source: ExtractError::ExtractionForbidden,
                ..
            } => "extraction_forbidden",
            Self::Extract { .. } => "extract_error",
            Self::RunInProgress(_) => "run_in_progress",
            Self::Task(_) => "task_error",
        }
    }

    pub(crate) fn extract(path: impl Into<PathBuf>, source: ExtractError) -> Self {
        Self::Extract {
            path: path.into(),
            source,
        }
    }
}

impl From<reqwest::Error> for PipelineError {
    fn from(error: reqwest::Error) -> Self {
        Self::Upstream(error.to_string())
    }
}

impl From<url::ParseError> for PipelineError {
    fn from(error: url::ParseError) -> Self {
        Self::Parse(error.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(error: serde_json::Error) -> Self {
        Self::Parse(error.to_string())
    }
}

impl From<tokio::task::JoinError> for PipelineError {
    fn from(error: tokio::task::JoinError) -> Self {
        Self::Task(error.to_string())
    }
}

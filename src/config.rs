use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use pdf_column_table::ExtractOptions;

use crate::error::PipelineError;
use crate::models::{
    DATASET_FILE_NAME, DEFAULT_BASE_DIR, DEFAULT_FALLBACK_LAST_WEEK, DEFAULT_FRONT_MATTER_PAGES,
    DEFAULT_SOURCE_URL, EXECUTION_DATE_FORMAT, LEDGER_FILE_NAME, RUN_LOCK_FILE_NAME,
    SUMMARY_FILE_NAME,
};

pub const BASE_DIR_ENV: &str = "IDSP_BASE_DIR";
pub const SOURCE_URL_ENV: &str = "IDSP_SOURCE_URL";

/// What the extract stage does when one document fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentFailurePolicy {
    #[default]
    SkipDocument,
    AbortRun,
}

impl FromStr for DocumentFailurePolicy {
    type Err = PipelineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "skip" | "skip-document" => Ok(Self::SkipDocument),
            "abort" | "abort-run" => Ok(Self::AbortRun),
            other => Err(PipelineError::Config(format!(
                "unknown failure policy '{other}', expected skip or abort"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub base_dir: PathBuf,
    pub source_url: String,
    pub front_matter_pages: u32,
    pub fallback_last_week: u32,
    pub failure_policy: DocumentFailurePolicy,
    pub extract: ExtractOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from(DEFAULT_BASE_DIR),
            source_url: DEFAULT_SOURCE_URL.to_string(),
            front_matter_pages: DEFAULT_FRONT_MATTER_PAGES,
            fallback_last_week: DEFAULT_FALLBACK_LAST_WEEK,
            failure_policy: DocumentFailurePolicy::default(),
            extract: ExtractOptions::default(),
        }
    }
}

impl PipelineConfig {
    /// Defaults overridden by `IDSP_BASE_DIR` and `IDSP_SOURCE_URL`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            base_dir: lookup(BASE_DIR_ENV)
                .filter(|value| !value.trim().is_empty())
                .map_or(defaults.base_dir, PathBuf::from),
            source_url: lookup(SOURCE_URL_ENV)
                .filter(|value| !value.trim().is_empty())
                .unwrap_or(defaults.source_url),
            ..defaults
        }
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        url::Url::parse(&self.source_url)?;
        if self.base_dir.as_os_str().is_empty() {
            return Err(PipelineError::Config(
                "base directory must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.base_dir.join(LEDGER_FILE_NAME)
    }

    pub fn dataset_path(&self) -> PathBuf {
        self.base_dir.join(DATASET_FILE_NAME)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.base_dir.join(RUN_LOCK_FILE_NAME)
    }
}

/// Everything one run needs; handed to each stage explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct RunContext {
    pub config: PipelineConfig,
    pub execution_date: DateTime<Utc>,
}

impl RunContext {
    pub fn new(config: PipelineConfig, execution_date: DateTime<Utc>) -> Self {
        Self {
            config,
            execution_date,
        }
    }

    pub fn execution_label(&self) -> String {
        self.execution_date.format(EXECUTION_DATE_FORMAT).to_string()
    }

    pub fn run_dir(&self) -> PathBuf {
        self.config.base_dir.join(self.execution_label())
    }

    pub fn summary_path(&self) -> PathBuf {
        self.run_dir().join(SUMMARY_FILE_NAME)
    }

    pub fn base_dir(&self) -> &Path {
        &self.config.base_dir
    }
}

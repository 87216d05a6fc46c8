pub mod config;
pub mod csv_pipeline;
pub mod dataset;
pub mod discovery;
pub mod error;
pub mod ledger;
pub mod models;
pub mod scheduler;
pub mod source_scraper;

pub use config::{DocumentFailurePolicy, PipelineConfig, RunContext};
pub use error::PipelineError;
pub use scheduler::{RunOutcome, next_run_after, run_forever, run_once};

/// HTTP client shared by discovery and downloads.
pub fn http_client() -> Result<reqwest::Client, PipelineError> {
    reqwest::Client::builder()
        .user_agent(concat!("idsp-pipeline/", env!("CARGO_PKG_VERSION")))
        .timeout(std::time::Duration::from_secs(120))
        .build()
        .map_err(PipelineError::from)
}

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc, Weekday};
use sysinfo::{Pid, System};
use tracing::{error, info, warn};

use crate::config::{PipelineConfig, RunContext};
use crate::csv_pipeline;
use crate::dataset::{self, AggregateReport};
use crate::discovery;
use crate::error::PipelineError;
use crate::models::{DiscoveryReport, RunSummary};

/// Reports are published weekly; runs start Tuesday at midnight UTC.
pub const RUN_WEEKDAY: Weekday = Weekday::Tue;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub discovery: DiscoveryReport,
    pub summary: RunSummary,
    pub aggregate: AggregateReport,
}

/// First scheduled start strictly after `now`.
pub fn next_run_after(now: DateTime<Utc>) -> DateTime<Utc> {
    let today = now.date_naive();
    let days_ahead =
        (7 + RUN_WEEKDAY.num_days_from_monday() - today.weekday().num_days_from_monday()) % 7;
    let candidate = (today + Duration::days(i64::from(days_ahead)))
        .and_time(NaiveTime::MIN)
        .and_utc();

    if candidate <= now {
        candidate + Duration::weeks(1)
    } else {
        candidate
    }
}

/// Marker file held for the length of one run. Removed on drop.
///
/// The file holds the owner's pid. A lock whose owner is no longer running
/// is taken over.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    pub fn acquire(path: &Path) -> Result<Self, PipelineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        match create_lock_file(path) {
            Ok(()) => {}
            Err(PipelineError::RunInProgress(_)) if holder_is_gone(path) => {
                warn!(path = %path.display(), "taking over stale run lock");
                match fs::remove_file(path) {
                    Ok(()) => {}
                    Err(error) if error.kind() == ErrorKind::NotFound => {}
                    Err(error) => return Err(error.into()),
                }
                create_lock_file(path)?;
            }
            Err(error) => return Err(error),
        }

        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

/// Links a fully written pid file into place so the lock never exists
/// without its owner.
fn create_lock_file(path: &Path) -> Result<(), PipelineError> {
    let pid = std::process::id();
    let mut staging = path.as_os_str().to_owned();
    staging.push(format!(".{pid}"));
    let staging = PathBuf::from(staging);

    fs::write(&staging, pid.to_string())?;
    let linked = fs::hard_link(&staging, path);
    if let Err(error) = fs::remove_file(&staging) {
        warn!(path = %staging.display(), "failed to remove staging lock: {error}");
    }

    match linked {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == ErrorKind::AlreadyExists => {
            Err(PipelineError::RunInProgress(path.to_path_buf()))
        }
        Err(error) => Err(error.into()),
    }
}

fn holder_is_gone(path: &Path) -> bool {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(error) => return error.kind() == ErrorKind::NotFound,
    };
    let Ok(pid) = contents.trim().parse::<u32>() else {
        return true;
    };
    if pid == std::process::id() {
        return false;
    }

    let mut system = System::new();
    !system.refresh_process(Pid::from_u32(pid))
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(error) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), "failed to release run lock: {error}");
        }
    }
}

/// Discovery, extraction and aggregation for one execution date.
///
/// Reports downloaded before a failed download are still extracted; their
/// weeks are already in the ledger and would otherwise never be processed.
pub async fn run_once(
    ctx: &RunContext,
    client: &reqwest::Client,
) -> Result<RunOutcome, PipelineError> {
    let _lock = RunLock::acquire(&ctx.config.lock_path())?;
    let execution = ctx.execution_label();
    info!(execution, run_dir = %ctx.run_dir().display(), "run started");

    let discovery = discovery::discover_new_reports(ctx, client).await?;
    if let Some(failure) = &discovery.failed {
        warn!(execution, "discovery stopped early: {failure}");
    }

    let summary = csv_pipeline::extract_run(ctx).await?;

    let aggregate_ctx = ctx.clone();
    let aggregate =
        tokio::task::spawn_blocking(move || dataset::aggregate_run(&aggregate_ctx)).await??;

    info!(
        execution,
        downloaded = discovery.downloaded.len(),
        documents = summary.documents.len(),
        failed_documents = summary.failed_documents(),
        rows = summary.row_count(),
        "run finished"
    );

    Ok(RunOutcome {
        discovery,
        summary,
        aggregate,
    })
}

/// Sleeps until each weekly start and runs the pipeline, until interrupted.
/// A failed run is logged and the next one is still scheduled.
pub async fn run_forever(
    config: PipelineConfig,
    client: reqwest::Client,
) -> Result<(), PipelineError> {
    loop {
        let now = Utc::now();
        let next = next_run_after(now);
        let wait = (next - now).to_std().unwrap_or_default();
        info!(next = %next, "waiting for next scheduled run");

        tokio::select! {
            () = tokio::time::sleep(wait) => {}
            signal = tokio::signal::ctrl_c() => {
                signal?;
                info!("shutdown requested");
                return Ok(());
            }
        }

        let ctx = RunContext::new(config.clone(), next);
        if let Err(run_error) = run_once(&ctx, &client).await {
            error!(
                execution = ctx.execution_label(),
                code = run_error.code(),
                "scheduled run failed: {run_error}"
            );
        }
    }
}

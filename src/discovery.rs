use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::{error, info};
use url::Url;

use crate::config::RunContext;
use crate::error::PipelineError;
use crate::ledger::Ledger;
use crate::models::{DiscoveryReport, WeekLink};
use crate::source_scraper;

/// Lists reports on the source page and downloads those newer than the
/// ledger's last week into the run directory.
///
/// A week is appended to the ledger only after its file is complete on
/// disk. The first failed download ends discovery so later weeks are not
/// recorded ahead of it.
pub async fn discover_new_reports(
    ctx: &RunContext,
    client: &reqwest::Client,
) -> Result<DiscoveryReport, PipelineError> {
    let run_dir = ctx.run_dir();
    tokio::fs::create_dir_all(&run_dir).await?;

    let links = source_scraper::fetch_week_links(client, &ctx.config.source_url).await?;
    let ledger = Ledger::new(ctx.config.ledger_path());
    let last_week = ledger.last_week(ctx.config.fallback_last_week)?;
    let pending = source_scraper::weeks_after(&links, last_week);
    info!(
        found = links.len(),
        new = pending.len(),
        last_week,
        "listed weekly reports"
    );

    let mut report = DiscoveryReport {
        found: links.len(),
        ..DiscoveryReport::default()
    };

    for link in pending {
        info!(week = link.week, url = %link.url, "downloading report");
        match download_report(client, &link, &run_dir).await {
            Ok(path) => {
                ledger.append(&link)?;
                info!(week = link.week, path = %path.display(), "report downloaded");
                report.downloaded.push(link);
            }
            Err(download_error) => {
                error!(week = link.week, url = %link.url, "download failed: {download_error}");
                report.failed = Some(format!("week {}: {download_error}", link.week));
                break;
            }
        }
    }

    Ok(report)
}

pub async fn download_report(
    client: &reqwest::Client,
    link: &WeekLink,
    dir: &Path,
) -> Result<PathBuf, PipelineError> {
    let file_name = source_scraper::file_name_for(link)?;
    let target = dir.join(&file_name);
    let staging = dir.join(format!("{file_name}.part"));

    let mut response = client.get(Url::parse(&link.url)?).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(PipelineError::Upstream(format!(
            "failed to fetch report: status {status}"
        )));
    }

    let mut file = tokio::fs::File::create(&staging).await?;
    let mut written = 0_usize;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len();
    }
    file.flush().await?;
    drop(file);

    if written == 0 {
        tokio::fs::remove_file(&staging).await?;
        return Err(PipelineError::Upstream("fetched report is empty".to_string()));
    }

    tokio::fs::rename(&staging, &target).await?;
    Ok(target)
}

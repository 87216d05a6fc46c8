use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::error::PipelineError;
use crate::models::WeekLink;

/// Element that wraps the weekly report listing on the source page.
const CONTENT_MARKER: &str = "id=\"cmscontent\"";

static ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)<a[^>]*href\s*=\s*["'](?P<href>[^"'#>]+\.pdf(?:\?[^"'#>]*)?)["'][^>]*>(?P<text>.*?)</a>"#,
    )
    .expect("hardcoded anchor regex is valid")
});
static WEEK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("hardcoded week regex is valid"));
static TAGS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<[^>]+>").expect("hardcoded HTML tags regex is valid"));

pub async fn fetch_week_links(
    client: &reqwest::Client,
    source_url: &str,
) -> Result<Vec<WeekLink>, PipelineError> {
    let source = Url::parse(source_url)?;
    let response = client.get(source).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(PipelineError::Upstream(format!(
            "failed to fetch source page: status {status}"
        )));
    }

    let html = response.text().await?;
    extract_week_links(&html, source_url)
}

/// Links to weekly PDF reports, in page order, first occurrence of each week.
pub fn extract_week_links(html: &str, source_url: &str) -> Result<Vec<WeekLink>, PipelineError> {
    let base_url = Url::parse(source_url)?;
    let listing = html.find(CONTENT_MARKER).map_or(html, |start| &html[start..]);
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for capture in ANCHOR_RE.captures_iter(listing) {
        let Some(href_match) = capture.name("href") else {
            continue;
        };
        let href = href_match.as_str().trim();
        let Ok(joined_url) = base_url.join(href) else {
            continue;
        };

        let raw_text = capture
            .name("text")
            .map(|value| value.as_str())
            .unwrap_or_default();
        let clean_text = strip_html_tags(raw_text);

        let Some(week) = extract_week(&clean_text).or_else(|| {
            joined_url
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .and_then(extract_week)
        }) else {
            tracing::debug!(href, "skipping report link without a week number");
            continue;
        };

        if seen.insert(week) {
            links.push(WeekLink {
                week,
                url: joined_url.to_string(),
            });
        }
    }

    Ok(links)
}

/// First run of digits in `input`, percent-decoded first.
pub fn extract_week(input: &str) -> Option<u32> {
    let decoded = urlencoding::decode(input)
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_else(|_| input.to_string());
    WEEK_RE
        .find(&decoded)
        .and_then(|value| value.as_str().parse::<u32>().ok())
}

/// Weeks newer than `last_week`, oldest first.
pub fn weeks_after(links: &[WeekLink], last_week: u32) -> Vec<WeekLink> {
    let mut pending = links
        .iter()
        .filter(|link| link.week > last_week)
        .cloned()
        .collect::<Vec<_>>();
    pending.sort_by_key(|link| link.week);
    pending
}

/// Local file name for a downloaded report: the last path segment of its URL.
pub fn file_name_for(link: &WeekLink) -> Result<String, PipelineError> {
    let url = Url::parse(&link.url)?;
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            urlencoding::decode(segment)
                .map(std::borrow::Cow::into_owned)
                .unwrap_or_else(|_| segment.to_string())
        })
        .filter(|name| !name.contains(['/', '\\']) && name != ".." && name != ".")
        .ok_or_else(|| PipelineError::Parse(format!("link has no usable file name: {}", link.url)))
}

fn strip_html_tags(input: &str) -> String {
    TAGS_RE.replace_all(input, " ").trim().to_string()
}

use pdf_column_table::ExtractWarning;
use serde::{Deserialize, Serialize};

pub const DEFAULT_SOURCE_URL: &str = "http://idsp.nic.in/index4.php?lang=1&level=0&linkid=406&lid=3689";
pub const DEFAULT_BASE_DIR: &str = "idsp_pipeline";
pub const LEDGER_FILE_NAME: &str = "week.csv";
pub const DATASET_FILE_NAME: &str = "dataset.csv";
pub const SUMMARY_FILE_NAME: &str = "summary.json";
pub const RUN_LOCK_FILE_NAME: &str = ".run.lock";
pub const EXECUTION_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
/// Week assumed processed when no ledger exists yet.
pub const DEFAULT_FALLBACK_LAST_WEEK: u32 = 7;
/// Cover and contents pages at the front of each weekly report.
pub const DEFAULT_FRONT_MATTER_PAGES: u32 = 2;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WeekLink {
    pub week: u32,
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiscoveryReport {
    pub found: usize,
    pub downloaded: Vec<WeekLink>,
    pub failed: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageSummary {
    pub page: u32,
    pub rows: usize,
    pub columns: usize,
    pub dropped_fragments: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ExtractWarning>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentSummary {
    pub document: String,
    pub pages: Vec<PageSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunSummary {
    pub execution_date: String,
    pub documents: Vec<DocumentSummary>,
}

impl RunSummary {
    pub fn failed_documents(&self) -> usize {
        self.documents.iter().filter(|doc| doc.error.is_some()).count()
    }

    pub fn row_count(&self) -> usize {
        self.documents
            .iter()
            .flat_map(|doc| doc.pages.iter())
            .map(|page| page.rows)
            .sum()
    }
}

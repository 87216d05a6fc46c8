use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to load PDF: {0}")]
    PdfLoad(#[from] lopdf::Error),

    #[error("failed to lay out PDF text: {0}")]
    PdfLayout(String),

    #[error("document does not allow text extraction")]
    ExtractionForbidden,

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("no pages available after applying selection")]
    NoPagesSelected,

    #[error("page {page} dropped {count} fragment(s) spanning several columns")]
    AmbiguousFragments { page: u32, count: usize },
}

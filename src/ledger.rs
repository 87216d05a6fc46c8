use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use csv::{QuoteStyle, ReaderBuilder, Terminator, WriterBuilder};

use crate::error::PipelineError;
use crate::models::WeekLink;

/// Append-only record of downloaded weekly reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> Result<Vec<WeekLink>, PipelineError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .from_path(&self.path)?;
        let entries = reader.deserialize::<WeekLink>().collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Week of the most recently appended row, or `fallback` for a new ledger.
    pub fn last_week(&self, fallback: u32) -> Result<u32, PipelineError> {
        Ok(self
            .entries()?
            .last()
            .map_or(fallback, |entry| entry.week))
    }

    pub fn append(&self, entry: &WeekLink) -> Result<(), PipelineError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .quote_style(QuoteStyle::Always)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(file);
        writer.serialize(entry)?;
        writer.flush()?;
        Ok(())
    }
}

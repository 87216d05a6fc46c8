use std::path::{Path, PathBuf};

use csv::{QuoteStyle, Terminator, WriterBuilder};

use crate::error::ExtractError;
use crate::model::Table;

/// Record file that belongs to a page file: same path, `.csv` extension.
#[must_use]
pub fn csv_path_for_page(page_path: &Path) -> PathBuf {
    page_path.with_extension("csv")
}

pub fn write_tables_to_bytes<'a, I>(tables: I, delimiter: u8) -> Result<Vec<u8>, ExtractError>
where
    I: IntoIterator<Item = &'a Table>,
{
    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .has_headers(false)
        .flexible(true)
        .from_writer(Vec::<u8>::new());
    for table in tables {
        for row in &table.rows {
            writer.write_record(row)?;
        }
    }
    writer.flush()?;

    writer
        .into_inner()
        .map_err(|error| ExtractError::Csv(error.into_error().into()))
}

/// Renders every table before touching `path`, so a failure leaves no file.
pub fn write_tables_csv<'a, I>(path: &Path, tables: I, delimiter: u8) -> Result<(), ExtractError>
where
    I: IntoIterator<Item = &'a Table>,
{
    let bytes = write_tables_to_bytes(tables, delimiter)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

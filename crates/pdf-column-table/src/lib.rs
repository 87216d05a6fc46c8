mod assemble;
mod collect;
mod csv_out;
mod error;
mod grouping;
mod layout;
mod model;
mod options;
mod split;
mod warning;

use std::path::Path;

use crate::warning::WarningCode;

pub use assemble::assemble_table;
pub use collect::collect_fragments;
pub use csv_out::{csv_path_for_page, write_tables_csv, write_tables_to_bytes};
pub use error::ExtractError;
pub use grouping::{Grouping, group_fragments};
pub use layout::read_page_layouts;
pub use model::{
    BBox, ColumnGroup, Fragment, LayoutNode, PageExtraction, PageLayout, Table, TextLine,
    WritingMode,
};
pub use options::{ExtractOptions, LayoutParams, PageSelection, QualityMode};
pub use split::{SplitPage, page_file_name, split_pdf_pages};
pub use warning::{ExtractWarning, WarningCode as ExtractWarningCode};

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionReport {
    pub row_count: usize,
    pub page_count: usize,
    pub warnings: Vec<ExtractWarning>,
}

/// Collects, groups and assembles one page layout into a table.
#[must_use]
pub fn table_from_layout(layout: &PageLayout) -> PageExtraction {
    let fragments = collect_fragments(&layout.root);
    let grouping = group_fragments(&fragments);
    let table = assemble_table(&grouping);

    PageExtraction {
        page_number: layout.page_number,
        group_count: grouping.len(),
        dropped: grouping.dropped,
        table,
    }
}

fn apply_quality_mode(
    mut page: PageExtraction,
    options: &ExtractOptions,
    warnings: &mut Vec<ExtractWarning>,
) -> Result<PageExtraction, ExtractError> {
    if page.group_count == 0 {
        warnings.push(
            ExtractWarning::new(WarningCode::NoTextOnPage, "page has no horizontal text")
                .with_page(page.page_number),
        );
    } else if page.table.is_empty() {
        warnings.push(
            ExtractWarning::new(
                WarningCode::DegeneratePage,
                "fewer than three columns detected; no data columns remain after margin trimming",
            )
            .with_page(page.page_number)
            .with_count(page.group_count),
        );
    }

    if page.dropped.is_empty() {
        return Ok(page);
    }

    let count = page.dropped.len();
    match options.quality_mode {
        QualityMode::BestEffort => {
            warnings.push(
                ExtractWarning::new(
                    WarningCode::AmbiguousFragmentsDropped,
                    "fragments spanning several columns were dropped",
                )
                .with_page(page.page_number)
                .with_count(count),
            );
            Ok(page)
        }
        QualityMode::Strict => Err(ExtractError::AmbiguousFragments {
            page: page.page_number,
            count,
        }),
        QualityMode::SkipAmbiguous => {
            warnings.push(
                ExtractWarning::new(
                    WarningCode::AmbiguousFragmentsDropped,
                    "skipping page with fragments spanning several columns",
                )
                .with_page(page.page_number)
                .with_count(count),
            );
            page.table = Table::default();
            Ok(page)
        }
    }
}

fn extract_from_layouts(
    layouts: &[PageLayout],
    options: &ExtractOptions,
) -> Result<(Vec<PageExtraction>, Vec<ExtractWarning>), ExtractError> {
    let mut warnings = Vec::new();
    let mut pages = Vec::with_capacity(layouts.len());
    for layout in layouts {
        let page = apply_quality_mode(table_from_layout(layout), options, &mut warnings)?;
        tracing::debug!(
            page = page.page_number,
            groups = page.group_count,
            rows = page.table.row_count(),
            dropped = page.dropped.len(),
            "page table assembled"
        );
        pages.push(page);
    }
    Ok((pages, warnings))
}

/// Extracts one table per selected page of `input_pdf`.
pub fn extract_pages(
    input_pdf: &Path,
    options: &ExtractOptions,
) -> Result<(Vec<PageExtraction>, Vec<ExtractWarning>), ExtractError> {
    validate_options(options)?;
    let layouts = read_page_layouts(input_pdf, &options.layout, options.pages.as_ref())?;
    extract_from_layouts(&layouts, options)
}

/// Extracts `input_pdf` and writes the rows of every page, in page order,
/// to `output_csv`.
pub fn extract_pdf_to_csv(
    input_pdf: &Path,
    output_csv: &Path,
    options: &ExtractOptions,
) -> Result<ExtractionReport, ExtractError> {
    let (pages, warnings) = extract_pages(input_pdf, options)?;
    write_tables_csv(
        output_csv,
        pages.iter().map(|page| &page.table),
        options.delimiter,
    )?;

    Ok(report(&pages, warnings))
}

fn report(pages: &[PageExtraction], warnings: Vec<ExtractWarning>) -> ExtractionReport {
    ExtractionReport {
        row_count: pages.iter().map(|page| page.table.row_count()).sum(),
        page_count: pages.len(),
        warnings,
    }
}

fn validate_options(options: &ExtractOptions) -> Result<(), ExtractError> {
    if !options.delimiter.is_ascii() || options.delimiter == b'"' {
        return Err(ExtractError::InvalidOption(
            "delimiter must be an ASCII character other than '\"'".to_string(),
        ));
    }

    let layout = &options.layout;
    let margins = [
        layout.line_overlap,
        layout.char_margin,
        layout.line_margin,
        layout.word_margin,
    ];
    if margins.iter().any(|margin| !margin.is_finite() || *margin < 0.0) {
        return Err(ExtractError::InvalidOption(
            "layout margins must be finite and non-negative".to_string(),
        ));
    }

    Ok(())
}

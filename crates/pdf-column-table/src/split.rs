use std::fs;
use std::path::{Path, PathBuf};

use lopdf::Document;

use crate::error::ExtractError;
use crate::layout::{decrypt_in_place, ensure_extractable};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPage {
    pub page_number: u32,
    pub path: PathBuf,
}

#[must_use]
pub fn page_file_name(page_number: u32) -> String {
    format!("page-{page_number}.pdf")
}

/// Writes every page after the first `skip_leading` pages of `input_pdf` as
/// its own document in `out_dir`, named `page-<n>.pdf` after its 1-based
/// source page number.
pub fn split_pdf_pages(
    input_pdf: &Path,
    out_dir: &Path,
    skip_leading: u32,
) -> Result<Vec<SplitPage>, ExtractError> {
    let mut document = Document::load(input_pdf)?;
    ensure_extractable(&document)?;
    // Page files are written in the clear.
    decrypt_in_place(&mut document)?;
    fs::create_dir_all(out_dir)?;

    let page_numbers = document.get_pages().keys().copied().collect::<Vec<_>>();
    let mut written = Vec::new();

    for &page_number in page_numbers.iter().filter(|page| **page > skip_leading) {
        let others = page_numbers
            .iter()
            .copied()
            .filter(|other| *other != page_number)
            .collect::<Vec<_>>();

        let mut single = document.clone();
        single.delete_pages(&others);
        single.prune_objects();
        single.compress();

        let path = out_dir.join(page_file_name(page_number));
        let staging = path.with_extension("pdf.part");
        single.save(&staging)?;
        fs::rename(&staging, &path)?;

        tracing::debug!(page = page_number, path = %path.display(), "wrote single-page document");
        written.push(SplitPage { page_number, path });
    }

    Ok(written)
}

use std::path::Path;

use lopdf::{Document, Object};
use pdf_extract::{MediaBox, OutputDev, OutputError, Transform};

use crate::error::ExtractError;
use crate::model::{BBox, LayoutNode, PageLayout, TextLine, WritingMode};
use crate::options::{LayoutParams, PageSelection};

/// "Copy or extract text" bit of the standard security handler `P` entry.
const EXTRACT_PERMISSION_BIT: i64 = 1 << 4;
/// Share of the font size that hangs below the baseline.
const DESCENT_RATIO: f64 = 0.2;
/// Advance used for glyphs whose font reports no width.
const FALLBACK_ADVANCE_RATIO: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Glyph {
    pub(crate) text: String,
    pub(crate) bbox: BBox,
    pub(crate) mode: WritingMode,
}

impl Glyph {
    fn from_render_matrix(trm: &Transform, width: f64, font_size: f64, text: &str) -> Option<Self> {
        let scale = (trm.m11 * trm.m22 - trm.m12 * trm.m21).abs().sqrt();
        let size = font_size * scale;
        if !size.is_finite() || size <= 0.0 {
            return None;
        }

        let advance = if width > 0.0 {
            width * size
        } else {
            size * FALLBACK_ADVANCE_RATIO
        };
        let (x, y) = (trm.m31, trm.m32);
        let (bbox, mode) = if trm.m11.abs() >= trm.m12.abs() {
            let y0 = y - DESCENT_RATIO * size;
            (BBox::new(x, y0, x + advance, y0 + size), WritingMode::Horizontal)
        } else {
            let x0 = x - (1.0 - DESCENT_RATIO) * size;
            (BBox::new(x0, y, x0 + size, y + advance), WritingMode::Vertical)
        };

        Some(Self {
            text: text.to_string(),
            bbox,
            mode,
        })
    }

    fn width(&self) -> f64 {
        self.bbox.width()
    }

    fn height(&self) -> f64 {
        self.bbox.height()
    }

    fn continues(&self, next: &Self, params: &LayoutParams) -> bool {
        if self.mode != next.mode {
            return false;
        }

        match self.mode {
            WritingMode::Horizontal => {
                self.height().min(next.height()) * params.line_overlap
                    < self.bbox.voverlap(&next.bbox)
                    && self.bbox.hdistance(&next.bbox)
                        < self.width().max(next.width()) * params.char_margin
            }
            WritingMode::Vertical => {
                self.width().min(next.width()) * params.line_overlap
                    < self.bbox.hoverlap(&next.bbox)
                    && self.bbox.vdistance(&next.bbox)
                        < self.height().max(next.height()) * params.char_margin
            }
        }
    }
}

struct LineBuilder {
    text: String,
    bbox: BBox,
    mode: WritingMode,
    last: Glyph,
}

impl LineBuilder {
    fn start(glyph: &Glyph) -> Self {
        Self {
            text: glyph.text.clone(),
            bbox: glyph.bbox,
            mode: glyph.mode,
            last: glyph.clone(),
        }
    }

    fn push(&mut self, glyph: &Glyph, word_margin: f64) {
        let margin = word_margin * glyph.width().max(glyph.height());
        let gap = match self.mode {
            WritingMode::Horizontal => glyph.bbox.x0 - self.bbox.x1,
            WritingMode::Vertical => glyph.bbox.y0 - self.bbox.y1,
        };
        let spaced = self.text.ends_with(char::is_whitespace)
            || glyph.text.starts_with(char::is_whitespace);
        if gap > margin && !spaced {
            self.text.push(' ');
        }

        self.text.push_str(&glyph.text);
        self.bbox = self.bbox.union(&glyph.bbox);
        self.last = glyph.clone();
    }

    fn finish(self) -> TextLine {
        TextLine {
            text: self.text,
            bbox: self.bbox,
            mode: self.mode,
        }
    }
}

pub(crate) fn build_lines(glyphs: &[Glyph], params: &LayoutParams) -> Vec<TextLine> {
    let mut lines = Vec::new();
    let mut current: Option<LineBuilder> = None;

    for glyph in glyphs {
        if let Some(line) = current.as_mut() {
            if line.last.continues(glyph, params) {
                line.push(glyph, params.word_margin);
                continue;
            }
        }
        if let Some(line) = current.replace(LineBuilder::start(glyph)) {
            lines.push(line.finish());
        }
    }

    lines.extend(current.map(LineBuilder::finish));
    lines
}

/// Page container holding text-box containers of horizontal lines, followed
/// by any vertical lines.
pub(crate) fn build_page_tree(lines: Vec<TextLine>, params: &LayoutParams) -> LayoutNode {
    let mut boxes: Vec<Vec<TextLine>> = Vec::new();
    let mut vertical = Vec::new();

    for line in lines {
        if line.mode == WritingMode::Vertical {
            vertical.push(LayoutNode::TextLine(line));
            continue;
        }

        let joins_last_box = boxes
            .last()
            .and_then(|current| current.last())
            .is_some_and(|previous| {
                previous.bbox.hoverlap(&line.bbox) > 0.0
                    && previous.bbox.vdistance(&line.bbox)
                        < previous.bbox.height().max(line.bbox.height()) * params.line_margin
            });
        match boxes.last_mut() {
            Some(current) if joins_last_box => current.push(line),
            _ => boxes.push(vec![line]),
        }
    }

    let mut children = boxes
        .into_iter()
        .map(|lines| LayoutNode::Container(lines.into_iter().map(LayoutNode::TextLine).collect()))
        .collect::<Vec<_>>();
    children.extend(vertical);
    LayoutNode::Container(children)
}

struct LayoutDevice<'a> {
    params: LayoutParams,
    selection: Option<&'a PageSelection>,
    page_number: Option<u32>,
    glyphs: Vec<Glyph>,
    pages: Vec<PageLayout>,
}

impl<'a> LayoutDevice<'a> {
    fn new(params: LayoutParams, selection: Option<&'a PageSelection>) -> Self {
        Self {
            params,
            selection,
            page_number: None,
            glyphs: Vec::new(),
            pages: Vec::new(),
        }
    }
}

impl OutputDev for LayoutDevice<'_> {
    fn begin_page(
        &mut self,
        page_num: u32,
        _media_box: &MediaBox,
        _art_box: Option<(f64, f64, f64, f64)>,
    ) -> Result<(), OutputError> {
        self.glyphs.clear();
        self.page_number = self
            .selection
            .is_none_or(|selection| selection.contains(page_num))
            .then_some(page_num);
        Ok(())
    }

    fn end_page(&mut self) -> Result<(), OutputError> {
        if let Some(page_number) = self.page_number.take() {
            let glyphs = std::mem::take(&mut self.glyphs);
            let lines = build_lines(&glyphs, &self.params);
            tracing::debug!(
                page = page_number,
                glyphs = glyphs.len(),
                lines = lines.len(),
                "page laid out"
            );
            self.pages.push(PageLayout {
                page_number,
                root: build_page_tree(lines, &self.params),
            });
        }
        Ok(())
    }

    fn output_character(
        &mut self,
        trm: &Transform,
        width: f64,
        _spacing: f64,
        font_size: f64,
        text: &str,
    ) -> Result<(), OutputError> {
        if self.page_number.is_none() {
            return Ok(());
        }
        if let Some(glyph) = Glyph::from_render_matrix(trm, width, font_size, text) {
            self.glyphs.push(glyph);
        }
        Ok(())
    }

    fn begin_word(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn end_word(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn end_line(&mut self) -> Result<(), OutputError> {
        Ok(())
    }
}

pub(crate) fn text_extraction_allowed(document: &Document) -> bool {
    let Ok(encrypt) = document.trailer.get(b"Encrypt") else {
        return true;
    };
    let dictionary = match encrypt {
        Object::Reference(id) => document.get_dictionary(*id).ok(),
        Object::Dictionary(dictionary) => Some(dictionary),
        _ => None,
    };

    dictionary
        .and_then(|dictionary| dictionary.get(b"P").ok())
        .and_then(|permissions| permissions.as_i64().ok())
        .is_none_or(|permissions| permissions & EXTRACT_PERMISSION_BIT != 0)
}

pub(crate) fn ensure_extractable(document: &Document) -> Result<(), ExtractError> {
    if text_extraction_allowed(document) {
        Ok(())
    } else {
        Err(ExtractError::ExtractionForbidden)
    }
}

/// Password tried on encrypted documents; reports are published with an
/// empty user password.
const USER_PASSWORD: &str = "";

/// Decrypts `document` in place when it carries an `Encrypt` entry.
pub(crate) fn decrypt_in_place(document: &mut Document) -> Result<(), ExtractError> {
    if document.is_encrypted() {
        document.decrypt(USER_PASSWORD)?;
    }
    Ok(())
}

pub fn read_page_layouts(
    input_pdf: &Path,
    params: &LayoutParams,
    page_selection: Option<&PageSelection>,
) -> Result<Vec<PageLayout>, ExtractError> {
    let bytes = std::fs::read(input_pdf)?;
    let document = Document::load_mem(&bytes)?;
    ensure_extractable(&document)?;

    let selected = document
        .get_pages()
        .keys()
        .filter(|page| page_selection.is_none_or(|selection| selection.contains(**page)))
        .count();
    if selected == 0 {
        return Err(ExtractError::NoPagesSelected);
    }

    let mut layout_document = pdf_extract::Document::load_mem(&bytes)
        .map_err(|error| ExtractError::PdfLayout(error.to_string()))?;
    if layout_document.is_encrypted() {
        layout_document
            .decrypt(USER_PASSWORD)
            .map_err(|error| ExtractError::PdfLayout(format!("failed to decrypt: {error}")))?;
    }

    let mut device = LayoutDevice::new(*params, page_selection);
    pdf_extract::output_doc(&layout_document, &mut device)
        .map_err(|error| ExtractError::PdfLayout(format!("{error:?}")))?;

    Ok(device.pages)
}

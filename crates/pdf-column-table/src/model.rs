/// Axis-aligned box in page coordinates: origin bottom-left, y grows upward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BBox {
    #[must_use]
    pub const fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    pub(crate) fn hoverlap(&self, other: &Self) -> f64 {
        (self.x1.min(other.x1) - self.x0.max(other.x0)).max(0.0)
    }

    pub(crate) fn voverlap(&self, other: &Self) -> f64 {
        (self.y1.min(other.y1) - self.y0.max(other.y0)).max(0.0)
    }

    pub(crate) fn hdistance(&self, other: &Self) -> f64 {
        if self.hoverlap(other) > 0.0 {
            0.0
        } else {
            (other.x0 - self.x1).max(self.x0 - other.x1).max(0.0)
        }
    }

    pub(crate) fn vdistance(&self, other: &Self) -> f64 {
        if self.voverlap(other) > 0.0 {
            0.0
        } else {
            (other.y0 - self.y1).max(self.y0 - other.y1).max(0.0)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritingMode {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub bbox: BBox,
    pub mode: WritingMode,
}

/// One node of a page layout tree.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutNode {
    Container(Vec<LayoutNode>),
    TextLine(TextLine),
}

impl LayoutNode {
    #[must_use]
    pub fn horizontal(text: impl Into<String>, bbox: BBox) -> Self {
        Self::TextLine(TextLine {
            text: text.into(),
            bbox,
            mode: WritingMode::Horizontal,
        })
    }

    #[must_use]
    pub fn vertical(text: impl Into<String>, bbox: BBox) -> Self {
        Self::TextLine(TextLine {
            text: text.into(),
            bbox,
            mode: WritingMode::Vertical,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    pub page_number: u32,
    pub root: LayoutNode,
}

/// A horizontal text line handed to the column grouper.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub text: String,
    pub bbox: BBox,
}

impl Fragment {
    #[must_use]
    pub fn new(text: impl Into<String>, bbox: BBox) -> Self {
        Self {
            text: text.into(),
            bbox,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnGroup {
    pub min_x: f64,
    pub max_x: f64,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    pub rows: Vec<Vec<String>>,
    pub column_count: usize,
}

impl Table {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageExtraction {
    pub page_number: u32,
    pub table: Table,
    pub dropped: Vec<Fragment>,
    pub group_count: usize,
}

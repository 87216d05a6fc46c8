use crate::model::{ColumnGroup, Fragment};

/// Column groups of one page, ordered by ascending `min_x`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Grouping {
    pub columns: Vec<ColumnGroup>,
    pub dropped: Vec<Fragment>,
}

impl Grouping {
    /// Column by its 1-based index.
    #[must_use]
    pub fn column(&self, index: usize) -> Option<&ColumnGroup> {
        index.checked_sub(1).and_then(|offset| self.columns.get(offset))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl ColumnGroup {
    fn start(fragment: &Fragment, text: String) -> Self {
        Self {
            min_x: fragment.bbox.x0,
            max_x: fragment.bbox.x1,
            members: vec![text],
        }
    }

    /// Open-interval test: touching endpoints do not overlap.
    #[must_use]
    pub fn overlaps(&self, x0: f64, x1: f64) -> bool {
        self.min_x < x1 && self.max_x > x0
    }

    fn absorb(&mut self, fragment: &Fragment, text: String) {
        self.min_x = self.min_x.min(fragment.bbox.x0);
        self.max_x = self.max_x.max(fragment.bbox.x1);
        self.members.push(text);
    }
}

/// Clusters fragments into columns by x-projection overlap.
///
/// Fragments are visited bottom row first, left to right. A fragment that
/// overlaps exactly one column joins it and widens its interval; one that
/// overlaps none starts a new column; one that overlaps several is dropped
/// and reported in [`Grouping::dropped`]. Intervals are taken as given, so
/// a zero-width or inverted interval still takes part in the open overlap
/// test.
#[must_use]
pub fn group_fragments(fragments: &[Fragment]) -> Grouping {
    let mut ordered = fragments
        .iter()
        .filter(|fragment| !fragment.text.trim().is_empty())
        .collect::<Vec<_>>();
    ordered.sort_by(|left, right| {
        left.bbox
            .y0
            .total_cmp(&right.bbox.y0)
            .then_with(|| left.bbox.x0.total_cmp(&right.bbox.x0))
    });

    let mut columns: Vec<ColumnGroup> = Vec::new();
    let mut dropped = Vec::new();

    for fragment in ordered {
        let text = fragment.text.trim().to_string();
        let mut hits = columns
            .iter()
            .enumerate()
            .filter(|(_, column)| column.overlaps(fragment.bbox.x0, fragment.bbox.x1))
            .map(|(index, _)| index);

        match (hits.next(), hits.next()) {
            (None, _) => columns.push(ColumnGroup::start(fragment, text)),
            (Some(index), None) => columns[index].absorb(fragment, text),
            (Some(_), Some(_)) => {
                tracing::debug!(
                    text = %text,
                    x0 = fragment.bbox.x0,
                    x1 = fragment.bbox.x1,
                    "dropping fragment that spans several columns"
                );
                dropped.push(fragment.clone());
            }
        }
    }

    columns.sort_by(|left, right| left.min_x.total_cmp(&right.min_x));
    for column in &mut columns {
        column.members.reverse();
    }

    Grouping { columns, dropped }
}

use crate::grouping::Grouping;
use crate::model::Table;

/// Drops the leftmost and rightmost columns as page margins, pads the rest
/// with empty cells to equal height and transposes them into rows.
///
/// Fewer than three columns leave nothing after trimming and produce an
/// empty table.
#[must_use]
pub fn assemble_table(grouping: &Grouping) -> Table {
    let column_count = grouping.len();
    if column_count < 3 {
        return Table::default();
    }

    let kept = &grouping.columns[1..column_count - 1];
    let height = kept
        .iter()
        .map(|column| column.members.len())
        .max()
        .unwrap_or(0);

    let rows = (0..height)
        .map(|row| {
            kept.iter()
                .map(|column| column.members.get(row).cloned().unwrap_or_default())
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    Table {
        rows,
        column_count: kept.len(),
    }
}

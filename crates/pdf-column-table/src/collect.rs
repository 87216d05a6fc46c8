use crate::model::{Fragment, LayoutNode, WritingMode};

/// Flattens a layout tree into its horizontal text lines, depth-first in
/// tree order. Vertical lines are skipped.
#[must_use]
pub fn collect_fragments(root: &LayoutNode) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        match node {
            LayoutNode::Container(children) => {
                stack.extend(children.iter().rev());
            }
            LayoutNode::TextLine(line) if line.mode == WritingMode::Horizontal => {
                fragments.push(Fragment::new(line.text.clone(), line.bbox));
            }
            LayoutNode::TextLine(_) => {}
        }
    }

    fragments
}

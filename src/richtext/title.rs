// Title Levels
// Turns the rows a selection touches into headings, or back into plain
// paragraphs. Inline styling of those rows is dropped.

use tracing::debug;

use super::node_tree::{NodeId, NodeTree, Tag, TitleLevel};
use super::normalize::{NormalizeOptions, normalize_range};
use super::range::{Boundary, Range, touched_rows};

/// What a rebuilt row holds
enum Rebuilt {
    Text(NodeId),
    /// The row had no text; the block that will hold the placeholder
    Empty(NodeId),
}

/// Rebuild `row` as its plain text, inside a heading when `level` is given
fn rebuild_row(tree: &mut NodeTree, row: NodeId, level: Option<TitleLevel>) -> Rebuilt {
    let text = tree.text_content(row);
    for child in tree.take_children(row) {
        tree.remove(child);
    }

    let block = match level {
        Some(level) => {
            let heading = tree.create_element(Tag::Title(level));
            tree.append_child(row, heading);
            heading
        }
        None => row,
    };
    if text.is_empty() {
        return Rebuilt::Empty(block);
    }
    let node = tree.create_text(text);
    tree.append_child(block, node);
    Rebuilt::Text(node)
}

/// Set the title level of every row touched by `range`; `None` makes them
/// plain paragraphs again. Rows hosting a list are skipped.
///
/// Returns a selection spanning the text of the rebuilt rows, or `None` when
/// no row qualified.
pub fn title(
    tree: &mut NodeTree,
    root: NodeId,
    range: &Range,
    level: Option<TitleLevel>,
) -> Option<Range> {
    let range = range.ordered(tree);
    let rows: Vec<NodeId> = touched_rows(tree, &range)
        .into_iter()
        .filter(|&row| !tree.first_child(row).is_some_and(|c| tree.has_tag(c, |t| matches!(t, Tag::List(_)))))
        .collect();
    if rows.is_empty() {
        debug!("no rows to retitle");
        return None;
    }
    debug!(rows = rows.len(), level = ?level, "setting title level");

    let rebuilt: Vec<Rebuilt> = rows
        .iter()
        .map(|&row| rebuild_row(tree, row, level))
        .collect();

    let start = match rebuilt.first()? {
        Rebuilt::Text(node) | Rebuilt::Empty(node) => Boundary::new(*node, 0),
    };
    let end = match rebuilt.last()? {
        Rebuilt::Text(node) => Boundary::new(*node, tree.node_length(*node)),
        Rebuilt::Empty(block) => Boundary::new(*block, 0),
    };

    let mut selection = Range::from_boundaries(start, end);
    normalize_range(tree, root, &mut selection, NormalizeOptions::default());
    Some(selection)
}

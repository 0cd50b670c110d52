// List Toggling
// Regroups the rows a selection touches into lists and turns list items back
// into rows. Inline content is moved, never copied, so the caller's
// selection survives through anchored boundaries.

use tracing::debug;

use super::node_tree::{ListKind, NodeId, NodeTree, Tag};
use super::normalize::{NormalizeOptions, normalize_range};
use super::range::{AnchoredRange, Range, iterate_subtree};

/// Rows to regroup plus existing lists of the other kind
#[derive(Debug, Default)]
struct ListTargets {
    runs: Vec<Vec<NodeId>>,
    converted: Vec<NodeId>,
}

fn hosted_list(tree: &NodeTree, row: NodeId) -> Option<(NodeId, ListKind)> {
    let first = tree.first_child(row)?;
    match tree.tag(first) {
        Some(Tag::List(kind)) => Some((first, *kind)),
        _ => None,
    }
}

/// Contiguous runs of plain rows touched by `range`. A row already hosting a
/// list ends the current run.
fn collect_targets(tree: &NodeTree, range: &Range, kind: ListKind) -> ListTargets {
    let mut targets = ListTargets::default();
    let mut run: Vec<NodeId> = Vec::new();

    iterate_subtree(tree, range, |node| {
        let Some(row) = tree.closest_with_tag(node, |t| *t == Tag::Row) else {
            return false;
        };
        match hosted_list(tree, row) {
            Some((list, existing)) => {
                if !run.is_empty() {
                    targets.runs.push(std::mem::take(&mut run));
                }
                if existing != kind && !targets.converted.contains(&list) {
                    targets.converted.push(list);
                }
            }
            None => {
                if !run.contains(&row) {
                    run.push(row);
                }
            }
        }
        true
    });
    if !run.is_empty() {
        targets.runs.push(run);
    }
    targets
}

/// Turn every row the selection touches into an item of a `kind` list.
///
/// Each contiguous run of rows becomes one list hosted by the run's first
/// row. Lists of the other kind are relabelled; lists of the same kind are
/// left alone. Returns the selection re-derived after the change, or `None`
/// when the selection touched no rows.
pub fn toggle_list(tree: &mut NodeTree, root: NodeId, range: &Range, kind: ListKind) -> Option<Range> {
    let range = range.ordered(tree);
    let anchored = AnchoredRange::capture(tree, &range);
    let targets = collect_targets(tree, &range, kind);
    if targets.runs.is_empty() && targets.converted.is_empty() {
        debug!("no rows to turn into a list");
        return None;
    }
    debug!(
        runs = targets.runs.len(),
        converted = targets.converted.len(),
        list = kind.tag_name(),
        "toggling list"
    );

    let mut discarded = Vec::new();
    for run in &targets.runs {
        let list = tree.create_element(Tag::List(kind));
        for (index, &row) in run.iter().enumerate() {
            let item = tree.create_element(Tag::ListItem);
            let content = tree.take_children(row);
            tree.append_children(item, content);
            tree.append_child(list, item);
            if index != 0 {
                tree.detach(row);
                discarded.push(row);
            }
        }
        tree.append_child(run[0], list);
    }
    for &list in &targets.converted {
        tree.set_tag(list, Tag::List(kind));
    }

    let mut restored = anchored.resolve(tree);
    release(tree, discarded, &restored);
    normalize_range(tree, root, &mut restored, NormalizeOptions::default());
    Some(restored)
}

/// Free emptied containers, except one the restored selection still names
fn release(tree: &mut NodeTree, discarded: Vec<NodeId>, restored: &Range) {
    for node in discarded {
        if node != restored.start.node && node != restored.end.node {
            tree.remove(node);
        }
    }
}

/// Index of the item of `list` that contains `node`
fn item_index(tree: &NodeTree, list: NodeId, node: NodeId) -> Option<usize> {
    let item = tree.closest_ancestor(node, |t, n| t.parent(n) == Some(list))?;
    tree.child_index(item)
}

/// Turn the items of the `kind` list around the selection back into rows.
///
/// Items from the one holding the selection start to the one holding its end
/// become rows right after the list's row. Items after that are moved into a
/// new list of the same kind following those rows; items before stay put.
/// Returns `None` when the selection start is not inside such a list.
pub fn un_toggle_list(tree: &mut NodeTree, root: NodeId, range: &Range, kind: ListKind) -> Option<Range> {
    let range = range.ordered(tree);
    let Some(list) = tree.closest_with_tag(range.start.node, |t| *t == Tag::List(kind)) else {
        debug!(list = kind.tag_name(), "selection is not inside a list");
        return None;
    };
    let host = tree.parent(list)?;
    let items = tree.children(list).to_vec();
    if items.is_empty() {
        return None;
    }
    let last = items.len() - 1;

    let first_index = if range.start.node == list {
        range.start.offset.min(last)
    } else {
        item_index(tree, list, range.start.node).unwrap_or(0)
    };
    let last_index = if range.end.node == list {
        range.end.offset.saturating_sub(1)
    } else if tree.is_inclusive_ancestor(list, range.end.node) {
        item_index(tree, list, range.end.node).unwrap_or(last)
    } else {
        last
    };
    let last_index = last_index.max(first_index);
    debug!(first_index, last_index, list = kind.tag_name(), "un-toggling list");

    let anchored = AnchoredRange::capture(tree, &range);
    let mut discarded = Vec::new();
    let mut previous = host;
    let mut rest: Option<NodeId> = None;
    for (index, &item) in items.iter().enumerate() {
        if index < first_index {
            continue;
        }
        if index <= last_index {
            let row = tree.create_element(Tag::Row);
            let content = tree.take_children(item);
            tree.append_children(row, content);
            tree.insert_after(previous, row);
            previous = row;
            tree.detach(item);
            discarded.push(item);
        } else {
            let remaining = *rest.get_or_insert_with(|| tree.create_element(Tag::List(kind)));
            tree.append_child(remaining, item);
        }
    }
    if let Some(remaining) = rest {
        let row = tree.create_element(Tag::Row);
        tree.append_child(row, remaining);
        tree.insert_after(previous, row);
    }

    if tree.children(list).is_empty() {
        tree.detach(list);
        discarded.push(list);
        if tree.children(host).is_empty() {
            tree.detach(host);
            discarded.push(host);
        }
    }

    let mut restored = anchored.resolve(tree);
    release(tree, discarded, &restored);
    normalize_range(tree, root, &mut restored, NormalizeOptions::default());
    Some(restored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::richtext::range::Boundary;
    use crate::richtext::row_document::RowDocument;

    fn selection(doc: &RowDocument, from: (usize, usize), to: (usize, usize)) -> Range {
        Range::from_boundaries(
            doc.boundary_at(from.0, from.1).unwrap(),
            doc.boundary_at(to.0, to.1).unwrap(),
        )
    }

    #[test]
    fn test_toggle_groups_rows() {
        let mut doc = RowDocument::from_markup("<div>a</div><div>b</div><div>c</div>");
        let range = selection(&doc, (0, 0), (1, 1));
        let root = doc.root();
        let restored = toggle_list(doc.tree_mut(), root, &range, ListKind::Unordered).unwrap();

        assert_eq!(doc.to_markup(), "<div><ul><li>a</li><li>b</li></ul></div><div>c</div>");
        assert_eq!(restored, range);
    }

    #[test]
    fn test_toggle_stops_at_existing_list() {
        let mut doc = RowDocument::from_markup(
            "<div>a</div><div><ul><li>x</li></ul></div><div>b</div><div><ol><li>y</li></ol></div>",
        );
        let range = selection(&doc, (0, 0), (3, 1));
        let root = doc.root();
        toggle_list(doc.tree_mut(), root, &range, ListKind::Unordered).unwrap();

        assert_eq!(
            doc.to_markup(),
            "<div><ul><li>a</li></ul></div><div><ul><li>x</li></ul></div>\
             <div><ul><li>b</li></ul></div><div><ul><li>y</li></ul></div>"
        );
    }

    #[test]
    fn test_un_toggle_middle_items() {
        let mut doc = RowDocument::from_markup("<div><ol><li>a</li><li>b</li><li>c</li><li>d</li></ol></div>");
        let list = doc.tree().children(doc.rows()[0])[0];
        let items = doc.tree().children(list).to_vec();
        let b = doc.tree().children(items[1])[0];
        let c = doc.tree().children(items[2])[0];
        let range = Range::new(b, 0, c, 1);
        let root = doc.root();
        let restored = un_toggle_list(doc.tree_mut(), root, &range, ListKind::Ordered).unwrap();

        assert_eq!(
            doc.to_markup(),
            "<div><ol><li>a</li></ol></div><div>b</div><div>c</div><div><ol><li>d</li></ol></div>"
        );
        assert_eq!(doc.tree().parent(b), Some(doc.rows()[1]));
        assert_eq!(restored, Range::new(b, 0, c, 1));
    }

    #[test]
    fn test_un_toggle_empty_item_restores_caret() {
        let mut doc = RowDocument::from_markup("<div><ul><li>a</li><li></li></ul></div>");
        let list = doc.tree().children(doc.rows()[0])[0];
        let empty_item = doc.tree().children(list)[1];
        let caret = Range::collapsed_at(Boundary::new(empty_item, 0));
        let root = doc.root();
        let restored = un_toggle_list(doc.tree_mut(), root, &caret, ListKind::Unordered).unwrap();

        assert_eq!(doc.to_markup(), "<div><ul><li>a</li></ul></div><div><br></div>");
        assert_eq!(restored, Range::collapsed_at(Boundary::new(doc.rows()[1], 0)));
    }

    #[test]
    fn test_un_toggle_outside_list_is_noop() {
        let mut doc = RowDocument::from_markup("<div>a</div>");
        let range = selection(&doc, (0, 0), (0, 1));
        let root = doc.root();
        assert_eq!(un_toggle_list(doc.tree_mut(), root, &range, ListKind::Unordered), None);
        assert_eq!(doc.to_markup(), "<div>a</div>");
    }

    #[test]
    fn test_un_toggle_whole_list_removes_host_row() {
        let mut doc = RowDocument::from_markup("<div><ul><li>a</li><li>b</li></ul></div><div>z</div>");
        let range = selection(&doc, (0, 0), (0, 2));
        let root = doc.root();
        un_toggle_list(doc.tree_mut(), root, &range, ListKind::Unordered).unwrap();
        assert_eq!(doc.to_markup(), "<div>a</div><div>b</div><div>z</div>");
    }
}

// Range and Boundary Engine
// Boundaries address a position as (container, offset): a character offset
// inside a text node or a child index inside an element. Splitting a range
// rewrites the tree so that both ends fall on whole-node boundaries.

use std::cmp::Ordering;

use super::error::{EditError, EditResult};
use super::node_tree::{NodeId, NodeTree, Tag};

/// A position in the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    pub node: NodeId,
    pub offset: usize,
}

impl Boundary {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Boundary { node, offset }
    }

    pub fn point(self) -> (NodeId, usize) {
        (self.node, self.offset)
    }
}

/// A selection between two boundaries, start first in document order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start: Boundary,
    pub end: Boundary,
}

impl Range {
    pub fn new(start_node: NodeId, start_offset: usize, end_node: NodeId, end_offset: usize) -> Self {
        Range {
            start: Boundary::new(start_node, start_offset),
            end: Boundary::new(end_node, end_offset),
        }
    }

    pub fn from_boundaries(start: Boundary, end: Boundary) -> Self {
        Range { start, end }
    }

    pub fn collapsed_at(boundary: Boundary) -> Self {
        Range {
            start: boundary,
            end: boundary,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    /// Swap the ends if they are given in reverse document order
    pub fn ordered(self, tree: &NodeTree) -> Self {
        if tree.compare_points(self.start.point(), self.end.point()) == Ordering::Greater {
            Range::from_boundaries(self.end, self.start)
        } else {
            self
        }
    }

    pub fn boundaries(&self) -> [Boundary; 2] {
        [self.start, self.end]
    }

    pub fn set_boundaries(&mut self, [start, end]: [Boundary; 2]) {
        self.start = start;
        self.end = end;
    }
}

/// The three pieces of a text node cut at one or two offsets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSlices {
    pub before: String,
    pub mid: String,
    pub after: String,
}

fn byte_index(data: &str, chars: usize) -> usize {
    data.char_indices()
        .nth(chars)
        .map_or(data.len(), |(index, _)| index)
}

/// Slice a text node's data at `start` and `end` (defaults to the end of the text).
///
/// Does not mutate the tree; callers build replacement nodes from the slices.
pub fn split_text_node(
    tree: &NodeTree,
    node: NodeId,
    start: usize,
    end: Option<usize>,
) -> EditResult<TextSlices> {
    let data = tree.text(node).ok_or(EditError::NotText(node))?;
    let len = data.chars().count();
    let end = end.unwrap_or(len);
    if start > len {
        return Err(EditError::InvalidOffset { offset: start, len });
    }
    if end > len || end < start {
        return Err(EditError::InvalidOffset { offset: end, len });
    }

    let (a, b) = (byte_index(data, start), byte_index(data, end));
    Ok(TextSlices {
        before: data[..a].to_string(),
        mid: data[a..b].to_string(),
        after: data[b..].to_string(),
    })
}

/// Give `text` a span of its own, placing the cut-off `before`/`after` text
/// next to it. Inside a styled span the span itself is fragmented and every
/// fragment keeps the span's style.
fn isolate(tree: &mut NodeTree, text: NodeId, before: Option<NodeId>, after: Option<NodeId>) {
    let Some(parent) = tree.parent(text) else {
        return;
    };

    if tree.has_tag(parent, |t| *t == Tag::Span) {
        let style = tree.style(parent).cloned().unwrap_or_default();
        let siblings = tree.children(parent).to_vec();
        let index = tree.child_index(text).unwrap_or(0);

        if let Some(before) = before {
            let span = tree.create_styled(Tag::Span, style.clone());
            tree.insert_before(parent, span);
            tree.append_children(span, siblings[..index].iter().copied());
            tree.append_child(span, before);
        }
        if let Some(after) = after {
            let span = tree.create_styled(Tag::Span, style);
            tree.insert_after(parent, span);
            tree.append_child(span, after);
            tree.append_children(span, siblings[index + 1..].iter().copied());
        }
        return;
    }

    let span = tree.create_element(Tag::Span);
    tree.wrap(text, span);
    if let Some(before) = before {
        tree.insert_before(span, before);
    }
    if let Some(after) = after {
        tree.insert_after(span, after);
    }
}

fn check_offset(tree: &NodeTree, boundary: Boundary) -> EditResult<usize> {
    let len = tree.node_length(boundary.node);
    if boundary.offset > len {
        return Err(EditError::InvalidOffset {
            offset: boundary.offset,
            len,
        });
    }
    Ok(len)
}

/// Cut the text before a start boundary away; the text node keeps the selected part
fn split_start(tree: &mut NodeTree, start: Boundary) -> EditResult<Boundary> {
    let len = check_offset(tree, start)?;
    if start.offset == 0 || start.offset == len {
        return Ok(start);
    }
    let slices = split_text_node(tree, start.node, start.offset, None)?;
    tree.set_text(start.node, slices.mid);
    let before = tree.create_text(slices.before);
    isolate(tree, start.node, Some(before), None);
    Ok(Boundary::new(start.node, 0))
}

/// Cut the text after an end boundary away; the text node keeps the selected part
fn split_end(tree: &mut NodeTree, end: Boundary) -> EditResult<Boundary> {
    let len = check_offset(tree, end)?;
    if end.offset == 0 || end.offset == len {
        return Ok(end);
    }
    let slices = split_text_node(tree, end.node, 0, Some(end.offset))?;
    tree.set_text(end.node, slices.mid);
    let after = tree.create_text(slices.after);
    isolate(tree, end.node, None, Some(after));
    Ok(Boundary::new(end.node, end.offset))
}

fn split_single_text(tree: &mut NodeTree, range: &mut Range) -> EditResult {
    let node = range.start.node;
    let (a, b) = (range.start.offset, range.end.offset);
    let len = tree.node_length(node);
    if a == 0 && b == len {
        return Ok(());
    }

    let slices = split_text_node(tree, node, a, Some(b))?;
    tree.set_text(node, slices.mid);
    let before = (!slices.before.is_empty()).then(|| tree.create_text(slices.before));
    let after = (!slices.after.is_empty()).then(|| tree.create_text(slices.after));
    isolate(tree, node, before, after);

    range.start = Boundary::new(node, 0);
    range.end = Boundary::new(node, b - a);
    Ok(())
}

/// Rewrite the tree so both ends of `range` sit on whole-node boundaries.
///
/// Text cut at an interior offset is split; the selected slice ends up in a
/// span of its own (or in its own fragment of an enclosing span). Nodes
/// between the two ends are not touched. `range` is updated in place and
/// keeps referring to the original text nodes, which now hold only the
/// selected text. Boundaries already at 0 or at full length are left alone.
pub fn split_range(tree: &mut NodeTree, range: &mut Range) -> EditResult {
    if range.is_collapsed() {
        return Ok(());
    }
    if range.start.node == range.end.node {
        if tree.is_text(range.start.node) {
            return split_single_text(tree, range);
        }
        return Ok(());
    }

    // End side first: its insertions all land after the start boundary
    if tree.is_text(range.end.node) {
        range.end = split_end(tree, range.end)?;
    }
    if tree.is_text(range.start.node) {
        let watched = (!tree.is_text(range.end.node)).then(|| tree.children(range.end.node).len());
        range.start = split_start(tree, range.start)?;
        if let Some(count) = watched {
            let grown = tree.children(range.end.node).len().saturating_sub(count);
            range.end.offset += grown;
        }
    }
    Ok(())
}

/// Next node after the subtree of `node` in pre-order
fn following(tree: &NodeTree, node: NodeId) -> Option<NodeId> {
    let mut current = node;
    loop {
        if let Some(next) = tree.next_sibling(current) {
            return Some(next);
        }
        current = tree.parent(current)?;
    }
}

fn next_preorder(tree: &NodeTree, node: NodeId, skip_children: bool) -> Option<NodeId> {
    if !skip_children {
        if let Some(child) = tree.first_child(node) {
            return Some(child);
        }
    }
    following(tree, node)
}

/// Lazy pre-order walk over the nodes a range touches, boundary leaves included.
///
/// A collapsed range yields its start container and nothing else.
pub struct RangeIterator<'a> {
    tree: &'a NodeTree,
    next: Option<NodeId>,
    last: Option<NodeId>,
    end: Boundary,
    collapsed: bool,
    skip: bool,
}

impl<'a> RangeIterator<'a> {
    pub fn new(tree: &'a NodeTree, range: &Range) -> Self {
        let start = range.start;
        let collapsed = range.is_collapsed();
        let first = if collapsed {
            Some(start.node)
        } else if tree.is_text(start.node) {
            if start.offset < tree.node_length(start.node) {
                Some(start.node)
            } else {
                following(tree, start.node)
            }
        } else {
            match tree.children(start.node).get(start.offset) {
                Some(&child) => Some(child),
                None => following(tree, start.node),
            }
        };

        RangeIterator {
            tree,
            next: first,
            last: None,
            end: range.end,
            collapsed,
            skip: false,
        }
    }

    /// Do not descend into the node returned by the last call to `next`
    pub fn skip_descendants(&mut self) {
        self.skip = true;
    }

    fn starts_before_end(&self, node: NodeId) -> bool {
        match (self.tree.parent(node), self.tree.child_index(node)) {
            (Some(parent), Some(index)) => {
                self.tree.compare_points((parent, index), self.end.point()) == Ordering::Less
            }
            _ => true,
        }
    }
}

impl Iterator for RangeIterator<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if let Some(previous) = self.last.take() {
            self.next = if self.collapsed {
                None
            } else {
                let skip = std::mem::take(&mut self.skip);
                next_preorder(self.tree, previous, skip)
            };
        }

        let node = self.next.take()?;
        if !self.collapsed && !self.starts_before_end(node) {
            return None;
        }
        self.last = Some(node);
        Some(node)
    }
}

/// Visit every node in `range`; returning `true` from `visit` skips that node's descendants
pub fn iterate_subtree(tree: &NodeTree, range: &Range, mut visit: impl FnMut(NodeId) -> bool) {
    let mut iter = RangeIterator::new(tree, range);
    while let Some(node) = iter.next() {
        if visit(node) {
            iter.skip_descendants();
        }
    }
}

/// Text nodes touched by `range`, in document order
pub fn text_nodes_in(tree: &NodeTree, range: &Range) -> Vec<NodeId> {
    RangeIterator::new(tree, range)
        .filter(|&n| tree.is_text(n))
        .collect()
}

/// Distinct rows touched by `range`, in document order
pub fn touched_rows(tree: &NodeTree, range: &Range) -> Vec<NodeId> {
    let mut rows: Vec<NodeId> = Vec::new();
    iterate_subtree(tree, range, |node| {
        match tree.closest_with_tag(node, |t| *t == Tag::Row) {
            Some(row) => {
                if !rows.contains(&row) {
                    rows.push(row);
                }
                true
            }
            None => false,
        }
    });
    rows
}

/// Move an element boundary down to the equivalent position in the deepest
/// container that still has content
pub fn settle(tree: &NodeTree, mut boundary: Boundary) -> Boundary {
    loop {
        if tree.is_text(boundary.node) {
            return boundary;
        }
        let children = tree.children(boundary.node);
        let (child, at_end) = match children.get(boundary.offset) {
            Some(&child) => (child, false),
            None => match children.last() {
                Some(&child) => (child, true),
                None => return boundary,
            },
        };
        let offset = if at_end { tree.node_length(child) } else { 0 };
        if tree.is_text(child) {
            return Boundary::new(child, offset);
        }
        if tree.children(child).is_empty() {
            return boundary;
        }
        boundary = Boundary::new(child, offset);
    }
}

/// A boundary captured so it can be re-derived after nodes are moved.
///
/// Text containers keep their identity when moved. Element containers may be
/// discarded, so they are remembered through the child at the offset and
/// resolved from that child's new parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchoredBoundary {
    Text(Boundary),
    BeforeChild(NodeId),
    AfterChild(NodeId),
    Empty(Boundary),
}

impl AnchoredBoundary {
    pub fn capture(tree: &NodeTree, boundary: Boundary) -> Self {
        let boundary = settle(tree, boundary);
        if tree.is_text(boundary.node) {
            return AnchoredBoundary::Text(boundary);
        }
        match tree.children(boundary.node).get(boundary.offset) {
            Some(&child) => AnchoredBoundary::BeforeChild(child),
            None => match tree.last_child(boundary.node) {
                Some(child) => AnchoredBoundary::AfterChild(child),
                None => AnchoredBoundary::Empty(boundary),
            },
        }
    }

    pub fn resolve(self, tree: &NodeTree) -> Boundary {
        let located = |child: NodeId, shift: usize| match (tree.parent(child), tree.child_index(child)) {
            (Some(parent), Some(index)) => Boundary::new(parent, index + shift),
            _ => Boundary::new(child, 0),
        };
        match self {
            AnchoredBoundary::Text(b) => Boundary::new(b.node, b.offset.min(tree.node_length(b.node))),
            AnchoredBoundary::BeforeChild(child) => located(child, 0),
            AnchoredBoundary::AfterChild(child) => located(child, 1),
            AnchoredBoundary::Empty(b) => b,
        }
    }
}

/// Both ends of a range captured with [`AnchoredBoundary`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchoredRange {
    start: AnchoredBoundary,
    end: AnchoredBoundary,
}

impl AnchoredRange {
    pub fn capture(tree: &NodeTree, range: &Range) -> Self {
        AnchoredRange {
            start: AnchoredBoundary::capture(tree, range.start),
            end: AnchoredBoundary::capture(tree, range.end),
        }
    }

    pub fn resolve(self, tree: &NodeTree) -> Range {
        Range::from_boundaries(self.start.resolve(tree), self.end.resolve(tree))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::richtext::markup::{parse_fragment, to_markup};

    #[test]
    fn test_split_text_node_two_offsets() {
        let mut tree = NodeTree::new();
        let text = tree.create_text("123456");
        let slices = split_text_node(&tree, text, 1, Some(3)).unwrap();
        assert_eq!(slices.before, "1");
        assert_eq!(slices.mid, "23");
        assert_eq!(slices.after, "456");
    }

    #[test]
    fn test_split_text_node_one_offset() {
        let mut tree = NodeTree::new();
        let text = tree.create_text("123456");
        let slices = split_text_node(&tree, text, 4, None).unwrap();
        assert_eq!(slices.before, "1234");
        assert_eq!(slices.mid, "56");
        assert_eq!(slices.after, "");
    }

    #[test]
    fn test_split_text_node_counts_chars() {
        let mut tree = NodeTree::new();
        let text = tree.create_text("äöü€x");
        let slices = split_text_node(&tree, text, 1, Some(4)).unwrap();
        assert_eq!(slices.before, "ä");
        assert_eq!(slices.mid, "öü€");
        assert_eq!(slices.after, "x");
    }

    #[test]
    fn test_split_text_node_rejects_bad_offsets() {
        let mut tree = NodeTree::new();
        let text = tree.create_text("abc");
        assert_eq!(
            split_text_node(&tree, text, 4, None),
            Err(EditError::InvalidOffset { offset: 4, len: 3 })
        );
        assert_eq!(
            split_text_node(&tree, text, 2, Some(1)),
            Err(EditError::InvalidOffset { offset: 1, len: 3 })
        );
        let span = tree.create_element(Tag::Span);
        assert_eq!(split_text_node(&tree, span, 0, None), Err(EditError::NotText(span)));
    }

    #[test]
    fn test_split_text_node_round_trip() {
        let mut tree = NodeTree::new();
        let data = "hello wörld";
        let text = tree.create_text(data);
        let len = data.chars().count();
        for a in 0..=len {
            for b in a..=len {
                let s = split_text_node(&tree, text, a, Some(b)).unwrap();
                assert_eq!(format!("{}{}{}", s.before, s.mid, s.after), data);
                assert_eq!(s.before.chars().count(), a);
                assert_eq!(s.mid.chars().count(), b - a);
            }
        }
    }

    #[test]
    fn test_split_range_clean_boundaries_is_noop() {
        let mut tree = NodeTree::new();
        let root = parse_fragment(&mut tree, "<div>123456</div><div>abc</div>");
        let first = tree.children(tree.children(root)[0])[0];
        let second = tree.children(tree.children(root)[1])[0];

        let mut range = Range::new(first, 0, second, 3);
        split_range(&mut tree, &mut range).unwrap();
        assert_eq!(to_markup(&tree, root), "<div>123456</div><div>abc</div>");

        let mut range = Range::new(first, 0, first, 6);
        split_range(&mut tree, &mut range).unwrap();
        assert_eq!(to_markup(&tree, root), "<div>123456</div><div>abc</div>");
    }

    #[test]
    fn test_split_range_adjusts_element_end() {
        let mut tree = NodeTree::new();
        let root = parse_fragment(&mut tree, "<div>123456<br></div>");
        let row = tree.children(root)[0];
        let text = tree.children(row)[0];

        let mut range = Range::new(text, 2, row, 2);
        split_range(&mut tree, &mut range).unwrap();
        assert_eq!(to_markup(&tree, root), "<div>12<span>3456</span><br></div>");
        assert_eq!(range.end, Boundary::new(row, 3));
    }

    #[test]
    fn test_iterator_walks_between_rows() {
        let mut tree = NodeTree::new();
        let root = parse_fragment(&mut tree, "<div>a</div><div>b</div><div>c</div>");
        let rows = tree.children(root).to_vec();
        let a = tree.children(rows[0])[0];
        let c = tree.children(rows[2])[0];

        let visited: Vec<_> = RangeIterator::new(&tree, &Range::new(a, 0, c, 1)).collect();
        assert_eq!(visited, vec![a, rows[1], tree.children(rows[1])[0], rows[2], c]);
    }

    #[test]
    fn test_iterator_skip_descendants() {
        let mut tree = NodeTree::new();
        let root = parse_fragment(&mut tree, "<div>a</div><div>b</div>");
        let rows = tree.children(root).to_vec();

        let mut visited = Vec::new();
        iterate_subtree(&tree, &Range::new(root, 0, root, 2), |node| {
            visited.push(node);
            true
        });
        assert_eq!(visited, rows);
    }

    #[test]
    fn test_iterator_collapsed_yields_container() {
        let mut tree = NodeTree::new();
        let root = parse_fragment(&mut tree, "<div>abc</div>");
        let text = tree.children(tree.children(root)[0])[0];
        let visited: Vec<_> = RangeIterator::new(&tree, &Range::new(text, 1, text, 1)).collect();
        assert_eq!(visited, vec![text]);
    }

    #[test]
    fn test_anchored_boundary_follows_moved_child() {
        let mut tree = NodeTree::new();
        let root = parse_fragment(&mut tree, "<ul><li><br></li></ul>");
        let item = tree.children(tree.children(root)[0])[0];
        let anchor = AnchoredBoundary::capture(&tree, Boundary::new(item, 0));

        let row = tree.create_element(Tag::Row);
        tree.append_child(root, row);
        let moved = tree.take_children(item);
        tree.append_children(row, moved);

        assert_eq!(anchor.resolve(&tree), Boundary::new(row, 0));
    }

    #[test]
    fn test_anchored_boundary_settles_into_text() {
        let mut tree = NodeTree::new();
        let root = parse_fragment(&mut tree, "<ul><li>ab</li><li>cd</li></ul>");
        let list = tree.children(root)[0];
        let items = tree.children(list).to_vec();
        let ab = tree.children(items[0])[0];
        let cd = tree.children(items[1])[0];

        assert_eq!(
            AnchoredBoundary::capture(&tree, Boundary::new(list, 1)),
            AnchoredBoundary::Text(Boundary::new(cd, 0))
        );
        assert_eq!(
            AnchoredBoundary::capture(&tree, Boundary::new(list, 1)).resolve(&tree),
            Boundary::new(cd, 0)
        );
        assert_eq!(
            AnchoredBoundary::capture(&tree, Boundary::new(items[0], 1)),
            AnchoredBoundary::Text(Boundary::new(ab, 2))
        );
    }
}

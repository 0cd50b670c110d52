// Inline Style Application
// Applies style deltas to the text of an already split range and reports
// which styles and block kinds a selection has in common.

use tracing::trace;

use super::node_tree::{ListKind, NodeId, NodeTree, Tag, TitleLevel};
use super::range::{Range, RangeIterator, touched_rows};
use super::style::{StyleDelta, StyleMap};

/// Block-level shape of a row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Paragraph,
    Title(TitleLevel),
    List(ListKind),
}

impl BlockKind {
    pub fn of_row(tree: &NodeTree, row: NodeId) -> BlockKind {
        match tree.first_child(row).and_then(|c| tree.tag(c)) {
            Some(Tag::List(kind)) => BlockKind::List(*kind),
            Some(Tag::Title(level)) => BlockKind::Title(*level),
            _ => BlockKind::Paragraph,
        }
    }
}

/// Text nodes whose content lies inside `range`. An end boundary at offset 0
/// of a text node does not select any of it.
fn selected_text(tree: &NodeTree, range: &Range) -> Vec<NodeId> {
    RangeIterator::new(tree, range)
        .filter(|&n| tree.is_text(n))
        .filter(|&n| range.is_collapsed() || !(n == range.end.node && range.end.offset == 0))
        .collect()
}

/// Move the span directly around `text` out of every enclosing span.
///
/// Each enclosing span is cut in two around it; the pieces keep their style
/// and the hoisted span takes over the enclosing declarations its own do not
/// override. Afterwards the direct span carries the text's effective style.
fn hoist_span(tree: &mut NodeTree, text: NodeId) {
    let Some(span) = tree.parent(text) else {
        return;
    };
    if !tree.has_tag(span, |t| *t == Tag::Span) {
        return;
    }
    while let Some(outer) = tree.parent(span).filter(|&p| tree.has_tag(p, |t| *t == Tag::Span)) {
        trace!(%span, %outer, "hoisting nested span");
        let outer_style = tree.style(outer).cloned().unwrap_or_default();
        let siblings = tree.children(outer).to_vec();
        let index = tree.child_index(span).unwrap_or(0);

        if index > 0 {
            let before = tree.create_styled(Tag::Span, outer_style.clone());
            tree.insert_before(outer, before);
            tree.append_children(before, siblings[..index].iter().copied());
        }
        if index + 1 < siblings.len() {
            let after = tree.create_styled(Tag::Span, outer_style.clone());
            tree.insert_after(outer, after);
            tree.append_children(after, siblings[index + 1..].iter().copied());
        }

        let mut style = outer_style;
        if let Some(own) = tree.style(span) {
            style.overlay(own);
        }
        if let Some(current) = tree.style_mut(span) {
            *current = style;
        }
        tree.insert_before(outer, span);
        tree.remove(outer);
    }
}

/// Apply `delta` to every text node inside `range`.
///
/// Text already wrapped in a span has that span's style updated, after the
/// span is hoisted out of any spans around it; text sitting directly in a
/// block is wrapped in a new span carrying the delta. The range should have
/// been split first and the caller normalizes afterwards. Spans enclosing the
/// selected text may be replaced, so callers re-derive element boundaries.
pub fn apply_inline_styles(tree: &mut NodeTree, range: &Range, delta: &StyleDelta) {
    for text in selected_text(tree, range) {
        hoist_span(tree, text);
        let Some(parent) = tree.parent(text) else {
            continue;
        };
        match tree.tag(parent) {
            Some(Tag::Span) => {
                if let Some(style) = tree.style_mut(parent) {
                    style.apply(delta);
                }
            }
            Some(tag) if tag.holds_inline() => {
                let mut style = StyleMap::new();
                style.apply(delta);
                let span = tree.create_styled(Tag::Span, style);
                tree.wrap(text, span);
            }
            _ => trace!(%text, "text outside any block left unstyled"),
        }
    }
}

/// Style of a text node as seen by the reader: all enclosing spans up to the
/// block, inner declarations winning
pub fn effective_style(tree: &NodeTree, text: NodeId) -> StyleMap {
    let mut spans = Vec::new();
    let mut current = tree.parent(text);
    while let Some(node) = current {
        if !tree.has_tag(node, |t| *t == Tag::Span) {
            break;
        }
        spans.push(node);
        current = tree.parent(node);
    }

    let mut style = StyleMap::new();
    for span in spans.into_iter().rev() {
        if let Some(inner) = tree.style(span) {
            style.overlay(inner);
        }
    }
    style
}

/// Declarations every selected text node agrees on
pub fn intersection_style(tree: &NodeTree, range: &Range) -> StyleMap {
    let mut common: Option<StyleMap> = None;
    for text in selected_text(tree, range) {
        let style = effective_style(tree, text);
        match &mut common {
            Some(acc) => acc.intersect(&style),
            None => common = Some(style),
        }
    }
    common.unwrap_or_default()
}

/// Block kind shared by every row the range touches
pub fn intersection_block_kind(tree: &NodeTree, range: &Range) -> Option<BlockKind> {
    let mut kinds = touched_rows(tree, range)
        .into_iter()
        .map(|row| BlockKind::of_row(tree, row));
    let first = kinds.next()?;
    kinds.all(|k| k == first).then_some(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::richtext::markup::{parse_fragment, to_markup};
    use crate::richtext::style::StyleProperty;

    #[test]
    fn test_wraps_bare_text_and_updates_spans() {
        let mut tree = NodeTree::new();
        let root = parse_fragment(&mut tree, "<div>ab</div><div><span style=\"font-style: italic;\">cd</span></div>");
        let rows = tree.children(root).to_vec();
        let ab = tree.children(rows[0])[0];
        let cd = tree.children(tree.children(rows[1])[0])[0];

        let delta = StyleDelta::single(StyleProperty::FontWeight, Some("bold"));
        apply_inline_styles(&mut tree, &Range::new(ab, 0, cd, 2), &delta);

        assert_eq!(
            to_markup(&tree, root),
            "<div><span style=\"font-weight: bold;\">ab</span></div>\
             <div><span style=\"font-weight: bold; font-style: italic;\">cd</span></div>"
        );
    }

    #[test]
    fn test_end_at_offset_zero_is_not_styled() {
        let mut tree = NodeTree::new();
        let root = parse_fragment(&mut tree, "<div>ab</div><div>cd</div>");
        let rows = tree.children(root).to_vec();
        let ab = tree.children(rows[0])[0];
        let cd = tree.children(rows[1])[0];

        let delta = StyleDelta::single(StyleProperty::FontStyle, Some("italic"));
        apply_inline_styles(&mut tree, &Range::new(ab, 0, cd, 0), &delta);
        assert_eq!(
            to_markup(&tree, root),
            "<div><span style=\"font-style: italic;\">ab</span></div><div>cd</div>"
        );
    }

    #[test]
    fn test_intersection_style() {
        let mut tree = NodeTree::new();
        let root = parse_fragment(
            &mut tree,
            "<div><span style=\"font-weight: bold; font-style: italic;\">a</span>\
             <span style=\"font-weight: bold;\">b</span></div>",
        );
        let row = tree.children(root)[0];
        let a = tree.children(tree.children(row)[0])[0];
        let b = tree.children(tree.children(row)[1])[0];

        let both = intersection_style(&tree, &Range::new(a, 0, b, 1));
        assert_eq!(both.to_declarations(), "font-weight: bold;");

        let caret = intersection_style(&tree, &Range::new(a, 1, a, 1));
        assert_eq!(caret.get(StyleProperty::FontStyle), Some("italic"));
    }

    #[test]
    fn test_intersection_block_kind() {
        let mut tree = NodeTree::new();
        let root = parse_fragment(&mut tree, "<div><ul><li>a</li></ul></div><div>b</div>");
        let rows = tree.children(root).to_vec();
        let a = tree.descendants(rows[0]).find(|&n| tree.is_text(n)).unwrap();
        let b = tree.children(rows[1])[0];

        assert_eq!(
            intersection_block_kind(&tree, &Range::new(a, 0, a, 1)),
            Some(BlockKind::List(ListKind::Unordered))
        );
        assert_eq!(intersection_block_kind(&tree, &Range::new(a, 0, b, 1)), None);
    }
}

// Paste Normalizer
// Merges clipboard content into the row model: the payload is parsed (or
// synthesized from plain text), sanitized, flattened into one inline segment
// plus a sequence of rows, and spliced in at the caret.

use tracing::{debug, trace};

use super::error::{EditError, EditResult};
use super::markup::parse_fragment;
use super::node_tree::{NodeId, NodeTree, Tag};
use super::normalize::{NormalizeOptions, normalize};
use super::range::{Boundary, settle, split_text_node};
use super::style::{StyleAllowList, StyleMap};
use crate::config::{PasteConfig, UnknownTagPolicy};

/// The forms clipboard data can be requested in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Markup,
    PlainText,
}

/// Source of pasted data. An empty string means "nothing of this kind".
pub trait ClipboardPayload {
    fn payload(&self, kind: PayloadKind) -> String;
}

/// Clipboard contents held in memory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticPayload {
    pub markup: String,
    pub plain_text: String,
}

impl StaticPayload {
    pub fn markup(markup: impl Into<String>) -> Self {
        StaticPayload {
            markup: markup.into(),
            plain_text: String::new(),
        }
    }

    pub fn plain_text(text: impl Into<String>) -> Self {
        StaticPayload {
            markup: String::new(),
            plain_text: text.into(),
        }
    }
}

impl ClipboardPayload for StaticPayload {
    fn payload(&self, kind: PayloadKind) -> String {
        match kind {
            PayloadKind::Markup => self.markup.clone(),
            PayloadKind::PlainText => self.plain_text.clone(),
        }
    }
}

/// How foreign markup is cleaned up before it enters the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasteRules {
    pub allow_list: StyleAllowList,
    pub unknown_tags: UnknownTagPolicy,
    /// Lowercase names of foreign tags that become rows
    pub block_tags: Vec<String>,
}

impl Default for PasteRules {
    fn default() -> Self {
        PasteConfig::default().rules()
    }
}

/// Pasted content split the way it is merged into the document
#[derive(Debug, Default, PartialEq, Eq)]
struct PastedContent {
    /// Inline nodes merged into the caret row
    inline: Vec<NodeId>,
    /// Children of each row inserted after the caret row
    rows: Vec<Vec<NodeId>>,
    /// Parsed fragment the nodes were taken from, freed once they are placed
    fragment: Option<NodeId>,
}

impl PastedContent {
    fn is_empty(&self) -> bool {
        self.inline.is_empty() && self.rows.is_empty()
    }

    /// Free everything that was read but not placed
    fn discard(self, tree: &mut NodeTree) {
        let rows = self.rows.into_iter().flatten();
        for node in self.inline.into_iter().chain(rows).chain(self.fragment) {
            tree.remove(node);
        }
    }

    /// Free the leftovers of the parsed fragment once its content is placed
    fn release_fragment(&self, tree: &mut NodeTree) {
        if let Some(fragment) = self.fragment {
            tree.remove(fragment);
        }
    }
}

/// Strip disallowed styles and resolve foreign tags below `parent`
fn sanitize(tree: &mut NodeTree, parent: NodeId, rules: &PasteRules) {
    for child in tree.children(parent).to_vec() {
        if tree.is_text(child) {
            continue;
        }
        sanitize(tree, child, rules);

        let foreign = match tree.tag(child) {
            Some(Tag::Other(name)) => Some(name.clone()),
            _ => None,
        };
        if let Some(name) = foreign {
            if rules.block_tags.contains(&name) {
                tree.set_tag(child, Tag::Row);
            } else {
                match rules.unknown_tags {
                    UnknownTagPolicy::Flatten => {
                        trace!(tag = %name, "flattening unknown tag");
                        tree.unwrap(child);
                        tree.remove(child);
                        continue;
                    }
                    UnknownTagPolicy::Drop => {
                        trace!(tag = %name, "dropping unknown tag");
                        tree.remove(child);
                        continue;
                    }
                }
            }
        }

        let is_span = tree.has_tag(child, |t| *t == Tag::Span);
        if let Some(style) = tree.style_mut(child) {
            if is_span {
                rules.allow_list.sanitize(style);
            } else {
                *style = StyleMap::new();
            }
        }

        match tree.tag(child) {
            Some(Tag::List(_)) => adopt_stray_items(tree, child),
            Some(Tag::ListItem | Tag::Title(_)) => inline_blocks(tree, child),
            _ => {}
        }
    }
}

fn is_blank_text(tree: &NodeTree, node: NodeId) -> bool {
    tree.text(node).is_some_and(|t| t.trim().is_empty())
}

/// Give every child of `list` that is not an item an item of its own;
/// whitespace between items is dropped
fn adopt_stray_items(tree: &mut NodeTree, list: NodeId) {
    for child in tree.children(list).to_vec() {
        if tree.has_tag(child, |t| *t == Tag::ListItem) {
            continue;
        }
        if is_blank_text(tree, child) {
            tree.remove(child);
            continue;
        }
        let item = tree.create_element(Tag::ListItem);
        tree.wrap(child, item);
        inline_blocks(tree, item);
    }
}

struct InlineLines {
    nodes: Vec<NodeId>,
    wrappers: Vec<NodeId>,
    /// A block ended; the next inline node starts a new line
    pending_break: bool,
}

impl InlineLines {
    fn at_line_start(&self, tree: &NodeTree) -> bool {
        self.pending_break
            || self
                .nodes
                .last()
                .is_none_or(|&n| tree.has_tag(n, |t| *t == Tag::Break))
    }

    fn collect(&mut self, tree: &mut NodeTree, nodes: Vec<NodeId>) {
        for node in nodes {
            if tree.has_tag(node, |t| t.is_block() || matches!(t, Tag::Other(_))) {
                self.pending_break = !self.nodes.is_empty();
                let children = tree.children(node).to_vec();
                self.collect(tree, children);
                self.wrappers.push(node);
                self.pending_break = !self.nodes.is_empty();
                continue;
            }
            if is_blank_text(tree, node) && self.at_line_start(tree) {
                self.wrappers.push(node);
                continue;
            }
            if std::mem::take(&mut self.pending_break)
                && !self.nodes.last().is_some_and(|&n| tree.has_tag(n, |t| *t == Tag::Break))
            {
                let line_break = tree.create_element(Tag::Break);
                self.nodes.push(line_break);
            }
            self.nodes.push(node);
        }
    }
}

/// Replace the block descendants of `container` by their inline content,
/// one line per block with a break between lines. Whitespace next to a
/// block edge is dropped.
fn inline_blocks(tree: &mut NodeTree, container: NodeId) {
    if !tree
        .children(container)
        .iter()
        .any(|&c| tree.has_tag(c, |t| t.is_block() || matches!(t, Tag::Other(_))))
    {
        return;
    }

    trace!(%container, "inlining nested blocks");
    let children = tree.take_children(container);
    let mut lines = InlineLines {
        nodes: Vec::new(),
        wrappers: Vec::new(),
        pending_break: false,
    };
    lines.collect(tree, children);
    tree.append_children(container, lines.nodes);
    for wrapper in lines.wrappers {
        tree.remove(wrapper);
    }
}

struct Flattener<'a> {
    tree: &'a NodeTree,
    rows: Vec<Vec<NodeId>>,
    run: Vec<NodeId>,
}

impl Flattener<'_> {
    fn blank(&self, nodes: &[NodeId]) -> bool {
        nodes
            .iter()
            .all(|&n| self.tree.text(n).is_some_and(|t| t.trim().is_empty()))
    }

    /// End the current line. Blank runs only make a row when a break ends them.
    fn flush(&mut self, line_break: bool) {
        let run = std::mem::take(&mut self.run);
        if line_break || !self.blank(&run) {
            self.rows.push(run);
        }
    }

    fn walk(&mut self, nodes: &[NodeId]) {
        let tree = self.tree;
        for &node in nodes {
            match tree.tag(node) {
                Some(Tag::Row | Tag::ListItem | Tag::Root | Tag::Other(_)) => {
                    self.flush(false);
                    self.walk(tree.children(node));
                    self.flush(false);
                }
                Some(Tag::List(_)) if tree.children(node).is_empty() => {
                    trace!(%node, "skipping list without items");
                }
                Some(Tag::List(_) | Tag::Title(_)) => {
                    self.flush(false);
                    self.rows.push(vec![node]);
                }
                Some(Tag::Break) => self.flush(true),
                Some(Tag::Span) | None => self.run.push(node),
            }
        }
    }
}

fn ends_line(tree: &NodeTree, node: NodeId) -> bool {
    tree.has_tag(node, |t| t.is_block() || *t == Tag::Break || matches!(t, Tag::Other(_)))
}

/// Inline content before the first block is merged at the caret; every block
/// (and any inline content trailing a nested block) becomes a row.
fn flatten(tree: &NodeTree, fragment: NodeId) -> PastedContent {
    let children = tree.children(fragment);
    let split = children
        .iter()
        .position(|&c| ends_line(tree, c))
        .unwrap_or(children.len());

    let mut flattener = Flattener {
        tree,
        rows: Vec::new(),
        run: Vec::new(),
    };
    let inline = if flattener.blank(&children[..split]) {
        Vec::new()
    } else {
        children[..split].to_vec()
    };

    let rest = match children.get(split) {
        Some(&first) if tree.has_tag(first, |t| *t == Tag::Break) => &children[split + 1..],
        _ => &children[split..],
    };
    flattener.walk(rest);
    flattener.flush(false);

    PastedContent {
        inline,
        rows: flattener.rows,
        fragment: Some(fragment),
    }
}

/// First line inline, every further line a row of its own
fn from_plain_text(tree: &mut NodeTree, text: &str) -> PastedContent {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut lines = text.split('\n');
    let mut line_nodes = |line: &str| {
        if line.is_empty() {
            Vec::new()
        } else {
            vec![tree.create_text(line)]
        }
    };

    let inline = lines.next().map(&mut line_nodes).unwrap_or_default();
    let rows = lines.map(line_nodes).collect();
    PastedContent {
        inline,
        rows,
        fragment: None,
    }
}

fn read_payload(
    tree: &mut NodeTree,
    payload: &impl ClipboardPayload,
    rules: &PasteRules,
) -> PastedContent {
    let markup = payload.payload(PayloadKind::Markup);
    if !markup.trim().is_empty() {
        let fragment = parse_fragment(tree, &markup);
        sanitize(tree, fragment, rules);
        let content = flatten(tree, fragment);
        if !content.is_empty() {
            return content;
        }
        tree.remove(fragment);
        debug!("markup payload had no content, trying plain text");
    }

    let text = payload.payload(PayloadKind::PlainText);
    if text.is_empty() {
        return PastedContent::default();
    }
    from_plain_text(tree, &text)
}

/// Split the caret's text node if needed and return where inline content goes.
///
/// An element caret is first moved down to the equivalent position in the
/// deepest container, so a caret on a row hosting a list lands in an item.
fn insertion_point(tree: &mut NodeTree, caret: Boundary) -> EditResult<(NodeId, usize)> {
    let len = tree.node_length(caret.node);
    if caret.offset > len {
        return Err(EditError::InvalidOffset {
            offset: caret.offset,
            len,
        });
    }
    let caret = settle(tree, caret);
    let len = tree.node_length(caret.node);
    if !tree.is_text(caret.node) {
        let hosts_list = tree
            .children(caret.node)
            .iter()
            .any(|&c| tree.has_tag(c, |t| matches!(t, Tag::List(_))));
        if hosts_list || !tree.has_tag(caret.node, |t| t.holds_inline() || *t == Tag::Span) {
            return Err(EditError::NoRow(caret.node));
        }
        return Ok((caret.node, caret.offset));
    }

    let parent = tree.parent(caret.node).ok_or(EditError::NoRow(caret.node))?;
    let index = tree.child_index(caret.node).unwrap_or(0);
    if caret.offset == 0 {
        return Ok((parent, index));
    }
    if caret.offset < len {
        let slices = split_text_node(tree, caret.node, 0, Some(caret.offset))?;
        tree.set_text(caret.node, slices.mid);
        let tail = tree.create_text(slices.after);
        tree.insert_after(caret.node, tail);
    }
    Ok((parent, index + 1))
}

/// Paste `payload` at `caret`.
///
/// Returns the caret position after the pasted inline content, or `None` when
/// the payload held nothing to paste.
pub fn paste(
    tree: &mut NodeTree,
    root: NodeId,
    caret: Boundary,
    payload: &impl ClipboardPayload,
    rules: &PasteRules,
) -> EditResult<Option<Boundary>> {
    let row = tree
        .closest_with_tag(caret.node, |t| *t == Tag::Row)
        .ok_or(EditError::NoRow(caret.node))?;

    let content = read_payload(tree, payload, rules);
    if content.is_empty() {
        debug!("nothing to paste");
        return Ok(None);
    }
    debug!(inline = content.inline.len(), rows = content.rows.len(), "pasting");

    let (parent, index) = match insertion_point(tree, caret) {
        Ok(point) => point,
        Err(err) => {
            content.discard(tree);
            return Err(err);
        }
    };
    for (i, &node) in content.inline.iter().enumerate() {
        tree.insert_child(parent, index + i, node);
    }
    let mut caret = Boundary::new(parent, index + content.inline.len());

    let mut previous = row;
    for children in &content.rows {
        let new_row = tree.create_element(Tag::Row);
        tree.append_children(new_row, children.iter().copied());
        tree.insert_after(previous, new_row);
        previous = new_row;
    }
    content.release_fragment(tree);

    normalize(
        tree,
        root,
        std::slice::from_mut(&mut caret),
        NormalizeOptions::default(),
    );
    Ok(Some(caret))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::richtext::markup::to_markup;
    use crate::richtext::row_document::RowDocument;

    fn paste_into(doc: &str, row: usize, offset: usize, payload: StaticPayload) -> (RowDocument, Option<Boundary>) {
        let mut doc = RowDocument::from_markup(doc);
        let caret = doc.boundary_at(row, offset).unwrap();
        let root = doc.root();
        let caret = paste(doc.tree_mut(), root, caret, &payload, &PasteRules::default()).unwrap();
        (doc, caret)
    }

    #[test]
    fn test_flatten_nested_blocks() {
        let mut tree = NodeTree::new();
        let fragment = parse_fragment(&mut tree, "ab<span>c</span><div>1<div>2</div>3</div><br>");
        let content = flatten(&tree, fragment);

        assert_eq!(content.inline.len(), 2);
        let texts: Vec<String> = content
            .rows
            .iter()
            .map(|row| row.iter().map(|&n| tree.text_content(n)).collect())
            .collect();
        assert_eq!(texts, vec!["1", "2", "3", ""]);
    }

    #[test]
    fn test_sanitize_block_tags_and_styles() {
        let mut tree = NodeTree::new();
        let fragment = parse_fragment(
            &mut tree,
            "<p style=\"color: red;\"><b>x</b><span style=\"font-size: 9px; font-style: italic;\">y</span></p>",
        );
        sanitize(&mut tree, fragment, &PasteRules::default());
        assert_eq!(
            to_markup(&tree, fragment),
            "<div>x<span style=\"font-style: italic;\">y</span></div>"
        );
    }

    #[test]
    fn test_sanitize_inlines_blocks_in_list_items() {
        let mut tree = NodeTree::new();
        let fragment = parse_fragment(&mut tree, "<ul>x<li><p>a</p> <p>b</p></li></ul>");
        sanitize(&mut tree, fragment, &PasteRules::default());
        assert_eq!(to_markup(&tree, fragment), "<ul><li>x</li><li>a<br>b</li></ul>");
    }

    #[test]
    fn test_drop_policy() {
        let mut tree = NodeTree::new();
        let fragment = parse_fragment(&mut tree, "a<font>b</font>c");
        let rules = PasteRules {
            unknown_tags: UnknownTagPolicy::Drop,
            ..PasteRules::default()
        };
        sanitize(&mut tree, fragment, &rules);
        assert_eq!(to_markup(&tree, fragment), "ac");
    }

    #[test]
    fn test_caret_after_inline_segment() {
        let (doc, caret) = paste_into("<div>111</div>", 0, 1, StaticPayload::plain_text("text"));
        assert_eq!(doc.to_markup(), "<div>1text11</div>");
        let text = doc.tree().children(doc.rows()[0])[0];
        assert_eq!(caret, Some(Boundary::new(text, 5)));
    }

    #[test]
    fn test_empty_payload_is_noop() {
        let (doc, caret) = paste_into("<div>111</div>", 0, 1, StaticPayload::default());
        assert_eq!(doc.to_markup(), "<div>111</div>");
        assert_eq!(caret, None);
    }

    #[test]
    fn test_markup_without_content_falls_back_to_text() {
        let payload = StaticPayload {
            markup: "<!-- nothing -->".to_string(),
            plain_text: "x".to_string(),
        };
        let (doc, _) = paste_into("<div>ab</div>", 0, 1, payload);
        assert_eq!(doc.to_markup(), "<div>axb</div>");
    }

    #[test]
    fn test_paste_into_empty_row() {
        let (doc, _) = paste_into("<div></div>", 0, 0, StaticPayload::plain_text("hi\r\n\r\nthere"));
        assert_eq!(doc.to_markup(), "<div>hi</div><div><br></div><div>there</div>");
    }

    #[test]
    fn test_caret_outside_row() {
        let mut tree = NodeTree::new();
        let root = tree.create_element(Tag::Root);
        let result = paste(
            &mut tree,
            root,
            Boundary::new(root, 0),
            &StaticPayload::plain_text("x"),
            &PasteRules::default(),
        );
        assert_eq!(result, Err(EditError::NoRow(root)));
    }
}

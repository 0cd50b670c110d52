// Normalize
// Post-mutation pass: drops empty inline nodes and lists, merges adjacent text nodes
// and equally styled spans, and keeps a caret placeholder in empty blocks.
// Boundaries handed in are rewritten as the nodes they point into change.
// Nodes merged away or dropped are freed.

use tracing::trace;

use super::node_tree::{NodeId, NodeKind, NodeTree, Tag};
use super::range::{Boundary, Range};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Replace spans whose style map is empty by their children
    pub unwrap_empty_spans: bool,
}

impl NormalizeOptions {
    pub fn unwrapping_empty_spans() -> Self {
        NormalizeOptions {
            unwrap_empty_spans: true,
        }
    }
}

/// Normalize the subtree under `root`, keeping `tracked` boundaries valid
pub fn normalize(
    tree: &mut NodeTree,
    root: NodeId,
    tracked: &mut [Boundary],
    options: NormalizeOptions,
) {
    let mut normalizer = Normalizer {
        tree,
        tracked,
        options,
    };
    normalizer.run(root);
}

/// Normalize the subtree under `root` and carry `range` through it
pub fn normalize_range(
    tree: &mut NodeTree,
    root: NodeId,
    range: &mut Range,
    options: NormalizeOptions,
) {
    let mut boundaries = range.boundaries();
    normalize(tree, root, &mut boundaries, options);
    range.set_boundaries(boundaries);
}

struct Normalizer<'a> {
    tree: &'a mut NodeTree,
    tracked: &'a mut [Boundary],
    options: NormalizeOptions,
}

impl Normalizer<'_> {
    fn run(&mut self, node: NodeId) {
        let children = self.tree.children(node).to_vec();
        for child in children {
            if !self.tree.is_text(child) {
                self.run(child);
            }
        }
        self.clean_children(node);
        self.fix_placeholder(node);
    }

    fn is_span(&self, id: NodeId) -> bool {
        self.tree.has_tag(id, |t| *t == Tag::Span)
    }

    fn clean_children(&mut self, parent: NodeId) {
        let mut i = 0;
        while i < self.tree.children(parent).len() {
            let child = self.tree.children(parent)[i];

            let (removable, unwrappable) = match self.tree.kind(child) {
                NodeKind::Text(data) => (data.is_empty(), false),
                NodeKind::Element { tag: Tag::Span, style } => (
                    self.tree.children(child).is_empty(),
                    self.options.unwrap_empty_spans && style.is_empty(),
                ),
                NodeKind::Element { tag: Tag::List(_), .. } => (self.tree.children(child).is_empty(), false),
                NodeKind::Element { .. } => (false, false),
            };
            if removable {
                self.remove(parent, i);
                continue;
            }
            if unwrappable {
                self.unwrap_at(parent, i);
                continue;
            }

            if i > 0 {
                let previous = self.tree.children(parent)[i - 1];
                if self.tree.is_text(previous) && self.tree.is_text(child) {
                    self.merge_text(parent, i);
                    continue;
                }
                if self.is_span(previous)
                    && self.is_span(child)
                    && self.tree.style(previous) == self.tree.style(child)
                {
                    self.merge_spans(parent, i);
                    continue;
                }
            }
            i += 1;
        }
    }

    fn remove(&mut self, parent: NodeId, index: usize) {
        let child = self.tree.children(parent)[index];
        for b in self.tracked.iter_mut() {
            if b.node == parent && b.offset > index {
                b.offset -= 1;
            } else if b.node == child {
                *b = Boundary::new(parent, index);
            }
        }
        self.tree.remove(child);
    }

    fn unwrap_at(&mut self, parent: NodeId, index: usize) {
        let span = self.tree.children(parent)[index];
        let count = self.tree.children(span).len();
        trace!(%span, "unwrapping unstyled span");
        for b in self.tracked.iter_mut() {
            if b.node == parent && b.offset > index {
                b.offset += count - 1;
            } else if b.node == span {
                *b = Boundary::new(parent, index + b.offset);
            }
        }
        self.tree.unwrap(span);
        self.tree.remove(span);
    }

    /// Append the text at `index` to the text before it
    fn merge_text(&mut self, parent: NodeId, index: usize) {
        let children = self.tree.children(parent);
        let (previous, current) = (children[index - 1], children[index]);
        let previous_len = self.tree.node_length(previous);
        for b in self.tracked.iter_mut() {
            if b.node == current {
                *b = Boundary::new(previous, previous_len + b.offset);
            } else if b.node == parent && b.offset == index {
                *b = Boundary::new(previous, previous_len);
            } else if b.node == parent && b.offset > index {
                b.offset -= 1;
            }
        }

        let mut merged = self.tree.text(previous).unwrap_or_default().to_string();
        merged.push_str(self.tree.text(current).unwrap_or_default());
        self.tree.set_text(previous, merged);
        self.tree.remove(current);
    }

    /// Move the children of the span at `index` into the equally styled span before it
    fn merge_spans(&mut self, parent: NodeId, index: usize) {
        let children = self.tree.children(parent);
        let (previous, current) = (children[index - 1], children[index]);
        let previous_count = self.tree.children(previous).len();
        for b in self.tracked.iter_mut() {
            if b.node == current {
                *b = Boundary::new(previous, previous_count + b.offset);
            } else if b.node == parent && b.offset == index {
                *b = Boundary::new(previous, previous_count);
            } else if b.node == parent && b.offset > index {
                b.offset -= 1;
            }
        }

        let moved = self.tree.take_children(current);
        self.tree.append_children(previous, moved);
        self.tree.remove(current);
        self.clean_children(previous);
    }

    fn fix_placeholder(&mut self, node: NodeId) {
        if !self.tree.has_tag(node, Tag::holds_inline) {
            return;
        }

        let children = self.tree.children(node);
        if children.is_empty() {
            let placeholder = self.tree.create_element(Tag::Break);
            self.tree.append_child(node, placeholder);
            return;
        }

        // A trailing break only holds the caret once the block has text
        let last = children.len() - 1;
        if last > 0
            && self.tree.has_tag(children[last], |t| *t == Tag::Break)
            && !self.tree.text_content(node).is_empty()
        {
            self.remove(node, last);
        }
    }
}

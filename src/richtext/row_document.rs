// Row Document
// The editable document: a root element whose children are rows.
// Every text node belongs to exactly one row.

use std::fmt;

use super::markup::{outer_markup, parse_fragment, to_markup};
use super::node_tree::{NodeId, NodeTree, Tag};
use super::normalize::{NormalizeOptions, normalize};
use super::range::Boundary;

/// The document tree together with its root
#[derive(Debug, Clone)]
pub struct RowDocument {
    tree: NodeTree,
    root: NodeId,
}

impl RowDocument {
    /// A document with a single empty row
    pub fn new() -> Self {
        let mut tree = NodeTree::new();
        let root = tree.create_element(Tag::Root);
        let mut doc = RowDocument { tree, root };
        doc.ensure_row();
        doc.normalize(&mut [], NormalizeOptions::default());
        doc
    }

    /// Build the document from existing markup. Top-level `div`s become
    /// rows; runs of anything else are gathered into rows of their own.
    pub fn from_markup(markup: &str) -> Self {
        let mut tree = NodeTree::new();
        let root = parse_fragment(&mut tree, markup);

        let mut pending: Option<NodeId> = None;
        for child in tree.take_children(root) {
            if tree.has_tag(child, |t| *t == Tag::Row) {
                pending = None;
                tree.append_child(root, child);
                continue;
            }
            if tree.text(child).is_some_and(|t| t.trim().is_empty() && t.contains('\n')) {
                tree.remove(child);
                continue;
            }
            let row = match pending {
                Some(row) => row,
                None => {
                    let row = tree.create_element(Tag::Row);
                    tree.append_child(root, row);
                    pending = Some(row);
                    row
                }
            };
            tree.append_child(row, child);
        }

        let mut doc = RowDocument { tree, root };
        doc.ensure_row();
        doc.normalize(&mut [], NormalizeOptions::default());
        doc
    }

    fn ensure_row(&mut self) {
        if self.tree.children(self.root).is_empty() {
            let row = self.tree.create_element(Tag::Row);
            self.tree.append_child(self.root, row);
        }
    }

    pub fn tree(&self) -> &NodeTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut NodeTree {
        &mut self.tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn rows(&self) -> &[NodeId] {
        self.tree.children(self.root)
    }

    pub fn row_count(&self) -> usize {
        self.rows().len()
    }

    /// Row containing `node` (the node itself if it is a row)
    pub fn row_of(&self, node: NodeId) -> Option<NodeId> {
        self.tree.closest_with_tag(node, |t| *t == Tag::Row)
    }

    /// Plain text of every row, in order
    pub fn row_texts(&self) -> Vec<String> {
        self.rows()
            .iter()
            .map(|&row| self.tree.text_content(row))
            .collect()
    }

    /// Inner markup of the whole document
    pub fn to_markup(&self) -> String {
        to_markup(&self.tree, self.root)
    }

    /// Resolve a character offset within a row's plain text to a boundary.
    ///
    /// An offset at the seam of two text nodes resolves to the end of the first.
    pub fn boundary_at(&self, row_index: usize, offset: usize) -> Option<Boundary> {
        let row = *self.rows().get(row_index)?;
        let mut seen = 0usize;
        let mut last_text = None;
        for node in self.tree.descendants(row) {
            if !self.tree.is_text(node) {
                continue;
            }
            let len = self.tree.node_length(node);
            if offset <= seen + len {
                return Some(Boundary::new(node, offset - seen));
            }
            seen += len;
            last_text = Some(node);
        }
        match last_text {
            None if offset == 0 => Some(Boundary::new(row, 0)),
            _ => None,
        }
    }

    /// Run the normalize pass over the whole document
    pub fn normalize(&mut self, tracked: &mut [Boundary], options: NormalizeOptions) {
        normalize(&mut self.tree, self.root, tracked, options);
    }
}

impl Default for RowDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RowDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "RowDocument ({} rows):", self.row_count())?;
        for (i, &row) in self.rows().iter().enumerate() {
            writeln!(f, "  [{}] {}", i, outer_markup(&self.tree, row))?;
        }
        Ok(())
    }
}

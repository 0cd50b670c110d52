// Node Tree
// Arena-backed document tree made of text nodes and tagged elements.
// A node keeps its NodeId when it is moved, so stored (node, offset) pairs
// stay meaningful across structural edits that move rather than recreate.
// Removed nodes give their slot back; the slot's generation is bumped so a
// stale NodeId never aliases the node that reuses it.

use std::cmp::Ordering;
use std::fmt;

use super::style::StyleMap;

/// Stable identity of a node inside a [`NodeTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

impl NodeId {
    pub fn index(self) -> usize {
        self.index
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.generation == 0 {
            write!(f, "#{}", self.index)
        } else {
            write!(f, "#{}v{}", self.index, self.generation)
        }
    }
}

/// Ordered or unordered list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListKind {
    Unordered,
    Ordered,
}

impl ListKind {
    pub fn tag_name(self) -> &'static str {
        match self {
            ListKind::Unordered => "ul",
            ListKind::Ordered => "ol",
        }
    }

    pub fn from_tag_name(name: &str) -> Option<Self> {
        match name {
            "ul" => Some(ListKind::Unordered),
            "ol" => Some(ListKind::Ordered),
            _ => None,
        }
    }
}

/// Heading level a row can be promoted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TitleLevel {
    H1,
    H2,
    H3,
}

impl TitleLevel {
    pub fn tag_name(self) -> &'static str {
        match self {
            TitleLevel::H1 => "h1",
            TitleLevel::H2 => "h2",
            TitleLevel::H3 => "h3",
        }
    }

    pub fn from_tag_name(name: &str) -> Option<Self> {
        match name {
            "h1" => Some(TitleLevel::H1),
            "h2" => Some(TitleLevel::H2),
            "h3" => Some(TitleLevel::H3),
            _ => None,
        }
    }
}

/// Element tags understood by the editor
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    /// Container of the top-level rows (or of a detached paste fragment)
    Root,
    /// Block container, one paragraph of the document
    Row,
    /// Inline wrapper carrying a style map
    Span,
    List(ListKind),
    ListItem,
    Title(TitleLevel),
    /// Line break; an empty block holds one so the caret can be placed in it
    Break,
    /// Markup tag without editor semantics (only found in paste fragments)
    Other(String),
}

impl Tag {
    /// Map a markup tag name to an editor tag
    pub fn from_name(name: &str) -> Tag {
        let name = name.to_ascii_lowercase();
        if let Some(kind) = ListKind::from_tag_name(&name) {
            return Tag::List(kind);
        }
        if let Some(level) = TitleLevel::from_tag_name(&name) {
            return Tag::Title(level);
        }
        match name.as_str() {
            "div" => Tag::Row,
            "span" => Tag::Span,
            "li" => Tag::ListItem,
            "br" => Tag::Break,
            _ => Tag::Other(name),
        }
    }

    /// Markup tag name
    pub fn name(&self) -> &str {
        match self {
            Tag::Root => "root",
            Tag::Row => "div",
            Tag::Span => "span",
            Tag::List(kind) => kind.tag_name(),
            Tag::ListItem => "li",
            Tag::Title(level) => level.tag_name(),
            Tag::Break => "br",
            Tag::Other(name) => name,
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(
            self,
            Tag::Row | Tag::List(_) | Tag::ListItem | Tag::Title(_)
        )
    }

    /// Blocks whose direct children are inline content
    pub fn holds_inline(&self) -> bool {
        matches!(self, Tag::Row | Tag::ListItem | Tag::Title(_))
    }
}

/// Payload of a node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Text(String),
    Element { tag: Tag, style: StyleMap },
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    data: Option<NodeData>,
}

/// Arena owning every node of a document and of its detached fragments.
///
/// Detached nodes stay alive until [`NodeTree::remove`] frees them. A child
/// always has exactly one parent: every insertion detaches the node first.
/// Accessing a removed node panics.
#[derive(Debug, Clone, Default)]
pub struct NodeTree {
    slots: Vec<Slot>,
    free: Vec<usize>,
}

impl NodeTree {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let data = NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        };
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.data = Some(data);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        self.slots.push(Slot {
            generation: 0,
            data: Some(data),
        });
        NodeId {
            index: self.slots.len() - 1,
            generation: 0,
        }
    }

    fn node(&self, id: NodeId) -> &NodeData {
        match self.slots.get(id.index) {
            Some(Slot {
                generation,
                data: Some(data),
            }) if *generation == id.generation => data,
            _ => panic!("node {id} was removed"),
        }
    }

    fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        match self.slots.get_mut(id.index) {
            Some(Slot {
                generation,
                data: Some(data),
            }) if *generation == id.generation => data,
            _ => panic!("node {id} was removed"),
        }
    }

    pub fn create_text(&mut self, data: impl Into<String>) -> NodeId {
        self.push(NodeKind::Text(data.into()))
    }

    pub fn create_element(&mut self, tag: Tag) -> NodeId {
        self.create_styled(tag, StyleMap::new())
    }

    pub fn create_styled(&mut self, tag: Tag, style: StyleMap) -> NodeId {
        self.push(NodeKind::Element { tag, style })
    }

    /// Whether `id` refers to a node that has not been removed
    pub fn contains(&self, id: NodeId) -> bool {
        self.slots
            .get(id.index)
            .is_some_and(|slot| slot.generation == id.generation && slot.data.is_some())
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of slots the arena holds, live or free
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Detach `id` and free it together with its whole subtree
    pub fn remove(&mut self, id: NodeId) {
        if !self.contains(id) {
            return;
        }
        self.detach(id);
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            let slot = &mut self.slots[node.index];
            if let Some(data) = slot.data.take() {
                stack.extend(data.children);
            }
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(node.index);
        }
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Text(_))
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Text(data) => Some(data),
            NodeKind::Element { .. } => None,
        }
    }

    /// Replace the data of a text node. Elements are left untouched.
    pub fn set_text(&mut self, id: NodeId, data: impl Into<String>) {
        if let NodeKind::Text(current) = &mut self.node_mut(id).kind {
            *current = data.into();
        }
    }

    pub fn tag(&self, id: NodeId) -> Option<&Tag> {
        match self.kind(id) {
            NodeKind::Element { tag, .. } => Some(tag),
            NodeKind::Text(_) => None,
        }
    }

    pub fn has_tag(&self, id: NodeId, pred: impl Fn(&Tag) -> bool) -> bool {
        self.tag(id).is_some_and(pred)
    }

    pub fn set_tag(&mut self, id: NodeId, new_tag: Tag) {
        if let NodeKind::Element { tag, .. } = &mut self.node_mut(id).kind {
            *tag = new_tag;
        }
    }

    pub fn style(&self, id: NodeId) -> Option<&StyleMap> {
        match self.kind(id) {
            NodeKind::Element { style, .. } => Some(style),
            NodeKind::Text(_) => None,
        }
    }

    pub fn style_mut(&mut self, id: NodeId) -> Option<&mut StyleMap> {
        match &mut self.node_mut(id).kind {
            NodeKind::Element { style, .. } => Some(style),
            NodeKind::Text(_) => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).last().copied()
    }

    pub fn child_index(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.child_index(id)?;
        self.children(parent).get(index + 1).copied()
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.child_index(id)?;
        index
            .checked_sub(1)
            .and_then(|i| self.children(parent).get(i).copied())
    }

    /// Character count for text nodes, child count for elements
    pub fn node_length(&self, id: NodeId) -> usize {
        match self.kind(id) {
            NodeKind::Text(data) => data.chars().count(),
            NodeKind::Element { .. } => self.children(id).len(),
        }
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id)
            .filter_map(|n| self.text(n))
            .collect()
    }

    /// Pre-order walk over `id` and everything below it
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            tree: self,
            stack: vec![id],
        }
    }

    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    /// Nearest node, starting at `id` itself and walking up, that satisfies `pred`
    pub fn closest_ancestor(
        &self,
        id: NodeId,
        pred: impl Fn(&NodeTree, NodeId) -> bool,
    ) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(n) = current {
            if pred(self, n) {
                return Some(n);
            }
            current = self.parent(n);
        }
        None
    }

    /// Nearest element, starting at `id` itself, whose tag satisfies `pred`
    pub fn closest_with_tag(&self, id: NodeId, pred: impl Fn(&Tag) -> bool) -> Option<NodeId> {
        self.closest_ancestor(id, |tree, n| tree.has_tag(n, &pred))
    }

    /// Remove a node from its parent. The node and its subtree stay alive.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.node_mut(id).parent.take() {
            self.node_mut(parent).children.retain(|&c| c != id);
        }
    }

    /// Insert `child` into `parent` at `index` (clamped). The index is
    /// interpreted after `child` has been detached from its old position.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.detach(child);
        let children = &mut self.node_mut(parent).children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.node_mut(child).parent = Some(parent);
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_child(parent, usize::MAX, child);
    }

    pub fn append_children(&mut self, parent: NodeId, children: impl IntoIterator<Item = NodeId>) {
        for child in children {
            self.append_child(parent, child);
        }
    }

    /// Insert `node` as the previous sibling of `reference`
    pub fn insert_before(&mut self, reference: NodeId, node: NodeId) {
        self.detach(node);
        if let (Some(parent), Some(index)) = (self.parent(reference), self.child_index(reference)) {
            self.insert_child(parent, index, node);
        }
    }

    /// Insert `node` as the next sibling of `reference`
    pub fn insert_after(&mut self, reference: NodeId, node: NodeId) {
        self.detach(node);
        if let (Some(parent), Some(index)) = (self.parent(reference), self.child_index(reference)) {
            self.insert_child(parent, index + 1, node);
        }
    }

    /// Detach and return all children of `id`, in order
    pub fn take_children(&mut self, id: NodeId) -> Vec<NodeId> {
        let children = std::mem::take(&mut self.node_mut(id).children);
        for &child in &children {
            self.node_mut(child).parent = None;
        }
        children
    }

    /// Replace the element `id` by its children in its parent
    pub fn unwrap(&mut self, id: NodeId) -> Vec<NodeId> {
        let (Some(parent), Some(index)) = (self.parent(id), self.child_index(id)) else {
            return Vec::new();
        };
        let children = self.take_children(id);
        self.detach(id);
        for (offset, &child) in children.iter().enumerate() {
            self.insert_child(parent, index + offset, child);
        }
        children
    }

    /// Put `wrapper` at the position of `node` and move `node` inside it
    pub fn wrap(&mut self, node: NodeId, wrapper: NodeId) {
        if let (Some(parent), Some(index)) = (self.parent(node), self.child_index(node)) {
            self.insert_child(parent, index, wrapper);
        }
        self.append_child(wrapper, node);
    }

    /// Child of `ancestor` on the path down to `node`, if `ancestor` is a proper ancestor
    fn child_toward(&self, ancestor: NodeId, node: NodeId) -> Option<NodeId> {
        let mut current = node;
        while let Some(parent) = self.parent(current) {
            if parent == ancestor {
                return Some(current);
            }
            current = parent;
        }
        None
    }

    fn path_from_root(&self, node: NodeId) -> Vec<NodeId> {
        let mut path = vec![node];
        let mut current = node;
        while let Some(parent) = self.parent(current) {
            path.push(parent);
            current = parent;
        }
        path.reverse();
        path
    }

    /// Pre-order position of two nodes; an ancestor sorts before its descendants
    pub fn compare_tree_order(&self, a: NodeId, b: NodeId) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        let path_a = self.path_from_root(a);
        let path_b = self.path_from_root(b);
        if path_a[0] != path_b[0] {
            // Disconnected trees have no document order
            return a.cmp(&b);
        }
        let shared = path_a
            .iter()
            .zip(path_b.iter())
            .take_while(|(x, y)| x == y)
            .count();
        match (path_a.get(shared), path_b.get(shared)) {
            (None, _) => Ordering::Less,
            (_, None) => Ordering::Greater,
            (Some(&x), Some(&y)) => self.child_index(x).cmp(&self.child_index(y)),
        }
    }

    /// Compare two boundary points `(container, offset)` in document order
    pub fn compare_points(&self, a: (NodeId, usize), b: (NodeId, usize)) -> Ordering {
        let ((node_a, offset_a), (node_b, offset_b)) = (a, b);
        if node_a == node_b {
            return offset_a.cmp(&offset_b);
        }
        if let Some(child) = self.child_toward(node_a, node_b) {
            let index = self.child_index(child).unwrap_or(0);
            return if offset_a <= index {
                Ordering::Less
            } else {
                Ordering::Greater
            };
        }
        if let Some(child) = self.child_toward(node_b, node_a) {
            let index = self.child_index(child).unwrap_or(0);
            return if offset_b <= index {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }
        self.compare_tree_order(node_a, node_b)
    }
}

/// Pre-order iterator returned by [`NodeTree::descendants`]
pub struct Descendants<'a> {
    tree: &'a NodeTree,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let node = self.stack.pop()?;
        self.stack
            .extend(self.tree.children(node).iter().rev().copied());
        Some(node)
    }
}

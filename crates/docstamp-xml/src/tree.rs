//! Document tree stored in a flat arena.

use std::collections::HashSet;

/// Handle of a node inside a [`Document`].
///
/// Handles stay valid for the lifetime of the document, including after the
/// node has been detached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Element name and attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Qualified name including the prefix (e.g. `w:p`).
    pub name: String,
    /// Attributes in document order.
    pub attrs: Vec<(String, String)>,
}

/// Payload of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// XML document with arena-allocated nodes.
///
/// The document owns every node ever created through it. Detaching a node
/// only unlinks it from its parent, so [`NodeId`]s of detached subtrees can
/// still be cloned or re-inserted.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    declaration: bool,
}

/// Return the local part of a qualified name (`w:tbl` -> `tbl`).
pub fn local_name(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

/// Whether an element only carries formatting for its parent.
///
/// Property elements (`w:pPr`, `w:rPr`, `w:tcPr`, `w:tblGrid`, ...) are copied
/// into both halves when a node is split and never count as content.
pub fn is_property_element(name: &str) -> bool {
    let local = local_name(name);
    local.ends_with("Pr") || local == "tblGrid"
}

impl Document {
    /// Create a document with an empty root element.
    #[must_use]
    pub fn new(root_name: &str) -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            declaration: false,
        };
        doc.root = doc.create_element(root_name);
        doc
    }

    /// Root element of the document.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Whether the serialized document starts with an XML declaration.
    pub fn has_declaration(&self) -> bool {
        self.declaration
    }

    pub fn set_declaration(&mut self, declaration: bool) {
        self.declaration = declaration;
    }

    /// Create a detached element.
    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push(NodeData::Element(Element {
            name: name.to_owned(),
            attrs: Vec::new(),
        }))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_owned()))
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            data,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.node(id).data
    }

    /// Qualified element name, `None` for text nodes.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).data {
            NodeData::Element(element) => Some(&element.name),
            NodeData::Text(_) => None,
        }
    }

    /// Whether `id` is an element with the given qualified name.
    pub fn is_element(&self, id: NodeId, name: &str) -> bool {
        self.name(id) == Some(name)
    }

    /// Attribute value of an element.
    pub fn attr(&self, id: NodeId, key: &str) -> Option<&str> {
        match &self.node(id).data {
            NodeData::Element(element) => element
                .attrs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            NodeData::Text(_) => None,
        }
    }

    /// Set an attribute, replacing an existing value. Ignored on text nodes.
    pub fn set_attr(&mut self, id: NodeId, key: &str, value: &str) {
        if let NodeData::Element(element) = &mut self.node_mut(id).data {
            if let Some(slot) = element.attrs.iter_mut().find(|(k, _)| k == key) {
                value.clone_into(&mut slot.1);
            } else {
                element.attrs.push((key.to_owned(), value.to_owned()));
            }
        }
    }

    /// Remove an attribute, returning its previous value.
    pub fn remove_attr(&mut self, id: NodeId, key: &str) -> Option<String> {
        if let NodeData::Element(element) = &mut self.node_mut(id).data {
            let pos = element.attrs.iter().position(|(k, _)| k == key)?;
            return Some(element.attrs.remove(pos).1);
        }
        None
    }

    /// Content of a text node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).data {
            NodeData::Text(text) => Some(text),
            NodeData::Element(_) => None,
        }
    }

    /// Replace the text content of a node.
    ///
    /// For a text node the content is replaced in place. For an element all
    /// children are detached and replaced by a single text node (or nothing
    /// when `text` is empty).
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        if let NodeData::Text(existing) = &mut self.node_mut(id).data {
            text.clone_into(existing);
            return;
        }
        self.take_children(id);
        if !text.is_empty() {
            let node = self.create_text(text);
            self.append_child(id, node);
        }
    }

    /// Concatenated text of all descendant text nodes.
    pub fn inner_text(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match &self.node(id).data {
            NodeData::Text(text) => out.push_str(text),
            NodeData::Element(_) => {
                for &child in &self.node(id).children {
                    self.collect_text(child, out);
                }
            }
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Element children, skipping text nodes.
    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.node(id)
            .children
            .iter()
            .copied()
            .filter(|&child| matches!(self.node(child).data, NodeData::Element(_)))
    }

    /// Position of a node among its parent's children.
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.children(parent).get(index + 1).copied()
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        index
            .checked_sub(1)
            .and_then(|i| self.children(parent).get(i).copied())
    }

    /// Proper ancestors of a node, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            current: self.parent(id),
        }
    }

    /// Nearest ancestor with the given element name.
    pub fn ancestor_named(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.ancestors(id).find(|&a| self.is_element(a, name))
    }

    /// All descendants in document order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Whether `ancestor` is a proper ancestor of `node`.
    pub fn is_ancestor_of(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors(node).any(|a| a == ancestor)
    }

    /// Whether the node is connected to the document root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        id == self.root || self.is_ancestor_of(self.root, id)
    }

    /// Nearest node that is a proper ancestor of both `a` and `b`.
    pub fn common_ancestor(&self, a: NodeId, b: NodeId) -> Option<NodeId> {
        let of_a: HashSet<NodeId> = self.ancestors(a).collect();
        self.ancestors(b).find(|candidate| of_a.contains(candidate))
    }

    /// Child of `parent` that is `node` or contains it.
    pub fn child_containing(&self, parent: NodeId, node: NodeId) -> Option<NodeId> {
        if self.parent(node) == Some(parent) {
            return Some(node);
        }
        self.ancestors(node)
            .find(|&a| self.parent(a) == Some(parent))
    }

    /// Siblings strictly between `first` and `last`.
    ///
    /// Returns an empty list when the nodes do not share a parent or `last`
    /// does not follow `first`.
    pub fn nodes_between(&self, first: NodeId, last: NodeId) -> Vec<NodeId> {
        let (Some(parent), Some(last_parent)) = (self.parent(first), self.parent(last)) else {
            return Vec::new();
        };
        if parent != last_parent {
            return Vec::new();
        }
        let children = self.children(parent);
        let (Some(start), Some(end)) = (
            children.iter().position(|&c| c == first),
            children.iter().position(|&c| c == last),
        ) else {
            return Vec::new();
        };
        if end <= start {
            return Vec::new();
        }
        children[start + 1..end].to_vec()
    }

    /// Unlink a node from its parent. The subtree stays in the arena.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.node(id).parent {
            self.node_mut(parent).children.retain(|&c| c != id);
            self.node_mut(id).parent = None;
        }
    }

    /// Append `child` as the last child of `parent`, detaching it first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.node_mut(parent).children.push(child);
        self.node_mut(child).parent = Some(parent);
    }

    /// Insert `node` as the previous sibling of `reference`.
    ///
    /// Does nothing when `reference` has no parent.
    pub fn insert_before(&mut self, reference: NodeId, node: NodeId) {
        self.insert_at_offset(reference, node, 0);
    }

    /// Insert `node` as the next sibling of `reference`.
    ///
    /// Does nothing when `reference` has no parent.
    pub fn insert_after(&mut self, reference: NodeId, node: NodeId) {
        self.insert_at_offset(reference, node, 1);
    }

    fn insert_at_offset(&mut self, reference: NodeId, node: NodeId, offset: usize) {
        let Some(parent) = self.parent(reference) else {
            tracing::warn!("Insertion next to a detached node ignored");
            return;
        };
        self.detach(node);
        let Some(index) = self.index_in_parent(reference) else {
            return;
        };
        self.node_mut(parent).children.insert(index + offset, node);
        self.node_mut(node).parent = Some(parent);
    }

    /// Detach all children of `parent` and return them in order.
    pub fn take_children(&mut self, parent: NodeId) -> Vec<NodeId> {
        let children = std::mem::take(&mut self.node_mut(parent).children);
        for &child in &children {
            self.node_mut(child).parent = None;
        }
        children
    }

    /// Copy a node and its whole subtree. The copy is detached.
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let data = self.node(id).data.clone();
        let copy = self.push(data);
        let children = self.node(id).children.clone();
        for child in children {
            let child_copy = self.deep_clone(child);
            self.append_child(copy, child_copy);
        }
        copy
    }

    /// Copy an element with its attributes and property children only.
    pub(crate) fn shell_clone(&mut self, id: NodeId) -> NodeId {
        let data = self.node(id).data.clone();
        let copy = self.push(data);
        let properties: Vec<NodeId> = self
            .element_children(id)
            .filter(|&c| self.name(c).is_some_and(is_property_element))
            .collect();
        for property in properties {
            let property_copy = self.deep_clone(property);
            self.append_child(copy, property_copy);
        }
        copy
    }

    /// Whether a node has children other than property elements.
    pub fn has_content(&self, id: NodeId) -> bool {
        self.children(id).iter().any(|&c| match &self.node(c).data {
            NodeData::Text(text) => !text.is_empty(),
            NodeData::Element(element) => !is_property_element(&element.name),
        })
    }
}

/// Iterator over the proper ancestors of a node.
pub struct Ancestors<'a> {
    doc: &'a Document,
    current: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.current?;
        self.current = self.doc.parent(current);
        Some(current)
    }
}

//! # Document Tree
//!
//! An arena of XML nodes. Parents own their children through index lists,
//! attributes hang off their owning element in declaration order.
//!
//! ## Lifecycle of a node
//!
//! ```text
//! create_* → (detached) → append_child / insert_after / set_attribute_node → (attached)
//!                ↑                                                  │
//!                └──────────────────── detach ←─────────────────────┘
//!                                        │
//!                                     discard
//! ```
//!
//! Detaching keeps the subtree alive so an edit can be rolled back.
//! Discarding frees it for good.

use crate::error::{DomError, DomResult};
use crate::node::{NodeData, NodeId, NodeKind};

#[derive(Debug, Clone)]
pub struct XmlDocument {
    nodes: Vec<Option<NodeData>>,
}

impl Default for XmlDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlDocument {
    /// Create an empty document holding only the document node
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(NodeData::new(NodeKind::Document, "", ""))],
        }
    }

    pub fn document_node(&self) -> NodeId {
        NodeId(0)
    }

    /// The single top-level element, if one is attached
    pub fn root_element(&self) -> Option<NodeId> {
        self.element_children(self.document_node()).next()
    }

    /// Install `element` as the document element, replacing any previous one
    pub fn set_root_element(&mut self, element: NodeId) -> DomResult<()> {
        if let Some(old) = self.root_element() {
            self.detach(old)?;
        }
        self.append_child(self.document_node(), element)
    }

    // Lookups

    fn data(&self, id: NodeId) -> DomResult<&NodeData> {
        self.nodes
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or(DomError::NodeNotFound(id))
    }

    fn data_mut(&mut self, id: NodeId) -> DomResult<&mut NodeData> {
        self.nodes
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(DomError::NodeNotFound(id))
    }

    /// Whether the handle still refers to a live node
    pub fn contains(&self, id: NodeId) -> bool {
        self.data(id).is_ok()
    }

    /// Nodes still alive in the arena, attached or not
    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.data(id).ok().map(|n| n.kind)
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.kind(id) == Some(NodeKind::Element)
    }

    pub fn is_attribute(&self, id: NodeId) -> bool {
        self.kind(id) == Some(NodeKind::Attribute)
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        self.kind(id) == Some(NodeKind::Text)
    }

    /// Node name; empty for text, the document node and dead handles
    pub fn name(&self, id: NodeId) -> &str {
        self.data(id).map(|n| n.name.as_str()).unwrap_or("")
    }

    /// Parent element for elements and text, owning element for attributes
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.data(id).ok().and_then(|n| n.parent)
    }

    /// Element and text children in document order
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.data(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |child| self.is_element(*child))
    }

    /// Attributes in declaration order
    pub fn attributes(&self, id: NodeId) -> &[NodeId] {
        self.data(id).map(|n| n.attributes.as_slice()).unwrap_or(&[])
    }

    pub fn attribute(&self, element: NodeId, name: &str) -> Option<NodeId> {
        self.attributes(element)
            .iter()
            .copied()
            .find(|attr| self.name(*attr) == name)
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        if self.is_attribute(id) {
            self.attributes(parent).iter().position(|a| *a == id)
        } else {
            self.children(parent).iter().position(|c| *c == id)
        }
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        if self.is_attribute(id) {
            return None;
        }
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        index
            .checked_sub(1)
            .and_then(|prev| self.children(parent).get(prev).copied())
    }

    /// Whether the node is reachable from the document node
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.document_node() {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Text a leaf editor shows for the node.
    ///
    /// Attributes yield their value, text nodes their content and elements the
    /// content of their first text child (empty when there is none).
    pub fn node_value(&self, id: NodeId) -> String {
        let Ok(node) = self.data(id) else {
            return String::new();
        };
        match node.kind {
            NodeKind::Attribute | NodeKind::Text => node.value.clone(),
            NodeKind::Element => node
                .children
                .iter()
                .find(|child| self.is_text(**child))
                .map(|text| self.node_value(*text))
                .unwrap_or_default(),
            NodeKind::Document => String::new(),
        }
    }

    /// Write the text [`node_value`](Self::node_value) reads, creating a text child if needed
    pub fn set_node_value(&mut self, id: NodeId, value: &str) -> DomResult<()> {
        match self.data(id)?.kind {
            NodeKind::Attribute | NodeKind::Text => {
                self.data_mut(id)?.value = value.to_string();
                Ok(())
            }
            NodeKind::Element => {
                let existing = self
                    .children(id)
                    .iter()
                    .copied()
                    .find(|child| self.is_text(*child));
                match existing {
                    Some(text) => {
                        self.data_mut(text)?.value = value.to_string();
                        Ok(())
                    }
                    None => {
                        let text = self.create_text(value);
                        self.append_child(id, text)
                    }
                }
            }
            NodeKind::Document => Err(DomError::NotAnElement(id)),
        }
    }

    /// Size of the run of adjacent same-named element siblings containing `id`.
    ///
    /// Text between the siblings does not break the run. Always at least 1 for a live element.
    pub fn occurs(&self, id: NodeId) -> usize {
        let Some(parent) = self.parent(id) else {
            return 1;
        };
        let name = self.name(id);
        let siblings: Vec<NodeId> = self.element_children(parent).collect();
        let Some(position) = siblings.iter().position(|s| *s == id) else {
            return 1;
        };

        let before = siblings[..position]
            .iter()
            .rev()
            .take_while(|s| self.name(**s) == name)
            .count();
        let after = siblings[position + 1..]
            .iter()
            .take_while(|s| self.name(**s) == name)
            .count();

        before + 1 + after
    }

    /// Size of the first contiguous run of elements named `name` among `nodes`
    pub fn occurs_in(&self, name: &str, nodes: &[NodeId]) -> usize {
        nodes
            .iter()
            .filter(|n| self.is_element(**n))
            .skip_while(|n| self.name(**n) != name)
            .take_while(|n| self.name(**n) == name)
            .count()
    }

    // Construction

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Some(data));
        id
    }

    pub fn create_element(&mut self, name: impl Into<String>) -> NodeId {
        self.push(NodeData::new(NodeKind::Element, name, ""))
    }

    pub fn create_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) -> NodeId {
        self.push(NodeData::new(NodeKind::Attribute, name, value))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::new(NodeKind::Text, "", text))
    }

    // Structure

    fn check_insertable(&self, parent: NodeId, child: NodeId) -> DomResult<()> {
        match self.data(parent)?.kind {
            NodeKind::Element | NodeKind::Document => {}
            _ => return Err(DomError::NotAnElement(parent)),
        }
        let child_data = self.data(child)?;
        if !matches!(child_data.kind, NodeKind::Element | NodeKind::Text) {
            return Err(DomError::InvalidChild(child));
        }
        if child_data.parent.is_some() {
            return Err(DomError::StillAttached(child));
        }
        // A node may not become its own ancestor
        let mut current = Some(parent);
        while let Some(ancestor) = current {
            if ancestor == child {
                return Err(DomError::InvalidChild(child));
            }
            current = self.parent(ancestor);
        }
        Ok(())
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.check_insertable(parent, child)?;
        self.data_mut(parent)?.children.push(child);
        self.data_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Insert `child` right after `previous`, or at the front when `previous` is `None`
    pub fn insert_after(
        &mut self,
        parent: NodeId,
        previous: Option<NodeId>,
        child: NodeId,
    ) -> DomResult<()> {
        self.check_insertable(parent, child)?;
        let index = match previous {
            Some(prev) => {
                let position = self
                    .children(parent)
                    .iter()
                    .position(|c| *c == prev)
                    .ok_or(DomError::NotAChild { node: prev, parent })?;
                position + 1
            }
            None => 0,
        };
        self.data_mut(parent)?.children.insert(index, child);
        self.data_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Put `replacement` where `old` was; `old` ends up detached
    pub fn replace_child(&mut self, parent: NodeId, old: NodeId, replacement: NodeId) -> DomResult<()> {
        self.check_insertable(parent, replacement)?;
        let index = self
            .children(parent)
            .iter()
            .position(|c| *c == old)
            .ok_or(DomError::NotAChild { node: old, parent })?;
        self.data_mut(parent)?.children[index] = replacement;
        self.data_mut(replacement)?.parent = Some(parent);
        self.data_mut(old)?.parent = None;
        Ok(())
    }

    /// Attach an attribute node, returning the detached node it displaced
    pub fn set_attribute_node(&mut self, element: NodeId, attr: NodeId) -> DomResult<Option<NodeId>> {
        if !self.is_element(element) {
            return Err(DomError::NotAnElement(element));
        }
        let attr_data = self.data(attr)?;
        if attr_data.kind != NodeKind::Attribute {
            return Err(DomError::InvalidChild(attr));
        }
        if attr_data.parent.is_some() {
            return Err(DomError::StillAttached(attr));
        }

        let displaced = self.attribute(element, self.name(attr));
        match displaced {
            Some(old) => {
                let index = self
                    .index_in_parent(old)
                    .ok_or(DomError::NotAChild { node: old, parent: element })?;
                self.data_mut(element)?.attributes[index] = attr;
                self.data_mut(old)?.parent = None;
            }
            None => self.data_mut(element)?.attributes.push(attr),
        }
        self.data_mut(attr)?.parent = Some(element);
        Ok(displaced)
    }

    /// Set an attribute value, creating the attribute when missing
    pub fn set_attribute(&mut self, element: NodeId, name: &str, value: &str) -> DomResult<NodeId> {
        if let Some(existing) = self.attribute(element, name) {
            self.data_mut(existing)?.value = value.to_string();
            return Ok(existing);
        }
        let attr = self.create_attribute(name, value);
        self.set_attribute_node(element, attr)?;
        Ok(attr)
    }

    /// Detach the attribute called `name`, returning it if there was one
    pub fn remove_attribute(&mut self, element: NodeId, name: &str) -> DomResult<Option<NodeId>> {
        if !self.is_element(element) {
            return Err(DomError::NotAnElement(element));
        }
        let Some(attr) = self.attribute(element, name) else {
            return Ok(None);
        };
        self.detach(attr)?;
        Ok(Some(attr))
    }

    /// Unlink a node from its parent (or owning element). The subtree stays alive.
    pub fn detach(&mut self, id: NodeId) -> DomResult<()> {
        let data = self.data(id)?;
        let kind = data.kind;
        let Some(parent) = data.parent else {
            return Ok(());
        };
        let parent_data = self.data_mut(parent)?;
        if kind == NodeKind::Attribute {
            parent_data.attributes.retain(|a| *a != id);
        } else {
            parent_data.children.retain(|c| *c != id);
        }
        self.data_mut(id)?.parent = None;
        Ok(())
    }

    /// Free a detached subtree. Handles into it go dead.
    pub fn discard(&mut self, id: NodeId) -> DomResult<()> {
        if self.data(id)?.parent.is_some() {
            return Err(DomError::StillAttached(id));
        }
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            if let Some(slot) = self.nodes.get_mut(current.index()) {
                if let Some(data) = slot.take() {
                    pending.extend(data.children);
                    pending.extend(data.attributes);
                }
            }
        }
        Ok(())
    }

    /// Deep-copy an element subtree of `source` into this document, detached
    pub fn import_subtree(&mut self, source: &XmlDocument, node: NodeId) -> DomResult<NodeId> {
        let data = source.data(node)?;
        let copy = self.push(NodeData::new(data.kind, data.name.clone(), data.value.clone()));

        for attr in &data.attributes {
            let attr_data = source.data(*attr)?;
            let attr_copy = self.create_attribute(attr_data.name.clone(), attr_data.value.clone());
            self.data_mut(attr_copy)?.parent = Some(copy);
            self.data_mut(copy)?.attributes.push(attr_copy);
        }
        for child in &data.children {
            let child_copy = self.import_subtree(source, *child)?;
            self.data_mut(child_copy)?.parent = Some(copy);
            self.data_mut(copy)?.children.push(child_copy);
        }

        Ok(copy)
    }

    /// Every live node in the subtree rooted at `id`, attributes included, preorder
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            if !self.contains(current) {
                continue;
            }
            out.push(current);
            pending.extend(self.children(current).iter().rev());
            pending.extend(self.attributes(current).iter().rev());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (XmlDocument, NodeId) {
        let mut doc = XmlDocument::new();
        let root = doc.create_element("root");
        doc.set_root_element(root).unwrap();
        (doc, root)
    }

    #[test]
    fn test_insert_after_none_goes_first() {
        let (mut doc, root) = sample();
        let a = doc.create_element("a");
        let b = doc.create_element("b");
        doc.append_child(root, a).unwrap();
        doc.insert_after(root, None, b).unwrap();

        assert_eq!(doc.children(root), &[b, a]);
        assert_eq!(doc.parent(b), Some(root));
    }

    #[test]
    fn test_occurs_counts_adjacent_run() {
        let (mut doc, root) = sample();
        let items: Vec<NodeId> = ["item", "item", "other", "item"]
            .iter()
            .map(|name| {
                let el = doc.create_element(*name);
                doc.append_child(root, el).unwrap();
                el
            })
            .collect();

        assert_eq!(doc.occurs(items[0]), 2);
        assert_eq!(doc.occurs(items[1]), 2);
        assert_eq!(doc.occurs(items[3]), 1);
        assert_eq!(doc.occurs_in("item", doc.children(root)), 2);
        assert_eq!(doc.occurs_in("missing", doc.children(root)), 0);
    }

    #[test]
    fn test_node_value_reads_first_text_child() {
        let (mut doc, root) = sample();
        assert_eq!(doc.node_value(root), "");

        doc.set_node_value(root, "hello").unwrap();
        assert_eq!(doc.node_value(root), "hello");
        assert_eq!(doc.children(root).len(), 1);

        doc.set_node_value(root, "again").unwrap();
        assert_eq!(doc.node_value(root), "again");
        assert_eq!(doc.children(root).len(), 1);
    }

    #[test]
    fn test_set_attribute_node_displaces_same_name() {
        let (mut doc, root) = sample();
        let first = doc.create_attribute("id", "a");
        let second = doc.create_attribute("id", "b");
        assert_eq!(doc.set_attribute_node(root, first).unwrap(), None);
        assert_eq!(doc.set_attribute_node(root, second).unwrap(), Some(first));

        assert_eq!(doc.attribute(root, "id"), Some(second));
        assert_eq!(doc.parent(first), None);
    }

    #[test]
    fn test_remove_attribute() {
        let (mut doc, root) = sample();
        let attr = doc.create_attribute("id", "a");
        doc.set_attribute_node(root, attr).unwrap();

        assert_eq!(doc.remove_attribute(root, "missing").unwrap(), None);
        assert_eq!(doc.remove_attribute(root, "id").unwrap(), Some(attr));
        assert_eq!(doc.attribute(root, "id"), None);
        assert_eq!(doc.parent(attr), None);
    }

    #[test]
    fn test_discard_requires_detached() {
        let (mut doc, root) = sample();
        let before = doc.node_count();
        let child = doc.create_element("child");
        doc.append_child(root, child).unwrap();
        doc.set_node_value(child, "text").unwrap();
        assert_eq!(doc.node_count(), before + 2);

        assert_eq!(doc.discard(child), Err(DomError::StillAttached(child)));
        doc.detach(child).unwrap();
        doc.discard(child).unwrap();
        assert!(!doc.contains(child));
        assert!(doc.children(root).is_empty());
        assert_eq!(doc.node_count(), before);
    }

    #[test]
    fn test_cannot_insert_ancestor_below_itself() {
        let (mut doc, root) = sample();
        let child = doc.create_element("child");
        doc.append_child(root, child).unwrap();
        doc.detach(root).unwrap();

        assert_eq!(doc.append_child(child, root), Err(DomError::InvalidChild(root)));
    }

    #[test]
    fn test_import_subtree_copies_attributes_and_text() {
        let (mut source, root) = sample();
        source.set_attribute(root, "kind", "x").unwrap();
        source.set_node_value(root, "text").unwrap();

        let mut target = XmlDocument::new();
        let copy = target.import_subtree(&source, root).unwrap();

        assert_eq!(target.name(copy), "root");
        assert_eq!(target.node_value(copy), "text");
        let attr = target.attribute(copy, "kind").unwrap();
        assert_eq!(target.node_value(attr), "x");
        assert!(!target.is_attached(copy));
    }
}

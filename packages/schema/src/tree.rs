//! # Constraint Tree
//!
//! Schema-derived description of the legal shape of a document, built once and
//! read-only afterwards.
//!
//! ## Structure
//!
//! ```text
//! Element ── attributes: [Attribute, ...]
//!    └── children: [Sequence | Choice | Group | Element, ...]
//!                     └── children: [Element | compositor, ...]
//! ```
//!
//! Compositors have no document counterpart. [`ConstraintTree::non_compositor_descendants`]
//! flattens them away and yields the element's direct structural children in
//! content-model order, which is what binding and edit-option derivation walk.

use crate::constraint::{
    AttributeUse, ConstraintId, ConstraintKind, ConstraintNode, Occurs, TypeRestriction,
};
use std::collections::BTreeSet;
use std::ops::Index;

#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintTree {
    nodes: Vec<ConstraintNode>,
}

impl ConstraintTree {
    /// Start a tree whose root element is `root_name`
    pub fn builder(root_name: impl Into<String>) -> TreeBuilder {
        TreeBuilder::new(root_name)
    }

    pub fn root(&self) -> ConstraintId {
        ConstraintId(0)
    }

    pub fn get(&self, id: ConstraintId) -> Option<&ConstraintNode> {
        self.nodes.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn name(&self, id: ConstraintId) -> &str {
        self.get(id).map(|n| n.name.as_str()).unwrap_or("")
    }

    pub fn kind(&self, id: ConstraintId) -> Option<ConstraintKind> {
        self.get(id).map(|n| n.kind)
    }

    pub fn parent(&self, id: ConstraintId) -> Option<ConstraintId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Content-model children (elements and compositors)
    pub fn children(&self, id: ConstraintId) -> &[ConstraintId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Attribute constraints of an element, in declaration order
    pub fn attributes(&self, id: ConstraintId) -> &[ConstraintId] {
        self.get(id).map(|n| n.attributes.as_slice()).unwrap_or(&[])
    }

    pub fn attribute(&self, element: ConstraintId, name: &str) -> Option<ConstraintId> {
        self.attributes(element)
            .iter()
            .copied()
            .find(|attr| self.name(*attr) == name)
    }

    pub fn parent_is_choice(&self, id: ConstraintId) -> bool {
        self.parent(id)
            .and_then(|parent| self.kind(parent))
            .is_some_and(|kind| kind == ConstraintKind::Choice)
    }

    /// Every alternative of the Choice `id` belongs to, `id` included.
    /// Empty when the parent is not a Choice.
    pub fn choice_alternatives(&self, id: ConstraintId) -> &[ConstraintId] {
        match self.parent(id) {
            Some(parent) if self.kind(parent) == Some(ConstraintKind::Choice) => {
                self.children(parent)
            }
            _ => &[],
        }
    }

    /// Element constraints reachable from `id` through compositors only, in content-model order
    pub fn non_compositor_descendants(&self, id: ConstraintId) -> Vec<ConstraintId> {
        let mut out = Vec::new();
        self.collect_descendants(id, &mut out);
        out
    }

    fn collect_descendants(&self, id: ConstraintId, out: &mut Vec<ConstraintId>) {
        for child in self.children(id) {
            match self.kind(*child) {
                Some(ConstraintKind::Element) => out.push(*child),
                Some(kind) if kind.is_compositor() => self.collect_descendants(*child, out),
                _ => {}
            }
        }
    }

    /// All type names in use, handy when checking which built-ins a schema needs
    pub fn distinct_type_names(&self) -> BTreeSet<&str> {
        self.nodes
            .iter()
            .filter_map(|n| n.type_name.as_deref())
            .collect()
    }
}

impl Index<ConstraintId> for ConstraintTree {
    type Output = ConstraintNode;

    fn index(&self, id: ConstraintId) -> &ConstraintNode {
        &self.nodes[id.index()]
    }
}

/// Incremental construction of a [`ConstraintTree`]
///
/// ```rust,ignore
/// let mut builder = ConstraintTree::builder("experiment");
/// let root = builder.root();
/// let seq = builder.sequence(root);
/// let block = builder.element(seq, "block", Occurs::at_least(1));
/// builder.attribute(block, "id", AttributeUse::Required);
/// let tree = builder.finish();
/// ```
#[derive(Debug, Clone)]
pub struct TreeBuilder {
    nodes: Vec<ConstraintNode>,
}

impl TreeBuilder {
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            nodes: vec![ConstraintNode::new(ConstraintKind::Element, root_name)],
        }
    }

    pub fn root(&self) -> ConstraintId {
        ConstraintId(0)
    }

    fn push(&mut self, parent: ConstraintId, mut node: ConstraintNode) -> ConstraintId {
        let id = ConstraintId(self.nodes.len() as u32);
        node.parent = Some(parent);
        let is_attribute = node.is_attribute();
        self.nodes.push(node);
        if let Some(parent_node) = self.nodes.get_mut(parent.index()) {
            if is_attribute {
                parent_node.attributes.push(id);
            } else {
                parent_node.children.push(id);
            }
        }
        id
    }

    pub fn element(&mut self, parent: ConstraintId, name: impl Into<String>, occurs: Occurs) -> ConstraintId {
        let mut node = ConstraintNode::new(ConstraintKind::Element, name);
        node.occurs = occurs;
        self.push(parent, node)
    }

    /// Element with simple content of the given type
    pub fn text_element(
        &mut self,
        parent: ConstraintId,
        name: impl Into<String>,
        occurs: Occurs,
        type_name: impl Into<String>,
    ) -> ConstraintId {
        let id = self.element(parent, name, occurs);
        self.set_type(id, type_name);
        id
    }

    pub fn attribute(
        &mut self,
        element: ConstraintId,
        name: impl Into<String>,
        attribute_use: AttributeUse,
    ) -> ConstraintId {
        let mut node = ConstraintNode::new(ConstraintKind::Attribute, name);
        node.attribute_use = Some(attribute_use);
        node.can_have_text = true;
        node.type_name = Some("anySimpleType".to_string());
        self.push(element, node)
    }

    pub fn sequence(&mut self, parent: ConstraintId) -> ConstraintId {
        self.push(parent, ConstraintNode::new(ConstraintKind::Sequence, ""))
    }

    pub fn choice(&mut self, parent: ConstraintId) -> ConstraintId {
        self.push(parent, ConstraintNode::new(ConstraintKind::Choice, ""))
    }

    pub fn group(&mut self, parent: ConstraintId) -> ConstraintId {
        self.push(parent, ConstraintNode::new(ConstraintKind::Group, ""))
    }

    /// Mutable access for settings without a dedicated method
    pub fn node_mut(&mut self, id: ConstraintId) -> Option<&mut ConstraintNode> {
        self.nodes.get_mut(id.index())
    }

    /// Give the node a simple type, which also lets it hold text
    pub fn set_type(&mut self, id: ConstraintId, type_name: impl Into<String>) -> &mut Self {
        if let Some(node) = self.node_mut(id) {
            node.type_name = Some(type_name.into());
            node.can_have_text = true;
        }
        self
    }

    pub fn set_restriction(&mut self, id: ConstraintId, restriction: TypeRestriction) -> &mut Self {
        if let Some(node) = self.node_mut(id) {
            node.restriction = Some(restriction);
        }
        self
    }

    pub fn set_default(&mut self, id: ConstraintId, value: impl Into<String>) -> &mut Self {
        if let Some(node) = self.node_mut(id) {
            node.default_value = Some(value.into());
        }
        self
    }

    pub fn set_fixed(&mut self, id: ConstraintId, value: impl Into<String>) -> &mut Self {
        if let Some(node) = self.node_mut(id) {
            node.fixed_value = Some(value.into());
        }
        self
    }

    pub fn set_annotation(&mut self, id: ConstraintId, text: impl Into<String>) -> &mut Self {
        if let Some(node) = self.node_mut(id) {
            node.annotation = Some(text.into());
        }
        self
    }

    pub fn finish(self) -> ConstraintTree {
        ConstraintTree { nodes: self.nodes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::MaxOccurs;

    /// root → sequence(a, choice(b, c), sequence(d))
    fn nested() -> (ConstraintTree, [ConstraintId; 4]) {
        let mut builder = ConstraintTree::builder("root");
        let root = builder.root();
        let seq = builder.sequence(root);
        let a = builder.element(seq, "a", Occurs::once());
        let choice = builder.choice(seq);
        let b = builder.element(choice, "b", Occurs::once());
        let c = builder.element(choice, "c", Occurs::new(1, MaxOccurs::Unbounded));
        let inner = builder.sequence(seq);
        let d = builder.element(inner, "d", Occurs::optional());
        builder.attribute(root, "version", AttributeUse::Optional);
        (builder.finish(), [a, b, c, d])
    }

    #[test]
    fn test_non_compositor_descendants_flattens_in_order() {
        let (tree, [a, b, c, d]) = nested();
        assert_eq!(tree.non_compositor_descendants(tree.root()), vec![a, b, c, d]);
        assert!(tree.non_compositor_descendants(a).is_empty());
    }

    #[test]
    fn test_choice_alternatives() {
        let (tree, [a, b, c, _]) = nested();
        assert!(tree.parent_is_choice(b));
        assert_eq!(tree.choice_alternatives(c), &[b, c]);
        assert!(!tree.parent_is_choice(a));
        assert!(tree.choice_alternatives(a).is_empty());
    }

    #[test]
    fn test_attributes_are_kept_apart_from_content() {
        let (tree, _) = nested();
        let version = tree.attribute(tree.root(), "version").unwrap();

        assert!(tree[version].is_free_optional_attribute());
        assert_eq!(tree.parent(version), Some(tree.root()));
        assert!(!tree.children(tree.root()).contains(&version));
        assert_eq!(tree.distinct_type_names().into_iter().collect::<Vec<_>>(), vec!["anySimpleType"]);
    }
}

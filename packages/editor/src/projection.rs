//! Element-only shadow tree that presentation code walks.
//!
//! Attributes and text are left out. The projection mirrors the document's
//! element structure and is patched in place on every structural edit, never
//! rebuilt wholesale except on load.

use std::collections::HashMap;
use xsdedit_dom::{NodeId, XmlDocument};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct UiNode {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone, Default)]
pub struct UiProjection {
    nodes: HashMap<NodeId, UiNode>,
    root: Option<NodeId>,
}

impl UiProjection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Project the whole document from its root element
    pub fn rebuild(&mut self, doc: &XmlDocument) {
        self.nodes.clear();
        self.root = None;
        if let Some(root) = doc.root_element() {
            self.attach(doc, root);
        }
    }

    /// Shadow `node` and its element descendants at the position the document has them.
    ///
    /// The document root becomes the projection root.
    pub fn attach(&mut self, doc: &XmlDocument, node: NodeId) {
        if !doc.is_element(node) {
            return;
        }
        let parent = doc.parent(node).filter(|p| doc.is_element(*p));
        match parent {
            Some(parent) => {
                let index = doc
                    .element_children(parent)
                    .filter(|c| *c == node || self.nodes.contains_key(c))
                    .position(|c| c == node)
                    .unwrap_or(0);
                if let Some(entry) = self.nodes.get_mut(&parent) {
                    let index = index.min(entry.children.len());
                    entry.children.insert(index, node);
                }
            }
            None => self.root = Some(node),
        }
        self.nodes.insert(
            node,
            UiNode {
                parent,
                children: Vec::new(),
            },
        );
        let children: Vec<NodeId> = doc.element_children(node).collect();
        for child in children {
            self.attach(doc, child);
        }
    }

    /// Drop the shadow of `node` and everything below it
    pub fn detach(&mut self, node: NodeId) {
        let Some(entry) = self.nodes.remove(&node) else {
            return;
        };
        match entry.parent {
            Some(parent) => {
                if let Some(parent_entry) = self.nodes.get_mut(&parent) {
                    parent_entry.children.retain(|c| *c != node);
                }
            }
            None => {
                if self.root == Some(node) {
                    self.root = None;
                }
            }
        }
        let mut pending = entry.children;
        while let Some(current) = pending.pop() {
            if let Some(removed) = self.nodes.remove(&current) {
                pending.extend(removed.children);
            }
        }
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node).and_then(|entry| entry.parent)
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(&node)
            .map(|entry| entry.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn index_of(&self, node: NodeId) -> Option<usize> {
        let parent = self.parent(node)?;
        self.children(parent).iter().position(|c| *c == node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirrors_elements_only() {
        let doc = xsdedit_dom::parse(r#"<a x="1"><b>text</b><c><d/></c></a>"#).unwrap();
        let mut projection = UiProjection::new();
        projection.rebuild(&doc);

        let root = projection.root().unwrap();
        assert_eq!(doc.name(root), "a");
        assert_eq!(projection.len(), 4);
        let names: Vec<_> = projection.children(root).iter().map(|c| doc.name(*c)).collect();
        assert_eq!(names, vec!["b", "c"]);
    }

    #[test]
    fn test_attach_keeps_document_order() {
        let mut doc = xsdedit_dom::parse("<a><b/><d/></a>").unwrap();
        let mut projection = UiProjection::new();
        projection.rebuild(&doc);

        let root = doc.root_element().unwrap();
        let b = doc.element_children(root).next().unwrap();
        let c = doc.create_element("c");
        doc.insert_after(root, Some(b), c).unwrap();
        projection.attach(&doc, c);

        assert_eq!(projection.index_of(c), Some(1));
        assert_eq!(projection.parent(c), Some(root));
    }

    #[test]
    fn test_detach_drops_subtree() {
        let doc = xsdedit_dom::parse("<a><b><c/></b></a>").unwrap();
        let mut projection = UiProjection::new();
        projection.rebuild(&doc);

        let root = doc.root_element().unwrap();
        let b = doc.element_children(root).next().unwrap();
        projection.detach(b);

        assert_eq!(projection.len(), 1);
        assert!(projection.children(root).is_empty());
    }
}

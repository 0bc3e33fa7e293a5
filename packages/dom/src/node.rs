use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle to a node inside one [`XmlDocument`](crate::XmlDocument).
///
/// Handles are plain indices. They stay valid until the node is discarded and are never
/// reused afterwards, so a stale handle fails lookups instead of aliasing a newer node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Document,
    Element,
    Attribute,
    Text,
}

#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    pub kind: NodeKind,
    /// Element or attribute name, empty for text and the document node
    pub name: String,
    /// Attribute value or text content
    pub value: String,
    /// Owning element for attributes, parent for everything else
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub attributes: Vec<NodeId>,
}

impl NodeData {
    pub fn new(kind: NodeKind, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            value: value.into(),
            parent: None,
            children: Vec::new(),
            attributes: Vec::new(),
        }
    }
}

//! Error types for the document tree

use crate::NodeId;
use thiserror::Error;

/// Result type for document tree operations
pub type DomResult<T> = Result<T, DomError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomError {
    #[error("XML syntax error at byte {position}: {message}")]
    Syntax { position: u64, message: String },

    #[error("Unbalanced end tag </{0}>")]
    UnbalancedEndTag(String),

    #[error("Document has no root element")]
    MissingRoot,

    #[error("Document has more than one root element")]
    MultipleRoots,

    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Node {0} is not an element")]
    NotAnElement(NodeId),

    #[error("Node {0} cannot be placed there")]
    InvalidChild(NodeId),

    #[error("Node {0} is still attached")]
    StillAttached(NodeId),

    #[error("Node {node} is not a child of {parent}")]
    NotAChild { node: NodeId, parent: NodeId },

    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Serialization failed: {0}")]
    Write(String),
}

impl DomError {
    pub fn syntax(position: u64, message: impl Into<String>) -> Self {
        DomError::Syntax {
            position,
            message: message.into(),
        }
    }

    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        DomError::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

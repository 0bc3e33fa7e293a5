//! Error types for the editor

use thiserror::Error;
use xsdedit_dom::{DomError, NodeId};

/// Result type for editor operations
pub type EditorResult<T> = Result<T, EditorError>;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Document does not comply with the schema of <{root}>")]
    NotCompliant { root: String },

    #[error("Mutation error: {0}")]
    Mutation(#[from] MutationError),

    #[error("Schema error: {0}")]
    Schema(#[from] xsdedit_schema::SchemaError),

    #[error("Rule file error: {0}")]
    Rules(#[from] xsdedit_rules::RuleFileError),

    #[error("Document error: {0}")]
    Dom(#[from] DomError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Misuse of the structural edit API.
///
/// Invalid values and violated rules are not errors; they show up in
/// [`ValidationResult`](crate::ValidationResult).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MutationError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Node {0} is not bound to a constraint")]
    NotBound(NodeId),

    #[error("Parent not found for node {0}")]
    ParentNotFound(NodeId),

    #[error("Node {0} is not an element")]
    NotAnElement(NodeId),

    #[error("Node {0} cannot hold text")]
    NoTextContent(NodeId),

    #[error("Replacement for {0} does not conform to its constraint")]
    NotCompliant(NodeId),

    #[error("Option '{0}' was produced for a tree that has since changed")]
    StaleOption(String),

    #[error("Constraint '{0}' cannot be materialized")]
    UnsupportedConstraint(String),

    #[error(transparent)]
    Dom(#[from] DomError),
}

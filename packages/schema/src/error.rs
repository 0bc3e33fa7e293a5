//! Error types for schema loading

use thiserror::Error;
use xsdedit_dom::DomError;

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Schema is not well-formed XML: {0}")]
    Xml(#[from] DomError),

    #[error("Not a schema document: root element is <{0}>")]
    NotASchema(String),

    #[error("No global element named '{0}'")]
    UnknownElement(String),

    #[error("Unknown type '{0}'")]
    UnknownType(String),

    #[error("Unknown group '{0}'")]
    UnknownGroup(String),

    #[error("Content model of '{0}' refers back to itself")]
    RecursiveType(String),

    #[error("Invalid occurrence bound '{0}'")]
    InvalidOccurs(String),

    #[error("Declaration is missing its '{0}' attribute")]
    MissingAttribute(&'static str),
}

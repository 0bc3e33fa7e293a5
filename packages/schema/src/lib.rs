//! # Schema Model
//!
//! What a document is allowed to look like:
//!
//! - [`ConstraintTree`]: element, attribute and compositor constraints, built once per root
//!   element by a [`ConstraintTreeBuilder`] ([`XsdSchema`] or a hand-made [`TreeBuilder`])
//! - [`ScalarValidator`]: lexical and facet checks for leaf values
//! - [`BuiltinType`]: the predefined types and how they derive from each other

mod builder;
mod constraint;
mod error;
mod tree;
mod types;
mod validator;
mod xsd;

pub use builder::ConstraintTreeBuilder;
pub use constraint::{
    AttributeUse, ConstraintId, ConstraintKind, ConstraintNode, MaxOccurs, Occurs, TypeRestriction,
};
pub use error::{SchemaError, SchemaResult};
pub use tree::{ConstraintTree, TreeBuilder};
pub use types::BuiltinType;
pub use validator::{IdLookup, NoIds, ScalarValidator};
pub use xsd::XsdSchema;

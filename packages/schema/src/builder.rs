use crate::error::SchemaResult;
use crate::tree::ConstraintTree;

/// Source of constraint trees, one per document root element name.
///
/// The editor only needs this capability from a schema; where the schema comes
/// from (an XSD file, hand-built trees in tests) is up to the implementation.
pub trait ConstraintTreeBuilder {
    fn build_constraint_tree(&self, root_element_name: &str) -> SchemaResult<ConstraintTree>;
}

impl<F> ConstraintTreeBuilder for F
where
    F: Fn(&str) -> SchemaResult<ConstraintTree>,
{
    fn build_constraint_tree(&self, root_element_name: &str) -> SchemaResult<ConstraintTree> {
        self(root_element_name)
    }
}

impl ConstraintTreeBuilder for ConstraintTree {
    /// A prebuilt tree answers only for its own root element
    fn build_constraint_tree(&self, root_element_name: &str) -> SchemaResult<ConstraintTree> {
        if self.name(self.root()) == root_element_name {
            Ok(self.clone())
        } else {
            Err(crate::SchemaError::UnknownElement(root_element_name.to_string()))
        }
    }
}

//! Rule parameters: dotted references into the document

use crate::diagnostic::Diagnostic;
use serde::{Deserialize, Serialize};
use tracing::warn;
use xsdedit_dom::{DocPath, DomError, NodeId, XmlDocument};

/// What a parameter yields when its path matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterKind {
    /// The text of an attribute or element
    NodeValue,
    /// Only whether something matched; the value is empty
    NodeSet,
}

/// Read access to the document a rule is checked against
pub trait ValueSource {
    fn select(&self, path: &DocPath) -> Vec<NodeId>;
    fn value_of(&self, node: NodeId) -> String;
}

impl ValueSource for XmlDocument {
    fn select(&self, path: &DocPath) -> Vec<NodeId> {
        XmlDocument::select(self, path)
    }

    fn value_of(&self, node: NodeId) -> String {
        self.node_value(node)
    }
}

/// A parameter value together with the node it was read from
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedParameter {
    pub value: String,
    pub node: NodeId,
}

#[derive(Debug, Clone)]
pub struct RuleParameter {
    id: String,
    name: String,
    reference: String,
    kind: ParameterKind,
    path: Result<DocPath, DomError>,
}

impl RuleParameter {
    /// Build a parameter from its rule-file form
    ///
    /// `a.b{2}.ATTRIBUTE.c` becomes `a/b[2]/@c` and `a.b.CONTENT` becomes `a/b`;
    /// both yield a value. Any other path yields a node set.
    pub fn new(id: impl Into<String>, name: impl Into<String>, reference: impl Into<String>) -> Self {
        let reference = reference.into();
        let (converted, kind) = convert_reference(&reference);
        let path = DocPath::parse(&converted);
        if let Err(error) = &path {
            warn!(reference = %reference, %error, "parameter path does not compile");
        }
        Self {
            id: id.into(),
            name: name.into(),
            reference,
            kind,
            path,
        }
    }

    /// Key literals use to refer to this parameter
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display label
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn kind(&self) -> ParameterKind {
        self.kind
    }

    pub fn path(&self) -> Option<&DocPath> {
        self.path.as_ref().ok()
    }

    /// Diagnostic explaining why this parameter can never resolve, if it can't
    pub fn diagnostic(&self) -> Option<Diagnostic> {
        self.path.as_ref().err().map(|error| {
            Diagnostic::warning(&self.reference, error.to_string())
                .with_suggestion("use dots between element names, {n} for positions")
        })
    }

    /// Resolve against the document: the first match wins
    pub fn resolve(&self, source: &dyn ValueSource) -> Option<ResolvedParameter> {
        let path = self.path.as_ref().ok()?;
        let node = source.select(path).into_iter().next()?;
        let value = match self.kind {
            ParameterKind::NodeValue => source.value_of(node),
            ParameterKind::NodeSet => String::new(),
        };
        Some(ResolvedParameter { value, node })
    }
}

fn convert_reference(reference: &str) -> (String, ParameterKind) {
    let mut path = reference.trim().replace('{', "[").replace('}', "]");
    let kind = if path.contains(".ATTRIBUTE.") {
        path = path.replace(".ATTRIBUTE.", "/@");
        ParameterKind::NodeValue
    } else if path.contains(".CONTENT") {
        path = path.replace(".CONTENT", "");
        ParameterKind::NodeValue
    } else {
        ParameterKind::NodeSet
    };
    (path.replace('.', "/"), kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_conversion() {
        assert_eq!(
            convert_reference("experiment.block{2}.ATTRIBUTE.id"),
            ("experiment/block[2]/@id".to_string(), ParameterKind::NodeValue)
        );
        assert_eq!(
            convert_reference("experiment.tr.CONTENT"),
            ("experiment/tr".to_string(), ParameterKind::NodeValue)
        );
        assert_eq!(
            convert_reference("experiment.block"),
            ("experiment/block".to_string(), ParameterKind::NodeSet)
        );
    }

    #[test]
    fn test_resolve_against_document() {
        let doc = xsdedit_dom::parse(
            r#"<experiment><block id="b1"><tr>2000</tr></block><block id="b2"/></experiment>"#,
        )
        .unwrap();

        let id = RuleParameter::new("p1", "Block id", "experiment.block{2}.ATTRIBUTE.id");
        assert_eq!(id.resolve(&doc).map(|r| r.value), Some("b2".to_string()));

        let tr = RuleParameter::new("p2", "TR", "experiment.block.tr.CONTENT");
        assert_eq!(tr.resolve(&doc).map(|r| r.value), Some("2000".to_string()));

        let blocks = RuleParameter::new("p3", "Blocks", "experiment.block");
        assert_eq!(blocks.resolve(&doc).map(|r| r.value), Some(String::new()));

        let missing = RuleParameter::new("p4", "Missing", "experiment.run.CONTENT");
        assert!(missing.resolve(&doc).is_none());
    }

    #[test]
    fn test_bad_path_never_resolves() {
        let doc = xsdedit_dom::parse("<experiment/>").unwrap();
        let bad = RuleParameter::new("p1", "Bad", "experiment.ATTRIBUTE.");
        assert!(bad.path().is_none());
        assert!(bad.resolve(&doc).is_none());
        assert!(bad.diagnostic().is_some());
    }
}

//! Rule definition documents
//!
//! ```xml
//! <edlRules>
//!   <rule ruleID="r1">
//!     <param pID="A" pName="Repetition time"><paramRef>experiment.tr.CONTENT</paramRef></param>
//!     <premise><literal>edlValidation_exists(A)</literal></premise>
//!     <conclusion><literal>edlValidation_biggerThan(A, 500)</literal></conclusion>
//!     <message>TR must exceed 500 ms.</message>
//!   </rule>
//! </edlRules>
//! ```

use crate::error::RuleFileError;
use crate::literal::Literal;
use crate::parameter::{RuleParameter, ValueSource};
use crate::rule::{Rule, RuleEvaluation, RuleId};
use std::collections::{HashMap, HashSet};
use tracing::{info, instrument, warn};
use xsdedit_dom::{NodeId, XmlDocument};

#[derive(Debug, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
    index: HashMap<RuleId, usize>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    #[instrument(skip(source))]
    pub fn from_xml_str(source: &str) -> Result<Self, RuleFileError> {
        let doc = xsdedit_dom::parse(source)?;
        let root = doc
            .root_element()
            .ok_or(RuleFileError::Xml(xsdedit_dom::DomError::MissingRoot))?;
        if doc.name(root) != "edlRules" {
            return Err(RuleFileError::UnexpectedRoot(doc.name(root).to_string()));
        }

        let mut set = RuleSet::new();
        for element in doc.element_children(root) {
            if doc.name(element) != "rule" {
                warn!(element = doc.name(element), "ignoring unknown element in rule file");
                continue;
            }
            set.insert(read_rule(&doc, element)?);
        }
        info!(rules = set.len(), "rule file loaded");
        Ok(set)
    }

    /// Add a rule; a rule with the same id is replaced
    pub fn insert(&mut self, rule: Rule) {
        match self.index.get(rule.id()) {
            Some(&position) => {
                warn!(rule = %rule.id(), "duplicate rule id replaces the earlier rule");
                self.rules[position] = rule;
            }
            None => {
                self.index.insert(rule.id().clone(), self.rules.len());
                self.rules.push(rule);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &RuleId> {
        self.rules.iter().map(Rule::id)
    }

    pub fn get(&self, id: &RuleId) -> Option<&Rule> {
        self.index.get(id).map(|&position| &self.rules[position])
    }

    pub fn get_mut(&mut self, id: &RuleId) -> Option<&mut Rule> {
        self.index.get(id).map(|&position| &mut self.rules[position])
    }

    /// Whether the rule exists and held at its last evaluation
    pub fn is_satisfied(&self, id: &RuleId) -> bool {
        self.get(id).is_some_and(Rule::is_satisfied)
    }

    /// Evaluate the named rules, skipping ids that are not in the set
    pub fn evaluate<'a>(
        &mut self,
        source: &dyn ValueSource,
        ids: impl IntoIterator<Item = &'a RuleId>,
    ) -> Vec<(RuleId, RuleEvaluation)> {
        let mut results = Vec::new();
        for id in ids {
            if let Some(rule) = self.get_mut(id) {
                results.push((id.clone(), rule.evaluate(source)));
            }
        }
        results
    }

    pub fn evaluate_all(&mut self, source: &dyn ValueSource) -> Vec<(RuleId, RuleEvaluation)> {
        self.rules
            .iter_mut()
            .map(|rule| (rule.id().clone(), rule.evaluate(source)))
            .collect()
    }

    /// Rules whose recorded nodes are fewer than their parameters
    ///
    /// Only rules present in `rules_using_nodes` are considered, i.e. rules that
    /// have been evaluated at least once.
    pub fn rules_missing_parameters(
        &self,
        rules_using_nodes: &HashMap<RuleId, HashSet<NodeId>>,
    ) -> Vec<RuleId> {
        self.rules
            .iter()
            .filter(|rule| {
                rules_using_nodes
                    .get(rule.id())
                    .is_some_and(|nodes| nodes.len() < rule.parameters().len())
            })
            .map(|rule| rule.id().clone())
            .collect()
    }
}

fn read_rule(doc: &XmlDocument, element: NodeId) -> Result<Rule, RuleFileError> {
    let id = doc
        .attribute(element, "ruleID")
        .map(|attr| doc.node_value(attr))
        .ok_or(RuleFileError::MissingRuleId)?;

    let mut parameters = Vec::new();
    let mut premise = Vec::new();
    let mut conclusion = Vec::new();
    let mut message = String::new();

    for child in doc.element_children(element) {
        match doc.name(child) {
            "param" => parameters.push(read_parameter(doc, child, &id)?),
            "premise" => premise.extend(
                doc.element_children(child)
                    .map(|literal| Literal::new(text_content(doc, literal).trim())),
            ),
            "conclusion" => {
                let literal = doc
                    .element_children(child)
                    .find(|literal| doc.name(*literal) == "literal")
                    .ok_or_else(|| RuleFileError::Malformed {
                        rule: id.clone(),
                        message: "conclusion has no literal".to_string(),
                    })?;
                conclusion.push(Literal::new(text_content(doc, literal).trim()));
            }
            "message" => message = text_content(doc, child).trim().to_string(),
            other => warn!(rule = %id, element = other, "ignoring unknown rule child"),
        }
    }

    Ok(Rule::new(RuleId::new(id), parameters, premise, conclusion, message))
}

fn read_parameter(doc: &XmlDocument, element: NodeId, rule: &str) -> Result<RuleParameter, RuleFileError> {
    let attribute = |name: &str| {
        doc.attribute(element, name)
            .map(|attr| doc.node_value(attr).trim().to_string())
            .unwrap_or_default()
    };
    let reference = doc
        .subtree(element)
        .into_iter()
        .find(|node| doc.is_element(*node) && doc.name(*node) == "paramRef")
        .map(|node| text_content(doc, node).trim().to_string())
        .ok_or_else(|| RuleFileError::Malformed {
            rule: rule.to_string(),
            message: "param has no paramRef".to_string(),
        })?;
    Ok(RuleParameter::new(attribute("pID"), attribute("pName"), reference))
}

/// Concatenated text of every text node below `node`
fn text_content(doc: &XmlDocument, node: NodeId) -> String {
    doc.subtree(node)
        .into_iter()
        .filter(|n| doc.is_text(*n))
        .map(|n| doc.node_value(n))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULES: &str = r#"
        <edlRules>
          <rule ruleID="r1">
            <param pID="A" pName="Repetition time"><paramRef>experiment.tr.CONTENT</paramRef></param>
            <premise><literal>edlValidation_exists(A)</literal></premise>
            <conclusion><literal>edlValidation_biggerThan(A, 500)</literal></conclusion>
            <message>
              TR must exceed 500 ms.
            </message>
          </rule>
          <rule ruleID="r2">
            <param pID="A" pName="a"><paramRef>experiment.a.CONTENT</paramRef></param>
            <param pID="B" pName="b"><paramRef>experiment.b.CONTENT</paramRef></param>
            <premise><literal>edlValidation_exists(A)</literal><literal>edlValidation_exists(B)</literal></premise>
            <conclusion><literal>A + B == 10</literal></conclusion>
            <message>a and b must add up to ten</message>
          </rule>
        </edlRules>
    "#;

    #[test]
    fn test_read_rule_file() {
        let set = RuleSet::from_xml_str(RULES).unwrap();
        assert_eq!(set.len(), 2);

        let r1 = set.get(&RuleId::new("r1")).unwrap();
        assert_eq!(r1.message(), "TR must exceed 500 ms.");
        assert_eq!(r1.parameters()[0].name(), "Repetition time");
        assert_eq!(r1.conclusion()[0].source(), "edlValidation_biggerThan(A, 500)");

        let r2 = set.get(&RuleId::new("r2")).unwrap();
        assert_eq!(r2.premise().len(), 2);
    }

    #[test]
    fn test_rejects_other_documents() {
        assert!(matches!(
            RuleSet::from_xml_str("<rules/>"),
            Err(RuleFileError::UnexpectedRoot(_))
        ));
        assert!(matches!(
            RuleSet::from_xml_str("<edlRules><rule/></edlRules>"),
            Err(RuleFileError::MissingRuleId)
        ));
    }

    #[test]
    fn test_rules_missing_parameters() {
        let mut set = RuleSet::from_xml_str(RULES).unwrap();
        let doc = xsdedit_dom::parse("<experiment><a>4</a></experiment>").unwrap();

        let mut using = HashMap::new();
        for (id, evaluation) in set.evaluate_all(&doc) {
            using.insert(id, evaluation.referenced_nodes.into_iter().collect::<HashSet<_>>());
        }
        let mut missing = set.rules_missing_parameters(&using);
        missing.sort();
        assert_eq!(missing, vec![RuleId::new("r1"), RuleId::new("r2")]);

        using.remove(&RuleId::new("r1"));
        assert_eq!(set.rules_missing_parameters(&using), vec![RuleId::new("r2")]);
    }
}

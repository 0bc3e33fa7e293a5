use serde::{Deserialize, Serialize};
use xsdedit_rules::{RuleId, RuleSet};

/// Outcome of validating one node.
///
/// Type validity is fixed when the result is computed. Rule satisfaction is
/// read from the rule set on demand, so the result stays current while rules
/// are re-evaluated by later edits.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    pub value_has_correct_type: bool,
    pub relevant_rules: Vec<RuleId>,
}

impl ValidationResult {
    pub fn new(value_has_correct_type: bool, relevant_rules: Vec<RuleId>) -> Self {
        Self {
            value_has_correct_type,
            relevant_rules,
        }
    }

    pub fn valid() -> Self {
        Self::new(true, Vec::new())
    }

    /// Correct type and every relevant rule satisfied
    pub fn is_valid(&self, rules: &RuleSet) -> bool {
        self.value_has_correct_type && self.relevant_rules.iter().all(|id| rules.is_satisfied(id))
    }

    /// Relevant rules that currently fail. Empty when the type is wrong,
    /// since a badly typed value says nothing about the rules.
    pub fn violated_rules<'a>(&'a self, rules: &RuleSet) -> Vec<&'a RuleId> {
        if !self.value_has_correct_type {
            return Vec::new();
        }
        self.relevant_rules
            .iter()
            .filter(|id| !rules.is_satisfied(id))
            .collect()
    }

    pub(crate) fn add_rule(&mut self, rule: &RuleId) {
        if !self.relevant_rules.contains(rule) {
            self.relevant_rules.push(rule.clone());
        }
    }

    pub(crate) fn drop_rule(&mut self, rule: &RuleId) {
        self.relevant_rules.retain(|id| id != rule);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULES: &str = r#"
        <edlRules>
          <rule ruleID="tr">
            <param pID="A" pName="a"><paramRef>root.a.CONTENT</paramRef></param>
            <premise><literal>edlValidation_exists(A)</literal></premise>
            <conclusion><literal>edlValidation_biggerThan(A, 5)</literal></conclusion>
            <message>a must exceed five</message>
          </rule>
        </edlRules>
    "#;

    #[test]
    fn test_rule_state_is_read_live() {
        let mut rules = RuleSet::from_xml_str(RULES).unwrap();
        let id = RuleId::new("tr");
        let result = ValidationResult::new(true, vec![id.clone()]);

        rules.evaluate(&xsdedit_dom::parse("<root><a>3</a></root>").unwrap(), [&id]);
        assert!(!result.is_valid(&rules));
        assert_eq!(result.violated_rules(&rules), vec![&id]);

        rules.evaluate(&xsdedit_dom::parse("<root><a>9</a></root>").unwrap(), [&id]);
        assert!(result.is_valid(&rules));
    }

    #[test]
    fn test_type_failure_wins() {
        let rules = RuleSet::new();
        let result = ValidationResult::new(false, Vec::new());
        assert!(!result.is_valid(&rules));
        assert!(result.violated_rules(&rules).is_empty());
    }
}

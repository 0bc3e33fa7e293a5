//! # Tree Manager
//!
//! Keeps the document, the constraint tree and the UI projection in step, and
//! owns every per-node cache the document model reads.
//!
//! ## Caches
//!
//! | cache | key | cleared by |
//! |---|---|---|
//! | constraint binding | document node | `destroy` |
//! | UI projection | element node | `destroy` |
//! | manipulation options | document node | `invalidate_options`, `destroy` |
//! | validation results | document node | `destroy` |
//! | rule relevance | node ↔ rule | `destroy`, `record_rule_nodes` |
//! | ID registry | ID value | `destroy`, value changes |
//!
//! ## Binding
//!
//! [`TreeManager::bind_existing`] aligns an element's children with the
//! flattened content model of its constraint in a single greedy pass:
//!
//! ```text
//! children:     <a/> <a/> <c/>
//! descendants:   a    (b | c)   d?
//!                ^^ consumes both <a/>
//!                     b fails, but sits in a choice → next
//!                          c binds, rest of the choice skipped
//!                                d optional, left over → fine
//! ```
//!
//! A failed bind tears down whatever was bound below the failing element, so
//! no partial binding survives.

use crate::errors::MutationError;
use crate::id_registry::IdRegistry;
use crate::options::ManipulationOption;
use crate::projection::UiProjection;
use crate::validation::ValidationResult;
use std::collections::{HashMap, HashSet};
use tracing::{debug, instrument, trace};
use xsdedit_dom::{NodeId, XmlDocument};
use xsdedit_rules::RuleId;
use xsdedit_schema::{
    AttributeUse, BuiltinType, ConstraintId, ConstraintKind, ConstraintNode, ConstraintTree,
};

#[derive(Debug)]
pub struct TreeManager {
    tree: ConstraintTree,
    bindings: HashMap<NodeId, ConstraintId>,
    projection: UiProjection,
    options: HashMap<NodeId, Vec<ManipulationOption>>,
    validation: HashMap<NodeId, ValidationResult>,
    relevant_rules: HashMap<NodeId, Vec<RuleId>>,
    rules_using_nodes: HashMap<RuleId, HashSet<NodeId>>,
    ids: IdRegistry,
    whitelist: Vec<String>,
    revisions: HashMap<NodeId, u64>,
}

impl TreeManager {
    pub fn new(tree: ConstraintTree, whitelist: Vec<String>) -> Self {
        Self {
            tree,
            bindings: HashMap::new(),
            projection: UiProjection::new(),
            options: HashMap::new(),
            validation: HashMap::new(),
            relevant_rules: HashMap::new(),
            rules_using_nodes: HashMap::new(),
            ids: IdRegistry::new(),
            whitelist,
            revisions: HashMap::new(),
        }
    }

    pub fn tree(&self) -> &ConstraintTree {
        &self.tree
    }

    pub fn constraint_of(&self, node: NodeId) -> Option<ConstraintId> {
        self.bindings.get(&node).copied()
    }

    pub fn constraint(&self, node: NodeId) -> Option<&ConstraintNode> {
        self.constraint_of(node).and_then(|c| self.tree.get(c))
    }

    pub fn is_bound(&self, node: NodeId) -> bool {
        self.bindings.contains_key(&node)
    }

    pub fn is_whitelisted(&self, name: &str) -> bool {
        self.whitelist.iter().any(|w| w == name)
    }

    pub fn projection(&self) -> &UiProjection {
        &self.projection
    }

    pub fn projection_mut(&mut self) -> &mut UiProjection {
        &mut self.projection
    }

    pub fn ids(&self) -> &IdRegistry {
        &self.ids
    }

    pub fn ids_mut(&mut self) -> &mut IdRegistry {
        &mut self.ids
    }

    /// Whether values of this constraint take part in ID ownership
    pub fn is_id_typed(&self, constraint: ConstraintId) -> bool {
        self.tree
            .get(constraint)
            .and_then(|c| c.type_name.as_deref())
            .and_then(BuiltinType::parse)
            == Some(BuiltinType::Id)
    }

    // Option cache

    pub fn cached_options(&self, node: NodeId) -> Option<&[ManipulationOption]> {
        self.options.get(&node).map(Vec::as_slice)
    }

    pub fn store_options(&mut self, node: NodeId, options: Vec<ManipulationOption>) {
        self.options.insert(node, options);
    }

    /// Bumped whenever the options of `node` are invalidated
    pub fn revision(&self, node: NodeId) -> u64 {
        self.revisions.get(&node).copied().unwrap_or(0)
    }

    /// Drop cached options of `node` and everything below it
    pub fn invalidate_options(&mut self, doc: &XmlDocument, node: NodeId) {
        for current in doc.subtree(node) {
            self.options.remove(&current);
            *self.revisions.entry(current).or_default() += 1;
        }
        debug!(node = doc.name(node), "options invalidated");
    }

    // Validation cache

    pub fn validation_result(&self, node: NodeId) -> Option<&ValidationResult> {
        self.validation.get(&node)
    }

    pub fn store_validation(&mut self, node: NodeId, result: ValidationResult) {
        self.validation.insert(node, result);
    }

    // Rule relevance

    pub fn relevant_rules(&self, node: NodeId) -> &[RuleId] {
        self.relevant_rules
            .get(&node)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn rules_using_nodes(&self) -> &HashMap<RuleId, HashSet<NodeId>> {
        &self.rules_using_nodes
    }

    /// Record the nodes a rule resolved to in its latest evaluation.
    ///
    /// Nodes that dropped out lose the rule from their relevant list, new
    /// ones gain it. Cached validation results follow along.
    pub fn record_rule_nodes(&mut self, rule: &RuleId, nodes: HashSet<NodeId>) {
        let previous = self.rules_using_nodes.remove(rule).unwrap_or_default();
        for gone in previous.difference(&nodes) {
            if let Some(rules) = self.relevant_rules.get_mut(gone) {
                rules.retain(|r| r != rule);
                if rules.is_empty() {
                    self.relevant_rules.remove(gone);
                }
            }
            if let Some(result) = self.validation.get_mut(gone) {
                result.drop_rule(rule);
            }
        }
        for node in &nodes {
            let rules = self.relevant_rules.entry(*node).or_default();
            if !rules.contains(rule) {
                rules.push(rule.clone());
            }
            if let Some(result) = self.validation.get_mut(node) {
                result.add_rule(rule);
            }
        }
        self.rules_using_nodes.insert(rule.clone(), nodes);
    }

    /// Relevant rules of every node in the subtree, without duplicates
    pub fn rules_relevant_to_subtree(&self, doc: &XmlDocument, node: NodeId) -> Vec<RuleId> {
        let mut rules: Vec<RuleId> = Vec::new();
        for current in doc.subtree(node) {
            for rule in self.relevant_rules(current) {
                if !rules.contains(rule) {
                    rules.push(rule.clone());
                }
            }
        }
        rules
    }

    // Binding

    fn bind_node(&mut self, doc: &XmlDocument, node: NodeId, constraint: ConstraintId) {
        self.bindings.insert(node, constraint);
        if self.is_id_typed(constraint) {
            self.ids.register(&doc.node_value(node), node);
        }
    }

    /// Bind a freshly loaded subtree to `constraint`.
    ///
    /// On failure nothing below `node` stays bound.
    #[instrument(skip(self, doc), level = "debug")]
    pub fn bind_existing(&mut self, doc: &XmlDocument, node: NodeId, constraint: ConstraintId) -> bool {
        let bound = self.bind(doc, node, constraint);
        if !bound {
            self.unbind(doc, node);
        }
        bound
    }

    fn bind(&mut self, doc: &XmlDocument, node: NodeId, constraint: ConstraintId) -> bool {
        let Some(expected) = self.tree.get(constraint) else {
            return false;
        };
        if !doc.is_element(node) || !expected.is_element() {
            trace!(node = doc.name(node), "only elements bind");
            return false;
        }
        if expected.name != doc.name(node) {
            trace!(node = doc.name(node), expected = %expected.name, "names differ");
            return false;
        }
        let occurs = doc.occurs(node);
        if !expected.occurs.contains(occurs) {
            debug!(node = doc.name(node), occurs, "occurrence count out of bounds");
            return false;
        }

        for attr in doc.attributes(node) {
            let name = doc.name(*attr);
            match self.tree.attribute(constraint, name) {
                Some(attr_constraint) => self.bind_node(doc, *attr, attr_constraint),
                None if self.is_whitelisted(name) => {}
                None => {
                    debug!(node = doc.name(node), attribute = name, "undeclared attribute");
                    self.unbind(doc, node);
                    return false;
                }
            }
        }

        let children: Vec<NodeId> = doc.element_children(node).collect();
        let descendants = self.tree.non_compositor_descendants(constraint);
        let (mut child, mut descendant) = (0, 0);

        while child < children.len() && descendant < descendants.len() {
            let current = descendants[descendant];
            if self.bind(doc, children[child], current) {
                child += 1;
                while child < children.len() && self.bind(doc, children[child], current) {
                    child += 1;
                }
                let alternatives = self.tree.choice_alternatives(current);
                if alternatives.is_empty() {
                    descendant += 1;
                } else {
                    while descendant < descendants.len() && alternatives.contains(&descendants[descendant]) {
                        descendant += 1;
                    }
                }
            } else {
                if self.tree[current].occurs.min != 0 && !self.tree.parent_is_choice(current) {
                    debug!(node = doc.name(node), missing = self.tree.name(current), "required child not found");
                    self.unbind(doc, node);
                    return false;
                }
                descendant += 1;
            }
        }

        if child < children.len() {
            debug!(
                node = doc.name(node),
                unexpected = doc.name(children[child]),
                "children left over"
            );
            self.unbind(doc, node);
            return false;
        }
        if let Some(required) = descendants[descendant..]
            .iter()
            .find(|d| self.tree[**d].occurs.min != 0)
        {
            debug!(node = doc.name(node), missing = self.tree.name(*required), "required child missing at end");
            self.unbind(doc, node);
            return false;
        }

        self.bind_node(doc, node, constraint);
        trace!(node = doc.name(node), "bound");
        true
    }

    fn unbind(&mut self, doc: &XmlDocument, node: NodeId) {
        for current in doc.subtree(node) {
            if self.bindings.remove(&current).is_some() {
                self.ids.release(&doc.node_value(current), current);
            }
        }
    }

    // Creation

    /// Build the smallest subtree that satisfies `constraint`, bound and detached.
    ///
    /// Returns `None` for compositors, which have no node of their own.
    pub fn create(
        &mut self,
        doc: &mut XmlDocument,
        constraint: ConstraintId,
    ) -> Result<Option<NodeId>, MutationError> {
        match self.tree.kind(constraint) {
            Some(ConstraintKind::Element | ConstraintKind::Attribute) => {
                Ok(self.create_subtree(doc, constraint, true)?.into_iter().next())
            }
            _ => Ok(None),
        }
    }

    fn create_subtree(
        &mut self,
        doc: &mut XmlDocument,
        constraint: ConstraintId,
        is_top: bool,
    ) -> Result<Vec<NodeId>, MutationError> {
        let Some(template) = self.tree.get(constraint) else {
            return Ok(Vec::new());
        };
        let kind = template.kind;
        let name = template.name.clone();
        let preset = template.fixed_value.clone().or_else(|| template.default_value.clone());
        let required = template.attribute_use == Some(AttributeUse::Required);
        let min = template.occurs.min as usize;

        match kind {
            ConstraintKind::Attribute => {
                if !(required || is_top || preset.is_some()) {
                    return Ok(Vec::new());
                }
                let attr = doc.create_attribute(name, preset.unwrap_or_default());
                self.bind_node(doc, attr, constraint);
                Ok(vec![attr])
            }
            ConstraintKind::Element => {
                let copies = if is_top { 1 } else { min };
                let children = self.tree.children(constraint).to_vec();
                let attributes = self.tree.attributes(constraint).to_vec();

                let mut created = Vec::with_capacity(copies);
                for _ in 0..copies {
                    let element = doc.create_element(name.clone());
                    if let Some(value) = &preset {
                        doc.set_node_value(element, value)?;
                    }
                    for child in &children {
                        for node in self.create_subtree(doc, *child, false)? {
                            doc.append_child(element, node)?;
                        }
                    }
                    for attribute in &attributes {
                        for node in self.create_subtree(doc, *attribute, false)? {
                            doc.set_attribute_node(element, node)?;
                        }
                    }
                    self.bind_node(doc, element, constraint);
                    created.push(element);
                }
                Ok(created)
            }
            ConstraintKind::Choice => match self.tree.children(constraint).first().copied() {
                Some(first) => self.create_subtree(doc, first, false),
                None => Ok(Vec::new()),
            },
            ConstraintKind::Sequence => {
                let mut created = Vec::new();
                for child in self.tree.children(constraint).to_vec() {
                    created.extend(self.create_subtree(doc, child, false)?);
                }
                Ok(created)
            }
            ConstraintKind::Group => {
                debug!("group compositors are not materialized");
                Ok(Vec::new())
            }
        }
    }

    // Teardown

    /// Forget everything known about `node` and its subtree.
    ///
    /// Returns nodes that became the owner of an ID because a destroyed node
    /// gave it up; they need revalidating.
    pub fn destroy(&mut self, doc: &XmlDocument, node: NodeId) -> Vec<NodeId> {
        let subtree = doc.subtree(node);
        self.projection.detach(node);

        let mut promoted = Vec::new();
        for current in &subtree {
            self.bindings.remove(current);
            self.options.remove(current);
            self.validation.remove(current);
            self.revisions.remove(current);
            if let Some(rules) = self.relevant_rules.remove(current) {
                for rule in rules {
                    if let Some(nodes) = self.rules_using_nodes.get_mut(&rule) {
                        nodes.remove(current);
                    }
                }
            }
            if let Some(owner) = self.ids.release(&doc.node_value(*current), *current) {
                promoted.push(owner);
            }
        }
        promoted.retain(|owner| !subtree.contains(owner));
        debug!(node = doc.name(node), nodes = subtree.len(), "destroyed");
        promoted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xsdedit_schema::{MaxOccurs, Occurs};

    /// experiment(@version, a+, (b | c), d?)
    fn tree() -> ConstraintTree {
        let mut builder = ConstraintTree::builder("experiment");
        let root = builder.root();
        let version = builder.attribute(root, "version", AttributeUse::Required);
        builder.set_default(version, "1.0");
        builder.attribute(root, "note", AttributeUse::Optional);
        let seq = builder.sequence(root);
        builder.text_element(seq, "a", Occurs::new(1, MaxOccurs::Bounded(3)), "integer");
        let choice = builder.choice(seq);
        builder.element(choice, "b", Occurs::once());
        builder.element(choice, "c", Occurs::once());
        builder.element(seq, "d", Occurs::optional());
        builder.finish()
    }

    fn manager() -> TreeManager {
        TreeManager::new(tree(), vec!["xmlns:xsi".to_string()])
    }

    fn bind(xml: &str) -> (TreeManager, XmlDocument, bool) {
        let doc = xsdedit_dom::parse(xml).unwrap();
        let mut manager = manager();
        let root = doc.root_element().unwrap();
        let root_constraint = manager.tree().root();
        let bound = manager.bind_existing(&doc, root, root_constraint);
        (manager, doc, bound)
    }

    #[test]
    fn test_bind_repeated_and_choice() {
        let (manager, doc, bound) = bind(r#"<experiment version="1"><a>1</a><a>2</a><c/><d/></experiment>"#);
        assert!(bound);
        for node in doc.subtree(doc.root_element().unwrap()) {
            if doc.is_element(node) || doc.is_attribute(node) {
                assert!(manager.is_bound(node), "{} unbound", doc.name(node));
            }
        }
    }

    #[test]
    fn test_bind_failures_leave_nothing_bound() {
        let cases = [
            r#"<experiment version="1"><c/></experiment>"#,
            r#"<experiment version="1"><a>1</a></experiment>"#,
            r#"<experiment version="1"><a>1</a><b/><c/></experiment>"#,
            r#"<experiment version="1"><a>1</a><a>1</a><a>1</a><a>1</a><b/></experiment>"#,
            r#"<experiment version="1" extra="x"><a>1</a><b/></experiment>"#,
            r#"<experiment version="1"><a>1</a><b/><e/></experiment>"#,
        ];
        for xml in cases {
            let (manager, _, bound) = bind(xml);
            assert!(!bound, "{xml} should not bind");
            assert!(manager.bindings.is_empty(), "{xml} left bindings behind");
        }
    }

    #[test]
    fn test_whitelisted_attribute_is_tolerated() {
        let (manager, doc, bound) =
            bind(r#"<experiment version="1" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><a>1</a><b/></experiment>"#);
        assert!(bound);
        let root = doc.root_element().unwrap();
        let xsi = doc.attribute(root, "xmlns:xsi").unwrap();
        assert!(!manager.is_bound(xsi));
    }

    #[test]
    fn test_create_then_bind() {
        let mut manager = manager();
        let mut doc = XmlDocument::new();
        let root_constraint = manager.tree().root();
        let root = manager.create(&mut doc, root_constraint).unwrap().unwrap();
        doc.set_root_element(root).unwrap();

        let names: Vec<_> = doc.element_children(root).map(|c| doc.name(c).to_string()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(doc.node_value(doc.attribute(root, "version").unwrap()), "1.0");
        assert!(doc.attribute(root, "note").is_none());

        let mut fresh = TreeManager::new(tree(), Vec::new());
        assert!(fresh.bind_existing(&doc, root, root_constraint));
    }

    #[test]
    fn test_optional_top_attribute_is_created() {
        let mut manager = manager();
        let mut doc = XmlDocument::new();
        let note = manager.tree().attribute(manager.tree().root(), "note").unwrap();
        let attr = manager.create(&mut doc, note).unwrap().unwrap();
        assert_eq!(doc.name(attr), "note");
        assert_eq!(manager.constraint_of(attr), Some(note));
    }

    #[test]
    fn test_destroy_clears_caches() {
        let (mut manager, doc, _) = bind(r#"<experiment version="1"><a>1</a><b/></experiment>"#);
        let root = doc.root_element().unwrap();
        manager.projection_mut().rebuild(&doc);
        let a = doc.element_children(root).next().unwrap();
        let rule = RuleId::new("r");
        manager.record_rule_nodes(&rule, HashSet::from([a]));
        manager.store_validation(a, ValidationResult::valid());

        manager.destroy(&doc, a);
        assert!(!manager.is_bound(a));
        assert!(!manager.projection().contains(a));
        assert!(manager.validation_result(a).is_none());
        assert!(manager.relevant_rules(a).is_empty());
        assert!(manager.rules_using_nodes()[&rule].is_empty());
    }

    #[test]
    fn test_invalidate_bumps_subtree_revisions() {
        let (mut manager, doc, _) = bind(r#"<experiment version="1"><a>1</a><b/></experiment>"#);
        let root = doc.root_element().unwrap();
        let a = doc.element_children(root).next().unwrap();
        manager.store_options(a, Vec::new());

        manager.invalidate_options(&doc, root);
        assert!(manager.cached_options(a).is_none());
        assert_eq!(manager.revision(a), 1);
        assert_eq!(manager.revision(root), 1);
    }

    #[test]
    fn test_record_rule_nodes_moves_relevance() {
        let (mut manager, doc, _) = bind(r#"<experiment version="1"><a>1</a><a>2</a><b/></experiment>"#);
        let root = doc.root_element().unwrap();
        let a: Vec<_> = doc.element_children(root).collect();
        let rule = RuleId::new("r");

        manager.record_rule_nodes(&rule, HashSet::from([a[0]]));
        manager.record_rule_nodes(&rule, HashSet::from([a[1]]));
        assert!(manager.relevant_rules(a[0]).is_empty());
        assert_eq!(manager.relevant_rules(a[1]), &[rule]);
    }
}

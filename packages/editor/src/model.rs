//! # Document Model
//!
//! Owns one document together with everything derived from it and funnels
//! every structural edit through a handful of operations.
//!
//! ## Edit protocol
//!
//! Each mutation:
//!
//! 1. edits the document tree
//! 2. patches the UI projection
//! 3. invalidates the option cache of the parent
//! 4. re-checks the rules the edit can have affected
//! 5. validates the nodes it produced
//!
//! Additions re-check rules that were short of resolved parameters, since the
//! new node may supply one. Removals and value changes re-check the rules
//! relevant to the touched nodes.
//!
//! ## Failure categories
//!
//! - binding failure: [`EditorError::NotCompliant`] at load, nothing exposed
//! - type failure: `value_has_correct_type == false` in a [`ValidationResult`]
//! - rule failure: a relevant rule that is not satisfied
//!
//! Only the first is an `Err`. Misusing the edit API (unknown nodes, adding
//! a compositor) is reported as [`MutationError`].

use crate::config::EditorConfig;
use crate::errors::{EditorError, EditorResult, MutationError};
use crate::id_registry::IdRegistry;
use crate::notifications::{Notification, NotificationQueue, Notifier, RuleViolation};
use crate::options::{Manipulation, ManipulationOption};
use crate::tree_manager::TreeManager;
use crate::validation::ValidationResult;
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use xsdedit_dom::{DomError, NodeId, XmlDocument};
use xsdedit_rules::{Diagnostic, RuleId, RuleSet};
use xsdedit_schema::{
    ConstraintId, ConstraintKind, ConstraintNode, ConstraintTree, ConstraintTreeBuilder,
    ScalarValidator,
};

pub struct DocumentModel {
    doc: XmlDocument,
    manager: TreeManager,
    rules: RuleSet,
    validator: ScalarValidator,
    config: EditorConfig,
    diagnostics: HashMap<RuleId, Vec<Diagnostic>>,
    notifications: NotificationQueue,
}

impl std::fmt::Debug for DocumentModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentModel")
            .field("root", &self.root().map(|r| self.doc.name(r)))
            .field("rules", &self.rules.len())
            .finish()
    }
}

impl DocumentModel {
    fn empty(tree: ConstraintTree, doc: XmlDocument, rules: RuleSet, config: EditorConfig) -> Self {
        Self {
            doc,
            manager: TreeManager::new(tree, config.attribute_whitelist.clone()),
            rules,
            validator: ScalarValidator::new(),
            config,
            diagnostics: HashMap::new(),
            notifications: NotificationQueue::new(),
        }
    }

    /// Start a fresh document holding the smallest tree the schema allows
    #[instrument(skip_all)]
    pub fn new_document(tree: ConstraintTree, rules: RuleSet, config: EditorConfig) -> EditorResult<Self> {
        let mut model = Self::empty(tree, XmlDocument::new(), rules, config);
        let root_constraint = model.manager.tree().root();
        let root = model
            .manager
            .create(&mut model.doc, root_constraint)?
            .ok_or_else(|| MutationError::UnsupportedConstraint(model.manager.tree().name(root_constraint).to_string()))?;
        model.doc.set_root_element(root)?;
        model.manager.projection_mut().rebuild(&model.doc);

        let all: Vec<RuleId> = model.rules.ids().cloned().collect();
        model.check_rules(&all);
        info!(root = model.doc.name(root), "created new document");
        Ok(model)
    }

    /// Load an existing document; it has to bind against `tree` completely
    #[instrument(skip_all)]
    pub fn load(xml: &str, tree: ConstraintTree, rules: RuleSet, config: EditorConfig) -> EditorResult<Self> {
        let doc = xsdedit_dom::parse(xml)?;
        Self::from_document(doc, tree, rules, config)
    }

    /// Load a document, asking `builder` for the tree of its root element
    #[instrument(skip_all)]
    pub fn load_with(
        xml: &str,
        builder: &dyn ConstraintTreeBuilder,
        rules: RuleSet,
        config: EditorConfig,
    ) -> EditorResult<Self> {
        let doc = xsdedit_dom::parse(xml)?;
        let root = doc.root_element().ok_or(DomError::MissingRoot)?;
        let tree = builder.build_constraint_tree(doc.name(root))?;
        Self::from_document(doc, tree, rules, config)
    }

    fn from_document(
        doc: XmlDocument,
        tree: ConstraintTree,
        rules: RuleSet,
        config: EditorConfig,
    ) -> EditorResult<Self> {
        let root = doc.root_element().ok_or(DomError::MissingRoot)?;
        let mut model = Self::empty(tree, doc, rules, config);
        let root_constraint = model.manager.tree().root();

        if !model.manager.bind_existing(&model.doc, root, root_constraint) {
            let root = model.doc.name(root).to_string();
            warn!(root = %root, "document does not comply with its schema");
            return Err(EditorError::NotCompliant { root });
        }
        model.manager.projection_mut().rebuild(&model.doc);

        let all: Vec<RuleId> = model.rules.ids().cloned().collect();
        model.check_rules(&all);
        info!(root = model.doc.name(root), rules = model.rules.len(), "loaded document");
        Ok(model)
    }

    // Accessors

    pub fn document(&self) -> &XmlDocument {
        &self.doc
    }

    pub fn root(&self) -> Option<NodeId> {
        self.doc.root_element()
    }

    pub fn constraint_tree(&self) -> &ConstraintTree {
        self.manager.tree()
    }

    pub fn constraint_of(&self, node: NodeId) -> Option<ConstraintId> {
        self.manager.constraint_of(node)
    }

    pub fn constraint(&self, node: NodeId) -> Option<&ConstraintNode> {
        self.manager.constraint(node)
    }

    pub fn ui_root(&self) -> Option<NodeId> {
        self.manager.projection().root()
    }

    pub fn ui_children(&self, node: NodeId) -> &[NodeId] {
        self.manager.projection().children(node)
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn relevant_rules(&self, node: NodeId) -> &[RuleId] {
        self.manager.relevant_rules(node)
    }

    /// Complaints from the latest evaluation of `rule`, such as unresolvable literals
    pub fn rule_diagnostics(&self, rule: &RuleId) -> &[Diagnostic] {
        self.diagnostics.get(rule).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn ids(&self) -> &IdRegistry {
        self.manager.ids()
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    fn is_whitelisted(&self, node: NodeId) -> bool {
        self.doc.is_attribute(node) && self.manager.is_whitelisted(self.doc.name(node))
    }

    /// Whether options produced for `anchor` at `revision` still describe the tree
    pub(crate) fn is_current(&self, anchor: NodeId, revision: u64) -> bool {
        self.doc.contains(anchor)
            && self.doc.is_attached(anchor)
            && self.manager.revision(anchor) == revision
    }

    // Manipulation options

    /// Edits currently legal for `node`, cached until the node's options are invalidated
    pub fn manipulation_options(&mut self, node: NodeId) -> Vec<ManipulationOption> {
        if let Some(cached) = self.manager.cached_options(node) {
            return cached.to_vec();
        }
        let Some(constraint) = self.manager.constraint_of(node) else {
            return Vec::new();
        };

        let options = if self.doc.is_element(node) {
            self.element_options(node, constraint)
        } else if self.doc.is_attribute(node) {
            self.attribute_options(node, constraint)
        } else {
            Vec::new()
        };
        debug!(node = self.doc.name(node), options = options.len(), "options computed");
        self.manager.store_options(node, options.clone());
        options
    }

    fn element_options(&self, node: NodeId, constraint: ConstraintId) -> Vec<ManipulationOption> {
        let tree = self.manager.tree();
        let doc = &self.doc;
        let revision = self.manager.revision(node);
        let option = |objective: &str, action| ManipulationOption::new(objective, node, revision, action);
        let mut options = Vec::new();

        let occurs = doc.occurs(node);
        let bounds = tree[constraint].occurs;
        let parent = doc.parent(node).filter(|p| doc.is_element(*p));

        if let Some(parent) = parent {
            if bounds.allows_more(occurs) {
                options.push(option(
                    doc.name(node),
                    Manipulation::AddSibling {
                        constraint,
                        parent,
                        after: node,
                    },
                ));
            }
            if occurs > bounds.min as usize {
                options.push(option(doc.name(node), Manipulation::Remove { node }));
            }
            for alternative in tree.choice_alternatives(constraint) {
                if *alternative != constraint {
                    options.push(option(
                        tree.name(*alternative),
                        Manipulation::ChooseAlternative {
                            replacement: *alternative,
                            parent,
                            after: doc.previous_sibling(node),
                            to_replace: node,
                        },
                    ));
                }
            }
        }

        let children: Vec<NodeId> = doc.element_children(node).collect();
        let descendants = tree.non_compositor_descendants(constraint);
        for (position, descendant) in descendants.iter().enumerate() {
            let expected = &tree[*descendant];
            if doc.occurs_in(&expected.name, &children) != 0 || !expected.occurs.allows_more(0) {
                continue;
            }
            let alternatives = tree.choice_alternatives(*descendant);
            let mut after = None;
            let mut masked = false;
            for child in &children {
                let Some(bound) = self.manager.constraint_of(*child) else {
                    continue;
                };
                if alternatives.contains(&bound) {
                    masked = true;
                    break;
                }
                if descendants[..position].contains(&bound) {
                    after = Some(*child);
                }
            }
            if !masked {
                options.push(option(
                    expected.name.as_str(),
                    Manipulation::AddChild {
                        constraint: *descendant,
                        parent: node,
                        after,
                    },
                ));
            }
        }

        for attribute in tree.attributes(constraint) {
            let expected = &tree[*attribute];
            if expected.is_free_optional_attribute() && doc.attribute(node, &expected.name).is_none() {
                options.push(option(
                    expected.name.as_str(),
                    Manipulation::AddAttribute {
                        constraint: *attribute,
                        element: node,
                    },
                ));
            }
        }
        options
    }

    fn attribute_options(&self, node: NodeId, constraint: ConstraintId) -> Vec<ManipulationOption> {
        if !self.manager.tree()[constraint].is_free_optional_attribute() {
            return Vec::new();
        }
        vec![ManipulationOption::new(
            self.doc.name(node),
            node,
            self.manager.revision(node),
            Manipulation::RemoveAttribute { attribute: node },
        )]
    }

    // Mutations

    /// Insert a new instance of the element `constraint` below `parent`, after
    /// `after` or first when `after` is `None`
    pub fn add_node_like(
        &mut self,
        constraint: ConstraintId,
        parent: NodeId,
        after: Option<NodeId>,
    ) -> Result<NodeId, MutationError> {
        if self.manager.tree().kind(constraint) != Some(ConstraintKind::Element) {
            return Err(MutationError::UnsupportedConstraint(
                self.manager.tree().name(constraint).to_string(),
            ));
        }
        self.require_element(parent)?;

        let node = self
            .manager
            .create(&mut self.doc, constraint)?
            .ok_or_else(|| MutationError::UnsupportedConstraint(self.manager.tree().name(constraint).to_string()))?;
        if let Err(error) = self.doc.insert_after(parent, after, node) {
            self.manager.destroy(&self.doc, node);
            self.doc.discard(node)?;
            return Err(error.into());
        }
        self.manager.projection_mut().attach(&self.doc, node);
        self.manager.invalidate_options(&self.doc, parent);

        self.check_rules_missing_parameters();
        self.validate(node);
        info!(node = self.doc.name(node), parent = self.doc.name(parent), "added node");
        Ok(node)
    }

    /// Add the attribute `constraint` to `element`
    pub fn add_attribute_like(&mut self, constraint: ConstraintId, element: NodeId) -> Result<NodeId, MutationError> {
        if self.manager.tree().kind(constraint) != Some(ConstraintKind::Attribute) {
            return Err(MutationError::UnsupportedConstraint(
                self.manager.tree().name(constraint).to_string(),
            ));
        }
        self.require_element(element)?;

        let attr = self
            .manager
            .create(&mut self.doc, constraint)?
            .ok_or_else(|| MutationError::UnsupportedConstraint(self.manager.tree().name(constraint).to_string()))?;
        if let Some(displaced) = self.doc.set_attribute_node(element, attr)? {
            let promoted = self.manager.destroy(&self.doc, displaced);
            self.doc.discard(displaced)?;
            self.revalidate_nodes(promoted);
        }
        self.manager.invalidate_options(&self.doc, element);

        self.check_rules_missing_parameters();
        self.validate(attr);
        info!(attribute = self.doc.name(attr), element = self.doc.name(element), "added attribute");
        Ok(attr)
    }

    /// Remove an element or attribute for good
    pub fn remove_node(&mut self, node: NodeId) -> Result<(), MutationError> {
        if !self.doc.contains(node) {
            return Err(MutationError::NodeNotFound(node));
        }
        let parent = self
            .doc
            .parent(node)
            .filter(|p| self.doc.is_element(*p))
            .ok_or(MutationError::ParentNotFound(node))?;
        let name = self.doc.name(node).to_string();

        self.doc.detach(node)?;
        if self.doc.is_element(node) {
            self.manager.projection_mut().detach(node);
        }

        let affected = self.manager.rules_relevant_to_subtree(&self.doc, node);
        self.check_rules(&affected);

        self.manager.invalidate_options(&self.doc, parent);
        let promoted = self.manager.destroy(&self.doc, node);
        self.doc.discard(node)?;
        self.revalidate_nodes(promoted);

        info!(node = %name, parent = self.doc.name(parent), "removed node");
        Ok(())
    }

    /// Replace `to_replace` by a fresh instance of another alternative of its choice.
    ///
    /// The new node is added before the old one is removed, so both exist for
    /// a moment.
    pub fn choose_alternative(
        &mut self,
        replacement: ConstraintId,
        parent: NodeId,
        after: Option<NodeId>,
        to_replace: NodeId,
    ) -> Result<NodeId, MutationError> {
        let node = self.add_node_like(replacement, parent, after)?;
        self.remove_node(to_replace)?;
        self.manager.invalidate_options(&self.doc, parent);
        Ok(node)
    }

    /// Change the text of a leaf.
    ///
    /// Type and rule problems with the new value show up in its validation
    /// result, not as an error.
    pub fn set_node_value(&mut self, node: NodeId, value: &str) -> Result<(), MutationError> {
        let constraint = self
            .manager
            .constraint_of(node)
            .ok_or(MutationError::NotBound(node))?;
        if !self.manager.tree()[constraint].can_have_text {
            return Err(MutationError::NoTextContent(node));
        }

        // Rewriting the same ID keeps its place in line
        let id_changes = self.manager.is_id_typed(constraint) && self.doc.node_value(node) != value;
        if id_changes {
            let old = self.doc.node_value(node);
            if let Some(owner) = self.manager.ids_mut().release(&old, node) {
                self.validate(owner);
            }
        }

        self.doc.set_node_value(node, value)?;
        if id_changes {
            self.manager.ids_mut().register(value, node);
        }

        let affected = self.manager.relevant_rules(node).to_vec();
        self.check_rules(&affected);
        self.validate(node);
        info!(node = self.doc.name(node), value, "changed value");
        Ok(())
    }

    /// Swap `old` for a copy of `source_node` taken from `source`.
    ///
    /// The copy has to bind against the constraint of `old`; when it does not,
    /// the document is left exactly as it was.
    pub fn replace(&mut self, old: NodeId, source: &XmlDocument, source_node: NodeId) -> Result<NodeId, MutationError> {
        let constraint = self
            .manager
            .constraint_of(old)
            .ok_or(MutationError::NotBound(old))?;
        let parent = self.doc.parent(old).ok_or(MutationError::ParentNotFound(old))?;

        let imported = self.doc.import_subtree(source, source_node)?;
        if let Err(error) = self.doc.replace_child(parent, old, imported) {
            self.doc.discard(imported)?;
            return Err(error.into());
        }
        if !self.manager.bind_existing(&self.doc, imported, constraint) {
            self.doc.replace_child(parent, imported, old)?;
            self.doc.discard(imported)?;
            warn!(node = self.doc.name(old), "replacement rejected");
            return Err(MutationError::NotCompliant(old));
        }

        self.manager.projection_mut().detach(old);
        self.manager.projection_mut().attach(&self.doc, imported);

        let affected = self.manager.rules_relevant_to_subtree(&self.doc, old);
        self.check_rules(&affected);

        self.manager.invalidate_options(&self.doc, parent);
        let promoted = self.manager.destroy(&self.doc, old);
        self.doc.discard(old)?;

        self.check_rules_missing_parameters();
        self.validate(imported);
        self.revalidate_nodes(promoted);
        info!(node = self.doc.name(imported), "replaced node");
        Ok(imported)
    }

    fn require_element(&self, node: NodeId) -> Result<(), MutationError> {
        if !self.doc.contains(node) {
            return Err(MutationError::NodeNotFound(node));
        }
        if !self.doc.is_element(node) {
            return Err(MutationError::NotAnElement(node));
        }
        Ok(())
    }

    // Rules

    /// Evaluate `ids` and bring relevance bookkeeping up to date.
    ///
    /// A rule that is violated for the first time, or again after having been
    /// satisfied, queues a notification that tracks its resolution.
    #[instrument(skip_all, fields(rules = ids.len()))]
    fn check_rules(&mut self, ids: &[RuleId]) {
        if ids.is_empty() {
            return;
        }
        let previously_holding: HashSet<RuleId> = ids
            .iter()
            .filter(|id| {
                !self.manager.rules_using_nodes().contains_key(*id) || self.rules.is_satisfied(id)
            })
            .cloned()
            .collect();

        for (id, evaluation) in self.rules.evaluate(&self.doc, ids) {
            self.manager
                .record_rule_nodes(&id, evaluation.referenced_nodes.iter().copied().collect());
            for diagnostic in &evaluation.diagnostics {
                debug!(rule = %id, diagnostic = %diagnostic.message, "rule diagnostic");
            }
            self.diagnostics.insert(id.clone(), evaluation.diagnostics);

            if !self.rules.is_satisfied(&id) && previously_holding.contains(&id) {
                self.report_violation(&id);
            }
        }
    }

    fn report_violation(&mut self, id: &RuleId) {
        let Some(rule) = self.rules.get_mut(id) else {
            return;
        };
        let resolved = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&resolved);
        rule.resolution().subscribe(move |_| flag.store(true, Ordering::Release));

        info!(rule = %id, "rule violated");
        let notification = Notification::rule_violation(rule.message(), RuleViolation::new(id.clone(), resolved));
        self.notifications.push(notification);
    }

    fn check_rules_missing_parameters(&mut self) {
        let missing = self.rules.rules_missing_parameters(self.manager.rules_using_nodes());
        self.check_rules(&missing);
    }

    // Validation

    fn validate(&mut self, node: NodeId) {
        if !self.manager.is_bound(node) {
            return;
        }
        let value_ok = self.value_is_valid(node);
        let relevant = self.manager.relevant_rules(node).to_vec();
        self.manager.store_validation(node, ValidationResult::new(value_ok, relevant));
    }

    fn value_is_valid(&self, node: NodeId) -> bool {
        let Some(constraint) = self.manager.constraint(node) else {
            return true;
        };
        if !constraint.can_have_text {
            return true;
        }
        let value = self.doc.node_value(node);
        self.validator.validate(&value, constraint, node, self.manager.ids())
    }

    fn revalidate_nodes(&mut self, nodes: Vec<NodeId>) {
        for node in nodes {
            self.validate(node);
        }
    }

    /// Validation result of `node`, computed on first request.
    ///
    /// With `deep`, the result covers the node with its attributes and element
    /// descendants: the type flag is the conjunction of theirs and the rules are
    /// all rules relevant anywhere in the subtree.
    pub fn validation_result(&mut self, node: NodeId, deep: bool) -> ValidationResult {
        self.result_for(node, deep, false)
    }

    /// Cached result without computing anything
    pub fn cached_validation(&self, node: NodeId) -> Option<&ValidationResult> {
        self.manager.validation_result(node)
    }

    /// Recheck types and rules of the whole document
    pub fn revalidate(&mut self) -> ValidationResult {
        let all: Vec<RuleId> = self.rules.ids().cloned().collect();
        self.check_rules(&all);
        match self.root() {
            Some(root) => self.result_for(root, true, true),
            None => ValidationResult::new(false, Vec::new()),
        }
    }

    fn result_for(&mut self, node: NodeId, deep: bool, force: bool) -> ValidationResult {
        if !self.doc.contains(node) {
            return ValidationResult::new(false, Vec::new());
        }
        if self.is_whitelisted(node) {
            return ValidationResult::valid();
        }
        if force || self.manager.validation_result(node).is_none() {
            self.validate(node);
        }
        let own = self
            .manager
            .validation_result(node)
            .cloned()
            .unwrap_or_else(|| ValidationResult::new(false, Vec::new()));
        if !deep {
            return own;
        }

        let mut combined = own;
        let attributes = self.doc.attributes(node).to_vec();
        for attribute in attributes {
            let result = self.result_for(attribute, false, force);
            merge(&mut combined, result);
        }
        let children: Vec<NodeId> = self.doc.element_children(node).collect();
        for child in children {
            let result = self.result_for(child, true, force);
            merge(&mut combined, result);
        }
        combined
    }

    // Output and notifications

    pub fn to_xml_string(&self) -> EditorResult<String> {
        Ok(xsdedit_dom::to_xml_string(&self.doc, self.config.save_indent)?)
    }

    pub fn save_to(&self, writer: &mut impl Write) -> EditorResult<()> {
        writer.write_all(self.to_xml_string()?.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    /// Sender for background work that needs to tell the user something
    pub fn notifier(&self) -> Notifier {
        self.notifications.notifier()
    }

    /// Everything queued since the last call, oldest first
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain()
    }
}

fn merge(into: &mut ValidationResult, other: ValidationResult) {
    into.value_has_correct_type &= other.value_has_correct_type;
    for rule in &other.relevant_rules {
        into.add_rule(rule);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ManipulationKind;
    use xsdedit_schema::{AttributeUse, MaxOccurs, Occurs};

    /// block(@id?, trial{1,2}, (fixation | cue), comment?)
    fn tree() -> ConstraintTree {
        let mut builder = ConstraintTree::builder("block");
        let root = builder.root();
        builder.attribute(root, "id", AttributeUse::Optional);
        let seq = builder.sequence(root);
        builder.text_element(seq, "trial", Occurs::new(1, MaxOccurs::Bounded(2)), "integer");
        let choice = builder.choice(seq);
        builder.element(choice, "fixation", Occurs::once());
        builder.element(choice, "cue", Occurs::once());
        builder.text_element(seq, "comment", Occurs::optional(), "string");
        builder.finish()
    }

    fn model() -> DocumentModel {
        DocumentModel::new_document(tree(), RuleSet::new(), EditorConfig::default()).unwrap()
    }

    fn kinds(options: &[ManipulationOption]) -> Vec<ManipulationKind> {
        options.iter().map(ManipulationOption::kind).collect()
    }

    #[test]
    fn test_new_document_is_minimal() {
        let model = model();
        let root = model.root().unwrap();
        let names: Vec<_> = model
            .document()
            .element_children(root)
            .map(|c| model.document().name(c))
            .collect();
        assert_eq!(names, vec!["trial", "fixation"]);
        assert_eq!(model.ui_children(root).len(), 2);
    }

    #[test]
    fn test_root_options() {
        let mut model = model();
        let root = model.root().unwrap();
        let options = model.manipulation_options(root);
        assert_eq!(
            kinds(&options),
            vec![ManipulationKind::AddChild, ManipulationKind::AddAttribute]
        );
        assert_eq!(options[0].description(), "Add child node \"comment\"");
        assert_eq!(options[1].description(), "Add attribute \"id\"");
    }

    #[test]
    fn test_add_child_goes_after_last_preceding_sibling() {
        let mut model = model();
        let root = model.root().unwrap();
        let add_comment = model.manipulation_options(root).remove(0);
        let comment = add_comment.execute(&mut model).unwrap().unwrap();

        let last = model.document().element_children(root).last();
        assert_eq!(last, Some(comment));
    }

    #[test]
    fn test_choice_options_and_swap() {
        let mut model = model();
        let root = model.root().unwrap();
        let fixation = model.document().element_children(root).nth(1).unwrap();

        let options = model.manipulation_options(fixation);
        assert_eq!(kinds(&options), vec![ManipulationKind::ChooseAlternative]);
        let cue = options[0].execute(&mut model).unwrap().unwrap();

        assert!(!model.document().contains(fixation));
        assert_eq!(model.document().element_children(root).nth(1), Some(cue));
        assert!(model.ui_children(root).contains(&cue));
    }

    #[test]
    fn test_set_value_is_validated() {
        let mut model = model();
        let root = model.root().unwrap();
        let trial = model.document().element_children(root).next().unwrap();

        model.set_node_value(trial, "12").unwrap();
        assert!(model.validation_result(trial, false).value_has_correct_type);
        model.set_node_value(trial, "twelve").unwrap();
        assert!(!model.validation_result(trial, false).value_has_correct_type);
        assert!(!model.validation_result(root, true).is_valid(model.rules()));

        assert_eq!(
            model.set_node_value(root, "x"),
            Err(MutationError::NoTextContent(root))
        );
    }

    #[test]
    fn test_compositors_cannot_be_added() {
        let mut model = model();
        let root = model.root().unwrap();
        let sequence = model.constraint_tree().children(model.constraint_tree().root())[0];
        assert!(matches!(
            model.add_node_like(sequence, root, None),
            Err(MutationError::UnsupportedConstraint(_))
        ));
    }

    #[test]
    fn test_failed_replace_frees_the_copy() {
        let mut model = model();
        let root = model.root().unwrap();
        let add_id = model
            .manipulation_options(root)
            .into_iter()
            .find(|o| o.kind() == ManipulationKind::AddAttribute)
            .unwrap();
        let id = add_id.execute(&mut model).unwrap().unwrap();
        let live = model.document().node_count();

        let source = xsdedit_dom::parse("<id/>").unwrap();
        let source_root = source.root_element().unwrap();
        assert!(matches!(
            model.replace(id, &source, source_root),
            Err(MutationError::Dom(DomError::NotAChild { .. }))
        ));
        assert_eq!(model.document().node_count(), live);
        assert_eq!(model.document().attribute(root, "id"), Some(id));
    }

    #[test]
    fn test_root_cannot_be_removed() {
        let mut model = model();
        let root = model.root().unwrap();
        assert_eq!(model.remove_node(root), Err(MutationError::ParentNotFound(root)));
    }
}

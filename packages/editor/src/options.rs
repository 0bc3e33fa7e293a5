//! # Manipulation Options
//!
//! The edits currently legal for a node. Options are values: they describe an
//! edit against the tree as it was when they were produced and are executed
//! through [`ManipulationOption::execute`].
//!
//! ## Staleness
//!
//! Every option remembers the revision of the node it was produced for. Any
//! structural change that invalidates that node's options bumps the revision,
//! so executing an old option fails with [`MutationError::StaleOption`]
//! instead of editing a tree that no longer looks the way it did.

use crate::errors::MutationError;
use crate::model::DocumentModel;
use serde::{Deserialize, Serialize};
use std::fmt;
use xsdedit_dom::NodeId;
use xsdedit_schema::ConstraintId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ManipulationKind {
    AddSibling,
    AddChild,
    AddAttribute,
    Remove,
    RemoveAttribute,
    ChooseAlternative,
}

/// What executing an option does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Manipulation {
    /// Another occurrence of `constraint` right after `after`
    AddSibling {
        constraint: ConstraintId,
        parent: NodeId,
        after: NodeId,
    },
    /// A child that is currently absent; `None` puts it first
    AddChild {
        constraint: ConstraintId,
        parent: NodeId,
        after: Option<NodeId>,
    },
    AddAttribute {
        constraint: ConstraintId,
        element: NodeId,
    },
    Remove {
        node: NodeId,
    },
    RemoveAttribute {
        attribute: NodeId,
    },
    /// Swap `to_replace` for another alternative of its choice
    ChooseAlternative {
        replacement: ConstraintId,
        parent: NodeId,
        after: Option<NodeId>,
        to_replace: NodeId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManipulationOption {
    objective: String,
    anchor: NodeId,
    revision: u64,
    action: Manipulation,
}

impl ManipulationOption {
    pub(crate) fn new(objective: impl Into<String>, anchor: NodeId, revision: u64, action: Manipulation) -> Self {
        Self {
            objective: objective.into(),
            anchor,
            revision,
            action,
        }
    }

    pub fn kind(&self) -> ManipulationKind {
        match self.action {
            Manipulation::AddSibling { .. } => ManipulationKind::AddSibling,
            Manipulation::AddChild { .. } => ManipulationKind::AddChild,
            Manipulation::AddAttribute { .. } => ManipulationKind::AddAttribute,
            Manipulation::Remove { .. } => ManipulationKind::Remove,
            Manipulation::RemoveAttribute { .. } => ManipulationKind::RemoveAttribute,
            Manipulation::ChooseAlternative { .. } => ManipulationKind::ChooseAlternative,
        }
    }

    /// Name of the element or attribute the edit is about
    pub fn objective(&self) -> &str {
        &self.objective
    }

    /// The node whose options this belongs to
    pub fn anchor(&self) -> NodeId {
        self.anchor
    }

    pub fn action(&self) -> &Manipulation {
        &self.action
    }

    pub fn description(&self) -> String {
        let verb = match self.kind() {
            ManipulationKind::AddSibling => "Add additional",
            ManipulationKind::AddChild => "Add child node",
            ManipulationKind::AddAttribute => "Add attribute",
            ManipulationKind::Remove => "Remove this",
            ManipulationKind::RemoveAttribute => "Remove attribute",
            ManipulationKind::ChooseAlternative => "Choose alternative",
        };
        format!("{verb} \"{}\"", self.objective)
    }

    /// Apply the edit. Returns the node that was added, if any.
    pub fn execute(&self, model: &mut DocumentModel) -> Result<Option<NodeId>, MutationError> {
        if !model.is_current(self.anchor, self.revision) {
            return Err(MutationError::StaleOption(self.description()));
        }
        match self.action {
            Manipulation::AddSibling {
                constraint,
                parent,
                after,
            } => model.add_node_like(constraint, parent, Some(after)).map(Some),
            Manipulation::AddChild {
                constraint,
                parent,
                after,
            } => model.add_node_like(constraint, parent, after).map(Some),
            Manipulation::AddAttribute { constraint, element } => {
                model.add_attribute_like(constraint, element).map(Some)
            }
            Manipulation::Remove { node } => model.remove_node(node).map(|_| None),
            Manipulation::RemoveAttribute { attribute } => model.remove_node(attribute).map(|_| None),
            Manipulation::ChooseAlternative {
                replacement,
                parent,
                after,
                to_replace,
            } => model
                .choose_alternative(replacement, parent, after, to_replace)
                .map(Some),
        }
    }
}

impl fmt::Display for ManipulationOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

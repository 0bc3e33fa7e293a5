//! # Editor
//!
//! Schema-guided editing of one XML document at a time.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ schema: ConstraintTree + ScalarValidator    │
//! │ rules:  RuleSet (premise ⇒ conclusion)      │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: DocumentModel                       │
//! │  - TreeManager: bindings, caches, IDs       │
//! │  - ManipulationOption: the legal edits      │
//! │  - ValidationResult: type + rule state      │
//! │  - Notifications for the user               │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ dom: XmlDocument, read and written as XML   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Every node is bound**: a loaded or edited document never holds a node
//!    without its constraint
//! 2. **Only legal edits are offered**: options come from the constraint tree
//!    and respect occurrence bounds
//! 3. **Problems are data**: bad values and violated rules are validation
//!    results, not errors
//!
//! ## Usage
//!
//! ```rust,ignore
//! use xsdedit_editor::{DocumentModel, EditorConfig};
//!
//! let schema = XsdSchema::parse(&xsd_source)?;
//! let rules = RuleSet::from_xml_str(&rule_source)?;
//! let mut model = DocumentModel::load_with(&xml, &schema, rules, EditorConfig::default())?;
//!
//! let root = model.root().unwrap();
//! for option in model.manipulation_options(root) {
//!     println!("{}", option.description());
//! }
//! let option = model.manipulation_options(root).remove(0);
//! option.execute(&mut model)?;
//!
//! let xml = model.to_xml_string()?;
//! ```

mod config;
mod errors;
mod id_registry;
mod model;
mod notifications;
mod options;
mod projection;
mod tree_manager;
mod validation;

pub use config::EditorConfig;
pub use errors::{EditorError, EditorResult, MutationError};
pub use id_registry::IdRegistry;
pub use model::DocumentModel;
pub use notifications::{Notification, NotificationKind, Notifier, RuleViolation};
pub use options::{Manipulation, ManipulationKind, ManipulationOption};
pub use projection::UiProjection;
pub use tree_manager::TreeManager;
pub use validation::ValidationResult;

// Re-export common types for convenience
pub use xsdedit_dom::{NodeId, XmlDocument};
pub use xsdedit_rules::{RuleId, RuleSet};
pub use xsdedit_schema::{ConstraintId, ConstraintTree};

//! # Document Tree
//!
//! The XML document the editor works on, kept as an arena so the rest of the
//! workspace can hold cheap [`NodeId`] handles in its caches.
//!
//! - [`XmlDocument`]: nodes, structure edits, leaf values, occurrence counts
//! - [`parse`] / [`to_xml_string`]: reading and writing XML text
//! - [`DocPath`]: the small path subset rule parameters resolve through

mod document;
mod error;
mod node;
mod path;
mod reader;
mod writer;

pub use document::XmlDocument;
pub use error::{DomError, DomResult};
pub use node::{NodeId, NodeKind};
pub use path::DocPath;
pub use reader::parse;
pub use writer::{fragment_to_string, to_xml_string};

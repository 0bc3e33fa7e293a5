//! # Paths
//!
//! A deliberately small location-path subset:
//!
//! ```text
//! path  := "/"? step ("/" step)* ("/" "@" name)?
//! step  := name ("[" position "]")?
//! ```
//!
//! Steps select element children by name, `[n]` keeps the n-th match (1-based) per
//! context node, and a final `@name` step selects an attribute. Evaluation starts at
//! the document node, so `root/child` and `/root/child` are the same path.

use crate::document::XmlDocument;
use crate::error::{DomError, DomResult};
use crate::node::NodeId;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    name: String,
    position: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocPath {
    steps: Vec<Step>,
    attribute: Option<String>,
}

impl DocPath {
    pub fn parse(path: &str) -> DomResult<Self> {
        let trimmed = path.trim();
        let body = trimmed.strip_prefix('/').unwrap_or(trimmed);
        if body.is_empty() {
            return Err(DomError::invalid_path(path, "empty path"));
        }

        let segments: Vec<&str> = body.split('/').collect();
        let mut steps = Vec::with_capacity(segments.len());
        let mut attribute = None;

        for (index, segment) in segments.iter().enumerate() {
            if let Some(name) = segment.strip_prefix('@') {
                if index + 1 != segments.len() {
                    return Err(DomError::invalid_path(path, "attribute step must come last"));
                }
                check_name(path, name)?;
                attribute = Some(name.to_string());
                continue;
            }
            steps.push(parse_step(path, segment)?);
        }

        if steps.is_empty() {
            return Err(DomError::invalid_path(path, "no element step"));
        }

        Ok(Self { steps, attribute })
    }

    pub fn selects_attribute(&self) -> bool {
        self.attribute.is_some()
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.steps {
            write!(f, "/{}", step.name)?;
            if let Some(position) = step.position {
                write!(f, "[{position}]")?;
            }
        }
        if let Some(attribute) = &self.attribute {
            write!(f, "/@{attribute}")?;
        }
        Ok(())
    }
}

fn parse_step(path: &str, segment: &str) -> DomResult<Step> {
    let (name, position) = match segment.find('[') {
        Some(open) => {
            let predicate = segment[open + 1..]
                .strip_suffix(']')
                .ok_or_else(|| DomError::invalid_path(path, format!("unclosed predicate in '{segment}'")))?;
            let position: usize = predicate
                .trim()
                .parse()
                .map_err(|_| DomError::invalid_path(path, format!("'{predicate}' is not a position")))?;
            if position == 0 {
                return Err(DomError::invalid_path(path, "positions start at 1"));
            }
            (&segment[..open], Some(position))
        }
        None => (segment, None),
    };
    check_name(path, name)?;
    Ok(Step {
        name: name.to_string(),
        position,
    })
}

fn check_name(path: &str, name: &str) -> DomResult<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'));
    if valid {
        Ok(())
    } else {
        Err(DomError::invalid_path(path, format!("invalid name '{name}'")))
    }
}

impl XmlDocument {
    /// Nodes matched by `path`, in document order
    pub fn select(&self, path: &DocPath) -> Vec<NodeId> {
        let mut context = vec![self.document_node()];

        for step in &path.steps {
            let mut next = Vec::new();
            for node in &context {
                let matches = self
                    .element_children(*node)
                    .filter(|child| self.name(*child) == step.name);
                match step.position {
                    Some(position) => next.extend(matches.skip(position - 1).take(1)),
                    None => next.extend(matches),
                }
            }
            context = next;
        }

        match &path.attribute {
            Some(name) => context
                .into_iter()
                .filter_map(|element| self.attribute(element, name))
                .collect(),
            None => context,
        }
    }

    pub fn select_first(&self, path: &DocPath) -> Option<NodeId> {
        self.select(path).into_iter().next()
    }
}

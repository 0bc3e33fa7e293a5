//! XML text → [`XmlDocument`]
//!
//! Comments, processing instructions and the doctype are dropped.
//! Whitespace-only text is dropped as well; every consumer of the tree skips it anyway.

use crate::document::XmlDocument;
use crate::error::{DomError, DomResult};
use crate::node::NodeId;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

/// Parse a complete XML document
pub fn parse(xml: &str) -> DomResult<XmlDocument> {
    let mut reader = Reader::from_str(xml);
    let mut doc = XmlDocument::new();
    let mut stack: Vec<NodeId> = vec![doc.document_node()];
    let mut text = String::new();

    loop {
        let position = reader.buffer_position() as u64;
        let event = reader
            .read_event()
            .map_err(|e| DomError::syntax(position, e.to_string()))?;

        match event {
            Event::Start(start) => {
                flush_text(&mut doc, &stack, &mut text)?;
                let element = open_element(&mut doc, &start, position)?;
                attach(&mut doc, &stack, element)?;
                stack.push(element);
            }
            Event::Empty(start) => {
                flush_text(&mut doc, &stack, &mut text)?;
                let element = open_element(&mut doc, &start, position)?;
                attach(&mut doc, &stack, element)?;
            }
            Event::End(end) => {
                flush_text(&mut doc, &stack, &mut text)?;
                let name = String::from_utf8_lossy(end.name().as_ref()).into_owned();
                if stack.len() < 2 {
                    return Err(DomError::UnbalancedEndTag(name));
                }
                stack.pop();
            }
            Event::Text(content) => {
                let raw = String::from_utf8_lossy(&content);
                let decoded = unescape(&raw).map_err(|e| DomError::syntax(position, e.to_string()))?;
                text.push_str(&decoded);
            }
            Event::CData(content) => {
                text.push_str(&String::from_utf8_lossy(&content));
            }
            Event::GeneralRef(reference) => {
                let entity = format!("&{};", String::from_utf8_lossy(&reference));
                let resolved =
                    unescape(&entity).map_err(|e| DomError::syntax(position, e.to_string()))?;
                text.push_str(&resolved);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if stack.len() > 1 {
        let open = stack.last().map(|id| doc.name(*id).to_string()).unwrap_or_default();
        return Err(DomError::syntax(reader.buffer_position() as u64, format!("unclosed element <{open}>")));
    }
    if doc.root_element().is_none() {
        return Err(DomError::MissingRoot);
    }

    debug!(nodes = doc.subtree(doc.document_node()).len(), "Parsed XML document");
    Ok(doc)
}

fn open_element(doc: &mut XmlDocument, start: &BytesStart, position: u64) -> DomResult<NodeId> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let element = doc.create_element(name);

    for attr in start.attributes() {
        let attr = attr.map_err(|e| DomError::syntax(position, e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let raw = String::from_utf8_lossy(&attr.value);
        let value = unescape(&raw).map_err(|e| DomError::syntax(position, e.to_string()))?;
        let node = doc.create_attribute(key, value.into_owned());
        doc.set_attribute_node(element, node)?;
    }

    Ok(element)
}

fn attach(doc: &mut XmlDocument, stack: &[NodeId], element: NodeId) -> DomResult<()> {
    let parent = stack.last().copied().unwrap_or(doc.document_node());
    if parent == doc.document_node() && doc.root_element().is_some() {
        return Err(DomError::MultipleRoots);
    }
    doc.append_child(parent, element)
}

fn flush_text(doc: &mut XmlDocument, stack: &[NodeId], text: &mut String) -> DomResult<()> {
    if text.trim().is_empty() {
        text.clear();
        return Ok(());
    }
    let parent = stack.last().copied().unwrap_or(doc.document_node());
    let content = std::mem::take(text);
    if parent == doc.document_node() {
        // Character data outside the root element is not well-formed; drop it.
        return Ok(());
    }
    let node = doc.create_text(content);
    doc.append_child(parent, node)
}

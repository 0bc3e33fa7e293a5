//! [`XmlDocument`] → XML text

use crate::document::XmlDocument;
use crate::error::{DomError, DomResult};
use crate::node::{NodeId, NodeKind};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;

/// Serialize the whole document with an XML declaration.
///
/// `indent` is the number of spaces per nesting level; zero writes everything on one line.
pub fn to_xml_string(doc: &XmlDocument, indent: usize) -> DomResult<String> {
    let root = doc.root_element().ok_or(DomError::MissingRoot)?;
    let mut writer = if indent > 0 {
        Writer::new_with_indent(Vec::new(), b' ', indent)
    } else {
        Writer::new(Vec::new())
    };

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(|e| DomError::Write(e.to_string()))?;
    write_node(&mut writer, doc, root)?;

    String::from_utf8(writer.into_inner()).map_err(|e| DomError::Write(e.to_string()))
}

/// Serialize a single element subtree without a declaration
pub fn fragment_to_string(doc: &XmlDocument, node: NodeId) -> DomResult<String> {
    let mut writer = Writer::new(Vec::new());
    write_node(&mut writer, doc, node)?;
    String::from_utf8(writer.into_inner()).map_err(|e| DomError::Write(e.to_string()))
}

fn write_node<W: Write>(writer: &mut Writer<W>, doc: &XmlDocument, node: NodeId) -> DomResult<()> {
    match doc.kind(node) {
        Some(NodeKind::Element) => {
            let name = doc.name(node);
            let mut start = BytesStart::new(name);
            for attr in doc.attributes(node) {
                start.push_attribute((doc.name(*attr), doc.node_value(*attr).as_str()));
            }

            let children = doc.children(node);
            if children.is_empty() {
                writer
                    .write_event(Event::Empty(start))
                    .map_err(|e| DomError::Write(e.to_string()))?;
                return Ok(());
            }

            writer
                .write_event(Event::Start(start))
                .map_err(|e| DomError::Write(e.to_string()))?;
            for child in children {
                write_node(writer, doc, *child)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new(name)))
                .map_err(|e| DomError::Write(e.to_string()))?;
            Ok(())
        }
        Some(NodeKind::Text) => {
            let text = doc.node_value(node);
            writer
                .write_event(Event::Text(BytesText::new(&text)))
                .map_err(|e| DomError::Write(e.to_string()))?;
            Ok(())
        }
        Some(_) => Err(DomError::InvalidChild(node)),
        None => Err(DomError::NodeNotFound(node)),
    }
}

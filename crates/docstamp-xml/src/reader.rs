//! XML reader building a [`Document`] from text.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::XmlError;
use crate::tree::{Document, NodeData, NodeId, local_name};

/// Elements whose whitespace-only text is significant.
const TEXT_CONTAINERS: &[&str] = &["t", "delText", "instrText"];

/// Parse an XML string into a [`Document`].
///
/// Comments, processing instructions and doctype declarations are dropped.
/// Whitespace-only text is kept only inside text containers such as `w:t`,
/// so pretty-printed input produces the same tree as compact input.
///
/// # Errors
///
/// Returns an error if the input is not well-formed XML or has no root element.
pub fn parse(xml: &str) -> Result<Document, XmlError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut doc: Option<Document> = None;
    let mut stack: Vec<NodeId> = Vec::new();
    let mut declaration = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let id = open_element(&reader, &mut doc, &stack, &e)?;
                stack.push(id);
            }
            Event::Empty(e) => {
                open_element(&reader, &mut doc, &stack, &e)?;
            }
            Event::End(_) => {
                stack.pop();
            }
            Event::Text(e) => {
                let text = reader.decoder().decode(&e)?.into_owned();
                append_text(&mut doc, &stack, &text);
            }
            Event::GeneralRef(e) => {
                let entity = reader.decoder().decode(&e)?.into_owned();
                append_text(&mut doc, &stack, &decode_entity(&entity));
            }
            Event::CData(e) => {
                let text = String::from_utf8_lossy(&e).into_owned();
                append_text(&mut doc, &stack, &text);
            }
            Event::Decl(_) => declaration = true,
            Event::Eof => break,
            Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
        }
    }

    let mut doc = doc.ok_or(XmlError::MissingRoot)?;
    doc.set_declaration(declaration);
    tracing::debug!(declaration, "Parsed XML document");
    Ok(doc)
}

fn open_element(
    reader: &Reader<&[u8]>,
    doc: &mut Option<Document>,
    stack: &[NodeId],
    e: &BytesStart,
) -> Result<NodeId, XmlError> {
    let name = decode_name(reader, e.name().as_ref());

    let id = if let Some(existing) = doc.as_mut() {
        let id = existing.create_element(&name);
        let parent = if let Some(&parent) = stack.last() {
            parent
        } else {
            // Second top-level element: keep it under the root so nothing is lost.
            tracing::warn!(element = %name, "Multiple root elements, nesting under the first");
            existing.root()
        };
        existing.append_child(parent, id);
        id
    } else {
        doc.insert(Document::new(&name)).root()
    };
    let Some(doc) = doc.as_mut() else {
        return Err(XmlError::MissingRoot);
    };

    for attr in e.attributes() {
        let attr = attr?;
        let key = decode_name(reader, attr.key.as_ref());
        let value = attr.unescape_value().map_or_else(
            |_| String::from_utf8_lossy(&attr.value).into_owned(),
            std::borrow::Cow::into_owned,
        );
        doc.set_attr(id, &key, &value);
    }
    Ok(id)
}

fn decode_name(reader: &Reader<&[u8]>, name: &[u8]) -> String {
    reader.decoder().decode(name).map_or_else(
        |_| String::from_utf8_lossy(name).into_owned(),
        std::borrow::Cow::into_owned,
    )
}

/// Append text to the current element, merging with a preceding text node.
fn append_text(doc: &mut Option<Document>, stack: &[NodeId], text: &str) {
    let (Some(doc), Some(&parent)) = (doc.as_mut(), stack.last()) else {
        return;
    };

    let significant = doc
        .name(parent)
        .is_some_and(|name| TEXT_CONTAINERS.contains(&local_name(name)));
    if !significant && text.trim().is_empty() {
        return;
    }

    if let Some(&last) = doc.children(parent).last()
        && let NodeData::Text(existing) = doc.data(last)
    {
        let merged = format!("{existing}{text}");
        doc.set_text(last, &merged);
        return;
    }
    let node = doc.create_text(text);
    doc.append_child(parent, node);
}

/// Decode XML entity references to their character values.
fn decode_entity(entity: &str) -> String {
    match entity {
        "lt" => "<".to_owned(),
        "gt" => ">".to_owned(),
        "amp" => "&".to_owned(),
        "apos" => "'".to_owned(),
        "quot" => "\"".to_owned(),
        s if s.starts_with('#') => {
            let code = if s.starts_with("#x") || s.starts_with("#X") {
                u32::from_str_radix(&s[2..], 16).ok()
            } else {
                s[1..].parse::<u32>().ok()
            };
            code.and_then(char::from_u32)
                .map_or_else(|| format!("&{entity};"), |c| c.to_string())
        }
        _ => format!("&{entity};"),
    }
}

//! XML writer for [`Document`] trees.

use std::fmt::Write;

use crate::tree::{Document, NodeData, NodeId};

const DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// Serialize the whole document, including the XML declaration when the
/// source had one.
pub fn serialize(doc: &Document) -> String {
    let mut out = String::with_capacity(4096);
    if doc.has_declaration() {
        out.push_str(DECLARATION);
        out.push('\n');
    }
    write_node(doc, doc.root(), &mut out);
    out
}

/// Serialize a single node and its subtree. Works for detached nodes too.
pub fn serialize_node(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    write_node(doc, id, &mut out);
    out
}

fn write_node(doc: &Document, id: NodeId, out: &mut String) {
    match doc.data(id) {
        NodeData::Text(text) => out.push_str(&escape_text(text)),
        NodeData::Element(element) => {
            out.push('<');
            out.push_str(&element.name);
            for (key, value) in &element.attrs {
                let _ = write!(out, r#" {}="{}""#, key, escape_attr(value));
            }

            let children = doc.children(id);
            if children.is_empty() {
                out.push_str("/>");
                return;
            }
            out.push('>');
            for &child in children {
                write_node(doc, child, out);
            }
            let _ = write!(out, "</{}>", element.name);
        }
    }
}

/// Escape text for XML content.
fn escape_text(text: &str) -> String {
    escape_xml(text, false)
}

/// Escape text for XML attribute values.
fn escape_attr(text: &str) -> String {
    escape_xml(text, true)
}

/// Escape XML special characters.
fn escape_xml(text: &str, escape_quotes: bool) -> String {
    let mut result = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' if escape_quotes => result.push_str("&quot;"),
            '\'' if escape_quotes => result.push_str("&apos;"),
            _ => result.push(ch),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_roundtrip_document() {
        let xml = r#"<w:document xmlns:w="urn:w"><w:body><w:p><w:r><w:t xml:space="preserve">a b</w:t></w:r></w:p><w:sectPr/></w:body></w:document>"#;
        let doc = parse(xml).unwrap();
        assert_eq!(serialize(&doc), xml);
    }

    #[test]
    fn test_serialize_declaration() {
        let doc = parse(r#"<?xml version="1.0"?><root/>"#).unwrap();
        assert_eq!(serialize(&doc), format!("{DECLARATION}\n<root/>"));
    }

    #[test]
    fn test_escape_special_chars() {
        let mut doc = Document::new("w:t");
        let root = doc.root();
        doc.set_text(root, "a < b & c > d");
        doc.set_attr(root, "title", r#"say "hi""#);
        assert_eq!(
            serialize(&doc),
            r#"<w:t title="say &quot;hi&quot;">a &lt; b &amp; c &gt; d</w:t>"#
        );
    }

    #[test]
    fn test_serialize_detached_node() {
        let mut doc = Document::new("root");
        let p = doc.create_element("w:p");
        let text = doc.create_text("x");
        doc.append_child(p, text);
        assert_eq!(serialize_node(&doc, p), "<w:p>x</w:p>");
    }
}

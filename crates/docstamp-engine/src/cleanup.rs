//! Final pass removing processing artifacts.

use std::collections::HashSet;

use docstamp_xml::{Document, NodeId};

use crate::pattern::PatternType;
use crate::settings::ProcessSettings;
use crate::wml::{
    self, DRAWING_PROPERTIES, END_PREFIX, INSERTION_POINT_ATTR, MARKER_ATTR, PARAGRAPH, TABLE_CELL,
};

pub(crate) fn cleanup(doc: &mut Document, root: NodeId, settings: &ProcessSettings) {
    remove_insertion_points(doc, root);
    remove_directive_text(doc, root, settings.strip_empty_paragraphs);
    deduplicate_drawing_ids(doc, root);
    ensure_cell_paragraphs(doc, root);
}

/// Drop synthesized anchors and empty boundary rows; strip end markers from
/// real content.
fn remove_insertion_points(doc: &mut Document, root: NodeId) {
    for node in doc.descendants(root) {
        let Some(is_end) = doc
            .attr(node, INSERTION_POINT_ATTR)
            .map(|id| id.starts_with(END_PREFIX))
        else {
            continue;
        };
        if !is_end || doc.children(node).is_empty() {
            doc.detach(node);
        } else {
            doc.remove_attr(node, INSERTION_POINT_ATTR);
        }
    }
}

/// Remove the text of block directives. Paragraphs left without visible
/// content are removed too when `strip_paragraphs` is set.
fn remove_directive_text(doc: &mut Document, root: NodeId, strip_paragraphs: bool) {
    let mut paragraphs: Vec<NodeId> = Vec::new();
    for node in wml::text_elements(doc, root) {
        match wml::marker(doc, node) {
            None => {}
            Some(PatternType::Variable) => {
                doc.remove_attr(node, MARKER_ATTR);
            }
            Some(_) => {
                if let Some(paragraph) = wml::remove_with_empty_run(doc, node)
                    && !paragraphs.contains(&paragraph)
                {
                    paragraphs.push(paragraph);
                }
            }
        }
    }

    if !strip_paragraphs {
        return;
    }
    for paragraph in paragraphs {
        if doc.parent(paragraph).is_some()
            && wml::is_paragraph_empty(doc, paragraph)
            && !wml::is_sole_cell_paragraph(doc, paragraph)
        {
            doc.detach(paragraph);
        }
    }
}

/// Give every drawing a unique `id`.
///
/// Repeated content duplicates drawing ids, which Word reports as a corrupt
/// document. Later duplicates get the lowest unused ids.
fn deduplicate_drawing_ids(doc: &mut Document, root: NodeId) {
    let drawings: Vec<(NodeId, u32)> = doc
        .descendants(root)
        .into_iter()
        .filter(|&node| doc.is_element(node, DRAWING_PROPERTIES))
        .filter_map(|node| Some((node, doc.attr(node, "id")?.parse().ok()?)))
        .collect();

    let mut used: HashSet<u32> = drawings.iter().map(|&(_, id)| id).collect();
    let mut seen: HashSet<u32> = HashSet::new();
    let mut next = 1u32;
    for (node, id) in drawings {
        if seen.insert(id) {
            continue;
        }
        while used.contains(&next) {
            next += 1;
        }
        doc.set_attr(node, "id", &next.to_string());
        tracing::debug!(from = id, to = next, "Renumbered duplicate drawing id");
        used.insert(next);
        seen.insert(next);
    }
}

/// Word requires at least one paragraph in every table cell.
fn ensure_cell_paragraphs(doc: &mut Document, root: NodeId) {
    let cells: Vec<NodeId> = doc
        .descendants(root)
        .into_iter()
        .filter(|&node| doc.is_element(node, TABLE_CELL))
        .collect();
    for cell in cells {
        if !doc.element_children(cell).any(|c| doc.is_element(c, PARAGRAPH)) {
            let paragraph = doc.create_element(PARAGRAPH);
            doc.append_child(cell, paragraph);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docstamp_xml::{parse, serialize};
    use pretty_assertions::assert_eq;

    fn run(xml: &str, strip: bool) -> String {
        let mut doc = parse(xml).unwrap();
        let root = doc.root();
        let settings = ProcessSettings::default().with_strip_empty_paragraphs(strip);
        cleanup(&mut doc, root, &settings);
        serialize(&doc)
    }

    #[test]
    fn test_removes_boundary_rows_and_markers() {
        assert_eq!(
            run(
                r#"<w:tbl><w:tr dsIp="End_None_1"/><w:tr><w:tc><w:p dsIp="End_None_2"><w:r><w:t>a</w:t></w:r></w:p></w:tc></w:tr><w:tr dsIp="None_3"/></w:tbl>"#,
                true
            ),
            "<w:tbl><w:tr><w:tc><w:p><w:r><w:t>a</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"
        );
    }

    #[test]
    fn test_removes_directive_paragraphs() {
        let xml = r#"<w:body><w:p><w:r><w:t dsMrk="CollectionStart">{{#A}}</w:t></w:r></w:p><w:p><w:r><w:t dsMrk="Variable">x</w:t><w:t dsMrk="CollectionEnd">{{/A}}</w:t></w:r></w:p></w:body>"#;
        assert_eq!(
            run(xml, true),
            "<w:body><w:p><w:r><w:t>x</w:t></w:r></w:p></w:body>"
        );
        assert_eq!(
            run(xml, false),
            "<w:body><w:p/><w:p><w:r><w:t>x</w:t></w:r></w:p></w:body>"
        );
    }

    #[test]
    fn test_keeps_sole_cell_paragraph() {
        assert_eq!(
            run(
                r#"<w:tc><w:p><w:pPr/><w:r><w:t dsMrk="ConditionEnd">{{/}}</w:t></w:r></w:p></w:tc>"#,
                true
            ),
            "<w:tc><w:p><w:pPr/></w:p></w:tc>"
        );
    }

    #[test]
    fn test_deduplicates_drawing_ids() {
        let out = run(
            r#"<w:body><wp:docPr id="1" name="a"/><wp:docPr id="1" name="b"/><wp:docPr id="2" name="c"/><wp:docPr id="2" name="d"/></w:body>"#,
            true,
        );
        assert_eq!(
            out,
            r#"<w:body><wp:docPr id="1" name="a"/><wp:docPr id="3" name="b"/><wp:docPr id="2" name="c"/><wp:docPr id="4" name="d"/></w:body>"#
        );
    }

    #[test]
    fn test_adds_paragraph_to_empty_cell() {
        assert_eq!(
            run("<w:tr><w:tc><w:tcPr/></w:tc></w:tr>", true),
            "<w:tr><w:tc><w:tcPr/><w:p/></w:tc></w:tr>"
        );
    }
}

//! WordprocessingML element names and structural helpers.

use docstamp_xml::{Document, NodeId, is_property_element};

use crate::pattern::PatternType;

pub const BODY: &str = "w:body";
pub const PARAGRAPH: &str = "w:p";
pub const RUN: &str = "w:r";
pub const TEXT: &str = "w:t";
pub const BREAK: &str = "w:br";
pub const TABLE: &str = "w:tbl";
pub const TABLE_ROW: &str = "w:tr";
pub const TABLE_CELL: &str = "w:tc";
pub const PROOF_ERROR: &str = "w:proofErr";
pub const BOOKMARK_START: &str = "w:bookmarkStart";
pub const BOOKMARK_END: &str = "w:bookmarkEnd";
pub const DRAWING_PROPERTIES: &str = "wp:docPr";

/// Attribute naming the directive type of an isolated `w:t`.
pub(crate) const MARKER_ATTR: &str = "dsMrk";
/// Attribute carrying an insertion point identifier.
pub(crate) const INSERTION_POINT_ATTR: &str = "dsIp";
/// Identifier prefix of end-of-block markers.
pub(crate) const END_PREFIX: &str = "End_";

const XML_SPACE: &str = "xml:space";

/// Create a `w:t` element that preserves surrounding whitespace.
pub(crate) fn create_text(doc: &mut Document, text: &str) -> NodeId {
    let node = doc.create_element(TEXT);
    doc.set_attr(node, XML_SPACE, "preserve");
    doc.set_text(node, text);
    node
}

/// Replace the content of a `w:t`, keeping whitespace significant.
pub(crate) fn set_text(doc: &mut Document, node: NodeId, text: &str) {
    doc.set_attr(node, XML_SPACE, "preserve");
    doc.set_text(node, text);
}

/// Directive type recorded on an isolated `w:t`.
pub(crate) fn marker(doc: &Document, node: NodeId) -> Option<PatternType> {
    doc.attr(node, MARKER_ATTR).and_then(PatternType::from_name)
}

/// Whether the node holds directive text that disappears during cleanup.
pub(crate) fn is_directive_text(doc: &Document, node: NodeId) -> bool {
    marker(doc, node).is_some_and(|kind| kind != PatternType::Variable)
}

/// Whether the node is the start anchor of a block.
pub(crate) fn is_anchor(doc: &Document, node: NodeId) -> bool {
    doc.attr(node, INSERTION_POINT_ATTR)
        .is_some_and(|id| !id.starts_with(END_PREFIX))
}

/// Whether a paragraph holds nothing a reader would see.
///
/// Whitespace, directive text and property elements do not count. Start
/// anchors of blocks still waiting for expansion do, so their paragraph
/// survives until they are resolved.
pub(crate) fn is_paragraph_empty(doc: &Document, paragraph: NodeId) -> bool {
    doc.children(paragraph)
        .iter()
        .all(|&child| is_blank(doc, child, true))
}

fn is_blank(doc: &Document, node: NodeId, in_paragraph: bool) -> bool {
    let Some(name) = doc.name(node) else {
        return doc.text(node).is_none_or(|text| text.trim().is_empty());
    };
    if is_property_element(name) {
        return true;
    }
    if is_anchor(doc, node) {
        return false;
    }
    match name {
        TEXT => is_directive_text(doc, node) || doc.inner_text(node).trim().is_empty(),
        RUN if in_paragraph => doc
            .children(node)
            .iter()
            .all(|&child| is_blank(doc, child, false)),
        _ => false,
    }
}

/// Remove a run child, taking the run along when nothing else remains.
///
/// Returns the enclosing paragraph, if any.
pub(crate) fn remove_with_empty_run(doc: &mut Document, node: NodeId) -> Option<NodeId> {
    let paragraph = doc.ancestor_named(node, PARAGRAPH);
    let parent = doc.parent(node);
    doc.detach(node);
    if let Some(run) = parent.filter(|&p| doc.is_element(p, RUN))
        && !doc.has_content(run)
    {
        doc.detach(run);
    }
    paragraph
}

/// Whether a paragraph is the only paragraph of a table cell.
pub(crate) fn is_sole_cell_paragraph(doc: &Document, paragraph: NodeId) -> bool {
    doc.parent(paragraph)
        .filter(|&cell| doc.is_element(cell, TABLE_CELL))
        .is_some_and(|cell| {
            doc.element_children(cell)
                .filter(|&c| doc.is_element(c, PARAGRAPH))
                .count()
                == 1
        })
}

/// `w:t` elements under `root`, in document order.
pub(crate) fn text_elements(doc: &Document, root: NodeId) -> Vec<NodeId> {
    let mut texts: Vec<NodeId> = doc
        .descendants(root)
        .into_iter()
        .filter(|&id| doc.is_element(id, TEXT))
        .collect();
    if doc.is_element(root, TEXT) {
        texts.insert(0, root);
    }
    texts
}

/// `w:t` elements under `root` holding an unsubstituted variable.
///
/// Binding drivers use this to find the nodes they have to fill in.
pub fn variable_nodes(doc: &Document, root: NodeId) -> Vec<NodeId> {
    text_elements(doc, root)
        .into_iter()
        .filter(|&id| marker(doc, id) == Some(PatternType::Variable))
        .collect()
}

/// Write a substituted value into a variable node and drop its marker.
///
/// Line breaks in the value become `w:br` elements inside the run.
pub fn write_value(doc: &mut Document, node: NodeId, value: &str) {
    doc.remove_attr(node, MARKER_ATTR);
    let mut lines = value.split('\n').map(|line| line.trim_end_matches('\r'));
    set_text(doc, node, lines.next().unwrap_or_default());

    let mut cursor = node;
    for line in lines {
        let br = doc.create_element(BREAK);
        doc.insert_after(cursor, br);
        let text = create_text(doc, line);
        doc.insert_after(br, text);
        cursor = text;
    }
}

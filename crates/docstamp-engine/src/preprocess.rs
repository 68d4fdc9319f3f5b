//! Document preparation before directives are matched.

use docstamp_xml::{Document, NodeId, is_property_element};

use crate::block::Marker;
use crate::wml::{self, BOOKMARK_END, BOOKMARK_START, BREAK, PARAGRAPH, PROOF_ERROR, RUN, TEXT};

/// Remove spell-check and bookmark markers that would split directive text.
pub(crate) fn remove_markup(doc: &mut Document, root: NodeId) {
    let mut removed = 0usize;
    for node in doc.descendants(root) {
        if doc.is_element(node, PROOF_ERROR) {
            doc.detach(node);
        } else if doc.is_element(node, BOOKMARK_START) || doc.is_element(node, BOOKMARK_END) {
            wml::remove_with_empty_run(doc, node);
        } else {
            continue;
        }
        removed += 1;
    }
    tracing::debug!(removed, "Removed proofing and bookmark markup");
}

/// Remove line breaks between each directive and the nearest text on either
/// side within its paragraph.
pub(crate) fn trim_line_breaks(doc: &mut Document, markers: &[Marker]) {
    for marker in markers {
        let Some(paragraph) = doc.ancestor_named(marker.node, PARAGRAPH) else {
            continue;
        };
        let items = run_items(doc, paragraph);
        let Some(position) = items.iter().position(|&n| n == marker.node) else {
            continue;
        };
        let after = items[position + 1..].iter();
        let before = items[..position].iter().rev();
        for side in [after.copied().collect::<Vec<_>>(), before.copied().collect()] {
            for node in side {
                if doc.is_element(node, TEXT) {
                    break;
                }
                if doc.is_element(node, BREAK) {
                    wml::remove_with_empty_run(doc, node);
                }
            }
        }
    }
}

/// Children of all runs in a paragraph, in document order.
fn run_items(doc: &Document, paragraph: NodeId) -> Vec<NodeId> {
    doc.descendants(paragraph)
        .into_iter()
        .filter(|&node| {
            doc.parent(node).is_some_and(|p| doc.is_element(p, RUN))
                && !doc.name(node).is_some_and(is_property_element)
        })
        .collect()
}

//! Content extraction.

use docstamp_xml::Document;

use super::BlockTree;
use crate::error::TemplateError;

/// Detach every block's content from the document.
///
/// Blocks are handled children first, so a parent's content holds its
/// children's anchors but not their content.
pub(crate) fn extract_content(doc: &mut Document, tree: &mut BlockTree) {
    for id in tree.post_order() {
        let Some(bounds) = tree.get(id).bounds() else {
            continue;
        };
        let content = doc.nodes_between(bounds.first, bounds.last);
        for &node in &content {
            doc.detach(node);
        }
        tracing::trace!(block = id.index(), nodes = content.len(), "Extracted block content");
        tree.get_mut(id).content = content;
    }
}

/// Check that every child block's anchor ended up in its parent's content.
pub(crate) fn validate(doc: &Document, tree: &BlockTree) -> Result<(), TemplateError> {
    for id in tree.pre_order() {
        let block = tree.get(id);
        for &child_id in block.children() {
            let child = tree.get(child_id);
            let Some(insertion_point) = child.insertion_point() else {
                continue;
            };
            let found = block
                .content()
                .iter()
                .any(|&node| insertion_point.resolve(doc, node).is_some());
            if !found {
                return Err(TemplateError::InsertionPointValidation {
                    id: insertion_point.id().to_owned(),
                    directive: child.directive().to_owned(),
                });
            }
        }
    }
    Ok(())
}

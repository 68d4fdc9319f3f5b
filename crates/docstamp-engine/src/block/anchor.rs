//! Boundary placement for blocks.
//!
//! For each block the document is split so that its content becomes a run of
//! siblings under the nearest common ancestor of its start and end
//! directives. The sibling before the content is a new anchor element, the
//! sibling after it holds the end directive. Blocks are handled parents
//! first, so nested blocks see the document already split by their parents.

use docstamp_xml::{Document, NodeId};

use super::{BlockTree, Bounds};
use crate::error::TemplateError;
use crate::insertion_point::InsertionPoint;
use crate::wml::{self, PARAGRAPH, TABLE, TABLE_ROW};

/// Split the document at every block boundary and record anchors.
pub(crate) fn assign_anchors(doc: &mut Document, tree: &mut BlockTree) -> Result<(), TemplateError> {
    for id in tree.pre_order() {
        let block = tree.get(id);
        let kind = block.kind();
        let start = block.start().node;
        let end = block.end().map_or(start, |marker| marker.node);

        let bounds = place(doc, start, end).ok_or_else(|| TemplateError::DisjointBlock {
            directive: block.directive().to_owned(),
        })?;
        let insertion_point = InsertionPoint::create(doc, bounds.first, kind, id.index());
        let end_marker = InsertionPoint::create_end(doc, bounds.last, kind, id.index());
        tracing::trace!(id = insertion_point.id(), "Placed block anchor");

        let block = tree.get_mut(id);
        block.bounds = Some(bounds);
        block.insertion_point = Some(insertion_point);
        block.end_marker = Some(end_marker);
    }
    Ok(())
}

fn place(doc: &mut Document, start: NodeId, end: NodeId) -> Option<Bounds> {
    let ancestor = doc.common_ancestor(start, end)?;

    if doc.is_element(ancestor, TABLE_ROW) {
        // Both directives in one row: the row itself is the content.
        let table = doc.parent(ancestor)?;
        let (first, last) = surround_rows(doc, ancestor, ancestor);
        return Some(Bounds {
            parent: table,
            first,
            last,
        });
    }

    if doc.is_element(ancestor, TABLE) {
        let first_row = doc.child_containing(ancestor, start)?;
        let last_row = doc.child_containing(ancestor, end)?;
        let (first, last) = surround_rows(doc, first_row, last_row);
        return Some(Bounds {
            parent: ancestor,
            first,
            last,
        });
    }

    let start_child = doc.child_containing(ancestor, start)?;
    let end_child = doc.child_containing(ancestor, end)?;

    let parts = doc.split_after(start_child, start);
    let anchor = doc.create_element(PARAGRAPH);
    match parts.as_slice() {
        [tail_owner] if start_child != end_child => {
            // Nothing followed the start directive inside its child, so the
            // anchor goes after it, behind anchors already placed there by
            // enclosing blocks.
            let mut next = doc.next_sibling(*tail_owner);
            while let Some(candidate) = next.filter(|&n| wml::is_anchor(doc, n)) {
                next = doc.next_sibling(candidate);
            }
            match next {
                Some(next) => doc.insert_before(next, anchor),
                None => doc.append_child(ancestor, anchor),
            }
        }
        [.., tail] => doc.insert_before(*tail, anchor),
        [] => return None,
    }

    let last = if start_child == end_child {
        end_child
    } else {
        let parts = doc.split_before(end_child, end);
        *parts.last()?
    };

    Some(Bounds {
        parent: ancestor,
        first: anchor,
        last,
    })
}

/// Insert empty rows before `first` and after `last`.
fn surround_rows(doc: &mut Document, first: NodeId, last: NodeId) -> (NodeId, NodeId) {
    let before = doc.create_element(TABLE_ROW);
    doc.insert_before(first, before);
    let after = doc.create_element(TABLE_ROW);
    doc.insert_after(last, after);
    (before, after)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::block::Marker;
    use crate::block::builder::BlockTreeBuilder;
    use crate::char_map::CharacterMap;
    use crate::pattern::find_patterns;
    use docstamp_xml::{parse, serialize};
    use pretty_assertions::assert_eq;

    pub(crate) fn prepare(xml: &str) -> (Document, BlockTree) {
        let mut doc = parse(xml).unwrap();
        let root = doc.root();
        let mut map = CharacterMap::new(&doc, root);
        let markers: Vec<Marker> = find_patterns(map.text())
            .into_iter()
            .map(|pattern| Marker {
                node: map
                    .isolate(&mut doc, pattern.span(), pattern.pattern_type)
                    .unwrap(),
                pattern,
            })
            .collect();
        let mut tree = BlockTreeBuilder::build(&markers).unwrap();
        assign_anchors(&mut doc, &mut tree).unwrap();
        (doc, tree)
    }

    #[test]
    fn test_anchors_inside_run() {
        let (doc, tree) = prepare("<w:p><w:r><w:t>{{#A}}x{{/A}}</w:t></w:r></w:p>");
        assert_eq!(
            serialize(&doc),
            "<w:p><w:r>\
             <w:t xml:space=\"preserve\" dsMrk=\"CollectionStart\">{{#A}}</w:t>\
             <w:p dsIp=\"CollectionStart_0\"/><w:p dsIp=\"None_1\"/>\
             <w:t xml:space=\"preserve\">x</w:t>\
             <w:t xml:space=\"preserve\" dsMrk=\"CollectionEnd\" dsIp=\"End_None_1\">{{/A}}</w:t>\
             </w:r></w:p>"
        );
        let collection = tree.get(tree.roots()[0]);
        assert_eq!(collection.insertion_point().unwrap().id(), "CollectionStart_0");
        assert!(collection.end_marker().unwrap().is_end());
    }

    #[test]
    fn test_anchors_across_paragraphs() {
        let (doc, tree) = prepare(
            "<w:body><w:p><w:r><w:t>a{{#A}}b</w:t></w:r></w:p>\
             <w:p><w:r><w:t>c</w:t></w:r></w:p>\
             <w:p><w:r><w:t>d{{/A}}e</w:t></w:r></w:p></w:body>",
        );
        let bounds = tree.get(tree.roots()[0]).bounds().unwrap();
        assert_eq!(bounds.parent, doc.root());

        let texts: Vec<String> = doc
            .children(doc.root())
            .iter()
            .map(|&p| doc.inner_text(p))
            .collect();
        assert_eq!(texts, vec!["a{{#A}}", "", "", "b", "c", "d", "{{/A}}e"]);
        assert_eq!(doc.nodes_between(bounds.first, bounds.last).len(), 4);
    }

    #[test]
    fn test_anchors_around_table_row() {
        let (doc, tree) = prepare(
            "<w:tbl><w:tr><w:tc><w:p><w:r><w:t>{{#A}}x</w:t></w:r></w:p></w:tc>\
             <w:tc><w:p><w:r><w:t>y{{/A}}</w:t></w:r></w:p></w:tc></w:tr></w:tbl>",
        );
        let rows: Vec<NodeId> = doc.children(doc.root()).to_vec();
        assert_eq!(rows.len(), 5);
        assert!(rows.iter().all(|&r| doc.is_element(r, TABLE_ROW)));
        let collection = tree.get(tree.roots()[0]).bounds().unwrap();
        let section = tree.get(tree.get(tree.roots()[0]).children()[0]).bounds().unwrap();
        assert_eq!(collection.first, rows[0]);
        assert_eq!(section.first, rows[1]);
        assert_eq!(section.last, rows[3]);
        assert_eq!(collection.last, rows[4]);
    }

    #[test]
    fn test_keyword_anchor_precedes_directive() {
        let (doc, tree) = prepare("<w:r><w:t>a{{:br}}b</w:t></w:r>");
        let keyword = tree.get(tree.roots()[0]);
        let bounds = keyword.bounds().unwrap();
        assert_eq!(bounds.last, keyword.start().node);
        assert_eq!(doc.next_sibling(bounds.first), Some(bounds.last));
        assert!(doc.nodes_between(bounds.first, bounds.last).is_empty());
    }

    #[test]
    fn test_markers_in_separate_trees_are_disjoint() {
        let mut doc = parse("<w:p><w:r><w:t>{{#A}}</w:t></w:r></w:p>").unwrap();
        let start = doc
            .descendants(doc.root())
            .into_iter()
            .find(|&n| doc.is_element(n, "w:t"))
            .unwrap();
        let detached = doc.create_element("w:t");
        let mut patterns = find_patterns("{{#A}}{{/A}}").into_iter();
        let markers = vec![
            Marker {
                node: start,
                pattern: patterns.next().unwrap(),
            },
            Marker {
                node: detached,
                pattern: patterns.next().unwrap(),
            },
        ];
        let mut tree = BlockTreeBuilder::build(&markers).unwrap();

        assert!(matches!(
            assign_anchors(&mut doc, &mut tree),
            Err(TemplateError::DisjointBlock { directive }) if directive == "{{#A}}"
        ));
    }
}

//! Named anchors marking where a block's content is re-inserted.
//!
//! An insertion point is an identifier stored in an attribute on a node.
//! Because the identifier travels with the node, clones of a subtree carry
//! the same insertion points and can be resolved within the clone.

use docstamp_xml::{Document, NodeId};

use crate::pattern::PatternType;
use crate::wml::{END_PREFIX, INSERTION_POINT_ATTR};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertionPoint {
    id: String,
}

impl InsertionPoint {
    /// Mark `node` as the start anchor of a block.
    pub(crate) fn create(doc: &mut Document, node: NodeId, kind: PatternType, seq: usize) -> Self {
        Self::attach(doc, node, format!("{kind}_{seq}"))
    }

    /// Mark `node` as the end boundary of a block.
    pub(crate) fn create_end(
        doc: &mut Document,
        node: NodeId,
        kind: PatternType,
        seq: usize,
    ) -> Self {
        Self::attach(doc, node, format!("{END_PREFIX}{kind}_{seq}"))
    }

    fn attach(doc: &mut Document, node: NodeId, id: String) -> Self {
        doc.set_attr(node, INSERTION_POINT_ATTR, &id);
        Self { id }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_end(&self) -> bool {
        self.id.starts_with(END_PREFIX)
    }

    /// Whether `node` carries this insertion point.
    pub fn is_on(&self, doc: &Document, node: NodeId) -> bool {
        doc.attr(node, INSERTION_POINT_ATTR) == Some(self.id.as_str())
    }

    /// Find the node carrying this insertion point: `scope` itself or its
    /// first descendant in document order.
    pub fn resolve(&self, doc: &Document, scope: NodeId) -> Option<NodeId> {
        if self.is_on(doc, scope) {
            return Some(scope);
        }
        doc.descendants(scope)
            .into_iter()
            .find(|&node| self.is_on(doc, node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docstamp_xml::parse;

    #[test]
    fn test_resolve_in_clone() {
        let mut doc = parse("<w:body><w:p/><w:p/></w:body>").unwrap();
        let second = doc.children(doc.root())[1];
        let ip = InsertionPoint::create(&mut doc, second, PatternType::CollectionStart, 4);
        assert_eq!(ip.id(), "CollectionStart_4");
        assert_eq!(ip.resolve(&doc, doc.root()), Some(second));

        let copy = doc.deep_clone(doc.root());
        let found = ip.resolve(&doc, copy).unwrap();
        assert_ne!(found, second);
        assert!(ip.is_on(&doc, found));
    }

    #[test]
    fn test_end_marker() {
        let mut doc = parse("<w:p/>").unwrap();
        let root = doc.root();
        let ip = InsertionPoint::create_end(&mut doc, root, PatternType::None, 0);
        assert_eq!(ip.id(), "End_None_0");
        assert!(ip.is_end());
        assert_eq!(ip.resolve(&doc, root), Some(root));
    }

    #[test]
    fn test_resolve_missing() {
        let doc = parse("<w:body><w:p/></w:body>").unwrap();
        let ip = InsertionPoint { id: "None_9".to_owned() };
        assert_eq!(ip.resolve(&doc, doc.root()), None);
    }
}

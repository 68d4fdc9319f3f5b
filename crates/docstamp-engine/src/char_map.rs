//! Flattened view of the document's text.
//!
//! Word splits text into runs at arbitrary points, so a directive such as
//! `{{Name}}` may be spread over several `w:t` elements. The character map
//! concatenates all `w:t` content under a root and remembers, for every
//! character, which element and offset it came from. Matching happens on the
//! flat text; [`CharacterMap::isolate`] then rewrites the tree so each match
//! lives in exactly one `w:t`.

use std::collections::HashMap;
use std::ops::Range;

use docstamp_xml::{Document, NodeId};

use crate::pattern::PatternType;
use crate::wml::{self, MARKER_ATTR};

/// Origin of a single character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharEntry {
    pub ch: char,
    /// The `w:t` element holding the character.
    pub node: NodeId,
    /// Character offset within that element's text.
    pub offset: usize,
}

/// Character-to-node map over all `w:t` elements under a root.
#[derive(Debug, Clone)]
pub struct CharacterMap {
    entries: Vec<CharEntry>,
    text: String,
}

impl CharacterMap {
    pub fn new(doc: &Document, root: NodeId) -> Self {
        let mut entries = Vec::new();
        let mut text = String::new();
        for node in wml::text_elements(doc, root) {
            let content = doc.inner_text(node);
            for (offset, ch) in content.chars().enumerate() {
                entries.push(CharEntry { ch, node, offset });
            }
            text.push_str(&content);
        }
        Self { entries, text }
    }

    /// The concatenated text.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<CharEntry> {
        self.entries.get(index).copied()
    }

    /// Move the characters in `range` into a single `w:t` and mark it with
    /// `kind`.
    ///
    /// The element holding the first character keeps its identity and
    /// receives the whole range; text before and after the range in that
    /// element moves into new sibling `w:t` elements. Following elements lose
    /// their share of the range and are removed once empty. The map is
    /// updated in place so offsets of other ranges stay valid.
    ///
    /// Returns the isolated element, or `None` for an empty or out of bounds
    /// range.
    pub fn isolate(
        &mut self,
        doc: &mut Document,
        range: Range<usize>,
        kind: PatternType,
    ) -> Option<NodeId> {
        if range.is_empty() || range.end > self.entries.len() {
            return None;
        }
        let first = self.entries[range.start];
        let target = first.node;

        // Characters taken from the front of each following element.
        let mut consumed: HashMap<NodeId, usize> = HashMap::new();
        let mut split_end = None;
        for entry in &self.entries[range.clone()] {
            if entry.node == target {
                split_end = Some(entry.offset + 1);
            } else {
                *consumed.entry(entry.node).or_default() += 1;
            }
        }
        let split_end = split_end.unwrap_or(first.offset + 1);

        let original: Vec<char> = doc.inner_text(target).chars().collect();
        let prefix: String = original[..first.offset].iter().collect();
        let suffix: String = original[split_end.min(original.len())..].iter().collect();
        let matched: String = self.entries[range.clone()].iter().map(|e| e.ch).collect();

        wml::set_text(doc, target, &matched);
        doc.set_attr(target, MARKER_ATTR, kind.as_str());

        let prefix_node = (!prefix.is_empty()).then(|| {
            let node = wml::create_text(doc, &prefix);
            doc.insert_before(target, node);
            node
        });
        let suffix_node = (!suffix.is_empty()).then(|| {
            let node = wml::create_text(doc, &suffix);
            doc.insert_after(target, node);
            node
        });

        for (&node, &count) in &consumed {
            let remaining: String = doc.inner_text(node).chars().skip(count).collect();
            if remaining.is_empty() {
                wml::remove_with_empty_run(doc, node);
            } else {
                doc.set_text(node, &remaining);
            }
        }

        for (index, entry) in self.entries.iter_mut().enumerate() {
            if range.contains(&index) {
                entry.node = target;
                entry.offset = index - range.start;
            } else if entry.node == target {
                if index < range.start {
                    entry.node = prefix_node.unwrap_or(target);
                } else {
                    entry.node = suffix_node.unwrap_or(target);
                    entry.offset -= split_end;
                }
            } else if let Some(&count) = consumed.get(&entry.node) {
                entry.offset -= count;
            }
        }

        Some(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docstamp_xml::{parse, serialize};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_map_concatenates_text() {
        let doc = parse("<w:p><w:r><w:t>ab</w:t></w:r><w:r><w:t>c</w:t></w:r></w:p>").unwrap();
        let map = CharacterMap::new(&doc, doc.root());
        assert_eq!(map.text(), "abc");
        assert_eq!(map.len(), 3);
        let c = map.get(2).unwrap();
        assert_eq!(c.ch, 'c');
        assert_eq!(c.offset, 0);
        assert_ne!(c.node, map.get(0).unwrap().node);
    }

    #[test]
    fn test_isolate_across_runs() {
        let mut doc = parse(
            "<w:p><w:r><w:t>Hi {{Na</w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>me}}!</w:t></w:r></w:p>",
        )
        .unwrap();
        let mut map = CharacterMap::new(&doc, doc.root());

        let node = map.isolate(&mut doc, 3..11, PatternType::Variable).unwrap();

        assert_eq!(doc.inner_text(node), "{{Name}}");
        assert_eq!(
            serialize(&doc),
            "<w:p><w:r><w:t xml:space=\"preserve\">Hi </w:t>\
             <w:t xml:space=\"preserve\" dsMrk=\"Variable\">{{Name}}</w:t></w:r>\
             <w:r><w:rPr><w:b/></w:rPr><w:t>!</w:t></w:r></w:p>"
        );
        assert_eq!(map.text(), "Hi {{Name}}!");
    }

    #[test]
    fn test_isolate_removes_emptied_run() {
        let mut doc = parse("<w:p><w:r><w:t>{{</w:t></w:r><w:r><w:t>a}}</w:t></w:r></w:p>").unwrap();
        let mut map = CharacterMap::new(&doc, doc.root());
        map.isolate(&mut doc, 0..5, PatternType::Variable).unwrap();
        assert_eq!(
            serialize(&doc),
            "<w:p><w:r><w:t xml:space=\"preserve\" dsMrk=\"Variable\">{{a}}</w:t></w:r></w:p>"
        );
    }

    #[test]
    fn test_indices_stay_valid_after_isolation() {
        let mut doc = parse("<w:p><w:r><w:t>{{a}} and {{b}}.</w:t></w:r></w:p>").unwrap();
        let mut map = CharacterMap::new(&doc, doc.root());

        let a = map.isolate(&mut doc, 0..5, PatternType::Variable).unwrap();
        let b = map.isolate(&mut doc, 10..15, PatternType::Variable).unwrap();

        assert_ne!(a, b);
        assert_eq!(doc.inner_text(a), "{{a}}");
        assert_eq!(doc.inner_text(b), "{{b}}");
        assert_eq!(doc.inner_text(doc.root()), "{{a}} and {{b}}.");
        let dot = map.get(15).unwrap();
        assert_eq!(doc.inner_text(dot.node), ".");
        assert_eq!(dot.offset, 0);
    }

    #[test]
    fn test_isolate_rejects_bad_range() {
        let mut doc = parse("<w:p><w:r><w:t>ab</w:t></w:r></w:p>").unwrap();
        let mut map = CharacterMap::new(&doc, doc.root());
        assert_eq!(map.isolate(&mut doc, 1..1, PatternType::Variable), None);
        assert_eq!(map.isolate(&mut doc, 1..3, PatternType::Variable), None);
    }
}

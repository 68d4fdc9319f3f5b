//! Block tree construction from the directive sequence.

use super::{BlockId, BlockTree, Marker};
use crate::error::TemplateError;
use crate::pattern::PatternType;

/// Stack machine turning directives into nested blocks.
///
/// The stack alternates between a block and its currently open section, so
/// its top is always the section new blocks are added to.
#[derive(Debug, Default)]
pub(crate) struct BlockTreeBuilder {
    tree: BlockTree,
    stack: Vec<BlockId>,
}

impl BlockTreeBuilder {
    /// Build the block tree for directives in document order.
    ///
    /// Variables are not blocks and are skipped.
    pub(crate) fn build(markers: &[Marker]) -> Result<BlockTree, TemplateError> {
        let mut builder = Self::default();
        for marker in markers {
            builder.feed(marker)?;
        }
        builder.finish()
    }

    fn feed(&mut self, marker: &Marker) -> Result<(), TemplateError> {
        let kind = marker.pattern.pattern_type;
        match kind {
            PatternType::InlineKeyword => {
                let id = self.tree.push(kind, marker.clone(), self.current());
                self.tree.get_mut(id).end = Some(marker.clone());
            }
            _ if kind.is_block_start() => {
                let block = self.tree.push(kind, marker.clone(), self.current());
                self.stack.push(block);
                let section = self.tree.push(PatternType::None, marker.clone(), Some(block));
                self.stack.push(section);
            }
            _ if kind.is_separator() => {
                let block = self.close_section(marker)?;
                let section = self.tree.push(kind, marker.clone(), Some(block));
                self.stack.push(section);
            }
            _ if kind.is_block_end() => {
                let block = self.close_section(marker)?;
                self.stack.pop();
                self.tree.get_mut(block).end = Some(marker.clone());
            }
            _ => {}
        }
        Ok(())
    }

    /// Close the open section at `marker` and return its block, which stays
    /// on the stack.
    fn close_section(&mut self, marker: &Marker) -> Result<BlockId, TemplateError> {
        let section = self.stack.pop().ok_or_else(|| unbalanced(marker))?;
        let block = *self.stack.last().ok_or_else(|| unbalanced(marker))?;
        self.tree.get_mut(section).end = Some(marker.clone());
        Ok(block)
    }

    fn current(&self) -> Option<BlockId> {
        self.stack.last().copied()
    }

    fn finish(self) -> Result<BlockTree, TemplateError> {
        if !self.stack.is_empty() {
            let directives = self
                .stack
                .iter()
                .map(|&id| self.tree.get(id))
                .filter(|block| block.kind != PatternType::None && !block.kind.is_separator())
                .map(|block| block.directive().to_owned())
                .collect();
            return Err(TemplateError::UnclosedBlock { directives });
        }
        tracing::debug!(blocks = self.tree.len(), "Built block tree");
        Ok(self.tree)
    }
}

fn unbalanced(marker: &Marker) -> TemplateError {
    TemplateError::UnbalancedBlock {
        directive: marker.pattern.text.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::find_patterns;
    use docstamp_xml::Document;
    use pretty_assertions::assert_eq;

    fn markers(text: &str) -> Vec<Marker> {
        let mut doc = Document::new("w:body");
        find_patterns(text)
            .into_iter()
            .map(|pattern| Marker {
                node: doc.create_element("w:t"),
                pattern,
            })
            .collect()
    }

    fn build(text: &str) -> Result<BlockTree, TemplateError> {
        BlockTreeBuilder::build(&markers(text))
    }

    /// Re-emit the directive sequence a tree was built from.
    fn directives(tree: &BlockTree) -> Vec<String> {
        fn walk(tree: &BlockTree, id: BlockId, out: &mut Vec<String>) {
            let block = tree.get(id);
            if block.kind() != PatternType::None {
                out.push(block.directive().to_owned());
            }
            for &child in block.children() {
                walk(tree, child, out);
            }
            let is_section = block.kind() == PatternType::None || block.kind().is_separator();
            if !is_section && block.kind() != PatternType::InlineKeyword {
                out.push(block.end().unwrap().pattern.text.clone());
            }
        }
        let mut out = Vec::new();
        for &root in tree.roots() {
            walk(tree, root, &mut out);
        }
        out
    }

    #[test]
    fn test_collection_has_content_section() {
        let tree = build("{{#Items}}{{.}}{{/Items}}").unwrap();
        assert_eq!(tree.roots().len(), 1);
        let collection = tree.get(tree.roots()[0]);
        assert_eq!(collection.kind(), PatternType::CollectionStart);
        assert_eq!(collection.children().len(), 1);

        let section = tree.get(collection.children()[0]);
        assert_eq!(section.kind(), PatternType::None);
        assert_eq!(section.start(), collection.start());
        assert_eq!(section.end(), collection.end());
    }

    #[test]
    fn test_condition_with_else() {
        let tree = build("{{?a}}x{{:}}y{{/}}").unwrap();
        let condition = tree.get(tree.roots()[0]);
        let kinds: Vec<PatternType> = condition
            .children()
            .iter()
            .map(|&id| tree.get(id).kind())
            .collect();
        assert_eq!(kinds, vec![PatternType::None, PatternType::ConditionElse]);
        let main = tree.get(condition.children()[0]);
        assert_eq!(main.end().unwrap().pattern.text, "{{:}}");
    }

    #[test]
    fn test_nested_blocks_roundtrip() {
        let text = "{{#A}}{{?x}}{{:br}}{{:}}{{#B}}{{:s:}}{{/B}}{{/}}{{:s:}}{{/A}}{{--}}{{/--}}";
        let tree = build(text).unwrap();
        let expected: Vec<String> = find_patterns(text).into_iter().map(|m| m.text).collect();
        assert_eq!(directives(&tree), expected);
    }

    #[test]
    fn test_orders() {
        let tree = build("{{#A}}{{#B}}{{/B}}{{/A}}").unwrap();
        let pre = tree.pre_order();
        let post = tree.post_order();
        assert_eq!(pre.len(), 4);
        assert_eq!(pre[0], tree.roots()[0]);
        assert_eq!(post.last(), Some(&tree.roots()[0]));
        assert_eq!(tree.get(pre[2]).kind(), PatternType::CollectionStart);
        assert_eq!(post[1], pre[2]);
    }

    #[test]
    fn test_unbalanced_end() {
        assert!(matches!(
            build("{{/Items}}"),
            Err(TemplateError::UnbalancedBlock { directive }) if directive == "{{/Items}}"
        ));
        assert!(matches!(
            build("{{#A}}{{/A}}{{/}}"),
            Err(TemplateError::UnbalancedBlock { directive }) if directive == "{{/}}"
        ));
        assert!(matches!(build("{{:}}"), Err(TemplateError::UnbalancedBlock { .. })));
        assert!(matches!(build("{{:s:}}"), Err(TemplateError::UnbalancedBlock { .. })));
    }

    #[test]
    fn test_end_closes_innermost_block_of_any_kind() {
        for text in ["{{#Items}}{{/}}", "{{?a}}{{/Items}}", "{{#A}}{{/B}}"] {
            let tree = build(text).unwrap();
            assert_eq!(tree.roots().len(), 1, "{text}");
            let block = tree.get(tree.roots()[0]);
            assert_eq!(block.end(), tree.get(block.children()[0]).end(), "{text}");
        }
    }

    #[test]
    fn test_separators_in_any_block() {
        let tree = build("{{?a}}x{{:s:}}y{{/}}").unwrap();
        let condition = tree.get(tree.roots()[0]);
        let kinds: Vec<PatternType> = condition
            .children()
            .iter()
            .map(|&id| tree.get(id).kind())
            .collect();
        assert_eq!(kinds, vec![PatternType::None, PatternType::CollectionSeparator]);

        let tree = build("{{#A}}x{{:}}y{{/A}}").unwrap();
        let collection = tree.get(tree.roots()[0]);
        assert_eq!(
            tree.get(collection.children()[1]).kind(),
            PatternType::ConditionElse
        );
    }

    #[test]
    fn test_unclosed_blocks_are_listed() {
        let err = build("{{#A}}{{?b}}{{:}}").unwrap_err();
        let TemplateError::UnclosedBlock { directives } = err else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(directives, vec!["{{#A}}".to_owned(), "{{?b}}".to_owned()]);
    }

    #[test]
    fn test_variables_are_not_blocks() {
        let tree = build("{{a}}{{b}}").unwrap();
        assert!(tree.is_empty());
    }
}

//! Block expansion.
//!
//! Expanding a block clones its content into a temporary fragment element,
//! lets the binding driver fill in variables, expands the selected child
//! sections inside the fragment and finally moves the fragment's children
//! into the document after the block's anchor.

use docstamp_xml::{Document, NodeId};

use super::{Block, BlockId, BlockTree};
use crate::binding::{BindingDriver, Expansion};
use crate::error::TemplateError;
use crate::pattern::PatternType;
use crate::settings::ProcessSettings;
use crate::wml::{self, BREAK, PARAGRAPH};

/// Temporary container for block instances. Never part of the output.
const FRAGMENT: &str = "ds:fragment";

pub(crate) struct Expander<'a> {
    tree: &'a BlockTree,
    settings: &'a ProcessSettings,
}

impl<'a> Expander<'a> {
    pub(crate) fn new(tree: &'a BlockTree, settings: &'a ProcessSettings) -> Self {
        Self { tree, settings }
    }

    /// Expand a block whose anchor lies within `scope`.
    ///
    /// In `verbatim` mode content is copied without substitution.
    pub(crate) fn expand(
        &self,
        doc: &mut Document,
        driver: &mut dyn BindingDriver,
        id: BlockId,
        scope: NodeId,
        verbatim: bool,
    ) -> Result<(), TemplateError> {
        let block = self.tree.get(id);
        let anchor = self.resolve_anchor(doc, block, scope)?;
        let verbatim = verbatim || block.kind() == PatternType::IgnoreStart;

        match block.kind() {
            PatternType::InlineKeyword => {
                let node = keyword_node(doc, &block.start().pattern.expression)?;
                doc.insert_after(anchor, node);
            }
            PatternType::CollectionStart | PatternType::ConditionStart if !verbatim => {
                let plan = driver.plan(&block.start().pattern)?;
                tracing::debug!(directive = block.directive(), ?plan, "Expanding block");
                self.expand_planned(doc, driver, block, anchor, plan)?;
            }
            _ => {
                let nodes = self.instantiate(doc, driver, block, verbatim, |_, _| true)?;
                insert_all_after(doc, anchor, nodes);
            }
        }

        self.remove_anchor(doc, anchor);
        Ok(())
    }

    fn expand_planned(
        &self,
        doc: &mut Document,
        driver: &mut dyn BindingDriver,
        block: &Block,
        anchor: NodeId,
        plan: Expansion,
    ) -> Result<(), TemplateError> {
        match plan {
            Expansion::Branch(selected) => {
                let nodes =
                    self.instantiate(doc, driver, block, false, |index, _| Some(index) == selected)?;
                insert_all_after(doc, anchor, nodes);
            }
            Expansion::Repeat(0) => {
                let nodes = self.instantiate(doc, driver, block, false, |_, child| {
                    child.kind() == PatternType::ConditionElse
                })?;
                insert_all_after(doc, anchor, nodes);
            }
            Expansion::Repeat(count) => {
                let directive = &block.start().pattern;
                let mut cursor = anchor;
                for index in 0..count {
                    driver.enter_item(directive, index)?;
                    let nodes = self.instantiate(doc, driver, block, false, |_, child| {
                        match child.kind() {
                            PatternType::None => true,
                            PatternType::CollectionSeparator => index + 1 < count,
                            _ => false,
                        }
                    });
                    driver.leave_item();
                    cursor = insert_all_after(doc, cursor, nodes?);
                }
            }
        }
        Ok(())
    }

    /// Build one instance of a block's content.
    ///
    /// Children for which `select` returns true are expanded in place, the
    /// anchors of the others are removed. Returns the detached top-level
    /// nodes of the instance.
    fn instantiate(
        &self,
        doc: &mut Document,
        driver: &mut dyn BindingDriver,
        block: &Block,
        verbatim: bool,
        select: impl Fn(usize, &Block) -> bool,
    ) -> Result<Vec<NodeId>, TemplateError> {
        let fragment = doc.create_element(FRAGMENT);
        for &node in block.content() {
            let copy = doc.deep_clone(node);
            doc.append_child(fragment, copy);
        }
        if !verbatim {
            driver.substitute(doc, fragment)?;
        }

        for (index, &child_id) in block.children().iter().enumerate() {
            let child = self.tree.get(child_id);
            if select(index, child) {
                self.expand(doc, driver, child_id, fragment, verbatim)?;
            } else {
                let anchor = self.resolve_anchor(doc, child, fragment)?;
                self.remove_anchor(doc, anchor);
            }
        }

        Ok(doc.take_children(fragment))
    }

    fn resolve_anchor(
        &self,
        doc: &Document,
        block: &Block,
        scope: NodeId,
    ) -> Result<NodeId, TemplateError> {
        let insertion_point = block.insertion_point();
        insertion_point
            .and_then(|ip| ip.resolve(doc, scope))
            .ok_or_else(|| TemplateError::InsertionPointNotFound {
                id: insertion_point.map_or_else(
                    || block.directive().to_owned(),
                    |ip| ip.id().to_owned(),
                ),
            })
    }

    /// Remove an anchor, together with its paragraph when nothing visible
    /// remains in it.
    fn remove_anchor(&self, doc: &mut Document, anchor: NodeId) {
        let paragraph = doc.ancestor_named(anchor, PARAGRAPH);
        doc.detach(anchor);
        if !self.settings.strip_empty_paragraphs {
            return;
        }
        if let Some(paragraph) = paragraph
            && wml::is_paragraph_empty(doc, paragraph)
            && !wml::is_sole_cell_paragraph(doc, paragraph)
        {
            doc.detach(paragraph);
        }
    }
}

/// Insert `nodes` after `cursor` in order and return the last one inserted.
fn insert_all_after(doc: &mut Document, mut cursor: NodeId, nodes: Vec<NodeId>) -> NodeId {
    for node in nodes {
        doc.insert_after(cursor, node);
        cursor = node;
    }
    cursor
}

/// Content produced by an inline keyword.
fn keyword_node(doc: &mut Document, keyword: &str) -> Result<NodeId, TemplateError> {
    let break_type = match keyword.to_ascii_lowercase().as_str() {
        "br" => None,
        "pagebreak" => Some("page"),
        "columnbreak" => Some("column"),
        _ => return Err(TemplateError::UnknownKeyword(keyword.to_owned())),
    };
    let node = doc.create_element(BREAK);
    if let Some(break_type) = break_type {
        doc.set_attr(node, "w:type", break_type);
    }
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::JsonBinding;
    use crate::block::anchor::tests::prepare;
    use crate::block::extract::extract_content;
    use docstamp_xml::serialize_node;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_instances_are_independent() {
        let (mut doc, mut tree) =
            prepare("<w:body><w:p><w:r><w:t>{{#A}}x {{.}}{{/A}}</w:t></w:r></w:p></w:body>");
        extract_content(&mut doc, &mut tree);
        let settings = ProcessSettings::default();
        let expander = Expander::new(&tree, &settings);
        let mut driver = JsonBinding::new(json!({}));
        let section = tree.get(tree.get(tree.roots()[0]).children()[0]);

        let first = expander
            .instantiate(&mut doc, &mut driver, section, true, |_, _| true)
            .unwrap();
        let second = expander
            .instantiate(&mut doc, &mut driver, section, true, |_, _| true)
            .unwrap();

        let render = |doc: &Document, nodes: &[NodeId]| -> String {
            nodes.iter().map(|&n| serialize_node(doc, n)).collect()
        };
        let second_before = render(&doc, &second);
        assert_eq!(render(&doc, &first), second_before);

        doc.set_text(first[0], "changed");
        assert_eq!(render(&doc, &second), second_before);
        assert!(section.content().iter().all(|&n| !first.contains(&n)));
    }

    #[test]
    fn test_keyword_nodes() {
        let mut doc = Document::new("w:r");
        let br = keyword_node(&mut doc, "br").unwrap();
        assert_eq!(serialize_node(&doc, br), "<w:br/>");
        let page = keyword_node(&mut doc, "PageBreak").unwrap();
        assert_eq!(serialize_node(&doc, page), r#"<w:br w:type="page"/>"#);
        assert!(matches!(
            keyword_node(&mut doc, "hr"),
            Err(TemplateError::UnknownKeyword(k)) if k == "hr"
        ));
    }

    #[test]
    fn test_missing_anchor_is_reported() {
        let (mut doc, mut tree) = prepare("<w:p><w:r><w:t>{{?a}}x{{/}}</w:t></w:r></w:p>");
        extract_content(&mut doc, &mut tree);
        let settings = ProcessSettings::default();
        let expander = Expander::new(&tree, &settings);
        let mut driver = JsonBinding::new(json!({"a": true}));
        let orphan = doc.create_element("w:p");

        assert!(matches!(
            expander.expand(&mut doc, &mut driver, tree.roots()[0], orphan, false),
            Err(TemplateError::InsertionPointNotFound { id }) if id == "ConditionStart_0"
        ));
    }
}

//! Template processing pipeline.

use docstamp_xml::{Document, NodeId};

use crate::binding::BindingDriver;
use crate::block::Marker;
use crate::block::anchor::assign_anchors;
use crate::block::builder::BlockTreeBuilder;
use crate::block::expand::Expander;
use crate::block::extract::{extract_content, validate};
use crate::char_map::CharacterMap;
use crate::cleanup::cleanup;
use crate::error::TemplateError;
use crate::pattern::find_patterns;
use crate::preprocess::{remove_markup, trim_line_breaks};
use crate::settings::ProcessSettings;
use crate::wml::BODY;

/// Expands template directives in WordprocessingML documents.
///
/// ```
/// use docstamp_engine::{JsonBinding, TemplateProcessor};
/// use serde_json::json;
///
/// let mut doc = docstamp_xml::parse(
///     "<w:body><w:p><w:r><w:t>{{#Items}}{{.}} {{/Items}}</w:t></w:r></w:p></w:body>",
/// )
/// .unwrap();
/// let mut binding = JsonBinding::new(json!({"Items": ["a", "b"]}));
///
/// TemplateProcessor::default().process(&mut doc, &mut binding).unwrap();
/// assert_eq!(doc.inner_text(doc.root()), "a b ");
/// ```
#[derive(Debug, Clone, Default)]
pub struct TemplateProcessor {
    settings: ProcessSettings,
}

impl TemplateProcessor {
    pub fn new(settings: ProcessSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ProcessSettings {
        &self.settings
    }

    /// Process the document body, or the whole document when it has no
    /// `w:body`.
    ///
    /// # Errors
    ///
    /// Returns an error if the template is malformed or the binding driver
    /// fails. The document may be partially processed in that case.
    pub fn process(
        &self,
        doc: &mut Document,
        driver: &mut dyn BindingDriver,
    ) -> Result<(), TemplateError> {
        let root = doc.root();
        let body = if doc.is_element(root, BODY) {
            root
        } else {
            doc.descendants(root)
                .into_iter()
                .find(|&node| doc.is_element(node, BODY))
                .unwrap_or(root)
        };
        self.process_subtree(doc, body, driver)
    }

    /// Process the subtree under `root`.
    ///
    /// # Errors
    ///
    /// Same as [`TemplateProcessor::process`].
    pub fn process_subtree(
        &self,
        doc: &mut Document,
        root: NodeId,
        driver: &mut dyn BindingDriver,
    ) -> Result<(), TemplateError> {
        remove_markup(doc, root);
        let markers = isolate_directives(doc, root);
        if self.settings.trim_line_breaks {
            trim_line_breaks(doc, &markers);
        }

        let mut tree = BlockTreeBuilder::build(&markers)?;
        assign_anchors(doc, &mut tree)?;
        extract_content(doc, &mut tree);
        if self.settings.validate_insertion_points {
            validate(doc, &tree)?;
        }

        driver.substitute(doc, root)?;
        let expander = Expander::new(&tree, &self.settings);
        for &block in tree.roots() {
            expander.expand(doc, driver, block, root, false)?;
        }

        cleanup(doc, root, &self.settings);
        tracing::info!(
            directives = markers.len(),
            blocks = tree.len(),
            "Processed template"
        );
        Ok(())
    }
}

/// Process the subtree under `root` with the given settings.
///
/// # Errors
///
/// Same as [`TemplateProcessor::process`].
pub fn build_and_expand(
    doc: &mut Document,
    root: NodeId,
    driver: &mut dyn BindingDriver,
    settings: &ProcessSettings,
) -> Result<(), TemplateError> {
    TemplateProcessor::new(settings.clone()).process_subtree(doc, root, driver)
}

/// Find all directives under `root` and give each its own `w:t`.
fn isolate_directives(doc: &mut Document, root: NodeId) -> Vec<Marker> {
    let mut map = CharacterMap::new(doc, root);
    find_patterns(map.text())
        .into_iter()
        .filter_map(|pattern| {
            let node = map.isolate(doc, pattern.span(), pattern.pattern_type)?;
            Some(Marker { node, pattern })
        })
        .collect()
}

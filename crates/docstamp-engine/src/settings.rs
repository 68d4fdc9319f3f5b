//! Processing options.

/// Options controlling how a template is processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSettings {
    /// Remove paragraphs that only held block directives.
    pub strip_empty_paragraphs: bool,
    /// Remove line breaks between a directive and the nearest text.
    pub trim_line_breaks: bool,
    /// Check that every nested block's anchor ended up in its parent's
    /// content before expanding.
    pub validate_insertion_points: bool,
}

impl Default for ProcessSettings {
    fn default() -> Self {
        Self {
            strip_empty_paragraphs: true,
            trim_line_breaks: false,
            validate_insertion_points: cfg!(debug_assertions),
        }
    }
}

impl ProcessSettings {
    #[must_use]
    pub fn with_strip_empty_paragraphs(mut self, strip: bool) -> Self {
        self.strip_empty_paragraphs = strip;
        self
    }

    #[must_use]
    pub fn with_trim_line_breaks(mut self, trim: bool) -> Self {
        self.trim_line_breaks = trim;
        self
    }

    #[must_use]
    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate_insertion_points = validate;
        self
    }
}

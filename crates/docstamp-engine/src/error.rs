//! Error types for template processing.

/// Error raised while building or expanding template blocks.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TemplateError {
    /// A closing or separating directive has no matching opener.
    #[error("unbalanced block directive {directive}")]
    UnbalancedBlock { directive: String },

    /// Block directives were still open at the end of the document.
    #[error("unclosed block directives: {}", .directives.join(", "))]
    UnclosedBlock { directives: Vec<String> },

    /// The start and end directives of a block share no ancestor.
    #[error("block {directive} spans disjoint parts of the document")]
    DisjointBlock { directive: String },

    /// A block's anchor could not be found where it was expected.
    #[error("insertion point {id} not found")]
    InsertionPointNotFound { id: String },

    /// A child block's anchor is missing from its parent's content.
    #[error("insertion point {id} of {directive} is not part of its parent block")]
    InsertionPointValidation { id: String, directive: String },

    /// An inline keyword directive names no known keyword.
    #[error("unknown keyword {0}")]
    UnknownKeyword(String),

    /// The binding driver failed to produce a value.
    #[error(transparent)]
    Binding(#[from] BindingError),
}

/// Error raised by a binding driver.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BindingError {
    /// The model has no value at the given path.
    #[error("no model value for {0}")]
    NotFound(String),

    /// A formatter name is not registered.
    #[error("unknown formatter {0}")]
    UnknownFormatter(String),

    /// A formatter cannot handle the value it was given.
    #[error("formatter {formatter} cannot format value of {path}")]
    Format { formatter: String, path: String },

    /// An item scope was requested for a path that has no such item.
    #[error("no item {index} in {path}")]
    NoItem { path: String, index: usize },

    /// The model could not be converted to JSON.
    #[error("model serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

//! Error types for XML reading.

/// Error while reading an XML document.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum XmlError {
    /// XML parsing error.
    #[error("XML parse error: {0}")]
    Parse(#[from] quick_xml::Error),

    /// XML attribute error.
    #[error("XML attribute error: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),

    /// Encoding error during XML parsing.
    #[error("encoding error: {0}")]
    Encoding(#[from] quick_xml::encoding::EncodingError),

    /// The input did not contain a root element.
    #[error("document has no root element")]
    MissingRoot,
}

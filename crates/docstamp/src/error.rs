//! CLI error types.

use docstamp_config::ConfigError;
use docstamp_engine::TemplateError;
use docstamp_xml::XmlError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid template: {0}")]
    Xml(#[from] XmlError),

    #[error("{0}")]
    Template(#[from] TemplateError),

    #[error("Invalid model: {0}")]
    Model(#[from] serde_json::Error),

    #[error("{0}")]
    Validation(String),
}

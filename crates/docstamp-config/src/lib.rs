//! Configuration management for docstamp.
//!
//! Parses `docstamp.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! `render.model` supports environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override empty paragraph stripping.
    pub strip_empty_paragraphs: Option<bool>,
    /// Override line break trimming around directives.
    pub trim_line_breaks: Option<bool>,
    /// Override insertion point validation.
    pub validate_insertion_points: Option<bool>,
    /// Override binding error handling.
    pub on_binding_error: Option<BindingErrorMode>,
    /// Override the data model file.
    pub model: Option<PathBuf>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "docstamp.toml";

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Template processing options.
    pub process: ProcessConfig,
    /// Data binding options.
    pub binding: BindingConfig,
    /// Render command defaults (paths are relative strings from TOML).
    render: RenderConfigRaw,

    /// Resolved render configuration (set after loading).
    #[serde(skip)]
    pub render_resolved: RenderConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Template processing configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    /// Remove paragraphs left empty by directive removal.
    pub strip_empty_paragraphs: bool,
    /// Remove line breaks between directives and adjacent text.
    pub trim_line_breaks: bool,
    /// Check block anchors after extraction. Unset uses the build default.
    pub validate_insertion_points: Option<bool>,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            strip_empty_paragraphs: true,
            trim_line_breaks: false,
            validate_insertion_points: None,
        }
    }
}

/// Data binding configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BindingConfig {
    /// What to do when an expression cannot be resolved.
    pub on_error: BindingErrorMode,
}

/// Reaction to binding failures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingErrorMode {
    /// Abort processing with an error.
    #[default]
    Fail,
    /// Leave the value empty or drop the block and continue.
    Skip,
}

/// Raw render configuration as parsed from TOML.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RenderConfigRaw {
    /// Default data model file, relative to the config file.
    model: Option<String>,
}

/// Resolved render configuration.
#[derive(Debug, Default)]
pub struct RenderConfig {
    /// Default data model file.
    pub model: Option<PathBuf>,
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`render.model`").
        field: String,
        /// Error message (e.g., "${`MODEL_PATH`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `docstamp.toml` in current directory and parents.
    ///
    /// # Errors
    ///
    /// Returns an error if the explicit config file is missing, cannot be
    /// read, fails to parse or fails validation.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(strip) = settings.strip_empty_paragraphs {
            self.process.strip_empty_paragraphs = strip;
        }
        if let Some(trim) = settings.trim_line_breaks {
            self.process.trim_line_breaks = trim;
        }
        if let Some(validate) = settings.validate_insertion_points {
            self.process.validate_insertion_points = Some(validate);
        }
        if let Some(mode) = settings.on_binding_error {
            self.binding.on_error = mode;
        }
        if let Some(model) = &settings.model {
            self.render_resolved.model = Some(model.clone());
        }
    }

    /// Search for `docstamp.toml` in the current directory and its parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;
        config.validate()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(model) = &self.render.model {
            require_non_empty(model, "render.model")?;
        }
        Ok(())
    }

    /// Expand environment variables in string fields.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(model) = &self.render.model {
            self.render.model = Some(expand::expand_env(model, "render.model")?);
        }
        Ok(())
    }

    /// Resolve relative paths against the config file directory.
    fn resolve_paths(&mut self, base: &Path) {
        self.render_resolved = RenderConfig {
            model: self.render.model.as_deref().map(|model| base.join(model)),
        };
    }
}

//! `docstamp render` command implementation.

use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use docstamp_config::{BindingErrorMode, CliSettings, Config, ProcessConfig};
use docstamp_engine::{BindingErrorHandling, JsonBinding, ProcessSettings, TemplateProcessor};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// Template file (WordprocessingML document XML).
    template: PathBuf,

    /// JSON data model (overrides config).
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Output file (default: stdout).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Path to configuration file (default: auto-discover docstamp.toml).
    #[arg(short, long, env = "DOCSTAMP_CONFIG")]
    config: Option<PathBuf>,

    /// Keep paragraphs left empty by directive removal.
    #[arg(long)]
    keep_empty_paragraphs: bool,

    /// Remove line breaks between directives and adjacent text.
    #[arg(long)]
    trim_line_breaks: bool,

    /// Check block anchors before expanding.
    #[arg(long)]
    validate: bool,

    /// Render unresolved values as empty instead of failing.
    #[arg(long)]
    skip_binding_errors: bool,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

impl RenderArgs {
    /// Execute the render command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration, template or model cannot be loaded,
    /// or if the template cannot be expanded.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            strip_empty_paragraphs: self.keep_empty_paragraphs.then_some(false),
            trim_line_breaks: self.trim_line_breaks.then_some(true),
            validate_insertion_points: self.validate.then_some(true),
            on_binding_error: self.skip_binding_errors.then_some(BindingErrorMode::Skip),
            model: self.model,
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        if let Some(path) = &config.config_path {
            tracing::info!(config = %path.display(), "Loaded configuration");
        }

        let model_path = config.render_resolved.model.as_ref().ok_or_else(|| {
            CliError::Validation(
                "No data model given (use --model or set render.model in docstamp.toml)"
                    .to_owned(),
            )
        })?;

        let template = std::fs::read_to_string(&self.template)?;
        let model: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(model_path)?)?;
        tracing::info!(
            template = %self.template.display(),
            model = %model_path.display(),
            "Rendering template"
        );

        let mut doc = docstamp_xml::parse(&template)?;
        let mut binding =
            JsonBinding::new(model).with_error_handling(error_handling(config.binding.on_error));
        TemplateProcessor::new(process_settings(&config.process)).process(&mut doc, &mut binding)?;
        let rendered = docstamp_xml::serialize(&doc);

        if let Some(path) = &self.output {
            std::fs::write(path, rendered)?;
            output.success(&format!(
                "Rendered {} -> {}",
                self.template.display(),
                path.display()
            ));
        } else {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(rendered.as_bytes())?;
            stdout.flush()?;
            output.info(&format!("Rendered {}", self.template.display()));
        }

        Ok(())
    }
}

/// Map processing configuration onto engine settings.
fn process_settings(config: &ProcessConfig) -> ProcessSettings {
    let mut settings = ProcessSettings::default()
        .with_strip_empty_paragraphs(config.strip_empty_paragraphs)
        .with_trim_line_breaks(config.trim_line_breaks);
    if let Some(validate) = config.validate_insertion_points {
        settings = settings.with_validation(validate);
    }
    settings
}

fn error_handling(mode: BindingErrorMode) -> BindingErrorHandling {
    match mode {
        BindingErrorMode::Fail => BindingErrorHandling::ThrowException,
        BindingErrorMode::Skip => BindingErrorHandling::SkipBindingAndRemoveContent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docstamp_engine::{BindingError, TemplateError};
    use pretty_assertions::assert_eq;
    use std::path::Path;

    const TEMPLATE: &str = "<w:body><w:p><w:r><w:t>Hello {{Name}}!</w:t></w:r></w:p>\
         <w:p><w:r><w:t>{{#Items}}[{{.}}]{{/Items}}</w:t></w:r></w:p></w:body>";

    /// Write template, model and an empty config into `dir`.
    fn setup(dir: &Path, model: &str) -> RenderArgs {
        std::fs::write(dir.join("template.xml"), TEMPLATE).unwrap();
        std::fs::write(dir.join("model.json"), model).unwrap();
        std::fs::write(dir.join("docstamp.toml"), "").unwrap();
        RenderArgs {
            template: dir.join("template.xml"),
            model: Some(dir.join("model.json")),
            output: Some(dir.join("out.xml")),
            config: Some(dir.join("docstamp.toml")),
            keep_empty_paragraphs: false,
            trim_line_breaks: false,
            validate: true,
            skip_binding_errors: false,
            verbose: false,
        }
    }

    fn rendered_text(dir: &Path) -> String {
        let out = std::fs::read_to_string(dir.join("out.xml")).unwrap();
        let doc = docstamp_xml::parse(&out).unwrap();
        doc.inner_text(doc.root())
    }

    #[test]
    fn test_render_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let args = setup(dir.path(), r#"{"Name": "World", "Items": [1, 2]}"#);

        args.execute().unwrap();

        assert_eq!(rendered_text(dir.path()), "Hello World![1][2]");
    }

    #[test]
    fn test_render_model_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = setup(dir.path(), r#"{"Name": "Config", "Items": []}"#);
        args.model = None;
        std::fs::write(
            dir.path().join("docstamp.toml"),
            "[render]\nmodel = \"model.json\"\n",
        )
        .unwrap();

        args.execute().unwrap();

        assert_eq!(rendered_text(dir.path()), "Hello Config!");
    }

    #[test]
    fn test_render_without_model_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = setup(dir.path(), "{}");
        args.model = None;

        let err = args.execute().unwrap_err();

        assert!(matches!(err, CliError::Validation(_)));
    }

    #[test]
    fn test_render_missing_value_fails() {
        let dir = tempfile::tempdir().unwrap();
        let args = setup(dir.path(), r#"{"Items": []}"#);

        let err = args.execute().unwrap_err();

        assert!(matches!(
            err,
            CliError::Template(TemplateError::Binding(BindingError::NotFound(_)))
        ));
        assert!(!dir.path().join("out.xml").exists());
    }

    #[test]
    fn test_render_skip_binding_errors() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = setup(dir.path(), r#"{"Items": ["a"]}"#);
        args.skip_binding_errors = true;

        args.execute().unwrap();

        assert_eq!(rendered_text(dir.path()), "Hello ![a]");
    }

    #[test]
    fn test_render_invalid_model() {
        let dir = tempfile::tempdir().unwrap();
        let args = setup(dir.path(), "{not json");

        let err = args.execute().unwrap_err();

        assert!(matches!(err, CliError::Model(_)));
    }

    #[test]
    fn test_process_settings_from_config() {
        let config = ProcessConfig {
            strip_empty_paragraphs: false,
            trim_line_breaks: true,
            validate_insertion_points: Some(true),
        };

        let settings = process_settings(&config);

        assert_eq!(
            settings,
            ProcessSettings::default()
                .with_strip_empty_paragraphs(false)
                .with_trim_line_breaks(true)
                .with_validation(true)
        );
    }

    #[test]
    fn test_error_handling_mapping() {
        assert_eq!(
            error_handling(BindingErrorMode::Fail),
            BindingErrorHandling::ThrowException
        );
        assert_eq!(
            error_handling(BindingErrorMode::Skip),
            BindingErrorHandling::SkipBindingAndRemoveContent
        );
    }
}

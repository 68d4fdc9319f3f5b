//! Value formatters applied with `{{path:name(args)}}`.

use serde_json::Value;

/// Converts a model value to text.
pub trait Formatter: Send + Sync {
    /// Name used in directives. Matched case-insensitively.
    fn name(&self) -> &str;

    /// Format `value`, or return `None` when the value type is unsupported.
    fn format(&self, value: &Value, args: &[String]) -> Option<String>;
}

/// Plain text rendering of a JSON value.
pub(crate) fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// `toupper` and `tolower`.
#[derive(Debug, Clone, Copy)]
pub struct CaseFormatter {
    upper: bool,
}

impl CaseFormatter {
    pub fn upper() -> Self {
        Self { upper: true }
    }

    pub fn lower() -> Self {
        Self { upper: false }
    }
}

impl Formatter for CaseFormatter {
    fn name(&self) -> &str {
        if self.upper { "toupper" } else { "tolower" }
    }

    fn format(&self, value: &Value, _args: &[String]) -> Option<String> {
        let text = match value {
            Value::Array(_) | Value::Object(_) => return None,
            other => display(other),
        };
        Some(if self.upper {
            text.to_uppercase()
        } else {
            text.to_lowercase()
        })
    }
}

/// `join(separator)`: items of an array separated by `separator`
/// (default `", "`).
#[derive(Debug, Clone, Copy, Default)]
pub struct JoinFormatter;

impl Formatter for JoinFormatter {
    fn name(&self) -> &str {
        "join"
    }

    fn format(&self, value: &Value, args: &[String]) -> Option<String> {
        let Value::Array(items) = value else {
            return None;
        };
        let separator = args.first().map_or(", ", String::as_str);
        Some(
            items
                .iter()
                .map(display)
                .collect::<Vec<_>>()
                .join(separator),
        )
    }
}

/// Formatters available on every binding.
pub(crate) fn builtin() -> Vec<Box<dyn Formatter>> {
    vec![
        Box::new(CaseFormatter::upper()),
        Box::new(CaseFormatter::lower()),
        Box::new(JoinFormatter),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display() {
        assert_eq!(display(&json!(null)), "");
        assert_eq!(display(&json!("a")), "a");
        assert_eq!(display(&json!(1.5)), "1.5");
        assert_eq!(display(&json!(true)), "true");
        assert_eq!(display(&json!([1, 2])), "[1,2]");
    }

    #[test]
    fn test_case_formatter() {
        assert_eq!(CaseFormatter::upper().format(&json!("Straße"), &[]).unwrap(), "STRASSE");
        assert_eq!(CaseFormatter::lower().format(&json!("ABC"), &[]).unwrap(), "abc");
        assert_eq!(CaseFormatter::upper().format(&json!({"a": 1}), &[]), None);
    }

    #[test]
    fn test_join_formatter() {
        let value = json!(["a", 2, "c"]);
        assert_eq!(JoinFormatter.format(&value, &[]).unwrap(), "a, 2, c");
        assert_eq!(JoinFormatter.format(&value, &[" / ".to_owned()]).unwrap(), "a / 2 / c");
        assert_eq!(JoinFormatter.format(&json!("a"), &[]), None);
    }
}

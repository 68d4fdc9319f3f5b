//! Binding driver over a JSON model.

use std::fmt;

use docstamp_xml::{Document, NodeId};
use serde::Serialize;
use serde_json::Value;

use super::formatter::{self, Formatter, display};
use super::{BindingDriver, BindingErrorHandling, Expansion};
use crate::error::BindingError;
use crate::pattern::{PatternMatch, PatternType, parse_directive};
use crate::wml::{variable_nodes, write_value};

/// Resolves directives against a [`serde_json::Value`].
///
/// Paths are dot separated (`Customer.Address.City`, `Items.0.Name`) and are
/// looked up from the innermost collection item outwards. `.` is the current
/// item and `.Name` a member of it.
///
/// Conditions support truthiness (`{{?Items}}`), negation (`{{?!Paid}}`) and
/// comparison with a literal or another path (`{{?Status == 'open'}}`,
/// `{{?Count != 0}}`).
pub struct JsonBinding {
    scopes: Vec<Value>,
    formatters: Vec<Box<dyn Formatter>>,
    error_handling: BindingErrorHandling,
}

impl fmt::Debug for JsonBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonBinding")
            .field("scopes", &self.scopes.len())
            .field(
                "formatters",
                &self
                    .formatters
                    .iter()
                    .map(|formatter| formatter.name())
                    .collect::<Vec<_>>(),
            )
            .field("error_handling", &self.error_handling)
            .finish()
    }
}

impl JsonBinding {
    pub fn new(model: Value) -> Self {
        Self {
            scopes: vec![model],
            formatters: formatter::builtin(),
            error_handling: BindingErrorHandling::default(),
        }
    }

    /// Create a binding from any serializable model.
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be represented as JSON.
    pub fn from_serializable<T: Serialize>(model: &T) -> Result<Self, BindingError> {
        Ok(Self::new(serde_json::to_value(model)?))
    }

    #[must_use]
    pub fn with_error_handling(mut self, error_handling: BindingErrorHandling) -> Self {
        self.error_handling = error_handling;
        self
    }

    /// Register a formatter. It takes precedence over one with the same name.
    #[must_use]
    pub fn with_formatter(mut self, formatter: impl Formatter + 'static) -> Self {
        self.formatters.insert(0, Box::new(formatter));
        self
    }

    fn lookup(&self, path: &str) -> Option<&Value> {
        let path = path.trim();
        let current = self.scopes.last()?;
        if path.is_empty() || path == "." {
            return Some(current);
        }
        if let Some(member) = path.strip_prefix('.') {
            return descend(current, member);
        }
        let head = path.split('.').next().unwrap_or(path);
        self.scopes
            .iter()
            .rev()
            .find(|scope| descend(scope, head).is_some())
            .and_then(|scope| descend(scope, path))
    }

    fn resolve(&self, path: &str) -> Result<&Value, BindingError> {
        self.lookup(path)
            .ok_or_else(|| BindingError::NotFound(path.trim().to_owned()))
    }

    /// Apply the error policy: in skip mode a failure turns into `fallback`.
    fn recover<T>(
        &self,
        result: Result<T, BindingError>,
        fallback: impl FnOnce() -> T,
    ) -> Result<T, BindingError> {
        match result {
            Err(err) if self.error_handling == BindingErrorHandling::SkipBindingAndRemoveContent => {
                tracing::warn!(error = %err, "Skipping unbound directive");
                Ok(fallback())
            }
            other => other,
        }
    }

    fn render(&self, pattern: &PatternMatch) -> Result<String, BindingError> {
        let value = self.resolve(&pattern.expression)?;
        let Some(name) = &pattern.formatter else {
            return Ok(display(value));
        };
        let formatter = self
            .formatters
            .iter()
            .find(|f| f.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| BindingError::UnknownFormatter(name.clone()))?;
        formatter
            .format(value, &pattern.arguments)
            .ok_or_else(|| BindingError::Format {
                formatter: name.clone(),
                path: pattern.expression.clone(),
            })
    }

    fn evaluate(&self, expression: &str) -> Result<bool, BindingError> {
        let expression = expression.trim();
        if let Some(rest) = expression.strip_prefix('!') {
            return self.evaluate(rest).map(|result| !result);
        }
        for (operator, negate) in [("!=", true), ("==", false)] {
            if let Some((left, right)) = expression.split_once(operator) {
                let left = self.resolve(left)?;
                return Ok(self.equals(left, right.trim())? != negate);
            }
        }
        self.resolve(expression).map(truthy)
    }

    /// Compare a value with a literal or the value at another path.
    fn equals(&self, value: &Value, operand: &str) -> Result<bool, BindingError> {
        if let Some(literal) = unquote(operand) {
            return Ok(display(value) == literal);
        }
        match operand {
            "true" => return Ok(value == &Value::Bool(true)),
            "false" => return Ok(value == &Value::Bool(false)),
            "null" => return Ok(value.is_null()),
            _ => {}
        }
        if let Ok(number) = operand.parse::<f64>() {
            let actual = value
                .as_f64()
                .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()));
            return Ok(actual == Some(number));
        }
        Ok(self.resolve(operand)? == value)
    }
}

impl BindingDriver for JsonBinding {
    fn substitute(&mut self, doc: &mut Document, root: NodeId) -> Result<(), BindingError> {
        for node in variable_nodes(doc, root) {
            let text = doc.inner_text(node);
            let Some(pattern) = parse_directive(&text) else {
                continue;
            };
            let value = self.recover(self.render(&pattern), String::new)?;
            write_value(doc, node, &value);
        }
        Ok(())
    }

    fn plan(&mut self, directive: &PatternMatch) -> Result<Expansion, BindingError> {
        let plan = match directive.pattern_type {
            PatternType::CollectionStart => self.resolve(&directive.expression).map(|value| {
                Expansion::Repeat(match value {
                    Value::Array(items) => items.len(),
                    other => usize::from(truthy(other)),
                })
            }),
            PatternType::ConditionStart => self
                .evaluate(&directive.expression)
                .map(|result| Expansion::Branch(Some(if result { 0 } else { 1 }))),
            _ => Ok(Expansion::Branch(Some(0))),
        };
        self.recover(plan, || Expansion::Branch(None))
    }

    fn enter_item(&mut self, directive: &PatternMatch, index: usize) -> Result<(), BindingError> {
        let item = match self.resolve(&directive.expression) {
            Ok(Value::Array(items)) => items.get(index).cloned(),
            Ok(other) => (index == 0).then(|| other.clone()),
            Err(err) => return Err(err),
        }
        .ok_or_else(|| BindingError::NoItem {
            path: directive.expression.clone(),
            index,
        });
        let item = self.recover(item, || Value::Null)?;
        self.scopes.push(item);
        Ok(())
    }

    fn leave_item(&mut self) {
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }
}

fn descend<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .try_fold(value, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

fn unquote(text: &str) -> Option<&str> {
    ['\'', '"'].into_iter().find_map(|quote| {
        text.strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
    })
}

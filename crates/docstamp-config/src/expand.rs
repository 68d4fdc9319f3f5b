//! Environment variable expansion for configuration values.

use std::borrow::Cow;

use crate::ConfigError;

/// Expand `${VAR}` and `${VAR:-default}` references in a config value.
///
/// `field` names the config key in error messages.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    shellexpand::env(value)
        .map(Cow::into_owned)
        .map_err(|e| ConfigError::EnvVar {
            field: field.to_owned(),
            message: format!("${{{}}} not set", e.var_name),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_plain_value_unchanged() {
        assert_eq!(
            expand_env("data/model.json", "render.model").unwrap(),
            "data/model.json"
        );
    }

    #[test]
    fn test_default_used_when_unset() {
        assert_eq!(
            expand_env("${DOCSTAMP_TEST_UNSET_VAR:-fallback}/m.json", "render.model").unwrap(),
            "fallback/m.json"
        );
    }

    #[test]
    fn test_unset_variable_is_error() {
        let err = expand_env("${DOCSTAMP_TEST_UNSET_VAR}", "render.model").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Environment variable error in render.model: ${DOCSTAMP_TEST_UNSET_VAR} not set"
        );
    }
}

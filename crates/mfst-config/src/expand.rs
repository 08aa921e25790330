//! `~` and environment variable expansion for configuration strings.

use std::borrow::Cow;

use crate::ConfigError;

/// Expand `~`, `$VAR`, `${VAR}` and `${VAR:-default}` in `value`.
///
/// `field` names the config key in the error when a variable is unset.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    shellexpand::full(value)
        .map(Cow::into_owned)
        .map_err(|e| ConfigError::Expand {
            field: field.to_owned(),
            message: format!("${{{}}} not set ({})", e.var_name, e.cause),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_unchanged() {
        assert_eq!(expand_env("manifests", "f").unwrap(), "manifests");
    }

    #[test]
    fn test_default_used_when_unset() {
        let value = expand_env("${MFST_EXPAND_TEST_UNSET:-fallback}/x", "f").unwrap();
        assert_eq!(value, "fallback/x");
    }

    #[test]
    fn test_missing_var_names_field() {
        let err = expand_env("${MFST_EXPAND_TEST_MISSING}", "storage.root_dir").unwrap_err();

        assert!(matches!(err, ConfigError::Expand { .. }));
        assert!(err.to_string().contains("MFST_EXPAND_TEST_MISSING"));
        assert!(err.to_string().contains("storage.root_dir"));
    }
}

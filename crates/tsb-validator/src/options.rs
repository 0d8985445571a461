//! Validator configuration.

use serde::{Deserialize, Serialize};

/// Tunables for a [`Validator`](crate::Validator).
///
/// Every field has a default, so a partial JSON/YAML document deserializes:
///
/// ```json
/// { "strictNullChecks": false }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ValidatorOptions {
    /// When `false`, `null` and `undefined` are interchangeable for literal
    /// checks, and an optional property holding `null` counts as absent.
    pub strict_null_checks: bool,

    /// Maximum recursion depth for validation and resolution.
    pub max_depth: usize,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            strict_null_checks: true,
            max_depth: 512,
        }
    }
}

impl ValidatorOptions {
    pub fn with_strict_null_checks(mut self, strict: bool) -> Self {
        self.strict_null_checks = strict;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_strict() {
        let opts = ValidatorOptions::default();
        assert!(opts.strict_null_checks);
        assert_eq!(opts.max_depth, 512);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let opts: ValidatorOptions =
            serde_json::from_str(r#"{ "strictNullChecks": false }"#).unwrap();
        assert!(!opts.strict_null_checks);
        assert_eq!(opts.max_depth, 512);
    }

    #[test]
    fn yaml_uses_camel_case() {
        let opts: ValidatorOptions = serde_yaml::from_str("maxDepth: 32\n").unwrap();
        assert_eq!(opts, ValidatorOptions::default().with_max_depth(32));
    }

    #[test]
    fn builders() {
        let opts = ValidatorOptions::default()
            .with_strict_null_checks(false)
            .with_max_depth(8);
        assert!(!opts.strict_null_checks);
        assert_eq!(opts.max_depth, 8);
    }
}

//! Analysis configuration.

use crate::error::ConfigurationError;
use crate::registry::RuleRegistry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Default parameter count above which S107 reports.
pub const DEFAULT_MAX_PARAMETERS: usize = 7;
/// Default occurrence count at which S1192 reports.
pub const DEFAULT_DUPLICATE_LITERAL_MIN_COUNT: usize = 3;
/// Default per-rule time budget.
pub const DEFAULT_RULE_TIMEOUT_MS: u64 = 500;
/// Default line count above which S138 reports.
pub const DEFAULT_MAX_FUNCTION_LINES: usize = 200;
/// Default operator count above which S1067 reports.
pub const DEFAULT_MAX_EXPRESSION_COMPLEXITY: usize = 3;

/// Numeric knobs read by rules and the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub max_parameters: usize,
    pub duplicate_literal_min_count: usize,
    pub rule_timeout_ms: u64,
    pub max_function_lines: usize,
    pub max_expression_complexity: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            max_parameters: DEFAULT_MAX_PARAMETERS,
            duplicate_literal_min_count: DEFAULT_DUPLICATE_LITERAL_MIN_COUNT,
            rule_timeout_ms: DEFAULT_RULE_TIMEOUT_MS,
            max_function_lines: DEFAULT_MAX_FUNCTION_LINES,
            max_expression_complexity: DEFAULT_MAX_EXPRESSION_COMPLEXITY,
        }
    }
}

impl Thresholds {
    /// Checks every threshold is in range.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let positive = [
            ("max_parameters", self.max_parameters as u64),
            ("rule_timeout_ms", self.rule_timeout_ms),
            ("max_function_lines", self.max_function_lines as u64),
            ("max_expression_complexity", self.max_expression_complexity as u64),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ConfigurationError::InvalidThreshold {
                    name,
                    reason: "must be greater than 0".to_string(),
                });
            }
        }
        if self.duplicate_literal_min_count < 2 {
            return Err(ConfigurationError::InvalidThreshold {
                name: "duplicate_literal_min_count",
                reason: format!("must be at least 2, got {}", self.duplicate_literal_min_count),
            });
        }
        Ok(())
    }
}

/// Which rules run and with what thresholds.
///
/// Explicitly enabled and disabled ids override each rule's default state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub enabled_rules: BTreeSet<String>,
    pub disabled_rules: BTreeSet<String>,
    pub thresholds: Thresholds,
}

impl Configuration {
    /// Builder method to enable a rule.
    pub fn enable(mut self, id: impl Into<String>) -> Self {
        self.enabled_rules.insert(id.into());
        self
    }

    /// Builder method to disable a rule.
    pub fn disable(mut self, id: impl Into<String>) -> Self {
        self.disabled_rules.insert(id.into());
        self
    }

    /// Builder method to replace the thresholds.
    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Rejects invalid thresholds and unknown or conflicting rule ids.
    pub fn validate(&self, registry: &RuleRegistry) -> Result<(), ConfigurationError> {
        self.thresholds.validate()?;
        for id in self.enabled_rules.iter().chain(&self.disabled_rules) {
            if !registry.contains(id) {
                return Err(ConfigurationError::UnknownRule { id: id.clone() });
            }
        }
        if let Some(id) = self.enabled_rules.intersection(&self.disabled_rules).next() {
            return Err(ConfigurationError::ConflictingRule { id: id.clone() });
        }
        Ok(())
    }

    /// Returns true if a rule with the given default runs under this configuration.
    pub fn is_enabled(&self, id: &str, default_enabled: bool) -> bool {
        if self.disabled_rules.contains(id) {
            return false;
        }
        default_enabled || self.enabled_rules.contains(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let t = Thresholds::default();
        assert_eq!(t.max_parameters, 7);
        assert_eq!(t.duplicate_literal_min_count, 3);
        assert_eq!(t.rule_timeout_ms, 500);
        assert!(t.validate().is_ok());
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let config: Configuration =
            serde_json::from_str(r#"{"thresholds": {"max_parameters": 4}}"#).unwrap();
        assert_eq!(config.thresholds.max_parameters, 4);
        assert_eq!(config.thresholds.rule_timeout_ms, 500);
        assert!(config.enabled_rules.is_empty());
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let t = Thresholds {
            rule_timeout_ms: 0,
            ..Thresholds::default()
        };
        let err = t.validate().unwrap_err();
        assert_eq!(err.code(), "C001");
        assert!(err.to_string().contains("rule_timeout_ms"));
    }

    #[test]
    fn test_duplicate_literal_count_must_be_two() {
        let t = Thresholds {
            duplicate_literal_min_count: 1,
            ..Thresholds::default()
        };
        assert!(t.validate().is_err());
    }

    #[test]
    fn test_unknown_and_conflicting_ids() {
        let registry = RuleRegistry::with_default_rules();

        let unknown = Configuration::default().disable("S0000");
        assert_eq!(
            unknown.validate(&registry),
            Err(ConfigurationError::UnknownRule { id: "S0000".into() })
        );

        let conflict = Configuration::default().enable("S109").disable("S109");
        assert_eq!(
            conflict.validate(&registry),
            Err(ConfigurationError::ConflictingRule { id: "S109".into() })
        );

        assert!(Configuration::default().disable("S109").validate(&registry).is_ok());
    }

    #[test]
    fn test_is_enabled_overrides_default() {
        let config = Configuration::default().enable("PERF001").disable("S109");
        assert!(config.is_enabled("PERF001", false));
        assert!(!config.is_enabled("S109", true));
        assert!(config.is_enabled("S107", true));
        assert!(!config.is_enabled("X1", false));
    }
}

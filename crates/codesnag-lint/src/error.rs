//! Error types for the rule engine.
//!
//! ## Error Code Ranges
//!
//! | Range | Category | Description |
//! |-------|----------|-------------|
//! | R001-R099 | Registry | Rule registration errors |
//! | C001-C099 | Configuration | Rejected before any analysis runs |
//! | E001-E099 | Rule execution | Surfaced as synthetic findings |

use codesnag_model::ParseError;
use thiserror::Error;

/// Errors raised while building a rule registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// R001: A rule with the same id is already registered.
    #[error("R001: rule '{id}' is already registered")]
    DuplicateRule { id: String },
}

impl RegistryError {
    pub fn code(&self) -> &'static str {
        match self {
            RegistryError::DuplicateRule { .. } => "R001",
        }
    }
}

/// Errors in a [`crate::Configuration`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// C001: A threshold is out of range.
    #[error("C001: invalid threshold '{name}': {reason}")]
    InvalidThreshold { name: &'static str, reason: String },

    /// C002: A rule id is not registered.
    #[error("C002: unknown rule '{id}'")]
    UnknownRule { id: String },

    /// C003: A rule id is both enabled and disabled.
    #[error("C003: rule '{id}' is both enabled and disabled")]
    ConflictingRule { id: String },
}

impl ConfigurationError {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigurationError::InvalidThreshold { .. } => "C001",
            ConfigurationError::UnknownRule { .. } => "C002",
            ConfigurationError::ConflictingRule { .. } => "C003",
        }
    }
}

/// A rule that did not complete normally.
///
/// Never returned to the caller; the engine turns it into a synthetic
/// finding for the offending rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleFailure {
    /// E001: The rule exceeded its time budget.
    #[error("E001: rule '{rule_id}' timed out after {timeout_ms}ms")]
    Timeout { rule_id: String, timeout_ms: u64 },

    /// E002: The rule panicked.
    #[error("E002: rule '{rule_id}' failed: {message}")]
    Fault { rule_id: String, message: String },
}

impl RuleFailure {
    pub fn code(&self) -> &'static str {
        match self {
            RuleFailure::Timeout { .. } => "E001",
            RuleFailure::Fault { .. } => "E002",
        }
    }
}

/// Errors that abort analysis of one unit.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The worker runtime could not be started.
    #[error("failed to start rule workers: {0}")]
    Runtime(#[from] std::io::Error),
}

impl AnalysisError {
    pub fn code(&self) -> &'static str {
        match self {
            AnalysisError::Parse(e) => e.code(),
            AnalysisError::Configuration(e) => e.code(),
            AnalysisError::Runtime(_) => "E003",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_prefix_messages() {
        let errors: Vec<(String, &str)> = vec![
            (
                RegistryError::DuplicateRule { id: "S1".into() }.to_string(),
                "R001",
            ),
            (
                ConfigurationError::UnknownRule { id: "S9".into() }.to_string(),
                "C002",
            ),
            (
                RuleFailure::Timeout {
                    rule_id: "S1".into(),
                    timeout_ms: 5,
                }
                .to_string(),
                "E001",
            ),
        ];
        for (message, code) in errors {
            assert!(message.starts_with(code), "{message}");
        }
    }

    #[test]
    fn test_analysis_error_keeps_inner_code() {
        let err: AnalysisError = ConfigurationError::ConflictingRule { id: "S1".into() }.into();
        assert_eq!(err.code(), "C003");
    }
}

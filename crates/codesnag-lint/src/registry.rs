//! Rule registry for managing rules.

use crate::config::Configuration;
use crate::error::{ConfigurationError, RegistryError};
use crate::report::Severity;
use crate::rules::{self, Rule};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Registry of available rules, keyed and iterated by id.
#[derive(Clone, Default)]
pub struct RuleRegistry {
    rules: BTreeMap<String, Arc<dyn Rule>>,
}

impl RuleRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with every built-in rule registered.
    pub fn with_default_rules() -> Self {
        let mut registry = Self::new();
        for rule in rules::all_rules() {
            // built-in ids are unique, see rules::tests
            let _ = registry.register(rule);
        }
        registry
    }

    /// Registers a rule. Fails if its id is taken.
    pub fn register(&mut self, rule: Arc<dyn Rule>) -> Result<(), RegistryError> {
        let id = rule.id().to_string();
        if self.rules.contains_key(&id) {
            return Err(RegistryError::DuplicateRule { id });
        }
        self.rules.insert(id, rule);
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.rules.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn Rule>> {
        self.rules.get(id)
    }

    /// Returns all registered rules in id order.
    pub fn rules(&self) -> impl Iterator<Item = &Arc<dyn Rule>> {
        self.rules.values()
    }

    /// Returns the rules that run under `config`, in id order.
    pub fn enabled_rules(
        &self,
        config: &Configuration,
    ) -> Result<Vec<Arc<dyn Rule>>, ConfigurationError> {
        config.validate(self)?;
        Ok(self
            .rules
            .values()
            .filter(|rule| config.is_enabled(rule.id(), rule.default_enabled()))
            .cloned()
            .collect())
    }

    /// Returns rule metadata for documentation/introspection.
    pub fn metadata(&self) -> Vec<RuleMetadata> {
        self.rules
            .values()
            .map(|r| RuleMetadata {
                id: r.id().to_string(),
                title: r.title().to_string(),
                severity: r.severity(),
                default_enabled: r.default_enabled(),
                standard: r.standard(),
            })
            .collect()
    }

    /// Returns the number of registered rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if no rules are registered.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Metadata about a rule for documentation/introspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleMetadata {
    /// Rule identifier.
    pub id: String,
    /// Human-readable title.
    pub title: String,
    pub severity: Severity,
    /// Whether the rule runs without being named in the configuration.
    pub default_enabled: bool,
    /// False for project-local heuristics without a standardized key.
    pub standard: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::bugs::UnusedBindingRule;
    use crate::rules::smells::{MagicNumberRule, TooManyParametersRule};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_registry() {
        let registry = RuleRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_default_registry() {
        let registry = RuleRegistry::with_default_rules();
        assert_eq!(registry.len(), 20);
        assert!(registry.contains("S1481"));
        assert!(registry.contains("PERF001"));
    }

    #[test]
    fn test_duplicate_registration() {
        let mut registry = RuleRegistry::new();
        registry.register(Arc::new(UnusedBindingRule)).unwrap();
        let err = registry.register(Arc::new(UnusedBindingRule)).unwrap_err();
        assert_eq!(err.code(), "R001");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_order_independent_of_registration() {
        let mut a = RuleRegistry::new();
        a.register(Arc::new(MagicNumberRule)).unwrap();
        a.register(Arc::new(TooManyParametersRule)).unwrap();

        let mut b = RuleRegistry::new();
        b.register(Arc::new(TooManyParametersRule)).unwrap();
        b.register(Arc::new(MagicNumberRule)).unwrap();

        let ids = |r: &RuleRegistry| r.rules().map(|rule| rule.id()).collect::<Vec<_>>();
        assert_eq!(ids(&a), ids(&b));
        assert_eq!(ids(&a), vec!["S107", "S109"]);
    }

    #[test]
    fn test_enabled_rules_defaults() {
        let registry = RuleRegistry::with_default_rules();
        let ids: Vec<&str> = registry
            .enabled_rules(&Configuration::default())
            .unwrap()
            .iter()
            .map(|r| r.id())
            .collect();
        assert!(!ids.contains(&"S138"));
        assert!(!ids.contains(&"S1067"));
        assert!(ids.contains(&"PERF001"));
        assert_eq!(ids.len(), 18);
    }

    #[test]
    fn test_enabled_rules_overrides() {
        let registry = RuleRegistry::with_default_rules();
        let config = Configuration::default().enable("S138").disable("S109");
        let rules = registry.enabled_rules(&config).unwrap();
        assert!(rules.iter().any(|r| r.id() == "S138"));
        assert!(!rules.iter().any(|r| r.id() == "S109"));

        let bad = Configuration::default().enable("NOPE");
        let Err(err) = registry.enabled_rules(&bad) else {
            panic!("unknown rule id should be rejected");
        };
        assert_eq!(err.code(), "C002");
    }

    #[test]
    fn test_metadata() {
        let registry = RuleRegistry::with_default_rules();
        let metadata = registry.metadata();
        let perf = metadata.iter().find(|m| m.id == "PERF001").unwrap();
        assert!(!perf.standard);
        assert_eq!(perf.severity, Severity::Bug);
        let json = serde_json::to_string(&metadata).unwrap();
        assert!(json.contains("\"code_smell\""));
    }
}

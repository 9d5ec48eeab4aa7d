//! Rule trait and the rule catalogue.

use crate::config::Thresholds;
use crate::report::{Finding, Severity};
use codesnag_model::{NodeId, SourceModel, Span};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

mod helpers;

pub mod bugs;
pub mod perf;
pub mod redos;
pub mod security;
pub mod smells;

/// Returns the full rule catalogue.
pub fn all_rules() -> Vec<Arc<dyn Rule>> {
    let mut rules = Vec::new();
    rules.extend(bugs::all_rules());
    rules.extend(perf::all_rules());
    rules.extend(security::all_rules());
    rules.extend(smells::all_rules());
    rules
}

/// Cooperative cancellation flag shared between the engine and one rule.
///
/// The engine trips it when the rule's time budget runs out; long-running
/// rules should poll [`RuleContext::is_cancelled`] and return early.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Everything a rule may read while inspecting one unit.
pub struct RuleContext<'a> {
    pub model: &'a SourceModel,
    pub thresholds: &'a Thresholds,
    cancel: &'a CancelToken,
}

impl<'a> RuleContext<'a> {
    pub fn new(model: &'a SourceModel, thresholds: &'a Thresholds, cancel: &'a CancelToken) -> Self {
        Self {
            model,
            thresholds,
            cancel,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Creates a finding for `rule` at a node.
    pub fn finding(&self, rule: &dyn Rule, node: NodeId, message: impl Into<String>) -> Finding {
        self.finding_at(rule, self.model.node(node).span, message)
    }

    /// Creates a finding for `rule` at an explicit span.
    pub fn finding_at(&self, rule: &dyn Rule, span: Span, message: impl Into<String>) -> Finding {
        Finding::new(rule.id(), rule.severity(), self.model.file(), span, message)
    }
}

/// An independent predicate over the source model.
///
/// Rules own their traversal and share no mutable state, so the engine may
/// run them in any order or in parallel.
pub trait Rule: Send + Sync {
    /// Stable identifier (e.g., "S1481").
    fn id(&self) -> &'static str;

    /// Short human-readable title.
    fn title(&self) -> &'static str;

    fn severity(&self) -> Severity;

    /// Whether the rule runs when the configuration does not mention it.
    fn default_enabled(&self) -> bool {
        true
    }

    /// False for heuristic checks that do not map to a standardized rule key.
    fn standard(&self) -> bool {
        true
    }

    /// Inspects the model and returns every finding.
    fn inspect(&self, ctx: &RuleContext<'_>) -> Vec<Finding>;
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalogue_ids_are_unique() {
        let rules = all_rules();
        let ids: HashSet<&str> = rules.iter().map(|r| r.id()).collect();
        assert_eq!(ids.len(), rules.len());
        assert_eq!(rules.len(), 20);
    }

    #[test]
    fn test_only_perf_rule_is_nonstandard() {
        let nonstandard: Vec<&str> = all_rules()
            .iter()
            .filter(|r| !r.standard())
            .map(|r| r.id())
            .collect();
        assert_eq!(nonstandard, vec!["PERF001"]);
    }

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }
}

//! Rule execution with per-rule time budgets.
//!
//! Every rule runs on tokio's blocking pool against a shared, read-only
//! [`SourceModel`]. A rule that overruns its budget or panics is replaced by
//! a synthetic finding; the other rules' findings are unaffected.

use crate::aggregate::aggregate;
use crate::config::{Configuration, Thresholds};
use crate::error::{AnalysisError, RuleFailure};
use crate::registry::RuleRegistry;
use crate::report::{Finding, FindingStatus, Report};
use crate::rules::{CancelToken, Rule, RuleContext};
use codesnag_model::SourceModel;
use futures_util::future::join_all;
use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::{Builder, Runtime};
use tokio::time::timeout;
use tracing::{debug, warn};

/// Runs rules over parsed units.
///
/// Owns a small tokio runtime used only for timeout enforcement, so it can
/// be called from synchronous code.
pub struct AnalysisEngine {
    runtime: Option<Runtime>,
}

impl AnalysisEngine {
    /// Creates an engine.
    pub fn new() -> Result<Self, AnalysisError> {
        // Use Builder API since rt feature doesn't include Runtime::new()
        let runtime = Builder::new_current_thread().enable_time().build()?;
        Ok(Self {
            runtime: Some(runtime),
        })
    }

    /// Parses `source` and runs the rules `config` enables.
    pub fn analyze_source(
        &self,
        file: &str,
        source: &str,
        registry: &RuleRegistry,
        config: &Configuration,
    ) -> Result<Report, AnalysisError> {
        let rules = registry.enabled_rules(config)?;
        let model = SourceModel::parse(file, source)?;
        Ok(self.analyze(Arc::new(model), &rules, &config.thresholds))
    }

    /// Runs `rules` over one unit and aggregates their findings.
    ///
    /// Rules run concurrently; findings are concatenated in the order of
    /// `rules` before aggregation, so the report is deterministic.
    pub fn analyze(
        &self,
        model: Arc<SourceModel>,
        rules: &[Arc<dyn Rule>],
        thresholds: &Thresholds,
    ) -> Report {
        let Some(runtime) = self.runtime.as_ref() else {
            return Report::default();
        };
        let budget = Duration::from_millis(thresholds.rule_timeout_ms);

        let results = runtime.block_on(async {
            let runs = rules.iter().map(|rule| {
                run_rule(Arc::clone(rule), Arc::clone(&model), thresholds.clone(), budget)
            });
            join_all(runs).await
        });

        aggregate(results.into_iter().flatten())
    }
}

impl Drop for AnalysisEngine {
    fn drop(&mut self) {
        // timed-out rules may still be running on the blocking pool
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

/// Runs one rule, converting a timeout or panic into a synthetic finding.
async fn run_rule(
    rule: Arc<dyn Rule>,
    model: Arc<SourceModel>,
    thresholds: Thresholds,
    budget: Duration,
) -> Vec<Finding> {
    let cancel = CancelToken::new();
    let started = Instant::now();

    let task = {
        let rule = Arc::clone(&rule);
        let model = Arc::clone(&model);
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || {
            let ctx = RuleContext::new(&model, &thresholds, &cancel);
            rule.inspect(&ctx)
        })
    };

    match timeout(budget, task).await {
        Ok(Ok(findings)) => {
            debug!(
                rule = rule.id(),
                file = model.file(),
                findings = findings.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "rule finished"
            );
            findings
        }
        Ok(Err(join_error)) => {
            let message = if join_error.is_panic() {
                panic_message(join_error.into_panic())
            } else {
                join_error.to_string()
            };
            let failure = RuleFailure::Fault {
                rule_id: rule.id().to_string(),
                message,
            };
            warn!(rule = rule.id(), file = model.file(), "{failure}");
            vec![synthetic(rule.as_ref(), &model, failure, FindingStatus::Fault)]
        }
        Err(_) => {
            cancel.cancel();
            let failure = RuleFailure::Timeout {
                rule_id: rule.id().to_string(),
                timeout_ms: budget.as_millis() as u64,
            };
            warn!(rule = rule.id(), file = model.file(), "{failure}");
            vec![synthetic(rule.as_ref(), &model, failure, FindingStatus::Timeout)]
        }
    }
}

/// Finding recorded on behalf of a rule that did not complete.
fn synthetic(
    rule: &dyn Rule,
    model: &SourceModel,
    failure: RuleFailure,
    status: FindingStatus,
) -> Finding {
    let span = model.node(model.root()).span;
    Finding::new(
        rule.id(),
        rule.severity(),
        model.file(),
        span,
        failure.to_string(),
    )
    .with_status(status)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "rule panicked".to_string()
    }
}

/// Analyzes one unit with a throwaway engine.
pub fn analyze_source(
    file: &str,
    source: &str,
    registry: &RuleRegistry,
    config: &Configuration,
) -> Result<Report, AnalysisError> {
    AnalysisEngine::new()?.analyze_source(file, source, registry, config)
}

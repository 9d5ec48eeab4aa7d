//! Rules that overrun their budget or panic never take the run down with them.

use codesnag_lint::{
    AnalysisEngine, Configuration, Finding, FindingStatus, Rule, RuleContext, RuleRegistry,
    Severity, Thresholds,
};
use codesnag_model::SourceModel;
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Spins until cancelled, recording whether it saw the cancellation.
struct SlowRule {
    observed_cancel: Arc<AtomicBool>,
}

impl Rule for SlowRule {
    fn id(&self) -> &'static str {
        "X_SLOW"
    }
    fn title(&self) -> &'static str {
        "slow"
    }
    fn severity(&self) -> Severity {
        Severity::CodeSmell
    }
    fn inspect(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let deadline = Instant::now() + Duration::from_secs(10);
        while Instant::now() < deadline {
            if ctx.is_cancelled() {
                self.observed_cancel.store(true, Ordering::SeqCst);
                break;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        vec![ctx.finding_at(self, ctx.model.node(ctx.model.root()).span, "late")]
    }
}

/// Never returns and never looks at the cancellation token.
struct StuckRule;

impl Rule for StuckRule {
    fn id(&self) -> &'static str {
        "X_STUCK"
    }
    fn title(&self) -> &'static str {
        "stuck"
    }
    fn severity(&self) -> Severity {
        Severity::Bug
    }
    fn inspect(&self, _ctx: &RuleContext<'_>) -> Vec<Finding> {
        loop {
            std::thread::sleep(Duration::from_millis(10));
        }
    }
}

struct FaultyRule;

impl Rule for FaultyRule {
    fn id(&self) -> &'static str {
        "X_FAULT"
    }
    fn title(&self) -> &'static str {
        "faulty"
    }
    fn severity(&self) -> Severity {
        Severity::Bug
    }
    fn inspect(&self, _ctx: &RuleContext<'_>) -> Vec<Finding> {
        let empty: Vec<u8> = Vec::new();
        vec![Finding::new(
            "X_FAULT",
            Severity::Bug,
            "x",
            Default::default(),
            format!("{}", empty[3]),
        )]
    }
}

const SOURCE: &str = "let unused = 1;\nconst password = 'hunter22';\nlog(password);\n";

fn standard_rules() -> Vec<Arc<dyn Rule>> {
    RuleRegistry::with_default_rules()
        .enabled_rules(&Configuration::default())
        .unwrap()
}

#[test]
fn timeout_is_reported_and_others_complete() {
    let observed_cancel = Arc::new(AtomicBool::new(false));
    let mut registry = RuleRegistry::with_default_rules();
    registry
        .register(Arc::new(SlowRule {
            observed_cancel: Arc::clone(&observed_cancel),
        }))
        .unwrap();
    let config = Configuration::default().with_thresholds(Thresholds {
        rule_timeout_ms: 50,
        ..Thresholds::default()
    });

    let engine = AnalysisEngine::new().unwrap();
    let started = Instant::now();
    let report = engine
        .analyze_source("slow.js", SOURCE, &registry, &config)
        .unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));

    let slow: Vec<&Finding> = report.by_rule("X_SLOW").collect();
    assert_eq!(slow.len(), 1);
    assert_eq!(slow[0].status, FindingStatus::Timeout);
    assert_eq!(slow[0].message, "E001: rule 'X_SLOW' timed out after 50ms");
    assert_eq!(report.summary.rule_errors, 1);

    // everything else matches a run without the slow rule
    let engine_alone = AnalysisEngine::new().unwrap();
    let model = Arc::new(SourceModel::parse("slow.js", SOURCE).unwrap());
    let baseline = engine_alone.analyze(model, &standard_rules(), &config.thresholds);
    let others: Vec<&Finding> = report
        .findings
        .iter()
        .filter(|f| f.rule_id != "X_SLOW")
        .collect();
    assert_eq!(others, baseline.findings.iter().collect::<Vec<_>>());

    // the worker is told to stop
    let deadline = Instant::now() + Duration::from_secs(2);
    while !observed_cancel.load(Ordering::SeqCst) && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(observed_cancel.load(Ordering::SeqCst));
}

#[test]
fn rule_that_never_returns_is_abandoned() {
    let mut registry = RuleRegistry::with_default_rules();
    registry.register(Arc::new(StuckRule)).unwrap();
    let config = Configuration::default().with_thresholds(Thresholds {
        rule_timeout_ms: 100,
        ..Thresholds::default()
    });

    let started = Instant::now();
    for _ in 0..3 {
        let engine = AnalysisEngine::new().unwrap();
        let report = engine
            .analyze_source("stuck.js", SOURCE, &registry, &config)
            .unwrap();

        let stuck: Vec<&Finding> = report.by_rule("X_STUCK").collect();
        assert_eq!(stuck.len(), 1);
        assert_eq!(stuck[0].status, FindingStatus::Timeout);
        assert_eq!(stuck[0].message, "E001: rule 'X_STUCK' timed out after 100ms");
        assert_eq!(report.by_rule("S1481").count(), 1);
        assert_eq!(report.by_rule("S2068").count(), 1);
        assert_eq!(report.summary.rule_errors, 1);
    }
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn fault_is_reported_and_others_complete() {
    let mut registry = RuleRegistry::with_default_rules();
    registry.register(Arc::new(FaultyRule)).unwrap();

    let engine = AnalysisEngine::new().unwrap();
    let report = engine
        .analyze_source("fault.js", SOURCE, &registry, &Configuration::default())
        .unwrap();

    let fault = report.by_rule("X_FAULT").next().unwrap();
    assert_eq!(fault.status, FindingStatus::Fault);
    assert!(fault.message.starts_with("E002: rule 'X_FAULT' failed:"));
    assert!(fault.message.contains("index out of bounds"));
    assert_eq!(report.by_rule("S1481").count(), 1);
    assert_eq!(report.by_rule("S2068").count(), 1);
    assert_eq!(report.summary.rule_errors, 1);
}

#[test]
fn synthetic_findings_survive_json() {
    let mut registry = RuleRegistry::with_default_rules();
    registry.register(Arc::new(FaultyRule)).unwrap();
    let report = codesnag_lint::analyze_source("f.js", "x();\n", &registry, &Configuration::default())
        .unwrap();

    let json = serde_json::to_value(&report).unwrap();
    let statuses: Vec<&str> = json["findings"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|f| f["status"].as_str())
        .collect();
    assert_eq!(statuses, vec!["fault"]);
}

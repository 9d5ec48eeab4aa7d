//! Analysis helpers shared by the integration tests.

use codesnag_lint::{analyze_source, Configuration, Report, RuleRegistry, Thresholds};

/// File name used for in-memory sources.
pub const UNIT: &str = "fixture.js";

/// Analyzes `source` with the default configuration.
pub fn analyze(source: &str) -> Report {
    analyze_with(source, &Configuration::default())
}

/// Analyzes `source` with `config`.
pub fn analyze_with(source: &str, config: &Configuration) -> Report {
    let registry = RuleRegistry::with_default_rules();
    analyze_source(UNIT, source, &registry, config).expect("analysis should succeed")
}

/// Analyzes `source` with every rule enabled, including default-off ones.
pub fn analyze_all(source: &str, thresholds: Thresholds) -> Report {
    let registry = RuleRegistry::with_default_rules();
    let mut config = Configuration::default().with_thresholds(thresholds);
    for rule in registry.rules() {
        config = config.enable(rule.id());
    }
    analyze_source(UNIT, source, &registry, &config).expect("analysis should succeed")
}

/// Distinct rule ids in a report, in report order.
pub fn rule_ids(report: &Report) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for finding in &report.findings {
        if !ids.contains(&finding.rule_id) {
            ids.push(finding.rule_id.clone());
        }
    }
    ids
}

/// BLAKE3 hash of a report's JSON form.
pub fn report_hash(report: &Report) -> String {
    let json = serde_json::to_vec(report).expect("report serializes");
    blake3::hash(&json).to_hex().to_string()
}

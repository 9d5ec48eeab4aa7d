//! Configuration validation and its effect on the rule set.

use codesnag_cli::config::{apply_overrides, load_configuration};
use codesnag_lint::{
    analyze_source, AnalysisError, Configuration, ConfigurationError, RuleRegistry, Thresholds,
};
use codesnag_tests::{analyze_with, ProjectFixture};
use pretty_assertions::assert_eq;

const PARAMS: &str = "function f(a, b, c, d, e) {\n  return a + b + c + d + e;\n}\nf();\n";

fn config_error(config: &Configuration) -> ConfigurationError {
    let registry = RuleRegistry::with_default_rules();
    match analyze_source("c.js", "x();\n", &registry, config) {
        Err(AnalysisError::Configuration(e)) => e,
        other => panic!("expected a configuration error, got {other:?}"),
    }
}

#[test]
fn invalid_threshold_is_rejected() {
    let config = Configuration::default().with_thresholds(Thresholds {
        max_parameters: 0,
        ..Thresholds::default()
    });
    let err = config_error(&config);
    assert_eq!(err.code(), "C001");
    assert!(err.to_string().contains("max_parameters"));
}

#[test]
fn unknown_rule_is_rejected() {
    let err = config_error(&Configuration::default().disable("S0000"));
    assert_eq!(err, ConfigurationError::UnknownRule { id: "S0000".into() });
}

#[test]
fn conflicting_rule_is_rejected() {
    let err = config_error(&Configuration::default().enable("S107").disable("S107"));
    assert_eq!(err.code(), "C003");
}

#[test]
fn disabled_rule_does_not_run() {
    let source = "let unused = 1;\n";
    assert_eq!(
        analyze_with(source, &Configuration::default()).by_rule("S1481").count(),
        1
    );
    assert_eq!(
        analyze_with(source, &Configuration::default().disable("S1481"))
            .by_rule("S1481")
            .count(),
        0
    );
}

#[test]
fn default_off_rule_runs_when_enabled() {
    let source = "const ok = a && b || c && d || e;\n";
    let default = analyze_with(source, &Configuration::default());
    assert_eq!(default.by_rule("S1067").count(), 0);

    let enabled = analyze_with(source, &Configuration::default().enable("S1067"));
    assert_eq!(enabled.by_rule("S1067").count(), 1);
}

#[test]
fn threshold_changes_rule_outcome() {
    assert_eq!(
        analyze_with(PARAMS, &Configuration::default())
            .by_rule("S107")
            .count(),
        0
    );
    let strict = Configuration::default().with_thresholds(Thresholds {
        max_parameters: 4,
        ..Thresholds::default()
    });
    let report = analyze_with(PARAMS, &strict);
    let finding = report.by_rule("S107").next().unwrap();
    assert_eq!(
        finding.message,
        "This function has 5 parameters, which is greater than the 4 authorized."
    );
}

#[test]
fn yaml_and_json_files_agree() {
    let project = ProjectFixture::new();
    let yaml = project.add_file(
        "codesnag.yaml",
        "disabled_rules:\n  - S109\nthresholds:\n  max_parameters: 4\n",
    );
    let json = project.add_file(
        "codesnag.json",
        r#"{"disabled_rules": ["S109"], "thresholds": {"max_parameters": 4}}"#,
    );

    let from_yaml = load_configuration(&yaml).unwrap();
    let from_json = load_configuration(&json).unwrap();
    assert_eq!(from_yaml, from_json);
    assert_eq!(from_yaml.thresholds.rule_timeout_ms, Thresholds::default().rule_timeout_ms);

    let report = analyze_with(PARAMS, &from_yaml);
    assert_eq!(report.by_rule("S107").count(), 1);
}

#[test]
fn command_line_overrides_apply_on_top_of_file() {
    let registry = RuleRegistry::with_default_rules();
    let config = apply_overrides(
        Configuration::default(),
        &registry,
        &["S1481".to_string()],
        Some("S1481,S107"),
    );
    assert!(config.validate(&registry).is_ok());

    let enabled = registry.enabled_rules(&config).unwrap();
    let ids: Vec<&str> = enabled.iter().map(|r| r.id()).collect();
    assert_eq!(ids, vec!["S107"]);
}

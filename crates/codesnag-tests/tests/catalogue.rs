//! Every catalogue rule fires on its buggy fixture and stays quiet on the fixed one.

use codesnag_lint::{RuleRegistry, Severity, Thresholds};
use codesnag_tests::{analyze_all, catalogue};
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;

/// Thresholds small enough for the long-function fixture.
fn fixture_thresholds() -> Thresholds {
    Thresholds {
        max_function_lines: 10,
        ..Thresholds::default()
    }
}

#[test]
fn catalogue_covers_every_rule() {
    let registry = RuleRegistry::with_default_rules();
    let registered: BTreeSet<&str> = registry.rules().map(|r| r.id()).collect();
    let fixtures: BTreeSet<&str> = catalogue().iter().map(|f| f.rule_id).collect();
    assert_eq!(registered, fixtures);
}

#[test]
fn buggy_fixtures_trigger_their_rule() {
    for fixture in catalogue() {
        let report = analyze_all(fixture.buggy, fixture_thresholds());
        assert!(
            report.by_rule(fixture.rule_id).count() >= 1,
            "{} did not fire on its buggy fixture; got {:?}",
            fixture.rule_id,
            codesnag_tests::rule_ids(&report)
        );
    }
}

#[test]
fn fixed_fixtures_do_not_trigger_their_rule() {
    for fixture in catalogue() {
        let report = analyze_all(fixture.fixed, fixture_thresholds());
        let hits: Vec<String> = report
            .by_rule(fixture.rule_id)
            .map(|f| format!("{}: {}", f.span, f.message))
            .collect();
        assert!(
            hits.is_empty(),
            "{} fired on its fixed fixture: {:?}",
            fixture.rule_id,
            hits
        );
    }
}

#[test]
fn findings_carry_catalogue_severity() {
    let registry = RuleRegistry::with_default_rules();
    for fixture in catalogue() {
        let expected = registry.get(fixture.rule_id).unwrap().severity();
        let report = analyze_all(fixture.buggy, fixture_thresholds());
        for finding in report.by_rule(fixture.rule_id) {
            assert_eq!(finding.severity, expected, "{}", fixture.rule_id);
        }
    }
}

#[test]
fn unused_variable_scenario() {
    let source = "function f() {\n  const unusedVar = 'a';\n  const usedVar = 'b';\n  console.log(usedVar);\n}\nf();\n";
    let report = analyze_all(source, Thresholds::default());
    let unused: Vec<_> = report.by_rule("S1481").collect();
    assert_eq!(unused.len(), 1);
    assert_eq!(unused[0].span.line, 2);
    assert_eq!(unused[0].severity, Severity::Bug);
}

#[test]
fn loop_equality_scenario() {
    let source = "const items = ['a', 'b', 'c'];\nfor (let i = 0; i == items.length; i++) {\n  console.log(items[i]);\n}\n";
    let report = analyze_all(source, Thresholds::default());
    let finding = report.by_rule("S888").next().unwrap();
    assert_eq!((finding.span.line, finding.span.column), (2, 17));
}

#[test]
fn excess_parameters_message() {
    let source = "function f(a, b, c, d, e, f2, g, h, i) {\n  return [a, b, c, d, e, f2, g, h, i];\n}\nf();\n";
    let report = analyze_all(source, Thresholds::default());
    let finding = report.by_rule("S107").next().unwrap();
    assert_eq!(
        finding.message,
        "This function has 9 parameters, which is greater than the 7 authorized."
    );
}

#[test]
fn duplicated_literal_lists_every_occurrence() {
    let source = "log('pending');\nlog('pending');\nlog('pending');\n";
    let report = analyze_all(source, Thresholds::default());
    let finding = report.by_rule("S1192").next().unwrap();
    assert_eq!(finding.span.line, 1);
    assert_eq!(finding.secondary_locations.len(), 3);
}

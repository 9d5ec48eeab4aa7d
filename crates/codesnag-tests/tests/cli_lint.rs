//! End-to-end runs of the lint command over on-disk projects.

use chrono::{Duration, Utc};
use codesnag_cli::cache::{CacheKey, ReportCache, TOOL_VERSION};
use codesnag_cli::commands::cache::{prune_message, render_list};
use codesnag_cli::commands::lint::{analyze_files, render_text};
use codesnag_cli::input::collect_sources;
use codesnag_lint::{AnalysisEngine, Configuration, RuleRegistry};
use codesnag_tests::fixtures::sample_project;
use codesnag_tests::ProjectFixture;
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use tempfile::TempDir;

fn project_sources() -> Vec<PathBuf> {
    collect_sources(&[sample_project().to_string_lossy().to_string()]).unwrap()
}

fn lint(files: &[PathBuf], cache: Option<&ReportCache>) -> codesnag_cli::commands::lint::LintRun {
    let registry = RuleRegistry::with_default_rules();
    let config = Configuration::default();
    let rules = registry.enabled_rules(&config).unwrap();
    let engine = AnalysisEngine::new().unwrap();
    analyze_files(&engine, files, &rules, &config, cache)
}

#[test]
fn discovery_skips_dependencies() {
    let names: Vec<String> = project_sources()
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["app.js", "view.mjs"]);
}

#[test]
fn lint_reports_findings_per_file() {
    let run = lint(&project_sources(), None);
    assert_eq!(run.files_analyzed, 2);
    assert!(run.errors.is_empty());

    let credential = run.report.by_rule("S2068").next().unwrap();
    assert!(credential.file.ends_with("src/app.js"));
    assert_eq!(credential.span.line, 3);
    assert!(!run.success(false));
}

#[test]
fn parse_failures_are_listed_and_others_continue() {
    let project = ProjectFixture::new();
    let good = project.add_file("good.js", "let unused = 1;\n");
    let bad = project.add_file("bad.js", "function (\n");
    let run = lint(&[bad, good], None);

    assert_eq!(run.files_analyzed, 1);
    assert_eq!(run.errors.len(), 1);
    assert_eq!(run.errors[0].code, "P001");
    assert_eq!(run.report.by_rule("S1481").count(), 1);
    assert!(!run.success(false));
}

#[test]
fn clean_project_passes() {
    let project = ProjectFixture::new();
    let file = project.add_file("ok.js", "export function add(a, b) {\n  return a + b;\n}\n");
    let run = lint(&[file], None);
    assert!(run.report.is_clean());
    assert!(run.success(true));

    colored::control::set_override(false);
    let text = render_text(&run, true);
    assert!(text.contains("Linting: 1 file(s)"));
    assert!(text.contains("PASSED"));
}

#[test]
fn cached_runs_match_fresh_runs() {
    let cache_dir = TempDir::new().unwrap();
    let cache = ReportCache::with_dir(cache_dir.path());
    let files = project_sources();

    let fresh = lint(&files, Some(&cache));
    assert_eq!(cache.entries().unwrap().len(), 2);

    let cached = lint(&files, Some(&cache));
    assert_eq!(cached.report, fresh.report);
    assert_eq!(cached.files_analyzed, fresh.files_analyzed);
}

#[test]
fn identical_files_share_a_cache_entry() {
    let cache_dir = TempDir::new().unwrap();
    let cache = ReportCache::with_dir(cache_dir.path());
    let project = ProjectFixture::new();
    let a = project.add_file("a.js", "let unused = 1;\n");
    let b = project.add_file("b.js", "let unused = 1;\n");

    let run = lint(&[a, b], Some(&cache));
    assert_eq!(cache.entries().unwrap().len(), 1);
    let files: Vec<&str> = run.report.findings.iter().map(|f| f.file.as_str()).collect();
    assert_eq!(files.len(), 2);
    assert!(files[0].ends_with("a.js"));
    assert!(files[1].ends_with("b.js"));
}

#[test]
fn cache_commands_manage_lint_entries() {
    colored::control::set_override(false);
    let cache_dir = TempDir::new().unwrap();
    let cache = ReportCache::with_dir(cache_dir.path());
    lint(&project_sources(), Some(&cache));

    // an entry left behind by an earlier run
    let now = Utc::now();
    let stale = CacheKey::new("let old = 1;\n", &Configuration::default(), TOOL_VERSION).unwrap();
    cache
        .put_at(&stale, &codesnag_lint::Report::default(), now - Duration::days(45))
        .unwrap();

    let entries = cache.entries().unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].hash, stale.compute_hash());
    let listing = render_list(&cache, &entries, now);
    assert!(listing.contains("45d"));
    assert!(listing.contains("3 entries"));
    assert!(listing.contains(&stale.compute_hash()[..12]));

    let removed = cache.prune(Duration::days(30), now).unwrap();
    assert_eq!(removed, 1);
    assert!(prune_message(removed, 30).starts_with("Pruned 1 cached report"));
    assert!(!cache.has_entry(&stale));

    // pruning keeps the fresh reports usable
    let rerun = lint(&project_sources(), Some(&cache));
    assert_eq!(rerun.report.by_rule("S2068").count(), 1);

    assert_eq!(cache.clear().unwrap(), 2);
    assert!(render_list(&cache, &cache.entries().unwrap(), now).contains("no entries"));
}

//! Lint command implementation
//!
//! Runs the rule catalogue over JavaScript sources and renders the report.

use anyhow::{Context, Result};
use codesnag_lint::{
    AnalysisEngine, Configuration, Finding, Report, Rule, RuleRegistry, Severity,
};
use codesnag_model::SourceModel;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};

use crate::cache::{CacheKey, ReportCache, TOOL_VERSION};
use crate::config::{apply_overrides, load_configuration};
use crate::input::{collect_sources, display_path};

/// Exit code when findings fail the run.
pub const EXIT_FINDINGS: u8 = 1;
/// Exit code for configuration and usage errors.
pub const EXIT_USAGE: u8 = 2;

/// Output format for lint results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!(
                "unknown format '{}', expected 'text' or 'json'",
                s
            )),
        }
    }
}

/// Options collected from the command line.
#[derive(Debug, Clone)]
pub struct LintOptions {
    pub paths: Vec<String>,
    pub config: Option<String>,
    pub disable_rules: Vec<String>,
    pub only_rules: Option<String>,
    pub format: OutputFormat,
    pub strict: bool,
    pub use_cache: bool,
    /// Cache directory override
    pub cache_dir: Option<PathBuf>,
    pub output: Option<String>,
}

/// A file that could not be analyzed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileError {
    pub file: String,
    /// Stable error code (e.g., "P001").
    pub code: String,
    pub message: String,
}

/// JSON output for lint command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LintOutput {
    /// Whether the run passed.
    pub success: bool,
    /// Number of files analyzed, including cache hits.
    pub files_analyzed: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FileError>,
    pub report: Report,
}

/// Result of analyzing a set of files.
#[derive(Debug, Clone, Default)]
pub struct LintRun {
    pub report: Report,
    pub files_analyzed: usize,
    pub errors: Vec<FileError>,
}

impl LintRun {
    /// Whether the run passes: no file errors, and no bugs or vulnerabilities
    /// (no findings at all when `strict`).
    pub fn success(&self, strict: bool) -> bool {
        if !self.errors.is_empty() {
            return false;
        }
        if strict {
            self.report.is_clean()
        } else {
            !self.report.has_defects()
        }
    }
}

/// Run the lint command.
///
/// # Returns
/// Exit code: 0 if passed, 1 on failing findings or unreadable files,
/// 2 on configuration errors
pub fn run(options: &LintOptions) -> Result<ExitCode> {
    let registry = RuleRegistry::with_default_rules();

    let file_config = match &options.config {
        Some(path) => load_configuration(Path::new(path))?,
        None => Configuration::default(),
    };
    let config = apply_overrides(
        file_config,
        &registry,
        &options.disable_rules,
        options.only_rules.as_deref(),
    );

    let rules = match registry.enabled_rules(&config) {
        Ok(rules) => rules,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            return Ok(ExitCode::from(EXIT_USAGE));
        }
    };

    let files = collect_sources(&options.paths)?;
    let cache = if options.use_cache {
        match ReportCache::open(options.cache_dir.as_deref()) {
            Ok(cache) => Some(cache),
            Err(e) => {
                warn!("report cache disabled: {:#}", e);
                None
            }
        }
    } else {
        None
    };

    let engine = AnalysisEngine::new().context("Failed to start analysis engine")?;
    let run = analyze_files(&engine, &files, &rules, &config, cache.as_ref());
    let success = run.success(options.strict);

    let rendered = match options.format {
        OutputFormat::Json => {
            let output = LintOutput {
                success,
                files_analyzed: run.files_analyzed,
                errors: run.errors.clone(),
                report: run.report.clone(),
            };
            let mut json = serde_json::to_string_pretty(&output)
                .context("Failed to serialize lint output")?;
            json.push('\n');
            json
        }
        OutputFormat::Text => {
            if options.output.is_some() {
                colored::control::set_override(false);
            }
            render_text(&run, options.strict)
        }
    };

    match &options.output {
        Some(path) => fs::write(path, rendered)
            .with_context(|| format!("Failed to write output file: {}", path))?,
        None => print!("{}", rendered),
    }

    if success {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_FINDINGS))
    }
}

/// Analyzes every file, consulting the cache first.
pub fn analyze_files(
    engine: &AnalysisEngine,
    files: &[impl AsRef<Path>],
    rules: &[Arc<dyn Rule>],
    config: &Configuration,
    cache: Option<&ReportCache>,
) -> LintRun {
    let mut reports = Vec::new();
    let mut errors = Vec::new();
    let mut files_analyzed = 0;

    for path in files {
        let path = path.as_ref();
        let file = display_path(path);

        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) => {
                warn!(file = %file, "failed to read source: {}", e);
                errors.push(FileError {
                    file,
                    code: "E003".to_string(),
                    message: format!("Failed to read file: {}", e),
                });
                continue;
            }
        };

        let key = cache.and_then(|_| CacheKey::new(&source, config, TOOL_VERSION).ok());
        if let (Some(cache), Some(key)) = (cache, key.as_ref()) {
            match cache.get(key, &file) {
                Ok(Some(report)) => {
                    info!(file = %file, findings = report.findings.len(), "cache hit");
                    files_analyzed += 1;
                    reports.push(report);
                    continue;
                }
                Ok(None) => {}
                Err(e) => warn!(file = %file, "ignoring unreadable cache entry: {:#}", e),
            }
        }

        let model = match SourceModel::parse(file.as_str(), source) {
            Ok(model) => model,
            Err(e) => {
                warn!(file = %file, "{}", e);
                errors.push(FileError {
                    file,
                    code: e.code().to_string(),
                    message: e.to_string(),
                });
                continue;
            }
        };

        let report = engine.analyze(Arc::new(model), rules, &config.thresholds);
        info!(file = %file, findings = report.findings.len(), "analyzed");
        files_analyzed += 1;

        if let (Some(cache), Some(key)) = (cache, key.as_ref()) {
            // timeouts depend on machine load; never cache them
            if report.summary.rule_errors == 0 {
                if let Err(e) = cache.put(key, &report) {
                    warn!(file = %file, "failed to cache report: {:#}", e);
                }
            }
        }
        reports.push(report);
    }

    LintRun {
        report: Report::merge(reports),
        files_analyzed,
        errors,
    }
}

fn severity_marker(finding: &Finding) -> colored::ColoredString {
    if finding.is_synthetic() {
        return "?".blue();
    }
    match finding.severity {
        Severity::Bug => "x".red(),
        Severity::Vulnerability => "!".magenta(),
        Severity::CodeSmell => "~".yellow(),
    }
}

/// Renders lint results in human-readable text format.
pub fn render_text(run: &LintRun, strict: bool) -> String {
    let mut out = format!(
        "{} {} file(s)\n",
        "Linting:".cyan().bold(),
        run.files_analyzed
    );

    for error in &run.errors {
        out.push_str(&format!(
            "\n{} {}: {}\n",
            "error".red().bold(),
            error.file,
            error.message
        ));
    }

    for (file, findings) in run.report.by_file() {
        out.push_str(&format!("\n{}\n", file.bold()));
        for finding in findings {
            out.push_str(&render_finding(finding));
        }
    }

    let summary = &run.report.summary;
    let mut line = format!(
        "{} bug(s), {} vulnerability(ies), {} code smell(s)",
        summary.bugs, summary.vulnerabilities, summary.code_smells
    );
    if summary.rule_errors > 0 {
        line.push_str(&format!(", {} rule error(s)", summary.rule_errors));
    }

    if run.success(strict) {
        out.push_str(&format!("\n{} {}\n", "PASSED".green().bold(), line.dimmed()));
    } else {
        out.push_str(&format!("\n{} {}\n", "FAILED".red().bold(), line.dimmed()));
    }
    out
}

/// Renders a single finding with its secondary locations.
fn render_finding(finding: &Finding) -> String {
    let repeat = if finding.occurrences > 1 {
        format!(" (x{})", finding.occurrences)
    } else {
        String::new()
    };
    let mut out = format!(
        "  {} {} [{}] {}{}\n",
        severity_marker(finding),
        finding.span.to_string().dimmed(),
        finding.rule_id.cyan(),
        finding.message,
        repeat.dimmed()
    );
    for secondary in &finding.secondary_locations {
        let note = secondary
            .message
            .as_deref()
            .map(|m| format!(" {}", m))
            .unwrap_or_default();
        out.push_str(&format!(
            "    {} {}{}\n",
            "->".dimmed(),
            secondary.span,
            note.dimmed()
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn rules(config: &Configuration) -> Vec<Arc<dyn Rule>> {
        RuleRegistry::with_default_rules()
            .enabled_rules(config)
            .unwrap()
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("invalid".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_analyze_files_collects_findings_and_errors() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("a.js");
        let broken = dir.path().join("b.js");
        fs::write(&good, "let unused = 1;\n").unwrap();
        fs::write(&broken, "function (\n").unwrap();

        let config = Configuration::default();
        let engine = AnalysisEngine::new().unwrap();
        let run = analyze_files(&engine, &[&good, &broken], &rules(&config), &config, None);

        assert_eq!(run.files_analyzed, 1);
        assert_eq!(run.errors.len(), 1);
        assert_eq!(run.errors[0].code, "P001");
        assert_eq!(run.report.by_rule("S1481").count(), 1);
        assert!(!run.success(false));
    }

    #[test]
    fn test_cache_hit_matches_fresh_run() {
        let dir = TempDir::new().unwrap();
        let cache = ReportCache::with_dir(dir.path().join("cache"));
        let file = dir.path().join("a.js");
        fs::write(&file, "const password = 'hunter22';\nlet x = 1;\n").unwrap();

        let config = Configuration::default();
        let engine = AnalysisEngine::new().unwrap();
        let rules = rules(&config);
        let first = analyze_files(&engine, &[&file], &rules, &config, Some(&cache));
        assert_eq!(cache.entries().unwrap().len(), 1);
        let second = analyze_files(&engine, &[&file], &rules, &config, Some(&cache));

        assert_eq!(first.report, second.report);
        assert_eq!(second.files_analyzed, 1);
    }

    #[test]
    fn test_success_rules() {
        let config = Configuration::default().disable("S109");
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("smelly.js");
        fs::write(&file, "function noop() {}\nnoop();\n").unwrap();

        let engine = AnalysisEngine::new().unwrap();
        let run = analyze_files(&engine, &[&file], &rules(&config), &config, None);
        assert_eq!(run.report.summary.code_smells, 1);
        assert!(run.success(false));
        assert!(!run.success(true));
    }

    #[test]
    fn test_render_text() {
        colored::control::set_override(false);
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.js");
        fs::write(&file, "let unused = 1;\n").unwrap();

        let config = Configuration::default();
        let engine = AnalysisEngine::new().unwrap();
        let run = analyze_files(&engine, &[&file], &rules(&config), &config, None);
        let text = render_text(&run, false);

        assert!(text.starts_with("Linting: 1 file(s)"));
        assert!(text.contains("x 1:5 [S1481]"));
        assert!(text.contains("FAILED 1 bug(s), 0 vulnerability(ies), 0 code smell(s)"));
    }
}

//! Rules command implementation
//!
//! Lists the rule catalogue with each rule's default state.

use anyhow::{Context, Result};
use codesnag_lint::{RuleMetadata, RuleRegistry, Severity};
use colored::Colorize;
use std::process::ExitCode;

/// Run the rules command.
pub fn run(json: bool) -> Result<ExitCode> {
    let registry = RuleRegistry::with_default_rules();
    let metadata = registry.metadata();

    if json {
        let output =
            serde_json::to_string_pretty(&metadata).context("Failed to serialize rule list")?;
        println!("{}", output);
    } else {
        print!("{}", render_text(&metadata));
    }

    Ok(ExitCode::SUCCESS)
}

fn severity_label(severity: Severity) -> colored::ColoredString {
    match severity {
        Severity::Bug => "bug".red(),
        Severity::Vulnerability => "vulnerability".magenta(),
        Severity::CodeSmell => "code_smell".yellow(),
    }
}

/// Renders the catalogue as an aligned table.
pub(crate) fn render_text(metadata: &[RuleMetadata]) -> String {
    let mut out = format!("{}\n", "Rules:".cyan().bold());
    for rule in metadata {
        let mut flags = Vec::new();
        if !rule.default_enabled {
            flags.push("off by default");
        }
        if !rule.standard {
            flags.push("heuristic");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" ({})", flags.join(", "))
        };
        out.push_str(&format!(
            "  {:<8} {:<14} {}{}\n",
            rule.id.cyan(),
            severity_label(rule.severity),
            rule.title,
            flags.dimmed()
        ));
    }
    out.push_str(&format!(
        "\n{} rule(s)\n",
        metadata.len().to_string().bold()
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_text_lists_every_rule() {
        colored::control::set_override(false);
        let registry = RuleRegistry::with_default_rules();
        let text = render_text(&registry.metadata());

        assert!(text.contains("S1481"));
        assert!(text.contains("PERF001"));
        assert!(text.contains("heuristic"));
        assert!(text.contains("off by default"));
        assert!(text.contains("20 rule(s)"));
    }
}

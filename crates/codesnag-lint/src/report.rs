//! Finding and report types for structured output.

use codesnag_model::Span;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Severity class of a finding.
///
/// Describes the nature of a problem, not its urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Code that does the wrong thing.
    Bug,
    /// Code that can be exploited.
    Vulnerability,
    /// Code that is hard to maintain.
    CodeSmell,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Bug => "bug",
            Severity::Vulnerability => "vulnerability",
            Severity::CodeSmell => "code_smell",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a finding came from a rule or from the engine.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FindingStatus {
    /// Reported by the rule itself.
    #[default]
    Reported,
    /// The rule exceeded its time budget.
    Timeout,
    /// The rule panicked.
    Fault,
}

impl FindingStatus {
    /// Returns true for findings produced by the engine on a rule's behalf.
    pub fn is_synthetic(&self) -> bool {
        !matches!(self, FindingStatus::Reported)
    }

    fn is_reported(&self) -> bool {
        matches!(self, FindingStatus::Reported)
    }
}

/// A secondary location attached to a finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryLocation {
    #[serde(flatten)]
    pub span: Span,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

fn is_one(count: &usize) -> bool {
    *count == 1
}

fn one() -> usize {
    1
}

/// One reported instance of a rule condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Stable rule identifier (e.g., "S1481").
    pub rule_id: String,

    pub severity: Severity,

    /// Human-readable description of the problem.
    pub message: String,

    /// Analyzed unit the finding belongs to.
    pub file: String,

    /// Primary location.
    #[serde(flatten)]
    pub span: Span,

    #[serde(default)]
    pub secondary_locations: Vec<SecondaryLocation>,

    #[serde(default, skip_serializing_if = "FindingStatus::is_reported")]
    pub status: FindingStatus,

    /// How many identical findings were merged into this one.
    #[serde(default = "one", skip_serializing_if = "is_one")]
    pub occurrences: usize,
}

impl Finding {
    /// Creates a finding with required fields.
    pub fn new(
        rule_id: impl Into<String>,
        severity: Severity,
        file: impl Into<String>,
        span: Span,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.into(),
            severity,
            message: message.into(),
            file: file.into(),
            span,
            secondary_locations: Vec::new(),
            status: FindingStatus::Reported,
            occurrences: 1,
        }
    }

    /// Builder method to add a secondary location.
    pub fn with_secondary(mut self, span: Span) -> Self {
        self.secondary_locations.push(SecondaryLocation {
            span,
            message: None,
        });
        self
    }

    /// Builder method to add a secondary location with a note.
    pub fn with_secondary_note(mut self, span: Span, message: impl Into<String>) -> Self {
        self.secondary_locations.push(SecondaryLocation {
            span,
            message: Some(message.into()),
        });
        self
    }

    /// Builder method to set the status.
    pub fn with_status(mut self, status: FindingStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_synthetic(&self) -> bool {
        self.status.is_synthetic()
    }
}

/// Summary counts for a report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub bugs: usize,
    pub vulnerabilities: usize,
    pub code_smells: usize,
    /// Rule timeouts and faults.
    #[serde(default)]
    pub rule_errors: usize,
}

impl Summary {
    /// Counts one finding.
    pub fn record(&mut self, finding: &Finding) {
        if finding.is_synthetic() {
            self.rule_errors += 1;
            return;
        }
        match finding.severity {
            Severity::Bug => self.bugs += 1,
            Severity::Vulnerability => self.vulnerabilities += 1,
            Severity::CodeSmell => self.code_smells += 1,
        }
    }

    /// Findings that are real problems in the analyzed code.
    pub fn total(&self) -> usize {
        self.bugs + self.vulnerabilities + self.code_smells
    }
}

/// Ordered findings of one analysis run plus summary counts.
///
/// Build it with [`crate::aggregate`]; the findings are already deduplicated
/// and sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub findings: Vec<Finding>,
    pub summary: Summary,
}

impl Report {
    /// Creates an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// True if nothing was found.
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    /// True if any bug or vulnerability was found.
    pub fn has_defects(&self) -> bool {
        self.summary.bugs > 0 || self.summary.vulnerabilities > 0
    }

    /// Findings with the given rule id.
    pub fn by_rule<'a>(&'a self, rule_id: &'a str) -> impl Iterator<Item = &'a Finding> + 'a {
        self.findings.iter().filter(move |f| f.rule_id == rule_id)
    }

    /// Per-file grouping view, files in sorted order.
    pub fn by_file(&self) -> BTreeMap<&str, Vec<&Finding>> {
        let mut files: BTreeMap<&str, Vec<&Finding>> = BTreeMap::new();
        for finding in &self.findings {
            files.entry(finding.file.as_str()).or_default().push(finding);
        }
        files
    }

    /// Merges several reports into one, re-aggregating their findings.
    pub fn merge(reports: impl IntoIterator<Item = Report>) -> Report {
        crate::aggregate::aggregate(reports.into_iter().flat_map(|r| r.findings))
    }
}

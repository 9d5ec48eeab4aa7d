//! Finding aggregation: deduplicate, order and count.

use crate::report::{Finding, FindingStatus, Report, Summary};
use codesnag_model::Span;
use std::collections::BTreeMap;

type DedupKey = (String, Span, String, FindingStatus);

/// Builds a report from raw findings.
///
/// Findings sharing rule id, file, primary span and status collapse into one
/// whose `occurrences` is the sum of theirs. The result is sorted by file,
/// span start, rule id and message. The output does not depend on input
/// order, and aggregating an aggregated report's findings returns it
/// unchanged.
pub fn aggregate(findings: impl IntoIterator<Item = Finding>) -> Report {
    let mut merged: BTreeMap<DedupKey, Finding> = BTreeMap::new();

    for finding in findings {
        let key = (
            finding.file.clone(),
            finding.span,
            finding.rule_id.clone(),
            finding.status,
        );
        match merged.get_mut(&key) {
            Some(existing) => {
                let occurrences = existing.occurrences + finding.occurrences;
                // keep the smallest representative so input order never matters
                if (&finding.message, &finding.secondary_locations.len())
                    < (&existing.message, &existing.secondary_locations.len())
                {
                    *existing = finding;
                }
                existing.occurrences = occurrences;
            }
            None => {
                merged.insert(key, finding);
            }
        }
    }

    let mut findings: Vec<Finding> = merged.into_values().collect();
    findings.sort_by(|a, b| {
        (&a.file, a.span.start, &a.rule_id, &a.message).cmp(&(
            &b.file,
            b.span.start,
            &b.rule_id,
            &b.message,
        ))
    });

    let mut summary = Summary::default();
    for finding in &findings {
        summary.record(finding);
    }
    Report { findings, summary }
}

//! Report cache commands: list entries, prune stale ones, clear everything.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use colored::Colorize;
use std::process::ExitCode;

use crate::cache::{EntrySummary, ReportCache};

/// Default `--older-than` for `cache prune`, in days.
pub const DEFAULT_PRUNE_DAYS: u64 = 30;

/// Lists every cached report with its age.
pub fn list(cache: &ReportCache) -> Result<ExitCode> {
    let entries = cache.entries()?;
    print!("{}", render_list(cache, &entries, Utc::now()));
    Ok(ExitCode::SUCCESS)
}

/// Removes entries older than `older_than_days`.
pub fn prune(cache: &ReportCache, older_than_days: u64) -> Result<ExitCode> {
    let max_age = Duration::days(older_than_days.min(i64::MAX as u64) as i64);
    let removed = cache.prune(max_age, Utc::now())?;
    println!("{}", prune_message(removed, older_than_days));
    Ok(ExitCode::SUCCESS)
}

/// Removes every entry.
pub fn clear(cache: &ReportCache) -> Result<ExitCode> {
    let removed = cache.clear()?;
    println!(
        "Removed {} from {}",
        plural(removed, "cached report"),
        cache.dir().display()
    );
    Ok(ExitCode::SUCCESS)
}

fn plural(count: u64, noun: &str) -> String {
    if count == 1 {
        format!("1 {}", noun)
    } else {
        format!("{} {}s", count, noun)
    }
}

pub fn prune_message(removed: u64, older_than_days: u64) -> String {
    format!(
        "Pruned {} (older than {} day(s), unreadable, or from another version)",
        plural(removed, "cached report"),
        older_than_days
    )
}

/// Compact age: `45s`, `12m`, `5h`, `3d`.
pub fn format_age(age: Duration) -> String {
    let seconds = age.num_seconds().max(0);
    match seconds {
        s if s < 60 => format!("{}s", s),
        s if s < 3_600 => format!("{}m", s / 60),
        s if s < 86_400 => format!("{}h", s / 3_600),
        s => format!("{}d", s / 86_400),
    }
}

/// Renders the entry table: short hash, age, findings and size per entry.
pub fn render_list(
    cache: &ReportCache,
    entries: &[EntrySummary],
    now: DateTime<Utc>,
) -> String {
    let mut out = format!(
        "{} {}\n",
        "Report cache:".cyan().bold(),
        cache.dir().display()
    );
    if entries.is_empty() {
        out.push_str(&format!("  {}\n", "no entries".dimmed()));
        return out;
    }

    let mut total_bytes = 0u64;
    for entry in entries {
        total_bytes += entry.size_bytes;
        let short_hash: String = entry.hash.chars().take(12).collect();
        let line = match entry.age(now) {
            Some(age) => format!(
                "  {:<12} {:>5}  {:>4} finding(s)  {} B\n",
                short_hash,
                format_age(age),
                entry.findings,
                entry.size_bytes
            ),
            None => format!(
                "  {:<12} {:>5}  {}\n",
                short_hash,
                "?",
                "unreadable".yellow()
            ),
        };
        out.push_str(&line);
    }
    out.push_str(&format!(
        "\n{} entries, {:.1} KB\n",
        entries.len(),
        total_bytes as f64 / 1024.0
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn summary(hash: &str, created_at: Option<DateTime<Utc>>, findings: usize) -> EntrySummary {
        EntrySummary {
            hash: hash.to_string(),
            created_at,
            tool_version: created_at.map(|_| "0.1.0".to_string()),
            findings,
            size_bytes: 512,
        }
    }

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(Duration::seconds(45)), "45s");
        assert_eq!(format_age(Duration::minutes(12)), "12m");
        assert_eq!(format_age(Duration::hours(5)), "5h");
        assert_eq!(format_age(Duration::days(3) + Duration::hours(2)), "3d");
        assert_eq!(format_age(Duration::seconds(-5)), "0s");
    }

    #[test]
    fn test_render_list() {
        colored::control::set_override(false);
        let cache = ReportCache::with_dir(PathBuf::from("/tmp/codesnag-reports"));
        let now = Utc::now();
        let entries = vec![
            summary("0123456789abcdef", Some(now - Duration::days(2)), 4),
            summary("fedcba", None, 0),
        ];

        let text = render_list(&cache, &entries, now);
        assert!(text.starts_with("Report cache: /tmp/codesnag-reports\n"));
        assert!(text.contains("0123456789ab"));
        assert!(!text.contains("0123456789abc"));
        assert!(text.contains("2d"));
        assert!(text.contains("4 finding(s)"));
        assert!(text.contains("unreadable"));
        assert!(text.contains("2 entries, 1.0 KB"));
    }

    #[test]
    fn test_render_empty_and_prune_message() {
        colored::control::set_override(false);
        let cache = ReportCache::with_dir(PathBuf::from("/tmp/empty"));
        assert!(render_list(&cache, &[], Utc::now()).contains("no entries"));
        assert_eq!(
            prune_message(1, 7),
            "Pruned 1 cached report (older than 7 day(s), unreadable, or from another version)"
        );
    }
}

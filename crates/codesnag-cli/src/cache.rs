//! Content-addressed caching for analysis reports.
//!
//! This module implements a local cache keyed by:
//! - BLAKE3 hash of the source text
//! - BLAKE3 hash of the effective configuration
//! - Tool version string
//!
//! Each entry is one JSON file in an XDG-compatible cache directory, named
//! after the BLAKE3 hash of its key. Entries record when they were written
//! so stale ones can be pruned by age.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use codesnag_lint::{Configuration, Report};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Version string mixed into every key so upgrades never reuse old reports.
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Cache key components for deterministic cache lookups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheKey {
    /// BLAKE3 hash of the source text
    pub source_hash: String,
    /// BLAKE3 hash of the configuration JSON
    pub config_hash: String,
    /// Tool version string
    pub tool_version: String,
}

impl CacheKey {
    /// Create a new cache key
    pub fn new(source: &str, config: &Configuration, tool_version: &str) -> Result<Self> {
        let config_json =
            serde_json::to_string(config).context("Failed to serialize configuration")?;
        Ok(Self {
            source_hash: blake3::hash(source.as_bytes()).to_hex().to_string(),
            config_hash: blake3::hash(config_json.as_bytes()).to_hex().to_string(),
            tool_version: tool_version.to_string(),
        })
    }

    /// Compute the cache entry hash (deterministic file name)
    pub fn compute_hash(&self) -> String {
        let canonical = format!(
            "source:{},config:{},version:{}",
            self.source_hash, self.config_hash, self.tool_version
        );
        blake3::hash(canonical.as_bytes()).to_hex().to_string()
    }
}

/// One cached report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Cache key components
    pub key: CacheKey,
    /// Timestamp when this entry was created
    pub created_at: String,
    /// Report for the unit, findings carrying the file name it was stored under
    pub report: Report,
}

/// Cache manager for reading/writing cached reports
pub struct ReportCache {
    cache_dir: PathBuf,
}

impl ReportCache {
    /// Create a report cache using the default XDG cache directory
    pub fn new() -> Result<Self> {
        let cache_dir = Self::default_cache_dir().context("Failed to determine cache directory")?;
        Ok(Self { cache_dir })
    }

    /// Open the cache at `cache_dir`, or the default location when `None`
    pub fn open(cache_dir: Option<&Path>) -> Result<Self> {
        match cache_dir {
            Some(dir) => Ok(Self::with_dir(dir)),
            None => Self::new(),
        }
    }

    /// Create a report cache rooted at `cache_dir`
    pub fn with_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Get the default cache directory (XDG-compatible)
    pub fn default_cache_dir() -> Option<PathBuf> {
        dirs::cache_dir().map(|d| d.join("codesnag").join("reports"))
    }

    /// Get the path to a cache entry file
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.cache_dir.join(format!("{}.json", key.compute_hash()))
    }

    /// Check if a cache entry exists
    pub fn has_entry(&self, key: &CacheKey) -> bool {
        self.entry_path(key).exists()
    }

    /// Retrieve a cached report for `file` (returns None on a miss)
    ///
    /// Identical sources at different paths share an entry, so findings are
    /// re-labelled with `file`.
    pub fn get(&self, key: &CacheKey, file: &str) -> Result<Option<Report>> {
        let entry_path = self.entry_path(key);
        if !entry_path.exists() {
            return Ok(None);
        }

        let entry_json =
            fs::read_to_string(&entry_path).context("Failed to read cache entry")?;
        let entry: CacheEntry =
            serde_json::from_str(&entry_json).context("Failed to parse cache entry")?;

        if entry.key != *key {
            return Ok(None);
        }

        let mut report = entry.report;
        for finding in &mut report.findings {
            finding.file = file.to_string();
        }
        Ok(Some(report))
    }

    /// Cache directory path
    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Store a report in the cache
    pub fn put(&self, key: &CacheKey, report: &Report) -> Result<()> {
        self.put_at(key, report, Utc::now())
    }

    /// Store a report stamped with `created_at`
    pub fn put_at(
        &self,
        key: &CacheKey,
        report: &Report,
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        fs::create_dir_all(&self.cache_dir).with_context(|| {
            format!(
                "Failed to create cache directory: {}",
                self.cache_dir.display()
            )
        })?;

        let entry = CacheEntry {
            key: key.clone(),
            created_at: created_at.to_rfc3339(),
            report: report.clone(),
        };
        let entry_json =
            serde_json::to_string(&entry).context("Failed to serialize cache entry")?;
        fs::write(self.entry_path(key), entry_json).context("Failed to write cache entry")?;

        Ok(())
    }

    /// Summaries of every entry, oldest first
    ///
    /// Files that no longer parse as entries are listed without a timestamp.
    pub fn entries(&self) -> Result<Vec<EntrySummary>> {
        let mut entries = Vec::new();
        if !self.cache_dir.exists() {
            return Ok(entries);
        }

        for entry in walkdir::WalkDir::new(&self.cache_dir).max_depth(1) {
            let entry = entry.context("Failed to walk cache directory")?;
            let path = entry.path();
            let is_entry = entry.file_type().is_file()
                && path.extension().and_then(|s| s.to_str()) == Some("json");
            if !is_entry {
                continue;
            }
            let hash = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            let size_bytes = entry.metadata()?.len();
            let parsed = fs::read_to_string(path)
                .ok()
                .and_then(|json| serde_json::from_str::<CacheEntry>(&json).ok());

            entries.push(match parsed {
                Some(cached) => EntrySummary {
                    hash,
                    created_at: DateTime::parse_from_rfc3339(&cached.created_at)
                        .ok()
                        .map(|t| t.with_timezone(&Utc)),
                    tool_version: Some(cached.key.tool_version),
                    findings: cached.report.findings.len(),
                    size_bytes,
                },
                None => EntrySummary {
                    hash,
                    created_at: None,
                    tool_version: None,
                    findings: 0,
                    size_bytes,
                },
            });
        }

        entries.sort_by(|a, b| (a.created_at, &a.hash).cmp(&(b.created_at, &b.hash)));
        Ok(entries)
    }

    /// Remove entries older than `max_age` at `now`
    ///
    /// Unreadable entries and entries written by another tool version can
    /// never be hit again and are removed as well.
    pub fn prune(&self, max_age: Duration, now: DateTime<Utc>) -> Result<u64> {
        let mut count = 0u64;
        for entry in self.entries()? {
            let stale = match (&entry.tool_version, entry.age(now)) {
                (Some(version), Some(age)) => version != TOOL_VERSION || age > max_age,
                _ => true,
            };
            if stale {
                self.remove(&entry.hash)?;
                count += 1;
            }
        }
        Ok(count)
    }

    /// Clear all cache entries
    pub fn clear(&self) -> Result<u64> {
        let entries = self.entries()?;
        for entry in &entries {
            self.remove(&entry.hash)?;
        }
        Ok(entries.len() as u64)
    }

    fn remove(&self, hash: &str) -> Result<()> {
        let path = self.cache_dir.join(format!("{}.json", hash));
        fs::remove_file(&path)
            .with_context(|| format!("Failed to remove cache entry: {}", path.display()))
    }
}

/// One entry as seen by `codesnag cache list`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrySummary {
    /// Entry hash, also the file stem
    pub hash: String,
    /// Write time, `None` when the entry is unreadable
    pub created_at: Option<DateTime<Utc>>,
    pub tool_version: Option<String>,
    /// Number of findings in the cached report
    pub findings: usize,
    pub size_bytes: u64,
}

impl EntrySummary {
    /// Time since the entry was written
    pub fn age(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.created_at.map(|created| now - created)
    }
}

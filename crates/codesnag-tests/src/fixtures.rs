//! Test fixture utilities: per-rule JavaScript samples and temporary projects.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A buggy/fixed pair of sources for one rule.
#[derive(Debug, Clone, Copy)]
pub struct RuleFixture {
    pub rule_id: &'static str,
    /// Source that must trigger the rule.
    pub buggy: &'static str,
    /// Corrected source that must not trigger it.
    pub fixed: &'static str,
}

macro_rules! fixture {
    ($id:literal) => {
        RuleFixture {
            rule_id: $id,
            buggy: include_str!(concat!("../fixtures/", $id, "/buggy.js")),
            fixed: include_str!(concat!("../fixtures/", $id, "/fixed.js")),
        }
    };
}

/// Returns one fixture pair per catalogue rule.
pub fn catalogue() -> Vec<RuleFixture> {
    vec![
        fixture!("S1481"),
        fixture!("S888"),
        fixture!("S1515"),
        fixture!("S4822"),
        fixture!("S107"),
        fixture!("S1192"),
        fixture!("S2245"),
        fixture!("S109"),
        fixture!("S5852"),
        fixture!("S1186"),
        fixture!("S2068"),
        fixture!("S5696"),
        fixture!("S4043"),
        fixture!("PERF001"),
        fixture!("S138"),
        fixture!("S1067"),
        fixture!("S1763"),
        fixture!("S2189"),
        fixture!("S1143"),
        fixture!("S2077"),
    ]
}

/// Path of the sample project checked in under `fixtures/project`.
pub fn sample_project() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join("project")
}

/// A temporary directory of JavaScript sources.
pub struct ProjectFixture {
    pub root: TempDir,
}

impl ProjectFixture {
    /// Create a new empty project fixture.
    pub fn new() -> Self {
        let root = TempDir::new().expect("Failed to create temp dir");
        Self { root }
    }

    /// Get the project root path.
    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// Add a file, creating parent directories.
    pub fn add_file(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.root.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dir");
        }
        fs::write(&path, content).expect("Failed to write fixture file");
        path
    }
}

impl Default for ProjectFixture {
    fn default() -> Self {
        Self::new()
    }
}

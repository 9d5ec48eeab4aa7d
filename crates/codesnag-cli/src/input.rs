//! Source file discovery.

use anyhow::{bail, Context, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// File extensions analyzed when walking a directory.
pub const SOURCE_EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "jsx"];

/// Directories never descended into.
const SKIPPED_DIRS: &[&str] = &["node_modules", "bower_components", "dist", "build", "coverage"];

fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| SOURCE_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_ref())
}

/// Expands files and directories into a sorted, deduplicated file list.
///
/// Files named explicitly are kept whatever their extension; directories
/// contribute only files with a [`SOURCE_EXTENSIONS`] extension.
pub fn collect_sources(paths: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = BTreeSet::new();

    for raw in paths {
        let path = Path::new(raw);
        if path.is_file() {
            files.insert(path.to_path_buf());
        } else if path.is_dir() {
            let walker = WalkDir::new(path)
                .follow_links(false)
                .into_iter()
                .filter_entry(|e| !is_skipped_dir(e));
            for entry in walker {
                let entry =
                    entry.with_context(|| format!("Failed to walk directory: {}", path.display()))?;
                if entry.file_type().is_file() && is_source_file(entry.path()) {
                    files.insert(entry.into_path());
                }
            }
        } else {
            bail!("Path not found: {}", raw);
        }
    }

    Ok(files.into_iter().collect())
}

/// Display form of a path used as the finding `file`.
pub fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

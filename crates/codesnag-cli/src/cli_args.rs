//! CLI argument definitions for the codesnag command-line interface.
//!
//! All `#[derive(Parser)]` and `#[derive(Subcommand)]` types are defined here,
//! keeping `main.rs` focused on dispatch logic.

use clap::{ArgAction, Parser, Subcommand};
use codesnag_cli::commands::cache::DEFAULT_PRUNE_DAYS;

/// codesnag - Static analysis for JavaScript
#[derive(Parser)]
#[command(name = "codesnag")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub(crate) struct Cli {
    /// Increase log verbosity (-v info, -vv debug); CODESNAG_LOG takes precedence
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Report cache directory (default: the platform cache dir)
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Analyze JavaScript files and report bugs, vulnerabilities and code smells
    Lint {
        /// Files or directories to analyze (directories are walked for .js/.mjs/.cjs/.jsx)
        #[arg(required = true)]
        paths: Vec<String>,

        /// Configuration file (JSON or YAML)
        #[arg(short, long)]
        config: Option<String>,

        /// Rule IDs to disable (can be repeated)
        #[arg(long = "disable", value_name = "ID")]
        disable_rules: Vec<String>,

        /// Only run these rules (comma-separated)
        #[arg(long = "only", value_name = "IDS")]
        only_rules: Option<String>,

        /// Output format (text or json)
        #[arg(long, default_value = "text", value_parser = ["text", "json"])]
        format: String,

        /// Fail on any finding, not just bugs and vulnerabilities
        #[arg(long)]
        strict: bool,

        /// Do not read or write the report cache
        #[arg(long)]
        no_cache: bool,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// List the rule catalogue
    Rules {
        /// Output machine-readable JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage the report cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
}

#[derive(Subcommand)]
pub(crate) enum CacheCommands {
    /// List cached reports with their age
    List,
    /// Remove reports older than a number of days
    Prune {
        /// Maximum age in days
        #[arg(long, value_name = "DAYS", default_value_t = DEFAULT_PRUNE_DAYS)]
        older_than: u64,
    },
    /// Remove every cached report
    Clear,
}

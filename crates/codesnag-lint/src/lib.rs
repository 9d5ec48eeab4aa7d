//! Rule engine for codesnag.
//!
//! Runs a catalogue of independent rules over a parsed JavaScript unit and
//! collects their findings into a deterministic, deduplicated report.
//!
//! # Example
//!
//! ```no_run
//! use codesnag_lint::{analyze_source, Configuration, RuleRegistry};
//!
//! let registry = RuleRegistry::with_default_rules();
//! let config = Configuration::default().disable("S109");
//! let report = analyze_source("app.js", "let unused = 1;\n", &registry, &config).unwrap();
//!
//! for finding in &report.findings {
//!     eprintln!("{}:{} {} {}", finding.file, finding.span, finding.rule_id, finding.message);
//! }
//! ```
//!
//! # Modules
//!
//! - [`rules`]: The [`Rule`] trait and the built-in catalogue
//! - [`registry`]: Rule lookup and enablement
//! - [`config`]: Thresholds and enabled/disabled rule sets
//! - [`engine`]: Concurrent execution with per-rule time budgets
//! - [`aggregate`]: Deduplication, ordering and counting
//! - [`report`]: Finding and report types
//! - [`error`]: Error types with stable codes

pub mod aggregate;
pub mod config;
pub mod engine;
pub mod error;
pub mod registry;
pub mod report;
pub mod rules;

pub use aggregate::aggregate;
pub use config::{Configuration, Thresholds};
pub use engine::{analyze_source, AnalysisEngine};
pub use error::{AnalysisError, ConfigurationError, RegistryError, RuleFailure};
pub use registry::{RuleMetadata, RuleRegistry};
pub use report::{Finding, FindingStatus, Report, SecondaryLocation, Severity, Summary};
pub use rules::{CancelToken, Rule, RuleContext};

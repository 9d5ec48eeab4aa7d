//! codesnag End-to-End Test Infrastructure
//!
//! This crate provides integration tests across the workspace:
//!
//! - **Catalogue**: every rule fires on its buggy fixture and not on its fixed one
//! - **Determinism**: identical input produces byte-identical reports
//! - **Engine limits**: timeouts and faults become synthetic findings
//! - **Configuration**: validation errors and rule enablement
//! - **CLI**: directory walking, caching and rendering
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p codesnag-tests
//! ```

pub mod fixtures;
pub mod harness;

// Re-export commonly used items
pub use fixtures::{catalogue, ProjectFixture, RuleFixture};
pub use harness::{analyze, analyze_all, analyze_with, report_hash, rule_ids};

//! CLI command implementations

pub mod cache;
pub mod lint;
pub mod rules;

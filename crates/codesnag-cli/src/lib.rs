//! codesnag CLI library.
//!
//! Source discovery, configuration file loading, the report cache and the
//! command implementations behind the `codesnag` binary.

pub mod cache;
pub mod commands;
pub mod config;
pub mod input;

//! codesnag Source Model
//!
//! This crate turns JavaScript source text into the normalized model every
//! codesnag rule reads: an arena of syntax [`Node`]s addressed by [`NodeId`],
//! plus the lexical [`Scope`]/[`Binding`] graph resolved over it.
//!
//! # Example
//!
//! ```
//! use codesnag_model::{NodeKind, SourceModel};
//!
//! let model = SourceModel::parse("app.js", "const x = 1;\nconsole.log(x);\n").unwrap();
//!
//! let binding = model.bindings().find(|(_, b)| b.name == "x").unwrap().1;
//! assert_eq!(binding.references.len(), 1);
//! assert_eq!(model.nodes_of_kind(NodeKind::VariableDecl).count(), 1);
//! ```
//!
//! # Modules
//!
//! - [`error`]: Parse error type with stable codes
//! - [`span`]: Source locations
//! - [`node`]: Node kinds, roles and attributes
//! - [`scope`]: Scopes, bindings and resolution results
//! - [`model`]: The [`SourceModel`] arena and its queries
//! - [`parser`]: tree-sitter frontend that builds the model

pub mod error;
pub mod model;
pub mod node;
pub mod parser;
pub mod scope;
pub mod span;

pub use error::ParseError;
pub use model::{Ancestors, Descendants, SourceModel};
pub use node::{Attr, DeclarationKind, FunctionForm, LiteralKind, Node, NodeId, NodeKind, Role};
pub use scope::{
    Access, Binding, BindingId, BindingKind, Reference, Resolution, Scope, ScopeId, ScopeKind,
};
pub use span::Span;

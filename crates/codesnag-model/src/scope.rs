//! Lexical scopes and bindings.
//!
//! Scopes and bindings live in arenas next to the node arena. A scope's
//! parent link and a binding's reference list are plain indices, so the graph
//! has no ownership cycles.

use crate::node::{DeclarationKind, NodeId};
use std::collections::BTreeMap;

/// Index of a scope inside its model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub(crate) u32);

impl ScopeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a binding inside its model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(pub(crate) u32);

impl BindingId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// What introduced a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Program,
    Function,
    Block,
    /// Header of a `for`/`for-in` loop.
    Loop,
    Catch,
}

impl ScopeKind {
    /// `var` declarations and hoisted functions land in these scopes.
    pub fn is_function_like(&self) -> bool {
        matches!(self, ScopeKind::Program | ScopeKind::Function)
    }
}

/// A lexical binding region.
#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    /// Node that introduces the scope.
    pub node: NodeId,
    pub parent: Option<ScopeId>,
    /// Names declared directly in this scope.
    pub bindings: BTreeMap<String, BindingId>,
}

/// How a binding was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    Variable,
    Parameter,
    Function,
    Class,
    Import,
    CatchParameter,
}

impl BindingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BindingKind::Variable => "variable",
            BindingKind::Parameter => "parameter",
            BindingKind::Function => "function",
            BindingKind::Class => "class",
            BindingKind::Import => "import",
            BindingKind::CatchParameter => "catch parameter",
        }
    }
}

/// How a reference touches its binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    Read,
    Write,
    /// Compound assignment and `++`/`--`.
    ReadWrite,
}

/// One use site of a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    pub node: NodeId,
    pub access: Access,
}

/// One declared identifier and everything that refers to it.
#[derive(Debug, Clone)]
pub struct Binding {
    pub name: String,
    pub kind: BindingKind,
    /// The declaring identifier node.
    pub declaration: NodeId,
    /// The declaring construct (declarator, function, parameter list, ...).
    pub declarator: NodeId,
    /// Initializer expression when the declarator binds the name directly.
    pub init: Option<NodeId>,
    pub keyword: Option<DeclarationKind>,
    pub scope: ScopeId,
    pub references: Vec<Reference>,
    pub mutable: bool,
    pub exported: bool,
}

impl Binding {
    /// Returns true if any reference reads the value.
    pub fn is_read(&self) -> bool {
        self.references
            .iter()
            .any(|r| matches!(r.access, Access::Read | Access::ReadWrite))
    }
}

/// Outcome of resolving a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Binding(BindingId),
    /// No declaration in the scope chain (globals, typos, host objects).
    Unresolved,
}

impl Resolution {
    pub fn binding(self) -> Option<BindingId> {
        match self {
            Resolution::Binding(id) => Some(id),
            Resolution::Unresolved => None,
        }
    }
}

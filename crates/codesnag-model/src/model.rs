//! The source model arena and its read-only queries.

use crate::error::ParseError;
use crate::node::{Node, NodeId, NodeKind, Role};
use crate::parser;
use crate::scope::{Binding, BindingId, Resolution, Scope, ScopeId};
use std::collections::HashMap;

/// Normalized syntax tree of one compilation unit plus its resolved scopes.
///
/// Built once per analyzed file and shared read-only by every rule.
#[derive(Debug, Clone)]
pub struct SourceModel {
    file: String,
    source: String,
    content_hash: String,
    nodes: Vec<Node>,
    scopes: Vec<Scope>,
    bindings: Vec<Binding>,
    /// Scope introduced by a node.
    node_scopes: HashMap<NodeId, ScopeId>,
    /// Declaring identifier -> binding.
    declarations: HashMap<NodeId, BindingId>,
    /// Referencing identifier -> resolution.
    references: HashMap<NodeId, Resolution>,
}

/// Scope and binding tables produced by the resolver.
pub(crate) struct ScopeTables {
    pub scopes: Vec<Scope>,
    pub bindings: Vec<Binding>,
    pub node_scopes: HashMap<NodeId, ScopeId>,
    pub declarations: HashMap<NodeId, BindingId>,
    pub references: HashMap<NodeId, Resolution>,
}

impl SourceModel {
    /// Parses JavaScript source into a model.
    pub fn parse(file: impl Into<String>, source: impl Into<String>) -> Result<Self, ParseError> {
        parser::parse(file.into(), source.into())
    }

    pub(crate) fn from_parts(
        file: String,
        source: String,
        nodes: Vec<Node>,
        tables: ScopeTables,
    ) -> Self {
        let content_hash = blake3::hash(source.as_bytes()).to_hex().to_string();
        Self {
            file,
            source,
            content_hash,
            nodes,
            scopes: tables.scopes,
            bindings: tables.bindings,
            node_scopes: tables.node_scopes,
            declarations: tables.declarations,
            references: tables.references,
        }
    }

    /// Path or label of the analyzed unit.
    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// BLAKE3 hex digest of the source text.
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// All nodes in pre-order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeId(i as u32), n))
    }

    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes()
            .filter(move |(_, n)| n.kind == kind)
            .map(|(id, _)| id)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.node(id).children.iter().copied()
    }

    /// Children that are not comments.
    pub fn code_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .filter(move |c| self.node(*c).kind != NodeKind::Comment)
    }

    /// First child playing `role`.
    pub fn child_by_role(&self, id: NodeId, role: Role) -> Option<NodeId> {
        self.children(id).find(|c| self.node(*c).role == Some(role))
    }

    pub fn children_by_role(&self, id: NodeId, role: Role) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .filter(move |c| self.node(*c).role == Some(role))
    }

    /// Pre-order walk below `id`, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let mut stack: Vec<NodeId> = self.node(id).children.clone();
        stack.reverse();
        Descendants { model: self, stack }
    }

    /// Walk from the parent of `id` up to the root.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            model: self,
            next: self.parent(id),
        }
    }

    /// Returns true if `id` is `ancestor` or lies below it.
    pub fn is_within(&self, id: NodeId, ancestor: NodeId) -> bool {
        id == ancestor || self.ancestors(id).any(|a| a == ancestor)
    }

    /// Source text covered by a node.
    pub fn text(&self, id: NodeId) -> &str {
        let span = self.node(id).span;
        self.source.get(span.start..span.end).unwrap_or("")
    }

    /// Nearest enclosing function, not counting `id` itself.
    pub fn enclosing_function(&self, id: NodeId) -> Option<NodeId> {
        self.ancestors(id)
            .find(|a| self.node(*a).kind == NodeKind::FunctionDecl)
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub fn scopes(&self) -> impl Iterator<Item = (ScopeId, &Scope)> {
        self.scopes
            .iter()
            .enumerate()
            .map(|(i, s)| (ScopeId(i as u32), s))
    }

    /// Scope introduced by `id`, if it introduces one.
    pub fn scope_introduced_by(&self, id: NodeId) -> Option<ScopeId> {
        self.node_scopes.get(&id).copied()
    }

    /// Innermost scope containing `id` (including one `id` introduces).
    pub fn scope_of(&self, id: NodeId) -> ScopeId {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find_map(|n| self.node_scopes.get(&n).copied())
            .unwrap_or(ScopeId(0))
    }

    /// Looks `name` up from `scope` outward; the innermost declaration wins.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<BindingId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = self.scope(id);
            if let Some(binding) = scope.bindings.get(name) {
                return Some(*binding);
            }
            current = scope.parent;
        }
        None
    }

    pub fn binding(&self, id: BindingId) -> &Binding {
        &self.bindings[id.index()]
    }

    /// All bindings in declaration order.
    pub fn bindings(&self) -> impl Iterator<Item = (BindingId, &Binding)> {
        self.bindings
            .iter()
            .enumerate()
            .map(|(i, b)| (BindingId(i as u32), b))
    }

    /// Resolves a referencing identifier.
    ///
    /// Declaring identifiers and non-identifiers resolve to `Unresolved`; use
    /// [`SourceModel::binding_of`] to accept both sides.
    pub fn resolve(&self, id: NodeId) -> Resolution {
        self.references
            .get(&id)
            .copied()
            .unwrap_or(Resolution::Unresolved)
    }

    /// Returns true if `id` is an identifier in reference position.
    pub fn is_reference(&self, id: NodeId) -> bool {
        self.references.contains_key(&id)
    }

    /// Binding declared by `id`, if `id` is a declaring identifier.
    pub fn declared_binding(&self, id: NodeId) -> Option<BindingId> {
        self.declarations.get(&id).copied()
    }

    /// Binding an identifier declares or refers to.
    pub fn binding_of(&self, id: NodeId) -> Option<BindingId> {
        self.declared_binding(id).or_else(|| self.resolve(id).binding())
    }
}

/// Iterator returned by [`SourceModel::descendants`].
pub struct Descendants<'a> {
    model: &'a SourceModel,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.model.node(id).children.iter().rev().copied());
        Some(id)
    }
}

/// Iterator returned by [`SourceModel::ancestors`].
pub struct Ancestors<'a> {
    model: &'a SourceModel,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.next?;
        self.next = self.model.parent(id);
        Some(id)
    }
}

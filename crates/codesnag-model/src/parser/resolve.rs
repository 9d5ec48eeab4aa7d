//! Scope construction and identifier resolution.
//!
//! Runs over the lowered arena, which is in pre-order, so every parent is
//! visited before its children. Declarations are collected for the whole
//! unit before any reference is resolved; hoisted names therefore resolve no
//! matter where they appear.

use crate::model::ScopeTables;
use crate::node::{Attr, DeclarationKind, FunctionForm, Node, NodeId, NodeKind, Role};
use crate::scope::{
    Access, Binding, BindingId, BindingKind, Reference, Resolution, Scope, ScopeId, ScopeKind,
};
use std::collections::{BTreeMap, HashMap};

pub(crate) fn resolve(nodes: &[Node]) -> ScopeTables {
    let mut resolver = Resolver {
        nodes,
        enclosing: Vec::with_capacity(nodes.len()),
        scopes: Vec::new(),
        bindings: Vec::new(),
        node_scopes: HashMap::new(),
        declarations: HashMap::new(),
        references: HashMap::new(),
    };
    resolver.build_scopes();
    resolver.declare_all();
    resolver.resolve_references();

    ScopeTables {
        scopes: resolver.scopes,
        bindings: resolver.bindings,
        node_scopes: resolver.node_scopes,
        declarations: resolver.declarations,
        references: resolver.references,
    }
}

struct Resolver<'a> {
    nodes: &'a [Node],
    /// Scope in effect at each node, including a scope the node introduces.
    enclosing: Vec<ScopeId>,
    scopes: Vec<Scope>,
    bindings: Vec<Binding>,
    node_scopes: HashMap<NodeId, ScopeId>,
    declarations: HashMap<NodeId, BindingId>,
    references: HashMap<NodeId, Resolution>,
}

/// Everything needed to create a binding besides its name and scope.
struct Declaration {
    kind: BindingKind,
    declarator: NodeId,
    init: Option<NodeId>,
    keyword: Option<DeclarationKind>,
    exported: bool,
}

impl<'a> Resolver<'a> {
    fn node(&self, id: NodeId) -> &'a Node {
        &self.nodes[id.index()]
    }

    fn child_by_role(&self, id: NodeId, role: Role) -> Option<NodeId> {
        self.node(id)
            .children
            .iter()
            .copied()
            .find(|c| self.node(*c).role == Some(role))
    }

    fn raw_kind(&self, id: NodeId) -> Option<&'a str> {
        self.node(id).attr(Attr::Raw)
    }

    fn scope_kind_for(&self, id: NodeId) -> Option<ScopeKind> {
        let node = self.node(id);
        let parent_kind = node.parent.map(|p| self.node(p).kind);
        match node.kind {
            NodeKind::Program => Some(ScopeKind::Program),
            NodeKind::FunctionDecl => Some(ScopeKind::Function),
            NodeKind::ForLoop | NodeKind::ForInLoop => Some(ScopeKind::Loop),
            NodeKind::CatchClause => Some(ScopeKind::Catch),
            NodeKind::SwitchStmt => Some(ScopeKind::Block),
            // function and catch bodies share the scope of their owner
            NodeKind::Block => match parent_kind {
                Some(NodeKind::FunctionDecl) | Some(NodeKind::CatchClause) => None,
                _ => Some(ScopeKind::Block),
            },
            _ => None,
        }
    }

    fn build_scopes(&mut self) {
        for index in 0..self.nodes.len() {
            let id = NodeId(index as u32);
            let outer = self.node(id).parent.map(|p| self.enclosing[p.index()]);
            let scope = match self.scope_kind_for(id) {
                Some(kind) => {
                    let scope = ScopeId(self.scopes.len() as u32);
                    self.scopes.push(Scope {
                        kind,
                        node: id,
                        parent: outer,
                        bindings: BTreeMap::new(),
                    });
                    self.node_scopes.insert(id, scope);
                    scope
                }
                None => outer.unwrap_or(ScopeId(0)),
            };
            self.enclosing.push(scope);
        }
    }

    /// Nearest function or program scope at or above `scope`.
    fn hoisting_scope(&self, scope: ScopeId) -> ScopeId {
        let mut current = scope;
        loop {
            let s = &self.scopes[current.index()];
            if s.kind.is_function_like() {
                return current;
            }
            match s.parent {
                Some(parent) => current = parent,
                None => return current,
            }
        }
    }

    fn outer_scope(&self, id: NodeId) -> ScopeId {
        self.node(id)
            .parent
            .map(|p| self.enclosing[p.index()])
            .unwrap_or(ScopeId(0))
    }

    fn is_exported(&self, statement: NodeId) -> bool {
        self.node(statement)
            .parent
            .map(|p| self.node(p).kind == NodeKind::ExportDecl)
            .unwrap_or(false)
    }

    /// Identifiers bound by a declaration pattern.
    fn pattern_identifiers(&self, id: NodeId, out: &mut Vec<NodeId>) {
        let node = self.node(id);
        match node.kind {
            NodeKind::Identifier => out.push(id),
            NodeKind::Pattern => {
                for child in &node.children {
                    self.pattern_identifiers(*child, out);
                }
            }
            NodeKind::Property => {
                if let Some(value) = self.child_by_role(id, Role::Value) {
                    self.pattern_identifiers(value, out);
                }
            }
            NodeKind::AssignPattern => {
                if let Some(left) = self.child_by_role(id, Role::Left) {
                    self.pattern_identifiers(left, out);
                }
            }
            _ => {}
        }
    }

    fn declare(&mut self, scope: ScopeId, ident: NodeId, decl: &Declaration) {
        let name = match self.node(ident).name() {
            Some(name) => name.to_string(),
            None => return,
        };
        if let Some(existing) = self.scopes[scope.index()].bindings.get(&name).copied() {
            // redeclaration (`var x` twice, parameter shadowed by `var`)
            self.declarations.insert(ident, existing);
            if decl.exported {
                self.bindings[existing.index()].exported = true;
            }
            return;
        }

        let binding = BindingId(self.bindings.len() as u32);
        let mutable = !matches!(decl.keyword, Some(DeclarationKind::Const))
            && decl.kind != BindingKind::Import;
        self.bindings.push(Binding {
            name: name.clone(),
            kind: decl.kind,
            declaration: ident,
            declarator: decl.declarator,
            init: decl.init,
            keyword: decl.keyword,
            scope,
            references: Vec::new(),
            mutable,
            exported: decl.exported,
        });
        self.scopes[scope.index()].bindings.insert(name, binding);
        self.declarations.insert(ident, binding);
    }

    fn declare_pattern(&mut self, scope: ScopeId, pattern: NodeId, decl: &Declaration) {
        let mut idents = Vec::new();
        self.pattern_identifiers(pattern, &mut idents);
        for ident in idents {
            self.declare(scope, ident, decl);
        }
    }

    fn declare_all(&mut self) {
        for index in 0..self.nodes.len() {
            let id = NodeId(index as u32);
            match self.node(id).kind {
                NodeKind::FunctionDecl => self.declare_function(id),
                NodeKind::ClassDecl => {
                    if let Some(name) = self.child_by_role(id, Role::Name) {
                        let decl = Declaration {
                            kind: BindingKind::Class,
                            declarator: id,
                            init: None,
                            keyword: None,
                            exported: self.is_exported(id),
                        };
                        self.declare(self.outer_scope(id), name, &decl);
                    }
                }
                NodeKind::VariableDecl => self.declare_variables(id),
                NodeKind::ForInLoop => {
                    let keyword = self.node(id).declaration_kind();
                    if let (Some(keyword), Some(left)) = (keyword, self.child_by_role(id, Role::Left))
                    {
                        let scope = match keyword {
                            DeclarationKind::Var => self.hoisting_scope(self.enclosing[index]),
                            _ => self.enclosing[index],
                        };
                        let decl = Declaration {
                            kind: BindingKind::Variable,
                            declarator: id,
                            init: None,
                            keyword: Some(keyword),
                            exported: false,
                        };
                        self.declare_pattern(scope, left, &decl);
                    }
                }
                NodeKind::CatchClause => {
                    if let Some(param) = self.child_by_role(id, Role::Parameters) {
                        let decl = Declaration {
                            kind: BindingKind::CatchParameter,
                            declarator: id,
                            init: None,
                            keyword: None,
                            exported: false,
                        };
                        self.declare_pattern(self.enclosing[index], param, &decl);
                    }
                }
                NodeKind::Identifier => self.declare_import(id),
                _ => {}
            }
        }
    }

    fn declare_function(&mut self, id: NodeId) {
        let form = self.node(id).function_form();
        if let Some(name) = self.child_by_role(id, Role::Name) {
            if self.node(name).kind == NodeKind::Identifier {
                // a named function expression is only visible inside itself
                let scope = match form {
                    Some(FunctionForm::Declaration) => self.outer_scope(id),
                    _ => self.enclosing[id.index()],
                };
                let decl = Declaration {
                    kind: BindingKind::Function,
                    declarator: id,
                    init: None,
                    keyword: None,
                    exported: self.is_exported(id),
                };
                self.declare(scope, name, &decl);
            }
        }

        if let Some(params) = self.child_by_role(id, Role::Parameters) {
            let scope = self.enclosing[id.index()];
            let children = self.node(params).children.clone();
            for param in children {
                let decl = Declaration {
                    kind: BindingKind::Parameter,
                    declarator: param,
                    init: None,
                    keyword: None,
                    exported: false,
                };
                self.declare_pattern(scope, param, &decl);
            }
        }
    }

    fn declare_variables(&mut self, id: NodeId) {
        let keyword = self.node(id).declaration_kind();
        let scope = match keyword {
            Some(DeclarationKind::Var) => self.hoisting_scope(self.enclosing[id.index()]),
            _ => self.enclosing[id.index()],
        };
        let exported = self.is_exported(id);
        let declarators: Vec<NodeId> = self
            .node(id)
            .children
            .iter()
            .copied()
            .filter(|c| self.node(*c).kind == NodeKind::Declarator)
            .collect();

        for declarator in declarators {
            let Some(name) = self.child_by_role(declarator, Role::Name) else {
                continue;
            };
            let init = if self.node(name).kind == NodeKind::Identifier {
                self.child_by_role(declarator, Role::Value)
            } else {
                None
            };
            let decl = Declaration {
                kind: BindingKind::Variable,
                declarator,
                init,
                keyword,
                exported,
            };
            self.declare_pattern(scope, name, &decl);
        }
    }

    /// Declares identifiers introduced by `import` clauses.
    fn declare_import(&mut self, id: NodeId) {
        let Some(parent) = self.node(id).parent else {
            return;
        };
        let declares = match self.raw_kind(parent) {
            Some("import_specifier") => match self.child_by_role(parent, Role::Alias) {
                Some(alias) => alias == id,
                None => true,
            },
            Some("namespace_import") | Some("import_clause") => true,
            _ => false,
        };
        if !declares {
            return;
        }
        let Some(import) = std::iter::successors(Some(parent), |p| self.node(*p).parent)
            .find(|p| self.node(*p).kind == NodeKind::ImportDecl)
        else {
            return;
        };
        let decl = Declaration {
            kind: BindingKind::Import,
            declarator: import,
            init: None,
            keyword: None,
            exported: false,
        };
        self.declare(self.enclosing[id.index()], id, &decl);
    }

    /// Classifies how an identifier in reference position is used.
    fn access_of(&self, id: NodeId) -> Access {
        let mut child = id;
        while let Some(parent) = self.node(child).parent {
            let parent_node = self.node(parent);
            match parent_node.kind {
                NodeKind::Pattern => child = parent,
                NodeKind::Property => {
                    let in_pattern = parent_node
                        .parent
                        .map(|gp| self.node(gp).kind == NodeKind::Pattern)
                        .unwrap_or(false);
                    if !in_pattern {
                        return Access::Read;
                    }
                    child = parent;
                }
                NodeKind::AssignPattern if self.node(child).role == Some(Role::Left) => {
                    child = parent
                }
                NodeKind::AssignExpr if self.node(child).role == Some(Role::Left) => {
                    return if parent_node.operator() == Some("=") {
                        Access::Write
                    } else {
                        Access::ReadWrite
                    };
                }
                NodeKind::UpdateExpr => return Access::ReadWrite,
                NodeKind::ForInLoop if self.node(child).role == Some(Role::Left) => {
                    return Access::Write
                }
                _ => return Access::Read,
            }
        }
        Access::Read
    }

    fn resolve_references(&mut self) {
        for index in 0..self.nodes.len() {
            let id = NodeId(index as u32);
            let node = self.node(id);
            if node.kind != NodeKind::Identifier || self.declarations.contains_key(&id) {
                continue;
            }
            let parent = node.parent;
            let parent_raw = parent.and_then(|p| self.raw_kind(p));
            if parent_raw == Some("import_specifier") {
                // remote name of `import { a as b }`
                continue;
            }
            if parent_raw == Some("export_specifier") && node.role == Some(Role::Alias) {
                continue;
            }
            let exports = parent_raw == Some("export_specifier")
                || parent.map(|p| self.node(p).kind) == Some(NodeKind::ExportDecl);

            let Some(name) = node.name() else {
                continue;
            };
            let resolution = match self.lookup(self.enclosing[index], name) {
                Some(binding) => {
                    let access = self.access_of(id);
                    let b = &mut self.bindings[binding.index()];
                    b.references.push(Reference { node: id, access });
                    if exports {
                        b.exported = true;
                    }
                    Resolution::Binding(binding)
                }
                None => Resolution::Unresolved,
            };
            self.references.insert(id, resolution);
        }
    }

    fn lookup(&self, scope: ScopeId, name: &str) -> Option<BindingId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = &self.scopes[id.index()];
            if let Some(binding) = scope.bindings.get(name) {
                return Some(*binding);
            }
            current = scope.parent;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use crate::model::SourceModel;
    use crate::node::NodeKind;
    use crate::scope::{Access, BindingKind, Resolution, ScopeKind};
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> SourceModel {
        SourceModel::parse("test.js", source).unwrap()
    }

    fn binding<'a>(model: &'a SourceModel, name: &str) -> &'a crate::scope::Binding {
        model
            .bindings()
            .find(|(_, b)| b.name == name)
            .map(|(_, b)| b)
            .unwrap_or_else(|| panic!("no binding named {name}"))
    }

    #[test]
    fn test_unused_and_used_variables() {
        let model = parse(
            "function f() {\n  const unusedVar = 'a';\n  const usedVar = 'b';\n  console.log(usedVar);\n}\n",
        );
        assert!(binding(&model, "unusedVar").references.is_empty());
        assert_eq!(binding(&model, "usedVar").references.len(), 1);
        let console = model
            .nodes_of_kind(NodeKind::Identifier)
            .find(|id| model.node(*id).name() == Some("console"))
            .unwrap();
        assert_eq!(model.resolve(console), Resolution::Unresolved);
    }

    #[test]
    fn test_hoisted_function_resolves() {
        let model = parse("run();\nfunction run() {}\n");
        let run = binding(&model, "run");
        assert_eq!(run.kind, BindingKind::Function);
        assert_eq!(run.references.len(), 1);
    }

    #[test]
    fn test_innermost_scope_wins() {
        let model = parse("const x = 1;\n{\n  const x = 2;\n  use(x);\n}\nuse(x);\n");
        let xs: Vec<_> = model.bindings().filter(|(_, b)| b.name == "x").collect();
        assert_eq!(xs.len(), 2);
        assert_eq!(xs[0].1.references.len(), 1);
        assert_eq!(xs[1].1.references.len(), 1);
        assert_eq!(model.scope(xs[1].1.scope).kind, ScopeKind::Block);
    }

    #[test]
    fn test_var_hoists_to_function_scope() {
        let model = parse("function f() {\n  if (a) { var v = 1; }\n  return v;\n}\n");
        let v = binding(&model, "v");
        assert_eq!(model.scope(v.scope).kind, ScopeKind::Function);
        assert_eq!(v.references.len(), 1);
    }

    #[test]
    fn test_loop_variable_scoped_to_loop() {
        let model = parse("for (let i = 0; i < 3; i++) { log(i); }\n");
        let i = binding(&model, "i");
        assert_eq!(model.scope(i.scope).kind, ScopeKind::Loop);
        let accesses: Vec<Access> = i.references.iter().map(|r| r.access).collect();
        assert_eq!(accesses, vec![Access::Read, Access::ReadWrite, Access::Read]);
    }

    #[test]
    fn test_parameters_and_destructuring() {
        let model = parse(
            "function g(a, { b, c: d }, [e], f = 1, ...rest) {\n  return a + b + d + e + f + rest;\n}\n",
        );
        for name in ["a", "b", "d", "e", "f", "rest"] {
            let b = binding(&model, name);
            assert_eq!(b.kind, BindingKind::Parameter, "{name}");
            assert_eq!(b.references.len(), 1, "{name}");
        }
        assert!(model.bindings().all(|(_, b)| b.name != "c"));
    }

    #[test]
    fn test_write_access_and_const_mutability() {
        let model = parse("let total = 0;\ntotal = 5;\ntotal += 1;\nconst k = 2;\n");
        let total = binding(&model, "total");
        let accesses: Vec<Access> = total.references.iter().map(|r| r.access).collect();
        assert_eq!(accesses, vec![Access::Write, Access::ReadWrite]);
        assert!(total.mutable);
        assert!(!binding(&model, "k").mutable);
        assert!(total.is_read());
    }

    #[test]
    fn test_imports_and_exports() {
        let model = parse(
            "import fs from 'fs';\nimport { join as j, dirname } from 'path';\nexport const answer = 42;\nconst hidden = 1;\nexport { hidden };\n",
        );
        assert_eq!(binding(&model, "fs").kind, BindingKind::Import);
        assert_eq!(binding(&model, "j").kind, BindingKind::Import);
        assert_eq!(binding(&model, "dirname").kind, BindingKind::Import);
        assert!(model.bindings().all(|(_, b)| b.name != "join"));
        assert!(binding(&model, "answer").exported);
        assert!(binding(&model, "hidden").exported);
        assert!(!binding(&model, "fs").exported);
    }

    #[test]
    fn test_initializer_recorded_for_simple_declarators() {
        let model = parse("const p = fetch('/x');\nconst { q } = obj;\n");
        let p = binding(&model, "p");
        let init = p.init.unwrap();
        assert_eq!(model.node(init).kind, NodeKind::CallExpr);
        assert!(binding(&model, "q").init.is_none());
    }

    #[test]
    fn test_catch_parameter() {
        let model = parse("try { go(); } catch (err) { report(err); }\n");
        let err = binding(&model, "err");
        assert_eq!(err.kind, BindingKind::CatchParameter);
        assert_eq!(err.references.len(), 1);
    }
}

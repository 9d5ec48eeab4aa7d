//! Syntax nodes.
//!
//! Nodes are stored in the [`SourceModel`](crate::SourceModel) arena and refer
//! to each other by [`NodeId`]. Each node records the [`Role`] it plays in its
//! parent (the callee of a call, the body of a loop, ...) so rules can ask
//! structural questions without knowing child positions.

use crate::span::Span;
use std::collections::BTreeMap;
use std::fmt;

/// Stable index of a node inside its model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Position of the node in the arena (pre-order).
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Kind of syntactic construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    Program,
    /// Any function form: declaration, expression, arrow or method.
    FunctionDecl,
    ClassDecl,
    ParameterList,
    Block,
    /// `const`/`let`/`var` statement holding one or more declarators.
    VariableDecl,
    Declarator,
    /// A name that declares or references a binding.
    Identifier,
    /// A name that is never resolved: member properties, keys, labels.
    PropertyName,
    ForLoop,
    /// `for ... in` and `for ... of`.
    ForInLoop,
    WhileLoop,
    DoWhileLoop,
    IfStmt,
    SwitchStmt,
    SwitchCase,
    ReturnStmt,
    ThrowStmt,
    BreakStmt,
    ContinueStmt,
    TryBlock,
    CatchClause,
    FinallyClause,
    ExpressionStmt,
    CallExpr,
    NewExpr,
    Arguments,
    MemberExpr,
    SubscriptExpr,
    /// Plain and compound assignment (`=`, `+=`, ...).
    AssignExpr,
    BinaryExpr,
    /// `&&`, `||` and `??`.
    LogicalExpr,
    UnaryExpr,
    UpdateExpr,
    TernaryExpr,
    AwaitExpr,
    ArrayExpr,
    ObjectExpr,
    /// Key/value pair in an object literal or object pattern.
    Property,
    /// Object, array or rest destructuring pattern.
    Pattern,
    /// Pattern with a default value (`a = 1`).
    AssignPattern,
    SpreadElement,
    Literal,
    /// Template string with at least one substitution.
    TemplateString,
    SequenceExpr,
    ImportDecl,
    ExportDecl,
    Comment,
    Other,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Program => "Program",
            NodeKind::FunctionDecl => "FunctionDecl",
            NodeKind::ClassDecl => "ClassDecl",
            NodeKind::ParameterList => "ParameterList",
            NodeKind::Block => "Block",
            NodeKind::VariableDecl => "VariableDecl",
            NodeKind::Declarator => "Declarator",
            NodeKind::Identifier => "Identifier",
            NodeKind::PropertyName => "PropertyName",
            NodeKind::ForLoop => "ForLoop",
            NodeKind::ForInLoop => "ForInLoop",
            NodeKind::WhileLoop => "WhileLoop",
            NodeKind::DoWhileLoop => "DoWhileLoop",
            NodeKind::IfStmt => "IfStmt",
            NodeKind::SwitchStmt => "SwitchStmt",
            NodeKind::SwitchCase => "SwitchCase",
            NodeKind::ReturnStmt => "ReturnStmt",
            NodeKind::ThrowStmt => "ThrowStmt",
            NodeKind::BreakStmt => "BreakStmt",
            NodeKind::ContinueStmt => "ContinueStmt",
            NodeKind::TryBlock => "TryBlock",
            NodeKind::CatchClause => "CatchClause",
            NodeKind::FinallyClause => "FinallyClause",
            NodeKind::ExpressionStmt => "ExpressionStmt",
            NodeKind::CallExpr => "CallExpr",
            NodeKind::NewExpr => "NewExpr",
            NodeKind::Arguments => "Arguments",
            NodeKind::MemberExpr => "MemberExpr",
            NodeKind::SubscriptExpr => "SubscriptExpr",
            NodeKind::AssignExpr => "AssignExpr",
            NodeKind::BinaryExpr => "BinaryExpr",
            NodeKind::LogicalExpr => "LogicalExpr",
            NodeKind::UnaryExpr => "UnaryExpr",
            NodeKind::UpdateExpr => "UpdateExpr",
            NodeKind::TernaryExpr => "TernaryExpr",
            NodeKind::AwaitExpr => "AwaitExpr",
            NodeKind::ArrayExpr => "ArrayExpr",
            NodeKind::ObjectExpr => "ObjectExpr",
            NodeKind::Property => "Property",
            NodeKind::Pattern => "Pattern",
            NodeKind::AssignPattern => "AssignPattern",
            NodeKind::SpreadElement => "SpreadElement",
            NodeKind::Literal => "Literal",
            NodeKind::TemplateString => "TemplateString",
            NodeKind::SequenceExpr => "SequenceExpr",
            NodeKind::ImportDecl => "ImportDecl",
            NodeKind::ExportDecl => "ExportDecl",
            NodeKind::Comment => "Comment",
            NodeKind::Other => "Other",
        }
    }

    /// Returns true for every loop statement.
    pub fn is_loop(&self) -> bool {
        matches!(
            self,
            NodeKind::ForLoop | NodeKind::ForInLoop | NodeKind::WhileLoop | NodeKind::DoWhileLoop
        )
    }

    /// Returns true for statements that unconditionally leave the current block.
    pub fn is_jump(&self) -> bool {
        matches!(
            self,
            NodeKind::ReturnStmt
                | NodeKind::ThrowStmt
                | NodeKind::BreakStmt
                | NodeKind::ContinueStmt
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The part a child plays inside its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    Name,
    Alias,
    Parameters,
    Body,
    Init,
    Condition,
    Update,
    Left,
    Right,
    Callee,
    Arguments,
    Object,
    Property,
    Key,
    Value,
    Handler,
    Finalizer,
    Consequence,
    Alternative,
    Argument,
    Source,
    Declaration,
}

impl Role {
    /// Maps a tree-sitter field name onto a role.
    pub(crate) fn from_field(field: &str) -> Option<Role> {
        let role = match field {
            "name" | "label" => Role::Name,
            "alias" => Role::Alias,
            "parameters" | "parameter" => Role::Parameters,
            "body" => Role::Body,
            "initializer" => Role::Init,
            "condition" => Role::Condition,
            "increment" => Role::Update,
            "left" => Role::Left,
            "right" => Role::Right,
            "function" | "constructor" => Role::Callee,
            "arguments" => Role::Arguments,
            "object" => Role::Object,
            "property" | "index" => Role::Property,
            "key" => Role::Key,
            "value" => Role::Value,
            "handler" => Role::Handler,
            "finalizer" => Role::Finalizer,
            "consequence" => Role::Consequence,
            "alternative" => Role::Alternative,
            "argument" => Role::Argument,
            "source" => Role::Source,
            "declaration" => Role::Declaration,
            _ => return None,
        };
        Some(role)
    }
}

/// Kind-specific attribute keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Attr {
    /// Identifier text, or the declared name of a function/class.
    Name,
    /// Operator symbol of binary, logical, unary, update and assignment nodes.
    Operator,
    /// Literal value (string contents without quotes, number text, regex body).
    Value,
    LiteralKind,
    DeclarationKind,
    /// Function form, see [`FunctionForm`].
    Form,
    /// Present with value "true" on `async` functions.
    Async,
    /// Literal source text, or the grammar kind of an `Other` node.
    Raw,
}

/// Literal categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralKind {
    String,
    Number,
    Regex,
    Boolean,
    Null,
    /// Template string without substitutions.
    Template,
}

impl LiteralKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LiteralKind::String => "string",
            LiteralKind::Number => "number",
            LiteralKind::Regex => "regex",
            LiteralKind::Boolean => "boolean",
            LiteralKind::Null => "null",
            LiteralKind::Template => "template",
        }
    }

    fn from_attr(value: &str) -> Option<Self> {
        match value {
            "string" => Some(LiteralKind::String),
            "number" => Some(LiteralKind::Number),
            "regex" => Some(LiteralKind::Regex),
            "boolean" => Some(LiteralKind::Boolean),
            "null" => Some(LiteralKind::Null),
            "template" => Some(LiteralKind::Template),
            _ => None,
        }
    }
}

/// Declaration keyword of a variable statement or loop header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclarationKind {
    Const,
    Let,
    Var,
}

impl DeclarationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeclarationKind::Const => "const",
            DeclarationKind::Let => "let",
            DeclarationKind::Var => "var",
        }
    }

    pub(crate) fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "const" => Some(DeclarationKind::Const),
            "let" => Some(DeclarationKind::Let),
            "var" => Some(DeclarationKind::Var),
            _ => None,
        }
    }
}

/// Syntactic form of a function node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionForm {
    Declaration,
    Expression,
    Arrow,
    Method,
}

impl FunctionForm {
    pub fn as_str(&self) -> &'static str {
        match self {
            FunctionForm::Declaration => "declaration",
            FunctionForm::Expression => "expression",
            FunctionForm::Arrow => "arrow",
            FunctionForm::Method => "method",
        }
    }

    fn from_attr(value: &str) -> Option<Self> {
        match value {
            "declaration" => Some(FunctionForm::Declaration),
            "expression" => Some(FunctionForm::Expression),
            "arrow" => Some(FunctionForm::Arrow),
            "method" => Some(FunctionForm::Method),
            _ => None,
        }
    }
}

/// One syntactic construct.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    /// Role inside the parent, when the grammar names one.
    pub role: Option<Role>,
    pub parent: Option<NodeId>,
    /// Children in source order.
    pub children: Vec<NodeId>,
    attrs: BTreeMap<Attr, String>,
}

impl Node {
    pub(crate) fn new(kind: NodeKind, span: Span, role: Option<Role>, parent: Option<NodeId>) -> Self {
        Self {
            kind,
            span,
            role,
            parent,
            children: Vec::new(),
            attrs: BTreeMap::new(),
        }
    }

    pub(crate) fn set_attr(&mut self, attr: Attr, value: impl Into<String>) {
        self.attrs.insert(attr, value.into());
    }

    /// Returns an attribute value.
    pub fn attr(&self, attr: Attr) -> Option<&str> {
        self.attrs.get(&attr).map(String::as_str)
    }

    /// Returns all attributes in key order.
    pub fn attrs(&self) -> impl Iterator<Item = (Attr, &str)> {
        self.attrs.iter().map(|(k, v)| (*k, v.as_str()))
    }

    pub fn name(&self) -> Option<&str> {
        self.attr(Attr::Name)
    }

    pub fn operator(&self) -> Option<&str> {
        self.attr(Attr::Operator)
    }

    pub fn value(&self) -> Option<&str> {
        self.attr(Attr::Value)
    }

    pub fn literal_kind(&self) -> Option<LiteralKind> {
        self.attr(Attr::LiteralKind).and_then(LiteralKind::from_attr)
    }

    pub fn declaration_kind(&self) -> Option<DeclarationKind> {
        self.attr(Attr::DeclarationKind)
            .and_then(DeclarationKind::from_keyword)
    }

    pub fn function_form(&self) -> Option<FunctionForm> {
        self.attr(Attr::Form).and_then(FunctionForm::from_attr)
    }

    pub fn is_async(&self) -> bool {
        self.attr(Attr::Async) == Some("true")
    }

    /// Returns true if this is a string-valued literal (quoted or plain template).
    pub fn is_string_literal(&self) -> bool {
        matches!(
            self.literal_kind(),
            Some(LiteralKind::String) | Some(LiteralKind::Template)
        )
    }

    /// Numeric value of a number literal.
    ///
    /// Handles decimal, exponent, hex/octal/binary prefixes, numeric
    /// separators and the BigInt suffix.
    pub fn number_value(&self) -> Option<f64> {
        if self.literal_kind() != Some(LiteralKind::Number) {
            return None;
        }
        let text: String = self.value()?.chars().filter(|c| *c != '_').collect();
        let text = text.strip_suffix('n').unwrap_or(&text);
        let lower = text.to_ascii_lowercase();
        let radix = if lower.starts_with("0x") {
            Some(16)
        } else if lower.starts_with("0o") {
            Some(8)
        } else if lower.starts_with("0b") {
            Some(2)
        } else {
            None
        };
        match radix {
            Some(radix) => u64::from_str_radix(&lower[2..], radix).ok().map(|v| v as f64),
            None => lower.parse::<f64>().ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number(text: &str) -> Node {
        let mut node = Node::new(NodeKind::Literal, Span::default(), None, None);
        node.set_attr(Attr::LiteralKind, LiteralKind::Number.as_str());
        node.set_attr(Attr::Value, text);
        node
    }

    #[test]
    fn test_number_value_forms() {
        assert_eq!(number("3.14159").number_value(), Some(3.14159));
        assert_eq!(number("0x1F").number_value(), Some(31.0));
        assert_eq!(number("1_000").number_value(), Some(1000.0));
        assert_eq!(number("10n").number_value(), Some(10.0));
        assert_eq!(number("1e3").number_value(), Some(1000.0));
        assert_eq!(number("0b101").number_value(), Some(5.0));
    }

    #[test]
    fn test_typed_attributes() {
        let mut node = Node::new(NodeKind::FunctionDecl, Span::default(), None, None);
        node.set_attr(Attr::Form, FunctionForm::Arrow.as_str());
        node.set_attr(Attr::Async, "true");
        assert_eq!(node.function_form(), Some(FunctionForm::Arrow));
        assert!(node.is_async());
        assert!(node.literal_kind().is_none());
        assert!(node.number_value().is_none());
    }

    #[test]
    fn test_role_from_field() {
        assert_eq!(Role::from_field("increment"), Some(Role::Update));
        assert_eq!(Role::from_field("constructor"), Some(Role::Callee));
        assert_eq!(Role::from_field("decorator"), None);
    }

    #[test]
    fn test_kind_predicates() {
        assert!(NodeKind::DoWhileLoop.is_loop());
        assert!(!NodeKind::Block.is_loop());
        assert!(NodeKind::ThrowStmt.is_jump());
        assert_eq!(NodeKind::ForInLoop.to_string(), "ForInLoop");
    }
}

//! Lowering from the tree-sitter CST into the node arena.
//!
//! Anonymous tokens are dropped after their meaning is copied into node
//! attributes (operators, declaration keywords, `async`). Parentheses,
//! template substitutions and `else` clauses are transparent: their content
//! is attached directly to the enclosing node.

use super::span_of;
use crate::node::{Attr, FunctionForm, LiteralKind, Node, NodeId, NodeKind, Role};
use tree_sitter::Node as TsNode;

/// Grammar nodes whose content is already captured by the parent's attributes.
const SKIPPED_KINDS: &[&str] = &[
    "string_fragment",
    "escape_sequence",
    "regex_pattern",
    "regex_flags",
    "empty_statement",
];

pub(crate) fn lower(source: &str, root: TsNode<'_>) -> Vec<Node> {
    let mut lowering = Lowering {
        source,
        nodes: Vec::new(),
    };
    lowering.lower(root, None, None);
    lowering.nodes
}

struct Lowering<'s> {
    source: &'s str,
    nodes: Vec<Node>,
}

impl Lowering<'_> {
    fn text(&self, node: TsNode<'_>) -> &str {
        self.source
            .get(node.start_byte()..node.end_byte())
            .unwrap_or("")
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        if let Some(parent) = node.parent {
            self.nodes[parent.index()].children.push(id);
        }
        self.nodes.push(node);
        id
    }

    fn lower(&mut self, ts: TsNode<'_>, parent: Option<NodeId>, role: Option<Role>) {
        let transparent = match ts.kind() {
            "parenthesized_expression" | "template_substitution" | "else_clause" => true,
            "expression_statement" => matches!(role, Some(Role::Init) | Some(Role::Condition)),
            kind => SKIPPED_KINDS.contains(&kind),
        };
        if transparent {
            let mut cursor = ts.walk();
            for child in ts.named_children(&mut cursor) {
                if child.kind() != "comment" && !SKIPPED_KINDS.contains(&child.kind()) {
                    self.lower(child, parent, role);
                }
            }
            return;
        }

        let kind = self.kind_of(ts);
        let mut node = Node::new(kind, span_of(ts), role, parent);
        self.annotate(&mut node, ts);
        let id = self.push(node);

        if matches!(
            kind,
            NodeKind::Identifier | NodeKind::PropertyName | NodeKind::Literal | NodeKind::Comment
        ) {
            return;
        }

        let mut cursor = ts.walk();
        if !cursor.goto_first_child() {
            return;
        }
        loop {
            let child = cursor.node();
            let field = cursor.field_name();
            if child.is_named() {
                if ts.kind() == "arrow_function" && field == Some("parameter") {
                    // `x => ...` gets the same parameter list shape as `(x) => ...`
                    let list = Node::new(
                        NodeKind::ParameterList,
                        span_of(child),
                        Some(Role::Parameters),
                        Some(id),
                    );
                    let list = self.push(list);
                    self.lower(child, Some(list), None);
                } else {
                    self.lower(child, Some(id), field.and_then(Role::from_field));
                }
            }
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }

    fn kind_of(&self, ts: TsNode<'_>) -> NodeKind {
        match ts.kind() {
            "program" => NodeKind::Program,
            "function_declaration"
            | "generator_function_declaration"
            | "function"
            | "function_expression"
            | "generator_function"
            | "arrow_function"
            | "method_definition" => NodeKind::FunctionDecl,
            "class_declaration" | "class" => NodeKind::ClassDecl,
            "formal_parameters" => NodeKind::ParameterList,
            "statement_block" => NodeKind::Block,
            "lexical_declaration" | "variable_declaration" => NodeKind::VariableDecl,
            "variable_declarator" => NodeKind::Declarator,
            "identifier"
            | "shorthand_property_identifier"
            | "shorthand_property_identifier_pattern"
            | "undefined" => NodeKind::Identifier,
            "property_identifier" | "private_property_identifier" | "statement_identifier" => {
                NodeKind::PropertyName
            }
            "for_statement" => NodeKind::ForLoop,
            "for_in_statement" => NodeKind::ForInLoop,
            "while_statement" => NodeKind::WhileLoop,
            "do_statement" => NodeKind::DoWhileLoop,
            "if_statement" => NodeKind::IfStmt,
            "switch_statement" => NodeKind::SwitchStmt,
            "switch_case" | "switch_default" => NodeKind::SwitchCase,
            "return_statement" => NodeKind::ReturnStmt,
            "throw_statement" => NodeKind::ThrowStmt,
            "break_statement" => NodeKind::BreakStmt,
            "continue_statement" => NodeKind::ContinueStmt,
            "try_statement" => NodeKind::TryBlock,
            "catch_clause" => NodeKind::CatchClause,
            "finally_clause" => NodeKind::FinallyClause,
            "expression_statement" => NodeKind::ExpressionStmt,
            "call_expression" => NodeKind::CallExpr,
            "new_expression" => NodeKind::NewExpr,
            "arguments" => NodeKind::Arguments,
            "member_expression" => NodeKind::MemberExpr,
            "subscript_expression" => NodeKind::SubscriptExpr,
            "assignment_expression" | "augmented_assignment_expression" => NodeKind::AssignExpr,
            "binary_expression" => {
                let op = ts
                    .child_by_field_name("operator")
                    .map(|o| o.kind())
                    .unwrap_or("");
                if matches!(op, "&&" | "||" | "??") {
                    NodeKind::LogicalExpr
                } else {
                    NodeKind::BinaryExpr
                }
            }
            "unary_expression" => NodeKind::UnaryExpr,
            "update_expression" => NodeKind::UpdateExpr,
            "ternary_expression" => NodeKind::TernaryExpr,
            "await_expression" => NodeKind::AwaitExpr,
            "array" => NodeKind::ArrayExpr,
            "object" => NodeKind::ObjectExpr,
            "pair" | "pair_pattern" => NodeKind::Property,
            "object_pattern" | "array_pattern" | "rest_pattern" => NodeKind::Pattern,
            "assignment_pattern" | "object_assignment_pattern" => NodeKind::AssignPattern,
            "spread_element" => NodeKind::SpreadElement,
            "string" | "number" | "regex" | "true" | "false" | "null" => NodeKind::Literal,
            "template_string" => {
                let mut cursor = ts.walk();
                let has_substitution = ts
                    .named_children(&mut cursor)
                    .any(|c| c.kind() == "template_substitution");
                if has_substitution {
                    NodeKind::TemplateString
                } else {
                    NodeKind::Literal
                }
            }
            "sequence_expression" => NodeKind::SequenceExpr,
            "import_statement" => NodeKind::ImportDecl,
            "export_statement" => NodeKind::ExportDecl,
            "comment" | "hash_bang_line" => NodeKind::Comment,
            _ => NodeKind::Other,
        }
    }

    fn annotate(&self, node: &mut Node, ts: TsNode<'_>) {
        match node.kind {
            NodeKind::Identifier | NodeKind::PropertyName => {
                node.set_attr(Attr::Name, self.text(ts));
            }
            NodeKind::FunctionDecl => {
                let form = match ts.kind() {
                    "function_declaration" | "generator_function_declaration" => {
                        FunctionForm::Declaration
                    }
                    "arrow_function" => FunctionForm::Arrow,
                    "method_definition" => FunctionForm::Method,
                    _ => FunctionForm::Expression,
                };
                node.set_attr(Attr::Form, form.as_str());
                if let Some(name) = ts.child_by_field_name("name") {
                    node.set_attr(Attr::Name, self.text(name));
                }
                let mut cursor = ts.walk();
                if ts.children(&mut cursor).any(|c| c.kind() == "async") {
                    node.set_attr(Attr::Async, "true");
                }
            }
            NodeKind::ClassDecl => {
                if let Some(name) = ts.child_by_field_name("name") {
                    node.set_attr(Attr::Name, self.text(name));
                }
            }
            NodeKind::VariableDecl => {
                let keyword = if ts.kind() == "variable_declaration" {
                    "var"
                } else {
                    ts.child_by_field_name("kind")
                        .or_else(|| ts.child(0))
                        .map(|k| self.text(k))
                        .unwrap_or("let")
                };
                node.set_attr(Attr::DeclarationKind, keyword);
            }
            NodeKind::ForInLoop => {
                if let Some(kind) = ts.child_by_field_name("kind") {
                    node.set_attr(Attr::DeclarationKind, self.text(kind));
                }
                if let Some(op) = ts.child_by_field_name("operator") {
                    node.set_attr(Attr::Operator, self.text(op));
                }
            }
            NodeKind::BinaryExpr
            | NodeKind::LogicalExpr
            | NodeKind::UnaryExpr
            | NodeKind::UpdateExpr => {
                if let Some(op) = ts.child_by_field_name("operator") {
                    node.set_attr(Attr::Operator, self.text(op));
                }
            }
            NodeKind::AssignExpr => {
                let op = if ts.kind() == "assignment_expression" {
                    "="
                } else {
                    ts.child_by_field_name("operator")
                        .map(|o| self.text(o))
                        .unwrap_or("=")
                };
                node.set_attr(Attr::Operator, op);
            }
            NodeKind::Literal => {
                let text = self.text(ts);
                let (kind, value) = match ts.kind() {
                    "string" => (LiteralKind::String, strip_delimiters(text)),
                    "number" => (LiteralKind::Number, text),
                    "regex" => (
                        LiteralKind::Regex,
                        ts.child_by_field_name("pattern")
                            .map(|p| self.text(p))
                            .unwrap_or(""),
                    ),
                    "true" | "false" => (LiteralKind::Boolean, text),
                    "null" => (LiteralKind::Null, text),
                    _ => (LiteralKind::Template, strip_delimiters(text)),
                };
                node.set_attr(Attr::LiteralKind, kind.as_str());
                node.set_attr(Attr::Value, value);
                node.set_attr(Attr::Raw, text);
            }
            NodeKind::Other => {
                node.set_attr(Attr::Raw, ts.kind());
            }
            _ => {}
        }
    }
}

/// Drops the surrounding quote or backtick characters.
fn strip_delimiters(text: &str) -> &str {
    if text.len() >= 2 && text.is_char_boundary(1) && text.is_char_boundary(text.len() - 1) {
        &text[1..text.len() - 1]
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use crate::model::SourceModel;
    use crate::node::{Attr, DeclarationKind, FunctionForm, LiteralKind, NodeKind, Role};

    fn parse(source: &str) -> SourceModel {
        SourceModel::parse("test.js", source).unwrap()
    }

    #[test]
    fn test_for_loop_roles() {
        let model = parse("for (let i = 0; i == n; i++) { work(i); }\n");
        let lp = model.nodes_of_kind(NodeKind::ForLoop).next().unwrap();
        let init = model.child_by_role(lp, Role::Init).unwrap();
        let cond = model.child_by_role(lp, Role::Condition).unwrap();
        let update = model.child_by_role(lp, Role::Update).unwrap();
        let body = model.child_by_role(lp, Role::Body).unwrap();
        assert_eq!(model.node(init).kind, NodeKind::VariableDecl);
        assert_eq!(model.node(cond).kind, NodeKind::BinaryExpr);
        assert_eq!(model.node(cond).operator(), Some("=="));
        assert_eq!(model.node(update).kind, NodeKind::UpdateExpr);
        assert_eq!(model.node(body).kind, NodeKind::Block);
        assert_eq!(model.text(cond), "i == n");
    }

    #[test]
    fn test_literal_attributes() {
        let model = parse("const a = 'hi';\nconst b = /^(a+)+$/g;\nconst c = `plain`;\nconst d = 0x10;\n");
        let literals: Vec<_> = model
            .nodes_of_kind(NodeKind::Literal)
            .map(|id| model.node(id))
            .collect();
        assert_eq!(literals[0].literal_kind(), Some(LiteralKind::String));
        assert_eq!(literals[0].value(), Some("hi"));
        assert_eq!(literals[1].literal_kind(), Some(LiteralKind::Regex));
        assert_eq!(literals[1].value(), Some("^(a+)+$"));
        assert_eq!(literals[2].literal_kind(), Some(LiteralKind::Template));
        assert_eq!(literals[2].value(), Some("plain"));
        assert_eq!(literals[3].number_value(), Some(16.0));
        assert_eq!(literals[3].attr(Attr::Raw), Some("0x10"));
    }

    #[test]
    fn test_parentheses_are_transparent() {
        let model = parse("const x = (a + (b));\n");
        let decl = model.nodes_of_kind(NodeKind::Declarator).next().unwrap();
        let value = model.child_by_role(decl, Role::Value).unwrap();
        assert_eq!(model.node(value).kind, NodeKind::BinaryExpr);
        let right = model.child_by_role(value, Role::Right).unwrap();
        assert_eq!(model.node(right).kind, NodeKind::Identifier);
    }

    #[test]
    fn test_function_forms() {
        let model = parse(
            "function a() {}\nconst b = function () {};\nconst c = async x => x;\nclass D { m() {} }\n",
        );
        let forms: Vec<_> = model
            .nodes_of_kind(NodeKind::FunctionDecl)
            .map(|id| model.node(id).function_form().unwrap())
            .collect();
        assert_eq!(
            forms,
            vec![
                FunctionForm::Declaration,
                FunctionForm::Expression,
                FunctionForm::Arrow,
                FunctionForm::Method,
            ]
        );
        let arrow = model.nodes_of_kind(NodeKind::FunctionDecl).nth(2).unwrap();
        assert!(model.node(arrow).is_async());
        let params = model.child_by_role(arrow, Role::Parameters).unwrap();
        assert_eq!(model.node(params).kind, NodeKind::ParameterList);
        assert_eq!(model.code_children(params).count(), 1);
    }

    #[test]
    fn test_declaration_keywords_and_logical_split() {
        let model = parse("var a = 1;\nlet b = a && 2;\nconst c = b + 1;\n");
        let keywords: Vec<_> = model
            .nodes_of_kind(NodeKind::VariableDecl)
            .map(|id| model.node(id).declaration_kind().unwrap())
            .collect();
        assert_eq!(
            keywords,
            vec![DeclarationKind::Var, DeclarationKind::Let, DeclarationKind::Const]
        );
        assert_eq!(model.nodes_of_kind(NodeKind::LogicalExpr).count(), 1);
        assert_eq!(model.nodes_of_kind(NodeKind::BinaryExpr).count(), 1);
    }

    #[test]
    fn test_comments_kept_in_blocks() {
        let model = parse("function f() {\n  // intentionally empty\n}\n");
        let body = model.nodes_of_kind(NodeKind::Block).next().unwrap();
        assert_eq!(model.children(body).count(), 1);
        assert_eq!(model.code_children(body).count(), 0);
    }

    #[test]
    fn test_template_with_substitution() {
        let model = parse("const s = `Item ${i}`;\n");
        let template = model.nodes_of_kind(NodeKind::TemplateString).next().unwrap();
        let kinds: Vec<_> = model
            .children(template)
            .map(|c| model.node(c).kind)
            .collect();
        assert_eq!(kinds, vec![NodeKind::Identifier]);
    }
}

//! Code smell rules.
//!
//! Maintainability checks. Several read their limits from [`Thresholds`].
//!
//! [`Thresholds`]: crate::config::Thresholds

use crate::report::{Finding, Severity};
use crate::rules::helpers::{callee_name, descendants_in_function, is_function};
use crate::rules::{Rule, RuleContext};
use codesnag_model::{NodeId, NodeKind, Role, SourceModel};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Returns all code smell rules.
pub fn all_rules() -> Vec<Arc<dyn Rule>> {
    vec![
        Arc::new(TooManyParametersRule),
        Arc::new(DuplicateLiteralRule),
        Arc::new(MagicNumberRule),
        Arc::new(EmptyFunctionRule),
        Arc::new(LongFunctionRule),
        Arc::new(ExpressionComplexityRule),
    ]
}

/// Node to report a function at: its name when it has one.
fn function_anchor(model: &SourceModel, function: NodeId) -> NodeId {
    model
        .child_by_role(function, Role::Name)
        .unwrap_or(function)
}

// ============================================================================
// S107: Too many parameters
// ============================================================================

/// Detects functions declaring more parameters than allowed.
pub struct TooManyParametersRule;

impl Rule for TooManyParametersRule {
    fn id(&self) -> &'static str {
        "S107"
    }

    fn title(&self) -> &'static str {
        "Functions should not have too many parameters"
    }

    fn severity(&self) -> Severity {
        Severity::CodeSmell
    }

    fn inspect(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let model = ctx.model;
        let max = ctx.thresholds.max_parameters;
        let mut findings = Vec::new();
        for function in model.nodes_of_kind(NodeKind::FunctionDecl) {
            let Some(list) = model.child_by_role(function, Role::Parameters) else {
                continue;
            };
            // `x => x` has a bare identifier instead of a list
            if model.node(list).kind != NodeKind::ParameterList {
                continue;
            }
            let params: Vec<NodeId> = model.code_children(list).collect();
            if params.len() <= max {
                continue;
            }
            let mut finding = ctx.finding(
                self,
                list,
                format!(
                    "This function has {} parameters, which is greater than the {} authorized.",
                    params.len(),
                    max
                ),
            );
            for extra in &params[max..] {
                finding = finding.with_secondary(model.node(*extra).span);
            }
            findings.push(finding);
        }
        findings
    }
}

// ============================================================================
// S1192: Duplicated string literal
// ============================================================================

/// Detects string literals repeated often enough to deserve a constant.
pub struct DuplicateLiteralRule;

const MIN_LITERAL_LENGTH: usize = 3;

impl DuplicateLiteralRule {
    /// Returns true for literals whose repetition is expected.
    fn is_exempt(model: &SourceModel, id: NodeId) -> bool {
        let node = model.node(id);
        let Some(parent) = model.parent(id) else {
            return true;
        };
        let parent_node = model.node(parent);
        match parent_node.kind {
            NodeKind::ImportDecl | NodeKind::ExportDecl => node.role == Some(Role::Source),
            NodeKind::Property => node.role == Some(Role::Key),
            // directives such as "use strict"
            NodeKind::ExpressionStmt => true,
            NodeKind::Arguments => model
                .parent(parent)
                .map(|call| callee_name(model, call) == Some("require"))
                .unwrap_or(false),
            _ => false,
        }
    }
}

impl Rule for DuplicateLiteralRule {
    fn id(&self) -> &'static str {
        "S1192"
    }

    fn title(&self) -> &'static str {
        "String literals should not be duplicated"
    }

    fn severity(&self) -> Severity {
        Severity::CodeSmell
    }

    fn inspect(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let model = ctx.model;
        let min_count = ctx.thresholds.duplicate_literal_min_count;
        let mut occurrences: BTreeMap<&str, Vec<NodeId>> = BTreeMap::new();

        for id in model.nodes_of_kind(NodeKind::Literal) {
            let node = model.node(id);
            if !node.is_string_literal() {
                continue;
            }
            let Some(value) = node.value() else {
                continue;
            };
            if value.chars().count() < MIN_LITERAL_LENGTH || Self::is_exempt(model, id) {
                continue;
            }
            occurrences.entry(value).or_default().push(id);
        }

        let mut findings: Vec<Finding> = occurrences
            .into_values()
            .filter(|ids| ids.len() >= min_count)
            .map(|ids| {
                let mut finding = ctx.finding(
                    self,
                    ids[0],
                    format!(
                        "Define a constant instead of duplicating this literal {} times.",
                        ids.len()
                    ),
                );
                for id in &ids {
                    finding = finding.with_secondary(model.node(*id).span);
                }
                finding
            })
            .collect();
        findings.sort_by_key(|f| f.span.start);
        findings
    }
}

// ============================================================================
// S109: Magic number
// ============================================================================

/// Detects unnamed numeric constants used inside expressions.
pub struct MagicNumberRule;

impl MagicNumberRule {
    /// Returns true if the number is given a name or a slot by its context.
    fn is_bound(model: &SourceModel, expr: NodeId) -> bool {
        let role = model.node(expr).role;
        let Some(parent) = model.parent(expr) else {
            return false;
        };
        match model.node(parent).kind {
            NodeKind::Declarator | NodeKind::Property => role == Some(Role::Value),
            NodeKind::AssignPattern | NodeKind::AssignExpr => role == Some(Role::Right),
            NodeKind::ArrayExpr => true,
            _ => false,
        }
    }
}

impl Rule for MagicNumberRule {
    fn id(&self) -> &'static str {
        "S109"
    }

    fn title(&self) -> &'static str {
        "Magic numbers should not be used"
    }

    fn severity(&self) -> Severity {
        Severity::CodeSmell
    }

    fn inspect(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let model = ctx.model;
        let mut findings = Vec::new();
        for id in model.nodes_of_kind(NodeKind::Literal) {
            let Some(mut value) = model.node(id).number_value() else {
                continue;
            };
            // `-5` is a unary minus over `5`
            let mut expr = id;
            if let Some(parent) = model.parent(id) {
                let parent_node = model.node(parent);
                if parent_node.kind == NodeKind::UnaryExpr {
                    match parent_node.operator() {
                        Some("-") => {
                            value = -value;
                            expr = parent;
                        }
                        Some("+") => expr = parent,
                        _ => {}
                    }
                }
            }
            if value == 0.0 || value == 1.0 || value == -1.0 || Self::is_bound(model, expr) {
                continue;
            }
            findings.push(ctx.finding(
                self,
                expr,
                format!(
                    "No magic number: {}. Assign it to a named constant.",
                    model.text(expr)
                ),
            ));
        }
        findings
    }
}

// ============================================================================
// S1186: Empty function
// ============================================================================

/// Detects functions whose body block is empty and uncommented.
pub struct EmptyFunctionRule;

impl Rule for EmptyFunctionRule {
    fn id(&self) -> &'static str {
        "S1186"
    }

    fn title(&self) -> &'static str {
        "Functions should not be empty"
    }

    fn severity(&self) -> Severity {
        Severity::CodeSmell
    }

    fn inspect(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let model = ctx.model;
        model
            .nodes_of_kind(NodeKind::FunctionDecl)
            .filter(|function| {
                model
                    .child_by_role(*function, Role::Body)
                    .map(|body| {
                        model.node(body).kind == NodeKind::Block
                            && model.node(body).children.is_empty()
                    })
                    .unwrap_or(false)
            })
            .map(|function| {
                let name = model
                    .child_by_role(function, Role::Name)
                    .and_then(|n| model.node(n).name())
                    .unwrap_or("anonymous");
                ctx.finding(
                    self,
                    function_anchor(model, function),
                    format!(
                        "Add a nested comment explaining why function '{name}' is empty, or complete the implementation."
                    ),
                )
            })
            .collect()
    }
}

// ============================================================================
// S138: Long function
// ============================================================================

/// Detects functions spanning more lines than allowed.
pub struct LongFunctionRule;

impl Rule for LongFunctionRule {
    fn id(&self) -> &'static str {
        "S138"
    }

    fn title(&self) -> &'static str {
        "Functions should not have too many lines of code"
    }

    fn severity(&self) -> Severity {
        Severity::CodeSmell
    }

    fn default_enabled(&self) -> bool {
        false
    }

    fn inspect(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let model = ctx.model;
        let max = ctx.thresholds.max_function_lines;
        model
            .nodes_of_kind(NodeKind::FunctionDecl)
            .filter_map(|function| {
                let lines = model.node(function).span.line_count();
                (lines > max).then(|| {
                    ctx.finding(
                        self,
                        function_anchor(model, function),
                        format!(
                            "This function has {lines} lines, which is greater than the {max} lines authorized. Split it into smaller functions."
                        ),
                    )
                })
            })
            .collect()
    }
}

// ============================================================================
// S1067: Expression complexity
// ============================================================================

/// Detects expressions chaining too many conditional operators.
pub struct ExpressionComplexityRule;

fn is_conditional_operator(model: &SourceModel, id: NodeId) -> bool {
    matches!(
        model.node(id).kind,
        NodeKind::LogicalExpr | NodeKind::TernaryExpr
    )
}

impl ExpressionComplexityRule {
    /// Returns true if no conditional operator encloses `id` in the same function.
    fn is_root(model: &SourceModel, id: NodeId) -> bool {
        for ancestor in model.ancestors(id) {
            if is_function(model, ancestor) {
                return true;
            }
            if is_conditional_operator(model, ancestor) {
                return false;
            }
        }
        true
    }
}

impl Rule for ExpressionComplexityRule {
    fn id(&self) -> &'static str {
        "S1067"
    }

    fn title(&self) -> &'static str {
        "Expressions should not be too complex"
    }

    fn severity(&self) -> Severity {
        Severity::CodeSmell
    }

    fn default_enabled(&self) -> bool {
        false
    }

    fn inspect(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let model = ctx.model;
        let max = ctx.thresholds.max_expression_complexity;
        let mut findings = Vec::new();
        let roots = model
            .nodes()
            .map(|(id, _)| id)
            .filter(|id| is_conditional_operator(model, *id) && Self::is_root(model, *id));

        for root in roots {
            if ctx.is_cancelled() {
                break;
            }
            let operators: Vec<NodeId> = std::iter::once(root)
                .chain(descendants_in_function(model, root))
                .filter(|id| is_conditional_operator(model, *id))
                .collect();
            if operators.len() <= max {
                continue;
            }
            let mut finding = ctx.finding(
                self,
                root,
                format!(
                    "Reduce the number of conditional operators ({}) used in the expression (maximum allowed {}).",
                    operators.len(),
                    max
                ),
            );
            for op in &operators {
                finding = finding.with_secondary(model.node(*op).span);
            }
            findings.push(finding);
        }
        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Thresholds;
    use crate::rules::testing::{run, run_with};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_too_many_parameters() {
        let findings = run(
            &TooManyParametersRule,
            "function build(a, b, c, d, e, f, g, h, i) {\n  return a;\n}\n",
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(
            findings[0].message,
            "This function has 9 parameters, which is greater than the 7 authorized."
        );
        assert_eq!(findings[0].secondary_locations.len(), 2);

        assert!(run(&TooManyParametersRule, "const f = (a, b, c) => a + b + c;\nconst g = x => x;\n").is_empty());
    }

    #[test]
    fn test_too_many_parameters_threshold() {
        let thresholds = Thresholds {
            max_parameters: 2,
            ..Thresholds::default()
        };
        let findings = run_with(
            &TooManyParametersRule,
            "class A {\n  move(x, y, z) {}\n}\n",
            &thresholds,
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].span.line, 2);
    }

    #[test]
    fn test_duplicate_literal() {
        let source = "const a = 'loading';\nconst b = 'loading';\nshow('loading');\nshow('ok', 'ok', 'ok');\n";
        let findings = run(&DuplicateLiteralRule, source);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].span.line, 1);
        assert_eq!(
            findings[0].message,
            "Define a constant instead of duplicating this literal 3 times."
        );
        assert_eq!(findings[0].secondary_locations.len(), 3);
    }

    #[test]
    fn test_duplicate_literal_exemptions() {
        let source = "'use strict';\nimport x from 'lodash';\nconst y = require('lodash');\nconst z = require('lodash');\nconst o = { 'name': 1, name2: 'lodash' };\nconst p = { 'name': 2 };\nconst q = { 'name': 3 };\n";
        assert!(run(&DuplicateLiteralRule, source).is_empty());
    }

    #[test]
    fn test_duplicate_literal_threshold() {
        let thresholds = Thresholds {
            duplicate_literal_min_count: 2,
            ..Thresholds::default()
        };
        let findings = run_with(
            &DuplicateLiteralRule,
            "log('saved');\nlog('saved');\n",
            &thresholds,
        );
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn test_magic_number() {
        let source = "if (items.length > 42) {\n  wait(1000 * 60);\n}\nconst LIMIT = 42;\nconst cfg = { retries: 5 };\nconst list = [2, 3];\nfunction f(n = 10) { return n - 1; }\nx = 7;\nconst back = offset(-1);\nscale(-3);\n";
        let findings = run(&MagicNumberRule, source);
        let lines: Vec<usize> = findings.iter().map(|f| f.span.line).collect();
        assert_eq!(lines, vec![1, 2, 2, 10]);
        assert!(findings[3].message.contains("-3"));
    }

    #[test]
    fn test_empty_function() {
        let source = "function noop() {}\nfunction documented() {\n  // intentionally empty\n}\nconst handler = () => {};\nfunction full() { return 1; }\n";
        let findings = run(&EmptyFunctionRule, source);
        let lines: Vec<usize> = findings.iter().map(|f| f.span.line).collect();
        assert_eq!(lines, vec![1, 5]);
        assert!(findings[0].message.contains("'noop'"));
    }

    #[test]
    fn test_long_function() {
        let thresholds = Thresholds {
            max_function_lines: 3,
            ..Thresholds::default()
        };
        let source = "function long() {\n  a();\n  b();\n  c();\n}\nfunction short() {\n  a();\n}\n";
        let findings = run_with(&LongFunctionRule, source, &thresholds);
        assert_eq!(findings.len(), 1);
        assert!(findings[0].message.starts_with("This function has 5 lines"));
        assert!(!LongFunctionRule.default_enabled());
    }

    #[test]
    fn test_expression_complexity() {
        let source = "if (a && b || c && d || e) {}\nconst ok = a && b || c;\nconst v = a ? b && c : d || e ? f : g;\n";
        let findings = run(&ExpressionComplexityRule, source);
        let lines: Vec<usize> = findings.iter().map(|f| f.span.line).collect();
        assert_eq!(lines, vec![1, 3]);
        assert_eq!(findings[0].secondary_locations.len(), 4);
        assert!(!ExpressionComplexityRule.default_enabled());
    }

    #[test]
    fn test_expression_complexity_stops_at_functions() {
        let source = "const f = a && b && items.filter(x => x.a && x.b && x.c);\n";
        assert!(run(&ExpressionComplexityRule, source).is_empty());
    }
}

//! Bug rules.
//!
//! Rules for code that does the wrong thing at runtime: dead bindings, loop
//! conditions that can skip their bound, closures capturing loop state,
//! dropped promise rejections and unreachable or swallowed control flow.

use crate::report::{Finding, Severity};
use crate::rules::helpers::{
    bound_function, call_arguments, call_receiver, callee_name, callee_path,
    descendants_in_function, enclosing_loop_body, is_function, is_in_try_with_catch, is_null_like,
    is_true_literal, jump_label_target, loop_variables, refers_to_loop_variable, statements,
};
use crate::rules::{Rule, RuleContext};
use codesnag_model::{BindingKind, FunctionForm, NodeId, NodeKind, Role, SourceModel};
use std::sync::Arc;

/// Returns all bug rules.
pub fn all_rules() -> Vec<Arc<dyn Rule>> {
    vec![
        Arc::new(UnusedBindingRule),
        Arc::new(LoopEqualityRule),
        Arc::new(FunctionInLoopRule),
        Arc::new(UnhandledAsyncRule),
        Arc::new(ReduceAsMapRule),
        Arc::new(UnreachableCodeRule),
        Arc::new(InfiniteLoopRule),
        Arc::new(JumpInFinallyRule),
    ]
}

// ============================================================================
// S1481: Unused binding
// ============================================================================

/// Detects variables and imports that are declared and never referenced.
pub struct UnusedBindingRule;

impl Rule for UnusedBindingRule {
    fn id(&self) -> &'static str {
        "S1481"
    }

    fn title(&self) -> &'static str {
        "Unused local variables and imports should be removed"
    }

    fn severity(&self) -> Severity {
        Severity::Bug
    }

    fn inspect(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        ctx.model
            .bindings()
            .filter(|(_, b)| matches!(b.kind, BindingKind::Variable | BindingKind::Import))
            .filter(|(_, b)| b.references.is_empty() && !b.exported && !b.name.starts_with('_'))
            .map(|(_, b)| {
                ctx.finding(
                    self,
                    b.declaration,
                    format!(
                        "Remove the declaration of the unused '{}' {}.",
                        b.name,
                        b.kind.as_str()
                    ),
                )
            })
            .collect()
    }
}

// ============================================================================
// S888: Equality in for-loop condition
// ============================================================================

/// Detects `for` conditions that test a loop variable with `==` or `!=`.
pub struct LoopEqualityRule;

impl Rule for LoopEqualityRule {
    fn id(&self) -> &'static str {
        "S888"
    }

    fn title(&self) -> &'static str {
        "Equality operators should not be used in \"for\" loop termination conditions"
    }

    fn severity(&self) -> Severity {
        Severity::Bug
    }

    fn inspect(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let model = ctx.model;
        let mut findings = Vec::new();

        for loop_id in model.nodes_of_kind(NodeKind::ForLoop) {
            let Some(condition) = model.child_by_role(loop_id, Role::Condition) else {
                continue;
            };
            let node = model.node(condition);
            if node.kind != NodeKind::BinaryExpr {
                continue;
            }
            let Some(op) = node.operator() else {
                continue;
            };
            if !matches!(op, "==" | "!=" | "===" | "!==") {
                continue;
            }
            let (Some(left), Some(right)) = (
                model.child_by_role(condition, Role::Left),
                model.child_by_role(condition, Role::Right),
            ) else {
                continue;
            };
            if is_null_like(model, left) || is_null_like(model, right) {
                continue;
            }

            let vars = loop_variables(model, loop_id);
            if refers_to_loop_variable(model, left, &vars)
                || refers_to_loop_variable(model, right, &vars)
            {
                findings.push(ctx.finding(
                    self,
                    condition,
                    format!(
                        "Replace '{op}' operator with one of '<=', '>=', '<', or '>' comparison operators."
                    ),
                ));
            }
        }
        findings
    }
}

// ============================================================================
// S1515: Function created inside a loop
// ============================================================================

/// Detects function values created in a loop body that close over a loop variable.
pub struct FunctionInLoopRule;

impl Rule for FunctionInLoopRule {
    fn id(&self) -> &'static str {
        "S1515"
    }

    fn title(&self) -> &'static str {
        "Functions should not be defined inside loops"
    }

    fn severity(&self) -> Severity {
        Severity::Bug
    }

    fn inspect(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let model = ctx.model;
        let mut findings = Vec::new();

        for function in model.nodes_of_kind(NodeKind::FunctionDecl) {
            let Some(loop_id) = enclosing_loop_body(model, function) else {
                continue;
            };
            let vars = loop_variables(model, loop_id);
            if vars.is_empty() {
                continue;
            }
            let captured = model
                .descendants(function)
                .find(|id| model.is_reference(*id) && refers_to_loop_variable(model, *id, &vars));
            if let Some(reference) = captured {
                let name = model.node(reference).name().unwrap_or("?");
                findings.push(
                    ctx.finding(
                        self,
                        function,
                        format!("Define this function outside of a loop; it captures the loop variable '{name}'."),
                    )
                    .with_secondary_note(model.node(reference).span, "captured here"),
                );
            }
        }
        findings
    }
}

// ============================================================================
// S4822: Unhandled promise rejection
// ============================================================================

/// Detects promises whose rejection is never handled.
pub struct UnhandledAsyncRule;

impl UnhandledAsyncRule {
    /// Returns true if evaluating `id` yields a promise.
    fn produces_promise(model: &SourceModel, id: NodeId) -> bool {
        let node = model.node(id);
        match node.kind {
            NodeKind::NewExpr => callee_name(model, id) == Some("Promise"),
            NodeKind::CallExpr => {
                if let Some(path) = callee_path(model, id) {
                    if path == "fetch" || path.ends_with(".fetch") || path.starts_with("Promise.") {
                        return true;
                    }
                }
                match callee_name(model, id) {
                    Some("then") | Some("finally") => {
                        return call_receiver(model, id)
                            .map(|r| Self::produces_promise(model, r))
                            .unwrap_or(false);
                    }
                    _ => {}
                }
                let callee = model.child_by_role(id, Role::Callee);
                match callee.map(|c| model.node(c).kind) {
                    Some(NodeKind::Identifier) => callee
                        .and_then(|c| model.resolve(c).binding())
                        .and_then(|b| bound_function(model, b))
                        .map(|f| model.node(f).is_async())
                        .unwrap_or(false),
                    Some(NodeKind::FunctionDecl) => callee.map(|c| model.node(c).is_async()).unwrap_or(false),
                    _ => false,
                }
            }
            NodeKind::Identifier => model
                .resolve(id)
                .binding()
                .and_then(|b| model.binding(b).init)
                .map(|init| Self::produces_promise(model, init))
                .unwrap_or(false),
            _ => false,
        }
    }

    /// Returns true if a promise chain ends in a rejection handler.
    fn is_handled(model: &SourceModel, id: NodeId) -> bool {
        if model.node(id).kind != NodeKind::CallExpr {
            return false;
        }
        match callee_name(model, id) {
            Some("catch") => true,
            Some("then") => call_arguments(model, id).len() >= 2,
            _ => false,
        }
    }
}

impl Rule for UnhandledAsyncRule {
    fn id(&self) -> &'static str {
        "S4822"
    }

    fn title(&self) -> &'static str {
        "Promise rejections should be handled"
    }

    fn severity(&self) -> Severity {
        Severity::Bug
    }

    fn inspect(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let model = ctx.model;
        let mut findings = Vec::new();

        for statement in model.nodes_of_kind(NodeKind::ExpressionStmt) {
            let Some(expr) = model.code_children(statement).next() else {
                continue;
            };
            let node = model.node(expr);
            match node.kind {
                NodeKind::AwaitExpr => {
                    let Some(inner) = model.code_children(expr).next() else {
                        continue;
                    };
                    if Self::produces_promise(model, inner)
                        && !Self::is_handled(model, inner)
                        && !is_in_try_with_catch(model, statement)
                    {
                        findings.push(ctx.finding(
                            self,
                            expr,
                            "Wrap this awaited call in a \"try\" block with a \"catch\" clause.",
                        ));
                    }
                }
                NodeKind::Identifier => {
                    if Self::produces_promise(model, expr) {
                        let name = node.name().unwrap_or("?");
                        findings.push(ctx.finding(
                            self,
                            expr,
                            format!("Handle the rejection of promise '{name}' or await it."),
                        ));
                    }
                }
                _ => {
                    if Self::produces_promise(model, expr) && !Self::is_handled(model, expr) {
                        findings.push(ctx.finding(
                            self,
                            expr,
                            "Add a \"catch\" handler to this promise or await it inside \"try\".",
                        ));
                    }
                }
            }
        }
        findings
    }
}

// ============================================================================
// S4043: reduce used as map
// ============================================================================

/// Detects `reduce` calls that only push one mapped element per step.
pub struct ReduceAsMapRule;

impl ReduceAsMapRule {
    fn is_empty_array(model: &SourceModel, id: NodeId) -> bool {
        model.node(id).kind == NodeKind::ArrayExpr && model.code_children(id).next().is_none()
    }

    fn is_name(model: &SourceModel, id: NodeId, name: &str) -> bool {
        let node = model.node(id);
        node.kind == NodeKind::Identifier && node.name() == Some(name)
    }

    /// `acc.push(x)` with a single argument.
    fn is_single_push(model: &SourceModel, id: NodeId, acc: &str) -> bool {
        model.node(id).kind == NodeKind::CallExpr
            && callee_name(model, id) == Some("push")
            && call_receiver(model, id).map(|r| Self::is_name(model, r, acc)).unwrap_or(false)
            && call_arguments(model, id).len() == 1
    }

    /// `[...acc, x]`
    fn is_spread_append(model: &SourceModel, id: NodeId, acc: &str) -> bool {
        if model.node(id).kind != NodeKind::ArrayExpr {
            return false;
        }
        let elements: Vec<NodeId> = model.code_children(id).collect();
        elements.len() == 2
            && model.node(elements[0]).kind == NodeKind::SpreadElement
            && model
                .code_children(elements[0])
                .next()
                .map(|inner| Self::is_name(model, inner, acc))
                .unwrap_or(false)
            && model.node(elements[1]).kind != NodeKind::SpreadElement
    }

    fn maps_one_to_one(model: &SourceModel, callback: NodeId) -> bool {
        let Some(params) = model.child_by_role(callback, Role::Parameters) else {
            return false;
        };
        let Some(acc) = model.code_children(params).next() else {
            return false;
        };
        let Some(acc) = model.node(acc).name() else {
            return false;
        };
        let Some(body) = model.child_by_role(callback, Role::Body) else {
            return false;
        };

        match model.node(body).kind {
            NodeKind::Block => {
                let stmts = statements(model, body);
                if stmts.len() != 2 {
                    return false;
                }
                let pushes = model.node(stmts[0]).kind == NodeKind::ExpressionStmt
                    && model
                        .code_children(stmts[0])
                        .next()
                        .map(|e| Self::is_single_push(model, e, acc))
                        .unwrap_or(false);
                let returns_acc = model.node(stmts[1]).kind == NodeKind::ReturnStmt
                    && model
                        .code_children(stmts[1])
                        .next()
                        .map(|e| Self::is_name(model, e, acc))
                        .unwrap_or(false);
                pushes && returns_acc
            }
            NodeKind::SequenceExpr => {
                let parts: Vec<NodeId> = model.code_children(body).collect();
                parts.len() == 2
                    && Self::is_single_push(model, parts[0], acc)
                    && Self::is_name(model, parts[1], acc)
            }
            _ => Self::is_spread_append(model, body, acc),
        }
    }
}

impl Rule for ReduceAsMapRule {
    fn id(&self) -> &'static str {
        "S4043"
    }

    fn title(&self) -> &'static str {
        "Array methods should match the transformation they perform"
    }

    fn severity(&self) -> Severity {
        Severity::Bug
    }

    fn inspect(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let model = ctx.model;
        model
            .nodes_of_kind(NodeKind::CallExpr)
            .filter(|call| callee_name(model, *call) == Some("reduce"))
            .filter(|call| {
                let args = call_arguments(model, *call);
                args.len() == 2
                    && is_function(model, args[0])
                    && Self::is_empty_array(model, args[1])
                    && Self::maps_one_to_one(model, args[0])
            })
            .map(|call| {
                let span = model
                    .child_by_role(call, Role::Callee)
                    .and_then(|c| model.child_by_role(c, Role::Property))
                    .map(|p| model.node(p).span)
                    .unwrap_or(model.node(call).span);
                ctx.finding_at(
                    self,
                    span,
                    "Use \"map\" instead of \"reduce\"; this callback appends exactly one element per item.",
                )
            })
            .collect()
    }
}

// ============================================================================
// S1763: Unreachable code
// ============================================================================

/// Detects statements that follow an unconditional jump in the same block.
pub struct UnreachableCodeRule;

impl Rule for UnreachableCodeRule {
    fn id(&self) -> &'static str {
        "S1763"
    }

    fn title(&self) -> &'static str {
        "All code should be reachable"
    }

    fn severity(&self) -> Severity {
        Severity::Bug
    }

    fn inspect(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let model = ctx.model;
        let mut findings = Vec::new();

        let containers = model.nodes().filter(|(_, n)| {
            matches!(n.kind, NodeKind::Block | NodeKind::Program | NodeKind::SwitchCase)
        });
        for (container, _) in containers {
            let stmts = statements(model, container);
            let Some(jump) = stmts.iter().position(|s| model.node(*s).kind.is_jump()) else {
                continue;
            };
            let dead = stmts[jump + 1..].iter().copied().find(|s| {
                let node = model.node(*s);
                // hoisted declarations stay usable
                !(node.kind == NodeKind::FunctionDecl
                    && node.function_form() == Some(FunctionForm::Declaration))
            });
            if let Some(dead) = dead {
                let keyword = model.node(stmts[jump]).kind;
                findings.push(
                    ctx.finding(self, dead, "Remove this unreachable code.")
                        .with_secondary_note(model.node(stmts[jump]).span, format!("{keyword} makes the rest of the block unreachable")),
                );
            }
        }
        findings
    }
}

// ============================================================================
// S2189: Infinite loop
// ============================================================================

/// Detects constant-condition loops with no way out.
pub struct InfiniteLoopRule;

impl InfiniteLoopRule {
    fn has_constant_condition(model: &SourceModel, loop_id: NodeId) -> bool {
        let condition = model.child_by_role(loop_id, Role::Condition);
        match model.node(loop_id).kind {
            NodeKind::ForLoop => condition.map(|c| is_true_literal(model, c)).unwrap_or(true),
            NodeKind::WhileLoop | NodeKind::DoWhileLoop => {
                condition.map(|c| is_true_literal(model, c)).unwrap_or(false)
            }
            _ => false,
        }
    }

    /// Returns true if something in the body can leave `loop_id`.
    fn has_exit(model: &SourceModel, loop_id: NodeId) -> bool {
        descendants_in_function(model, loop_id).into_iter().any(|id| {
            let node = model.node(id);
            match node.kind {
                NodeKind::ReturnStmt | NodeKind::ThrowStmt => true,
                NodeKind::BreakStmt => match jump_label_target(model, id) {
                    // the labeled statement is the loop or wraps it
                    Some(target) => model.is_within(loop_id, target),
                    None => Self::breaks_out_of(model, id, loop_id),
                },
                NodeKind::ContinueStmt => jump_label_target(model, id)
                    .map(|target| !model.is_within(target, loop_id))
                    .unwrap_or(false),
                NodeKind::CallExpr => {
                    matches!(callee_path(model, id).as_deref(), Some("process.exit"))
                }
                NodeKind::Other => model.text(id).starts_with("yield"),
                _ => false,
            }
        })
    }

    /// Returns true if an unlabeled `break` binds to `loop_id`.
    fn breaks_out_of(model: &SourceModel, brk: NodeId, loop_id: NodeId) -> bool {
        model
            .ancestors(brk)
            .find(|a| {
                let kind = model.node(*a).kind;
                kind.is_loop() || kind == NodeKind::SwitchStmt
            })
            .map(|target| target == loop_id)
            .unwrap_or(false)
    }
}

impl Rule for InfiniteLoopRule {
    fn id(&self) -> &'static str {
        "S2189"
    }

    fn title(&self) -> &'static str {
        "Loops should not be infinite"
    }

    fn severity(&self) -> Severity {
        Severity::Bug
    }

    fn inspect(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let model = ctx.model;
        model
            .nodes()
            .filter(|(_, n)| n.kind.is_loop())
            .map(|(id, _)| id)
            .filter(|id| Self::has_constant_condition(model, *id) && !Self::has_exit(model, *id))
            .map(|id| {
                ctx.finding(
                    self,
                    id,
                    "Add an end condition to this loop; nothing in its body can exit it.",
                )
            })
            .collect()
    }
}

// ============================================================================
// S1143: Jump in finally
// ============================================================================

/// Detects jumps that leave a `finally` block and discard the pending outcome.
pub struct JumpInFinallyRule;

impl JumpInFinallyRule {
    /// Returns true if a break/continue targets something inside `finally`.
    fn stays_inside(model: &SourceModel, jump: NodeId, finally: NodeId) -> bool {
        let is_break = model.node(jump).kind == NodeKind::BreakStmt;
        model
            .ancestors(jump)
            .take_while(|a| *a != finally)
            .any(|a| {
                let kind = model.node(a).kind;
                kind.is_loop() || (is_break && kind == NodeKind::SwitchStmt)
            })
    }
}

impl Rule for JumpInFinallyRule {
    fn id(&self) -> &'static str {
        "S1143"
    }

    fn title(&self) -> &'static str {
        "Jump statements should not occur in \"finally\" blocks"
    }

    fn severity(&self) -> Severity {
        Severity::Bug
    }

    fn inspect(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let model = ctx.model;
        let mut findings = Vec::new();

        for finally in model.nodes_of_kind(NodeKind::FinallyClause) {
            for id in descendants_in_function(model, finally) {
                let node = model.node(id);
                let leaves = match node.kind {
                    NodeKind::ReturnStmt | NodeKind::ThrowStmt => true,
                    NodeKind::BreakStmt | NodeKind::ContinueStmt => {
                        !Self::stays_inside(model, id, finally)
                    }
                    _ => false,
                };
                if leaves {
                    let keyword = model.text(id).split_whitespace().next().unwrap_or("jump");
                    let keyword = keyword.trim_end_matches(';');
                    findings.push(ctx.finding(
                        self,
                        id,
                        format!("Remove this \"{keyword}\" statement from this \"finally\" block."),
                    ));
                }
            }
        }
        findings
    }
}

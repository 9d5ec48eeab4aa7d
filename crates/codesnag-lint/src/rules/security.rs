//! Vulnerability rules.
//!
//! Rules for code an attacker can exploit: predictable tokens, catastrophic
//! regular expressions, secrets in source, unsanitized markup sinks and SQL
//! built from strings.

use crate::report::{Finding, Severity};
use crate::rules::helpers::{
    call_arguments, callee_name, callee_path, is_credential_name, is_tainted, is_token_name,
    looks_like_sql, member_path, property_name, target_name,
};
use crate::rules::redos::find_nested_quantifier;
use crate::rules::{Rule, RuleContext};
use codesnag_model::{LiteralKind, NodeId, NodeKind, Role, SourceModel};
use std::sync::Arc;

/// Returns all vulnerability rules.
pub fn all_rules() -> Vec<Arc<dyn Rule>> {
    vec![
        Arc::new(InsecureRandomRule),
        Arc::new(RegexDosRule),
        Arc::new(HardcodedCredentialRule),
        Arc::new(XssSinkRule),
        Arc::new(SqlFormattingRule),
    ]
}

/// Name of the binding, property or assignment target that receives the
/// value of `expr`, looking through wrapping expressions.
fn receiving_name(model: &SourceModel, expr: NodeId) -> Option<String> {
    let mut child = expr;
    for ancestor in model.ancestors(expr) {
        let node = model.node(ancestor);
        let role = model.node(child).role;
        match node.kind {
            NodeKind::Declarator if role == Some(Role::Value) => {
                let name = model.child_by_role(ancestor, Role::Name)?;
                return target_name(model, name);
            }
            NodeKind::AssignExpr if role == Some(Role::Right) => {
                let left = model.child_by_role(ancestor, Role::Left)?;
                return target_name(model, left);
            }
            NodeKind::Property if role == Some(Role::Value) => {
                let key = model.child_by_role(ancestor, Role::Key)?;
                return target_name(model, key);
            }
            NodeKind::AssignPattern if role == Some(Role::Right) => {
                let left = model.child_by_role(ancestor, Role::Left)?;
                return target_name(model, left);
            }
            NodeKind::ReturnStmt => {
                let function = model.enclosing_function(ancestor)?;
                let name = model.child_by_role(function, Role::Name).or_else(|| {
                    // `const makeToken = () => ...`
                    model
                        .parent(function)
                        .filter(|p| model.node(*p).kind == NodeKind::Declarator)
                        .and_then(|p| model.child_by_role(p, Role::Name))
                })?;
                return target_name(model, name);
            }
            NodeKind::MemberExpr
            | NodeKind::SubscriptExpr
            | NodeKind::CallExpr
            | NodeKind::Arguments
            | NodeKind::BinaryExpr
            | NodeKind::UnaryExpr
            | NodeKind::TemplateString
            | NodeKind::TernaryExpr
            | NodeKind::LogicalExpr
            | NodeKind::AwaitExpr => {}
            NodeKind::FunctionDecl => {
                // concise arrow body
                if role != Some(Role::Body) {
                    return None;
                }
                let declarator = model
                    .parent(ancestor)
                    .filter(|p| model.node(*p).kind == NodeKind::Declarator)?;
                let name = model.child_by_role(declarator, Role::Name)?;
                return target_name(model, name);
            }
            _ => return None,
        }
        child = ancestor;
    }
    None
}

// ============================================================================
// S2245: Insecure randomness
// ============================================================================

/// Detects `Math.random()` results used as tokens or secrets.
pub struct InsecureRandomRule;

impl Rule for InsecureRandomRule {
    fn id(&self) -> &'static str {
        "S2245"
    }

    fn title(&self) -> &'static str {
        "Pseudorandom number generators should not be used for security-sensitive values"
    }

    fn severity(&self) -> Severity {
        Severity::Vulnerability
    }

    fn inspect(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let model = ctx.model;
        model
            .nodes_of_kind(NodeKind::CallExpr)
            .filter(|call| callee_path(model, *call).as_deref() == Some("Math.random"))
            .filter_map(|call| {
                let target = receiving_name(model, call)?;
                is_token_name(&target).then(|| {
                    ctx.finding(
                        self,
                        call,
                        format!(
                            "Use a cryptographically secure generator such as crypto.getRandomValues() for '{target}'."
                        ),
                    )
                })
            })
            .collect()
    }
}

// ============================================================================
// S5852: Regular expression denial of service
// ============================================================================

/// Detects regular expressions with nested unbounded repetition.
pub struct RegexDosRule;

impl RegexDosRule {
    /// Pattern source of a regex literal or a `RegExp` constructor call.
    fn pattern_of(model: &SourceModel, id: NodeId) -> Option<String> {
        let node = model.node(id);
        match node.kind {
            NodeKind::Literal if node.literal_kind() == Some(LiteralKind::Regex) => {
                node.value().map(str::to_string)
            }
            NodeKind::NewExpr | NodeKind::CallExpr if callee_name(model, id) == Some("RegExp") => {
                let first = call_arguments(model, id).into_iter().next()?;
                let arg = model.node(first);
                if !arg.is_string_literal() {
                    return None;
                }
                // string escapes double the backslashes of the pattern
                arg.value().map(|v| v.replace("\\\\", "\\"))
            }
            _ => None,
        }
    }
}

impl Rule for RegexDosRule {
    fn id(&self) -> &'static str {
        "S5852"
    }

    fn title(&self) -> &'static str {
        "Regular expressions should not be vulnerable to Denial of Service attacks"
    }

    fn severity(&self) -> Severity {
        Severity::Vulnerability
    }

    fn inspect(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let model = ctx.model;
        let mut findings = Vec::new();
        for (id, _) in model.nodes() {
            if ctx.is_cancelled() {
                break;
            }
            let Some(pattern) = Self::pattern_of(model, id) else {
                continue;
            };
            if let Some(nested) = find_nested_quantifier(&pattern) {
                let end = (nested.quantifier + 1).min(pattern.len());
                let excerpt = pattern.get(nested.group_start..end).unwrap_or(&pattern);
                findings.push(ctx.finding(
                    self,
                    id,
                    format!(
                        "Make sure '{excerpt}' cannot backtrack catastrophically; remove the nested repetition."
                    ),
                ));
            }
        }
        findings
    }
}

// ============================================================================
// S2068: Hardcoded credential
// ============================================================================

/// Detects string literals stored in credential-named targets.
pub struct HardcodedCredentialRule;

impl Rule for HardcodedCredentialRule {
    fn id(&self) -> &'static str {
        "S2068"
    }

    fn title(&self) -> &'static str {
        "Credentials should not be hard-coded"
    }

    fn severity(&self) -> Severity {
        Severity::Vulnerability
    }

    fn inspect(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let model = ctx.model;
        model
            .nodes_of_kind(NodeKind::Literal)
            .filter(|id| {
                let node = model.node(*id);
                node.is_string_literal() && node.value().map(|v| !v.is_empty()).unwrap_or(false)
            })
            .filter_map(|id| {
                // only direct stores, not values computed from the literal
                let role = model.node(id).role;
                let parent = model.node(model.parent(id)?);
                let direct = matches!(
                    (parent.kind, role),
                    (NodeKind::Declarator, Some(Role::Value))
                        | (NodeKind::AssignExpr, Some(Role::Right))
                        | (NodeKind::Property, Some(Role::Value))
                        | (NodeKind::AssignPattern, Some(Role::Right))
                );
                if !direct {
                    return None;
                }
                let target = receiving_name(model, id)?;
                is_credential_name(&target).then(|| {
                    ctx.finding(
                        self,
                        id,
                        format!("Review this hard-coded value for '{target}'; load it from the environment or a secret store."),
                    )
                })
            })
            .collect()
    }
}

// ============================================================================
// S5696: XSS sink
// ============================================================================

/// Detects external input written to raw-markup sinks without sanitizing.
pub struct XssSinkRule;

impl XssSinkRule {
    /// Value expressions written to a markup sink at `id`.
    fn sink_values(model: &SourceModel, id: NodeId) -> Vec<NodeId> {
        let node = model.node(id);
        match node.kind {
            NodeKind::AssignExpr => {
                let Some(left) = model.child_by_role(id, Role::Left) else {
                    return Vec::new();
                };
                let is_sink = matches!(property_name(model, left), Some("innerHTML" | "outerHTML"));
                if is_sink {
                    model.child_by_role(id, Role::Right).into_iter().collect()
                } else {
                    Vec::new()
                }
            }
            NodeKind::CallExpr => {
                let args = call_arguments(model, id);
                match callee_path(model, id).as_deref() {
                    Some("document.write") | Some("document.writeln") => args,
                    _ if callee_name(model, id) == Some("insertAdjacentHTML") => {
                        args.into_iter().skip(1).collect()
                    }
                    _ => Vec::new(),
                }
            }
            _ => Vec::new(),
        }
    }
}

impl Rule for XssSinkRule {
    fn id(&self) -> &'static str {
        "S5696"
    }

    fn title(&self) -> &'static str {
        "DOM updates should not lead to cross-site scripting vulnerabilities"
    }

    fn severity(&self) -> Severity {
        Severity::Vulnerability
    }

    fn inspect(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let model = ctx.model;
        let mut findings = Vec::new();
        for (id, _) in model.nodes() {
            let values = Self::sink_values(model, id);
            if let Some(value) = values.into_iter().find(|v| is_tainted(model, *v)) {
                let sink = match model.node(id).kind {
                    NodeKind::AssignExpr => model
                        .child_by_role(id, Role::Left)
                        .and_then(|l| property_name(model, l))
                        .unwrap_or("innerHTML")
                        .to_string(),
                    _ => callee_path(model, id)
                        .or_else(|| callee_name(model, id).map(str::to_string))
                        .unwrap_or_default(),
                };
                findings.push(
                    ctx.finding(
                        self,
                        id,
                        format!("Sanitize this value before writing it to '{sink}', or use textContent."),
                    )
                    .with_secondary_note(model.node(value).span, "untrusted value"),
                );
            }
        }
        findings
    }
}

// ============================================================================
// S2077: SQL built by string formatting
// ============================================================================

/// Detects SQL statements assembled from strings and passed to a query call.
pub struct SqlFormattingRule;

const SQL_SINKS: &[&str] = &[
    "query",
    "execute",
    "exec",
    "raw",
    "$queryRaw",
    "$executeRaw",
    "$queryRawUnsafe",
    "$executeRawUnsafe",
];

impl SqlFormattingRule {
    /// Returns true if `id` builds SQL text from non-literal parts.
    fn is_formatted_sql(model: &SourceModel, id: NodeId) -> bool {
        let node = model.node(id);
        match node.kind {
            NodeKind::TemplateString => looks_like_sql(model.text(id).trim_start_matches('`')),
            NodeKind::BinaryExpr if node.operator() == Some("+") => {
                let mut leftmost = id;
                while let Some(left) = model.child_by_role(leftmost, Role::Left) {
                    leftmost = left;
                }
                let first = model.node(leftmost);
                let has_dynamic = model.descendants(id).any(|d| {
                    matches!(
                        model.node(d).kind,
                        NodeKind::Identifier | NodeKind::MemberExpr | NodeKind::CallExpr
                    )
                });
                first.is_string_literal()
                    && first.value().map(looks_like_sql).unwrap_or(false)
                    && has_dynamic
            }
            NodeKind::Identifier => model
                .resolve(id)
                .binding()
                .and_then(|b| model.binding(b).init)
                .map(|init| {
                    matches!(
                        model.node(init).kind,
                        NodeKind::TemplateString | NodeKind::BinaryExpr
                    ) && Self::is_formatted_sql(model, init)
                })
                .unwrap_or(false),
            _ => false,
        }
    }
}

impl Rule for SqlFormattingRule {
    fn id(&self) -> &'static str {
        "S2077"
    }

    fn title(&self) -> &'static str {
        "Formatting SQL queries is security-sensitive"
    }

    fn severity(&self) -> Severity {
        Severity::Vulnerability
    }

    fn inspect(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let model = ctx.model;
        model
            .nodes_of_kind(NodeKind::CallExpr)
            .filter(|call| {
                callee_name(model, *call)
                    .map(|name| SQL_SINKS.contains(&name))
                    .unwrap_or(false)
            })
            .filter_map(|call| {
                let first = call_arguments(model, call).into_iter().next()?;
                Self::is_formatted_sql(model, first).then(|| {
                    let sink = callee_path(model, call)
                        .or_else(|| member_path(model, call))
                        .unwrap_or_else(|| "query".to_string());
                    ctx.finding(
                        self,
                        first,
                        format!("Pass parameters to '{sink}' separately instead of formatting them into the SQL text."),
                    )
                })
            })
            .collect()
    }
}

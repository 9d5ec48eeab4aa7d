//! Helper functions shared by rule implementations.

use codesnag_model::{
    Access, Attr, BindingId, BindingKind, LiteralKind, NodeId, NodeKind, Role, SourceModel,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Words that make a name credential-shaped on their own.
static CREDENTIAL_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "password",
        "passwd",
        "pwd",
        "passphrase",
        "secret",
        "token",
        "apikey",
        "credential",
        "credentials",
    ]
    .into_iter()
    .collect()
});

/// Qualifiers that turn a bare `key` into a credential name (`apiKey`, `PRIVATE_KEY`).
static KEY_QUALIFIERS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "api",
        "secret",
        "private",
        "access",
        "auth",
        "encryption",
        "signing",
        "master",
        "client",
    ]
    .into_iter()
    .collect()
});

/// Words naming security-sensitive random values.
static TOKEN_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "token", "session", "nonce", "salt", "secret", "password", "otp", "csrf", "xsrf", "auth",
        "iv", "apikey",
    ]
    .into_iter()
    .collect()
});

/// Words naming values that arrive from outside the program.
static INPUT_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "input", "user", "query", "param", "params", "search", "payload", "untrusted", "req",
        "request", "body",
    ]
    .into_iter()
    .collect()
});

/// Calls that make a value safe for markup insertion.
const SANITIZERS: &[&str] = &[
    "sanitize",
    "sanitizehtml",
    "dompurify",
    "escape",
    "escapehtml",
    "encodeuricomponent",
    "encodeuri",
    "htmlencode",
    "htmlescape",
    "xss",
    "purify",
    "striptags",
    "htmlentities",
];

/// Member paths that read attacker-controlled data in a browser or server.
const INPUT_SOURCES: &[&str] = &[
    "location",
    "window.location",
    "document.location",
    "document.URL",
    "document.documentURI",
    "document.cookie",
    "document.referrer",
    "window.name",
    "req",
    "request",
    "event.data",
];

/// Statement texts that start an SQL command.
static SQL_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(select|insert|update|delete|replace|merge|create|alter|drop|truncate|with|call)\b")
        .expect("Invalid regex")
});

/// Splits an identifier into lowercase words (`sessionToken` -> session, token).
pub(crate) fn name_words(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();
    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).map(|n| n.is_lowercase()).unwrap_or(false);
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_lower) {
                words.push(std::mem::take(&mut current));
            }
        }
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn has_qualified_key(words: &[String]) -> bool {
    words.windows(2).any(|pair| {
        (pair[1] == "key" || pair[1] == "keys") && KEY_QUALIFIERS.contains(pair[0].as_str())
    })
}

/// Returns true for names like `password`, `apiKey` or `DB_SECRET`.
pub(crate) fn is_credential_name(name: &str) -> bool {
    let words = name_words(name);
    words.iter().any(|w| CREDENTIAL_WORDS.contains(w.as_str())) || has_qualified_key(&words)
}

/// Returns true for names that should hold unpredictable values.
pub(crate) fn is_token_name(name: &str) -> bool {
    let words = name_words(name);
    words.iter().any(|w| TOKEN_WORDS.contains(w.as_str())) || has_qualified_key(&words)
}

/// Returns true for names that suggest external input (`userInput`, `query`).
pub(crate) fn is_input_name(name: &str) -> bool {
    name_words(name)
        .iter()
        .any(|w| INPUT_WORDS.contains(w.as_str()))
}

pub(crate) fn is_sanitizer(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    SANITIZERS.iter().any(|s| lower == *s || lower.starts_with("sanitize"))
}

/// Returns true if the text reads like the start of an SQL statement.
pub(crate) fn looks_like_sql(text: &str) -> bool {
    SQL_START.is_match(text)
}

pub(crate) fn is_function(model: &SourceModel, id: NodeId) -> bool {
    model.node(id).kind == NodeKind::FunctionDecl
}

/// Dotted path of an identifier or member chain (`document.getElementById`).
pub(crate) fn member_path(model: &SourceModel, id: NodeId) -> Option<String> {
    let node = model.node(id);
    match node.kind {
        NodeKind::Identifier | NodeKind::PropertyName => node.name().map(str::to_string),
        NodeKind::MemberExpr => {
            let object = model.child_by_role(id, Role::Object)?;
            let property = model.child_by_role(id, Role::Property)?;
            let object = member_path(model, object)?;
            let property = model.node(property).name()?;
            Some(format!("{object}.{property}"))
        }
        NodeKind::Other => match model.text(id) {
            "this" | "super" => Some(model.text(id).to_string()),
            _ => None,
        },
        _ => None,
    }
}

/// Property name of a member expression.
pub(crate) fn property_name(model: &SourceModel, member: NodeId) -> Option<&str> {
    if model.node(member).kind != NodeKind::MemberExpr {
        return None;
    }
    let property = model.child_by_role(member, Role::Property)?;
    model.node(property).name()
}

/// Name of the function a call invokes: the identifier or the last member segment.
pub(crate) fn callee_name(model: &SourceModel, call: NodeId) -> Option<&str> {
    let callee = model.child_by_role(call, Role::Callee)?;
    let node = model.node(callee);
    match node.kind {
        NodeKind::Identifier => node.name(),
        NodeKind::MemberExpr => property_name(model, callee),
        _ => None,
    }
}

/// Full dotted callee path of a call (`Math.random`).
pub(crate) fn callee_path(model: &SourceModel, call: NodeId) -> Option<String> {
    let callee = model.child_by_role(call, Role::Callee)?;
    member_path(model, callee)
}

/// Receiver of a method call.
pub(crate) fn call_receiver(model: &SourceModel, call: NodeId) -> Option<NodeId> {
    let callee = model.child_by_role(call, Role::Callee)?;
    if model.node(callee).kind != NodeKind::MemberExpr {
        return None;
    }
    model.child_by_role(callee, Role::Object)
}

/// Argument expressions of a call or `new` expression.
pub(crate) fn call_arguments(model: &SourceModel, call: NodeId) -> Vec<NodeId> {
    model
        .child_by_role(call, Role::Arguments)
        .map(|args| model.code_children(args).collect())
        .unwrap_or_default()
}

/// Name written by an assignment target: identifier, member property or string key.
pub(crate) fn target_name(model: &SourceModel, target: NodeId) -> Option<String> {
    let node = model.node(target);
    match node.kind {
        NodeKind::Identifier | NodeKind::PropertyName => node.name().map(str::to_string),
        NodeKind::MemberExpr => property_name(model, target).map(str::to_string),
        NodeKind::SubscriptExpr => {
            let index = model.child_by_role(target, Role::Property)?;
            let index = model.node(index);
            if index.is_string_literal() {
                index.value().map(str::to_string)
            } else {
                None
            }
        }
        NodeKind::Literal if node.is_string_literal() => node.value().map(str::to_string),
        _ => None,
    }
}

/// Statements directly inside a block-like node.
pub(crate) fn statements(model: &SourceModel, container: NodeId) -> Vec<NodeId> {
    model
        .code_children(container)
        .filter(|c| model.node(*c).role != Some(Role::Value))
        .collect()
}

/// Pre-order walk below `id` that does not enter nested functions.
pub(crate) fn descendants_in_function(model: &SourceModel, id: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack: Vec<NodeId> = model.children(id).collect();
    stack.reverse();
    while let Some(current) = stack.pop() {
        out.push(current);
        if is_function(model, current) {
            continue;
        }
        let len = stack.len();
        stack.extend(model.children(current));
        stack[len..].reverse();
    }
    out
}

/// Nearest loop enclosing `id`, stopping at function boundaries.
pub(crate) fn enclosing_loop(model: &SourceModel, id: NodeId) -> Option<NodeId> {
    for ancestor in model.ancestors(id) {
        let kind = model.node(ancestor).kind;
        if kind == NodeKind::FunctionDecl {
            return None;
        }
        if kind.is_loop() {
            return Some(ancestor);
        }
    }
    None
}

/// Returns the enclosing loop whose body contains `id`, within the same
/// function. Functions in a loop header are not part of any iteration body.
pub(crate) fn enclosing_loop_body(model: &SourceModel, id: NodeId) -> Option<NodeId> {
    let mut child = id;
    for ancestor in model.ancestors(id) {
        let kind = model.node(ancestor).kind;
        if kind == NodeKind::FunctionDecl {
            return None;
        }
        if kind.is_loop() && model.node(child).role == Some(Role::Body) {
            return Some(ancestor);
        }
        child = ancestor;
    }
    None
}

/// Labeled statement named by a `break label;`/`continue label;`, if any.
pub(crate) fn jump_label_target(model: &SourceModel, jump: NodeId) -> Option<NodeId> {
    let label = model.child_by_role(jump, Role::Name)?;
    let label = model.text(label);
    model
        .ancestors(jump)
        .take_while(|a| model.node(*a).kind != NodeKind::FunctionDecl)
        .find(|a| {
            model.node(*a).attr(Attr::Raw) == Some("labeled_statement")
                && model
                    .child_by_role(*a, Role::Name)
                    .map(|name| model.text(name) == label)
                    .unwrap_or(false)
        })
}

/// Returns true if `id` sits in the body of a `try` that has a `catch`
/// clause, within the same function.
pub(crate) fn is_in_try_with_catch(model: &SourceModel, id: NodeId) -> bool {
    let mut child = id;
    for ancestor in model.ancestors(id) {
        let node = model.node(ancestor);
        if node.kind == NodeKind::FunctionDecl {
            return false;
        }
        if node.kind == NodeKind::TryBlock
            && model.node(child).role == Some(Role::Body)
            && model.child_by_role(ancestor, Role::Handler).is_some()
        {
            return true;
        }
        child = ancestor;
    }
    false
}

/// Returns true for `null` and `undefined`.
pub(crate) fn is_null_like(model: &SourceModel, id: NodeId) -> bool {
    let node = model.node(id);
    match node.kind {
        NodeKind::Literal => node.literal_kind() == Some(LiteralKind::Null),
        NodeKind::Identifier => node.name() == Some("undefined"),
        _ => false,
    }
}

/// Returns true for the literal `true`.
pub(crate) fn is_true_literal(model: &SourceModel, id: NodeId) -> bool {
    let node = model.node(id);
    node.kind == NodeKind::Literal
        && node.literal_kind() == Some(LiteralKind::Boolean)
        && node.value() == Some("true")
}

/// A variable that drives a loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LoopVariable {
    pub name: String,
    /// Resolved binding; `None` for undeclared globals.
    pub binding: Option<BindingId>,
}

/// Variables declared in a loop header or updated by it.
///
/// `for` loops contribute their initializer declarations and update
/// targets; `for-in`/`for-of` their left side; `while` loops the condition
/// variables the body writes.
pub(crate) fn loop_variables(model: &SourceModel, loop_id: NodeId) -> Vec<LoopVariable> {
    let mut vars: Vec<LoopVariable> = Vec::new();
    let push = |ident: NodeId, vars: &mut Vec<LoopVariable>| {
        let Some(name) = model.node(ident).name() else {
            return;
        };
        if vars.iter().any(|v| v.name == name) {
            return;
        }
        vars.push(LoopVariable {
            name: name.to_string(),
            binding: model.binding_of(ident),
        });
    };

    match model.node(loop_id).kind {
        NodeKind::ForLoop => {
            for role in [Role::Init, Role::Update] {
                let Some(part) = model.child_by_role(loop_id, role) else {
                    continue;
                };
                for id in std::iter::once(part).chain(model.descendants(part)) {
                    if model.node(id).kind != NodeKind::Identifier {
                        continue;
                    }
                    let declared = model.declared_binding(id).is_some();
                    let written = model
                        .binding_of(id)
                        .map(|b| {
                            model
                                .binding(b)
                                .references
                                .iter()
                                .any(|r| r.node == id && r.access != Access::Read)
                        })
                        .unwrap_or(false);
                    let unresolved_write = model.binding_of(id).is_none() && is_write_site(model, id);
                    if declared || written || unresolved_write {
                        push(id, &mut vars);
                    }
                }
            }
        }
        NodeKind::ForInLoop => {
            if let Some(left) = model.child_by_role(loop_id, Role::Left) {
                for id in std::iter::once(left).chain(model.descendants(left)) {
                    if model.node(id).kind == NodeKind::Identifier {
                        push(id, &mut vars);
                    }
                }
            }
        }
        NodeKind::WhileLoop | NodeKind::DoWhileLoop => {
            let Some(condition) = model.child_by_role(loop_id, Role::Condition) else {
                return vars;
            };
            for id in std::iter::once(condition).chain(model.descendants(condition)) {
                let Some(binding) = model.resolve(id).binding() else {
                    continue;
                };
                let written_in_loop = model.binding(binding).references.iter().any(|r| {
                    r.access != Access::Read && model.is_within(r.node, loop_id)
                });
                if written_in_loop {
                    push(id, &mut vars);
                }
            }
        }
        _ => {}
    }
    vars
}

/// Syntactic write check for identifiers with no binding.
fn is_write_site(model: &SourceModel, id: NodeId) -> bool {
    let Some(parent) = model.parent(id) else {
        return false;
    };
    match model.node(parent).kind {
        NodeKind::UpdateExpr => true,
        NodeKind::AssignExpr => model.node(id).role == Some(Role::Left),
        _ => false,
    }
}

/// Returns true if an identifier refers to one of the loop variables.
pub(crate) fn refers_to_loop_variable(
    model: &SourceModel,
    ident: NodeId,
    vars: &[LoopVariable],
) -> bool {
    let node = model.node(ident);
    if node.kind != NodeKind::Identifier {
        return false;
    }
    match model.binding_of(ident) {
        Some(binding) => vars.iter().any(|v| v.binding == Some(binding)),
        None => vars
            .iter()
            .any(|v| v.binding.is_none() && node.name() == Some(v.name.as_str())),
    }
}

/// Function node a binding names, for function declarations and
/// variables initialized with a function value.
pub(crate) fn bound_function(model: &SourceModel, binding: BindingId) -> Option<NodeId> {
    let binding = model.binding(binding);
    match binding.kind {
        BindingKind::Function => Some(binding.declarator),
        BindingKind::Variable => binding.init.filter(|init| is_function(model, *init)),
        _ => None,
    }
}

/// Returns true if an expression may carry external input into a sink.
///
/// Input-shaped names (parameters included) and known input sources are
/// tainted; a sanitizer call anywhere on the path clears the taint.
pub(crate) fn is_tainted(model: &SourceModel, id: NodeId) -> bool {
    tainted_at_depth(model, id, 0)
}

const MAX_TAINT_DEPTH: usize = 6;

fn tainted_at_depth(model: &SourceModel, id: NodeId, depth: usize) -> bool {
    if depth > MAX_TAINT_DEPTH {
        return false;
    }
    let node = model.node(id);
    let next = depth + 1;
    match node.kind {
        NodeKind::Identifier => {
            let name = node.name().unwrap_or("");
            match model.resolve(id).binding().map(|b| model.binding(b)) {
                Some(binding) => match binding.kind {
                    BindingKind::Variable => match binding.init {
                        Some(init) => tainted_at_depth(model, init, next),
                        None => is_input_name(name),
                    },
                    BindingKind::Function | BindingKind::Class => false,
                    _ => is_input_name(name),
                },
                None => is_input_name(name),
            }
        }
        NodeKind::MemberExpr => {
            if let Some(path) = member_path(model, id) {
                let is_source = INPUT_SOURCES.iter().any(|source| {
                    path == *source
                        || path
                            .strip_prefix(source)
                            .map(|rest| rest.starts_with('.'))
                            .unwrap_or(false)
                });
                if is_source {
                    return true;
                }
            }
            if property_name(model, id) == Some("value") {
                return true;
            }
            model
                .child_by_role(id, Role::Object)
                .map(|object| tainted_at_depth(model, object, next))
                .unwrap_or(false)
        }
        NodeKind::SubscriptExpr => model
            .child_by_role(id, Role::Object)
            .map(|object| tainted_at_depth(model, object, next))
            .unwrap_or(false),
        NodeKind::CallExpr => {
            if callee_name(model, id).map(is_sanitizer).unwrap_or(false) {
                return false;
            }
            if let Some(receiver) = call_receiver(model, id) {
                if tainted_at_depth(model, receiver, next) {
                    return true;
                }
            }
            call_arguments(model, id)
                .into_iter()
                .any(|arg| tainted_at_depth(model, arg, next))
        }
        NodeKind::BinaryExpr
        | NodeKind::LogicalExpr
        | NodeKind::TemplateString
        | NodeKind::SequenceExpr
        | NodeKind::ArrayExpr
        | NodeKind::AwaitExpr
        | NodeKind::SpreadElement => model
            .code_children(id)
            .any(|child| tainted_at_depth(model, child, next)),
        NodeKind::TernaryExpr => [Role::Consequence, Role::Alternative]
            .into_iter()
            .filter_map(|role| model.child_by_role(id, role))
            .any(|branch| tainted_at_depth(model, branch, next)),
        _ => false,
    }
}

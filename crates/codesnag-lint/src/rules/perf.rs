//! Performance heuristics.
//!
//! These checks have no standardized rule key; they report under a
//! project-local id and are marked non-standard in the registry.

use crate::report::{Finding, Severity};
use crate::rules::helpers::{call_receiver, callee_name, callee_path, enclosing_loop};
use crate::rules::{Rule, RuleContext};
use codesnag_model::{BindingId, NodeId, NodeKind, SourceModel};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Returns all performance rules.
pub fn all_rules() -> Vec<Arc<dyn Rule>> {
    vec![Arc::new(UnbatchedMutationRule)]
}

/// Methods that each trigger a layout or a round trip on the receiver.
const MUTATION_METHODS: &[&str] = &[
    "appendChild",
    "insertBefore",
    "append",
    "prepend",
    "replaceChild",
    "removeChild",
    "insertAdjacentElement",
    "insertAdjacentHTML",
    "before",
    "after",
    "replaceWith",
];

// ============================================================================
// PERF001: Unbatched bulk mutation
// ============================================================================

/// Detects single-item mutations of an outside resource repeated by a loop.
pub struct UnbatchedMutationRule;

impl UnbatchedMutationRule {
    /// Returns true if the binding holds a batching container.
    fn is_batch(model: &SourceModel, binding: BindingId) -> bool {
        let Some(init) = model.binding(binding).init else {
            return false;
        };
        match model.node(init).kind {
            NodeKind::CallExpr => {
                callee_path(model, init).as_deref() == Some("document.createDocumentFragment")
            }
            NodeKind::NewExpr => callee_name(model, init) == Some("DocumentFragment"),
            _ => false,
        }
    }
}

impl Rule for UnbatchedMutationRule {
    fn id(&self) -> &'static str {
        "PERF001"
    }

    fn title(&self) -> &'static str {
        "Bulk mutations of a shared resource should be batched"
    }

    fn severity(&self) -> Severity {
        Severity::Bug
    }

    fn standard(&self) -> bool {
        false
    }

    fn inspect(&self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let model = ctx.model;
        // (loop, receiver binding) -> mutation calls, first one reported
        let mut hits: BTreeMap<(NodeId, BindingId), Vec<NodeId>> = BTreeMap::new();

        for call in model.nodes_of_kind(NodeKind::CallExpr) {
            if ctx.is_cancelled() {
                break;
            }
            let Some(method) = callee_name(model, call) else {
                continue;
            };
            if !MUTATION_METHODS.contains(&method) {
                continue;
            }
            let Some(loop_id) = enclosing_loop(model, call) else {
                continue;
            };
            let Some(receiver) = call_receiver(model, call) else {
                continue;
            };
            let Some(binding) = model.resolve(receiver).binding() else {
                continue;
            };
            let declared_outside = !model.is_within(model.binding(binding).declaration, loop_id);
            if declared_outside && !Self::is_batch(model, binding) {
                hits.entry((loop_id, binding)).or_default().push(call);
            }
        }

        hits.into_iter()
            .map(|((loop_id, binding), calls)| {
                let name = &model.binding(binding).name;
                let mut finding = ctx.finding(
                    self,
                    calls[0],
                    format!(
                        "Collect these changes in a DocumentFragment and apply them to '{name}' once after the loop."
                    ),
                );
                finding = finding.with_secondary_note(model.node(loop_id).span, "repeated by this loop");
                for extra in &calls[1..] {
                    finding = finding.with_secondary(model.node(*extra).span);
                }
                finding
            })
            .collect()
    }
}

//! tree-sitter frontend.
//!
//! Parsing happens in three steps:
//! 1. tree-sitter builds a concrete syntax tree; any error or missing node
//!    aborts with [`ParseError::Syntax`]
//! 2. [`lower`] flattens the tree into the node arena
//! 3. [`resolve`] builds scopes and binds every identifier

mod lower;
mod resolve;

use crate::error::ParseError;
use crate::model::SourceModel;
use crate::span::Span;
use tracing::debug;
use tree_sitter::{Node as TsNode, Parser};

/// Longest source excerpt quoted in a syntax error message.
const ERROR_EXCERPT_LEN: usize = 24;

pub(crate) fn parse(file: String, source: String) -> Result<SourceModel, ParseError> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_javascript::language())
        .map_err(|e| ParseError::Language {
            message: e.to_string(),
        })?;

    let tree = parser
        .parse(&source, None)
        .ok_or_else(|| ParseError::Language {
            message: "parser returned no tree".to_string(),
        })?;

    let root = tree.root_node();
    if root.has_error() {
        let (span, message) = first_error(root, &source);
        return Err(ParseError::Syntax {
            file,
            span,
            message,
        });
    }

    let nodes = lower::lower(&source, root);
    let tables = resolve::resolve(&nodes);
    debug!(
        file = %file,
        nodes = nodes.len(),
        scopes = tables.scopes.len(),
        bindings = tables.bindings.len(),
        "built source model"
    );

    Ok(SourceModel::from_parts(file, source, nodes, tables))
}

pub(crate) fn span_of(node: TsNode<'_>) -> Span {
    let start = node.start_position();
    let end = node.end_position();
    Span::new(
        node.start_byte(),
        node.end_byte(),
        start.row + 1,
        start.column + 1,
        end.row + 1,
        end.column + 1,
    )
}

/// Finds the first error or missing node in pre-order.
fn first_error(root: TsNode<'_>, source: &str) -> (Span, String) {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_missing() {
            return (span_of(node), format!("missing `{}`", node.kind()));
        }
        if node.is_error() {
            let text = source.get(node.start_byte()..node.end_byte()).unwrap_or("");
            let excerpt: String = text.chars().take(ERROR_EXCERPT_LEN).collect();
            let message = if excerpt.trim().is_empty() {
                "unexpected end of input".to_string()
            } else {
                format!("unexpected `{}`", excerpt.trim())
            };
            return (span_of(node), message);
        }
        if node.has_error() {
            let mut cursor = node.walk();
            let children: Vec<TsNode<'_>> = node.children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
    }
    (span_of(root), "invalid syntax".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_reports_span() {
        let err = parse("bad.js".to_string(), "const x = ;\nlet y = 2;\n".to_string())
            .unwrap_err();
        assert_eq!(err.code(), "P001");
        let span = err.span().unwrap();
        assert_eq!(span.line, 1);
        match err {
            ParseError::Syntax { file, .. } => assert_eq!(file, "bad.js"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unclosed_block_is_rejected() {
        let result = parse("bad.js".to_string(), "function f() {\n  return 1;\n".to_string());
        assert!(result.is_err());
    }

    #[test]
    fn test_valid_source_builds_model() {
        let model = parse("ok.js".to_string(), "let a = 1;\n".to_string()).unwrap();
        assert_eq!(model.file(), "ok.js");
        assert!(!model.is_empty());
    }
}

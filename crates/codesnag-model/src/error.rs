//! Error types for building a source model.

use crate::span::Span;
use thiserror::Error;

/// Errors raised while turning source text into a [`SourceModel`](crate::SourceModel).
///
/// A parse error aborts analysis of that unit only; callers analyzing several
/// files keep going with the rest.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// P001: The source text is not valid JavaScript.
    #[error("P001: syntax error in {file} at {}:{}: {message}", span.line, span.column)]
    Syntax {
        file: String,
        span: Span,
        message: String,
    },

    /// P002: The grammar could not be loaded into the parser.
    #[error("P002: failed to initialize parser: {message}")]
    Language { message: String },
}

impl ParseError {
    /// Returns the error code (e.g., "P001").
    pub fn code(&self) -> &'static str {
        match self {
            ParseError::Syntax { .. } => "P001",
            ParseError::Language { .. } => "P002",
        }
    }

    /// Returns the offending span, if the error points at source text.
    pub fn span(&self) -> Option<Span> {
        match self {
            ParseError::Syntax { span, .. } => Some(*span),
            ParseError::Language { .. } => None,
        }
    }
}

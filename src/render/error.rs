//! Render error types
//!
//! A render error is fatal for the subtree that raised it and nothing else:
//! the dispatcher swaps the subtree for an [`ErrorCard`] and keeps going.

use serde::Serialize;
use thiserror::Error;

/// Errors raised while decoding or mounting a render instruction
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// Leaf has no `type` tag
    #[error("Element has no type tag")]
    MissingType,

    /// Leaf `type` is not a known element kind
    #[error("Unrecognized element type: {0}")]
    UnknownElementType(String),

    /// Known kind, but the body does not match its shape
    #[error("Invalid {kind} element: {message}")]
    InvalidElement { kind: String, message: String },

    /// JSON text inside an element could not be parsed
    #[error("Malformed JSON: {message}\n{context}")]
    MalformedJson { message: String, context: String },

    /// Delta path does not address a slot in the tree
    #[error("Invalid delta path {0:?}")]
    InvalidPath(Vec<usize>),
}

/// Result type alias for render operations
pub type RenderResult<T> = Result<T, RenderError>;

/// Inline replacement for a subtree that failed to render
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorCard {
    pub title: String,
    pub message: String,
}

impl From<&RenderError> for ErrorCard {
    fn from(err: &RenderError) -> Self {
        let title = match err {
            RenderError::MissingType | RenderError::UnknownElementType(_) => "Protocol error",
            RenderError::InvalidElement { .. } => "Invalid element",
            RenderError::MalformedJson { .. } => "JSON parse error",
            RenderError::InvalidPath(_) => "Invalid delta",
        };
        Self {
            title: title.to_string(),
            message: err.to_string(),
        }
    }
}

/// Characters of source shown on each side of a JSON parse error
const CONTEXT_RADIUS: usize = 20;

/// Parse JSON text, attaching the text surrounding any error
pub fn parse_json_text(text: &str) -> RenderResult<serde_json::Value> {
    serde_json::from_str(text).map_err(|e| RenderError::MalformedJson {
        message: e.to_string(),
        context: error_context(text, e.line(), e.column()),
    })
}

fn error_context(text: &str, line: usize, column: usize) -> String {
    let Some(source_line) = text.lines().nth(line.saturating_sub(1)) else {
        return String::new();
    };

    let chars: Vec<char> = source_line.chars().collect();
    let at = column.saturating_sub(1).min(chars.len());
    let start = at.saturating_sub(CONTEXT_RADIUS);
    let end = (at + CONTEXT_RADIUS).min(chars.len());

    let snippet: String = chars[start..end].iter().collect();
    let caret = " ".repeat(at - start);
    format!("{}\n{}^", snippet, caret)
}

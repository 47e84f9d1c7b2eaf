use thiserror::Error;

use crate::parser_error::ParserError;

#[derive(Debug, Error)]
pub enum CompileError {
    /// The source did not parse; the generator never ran.
    #[error(transparent)]
    Parse(#[from] ParserError),

    /// A node that's valid but appeared in a position the generator cannot
    /// lower, e.g. `key: value` outside an argument list.
    #[error("compile error: {node_type} '{name}': {reason}. Line: {line}")]
    InvalidPosition {
        node_type: String,
        name: String,
        reason: String,
        line: usize,
    },

    #[error("compile error: cannot encode instruction sets: {0}")]
    Encode(#[source] postcard::Error),

    #[error("compile error: cannot decode instruction sets: {0}")]
    Decode(#[source] postcard::Error),

    /// Internal generator error (shouldn't happen in normal use)
    #[error("compile error: internal error: {0}")]
    Internal(String),
}

impl CompileError {
    /// Create an error for a keyword pair outside a call's arguments
    pub fn pair_outside_arguments(key: &str, line: usize) -> Self {
        CompileError::InvalidPosition {
            node_type: "pair".to_string(),
            name: key.to_string(),
            reason: "keyword pairs can only appear in argument lists".to_string(),
            line,
        }
    }

    /// The parse error behind this failure, if any.
    pub fn parser_error(&self) -> Option<&ParserError> {
        match self {
            CompileError::Parse(err) => Some(err),
            _ => None,
        }
    }
}

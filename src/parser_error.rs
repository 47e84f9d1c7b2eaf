use thiserror::Error;

use crate::ast::ArgKind;

/// Category of a parse failure.
///
/// `EndOfFile` and `UnexpectedEnd` mean the input stopped early; an
/// interactive host can read more lines and retry instead of reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserErrorKind {
    EndOfFile,
    UnexpectedToken,
    UnexpectedEnd,
    MethodDefinition,
    InvalidAssignment,
    Argument,
    Syntax,
    TypeParsing,
}

/// The first error met while parsing. Messages end with `Line: N`.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ParserError {
    pub kind: ParserErrorKind,
    pub message: String,
    pub line: usize,
}

impl ParserError {
    pub fn new(kind: ParserErrorKind, message: impl Into<String>, line: usize) -> Self {
        ParserError {
            kind,
            message: message.into(),
            line,
        }
    }

    pub fn is_eof(&self) -> bool {
        self.kind == ParserErrorKind::EndOfFile
    }

    pub fn is_unexpected_end(&self) -> bool {
        self.kind == ParserErrorKind::UnexpectedEnd
    }

    /// Parameter ordering violation, e.g. a normal argument after an optioned one.
    pub fn argument_order(
        current: ArgKind,
        previous: ArgKind,
        name: &str,
        line: usize,
    ) -> Self {
        ParserError::new(
            ParserErrorKind::Argument,
            format!(
                "{} \"{}\" should be defined before {}. Line: {}",
                current.describe(),
                name,
                previous.describe(),
                line
            ),
            line,
        )
    }

    pub fn type_parsing(literal: &str, target: &str, line: usize) -> Self {
        ParserError::new(
            ParserErrorKind::TypeParsing,
            format!("could not parse {:?} as {}. Line: {}", literal, target, line),
            line,
        )
    }
}

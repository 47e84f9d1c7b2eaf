mod expression;
mod program;
mod statement;

pub use expression::{
    AssignExpression, CallExpression, ConditionalExpression, Expression, ExpressionKind,
    IfExpression,
};
pub(crate) use expression::escape;
pub use program::Program;
pub use statement::{
    BlockStatement, ClassStatement, DefStatement, ExpressionStatement, ModuleStatement,
    ReturnStatement, Statement, WhileStatement,
};

use serde::{Deserialize, Serialize};

use crate::token::Token;

/// Shape of a method parameter, in the order they must be declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArgKind {
    Normal = 0,
    Optioned = 1,
    Splat = 2,
    RequiredKeyword = 3,
    OptionalKeyword = 4,
}

impl ArgKind {
    pub fn describe(self) -> &'static str {
        match self {
            ArgKind::Normal => "Normal argument",
            ArgKind::Optioned => "Optioned argument",
            ArgKind::Splat => "Splat argument",
            ArgKind::RequiredKeyword => "Keyword argument",
            ArgKind::OptionalKeyword => "Optioned keyword argument",
        }
    }
}

/// Header shared by every node: the token it started at, and whether its
/// value is discarded (`is_statement`) or consumed by an enclosing construct.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseNode {
    pub token: Token,
    pub is_statement: bool,
}

impl BaseNode {
    pub fn new(token: Token) -> Self {
        BaseNode {
            token,
            is_statement: false,
        }
    }

    pub fn line(&self) -> usize {
        self.token.line
    }
}

/// Writes `items` separated by `sep`.
pub(crate) fn write_joined<T: std::fmt::Display>(
    f: &mut std::fmt::Formatter<'_>,
    items: &[T],
    sep: &str,
) -> std::fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, "{}", sep)?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

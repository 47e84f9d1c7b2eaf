use std::collections::HashMap;
use std::fmt;

use super::{ArgKind, BaseNode, BlockStatement, write_joined};
use crate::token::Token;

#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub base: BaseNode,
    pub kind: ExpressionKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    // Literals
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Nil,

    // Variables
    Identifier(String),
    Constant { name: String, is_namespace: bool },
    InstanceVariable(String),
    SelfRef,
    GetBlock,

    // Composites
    Array(Vec<Expression>),
    /// Key order is not preserved.
    Hash(HashMap<String, Expression>),
    /// `key: value` in a call's arguments, or `key:` / `key: default` in a
    /// method's parameters.
    Pair {
        key: String,
        value: Option<Box<Expression>>,
    },

    // Operators
    Prefix {
        operator: String,
        right: Box<Expression>,
    },
    Infix {
        left: Box<Expression>,
        operator: String,
        right: Box<Expression>,
    },
    Range {
        start: Box<Expression>,
        end: Box<Expression>,
    },

    Assign(AssignExpression),
    If(IfExpression),
    Call(CallExpression),
    Yield(Vec<Expression>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignExpression {
    pub variables: Vec<Expression>,
    pub value: Box<Expression>,
    /// Set to 1 on default-valued method parameters.
    pub optioned: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalExpression {
    pub base: BaseNode,
    pub condition: Box<Expression>,
    pub consequence: BlockStatement,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfExpression {
    pub conditionals: Vec<ConditionalExpression>,
    pub alternative: Option<BlockStatement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallExpression {
    pub receiver: Box<Expression>,
    pub method: String,
    pub arguments: Vec<Expression>,
    pub block: Option<BlockStatement>,
    pub block_arguments: Vec<String>,
}

impl Expression {
    pub fn new(token: Token, kind: ExpressionKind) -> Self {
        Expression {
            base: BaseNode::new(token),
            kind,
        }
    }

    pub fn line(&self) -> usize {
        self.base.line()
    }

    pub fn is_statement(&self) -> bool {
        self.base.is_statement
    }

    pub fn is_expression(&self) -> bool {
        !self.base.is_statement
    }

    pub fn mark_as_statement(&mut self) {
        self.base.is_statement = true;
    }

    pub fn mark_as_expression(&mut self) {
        self.base.is_statement = false;
    }

    /// True for nodes that can appear on the left of `=`.
    pub fn is_variable(&self) -> bool {
        matches!(
            self.kind,
            ExpressionKind::Identifier(_)
                | ExpressionKind::InstanceVariable(_)
                | ExpressionKind::Constant { .. }
        )
    }

    /// Classifies a method parameter; `None` for shapes a parameter list
    /// cannot hold.
    pub fn arg_kind(&self) -> Option<ArgKind> {
        match &self.kind {
            ExpressionKind::Identifier(_) => Some(ArgKind::Normal),
            ExpressionKind::Assign(_) => Some(ArgKind::Optioned),
            ExpressionKind::Pair { value: None, .. } => Some(ArgKind::RequiredKeyword),
            ExpressionKind::Pair { value: Some(_), .. } => Some(ArgKind::OptionalKeyword),
            ExpressionKind::Prefix { operator, .. } if operator == "*" => Some(ArgKind::Splat),
            _ => None,
        }
    }

    /// Name bound by a method parameter, whatever its form.
    pub fn parameter_name(&self) -> Option<&str> {
        match &self.kind {
            ExpressionKind::Identifier(name) => Some(name),
            ExpressionKind::Pair { key, .. } => Some(key),
            ExpressionKind::Assign(assign) => {
                assign.variables.first().and_then(|v| v.parameter_name())
            }
            ExpressionKind::Prefix { operator, right } if operator == "*" => {
                right.parameter_name()
            }
            _ => None,
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExpressionKind::Integer(value) => write!(f, "{}", value),
            ExpressionKind::Float(_) => write!(f, "{}", self.base.token.literal),
            ExpressionKind::String(value) => write!(f, "\"{}\"", escape(value)),
            ExpressionKind::Boolean(value) => write!(f, "{}", value),
            ExpressionKind::Nil => write!(f, "nil"),
            ExpressionKind::Identifier(name) | ExpressionKind::InstanceVariable(name) => {
                write!(f, "{}", name)
            }
            ExpressionKind::Constant { name, .. } => write!(f, "{}", name),
            ExpressionKind::SelfRef => write!(f, "self"),
            ExpressionKind::GetBlock => write!(f, "get_block"),
            ExpressionKind::Array(elements) => {
                write!(f, "[")?;
                write_joined(f, elements, ", ")?;
                write!(f, "]")
            }
            ExpressionKind::Hash(pairs) => {
                if pairs.is_empty() {
                    return write!(f, "{{}}");
                }
                let mut keys: Vec<&String> = pairs.keys().collect();
                keys.sort();
                write!(f, "{{ ")?;
                for (i, key) in keys.into_iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, pairs[key])?;
                }
                write!(f, " }}")
            }
            ExpressionKind::Pair { key, value } => match value {
                Some(value) => write!(f, "{}: {}", key, value),
                None => write!(f, "{}:", key),
            },
            // splat stays bare so it still reads as a parameter
            ExpressionKind::Prefix { operator, right } if operator == "*" => {
                write!(f, "*{}", right)
            }
            ExpressionKind::Prefix { operator, right } => write!(f, "({}{})", operator, right),
            ExpressionKind::Infix {
                left,
                operator,
                right,
            } => {
                if operator == "::" {
                    write!(f, "{}::{}", left, right)
                } else {
                    write!(f, "({} {} {})", left, operator, right)
                }
            }
            ExpressionKind::Range { start, end } => write!(f, "({}..{})", start, end),
            ExpressionKind::Assign(assign) => {
                write_joined(f, &assign.variables, ", ")?;
                write!(f, " = {}", assign.value)
            }
            ExpressionKind::If(if_expression) => write!(f, "{}", if_expression),
            ExpressionKind::Call(call) => write!(f, "{}", call),
            ExpressionKind::Yield(arguments) => {
                write!(f, "yield(")?;
                write_joined(f, arguments, ", ")?;
                write!(f, ")")
            }
        }
    }
}

impl fmt::Display for IfExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, conditional) in self.conditionals.iter().enumerate() {
            let keyword = if i == 0 { "if" } else { "elsif" };
            write!(f, "{} {}\n", keyword, conditional.condition)?;
            write_block(f, &conditional.consequence)?;
        }
        if let Some(alternative) = &self.alternative {
            write!(f, "else\n")?;
            write_block(f, alternative)?;
        }
        write!(f, "end")
    }
}

impl fmt::Display for CallExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.method.as_str() {
            "[]" => {
                write!(f, "{}[", self.receiver)?;
                write_joined(f, &self.arguments, ", ")?;
                write!(f, "]")?;
            }
            "[]=" => {
                let (value, index) = match self.arguments.split_last() {
                    Some((value, index)) => (Some(value), index),
                    None => (None, &self.arguments[..]),
                };
                write!(f, "{}[", self.receiver)?;
                write_joined(f, index, ", ")?;
                write!(f, "]")?;
                if let Some(value) = value {
                    write!(f, " = {}", value)?;
                }
            }
            setter if setter.ends_with('=') && self.arguments.len() == 1 => {
                let name = &setter[..setter.len() - 1];
                write!(f, "{}.{} = {}", self.receiver, name, self.arguments[0])?;
            }
            method => {
                write!(f, "{}.{}(", self.receiver, method)?;
                write_joined(f, &self.arguments, ", ")?;
                write!(f, ")")?;
            }
        }

        if let Some(block) = &self.block {
            write!(f, " do")?;
            if !self.block_arguments.is_empty() {
                write!(f, " |{}|", self.block_arguments.join(", "))?;
            }
            write!(f, "\n")?;
            write_block(f, block)?;
            write!(f, "end")?;
        }
        Ok(())
    }
}

/// Writes a block body followed by a newline, or nothing when it is empty.
pub(crate) fn write_block(f: &mut fmt::Formatter<'_>, block: &BlockStatement) -> fmt::Result {
    if block.statements.is_empty() {
        return Ok(());
    }
    writeln!(f, "{}", block)
}

/// Escapes a string so it prints on one line inside double quotes.
pub(crate) fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\x0b' => out.push_str("\\v"),
            '\x0c' => out.push_str("\\f"),
            c => out.push(c),
        }
    }
    out
}

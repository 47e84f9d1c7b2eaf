use std::fmt;

use super::expression::write_block;
use super::{BaseNode, Expression, ExpressionKind, write_joined};

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Expression(ExpressionStatement),
    Return(ReturnStatement),
    Def(DefStatement),
    Class(ClassStatement),
    Module(ModuleStatement),
    While(WhileStatement),
    Next(BaseNode),
    Break(BaseNode),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionStatement {
    pub base: BaseNode,
    pub expression: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStatement {
    pub base: BaseNode,
    pub value: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DefStatement {
    pub base: BaseNode,
    pub name: String,
    /// `self`, a constant, an identifier or an instance variable for `def x.name`.
    pub receiver: Option<Expression>,
    pub parameters: Vec<Expression>,
    pub body: BlockStatement,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassStatement {
    pub base: BaseNode,
    pub name: String,
    pub body: BlockStatement,
    pub super_class: Option<Expression>,
    /// Rightmost constant of `super_class`, so `A::B` gives `B`.
    pub super_class_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleStatement {
    pub base: BaseNode,
    pub name: String,
    pub body: BlockStatement,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStatement {
    pub base: BaseNode,
    pub condition: Expression,
    pub body: BlockStatement,
}

/// Ordered statements of a method, class, branch or block body.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockStatement {
    pub base: BaseNode,
    pub statements: Vec<Statement>,
    /// The body's value is its last expression, which must stay on the stack.
    pub keep_last_value: bool,
}

impl Statement {
    pub fn base(&self) -> &BaseNode {
        match self {
            Statement::Expression(s) => &s.base,
            Statement::Return(s) => &s.base,
            Statement::Def(s) => &s.base,
            Statement::Class(s) => &s.base,
            Statement::Module(s) => &s.base,
            Statement::While(s) => &s.base,
            Statement::Next(base) | Statement::Break(base) => base,
        }
    }

    pub fn line(&self) -> usize {
        self.base().line()
    }

    /// The wrapped expression, if this is an expression statement.
    pub fn as_expression(&self) -> Option<&Expression> {
        match self {
            Statement::Expression(s) => Some(&s.expression),
            _ => None,
        }
    }
}

impl DefStatement {
    /// Index of the `*rest` parameter, if any.
    pub fn splat_parameter(&self) -> Option<usize> {
        self.parameters.iter().position(|p| {
            matches!(&p.kind, ExpressionKind::Prefix { operator, .. } if operator == "*")
        })
    }
}

impl BlockStatement {
    pub fn new(base: BaseNode) -> Self {
        BlockStatement {
            base,
            statements: Vec::new(),
            keep_last_value: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Marks the block as producing a value and flips its trailing
    /// expression statement back to an expression.
    pub fn set_keep_last_value(&mut self) {
        self.keep_last_value = true;
        if let Some(Statement::Expression(last)) = self.statements.last_mut() {
            last.expression.mark_as_expression();
        }
    }

    /// True when the last statement leaves a value on the stack.
    pub fn ends_with_value(&self) -> bool {
        matches!(
            self.statements.last(),
            Some(Statement::Expression(last)) if last.expression.is_expression()
        )
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Expression(s) => write!(f, "{}", s.expression),
            Statement::Return(s) => write!(f, "return {}", s.value),
            Statement::Def(s) => write!(f, "{}", s),
            Statement::Class(s) => {
                write!(f, "class {}", s.name)?;
                if let Some(super_class) = &s.super_class {
                    write!(f, " < {}", super_class)?;
                }
                write!(f, "\n")?;
                write_block(f, &s.body)?;
                write!(f, "end")
            }
            Statement::Module(s) => {
                write!(f, "module {}\n", s.name)?;
                write_block(f, &s.body)?;
                write!(f, "end")
            }
            Statement::While(s) => {
                write!(f, "while {} do\n", s.condition)?;
                write_block(f, &s.body)?;
                write!(f, "end")
            }
            Statement::Next(_) => write!(f, "next"),
            Statement::Break(_) => write!(f, "break"),
        }
    }
}

impl fmt::Display for DefStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "def ")?;
        if let Some(receiver) = &self.receiver {
            write!(f, "{}.", receiver)?;
        }
        write!(f, "{}(", self.name)?;
        write_joined(f, &self.parameters, ", ")?;
        write!(f, ")\n")?;
        write_block(f, &self.body)?;
        write!(f, "end")
    }
}

impl fmt::Display for BlockStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_joined(f, &self.statements, "\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Token, TokenType};

    fn ident(name: &str) -> Expression {
        Expression::new(
            Token::new(TokenType::Ident, name, 1),
            ExpressionKind::Identifier(name.to_string()),
        )
    }

    fn statement(expression: Expression) -> Statement {
        Statement::Expression(ExpressionStatement {
            base: expression.base.clone(),
            expression,
        })
    }

    #[test]
    fn test_keep_last_value_unmarks_trailing_statement() {
        let mut first = ident("a");
        first.mark_as_statement();
        let mut last = ident("b");
        last.mark_as_statement();

        let mut block = BlockStatement::new(BaseNode::new(Token::eof(1)));
        block.statements = vec![statement(first), statement(last)];
        assert!(!block.ends_with_value());

        block.set_keep_last_value();
        assert!(block.keep_last_value);
        assert!(block.ends_with_value());
        assert!(block.statements[0].as_expression().unwrap().is_statement());
    }

    #[test]
    fn test_def_display() {
        let mut body = BlockStatement::new(BaseNode::new(Token::eof(2)));
        body.statements.push(statement(ident("x")));
        let splat = Expression::new(
            Token::new(TokenType::Asterisk, "*", 1),
            ExpressionKind::Prefix {
                operator: "*".to_string(),
                right: Box::new(ident("rest")),
            },
        );
        let def = DefStatement {
            base: BaseNode::new(Token::new(TokenType::Def, "def", 1)),
            name: "foo".to_string(),
            receiver: None,
            parameters: vec![ident("x"), splat],
            body,
        };

        assert_eq!(def.to_string(), "def foo(x, *rest)\nx\nend");
        assert_eq!(def.splat_parameter(), Some(1));
    }
}

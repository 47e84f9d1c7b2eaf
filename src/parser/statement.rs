use super::{Event, Parser, ParserMode, Precedence};
use crate::ast::{
    ArgKind, BaseNode, BlockStatement, ClassStatement, DefStatement, Expression, ExpressionKind,
    ExpressionStatement, ModuleStatement, ReturnStatement, Statement, WhileStatement,
};
use crate::parser_error::{ParserError, ParserErrorKind};
use crate::token::TokenType;

impl Parser {
    /// Parses the statement starting at `cur`. A stray `;` yields `None`.
    pub(super) fn parse_statement(&mut self) -> Result<Option<Statement>, ParserError> {
        let statement = match self.cur.kind {
            TokenType::Return => Statement::Return(self.parse_return_statement()?),
            TokenType::Def => Statement::Def(self.parse_def_statement()?),
            TokenType::While => Statement::While(self.parse_while_statement()?),
            TokenType::Class => Statement::Class(self.parse_class_statement()?),
            TokenType::Module => Statement::Module(self.parse_module_statement()?),
            TokenType::Next => Statement::Next(BaseNode::new(self.cur.clone())),
            TokenType::Break => Statement::Break(BaseNode::new(self.cur.clone())),
            TokenType::Semicolon => return Ok(None),
            _ => {
                let mut statement = self.parse_expression_statement()?;
                if self.mode == ParserMode::Repl && self.block_depth == 0 {
                    statement.expression.mark_as_expression();
                } else {
                    statement.expression.mark_as_statement();
                }
                Statement::Expression(statement)
            }
        };
        Ok(Some(statement))
    }

    fn parse_expression_statement(&mut self) -> Result<ExpressionStatement, ParserError> {
        let token = self.cur.clone();
        // Identifiers start at the lowest level so `a, b = ...` reaches the
        // comma rule.
        let precedence = match token.kind {
            TokenType::Ident | TokenType::InstanceVariable => Precedence::Lowest,
            _ => Precedence::Normal,
        };
        let expression = self.parse_expression(precedence)?;

        Ok(ExpressionStatement {
            base: BaseNode::new(token),
            expression,
        })
    }

    /// `return` alone on its line (or before `;` / `end`) returns `nil`.
    fn parse_return_statement(&mut self) -> Result<ReturnStatement, ParserError> {
        let token = self.cur.clone();

        if !self.peek_at_same_line()
            || self.peek_is(TokenType::Semicolon)
            || self.peek_is(TokenType::End)
        {
            let value = Expression::new(token.clone(), ExpressionKind::Nil);
            return Ok(ReturnStatement {
                base: BaseNode::new(token),
                value,
            });
        }

        self.next_token();
        let value = self.parse_expression(Precedence::Normal)?;

        Ok(ReturnStatement {
            base: BaseNode::new(token),
            value,
        })
    }

    /// Statements up to (not including) one of `ends`. `cur` is the token
    /// that opens the block and ends on the terminator.
    pub(super) fn parse_block_statement(
        &mut self,
        ends: &[TokenType],
    ) -> Result<BlockStatement, ParserError> {
        let mut block = BlockStatement::new(BaseNode::new(self.cur.clone()));
        self.next_token();
        if self.cur_is(TokenType::Semicolon) {
            self.next_token();
        }

        self.block_depth += 1;
        let result = self.parse_block_body(&mut block, ends);
        self.block_depth -= 1;

        result.map(|_| block)
    }

    fn parse_block_body(
        &mut self,
        block: &mut BlockStatement,
        ends: &[TokenType],
    ) -> Result<(), ParserError> {
        loop {
            if ends.contains(&self.cur.kind) {
                return Ok(());
            }
            if self.cur_is(TokenType::Eof) {
                return Err(ParserError::new(
                    ParserErrorKind::EndOfFile,
                    "Unexpected EOF",
                    self.cur.line,
                ));
            }
            if let Some(statement) = self.parse_statement()? {
                block.statements.push(statement);
            }
            self.next_token();
        }
    }

    /// The condition is parsed with blocks disabled so its `do` opens the
    /// loop body rather than a block argument.
    fn parse_while_statement(&mut self) -> Result<WhileStatement, ParserError> {
        let token = self.cur.clone();
        self.next_token();

        self.accept_block = false;
        let prev = self.enter(Event::ParseFuncCall);
        let condition = self.parse_expression(Precedence::Normal);
        self.restore(prev);
        self.accept_block = true;
        let condition = condition?;

        self.expect_peek(TokenType::Do)?;
        let body = self.parse_block_statement(&[TokenType::End])?;

        Ok(WhileStatement {
            base: BaseNode::new(token),
            condition,
            body,
        })
    }

    fn parse_class_statement(&mut self) -> Result<ClassStatement, ParserError> {
        let token = self.cur.clone();
        self.expect_peek(TokenType::Constant)?;
        let name = self.cur.literal.clone();

        let mut super_class = None;
        let mut super_class_name = None;
        if self.peek_is(TokenType::Lt) {
            self.next_token();
            self.next_token();
            let expression = self.parse_expression(Precedence::Normal)?;
            let Some(constant) = rightmost_constant(&expression) else {
                return Err(ParserError::new(
                    ParserErrorKind::Syntax,
                    format!("Invalid super class {}. Line: {}", expression, self.cur.line),
                    self.cur.line,
                ));
            };
            super_class_name = Some(constant.to_string());
            super_class = Some(expression);
        }

        let body = self.parse_block_statement(&[TokenType::End])?;

        Ok(ClassStatement {
            base: BaseNode::new(token),
            name,
            body,
            super_class,
            super_class_name,
        })
    }

    fn parse_module_statement(&mut self) -> Result<ModuleStatement, ParserError> {
        let token = self.cur.clone();
        self.expect_peek(TokenType::Constant)?;
        let name = self.cur.literal.clone();
        let body = self.parse_block_statement(&[TokenType::End])?;

        Ok(ModuleStatement {
            base: BaseNode::new(token),
            name,
            body,
        })
    }

    /// `def name(params) ... end`, `def recv.name ...` and `def name=(v)`.
    fn parse_def_statement(&mut self) -> Result<DefStatement, ParserError> {
        let token = self.cur.clone();
        self.next_token();

        let mut receiver = None;
        if self.peek_is(TokenType::Dot) {
            let kind = match self.cur.kind {
                TokenType::Ident => ExpressionKind::Identifier(self.cur.literal.clone()),
                TokenType::InstanceVariable => {
                    ExpressionKind::InstanceVariable(self.cur.literal.clone())
                }
                TokenType::Constant => ExpressionKind::Constant {
                    name: self.cur.literal.clone(),
                    is_namespace: false,
                },
                TokenType::SelfKw => ExpressionKind::SelfRef,
                _ => {
                    return Err(ParserError::new(
                        ParserErrorKind::MethodDefinition,
                        format!(
                            "Invalid method receiver: {}. Line: {}",
                            self.cur.literal, self.cur.line
                        ),
                        self.cur.line,
                    ));
                }
            };
            receiver = Some(Expression::new(self.cur.clone(), kind));
            self.next_token();
            self.expect_peek(TokenType::Ident)?;
        }

        if !self.cur_is(TokenType::Ident) {
            return Err(ParserError::new(
                ParserErrorKind::MethodDefinition,
                format!(
                    "Invalid method name: {}. Line: {}",
                    self.cur.literal, self.cur.line
                ),
                self.cur.line,
            ));
        }
        let mut name = self.cur.literal.clone();

        if self.peek_is(TokenType::Assign) {
            name.push('=');
            self.next_token();
        }

        if self.peek_is(TokenType::Ident) && self.peek_at_same_line() {
            return Err(ParserError::new(
                ParserErrorKind::MethodDefinition,
                format!(
                    "Please add parentheses around method \"{}\"'s parameters. Line: {}",
                    name, self.cur.line
                ),
                self.cur.line,
            ));
        }

        let mut parameters = Vec::new();
        if self.peek_is(TokenType::LParen) {
            self.next_token();
            if !self.peek_is(TokenType::RParen) {
                parameters = self.parse_parameters()?;
            }
            self.expect_peek(TokenType::RParen)?;
        }

        let mut body = self.parse_block_statement(&[TokenType::End])?;
        body.set_keep_last_value();

        Ok(DefStatement {
            base: BaseNode::new(token),
            name,
            receiver,
            parameters,
            body,
        })
    }

    fn parse_parameters(&mut self) -> Result<Vec<Expression>, ParserError> {
        let prev = self.enter(Event::ParseMethodParam);
        let parameters = self.parse_parameter_list();
        self.restore(prev);

        let parameters = parameters?;
        self.check_method_parameters(&parameters)?;
        Ok(parameters)
    }

    fn parse_parameter_list(&mut self) -> Result<Vec<Expression>, ParserError> {
        self.next_token();
        let mut parameters = vec![self.parse_expression(Precedence::Normal)?];

        while self.peek_is(TokenType::Comma) {
            self.next_token();
            self.next_token();

            if self.cur_is(TokenType::Asterisk) && !self.peek_is(TokenType::Ident) {
                self.expect_peek(TokenType::Ident)?;
            }
            parameters.push(self.parse_expression(Precedence::Normal)?);
        }

        Ok(parameters)
    }

    /// Parameters must come in the order normal, optioned, required keyword,
    /// optional keyword, splat. Names must be unique and only one splat is
    /// allowed.
    fn check_method_parameters(&self, parameters: &[Expression]) -> Result<(), ParserError> {
        let line = self.cur.line;
        let mut previous = ArgKind::Normal;
        let mut seen: Vec<&str> = Vec::new();

        for parameter in parameters {
            let (Some(kind), Some(name)) = (parameter.arg_kind(), parameter.parameter_name())
            else {
                return Err(ParserError::new(
                    ParserErrorKind::Argument,
                    format!("Invalid parameter {}. Line: {}", parameter, line),
                    line,
                ));
            };

            if kind == ArgKind::Splat && previous == ArgKind::Splat {
                return Err(ParserError::new(
                    ParserErrorKind::Argument,
                    format!("Can't define splat argument more than once. Line: {}", line),
                    line,
                ));
            }

            if order(previous) > order(kind) {
                let shown = match &parameter.kind {
                    ExpressionKind::Identifier(name) => name.clone(),
                    _ => parameter.to_string(),
                };
                return Err(ParserError::argument_order(kind, previous, &shown, line));
            }

            if seen.contains(&name) {
                return Err(ParserError::new(
                    ParserErrorKind::Argument,
                    format!("Duplicate argument name: \"{}\". Line: {}", name, line),
                    line,
                ));
            }

            seen.push(name);
            previous = kind;
        }

        Ok(())
    }
}

/// Position of a parameter kind in the required declaration order.
fn order(kind: ArgKind) -> u8 {
    match kind {
        ArgKind::Normal => 0,
        ArgKind::Optioned => 1,
        ArgKind::RequiredKeyword => 2,
        ArgKind::OptionalKeyword => 3,
        ArgKind::Splat => 4,
    }
}

/// `Bar` in `Bar`, `Foo::Bar` and `A::B::Bar`.
fn rightmost_constant(expression: &Expression) -> Option<&str> {
    match &expression.kind {
        ExpressionKind::Constant { name, .. } => Some(name),
        ExpressionKind::Infix {
            operator, right, ..
        } if operator == "::" => rightmost_constant(right),
        _ => None,
    }
}

use super::{Event, Parser, Precedence};
use crate::ast::{CallExpression, Expression, ExpressionKind};
use crate::parser_error::ParserError;
use crate::token::{Token, TokenType};

/// How the arguments of a receiver-less call are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ArgumentStyle {
    /// `foo` or `foo do ... end`
    None,
    /// `foo(x, y)`, with `cur` on the `(`
    Parens,
    /// `foo x, y`, with `cur` on the first argument
    Bare,
}

impl Parser {
    /// A call on implicit `self`. `method` is the identifier naming it.
    pub(super) fn parse_call_without_receiver(
        &mut self,
        method: Token,
        style: ArgumentStyle,
    ) -> Result<Expression, ParserError> {
        let receiver = Expression::new(
            Token::new(TokenType::SelfKw, "self", self.cur.line),
            ExpressionKind::SelfRef,
        );

        let prev = self.enter(Event::ParseFuncCall);
        let arguments = match style {
            ArgumentStyle::Parens => self.parse_call_arguments_with_parens(),
            ArgumentStyle::Bare => self.parse_call_arguments(),
            ArgumentStyle::None => Ok(Vec::new()),
        };
        self.restore(prev);

        let mut call = CallExpression {
            receiver: Box::new(receiver),
            method: method.literal.clone(),
            arguments: arguments?,
            block: None,
            block_arguments: Vec::new(),
        };

        if self.peek_is(TokenType::Do) && self.accept_block {
            self.parse_block_argument(&mut call)?;
        }

        Ok(Expression::new(method, ExpressionKind::Call(call)))
    }

    /// Infix rule for `(` right after an identifier: `foo(x)`.
    pub(super) fn parse_call_with_parens(
        &mut self,
        callee: Expression,
    ) -> Result<Expression, ParserError> {
        if !matches!(callee.kind, ExpressionKind::Identifier(_)) {
            return Err(self.unexpected_token(&self.cur));
        }
        self.parse_call_without_receiver(callee.base.token, ArgumentStyle::Parens)
    }

    /// Infix rule for `.`: `recv.name`, `recv.name(args)`, `recv.name args`
    /// and the setter form `recv.name = value`.
    pub(super) fn parse_call_with_receiver(
        &mut self,
        receiver: Expression,
    ) -> Result<Expression, ParserError> {
        let prev = self.enter(Event::ParseFuncCall);
        let parsed = self.parse_method_and_arguments();
        self.restore(prev);
        let (token, method, arguments) = parsed?;

        let mut call = CallExpression {
            receiver: Box::new(receiver),
            method,
            arguments,
            block: None,
            block_arguments: Vec::new(),
        };

        if self.peek_is(TokenType::Do) && self.accept_block {
            self.parse_block_argument(&mut call)?;
        }

        Ok(Expression::new(token, ExpressionKind::Call(call)))
    }

    fn parse_method_and_arguments(
        &mut self,
    ) -> Result<(Token, String, Vec<Expression>), ParserError> {
        self.expect_peek(TokenType::Ident)?;
        let token = self.cur.clone();
        let mut method = token.literal.clone();
        let mut arguments = Vec::new();

        // Arguments must start on the method's line, otherwise `foo.bar`
        // followed by a new statement would swallow it.
        if self.peek_at_same_line() {
            match self.peek.kind {
                TokenType::LParen => {
                    self.next_token();
                    arguments = self.parse_call_arguments_with_parens()?;
                }
                TokenType::Assign => {
                    method.push('=');
                    self.next_token();
                    self.next_token();
                    arguments.push(self.parse_expression(Precedence::Normal)?);
                }
                kind if kind.starts_argument() => {
                    self.next_token();
                    arguments = self.parse_call_arguments()?;
                }
                _ => {}
            }
        }

        Ok((token, method, arguments))
    }

    /// `cur` is the opening parenthesis.
    pub(super) fn parse_call_arguments_with_parens(
        &mut self,
    ) -> Result<Vec<Expression>, ParserError> {
        if self.peek_is(TokenType::RParen) {
            self.next_token();
            return Ok(Vec::new());
        }

        self.next_token();
        let arguments = self.parse_call_arguments()?;
        self.expect_peek(TokenType::RParen)?;
        Ok(arguments)
    }

    /// Comma-separated arguments starting at `cur`.
    pub(super) fn parse_call_arguments(&mut self) -> Result<Vec<Expression>, ParserError> {
        let mut arguments = vec![self.parse_expression(Precedence::Normal)?];
        while self.peek_is(TokenType::Comma) {
            self.next_token();
            self.next_token();
            arguments.push(self.parse_expression(Precedence::Normal)?);
        }
        Ok(arguments)
    }

    /// `do |a, b| ... end` after a call; `peek` is the `do`.
    fn parse_block_argument(&mut self, call: &mut CallExpression) -> Result<(), ParserError> {
        self.next_token();

        if self.peek_is(TokenType::Bar) {
            self.next_token();
            self.expect_peek(TokenType::Ident)?;
            call.block_arguments.push(self.cur.literal.clone());

            while self.peek_is(TokenType::Comma) {
                self.next_token();
                self.expect_peek(TokenType::Ident)?;
                call.block_arguments.push(self.cur.literal.clone());
            }

            self.expect_peek(TokenType::Bar)?;
        }

        let mut block = self.parse_block_statement(&[TokenType::End])?;
        block.set_keep_last_value();
        call.block = Some(block);
        Ok(())
    }

    pub(super) fn parse_yield_expression(&mut self) -> Result<Expression, ParserError> {
        let token = self.cur.clone();
        let mut arguments = Vec::new();

        if self.peek_is(TokenType::LParen) {
            self.next_token();
            arguments = self.parse_call_arguments_with_parens()?;
        } else if self.peek.kind.starts_argument() && self.peek_at_same_line() {
            self.next_token();
            arguments = self.parse_call_arguments()?;
        }

        Ok(Expression::new(token, ExpressionKind::Yield(arguments)))
    }
}

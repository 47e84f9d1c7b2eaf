use std::collections::HashMap;

use super::{Parser, Precedence};
use crate::ast::{Expression, ExpressionKind};
use crate::parser_error::ParserError;
use crate::token::{Token, TokenType};

impl Parser {
    pub(super) fn parse_integer_literal(&mut self) -> Result<Expression, ParserError> {
        let value = self
            .cur
            .literal
            .parse::<i64>()
            .map_err(|_| ParserError::type_parsing(&self.cur.literal, "integer", self.cur.line))?;
        Ok(Expression::new(self.cur.clone(), ExpressionKind::Integer(value)))
    }

    /// Joins `Int . Int` into one float; `cur` is the dot.
    pub(super) fn parse_float_literal(
        &mut self,
        integer_part: Expression,
    ) -> Result<Expression, ParserError> {
        self.next_token();

        let literal = format!("{}.{}", integer_part.base.token.literal, self.cur.literal);
        let value = literal
            .parse::<f64>()
            .map_err(|_| ParserError::type_parsing(&literal, "float", self.cur.line))?;

        Ok(Expression::new(
            Token::new(TokenType::Float, literal, self.cur.line),
            ExpressionKind::Float(value),
        ))
    }

    pub(super) fn parse_string_literal(&mut self) -> Result<Expression, ParserError> {
        Ok(Expression::new(
            self.cur.clone(),
            ExpressionKind::String(self.cur.literal.clone()),
        ))
    }

    pub(super) fn parse_boolean_literal(&mut self) -> Result<Expression, ParserError> {
        Ok(Expression::new(
            self.cur.clone(),
            ExpressionKind::Boolean(self.cur_is(TokenType::True)),
        ))
    }

    pub(super) fn parse_nil_expression(&mut self) -> Result<Expression, ParserError> {
        Ok(Expression::new(self.cur.clone(), ExpressionKind::Nil))
    }

    pub(super) fn parse_array_expression(&mut self) -> Result<Expression, ParserError> {
        let token = self.cur.clone();
        let mut elements = Vec::new();

        if self.peek_is(TokenType::RBracket) {
            self.next_token();
            return Ok(Expression::new(token, ExpressionKind::Array(elements)));
        }

        self.next_token();
        elements.push(self.parse_expression(Precedence::Normal)?);
        while self.peek_is(TokenType::Comma) {
            self.next_token();
            self.next_token();
            elements.push(self.parse_expression(Precedence::Normal)?);
        }
        self.expect_peek(TokenType::RBracket)?;

        Ok(Expression::new(token, ExpressionKind::Array(elements)))
    }

    /// `{ key: value, Other: value }`. A repeated key keeps the last value.
    pub(super) fn parse_hash_expression(&mut self) -> Result<Expression, ParserError> {
        let token = self.cur.clone();
        let mut pairs = HashMap::new();

        if self.peek_is(TokenType::RBrace) {
            self.next_token();
            return Ok(Expression::new(token, ExpressionKind::Hash(pairs)));
        }

        self.parse_hash_pair(&mut pairs)?;
        while self.peek_is(TokenType::Comma) {
            self.next_token();
            self.parse_hash_pair(&mut pairs)?;
        }
        self.expect_peek(TokenType::RBrace)?;

        Ok(Expression::new(token, ExpressionKind::Hash(pairs)))
    }

    fn parse_hash_pair(
        &mut self,
        pairs: &mut HashMap<String, Expression>,
    ) -> Result<(), ParserError> {
        self.next_token();

        if !matches!(self.cur.kind, TokenType::Ident | TokenType::Constant) {
            return Err(self.unexpected_token(&self.cur));
        }
        let key = self.cur.literal.clone();

        self.expect_peek(TokenType::Colon)?;
        self.next_token();
        let value = self.parse_expression(Precedence::Normal)?;
        pairs.insert(key, value);
        Ok(())
    }
}

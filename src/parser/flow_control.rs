use super::expression::infix;
use super::{Parser, Precedence};
use crate::ast::{
    BaseNode, BlockStatement, ConditionalExpression, Expression, ExpressionKind, IfExpression,
};
use crate::parser_error::ParserError;
use crate::token::{Token, TokenType};

impl Parser {
    pub(super) fn parse_if_expression(&mut self) -> Result<Expression, ParserError> {
        let token = self.cur.clone();

        let mut conditionals = vec![self.parse_conditional_expression()?];
        while self.cur_is(TokenType::ElsIf) {
            conditionals.push(self.parse_conditional_expression()?);
        }

        let alternative = self.parse_else_branch()?;

        Ok(Expression::new(
            token,
            ExpressionKind::If(IfExpression {
                conditionals,
                alternative,
            }),
        ))
    }

    /// One `if` or `elsif` branch. Leaves `cur` on the `elsif`, `else` or
    /// `end` that closes it.
    fn parse_conditional_expression(&mut self) -> Result<ConditionalExpression, ParserError> {
        let token = self.cur.clone();
        self.next_token();
        let condition = self.parse_expression(Precedence::Normal)?;
        if self.peek_is(TokenType::Then) {
            self.next_token();
        }

        let mut consequence =
            self.parse_block_statement(&[TokenType::ElsIf, TokenType::Else, TokenType::End])?;
        consequence.set_keep_last_value();

        Ok(ConditionalExpression {
            base: BaseNode::new(token),
            condition: Box::new(condition),
            consequence,
        })
    }

    fn parse_else_branch(&mut self) -> Result<Option<BlockStatement>, ParserError> {
        if !self.cur_is(TokenType::Else) {
            return Ok(None);
        }
        let mut alternative = self.parse_block_statement(&[TokenType::End])?;
        alternative.set_keep_last_value();
        Ok(Some(alternative))
    }

    /// `case` is sugar for `if`: `when a, b` tests `subject == a || subject == b`.
    /// Without a subject the `when` values are compared against `true`.
    pub(super) fn parse_case_expression(&mut self) -> Result<Expression, ParserError> {
        let token = self.cur.clone();
        self.next_token();

        let subject = if self.cur_is(TokenType::When) {
            Expression::new(
                Token::new(TokenType::True, "true", token.line),
                ExpressionKind::Boolean(true),
            )
        } else {
            let subject = self.parse_expression(Precedence::Normal)?;
            self.expect_peek(TokenType::When)?;
            subject
        };

        let mut conditionals = Vec::new();
        while self.cur_is(TokenType::When) {
            conditionals.push(self.parse_case_conditional(&subject)?);
        }

        let alternative = self.parse_else_branch()?;

        Ok(Expression::new(
            token,
            ExpressionKind::If(IfExpression {
                conditionals,
                alternative,
            }),
        ))
    }

    fn parse_case_conditional(
        &mut self,
        subject: &Expression,
    ) -> Result<ConditionalExpression, ParserError> {
        let token = self.cur.clone();
        self.next_token();

        let first = self.parse_expression(Precedence::Normal)?;
        let mut condition = equals(subject, first);
        while self.peek_is(TokenType::Comma) {
            self.next_token();
            self.next_token();
            let next = self.parse_expression(Precedence::Normal)?;
            let line = next.line();
            condition = infix(
                condition,
                Token::new(TokenType::Or, "||", line),
                equals(subject, next),
            );
        }

        if self.peek_is(TokenType::Then) {
            self.next_token();
        }

        let mut consequence =
            self.parse_block_statement(&[TokenType::When, TokenType::Else, TokenType::End])?;
        consequence.set_keep_last_value();

        Ok(ConditionalExpression {
            base: BaseNode::new(token),
            condition: Box::new(condition),
            consequence,
        })
    }
}

fn equals(subject: &Expression, value: Expression) -> Expression {
    let line = value.line();
    infix(subject.clone(), Token::new(TokenType::Eq, "==", line), value)
}

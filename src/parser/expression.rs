use super::{Event, Parser, ParserState, Precedence};
use crate::ast::{AssignExpression, CallExpression, Expression, ExpressionKind};
use crate::parser_error::{ParserError, ParserErrorKind};
use crate::token::{Token, TokenType};

/// Builds `left <op> right` with the operator token as the node's token.
pub(super) fn infix(left: Expression, operator: Token, right: Expression) -> Expression {
    let literal = operator.literal.clone();
    Expression::new(
        operator,
        ExpressionKind::Infix {
            left: Box::new(left),
            operator: literal,
            right: Box::new(right),
        },
    )
}

impl Parser {
    pub(super) fn parse_identifier(&mut self) -> Result<Expression, ParserError> {
        Ok(Expression::new(
            self.cur.clone(),
            ExpressionKind::Identifier(self.cur.literal.clone()),
        ))
    }

    pub(super) fn parse_instance_variable(&mut self) -> Result<Expression, ParserError> {
        Ok(Expression::new(
            self.cur.clone(),
            ExpressionKind::InstanceVariable(self.cur.literal.clone()),
        ))
    }

    /// A constant followed by `::` is a namespace and pulls in the rest of
    /// the path right away.
    pub(super) fn parse_constant(&mut self) -> Result<Expression, ParserError> {
        let is_namespace = self.peek_is(TokenType::ResolutionOperator);
        let constant = Expression::new(
            self.cur.clone(),
            ExpressionKind::Constant {
                name: self.cur.literal.clone(),
                is_namespace,
            },
        );

        if is_namespace {
            self.next_token();
            return self.parse_infix_expression(constant);
        }

        Ok(constant)
    }

    pub(super) fn parse_self_expression(&mut self) -> Result<Expression, ParserError> {
        Ok(Expression::new(self.cur.clone(), ExpressionKind::SelfRef))
    }

    pub(super) fn parse_get_block_expression(&mut self) -> Result<Expression, ParserError> {
        Ok(Expression::new(self.cur.clone(), ExpressionKind::GetBlock))
    }

    pub(super) fn parse_prefix_expression(&mut self) -> Result<Expression, ParserError> {
        let token = self.cur.clone();
        self.next_token();
        let right = self.parse_expression(Precedence::Prefix)?;

        Ok(Expression::new(
            token.clone(),
            ExpressionKind::Prefix {
                operator: token.literal,
                right: Box::new(right),
            },
        ))
    }

    pub(super) fn parse_grouped_expression(&mut self) -> Result<Expression, ParserError> {
        self.next_token();
        let expression = self.parse_expression(Precedence::Normal)?;
        self.expect_peek(TokenType::RParen)?;
        Ok(expression)
    }

    pub(super) fn parse_infix_expression(
        &mut self,
        left: Expression,
    ) -> Result<Expression, ParserError> {
        let operator = self.cur.clone();
        let mut precedence = self.cur_precedence();

        if self.cur_is(TokenType::Asterisk) && self.peek_is(TokenType::Asterisk) {
            return Err(ParserError::new(
                ParserErrorKind::UnexpectedToken,
                format!("unexpected {} Line: {}", operator.literal, self.peek.line),
                self.peek.line,
            ));
        }

        // `a || b == c` keeps `b == c` together.
        if matches!(operator.kind, TokenType::And | TokenType::Or) {
            precedence = Precedence::Normal;
        }

        self.next_token();
        let right = self.parse_expression(precedence)?;

        Ok(infix(left, operator, right))
    }

    pub(super) fn parse_range_expression(
        &mut self,
        start: Expression,
    ) -> Result<Expression, ParserError> {
        let token = self.cur.clone();
        let precedence = self.cur_precedence();
        self.next_token();
        let end = self.parse_expression(precedence)?;

        Ok(Expression::new(
            token,
            ExpressionKind::Range {
                start: Box::new(start),
                end: Box::new(end),
            },
        ))
    }

    /// Infix rule for `=`, `+=`, `-=` and `||=`.
    pub(super) fn parse_assign_expression(
        &mut self,
        target: Expression,
    ) -> Result<Expression, ParserError> {
        if let ExpressionKind::Call(call) = &target.kind {
            if call.method == "[]" {
                return self.parse_index_assignment(target);
            }
        }

        if !target.is_variable() {
            return Err(ParserError::new(
                ParserErrorKind::InvalidAssignment,
                format!("Can't assign value to {}. Line: {}", target, self.cur.line),
                self.cur.line,
            ));
        }

        self.parse_assignment(vec![target])
    }

    /// Parses the value for `variables` with `cur` on the assignment operator.
    fn parse_assignment(&mut self, variables: Vec<Expression>) -> Result<Expression, ParserError> {
        let is_statement = self.state != ParserState::ParsingFuncCall;
        let optioned = u8::from(self.state == ParserState::ParsingMethodParam);
        let token = Token::new(TokenType::Assign, "=", self.cur.line);

        let prev = self.enter(Event::ParseAssignment);
        let value = if variables.len() == 1 {
            self.parse_assignment_value(&variables[0])
        } else {
            let precedence = self.cur_precedence();
            self.next_token();
            self.parse_expression(precedence)
        };
        self.restore(prev);

        let mut expression = Expression::new(
            token,
            ExpressionKind::Assign(AssignExpression {
                variables,
                value: Box::new(value?),
                optioned,
            }),
        );
        if is_statement {
            expression.mark_as_statement();
        }
        Ok(expression)
    }

    /// `x = v` parses `v`; `x += v` becomes `x + v`, and likewise for `-=`
    /// and `||=`.
    fn parse_assignment_value(&mut self, target: &Expression) -> Result<Expression, ParserError> {
        let (kind, literal) = match self.cur.kind {
            TokenType::Assign => {
                let precedence = self.cur_precedence();
                self.next_token();
                return self.parse_expression(precedence);
            }
            TokenType::PlusEq => (TokenType::Plus, "+"),
            TokenType::MinusEq => (TokenType::Minus, "-"),
            TokenType::OrEq => (TokenType::Or, "||"),
            other => return Err(self.peek_error(other)),
        };

        let operator = Token::new(kind, literal, self.cur.line);
        self.next_token();
        let right = self.parse_expression(Precedence::Lowest)?;
        Ok(infix(target.clone(), operator, right))
    }

    /// `a[i] += v` becomes `a.[]=(i, a[i] + v)`.
    fn parse_index_assignment(&mut self, target: Expression) -> Result<Expression, ParserError> {
        let prev = self.enter(Event::ParseAssignment);
        let value = self.parse_assignment_value(&target);
        self.restore(prev);
        let value = value?;

        let token = target.base.token.clone();
        let ExpressionKind::Call(call) = target.kind else {
            return Err(self.unexpected_token(&token));
        };

        let mut arguments = call.arguments;
        arguments.push(value);

        Ok(Expression::new(
            token,
            ExpressionKind::Call(CallExpression {
                receiver: call.receiver,
                method: "[]=".to_string(),
                arguments,
                block: None,
                block_arguments: Vec::new(),
            }),
        ))
    }

    /// Infix rule for `,` after an assignable: `a, @b, C = value`.
    pub(super) fn parse_multi_variables(
        &mut self,
        first: Expression,
    ) -> Result<Expression, ParserError> {
        if !first.is_variable() {
            return Err(self.no_prefix_parse_fn_error());
        }

        let mut variables = vec![first];
        loop {
            self.next_token();
            let variable = self.parse_expression(Precedence::Call)?;
            if !variable.is_variable() {
                return Err(self.no_prefix_parse_fn_error());
            }
            variables.push(variable);

            if !self.peek_is(TokenType::Comma) {
                break;
            }
            self.next_token();
        }

        self.expect_peek(TokenType::Assign)?;
        self.parse_assignment(variables)
    }

    /// Infix rule for `:`. Only legal for keyword parameters (`key:` or
    /// `key: default`) and keyword arguments (`key: value`).
    pub(super) fn parse_pair_expression(
        &mut self,
        key: Expression,
    ) -> Result<Expression, ParserError> {
        let token = self.cur.clone();

        let value = match self.state {
            ParserState::ParsingMethodParam
                if self.peek_is(TokenType::Comma) || self.peek_is(TokenType::RParen) =>
            {
                None
            }
            ParserState::ParsingMethodParam | ParserState::ParsingFuncCall => {
                self.next_token();
                Some(Box::new(self.parse_expression(Precedence::Normal)?))
            }
            _ => {
                return Err(ParserError::new(
                    ParserErrorKind::UnexpectedToken,
                    format!("unexpected {} Line: {}", token.literal, self.peek.line),
                    self.peek.line,
                ));
            }
        };

        let ExpressionKind::Identifier(name) = key.kind else {
            return Err(self.unexpected_token(&token));
        };

        Ok(Expression::new(token, ExpressionKind::Pair { key: name, value }))
    }

    /// Infix rule for `[`: `a[i]`, `a[i, j]`, `a[]` and `a[i] = v`.
    pub(super) fn parse_index_expression(
        &mut self,
        receiver: Expression,
    ) -> Result<Expression, ParserError> {
        let token = self.cur.clone();
        let mut call = CallExpression {
            receiver: Box::new(receiver),
            method: "[]".to_string(),
            arguments: Vec::new(),
            block: None,
            block_arguments: Vec::new(),
        };

        if self.peek_is(TokenType::RBracket) {
            self.next_token();
            return Ok(Expression::new(token, ExpressionKind::Call(call)));
        }

        self.next_token();
        call.arguments.push(self.parse_expression(Precedence::Normal)?);
        while self.peek_is(TokenType::Comma) {
            self.next_token();
            self.next_token();
            call.arguments.push(self.parse_expression(Precedence::Normal)?);
        }
        self.expect_peek(TokenType::RBracket)?;

        if self.peek_is(TokenType::Assign) {
            self.next_token();
            self.next_token();
            call.arguments.push(self.parse_expression(Precedence::Normal)?);
            call.method = "[]=".to_string();
        }

        Ok(Expression::new(token, ExpressionKind::Call(call)))
    }
}

mod call;
mod expression;
mod flow_control;
mod literal;
mod precedence;
mod statement;

pub use precedence::Precedence;

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::ast::{Expression, Program, Statement};
use crate::lexer::Lexer;
use crate::parser_error::{ParserError, ParserErrorKind};
use crate::token::{Token, TokenType};

/// Decides what happens to values nobody consumes.
///
/// - `Normal`: every unused expression statement is marked for a `pop`.
/// - `Repl`: top-level expression statements keep their values.
/// - `Test`: like `Normal`, except the program's last expression keeps its
///   value so it reaches the final `leave`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParserMode {
    #[default]
    Normal,
    Repl,
    Test,
}

/// Context the parser is currently in. Decides whether `foo x` is a call,
/// whether `key:` is legal, and whether an assignment is a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ParserState {
    Normal,
    ParsingFuncCall,
    ParsingMethodParam,
    ParsingAssignment,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Event {
    ParseFuncCall,
    ParseMethodParam,
    ParseAssignment,
}

type PrefixParseFn = fn(&mut Parser) -> Result<Expression, ParserError>;
type InfixParseFn = fn(&mut Parser, Expression) -> Result<Expression, ParserError>;

/// Pratt parser producing a `Program` from a token stream.
///
/// The parser keeps a current and a peek token. Comments are dropped as
/// they are read, so no rule ever sees one. Newlines are not tokens; rules
/// that care about them (parenthesis-free calls, `return` without a value)
/// compare token lines instead.
pub struct Parser {
    lexer: Lexer,
    cur: Token,
    peek: Token,
    state: ParserState,
    /// Cleared while parsing a `while` condition so `do` opens the loop body.
    accept_block: bool,
    mode: ParserMode,
    /// Number of enclosing block statements.
    block_depth: usize,
}

impl Parser {
    pub fn new(lexer: Lexer, mode: ParserMode) -> Self {
        let mut parser = Parser {
            lexer,
            cur: Token::eof(1),
            peek: Token::eof(1),
            state: ParserState::Normal,
            accept_block: true,
            mode,
            block_depth: 0,
        };
        // Fill both `cur` and `peek`.
        parser.next_token();
        parser.next_token();
        parser
    }

    /// Parses the whole input. The first error stops parsing and no partial
    /// program is returned.
    pub fn parse_program(&mut self) -> Result<Program, ParserError> {
        let mut program = Program::default();

        while !self.cur_is(TokenType::Eof) {
            match self.parse_statement() {
                Ok(Some(statement)) => program.statements.push(statement),
                Ok(None) => {}
                Err(err) => {
                    debug!("parse error ({:?}): {}", err.kind, err);
                    return Err(err);
                }
            }
            self.next_token();
        }

        if self.mode == ParserMode::Test {
            if let Some(Statement::Expression(last)) = program.statements.last_mut() {
                last.expression.mark_as_expression();
            }
        }

        debug!("parsed {} top-level statements", program.statements.len());
        Ok(program)
    }

    fn next_token(&mut self) {
        let next = loop {
            let token = self.lexer.next_token();
            if token.kind != TokenType::Comment {
                break token;
            }
        };
        self.cur = std::mem::replace(&mut self.peek, next);
    }

    fn cur_is(&self, kind: TokenType) -> bool {
        self.cur.kind == kind
    }

    fn peek_is(&self, kind: TokenType) -> bool {
        self.peek.kind == kind
    }

    fn peek_at_same_line(&self) -> bool {
        self.cur.line == self.peek.line && !self.peek_is(TokenType::Eof)
    }

    fn cur_precedence(&self) -> Precedence {
        Precedence::of(self.cur.kind)
    }

    fn peek_precedence(&self) -> Precedence {
        Precedence::of(self.peek.kind)
    }

    /// Advances when the peek token has the expected type.
    fn expect_peek(&mut self, kind: TokenType) -> Result<(), ParserError> {
        if self.peek_is(kind) {
            self.next_token();
            Ok(())
        } else {
            Err(self.peek_error(kind))
        }
    }

    /// Applies a state transition and returns the state to restore later.
    /// Events that are not allowed from the current state leave it unchanged.
    fn enter(&mut self, event: Event) -> ParserState {
        let prev = self.state;
        let next = match (event, prev) {
            (Event::ParseFuncCall, ParserState::Normal | ParserState::ParsingAssignment) => {
                ParserState::ParsingFuncCall
            }
            (
                Event::ParseMethodParam,
                ParserState::Normal | ParserState::ParsingAssignment,
            ) => ParserState::ParsingMethodParam,
            (Event::ParseAssignment, ParserState::Normal | ParserState::ParsingFuncCall) => {
                ParserState::ParsingAssignment
            }
            _ => prev,
        };
        if next != prev {
            trace!("parser state {:?} -> {:?} ({:?})", prev, next, event);
        }
        self.state = next;
        prev
    }

    fn restore(&mut self, prev: ParserState) {
        self.state = prev;
    }

    fn prefix_parse_fn(kind: TokenType) -> Option<PrefixParseFn> {
        let f: PrefixParseFn = match kind {
            TokenType::Ident => Parser::parse_identifier,
            TokenType::Constant => Parser::parse_constant,
            TokenType::InstanceVariable => Parser::parse_instance_variable,
            TokenType::Int => Parser::parse_integer_literal,
            TokenType::String => Parser::parse_string_literal,
            TokenType::True | TokenType::False => Parser::parse_boolean_literal,
            TokenType::Nil => Parser::parse_nil_expression,
            TokenType::Minus | TokenType::Asterisk | TokenType::Bang => {
                Parser::parse_prefix_expression
            }
            TokenType::LParen => Parser::parse_grouped_expression,
            TokenType::If => Parser::parse_if_expression,
            TokenType::Case => Parser::parse_case_expression,
            TokenType::SelfKw => Parser::parse_self_expression,
            TokenType::LBracket => Parser::parse_array_expression,
            TokenType::LBrace => Parser::parse_hash_expression,
            TokenType::Yield => Parser::parse_yield_expression,
            TokenType::GetBlock => Parser::parse_get_block_expression,
            _ => return None,
        };
        Some(f)
    }

    fn infix_parse_fn(kind: TokenType) -> Option<InfixParseFn> {
        let f: InfixParseFn = match kind {
            TokenType::Plus
            | TokenType::Minus
            | TokenType::Modulo
            | TokenType::Slash
            | TokenType::Asterisk
            | TokenType::Pow
            | TokenType::Eq
            | TokenType::NotEq
            | TokenType::Match
            | TokenType::Lt
            | TokenType::Lte
            | TokenType::Gt
            | TokenType::Gte
            | TokenType::Comp
            | TokenType::And
            | TokenType::Or
            | TokenType::ResolutionOperator => Parser::parse_infix_expression,
            TokenType::Assign | TokenType::PlusEq | TokenType::MinusEq | TokenType::OrEq => {
                Parser::parse_assign_expression
            }
            TokenType::Comma => Parser::parse_multi_variables,
            TokenType::Range => Parser::parse_range_expression,
            TokenType::Dot => Parser::parse_call_with_receiver,
            TokenType::LParen => Parser::parse_call_with_parens,
            TokenType::LBracket => Parser::parse_index_expression,
            TokenType::Colon => Parser::parse_pair_expression,
            _ => return None,
        };
        Some(f)
    }

    /// Core Pratt loop.
    ///
    /// Before dispatching to the prefix rule it handles the two forms that
    /// depend on parser state: calling a constant with parentheses is
    /// rejected, and an identifier followed by `do` or by an argument on the
    /// same line becomes a call without parentheses.
    fn parse_expression(&mut self, precedence: Precedence) -> Result<Expression, ParserError> {
        let Some(prefix) = Parser::prefix_parse_fn(self.cur.kind) else {
            return Err(self.no_prefix_parse_fn_error());
        };

        let statement_level = matches!(
            self.state,
            ParserState::Normal | ParserState::ParsingAssignment
        );

        if self.cur_is(TokenType::Constant) && statement_level && self.peek_is(TokenType::LParen) {
            return Err(ParserError::new(
                ParserErrorKind::UnexpectedToken,
                format!(
                    "cannot call {} with {}. Line: {}",
                    self.cur.kind, self.peek.kind, self.peek.line
                ),
                self.peek.line,
            ));
        }

        if self.cur_is(TokenType::Ident) && statement_level {
            if self.peek_is(TokenType::Do) {
                let method = self.cur.clone();
                return self.parse_call_without_receiver(method, call::ArgumentStyle::None);
            }

            if self.peek.kind.starts_argument() && self.peek_at_same_line() {
                let method = self.cur.clone();
                self.next_token();
                return self.parse_call_without_receiver(method, call::ArgumentStyle::Bare);
            }
        }

        let mut left = prefix(self)?;

        while !self.peek_is(TokenType::Semicolon)
            && (precedence < self.peek_precedence() || self.is_chained_assignment())
            && self.peek_at_same_line()
        {
            let Some(infix) = Parser::infix_parse_fn(self.peek.kind) else {
                return Ok(left);
            };

            let prev = self.cur.clone();
            self.next_token();

            left = if self.is_parsing_float(&prev) {
                self.parse_float_literal(left)?
            } else {
                infix(self, left)?
            };
        }

        if self.peek_is(TokenType::Semicolon) {
            self.next_token();
        }

        Ok(left)
    }

    /// `a = b = 1`: keep folding while the right-hand side is itself assigned.
    fn is_chained_assignment(&self) -> bool {
        self.state == ParserState::ParsingAssignment && self.peek_is(TokenType::Assign)
    }

    /// `1.5` reaches the parser as `Int`, `Dot`, `Int` on one line.
    fn is_parsing_float(&self, left: &Token) -> bool {
        self.cur_is(TokenType::Dot)
            && left.kind == TokenType::Int
            && self.peek_is(TokenType::Int)
            && left.line == self.peek.line
    }

    fn peek_error(&self, expected: TokenType) -> ParserError {
        let kind = if self.peek_is(TokenType::Eof) {
            ParserErrorKind::EndOfFile
        } else {
            ParserErrorKind::UnexpectedToken
        };
        ParserError::new(
            kind,
            format!(
                "expected next token to be {}, got {}({}) instead. Line: {}",
                expected, self.peek.kind, self.peek.literal, self.peek.line
            ),
            self.peek.line,
        )
    }

    fn no_prefix_parse_fn_error(&self) -> ParserError {
        let (kind, literal) = match self.cur.kind {
            TokenType::End => (ParserErrorKind::UnexpectedEnd, self.cur.literal.as_str()),
            TokenType::Eof => (ParserErrorKind::EndOfFile, "EOF"),
            _ => (ParserErrorKind::UnexpectedToken, self.cur.literal.as_str()),
        };
        ParserError::new(
            kind,
            format!("unexpected {} Line: {}", literal, self.cur.line),
            self.cur.line,
        )
    }

    fn unexpected_token(&self, token: &Token) -> ParserError {
        ParserError::new(
            ParserErrorKind::UnexpectedToken,
            format!("unexpected {} Line: {}", token.literal, token.line),
            token.line,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ExpressionKind, Statement};

    fn parse_with(source: &str, mode: ParserMode) -> Program {
        let mut parser = Parser::new(Lexer::new(source), mode);
        parser.parse_program().unwrap()
    }

    fn parse(source: &str) -> Program {
        parse_with(source, ParserMode::Normal)
    }

    fn parse_err(source: &str) -> ParserError {
        let mut parser = Parser::new(Lexer::new(source), ParserMode::Normal);
        parser.parse_program().unwrap_err()
    }

    fn expression(program: &Program, index: usize) -> &Expression {
        program.statements[index]
            .as_expression()
            .expect("expression statement")
    }

    fn call(expression: &Expression) -> &crate::ast::CallExpression {
        match &expression.kind {
            ExpressionKind::Call(call) => call,
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_operator_precedence() {
        let cases = [
            ("1 + 2 * 3", "(1 + (2 * 3))"),
            ("(1 * 10 + 100) / 2", "(((1 * 10) + 100) / 2)"),
            ("-a * b", "((-a) * b)"),
            ("!true == false", "((!true) == false)"),
            ("a + b % c", "((a + b) % c)"),
            ("a ** b + c", "((a ** b) + c)"),
            ("1 < 2 == true", "((1 < 2) == true)"),
            ("a == b && c", "((a == b) && c)"),
            ("a <=> b", "(a <=> b)"),
            ("a =~ b", "(a =~ b)"),
            ("1..a + 2", "(1..(a + 2))"),
        ];

        for (source, expected) in cases {
            assert_eq!(parse(source).to_string(), expected, "source: {}", source);
        }
    }

    #[test]
    fn test_float_literal() {
        let program = parse("1.25 + 2");
        let ExpressionKind::Infix { left, .. } = &expression(&program, 0).kind else {
            panic!("expected infix");
        };
        assert!(matches!(left.kind, ExpressionKind::Float(v) if v == 1.25));
        assert_eq!(program.to_string(), "(1.25 + 2)");
    }

    #[test]
    fn test_integer_overflow_is_type_error() {
        let err = parse_err("99999999999999999999");
        assert_eq!(err.kind, ParserErrorKind::TypeParsing);
    }

    #[test]
    fn test_comments_produce_no_nodes() {
        let program = parse("# leading\na = 1 # trailing\n# done");
        assert_eq!(program.statements.len(), 1);
    }

    #[test]
    fn test_semicolons_separate_statements() {
        let program = parse("a = 1;; b = 2; a + b");
        assert_eq!(program.statements.len(), 3);
    }

    #[test]
    fn test_pop_marking_by_mode() {
        let normal = parse_with("a = 1\na", ParserMode::Normal);
        assert!(expression(&normal, 0).is_statement());
        assert!(expression(&normal, 1).is_statement());

        let test = parse_with("a = 1\na", ParserMode::Test);
        assert!(expression(&test, 0).is_statement());
        assert!(expression(&test, 1).is_expression());

        let repl = parse_with("a = 1\na", ParserMode::Repl);
        assert!(expression(&repl, 0).is_expression());
        assert!(expression(&repl, 1).is_expression());
    }

    #[test]
    fn test_repl_marks_only_top_level() {
        let program = parse_with("while a do\nb\nend", ParserMode::Repl);
        let Statement::While(w) = &program.statements[0] else {
            panic!("expected while");
        };
        assert!(w.body.statements[0].as_expression().unwrap().is_statement());
    }

    #[test]
    fn test_call_without_parens() {
        let program = parse("puts 10, x");
        let c = call(expression(&program, 0));
        assert_eq!(c.method, "puts");
        assert!(matches!(c.receiver.kind, ExpressionKind::SelfRef));
        assert_eq!(c.arguments.len(), 2);
    }

    #[test]
    fn test_identifier_on_next_line_is_not_an_argument() {
        let program = parse("foo\nx");
        assert_eq!(program.statements.len(), 2);
        assert!(matches!(
            expression(&program, 0).kind,
            ExpressionKind::Identifier(_)
        ));
    }

    #[test]
    fn test_call_in_assignment_without_parens() {
        let program = parse("a = foo 10");
        let ExpressionKind::Assign(assign) = &expression(&program, 0).kind else {
            panic!("expected assignment");
        };
        assert_eq!(call(&assign.value).method, "foo");
    }

    #[test]
    fn test_call_with_receiver_and_block() {
        let program = parse("[1, 2].each do |x, y|\n  x + y\nend");
        let c = call(expression(&program, 0));
        assert_eq!(c.method, "each");
        assert_eq!(c.block_arguments, vec!["x", "y"]);
        let block = c.block.as_ref().unwrap();
        assert!(block.keep_last_value);
        assert!(block.ends_with_value());
    }

    #[test]
    fn test_bare_identifier_with_block() {
        let program = parse("foo do\n  1\nend");
        let c = call(expression(&program, 0));
        assert_eq!(c.method, "foo");
        assert!(c.arguments.is_empty());
        assert!(c.block.is_some());
    }

    #[test]
    fn test_keyword_method_names_after_dot() {
        let program = parse("foo.class\nbar.end");
        assert_eq!(call(expression(&program, 0)).method, "class");
        assert_eq!(call(expression(&program, 1)).method, "end");
    }

    #[test]
    fn test_setter_call() {
        let program = parse("foo.bar = 10");
        let c = call(expression(&program, 0));
        assert_eq!(c.method, "bar=");
        assert_eq!(c.arguments.len(), 1);
        assert_eq!(program.to_string(), "foo.bar = 10");
    }

    #[test]
    fn test_index_and_index_assign() {
        let program = parse("a[1, 2]\na[0] = 5\na[0] += 1");
        assert_eq!(call(expression(&program, 0)).arguments.len(), 2);

        let set = call(expression(&program, 1));
        assert_eq!(set.method, "[]=");
        assert_eq!(set.arguments.len(), 2);

        let add = call(expression(&program, 2));
        assert_eq!(add.method, "[]=");
        assert_eq!(program.statements[2].to_string(), "a[0] = (a[0] + 1)");
    }

    #[test]
    fn test_operator_assignment_desugars() {
        let program = parse("a += 1\nb -= 2\nc ||= 3");
        assert_eq!(program.to_string(), "a = (a + 1)\nb = (b - 2)\nc = (c || 3)");
    }

    #[test]
    fn test_chained_assignment() {
        let program = parse("a = b = 1");
        assert_eq!(program.to_string(), "a = b = 1");
    }

    #[test]
    fn test_multiple_assignment() {
        let program = parse("a, @b, C = foo");
        let ExpressionKind::Assign(assign) = &expression(&program, 0).kind else {
            panic!("expected assignment");
        };
        assert_eq!(assign.variables.len(), 3);
        assert!(matches!(
            assign.variables[1].kind,
            ExpressionKind::InstanceVariable(_)
        ));
    }

    #[test]
    fn test_invalid_assignment() {
        let err = parse_err("foo.bar += 1");
        assert_eq!(err.kind, ParserErrorKind::InvalidAssignment);
        assert!(err.message.starts_with("Can't assign value to"));
    }

    #[test]
    fn test_calling_constant_with_parens_is_rejected() {
        let err = parse_err("Foo()");
        assert_eq!(err.kind, ParserErrorKind::UnexpectedToken);
        assert_eq!(err.message, "cannot call CONSTANT with (. Line: 1");
    }

    #[test]
    fn test_namespaced_constant() {
        let program = parse("Foo::Bar::Baz");
        let ExpressionKind::Infix { left, right, .. } = &expression(&program, 0).kind else {
            panic!("expected infix");
        };
        assert!(matches!(
            left.kind,
            ExpressionKind::Constant { is_namespace: true, .. }
        ));
        assert!(matches!(right.kind, ExpressionKind::Infix { .. }));
        assert_eq!(program.to_string(), "Foo::Bar::Baz");
    }

    #[test]
    fn test_hash_literal() {
        let program = parse("{ foo: 1, Bar: 2 }");
        let ExpressionKind::Hash(pairs) = &expression(&program, 0).kind else {
            panic!("expected hash");
        };
        assert_eq!(pairs.len(), 2);
        assert!(pairs.contains_key("foo"));
        assert!(pairs.contains_key("Bar"));
    }

    #[test]
    fn test_symbol_values_in_hash() {
        let program = parse("{ foo: :bar }");
        assert_eq!(program.to_string(), "{ foo: \"bar\" }");
    }

    #[test]
    fn test_keyword_arguments() {
        let program = parse("foo(1, a: 2, b: x)");
        let c = call(expression(&program, 0));
        assert!(matches!(c.arguments[1].kind, ExpressionKind::Pair { .. }));
        assert_eq!(program.to_string(), "self.foo(1, a: 2, b: x)");
    }

    #[test]
    fn test_pair_outside_call_is_rejected() {
        let err = parse_err("a = x: 1");
        assert_eq!(err.kind, ParserErrorKind::UnexpectedToken);
    }

    #[test]
    fn test_double_asterisk_with_space_is_rejected() {
        let err = parse_err("a * * b");
        assert_eq!(err.kind, ParserErrorKind::UnexpectedToken);
    }

    #[test]
    fn test_def_with_all_parameter_kinds() {
        let program = parse("def foo(a, b = 1, c:, d: 2, *e)\n  a\nend");
        let Statement::Def(def) = &program.statements[0] else {
            panic!("expected def");
        };
        assert_eq!(def.name, "foo");
        assert_eq!(def.parameters.len(), 5);
        assert_eq!(def.splat_parameter(), Some(4));
        let ExpressionKind::Assign(optioned) = &def.parameters[1].kind else {
            panic!("expected optioned parameter");
        };
        assert_eq!(optioned.optioned, 1);
        assert!(def.body.keep_last_value);
    }

    #[test]
    fn test_def_with_receiver_and_setter() {
        let program = parse("def self.foo=(x)\n  @x = x\nend\ndef Foo.bar; end");
        let Statement::Def(setter) = &program.statements[0] else {
            panic!("expected def");
        };
        assert_eq!(setter.name, "foo=");
        assert!(matches!(
            setter.receiver.as_ref().map(|r| &r.kind),
            Some(ExpressionKind::SelfRef)
        ));

        let Statement::Def(singleton) = &program.statements[1] else {
            panic!("expected def");
        };
        assert!(matches!(
            singleton.receiver.as_ref().map(|r| &r.kind),
            Some(ExpressionKind::Constant { .. })
        ));
        assert!(singleton.body.is_empty());
    }

    #[test]
    fn test_def_without_parentheses_around_parameters() {
        let err = parse_err("def foo x\nend");
        assert_eq!(err.kind, ParserErrorKind::MethodDefinition);
        assert_eq!(
            err.message,
            "Please add parentheses around method \"foo\"'s parameters. Line: 1"
        );
    }

    #[test]
    fn test_invalid_method_receiver() {
        let err = parse_err("def 1.foo; end");
        assert_eq!(err.kind, ParserErrorKind::MethodDefinition);
    }

    #[test]
    fn test_parameter_order_errors() {
        let cases = [
            ("def foo(a = 1, b); end", "Normal argument \"b\" should be defined before Optioned argument. Line: 1"),
            ("def foo(*a, b = 1); end", "Optioned argument \"b = 1\" should be defined before Splat argument. Line: 1"),
            ("def foo(a: 1, b:); end", "Keyword argument \"b:\" should be defined before Optioned keyword argument. Line: 1"),
            ("def foo(*a, b: 1); end", "Optioned keyword argument \"b: 1\" should be defined before Splat argument. Line: 1"),
        ];
        for (source, message) in cases {
            let err = parse_err(source);
            assert_eq!(err.kind, ParserErrorKind::Argument, "source: {}", source);
            assert_eq!(err.message, message);
        }
    }

    #[test]
    fn test_duplicate_and_repeated_splat_parameters() {
        let err = parse_err("def foo(a, a); end");
        assert_eq!(err.kind, ParserErrorKind::Argument);
        assert_eq!(err.message, "Duplicate argument name: \"a\". Line: 1");

        let err = parse_err("def foo(*a, *b); end");
        assert_eq!(err.message, "Can't define splat argument more than once. Line: 1");
    }

    #[test]
    fn test_literal_is_not_a_parameter() {
        let err = parse_err("def foo(a, 1); end");
        assert_eq!(err.kind, ParserErrorKind::Argument);
        assert_eq!(err.message, "Invalid parameter 1. Line: 1");
    }

    #[test]
    fn test_super_class_must_be_a_constant() {
        let err = parse_err("class Foo < 1\nend");
        assert_eq!(err.kind, ParserErrorKind::Syntax);
        assert_eq!(err.message, "Invalid super class 1. Line: 1");

        let err = parse_err("class Foo < bar\nend");
        assert_eq!(err.kind, ParserErrorKind::Syntax);
    }

    #[test]
    fn test_class_with_namespaced_super_class() {
        let program = parse("class Foo < A::B::Bar\nend\nmodule Baz\nend");
        let Statement::Class(class) = &program.statements[0] else {
            panic!("expected class");
        };
        assert_eq!(class.name, "Foo");
        assert_eq!(class.super_class_name.as_deref(), Some("Bar"));
        assert!(matches!(program.statements[1], Statement::Module(_)));
    }

    #[test]
    fn test_return_without_value() {
        let program = parse("def foo\n  return\nend");
        let Statement::Def(def) = &program.statements[0] else {
            panic!("expected def");
        };
        let Statement::Return(ret) = &def.body.statements[0] else {
            panic!("expected return");
        };
        assert!(matches!(ret.value.kind, ExpressionKind::Nil));
    }

    #[test]
    fn test_while_does_not_take_do_as_block() {
        let program = parse("while foo do\n  next\n  break\nend");
        let Statement::While(w) = &program.statements[0] else {
            panic!("expected while");
        };
        assert!(matches!(w.condition.kind, ExpressionKind::Identifier(_)));
        assert!(matches!(w.body.statements[0], Statement::Next(_)));
        assert!(matches!(w.body.statements[1], Statement::Break(_)));
    }

    #[test]
    fn test_if_elsif_else() {
        let program = parse("if a\n  1\nelsif b then 2\nelse\n  3\nend");
        let ExpressionKind::If(if_expression) = &expression(&program, 0).kind else {
            panic!("expected if");
        };
        assert_eq!(if_expression.conditionals.len(), 2);
        assert!(if_expression.alternative.as_ref().unwrap().keep_last_value);
        assert!(if_expression.conditionals[1].consequence.ends_with_value());
    }

    #[test]
    fn test_case_desugars_into_if() {
        let program = parse("case x\nwhen 0, 1 then 'a'\nwhen 2\n  'b'\nelse\n  'c'\nend");
        let ExpressionKind::If(if_expression) = &expression(&program, 0).kind else {
            panic!("expected if");
        };
        assert_eq!(if_expression.conditionals.len(), 2);
        assert_eq!(
            if_expression.conditionals[0].condition.to_string(),
            "((x == 0) || (x == 1))"
        );
        assert!(if_expression.alternative.is_some());
    }

    #[test]
    fn test_case_without_subject_compares_with_true() {
        let program = parse("case\nwhen a > 1\n  'big'\nend");
        let ExpressionKind::If(if_expression) = &expression(&program, 0).kind else {
            panic!("expected if");
        };
        assert_eq!(
            if_expression.conditionals[0].condition.to_string(),
            "(true == (a > 1))"
        );
    }

    #[test]
    fn test_yield_and_get_block() {
        let program = parse("yield 1, 2\nyield(a)\nget_block");
        assert!(matches!(&expression(&program, 0).kind, ExpressionKind::Yield(args) if args.len() == 2));
        assert!(matches!(&expression(&program, 1).kind, ExpressionKind::Yield(args) if args.len() == 1));
        assert!(matches!(expression(&program, 2).kind, ExpressionKind::GetBlock));
    }

    #[test]
    fn test_unexpected_end_and_eof() {
        let err = parse_err("end");
        assert!(err.is_unexpected_end());

        let err = parse_err("def foo\n  1");
        assert!(err.is_eof());
        assert_eq!(err.message, "Unexpected EOF");

        let err = parse_err("foo(1, 2");
        assert!(err.is_eof());
    }

    #[test]
    fn test_expect_peek_message() {
        let err = parse_err("class foo\nend");
        assert_eq!(err.kind, ParserErrorKind::UnexpectedToken);
        assert_eq!(
            err.message,
            "expected next token to be CONSTANT, got IDENT(foo) instead. Line: 1"
        );
    }

    #[test]
    fn test_display_round_trip() {
        let corpus = [
            "a = 10\nb = (a + 1)",
            "def foo(x, y = 10, z:, w: 2, *rest)\n(x + y)\nend",
            "class Foo < Bar\ndef bar\n@x = 1\nend\nend",
            "module Baz\nend",
            "if (a > b)\nc = 1\nelsif (a < b)\nc = 2\nelse\nc = 3\nend",
            "while (i > 0) do\ni = (i - 1)\nnext\nend",
            "[1, 2, 3].each do |x|\nyield(x)\nend",
            "foo.bar = a[1, 2]",
            "h = { a: 1, b: \"two\\n\" }",
            "Foo::Bar.new(1, key: 2)",
            "(1..10)",
            "x = -1.5",
        ];

        for source in corpus {
            let first = parse(source).to_string();
            let second = parse(&first).to_string();
            assert_eq!(first, second, "source: {}", source);
        }
    }

    #[test]
    fn test_mode_survives_serialization() {
        let bytes = postcard::to_allocvec(&ParserMode::Repl).unwrap();
        let mode: ParserMode = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(mode, ParserMode::Repl);
        assert_eq!(ParserMode::default(), ParserMode::Normal);
    }
}

use crate::token::{Token, TokenType, lookup_ident};

/// Context the lexer carries between tokens.
///
/// - `Method`: a `.` (or `def`) was just seen, so the next identifier is a
///   method name even if it collides with a keyword (`foo.class`).
/// - `NoSymbol`: an identifier was just seen, so a following `:` separates a
///   hash key from its value instead of starting a symbol (`{ key: :value }`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexState {
    Initial,
    Method,
    NoSymbol,
}

pub struct Lexer {
    source: Vec<char>,
    pos: usize,
    line: usize,
    state: LexState,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            source: source.chars().collect(),
            pos: 0,
            line: 1,
            state: LexState::Initial,
        }
    }

    fn current(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current();
        if ch == Some('\n') {
            self.line += 1;
        }
        self.pos += 1;
        ch
    }

    /// Consumes `n` characters and builds a token from them.
    fn take(&mut self, kind: TokenType, n: usize, line: usize) -> Token {
        let literal: String = self.source[self.pos..self.pos + n].iter().collect();
        self.pos += n;
        Token::new(kind, literal, line)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current() {
            if ch == ' ' || ch == '\t' || ch == '\r' || ch == '\n' {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn reset_nosymbol(&mut self) {
        if self.state != LexState::Method && self.current() != Some(':') {
            self.state = LexState::Initial;
        }
    }

    /// Returns the next token. Once the input is exhausted every call yields `Eof`.
    pub fn next_token(&mut self) -> Token {
        self.reset_nosymbol();
        self.skip_whitespace();

        let line = self.line;
        let Some(ch) = self.current() else {
            return Token::eof(line);
        };
        let next = self.peek();

        match ch {
            '"' | '\'' => {
                let literal = self.read_string(ch);
                Token::new(TokenType::String, literal, line)
            }
            '=' => match next {
                Some('=') => self.take(TokenType::Eq, 2, line),
                Some('~') => self.take(TokenType::Match, 2, line),
                _ => self.take(TokenType::Assign, 1, line),
            },
            '-' => match next {
                Some('=') => self.take(TokenType::MinusEq, 2, line),
                _ => self.take(TokenType::Minus, 1, line),
            },
            '+' => match next {
                Some('=') => self.take(TokenType::PlusEq, 2, line),
                _ => self.take(TokenType::Plus, 1, line),
            },
            '!' => match next {
                Some('=') => self.take(TokenType::NotEq, 2, line),
                _ => self.take(TokenType::Bang, 1, line),
            },
            '*' => match next {
                Some('*') => self.take(TokenType::Pow, 2, line),
                _ => self.take(TokenType::Asterisk, 1, line),
            },
            '<' => match (next, self.source.get(self.pos + 2).copied()) {
                (Some('='), Some('>')) => self.take(TokenType::Comp, 3, line),
                (Some('='), _) => self.take(TokenType::Lte, 2, line),
                _ => self.take(TokenType::Lt, 1, line),
            },
            '>' => match next {
                Some('=') => self.take(TokenType::Gte, 2, line),
                _ => self.take(TokenType::Gt, 1, line),
            },
            '|' => match (next, self.source.get(self.pos + 2).copied()) {
                (Some('|'), Some('=')) => self.take(TokenType::OrEq, 3, line),
                (Some('|'), _) => self.take(TokenType::Or, 2, line),
                _ => self.take(TokenType::Bar, 1, line),
            },
            '&' => match next {
                Some('&') => self.take(TokenType::And, 2, line),
                _ => self.take(TokenType::Illegal, 1, line),
            },
            '.' => match next {
                Some('.') => self.take(TokenType::Range, 2, line),
                _ => {
                    self.state = LexState::Method;
                    self.take(TokenType::Dot, 1, line)
                }
            },
            ':' => self.read_colon(line),
            '/' => self.take(TokenType::Slash, 1, line),
            '%' => self.take(TokenType::Modulo, 1, line),
            ';' => self.take(TokenType::Semicolon, 1, line),
            ',' => self.take(TokenType::Comma, 1, line),
            '(' => self.take(TokenType::LParen, 1, line),
            ')' => self.take(TokenType::RParen, 1, line),
            '{' => self.take(TokenType::LBrace, 1, line),
            '}' => self.take(TokenType::RBrace, 1, line),
            '[' => self.take(TokenType::LBracket, 1, line),
            ']' => self.take(TokenType::RBracket, 1, line),
            '#' => self.read_comment(line),
            '@' => {
                if next.is_some_and(is_letter) {
                    let literal = self.read_while(|c| is_letter(c) || c.is_ascii_digit() || c == '@');
                    Token::new(TokenType::InstanceVariable, literal, line)
                } else {
                    self.take(TokenType::Illegal, 1, line)
                }
            }
            c if is_letter(c) => self.read_word(line),
            c if c.is_ascii_digit() => {
                // `1.5` arrives as `Int Dot Int`; the fraction ends the method state
                self.state = LexState::Initial;
                let literal = self.read_while(|c| c.is_ascii_digit());
                Token::new(TokenType::Int, literal, line)
            }
            _ => self.take(TokenType::Illegal, 1, line),
        }
    }

    /// Tokenizes the whole input. The final token is always `Eof`.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token.kind == TokenType::Eof;
            tokens.push(token);
            if done {
                return tokens;
            }
        }
    }

    fn read_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let mut out = String::new();
        while let Some(ch) = self.current() {
            if !pred(ch) {
                break;
            }
            out.push(ch);
            self.advance();
        }
        out
    }

    fn read_word(&mut self, line: usize) -> Token {
        let is_constant = self.current().is_some_and(|c| c.is_ascii_uppercase());
        let mut literal = self.read_while(|c| is_letter(c) || c.is_ascii_digit());

        if is_constant {
            self.state = LexState::Initial;
            return Token::new(TokenType::Constant, literal, line);
        }

        if self.current() == Some('?') {
            literal.push('?');
            self.advance();
        }

        let kind = match self.state {
            LexState::Method if literal == "self" => TokenType::SelfKw,
            LexState::Method => TokenType::Ident,
            _ => lookup_ident(&literal),
        };

        self.state = match kind {
            TokenType::Def => LexState::Method,
            TokenType::Ident => LexState::NoSymbol,
            _ => LexState::Initial,
        };

        Token::new(kind, literal, line)
    }

    fn read_colon(&mut self, line: usize) -> Token {
        if self.state == LexState::NoSymbol {
            return self.take(TokenType::Colon, 1, line);
        }

        match self.peek() {
            Some(':') => self.take(TokenType::ResolutionOperator, 2, line),
            Some(c) if is_letter(c) => {
                self.advance(); // ':'
                let name = self.read_while(|c| is_letter(c) || c.is_ascii_digit());
                Token::new(TokenType::String, name, line)
            }
            _ => self.take(TokenType::Colon, 1, line),
        }
    }

    fn read_comment(&mut self, line: usize) -> Token {
        let literal = self.read_while(|c| c != '\n');
        Token::new(TokenType::Comment, literal, line)
    }

    /// Reads a quoted string starting at the opening `quote`.
    ///
    /// Double-quoted strings expand the usual control escapes. Single-quoted
    /// strings only unescape quotes. Unknown escapes keep their backslash. An
    /// unterminated string runs to the end of input.
    fn read_string(&mut self, quote: char) -> String {
        self.advance();

        let mut string = String::new();
        while let Some(ch) = self.current() {
            if ch == quote {
                self.advance();
                break;
            }

            if ch == '\\' {
                let Some(escaped) = self.peek() else {
                    string.push('\\');
                    self.advance();
                    break;
                };
                match unescape(quote, escaped) {
                    Some(c) => string.push(c),
                    None => {
                        string.push('\\');
                        string.push(escaped);
                    }
                }
                self.advance();
                self.advance();
                continue;
            }

            string.push(ch);
            self.advance();
        }
        string
    }
}

fn is_letter(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn unescape(quote: char, ch: char) -> Option<char> {
    match (quote, ch) {
        (_, '"') => Some('"'),
        (_, '\'') => Some('\''),
        ('"', 'n') => Some('\n'),
        ('"', 't') => Some('\t'),
        ('"', 'v') => Some('\x0b'),
        ('"', 'f') => Some('\x0c'),
        ('"', 'r') => Some('\r'),
        ('"', '\\') => Some('\\'),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TokenType::*;

    fn kinds(source: &str) -> Vec<TokenType> {
        Lexer::new(source)
            .tokenize()
            .into_iter()
            .map(|t| t.kind)
            .filter(|k| *k != Eof)
            .collect()
    }

    fn tokens(source: &str) -> Vec<(TokenType, std::string::String)> {
        Lexer::new(source)
            .tokenize()
            .into_iter()
            .filter(|t| t.kind != Eof)
            .map(|t| (t.kind, t.literal))
            .collect()
    }

    fn single(source: &str) -> Token {
        let mut lexer = Lexer::new(source);
        lexer.next_token()
    }

    #[test]
    fn test_assignment_and_arithmetic() {
        assert_eq!(
            tokens("five = 5 + 10 * 2"),
            vec![
                (Ident, "five".to_string()),
                (Assign, "=".to_string()),
                (Int, "5".to_string()),
                (Plus, "+".to_string()),
                (Int, "10".to_string()),
                (Asterisk, "*".to_string()),
                (Int, "2".to_string()),
            ]
        );
    }

    #[test]
    fn test_multi_character_operators() {
        assert_eq!(
            kinds("== != <= >= <=> && || ||= += -= ** :: .. =~"),
            vec![
                Eq, NotEq, Lte, Gte, Comp, And, Or, OrEq, PlusEq, MinusEq, Pow,
                ResolutionOperator, Range, Match
            ]
        );
    }

    #[test]
    fn test_single_character_operators() {
        assert_eq!(
            kinds("= < > ! - / * % ; , ( ) { } [ ] |"),
            vec![
                Assign, Lt, Gt, Bang, Minus, Slash, Asterisk, Modulo, Semicolon, Comma, LParen,
                RParen, LBrace, RBrace, LBracket, RBracket, Bar
            ]
        );
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            kinds("class module if elsif else end while do return next break yield true false nil self case when then get_block def"),
            vec![
                Class, Module, If, ElsIf, Else, End, While, Do, Return, Next, Break, Yield, True,
                False, Nil, SelfKw, Case, When, Then, GetBlock, Def
            ]
        );
        assert_eq!(kinds("classes"), vec![Ident]);
    }

    #[test]
    fn test_method_state_turns_keywords_into_identifiers() {
        assert_eq!(
            tokens("foo.class"),
            vec![
                (Ident, "foo".to_string()),
                (Dot, ".".to_string()),
                (Ident, "class".to_string()),
            ]
        );
        assert_eq!(kinds("foo.end"), vec![Ident, Dot, Ident]);
        assert_eq!(kinds("foo.self"), vec![Ident, Dot, SelfKw]);
        // state resets after the method name
        assert_eq!(kinds("foo.bar; end"), vec![Ident, Dot, Ident, Semicolon, End]);
    }

    #[test]
    fn test_def_accepts_keyword_method_names() {
        assert_eq!(kinds("def class; end"), vec![Def, Ident, Semicolon, End]);
        assert_eq!(kinds("def self.foo"), vec![Def, SelfKw, Dot, Ident]);
    }

    #[test]
    fn test_constants_and_instance_variables() {
        assert_eq!(
            tokens("Foo @bar Baz2 @x1"),
            vec![
                (Constant, "Foo".to_string()),
                (InstanceVariable, "@bar".to_string()),
                (Constant, "Baz2".to_string()),
                (InstanceVariable, "@x1".to_string()),
            ]
        );
    }

    #[test]
    fn test_lone_at_sign_is_illegal() {
        assert_eq!(kinds("@ 1"), vec![Illegal, Int]);
        assert_eq!(single("@1").literal, "@");
    }

    #[test]
    fn test_unknown_character_is_illegal() {
        let tok = single("$");
        assert_eq!(tok.kind, Illegal);
        assert_eq!(tok.literal, "$");
        assert_eq!(kinds("& 1"), vec![Illegal, Int]);
    }

    #[test]
    fn test_identifier_with_question_mark() {
        assert_eq!(
            tokens("empty? x"),
            vec![(Ident, "empty?".to_string()), (Ident, "x".to_string())]
        );
    }

    #[test]
    fn test_symbols_become_strings() {
        assert_eq!(
            tokens("x = :foo"),
            vec![
                (Ident, "x".to_string()),
                (Assign, "=".to_string()),
                (String, "foo".to_string()),
            ]
        );
    }

    #[test]
    fn test_hash_keys_use_colon_after_identifier() {
        assert_eq!(
            tokens("{ foo: :bar, baz: 1 }"),
            vec![
                (LBrace, "{".to_string()),
                (Ident, "foo".to_string()),
                (Colon, ":".to_string()),
                (String, "bar".to_string()),
                (Comma, ",".to_string()),
                (Ident, "baz".to_string()),
                (Colon, ":".to_string()),
                (Int, "1".to_string()),
                (RBrace, "}".to_string()),
            ]
        );
    }

    #[test]
    fn test_resolution_operator() {
        assert_eq!(
            kinds("Foo::Bar::Baz"),
            vec![Constant, ResolutionOperator, Constant, ResolutionOperator, Constant]
        );
    }

    #[test]
    fn test_double_quoted_escapes_expand() {
        let tok = single(r#""a\nb\tc\\d\"e\'f\qg""#);
        assert_eq!(tok.kind, String);
        assert_eq!(tok.literal, "a\nb\tc\\d\"e'f\\qg");
    }

    #[test]
    fn test_double_quoted_control_escapes() {
        let tok = single(r#""v\vf\fr\r""#);
        assert_eq!(tok.literal, "v\x0bf\x0cr\r");

        let tok = single(r#"'v\vf\fr\r'"#);
        assert_eq!(tok.literal, "v\\vf\\fr\\r");
    }

    #[test]
    fn test_float_does_not_leave_method_state() {
        assert_eq!(kinds("1.5 if"), vec![Int, Dot, Int, If]);
        assert_eq!(kinds("[1.5, nil]"), vec![LBracket, Int, Dot, Int, Comma, Nil, RBracket]);
        // a method name right after the dot is still an identifier
        assert_eq!(kinds("1.class"), vec![Int, Dot, Ident]);
    }

    #[test]
    fn test_single_quoted_escapes_stay_literal() {
        let tok = single(r#"'a\nb\'c\"d'"#);
        assert_eq!(tok.kind, String);
        assert_eq!(tok.literal, "a\\nb'c\"d");
    }

    #[test]
    fn test_empty_strings() {
        assert_eq!(tokens(r#""" ''"#), vec![(String, "".to_string()), (String, "".to_string())]);
    }

    #[test]
    fn test_comment_runs_to_end_of_line() {
        let all = Lexer::new("1 # note here\n2").tokenize();
        assert_eq!(all[1].kind, Comment);
        assert_eq!(all[1].literal, "# note here");
        assert_eq!(all[1].line, 1);
        assert_eq!(all[2].kind, Int);
        assert_eq!(all[2].line, 2);
    }

    #[test]
    fn test_line_numbers_and_eof() {
        let all = Lexer::new("a\n\nb\n  c\n").tokenize();
        let lines: Vec<usize> = all.iter().map(|t| t.line).collect();
        assert_eq!(lines, vec![1, 3, 4, 5]);
        assert_eq!(all.last().map(|t| t.kind), Some(Eof));
    }

    #[test]
    fn test_empty_input_yields_eof_on_line_one() {
        let mut lexer = Lexer::new("");
        let tok = lexer.next_token();
        assert_eq!(tok.kind, Eof);
        assert_eq!(tok.line, 1);
        // stays at EOF
        assert_eq!(lexer.next_token().kind, Eof);
    }

    #[test]
    fn test_block_params_and_range() {
        assert_eq!(
            kinds("(1..4).each do |i, j| end"),
            vec![
                LParen, Int, Range, Int, RParen, Dot, Ident, Do, Bar, Ident, Comma, Ident, Bar,
                End
            ]
        );
    }

    #[test]
    fn test_float_is_three_tokens() {
        assert_eq!(kinds("1.5"), vec![Int, Dot, Int]);
    }

    #[test]
    fn test_literals_concatenate_back_to_source() {
        let src = "a = foo(1, 2) + [3]";
        let joined: std::string::String = Lexer::new(src)
            .tokenize()
            .into_iter()
            .map(|t| t.literal)
            .collect();
        assert_eq!(joined, src.replace(' ', ""));
    }
}

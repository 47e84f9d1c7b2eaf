use serde::{Deserialize, Serialize};

/// Token categories produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenType {
    Illegal,
    Eof,

    // Literals
    Constant,
    Ident,
    InstanceVariable,
    Int,
    Float,
    String,
    Comment,

    // Operators
    Assign,   // =
    Plus,     // +
    PlusEq,   // +=
    Minus,    // -
    MinusEq,  // -=
    Bang,     // !
    Asterisk, // *
    Pow,      // **
    Slash,    // /
    Dot,      // .
    And,      // &&
    Or,       // ||
    OrEq,     // ||=
    Modulo,   // %
    Match,    // =~
    Lt,       // <
    Lte,      // <=
    Gt,       // >
    Gte,      // >=
    Comp,     // <=>
    Eq,       // ==
    NotEq,    // !=
    Range,    // ..
    ResolutionOperator, // ::

    // Separators
    Comma,
    Semicolon,
    Colon,
    Bar,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,

    // Keywords
    True,
    False,
    Nil,
    If,
    ElsIf,
    Else,
    Case,
    When,
    Then,
    Return,
    Next,
    Break,
    Def,
    SelfKw,
    End,
    While,
    Do,
    Yield,
    GetBlock,
    Class,
    Module,
}

impl TokenType {
    /// Token types that may start a parenthesis-free argument list, as in `puts 10`.
    pub fn starts_argument(self) -> bool {
        matches!(
            self,
            TokenType::Int
                | TokenType::String
                | TokenType::True
                | TokenType::False
                | TokenType::Nil
                | TokenType::InstanceVariable
                | TokenType::Ident
                | TokenType::Constant
        )
    }
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TokenType::Illegal => "ILLEGAL",
            TokenType::Eof => "EOF",
            TokenType::Constant => "CONSTANT",
            TokenType::Ident => "IDENT",
            TokenType::InstanceVariable => "INSTANCE_VAR",
            TokenType::Int => "INT",
            TokenType::Float => "FLOAT",
            TokenType::String => "STRING",
            TokenType::Comment => "COMMENT",
            TokenType::Assign => "=",
            TokenType::Plus => "+",
            TokenType::PlusEq => "+=",
            TokenType::Minus => "-",
            TokenType::MinusEq => "-=",
            TokenType::Bang => "!",
            TokenType::Asterisk => "*",
            TokenType::Pow => "**",
            TokenType::Slash => "/",
            TokenType::Dot => ".",
            TokenType::And => "&&",
            TokenType::Or => "||",
            TokenType::OrEq => "||=",
            TokenType::Modulo => "%",
            TokenType::Match => "=~",
            TokenType::Lt => "<",
            TokenType::Lte => "<=",
            TokenType::Gt => ">",
            TokenType::Gte => ">=",
            TokenType::Comp => "<=>",
            TokenType::Eq => "==",
            TokenType::NotEq => "!=",
            TokenType::Range => "..",
            TokenType::ResolutionOperator => "::",
            TokenType::Comma => ",",
            TokenType::Semicolon => ";",
            TokenType::Colon => ":",
            TokenType::Bar => "|",
            TokenType::LParen => "(",
            TokenType::RParen => ")",
            TokenType::LBrace => "{",
            TokenType::RBrace => "}",
            TokenType::LBracket => "[",
            TokenType::RBracket => "]",
            TokenType::True => "TRUE",
            TokenType::False => "FALSE",
            TokenType::Nil => "NIL",
            TokenType::If => "IF",
            TokenType::ElsIf => "ELSIF",
            TokenType::Else => "ELSE",
            TokenType::Case => "CASE",
            TokenType::When => "WHEN",
            TokenType::Then => "THEN",
            TokenType::Return => "RETURN",
            TokenType::Next => "NEXT",
            TokenType::Break => "BREAK",
            TokenType::Def => "DEF",
            TokenType::SelfKw => "SELF",
            TokenType::End => "END",
            TokenType::While => "WHILE",
            TokenType::Do => "DO",
            TokenType::Yield => "YIELD",
            TokenType::GetBlock => "GET_BLOCK",
            TokenType::Class => "CLASS",
            TokenType::Module => "MODULE",
        };
        write!(f, "{}", name)
    }
}

/// A lexeme with its category and the 1-based line it started on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenType,
    pub literal: String,
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenType, literal: impl Into<String>, line: usize) -> Self {
        Token {
            kind,
            literal: literal.into(),
            line,
        }
    }

    /// Placeholder used before the parser has read anything.
    pub fn eof(line: usize) -> Self {
        Token::new(TokenType::Eof, "", line)
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.kind, self.literal)
    }
}

/// Maps reserved words to their keyword type; everything else is an `Ident`.
pub fn lookup_ident(ident: &str) -> TokenType {
    match ident {
        "def" => TokenType::Def,
        "true" => TokenType::True,
        "false" => TokenType::False,
        "nil" => TokenType::Nil,
        "if" => TokenType::If,
        "elsif" => TokenType::ElsIf,
        "else" => TokenType::Else,
        "case" => TokenType::Case,
        "when" => TokenType::When,
        "then" => TokenType::Then,
        "return" => TokenType::Return,
        "self" => TokenType::SelfKw,
        "end" => TokenType::End,
        "while" => TokenType::While,
        "do" => TokenType::Do,
        "yield" => TokenType::Yield,
        "next" => TokenType::Next,
        "class" => TokenType::Class,
        "module" => TokenType::Module,
        "break" => TokenType::Break,
        "get_block" => TokenType::GetBlock,
        _ => TokenType::Ident,
    }
}

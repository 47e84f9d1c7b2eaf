use crate::token::TokenType;

/// Binding power of an operator, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    Lowest,
    Normal,
    Assign,
    Logic,
    Range,
    Equals,
    Compare,
    Sum,
    Product,
    Prefix,
    Index,
    Call,
}

impl Precedence {
    /// Tokens without an entry bind at `Normal`.
    pub fn of(kind: TokenType) -> Precedence {
        match kind {
            TokenType::Eq | TokenType::NotEq => Precedence::Equals,
            TokenType::Match
            | TokenType::Lt
            | TokenType::Lte
            | TokenType::Gt
            | TokenType::Gte
            | TokenType::Comp => Precedence::Compare,
            TokenType::And | TokenType::Or => Precedence::Logic,
            TokenType::Range => Precedence::Range,
            TokenType::Plus | TokenType::Minus | TokenType::Modulo => Precedence::Sum,
            TokenType::Slash | TokenType::Asterisk | TokenType::Pow => Precedence::Product,
            TokenType::Assign
            | TokenType::PlusEq
            | TokenType::MinusEq
            | TokenType::OrEq
            | TokenType::Colon => Precedence::Assign,
            TokenType::LBracket => Precedence::Index,
            TokenType::Dot | TokenType::LParen | TokenType::ResolutionOperator => Precedence::Call,
            _ => Precedence::Normal,
        }
    }
}

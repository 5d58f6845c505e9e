#![forbid(unsafe_code)]

use bound_ast::Span;

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// 1-based source line.
    pub line: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    // Keywords
    KwAssume,
    KwDefine,
    KwLambda,
    KwPi,

    // Operators / punctuation
    Arrow,
    Colon,
    Eq,
    Dot,
    Comma,
    Semi,
    Star,

    LParen,
    RParen,
    LBracket,
    RBracket,

    Eof,

    // Literals / identifiers
    Ident(String),
    Int(u64),
}

impl TokenKind {
    pub fn describe(&self) -> String {
        match self {
            TokenKind::KwAssume => "`assume`".to_string(),
            TokenKind::KwDefine => "`define`".to_string(),
            TokenKind::KwLambda => "`lambda`".to_string(),
            TokenKind::KwPi => "`pi`".to_string(),
            TokenKind::Arrow => "`->`".to_string(),
            TokenKind::Colon => "`:`".to_string(),
            TokenKind::Eq => "`=`".to_string(),
            TokenKind::Dot => "`.`".to_string(),
            TokenKind::Comma => "`,`".to_string(),
            TokenKind::Semi => "`;`".to_string(),
            TokenKind::Star => "`*`".to_string(),
            TokenKind::LParen => "`(`".to_string(),
            TokenKind::RParen => "`)`".to_string(),
            TokenKind::LBracket => "`[`".to_string(),
            TokenKind::RBracket => "`]`".to_string(),
            TokenKind::Eof => "end of input".to_string(),
            TokenKind::Ident(name) => format!("identifier `{name}`"),
            TokenKind::Int(n) => format!("literal `{n}`"),
        }
    }
}

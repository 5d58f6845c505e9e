#![forbid(unsafe_code)]
#![allow(unused_assignments)]

use bound_ast::{span_between, Span};
use logos::Logos;
use miette::Diagnostic;
use thiserror::Error;

use crate::token::{Token, TokenKind};

#[derive(Debug, Error, Diagnostic)]
#[error("lex error on line {line}: {message}")]
#[diagnostic(code(bound::lex))]
#[allow(unused_assignments)]
pub struct LexError {
    pub message: String,
    pub line: usize,
    #[label]
    pub span: Span,
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\f\r]+")]
enum RawToken {
    #[token("assume")]
    KwAssume,
    #[token("define")]
    KwDefine,
    #[token("lambda")]
    #[token("λ")]
    KwLambda,
    #[token("pi")]
    #[token("Π")]
    KwPi,

    #[token("->")]
    #[token("→")]
    Arrow,

    #[token(":")]
    Colon,
    #[token("=")]
    Eq,
    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
    #[token(";")]
    Semi,
    #[token("*")]
    Star,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,

    #[regex(r"0b[01_]+", |lex| parse_int_prefixed(lex.slice(), 2, 2))]
    #[regex(r"0x[0-9a-fA-F_]+", |lex| parse_int_prefixed(lex.slice(), 16, 2))]
    #[regex(r"[0-9][0-9_]*", |lex| parse_int_decimal(lex.slice()))]
    Int(Option<u64>),

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_']*", |lex| lex.slice().to_string())]
    Ident(String),
}

fn parse_int_decimal(s: &str) -> Option<u64> {
    let digits = strip_underscores(s)?;
    digits.parse::<u64>().ok()
}

fn parse_int_prefixed(s: &str, radix: u32, prefix_len: usize) -> Option<u64> {
    let rest = s.get(prefix_len..)?;
    let digits = strip_underscores(rest)?;
    u64::from_str_radix(&digits, radix).ok()
}

fn strip_underscores(s: &str) -> Option<String> {
    if s.is_empty() {
        return None;
    }
    if s.starts_with('_') || s.ends_with('_') || s.contains("__") {
        return None;
    }
    Some(s.replace('_', ""))
}

/// `pi_` or `lambda_` directly followed by `:` is a binder keyword with
/// the anonymous binder glued on.
fn anonymous_binder(ident: &str, rest: &str) -> Option<TokenKind> {
    if !rest.trim_start().starts_with(':') {
        return None;
    }
    match ident {
        "pi_" => Some(TokenKind::KwPi),
        "lambda_" => Some(TokenKind::KwLambda),
        _ => None,
    }
}

pub struct Lexer<'a> {
    src: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src }
    }

    pub fn lex(&self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        // Track absolute byte offsets.
        let mut line_start = 0usize;

        for (line_idx, line) in self.src.split_inclusive('\n').enumerate() {
            let line_no = line_idx + 1;
            let line_end = line_start + line.len();

            // `//` runs to the end of the line.
            let mut code = line.strip_suffix('\n').unwrap_or(line);
            if let Some(idx) = code.find("//") {
                code = &code[..idx];
            }
            if code.trim().is_empty() {
                line_start = line_end;
                continue;
            }

            let mut lex = RawToken::lexer(code);
            while let Some(raw) = lex.next() {
                let span_in_line = lex.span();
                let abs_start = line_start + span_in_line.start;
                let abs_end = line_start + span_in_line.end;
                let span = span_between(abs_start, abs_end);

                let kind = match raw {
                    Ok(RawToken::KwAssume) => TokenKind::KwAssume,
                    Ok(RawToken::KwDefine) => TokenKind::KwDefine,
                    Ok(RawToken::KwLambda) => TokenKind::KwLambda,
                    Ok(RawToken::KwPi) => TokenKind::KwPi,

                    Ok(RawToken::Arrow) => TokenKind::Arrow,

                    Ok(RawToken::Colon) => TokenKind::Colon,
                    Ok(RawToken::Eq) => TokenKind::Eq,
                    Ok(RawToken::Dot) => TokenKind::Dot,
                    Ok(RawToken::Comma) => TokenKind::Comma,
                    Ok(RawToken::Semi) => TokenKind::Semi,
                    Ok(RawToken::Star) => TokenKind::Star,

                    Ok(RawToken::LParen) => TokenKind::LParen,
                    Ok(RawToken::RParen) => TokenKind::RParen,
                    Ok(RawToken::LBracket) => TokenKind::LBracket,
                    Ok(RawToken::RBracket) => TokenKind::RBracket,

                    Ok(RawToken::Ident(s)) => {
                        if let Some(keyword) = anonymous_binder(&s, &code[span_in_line.end..]) {
                            // `pi_:` reads as `pi _:`.
                            let keyword_end = abs_end - 1;
                            tokens.push(Token {
                                kind: keyword,
                                span: span_between(abs_start, keyword_end),
                                line: line_no,
                            });
                            tokens.push(Token {
                                kind: TokenKind::Ident("_".to_string()),
                                span: span_between(keyword_end, abs_end),
                                line: line_no,
                            });
                            continue;
                        }
                        TokenKind::Ident(s)
                    }
                    Ok(RawToken::Int(Some(n))) => TokenKind::Int(n),
                    Ok(RawToken::Int(None)) => {
                        return Err(LexError {
                            message: "invalid integer literal".to_string(),
                            line: line_no,
                            span,
                        });
                    }

                    Err(_) => {
                        return Err(LexError {
                            message: format!("unexpected token `{}`", lex.slice()),
                            line: line_no,
                            span,
                        });
                    }
                };

                tokens.push(Token {
                    kind,
                    span,
                    line: line_no,
                });
            }

            line_start = line_end;
        }

        let last_line = self.src.lines().count().max(1);
        tokens.push(Token {
            kind: TokenKind::Eof,
            span: span_between(self.src.len(), self.src.len()),
            line: last_line,
        });

        Ok(tokens)
    }
}

#![forbid(unsafe_code)]

use std::mem;

use bound_ast::{
    span_between, AssumeStmt, DefineStmt, Ident, Program, Span, Stmt, Term, TermRef,
};
use bound_lex::{Token, TokenKind};

use crate::error::ParseError;

pub struct Parser<'a> {
    tokens: &'a [Token],
    idx: usize,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, idx: 0 }
    }

    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut stmts = Vec::new();
        while !self.at(TokenKind::Eof) {
            stmts.push(self.parse_stmt()?);
        }
        Ok(Program { stmts })
    }

    /// Parse a program while attempting to recover from errors.
    ///
    /// On a statement parse error, skip past the next `;` and continue. A
    /// failed statement never contributes a partial node.
    pub fn parse_program_with_recovery(&mut self) -> (Program, Vec<ParseError>) {
        let mut stmts = Vec::new();
        let mut errors = Vec::new();

        while !self.at(TokenKind::Eof) {
            let start = self.idx;
            match self.parse_stmt() {
                Ok(stmt) => stmts.push(stmt),
                Err(err) => {
                    errors.push(err);
                    self.recover_to_stmt_boundary(start);
                }
            }
        }

        (Program { stmts }, errors)
    }

    fn recover_to_stmt_boundary(&mut self, start: usize) {
        // Guarantee progress even when the error was raised on the first token.
        if self.idx == start && !self.at(TokenKind::Eof) {
            self.next();
        }
        // The terminator that ended the failed statement may already be consumed.
        if self.idx > start && self.prev_kind().is_some_and(|k| matches!(k, TokenKind::Semi)) {
            return;
        }
        while !self.at(TokenKind::Eof) {
            if self.at(TokenKind::Semi) {
                self.next();
                break;
            }
            if self.at(TokenKind::KwAssume) || self.at(TokenKind::KwDefine) {
                break;
            }
            self.next();
        }
    }

    fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        match self.peek_kind() {
            Some(TokenKind::KwAssume) => Ok(Stmt::Assume(self.parse_assume()?)),
            Some(TokenKind::KwDefine) => Ok(Stmt::Define(self.parse_define()?)),
            _ => Err(self.error_here("expected `assume` or `define`")),
        }
    }

    fn parse_assume(&mut self) -> Result<AssumeStmt, ParseError> {
        let start = self.expect(TokenKind::KwAssume)?.span;
        let name = self.expect_ident()?;
        self.expect(TokenKind::Colon)?;
        let ty = self.parse_term()?;
        let end = self.expect_stmt_terminator()?;
        Ok(AssumeStmt {
            span: join(start, end),
            name,
            ty,
        })
    }

    fn parse_define(&mut self) -> Result<DefineStmt, ParseError> {
        let start = self.expect(TokenKind::KwDefine)?.span;
        let name = self.expect_ident()?;
        let ty = if self.at(TokenKind::Colon) {
            self.next();
            Some(self.parse_term()?)
        } else {
            None
        };
        self.expect(TokenKind::Eq)?;
        let value = self.parse_term()?;
        let end = self.expect_stmt_terminator()?;
        Ok(DefineStmt {
            span: join(start, end),
            name,
            ty,
            value,
        })
    }

    pub fn parse_term(&mut self) -> Result<TermRef, ParseError> {
        match self.peek_kind() {
            Some(TokenKind::KwLambda) => {
                self.next();
                let (param, domain, body) = self.parse_binder_tail()?;
                Ok(Term::lambda(param, domain, body))
            }
            Some(TokenKind::KwPi) => {
                self.next();
                let (param, domain, body) = self.parse_binder_tail()?;
                Ok(Term::pi(param, domain, body))
            }
            _ => self.parse_arrow(),
        }
    }

    pub fn parse_term_eof(&mut self) -> Result<TermRef, ParseError> {
        let term = self.parse_term()?;
        if !self.at(TokenKind::Eof) {
            return Err(self.error_here("unexpected trailing input"));
        }
        Ok(term)
    }

    // `x: T. body`
    fn parse_binder_tail(&mut self) -> Result<(String, TermRef, TermRef), ParseError> {
        let param = self.expect_ident()?;
        self.expect(TokenKind::Colon)?;
        let domain = self.parse_term()?;
        self.expect(TokenKind::Dot)?;
        let body = self.parse_term()?;
        Ok((param.node, domain, body))
    }

    fn parse_arrow(&mut self) -> Result<TermRef, ParseError> {
        let domain = self.parse_app()?;
        if self.at(TokenKind::Arrow) {
            self.next();
            // `A -> pi x: B. C` needs no parentheses around the binder.
            let codomain = self.parse_term()?;
            return Ok(Term::arrow(domain, codomain));
        }
        Ok(domain)
    }

    // Juxtaposition is left-associative: `f x y` is `(f x) y`.
    fn parse_app(&mut self) -> Result<TermRef, ParseError> {
        let mut term = self.parse_postfix()?;
        while self.at_atom_start() {
            let arg = self.parse_postfix()?;
            term = Term::app(term, arg);
        }
        Ok(term)
    }

    fn parse_postfix(&mut self) -> Result<TermRef, ParseError> {
        let mut term = self.parse_atom()?;
        while self.at(TokenKind::LBracket) {
            self.next();
            let tok = self.expect_any()?;
            let index = match tok.kind {
                TokenKind::Int(n @ (0 | 1)) => n as u8,
                TokenKind::Int(n) => {
                    return Err(ParseError {
                        message: format!("projection index must be 0 or 1, found {n}"),
                        line: tok.line,
                        span: tok.span,
                    });
                }
                other => {
                    return Err(ParseError {
                        message: format!("expected projection index, found {}", other.describe()),
                        line: tok.line,
                        span: tok.span,
                    });
                }
            };
            self.expect(TokenKind::RBracket)?;
            term = Term::proj(term, index);
        }
        Ok(term)
    }

    fn parse_atom(&mut self) -> Result<TermRef, ParseError> {
        let tok = self.expect_any()?;
        match tok.kind {
            TokenKind::Ident(name) => Ok(Term::var(name)),
            TokenKind::Int(n) => Ok(Term::lit(n)),
            TokenKind::Star => Ok(Term::star()),
            TokenKind::LParen => {
                let first = self.parse_term()?;
                let mut items = vec![first];
                while self.at(TokenKind::Comma) {
                    self.next();
                    items.push(self.parse_term()?);
                }
                self.expect(TokenKind::RParen)?;
                Ok(right_nested_pair(items))
            }
            other => Err(ParseError {
                message: format!("expected a term, found {}", other.describe()),
                line: tok.line,
                span: tok.span,
            }),
        }
    }

    fn at_atom_start(&self) -> bool {
        matches!(
            self.peek_kind(),
            Some(TokenKind::Ident(_) | TokenKind::Int(_) | TokenKind::Star | TokenKind::LParen)
        )
    }

    fn expect_stmt_terminator(&mut self) -> Result<Span, ParseError> {
        if self.at(TokenKind::Semi) {
            let tok = self.expect_any()?;
            Ok(tok.span)
        } else {
            Err(self.error_here("expected `;` to end the statement"))
        }
    }

    fn expect_ident(&mut self) -> Result<Ident, ParseError> {
        let tok = self.expect_any()?;
        match tok.kind {
            TokenKind::Ident(name) => Ok(Ident {
                span: tok.span,
                node: name,
            }),
            other => Err(ParseError {
                message: format!("expected identifier, found {}", other.describe()),
                line: tok.line,
                span: tok.span,
            }),
        }
    }

    fn expect(&mut self, expected: TokenKind) -> Result<Token, ParseError> {
        let tok = self.expect_any()?;
        if mem::discriminant(&tok.kind) == mem::discriminant(&expected) {
            Ok(tok)
        } else {
            Err(ParseError {
                message: format!("expected {}, found {}", expected.describe(), tok.kind.describe()),
                line: tok.line,
                span: tok.span,
            })
        }
    }

    fn expect_any(&mut self) -> Result<Token, ParseError> {
        // Eof is never consumed, so every loop keyed on it terminates.
        if self.peek_kind().is_none_or(|k| matches!(k, TokenKind::Eof)) {
            return Err(self.error_here("unexpected end of input"));
        }
        self.next()
            .ok_or_else(|| self.error_here("unexpected end of input"))
    }

    fn error_here(&self, message: &str) -> ParseError {
        let (line, span) = self
            .tokens
            .get(self.idx.min(self.tokens.len().saturating_sub(1)))
            .map(|t| (t.line, t.span))
            .unwrap_or((1, span_between(0, 0)));
        ParseError {
            message: message.to_string(),
            line,
            span,
        }
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind()
            .is_some_and(|k| mem::discriminant(k) == mem::discriminant(&kind))
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.idx)?.clone();
        self.idx += 1;
        Some(tok)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.tokens.get(self.idx).map(|t| &t.kind)
    }

    fn prev_kind(&self) -> Option<&TokenKind> {
        self.idx.checked_sub(1).and_then(|i| self.tokens.get(i)).map(|t| &t.kind)
    }
}

// `(a, b, c)` is `(a, (b, c))`; a single item is plain grouping.
fn right_nested_pair(mut items: Vec<TermRef>) -> TermRef {
    let mut acc = items.pop().unwrap_or_else(Term::star);
    while let Some(prev) = items.pop() {
        acc = Term::pair(prev, acc);
    }
    acc
}

fn join(a: Span, b: Span) -> Span {
    let a0: usize = a.offset();
    let b0: usize = b.offset();
    let b1 = b0 + b.len();
    if b0 >= a0 {
        span_between(a0, b1)
    } else {
        let a1 = a0 + a.len();
        span_between(b0, a1)
    }
}

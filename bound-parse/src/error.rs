#![forbid(unsafe_code)]
#![allow(unused_assignments)]

use bound_ast::Span;
use bound_lex::LexError;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Clone, Debug, Error, Diagnostic)]
#[error("syntax error on line {line}: {message}")]
#[diagnostic(code(bound::parse))]
#[allow(unused_assignments)]
pub struct ParseError {
    pub message: String,
    /// 1-based source line.
    pub line: usize,
    #[label]
    pub span: Span,
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        Self {
            message: err.message,
            line: err.line,
            span: err.span,
        }
    }
}

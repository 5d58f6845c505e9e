#![forbid(unsafe_code)]
#![allow(unused_assignments)]

use std::fmt;

use bound_ast::Term;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeErrorKind {
    UnboundName,
    NotAFunction,
    DomainMismatch,
    NotAPair,
    /// Reduction ran out of fuel while normalizing a type.
    ReductionLimit,
}

impl fmt::Display for TypeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TypeErrorKind::UnboundName => "unbound name",
            TypeErrorKind::NotAFunction => "not a function",
            TypeErrorKind::DomainMismatch => "domain mismatch",
            TypeErrorKind::NotAPair => "not a pair",
            TypeErrorKind::ReductionLimit => "reduction limit",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, Error, Diagnostic)]
#[error("type error ({kind}): {message}")]
#[diagnostic(code(bound::typeck))]
#[allow(unused_assignments)]
pub struct TypeError {
    pub kind: TypeErrorKind,
    /// The offending term, rendered.
    pub term: String,
    pub message: String,
}

impl TypeError {
    pub fn new(kind: TypeErrorKind, term: &Term, message: impl Into<String>) -> Self {
        Self {
            kind,
            term: term.to_string(),
            message: message.into(),
        }
    }
}

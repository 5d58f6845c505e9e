#![forbid(unsafe_code)]

use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use miette::SourceSpan;

pub type Span = SourceSpan;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Spanned<T> {
    pub span: Span,
    pub node: T,
}

impl<T> Spanned<T> {
    pub fn new(span: Span, node: T) -> Self {
        Self { span, node }
    }
}

pub fn span(start: usize, len: usize) -> Span {
    SourceSpan::new(start.into(), len)
}

pub fn span_between(start: usize, end: usize) -> Span {
    debug_assert!(end >= start);
    span(start, end - start)
}

pub type Ident = Spanned<String>;

/// Binder name used for non-dependent arrows (`A -> B`).
pub const ANON_BINDER: &str = "_";

pub type TermRef = Rc<Term>;

/// The single syntactic category of the calculus: types are terms.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Term {
    Var(String),
    Lit(u64),
    /// The universal sort `*`.
    Star,
    /// The natural-number base type.
    Nat,
    Lambda {
        param: String,
        domain: TermRef,
        body: TermRef,
    },
    Pi {
        param: String,
        domain: TermRef,
        codomain: TermRef,
    },
    App {
        func: TermRef,
        arg: TermRef,
    },
    Pair {
        first: TermRef,
        second: TermRef,
    },
    Proj {
        pair: TermRef,
        index: u8,
    },
    AxiomRef(Rc<Axiom>),
    DefRef(Rc<Definition>),
}

/// A primitive introduced by `assume`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Axiom {
    pub name: String,
    pub ty: TermRef,
}

/// A named, elaborated term introduced by `define`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Definition {
    pub name: String,
    pub ty: TermRef,
    pub value: TermRef,
}

impl Term {
    pub fn var(name: impl Into<String>) -> TermRef {
        Rc::new(Term::Var(name.into()))
    }

    pub fn lit(n: u64) -> TermRef {
        Rc::new(Term::Lit(n))
    }

    pub fn star() -> TermRef {
        Rc::new(Term::Star)
    }

    pub fn nat() -> TermRef {
        Rc::new(Term::Nat)
    }

    pub fn lambda(param: impl Into<String>, domain: TermRef, body: TermRef) -> TermRef {
        Rc::new(Term::Lambda {
            param: param.into(),
            domain,
            body,
        })
    }

    pub fn pi(param: impl Into<String>, domain: TermRef, codomain: TermRef) -> TermRef {
        Rc::new(Term::Pi {
            param: param.into(),
            domain,
            codomain,
        })
    }

    /// `A -> B`, sugar for `pi _: A. B`.
    pub fn arrow(domain: TermRef, codomain: TermRef) -> TermRef {
        Term::pi(ANON_BINDER, domain, codomain)
    }

    pub fn app(func: TermRef, arg: TermRef) -> TermRef {
        Rc::new(Term::App { func, arg })
    }

    pub fn pair(first: TermRef, second: TermRef) -> TermRef {
        Rc::new(Term::Pair { first, second })
    }

    pub fn proj(pair: TermRef, index: u8) -> TermRef {
        Rc::new(Term::Proj { pair, index })
    }

    pub fn axiom_ref(axiom: Rc<Axiom>) -> TermRef {
        Rc::new(Term::AxiomRef(axiom))
    }

    pub fn def_ref(def: Rc<Definition>) -> TermRef {
        Rc::new(Term::DefRef(def))
    }

    /// Names occurring free. Global references are not variables.
    pub fn free_vars(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        collect_free_vars(self, &mut Vec::new(), &mut out);
        out
    }

    pub fn has_free_var(&self, name: &str) -> bool {
        self.free_vars().contains(name)
    }
}

fn collect_free_vars<'a>(term: &'a Term, bound: &mut Vec<&'a str>, out: &mut BTreeSet<String>) {
    match term {
        Term::Var(name) => {
            if !bound.iter().any(|b| *b == name.as_str()) {
                out.insert(name.clone());
            }
        }
        Term::Lambda {
            param,
            domain,
            body,
        }
        | Term::Pi {
            param,
            domain,
            codomain: body,
        } => {
            collect_free_vars(domain, bound, out);
            bound.push(param);
            collect_free_vars(body, bound, out);
            bound.pop();
        }
        Term::App { func, arg } => {
            collect_free_vars(func, bound, out);
            collect_free_vars(arg, bound, out);
        }
        Term::Pair { first, second } => {
            collect_free_vars(first, bound, out);
            collect_free_vars(second, bound, out);
        }
        Term::Proj { pair, .. } => collect_free_vars(pair, bound, out),
        Term::Lit(_) | Term::Star | Term::Nat | Term::AxiomRef(_) | Term::DefRef(_) => {}
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Prec {
    Binder,
    Arrow,
    App,
    Postfix,
    Atom,
}

fn prec_of(term: &Term) -> Prec {
    match term {
        Term::Lambda { .. } => Prec::Binder,
        Term::Pi {
            param, codomain, ..
        } => {
            if is_arrow(param, codomain) {
                Prec::Arrow
            } else {
                Prec::Binder
            }
        }
        Term::App { .. } => Prec::App,
        Term::Proj { .. } => Prec::Postfix,
        _ => Prec::Atom,
    }
}

fn is_arrow(param: &str, codomain: &Term) -> bool {
    param == ANON_BINDER && !codomain.has_free_var(ANON_BINDER)
}

fn write_term(f: &mut fmt::Formatter<'_>, term: &Term, min: Prec) -> fmt::Result {
    let parens = prec_of(term) < min;
    if parens {
        f.write_str("(")?;
    }
    match term {
        Term::Var(name) => f.write_str(name)?,
        Term::Lit(n) => write!(f, "{n}")?,
        Term::Star => f.write_str("*")?,
        Term::Nat => f.write_str("Nat")?,
        Term::Lambda {
            param,
            domain,
            body,
        } => {
            write!(f, "lambda {param}: ")?;
            write_term(f, domain, Prec::Arrow)?;
            f.write_str(". ")?;
            write_term(f, body, Prec::Binder)?;
        }
        Term::Pi {
            param,
            domain,
            codomain,
        } => {
            if is_arrow(param, codomain) {
                write_term(f, domain, Prec::App)?;
                f.write_str(" -> ")?;
                write_term(f, codomain, Prec::Binder)?;
            } else {
                write!(f, "pi {param}: ")?;
                write_term(f, domain, Prec::Arrow)?;
                f.write_str(". ")?;
                write_term(f, codomain, Prec::Binder)?;
            }
        }
        Term::App { func, arg } => {
            write_term(f, func, Prec::App)?;
            f.write_str(" ")?;
            write_term(f, arg, Prec::Postfix)?;
        }
        Term::Pair { first, second } => {
            f.write_str("(")?;
            write_term(f, first, Prec::Binder)?;
            f.write_str(", ")?;
            write_term(f, second, Prec::Binder)?;
            f.write_str(")")?;
        }
        Term::Proj { pair, index } => {
            write_term(f, pair, Prec::Postfix)?;
            write!(f, "[{index}]")?;
        }
        Term::AxiomRef(ax) => f.write_str(&ax.name)?,
        Term::DefRef(def) => f.write_str(&def.name)?,
    }
    if parens {
        f.write_str(")")?;
    }
    Ok(())
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_term(f, self, Prec::Binder)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    pub stmts: Vec<Stmt>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    Assume(AssumeStmt),
    Define(DefineStmt),
}

impl Stmt {
    pub fn name(&self) -> &Ident {
        match self {
            Stmt::Assume(s) => &s.name,
            Stmt::Define(s) => &s.name,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            Stmt::Assume(s) => s.span,
            Stmt::Define(s) => s.span,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AssumeStmt {
    pub span: Span,
    pub name: Ident,
    pub ty: TermRef,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DefineStmt {
    pub span: Span,
    pub name: Ident,
    pub ty: Option<TermRef>,
    pub value: TermRef,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrows_print_without_binder() {
        let t = Term::arrow(Term::pair(Term::nat(), Term::nat()), Term::nat());
        assert_eq!(t.to_string(), "(Nat, Nat) -> Nat");
    }

    #[test]
    fn dependent_pi_keeps_binder() {
        let t = Term::pi(
            "i",
            Term::nat(),
            Term::app(Term::proj(Term::var("type"), 1), Term::var("i")),
        );
        assert_eq!(t.to_string(), "pi i: Nat. type[1] i");
    }

    #[test]
    fn lambda_in_function_position_is_parenthesized() {
        let id = Term::lambda("y", Term::nat(), Term::var("y"));
        assert_eq!(Term::app(id, Term::lit(1)).to_string(), "(lambda y: Nat. y) 1");
    }

    #[test]
    fn free_vars_respect_binders() {
        let t = Term::lambda(
            "x",
            Term::var("T"),
            Term::app(Term::var("x"), Term::var("y")),
        );
        let fv: Vec<String> = t.free_vars().into_iter().collect();
        assert_eq!(fv, vec!["T".to_string(), "y".to_string()]);
    }
}

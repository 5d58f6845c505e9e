#![forbid(unsafe_code)]

use std::rc::Rc;

use bound_ast::{Term, TermRef};

use crate::error::{TypeError, TypeErrorKind};
use crate::subst::subst;

/// Step budget for one inference or conversion query.
#[derive(Clone, Debug)]
pub struct Fuel {
    remaining: usize,
    limit: usize,
}

impl Fuel {
    pub fn new(limit: usize) -> Self {
        Self {
            remaining: limit,
            limit,
        }
    }

    pub fn used(&self) -> usize {
        self.limit - self.remaining
    }

    fn tick(&mut self, term: &Term) -> Result<(), TypeError> {
        if self.remaining == 0 {
            return Err(TypeError::new(
                TypeErrorKind::ReductionLimit,
                term,
                format!("gave up after {} reduction steps", self.limit),
            ));
        }
        self.remaining -= 1;
        Ok(())
    }
}

/// Weak-head normal form: beta on `App(Lambda)`, projection on `Proj(Pair)`,
/// and unfolding of definitions in head position.
pub fn whnf(term: &TermRef, fuel: &mut Fuel) -> Result<TermRef, TypeError> {
    let mut t = term.clone();
    loop {
        let next = match &*t {
            Term::DefRef(def) => {
                fuel.tick(&t)?;
                def.value.clone()
            }
            Term::App { func, arg } => {
                let head = whnf(func, fuel)?;
                if let Term::Lambda { param, body, .. } = &*head {
                    fuel.tick(&t)?;
                    subst(body, param, arg)
                } else if Rc::ptr_eq(&head, func) {
                    return Ok(t.clone());
                } else {
                    return Ok(Term::app(head.clone(), arg.clone()));
                }
            }
            Term::Proj { pair, index } => {
                let inner = whnf(pair, fuel)?;
                if let Term::Pair { first, second } = &*inner {
                    fuel.tick(&t)?;
                    if *index == 0 {
                        first.clone()
                    } else {
                        second.clone()
                    }
                } else if Rc::ptr_eq(&inner, pair) {
                    return Ok(t.clone());
                } else {
                    return Ok(Term::proj(inner.clone(), *index));
                }
            }
            _ => return Ok(t.clone()),
        };
        t = next;
    }
}

/// Definitional equality: structural comparison up to alpha-renaming,
/// with both sides in weak-head normal form at every level.
pub fn conv(a: &TermRef, b: &TermRef, fuel: &mut Fuel) -> Result<bool, TypeError> {
    conv_in(a, b, &mut Vec::new(), fuel)
}

fn conv_in(
    a: &TermRef,
    b: &TermRef,
    binders: &mut Vec<(String, String)>,
    fuel: &mut Fuel,
) -> Result<bool, TypeError> {
    if Rc::ptr_eq(a, b) && binders.is_empty() {
        return Ok(true);
    }
    let a = whnf(a, fuel)?;
    let b = whnf(b, fuel)?;
    match (&*a, &*b) {
        (Term::Var(x), Term::Var(y)) => {
            let left = binders.iter().rposition(|(l, _)| l == x);
            let right = binders.iter().rposition(|(_, r)| r == y);
            Ok(match (left, right) {
                (Some(i), Some(j)) => i == j,
                (None, None) => x == y,
                _ => false,
            })
        }
        (Term::Lit(m), Term::Lit(n)) => Ok(m == n),
        (Term::Star, Term::Star) | (Term::Nat, Term::Nat) => Ok(true),
        (
            Term::Lambda {
                param: p,
                domain: d1,
                body: b1,
            },
            Term::Lambda {
                param: q,
                domain: d2,
                body: b2,
            },
        )
        | (
            Term::Pi {
                param: p,
                domain: d1,
                codomain: b1,
            },
            Term::Pi {
                param: q,
                domain: d2,
                codomain: b2,
            },
        ) => {
            if !conv_in(d1, d2, binders, fuel)? {
                return Ok(false);
            }
            binders.push((p.clone(), q.clone()));
            let same = conv_in(b1, b2, binders, fuel);
            binders.pop();
            same
        }
        (Term::App { func: f1, arg: a1 }, Term::App { func: f2, arg: a2 }) => {
            Ok(conv_in(f1, f2, binders, fuel)? && conv_in(a1, a2, binders, fuel)?)
        }
        (
            Term::Pair {
                first: x1,
                second: y1,
            },
            Term::Pair {
                first: x2,
                second: y2,
            },
        ) => Ok(conv_in(x1, x2, binders, fuel)? && conv_in(y1, y2, binders, fuel)?),
        (Term::Proj { pair: p1, index: i }, Term::Proj { pair: p2, index: j }) => {
            Ok(i == j && conv_in(p1, p2, binders, fuel)?)
        }
        (Term::AxiomRef(x), Term::AxiomRef(y)) => Ok(Rc::ptr_eq(x, y) || x == y),
        _ => Ok(false),
    }
}

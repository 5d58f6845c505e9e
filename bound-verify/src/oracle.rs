#![forbid(unsafe_code)]
#![allow(unused_assignments)]

use std::collections::{BTreeMap, BTreeSet};

use miette::Diagnostic;
use thiserror::Error;
use tracing::trace;

use crate::domain::{ConstraintKind, Polytope, Var};

#[derive(Clone, Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum OracleError {
    #[error("elimination exceeded {limit} constraints")]
    #[diagnostic(code(bound::oracle))]
    TooManyConstraints { limit: usize },

    #[error("coefficient overflow during elimination")]
    #[diagnostic(code(bound::oracle))]
    Overflow,

    #[error("solver returned unknown")]
    #[diagnostic(code(bound::oracle))]
    Unknown,
}

/// Decides integer emptiness of a polytope.
///
/// `Ok(true)` means provably empty. Callers treat an error as "not
/// provably empty".
pub trait SetOracle {
    fn is_empty(&self, polytope: &Polytope) -> Result<bool, OracleError>;
}

/// Fourier–Motzkin elimination with integer tightening.
///
/// Unit-coefficient equalities are solved and substituted first; every
/// derived inequality is divided by the gcd of its coefficients with the
/// constant rounded down. Sound for emptiness over the integers.
#[derive(Clone, Debug)]
pub struct FourierMotzkin {
    max_constraints: usize,
}

impl FourierMotzkin {
    pub fn new(max_constraints: usize) -> Self {
        Self { max_constraints }
    }
}

impl Default for FourierMotzkin {
    fn default() -> Self {
        Self::new(4_096)
    }
}

// `Σ coeffs + constant >= 0`
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Row {
    coeffs: BTreeMap<Var, i64>,
    constant: i64,
}

enum Tightened {
    Keep(Row),
    Trivial,
    Contradiction,
}

impl Row {
    fn tighten(mut self) -> Tightened {
        self.coeffs.retain(|_, c| *c != 0);
        if self.coeffs.is_empty() {
            return if self.constant >= 0 {
                Tightened::Trivial
            } else {
                Tightened::Contradiction
            };
        }
        let g = self.coeffs.values().fold(0, |acc, c| gcd(acc, c.unsigned_abs()));
        if g > 1 {
            let g = g as i64;
            for c in self.coeffs.values_mut() {
                *c /= g;
            }
            self.constant = self.constant.div_euclid(g);
        }
        Tightened::Keep(self)
    }
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 { a } else { gcd(b, a % b) }
}

fn scaled_sum(a: &Row, ka: i64, b: &Row, kb: i64) -> Result<Row, OracleError> {
    let mut coeffs = BTreeMap::new();
    for (v, c) in &a.coeffs {
        let term = c.checked_mul(ka).ok_or(OracleError::Overflow)?;
        coeffs.insert(v.clone(), term);
    }
    for (v, c) in &b.coeffs {
        let term = c.checked_mul(kb).ok_or(OracleError::Overflow)?;
        let slot = coeffs.entry(v.clone()).or_insert(0i64);
        *slot = slot.checked_add(term).ok_or(OracleError::Overflow)?;
    }
    let constant = a
        .constant
        .checked_mul(ka)
        .and_then(|x| b.constant.checked_mul(kb).and_then(|y| x.checked_add(y)))
        .ok_or(OracleError::Overflow)?;
    Ok(Row { coeffs, constant })
}

// Replaces `var` in `row` by `expr` (where `var = expr`).
fn substitute(row: &Row, var: &Var, expr: &Row) -> Result<Row, OracleError> {
    match row.coeffs.get(var) {
        None => Ok(row.clone()),
        Some(&k) => {
            let mut rest = row.clone();
            rest.coeffs.remove(var);
            scaled_sum(&rest, 1, expr, k)
        }
    }
}

impl SetOracle for FourierMotzkin {
    fn is_empty(&self, polytope: &Polytope) -> Result<bool, OracleError> {
        let mut equalities = Vec::new();
        let mut rows = Vec::new();
        for c in polytope.constraints() {
            let row = Row {
                coeffs: c.coeffs.clone(),
                constant: c.constant,
            };
            match c.kind {
                ConstraintKind::Equality => equalities.push(row),
                ConstraintKind::Inequality => rows.push(row),
            }
        }

        // Solve equalities with a unit coefficient; keep the rest as two
        // opposite inequalities.
        while let Some(pos) = equalities
            .iter()
            .position(|e| e.coeffs.values().any(|c| c.unsigned_abs() == 1))
        {
            let eq = equalities.swap_remove(pos);
            let unit = eq.coeffs.iter().find(|(_, c)| c.unsigned_abs() == 1);
            let Some((var, k)) = unit.map(|(v, c)| (v.clone(), *c)) else {
                continue;
            };
            // k·var + rest = 0  ==>  var = -k·rest
            let mut expr = eq.clone();
            expr.coeffs.remove(&var);
            let scale = |x: i64| k.checked_neg().and_then(|nk| nk.checked_mul(x));
            for c in expr.coeffs.values_mut() {
                *c = scale(*c).ok_or(OracleError::Overflow)?;
            }
            expr.constant = scale(expr.constant).ok_or(OracleError::Overflow)?;
            for e in equalities.iter_mut() {
                *e = substitute(e, &var, &expr)?;
            }
            for r in rows.iter_mut() {
                *r = substitute(r, &var, &expr)?;
            }
        }
        for eq in equalities {
            let non_zero = eq.coeffs.values().any(|c| *c != 0);
            if !non_zero && eq.constant != 0 {
                return Ok(true);
            }
            let g = eq.coeffs.values().fold(0, |acc, c| gcd(acc, c.unsigned_abs()));
            if g > 1 && eq.constant % (g as i64) != 0 {
                return Ok(true);
            }
            let mut neg = eq.clone();
            for c in neg.coeffs.values_mut() {
                *c = c.checked_neg().ok_or(OracleError::Overflow)?;
            }
            neg.constant = neg.constant.checked_neg().ok_or(OracleError::Overflow)?;
            rows.push(eq);
            rows.push(neg);
        }

        let mut current = BTreeSet::new();
        for row in rows {
            match row.tighten() {
                Tightened::Keep(row) => {
                    current.insert(row);
                }
                Tightened::Trivial => {}
                Tightened::Contradiction => return Ok(true),
            }
        }

        loop {
            let vars: BTreeSet<Var> = current
                .iter()
                .flat_map(|r| r.coeffs.keys().cloned())
                .collect();
            // Cheapest variable first: fewest generated pairs.
            let Some(var) = vars.into_iter().min_by_key(|v| {
                let count = |sign: i64| {
                    current
                        .iter()
                        .filter(|r| r.coeffs.get(v).is_some_and(|c| c.signum() == sign))
                        .count()
                };
                count(1) * count(-1)
            }) else {
                return Ok(false);
            };

            let mut lower = Vec::new();
            let mut upper = Vec::new();
            let mut next = BTreeSet::new();
            for row in current {
                match row.coeffs.get(&var).copied().unwrap_or(0) {
                    c if c > 0 => lower.push((row, c)),
                    c if c < 0 => upper.push((row, c.checked_neg().ok_or(OracleError::Overflow)?)),
                    _ => {
                        next.insert(row);
                    }
                }
            }
            for (lo, a) in &lower {
                for (hi, b) in &upper {
                    // b·lo + a·hi cancels `var`.
                    match scaled_sum(lo, *b, hi, *a)?.tighten() {
                        Tightened::Keep(row) => {
                            next.insert(row);
                        }
                        Tightened::Trivial => {}
                        Tightened::Contradiction => {
                            trace!(eliminated = %var, "contradiction");
                            return Ok(true);
                        }
                    }
                    if next.len() > self.max_constraints {
                        return Err(OracleError::TooManyConstraints {
                            limit: self.max_constraints,
                        });
                    }
                }
            }
            current = next;
        }
    }
}

#[cfg(feature = "z3")]
pub mod z3_oracle {
    use super::{OracleError, SetOracle};
    use crate::domain::{ConstraintKind, Polytope};

    use z3::{
        ast::{Ast, Int},
        Config, Context, SatResult, Solver,
    };

    /// Integer emptiness through Z3 (requires libz3).
    pub struct Z3Oracle {
        ctx: Context,
    }

    impl Z3Oracle {
        pub fn new() -> Self {
            let cfg = Config::new();
            Self {
                ctx: Context::new(&cfg),
            }
        }
    }

    impl Default for Z3Oracle {
        fn default() -> Self {
            Self::new()
        }
    }

    impl SetOracle for Z3Oracle {
        fn is_empty(&self, polytope: &Polytope) -> Result<bool, OracleError> {
            let solver = Solver::new(&self.ctx);
            let zero = Int::from_i64(&self.ctx, 0);
            for c in polytope.constraints() {
                let mut terms = vec![Int::from_i64(&self.ctx, c.constant)];
                for (var, k) in &c.coeffs {
                    let x = Int::new_const(&self.ctx, var.to_string());
                    terms.push(Int::mul(&self.ctx, &[&Int::from_i64(&self.ctx, *k), &x]));
                }
                let refs: Vec<&Int> = terms.iter().collect();
                let sum = Int::add(&self.ctx, &refs);
                match c.kind {
                    ConstraintKind::Inequality => solver.assert(&sum.ge(&zero)),
                    ConstraintKind::Equality => solver.assert(&sum._eq(&zero)),
                }
            }
            match solver.check() {
                SatResult::Unsat => Ok(true),
                SatResult::Sat => Ok(false),
                SatResult::Unknown => Err(OracleError::Unknown),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Space, VarSupply};

    #[test]
    fn integer_tightening_finds_gaps_between_bounds() {
        // 1 <= 2x <= 1 has a rational but no integer solution.
        let mut supply = VarSupply::new();
        let x = supply.fresh("x");
        let p = Polytope::universe(Space::from_names([&x]))
            .with_inequality(&[(&x, 2)], -1)
            .unwrap()
            .with_inequality(&[(&x, -2)], 1)
            .unwrap();
        assert_eq!(FourierMotzkin::default().is_empty(&p), Ok(true));
    }

    #[test]
    fn chained_equalities_are_substituted() {
        // a = b, b = 15, a - 16 >= 0
        let mut supply = VarSupply::new();
        let a = supply.fresh("a");
        let b = supply.fresh("b");
        let base = Polytope::universe(Space::from_names([&a, &b]))
            .with_equality(&[(&a, 1), (&b, -1)], 0)
            .unwrap()
            .with_equality(&[(&b, 1)], -15)
            .unwrap();
        let oracle = FourierMotzkin::default();
        assert_eq!(oracle.is_empty(&base), Ok(false));
        let over = base.with_inequality(&[(&a, 1)], -16).unwrap();
        assert_eq!(oracle.is_empty(&over), Ok(true));
    }

    #[test]
    fn unbounded_systems_are_not_empty() {
        let mut supply = VarSupply::new();
        let x = supply.fresh("x");
        let y = supply.fresh("y");
        let p = Polytope::universe(Space::from_names([&x, &y]))
            .with_inequality(&[(&x, 1), (&y, -1)], -1)
            .unwrap();
        assert_eq!(FourierMotzkin::default().is_empty(&p), Ok(false));
    }

    #[test]
    fn constraint_growth_is_capped() {
        let mut supply = VarSupply::new();
        let xs: Vec<Var> = (0..6).map(|i| supply.fresh(&format!("x{i}"))).collect();
        let mut p = Polytope::universe(Space::from_names(xs.iter()));
        for (i, a) in xs.iter().enumerate() {
            for b in &xs[i + 1..] {
                p = p.with_inequality(&[(a, 1), (b, 1)], 3).unwrap();
                p = p.with_inequality(&[(a, -1), (b, 2)], 5).unwrap();
                p = p.with_inequality(&[(a, 2), (b, -3)], 7).unwrap();
            }
        }
        let err = FourierMotzkin::new(4).is_empty(&p).unwrap_err();
        assert_eq!(err, OracleError::TooManyConstraints { limit: 4 });
    }

    #[test]
    fn extreme_constants_report_overflow() {
        let mut supply = VarSupply::new();
        let x = supply.fresh("x");
        let y = supply.fresh("y");
        let oracle = FourierMotzkin::default();

        // x + MIN = 0 solves to x = -MIN.
        let solved = Polytope::universe(Space::from_names([&x]))
            .with_equality(&[(&x, 1)], i64::MIN)
            .unwrap();
        assert_eq!(oracle.is_empty(&solved), Err(OracleError::Overflow));

        // 2x + MIN = 0 has no unit coefficient and is split into two rows.
        let split = Polytope::universe(Space::from_names([&x, &y]))
            .with_equality(&[(&x, 2), (&y, 2)], i64::MIN)
            .unwrap();
        assert_eq!(oracle.is_empty(&split), Err(OracleError::Overflow));
    }
}

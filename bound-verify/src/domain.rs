#![forbid(unsafe_code)]
#![allow(unused_assignments)]

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use miette::Diagnostic;
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::oracle::SetOracle;

#[derive(Clone, Debug, Error, Diagnostic, PartialEq, Eq)]
#[error("constraint domain error: {message}")]
#[diagnostic(code(bound::domain))]
#[allow(unused_assignments)]
pub struct ConstraintDomainError {
    pub message: String,
}

impl ConstraintDomainError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// An integer variable: an id unique within one pass plus a readable hint.
/// Ordered by id, so creation order is the display order.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Var {
    id: u32,
    hint: String,
}

impl Var {
    pub fn hint(&self) -> &str {
        &self.hint
    }

    pub fn id(&self) -> u32 {
        self.id
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.hint, self.id)
    }
}

impl Serialize for Var {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Source of fresh variables for one checking pass.
#[derive(Clone, Debug, Default)]
pub struct VarSupply {
    next: u32,
}

impl VarSupply {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh(&mut self, hint: &str) -> Var {
        let id = self.next;
        self.next += 1;
        Var {
            id,
            hint: hint.to_string(),
        }
    }

    pub fn issued(&self) -> u32 {
        self.next
    }
}

/// The variables a polytope ranges over.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Space {
    vars: BTreeSet<Var>,
}

impl Space {
    pub fn from_names<'a>(vars: impl IntoIterator<Item = &'a Var>) -> Self {
        Self {
            vars: vars.into_iter().cloned().collect(),
        }
    }

    pub fn contains(&self, var: &Var) -> bool {
        self.vars.contains(var)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Var> {
        self.vars.iter()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn union(&self, other: &Space) -> Space {
        Space {
            vars: self.vars.union(&other.vars).cloned().collect(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConstraintKind {
    /// `expr >= 0`
    Inequality,
    /// `expr = 0`
    Equality,
}

/// `Σ cᵢ·xᵢ + constant` compared against zero.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AffineConstraint {
    pub coeffs: BTreeMap<Var, i64>,
    pub constant: i64,
    pub kind: ConstraintKind,
}

impl AffineConstraint {
    pub fn new(coeffs: &[(&Var, i64)], constant: i64, kind: ConstraintKind) -> Self {
        let mut map = BTreeMap::new();
        for (var, c) in coeffs {
            *map.entry((*var).clone()).or_insert(0) += c;
        }
        map.retain(|_, c| *c != 0);
        Self {
            coeffs: map,
            constant,
            kind,
        }
    }

    pub fn inequality(coeffs: &[(&Var, i64)], constant: i64) -> Self {
        Self::new(coeffs, constant, ConstraintKind::Inequality)
    }

    pub fn equality(coeffs: &[(&Var, i64)], constant: i64) -> Self {
        Self::new(coeffs, constant, ConstraintKind::Equality)
    }

    /// `var = value`
    pub fn pins(var: &Var, value: i64) -> Self {
        Self::equality(&[(var, 1)], -value)
    }

    pub fn vars(&self) -> impl Iterator<Item = &Var> {
        self.coeffs.keys()
    }

    pub(crate) fn renamed(&self, map: &BTreeMap<Var, Var>) -> Self {
        let coeffs = self
            .coeffs
            .iter()
            .map(|(v, c)| (map.get(v).unwrap_or(v).clone(), *c))
            .collect();
        Self {
            coeffs,
            constant: self.constant,
            kind: self.kind,
        }
    }
}

impl fmt::Display for AffineConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (var, c) in &self.coeffs {
            let (sign, abs) = if *c < 0 { ("-", -c) } else { ("+", *c) };
            match (first, sign) {
                (true, "-") => f.write_str("-")?,
                (true, _) => {}
                (false, s) => write!(f, " {s} ")?,
            }
            if abs != 1 {
                write!(f, "{abs}*")?;
            }
            write!(f, "{var}")?;
            first = false;
        }
        if first {
            write!(f, "{}", self.constant)?;
        } else if self.constant != 0 {
            let sign = if self.constant < 0 { "-" } else { "+" };
            write!(f, " {sign} {}", self.constant.unsigned_abs())?;
        }
        match self.kind {
            ConstraintKind::Inequality => f.write_str(" >= 0"),
            ConstraintKind::Equality => f.write_str(" = 0"),
        }
    }
}

/// Integer points of a variable space satisfying every constraint.
///
/// All operations are pure; emptiness and containment are answered by a
/// [`SetOracle`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Polytope {
    space: Space,
    constraints: Vec<AffineConstraint>,
}

impl Polytope {
    pub fn universe(space: Space) -> Self {
        Self {
            space,
            constraints: Vec::new(),
        }
    }

    pub fn space(&self) -> &Space {
        &self.space
    }

    pub fn constraints(&self) -> &[AffineConstraint] {
        &self.constraints
    }

    pub fn is_universe(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn with_constraint(
        &self,
        constraint: AffineConstraint,
    ) -> Result<Self, ConstraintDomainError> {
        if let Some(stray) = constraint.vars().find(|v| !self.space.contains(v)) {
            return Err(ConstraintDomainError::new(format!(
                "constraint `{constraint}` mentions `{stray}`, which is outside its space"
            )));
        }
        let mut out = self.clone();
        if !out.constraints.contains(&constraint) {
            out.constraints.push(constraint);
        }
        Ok(out)
    }

    pub fn with_inequality(
        &self,
        coeffs: &[(&Var, i64)],
        constant: i64,
    ) -> Result<Self, ConstraintDomainError> {
        self.with_constraint(AffineConstraint::inequality(coeffs, constant))
    }

    pub fn with_equality(
        &self,
        coeffs: &[(&Var, i64)],
        constant: i64,
    ) -> Result<Self, ConstraintDomainError> {
        self.with_constraint(AffineConstraint::equality(coeffs, constant))
    }

    /// Conjunction over the union of both spaces.
    pub fn intersect(&self, other: &Polytope) -> Polytope {
        let mut out = Polytope {
            space: self.space.union(&other.space),
            constraints: self.constraints.clone(),
        };
        for c in &other.constraints {
            if !out.constraints.contains(c) {
                out.constraints.push(c.clone());
            }
        }
        out
    }

    pub fn extend_space<'a>(&self, vars: impl IntoIterator<Item = &'a Var>) -> Polytope {
        Polytope {
            space: self.space.union(&Space::from_names(vars)),
            constraints: self.constraints.clone(),
        }
    }

    /// Drops every copy of `constraint`.
    pub fn without(&self, constraint: &AffineConstraint) -> Polytope {
        Polytope {
            space: self.space.clone(),
            constraints: self
                .constraints
                .iter()
                .filter(|c| *c != constraint)
                .cloned()
                .collect(),
        }
    }

    pub(crate) fn renamed(&self, map: &BTreeMap<Var, Var>) -> Polytope {
        Polytope {
            space: Space {
                vars: self
                    .space
                    .iter()
                    .map(|v| map.get(v).unwrap_or(v).clone())
                    .collect(),
            },
            constraints: self.constraints.iter().map(|c| c.renamed(map)).collect(),
        }
    }

    /// True only when the oracle proves there is no integer point. An
    /// oracle that gives up counts as "not provably empty".
    pub fn is_empty(&self, oracle: &dyn SetOracle) -> bool {
        if self.constraints.is_empty() {
            return false;
        }
        oracle.is_empty(self).unwrap_or(false)
    }

    /// `self ⊆ other`: for each `e >= 0` of `other`, `self ∧ -e - 1 >= 0`
    /// must be empty. Equalities contribute both directions.
    pub fn is_subset_of(&self, other: &Polytope, oracle: &dyn SetOracle) -> bool {
        let widened = self.extend_space(other.space.iter());
        other.constraints.iter().all(|c| {
            let mut signs = vec![-1];
            if c.kind == ConstraintKind::Equality {
                signs.push(1);
            }
            signs.into_iter().all(|sign| {
                // An unrepresentable negation cannot be refuted.
                let Some(side) = negated(&c.coeffs, c.constant, sign) else {
                    return false;
                };
                let mut refuted = widened.clone();
                refuted.constraints.push(side);
                refuted.is_empty(oracle)
            })
        })
    }
}

// `sign = -1`: `-e - 1 >= 0`; `sign = 1`: `e - 1 >= 0`. `None` on overflow.
fn negated(coeffs: &BTreeMap<Var, i64>, constant: i64, sign: i64) -> Option<AffineConstraint> {
    let coeffs = coeffs
        .iter()
        .map(|(v, c)| Some((v.clone(), c.checked_mul(sign)?)))
        .collect::<Option<BTreeMap<_, _>>>()?;
    Some(AffineConstraint {
        coeffs,
        constant: constant.checked_mul(sign)?.checked_sub(1)?,
        kind: ConstraintKind::Inequality,
    })
}

impl fmt::Display for Polytope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.constraints.is_empty() {
            return f.write_str("{ }");
        }
        f.write_str("{ ")?;
        for (i, c) in self.constraints.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{c}")?;
        }
        f.write_str(" }")
    }
}

impl Serialize for Polytope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.constraints.iter().map(ToString::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::FourierMotzkin;

    #[test]
    fn fresh_variables_are_distinct() {
        let mut supply = VarSupply::new();
        let a = supply.fresh("len");
        let b = supply.fresh("len");
        assert_ne!(a, b);
        assert_eq!(a.hint(), b.hint());
        assert_eq!(supply.issued(), 2);
    }

    #[test]
    fn constraints_outside_the_space_are_rejected() {
        let mut supply = VarSupply::new();
        let x = supply.fresh("x");
        let y = supply.fresh("y");
        let p = Polytope::universe(Space::from_names([&x]));
        assert!(p.with_inequality(&[(&x, 1)], 0).is_ok());
        let err = p.with_inequality(&[(&y, 1)], 0).unwrap_err();
        assert!(err.message.contains("outside its space"));
    }

    #[test]
    fn constraints_render_readably() {
        let mut supply = VarSupply::new();
        let len = supply.fresh("len");
        let index = supply.fresh("index");
        let c = AffineConstraint::inequality(&[(&len, 1), (&index, -1)], -1);
        assert_eq!(c.to_string(), "len#0 - index#1 - 1 >= 0");
        assert_eq!(AffineConstraint::pins(&index, 16).to_string(), "index#1 - 16 = 0");
    }

    #[test]
    fn bounded_interval_subset() {
        let oracle = FourierMotzkin::default();
        let mut supply = VarSupply::new();
        let x = supply.fresh("x");
        let space = Space::from_names([&x]);
        // 2 <= x <= 5  ⊆  0 <= x <= 10, not the other way around.
        let narrow = Polytope::universe(space.clone())
            .with_inequality(&[(&x, 1)], -2)
            .unwrap()
            .with_inequality(&[(&x, -1)], 5)
            .unwrap();
        let wide = Polytope::universe(space)
            .with_inequality(&[(&x, 1)], 0)
            .unwrap()
            .with_inequality(&[(&x, -1)], 10)
            .unwrap();
        assert!(narrow.is_subset_of(&wide, &oracle));
        assert!(!wide.is_subset_of(&narrow, &oracle));
        assert!(narrow.is_subset_of(&Polytope::default(), &oracle));
    }

    #[test]
    fn unnegatable_bounds_are_never_proven() {
        let oracle = FourierMotzkin::default();
        let mut supply = VarSupply::new();
        let x = supply.fresh("x");
        let space = Space::from_names([&x]);
        let zero = Polytope::universe(space.clone())
            .with_constraint(AffineConstraint::pins(&x, 0))
            .unwrap();
        let extreme = Polytope::universe(space)
            .with_inequality(&[(&x, 1)], i64::MIN)
            .unwrap();
        assert!(!zero.is_subset_of(&extreme, &oracle));
    }

    #[test]
    fn without_removes_a_pinned_value() {
        let oracle = FourierMotzkin::default();
        let mut supply = VarSupply::new();
        let x = supply.fresh("x");
        let p = Polytope::universe(Space::from_names([&x]))
            .with_inequality(&[(&x, -1)], 10)
            .unwrap()
            .with_constraint(AffineConstraint::pins(&x, 12))
            .unwrap();
        assert!(p.is_empty(&oracle));
        assert!(!p.without(&AffineConstraint::pins(&x, 12)).is_empty(&oracle));
    }
}

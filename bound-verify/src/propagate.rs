#![forbid(unsafe_code)]

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use bound_ast::{Definition, Term, TermRef};
use bound_core::TypeChecker;
use serde::Serialize;
use tracing::{debug, trace};

use crate::domain::{AffineConstraint, ConstraintDomainError, Polytope, Space, Var, VarSupply};
use crate::oracle::SetOracle;
use crate::registry::{AxiomContract, AxiomRegistry};
use crate::tree::VariableTree;

/// A literal that was fed into a variable while composing a node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Binding {
    pub var: Var,
    pub value: i64,
}

/// Numeric summary of a term: the shape of its value plus the sets of
/// values its primitives may receive (`possible`) and are verified
/// against (`accepted`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ConstraintDescriptor {
    pub tree: VariableTree,
    pub accepted: Polytope,
    pub possible: Polytope,
    pub bindings: Vec<Binding>,
}

impl ConstraintDescriptor {
    pub fn empty() -> Self {
        Self::default()
    }

    fn leaf(tree: VariableTree) -> Self {
        let space = Space::from_names(tree.free_vars().iter());
        Self {
            tree,
            accepted: Polytope::universe(space.clone()),
            possible: Polytope::universe(space),
            bindings: Vec::new(),
        }
    }

    fn conjoin(&self, other: &ConstraintDescriptor, tree: VariableTree) -> Self {
        let mut bindings = self.bindings.clone();
        bindings.extend(other.bindings.iter().cloned());
        Self {
            tree,
            accepted: self.accepted.intersect(&other.accepted),
            possible: self.possible.intersect(&other.possible),
            bindings,
        }
    }

    fn constrain(&mut self, constraint: AffineConstraint) -> Result<(), ConstraintDomainError> {
        self.accepted = self.accepted.with_constraint(constraint.clone())?;
        self.possible = self.possible.with_constraint(constraint)?;
        Ok(())
    }

    /// Copy with every variable replaced by a fresh one of the same hint.
    pub fn instantiate(&self, supply: &mut VarSupply) -> Self {
        let mut vars = self.tree.free_vars();
        vars.extend(self.accepted.space().iter().cloned());
        vars.extend(self.possible.space().iter().cloned());
        vars.extend(self.bindings.iter().map(|b| b.var.clone()));
        let map: BTreeMap<Var, Var> = vars
            .into_iter()
            .map(|v| {
                let fresh = supply.fresh(v.hint());
                (v, fresh)
            })
            .collect();
        Self {
            tree: self.tree.renamed(&map),
            accepted: self.accepted.renamed(&map),
            possible: self.possible.renamed(&map),
            bindings: self
                .bindings
                .iter()
                .map(|b| Binding {
                    var: map.get(&b.var).unwrap_or(&b.var).clone(),
                    value: b.value,
                })
                .collect(),
        }
    }
}

impl From<AxiomContract> for ConstraintDescriptor {
    fn from(contract: AxiomContract) -> Self {
        Self {
            tree: contract.tree,
            accepted: contract.accepted,
            possible: contract.possible,
            bindings: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Witness {
    /// The variable's readable name, e.g. `index`.
    pub name: String,
    pub var: Var,
    pub value: i64,
}

impl fmt::Display for Witness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.name, self.value)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Satisfied,
    Violated(Option<Witness>),
    Unknown,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Satisfied => f.write_str("satisfied"),
            Verdict::Violated(Some(w)) => write!(f, "violated ({w})"),
            Verdict::Violated(None) => f.write_str("violated"),
            Verdict::Unknown => f.write_str("unknown"),
        }
    }
}

/// Composes descriptors bottom-up over elaborated terms.
///
/// One engine is one checking pass: it owns the variable supply and the
/// per-definition cache.
pub struct ConstraintEngine<'a> {
    registry: &'a AxiomRegistry,
    oracle: &'a dyn SetOracle,
    checker: TypeChecker,
    supply: VarSupply,
    cache: HashMap<*const Definition, (Rc<Definition>, ConstraintDescriptor)>,
    // Name, tree and declared type of each enclosing lambda parameter.
    locals: Vec<(String, VariableTree, TermRef)>,
}

impl<'a> ConstraintEngine<'a> {
    pub fn new(
        registry: &'a AxiomRegistry,
        oracle: &'a dyn SetOracle,
        checker: TypeChecker,
    ) -> Self {
        Self {
            registry,
            oracle,
            checker,
            supply: VarSupply::new(),
            cache: HashMap::new(),
            locals: Vec::new(),
        }
    }

    pub fn supply(&mut self) -> &mut VarSupply {
        &mut self.supply
    }

    /// The descriptor of a definition's body, computed once per pass.
    pub fn definition(
        &mut self,
        def: &Rc<Definition>,
    ) -> Result<ConstraintDescriptor, ConstraintDomainError> {
        let key = Rc::as_ptr(def);
        if let Some((_, desc)) = self.cache.get(&key) {
            return Ok(desc.clone());
        }
        let saved = std::mem::take(&mut self.locals);
        let desc = self.get_constraints(&def.value);
        self.locals = saved;
        let desc = desc?;
        debug!(name = %def.name, tree = %desc.tree, "descriptor cached");
        self.cache.insert(key, (def.clone(), desc.clone()));
        Ok(desc)
    }

    pub fn get_constraints(
        &mut self,
        term: &TermRef,
    ) -> Result<ConstraintDescriptor, ConstraintDomainError> {
        match &**term {
            Term::Lit(n) => Ok(ConstraintDescriptor::leaf(
                i64::try_from(*n).map_or(VariableTree::Opaque, VariableTree::Value),
            )),
            Term::Var(name) => {
                let local = self
                    .locals
                    .iter()
                    .rev()
                    .find(|(n, _, _)| n == name)
                    .map(|(_, tree, ty)| (tree.clone(), ty.clone()));
                let tree = match local {
                    Some((tree, ty)) => self.occurrence(&tree, &ty, name),
                    None => VariableTree::Opaque,
                };
                Ok(ConstraintDescriptor::leaf(tree))
            }
            Term::Star | Term::Nat | Term::Pi { .. } => Ok(ConstraintDescriptor::empty()),
            Term::AxiomRef(ax) => match self.registry.instantiate(&ax.name, &mut self.supply) {
                Some(contract) => {
                    let contract = contract?;
                    trace!(axiom = %ax.name, tree = %contract.tree, "contract instantiated");
                    Ok(contract.into())
                }
                None => Ok(ConstraintDescriptor::empty()),
            },
            Term::DefRef(def) => {
                let desc = self.definition(def)?;
                Ok(desc.instantiate(&mut self.supply))
            }
            Term::Lambda {
                param,
                domain,
                body,
            } => {
                let param_tree = self.tree_for_type(domain, param);
                self.locals.push((param.clone(), param_tree.clone(), domain.clone()));
                let body = self.get_constraints(body);
                self.locals.pop();
                let body = body?;
                let vars = param_tree.free_vars();
                Ok(ConstraintDescriptor {
                    accepted: body.accepted.extend_space(vars.iter()),
                    possible: body.possible.extend_space(vars.iter()),
                    tree: VariableTree::node(param_tree, body.tree),
                    bindings: body.bindings,
                })
            }
            Term::App { func, arg } => {
                let f = self.get_constraints(func)?;
                let a = self.get_constraints(arg)?;
                self.apply(f, a)
            }
            Term::Pair { first, second } => {
                let u = self.get_constraints(first)?;
                let v = self.get_constraints(second)?;
                let tree = VariableTree::node(u.tree.clone(), v.tree.clone());
                Ok(u.conjoin(&v, tree))
            }
            Term::Proj { pair, index } => {
                let mut p = self.get_constraints(pair)?;
                p.tree = p.tree.component(*index);
                Ok(p)
            }
        }
    }

    fn apply(
        &mut self,
        f: ConstraintDescriptor,
        a: ConstraintDescriptor,
    ) -> Result<ConstraintDescriptor, ConstraintDomainError> {
        let (param, result) = match &f.tree {
            VariableTree::Opaque => return Ok(f.conjoin(&a, VariableTree::Opaque)),
            VariableTree::Node(param, result) => ((**param).clone(), (**result).clone()),
            other => {
                return Err(ConstraintDomainError::new(format!(
                    "applied value has {}, expected a function node",
                    other.describe()
                )));
            }
        };
        let mut out = f.conjoin(&a, result);
        let before = out.bindings.len();
        bind(&param, &a.tree, &mut out)?;
        let fresh: Vec<Binding> = out.bindings[before..].to_vec();
        for b in fresh {
            out.tree = out.tree.substitute(&b.var, b.value);
        }
        Ok(out)
    }

    /// Variable shape for a value of type `ty`: `Nat` gets a variable,
    /// products and functions get nodes.
    fn tree_for_type(&mut self, ty: &TermRef, hint: &str) -> VariableTree {
        let ty = self.checker.whnf(ty).unwrap_or_else(|_| ty.clone());
        match &*ty {
            Term::Nat => VariableTree::Var(self.supply.fresh(hint)),
            Term::Pair { first, second } => {
                let l = self.tree_for_type(first, hint);
                let r = self.tree_for_type(second, hint);
                VariableTree::node(l, r)
            }
            Term::Pi {
                param,
                domain,
                codomain,
            } => {
                let l = self.tree_for_type(domain, param);
                let r = self.tree_for_type(codomain, hint);
                VariableTree::node(l, r)
            }
            _ => VariableTree::Opaque,
        }
    }

    /// Tree for one use of a lambda parameter.
    ///
    /// Numeric positions share the parameter's variables. Function
    /// positions get fresh variables on every use, so separate calls never
    /// pin the same argument twice; those variables stay unlinked from the
    /// parameter.
    fn occurrence(&mut self, tree: &VariableTree, ty: &TermRef, hint: &str) -> VariableTree {
        let whnf = self.checker.whnf(ty).unwrap_or_else(|_| ty.clone());
        match (tree, &*whnf) {
            (VariableTree::Node(l, r), Term::Pair { first, second }) => {
                let l = self.occurrence(l, first, hint);
                let r = self.occurrence(r, second, hint);
                VariableTree::node(l, r)
            }
            (VariableTree::Node(..), Term::Pi { .. }) => self.tree_for_type(&whnf, hint),
            _ => tree.clone(),
        }
    }

    pub fn check_constraints(&self, desc: &ConstraintDescriptor) -> Verdict {
        let verdict = if desc.accepted.is_empty(self.oracle) {
            Verdict::Violated(self.witness(desc))
        } else if desc.possible.is_subset_of(&desc.accepted, self.oracle) {
            Verdict::Satisfied
        } else {
            Verdict::Unknown
        };
        trace!(%verdict, accepted = %desc.accepted, possible = %desc.possible, "checked");
        verdict
    }

    fn witness(&self, desc: &ConstraintDescriptor) -> Option<Witness> {
        desc.bindings.iter().rev().find_map(|b| {
            let relaxed = desc.accepted.without(&AffineConstraint::pins(&b.var, b.value));
            (!relaxed.is_empty(self.oracle)).then(|| Witness {
                name: b.var.hint().to_string(),
                var: b.var.clone(),
                value: b.value,
            })
        })
    }
}

// Matches a parameter tree against an argument tree, recording literal
// bindings and linking variables.
fn bind(
    param: &VariableTree,
    arg: &VariableTree,
    out: &mut ConstraintDescriptor,
) -> Result<(), ConstraintDomainError> {
    use VariableTree as T;
    match (param, arg) {
        (T::Opaque, _) | (_, T::Opaque) => Ok(()),
        (T::Var(x), T::Value(n)) => {
            out.constrain(AffineConstraint::pins(x, *n))?;
            out.bindings.push(Binding {
                var: x.clone(),
                value: *n,
            });
            Ok(())
        }
        (T::Var(x), T::Var(y)) => {
            if x != y {
                out.constrain(AffineConstraint::equality(&[(x, 1), (y, -1)], 0))?;
            }
            Ok(())
        }
        (T::Value(m), T::Var(y)) => out.constrain(AffineConstraint::pins(y, *m)),
        (T::Value(m), T::Value(n)) => {
            if m != n {
                // Two different literals for one position: nothing is accepted.
                let infeasible = AffineConstraint::inequality(&[], -1);
                out.accepted = out.accepted.with_constraint(infeasible)?;
            }
            Ok(())
        }
        (T::Node(pl, pr), T::Node(al, ar)) => {
            bind(pl, al, out)?;
            bind(pr, ar, out)
        }
        (p, a) => Err(ConstraintDomainError::new(format!(
            "cannot pass {} where the callee expects {}",
            a.describe(),
            p.describe()
        ))),
    }
}

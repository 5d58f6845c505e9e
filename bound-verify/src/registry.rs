#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bound_ast::{Term, TermRef};
use bound_core::{CheckConfig, TypeChecker};

use crate::domain::{ConstraintDomainError, Polytope, Space, VarSupply};
use crate::oracle::SetOracle;
use crate::tree::VariableTree;

/// Numeric contract of a primitive: the shape of its value and the two
/// sets over the shape's variables.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AxiomContract {
    pub tree: VariableTree,
    pub accepted: Polytope,
    pub possible: Polytope,
}

impl AxiomContract {
    /// The contract of a primitive nobody registered: no variables, no
    /// constraints.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Checks that the contract can describe a value of type `ty`.
    pub fn validate(
        &self,
        ty: &TermRef,
        checker: &TypeChecker,
        oracle: &dyn SetOracle,
    ) -> Result<(), ConstraintDomainError> {
        fits(&self.tree, ty, checker)?;
        for var in self.tree.free_vars() {
            if !self.accepted.space().contains(&var) || !self.possible.space().contains(&var) {
                return Err(ConstraintDomainError::new(format!(
                    "tree variable `{var}` is missing from the contract's spaces"
                )));
            }
        }
        if self.possible.is_empty(oracle) {
            return Err(ConstraintDomainError::new(
                "the possible set of the contract is empty",
            ));
        }
        Ok(())
    }
}

fn fits(
    tree: &VariableTree,
    ty: &TermRef,
    checker: &TypeChecker,
) -> Result<(), ConstraintDomainError> {
    let whnf = checker
        .whnf(ty)
        .map_err(|e| ConstraintDomainError::new(e.to_string()))?;
    match (tree, &*whnf) {
        (VariableTree::Opaque, _) => Ok(()),
        (VariableTree::Var(_) | VariableTree::Value(_), Term::Nat) => Ok(()),
        (
            VariableTree::Node(l, r),
            Term::Pi {
                domain, codomain, ..
            },
        ) => {
            fits(l, domain, checker)?;
            fits(r, codomain, checker)
        }
        (VariableTree::Node(l, r), Term::Pair { first, second }) => {
            fits(l, first, checker)?;
            fits(r, second, checker)
        }
        (tree, _) => Err(ConstraintDomainError::new(format!(
            "contract tree `{tree}` does not fit type `{ty}`"
        ))),
    }
}

pub type ContractGenerator =
    Arc<dyn Fn(&mut VarSupply) -> Result<AxiomContract, ConstraintDomainError> + Send + Sync>;

/// Contracts keyed by axiom name. Each lookup produces fresh variables.
#[derive(Clone, Default)]
pub struct AxiomRegistry {
    generators: HashMap<String, ContractGenerator>,
}

impl fmt::Debug for AxiomRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AxiomRegistry")
            .field("contracts", &self.names())
            .finish()
    }
}

/// Names of the contracts installed by [`AxiomRegistry::with_builtin_contracts`].
pub const BUILTIN_CONTRACTS: [&str; 4] = ["opAddNat", "intakeLower10", "ArrGet", "reduce"];

impl AxiomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtin_contracts() -> Self {
        let mut registry = Self::new();
        registry.register("opAddNat", op_add_nat);
        registry.register("intakeLower10", intake_lower_10);
        registry.register("ArrGet", arr_get);
        registry.register("reduce", reduce);
        registry
    }

    /// Builtins unless `builtin_contracts` is switched off.
    pub fn for_config(config: &CheckConfig) -> Self {
        if config.builtin_contracts {
            Self::with_builtin_contracts()
        } else {
            Self::new()
        }
    }

    /// Installs (or replaces) the contract for `name`.
    pub fn register<F>(
        &mut self,
        name: impl Into<String>,
        generator: F,
    ) -> Option<ContractGenerator>
    where
        F: Fn(&mut VarSupply) -> Result<AxiomContract, ConstraintDomainError>
            + Send
            + Sync
            + 'static,
    {
        self.generators.insert(name.into(), Arc::new(generator))
    }

    pub fn lookup(&self, name: &str) -> Option<&ContractGenerator> {
        self.generators.get(name)
    }

    /// A fresh instance of `name`'s contract, or `None` when unregistered.
    pub fn instantiate(
        &self,
        name: &str,
        supply: &mut VarSupply,
    ) -> Option<Result<AxiomContract, ConstraintDomainError>> {
        self.lookup(name).map(|generator| generator(supply))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.generators.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

// opAddNat : (Nat, Nat) -> Nat, with c = a + b.
fn op_add_nat(supply: &mut VarSupply) -> Result<AxiomContract, ConstraintDomainError> {
    let a = supply.fresh("a");
    let b = supply.fresh("b");
    let c = supply.fresh("c");
    let space = Space::from_names([&a, &b, &c]);
    let sum = Polytope::universe(space).with_equality(&[(&c, 1), (&a, -1), (&b, -1)], 0)?;
    Ok(AxiomContract {
        tree: VariableTree::node(
            VariableTree::node(VariableTree::var(&a), VariableTree::var(&b)),
            VariableTree::var(&c),
        ),
        accepted: sum.clone(),
        possible: sum,
    })
}

// intakeLower10 : Nat -> Nat, accepts a <= 10 and returns its argument.
fn intake_lower_10(supply: &mut VarSupply) -> Result<AxiomContract, ConstraintDomainError> {
    let a = supply.fresh("a");
    let universe = Polytope::universe(Space::from_names([&a]));
    Ok(AxiomContract {
        tree: VariableTree::node(VariableTree::var(&a), VariableTree::var(&a)),
        accepted: universe.with_inequality(&[(&a, -1)], 10)?,
        possible: universe,
    })
}

// ArrGet : pi type: (Nat, Nat -> *). ArrT type -> pi i: Nat. type[1] i
fn arr_get(supply: &mut VarSupply) -> Result<AxiomContract, ConstraintDomainError> {
    let len = supply.fresh("len");
    let type_index = supply.fresh("typeIndex");
    let index = supply.fresh("index");
    let universe = Polytope::universe(Space::from_names([&len, &type_index, &index]));
    let possible = universe
        .with_inequality(&[(&type_index, 1)], 0)?
        .with_inequality(&[(&len, 1), (&type_index, -1)], -1)?;
    let accepted = universe
        .with_inequality(&[(&len, 1), (&index, -1)], -1)?
        .with_inequality(&[(&index, 1)], 0)?;
    let element_type = VariableTree::node(VariableTree::var(&type_index), VariableTree::Opaque);
    Ok(AxiomContract {
        tree: VariableTree::node(
            VariableTree::node(VariableTree::var(&len), element_type),
            VariableTree::node(
                VariableTree::Opaque,
                VariableTree::node(VariableTree::var(&index), VariableTree::Opaque),
            ),
        ),
        accepted,
        possible,
    })
}

// reduce : pi t: *. pi op: ((t, t) -> t). pi startval: t. pi len: Nat.
//          pi values: (Nat -> t). t
fn reduce(supply: &mut VarSupply) -> Result<AxiomContract, ConstraintDomainError> {
    use VariableTree as T;
    let len = supply.fresh("len");
    let i = supply.fresh("i");
    let universe = Polytope::universe(Space::from_names([&len, &i]));
    let possible = universe
        .with_inequality(&[(&i, 1)], 0)?
        .with_inequality(&[(&len, 1), (&i, -1)], -1)?;
    let op = T::node(T::node(T::Opaque, T::Opaque), T::Opaque);
    let values = T::node(T::var(&i), T::Opaque);
    let tree = T::node(
        T::Opaque,
        T::node(
            op,
            T::node(T::Opaque, T::node(T::var(&len), T::node(values, T::Opaque))),
        ),
    );
    Ok(AxiomContract {
        tree,
        accepted: universe,
        possible,
    })
}

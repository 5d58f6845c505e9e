#![forbid(unsafe_code)]

pub mod check;
pub mod domain;
pub mod oracle;
pub mod propagate;
pub mod registry;
pub mod tree;

pub use check::{
    check_program, check_program_with, ErrorStage, ProgramReport, StatementError, StatementKind,
    StatementOutcome, StatementReport,
};
pub use domain::{
    AffineConstraint, ConstraintDomainError, ConstraintKind, Polytope, Space, Var, VarSupply,
};
pub use oracle::{FourierMotzkin, OracleError, SetOracle};
#[cfg(feature = "z3")]
pub use oracle::z3_oracle::Z3Oracle;
pub use propagate::{Binding, ConstraintDescriptor, ConstraintEngine, Verdict, Witness};
pub use registry::{AxiomContract, AxiomRegistry, ContractGenerator, BUILTIN_CONTRACTS};
pub use tree::VariableTree;

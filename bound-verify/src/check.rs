#![forbid(unsafe_code)]
#![allow(unused_assignments)]

use bound_ast::{AssumeStmt, DefineStmt, Program, Span, Stmt};
use bound_core::{CheckConfig, Elaborator, Global, TypeError};
use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::ConstraintDomainError;
use crate::oracle::{FourierMotzkin, SetOracle};
use crate::propagate::{ConstraintDescriptor, ConstraintEngine, Verdict};
use crate::registry::AxiomRegistry;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    Assume,
    Define,
}

/// Result of checking one statement that elaborated and typed cleanly.
#[derive(Clone, Debug, Serialize)]
pub struct StatementReport {
    pub name: String,
    pub kind: StatementKind,
    /// The elaborated value; for an assumption, its name.
    pub term: String,
    pub ty: String,
    pub descriptor: ConstraintDescriptor,
    /// `None` for assumptions: only definitions are checked against contracts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Verdict>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorStage {
    Type,
    Domain,
}

#[derive(Clone, Debug, Error, Diagnostic, Serialize)]
#[error("`{name}` rejected: {message}")]
#[diagnostic(code(bound::statement))]
#[allow(unused_assignments)]
pub struct StatementError {
    pub name: String,
    pub stage: ErrorStage,
    pub message: String,
    #[serde(skip)]
    #[label("in this statement")]
    pub span: Span,
}

impl StatementError {
    fn typing(name: &str, span: Span, err: TypeError) -> Self {
        Self {
            name: name.to_string(),
            stage: ErrorStage::Type,
            message: err.to_string(),
            span,
        }
    }

    fn domain(name: &str, span: Span, err: ConstraintDomainError) -> Self {
        Self {
            name: name.to_string(),
            stage: ErrorStage::Domain,
            message: err.to_string(),
            span,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StatementOutcome {
    Checked(StatementReport),
    Failed(StatementError),
}

impl StatementOutcome {
    pub fn name(&self) -> &str {
        match self {
            StatementOutcome::Checked(r) => &r.name,
            StatementOutcome::Failed(e) => &e.name,
        }
    }

    pub fn verdict(&self) -> Option<&Verdict> {
        match self {
            StatementOutcome::Checked(r) => r.verdict.as_ref(),
            StatementOutcome::Failed(_) => None,
        }
    }
}

/// Per-statement outcomes in source order.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ProgramReport {
    pub statements: Vec<StatementOutcome>,
}

impl ProgramReport {
    pub fn errors(&self) -> impl Iterator<Item = &StatementError> {
        self.statements.iter().filter_map(|s| match s {
            StatementOutcome::Failed(e) => Some(e),
            StatementOutcome::Checked(_) => None,
        })
    }

    pub fn violations(&self) -> impl Iterator<Item = &StatementReport> {
        self.statements.iter().filter_map(|s| match s {
            StatementOutcome::Checked(r) => {
                matches!(r.verdict, Some(Verdict::Violated(_))).then_some(r)
            }
            StatementOutcome::Failed(_) => None,
        })
    }

    /// The latest outcome for `name`.
    pub fn get(&self, name: &str) -> Option<&StatementOutcome> {
        self.statements.iter().rev().find(|s| s.name() == name)
    }

    /// No statement failed and none was violated.
    pub fn is_ok(&self) -> bool {
        self.errors().next().is_none() && self.violations().next().is_none()
    }
}

/// Checks a program with the Fourier–Motzkin oracle.
pub fn check_program(
    program: &Program,
    registry: &AxiomRegistry,
    config: &CheckConfig,
) -> ProgramReport {
    let oracle = FourierMotzkin::new(config.max_fm_constraints);
    check_program_with(program, registry, config, &oracle)
}

/// Checks every statement in order. A failed statement does not bind its
/// name; later statements are still checked.
pub fn check_program_with(
    program: &Program,
    registry: &AxiomRegistry,
    config: &CheckConfig,
    oracle: &dyn SetOracle,
) -> ProgramReport {
    let mut elab = Elaborator::new(config.clone());
    let mut engine = ConstraintEngine::new(registry, oracle, elab.checker().clone());
    let mut report = ProgramReport::default();

    for stmt in &program.stmts {
        let outcome = match stmt {
            Stmt::Assume(s) => check_assume(&mut elab, &mut engine, registry, oracle, s),
            Stmt::Define(s) => check_define(&mut elab, &mut engine, s),
        };
        let outcome = match outcome {
            Ok(r) => {
                match &r.verdict {
                    Some(verdict) => info!(name = %r.name, %verdict, "checked"),
                    None => debug!(name = %r.name, ty = %r.ty, "assumed"),
                }
                StatementOutcome::Checked(r)
            }
            Err(e) => {
                info!(name = %e.name, error = %e.message, "rejected");
                StatementOutcome::Failed(e)
            }
        };
        report.statements.push(outcome);
    }
    report
}

fn check_assume(
    elab: &mut Elaborator,
    engine: &mut ConstraintEngine<'_>,
    registry: &AxiomRegistry,
    oracle: &dyn SetOracle,
    stmt: &AssumeStmt,
) -> Result<StatementReport, StatementError> {
    let name = stmt.name.node.as_str();
    let axiom = elab
        .check_assume(name, &stmt.ty)
        .map_err(|e| StatementError::typing(name, stmt.span, e))?;

    let descriptor = match registry.instantiate(name, engine.supply()) {
        Some(contract) => {
            let contract = contract.map_err(|e| StatementError::domain(name, stmt.span, e))?;
            contract
                .validate(&axiom.ty, elab.checker(), oracle)
                .map_err(|e| StatementError::domain(name, stmt.span, e))?;
            contract.into()
        }
        None => ConstraintDescriptor::empty(),
    };

    let ty = axiom.ty.to_string();
    elab.bind(Global::Axiom(axiom));
    Ok(StatementReport {
        name: name.to_string(),
        kind: StatementKind::Assume,
        term: name.to_string(),
        ty,
        descriptor,
        verdict: None,
    })
}

fn check_define(
    elab: &mut Elaborator,
    engine: &mut ConstraintEngine<'_>,
    stmt: &DefineStmt,
) -> Result<StatementReport, StatementError> {
    let name = stmt.name.node.as_str();
    let def = elab
        .check_define(name, stmt.ty.as_ref(), &stmt.value)
        .map_err(|e| StatementError::typing(name, stmt.span, e))?;
    let descriptor = engine
        .definition(&def)
        .map_err(|e| StatementError::domain(name, stmt.span, e))?;
    let verdict = engine.check_constraints(&descriptor);

    let report = StatementReport {
        name: name.to_string(),
        kind: StatementKind::Define,
        term: def.value.to_string(),
        ty: def.ty.to_string(),
        descriptor,
        verdict: Some(verdict),
    };
    elab.bind(Global::Definition(def));
    Ok(report)
}

#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::rc::Rc;

use bound_ast::{Axiom, Definition, Term, TermRef};
use tracing::debug;

use crate::config::CheckConfig;
use crate::context::Context;
use crate::error::{TypeError, TypeErrorKind};
use crate::infer::{unshadow, TypeChecker};

/// Name of the builtin base type, used when no global shadows it.
pub const NAT_NAME: &str = "Nat";

/// A top-level binding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Global {
    Axiom(Rc<Axiom>),
    Definition(Rc<Definition>),
}

impl Global {
    pub fn name(&self) -> &str {
        match self {
            Global::Axiom(ax) => &ax.name,
            Global::Definition(def) => &def.name,
        }
    }

    pub fn ty(&self) -> &TermRef {
        match self {
            Global::Axiom(ax) => &ax.ty,
            Global::Definition(def) => &def.ty,
        }
    }

    /// The reference a resolved occurrence of this name elaborates to.
    pub fn reference(&self) -> TermRef {
        match self {
            Global::Axiom(ax) => Term::axiom_ref(ax.clone()),
            Global::Definition(def) => Term::def_ref(def.clone()),
        }
    }
}

/// Global environment. Rebinding a name only affects later lookups; terms
/// elaborated earlier keep their `Rc` to the old binding.
#[derive(Clone, Debug, Default)]
pub struct Env {
    globals: HashMap<String, Global>,
}

impl Env {
    pub fn get(&self, name: &str) -> Option<&Global> {
        self.globals.get(name)
    }

    pub fn bind(&mut self, global: Global) -> Option<Global> {
        self.globals.insert(global.name().to_string(), global)
    }
}

#[derive(Clone, Debug, Default)]
pub struct Elaborator {
    checker: TypeChecker,
    env: Env,
}

impl Elaborator {
    pub fn new(config: CheckConfig) -> Self {
        Self {
            checker: TypeChecker::new(config),
            env: Env::default(),
        }
    }

    pub fn checker(&self) -> &TypeChecker {
        &self.checker
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn lookup(&self, name: &str) -> Option<&Global> {
        self.env.get(name)
    }

    pub fn infer(&self, term: &TermRef, ctx: &Context) -> Result<TermRef, TypeError> {
        self.checker.infer(term, ctx)
    }

    /// Resolves names against `ctx` and the environment and curries tupled
    /// applications whose function does not take a product.
    pub fn elaborate(&self, term: &TermRef, ctx: &Context) -> Result<TermRef, TypeError> {
        match &**term {
            Term::Var(name) => self.resolve(term, name, ctx),
            Term::Lit(_) | Term::Star | Term::Nat | Term::AxiomRef(_) | Term::DefRef(_) => {
                Ok(term.clone())
            }
            Term::Lambda {
                param,
                domain,
                body,
            } => {
                let (param, body, domain) = self.elaborate_binder(param, domain, body, ctx)?;
                Ok(Term::lambda(param, domain, body))
            }
            Term::Pi {
                param,
                domain,
                codomain,
            } => {
                let (param, codomain, domain) =
                    self.elaborate_binder(param, domain, codomain, ctx)?;
                Ok(Term::pi(param, domain, codomain))
            }
            Term::App { func, arg } => {
                let func = self.elaborate(func, ctx)?;
                self.elaborate_app(func, arg, ctx)
            }
            Term::Pair { first, second } => Ok(Term::pair(
                self.elaborate(first, ctx)?,
                self.elaborate(second, ctx)?,
            )),
            Term::Proj { pair, index } => Ok(Term::proj(self.elaborate(pair, ctx)?, *index)),
        }
    }

    fn resolve(&self, term: &TermRef, name: &str, ctx: &Context) -> Result<TermRef, TypeError> {
        if ctx.binds(name) {
            return Ok(term.clone());
        }
        if let Some(global) = self.env.get(name) {
            return Ok(global.reference());
        }
        if name == NAT_NAME {
            return Ok(Term::nat());
        }
        Err(TypeError::new(
            TypeErrorKind::UnboundName,
            term,
            format!("cannot find `{name}` in this scope"),
        ))
    }

    fn elaborate_binder(
        &self,
        param: &str,
        domain: &TermRef,
        body: &TermRef,
        ctx: &Context,
    ) -> Result<(String, TermRef, TermRef), TypeError> {
        let domain = self.elaborate(domain, ctx)?;
        let (param, body) = unshadow(param, body, ctx);
        let inner = ctx.extended(param.clone(), domain.clone());
        let body = self.elaborate(&body, &inner)?;
        Ok((param, body, domain))
    }

    // `func` is already elaborated, `arg` is still surface syntax.
    fn elaborate_app(
        &self,
        func: TermRef,
        arg: &TermRef,
        ctx: &Context,
    ) -> Result<TermRef, TypeError> {
        if let Term::Pair { first, second } = &**arg {
            if !self.expects_product(&func, ctx)? {
                let partial = self.elaborate_app(func, first, ctx)?;
                return self.elaborate_app(partial, second, ctx);
            }
        }
        let arg = self.elaborate(arg, ctx)?;
        Ok(Term::app(func, arg))
    }

    /// Whether `func` is a function whose domain is a product type.
    /// Non-functions answer `true` so the pair stays put and inference
    /// reports the real problem.
    fn expects_product(&self, func: &TermRef, ctx: &Context) -> Result<bool, TypeError> {
        let ty = self.checker.whnf(&self.checker.infer(func, ctx)?)?;
        match &*ty {
            Term::Pi { domain, .. } => {
                Ok(matches!(&*self.checker.whnf(domain)?, Term::Pair { .. }))
            }
            _ => Ok(true),
        }
    }

    /// Checks `assume name : ty;` without binding it.
    pub fn check_assume(&self, name: &str, ty: &TermRef) -> Result<Rc<Axiom>, TypeError> {
        let ctx = Context::new();
        let ty = self.elaborate(ty, &ctx)?;
        self.checker.infer(&ty, &ctx)?;
        Ok(Rc::new(Axiom {
            name: name.to_string(),
            ty,
        }))
    }

    /// Checks `define name [: ty] = value;` without binding it. An
    /// annotation must agree with the inferred type and replaces it.
    pub fn check_define(
        &self,
        name: &str,
        ty: Option<&TermRef>,
        value: &TermRef,
    ) -> Result<Rc<Definition>, TypeError> {
        let ctx = Context::new();
        let value = self.elaborate(value, &ctx)?;
        let inferred = self.checker.infer(&value, &ctx)?;
        let ty = match ty {
            Some(annotation) => {
                let annotation = self.elaborate(annotation, &ctx)?;
                self.checker.infer(&annotation, &ctx)?;
                if !self.checker.conv(&inferred, &annotation)? {
                    return Err(TypeError::new(
                        TypeErrorKind::DomainMismatch,
                        &value,
                        format!("`{name}` is annotated `{annotation}` but has type `{inferred}`"),
                    ));
                }
                annotation
            }
            None => inferred,
        };
        Ok(Rc::new(Definition {
            name: name.to_string(),
            ty,
            value,
        }))
    }

    /// Makes `global` visible to every later lookup of its name.
    pub fn bind(&mut self, global: Global) {
        debug!(name = global.name(), ty = %global.ty(), "bound");
        self.env.bind(global);
    }

    pub fn assume(&mut self, name: &str, ty: &TermRef) -> Result<Rc<Axiom>, TypeError> {
        let axiom = self.check_assume(name, ty)?;
        self.bind(Global::Axiom(axiom.clone()));
        Ok(axiom)
    }

    pub fn define(
        &mut self,
        name: &str,
        ty: Option<&TermRef>,
        value: &TermRef,
    ) -> Result<Rc<Definition>, TypeError> {
        let def = self.check_define(name, ty, value)?;
        self.bind(Global::Definition(def.clone()));
        Ok(def)
    }
}

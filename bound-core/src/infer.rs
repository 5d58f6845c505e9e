#![forbid(unsafe_code)]

use bound_ast::{Term, TermRef};
use tracing::trace;

use crate::config::CheckConfig;
use crate::context::Context;
use crate::error::{TypeError, TypeErrorKind};
use crate::reduce::{conv, whnf, Fuel};
use crate::subst::{fresh_name, rename, subst};

/// Structural type inference for elaborated terms.
///
/// Every query gets its own reduction budget, so `infer` is a pure
/// function of the term and the context.
#[derive(Clone, Debug, Default)]
pub struct TypeChecker {
    config: CheckConfig,
}

impl TypeChecker {
    pub fn new(config: CheckConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CheckConfig {
        &self.config
    }

    fn fuel(&self) -> Fuel {
        Fuel::new(self.config.max_reduction_steps)
    }

    pub fn infer(&self, term: &TermRef, ctx: &Context) -> Result<TermRef, TypeError> {
        let mut fuel = self.fuel();
        let ty = self.infer_in(term, ctx, &mut fuel)?;
        trace!(term = %term, ty = %ty, steps = fuel.used(), "inferred");
        Ok(ty)
    }

    pub fn whnf(&self, term: &TermRef) -> Result<TermRef, TypeError> {
        whnf(term, &mut self.fuel())
    }

    pub fn conv(&self, a: &TermRef, b: &TermRef) -> Result<bool, TypeError> {
        conv(a, b, &mut self.fuel())
    }

    fn infer_in(
        &self,
        term: &TermRef,
        ctx: &Context,
        fuel: &mut Fuel,
    ) -> Result<TermRef, TypeError> {
        match &**term {
            Term::Var(name) => ctx.lookup(name).cloned().ok_or_else(|| {
                TypeError::new(
                    TypeErrorKind::UnboundName,
                    term,
                    format!("`{name}` is not bound here"),
                )
            }),
            Term::Lit(_) => Ok(Term::nat()),
            Term::Star | Term::Nat => Ok(Term::star()),
            Term::AxiomRef(ax) => Ok(ax.ty.clone()),
            Term::DefRef(def) => Ok(def.ty.clone()),
            Term::Lambda {
                param,
                domain,
                body,
            } => {
                self.infer_in(domain, ctx, fuel)?;
                let (param, body) = unshadow(param, body, ctx);
                let inner = ctx.extended(param.clone(), domain.clone());
                let body_ty = self.infer_in(&body, &inner, fuel)?;
                Ok(Term::pi(param, domain.clone(), body_ty))
            }
            Term::Pi {
                param,
                domain,
                codomain,
            } => {
                self.infer_in(domain, ctx, fuel)?;
                let (param, codomain) = unshadow(param, codomain, ctx);
                self.infer_in(&codomain, &ctx.extended(param, domain.clone()), fuel)?;
                Ok(Term::star())
            }
            Term::App { func, arg } => {
                let func_ty = self.infer_in(func, ctx, fuel)?;
                let func_ty = whnf(&func_ty, fuel)?;
                let Term::Pi {
                    param,
                    domain,
                    codomain,
                } = &*func_ty
                else {
                    return Err(TypeError::new(
                        TypeErrorKind::NotAFunction,
                        func,
                        format!("`{func}` has type `{func_ty}`, which is not a function type"),
                    ));
                };
                let arg_ty = self.infer_in(arg, ctx, fuel)?;
                if !conv(&arg_ty, domain, fuel)? {
                    return Err(TypeError::new(
                        TypeErrorKind::DomainMismatch,
                        arg,
                        format!(
                            "expected an argument of type `{domain}`, \
                             found `{arg}` of type `{arg_ty}`"
                        ),
                    ));
                }
                Ok(subst(codomain, param, arg))
            }
            Term::Pair { first, second } => {
                let first_ty = self.infer_in(first, ctx, fuel)?;
                let second_ty = self.infer_in(second, ctx, fuel)?;
                Ok(Term::pair(first_ty, second_ty))
            }
            Term::Proj { pair, index } => {
                let pair_ty = self.infer_in(pair, ctx, fuel)?;
                let pair_ty = whnf(&pair_ty, fuel)?;
                match &*pair_ty {
                    Term::Pair { first, second } => Ok(if *index == 0 {
                        first.clone()
                    } else {
                        second.clone()
                    }),
                    _ => Err(TypeError::new(
                        TypeErrorKind::NotAPair,
                        pair,
                        format!("`{pair}` has type `{pair_ty}`, which is not a pair type"),
                    )),
                }
            }
        }
    }
}

/// Renames a binder that would shadow a name already in the context, so
/// types stored in the context keep referring to the outer binding.
pub(crate) fn unshadow(param: &str, body: &TermRef, ctx: &Context) -> (String, TermRef) {
    if !ctx.binds(param) {
        return (param.to_string(), body.clone());
    }
    let mut avoid = ctx.names();
    avoid.extend(body.free_vars());
    let fresh = fresh_name(param, &avoid);
    let body = rename(body, param, &fresh);
    (fresh, body)
}

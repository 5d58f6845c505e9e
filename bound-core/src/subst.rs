#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use bound_ast::{Term, TermRef};

/// Capture-avoiding substitution `term[name := value]`.
pub fn subst(term: &TermRef, name: &str, value: &TermRef) -> TermRef {
    let fv = value.free_vars();
    subst_in(term, name, value, &fv)
}

fn subst_in(term: &TermRef, name: &str, value: &TermRef, fv: &BTreeSet<String>) -> TermRef {
    match &**term {
        Term::Var(x) if x == name => value.clone(),
        Term::Var(_)
        | Term::Lit(_)
        | Term::Star
        | Term::Nat
        | Term::AxiomRef(_)
        | Term::DefRef(_) => term.clone(),
        Term::Lambda {
            param,
            domain,
            body,
        } => {
            let domain = subst_in(domain, name, value, fv);
            let (param, body) = subst_under_binder(param, body, name, value, fv);
            Term::lambda(param, domain, body)
        }
        Term::Pi {
            param,
            domain,
            codomain,
        } => {
            let domain = subst_in(domain, name, value, fv);
            let (param, codomain) = subst_under_binder(param, codomain, name, value, fv);
            Term::pi(param, domain, codomain)
        }
        Term::App { func, arg } => Term::app(
            subst_in(func, name, value, fv),
            subst_in(arg, name, value, fv),
        ),
        Term::Pair { first, second } => Term::pair(
            subst_in(first, name, value, fv),
            subst_in(second, name, value, fv),
        ),
        Term::Proj { pair, index } => Term::proj(subst_in(pair, name, value, fv), *index),
    }
}

fn subst_under_binder(
    param: &str,
    body: &TermRef,
    name: &str,
    value: &TermRef,
    fv: &BTreeSet<String>,
) -> (String, TermRef) {
    if param == name || !body.has_free_var(name) {
        return (param.to_string(), body.clone());
    }
    if !fv.contains(param) {
        return (param.to_string(), subst_in(body, name, value, fv));
    }

    // The binder would capture a free variable of `value`: rename it first.
    let mut avoid = fv.clone();
    avoid.extend(body.free_vars());
    avoid.insert(name.to_string());
    let fresh = fresh_name(param, &avoid);
    let renamed = rename(body, param, &fresh);
    (fresh, subst_in(&renamed, name, value, fv))
}

/// Renames free occurrences of `from` to `to`, where `to` is fresh for `term`.
pub fn rename(term: &TermRef, from: &str, to: &str) -> TermRef {
    let replacement = Term::var(to);
    let fv = BTreeSet::from([to.to_string()]);
    subst_in(term, from, &replacement, &fv)
}

/// `base'`, `base''`, ... whichever is first not in `avoid`.
pub fn fresh_name(base: &str, avoid: &BTreeSet<String>) -> String {
    let mut candidate = format!("{base}'");
    while avoid.contains(&candidate) {
        candidate.push('\'');
    }
    candidate
}

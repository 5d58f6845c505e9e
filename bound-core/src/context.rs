#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use bound_ast::TermRef;

/// Local typing context: lambda/pi binders in scope, innermost last.
#[derive(Clone, Debug, Default)]
pub struct Context {
    locals: Vec<(String, TermRef)>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, name: &str) -> Option<&TermRef> {
        self.locals
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, ty)| ty)
    }

    pub fn binds(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    pub fn extended(&self, name: impl Into<String>, ty: TermRef) -> Self {
        let mut locals = self.locals.clone();
        locals.push((name.into(), ty));
        Self { locals }
    }

    pub fn names(&self) -> BTreeSet<String> {
        self.locals.iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.locals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locals.is_empty()
    }
}

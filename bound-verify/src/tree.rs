#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Serialize, Serializer};

use crate::domain::Var;

/// Maps the positions of a (possibly curried or tupled) value to integer
/// constraint variables.
///
/// For a function `Node` holds the argument tree and the result tree; for a
/// pair it holds both components.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum VariableTree {
    #[default]
    Opaque,
    Var(Var),
    Value(i64),
    Node(Box<VariableTree>, Box<VariableTree>),
}

impl VariableTree {
    pub fn node(left: VariableTree, right: VariableTree) -> Self {
        VariableTree::Node(Box::new(left), Box::new(right))
    }

    pub fn var(var: &Var) -> Self {
        VariableTree::Var(var.clone())
    }

    /// Component `index` of a node; `Opaque` for anything else.
    pub fn component(&self, index: u8) -> VariableTree {
        match self {
            VariableTree::Node(l, r) => {
                if index == 0 {
                    (**l).clone()
                } else {
                    (**r).clone()
                }
            }
            _ => VariableTree::Opaque,
        }
    }

    pub fn free_vars(&self) -> BTreeSet<Var> {
        let mut out = BTreeSet::new();
        self.collect_vars(&mut out);
        out
    }

    fn collect_vars(&self, out: &mut BTreeSet<Var>) {
        match self {
            VariableTree::Var(v) => {
                out.insert(v.clone());
            }
            VariableTree::Node(l, r) => {
                l.collect_vars(out);
                r.collect_vars(out);
            }
            VariableTree::Opaque | VariableTree::Value(_) => {}
        }
    }

    /// Replaces every `Var(var)` leaf by `Value(value)`.
    pub fn substitute(&self, var: &Var, value: i64) -> VariableTree {
        match self {
            VariableTree::Var(v) if v == var => VariableTree::Value(value),
            VariableTree::Node(l, r) => {
                VariableTree::node(l.substitute(var, value), r.substitute(var, value))
            }
            other => other.clone(),
        }
    }

    pub(crate) fn renamed(&self, map: &BTreeMap<Var, Var>) -> VariableTree {
        match self {
            VariableTree::Var(v) => VariableTree::Var(map.get(v).unwrap_or(v).clone()),
            VariableTree::Node(l, r) => VariableTree::node(l.renamed(map), r.renamed(map)),
            other => other.clone(),
        }
    }

    pub(crate) fn describe(&self) -> &'static str {
        match self {
            VariableTree::Opaque => "an opaque leaf",
            VariableTree::Var(_) => "a variable leaf",
            VariableTree::Value(_) => "a value leaf",
            VariableTree::Node(..) => "a node",
        }
    }
}

impl fmt::Display for VariableTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableTree::Opaque => f.write_str("_"),
            VariableTree::Var(v) => write!(f, "{v}"),
            VariableTree::Value(n) => write!(f, "{n}"),
            VariableTree::Node(l, r) => write!(f, "<{l}, {r}>"),
        }
    }
}

impl Serialize for VariableTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

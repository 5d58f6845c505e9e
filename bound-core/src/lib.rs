#![forbid(unsafe_code)]

mod config;
mod context;
mod elaborate;
mod error;
mod infer;
mod reduce;
mod subst;

pub use config::CheckConfig;
pub use context::Context;
pub use elaborate::{Elaborator, Env, Global, NAT_NAME};
pub use error::{TypeError, TypeErrorKind};
pub use infer::TypeChecker;
pub use reduce::{conv, whnf, Fuel};
pub use subst::{fresh_name, rename, subst};

mod actions;
mod conditions;
mod domain;
mod effects;
pub mod errors;
mod expressions;
mod fluents;
mod interpreter;
mod predicates;
mod problem;
mod session;
mod sym;
mod terms;
pub mod tsal;
mod types;
pub(crate) mod utils;

pub use actions::*;
pub use conditions::*;
pub use domain::*;
pub use effects::*;
pub use expressions::*;
pub use fluents::*;
pub use interpreter::*;
pub use predicates::*;
pub use problem::*;
pub use session::*;
pub use sym::Sym;
pub use terms::*;
pub use types::*;

pub use errors::Res;
pub use tsal::{ToTsal, parse_domain, parse_problem, parse_source};

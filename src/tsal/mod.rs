//! The TSAL language: reading, writing and conversion from the legacy PDDL format.

mod forall;
pub mod input;
pub mod legacy;
pub mod lexer;
pub mod parser;
pub mod sexpr;
pub mod writer;

pub use legacy::{SourceKind, convert_file, legacy_to_tsal, tsal_to_legacy};
pub use parser::{parse_domain, parse_problem, parse_source};
pub use writer::ToTsal;

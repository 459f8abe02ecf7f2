//! Python front end: parsing, the owned syntax tree, traversal and source
//! reconstruction.

pub mod ast;
pub mod parser;
pub mod unparse;
pub mod visit;

pub use parser::parse_module;
pub use unparse::{unparse_expr, unparse_function, unparse_module};

//! Lowering of the typed AST into instruction graphs.

mod context;
mod generator;

pub use generator::{lower, lower_function};

//! Abstract Syntax Tree definitions, as handed over by the type checker.
#[cfg(test)]
pub mod builder;
mod type_spec;
pub mod typed;

pub use type_spec::*;

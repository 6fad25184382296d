//! The intermediate representation: per-function graphs of three-address instructions.

mod function;
mod instr;
#[cfg(test)]
pub mod interpreter;
mod name_generator;
mod program;
mod value;

pub use function::*;
pub use instr::*;
pub use name_generator::NameGenerator;
pub use program::*;
pub use value::*;

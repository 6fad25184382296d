//! The back end of the Crux compiler: lowers a type-checked program into per-function instruction
//! graphs and linearizes those into x86-64 assembly.
pub mod ast;
pub mod builtins;
pub mod codegen;
pub mod commandline;
pub mod error;
pub mod ir;
pub mod lower;
mod prelude;

use prelude::*;

/// Compile a type-checked program into GNU assembler source.
pub fn compile(program: &ast::typed::Program) -> Result<String, InternalError> {
    let lowered = lower::lower(program)?;
    debug!("Lowered {} functions", lowered.functions.len());
    codegen::generate(&lowered)
}

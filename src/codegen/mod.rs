//! Target code generation: linearizes the instruction graphs of a program into assembly text.
mod amd64;

use crate::{ir::Program, prelude::*};

/// Generate GNU assembler source for x86-64 Linux. Any violated invariant aborts generation of
/// the whole program; there is no partial output.
pub fn generate(program: &Program) -> Result<String, InternalError> {
    let assembly = amd64::linux::compile(program)?;
    Ok(assembly.to_string())
}

//! Native code generation for 64-bit x86 platforms.

mod assembly;
mod calling_convention;
mod labels;
pub mod linux;
mod procedure_compiler;
mod slots;
mod stack_convention;
mod x86;

use crate::ast::SCALAR_WIDTH;

use super::{
    assembly::Operand,
    x86::Register::{self, *},
};

const SYSTEM_V_PARAMS: &[Register] = &[Rdi, Rsi, Rdx, Rcx, R8, R9];

/// Bytes between the frame pointer and the first stack-passed argument: the saved frame
/// pointer and the return address.
const CALLER_FRAME_OFFSET: i64 = 16;

pub enum CallingConvention {
    /// The System V AMD64 ABI
    SystemV64,
}

impl CallingConvention {
    /// Gets the maximum amount of parameters that can be passed via registers.
    pub fn reg_param_count(&self) -> usize {
        self.get_params().len()
    }

    pub fn get_params(&self) -> &'static [Register] {
        match self {
            CallingConvention::SystemV64 => SYSTEM_V_PARAMS,
        }
    }

    pub fn get_return_reg(&self) -> Register {
        Rax
    }

    /// Where the callee finds its `idx`th parameter on entry.
    pub fn incoming_param(&self, idx: usize) -> Operand {
        match self.get_params().get(idx) {
            Some(reg) => Operand::Reg(*reg),
            None => Operand::Mem(
                Rbp,
                CALLER_FRAME_OFFSET + SCALAR_WIDTH * self.overflow_index(idx),
            ),
        }
    }

    /// Where the caller places its `idx`th argument before the call.
    pub fn outgoing_arg(&self, idx: usize) -> Operand {
        match self.get_params().get(idx) {
            Some(reg) => Operand::Reg(*reg),
            None => Operand::Mem(Rsp, SCALAR_WIDTH * self.overflow_index(idx)),
        }
    }

    /// Number of arguments of a call with `arg_count` arguments that do not fit in registers.
    pub fn overflow_count(&self, arg_count: usize) -> usize {
        arg_count.saturating_sub(self.reg_param_count())
    }

    fn overflow_index(&self, idx: usize) -> i64 {
        (idx - self.reg_param_count()) as i64
    }

    /// Required alignment of the stack pointer at every call instruction, in bytes.
    pub fn stack_alignment(&self) -> i64 {
        16
    }
}

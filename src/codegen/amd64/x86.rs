use std::fmt::{self, Display, Formatter};

use crate::ir::Predicate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    Rbp,
    Rsp,
    Rip,
    Rdi,
    Rsi,
    Rax,
    Rcx,
    Rdx,
    R8,
    R9,
    R10,
    R11,
}
impl Display for Register {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            Register::Rbp => "%rbp",
            Register::Rsp => "%rsp",
            Register::Rip => "%rip",
            Register::Rdi => "%rdi",
            Register::Rsi => "%rsi",
            Register::Rax => "%rax",
            Register::Rcx => "%rcx",
            Register::Rdx => "%rdx",
            Register::R8 => "%r8",
            Register::R9 => "%r9",
            Register::R10 => "%r10",
            Register::R11 => "%r11",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    // Stack manipulation
    Pushq,
    Call,
    Leave,
    Ret,
    // Copies
    Movq,
    // Arithmetic
    Addq,
    Subq,
    Imulq,
    Idivq,
    Cqto,
    // Comparison
    Cmpq,
    Cmov(Predicate),
    // Jumps
    Je,
    Jmp,
}
impl Display for Op {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            Op::Pushq => "pushq",
            Op::Call => "call",
            Op::Leave => "leave",
            Op::Ret => "ret",
            Op::Movq => "movq",
            Op::Addq => "addq",
            Op::Subq => "subq",
            Op::Imulq => "imulq",
            Op::Idivq => "idivq",
            Op::Cqto => "cqto",
            Op::Cmpq => "cmpq",
            Op::Cmov(Predicate::Eq) => "cmove",
            Op::Cmov(Predicate::Ne) => "cmovne",
            Op::Cmov(Predicate::Lt) => "cmovl",
            Op::Cmov(Predicate::Le) => "cmovle",
            Op::Cmov(Predicate::Gt) => "cmovg",
            Op::Cmov(Predicate::Ge) => "cmovge",
            Op::Je => "je",
            Op::Jmp => "jmp",
        })
    }
}

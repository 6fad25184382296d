//! Conventions for stack usage.
use super::assembly::*;
use super::x86::*;

use Op::*;
use Operand::*;
use Register::*;

pub trait StackConvention {
    /// Set up a frame reserving `frame_size` bytes below the frame pointer.
    fn add_prologue(block: &mut Block, frame_size: i64);
    fn add_epilogue(block: &mut Block);

    fn prologue(frame_size: i64) -> Block {
        let mut block = Block::new();
        Self::add_prologue(&mut block, frame_size);
        block
    }
}

pub struct Linux64;
impl StackConvention for Linux64 {
    fn add_prologue(block: &mut Block, frame_size: i64) {
        block
            .push_cmt(Pushq, [Reg(Rbp)], "store base pointer")
            .push_cmt(Movq, [Reg(Rsp), Reg(Rbp)], "move base pointer down");
        if frame_size > 0 {
            block.push_cmt(
                Subq,
                [Imm(frame_size), Reg(Rsp)],
                format!("reserve {} bytes of stack", frame_size),
            );
        }
    }

    fn add_epilogue(block: &mut Block) {
        block.push(Leave, []).push(Ret, []);
    }
}

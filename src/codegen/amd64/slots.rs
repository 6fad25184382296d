//! Storage slots: one fixed stack location per temporary.
use std::collections::HashMap;

use crate::{ast::SCALAR_WIDTH, ir::Variable};

use super::{assembly::Operand, x86::Register};

/// Assigns every temporary its own slot below the frame pointer, in order of first definition.
/// Slots are never reused.
#[derive(Debug, Default)]
pub struct SlotMap {
    slots: HashMap<Variable, usize>,
}
impl SlotMap {
    pub fn new() -> Self {
        Default::default()
    }

    /// The slot of `var`, assigning the next free slot if it has none yet.
    pub fn assign<V: Into<Variable>>(&mut self, var: V) -> Operand {
        let next = self.slots.len() + 1;
        let slot = *self.slots.entry(var.into()).or_insert(next);
        Self::operand(slot)
    }

    /// The slot of `var`, if it has been assigned one.
    pub fn lookup<V: Into<Variable>>(&self, var: V) -> Option<Operand> {
        self.slots.get(&var.into()).copied().map(Self::operand)
    }

    pub fn count(&self) -> usize {
        self.slots.len()
    }

    fn operand(slot: usize) -> Operand {
        Operand::Mem(Register::Rbp, -SCALAR_WIDTH * slot as i64)
    }
}

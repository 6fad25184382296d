use thiserror::Error;

use crate::ir::InstrId;

/// A violated invariant, detected while lowering or generating code. The input is assumed to be
/// well-typed, so these indicate a bug in the type checker or in this crate. Any such error
/// aborts compilation of the whole program.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InternalError {
    #[error("symbol '{0}' is neither a local variable nor a declared global")]
    UnknownSymbol(String),
    #[error("expression '{0}' does not produce a value")]
    MissingValue(String),
    #[error("expression '{0}' is not a location")]
    NotALocation(String),
    #[error("'{0}' outside of a loop")]
    OutsideLoop(&'static str),
    #[error("instruction {0} is not a conditional jump and cannot branch")]
    NotABranch(InstrId),
    #[error("conditional jump {0} has no taken-branch successor")]
    MissingBranchTarget(InstrId),
    #[error("instruction {0} has a taken-branch successor but is not a conditional jump")]
    UnexpectedBranchTarget(InstrId),
    #[error("instruction {0} does not exist in function '{1}'")]
    DanglingEdge(InstrId, String),
    #[error("entry instruction of function '{0}' does not exist")]
    InvalidEntry(String),
    #[error("condition of conditional jump {0} is not a boolean")]
    NonBooleanCondition(InstrId),
    #[error("'{0}' is read by instruction {1} without being written on every path to it")]
    UseBeforeDefinition(String, InstrId),
    #[error("no storage slot was assigned to '{0}' before it was read")]
    MissingSlot(String),
    #[error("instruction {0} is a jump target but has no label")]
    MissingLabel(InstrId),
}

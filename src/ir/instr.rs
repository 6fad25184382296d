//! IR instructions: the nodes of a function's instruction graph.
use std::fmt::{self, Display, Formatter};

use crate::ast::typed::Symbol;

use super::{AddressVar, ConstantTable, LocalVar, NameGenerator, Value, Variable};

/// Handle to an instruction in its function's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstrId(pub(super) usize);
impl InstrId {
    pub fn index(&self) -> usize {
        self.0
    }
}
impl Display for InstrId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}
impl Display for ArithOp {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            ArithOp::Add => "add",
            ArithOp::Sub => "sub",
            ArithOp::Mul => "mul",
            ArithOp::Div => "div",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}
impl Predicate {
    /// Evaluates the predicate on two machine values.
    pub fn holds(&self, lhs: i64, rhs: i64) -> bool {
        match self {
            Predicate::Eq => lhs == rhs,
            Predicate::Ne => lhs != rhs,
            Predicate::Lt => lhs < rhs,
            Predicate::Le => lhs <= rhs,
            Predicate::Gt => lhs > rhs,
            Predicate::Ge => lhs >= rhs,
        }
    }
}
impl Display for Predicate {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            Predicate::Eq => "eq",
            Predicate::Ne => "ne",
            Predicate::Lt => "lt",
            Predicate::Le => "le",
            Predicate::Gt => "gt",
            Predicate::Ge => "ge",
        })
    }
}

/// The operation an instruction performs.
#[derive(Debug, Clone)]
pub enum InstrKind {
    /// Does nothing. Used as loop headers, merge points and jump placeholders.
    Nop,
    Copy {
        dst: LocalVar,
        src: Value,
    },
    Binary {
        op: ArithOp,
        dst: LocalVar,
        lhs: LocalVar,
        rhs: LocalVar,
    },
    Compare {
        predicate: Predicate,
        dst: LocalVar,
        lhs: LocalVar,
        rhs: LocalVar,
    },
    Not {
        dst: LocalVar,
        operand: LocalVar,
    },
    /// Computes the address of `base`, offset by `offset` elements if present.
    AddressAt {
        dst: AddressVar,
        base: Symbol,
        offset: Option<LocalVar>,
    },
    Load {
        dst: LocalVar,
        src: AddressVar,
    },
    Store {
        src: LocalVar,
        dst: AddressVar,
    },
    /// Conditional jump: continues at `next[1]` when `condition` is true, at `next[0]`
    /// otherwise.
    Jump {
        condition: LocalVar,
    },
    Call {
        dst: Option<LocalVar>,
        callee: Symbol,
        args: Vec<LocalVar>,
    },
    Return(Option<LocalVar>),
}
impl InstrKind {
    /// The variable this instruction defines, if any.
    pub fn write(&self) -> Option<Variable> {
        match self {
            Self::Copy { dst, .. }
            | Self::Binary { dst, .. }
            | Self::Compare { dst, .. }
            | Self::Not { dst, .. }
            | Self::Load { dst, .. } => Some((*dst).into()),
            Self::AddressAt { dst, .. } => Some((*dst).into()),
            Self::Call { dst, .. } => dst.map(Variable::from),
            Self::Nop | Self::Store { .. } | Self::Jump { .. } | Self::Return(_) => None,
        }
    }

    /// The variables this instruction reads.
    pub fn reads(&self) -> Vec<Variable> {
        match self {
            Self::Nop => vec![],
            Self::Copy { src, .. } => src.as_local().map(Variable::from).into_iter().collect(),
            Self::Binary { lhs, rhs, .. } | Self::Compare { lhs, rhs, .. } => {
                vec![(*lhs).into(), (*rhs).into()]
            }
            Self::Not { operand, .. } => vec![(*operand).into()],
            Self::AddressAt { offset, .. } => offset.map(Variable::from).into_iter().collect(),
            Self::Load { src, .. } => vec![(*src).into()],
            Self::Store { src, dst } => vec![(*src).into(), (*dst).into()],
            Self::Jump { condition } => vec![(*condition).into()],
            Self::Call { args, .. } => args.iter().copied().map(Variable::from).collect(),
            Self::Return(value) => value.map(Variable::from).into_iter().collect(),
        }
    }

    pub fn is_conditional(&self) -> bool {
        matches!(self, Self::Jump { .. })
    }

    pub fn is_return(&self) -> bool {
        matches!(self, Self::Return(_))
    }

    pub fn is_nop(&self) -> bool {
        matches!(self, Self::Nop)
    }

    pub fn display<'a>(
        &'a self,
        names: &'a NameGenerator,
        constants: &'a ConstantTable,
    ) -> InstrDisplay<'a> {
        InstrDisplay {
            kind: self,
            names,
            constants,
        }
    }

    /// Write this instruction in IR listing form, resolving temporaries and constants through
    /// the given tables.
    pub fn fmt_with(
        &self,
        f: &mut Formatter,
        names: &NameGenerator,
        constants: &ConstantTable,
    ) -> fmt::Result {
        let value = |v: &Value| match v {
            Value::Const(id) => constants[*id].to_string(),
            Value::Local(var) => names.name_of(*var).to_string(),
        };
        let name = |v: &LocalVar| names.name_of(*v);

        match self {
            Self::Nop => f.write_str("nop"),
            Self::Copy { dst, src } => write!(f, "{} = copy {}", name(dst), value(src)),
            Self::Binary { op, dst, lhs, rhs } => {
                write!(f, "{} = {} {}, {}", name(dst), op, name(lhs), name(rhs))
            }
            Self::Compare {
                predicate,
                dst,
                lhs,
                rhs,
            } => write!(
                f,
                "{} = cmp {} {}, {}",
                name(dst),
                predicate,
                name(lhs),
                name(rhs)
            ),
            Self::Not { dst, operand } => write!(f, "{} = not {}", name(dst), name(operand)),
            Self::AddressAt { dst, base, offset } => {
                write!(f, "{} = addressAt {}", names.name_of(*dst), base)?;
                if let Some(offset) = offset {
                    write!(f, ", {}", name(offset))?;
                }
                Ok(())
            }
            Self::Load { dst, src } => write!(f, "{} = load {}", name(dst), names.name_of(*src)),
            Self::Store { src, dst } => {
                write!(f, "store {}, {}", name(src), names.name_of(*dst))
            }
            Self::Jump { condition } => write!(f, "jump {}", name(condition)),
            Self::Call { dst, callee, args } => {
                if let Some(dst) = dst {
                    write!(f, "{} = ", name(dst))?;
                }
                let args = args.iter().map(name).collect::<Vec<_>>().join(", ");
                write!(f, "call {} ({})", callee, args)
            }
            Self::Return(None) => f.write_str("return"),
            Self::Return(Some(value)) => write!(f, "return {}", name(value)),
        }
    }
}

/// An instruction kind together with the tables needed to display it.
pub struct InstrDisplay<'a> {
    kind: &'a InstrKind,
    names: &'a NameGenerator,
    constants: &'a ConstantTable,
}
impl Display for InstrDisplay<'_> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        self.kind.fmt_with(f, self.names, self.constants)
    }
}

/// A node of the instruction graph. `next[0]` is the fallthrough successor; `next[1]` is the
/// taken-branch successor and only exists for conditional jumps.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub kind: InstrKind,
    pub(super) next: [Option<InstrId>; 2],
}
impl Instruction {
    pub fn new(kind: InstrKind) -> Self {
        Self {
            kind,
            next: [None, None],
        }
    }

    pub fn next(&self, idx: usize) -> Option<InstrId> {
        self.next[idx]
    }

    /// The successors of this instruction, fallthrough edge first.
    pub fn successors(&self) -> impl Iterator<Item = (usize, InstrId)> + '_ {
        self.next
            .iter()
            .enumerate()
            .filter_map(|(idx, next)| next.map(|n| (idx, n)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::TypeSpec;

    #[test]
    fn copy_writes_its_destination_and_reads_its_source() {
        let mut names = NameGenerator::new();
        let a = names.next_temp(TypeSpec::Int);
        let b = names.next_temp(TypeSpec::Int);
        let copy = InstrKind::Copy {
            dst: b,
            src: Value::Local(a),
        };

        assert_eq!(Some(Variable::Local(b)), copy.write());
        assert_eq!(vec![Variable::Local(a)], copy.reads());
    }

    #[test]
    fn store_defines_nothing() {
        let mut names = NameGenerator::new();
        let v = names.next_temp(TypeSpec::Int);
        let addr = names.next_address(TypeSpec::Int);
        let store = InstrKind::Store { src: v, dst: addr };

        assert_eq!(None, store.write());
        assert_eq!(2, store.reads().len());
    }

    #[test]
    fn predicates_evaluate_relations() {
        assert!(Predicate::Ge.holds(3, 3));
        assert!(!Predicate::Gt.holds(3, 3));
        assert!(Predicate::Ne.holds(1, 0));
    }
}

//! IR values: interned constants and the two kinds of temporaries.
use std::{
    collections::HashMap,
    fmt::{self, Display, Formatter},
    ops::Index,
};

/// A literal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Constant {
    Int(i64),
    Bool(bool),
}
impl Constant {
    /// The machine encoding of this constant. Booleans are 0 or 1.
    pub fn encode(&self) -> i64 {
        match self {
            Constant::Int(i) => *i,
            Constant::Bool(b) => *b as i64,
        }
    }
}
impl Display for Constant {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Constant::Int(i) => write!(f, "{}", i),
            Constant::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Handle to an interned constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstId(usize);

/// Interns constants by kind and value, so every distinct literal exists exactly once per
/// program.
#[derive(Debug, Default)]
pub struct ConstantTable {
    constants: Vec<Constant>,
    interned: HashMap<Constant, ConstId>,
}
impl ConstantTable {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn intern(&mut self, constant: Constant) -> ConstId {
        let constants = &mut self.constants;
        *self.interned.entry(constant).or_insert_with(|| {
            constants.push(constant);
            ConstId(constants.len() - 1)
        })
    }

    pub fn int(&mut self, value: i64) -> ConstId {
        self.intern(Constant::Int(value))
    }

    pub fn boolean(&mut self, value: bool) -> ConstId {
        self.intern(Constant::Bool(value))
    }

    pub fn len(&self) -> usize {
        self.constants.len()
    }
}
impl Index<ConstId> for ConstantTable {
    type Output = Constant;

    fn index(&self, id: ConstId) -> &Constant {
        &self.constants[id.0]
    }
}

/// A scalar temporary, holding an integer or a boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalVar(pub(super) usize);

/// A temporary holding the address of a memory location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AddressVar(pub(super) usize);

/// Either kind of temporary. This is the key under which storage is assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variable {
    Local(LocalVar),
    Address(AddressVar),
}
impl From<LocalVar> for Variable {
    fn from(var: LocalVar) -> Self {
        Variable::Local(var)
    }
}
impl From<AddressVar> for Variable {
    fn from(var: AddressVar) -> Self {
        Variable::Address(var)
    }
}

/// The source operand of a copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    Const(ConstId),
    Local(LocalVar),
}
impl Value {
    pub fn as_local(&self) -> Option<LocalVar> {
        match self {
            Value::Local(var) => Some(*var),
            Value::Const(_) => None,
        }
    }
}

//! Typed Abstract Syntax Tree nodes.
//!
//! These nodes are produced by the type checker: every expression carries its resolved type, and
//! every name or call carries the resolved [`Symbol`] it refers to.
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use super::TypeSpec;

/// The stable identity of a declared entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolId(pub usize);

/// A resolved symbol. Symbols are compared by identity, never by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: String,
    pub ty: TypeSpec,
}
impl Symbol {
    pub fn new<S: Into<String>>(id: usize, name: S, ty: TypeSpec) -> Self {
        Self {
            id: SymbolId(id),
            name: name.into(),
            ty,
        }
    }
}
impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A complete program: the ordered list of top-level declarations.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Program {
    pub declarations: Vec<Declaration>,
}
impl Program {
    pub fn new() -> Self {
        Self {
            declarations: vec![],
        }
    }

    pub fn add_declaration(&mut self, declaration: Declaration) {
        self.declarations.push(declaration);
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub enum Declaration {
    Function(FuncDef),
    /// A global scalar variable.
    Variable(Symbol),
    /// A global array. Its extent is taken from the symbol's type.
    Array(Symbol),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FuncDef {
    pub symbol: Symbol,
    pub params: Vec<Symbol>,
    pub body: Vec<Statement>,
}

#[derive(Debug, Serialize, Deserialize)]
pub enum Statement {
    /// A local variable declaration.
    VarDecl(Symbol),
    /// An expression evaluated for its side effects, e.g. a call or an assignment.
    Expression(Expr),
    If {
        condition: Expr,
        then_block: Vec<Statement>,
        else_block: Vec<Statement>,
    },
    /// An unconditional loop, exited through `break` or `return`.
    Loop(Vec<Statement>),
    Break,
    Continue,
    Return(Option<Expr>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: TypeSpec,
}
impl Expr {
    pub fn new(kind: ExprKind, ty: TypeSpec) -> Self {
        Self { kind, ty }
    }
}
impl Display for Expr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExprKind {
    LiteralInt(i64),
    LiteralBool(bool),
    /// A named location. Reading it requires a [`ExprKind::Dereference`].
    Name(Symbol),
    /// An element of a global array, also a location.
    ArrayAccess { base: Symbol, offset: Box<Expr> },
    /// Reads the value stored at a location.
    Dereference(Box<Expr>),
    /// Stores a value into a location. Evaluates to the stored value.
    Assign { location: Box<Expr>, value: Box<Expr> },
    Call { callee: Symbol, args: Vec<Expr> },
    Binary { op: BinOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Not(Box<Expr>),
}
impl Display for ExprKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        use ExprKind::*;
        match self {
            LiteralInt(i) => write!(f, "{}", i),
            LiteralBool(b) => write!(f, "{}", b),
            Name(sym) => write!(f, "{}", sym),
            ArrayAccess { base, offset } => write!(f, "{}[{}]", base, offset),
            Dereference(inner) => write!(f, "{}", inner),
            Assign { location, value } => write!(f, "{} = {}", location, value),
            Call { callee, args } => {
                let args = args
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{}({})", callee, args)
            }
            Binary { op, lhs, rhs } => write!(f, "({} {} {})", lhs, op, rhs),
            Not(inner) => write!(f, "!{}", inner),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
    Equal,
    NotEqual,
    And,
    Or,
}
impl Display for BinOp {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        use BinOp::*;
        f.write_str(match self {
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            LessThan => "<",
            LessThanEqual => "<=",
            GreaterThan => ">",
            GreaterThanEqual => ">=",
            Equal => "==",
            NotEqual => "!=",
            And => "&&",
            Or => "||",
        })
    }
}

//! Shorthands for building typed ASTs in tests, standing in for the type checker.
use crate::builtins::Builtin;

use super::{typed::*, TypeSpec};

/// Hands out symbols with fresh identities. Ids below the builtin count are reserved for the
/// builtins.
pub struct Symbols {
    next_id: usize,
}
impl Symbols {
    pub fn new() -> Self {
        Self {
            next_id: Builtin::ALL.len(),
        }
    }

    pub fn symbol(&mut self, name: &str, ty: TypeSpec) -> Symbol {
        let id = self.next_id;
        self.next_id += 1;
        Symbol::new(id, name, ty)
    }

    pub fn int(&mut self, name: &str) -> Symbol {
        self.symbol(name, TypeSpec::Int)
    }

    pub fn boolean(&mut self, name: &str) -> Symbol {
        self.symbol(name, TypeSpec::Bool)
    }

    pub fn array(&mut self, name: &str, extent: u64) -> Symbol {
        self.symbol(name, TypeSpec::array(extent, TypeSpec::Int))
    }

    pub fn function(&mut self, name: &str, params: Vec<TypeSpec>, ret: TypeSpec) -> Symbol {
        self.symbol(name, TypeSpec::function(params, ret))
    }
}

pub fn int(value: i64) -> Expr {
    Expr::new(ExprKind::LiteralInt(value), TypeSpec::Int)
}

pub fn boolean(value: bool) -> Expr {
    Expr::new(ExprKind::LiteralBool(value), TypeSpec::Bool)
}

/// The location named by `sym`.
pub fn name(sym: &Symbol) -> Expr {
    Expr::new(
        ExprKind::Name(sym.clone()),
        TypeSpec::address_of(sym.ty.clone()),
    )
}

/// The value stored in `sym`.
pub fn read(sym: &Symbol) -> Expr {
    deref(name(sym), sym.ty.clone())
}

pub fn index(array: &Symbol, offset: Expr) -> Expr {
    Expr::new(
        ExprKind::ArrayAccess {
            base: array.clone(),
            offset: Box::new(offset),
        },
        TypeSpec::address_of(array.ty.element_type().clone()),
    )
}

pub fn read_index(array: &Symbol, offset: Expr) -> Expr {
    deref(index(array, offset), array.ty.element_type().clone())
}

fn deref(location: Expr, ty: TypeSpec) -> Expr {
    Expr::new(ExprKind::Dereference(Box::new(location)), ty)
}

pub fn assign(location: Expr, value: Expr) -> Expr {
    let ty = value.ty.clone();
    Expr::new(
        ExprKind::Assign {
            location: Box::new(location),
            value: Box::new(value),
        },
        ty,
    )
}

pub fn call(callee: &Symbol, args: Vec<Expr>) -> Expr {
    let ty = callee.ty.return_type().cloned().unwrap_or(TypeSpec::Void);
    Expr::new(
        ExprKind::Call {
            callee: callee.clone(),
            args,
        },
        ty,
    )
}

pub fn builtin(builtin: Builtin, args: Vec<Expr>) -> Expr {
    call(&builtin.symbol(), args)
}

pub fn bin(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
    let ty = match op {
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div => TypeSpec::Int,
        _ => TypeSpec::Bool,
    };
    Expr::new(
        ExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
        ty,
    )
}

pub fn not(operand: Expr) -> Expr {
    Expr::new(ExprKind::Not(Box::new(operand)), TypeSpec::Bool)
}

/// `sym = value;`
pub fn set(sym: &Symbol, value: Expr) -> Statement {
    Statement::Expression(assign(name(sym), value))
}

pub fn eval(expr: Expr) -> Statement {
    Statement::Expression(expr)
}

pub fn if_else(condition: Expr, then_block: Vec<Statement>, else_block: Vec<Statement>) -> Statement {
    Statement::If {
        condition,
        then_block,
        else_block,
    }
}

pub fn ret(value: Expr) -> Statement {
    Statement::Return(Some(value))
}

pub fn func(symbol: &Symbol, params: Vec<Symbol>, body: Vec<Statement>) -> Declaration {
    Declaration::Function(FuncDef {
        symbol: symbol.clone(),
        params,
        body,
    })
}

pub fn program(declarations: Vec<Declaration>) -> Program {
    Program { declarations }
}

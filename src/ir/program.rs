use std::fmt::{self, Display, Formatter};

use crate::ast::typed::Symbol;

use super::{ConstantTable, Function};

/// Storage for a global scalar (`count == 1`) or array, zero-initialised at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalDecl {
    pub symbol: Symbol,
    pub count: u64,
}

/// The root of the IR: every function, global and constant of a compiled program.
#[derive(Debug, Default)]
pub struct Program {
    pub functions: Vec<Function>,
    pub globals: Vec<GlobalDecl>,
    pub constants: ConstantTable,
}
impl Program {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn add_global(&mut self, symbol: Symbol, count: u64) {
        self.globals.push(GlobalDecl { symbol, count });
    }

    pub fn is_global(&self, symbol: &Symbol) -> bool {
        self.globals.iter().any(|g| g.symbol.id == symbol.id)
    }
}
impl Display for Program {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        for global in &self.globals {
            writeln!(f, "global {}[{}]", global.symbol, global.count)?;
        }
        for function in &self.functions {
            write!(f, "{}", function.listing(&self.constants))?;
        }
        Ok(())
    }
}

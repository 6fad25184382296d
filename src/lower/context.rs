use std::collections::HashMap;

use crate::{
    ast::typed::{Symbol, SymbolId},
    ir::{Function, InstrId, InstrKind, LocalVar},
    prelude::*,
};

/// A straight-line run of instructions connected by fallthrough edges. Either both ends are
/// present, or the chain is empty.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Chain {
    pub start: Option<InstrId>,
    pub end: Option<InstrId>,
}
impl Chain {
    pub fn empty() -> Self {
        Default::default()
    }

    pub fn single(id: InstrId) -> Self {
        Self {
            start: Some(id),
            end: Some(id),
        }
    }

    /// Append `other` to this chain.
    pub fn then(self, function: &mut Function, other: Chain) -> Chain {
        match (self.end, other.start) {
            (Some(end), Some(start)) => {
                function.connect(end, start);
                Chain {
                    start: self.start,
                    end: other.end,
                }
            }
            (None, _) => other,
            (Some(_), None) => self,
        }
    }

    /// Add a new instruction to the function and append it to this chain.
    pub fn push(self, function: &mut Function, kind: InstrKind) -> (Chain, InstrId) {
        let id = function.push(kind);
        (self.then(function, Chain::single(id)), id)
    }
}

/// A lowered statement: a graph fragment with a single entry. `exit` is the single point where
/// control falls out of the fragment, or `None` if it never does (it returns, breaks or
/// continues on every path).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fragment {
    pub entry: InstrId,
    pub exit: Option<InstrId>,
}
impl Fragment {
    /// A fragment that runs `chain` and falls out at its end. Empty chains have no fragment.
    pub fn from_chain(chain: Chain) -> Option<Fragment> {
        chain.start.map(|entry| Fragment {
            entry,
            exit: chain.end,
        })
    }
}

/// Jump targets of an enclosing loop.
#[derive(Debug, Clone, Copy)]
pub struct LoopTargets {
    /// Target of `continue`, and of the back-edge.
    pub header: InstrId,
    /// Target of `break`. Only created once a `break` needs it.
    pub exit: Option<InstrId>,
}

/// Everything lowering needs to know about the function currently being lowered. Passed
/// explicitly through every lowering call.
pub struct FunctionContext {
    pub function: Function,
    locals: HashMap<SymbolId, LocalVar>,
    loops: Vec<LoopTargets>,
}
impl FunctionContext {
    pub fn new(symbol: Symbol) -> Self {
        Self {
            function: Function::new(symbol),
            locals: HashMap::new(),
            loops: vec![],
        }
    }

    pub fn declare_param(&mut self, symbol: &Symbol) -> LocalVar {
        let var = self.function.add_param(symbol.ty.clone(), &symbol.name);
        self.locals.insert(symbol.id, var);
        var
    }

    pub fn declare_local(&mut self, symbol: &Symbol) -> LocalVar {
        let var = self.function.new_named(symbol.ty.clone(), &symbol.name);
        trace!("Declare local {} as {}", symbol, self.function.names().name_of(var));
        self.locals.insert(symbol.id, var);
        var
    }

    pub fn local(&self, symbol: &Symbol) -> Option<LocalVar> {
        self.locals.get(&symbol.id).copied()
    }

    pub fn enter_loop(&mut self, header: InstrId) {
        self.loops.push(LoopTargets { header, exit: None });
    }

    pub fn exit_loop(&mut self) -> Option<LoopTargets> {
        self.loops.pop()
    }

    /// The instruction following the innermost loop.
    pub fn break_target(&mut self) -> Result<InstrId, InternalError> {
        let targets = self
            .loops
            .last_mut()
            .ok_or(InternalError::OutsideLoop("break"))?;
        Ok(match targets.exit {
            Some(exit) => exit,
            None => {
                let exit = self.function.push(InstrKind::Nop);
                targets.exit = Some(exit);
                exit
            }
        })
    }

    /// The header of the innermost loop.
    pub fn continue_target(&self) -> Result<InstrId, InternalError> {
        self.loops
            .last()
            .map(|targets| targets.header)
            .ok_or(InternalError::OutsideLoop("continue"))
    }

    pub fn into_function(self) -> Function {
        self.function
    }
}

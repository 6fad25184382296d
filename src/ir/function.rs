use std::{
    collections::HashSet,
    fmt::{self, Display, Formatter},
};

use crate::{ast::typed::Symbol, ast::TypeSpec, error::InternalError};

use super::{
    AddressVar, ConstantTable, InstrId, InstrKind, Instruction, LocalVar, NameGenerator, Variable,
};

/// A function in IR form. The function owns the arena holding its instruction graph, its
/// parameters and the allocator for its temporaries.
#[derive(Debug)]
pub struct Function {
    pub symbol: Symbol,
    params: Vec<LocalVar>,
    entry: Option<InstrId>,
    instructions: Vec<Instruction>,
    names: NameGenerator,
}
impl Function {
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            params: vec![],
            entry: None,
            instructions: vec![],
            names: NameGenerator::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.symbol.name
    }

    /// Add an instruction to the arena. It is not connected to anything yet.
    pub fn push(&mut self, kind: InstrKind) -> InstrId {
        self.instructions.push(Instruction::new(kind));
        InstrId(self.instructions.len() - 1)
    }

    /// Set the fallthrough successor of `from`.
    pub fn connect(&mut self, from: InstrId, to: InstrId) {
        self.instructions[from.0].next[0] = Some(to);
    }

    /// Set both successors of a conditional jump.
    pub fn branch(
        &mut self,
        jump: InstrId,
        taken: InstrId,
        fallthrough: InstrId,
    ) -> Result<(), InternalError> {
        let instr = &mut self.instructions[jump.0];
        if !instr.kind.is_conditional() {
            return Err(InternalError::NotABranch(jump));
        }
        instr.next = [Some(fallthrough), Some(taken)];
        Ok(())
    }

    pub fn instr(&self, id: InstrId) -> &Instruction {
        &self.instructions[id.0]
    }

    pub fn get(&self, id: InstrId) -> Option<&Instruction> {
        self.instructions.get(id.0)
    }

    pub fn entry(&self) -> Option<InstrId> {
        self.entry
    }

    pub fn set_entry(&mut self, entry: Option<InstrId>) {
        self.entry = entry;
    }

    pub fn params(&self) -> &[LocalVar] {
        &self.params
    }

    pub fn add_param(&mut self, ty: TypeSpec, name: &str) -> LocalVar {
        let var = self.names.next_named(ty, name);
        self.params.push(var);
        var
    }

    pub fn new_temp(&mut self, ty: TypeSpec) -> LocalVar {
        self.names.next_temp(ty)
    }

    pub fn new_named(&mut self, ty: TypeSpec, name: &str) -> LocalVar {
        self.names.next_named(ty, name)
    }

    pub fn new_address(&mut self, ty: TypeSpec) -> AddressVar {
        self.names.next_address(ty)
    }

    pub fn names(&self) -> &NameGenerator {
        &self.names
    }

    /// Number of instructions in the arena, reachable or not.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// All instructions reachable from the entry, in depth-first preorder with fallthrough
    /// edges explored first.
    pub fn reachable(&self) -> Vec<InstrId> {
        let mut order = vec![];
        let mut seen = vec![false; self.instructions.len()];
        let mut pending: Vec<InstrId> = self.entry.into_iter().collect();

        while let Some(id) = pending.pop() {
            match seen.get_mut(id.0) {
                Some(seen) if !*seen => *seen = true,
                _ => continue,
            }
            order.push(id);
            let instr = &self.instructions[id.0];
            pending.extend(instr.next[1]);
            pending.extend(instr.next[0]);
        }
        order
    }

    /// Check the invariants of the graph: the entry exists, edges point into the arena, exactly
    /// the conditional jumps have a taken-branch successor and branch on a boolean, and every
    /// temporary is written on every path to each instruction reading it.
    pub fn verify(&self) -> Result<(), InternalError> {
        if let Some(entry) = self.entry {
            if self.get(entry).is_none() {
                return Err(InternalError::InvalidEntry(self.name().to_string()));
            }
        }
        for (idx, instr) in self.instructions.iter().enumerate() {
            let id = InstrId(idx);
            for (_, next) in instr.successors() {
                if self.get(next).is_none() {
                    return Err(InternalError::DanglingEdge(next, self.name().to_string()));
                }
            }
            match (instr.kind.is_conditional(), instr.next[1]) {
                (true, None) => return Err(InternalError::MissingBranchTarget(id)),
                (false, Some(_)) => return Err(InternalError::UnexpectedBranchTarget(id)),
                _ => (),
            }
            if let InstrKind::Jump { condition } = &instr.kind {
                if *self.names.type_of(*condition) != TypeSpec::Bool {
                    return Err(InternalError::NonBooleanCondition(id));
                }
            }
        }
        self.verify_definitions()
    }

    /// Forward must-analysis: the set of temporaries written on every path from the entry to
    /// each instruction. Sets only shrink, so the worklist terminates.
    fn verify_definitions(&self) -> Result<(), InternalError> {
        let Some(entry) = self.entry else {
            return Ok(());
        };

        let mut defined: Vec<Option<HashSet<Variable>>> = vec![None; self.instructions.len()];
        defined[entry.0] = Some(self.params.iter().copied().map(Variable::from).collect());
        let mut pending = vec![entry];

        while let Some(id) = pending.pop() {
            let instr = &self.instructions[id.0];
            let mut out = defined[id.0].clone().unwrap_or_default();
            out.extend(instr.kind.write());

            for (_, next) in instr.successors() {
                let changed = match &mut defined[next.0] {
                    Some(known) => {
                        let before = known.len();
                        known.retain(|var| out.contains(var));
                        known.len() != before
                    }
                    unseen @ None => {
                        *unseen = Some(out.clone());
                        true
                    }
                };
                if changed {
                    pending.push(next);
                }
            }
        }

        for id in self.reachable() {
            let Some(known) = &defined[id.0] else {
                continue;
            };
            for var in self.instructions[id.0].kind.reads() {
                if !known.contains(&var) {
                    let name = self.names.name_of(var).to_string();
                    return Err(InternalError::UseBeforeDefinition(name, id));
                }
            }
        }
        Ok(())
    }

    /// A displayable listing of this function.
    pub fn listing<'a>(&'a self, constants: &'a ConstantTable) -> FunctionListing<'a> {
        FunctionListing {
            function: self,
            constants,
        }
    }
}

pub struct FunctionListing<'a> {
    function: &'a Function,
    constants: &'a ConstantTable,
}
impl Display for FunctionListing<'_> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let function = self.function;
        let params = function
            .params
            .iter()
            .map(|p| function.names.name_of(*p))
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(f, "function {}({})", function.name(), params)?;

        for id in function.reachable() {
            let instr = function.instr(id);
            write!(f, "    {:>4}: ", id.to_string())?;
            instr.kind.fmt_with(f, &function.names, self.constants)?;
            match (instr.next[0], instr.next[1]) {
                (Some(next), None) => write!(f, " -> {}", next)?,
                (Some(next), Some(taken)) => write!(f, " -> {} | true -> {}", next, taken)?,
                (None, Some(taken)) => write!(f, " | true -> {}", taken)?,
                (None, None) => (),
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

use std::marker::PhantomData;

use crate::{
    ast::SCALAR_WIDTH,
    ir::{ArithOp, ConstantTable, Function, InstrId, InstrKind, LocalVar, Value, Variable},
    prelude::*,
};

use super::{
    assembly::*,
    calling_convention::CallingConvention,
    labels::{LabelGenerator, Labels},
    slots::SlotMap,
    stack_convention::StackConvention,
    x86::*,
};

use Op::*;
use Operand::*;
use Register::*;

/// Linearizes the instruction graph of a single function into a procedure.
pub struct ProcedureCompiler<'a, C: StackConvention> {
    function: &'a Function,
    constants: &'a ConstantTable,
    labels: Labels,
    slots: SlotMap,
    procedure: Procedure,
    calling_convention: CallingConvention,
    max_overflow_args: usize,
    _phantom: PhantomData<*const C>,
}
impl<'a, C: StackConvention> ProcedureCompiler<'a, C> {
    /// Compile the given function into a procedure of the same name.
    pub fn compile(
        function: &'a Function,
        constants: &'a ConstantTable,
        label_generator: &mut LabelGenerator,
        calling_convention: CallingConvention,
    ) -> Result<Procedure, InternalError> {
        debug!("Generating code for {}", function.name());
        function.verify()?;

        let labels = Labels::assign(function, label_generator);
        let mut compiler = Self::new(function, constants, labels, calling_convention);
        compiler.compile_params();
        compiler.compile_graph()?;

        let frame_size = compiler.frame_size();
        debug!(
            "{} uses {} slots and {} overflow arguments: {} byte frame",
            function.name(),
            compiler.slots.count(),
            compiler.max_overflow_args,
            frame_size
        );
        compiler.procedure.prologue = C::prologue(frame_size);
        Ok(compiler.procedure)
    }

    fn new(
        function: &'a Function,
        constants: &'a ConstantTable,
        labels: Labels,
        calling_convention: CallingConvention,
    ) -> Self {
        Self {
            function,
            constants,
            labels,
            slots: SlotMap::new(),
            procedure: Procedure::new(function.name()),
            calling_convention,
            max_overflow_args: 0,
            _phantom: Default::default(),
        }
    }

    /// Move every parameter from where the caller put it into its own slot.
    fn compile_params(&mut self) {
        let function = self.function;
        for (idx, param) in function.params().iter().enumerate() {
            let slot = self.slots.assign(*param);
            let comment = format!("parameter {}", function.names().name_of(*param));
            match self.calling_convention.incoming_param(idx) {
                reg @ Reg(_) => {
                    self.emit_cmt(Movq, [reg, slot], comment);
                }
                mem => {
                    self.emit_cmt(Movq, [mem, Reg(R10)], comment)
                        .emit(Movq, [Reg(R10), slot]);
                }
            }
        }
    }

    /// Emit the instruction graph in a single depth-first walk. The fallthrough successor is
    /// visited right after its predecessor whenever it has not been emitted yet, so it needs
    /// no jump. Unlabelled no-ops emit nothing.
    fn compile_graph(&mut self) -> Result<(), InternalError> {
        let function = self.function;
        let Some(entry) = function.entry() else {
            trace!("{} has an empty body", function.name());
            C::add_epilogue(&mut self.procedure.body);
            return Ok(());
        };

        let mut visited = vec![false; function.len()];
        let mut pending = vec![entry];

        while let Some(id) = pending.pop() {
            if std::mem::replace(&mut visited[id.index()], true) {
                continue;
            }
            if let Some(label) = self.labels.get(id) {
                self.procedure.body.push_label(label);
            }

            self.compile_instr(id)?;

            let instr = function.instr(id);
            if let Some(taken) = instr.next(1) {
                pending.push(taken);
            }
            match instr.next(0) {
                Some(next) if !visited[next.index()] => pending.push(next),
                Some(next) => {
                    let label = self.label_of(next)?;
                    self.emit(Jmp, [Lbl(label)]);
                }
                None if instr.kind.is_return() => (),
                None => C::add_epilogue(&mut self.procedure.body),
            }
        }
        Ok(())
    }

    /// Compile a single IR instruction. Its expansion is annotated with the instruction itself.
    fn compile_instr(&mut self, id: InstrId) -> Result<(), InternalError> {
        let function = self.function;
        let instr = function.instr(id);
        let kind = &instr.kind;
        let comment = kind.display(function.names(), self.constants).to_string();

        // Operands are checked before the destination gets its slot, so a temporary can never
        // satisfy its own read.
        for var in kind.reads() {
            self.slot(var)?;
        }
        if let Some(var) = kind.write() {
            self.slots.assign(var);
        }

        match kind {
            InstrKind::Nop => (),
            InstrKind::Copy { dst, src } => self.compile_copy(*dst, *src, comment)?,
            InstrKind::Binary { op, dst, lhs, rhs } => {
                let (lhs, rhs) = (self.slot(*lhs)?, self.slot(*rhs)?);
                let dst = self.slot(*dst)?;

                self.emit_cmt(Movq, [lhs, Reg(Rax)], comment);
                match op {
                    ArithOp::Add => self.emit(Addq, [rhs, Reg(Rax)]),
                    ArithOp::Sub => self.emit(Subq, [rhs, Reg(Rax)]),
                    ArithOp::Mul => self.emit(Imulq, [rhs, Reg(Rax)]),
                    // The dividend is sign-extended into RDX:RAX; the quotient ends up in RAX.
                    ArithOp::Div => self.emit(Cqto, []).emit(Idivq, [rhs]),
                };
                self.emit(Movq, [Reg(Rax), dst]);
            }
            InstrKind::Compare {
                predicate,
                dst,
                lhs,
                rhs,
            } => {
                let (lhs, rhs) = (self.slot(*lhs)?, self.slot(*rhs)?);
                let dst = self.slot(*dst)?;

                self.emit_cmt(Movq, [Imm(0), Reg(R10)], comment)
                    .emit(Movq, [Imm(1), Reg(Rax)])
                    .emit(Movq, [lhs, Reg(R11)])
                    .emit(Cmpq, [rhs, Reg(R11)])
                    .emit(Cmov(*predicate), [Reg(Rax), Reg(R10)])
                    .emit(Movq, [Reg(R10), dst]);
            }
            InstrKind::Not { dst, operand } => {
                let operand = self.slot(*operand)?;
                let dst = self.slot(*dst)?;

                self.emit_cmt(Movq, [Imm(1), Reg(R10)], comment)
                    .emit(Subq, [operand, Reg(R10)])
                    .emit(Movq, [Reg(R10), dst]);
            }
            InstrKind::AddressAt { dst, base, offset } => {
                let offset = offset.map(|offset| self.slot(offset)).transpose()?;
                let dst = self.slot(*dst)?;

                self.emit_cmt(Movq, [GotPcRel(base.name.clone()), Reg(R10)], comment);
                if let Some(offset) = offset {
                    self.emit(Movq, [offset, Reg(R11)])
                        .emit(Imulq, [Imm(SCALAR_WIDTH), Reg(R11)])
                        .emit(Addq, [Reg(R11), Reg(R10)]);
                }
                self.emit(Movq, [Reg(R10), dst]);
            }
            InstrKind::Load { dst, src } => {
                let src = self.slot(*src)?;
                let dst = self.slot(*dst)?;

                self.emit_cmt(Movq, [src, Reg(R10)], comment)
                    .emit(Movq, [Mem(R10, 0), Reg(R10)])
                    .emit(Movq, [Reg(R10), dst]);
            }
            InstrKind::Store { src, dst } => {
                let (src, dst) = (self.slot(*src)?, self.slot(*dst)?);

                self.emit_cmt(Movq, [dst, Reg(R10)], comment)
                    .emit(Movq, [src, Reg(R11)])
                    .emit(Movq, [Reg(R11), Mem(R10, 0)]);
            }
            InstrKind::Jump { condition } => {
                let condition = self.slot(*condition)?;
                let taken = instr
                    .next(1)
                    .ok_or(InternalError::MissingBranchTarget(id))?;
                let label = self.label_of(taken)?;

                self.emit_cmt(Cmpq, [Imm(1), condition], comment)
                    .emit(Je, [Lbl(label)]);
            }
            InstrKind::Call { dst, callee, args } => {
                self.compile_call(*dst, &callee.name, args, comment)?
            }
            InstrKind::Return(value) => {
                match value {
                    Some(value) => {
                        let value = self.slot(*value)?;
                        let ret_reg = self.calling_convention.get_return_reg();
                        self.emit_cmt(Movq, [value, Reg(ret_reg)], comment);
                    }
                    None => {
                        self.procedure.body.push_cmt_only(comment);
                    }
                }
                C::add_epilogue(&mut self.procedure.body);
            }
        }
        Ok(())
    }

    fn compile_copy(
        &mut self,
        dst: LocalVar,
        src: Value,
        comment: String,
    ) -> Result<(), InternalError> {
        let src = match src {
            Value::Const(constant) => Imm(self.constants[constant].encode()),
            Value::Local(var) => self.slot(var)?,
        };
        let dst = self.slot(dst)?;

        self.emit_cmt(Movq, [src, Reg(R10)], comment)
            .emit(Movq, [Reg(R10), dst]);
        Ok(())
    }

    /// Compile a call. Arguments are read straight from their slots into the argument registers;
    /// those that do not fit are written to the bottom of the frame.
    fn compile_call(
        &mut self,
        dst: Option<LocalVar>,
        callee: &str,
        args: &[LocalVar],
        comment: String,
    ) -> Result<(), InternalError> {
        let args = args
            .iter()
            .map(|arg| self.slot(*arg))
            .collect::<Result<Vec<_>, _>>()?;
        let overflow = self.calling_convention.overflow_count(args.len());
        self.max_overflow_args = self.max_overflow_args.max(overflow);

        let mut comment = Some(comment);
        for (idx, arg) in args.into_iter().enumerate() {
            match self.calling_convention.outgoing_arg(idx) {
                reg @ Reg(_) => {
                    self.emit_opt_cmt(Movq, [arg, reg], comment.take());
                }
                mem => {
                    self.emit_opt_cmt(Movq, [arg, Reg(R10)], comment.take())
                        .emit(Movq, [Reg(R10), mem]);
                }
            }
        }
        self.emit_opt_cmt(Call, [Sym(callee.to_string())], comment.take());

        if let Some(dst) = dst {
            let dst = self.slot(dst)?;
            let ret_reg = self.calling_convention.get_return_reg();
            self.emit(Movq, [Reg(ret_reg), dst]);
        }
        Ok(())
    }

    /// Frame size in bytes: every slot plus the outgoing overflow arguments, rounded up so the
    /// stack stays aligned at call instructions.
    fn frame_size(&self) -> i64 {
        let bytes = (self.slots.count() + self.max_overflow_args) as i64 * SCALAR_WIDTH;
        let alignment = self.calling_convention.stack_alignment();
        (bytes + alignment - 1) / alignment * alignment
    }

    /// The slot of a temporary that is about to be read.
    fn slot<V: Into<Variable> + Copy>(&self, var: V) -> Result<Operand, InternalError> {
        self.slots.lookup(var).ok_or_else(|| {
            InternalError::MissingSlot(self.function.names().name_of(var).to_string())
        })
    }

    fn label_of(&self, id: InstrId) -> Result<Label, InternalError> {
        self.labels
            .get(id)
            .cloned()
            .ok_or(InternalError::MissingLabel(id))
    }

    /// Emit an operation.
    fn emit<V: Into<Vec<Operand>>>(&mut self, op: Op, operands: V) -> &mut Self {
        self.procedure.body.push(op, operands);
        self
    }

    /// Emit an operation with comment.
    fn emit_cmt<V: Into<Vec<Operand>>, S: Into<String>>(
        &mut self,
        op: Op,
        operands: V,
        comment: S,
    ) -> &mut Self {
        self.procedure.body.push_cmt(op, operands, comment);
        self
    }

    fn emit_opt_cmt<V: Into<Vec<Operand>>>(
        &mut self,
        op: Op,
        operands: V,
        comment: Option<String>,
    ) -> &mut Self {
        match comment {
            Some(comment) => self.emit_cmt(op, operands, comment),
            None => self.emit(op, operands),
        }
    }
}

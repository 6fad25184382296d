use crate::{
    ast::{typed::*, TypeSpec},
    ir::{self, AddressVar, ArithOp, Function, InstrId, InstrKind, LocalVar, Predicate, Value},
    prelude::*,
};

use super::context::{Chain, Fragment, FunctionContext};

/// Lower a typed program into its IR form.
pub fn lower(program: &Program) -> Result<ir::Program, InternalError> {
    IrGenerator::generate(program)
}

/// Lower a single function of `program`. Globals the function refers to must already be
/// declared in `program`.
pub fn lower_function(
    program: &mut ir::Program,
    func_def: &FuncDef,
) -> Result<Function, InternalError> {
    IrGenerator::lower_function(program, func_def)
}

/// What an expression evaluates to.
#[derive(Debug, Clone)]
enum Operand {
    /// A scalar held in a temporary.
    Scalar(LocalVar),
    /// A global scalar, whose address has not been taken yet.
    Global(Symbol),
    /// An address computed by an earlier instruction.
    Address(AddressVar),
    /// Nothing, e.g. the result of calling a void function.
    Void,
}

/// The instructions an expression lowers to, and the value it produces.
struct Lowered {
    chain: Chain,
    value: Operand,
}
impl Lowered {
    fn new(chain: Chain, value: Operand) -> Self {
        Self { chain, value }
    }
}

struct IrGenerator;
impl IrGenerator {
    fn generate(program: &Program) -> Result<ir::Program, InternalError> {
        let mut ir = ir::Program::new();

        // Globals are registered up front so that functions can refer to them regardless of
        // declaration order.
        for declaration in &program.declarations {
            match declaration {
                Declaration::Variable(symbol) => ir.add_global(symbol.clone(), 1),
                Declaration::Array(symbol) => {
                    ir.add_global(symbol.clone(), symbol.ty.element_count())
                }
                Declaration::Function(_) => (),
            }
        }

        for declaration in &program.declarations {
            if let Declaration::Function(func_def) = declaration {
                let function = Self::lower_function(&mut ir, func_def)?;
                ir.functions.push(function);
            }
        }

        info!(
            "Lowered {} functions, {} globals and {} constants",
            ir.functions.len(),
            ir.globals.len(),
            ir.constants.len()
        );
        Ok(ir)
    }

    fn lower_function(
        program: &mut ir::Program,
        func_def: &FuncDef,
    ) -> Result<Function, InternalError> {
        debug!("Lowering function {}", func_def.symbol);
        let mut cx = FunctionContext::new(func_def.symbol.clone());
        for param in &func_def.params {
            cx.declare_param(param);
        }

        let body = Self::lower_block(program, &mut cx, &func_def.body)?;
        match body {
            Some(Fragment { exit: Some(_), .. }) => {
                trace!("{} may fall off the end of its body", func_def.symbol)
            }
            None => trace!("{} has an empty body", func_def.symbol),
            _ => (),
        }
        cx.function.set_entry(body.map(|fragment| fragment.entry));

        let function = cx.into_function();
        function.verify()?;
        debug!(
            "Lowered {} into {} instructions",
            func_def.symbol,
            function.len()
        );
        Ok(function)
    }

    /// Lower a block of statements, chaining them in source order. Statements following one
    /// that never falls through are unreachable and are not lowered.
    fn lower_block(
        program: &mut ir::Program,
        cx: &mut FunctionContext,
        statements: &[Statement],
    ) -> Result<Option<Fragment>, InternalError> {
        let mut block: Option<Fragment> = None;

        for (idx, statement) in statements.iter().enumerate() {
            let exit = match block {
                Some(Fragment { exit: None, .. }) => {
                    debug!(
                        "Skipping {} unreachable statement(s)",
                        statements.len() - idx
                    );
                    break;
                }
                Some(Fragment { exit, .. }) => exit,
                None => None,
            };

            let Some(fragment) = Self::lower_stmt(program, cx, statement)? else {
                continue;
            };

            block = Some(match (block, exit) {
                (Some(prev), Some(exit)) => {
                    cx.function.connect(exit, fragment.entry);
                    Fragment {
                        entry: prev.entry,
                        exit: fragment.exit,
                    }
                }
                _ => fragment,
            });
        }

        Ok(block)
    }

    /// Lower a statement into a fragment. Declarations produce no instructions.
    fn lower_stmt(
        program: &mut ir::Program,
        cx: &mut FunctionContext,
        statement: &Statement,
    ) -> Result<Option<Fragment>, InternalError> {
        match statement {
            Statement::VarDecl(symbol) => {
                cx.declare_local(symbol);
                Ok(None)
            }
            Statement::Expression(expr) => {
                let lowered = Self::lower_expr(program, cx, expr)?;
                Ok(Fragment::from_chain(lowered.chain))
            }
            Statement::If {
                condition,
                then_block,
                else_block,
            } => Self::lower_if(program, cx, condition, then_block, else_block).map(Some),
            Statement::Loop(body) => Self::lower_loop(program, cx, body).map(Some),
            Statement::Break => {
                let target = cx.break_target()?;
                Ok(Some(Self::lower_jump_to(cx, target)))
            }
            Statement::Continue => {
                let target = cx.continue_target()?;
                Ok(Some(Self::lower_jump_to(cx, target)))
            }
            Statement::Return(value) => Self::lower_return(program, cx, value.as_ref()).map(Some),
        }
    }

    /// Lower an unconditional transfer of control to `target`. The placeholder never falls out
    /// of its fragment.
    fn lower_jump_to(cx: &mut FunctionContext, target: InstrId) -> Fragment {
        let nop = cx.function.push(InstrKind::Nop);
        cx.function.connect(nop, target);
        Fragment {
            entry: nop,
            exit: None,
        }
    }

    fn lower_return(
        program: &mut ir::Program,
        cx: &mut FunctionContext,
        value: Option<&Expr>,
    ) -> Result<Fragment, InternalError> {
        let (chain, value) = match value {
            Some(expr) => {
                let (chain, var) = Self::lower_scalar(program, cx, expr)?;
                (chain, Some(var))
            }
            None => (Chain::empty(), None),
        };
        let (chain, ret) = chain.push(&mut cx.function, InstrKind::Return(value));

        Ok(Fragment {
            entry: chain.start.unwrap_or(ret),
            exit: None,
        })
    }

    /// Lower an if-statement to a conditional jump whose taken edge enters the then-block and
    /// whose fallthrough edge enters the else-block. Both blocks continue at one shared merge
    /// point, which is only created if some path reaches it.
    fn lower_if(
        program: &mut ir::Program,
        cx: &mut FunctionContext,
        condition: &Expr,
        then_block: &[Statement],
        else_block: &[Statement],
    ) -> Result<Fragment, InternalError> {
        let (chain, cond) = Self::lower_scalar(program, cx, condition)?;
        let (chain, jump) = chain.push(&mut cx.function, InstrKind::Jump { condition: cond });

        let then_fragment = Self::lower_block(program, cx, then_block)?;
        let else_fragment = Self::lower_block(program, cx, else_block)?;

        let mut merge = None;
        let taken = match then_fragment {
            Some(fragment) => fragment.entry,
            None => Self::merge_point(&mut cx.function, &mut merge),
        };
        let fallthrough = match else_fragment {
            Some(fragment) => fragment.entry,
            None => Self::merge_point(&mut cx.function, &mut merge),
        };
        cx.function.branch(jump, taken, fallthrough)?;

        for exit in [then_fragment, else_fragment]
            .into_iter()
            .flatten()
            .filter_map(|fragment| fragment.exit)
        {
            let merge = Self::merge_point(&mut cx.function, &mut merge);
            cx.function.connect(exit, merge);
        }

        Ok(Fragment {
            entry: chain.start.unwrap_or(jump),
            exit: merge,
        })
    }

    fn merge_point(function: &mut Function, merge: &mut Option<InstrId>) -> InstrId {
        *merge.get_or_insert_with(|| function.push(InstrKind::Nop))
    }

    /// Lower an unconditional loop. The end of the body jumps back to the loop header; the loop
    /// is only left through `break` (or `return`).
    fn lower_loop(
        program: &mut ir::Program,
        cx: &mut FunctionContext,
        body: &[Statement],
    ) -> Result<Fragment, InternalError> {
        let header = cx.function.push(InstrKind::Nop);

        cx.enter_loop(header);
        let body = Self::lower_block(program, cx, body);
        let targets = cx.exit_loop();
        let body = body?;

        match body {
            Some(fragment) => {
                cx.function.connect(header, fragment.entry);
                if let Some(exit) = fragment.exit {
                    cx.function.connect(exit, header);
                }
            }
            None => cx.function.connect(header, header),
        }

        Ok(Fragment {
            entry: header,
            exit: targets.and_then(|targets| targets.exit),
        })
    }

    /// Lower an expression whose value must be a scalar.
    fn lower_scalar(
        program: &mut ir::Program,
        cx: &mut FunctionContext,
        expr: &Expr,
    ) -> Result<(Chain, LocalVar), InternalError> {
        let lowered = Self::lower_expr(program, cx, expr)?;
        match lowered.value {
            Operand::Scalar(var) => Ok((lowered.chain, var)),
            _ => Err(InternalError::MissingValue(expr.to_string())),
        }
    }

    fn lower_expr(
        program: &mut ir::Program,
        cx: &mut FunctionContext,
        expr: &Expr,
    ) -> Result<Lowered, InternalError> {
        match &expr.kind {
            ExprKind::LiteralInt(i) => {
                let constant = program.constants.int(*i);
                Ok(Self::lower_constant(cx, constant, TypeSpec::Int))
            }
            ExprKind::LiteralBool(b) => {
                let constant = program.constants.boolean(*b);
                Ok(Self::lower_constant(cx, constant, TypeSpec::Bool))
            }
            ExprKind::Name(symbol) => Self::lower_name(program, cx, symbol),
            ExprKind::ArrayAccess { base, offset } => {
                let (chain, offset) = Self::lower_scalar(program, cx, offset)?;
                let dst = cx.function.new_address(base.ty.element_type().clone());
                let (chain, _) = chain.push(
                    &mut cx.function,
                    InstrKind::AddressAt {
                        dst,
                        base: base.clone(),
                        offset: Some(offset),
                    },
                );
                Ok(Lowered::new(chain, Operand::Address(dst)))
            }
            ExprKind::Dereference(location) => {
                Self::lower_dereference(program, cx, location, &expr.ty)
            }
            ExprKind::Assign { location, value } => {
                Self::lower_assign(program, cx, location, value)
            }
            ExprKind::Call { callee, args } => Self::lower_call(program, cx, callee, args, &expr.ty),
            ExprKind::Binary { op, lhs, rhs } => {
                Self::lower_binary(program, cx, *op, lhs, rhs, &expr.ty)
            }
            ExprKind::Not(operand) => {
                let (chain, operand) = Self::lower_scalar(program, cx, operand)?;
                let dst = cx.function.new_temp(expr.ty.clone());
                let (chain, _) = chain.push(&mut cx.function, InstrKind::Not { dst, operand });
                Ok(Lowered::new(chain, Operand::Scalar(dst)))
            }
        }
    }

    fn lower_constant(cx: &mut FunctionContext, constant: ir::ConstId, ty: TypeSpec) -> Lowered {
        let dst = cx.function.new_temp(ty);
        let (chain, _) = Chain::empty().push(
            &mut cx.function,
            InstrKind::Copy {
                dst,
                src: Value::Const(constant),
            },
        );
        Lowered::new(chain, Operand::Scalar(dst))
    }

    /// Resolve a name. This emits no instructions: locals are already held in temporaries, and
    /// the address of a global is only computed by whoever reads or writes it.
    fn lower_name(
        program: &ir::Program,
        cx: &FunctionContext,
        symbol: &Symbol,
    ) -> Result<Lowered, InternalError> {
        let value = match cx.local(symbol) {
            Some(var) => Operand::Scalar(var),
            None if program.is_global(symbol) => Operand::Global(symbol.clone()),
            None => return Err(InternalError::UnknownSymbol(symbol.name.clone())),
        };
        Ok(Lowered::new(Chain::empty(), value))
    }

    /// Emit the instruction computing the address of a global scalar.
    fn address_of_global(
        cx: &mut FunctionContext,
        chain: Chain,
        symbol: &Symbol,
    ) -> (Chain, AddressVar) {
        let dst = cx.function.new_address(symbol.ty.clone());
        let (chain, _) = chain.push(
            &mut cx.function,
            InstrKind::AddressAt {
                dst,
                base: symbol.clone(),
                offset: None,
            },
        );
        (chain, dst)
    }

    /// Read the value at a location. Locals are copied, memory locations are loaded.
    fn lower_dereference(
        program: &mut ir::Program,
        cx: &mut FunctionContext,
        location: &Expr,
        ty: &TypeSpec,
    ) -> Result<Lowered, InternalError> {
        let lowered = Self::lower_expr(program, cx, location)?;
        let (chain, address) = match lowered.value {
            Operand::Scalar(var) => {
                let dst = cx.function.new_temp(ty.clone());
                let (chain, _) = lowered.chain.push(
                    &mut cx.function,
                    InstrKind::Copy {
                        dst,
                        src: Value::Local(var),
                    },
                );
                return Ok(Lowered::new(chain, Operand::Scalar(dst)));
            }
            Operand::Global(symbol) => Self::address_of_global(cx, lowered.chain, &symbol),
            Operand::Address(address) => (lowered.chain, address),
            Operand::Void => return Err(InternalError::NotALocation(location.to_string())),
        };

        let dst = cx.function.new_temp(ty.clone());
        let (chain, _) = chain.push(&mut cx.function, InstrKind::Load { dst, src: address });
        Ok(Lowered::new(chain, Operand::Scalar(dst)))
    }

    /// Lower an assignment. The right-hand side is evaluated first; the assignment evaluates to
    /// the assigned value.
    fn lower_assign(
        program: &mut ir::Program,
        cx: &mut FunctionContext,
        location: &Expr,
        value: &Expr,
    ) -> Result<Lowered, InternalError> {
        let (chain, src) = Self::lower_scalar(program, cx, value)?;
        let target = Self::lower_expr(program, cx, location)?;
        let chain = chain.then(&mut cx.function, target.chain);

        let (chain, address) = match target.value {
            Operand::Scalar(dst) => {
                let (chain, _) = chain.push(
                    &mut cx.function,
                    InstrKind::Copy {
                        dst,
                        src: Value::Local(src),
                    },
                );
                return Ok(Lowered::new(chain, Operand::Scalar(src)));
            }
            Operand::Global(symbol) => Self::address_of_global(cx, chain, &symbol),
            Operand::Address(address) => (chain, address),
            Operand::Void => return Err(InternalError::NotALocation(location.to_string())),
        };

        let (chain, _) = chain.push(&mut cx.function, InstrKind::Store { src, dst: address });
        Ok(Lowered::new(chain, Operand::Scalar(src)))
    }

    /// Lower a function call. Arguments are evaluated left to right.
    fn lower_call(
        program: &mut ir::Program,
        cx: &mut FunctionContext,
        callee: &Symbol,
        args: &[Expr],
        ty: &TypeSpec,
    ) -> Result<Lowered, InternalError> {
        let mut chain = Chain::empty();
        let mut arg_vars = Vec::with_capacity(args.len());
        for arg in args {
            let (arg_chain, var) = Self::lower_scalar(program, cx, arg)?;
            chain = chain.then(&mut cx.function, arg_chain);
            arg_vars.push(var);
        }

        let ret = callee.ty.return_type().unwrap_or(ty);
        let dst = match ret.is_void() {
            true => None,
            false => Some(cx.function.new_temp(ret.clone())),
        };
        let (chain, _) = chain.push(
            &mut cx.function,
            InstrKind::Call {
                dst,
                callee: callee.clone(),
                args: arg_vars,
            },
        );

        Ok(Lowered::new(
            chain,
            dst.map(Operand::Scalar).unwrap_or(Operand::Void),
        ))
    }

    /// Lower a binary expression. Logical operators are dispatched to
    /// [`Self::lower_short_circuit`].
    fn lower_binary(
        program: &mut ir::Program,
        cx: &mut FunctionContext,
        op: BinOp,
        lhs: &Expr,
        rhs: &Expr,
        ty: &TypeSpec,
    ) -> Result<Lowered, InternalError> {
        enum Kind {
            Arith(ArithOp),
            Compare(Predicate),
        }
        let kind = match op {
            BinOp::And | BinOp::Or => return Self::lower_short_circuit(program, cx, op, lhs, rhs),
            BinOp::Add => Kind::Arith(ArithOp::Add),
            BinOp::Sub => Kind::Arith(ArithOp::Sub),
            BinOp::Mul => Kind::Arith(ArithOp::Mul),
            BinOp::Div => Kind::Arith(ArithOp::Div),
            BinOp::LessThan => Kind::Compare(Predicate::Lt),
            BinOp::LessThanEqual => Kind::Compare(Predicate::Le),
            BinOp::GreaterThan => Kind::Compare(Predicate::Gt),
            BinOp::GreaterThanEqual => Kind::Compare(Predicate::Ge),
            BinOp::Equal => Kind::Compare(Predicate::Eq),
            BinOp::NotEqual => Kind::Compare(Predicate::Ne),
        };

        let (lhs_chain, lhs) = Self::lower_scalar(program, cx, lhs)?;
        let (rhs_chain, rhs) = Self::lower_scalar(program, cx, rhs)?;
        let chain = lhs_chain.then(&mut cx.function, rhs_chain);

        let dst = cx.function.new_temp(ty.clone());
        let instr = match kind {
            Kind::Arith(op) => InstrKind::Binary { op, dst, lhs, rhs },
            Kind::Compare(predicate) => InstrKind::Compare {
                predicate,
                dst,
                lhs,
                rhs,
            },
        };
        let (chain, _) = chain.push(&mut cx.function, instr);
        Ok(Lowered::new(chain, Operand::Scalar(dst)))
    }

    /// Lower `&&` and `||` so that the right operand is only evaluated when it decides the
    /// result. The left operand selects between evaluating the right operand and copying the
    /// short-circuit result; both paths write the same temporary and meet at one merge point.
    fn lower_short_circuit(
        program: &mut ir::Program,
        cx: &mut FunctionContext,
        op: BinOp,
        lhs: &Expr,
        rhs: &Expr,
    ) -> Result<Lowered, InternalError> {
        let short_circuit_result = op == BinOp::Or;
        let out = cx.function.new_temp(TypeSpec::Bool);

        let (chain, lhs) = Self::lower_scalar(program, cx, lhs)?;
        let (chain, jump) = chain.push(&mut cx.function, InstrKind::Jump { condition: lhs });
        let merge = cx.function.push(InstrKind::Nop);

        let (rhs_chain, rhs) = Self::lower_scalar(program, cx, rhs)?;
        let (rhs_chain, rhs_copy) = rhs_chain.push(
            &mut cx.function,
            InstrKind::Copy {
                dst: out,
                src: Value::Local(rhs),
            },
        );
        cx.function.connect(rhs_copy, merge);

        let constant = program.constants.boolean(short_circuit_result);
        let short_copy = cx.function.push(InstrKind::Copy {
            dst: out,
            src: Value::Const(constant),
        });
        cx.function.connect(short_copy, merge);

        let evaluate_rhs = rhs_chain.start.unwrap_or(rhs_copy);
        match op {
            BinOp::Or => cx.function.branch(jump, short_copy, evaluate_rhs)?,
            _ => cx.function.branch(jump, evaluate_rhs, short_copy)?,
        }

        Ok(Lowered::new(
            Chain {
                start: chain.start,
                end: Some(merge),
            },
            Operand::Scalar(out),
        ))
    }
}

//! Executes lowered programs directly, so tests can observe runtime behaviour without an
//! assembler.
use std::collections::{HashMap, VecDeque};

use crate::{
    ast::typed::{Symbol, SymbolId},
    builtins::Builtin,
};

use super::{AddressVar, ArithOp, Function, InstrKind, LocalVar, Program, Value};

/// Upper bound on executed instructions, so a runaway loop fails the test instead of hanging it.
const FUEL: usize = 100_000;

pub struct Interpreter<'p> {
    program: &'p Program,
    memory: HashMap<SymbolId, Vec<i64>>,
    input: VecDeque<i64>,
    output: String,
    calls: HashMap<String, usize>,
    fuel: usize,
}

#[derive(Default)]
struct Frame {
    scalars: HashMap<LocalVar, i64>,
    addresses: HashMap<AddressVar, (SymbolId, i64)>,
}

impl<'p> Interpreter<'p> {
    pub fn new(program: &'p Program) -> Self {
        let memory = program
            .globals
            .iter()
            .map(|g| (g.symbol.id, vec![0; g.count as usize]))
            .collect();
        Self {
            program,
            memory,
            input: VecDeque::new(),
            output: String::new(),
            calls: HashMap::new(),
            fuel: FUEL,
        }
    }

    /// Values handed out by `readInt` and `readChar`, in order.
    pub fn with_input<I: IntoIterator<Item = i64>>(mut self, input: I) -> Self {
        self.input.extend(input);
        self
    }

    /// Call the function named `name`, returning its result if it produces one.
    pub fn call(&mut self, name: &str, args: &[i64]) -> Result<Option<i64>, String> {
        let function = self
            .function(name)
            .ok_or_else(|| format!("no function named {}", name))?;
        self.run(function, args)
    }

    fn function(&self, name: &str) -> Option<&'p Function> {
        self.program.functions.iter().find(|f| f.name() == name)
    }

    /// Everything written by the print builtins so far.
    pub fn output(&self) -> &str {
        &self.output
    }

    /// How often a call instruction targeting `name` was executed.
    pub fn call_count(&self, name: &str) -> usize {
        self.calls.get(name).copied().unwrap_or(0)
    }

    pub fn global(&self, name: &str) -> Option<&[i64]> {
        let global = self.program.globals.iter().find(|g| g.symbol.name == name)?;
        self.memory.get(&global.symbol.id).map(Vec::as_slice)
    }

    fn run(&mut self, function: &'p Function, args: &[i64]) -> Result<Option<i64>, String> {
        if function.params().len() != args.len() {
            return Err(format!(
                "{} expects {} arguments, got {}",
                function.name(),
                function.params().len(),
                args.len()
            ));
        }
        let mut frame = Frame::default();
        frame
            .scalars
            .extend(function.params().iter().copied().zip(args.iter().copied()));

        let mut current = function.entry();
        while let Some(id) = current {
            self.fuel = self.fuel.checked_sub(1).ok_or("out of fuel")?;
            let instr = function.instr(id);
            let read = |frame: &Frame, var: &LocalVar| {
                frame.scalars.get(var).copied().ok_or_else(|| {
                    format!("{} read before written", function.names().name_of(*var))
                })
            };

            let mut next = instr.next(0);
            match &instr.kind {
                InstrKind::Nop => (),
                InstrKind::Copy { dst, src } => {
                    let value = match src {
                        Value::Const(c) => self.program.constants[*c].encode(),
                        Value::Local(var) => read(&frame, var)?,
                    };
                    frame.scalars.insert(*dst, value);
                }
                InstrKind::Binary { op, dst, lhs, rhs } => {
                    let (lhs, rhs) = (read(&frame, lhs)?, read(&frame, rhs)?);
                    let value = match op {
                        ArithOp::Add => lhs.wrapping_add(rhs),
                        ArithOp::Sub => lhs.wrapping_sub(rhs),
                        ArithOp::Mul => lhs.wrapping_mul(rhs),
                        ArithOp::Div => lhs.checked_div(rhs).ok_or("division by zero")?,
                    };
                    frame.scalars.insert(*dst, value);
                }
                InstrKind::Compare {
                    predicate,
                    dst,
                    lhs,
                    rhs,
                } => {
                    let value = predicate.holds(read(&frame, lhs)?, read(&frame, rhs)?);
                    frame.scalars.insert(*dst, value as i64);
                }
                InstrKind::Not { dst, operand } => {
                    let value = 1 - read(&frame, operand)?;
                    frame.scalars.insert(*dst, value);
                }
                InstrKind::AddressAt { dst, base, offset } => {
                    let offset = match offset {
                        Some(offset) => read(&frame, offset)?,
                        None => 0,
                    };
                    frame.addresses.insert(*dst, (base.id, offset));
                }
                InstrKind::Load { dst, src } => {
                    let value = *self.cell(&frame, src)?;
                    frame.scalars.insert(*dst, value);
                }
                InstrKind::Store { src, dst } => {
                    let value = read(&frame, src)?;
                    *self.cell(&frame, dst)? = value;
                }
                InstrKind::Jump { condition } => {
                    if read(&frame, condition)? == 1 {
                        next = instr.next(1);
                    }
                }
                InstrKind::Call { dst, callee, args } => {
                    let args = args
                        .iter()
                        .map(|arg| read(&frame, arg))
                        .collect::<Result<Vec<_>, _>>()?;
                    let result = self.invoke(callee, &args)?;
                    if let Some(dst) = dst {
                        let value = result.ok_or_else(|| format!("{} returned nothing", callee))?;
                        frame.scalars.insert(*dst, value);
                    }
                }
                InstrKind::Return(value) => {
                    return value.as_ref().map(|var| read(&frame, var)).transpose();
                }
            }
            current = next;
        }
        Ok(None)
    }

    fn cell(&mut self, frame: &Frame, address: &AddressVar) -> Result<&mut i64, String> {
        let (symbol, offset) = frame
            .addresses
            .get(address)
            .copied()
            .ok_or("address read before written")?;
        self.memory
            .get_mut(&symbol)
            .and_then(|cells| cells.get_mut(usize::try_from(offset).ok()?))
            .ok_or_else(|| format!("access out of bounds at offset {}", offset))
    }

    fn invoke(&mut self, callee: &Symbol, args: &[i64]) -> Result<Option<i64>, String> {
        *self.calls.entry(callee.name.clone()).or_insert(0) += 1;

        let builtin = Builtin::ALL
            .get(callee.id.0)
            .copied()
            .filter(|b| b.name() == callee.name);
        let Some(builtin) = builtin else {
            let function = self
                .function(&callee.name)
                .ok_or_else(|| format!("call to undefined function {}", callee))?;
            return self.run(function, args);
        };

        match builtin {
            Builtin::ReadInt | Builtin::ReadChar => self
                .input
                .pop_front()
                .map(Some)
                .ok_or_else(|| "input exhausted".to_string()),
            Builtin::PrintBool => {
                self.output.push_str(match args.first().copied() {
                    Some(1) => "true",
                    _ => "false",
                });
                Ok(None)
            }
            Builtin::PrintInt => {
                let value = args.first().copied().unwrap_or_default();
                self.output.push_str(&value.to_string());
                Ok(None)
            }
            Builtin::PrintChar => {
                let value = args.first().copied().unwrap_or_default();
                self.output
                    .extend(u32::try_from(value).ok().and_then(char::from_u32));
                Ok(None)
            }
            Builtin::Println => {
                self.output.push('\n');
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ast::{
            builder::*,
            typed::{BinOp, Statement},
            TypeSpec,
        },
        lower::lower,
    };

    #[test]
    fn builtins_read_input_and_write_output() {
        let mut syms = Symbols::new();
        let echo = syms.function("echo", vec![], TypeSpec::Void);
        let ast = program(vec![func(
            &echo,
            vec![],
            vec![
                eval(builtin(
                    Builtin::PrintInt,
                    vec![bin(
                        BinOp::Mul,
                        builtin(Builtin::ReadInt, vec![]),
                        int(2),
                    )],
                )),
                eval(builtin(Builtin::Println, vec![])),
                eval(builtin(Builtin::PrintBool, vec![boolean(false)])),
                Statement::Return(None),
            ],
        )]);
        let lowered = lower(&ast).unwrap();

        let mut interpreter = Interpreter::new(&lowered).with_input([21]);

        assert_eq!(Ok(None), interpreter.call("echo", &[]));
        assert_eq!("42\nfalse", interpreter.output());
        assert_eq!(1, interpreter.call_count("readInt"));
    }

    #[test]
    fn runaway_loops_run_out_of_fuel() {
        let mut syms = Symbols::new();
        let spin = syms.function("spin", vec![], TypeSpec::Void);
        let lowered = lower(&program(vec![func(&spin, vec![], vec![Statement::Loop(vec![])])]))
            .unwrap();

        let mut interpreter = Interpreter::new(&lowered);

        assert_eq!(Err("out of fuel".to_string()), interpreter.call("spin", &[]));
    }
}

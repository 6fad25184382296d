//! General assembly definitions, written out in GNU assembler (AT&T) syntax.

use std::fmt::{self, Display, Formatter};

use super::x86::{Op, Register};

/// A complete assembly file: storage directives followed by procedures.
#[derive(Debug, Default)]
pub struct Assembly {
    directives: Vec<Line<Directive>>,
    pub procedures: Vec<Procedure>,
}
impl Assembly {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn push_directive(&mut self, directive: Directive) -> &mut Self {
        self.directives.push(Line::new(directive));
        self
    }
}
impl Display for Assembly {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        for directive in &self.directives {
            writeln!(f, "{}", directive)?;
        }

        for (idx, proc) in self.procedures.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", proc)?;
        }
        Ok(())
    }
}

/// An assembly procedure: a globally visible label, a prologue and a body. Epilogues are part of
/// the body, since a procedure may return from several places.
#[derive(Debug)]
pub struct Procedure {
    pub name: String,
    pub prologue: Block,
    pub body: Block,
}
impl Procedure {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            prologue: Block::new(),
            body: Block::new(),
        }
    }
}
impl Display for Procedure {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        writeln!(f, "{}", Directive::Globl(self.name.clone()))?;
        writeln!(f, "{}:", self.name)?;
        write!(f, "{}", self.prologue)?;
        write!(f, "{}", self.body)
    }
}

/// An assembler directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Reserve zero-initialised common storage: name, size and alignment in bytes.
    Comm(String, u64, u64),
    Globl(String),
}
impl Display for Directive {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Directive::Comm(name, size, align) => {
                write!(f, "    .comm {}, {}, {}", name, size, align)
            }
            Directive::Globl(name) => write!(f, "    .globl {}", name),
        }
    }
}

/// A block of assembly code.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Block {
    lines: Vec<Line<Code>>,
}
impl Block {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn push<V: Into<Vec<Operand>>>(&mut self, op: Op, operands: V) -> &mut Self {
        self.lines
            .push(Line::new(Code::Instr(Instr::new(op, operands.into()))));
        self
    }

    pub fn push_cmt<V: Into<Vec<Operand>>, S: Into<String>>(
        &mut self,
        op: Op,
        operands: V,
        comment: S,
    ) -> &mut Self {
        self.lines.push(Line::new_cmt(
            Code::Instr(Instr::new(op, operands.into())),
            comment.into(),
        ));
        self
    }

    pub fn push_cmt_only<S: Into<String>>(&mut self, comment: S) -> &mut Self {
        self.lines.push(Line::new_cmt_only(comment.into()));
        self
    }

    pub fn push_label(&mut self, label: &Label) -> &mut Self {
        self.lines.push(Line::new(Code::Label(label.clone())));
        self
    }

    pub fn instrs(&self) -> impl Iterator<Item = &Instr> {
        self.lines.iter().filter_map(|line| match &line.line {
            Some(Code::Instr(instr)) => Some(instr),
            _ => None,
        })
    }

    pub fn labels(&self) -> impl Iterator<Item = &Label> {
        self.lines.iter().filter_map(|line| match &line.line {
            Some(Code::Label(label)) => Some(label),
            _ => None,
        })
    }
}
impl Display for Block {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

/// A line of assembly, consisting of an optional instruction and optional comment.
/// When the instruction is [`None`], only the comment is emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line<T> {
    line: Option<T>,
    comment: Option<String>,
}
impl<T> Line<T> {
    /// Construct a new line without comment.
    pub fn new(dir: T) -> Self {
        Self {
            line: Some(dir),
            comment: None,
        }
    }

    /// Construct a new line with a comment.
    pub fn new_cmt(dir: T, comment: String) -> Self {
        Self {
            line: Some(dir),
            comment: Some(comment),
        }
    }

    /// Construct a line holding only a comment.
    pub fn new_cmt_only(comment: String) -> Self {
        Self {
            line: None,
            comment: Some(comment),
        }
    }
}
impl<T: Display> Display for Line<T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match (&self.line, self.comment.as_ref()) {
            (None, None) => Ok(()),
            (None, Some(cmt)) => write!(f, "{:32}# {}", "", cmt),
            (Some(dir), None) => write!(f, "{}", dir),
            (Some(dir), Some(cmt)) => write!(f, "{:32}# {}", dir.to_string(), cmt),
        }
    }
}

/// A jump target within the assembly file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Label(pub(super) usize);
impl Display for Label {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, ".L{}", self.0)
    }
}

/// Anything that may appear on a line of a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Code {
    Label(Label),
    Instr(Instr),
}
impl Display for Code {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Code::Label(label) => write!(f, "{}:", label),
            Code::Instr(instr) => write!(f, "{}", instr),
        }
    }
}

/// A single instruction, consisting of an operator and zero or more operands. Operands are
/// ordered source first, as AT&T syntax requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instr {
    pub operator: Op,
    pub operands: Vec<Operand>,
}
impl Instr {
    pub fn new(operator: Op, operands: Vec<Operand>) -> Instr {
        Self { operator, operands }
    }
}
impl Display for Instr {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        if self.operands.is_empty() {
            return write!(f, "    {}", self.operator);
        }
        let operator = self.operator.to_string();
        write!(f, "    {:7} ", operator)?;
        let operands = self
            .operands
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        f.write_str(&operands)
    }
}

/// An operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// A register
    Reg(Register),
    /// An immediate value
    Imm(i64),
    /// A memory location at a fixed displacement from a register
    Mem(Register, i64),
    /// The global offset table entry holding the address of a symbol
    GotPcRel(String),
    /// A jump target
    Lbl(Label),
    /// A procedure
    Sym(String),
}
impl Display for Operand {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Operand::Reg(reg) => write!(f, "{}", reg),
            Operand::Imm(imm) => write!(f, "${}", imm),
            Operand::Mem(base, disp) => write!(f, "{}({})", disp, base),
            Operand::GotPcRel(sym) => write!(f, "{}@GOTPCREL({})", sym, Register::Rip),
            Operand::Lbl(label) => write!(f, "{}", label),
            Operand::Sym(sym) => f.write_str(sym),
        }
    }
}

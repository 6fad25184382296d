//! Native code generation for 64-bit Linux.

use crate::{ast::SCALAR_WIDTH, ir::Program, prelude::*};

use super::{
    assembly::*, calling_convention::CallingConvention, labels::LabelGenerator,
    procedure_compiler::ProcedureCompiler, stack_convention::Linux64,
};

/// Compile a whole program. Globals and functions are emitted in declaration order.
pub fn compile(prog: &Program) -> Result<Assembly, InternalError> {
    let mut asm = Assembly::new();
    let width = SCALAR_WIDTH as u64;

    for global in &prog.globals {
        asm.push_directive(Directive::Comm(
            global.symbol.name.clone(),
            global.count * width,
            width,
        ));
    }

    let mut label_generator = LabelGenerator::new();
    for function in &prog.functions {
        let procedure = ProcedureCompiler::<Linux64>::compile(
            function,
            &prog.constants,
            &mut label_generator,
            CallingConvention::SystemV64,
        )?;
        asm.procedures.push(procedure);
    }

    info!(
        "Generated {} procedures and {} global storage directives",
        asm.procedures.len(),
        prog.globals.len()
    );
    Ok(asm)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        ast::{
            builder::*,
            typed::{BinOp, Declaration, Statement},
            TypeSpec,
        },
        lower::lower,
    };

    macro_rules! compile_program {
        ($decls:expr) => {{
            let lowered = lower(&program($decls)).unwrap();
            compile(&lowered).unwrap().to_string()
        }};
    }

    macro_rules! assert_contains_lines {
        ($asm:expr, $lines:expr) => {
            let lines: Vec<_> = $asm.lines().map(str::trim_end).collect();
            for expected in $lines {
                assert!(
                    lines.iter().any(|line| line.starts_with(expected)),
                    "\n\nExpected a line starting with:\n\t{}\nIn:\n{}\n",
                    expected,
                    $asm
                );
            }
        };
    }

    #[test]
    fn globals_reserve_common_storage() {
        let mut syms = Symbols::new();
        let g = syms.int("g");
        let arr = syms.array("arr", 10);
        let f = syms.function("f", vec![], TypeSpec::Int);

        let asm = compile_program!(vec![
            Declaration::Variable(g.clone()),
            Declaration::Array(arr.clone()),
            func(&f, vec![], vec![ret(read_index(&arr, read(&g)))]),
        ]);

        assert!(asm.starts_with("    .comm g, 8, 8\n    .comm arr, 80, 8\n    .globl f\nf:\n"));
        assert_contains_lines!(
            asm,
            [
                "    movq    g@GOTPCREL(%rip), %r10",
                "    movq    arr@GOTPCREL(%rip), %r10",
                "    imulq   $8, %r11",
                "    addq    %r11, %r10",
                "    movq    0(%r10), %r10",
            ]
        );
    }

    #[test]
    fn stores_write_through_the_address() {
        let mut syms = Symbols::new();
        let g = syms.int("g");
        let f = syms.function("f", vec![], TypeSpec::Void);

        let asm = compile_program!(vec![
            Declaration::Variable(g.clone()),
            func(&f, vec![], vec![set(&g, int(3)), Statement::Return(None)]),
        ]);

        assert_contains_lines!(asm, ["    movq    %r11, 0(%r10)"]);
    }

    #[test]
    fn functions_are_separated_by_a_blank_line() {
        let mut syms = Symbols::new();
        let f = syms.function("f", vec![], TypeSpec::Void);
        let g = syms.function("g", vec![], TypeSpec::Void);

        let asm = compile_program!(vec![func(&f, vec![], vec![]), func(&g, vec![], vec![])]);

        assert!(asm.contains("    ret\n\n    .globl g\ng:\n"));
        assert_eq!(1, asm.matches("\n\n").count());
    }

    #[test]
    fn arguments_beyond_the_sixth_go_on_the_stack() {
        let mut syms = Symbols::new();
        let params: Vec<_> = (1..=8).map(|i| syms.int(&format!("a{}", i))).collect();
        let many = syms.function("many", vec![TypeSpec::Int; 8], TypeSpec::Int);
        let caller = syms.function("caller", vec![], TypeSpec::Int);

        let asm = compile_program!(vec![
            func(&many, params.clone(), vec![ret(read(&params[7]))]),
            func(
                &caller,
                vec![],
                vec![ret(call(&many, (1..=8).map(int).collect()))],
            ),
        ]);

        assert_contains_lines!(
            asm,
            [
                // 8 parameters and one copy, rounded up to 10 slots.
                "    subq    $80, %rsp",
                "    movq    %r9, -48(%rbp)",
                "    movq    16(%rbp), %r10",
                "    movq    24(%rbp), %r10",
                "    movq    %r10, -64(%rbp)",
                // 8 literals and the result, plus 2 overflow arguments: 11 slots, rounded to 12.
                "    subq    $96, %rsp",
                "    movq    -48(%rbp), %r9",
                "    movq    %r10, 0(%rsp)",
                "    movq    %r10, 8(%rsp)",
                "    call    many",
                "    movq    %rax, -72(%rbp)",
            ]
        );
    }

    #[test]
    fn local_labels_do_not_clash_with_function_names() {
        let mut syms = Symbols::new();
        let l0 = syms.function("L0", vec![], TypeSpec::Void);
        let f = syms.function("f", vec![TypeSpec::Bool], TypeSpec::Void);
        let done = syms.boolean("done");

        let asm = compile_program!(vec![
            func(&l0, vec![], vec![]),
            func(
                &f,
                vec![done.clone()],
                vec![Statement::Loop(vec![if_else(
                    read(&done),
                    vec![Statement::Break],
                    vec![eval(call(&l0, vec![]))],
                )])],
            ),
        ]);

        assert!(asm.contains("\nL0:\n"));
        assert!(asm.contains("\n.L0:"));
        assert_contains_lines!(asm, ["    call    L0", "    jmp     .L"]);
    }

    #[test]
    fn generation_is_deterministic() {
        let mut syms = Symbols::new();
        let f = syms.function("f", vec![TypeSpec::Int], TypeSpec::Int);
        let n = syms.int("n");
        let decls = || {
            vec![func(
                &f,
                vec![n.clone()],
                vec![
                    Statement::Loop(vec![if_else(
                        bin(
                            BinOp::Or,
                            bin(BinOp::Equal, read(&n), int(0)),
                            bin(BinOp::LessThan, read(&n), int(0)),
                        ),
                        vec![Statement::Break],
                        vec![set(&n, bin(BinOp::Sub, read(&n), int(1)))],
                    )]),
                    ret(read(&n)),
                ],
            )]
        };

        assert_eq!(compile_program!(decls()), compile_program!(decls()));
    }
}

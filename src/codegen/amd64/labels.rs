//! Label assignment: decides which instructions can be jumped to.
use std::collections::HashMap;

use crate::{
    ir::{Function, InstrId},
    prelude::*,
};

use super::assembly::Label;

/// Issues labels that are unique within the whole assembly file.
#[derive(Debug, Default)]
pub struct LabelGenerator {
    next: usize,
}
impl LabelGenerator {
    pub fn new() -> Self {
        Default::default()
    }

    /// Generates a new unique label.
    pub fn next_label(&mut self) -> Label {
        let label = Label(self.next);
        self.next += 1;
        label
    }
}

/// The labels of a single function.
#[derive(Debug, Default)]
pub struct Labels {
    labels: HashMap<InstrId, Label>,
}
impl Labels {
    /// Label every instruction of `function` that some edge may jump to: merge points (reached
    /// a second time during a depth-first walk from the entry) and taken-branch targets. No
    /// other instruction is labelled.
    pub fn assign(function: &Function, generator: &mut LabelGenerator) -> Self {
        let mut labels = HashMap::new();
        let Some(entry) = function.entry() else {
            return Self { labels };
        };

        let mut discovered = vec![false; function.len()];
        discovered[entry.index()] = true;
        let mut pending = vec![entry];

        while let Some(id) = pending.pop() {
            let instr = function.instr(id);
            for branch in [1, 0] {
                let Some(next) = instr.next(branch) else {
                    continue;
                };
                if discovered[next.index()] {
                    labels
                        .entry(next)
                        .or_insert_with(|| generator.next_label());
                } else {
                    discovered[next.index()] = true;
                    if branch == 1 {
                        labels.insert(next, generator.next_label());
                    }
                    pending.push(next);
                }
            }
        }

        trace!("Assigned {} labels in {}", labels.len(), function.name());
        Self { labels }
    }

    pub fn get(&self, id: InstrId) -> Option<&Label> {
        self.labels.get(&id)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
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
        builtins::Builtin,
        lower::lower,
    };

    /// Checks that exactly the merge points and taken-branch targets carry a label. The entry
    /// counts as having one extra incoming edge.
    macro_rules! assert_labels_minimal {
        ($decl:expr) => {{
            let program = lower(&program(vec![$decl])).unwrap();
            let function = &program.functions[0];
            let labels = Labels::assign(function, &mut LabelGenerator::new());

            let reachable = function.reachable();
            let mut incoming = HashMap::<InstrId, usize>::new();
            let mut taken = vec![];
            for id in function.entry().into_iter() {
                *incoming.entry(id).or_default() += 1;
            }
            for id in &reachable {
                for (branch, next) in function.instr(*id).successors() {
                    *incoming.entry(next).or_default() += 1;
                    if branch == 1 {
                        taken.push(next);
                    }
                }
            }

            for id in &reachable {
                let jump_target = incoming[id] > 1 || taken.contains(id);
                assert_eq!(
                    jump_target,
                    labels.get(*id).is_some(),
                    "label mismatch at {}",
                    id
                );
            }
            labels
        }};
    }

    #[test]
    fn straight_line_code_has_no_labels() {
        let mut syms = Symbols::new();
        let f = syms.function("f", vec![], TypeSpec::Int);

        let labels = assert_labels_minimal!(func(&f, vec![], vec![ret(int(1))]));

        assert_eq!(0, labels.len());
    }

    #[test]
    fn if_else_labels_taken_branch_and_merge() {
        let mut syms = Symbols::new();
        let f = syms.function("f", vec![TypeSpec::Bool], TypeSpec::Void);
        let c = syms.boolean("c");
        let print = |i| eval(builtin(Builtin::PrintInt, vec![int(i)]));

        let labels = assert_labels_minimal!(func(
            &f,
            vec![c.clone()],
            vec![
                if_else(read(&c), vec![print(1)], vec![print(2)]),
                Statement::Return(None),
            ],
        ));

        assert_eq!(2, labels.len());
    }

    #[test]
    fn loops_label_their_header() {
        let mut syms = Symbols::new();
        let f = syms.function("f", vec![TypeSpec::Int], TypeSpec::Void);
        let n = syms.int("n");

        let labels = assert_labels_minimal!(func(
            &f,
            vec![n.clone()],
            vec![
                Statement::Loop(vec![
                    if_else(
                        bin(BinOp::LessThan, read(&n), int(0)),
                        vec![Statement::Break],
                        vec![Statement::Continue],
                    ),
                ]),
                Statement::Return(None),
            ],
        ));

        // Loop header (target of both the back-edge and `continue`) and the break placeholder.
        assert_eq!(2, labels.len());
    }

    #[test]
    fn nested_short_circuits_are_labelled_minimally() {
        let mut syms = Symbols::new();
        let f = syms.function(
            "f",
            vec![TypeSpec::Bool, TypeSpec::Bool, TypeSpec::Bool],
            TypeSpec::Bool,
        );
        let a = syms.boolean("a");
        let b = syms.boolean("b");
        let c = syms.boolean("c");

        assert_labels_minimal!(func(
            &f,
            vec![a.clone(), b.clone(), c.clone()],
            vec![ret(bin(
                BinOp::Or,
                bin(BinOp::And, read(&a), read(&b)),
                not(read(&c)),
            ))],
        ));
    }

    #[test]
    fn labels_are_unique_across_functions() {
        let mut syms = Symbols::new();
        let f = syms.function("f", vec![], TypeSpec::Void);
        let g = syms.function("g", vec![], TypeSpec::Void);
        let ast = program(vec![
            func(&f, vec![], vec![Statement::Loop(vec![])]),
            func(&g, vec![], vec![Statement::Loop(vec![])]),
        ]);
        let lowered = lower(&ast).unwrap();

        let mut generator = LabelGenerator::new();
        let f_labels = Labels::assign(&lowered.functions[0], &mut generator);
        let g_labels = Labels::assign(&lowered.functions[1], &mut generator);
        let entry = |decl: usize| lowered.functions[decl].entry().unwrap();

        assert_eq!(Some(&Label(0)), f_labels.get(entry(0)));
        assert_eq!(Some(&Label(1)), g_labels.get(entry(1)));
    }
}

//! ASAP control-step scheduling.

use exprc_ir::{Dfg, InstrId, Ir, Opcode};
use exprc_utils::Named;
use std::collections::{BTreeMap, HashMap};

/// A multimap `step (>= 0) -> [InstrId]`, in program order within each
/// step. Every non-`OUTPUT` instruction runs exactly one step after the
/// latest of its producers (`INPUT` producers count as step 0); every
/// `OUTPUT` shares one terminal "write" step equal to
/// `max_nonoutput_step + 1`.
#[derive(Debug, Clone, Default)]
pub struct Schedule {
    steps: BTreeMap<u32, Vec<InstrId>>,
    step_of: HashMap<InstrId, u32>,
}

pub struct Scheduler;

impl Named for Scheduler {
    fn name() -> &'static str {
        "scheduler"
    }
    fn description() -> &'static str {
        "assigns an ASAP control step to every instruction"
    }
}

impl Scheduler {
    /// Runs the two-pass ASAP scheduler: non-`OUTPUT` instructions first,
    /// then every `OUTPUT` pinned to the shared terminal write step.
    pub fn schedule(ir: &Ir, dfg: &Dfg) -> Schedule {
        let mut sched = Schedule::default();

        // Pass 1: every non-OUTPUT instruction.
        let mut max_step = 0u32;
        for (id, instr) in ir.instrs.iter_enumerated() {
            if instr.op == Opcode::Output {
                continue;
            }
            let step = if instr.src.is_empty() {
                0
            } else {
                instr
                    .src
                    .iter()
                    .map(|&s| {
                        let producer = dfg
                            .def(s)
                            .expect("DFG guarantees every src is defined");
                        sched.step_of[&producer]
                    })
                    .max()
                    .expect("non-empty src")
                    + 1
            };
            sched.place(id, step);
            max_step = max_step.max(step);
            log::trace!(
                "{}: {} -> step {step}",
                Scheduler::name(),
                instr,
            );
        }

        // Pass 2: every OUTPUT shares the terminal write step.
        let write_step = max_step + 1;
        for (id, instr) in ir.instrs.iter_enumerated() {
            if instr.op == Opcode::Output {
                sched.place(id, write_step);
                log::trace!(
                    "{}: {} -> step {write_step} (output)",
                    Scheduler::name(),
                    instr,
                );
            }
        }

        sched
    }
}

impl Schedule {
    fn place(&mut self, instr: InstrId, step: u32) {
        self.step_of.insert(instr, step);
        self.steps.entry(step).or_default().push(instr);
    }

    /// The control step `instr` was placed at.
    pub fn step_of(&self, instr: InstrId) -> u32 {
        self.step_of[&instr]
    }

    /// Instructions placed at `step`, in program order. Empty if no
    /// instruction runs at that step.
    pub fn at(&self, step: u32) -> &[InstrId] {
        self.steps.get(&step).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Steps in increasing order, each paired with its instructions.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &[InstrId])> {
        self.steps.iter().map(|(&s, is)| (s, is.as_slice()))
    }

    /// The highest step any instruction (including `OUTPUT`) was placed at
    /// — the terminal write/output step.
    pub fn last_step(&self) -> u32 {
        self.steps.keys().next_back().copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exprc_ir::ast::{Expr, Stmt};
    use exprc_ir::Translator;

    fn var(s: &str) -> Expr {
        Expr::Var(s.to_string())
    }

    #[test]
    fn three_op_example_schedule_matches_spec() {
        // C = A + B; F = A + D; out G = C * F;
        let program = vec![
            Stmt::AssignVar {
                name: "C".into(),
                expr: Expr::add(var("A"), var("B")),
            },
            Stmt::AssignVar {
                name: "F".into(),
                expr: Expr::add(var("A"), var("D")),
            },
            Stmt::AssignOut {
                name: "G".into(),
                expr: Expr::mul(var("C"), var("F")),
            },
        ];
        let ir = Translator::translate(&program).unwrap();
        let dfg = Dfg::build(&ir).unwrap();
        let sched = Scheduler::schedule(&ir, &dfg);

        assert_eq!(sched.at(0).len(), 3); // A, B, D
        assert_eq!(sched.at(1).len(), 2); // C, F
        assert_eq!(sched.at(2).len(), 1); // G
        assert_eq!(sched.at(3).len(), 1); // OUTPUT
        assert_eq!(sched.last_step(), 3);
    }

    #[test]
    fn sequential_chain_schedule_is_one_add_per_step() {
        // out Y = ((A + B) + C) + D;
        let program = vec![Stmt::AssignOut {
            name: "Y".into(),
            expr: Expr::add(
                Expr::add(Expr::add(var("A"), var("B")), var("C")),
                var("D"),
            ),
        }];
        let ir = Translator::translate(&program).unwrap();
        let dfg = Dfg::build(&ir).unwrap();
        let sched = Scheduler::schedule(&ir, &dfg);

        assert_eq!(sched.at(0).len(), 4); // A, B, C, D
        assert_eq!(sched.at(1).len(), 1);
        assert_eq!(sched.at(2).len(), 1);
        assert_eq!(sched.at(3).len(), 1);
        assert_eq!(sched.at(4).len(), 1); // OUTPUT
        assert_eq!(sched.last_step(), 4);
    }
}

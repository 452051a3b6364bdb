//! Human-readable debug dumps printed before the Verilog when `-d` is
//! given: every IR instruction, the DFG's def/use edges, and the step ->
//! instruction schedule, one line per entity, in deterministic order.

use exprc_ir::{Dfg, Ir};
use exprc_opt::Schedule;
use itertools::Itertools;

pub fn dump(ir: &Ir, dfg: &Dfg, schedule: &Schedule) {
    println!("-- instructions --");
    for (id, instr) in ir.instrs.iter_enumerated() {
        println!("{id}: {instr}");
    }

    println!("-- def/use --");
    let mut operands: Vec<_> = ir.name_by_operand.iter().collect();
    operands.sort_by_key(|(op, _)| **op);
    for (&op, name) in operands {
        let def = dfg
            .def(op)
            .map(|id| id.to_string())
            .unwrap_or_else(|| "<none>".to_string());
        println!("{op} ({name}): def={def} uses=[{}]", dfg.uses(op).iter().join(", "));
    }

    println!("-- schedule --");
    for (step, instrs) in schedule.iter() {
        println!("step {step}: [{}]", instrs.iter().join(", "));
    }
}

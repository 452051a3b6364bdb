//! Dead-code check — a semantic check the driver runs rather than the
//! translator or DFG builder, since it needs both the name map and the
//! completed def/use relation.
//!
//! A binding is dead if its operand is never consumed by any later
//! instruction *and* it isn't the value driven out through a declared
//! `out` — being read by a declared output is itself the binding's use.

use exprc_ir::{Dfg, Ir, OperandId, Opcode};
use exprc_utils::{Error, ExprcResult};
use std::collections::HashSet;

pub fn check(ir: &Ir, dfg: &Dfg) -> ExprcResult<()> {
    let output_operands: HashSet<OperandId> = ir
        .instrs
        .iter()
        .filter(|instr| instr.op == Opcode::Output)
        .map(|instr| instr.src[0])
        .collect();

    let mut unused: Vec<(OperandId, &String)> = ir
        .name_by_operand
        .iter()
        .filter(|(op, _)| !output_operands.contains(op))
        .filter(|(op, _)| dfg.is_unused(**op))
        .map(|(op, name)| (*op, name))
        .collect();
    // Deterministic pick when more than one binding is dead: the one with
    // the lowest operand id, i.e. the one bound earliest in the program.
    unused.sort_by_key(|(op, _)| *op);

    if let Some((_, name)) = unused.first() {
        return Err(Error::unused(name));
    }
    Ok(())
}

//! Data-flow graph: def/use indices over the instruction sequence.
//!
//! A single forward pass over the sequence: for each `src`, fail if not
//! yet defined, else record a use edge; then if `dst` is present, fail if
//! already defined, else record the def.

use crate::ir::{InstrId, Instruction, Ir, OperandId};
use exprc_utils::{Error, ExprcResult, Named};
use std::collections::HashMap;

/// `def: OperandId -> InstrId` (total on every `dst` that appears) and
/// `use: OperandId -> [InstrId]` (a multiset of consuming instructions).
#[derive(Debug, Clone, Default)]
pub struct Dfg {
    def: HashMap<OperandId, InstrId>,
    uses: HashMap<OperandId, Vec<InstrId>>,
}

impl Named for Dfg {
    fn name() -> &'static str {
        "dfg"
    }
    fn description() -> &'static str {
        "builds the def/use relation over the instruction sequence"
    }
}

impl Dfg {
    /// Builds the DFG for `ir`'s instruction sequence, in program order.
    pub fn build(ir: &Ir) -> ExprcResult<Self> {
        let mut dfg = Dfg::default();
        for (id, instr) in ir.instrs.iter_enumerated() {
            dfg.visit(id, instr)?;
        }
        Ok(dfg)
    }

    fn visit(&mut self, id: InstrId, instr: &Instruction) -> ExprcResult<()> {
        for &src in &instr.src {
            if !self.def.contains_key(&src) {
                return Err(Error::use_before_def(src));
            }
            self.uses.entry(src).or_default().push(id);
        }
        if let Some(dst) = instr.dst {
            if self.def.contains_key(&dst) {
                return Err(Error::double_def(dst));
            }
            self.def.insert(dst, id);
        }
        Ok(())
    }

    /// Total lookup: every operand that has been defined maps to the
    /// instruction that defines it.
    pub fn def(&self, op: OperandId) -> Option<InstrId> {
        self.def.get(&op).copied()
    }

    /// The (possibly empty) set of instructions that consume `op`.
    pub fn uses(&self, op: OperandId) -> &[InstrId] {
        self.uses.get(&op).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True if `op` is never consumed by any instruction — the condition
    /// the driver's dead-code check rejects for non-output bindings.
    pub fn is_unused(&self, op: OperandId) -> bool {
        self.uses.get(&op).map_or(true, Vec::is_empty)
    }
}

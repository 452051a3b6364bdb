//! The linear SSA-style instruction list produced by the translator.

use exprc_utils::{decl_id, ArenaId};
use itertools::Itertools;

decl_id!(
    /// Identity of an SSA value. Operands are never mutated once created.
    OperandId
);
decl_id!(
    /// Identity of an instruction within the program's instruction sequence.
    InstrId
);

/// The four instruction opcodes this language lowers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// Latches a named input. No `src`; defines `dst`.
    Input,
    /// Drives a declared output. One `src`; no `dst`.
    Output,
    Add,
    Mul,
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Opcode::Input => "INPUT",
            Opcode::Output => "OUTPUT",
            Opcode::Add => "ADD",
            Opcode::Mul => "MUL",
        };
        write!(f, "{s}")
    }
}

/// `(InstrId, opcode, dst: OperandId?, src: [OperandId])`. Arity invariants
/// (`INPUT` has no `src`, `OUTPUT` has no `dst`, `ADD`/`MUL` take exactly
/// two `src`) are enforced by the constructors below rather than checked
/// at every call site.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub op: Opcode,
    pub dst: Option<OperandId>,
    pub src: Vec<OperandId>,
}

impl Instruction {
    pub fn input(dst: OperandId) -> Self {
        Instruction {
            op: Opcode::Input,
            dst: Some(dst),
            src: Vec::new(),
        }
    }

    pub fn output(src: OperandId) -> Self {
        Instruction {
            op: Opcode::Output,
            dst: None,
            src: vec![src],
        }
    }

    pub fn add(dst: OperandId, lhs: OperandId, rhs: OperandId) -> Self {
        Instruction {
            op: Opcode::Add,
            dst: Some(dst),
            src: vec![lhs, rhs],
        }
    }

    pub fn mul(dst: OperandId, lhs: OperandId, rhs: OperandId) -> Self {
        Instruction {
            op: Opcode::Mul,
            dst: Some(dst),
            src: vec![lhs, rhs],
        }
    }

    /// True for instructions that produce a value (`ADD`/`MUL`/`INPUT`).
    pub fn defines_value(&self) -> bool {
        self.dst.is_some()
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(dst) = self.dst {
            write!(f, "{} {dst} <- ", self.op)?;
        } else {
            write!(f, "{} ", self.op)?;
        }
        write!(f, "{}", self.src.iter().join(", "))
    }
}

/// The program-order instruction sequence plus the name map the
/// translator built while lowering the AST.
#[derive(Debug, Clone, Default)]
pub struct Ir {
    pub instrs: exprc_utils::IdVec<InstrId, Instruction>,
    /// Number of operands minted; `OperandId`s are `0..next_operand` in
    /// creation order. Operands have no data of their own beyond identity
    /// and a defining instruction (found through the DFG).
    next_operand: u32,
    /// Every user-chosen name bound to the operand it defines, for both
    /// plain and `out` assignments, including implicitly declared inputs.
    /// First-write-wins: an operand keeps the name it was given when it
    /// was defined, even if a later `out` statement binds another name to
    /// the same operand (e.g. `out Z = A;`).
    pub name_by_operand: std::collections::HashMap<OperandId, String>,
    /// The name declared on each `OUTPUT` instruction's own `out` statement,
    /// keyed by that instruction rather than by operand. Needed because an
    /// `out` statement's name and its source operand's name can differ even
    /// when the operand is a bare `Var` (the operand already carries the
    /// name of whatever defined it; `name_by_operand` can't hold both).
    pub output_names: std::collections::HashMap<InstrId, String>,
}

impl Ir {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh_operand(&mut self) -> OperandId {
        let id = OperandId::from_index(self.next_operand as usize);
        self.next_operand += 1;
        id
    }

    pub fn push(&mut self, instr: Instruction) -> InstrId {
        self.instrs.push(instr)
    }

    pub fn operand_count(&self) -> usize {
        self.next_operand as usize
    }
}

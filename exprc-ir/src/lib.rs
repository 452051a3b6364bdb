//! AST, linear SSA instruction list, and the data-flow graph built over
//! it.
pub mod ast;
pub mod dfg;
pub mod ir;
pub mod translator;

pub use ast::{Expr, Program, Stmt};
pub use dfg::Dfg;
pub use ir::{InstrId, Instruction, Ir, Opcode, OperandId};
pub use translator::Translator;

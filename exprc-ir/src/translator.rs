//! Lowers the AST into the linear IR.
//!
//! Walks assignments in program order; each expression is lowered
//! bottom-up (left child before right), emitting one `ADD`/`MUL`
//! instruction per inner node. A `Var` reference that has not yet been
//! bound synthesizes a fresh `INPUT` instruction (implicit input
//! declaration). Redefining a name — whether it was bound explicitly or
//! implicitly — is an error.

use crate::ast::{Expr, Program, Stmt};
use crate::ir::{Instruction, Ir, OperandId};
use exprc_utils::{Error, ExprcResult, Named};
use std::collections::HashMap;

/// Lowers an AST `Program` into `Ir`, matching the `Named` pass-tagging
/// convention the rest of this workspace's passes follow.
pub struct Translator {
    vars: HashMap<String, OperandId>,
}

impl Named for Translator {
    fn name() -> &'static str {
        "translator"
    }
    fn description() -> &'static str {
        "lowers the AST into a linear SSA-style instruction list"
    }
}

impl Translator {
    pub fn new() -> Self {
        Translator {
            vars: HashMap::new(),
        }
    }

    pub fn translate(program: &Program) -> ExprcResult<Ir> {
        let mut t = Translator::new();
        let mut ir = Ir::new();
        for stmt in program {
            t.lower_stmt(&mut ir, stmt)?;
        }
        Ok(ir)
    }

    /// Binds `name` to `operand`, erroring if `name` is already bound
    /// (whether by an earlier explicit assignment or an implicit input
    /// declaration).
    ///
    /// `name_by_operand` is first-write-wins: `operand` may already carry
    /// the name an earlier implicit `INPUT` declaration gave it (e.g.
    /// `out Z = A;` binds operand 0 to `"A"` in `resolve_var` before this
    /// `bind` call for `Z`'s own name), and that name must keep naming the
    /// operand's definition site. `Z`'s own name is recorded separately in
    /// `ir.output_names` by the `AssignOut` arm of `lower_stmt`.
    fn bind(&mut self, ir: &mut Ir, name: &str, operand: OperandId) -> ExprcResult<()> {
        if self.vars.contains_key(name) {
            return Err(Error::redefined(name));
        }
        self.vars.insert(name.to_string(), operand);
        ir.name_by_operand.entry(operand).or_insert_with(|| name.to_string());
        log::debug!("{}: bound `{name}` to {operand}", Translator::name());
        Ok(())
    }

    /// Resolves a `Var` reference, synthesizing a fresh `INPUT`
    /// instruction the first time a name is seen.
    fn resolve_var(&mut self, ir: &mut Ir, name: &str) -> OperandId {
        if let Some(&op) = self.vars.get(name) {
            return op;
        }
        let op = ir.fresh_operand();
        ir.push(Instruction::input(op));
        self.vars.insert(name.to_string(), op);
        ir.name_by_operand.insert(op, name.to_string());
        log::debug!(
            "{}: implicit input declaration for `{name}` -> {op}",
            Translator::name()
        );
        op
    }

    fn lower_expr(&mut self, ir: &mut Ir, expr: &Expr) -> OperandId {
        match expr {
            Expr::Var(name) => self.resolve_var(ir, name),
            Expr::Add(lhs, rhs) => {
                let l = self.lower_expr(ir, lhs);
                let r = self.lower_expr(ir, rhs);
                let dst = ir.fresh_operand();
                ir.push(Instruction::add(dst, l, r));
                dst
            }
            Expr::Mul(lhs, rhs) => {
                let l = self.lower_expr(ir, lhs);
                let r = self.lower_expr(ir, rhs);
                let dst = ir.fresh_operand();
                ir.push(Instruction::mul(dst, l, r));
                dst
            }
        }
    }

    fn lower_stmt(&mut self, ir: &mut Ir, stmt: &Stmt) -> ExprcResult<()> {
        match stmt {
            Stmt::AssignVar { name, expr } => {
                let val = self.lower_expr(ir, expr);
                self.bind(ir, name, val)
            }
            Stmt::AssignOut { name, expr } => {
                let val = self.lower_expr(ir, expr);
                self.bind(ir, name, val)?;
                let out_id = ir.push(Instruction::output(val));
                ir.output_names.insert(out_id, name.to_string());
                Ok(())
            }
        }
    }
}

impl Default for Translator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Opcode;

    fn var(s: &str) -> Expr {
        Expr::Var(s.to_string())
    }

    #[test]
    fn three_op_example_has_expected_opcode_counts() {
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
        let mut counts = HashMap::new();
        for instr in ir.instrs.iter() {
            *counts.entry(instr.op).or_insert(0) += 1;
        }
        assert_eq!(counts.get(&Opcode::Input).copied().unwrap_or(0), 3);
        assert_eq!(counts.get(&Opcode::Add).copied().unwrap_or(0), 2);
        assert_eq!(counts.get(&Opcode::Mul).copied().unwrap_or(0), 1);
        assert_eq!(counts.get(&Opcode::Output).copied().unwrap_or(0), 1);
        assert_eq!(ir.name_by_operand.len(), 6); // A, B, D, C, F, G
    }

    #[test]
    fn shared_subexpression_yields_three_adds_no_cse() {
        // X = A + B; out Y = (A + B) * (A + B);
        let program = vec![
            Stmt::AssignVar {
                name: "X".into(),
                expr: Expr::add(var("A"), var("B")),
            },
            Stmt::AssignOut {
                name: "Y".into(),
                expr: Expr::mul(
                    Expr::add(var("A"), var("B")),
                    Expr::add(var("A"), var("B")),
                ),
            },
        ];
        let ir = Translator::translate(&program).unwrap();
        let add_count = ir.instrs.iter().filter(|i| i.op == Opcode::Add).count();
        assert_eq!(add_count, 3, "no CSE: A+B is lowered three separate times");
    }

    #[test]
    fn implicit_input_declaration() {
        // out Z = A;
        let program = vec![Stmt::AssignOut {
            name: "Z".into(),
            expr: var("A"),
        }];
        let ir = Translator::translate(&program).unwrap();
        let inputs: Vec<_> = ir
            .instrs
            .iter()
            .filter(|i| i.op == Opcode::Input)
            .collect();
        assert_eq!(inputs.len(), 1);
        let outputs: Vec<_> = ir
            .instrs
            .iter()
            .filter(|i| i.op == Opcode::Output)
            .collect();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].src[0], inputs[0].dst.unwrap());
    }

    #[test]
    fn redefinition_is_an_error() {
        // A = B + C; A = D + E; out Y = A;
        let program = vec![
            Stmt::AssignVar {
                name: "A".into(),
                expr: Expr::add(var("B"), var("C")),
            },
            Stmt::AssignVar {
                name: "A".into(),
                expr: Expr::add(var("D"), var("E")),
            },
            Stmt::AssignOut {
                name: "Y".into(),
                expr: var("A"),
            },
        ];
        let err = Translator::translate(&program).unwrap_err();
        assert_eq!(err.to_string(), "Error: variable A defined more than once");
    }

    #[test]
    fn sequential_chain_is_three_adds() {
        // out Y = ((A + B) + C) + D;
        let program = vec![Stmt::AssignOut {
            name: "Y".into(),
            expr: Expr::add(
                Expr::add(Expr::add(var("A"), var("B")), var("C")),
                var("D"),
            ),
        }];
        let ir = Translator::translate(&program).unwrap();
        let add_count = ir.instrs.iter().filter(|i| i.op == Opcode::Add).count();
        assert_eq!(add_count, 3);
    }
}

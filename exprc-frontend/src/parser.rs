//! Parser for exprc programs.
//!
//! Tokenizing and recursive-descent parsing are expressed together as a
//! PEG grammar (`syntax.pest`), the way `calyx_frontend::parser` drives
//! Calyx's own grammar through `pest`. This module is a thin boundary
//! collaborator, exercised only through [`parse_program`]'s contract.

use exprc_ir::ast::{Expr, Program, Stmt};
use exprc_utils::{Error, ExprcResult};
use pest::iterators::Pair;
use pest::Parser;

// Include the grammar file so Cargo rebuilds this module when it changes.
const _GRAMMAR: &str = include_str!("syntax.pest");

#[derive(pest_derive::Parser)]
#[grammar = "syntax.pest"]
struct ExprcParser;

/// Parses `source` into a [`Program`].
pub fn parse_program(source: &str) -> ExprcResult<Program> {
    let mut pairs = ExprcParser::parse(Rule::program, source).map_err(|e| {
        Error::parse(format!("failed to parse program: {e}"))
    })?;
    let program_pair = pairs.next().expect("program rule always produces one pair");
    let mut stmts = Vec::new();
    for pair in program_pair.into_inner() {
        match pair.as_rule() {
            Rule::assign => stmts.push(build_stmt(pair)),
            Rule::EOI => {}
            _ => unreachable!("unexpected top-level rule: {:?}", pair.as_rule()),
        }
    }
    log::debug!("parsed {} statement(s)", stmts.len());
    Ok(stmts)
}

fn build_stmt(pair: Pair<Rule>) -> Stmt {
    let inner = pair
        .into_inner()
        .next()
        .expect("assign always wraps var_assign or out_assign");
    match inner.as_rule() {
        Rule::var_assign => {
            let mut parts = inner.into_inner();
            let name = parts.next().unwrap().as_str().to_string();
            let expr = build_expr(parts.next().unwrap());
            Stmt::AssignVar { name, expr }
        }
        Rule::out_assign => {
            let mut parts = inner.into_inner();
            let _out_kw = parts.next().unwrap(); // the literal `out` keyword
            let name = parts.next().unwrap().as_str().to_string();
            let expr = build_expr(parts.next().unwrap());
            Stmt::AssignOut { name, expr }
        }
        _ => unreachable!("unexpected assign variant: {:?}", inner.as_rule()),
    }
}

/// `expr := term ( '+' term )*`, left-associative.
fn build_expr(pair: Pair<Rule>) -> Expr {
    let mut terms = pair.into_inner().filter(|p| p.as_rule() == Rule::term);
    let mut acc = build_term(terms.next().expect("expr always has one term"));
    for term in terms {
        acc = Expr::add(acc, build_term(term));
    }
    acc
}

/// `term := factor ( '*' factor )*`, left-associative, binds tighter than `+`.
fn build_term(pair: Pair<Rule>) -> Expr {
    let mut factors = pair.into_inner().filter(|p| p.as_rule() == Rule::factor);
    let mut acc = build_factor(factors.next().expect("term always has one factor"));
    for factor in factors {
        acc = Expr::mul(acc, build_factor(factor));
    }
    acc
}

/// `factor := ident | '(' expr ')'`.
fn build_factor(pair: Pair<Rule>) -> Expr {
    let inner = pair
        .into_inner()
        .next()
        .expect("factor always wraps ident or expr");
    match inner.as_rule() {
        Rule::ident => Expr::Var(inner.as_str().to_string()),
        Rule::expr => build_expr(inner),
        _ => unreachable!("unexpected factor variant: {:?}", inner.as_rule()),
    }
}

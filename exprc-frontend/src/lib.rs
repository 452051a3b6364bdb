//! Lexer and parser for the exprc language.
mod parser;

pub use parser::parse_program;

//! Front end: source text to AST.
//!
//! `lexer` tokenizes with `logos`; `parser` is a recursive-descent parser
//! that follows the grammar's precedence ladder directly.

pub mod lexer;
pub mod parser;

use crate::ast::Program;
use crate::CompileError;

pub fn parse(source: &str) -> Result<Program, CompileError> {
    let tokens = lexer::tokenize(source)?;
    parser::Parser::new(source, tokens).parse_program()
}

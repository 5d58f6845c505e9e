#![forbid(unsafe_code)]

mod error;
mod fmt;
mod parser;

use bound_lex::Lexer;

pub use error::ParseError;
pub use fmt::{format_program, format_term};
pub use parser::Parser;

pub fn parse_source(src: &str) -> Result<bound_ast::Program, ParseError> {
    let tokens = Lexer::new(src).lex()?;
    let mut parser = Parser::new(&tokens);
    parser.parse_program()
}

/// Parse a source file while attempting to recover from errors.
///
/// Returns every statement that parsed and a list of encountered `ParseError`s.
pub fn parse_source_with_recovery(
    src: &str,
) -> Result<(bound_ast::Program, Vec<ParseError>), ParseError> {
    let tokens = Lexer::new(src).lex()?;
    let mut parser = Parser::new(&tokens);
    Ok(parser.parse_program_with_recovery())
}

pub fn parse_term(src: &str) -> Result<bound_ast::TermRef, ParseError> {
    let tokens = Lexer::new(src).lex()?;
    let mut parser = Parser::new(&tokens);
    parser.parse_term_eof()
}

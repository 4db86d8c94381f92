pub mod analyzer;
pub mod ast;
mod lexer;
pub mod parser;
mod printer;

pub use lexer::{tokenize, Keyword, Lexer, Span, Token, TokenError, TokenKind};
pub use parser::{ParseError, Parser};
pub use printer::print_tree;

use ast::Program;

pub fn parse(source: &str) -> Result<Program, crate::error::Error> {
    let (program, _) = parse_with_diagnostics(source)?;
    Ok(program)
}

pub fn parse_with_diagnostics(
    source: &str,
) -> Result<(Program, Vec<ParseError>), crate::error::Error> {
    let chars = source.chars().collect::<Vec<_>>();
    let mut lexer = Lexer::new(&chars);
    let tokens = lexer.lex()?;

    Ok(Parser::new(tokens).parse_with_diagnostics())
}

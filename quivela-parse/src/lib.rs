#![forbid(unsafe_code)]

mod error;
mod fmt;
mod parser;

use miette::IntoDiagnostic;
use quivela_lex::{LexError, Lexer, Token};

pub use error::ParseError;
pub use fmt::{format_bounds, format_development, format_expr, format_prop};
pub use parser::Parser;

pub fn parse_source(src: &str) -> miette::Result<quivela_ast::Development> {
    let tokens = Lexer::new(src).lex().into_diagnostic()?;
    let mut parser = Parser::new(&tokens);
    parser.parse_development().into_diagnostic()
}

/// Like [`parse_source`], but keeps the located error so callers can map the
/// span back to a line and column.
pub fn parse_development(src: &str) -> Result<quivela_ast::Development, ParseError> {
    let tokens = lex(src)?;
    Parser::new(&tokens).parse_development()
}

pub fn parse_expr(src: &str) -> miette::Result<quivela_ast::Expr> {
    let tokens = Lexer::new(src).lex().into_diagnostic()?;
    let mut parser = Parser::new(&tokens);
    parser.parse_expr_eof().into_diagnostic()
}

pub fn parse_prop(src: &str) -> miette::Result<quivela_ast::Prop> {
    let tokens = Lexer::new(src).lex().into_diagnostic()?;
    let mut parser = Parser::new(&tokens);
    parser.parse_prop_eof().into_diagnostic()
}

pub fn parse_bounds(src: &str) -> miette::Result<quivela_ast::Bounds> {
    let tokens = Lexer::new(src).lex().into_diagnostic()?;
    let mut parser = Parser::new(&tokens);
    parser.parse_bounds_eof().into_diagnostic()
}

fn lex(src: &str) -> Result<Vec<Token>, ParseError> {
    Lexer::new(src)
        .lex()
        .map_err(|LexError { message, span }| ParseError { message, span })
}

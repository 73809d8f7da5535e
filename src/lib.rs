//! A 6502 assembler for the x816 dialect: lexer -> parser -> resolver ->
//! encoder, plus the static instruction table the last two stages share.

pub mod ast;
pub mod encoder;
pub mod isa;
pub mod lexer;
pub mod parser;
pub mod resolver;
pub mod token;

use crate::ast::Statement;

pub type Result<T> = std::result::Result<T, Error>;

/// The top-level error type, aggregating every stage's own error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Lexer(#[from] lexer::LexerError),

    #[error(transparent)]
    Parser(#[from] parser::ParserError),

    #[error(transparent)]
    Assembler(#[from] resolver::AssemblerError),

    #[error(transparent)]
    Encoder(#[from] encoder::EncoderError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Parses `source` into its statement list without resolving or encoding
/// it. Exposed for the CLI's `parse` subcommand and for debugging.
pub fn parse_source(source: &str) -> Result<Vec<Statement>> {
    let lines = lexer::lex(source)?;
    Ok(parser::parse(&lines)?)
}

/// Runs the full pipeline -- lex, parse, resolve, encode -- and returns the
/// assembled byte stream.
pub fn assemble_source(source: &str) -> Result<Vec<u8>> {
    let statements = parse_source(source)?;
    let resolved = resolver::resolve(&statements)?;
    let bytes = encoder::encode(&statements, &resolved.symbols)?;
    Ok(bytes)
}

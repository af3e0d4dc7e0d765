// tamarin-parser - Lexer and parser for the Tamarin programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! # tamarin-parser
//!
//! Lexer and parser for the Tamarin programming language.
//! Produces an [`ast::Program`] from source code strings.

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::{Block, Expr, Program, Stmt};
pub use lexer::{Lexer, LexerError, Token};
pub use parser::{Parser, ParserError, parse};

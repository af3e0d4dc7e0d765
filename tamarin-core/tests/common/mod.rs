// tamarin-core - Common test utilities
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Shared test helpers for Tamarin integration tests.
//!
//! In your test file, add:
//! ```ignore
//! mod common;
//! use common::*;
//! ```

// Re-export common types for convenience
#[allow(unused_imports)]
pub use tamarin_core::value::TamarinVal;
#[allow(unused_imports)]
pub use tamarin_core::{Env, Error, eval};
#[allow(unused_imports)]
pub use tamarin_parser::ast::{Block, Expr, Program, Stmt};

/// Parse a source string, panicking on parse errors.
pub fn parse(src: &str) -> Program {
    tamarin_parser::parse(src).expect("parse error")
}

/// Evaluate a source string in a fresh environment.
#[allow(dead_code)]
pub fn eval_str(src: &str) -> Result<TamarinVal, Error> {
    let env = Env::new();
    eval(&parse(src), &env)
}

/// Evaluate a source string, formatting the result (or the error) for
/// assertion against expected output.
#[allow(dead_code)]
pub fn eval_display(src: &str) -> String {
    match eval_str(src) {
        Ok(value) => value.to_string(),
        Err(err) => format!("Error: {}", err),
    }
}

// tamarin-core - Runtime core for the Tamarin programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! # tamarin-core
//!
//! Runtime core for the Tamarin programming language: the value model, the
//! bytecode instruction set, the builtin registry, and a reference
//! tree-walking evaluator. The bytecode compiler and virtual machine live
//! in `tamarin-vm`.
//!
//! # Quick Start
//!
//! ```
//! use tamarin_core::{Env, eval};
//! use tamarin_parser::parse;
//!
//! let program = parse("let x = 2; x * 21").unwrap();
//! let result = eval(&program, &Env::new()).unwrap();
//! assert_eq!(result.to_string(), "42");
//! ```

pub mod builtins;
pub mod code;
pub mod env;
pub mod error;
pub mod eval;
pub mod value;

pub use builtins::builtins;
pub use env::Env;
pub use error::{Error, Result};
pub use eval::{apply, eval};
pub use value::{
    Builtin, BuiltinFn, Closure, CompiledFunction, HashKey, HashKind, HashPair, TamarinFn,
    TamarinVal,
};

// Re-export parser types for convenience
pub use tamarin_parser::{Program, parse};

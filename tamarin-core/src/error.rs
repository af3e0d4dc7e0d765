// tamarin-core - Error types for the Tamarin runtime
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Error types shared by the evaluator and the builtin functions.

use std::fmt;

use crate::value::TamarinVal;

/// Result type for evaluation.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during evaluation.
#[derive(Debug, Clone)]
pub enum Error {
    /// Undefined identifier reference
    UndefinedVariable(String),
    /// Wrong number of arguments to a function
    ArityError { expected: usize, got: usize },
    /// Wrong number of arguments to a builtin
    WrongNumberOfArguments { got: usize, want: usize },
    /// A builtin received an argument kind it does not support
    UnsupportedArgument {
        builtin: &'static str,
        got: &'static str,
    },
    /// Type error - wrong type for an operation
    TypeError {
        expected: &'static str,
        got: String,
    },
    /// Unknown prefix or infix operator
    UnknownOperator(String),
    /// Attempted to call something that isn't callable
    NotCallable(&'static str),
    /// Division by zero
    DivisionByZero,
    /// Value kind cannot be used as a hash key
    Unhashable(&'static str),
    /// Index operator applied to an unsupported pair of kinds
    IndexNotSupported {
        left: &'static str,
        index: &'static str,
    },
    /// Return control flow (not a real error; unwinds to the enclosing
    /// function application, or to the program top level)
    Return(TamarinVal),
}

impl Error {
    /// Create a type error.
    pub fn type_error(expected: &'static str, got: impl Into<String>) -> Self {
        Error::TypeError {
            expected,
            got: got.into(),
        }
    }

    /// Create an arity error for a builtin call.
    pub fn wrong_number_of_arguments(got: usize, want: usize) -> Self {
        Error::WrongNumberOfArguments { got, want }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UndefinedVariable(name) => write!(f, "identifier not found: {}", name),
            Error::ArityError { expected, got } => {
                write!(
                    f,
                    "Wrong number of arguments: expected {}, got {}",
                    expected, got
                )
            }
            Error::WrongNumberOfArguments { got, want } => {
                write!(f, "wrong number of arguments. got={}, want={}", got, want)
            }
            Error::UnsupportedArgument { builtin, got } => {
                write!(f, "argument to '{}' not supported, got {}", builtin, got)
            }
            Error::TypeError { expected, got } => {
                write!(f, "Type error: expected {}, got {}", expected, got)
            }
            Error::UnknownOperator(op) => write!(f, "unknown operator: {}", op),
            Error::NotCallable(kind) => write!(f, "Value is not callable: {}", kind),
            Error::DivisionByZero => write!(f, "Division by zero"),
            Error::Unhashable(kind) => write!(f, "unusable as hash key: {}", kind),
            Error::IndexNotSupported { left, index } => {
                write!(f, "index operator not supported: {}[{}]", left, index)
            }
            Error::Return(_) => write!(f, "return outside of function"),
        }
    }
}

impl std::error::Error for Error {}

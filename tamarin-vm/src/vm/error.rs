// tamarin-vm - Bytecode compiler and virtual machine for the Tamarin programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Runtime errors for the VM.

use std::fmt;

/// Runtime error during VM execution.
#[derive(Debug, Clone)]
pub enum RuntimeError {
    /// Operand or frame stack exhausted.
    StackOverflow,
    /// Pop from an empty stack (corrupt bytecode).
    StackUnderflow,
    /// Type error.
    TypeError { expected: String, got: String },
    /// Division by zero.
    DivisionByZero,
    /// Not callable.
    NotCallable(String),
    /// Wrong number of arguments.
    ArityError { expected: usize, got: usize },
    /// Value kind cannot be used as a hash key.
    Unhashable(String),
    /// Index operator applied to an unsupported pair of kinds.
    IndexNotSupported { left: String, index: String },
    /// Byte that is not an opcode.
    UnknownOpcode(u8),
    /// A builtin function failed.
    Builtin(tamarin_core::Error),
    /// Internal error.
    Internal(String),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::StackOverflow => write!(f, "Stack overflow"),
            RuntimeError::StackUnderflow => write!(f, "Stack underflow"),
            RuntimeError::TypeError { expected, got } => {
                write!(f, "Type error: expected {}, got {}", expected, got)
            }
            RuntimeError::DivisionByZero => write!(f, "Division by zero"),
            RuntimeError::NotCallable(kind) => write!(f, "Value is not callable: {}", kind),
            RuntimeError::ArityError { expected, got } => {
                write!(
                    f,
                    "Wrong number of arguments: expected {}, got {}",
                    expected, got
                )
            }
            RuntimeError::Unhashable(kind) => write!(f, "unusable as hash key: {}", kind),
            RuntimeError::IndexNotSupported { left, index } => {
                write!(f, "index operator not supported: {}[{}]", left, index)
            }
            RuntimeError::UnknownOpcode(byte) => write!(f, "unknown opcode {}", byte),
            RuntimeError::Builtin(err) => write!(f, "{}", err),
            RuntimeError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for RuntimeError {}

impl From<tamarin_core::Error> for RuntimeError {
    /// Bridge errors surfaced by shared core code (builtins, hash-key
    /// construction) into VM runtime errors.
    fn from(err: tamarin_core::Error) -> Self {
        match err {
            tamarin_core::Error::Unhashable(kind) => RuntimeError::Unhashable(kind.to_string()),
            tamarin_core::Error::DivisionByZero => RuntimeError::DivisionByZero,
            other => RuntimeError::Builtin(other),
        }
    }
}

/// Result type for VM operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;

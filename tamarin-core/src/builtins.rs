// tamarin-core - Built-in functions
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Built-in functions for Tamarin.
//!
//! The registry order is part of the bytecode contract: `OpGetBuiltin`
//! operands index into it, so entries must never be reordered, only
//! appended.

use crate::error::{Error, Result};
use crate::value::{Builtin, TamarinVal};

/// The builtin registry, in `OpGetBuiltin` index order.
static BUILTINS: [Builtin; 6] = [
    Builtin { name: "len", func: builtin_len },
    Builtin { name: "puts", func: builtin_puts },
    Builtin { name: "first", func: builtin_first },
    Builtin { name: "last", func: builtin_last },
    Builtin { name: "rest", func: builtin_rest },
    Builtin { name: "push", func: builtin_push },
];

/// All builtins, in registry order.
#[must_use]
pub fn builtins() -> &'static [Builtin] {
    &BUILTINS
}

/// Look up a builtin by name.
#[must_use]
pub fn lookup(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|b| b.name == name)
}

fn check_arity(args: &[TamarinVal], want: usize) -> Result<()> {
    if args.len() != want {
        return Err(Error::wrong_number_of_arguments(args.len(), want));
    }
    Ok(())
}

/// `len(x)` - string length in bytes, or array element count.
fn builtin_len(args: &[TamarinVal]) -> Result<Option<TamarinVal>> {
    check_arity(args, 1)?;
    match &args[0] {
        TamarinVal::String(s) => Ok(Some(TamarinVal::Int(s.len() as i64))),
        TamarinVal::Array(elements) => Ok(Some(TamarinVal::Int(elements.len() as i64))),
        other => Err(Error::UnsupportedArgument {
            builtin: "len",
            got: other.type_name(),
        }),
    }
}

/// `puts(...)` - print each argument on its own line; produces nothing.
fn builtin_puts(args: &[TamarinVal]) -> Result<Option<TamarinVal>> {
    for arg in args {
        match arg {
            // Strings print raw, without quoting.
            TamarinVal::String(s) => println!("{}", s),
            other => println!("{}", other),
        }
    }
    Ok(None)
}

/// `first(xs)` - first array element, or null for an empty array.
fn builtin_first(args: &[TamarinVal]) -> Result<Option<TamarinVal>> {
    check_arity(args, 1)?;
    match &args[0] {
        TamarinVal::Array(elements) => Ok(Some(
            elements.front().cloned().unwrap_or(TamarinVal::Null),
        )),
        other => Err(Error::UnsupportedArgument {
            builtin: "first",
            got: other.type_name(),
        }),
    }
}

/// `last(xs)` - last array element, or null for an empty array.
fn builtin_last(args: &[TamarinVal]) -> Result<Option<TamarinVal>> {
    check_arity(args, 1)?;
    match &args[0] {
        TamarinVal::Array(elements) => Ok(Some(
            elements.back().cloned().unwrap_or(TamarinVal::Null),
        )),
        other => Err(Error::UnsupportedArgument {
            builtin: "last",
            got: other.type_name(),
        }),
    }
}

/// `rest(xs)` - all elements but the first, or null for an empty array.
fn builtin_rest(args: &[TamarinVal]) -> Result<Option<TamarinVal>> {
    check_arity(args, 1)?;
    match &args[0] {
        TamarinVal::Array(elements) => {
            if elements.is_empty() {
                Ok(Some(TamarinVal::Null))
            } else {
                Ok(Some(TamarinVal::Array(elements.skip(1))))
            }
        }
        other => Err(Error::UnsupportedArgument {
            builtin: "rest",
            got: other.type_name(),
        }),
    }
}

/// `push(xs, x)` - a new array with `x` appended; `xs` is unchanged.
fn builtin_push(args: &[TamarinVal]) -> Result<Option<TamarinVal>> {
    check_arity(args, 2)?;
    match &args[0] {
        TamarinVal::Array(elements) => {
            let mut next = elements.clone();
            next.push_back(args[1].clone());
            Ok(Some(TamarinVal::Array(next)))
        }
        other => Err(Error::UnsupportedArgument {
            builtin: "push",
            got: other.type_name(),
        }),
    }
}

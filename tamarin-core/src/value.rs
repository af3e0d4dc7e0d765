// tamarin-core - Value types for Tamarin
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Core value type for Tamarin.
//!
//! `TamarinVal` is the central enum representing all Tamarin values. Values
//! are immutable; compound values use reference counting or persistent
//! collections (`im`) so duplicating one on the VM stack is cheap and
//! never copies the payload.

use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::rc::Rc;

use im::{OrdMap, Vector};

use crate::code::Instructions;
use crate::env::Env;
use crate::error::{Error, Result};

use tamarin_parser::ast::Block;

/// The kind tag of a hashable value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HashKind {
    Integer,
    Boolean,
    String,
}

/// A stable hashing key: kind tag plus 64-bit digest.
///
/// Two hashable values with equal content produce equal keys; the kind tag
/// keeps `1`, `true` and `"1"` from colliding across kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HashKey {
    pub kind: HashKind,
    pub digest: u64,
}

/// A hash entry, keeping the original key so it can be displayed.
#[derive(Debug, Clone)]
pub struct HashPair {
    pub key: TamarinVal,
    pub value: TamarinVal,
}

impl PartialEq for HashPair {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.value == other.value
    }
}

/// A compiled function: an instruction stream plus its frame layout.
///
/// The instruction stream is immutable once the compiler has produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFunction {
    pub instructions: Instructions,
    /// Number of local slots the frame reserves (parameters included).
    pub num_locals: usize,
    pub num_parameters: usize,
}

/// A compiled function together with its captured free values.
///
/// `free` has exactly the length the compiler recorded in the matching
/// `OpClosure` instruction.
#[derive(Debug, Clone)]
pub struct Closure {
    pub func: Rc<CompiledFunction>,
    pub free: Vec<TamarinVal>,
}

/// A tree-walk function: parameters, body, and the captured environment.
#[derive(Debug, Clone)]
pub struct TamarinFn {
    pub parameters: Vec<String>,
    pub body: Block,
    pub env: Env,
}

/// Signature of a builtin function.
///
/// Returning `Ok(None)` means the builtin produced nothing; callers push
/// `Null` in its place.
pub type BuiltinFn = fn(&[TamarinVal]) -> Result<Option<TamarinVal>>;

/// A named builtin function.
#[derive(Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub func: BuiltinFn,
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Builtin({})", self.name)
    }
}

impl PartialEq for Builtin {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && std::ptr::fn_addr_eq(self.func, other.func)
    }
}

/// The core value type for Tamarin.
#[derive(Debug, Clone)]
pub enum TamarinVal {
    /// The null value, representing nothing/absence
    Null,
    /// Boolean true or false
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// Immutable string
    String(Rc<str>),
    /// Ordered sequence of values
    Array(Vector<TamarinVal>),
    /// Hash map from hashable keys to values
    Hash(OrdMap<HashKey, HashPair>),
    /// Tree-walk function (used by the reference evaluator)
    Function(Rc<TamarinFn>),
    /// Compiled function (instruction stream + frame layout)
    CompiledFunction(Rc<CompiledFunction>),
    /// Compiled function plus captured free values
    Closure(Rc<Closure>),
    /// Native builtin function
    Builtin(Builtin),
}

impl TamarinVal {
    /// Create a string value.
    pub fn string(s: impl Into<Rc<str>>) -> Self {
        TamarinVal::String(s.into())
    }

    /// Create an array value from an ordered sequence of elements.
    pub fn array(elements: impl IntoIterator<Item = TamarinVal>) -> Self {
        TamarinVal::Array(elements.into_iter().collect())
    }

    /// Build a hash value from key/value pairs, failing on unhashable keys.
    pub fn hash_from_pairs(
        pairs: impl IntoIterator<Item = (TamarinVal, TamarinVal)>,
    ) -> Result<Self> {
        let mut map = OrdMap::new();
        for (key, value) in pairs {
            let hash_key = key.hash_key()?;
            map.insert(hash_key, HashPair { key, value });
        }
        Ok(TamarinVal::Hash(map))
    }

    /// The kind name, for error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            TamarinVal::Null => "null",
            TamarinVal::Bool(_) => "boolean",
            TamarinVal::Int(_) => "integer",
            TamarinVal::String(_) => "string",
            TamarinVal::Array(_) => "array",
            TamarinVal::Hash(_) => "hash",
            TamarinVal::Function(_) => "function",
            TamarinVal::CompiledFunction(_) => "compiled-function",
            TamarinVal::Closure(_) => "closure",
            TamarinVal::Builtin(_) => "builtin",
        }
    }

    /// Truthiness: `false` and `null` are falsy, everything else is truthy
    /// (including the integer 0 and the empty string).
    #[inline]
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        !matches!(self, TamarinVal::Null | TamarinVal::Bool(false))
    }

    /// Compute the hashing key for this value.
    ///
    /// Only integers, booleans, and strings are hashable; every other kind
    /// fails with [`Error::Unhashable`].
    pub fn hash_key(&self) -> Result<HashKey> {
        match self {
            TamarinVal::Int(n) => Ok(HashKey {
                kind: HashKind::Integer,
                digest: *n as u64,
            }),
            TamarinVal::Bool(b) => Ok(HashKey {
                kind: HashKind::Boolean,
                digest: *b as u64,
            }),
            TamarinVal::String(s) => {
                // DefaultHasher::new() carries fixed keys, so digests are
                // stable for the lifetime of a VM (and across runs of the
                // same binary), which is all HashKey stability requires.
                let mut hasher = DefaultHasher::new();
                s.as_bytes().hash(&mut hasher);
                Ok(HashKey {
                    kind: HashKind::String,
                    digest: hasher.finish(),
                })
            }
            other => Err(Error::Unhashable(other.type_name())),
        }
    }
}

impl PartialEq for TamarinVal {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TamarinVal::Null, TamarinVal::Null) => true,
            (TamarinVal::Bool(a), TamarinVal::Bool(b)) => a == b,
            (TamarinVal::Int(a), TamarinVal::Int(b)) => a == b,
            (TamarinVal::String(a), TamarinVal::String(b)) => a == b,
            (TamarinVal::Array(a), TamarinVal::Array(b)) => a == b,
            (TamarinVal::Hash(a), TamarinVal::Hash(b)) => a == b,
            // Function kinds compare by identity
            (TamarinVal::Function(a), TamarinVal::Function(b)) => Rc::ptr_eq(a, b),
            (TamarinVal::CompiledFunction(a), TamarinVal::CompiledFunction(b)) => {
                Rc::ptr_eq(a, b)
            }
            (TamarinVal::Closure(a), TamarinVal::Closure(b)) => Rc::ptr_eq(a, b),
            (TamarinVal::Builtin(a), TamarinVal::Builtin(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for TamarinVal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TamarinVal::Null => write!(f, "null"),
            TamarinVal::Bool(b) => write!(f, "{}", b),
            TamarinVal::Int(n) => write!(f, "{}", n),
            TamarinVal::String(s) => write!(f, "\"{}\"", escape_string(s)),
            TamarinVal::Array(elements) => {
                write!(f, "[")?;
                for (i, elem) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", elem)?;
                }
                write!(f, "]")
            }
            TamarinVal::Hash(map) => {
                write!(f, "{{")?;
                for (i, pair) in map.values().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", pair.key, pair.value)?;
                }
                write!(f, "}}")
            }
            TamarinVal::Function(_) => write!(f, "#<fn>"),
            TamarinVal::CompiledFunction(_) => write!(f, "#<compiled-fn>"),
            TamarinVal::Closure(_) => write!(f, "#<closure>"),
            TamarinVal::Builtin(b) => write!(f, "#<builtin {}>", b.name),
        }
    }
}

fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_hash_keys_follow_content() {
        let hello1 = TamarinVal::string("Hello World");
        let hello2 = TamarinVal::string("Hello World");
        let diff = TamarinVal::string("My name is johnny");

        assert_eq!(hello1.hash_key().unwrap(), hello2.hash_key().unwrap());
        assert_ne!(hello1.hash_key().unwrap(), diff.hash_key().unwrap());
    }

    #[test]
    fn test_hash_keys_are_kind_tagged() {
        let int = TamarinVal::Int(1);
        let boolean = TamarinVal::Bool(true);
        assert_eq!(int.hash_key().unwrap().digest, 1);
        assert_eq!(boolean.hash_key().unwrap().digest, 1);
        assert_ne!(int.hash_key().unwrap(), boolean.hash_key().unwrap());
    }

    #[test]
    fn test_unhashable_kinds() {
        let arr = TamarinVal::array([TamarinVal::Int(1)]);
        assert!(matches!(arr.hash_key(), Err(Error::Unhashable("array"))));
        assert!(matches!(
            TamarinVal::Null.hash_key(),
            Err(Error::Unhashable("null"))
        ));
    }

    #[test]
    fn test_truthiness() {
        assert!(TamarinVal::Int(0).is_truthy());
        assert!(TamarinVal::string("").is_truthy());
        assert!(!TamarinVal::Bool(false).is_truthy());
        assert!(!TamarinVal::Null.is_truthy());
    }

    #[test]
    fn test_display() {
        let hash = TamarinVal::hash_from_pairs([(
            TamarinVal::string("a"),
            TamarinVal::Int(1),
        )])
        .unwrap();
        assert_eq!(hash.to_string(), "{\"a\": 1}");
        assert_eq!(
            TamarinVal::array([TamarinVal::Int(1), TamarinVal::Bool(true)]).to_string(),
            "[1, true]"
        );
        assert_eq!(TamarinVal::string("a\"b").to_string(), "\"a\\\"b\"");
    }
}

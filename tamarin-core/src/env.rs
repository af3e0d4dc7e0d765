// tamarin-core - Environment for lexical scoping
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Environment for variable bindings with lexical scoping.
//!
//! Used by the reference tree-walking evaluator; the VM resolves names at
//! compile time instead.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::value::TamarinVal;

/// A lexical environment for variable bindings.
///
/// Environments form a chain through parent references. Each environment
/// has its own bindings map and optionally a parent environment for outer
/// scope lookup. Cloning an `Env` is cheap and yields a handle to the same
/// scope, which is how function values capture their defining environment.
#[derive(Clone)]
pub struct Env {
    inner: Rc<RefCell<EnvInner>>,
}

struct EnvInner {
    bindings: HashMap<String, TamarinVal>,
    parent: Option<Env>,
}

impl Env {
    /// Create a new root environment with no parent.
    pub fn new() -> Self {
        Env {
            inner: Rc::new(RefCell::new(EnvInner {
                bindings: HashMap::new(),
                parent: None,
            })),
        }
    }

    /// Create a child environment with this environment as parent.
    #[must_use]
    pub fn child(&self) -> Self {
        Env {
            inner: Rc::new(RefCell::new(EnvInner {
                bindings: HashMap::new(),
                parent: Some(self.clone()),
            })),
        }
    }

    /// Define (or overwrite) a binding in this environment.
    pub fn define(&self, name: impl Into<String>, value: TamarinVal) {
        self.inner.borrow_mut().bindings.insert(name.into(), value);
    }

    /// Look up a binding, walking the parent chain on a miss.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<TamarinVal> {
        let inner = self.inner.borrow();
        if let Some(value) = inner.bindings.get(name) {
            return Some(value.clone());
        }
        inner.parent.as_ref().and_then(|parent| parent.lookup(name))
    }
}

impl Default for Env {
    fn default() -> Self {
        Env::new()
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Avoid recursing into captured function environments.
        let inner = self.inner.borrow();
        write!(
            f,
            "Env({} bindings{})",
            inner.bindings.len(),
            if inner.parent.is_some() { ", nested" } else { "" }
        )
    }
}

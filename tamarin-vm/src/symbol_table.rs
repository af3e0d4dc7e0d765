// tamarin-vm - Bytecode compiler and virtual machine for the Tamarin programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Symbol tables for compile-time scope resolution.
//!
//! Tables form a chain through outer references, one table per
//! compilation scope. Resolution walks outward and promotes locals of
//! enclosing functions to free variables on the way back in, recording the
//! original symbol so the enclosing compile site can emit the correct load
//! when it constructs the closure.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Where a resolved name lives at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolScope {
    /// Slot in the VM's globals array.
    Global,
    /// Frame-local slot.
    Local,
    /// Entry in the fixed builtin registry.
    Builtin,
    /// Captured value in the current closure.
    Free,
}

/// A resolved name: scope plus the slot index within that scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub scope: SymbolScope,
    pub index: usize,
}

/// A scope's symbol table.
///
/// Cloning yields a handle to the same table (the compiler keeps handles
/// to enclosing tables across `enter_scope` / `leave_scope`).
#[derive(Debug, Clone)]
pub struct SymbolTable {
    inner: Rc<RefCell<SymbolTableInner>>,
}

#[derive(Debug)]
struct SymbolTableInner {
    outer: Option<SymbolTable>,
    store: HashMap<String, Symbol>,
    /// Counts Global/Local defines in this table only; builtin and
    /// promoted free symbols do not occupy slots.
    num_definitions: usize,
    /// The original (outer-scope) symbol for each free variable captured
    /// here, in capture order.
    free_symbols: Vec<Symbol>,
}

impl SymbolTable {
    /// Create a new outermost (global) table.
    pub fn new() -> Self {
        SymbolTable {
            inner: Rc::new(RefCell::new(SymbolTableInner {
                outer: None,
                store: HashMap::new(),
                num_definitions: 0,
                free_symbols: Vec::new(),
            })),
        }
    }

    /// Create a table enclosed by this one.
    #[must_use]
    pub fn enclose(&self) -> Self {
        SymbolTable {
            inner: Rc::new(RefCell::new(SymbolTableInner {
                outer: Some(self.clone()),
                store: HashMap::new(),
                num_definitions: 0,
                free_symbols: Vec::new(),
            })),
        }
    }

    /// The enclosing table, if any.
    #[must_use]
    pub fn outer(&self) -> Option<SymbolTable> {
        self.inner.borrow().outer.clone()
    }

    /// Define a name in this table, assigning the next slot index.
    ///
    /// The outermost table defines into Global scope, every enclosed table
    /// into Local scope. Defining the same name twice overwrites the first
    /// definition.
    pub fn define(&self, name: impl Into<String>) -> Symbol {
        let name = name.into();
        let mut inner = self.inner.borrow_mut();
        let scope = if inner.outer.is_none() {
            SymbolScope::Global
        } else {
            SymbolScope::Local
        };
        let symbol = Symbol {
            name: name.clone(),
            scope,
            index: inner.num_definitions,
        };
        inner.num_definitions += 1;
        inner.store.insert(name, symbol.clone());
        symbol
    }

    /// Register a builtin under a caller-supplied registry index.
    ///
    /// Does not consume a definition slot; only meaningful on the
    /// outermost table.
    pub fn define_builtin(&self, index: usize, name: impl Into<String>) -> Symbol {
        let name = name.into();
        let symbol = Symbol {
            name: name.clone(),
            scope: SymbolScope::Builtin,
            index,
        };
        self.inner.borrow_mut().store.insert(name, symbol.clone());
        symbol
    }

    /// Resolve a name, walking outward through enclosing tables.
    ///
    /// Global and Builtin symbols pass through unchanged from any depth.
    /// A Local or Free symbol found in an enclosing table is captured into
    /// this table as a Free symbol, so every intermediate closure carries
    /// the value along the chain.
    pub fn resolve(&self, name: &str) -> Option<Symbol> {
        let outer = {
            let inner = self.inner.borrow();
            if let Some(symbol) = inner.store.get(name) {
                return Some(symbol.clone());
            }
            inner.outer.clone()?
        };

        let symbol = outer.resolve(name)?;
        match symbol.scope {
            SymbolScope::Global | SymbolScope::Builtin => Some(symbol),
            SymbolScope::Local | SymbolScope::Free => Some(self.define_free(symbol)),
        }
    }

    /// Capture an outer-scope symbol as a free variable of this table.
    fn define_free(&self, original: Symbol) -> Symbol {
        let mut inner = self.inner.borrow_mut();
        inner.free_symbols.push(original.clone());
        let symbol = Symbol {
            name: original.name.clone(),
            scope: SymbolScope::Free,
            index: inner.free_symbols.len() - 1,
        };
        inner.store.insert(original.name, symbol.clone());
        symbol
    }

    /// Number of Global/Local slots defined in this table.
    #[must_use]
    pub fn num_definitions(&self) -> usize {
        self.inner.borrow().num_definitions
    }

    /// The original symbols captured by this table, in capture order.
    #[must_use]
    pub fn free_symbols(&self) -> Vec<Symbol> {
        self.inner.borrow().free_symbols.clone()
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        SymbolTable::new()
    }
}

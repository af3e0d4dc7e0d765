// tamarin-vm - Bytecode compiler and virtual machine for the Tamarin programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Call frames for the VM.

use std::rc::Rc;

use tamarin_core::code::Instructions;
use tamarin_core::value::Closure;

/// A call frame on the VM's frame stack.
#[derive(Debug, Clone)]
pub struct Frame {
    /// The closure being executed (the main program is wrapped in one).
    pub closure: Rc<Closure>,

    /// Program counter into the closure's instructions.
    ///
    /// Starts at -1: the main loop pre-increments before fetching, so the
    /// first iteration lands on byte 0 and jump targets are stored as
    /// `target - 1`.
    pub pc: isize,

    /// Index of the first stack slot belonging to this frame's locals
    /// (arguments occupy the first `num_parameters` of them).
    pub base_pointer: usize,
}

impl Frame {
    /// Create a new call frame.
    pub fn new(closure: Rc<Closure>, base_pointer: usize) -> Self {
        Frame {
            closure,
            pc: -1,
            base_pointer,
        }
    }

    /// The instruction stream this frame executes.
    #[inline]
    #[must_use]
    pub fn instructions(&self) -> &Instructions {
        &self.closure.func.instructions
    }
}

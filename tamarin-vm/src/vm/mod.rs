// tamarin-vm - Bytecode compiler and virtual machine for the Tamarin programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Stack-based virtual machine for executing Tamarin bytecode.

pub mod error;
pub mod frame;
pub mod stack;

use std::rc::Rc;

use tamarin_core::builtins;
use tamarin_core::code::{Op, read_u8, read_u16};
use tamarin_core::value::{Builtin, Closure, CompiledFunction, TamarinVal};

use crate::compiler::Bytecode;

pub use error::{Result, RuntimeError};
pub use frame::Frame;
pub use stack::{STACK_SIZE, ValueStack};

/// Fixed globals array capacity.
pub const GLOBALS_SIZE: usize = 65536;

/// Fixed call-frame stack capacity.
pub const MAX_FRAMES: usize = 1024;

/// The Tamarin virtual machine.
///
/// Owns its operand stack, globals, and frame stack; holds the compiled
/// program's constant pool by value and its instruction streams through
/// the closures on the frame stack.
pub struct VM {
    constants: Vec<TamarinVal>,

    stack: ValueStack,
    globals: Vec<TamarinVal>,
    frames: Vec<Frame>,
}

impl VM {
    /// Create a VM for a compiled program.
    ///
    /// The top-level instructions are wrapped in a closure over an empty
    /// free list and pushed as the first frame, with `base_pointer` 0.
    pub fn new(bytecode: Bytecode) -> Self {
        VM::new_with_globals_store(bytecode, vec![TamarinVal::Null; GLOBALS_SIZE])
    }

    /// Create a VM that reuses an existing globals array (REPL state).
    pub fn new_with_globals_store(bytecode: Bytecode, globals: Vec<TamarinVal>) -> Self {
        let main_fn = CompiledFunction {
            instructions: bytecode.instructions,
            num_locals: 0,
            num_parameters: 0,
        };
        let main_closure = Closure {
            func: Rc::new(main_fn),
            free: Vec::new(),
        };
        let mut frames = Vec::with_capacity(MAX_FRAMES);
        frames.push(Frame::new(Rc::new(main_closure), 0));

        VM {
            constants: bytecode.constants,
            stack: ValueStack::new(),
            globals,
            frames,
        }
    }

    /// Take back the globals array after a run (REPL state).
    #[must_use]
    pub fn into_globals(self) -> Vec<TamarinVal> {
        self.globals
    }

    /// The value left behind by the final `OpPop` - the result of a
    /// program whose top level is an expression statement.
    #[must_use]
    pub fn last_popped_stack_elem(&self) -> TamarinVal {
        self.stack.last_popped()
    }

    /// The current top of the stack, or `None` when the stack is empty.
    /// A finished program leaves the stack empty.
    #[must_use]
    pub fn stack_top(&self) -> Option<TamarinVal> {
        match self.stack.sp() {
            0 => None,
            sp => Some(self.stack.get(sp - 1)),
        }
    }

    /// Run the program to completion.
    ///
    /// On error, execution aborts; globals written before the error remain
    /// visible but the VM is not meant to be resumed.
    pub fn run(&mut self) -> Result<()> {
        while self.current_frame().pc < self.current_frame().instructions().len() as isize - 1 {
            self.current_frame_mut().pc += 1;

            let frame = self.current_frame();
            let byte = frame.instructions().as_bytes()[frame.pc as usize];
            let op = Op::try_from(byte).map_err(RuntimeError::UnknownOpcode)?;

            match op {
                Op::Constant => {
                    let idx = self.read_u16_operand();
                    let constant = self.constant(idx)?;
                    self.stack.push(constant)?;
                }
                Op::Pop => {
                    self.stack.pop()?;
                }

                Op::Add | Op::Sub | Op::Mul | Op::Div => {
                    self.execute_binary_operation(op)?;
                }
                Op::Equal | Op::NotEqual | Op::GreaterThan => {
                    self.execute_comparison(op)?;
                }
                Op::Bang => {
                    let operand = self.stack.pop()?;
                    self.stack.push(TamarinVal::Bool(!operand.is_truthy()))?;
                }
                Op::Minus => {
                    let operand = self.stack.pop()?;
                    match operand {
                        TamarinVal::Int(n) => {
                            self.stack.push(TamarinVal::Int(n.wrapping_neg()))?;
                        }
                        other => {
                            return Err(RuntimeError::TypeError {
                                expected: "integer".into(),
                                got: other.type_name().into(),
                            });
                        }
                    }
                }

                Op::True => self.stack.push(TamarinVal::Bool(true))?,
                Op::False => self.stack.push(TamarinVal::Bool(false))?,
                Op::Null => self.stack.push(TamarinVal::Null)?,

                Op::Jump => {
                    let target = self.read_u16_operand();
                    self.current_frame_mut().pc = target as isize - 1;
                }
                Op::JumpNotTruthy => {
                    let target = self.read_u16_operand();
                    let condition = self.stack.pop()?;
                    if !condition.is_truthy() {
                        self.current_frame_mut().pc = target as isize - 1;
                    }
                }

                Op::GetGlobal => {
                    let idx = self.read_u16_operand();
                    let value = self.globals[idx].clone();
                    self.stack.push(value)?;
                }
                Op::SetGlobal => {
                    let idx = self.read_u16_operand();
                    self.globals[idx] = self.stack.pop()?;
                }
                Op::GetLocal => {
                    let idx = self.read_u8_operand();
                    let base = self.current_frame().base_pointer;
                    let value = self.stack.get(base + idx);
                    self.stack.push(value)?;
                }
                Op::SetLocal => {
                    let idx = self.read_u8_operand();
                    let base = self.current_frame().base_pointer;
                    let value = self.stack.pop()?;
                    self.stack.set(base + idx, value);
                }
                Op::GetBuiltin => {
                    let idx = self.read_u8_operand();
                    let builtin = builtins::builtins().get(idx).copied().ok_or_else(|| {
                        RuntimeError::Internal(format!("builtin index {} out of range", idx))
                    })?;
                    self.stack.push(TamarinVal::Builtin(builtin))?;
                }
                Op::GetFree => {
                    let idx = self.read_u8_operand();
                    let value = self.current_frame().closure.free[idx].clone();
                    self.stack.push(value)?;
                }

                Op::Array => {
                    let count = self.read_u16_operand();
                    let array = self.build_array(count);
                    self.stack.push(array)?;
                }
                Op::Hash => {
                    let count = self.read_u16_operand();
                    let hash = self.build_hash(count)?;
                    self.stack.push(hash)?;
                }
                Op::Index => {
                    let index = self.stack.pop()?;
                    let left = self.stack.pop()?;
                    self.execute_index(left, index)?;
                }

                Op::Call => {
                    let num_args = self.read_u8_operand();
                    self.execute_call(num_args)?;
                }
                Op::ReturnValue => {
                    let value = self.stack.pop()?;
                    if self.unwind_frame(value)? {
                        return Ok(());
                    }
                }
                Op::Return => {
                    if self.unwind_frame(TamarinVal::Null)? {
                        return Ok(());
                    }
                }

                Op::Closure => {
                    let const_idx = self.read_u16_operand();
                    let num_free = self.read_u8_operand();
                    self.push_closure(const_idx, num_free)?;
                }
            }
        }

        Ok(())
    }

    // =========================================================================
    // Fetch helpers
    // =========================================================================

    fn current_frame(&self) -> &Frame {
        self.frames.last().expect("no active frame")
    }

    fn current_frame_mut(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("no active frame")
    }

    /// Read the u16 operand following the current opcode, advancing pc
    /// past it.
    fn read_u16_operand(&mut self) -> usize {
        let frame = self.current_frame_mut();
        let pc = frame.pc as usize;
        let value = read_u16(&frame.closure.func.instructions.as_bytes()[pc + 1..]);
        frame.pc += 2;
        value as usize
    }

    /// Read the u8 operand following the current opcode, advancing pc
    /// past it.
    fn read_u8_operand(&mut self) -> usize {
        let frame = self.current_frame_mut();
        let pc = frame.pc as usize;
        let value = read_u8(&frame.closure.func.instructions.as_bytes()[pc + 1..]);
        frame.pc += 1;
        value as usize
    }

    fn constant(&self, idx: usize) -> Result<TamarinVal> {
        self.constants.get(idx).cloned().ok_or_else(|| {
            RuntimeError::Internal(format!("constant index {} out of range", idx))
        })
    }

    // =========================================================================
    // Arithmetic & comparison
    // =========================================================================

    fn execute_binary_operation(&mut self, op: Op) -> Result<()> {
        let right = self.stack.pop()?;
        let left = self.stack.pop()?;

        let result = match (&left, &right) {
            (TamarinVal::Int(l), TamarinVal::Int(r)) => {
                Self::execute_integer_operation(op, *l, *r)?
            }
            (TamarinVal::String(l), TamarinVal::String(r)) if op == Op::Add => {
                TamarinVal::string(format!("{}{}", l, r))
            }
            _ => {
                return Err(RuntimeError::TypeError {
                    expected: "matching operand kinds".into(),
                    got: format!(
                        "{} {} {}",
                        left.type_name(),
                        op_symbol(op),
                        right.type_name()
                    ),
                });
            }
        };

        self.stack.push(result)
    }

    /// Integer arithmetic wraps on overflow; division by zero is an error.
    fn execute_integer_operation(op: Op, left: i64, right: i64) -> Result<TamarinVal> {
        let result = match op {
            Op::Add => left.wrapping_add(right),
            Op::Sub => left.wrapping_sub(right),
            Op::Mul => left.wrapping_mul(right),
            Op::Div => {
                if right == 0 {
                    return Err(RuntimeError::DivisionByZero);
                }
                left.wrapping_div(right)
            }
            _ => unreachable!("non-arithmetic opcode {:?}", op),
        };
        Ok(TamarinVal::Int(result))
    }

    fn execute_comparison(&mut self, op: Op) -> Result<()> {
        let right = self.stack.pop()?;
        let left = self.stack.pop()?;

        let result = match (&left, &right) {
            (TamarinVal::Int(l), TamarinVal::Int(r)) => match op {
                Op::Equal => l == r,
                Op::NotEqual => l != r,
                Op::GreaterThan => l > r,
                _ => unreachable!("non-comparison opcode {:?}", op),
            },
            _ => match op {
                Op::Equal => left == right,
                Op::NotEqual => left != right,
                _ => {
                    return Err(RuntimeError::TypeError {
                        expected: "integers".into(),
                        got: format!(
                            "{} {} {}",
                            left.type_name(),
                            op_symbol(op),
                            right.type_name()
                        ),
                    });
                }
            },
        };

        self.stack.push(TamarinVal::Bool(result))
    }

    // =========================================================================
    // Composite literals & indexing
    // =========================================================================

    fn build_array(&mut self, count: usize) -> TamarinVal {
        let sp = self.stack.sp();
        let elements: Vec<TamarinVal> = self.stack.slice(sp - count, sp).to_vec();
        self.stack.set_sp(sp - count);
        TamarinVal::array(elements)
    }

    fn build_hash(&mut self, count: usize) -> Result<TamarinVal> {
        let sp = self.stack.sp();
        let pairs: Vec<(TamarinVal, TamarinVal)> = self
            .stack
            .slice(sp - count, sp)
            .chunks(2)
            .map(|pair| (pair[0].clone(), pair[1].clone()))
            .collect();
        self.stack.set_sp(sp - count);
        Ok(TamarinVal::hash_from_pairs(pairs)?)
    }

    fn execute_index(&mut self, left: TamarinVal, index: TamarinVal) -> Result<()> {
        let result = match (&left, &index) {
            (TamarinVal::Array(elements), TamarinVal::Int(i)) => {
                // Out of range (either side) is null, not an error.
                if *i < 0 {
                    TamarinVal::Null
                } else {
                    elements
                        .get(*i as usize)
                        .cloned()
                        .unwrap_or(TamarinVal::Null)
                }
            }
            (TamarinVal::Hash(map), key) => {
                let hash_key = key.hash_key()?;
                map.get(&hash_key)
                    .map(|pair| pair.value.clone())
                    .unwrap_or(TamarinVal::Null)
            }
            _ => {
                return Err(RuntimeError::IndexNotSupported {
                    left: left.type_name().into(),
                    index: index.type_name().into(),
                });
            }
        };
        self.stack.push(result)
    }

    // =========================================================================
    // Calls, returns, closures
    // =========================================================================

    fn execute_call(&mut self, num_args: usize) -> Result<()> {
        let callee = self.stack.get(self.stack.sp() - 1 - num_args);
        match callee {
            TamarinVal::Closure(closure) => self.call_closure(closure, num_args),
            TamarinVal::Builtin(builtin) => self.call_builtin(builtin, num_args),
            other => Err(RuntimeError::NotCallable(other.type_name().into())),
        }
    }

    fn call_closure(&mut self, closure: Rc<Closure>, num_args: usize) -> Result<()> {
        if num_args != closure.func.num_parameters {
            return Err(RuntimeError::ArityError {
                expected: closure.func.num_parameters,
                got: num_args,
            });
        }
        if self.frames.len() >= MAX_FRAMES {
            return Err(RuntimeError::StackOverflow);
        }

        let base_pointer = self.stack.sp() - num_args;
        if base_pointer + closure.func.num_locals > STACK_SIZE {
            return Err(RuntimeError::StackOverflow);
        }

        // Arguments already sit in the first num_parameters local slots;
        // the remaining locals are reserved by bumping sp.
        self.stack.set_sp(base_pointer + closure.func.num_locals);
        self.frames.push(Frame::new(closure, base_pointer));
        Ok(())
    }

    fn call_builtin(&mut self, builtin: Builtin, num_args: usize) -> Result<()> {
        let sp = self.stack.sp();
        let args = self.stack.slice(sp - num_args, sp).to_vec();

        let result = (builtin.func)(&args)?;

        // Drop the arguments and the callee, then push the result.
        self.stack.set_sp(sp - num_args - 1);
        self.stack.push(result.unwrap_or(TamarinVal::Null))
    }

    /// Pop the current frame and push `value` as the call's result.
    ///
    /// Returns true when the main frame was unwound (a top-level
    /// `return`), which ends the program with `value` as its result.
    fn unwind_frame(&mut self, value: TamarinVal) -> Result<bool> {
        let frame = self.frames.pop().expect("no frame to unwind");

        if self.frames.is_empty() {
            // Push-then-pop leaves the value where last_popped finds it.
            self.stack.set_sp(frame.base_pointer);
            self.stack.push(value)?;
            self.stack.pop()?;
            return Ok(true);
        }

        // base_pointer - 1 also removes the callee itself.
        self.stack.set_sp(frame.base_pointer - 1);
        self.stack.push(value)?;
        Ok(false)
    }

    fn push_closure(&mut self, const_idx: usize, num_free: usize) -> Result<()> {
        let func = match self.constant(const_idx)? {
            TamarinVal::CompiledFunction(func) => func,
            other => {
                return Err(RuntimeError::Internal(format!(
                    "closure constant is a {}, not a compiled function",
                    other.type_name()
                )));
            }
        };

        let sp = self.stack.sp();
        let free = self.stack.slice(sp - num_free, sp).to_vec();
        self.stack.set_sp(sp - num_free);

        self.stack
            .push(TamarinVal::Closure(Rc::new(Closure { func, free })))
    }
}

fn op_symbol(op: Op) -> &'static str {
    match op {
        Op::Add => "+",
        Op::Sub => "-",
        Op::Mul => "*",
        Op::Div => "/",
        Op::Equal => "==",
        Op::NotEqual => "!=",
        Op::GreaterThan => ">",
        _ => "?",
    }
}

// tamarin-vm - Bytecode compiler and virtual machine for the Tamarin programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Code generation: AST walking and instruction emission.

use std::rc::Rc;

use tamarin_core::builtins;
use tamarin_core::code::{Instructions, Op, make};
use tamarin_core::value::{CompiledFunction, TamarinVal};

use tamarin_parser::ast::{Block, Expr, Program, Stmt};

use crate::symbol_table::{Symbol, SymbolScope, SymbolTable};

use super::{Bytecode, CompileError, Result};

/// Jump operand placeholder, patched once the target offset is known.
const PLACEHOLDER_TARGET: usize = 0xC0FE;

/// The opcode and byte position of an emitted instruction.
#[derive(Debug, Clone, Copy)]
struct EmittedInstruction {
    opcode: Op,
    position: usize,
}

/// Instruction buffer for one function being compiled.
///
/// The last two emitted instructions are tracked so the compiler can strip
/// a trailing `OpPop` (if-expression arms, implicit returns) and rewrite it
/// in place.
#[derive(Debug, Default)]
struct CompilationScope {
    instructions: Instructions,
    last_instruction: Option<EmittedInstruction>,
    previous_instruction: Option<EmittedInstruction>,
}

/// The bytecode compiler.
pub struct Compiler {
    constants: Vec<TamarinVal>,
    symbol_table: SymbolTable,
    scopes: Vec<CompilationScope>,
}

impl Compiler {
    /// Create a compiler with a fresh global scope and constant pool.
    ///
    /// Every builtin is registered into the outermost symbol table under
    /// its registry index.
    pub fn new() -> Self {
        let symbol_table = SymbolTable::new();
        for (index, builtin) in builtins::builtins().iter().enumerate() {
            symbol_table.define_builtin(index, builtin.name);
        }
        Compiler {
            constants: Vec::new(),
            symbol_table,
            scopes: vec![CompilationScope::default()],
        }
    }

    /// Create a compiler that continues from existing REPL state.
    pub fn new_with_state(symbol_table: SymbolTable, constants: Vec<TamarinVal>) -> Self {
        Compiler {
            constants,
            symbol_table,
            scopes: vec![CompilationScope::default()],
        }
    }

    /// Compile a program, returning its bytecode.
    pub fn compile(&mut self, program: &Program) -> Result<Bytecode> {
        for stmt in &program.statements {
            self.compile_statement(stmt)?;
        }
        Ok(self.bytecode())
    }

    /// Snapshot the current main-scope instructions and constant pool.
    #[must_use]
    pub fn bytecode(&self) -> Bytecode {
        Bytecode {
            instructions: self.scopes[0].instructions.clone(),
            constants: self.constants.clone(),
        }
    }

    /// Handle to the compiler's global symbol table (for REPL state).
    #[must_use]
    pub fn symbol_table(&self) -> SymbolTable {
        self.symbol_table.clone()
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn compile_statement(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Expr(expr) => {
                self.compile_expression(expr)?;
                self.emit(Op::Pop, &[]);
                Ok(())
            }
            Stmt::Let { name, value } => {
                // Defined before the value is compiled, so the value can
                // refer to the name (recursive functions).
                let symbol = self.symbol_table.define(name.clone());
                self.compile_expression(value)?;
                match symbol.scope {
                    SymbolScope::Global => self.emit(Op::SetGlobal, &[symbol.index]),
                    _ => self.emit(Op::SetLocal, &[symbol.index]),
                };
                Ok(())
            }
            Stmt::Return(value) => {
                self.compile_expression(value)?;
                self.emit(Op::ReturnValue, &[]);
                Ok(())
            }
        }
    }

    fn compile_block(&mut self, block: &Block) -> Result<()> {
        for stmt in &block.statements {
            self.compile_statement(stmt)?;
        }
        Ok(())
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn compile_expression(&mut self, expr: &Expr) -> Result<()> {
        match expr {
            Expr::Int(n) => {
                let idx = self.add_constant(TamarinVal::Int(*n))?;
                self.emit(Op::Constant, &[idx]);
                Ok(())
            }
            Expr::String(s) => {
                let idx = self.add_constant(TamarinVal::string(s.as_str()))?;
                self.emit(Op::Constant, &[idx]);
                Ok(())
            }
            Expr::Bool(b) => {
                self.emit(if *b { Op::True } else { Op::False }, &[]);
                Ok(())
            }
            Expr::Ident(name) => {
                let symbol = self
                    .symbol_table
                    .resolve(name)
                    .ok_or_else(|| CompileError::UndefinedVariable(name.clone()))?;
                self.load_symbol(&symbol);
                Ok(())
            }
            Expr::Prefix { operator, right } => {
                self.compile_expression(right)?;
                match operator.as_str() {
                    "!" => self.emit(Op::Bang, &[]),
                    "-" => self.emit(Op::Minus, &[]),
                    other => return Err(CompileError::UnknownOperator(other.to_string())),
                };
                Ok(())
            }
            Expr::Infix {
                operator,
                left,
                right,
            } => self.compile_infix(operator, left, right),
            Expr::If {
                condition,
                consequence,
                alternative,
            } => self.compile_if(condition, consequence, alternative.as_ref()),
            Expr::Array(elements) => {
                for elem in elements {
                    self.compile_expression(elem)?;
                }
                self.emit(Op::Array, &[elements.len()]);
                Ok(())
            }
            Expr::Hash(pairs) => self.compile_hash(pairs),
            Expr::Index { left, index } => {
                self.compile_expression(left)?;
                self.compile_expression(index)?;
                self.emit(Op::Index, &[]);
                Ok(())
            }
            Expr::Function { parameters, body } => self.compile_function(parameters, body),
            Expr::Call {
                function,
                arguments,
            } => {
                self.compile_expression(function)?;
                if arguments.len() > u8::MAX as usize {
                    return Err(CompileError::TooManyArguments);
                }
                for arg in arguments {
                    self.compile_expression(arg)?;
                }
                self.emit(Op::Call, &[arguments.len()]);
                Ok(())
            }
        }
    }

    fn compile_infix(&mut self, operator: &str, left: &Expr, right: &Expr) -> Result<()> {
        // There is no less-than opcode: `a < b` compiles as `b > a`.
        if operator == "<" {
            self.compile_expression(right)?;
            self.compile_expression(left)?;
            self.emit(Op::GreaterThan, &[]);
            return Ok(());
        }

        self.compile_expression(left)?;
        self.compile_expression(right)?;
        match operator {
            "+" => self.emit(Op::Add, &[]),
            "-" => self.emit(Op::Sub, &[]),
            "*" => self.emit(Op::Mul, &[]),
            "/" => self.emit(Op::Div, &[]),
            ">" => self.emit(Op::GreaterThan, &[]),
            "==" => self.emit(Op::Equal, &[]),
            "!=" => self.emit(Op::NotEqual, &[]),
            other => return Err(CompileError::UnknownOperator(other.to_string())),
        };
        Ok(())
    }

    fn compile_if(
        &mut self,
        condition: &Expr,
        consequence: &Block,
        alternative: Option<&Block>,
    ) -> Result<()> {
        self.compile_expression(condition)?;

        let jump_not_truthy = self.emit_jump(Op::JumpNotTruthy);

        self.compile_expression_block(consequence)?;

        let jump_over_alternative = self.emit_jump(Op::Jump);
        self.patch_jump(jump_not_truthy);

        match alternative {
            Some(alternative) => self.compile_expression_block(alternative)?,
            None => {
                self.emit(Op::Null, &[]);
            }
        }

        self.patch_jump(jump_over_alternative);
        Ok(())
    }

    /// Compile a block in expression position: its trailing `OpPop` is
    /// stripped so the block's last expression stays on the stack, and an
    /// empty block yields null.
    fn compile_expression_block(&mut self, block: &Block) -> Result<()> {
        if block.statements.is_empty() {
            self.emit(Op::Null, &[]);
            return Ok(());
        }
        self.compile_block(block)?;
        if self.last_instruction_is(Op::Pop) {
            self.remove_last_pop();
        }
        Ok(())
    }

    fn compile_hash(&mut self, pairs: &[(Expr, Expr)]) -> Result<()> {
        // Sort keys by printed form so compiling the same literal twice
        // produces byte-identical constant-pool and instruction output.
        let mut sorted: Vec<&(Expr, Expr)> = pairs.iter().collect();
        sorted.sort_by_key(|(key, _)| key.to_string());

        for (key, value) in sorted {
            self.compile_expression(key)?;
            self.compile_expression(value)?;
        }
        self.emit(Op::Hash, &[pairs.len() * 2]);
        Ok(())
    }

    fn compile_function(&mut self, parameters: &[String], body: &Block) -> Result<()> {
        if parameters.len() > u8::MAX as usize {
            return Err(CompileError::TooManyParameters);
        }

        self.enter_scope();
        for parameter in parameters {
            self.symbol_table.define(parameter.clone());
        }

        self.compile_block(body)?;

        // Implicit return: the body's last expression becomes the return
        // value; a body that ends some other way returns null.
        if self.last_instruction_is(Op::Pop) {
            self.replace_last_pop_with_return();
        }
        if !self.last_instruction_is(Op::ReturnValue) {
            self.emit(Op::Return, &[]);
        }

        let free_symbols = self.symbol_table.free_symbols();
        let num_locals = self.symbol_table.num_definitions();
        if num_locals > u8::MAX as usize {
            return Err(CompileError::TooManyLocals);
        }
        let instructions = self.leave_scope();

        // Load each captured value in the enclosing scope; OpClosure pops
        // them into the closure being built.
        for symbol in &free_symbols {
            self.load_symbol(symbol);
        }

        let func = CompiledFunction {
            instructions,
            num_locals,
            num_parameters: parameters.len(),
        };
        let idx = self.add_constant(TamarinVal::CompiledFunction(Rc::new(func)))?;
        self.emit(Op::Closure, &[idx, free_symbols.len()]);
        Ok(())
    }

    // =========================================================================
    // Emission helpers
    // =========================================================================

    /// Append a constant to the pool, returning its index.
    fn add_constant(&mut self, value: TamarinVal) -> Result<usize> {
        let idx = self.constants.len();
        if idx > u16::MAX as usize {
            return Err(CompileError::TooManyConstants);
        }
        self.constants.push(value);
        Ok(idx)
    }

    /// Emit an instruction into the current scope, returning its byte
    /// position.
    fn emit(&mut self, op: Op, operands: &[usize]) -> usize {
        let ins = make(op, operands);
        let scope = self.current_scope_mut();
        let position = scope.instructions.len();
        scope.instructions.extend(&ins);
        scope.previous_instruction = scope.last_instruction;
        scope.last_instruction = Some(EmittedInstruction {
            opcode: op,
            position,
        });
        position
    }

    /// Emit a jump with a placeholder target, returning its position for
    /// patching.
    fn emit_jump(&mut self, op: Op) -> usize {
        self.emit(op, &[PLACEHOLDER_TARGET])
    }

    /// Patch the jump at `position` to target the current offset.
    fn patch_jump(&mut self, position: usize) {
        let target = self.current_scope_mut().instructions.len();
        self.change_operand(position, target);
    }

    fn change_operand(&mut self, position: usize, operand: usize) {
        let scope = self.current_scope_mut();
        let op = Op::try_from(scope.instructions.0[position])
            .expect("change_operand on a non-instruction offset");
        let ins = make(op, &[operand]);
        scope.instructions.0[position..position + ins.len()].copy_from_slice(ins.as_bytes());
    }

    fn last_instruction_is(&self, op: Op) -> bool {
        matches!(
            self.scopes.last().and_then(|s| s.last_instruction),
            Some(last) if last.opcode == op
        )
    }

    /// Drop the trailing `OpPop` of the current scope.
    fn remove_last_pop(&mut self) {
        let scope = self.current_scope_mut();
        let last = scope.last_instruction.expect("no instruction to remove");
        scope.instructions.0.truncate(last.position);
        scope.last_instruction = scope.previous_instruction;
        scope.previous_instruction = None;
    }

    /// Rewrite the trailing `OpPop` in place as `OpReturnValue`.
    fn replace_last_pop_with_return(&mut self) {
        let scope = self.current_scope_mut();
        let last = scope.last_instruction.as_mut().expect("no trailing pop");
        scope.instructions.0[last.position] = Op::ReturnValue as u8;
        last.opcode = Op::ReturnValue;
    }

    /// Emit the load matching a symbol's scope.
    fn load_symbol(&mut self, symbol: &Symbol) {
        match symbol.scope {
            SymbolScope::Global => self.emit(Op::GetGlobal, &[symbol.index]),
            SymbolScope::Local => self.emit(Op::GetLocal, &[symbol.index]),
            SymbolScope::Builtin => self.emit(Op::GetBuiltin, &[symbol.index]),
            SymbolScope::Free => self.emit(Op::GetFree, &[symbol.index]),
        };
    }

    // =========================================================================
    // Scopes
    // =========================================================================

    fn current_scope_mut(&mut self) -> &mut CompilationScope {
        self.scopes.last_mut().expect("no compilation scope")
    }

    /// Push a fresh instruction buffer and enter an enclosed symbol table.
    fn enter_scope(&mut self) {
        self.scopes.push(CompilationScope::default());
        self.symbol_table = self.symbol_table.enclose();
    }

    /// Pop the current instruction buffer and restore the outer symbol
    /// table.
    fn leave_scope(&mut self) -> Instructions {
        let scope = self.scopes.pop().expect("leave_scope without enter_scope");
        self.symbol_table = self
            .symbol_table
            .outer()
            .expect("left the outermost symbol table");
        scope.instructions
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Compiler::new()
    }
}

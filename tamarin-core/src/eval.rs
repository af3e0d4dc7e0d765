// tamarin-core - Tree-walking evaluator for Tamarin
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Reference tree-walking evaluator.
//!
//! An AST-walking interpreter with the same observable semantics as the
//! bytecode VM in `tamarin-vm`. It backs the `--bench` engine comparison
//! and serves as the oracle for the VM's property tests.

use std::rc::Rc;

use tamarin_parser::ast::{Block, Expr, Program, Stmt};

use crate::builtins;
use crate::env::Env;
use crate::error::{Error, Result};
use crate::value::{Builtin, TamarinFn, TamarinVal};

/// Evaluate a program.
///
/// The result is the value of the last top-level expression statement
/// (mirroring the VM's `last_popped_stack_elem`), or null if there is
/// none. A top-level `return` ends the program with the returned value.
pub fn eval(program: &Program, env: &Env) -> Result<TamarinVal> {
    let mut result = TamarinVal::Null;
    for stmt in &program.statements {
        match eval_statement(stmt, env) {
            Ok(Some(value)) => result = value,
            Ok(None) => {}
            Err(Error::Return(value)) => return Ok(value),
            Err(err) => return Err(err),
        }
    }
    Ok(result)
}

/// Evaluate a statement; `Some` for expression statements, `None` for
/// statements that produce no value.
fn eval_statement(stmt: &Stmt, env: &Env) -> Result<Option<TamarinVal>> {
    match stmt {
        Stmt::Let { name, value } => {
            let value = eval_expression(value, env)?;
            env.define(name.clone(), value);
            Ok(None)
        }
        Stmt::Return(value) => {
            let value = eval_expression(value, env)?;
            Err(Error::Return(value))
        }
        Stmt::Expr(expr) => eval_expression(expr, env).map(Some),
    }
}

/// Evaluate a block; its value is the last expression statement's value,
/// or null if the block is empty or ends in a `let`.
fn eval_block(block: &Block, env: &Env) -> Result<TamarinVal> {
    let mut result = TamarinVal::Null;
    for stmt in &block.statements {
        match eval_statement(stmt, env)? {
            Some(value) => result = value,
            None => result = TamarinVal::Null,
        }
    }
    Ok(result)
}

fn eval_expression(expr: &Expr, env: &Env) -> Result<TamarinVal> {
    match expr {
        Expr::Int(n) => Ok(TamarinVal::Int(*n)),
        Expr::String(s) => Ok(TamarinVal::string(s.as_str())),
        Expr::Bool(b) => Ok(TamarinVal::Bool(*b)),
        Expr::Ident(name) => eval_identifier(name, env),
        Expr::Prefix { operator, right } => {
            let right = eval_expression(right, env)?;
            eval_prefix(operator, right)
        }
        Expr::Infix {
            operator,
            left,
            right,
        } => {
            let left = eval_expression(left, env)?;
            let right = eval_expression(right, env)?;
            eval_infix(operator, left, right)
        }
        Expr::If {
            condition,
            consequence,
            alternative,
        } => {
            let condition = eval_expression(condition, env)?;
            if condition.is_truthy() {
                eval_block(consequence, env)
            } else if let Some(alternative) = alternative {
                eval_block(alternative, env)
            } else {
                Ok(TamarinVal::Null)
            }
        }
        Expr::Function { parameters, body } => {
            Ok(TamarinVal::Function(Rc::new(TamarinFn {
                parameters: parameters.clone(),
                body: body.clone(),
                env: env.clone(),
            })))
        }
        Expr::Call {
            function,
            arguments,
        } => {
            let callee = eval_expression(function, env)?;
            let mut args = Vec::with_capacity(arguments.len());
            for arg in arguments {
                args.push(eval_expression(arg, env)?);
            }
            apply(&callee, &args)
        }
        Expr::Array(elements) => {
            let mut out = Vec::with_capacity(elements.len());
            for elem in elements {
                out.push(eval_expression(elem, env)?);
            }
            Ok(TamarinVal::array(out))
        }
        Expr::Hash(pairs) => {
            let mut out = Vec::with_capacity(pairs.len());
            for (key, value) in pairs {
                let key = eval_expression(key, env)?;
                let value = eval_expression(value, env)?;
                out.push((key, value));
            }
            TamarinVal::hash_from_pairs(out)
        }
        Expr::Index { left, index } => {
            let left = eval_expression(left, env)?;
            let index = eval_expression(index, env)?;
            eval_index(left, index)
        }
    }
}

fn eval_identifier(name: &str, env: &Env) -> Result<TamarinVal> {
    if let Some(value) = env.lookup(name) {
        return Ok(value);
    }
    if let Some(builtin) = builtins::lookup(name) {
        return Ok(TamarinVal::Builtin(*builtin));
    }
    Err(Error::UndefinedVariable(name.to_string()))
}

fn eval_prefix(operator: &str, right: TamarinVal) -> Result<TamarinVal> {
    match operator {
        "!" => Ok(TamarinVal::Bool(!right.is_truthy())),
        "-" => match right {
            TamarinVal::Int(n) => Ok(TamarinVal::Int(n.wrapping_neg())),
            other => Err(Error::type_error("integer", other.type_name())),
        },
        other => Err(Error::UnknownOperator(other.to_string())),
    }
}

fn eval_infix(operator: &str, left: TamarinVal, right: TamarinVal) -> Result<TamarinVal> {
    match (&left, &right) {
        (TamarinVal::Int(l), TamarinVal::Int(r)) => eval_integer_infix(operator, *l, *r),
        (TamarinVal::String(l), TamarinVal::String(r)) if operator == "+" => {
            Ok(TamarinVal::string(format!("{}{}", l, r)))
        }
        _ => match operator {
            "==" => Ok(TamarinVal::Bool(left == right)),
            "!=" => Ok(TamarinVal::Bool(left != right)),
            "+" | "-" | "*" | "/" | "<" | ">" => Err(Error::type_error(
                "matching operand kinds",
                format!("{} {} {}", left.type_name(), operator, right.type_name()),
            )),
            other => Err(Error::UnknownOperator(other.to_string())),
        },
    }
}

/// Integer arithmetic wraps on overflow; division by zero is an error.
fn eval_integer_infix(operator: &str, left: i64, right: i64) -> Result<TamarinVal> {
    match operator {
        "+" => Ok(TamarinVal::Int(left.wrapping_add(right))),
        "-" => Ok(TamarinVal::Int(left.wrapping_sub(right))),
        "*" => Ok(TamarinVal::Int(left.wrapping_mul(right))),
        "/" => {
            if right == 0 {
                Err(Error::DivisionByZero)
            } else {
                Ok(TamarinVal::Int(left.wrapping_div(right)))
            }
        }
        "<" => Ok(TamarinVal::Bool(left < right)),
        ">" => Ok(TamarinVal::Bool(left > right)),
        "==" => Ok(TamarinVal::Bool(left == right)),
        "!=" => Ok(TamarinVal::Bool(left != right)),
        other => Err(Error::UnknownOperator(other.to_string())),
    }
}

/// Apply a callable value to evaluated arguments.
pub fn apply(callee: &TamarinVal, args: &[TamarinVal]) -> Result<TamarinVal> {
    match callee {
        TamarinVal::Function(func) => apply_function(func, args),
        TamarinVal::Builtin(builtin) => apply_builtin(builtin, args),
        other => Err(Error::NotCallable(other.type_name())),
    }
}

fn apply_function(func: &TamarinFn, args: &[TamarinVal]) -> Result<TamarinVal> {
    if args.len() != func.parameters.len() {
        return Err(Error::ArityError {
            expected: func.parameters.len(),
            got: args.len(),
        });
    }

    let scope = func.env.child();
    for (parameter, arg) in func.parameters.iter().zip(args) {
        scope.define(parameter.clone(), arg.clone());
    }

    match eval_block(&func.body, &scope) {
        Ok(value) => Ok(value),
        Err(Error::Return(value)) => Ok(value),
        Err(err) => Err(err),
    }
}

fn apply_builtin(builtin: &Builtin, args: &[TamarinVal]) -> Result<TamarinVal> {
    Ok((builtin.func)(args)?.unwrap_or(TamarinVal::Null))
}

fn eval_index(left: TamarinVal, index: TamarinVal) -> Result<TamarinVal> {
    match (&left, &index) {
        (TamarinVal::Array(elements), TamarinVal::Int(i)) => {
            if *i < 0 {
                return Ok(TamarinVal::Null);
            }
            Ok(elements
                .get(*i as usize)
                .cloned()
                .unwrap_or(TamarinVal::Null))
        }
        (TamarinVal::Hash(map), key) => {
            let hash_key = key.hash_key()?;
            Ok(map
                .get(&hash_key)
                .map(|pair| pair.value.clone())
                .unwrap_or(TamarinVal::Null))
        }
        _ => Err(Error::IndexNotSupported {
            left: left.type_name(),
            index: index.type_name(),
        }),
    }
}

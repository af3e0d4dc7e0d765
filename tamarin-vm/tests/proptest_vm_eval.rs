// tamarin-vm - Property-based engine-equivalence tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Property-based tests pitting the VM against the reference tree-walking
//! evaluator: for random small programs built from arithmetic,
//! let-bindings, and if-expressions over integers and booleans, both
//! engines must agree on the result (or both must fail).

use proptest::prelude::*;

use tamarin_core::{Env, eval};
use tamarin_parser::ast::{Block, Expr, Program, Stmt};
use tamarin_vm::{Compiler, VM};

// =============================================================================
// Strategies
// =============================================================================

/// Wrap an expression as a single-statement block.
fn block(expr: Expr) -> Block {
    Block {
        statements: vec![Stmt::Expr(expr)],
    }
}

/// Expressions over integer/boolean literals and the predefined globals
/// `a`, `b` (integers) and `c` (boolean).
fn arb_expr() -> impl Strategy<Value = Expr> {
    let leaf = prop_oneof![
        any::<i64>().prop_map(Expr::Int),
        any::<bool>().prop_map(Expr::Bool),
        Just(Expr::Ident("a".to_string())),
        Just(Expr::Ident("b".to_string())),
        Just(Expr::Ident("c".to_string())),
    ];

    leaf.prop_recursive(4, 48, 3, |inner| {
        let infix_op = prop_oneof![
            Just("+"),
            Just("-"),
            Just("*"),
            Just("/"),
            Just("<"),
            Just(">"),
            Just("=="),
            Just("!="),
        ];
        let prefix_op = prop_oneof![Just("!"), Just("-")];

        prop_oneof![
            (inner.clone(), infix_op, inner.clone()).prop_map(|(left, operator, right)| {
                Expr::Infix {
                    operator: operator.to_string(),
                    left: Box::new(left),
                    right: Box::new(right),
                }
            }),
            (prefix_op, inner.clone()).prop_map(|(operator, right)| Expr::Prefix {
                operator: operator.to_string(),
                right: Box::new(right),
            }),
            (inner.clone(), inner.clone(), proptest::option::of(inner)).prop_map(
                |(condition, consequence, alternative)| Expr::If {
                    condition: Box::new(condition),
                    consequence: block(consequence),
                    alternative: alternative.map(block),
                }
            ),
        ]
    })
}

/// A small program: three let-bindings followed by one expression.
fn arb_program() -> impl Strategy<Value = Program> {
    (any::<i64>(), any::<i64>(), any::<bool>(), arb_expr()).prop_map(|(a, b, c, expr)| {
        Program {
            statements: vec![
                Stmt::Let {
                    name: "a".to_string(),
                    value: Expr::Int(a),
                },
                Stmt::Let {
                    name: "b".to_string(),
                    value: Expr::Int(b),
                },
                Stmt::Let {
                    name: "c".to_string(),
                    value: Expr::Bool(c),
                },
                Stmt::Expr(expr),
            ],
        }
    })
}

// =============================================================================
// Engines
// =============================================================================

/// Either the displayed result or an error marker; error messages are not
/// compared, only whether the program failed.
fn run_vm(program: &Program) -> Result<String, ()> {
    let bytecode = Compiler::new().compile(program).map_err(|_| ())?;
    let mut vm = VM::new(bytecode);
    vm.run().map_err(|_| ())?;
    Ok(vm.last_popped_stack_elem().to_string())
}

fn run_eval(program: &Program) -> Result<String, ()> {
    let env = Env::new();
    eval(program, &env).map(|v| v.to_string()).map_err(|_| ())
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    /// Both engines agree on every random program: same value, or both
    /// report an error.
    #[test]
    fn vm_matches_reference_evaluator(program in arb_program()) {
        let vm_result = run_vm(&program);
        let eval_result = run_eval(&program);
        prop_assert_eq!(
            vm_result,
            eval_result,
            "engines disagree on: {}",
            program
        );
    }

    /// Compilation is deterministic: compiling the same program twice
    /// yields byte-identical instructions and equal constant pools.
    #[test]
    fn compilation_is_deterministic(program in arb_program()) {
        let first = Compiler::new().compile(&program).map_err(|_| ());
        let second = Compiler::new().compile(&program).map_err(|_| ());
        match (first, second) {
            (Ok(a), Ok(b)) => {
                prop_assert_eq!(a.instructions, b.instructions);
                prop_assert_eq!(a.constants, b.constants);
            }
            (a, b) => prop_assert_eq!(a.is_ok(), b.is_ok()),
        }
    }
}

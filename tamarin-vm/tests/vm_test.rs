// tamarin-vm - VM execution tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! End-to-end tests: source through compiler and VM, checking the value
//! left behind by the final pop.

use tamarin_core::value::TamarinVal;
use tamarin_parser::parse;
use tamarin_vm::{Compiler, VM};

fn run(src: &str) -> TamarinVal {
    let program = parse(src).expect("parse error");
    let bytecode = Compiler::new().compile(&program).expect("compile error");
    let mut vm = VM::new(bytecode);
    vm.run().expect("runtime error");
    vm.last_popped_stack_elem()
}

fn run_vm_tests(tests: &[(&str, &str)]) {
    for (src, expected) in tests {
        assert_eq!(&run(src).to_string(), expected, "source: {}", src);
    }
}

// =============================================================================
// Arithmetic & booleans
// =============================================================================

#[test]
fn test_integer_arithmetic() {
    run_vm_tests(&[
        ("1", "1"),
        ("2", "2"),
        ("1 + 2", "3"),
        ("1 - 2", "-1"),
        ("1 * 2", "2"),
        ("4 / 2", "2"),
        ("50 / 2 * 2 + 10 - 5", "55"),
        ("5 * (2 + 10)", "60"),
        ("-5", "-5"),
        ("-10", "-10"),
        ("-50 + 100 + -50", "0"),
        ("(5 + 10 * 2 + 15 / 3) * 2 + -10", "50"),
    ]);
}

#[test]
fn test_boolean_expressions() {
    run_vm_tests(&[
        ("true", "true"),
        ("false", "false"),
        ("1 < 2", "true"),
        ("1 > 2", "false"),
        ("1 == 1", "true"),
        ("1 != 1", "false"),
        ("true == true", "true"),
        ("false == false", "true"),
        ("true == false", "false"),
        ("true != false", "true"),
        ("(1 < 2) == true", "true"),
        ("(1 > 2) == true", "false"),
        ("!true", "false"),
        ("!5", "false"),
        ("!!5", "true"),
        ("!(if (false) { 5; })", "true"),
    ]);
}

#[test]
fn test_string_expressions() {
    run_vm_tests(&[
        ("\"tamarin\"", "\"tamarin\""),
        ("\"ta\" + \"marin\"", "\"tamarin\""),
        ("\"hello\" + \" \" + \"world\"", "\"hello world\""),
        ("\"a\" == \"a\"", "true"),
        ("\"a\" != \"b\"", "true"),
    ]);
}

// =============================================================================
// Conditionals & truthiness
// =============================================================================

#[test]
fn test_conditionals() {
    run_vm_tests(&[
        ("if (true) { 10 }", "10"),
        ("if (true) { 10 } else { 20 }", "10"),
        ("if (false) { 10 } else { 20 }", "20"),
        // 0 is truthy; only false and null are falsy.
        ("if (0) { 10 } else { 20 }", "10"),
        ("if (1) { 10 }", "10"),
        ("if (1 < 2) { 10 }", "10"),
        ("if (1 > 2) { 10 } else { 20 }", "20"),
        // No alternative and a falsy condition: the expression is null.
        ("if (false) { 10 }", "null"),
        ("if (1 > 2) { 10 }", "null"),
        // An if-expression is a value like any other.
        ("if (if (false) { 10 }) { 10 } else { 20 }", "20"),
    ]);
}

// =============================================================================
// Globals
// =============================================================================

#[test]
fn test_global_let_statements() {
    run_vm_tests(&[
        ("let one = 1; one", "1"),
        ("let one = 1; let two = 2; one + two", "3"),
        ("let one = 1; let two = one + one; one + two", "3"),
        ("let x = 5; let y = x + 10; y * 2", "30"),
    ]);
}

// =============================================================================
// Arrays, hashes, indexing
// =============================================================================

#[test]
fn test_array_literals() {
    run_vm_tests(&[
        ("[]", "[]"),
        ("[1, 2, 3]", "[1, 2, 3]"),
        ("[1 + 2, 3 * 4, 5 + 6]", "[3, 12, 11]"),
        ("[\"a\", true, 1]", "[\"a\", true, 1]"),
    ]);
}

#[test]
fn test_hash_literals() {
    run_vm_tests(&[
        ("{}", "{}"),
        ("{1: 2, 2: 3}", "{1: 2, 2: 3}"),
        ("{1 + 1: 2 * 2, 3 + 3: 4 * 4}", "{2: 4, 6: 16}"),
    ]);
}

#[test]
fn test_index_expressions() {
    run_vm_tests(&[
        ("[1, 2, 3][1]", "2"),
        ("[1, 2, 3][0 + 2]", "3"),
        ("[[1, 1, 1]][0][0]", "1"),
        // Out-of-range array indexing yields null, not an error.
        ("[][0]", "null"),
        ("[1, 2, 3][99]", "null"),
        ("[1][5]", "null"),
        ("[1][-1]", "null"),
        ("{1: 1, 2: 2}[1]", "1"),
        ("{1: 1, 2: 2}[2]", "2"),
        ("{1: 1}[0]", "null"),
        ("{}[0]", "null"),
        ("{\"one\": 1, \"two\": 2, \"three\": 3}[\"one\"]", "1"),
        ("{true: 5}[true]", "5"),
        (
            "{\"a\": 1, \"b\": 2}[\"a\"] + {\"a\": 1, \"b\": 2}[\"b\"]",
            "3",
        ),
    ]);
}

// =============================================================================
// Functions & calls
// =============================================================================

#[test]
fn test_calling_functions_without_arguments() {
    run_vm_tests(&[
        ("let fivePlusTen = fn() { 5 + 10; }; fivePlusTen();", "15"),
        ("let one = fn() { 1; }; let two = fn() { 2; }; one() + two()", "3"),
        (
            "let a = fn() { 1 }; let b = fn() { a() + 1 }; let c = fn() { b() + 1 }; c();",
            "3",
        ),
        // First-class: a call expression is a value position.
        ("fn() { 1 }() + fn() { 2 }()", "3"),
    ]);
}

#[test]
fn test_functions_with_return_statements() {
    run_vm_tests(&[
        ("let earlyExit = fn() { return 99; 100; }; earlyExit();", "99"),
        ("let earlyExit = fn() { return 99; return 100; }; earlyExit();", "99"),
    ]);
}

#[test]
fn test_functions_without_return_value() {
    run_vm_tests(&[
        ("let noReturn = fn() { }; noReturn();", "null"),
        (
            "let noReturn = fn() { }; let noReturnTwo = fn() { noReturn(); }; noReturn(); noReturnTwo();",
            "null",
        ),
    ]);
}

#[test]
fn test_calling_functions_with_arguments_and_locals() {
    run_vm_tests(&[
        ("let identity = fn(a) { a; }; identity(4);", "4"),
        ("let sum = fn(a, b) { a + b; }; sum(1, 2);", "3"),
        ("let sum = fn(a, b) { let c = a + b; c; }; sum(1, 2);", "3"),
        (
            "let sum = fn(a, b) { let c = a + b; c; }; sum(1, 2) + sum(3, 4);",
            "10",
        ),
        (
            "let globalNum = 10;
             let sum = fn(a, b) {
                 let c = a + b;
                 c + globalNum;
             };
             let outer = fn() {
                 sum(1, 2) + sum(3, 4) + globalNum;
             };
             outer() + globalNum;",
            "50",
        ),
    ]);
}

#[test]
fn test_first_class_functions() {
    run_vm_tests(&[
        (
            "let returnsOne = fn() { 1; }; let returnsOneReturner = fn() { returnsOne; }; returnsOneReturner()();",
            "1",
        ),
        (
            "let returnsOneReturner = fn() { let returnsOne = fn() { 1; }; returnsOne; }; returnsOneReturner()();",
            "1",
        ),
    ]);
}

// =============================================================================
// Closures
// =============================================================================

#[test]
fn test_closures() {
    run_vm_tests(&[
        (
            "let newClosure = fn(a) { fn() { a; }; }; let closure = newClosure(99); closure();",
            "99",
        ),
        ("let adder = fn(a) { fn(b) { a + b } }; adder(2)(3)", "5"),
        (
            "let newAdder = fn(a, b) { fn(c) { a + b + c }; }; let adder = newAdder(1, 2); adder(8);",
            "11",
        ),
        (
            "let newAdder = fn(a, b) {
                 let c = a + b;
                 fn(d) { c + d };
             };
             let adder = newAdder(1, 2);
             adder(8);",
            "11",
        ),
        (
            // Three levels: the middle closure transits `a` and `b`.
            "let newAdderOuter = fn(a, b) {
                 let c = a + b;
                 fn(d) {
                     let e = d + c;
                     fn(f) { e + f; };
                 };
             };
             let newAdderInner = newAdderOuter(1, 2);
             let adder = newAdderInner(3);
             adder(8);",
            "14",
        ),
        (
            "let a = 1;
             let newAdderOuter = fn(b) {
                 fn(c) {
                     fn(d) { a + b + c + d };
                 };
             };
             let newAdderInner = newAdderOuter(2);
             let adder = newAdderInner(3);
             adder(8);",
            "14",
        ),
        (
            "let newClosure = fn(a, b) {
                 let one = fn() { a; };
                 let two = fn() { b; };
                 fn() { one() + two(); };
             };
             let closure = newClosure(9, 90);
             closure();",
            "99",
        ),
    ]);
}

#[test]
fn test_recursive_functions() {
    run_vm_tests(&[
        (
            "let countDown = fn(x) { if (x == 0) { return 0; } else { countDown(x - 1); } }; countDown(1);",
            "0",
        ),
        (
            "let countDown = fn(x) { if (x == 0) { return 0; } else { countDown(x - 1); } };
             let wrapper = fn() { countDown(1); };
             wrapper();",
            "0",
        ),
        (
            "let fibonacci = fn(x) {
                 if (x == 0) { return 0; }
                 else {
                     if (x == 1) { return 1; }
                     else { fibonacci(x - 1) + fibonacci(x - 2); }
                 }
             };
             fibonacci(15);",
            "610",
        ),
    ]);
}

// =============================================================================
// Builtins
// =============================================================================

#[test]
fn test_builtin_functions() {
    run_vm_tests(&[
        ("len(\"\")", "0"),
        ("len(\"four\")", "4"),
        ("len(\"hello world\")", "11"),
        ("len([1, 2, 3])", "3"),
        ("len([])", "0"),
        ("first([1, 2, 3])", "1"),
        ("first([])", "null"),
        ("last([1, 2, 3])", "3"),
        ("last([])", "null"),
        ("rest([1, 2, 3])", "[2, 3]"),
        ("rest([])", "null"),
        ("push([], 1)", "[1]"),
        ("puts(\"\")", "null"),
        // Builtins compose with user functions.
        (
            "let map = fn(arr, f) {
                 let iter = fn(arr, acc) {
                     if (len(arr) == 0) { acc }
                     else { iter(rest(arr), push(acc, f(first(arr)))) }
                 };
                 iter(arr, []);
             };
             map([1, 2, 3, 4], fn(x) { x * 2 })",
            "[2, 4, 6, 8]",
        ),
    ]);
}

#[test]
fn test_let_shadows_builtin() {
    run_vm_tests(&[("let len = fn(x) { 42 }; len([1]);", "42")]);
}

// =============================================================================
// Program results & REPL state
// =============================================================================

#[test]
fn test_last_popped_is_the_final_expression() {
    run_vm_tests(&[("1; 2; 3", "3"), ("let a = 1; a;", "1")]);
}

#[test]
fn test_top_level_return_ends_the_program() {
    run_vm_tests(&[("return 10; 5", "10")]);
}

#[test]
fn test_globals_survive_across_runs() {
    // REPL wiring: symbol table, constants, and globals carry over.
    let mut compiler = Compiler::new();
    let first = compiler
        .compile(&parse("let x = 40;").unwrap())
        .expect("compile error");
    let constants = first.constants.clone();

    let mut vm = VM::new(first);
    vm.run().expect("runtime error");
    let globals = vm.into_globals();

    let mut next = Compiler::new_with_state(compiler.symbol_table(), constants);
    let second = next.compile(&parse("x + 2").unwrap()).expect("compile error");
    let mut vm = VM::new_with_globals_store(second, globals);
    vm.run().expect("runtime error");
    assert_eq!(vm.last_popped_stack_elem(), TamarinVal::Int(42));
}

#[test]
fn test_stack_is_balanced_after_a_run() {
    // Every top-level expression statement pops its value; a finished
    // program leaves the stack empty with the result in the vacated slot.
    let program = parse("let x = 2; x * 3; [1, 2]; {1: 2}; 7").unwrap();
    let bytecode = Compiler::new().compile(&program).expect("compile error");
    let mut vm = VM::new(bytecode);
    vm.run().expect("runtime error");
    assert_eq!(vm.stack_top(), None);
    assert_eq!(vm.last_popped_stack_elem(), TamarinVal::Int(7));
}

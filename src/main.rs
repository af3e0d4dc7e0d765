// tamarin - A small dynamic language with a bytecode compiler and VM
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process;
use std::time::Instant;

use tamarin_core::value::TamarinVal;
use tamarin_core::{Env, eval};
use tamarin_parser::parse;
use tamarin_vm::{Compiler, GLOBALS_SIZE, SymbolTable, VM};

/// Fixed program for the `--bench` engine comparison.
const BENCH_PROGRAM: &str = "
let fibonacci = fn(x) {
    if (x == 0) {
        return 0;
    } else {
        if (x == 1) {
            return 1;
        } else {
            return fibonacci(x - 1) + fibonacci(x - 2);
        }
    }
};
fibonacci(35);
";

fn main() {
    let args: Vec<String> = env::args().collect();

    // Handle --version flag
    if args.len() == 2 && (args[1] == "--version" || args[1] == "-v") {
        println!("Tamarin v0.1.0");
        return;
    }

    // Handle --bench [vm|eval]
    if args.len() >= 2 && args[1] == "--bench" {
        let engine = args.get(2).map(String::as_str).unwrap_or("vm");
        run_benchmark(engine);
        return;
    }

    // If files provided, run them; otherwise start the REPL
    if args.len() > 1 {
        run_files(&args[1..]);
    } else {
        run_repl();
    }
}

/// Run a sequence of source files on the VM
fn run_files(files: &[String]) {
    for file_path in files {
        if let Err(e) = run_file(file_path) {
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}

/// Compile and run a single source file
fn run_file(file_path: &str) -> Result<(), String> {
    let path = Path::new(file_path);

    // Validate file extension
    match path.extension().and_then(|e| e.to_str()) {
        Some("tam") => {}
        Some(ext) => {
            return Err(format!(
                "Error: unsupported file extension '.{}' for '{}'",
                ext, file_path
            ));
        }
        None => {
            return Err(format!(
                "Error: file '{}' has no extension (expected .tam)",
                file_path
            ));
        }
    }

    let source =
        fs::read_to_string(path).map_err(|e| format!("Error reading '{}': {}", file_path, e))?;

    let program =
        parse(&source).map_err(|e| format!("Parse error in '{}': {}", file_path, e))?;

    let bytecode = Compiler::new()
        .compile(&program)
        .map_err(|e| format!("Compile error in '{}': {}", file_path, e))?;

    let mut vm = VM::new(bytecode);
    vm.run()
        .map_err(|e| format!("Runtime error in '{}': {}", file_path, e))?;

    Ok(())
}

/// Run the interactive REPL
///
/// Globals, the symbol table, and the constant pool persist across lines,
/// so definitions from earlier lines stay visible.
fn run_repl() {
    println!("Tamarin v0.1.0");

    let mut state: Option<(SymbolTable, Vec<TamarinVal>)> = None;
    let mut globals = vec![TamarinVal::Null; GLOBALS_SIZE];

    loop {
        print!(">> ");
        io::stdout().flush().unwrap();

        let mut input = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(0) => {
                println!();
                break;
            }
            Ok(_) => {
                let input = input.trim();
                if input.is_empty() {
                    continue;
                }

                let program = match parse(input) {
                    Ok(program) => program,
                    Err(e) => {
                        eprintln!("{}", e);
                        continue;
                    }
                };

                let mut compiler = match state.take() {
                    Some((symbol_table, constants)) => {
                        Compiler::new_with_state(symbol_table, constants)
                    }
                    None => Compiler::new(),
                };

                match compiler.compile(&program) {
                    Ok(bytecode) => {
                        state = Some((compiler.symbol_table(), bytecode.constants.clone()));

                        let mut vm = VM::new_with_globals_store(bytecode, globals);
                        match vm.run() {
                            Ok(()) => println!("{}", vm.last_popped_stack_elem()),
                            Err(e) => eprintln!("Runtime error: {}", e),
                        }
                        globals = vm.into_globals();
                    }
                    Err(e) => {
                        eprintln!("Compile error: {}", e);
                        // Keep the (possibly extended) state anyway.
                        state = Some((compiler.symbol_table(), compiler.bytecode().constants));
                    }
                }
            }
            Err(e) => {
                eprintln!("Read error: {}", e);
                break;
            }
        }
    }
}

/// Run fibonacci(35) on the chosen engine and report the timing
fn run_benchmark(engine: &str) {
    let program = match parse(BENCH_PROGRAM) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };

    let (result, duration) = match engine {
        "vm" => {
            let bytecode = match Compiler::new().compile(&program) {
                Ok(bytecode) => bytecode,
                Err(e) => {
                    eprintln!("Compile error: {}", e);
                    process::exit(1);
                }
            };
            let mut vm = VM::new(bytecode);
            let start = Instant::now();
            if let Err(e) = vm.run() {
                eprintln!("Runtime error: {}", e);
                process::exit(1);
            }
            (vm.last_popped_stack_elem(), start.elapsed())
        }
        "eval" => {
            let env = Env::new();
            let start = Instant::now();
            match eval(&program, &env) {
                Ok(result) => (result, start.elapsed()),
                Err(e) => {
                    eprintln!("Runtime error: {}", e);
                    process::exit(1);
                }
            }
        }
        other => {
            eprintln!("Unknown engine '{}' (expected 'vm' or 'eval')", other);
            process::exit(1);
        }
    };

    println!(
        "engine={}, result={}, duration={:?}",
        engine, result, duration
    );
}

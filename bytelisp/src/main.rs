use clap::Parser as ClapParser;
use std::{
    fs,
    io::{self, Write},
    process,
};

use bytelisp::{
    ExecutionStateInfo, MAX_FRAMES, Runtime, RuntimeCreateInfo, RuntimeError,
    RuntimeMode, StepResult, Value, parse,
};

#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input source files to execute in order
    #[arg(required = false, help = "The .lisp files to execute")]
    files: Vec<String>,

    /// Start REPL after executing files (default if no files)
    #[arg(long, help = "Force REPL mode after file execution")]
    repl: bool,

    /// Print bytecode instead of executing
    #[arg(long, help = "Dump the bytecode of every top-level form")]
    dump_bytecode: bool,

    #[arg(long, default_value_t = ExecutionStateInfo::default().stack_size)]
    stack_size: usize,

    #[arg(long, default_value_t = MAX_FRAMES)]
    frame_limit: usize,

    /// Start without the builtin library
    #[arg(long)]
    no_builtins: bool,
}

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("warn"),
    )
    .init();

    let cli = Cli::parse();
    let mut runtime = Runtime::new(RuntimeCreateInfo {
        state: ExecutionStateInfo {
            stack_size: cli.stack_size,
        },
        frame_limit: cli.frame_limit,
        builtins: !cli.no_builtins,
        ..Default::default()
    });

    for filename in &cli.files {
        if cli.dump_bytecode {
            let source = match fs::read_to_string(filename) {
                Ok(content) => content,
                Err(err) => {
                    eprintln!("Error reading file '{}': {}", filename, err);
                    process::exit(1);
                }
            };
            println!("== {} ==", filename);
            dump_bytecode(&mut runtime, &source);
            continue;
        }

        let result = load(&mut runtime, filename);
        print_diagnostics(&mut runtime);
        if let Err(err) = result {
            eprintln!("Error executing {}: {}", filename, err);
            process::exit(1);
        }
    }

    if cli.dump_bytecode {
        return;
    }

    if cli.repl || cli.files.is_empty() {
        run_repl(&mut runtime);
    }
}

/// Run a file, dropping its final value from the stack.
fn load(runtime: &mut Runtime, filename: &str) -> Result<(), RuntimeError> {
    if runtime.load_file(filename)?.is_some() {
        runtime.state.pop()?;
    }
    Ok(())
}

fn print_diagnostics(runtime: &mut Runtime) {
    for diagnostic in runtime.take_diagnostics() {
        eprintln!("warning: {diagnostic}");
    }
}

fn dump_bytecode(runtime: &mut Runtime, source: &str) {
    let parsed = parse(&mut runtime.heap, source);
    for form in parsed.forms {
        println!("-- {} --", runtime.heap.repr(form));
        match runtime.compile_form(form) {
            Ok(code) => {
                if let Some(listing) = runtime.heap.disassemble(code) {
                    print!("{listing}");
                }
            }
            Err(err) => eprintln!("Error compiling: {err}"),
        }
    }
    if let Some(err) = parsed.error {
        eprintln!("Error parsing: {err}");
    }
}

const REPL_HELP: &str = "\
commands:
  quit, exit    leave the REPL
  env           list global bindings
  stack         show the value stack, top first
  frames        show active frames
  gc            run a collection
  step          execute one instruction of a suspended program
  continue, c   resume a suspended program
  help          this text; (help) lists the builtins";

fn run_repl(runtime: &mut Runtime) {
    println!("bytelisp REPL");
    println!("Type 'help' for commands, 'exit' to quit.");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut input_buffer = String::new();

    loop {
        let prompt = match runtime.mode() {
            RuntimeMode::Break => "break> ",
            _ => "> ",
        };
        print!("{prompt}");
        if let Err(err) = stdout.flush() {
            eprintln!("Error flushing stdout: {}", err);
            break;
        }

        input_buffer.clear();
        match stdin.read_line(&mut input_buffer) {
            Ok(0) => break,
            Ok(_) => {
                let input = input_buffer.trim();
                match input {
                    "" => continue,
                    "quit" | "exit" => break,
                    "env" => print!("{}", runtime.env_to_string()),
                    "stack" => runtime.print_stack(),
                    "frames" => print!("{}", runtime.frames_to_string()),
                    "gc" => {
                        let stats = runtime.collect();
                        println!(
                            "freed {} objects, {} alive",
                            stats.freed, stats.alive
                        );
                    }
                    "step" => step(runtime),
                    "continue" | "c" => {
                        let result = runtime.run();
                        report(runtime, result);
                    }
                    "help" => println!("{REPL_HELP}"),
                    source => {
                        let result = runtime.eval(source);
                        report(runtime, result);
                    }
                }
            }
            Err(err) => {
                eprintln!("Error reading input: {}", err);
                break;
            }
        }
    }
}

fn step(runtime: &mut Runtime) {
    if runtime.mode() != RuntimeMode::Break {
        println!("no suspended program");
        return;
    }
    match runtime.step() {
        Ok(StepResult::Continue) => {
            print!("{}", runtime.frames_to_string());
        }
        Ok(StepResult::Finished) => {
            let result = runtime.result();
            report(runtime, Ok(result));
        }
        Err(err) => {
            print_diagnostics(runtime);
            eprintln!("Error: {err}");
        }
    }
}

/// Print the outcome of a run and drop its value from the stack.
fn report(runtime: &mut Runtime, result: Result<Option<Value>, RuntimeError>) {
    print_diagnostics(runtime);
    match result {
        Ok(Some(value)) => {
            println!("{}", runtime.heap.repr(value));
            let _ = runtime.state.pop();
        }
        Ok(None) if runtime.mode() == RuntimeMode::Break => {
            println!("suspended; 'step' or 'continue'");
        }
        Ok(None) => {}
        Err(err) => eprintln!("Error: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loaded_files_leave_the_stack_empty() {
        let path = std::env::temp_dir()
            .join(format!("bytelisp-load-{}.lisp", process::id()));
        fs::write(&path, "(def x 41)\n(+ x 1)\n").expect("write source");
        let filename = path.to_str().expect("utf-8 path");

        let mut runtime = Runtime::default();
        for _ in 0..3 {
            load(&mut runtime, filename).expect("load");
            assert_eq!(runtime.state.depth(), 0);
        }
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn missing_file_is_an_error() {
        let mut runtime = Runtime::default();
        assert!(matches!(
            load(&mut runtime, "/nonexistent/bytelisp.lisp"),
            Err(RuntimeError::Io { .. })
        ));
    }
}

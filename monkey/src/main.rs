//! Monkey CLI

use clap::{Parser as ClapParser, Subcommand};
use monkey::compiler::Compiler;
use monkey::error::report_parse_errors;
use monkey::eval::eval_program;
use monkey::object::{Environment, Object};
use monkey::repl::{Engine, Repl};
use monkey::vm::VM;
use std::path::PathBuf;

#[derive(ClapParser)]
#[command(name = "monkey", version, about = "The Monkey programming language")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start an interactive session
    Repl {
        /// Execution engine
        #[arg(long, value_enum, default_value_t)]
        engine: Engine,
    },
    /// Run a Monkey source file
    Run {
        /// Source file to run
        file: PathBuf,
        /// Execution engine
        #[arg(long, value_enum, default_value_t)]
        engine: Engine,
    },
    /// Parse and dump the AST (debug)
    Parse {
        /// Source file to parse
        file: PathBuf,
    },
    /// Tokenize and dump the tokens (debug)
    Tokens {
        /// Source file to tokenize
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        None => start_repl(Engine::default()),
        Some(Command::Repl { engine }) => start_repl(engine),
        Some(Command::Run { file, engine }) => run_file(&file, engine),
        Some(Command::Parse { file }) => parse_file(&file),
        Some(Command::Tokens { file }) => tokenize_file(&file),
    };

    if let Err(error) = result {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

fn start_repl(engine: Engine) -> Result<(), Box<dyn std::error::Error>> {
    let mut repl = Repl::new(engine)?;
    repl.run()?;
    Ok(())
}

fn load_program(
    path: &PathBuf,
) -> Result<Option<monkey::ast::Program>, Box<dyn std::error::Error>> {
    let source = std::fs::read_to_string(path)?;
    let filename = path.display().to_string();

    match monkey::parser::parse(&source) {
        Ok(program) => Ok(Some(program)),
        Err(errors) => {
            report_parse_errors(&filename, &source, &errors);
            Ok(None)
        }
    }
}

fn run_file(path: &PathBuf, engine: Engine) -> Result<(), Box<dyn std::error::Error>> {
    let Some(program) = load_program(path)? else {
        std::process::exit(1);
    };

    let result = match engine {
        Engine::Vm => {
            let mut compiler = Compiler::new();
            compiler.compile(&program)?;

            let mut vm = VM::new(compiler.bytecode());
            vm.run()?;
            vm.last_popped().clone()
        }
        Engine::Eval => {
            let env = Environment::new().into_ref();
            match eval_program(&program, &env) {
                Object::Error(message) => {
                    eprintln!("Run-time error: {message}");
                    std::process::exit(1);
                }
                value => value,
            }
        }
    };

    if result != Object::Null {
        println!("{result}");
    }
    Ok(())
}

fn parse_file(path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let Some(program) = load_program(path)? else {
        std::process::exit(1);
    };

    println!("{}", serde_json::to_string_pretty(&program)?);
    Ok(())
}

fn tokenize_file(path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let source = std::fs::read_to_string(path)?;

    match monkey::lexer::tokenize(&source) {
        Ok(tokens) => {
            for (token, span) in &tokens {
                println!("{:?} @ {}..{}", token, span.start, span.end);
            }
        }
        Err(error) => {
            report_parse_errors(&path.display().to_string(), &source, &[error]);
            std::process::exit(1);
        }
    }

    Ok(())
}

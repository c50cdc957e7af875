//! REPL (Read-Eval-Print Loop)
//!
//! Each line is lexed, parsed and executed against persistent state: the
//! compiler/VM path keeps its symbol table, constant pool and globals so
//! that global indices stay stable across lines, the evaluator path keeps
//! its environment. The VM path commits state only when a line succeeds,
//! so a failed line rolls back cleanly.

use crate::compiler::{Compiler, SymbolTable};
use crate::error::ParseError;
use crate::eval::eval_program;
use crate::lexer::tokenize;
use crate::object::{Environment, EnvRef, Object};
use crate::parser::Parser;
use crate::vm::{VM, GLOBALS_SIZE};
use clap::ValueEnum;
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Result as RlResult};
use std::fmt;
use std::path::PathBuf;

const PROMPT: &str = ">> ";
const HISTORY_FILE: &str = ".monkey_history";

/// Which back end executes the input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Engine {
    /// Bytecode compiler + virtual machine
    #[default]
    Vm,
    /// Tree-walking evaluator
    Eval,
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Engine::Vm => write!(f, "vm"),
            Engine::Eval => write!(f, "eval"),
        }
    }
}

/// The outcome of one REPL line
#[derive(Debug, PartialEq)]
pub enum LineResult {
    /// The line produced this value
    Value(Object),
    /// The line ran for effect only (e.g. a let binding)
    Empty,
    ParseErrors(Vec<ParseError>),
    CompileError(String),
    RuntimeError(String),
}

/// Execution state persisted across lines, independent of the editor
pub struct Session {
    engine: Engine,
    symbol_table: SymbolTable,
    constants: Vec<Object>,
    globals: Vec<Object>,
    env: EnvRef,
}

impl Session {
    pub fn new(engine: Engine) -> Self {
        let (symbol_table, constants) = Compiler::new().into_state();
        Session {
            engine,
            symbol_table,
            constants,
            globals: vec![Object::Null; GLOBALS_SIZE],
            env: Environment::new().into_ref(),
        }
    }

    pub fn engine(&self) -> Engine {
        self.engine
    }

    /// Switch engines; each engine keeps its own state
    pub fn set_engine(&mut self, engine: Engine) {
        self.engine = engine;
    }

    /// Execute one line of input against the session state
    pub fn execute(&mut self, line: &str) -> LineResult {
        let tokens = match tokenize(line) {
            Ok(tokens) => tokens,
            Err(error) => return LineResult::ParseErrors(vec![error]),
        };

        let (program, errors) = Parser::new(tokens).parse_program();
        if !errors.is_empty() {
            return LineResult::ParseErrors(errors);
        }

        match self.engine {
            Engine::Vm => self.execute_vm(&program),
            Engine::Eval => self.execute_eval(&program),
        }
    }

    fn execute_vm(&mut self, program: &crate::ast::Program) -> LineResult {
        let mut compiler =
            Compiler::with_state(self.symbol_table.clone(), self.constants.clone());

        if let Err(error) = compiler.compile(program) {
            return LineResult::CompileError(error.to_string());
        }

        let mut vm = VM::with_globals(compiler.bytecode(), self.globals.clone());
        if let Err(error) = vm.run() {
            // State stays as it was before the line.
            return LineResult::RuntimeError(error.to_string());
        }

        let result = vm.last_popped().clone();
        self.globals = vm.into_globals();
        let (symbol_table, constants) = compiler.into_state();
        self.symbol_table = symbol_table;
        self.constants = constants;

        match result {
            Object::Null => LineResult::Empty,
            value => LineResult::Value(value),
        }
    }

    fn execute_eval(&mut self, program: &crate::ast::Program) -> LineResult {
        match eval_program(program, &self.env) {
            Object::Error(message) => LineResult::RuntimeError(message),
            Object::Null => LineResult::Empty,
            value => LineResult::Value(value),
        }
    }
}

/// Interactive shell around a [`Session`]
pub struct Repl {
    editor: DefaultEditor,
    session: Session,
    history_path: Option<PathBuf>,
}

impl Repl {
    pub fn new(engine: Engine) -> RlResult<Self> {
        let editor = DefaultEditor::new()?;
        let history_path = home_dir().map(|home| home.join(HISTORY_FILE));

        let mut repl = Repl {
            editor,
            session: Session::new(engine),
            history_path,
        };

        if let Some(path) = &repl.history_path {
            let _ = repl.editor.load_history(path);
        }

        Ok(repl)
    }

    /// Run until EOF or `:quit`
    pub fn run(&mut self) -> RlResult<()> {
        println!("Welcome to the Monkey programming language!");
        println!(
            "Engine = {}. Type :help for help, :quit to exit.\n",
            self.session.engine()
        );

        loop {
            match self.editor.readline(PROMPT) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }

                    let _ = self.editor.add_history_entry(line);

                    if line.starts_with(':') {
                        if self.handle_command(line) {
                            break;
                        }
                        continue;
                    }

                    self.execute_line(line);
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => break,
                Err(error) => {
                    eprintln!("Error: {error}");
                    break;
                }
            }
        }

        if let Some(path) = &self.history_path {
            let _ = self.editor.save_history(path);
        }

        Ok(())
    }

    fn execute_line(&mut self, line: &str) {
        match self.session.execute(line) {
            LineResult::Value(value) => println!("{value}"),
            LineResult::Empty => {}
            LineResult::ParseErrors(errors) => {
                for error in errors {
                    eprintln!("\t{error}");
                }
            }
            LineResult::CompileError(message) => {
                eprintln!("Compile-time error: {message}");
            }
            LineResult::RuntimeError(message) => {
                eprintln!("Run-time error: {message}");
            }
        }
    }

    /// Handle a `:` command, returning true to exit
    fn handle_command(&mut self, command: &str) -> bool {
        match command {
            ":quit" | ":q" | ":exit" => true,
            ":help" | ":h" | ":?" => {
                self.print_help();
                false
            }
            ":clear" => {
                print!("\x1B[2J\x1B[1;1H");
                false
            }
            ":engine vm" => {
                self.session.set_engine(Engine::Vm);
                println!("Engine = vm");
                false
            }
            ":engine eval" => {
                self.session.set_engine(Engine::Eval);
                println!("Engine = eval");
                false
            }
            _ => {
                println!("Unknown command: {command}");
                println!("Type :help for help.");
                false
            }
        }
    }

    fn print_help(&self) {
        println!("Monkey REPL commands:");
        println!("  :help, :h, :?     Show this help");
        println!("  :quit, :q         Exit the REPL");
        println!("  :clear            Clear the screen");
        println!("  :engine vm|eval   Switch execution engine");
        println!();
        println!("Built-in functions:");
        println!("  len(x)            Length of a string or array");
        println!("  first(a)          First element of an array");
        println!("  last(a)           Last element of an array");
        println!("  tail(a)           All but the first element");
        println!("  push(a, v)        New array with v appended");
        println!("  print(...)        Print values, returns null");
    }
}

fn home_dir() -> Option<PathBuf> {
    #[cfg(windows)]
    {
        std::env::var("USERPROFILE").ok().map(PathBuf::from)
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOME").ok().map(PathBuf::from)
    }
}

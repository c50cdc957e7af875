//! Error types and reporting
//!
//! Three taxonomies, kept separate: parse errors are accumulated per input
//! and reported as a list; compile errors are single-shot; runtime errors
//! abort VM execution (the evaluator materialises them as error values
//! instead, see `eval`).

use crate::ast::Span;
use thiserror::Error;

/// A single parse (or lexical) diagnostic
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        ParseError {
            message: message.into(),
            span,
        }
    }
}

/// Compile error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("undefined variable {name}")]
    UndefinedVariable { name: String },
}

impl CompileError {
    pub fn undefined_variable(name: impl Into<String>) -> Self {
        Self::UndefinedVariable { name: name.into() }
    }
}

/// Runtime error raised by the virtual machine
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub message: String,
}

/// Kinds of runtime errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    /// Operands of an arithmetic or comparison op have different types
    TypeMismatch,
    /// Operator not defined for the operand types
    UnknownOperator,
    DivisionByZero,
    /// Callee on the stack is neither a closure nor a builtin
    NotAFunction,
    /// Argument count differs from the callee's parameter count
    WrongArity,
    /// Hash key of an unhashable type
    UnusableHashKey,
    /// Index applied to a value that supports no indexing
    IndexNotSupported,
    /// A builtin reported misuse
    Builtin,
    StackOverflow,
    FrameOverflow,
    /// Malformed bytecode reached the dispatch loop
    BadOpcode,
}

impl RuntimeError {
    pub fn type_mismatch(left: &str, operator: &str, right: &str) -> Self {
        RuntimeError {
            kind: RuntimeErrorKind::TypeMismatch,
            message: format!("type mismatch: {left} {operator} {right}"),
        }
    }

    pub fn unknown_infix_operator(left: &str, operator: &str, right: &str) -> Self {
        RuntimeError {
            kind: RuntimeErrorKind::UnknownOperator,
            message: format!("unknown operator: {left} {operator} {right}"),
        }
    }

    pub fn unknown_prefix_operator(operator: &str, operand: &str) -> Self {
        RuntimeError {
            kind: RuntimeErrorKind::UnknownOperator,
            message: format!("unknown operator: {operator}{operand}"),
        }
    }

    pub fn division_by_zero() -> Self {
        RuntimeError {
            kind: RuntimeErrorKind::DivisionByZero,
            message: "division by zero".to_string(),
        }
    }

    pub fn not_a_function(type_name: &str) -> Self {
        RuntimeError {
            kind: RuntimeErrorKind::NotAFunction,
            message: format!("calling non-function: {type_name}"),
        }
    }

    pub fn wrong_arity(want: usize, got: usize) -> Self {
        RuntimeError {
            kind: RuntimeErrorKind::WrongArity,
            message: format!("wrong number of arguments: want={want}, got={got}"),
        }
    }

    pub fn unusable_hash_key(type_name: &str) -> Self {
        RuntimeError {
            kind: RuntimeErrorKind::UnusableHashKey,
            message: format!("unusable as hash key: {type_name}"),
        }
    }

    pub fn index_not_supported(type_name: &str) -> Self {
        RuntimeError {
            kind: RuntimeErrorKind::IndexNotSupported,
            message: format!("index operator not supported: {type_name}"),
        }
    }

    pub fn builtin(message: impl Into<String>) -> Self {
        RuntimeError {
            kind: RuntimeErrorKind::Builtin,
            message: message.into(),
        }
    }

    pub fn stack_overflow() -> Self {
        RuntimeError {
            kind: RuntimeErrorKind::StackOverflow,
            message: "stack overflow".to_string(),
        }
    }

    pub fn frame_overflow() -> Self {
        RuntimeError {
            kind: RuntimeErrorKind::FrameOverflow,
            message: "frame overflow".to_string(),
        }
    }

    pub fn bad_opcode(byte: u8) -> Self {
        RuntimeError {
            kind: RuntimeErrorKind::BadOpcode,
            message: format!("undefined opcode {byte}"),
        }
    }
}

/// Report accumulated parse errors with ariadne
pub fn report_parse_errors(filename: &str, source: &str, errors: &[ParseError]) {
    use ariadne::{Color, Label, Report, ReportKind, Source};

    for error in errors {
        let span = error.span;
        Report::build(ReportKind::Error, (filename, span.start..span.end))
            .with_message("parse error")
            .with_label(
                Label::new((filename, span.start..span.end))
                    .with_message(&error.message)
                    .with_color(Color::Red),
            )
            .finish()
            .print((filename, Source::from(source)))
            .unwrap();
    }
}

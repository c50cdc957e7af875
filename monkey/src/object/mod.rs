//! Runtime values
//!
//! One tagged `Object` type serves both engines. Strings, arrays, hashes
//! and functions are `Rc`-shared so that cloning a value on and off the
//! stack is cheap, and so that the language's `==`/`!=` can reproduce the
//! allocation-identity semantics of the reference implementation.

mod builtins;
mod environment;

pub use builtins::{lookup_builtin, Builtin, BuiltinFn, BUILTINS};
pub use environment::{child_env, EnvRef, Environment};

use crate::ast::Block;
use crate::code::Instructions;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Runtime value
#[derive(Debug, Clone)]
pub enum Object {
    Integer(i64),
    Boolean(bool),
    Null,
    Str(Rc<String>),
    Array(Rc<Vec<Object>>),
    Hash(Rc<HashMap<HashKey, HashPair>>),
    /// Evaluator-only: a function literal with its captured environment
    Function(Rc<Function>),
    /// VM-only: instructions plus frame layout, lives in the constant pool
    CompiledFunction(Rc<CompiledFunction>),
    /// VM-only: a compiled function bundled with its captured free values
    Closure(Rc<Closure>),
    Builtin(&'static Builtin),
    /// Evaluator-only: a value unwinding out of blocks to the nearest
    /// function boundary
    Return(Box<Object>),
    /// Evaluator-only: an error propagating like a return value
    Error(String),
}

/// A hash entry keeps the original key for display
#[derive(Debug, Clone, PartialEq)]
pub struct HashPair {
    pub key: Object,
    pub value: Object,
}

/// Evaluator closure over parameter and body subtrees
pub struct Function {
    pub parameters: Vec<String>,
    pub body: Block,
    pub env: EnvRef,
}

/// Output of compiling one function literal
#[derive(Debug, PartialEq)]
pub struct CompiledFunction {
    pub instructions: Instructions,
    pub num_locals: usize,
    pub num_parameters: usize,
}

/// A compiled function plus the values it captured at creation
#[derive(Debug)]
pub struct Closure {
    pub func: Rc<CompiledFunction>,
    pub free: Vec<Object>,
}

/// Type tag of a hashable value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashKeyKind {
    Integer,
    Boolean,
    Str,
}

/// Hash-map key: type tag plus 64-bit fingerprint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HashKey {
    pub kind: HashKeyKind,
    pub value: u64,
}

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

/// FNV-1a over UTF-8 bytes
fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, &byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

impl Object {
    /// Type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Integer(_) => "INTEGER",
            Object::Boolean(_) => "BOOLEAN",
            Object::Null => "NULL",
            Object::Str(_) => "STRING",
            Object::Array(_) => "ARRAY",
            Object::Hash(_) => "HASH",
            Object::Function(_) => "FUNCTION",
            Object::CompiledFunction(_) => "COMPILED_FUNCTION",
            Object::Closure(_) => "CLOSURE",
            Object::Builtin(_) => "BUILTIN",
            Object::Return(_) => "RETURN",
            Object::Error(_) => "ERROR",
        }
    }

    /// `false` and `null` are falsy, everything else is truthy
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Object::Boolean(false) | Object::Null)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Object::Error(_))
    }

    /// Hash key, or `None` for unhashable types
    pub fn hash_key(&self) -> Option<HashKey> {
        match self {
            Object::Integer(value) => Some(HashKey {
                kind: HashKeyKind::Integer,
                value: *value as u64,
            }),
            Object::Boolean(value) => Some(HashKey {
                kind: HashKeyKind::Boolean,
                value: u64::from(*value),
            }),
            Object::Str(value) => Some(HashKey {
                kind: HashKeyKind::Str,
                value: fnv1a(value.as_bytes()),
            }),
            _ => None,
        }
    }

    /// Identity comparison backing the language's `==`/`!=`
    ///
    /// Integers, booleans and null compare by value (the latter two are
    /// canonical, so value identity is object identity); everything else
    /// compares by shared allocation.
    pub fn is_identical(&self, other: &Object) -> bool {
        match (self, other) {
            (Object::Integer(a), Object::Integer(b)) => a == b,
            (Object::Boolean(a), Object::Boolean(b)) => a == b,
            (Object::Null, Object::Null) => true,
            (Object::Str(a), Object::Str(b)) => Rc::ptr_eq(a, b),
            (Object::Array(a), Object::Array(b)) => Rc::ptr_eq(a, b),
            (Object::Hash(a), Object::Hash(b)) => Rc::ptr_eq(a, b),
            (Object::Function(a), Object::Function(b)) => Rc::ptr_eq(a, b),
            (Object::CompiledFunction(a), Object::CompiledFunction(b)) => Rc::ptr_eq(a, b),
            (Object::Closure(a), Object::Closure(b)) => Rc::ptr_eq(a, b),
            (Object::Builtin(a), Object::Builtin(b)) => std::ptr::eq(*a, *b),
            _ => false,
        }
    }
}

/// Structural equality, used by tests and the REPL, not by the language
impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Object::Integer(a), Object::Integer(b)) => a == b,
            (Object::Boolean(a), Object::Boolean(b)) => a == b,
            (Object::Null, Object::Null) => true,
            (Object::Str(a), Object::Str(b)) => a == b,
            (Object::Array(a), Object::Array(b)) => a == b,
            (Object::Hash(a), Object::Hash(b)) => a == b,
            (Object::Function(a), Object::Function(b)) => Rc::ptr_eq(a, b),
            (Object::CompiledFunction(a), Object::CompiledFunction(b)) => a == b,
            (Object::Closure(a), Object::Closure(b)) => Rc::ptr_eq(a, b),
            (Object::Builtin(a), Object::Builtin(b)) => std::ptr::eq(*a, *b),
            (Object::Return(a), Object::Return(b)) => a == b,
            (Object::Error(a), Object::Error(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::Integer(value) => write!(f, "{value}"),
            Object::Boolean(value) => write!(f, "{value}"),
            Object::Null => write!(f, "null"),
            Object::Str(value) => write!(f, "{value}"),
            Object::Array(elements) => {
                let elements: Vec<String> = elements.iter().map(|e| e.to_string()).collect();
                write!(f, "[{}]", elements.join(", "))
            }
            Object::Hash(pairs) => {
                // Sorted by key display so that output is deterministic
                let mut pairs: Vec<String> = pairs
                    .values()
                    .map(|pair| format!("{}: {}", pair.key, pair.value))
                    .collect();
                pairs.sort();
                write!(f, "{{{}}}", pairs.join(", "))
            }
            Object::Function(function) => {
                write!(
                    f,
                    "fn({}) {{ {} }}",
                    function.parameters.join(", "),
                    function.body
                )
            }
            Object::CompiledFunction(func) => {
                write!(f, "CompiledFunction[{:p}]", Rc::as_ptr(func))
            }
            Object::Closure(closure) => write!(f, "Closure[{:p}]", Rc::as_ptr(closure)),
            Object::Builtin(builtin) => write!(f, "builtin function {}", builtin.name),
            Object::Return(value) => write!(f, "{value}"),
            Object::Error(message) => write!(f, "ERROR: {message}"),
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The environment is omitted: closures stored in the environment
        // they captured would recurse forever.
        f.debug_struct("Function")
            .field("parameters", &self.parameters)
            .field("body", &self.body)
            .finish_non_exhaustive()
    }
}

//! Built-in function registry
//!
//! The table order is the ABI: the compiler defines builtin symbols by
//! position, and `get-builtin i` resolves to `BUILTINS[i]` at runtime.
//! Builtins validate their arguments and return an error value on misuse,
//! they never fail out-of-band.

use super::Object;
use std::rc::Rc;

/// Host function signature
pub type BuiltinFn = fn(&[Object]) -> Object;

/// One registry entry
#[derive(Debug)]
pub struct Builtin {
    pub name: &'static str,
    pub func: BuiltinFn,
}

/// Registry, in index order
pub static BUILTINS: &[Builtin] = &[
    Builtin {
        name: "len",
        func: builtin_len,
    },
    Builtin {
        name: "first",
        func: builtin_first,
    },
    Builtin {
        name: "last",
        func: builtin_last,
    },
    Builtin {
        name: "tail",
        func: builtin_tail,
    },
    Builtin {
        name: "push",
        func: builtin_push,
    },
    Builtin {
        name: "print",
        func: builtin_print,
    },
];

/// Find a builtin by name (used by the evaluator)
pub fn lookup_builtin(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|builtin| builtin.name == name)
}

fn new_error(message: String) -> Object {
    Object::Error(message)
}

fn builtin_len(args: &[Object]) -> Object {
    if args.len() != 1 {
        return new_error("wrong number of arguments (expected = 1)".to_string());
    }

    match &args[0] {
        Object::Str(value) => Object::Integer(value.len() as i64),
        Object::Array(elements) => Object::Integer(elements.len() as i64),
        other => new_error(format!(
            "argument to `len` not supported, got {}",
            other.type_name()
        )),
    }
}

fn builtin_first(args: &[Object]) -> Object {
    if args.len() != 1 {
        return new_error("wrong number of arguments (expected = 1)".to_string());
    }

    match &args[0] {
        Object::Array(elements) => elements.first().cloned().unwrap_or(Object::Null),
        _ => new_error("argument to `first` must be array".to_string()),
    }
}

fn builtin_last(args: &[Object]) -> Object {
    if args.len() != 1 {
        return new_error("wrong number of arguments (expected = 1)".to_string());
    }

    match &args[0] {
        Object::Array(elements) => elements.last().cloned().unwrap_or(Object::Null),
        _ => new_error("argument to `last` must be array".to_string()),
    }
}

fn builtin_tail(args: &[Object]) -> Object {
    if args.len() != 1 {
        return new_error("wrong number of arguments (expected = 1)".to_string());
    }

    match &args[0] {
        Object::Array(elements) => {
            if elements.is_empty() {
                Object::Null
            } else {
                Object::Array(Rc::new(elements[1..].to_vec()))
            }
        }
        _ => new_error("argument to `tail` must be array".to_string()),
    }
}

fn builtin_push(args: &[Object]) -> Object {
    if args.len() != 2 {
        return new_error("wrong number of arguments (expected = 2)".to_string());
    }

    match &args[0] {
        Object::Array(elements) => {
            let mut extended = elements.as_ref().clone();
            extended.push(args[1].clone());
            Object::Array(Rc::new(extended))
        }
        _ => new_error("argument to `push` must be array".to_string()),
    }
}

fn builtin_print(args: &[Object]) -> Object {
    for arg in args {
        println!("{arg}");
    }
    Object::Null
}

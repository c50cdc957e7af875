//! Tree-walking evaluator
//!
//! The reference semantics: a recursive `eval` over the AST with an
//! environment chain for lexical scope. Return values and errors are
//! wrapped in value variants that propagate through block evaluation until
//! an explicit unwrapping point (program level or function application);
//! this is what gives nested `if`/`return` the right behaviour, so no
//! host-level escape mechanism is used instead.

#[cfg(test)]
mod tests;

use crate::ast::{Block, Expression, InfixOp, PrefixOp, Program, Statement};
use crate::object::{
    child_env, lookup_builtin, EnvRef, Function, HashKey, HashPair, Object,
};
use std::collections::HashMap;
use std::rc::Rc;

/// Evaluate a program, unwrapping any surfacing return value
pub fn eval_program(program: &Program, env: &EnvRef) -> Object {
    let mut result = Object::Null;

    for statement in &program.statements {
        result = eval_statement(statement, env);

        match result {
            Object::Return(value) => return *value,
            Object::Error(_) => return result,
            _ => {}
        }
    }

    result
}

fn eval_statement(statement: &Statement, env: &EnvRef) -> Object {
    match statement {
        Statement::Expression(expression) => eval_expression(expression, env),
        Statement::Let { name, value } => {
            let value = eval_expression(value, env);
            if value.is_error() {
                return value;
            }
            env.borrow_mut().define(name.clone(), value);
            Object::Null
        }
        Statement::Return(value) => {
            let value = match value {
                Some(expression) => eval_expression(expression, env),
                None => Object::Null,
            };
            if value.is_error() {
                return value;
            }
            Object::Return(Box::new(value))
        }
    }
}

/// Blocks stop at a return-wrapper or error but do not unwrap it, so the
/// value keeps unwinding through enclosing blocks
fn eval_block(block: &Block, env: &EnvRef) -> Object {
    let mut result = Object::Null;

    for statement in &block.statements {
        result = eval_statement(statement, env);

        if matches!(result, Object::Return(_) | Object::Error(_)) {
            return result;
        }
    }

    result
}

fn eval_expression(expression: &Expression, env: &EnvRef) -> Object {
    match expression {
        Expression::Integer(value) => Object::Integer(*value),
        Expression::Str(value) => Object::Str(Rc::new(value.clone())),
        Expression::Boolean(value) => Object::Boolean(*value),
        Expression::Identifier(name) => eval_identifier(name, env),
        Expression::Prefix { op, right } => {
            let right = eval_expression(right, env);
            if right.is_error() {
                return right;
            }
            eval_prefix(*op, right)
        }
        Expression::Infix { left, op, right } => {
            let left = eval_expression(left, env);
            if left.is_error() {
                return left;
            }
            let right = eval_expression(right, env);
            if right.is_error() {
                return right;
            }
            eval_infix(left, *op, right)
        }
        Expression::If {
            condition,
            consequence,
            alternative,
        } => {
            let condition = eval_expression(condition, env);
            if condition.is_error() {
                return condition;
            }
            if condition.is_truthy() {
                eval_block(consequence, env)
            } else if let Some(alternative) = alternative {
                eval_block(alternative, env)
            } else {
                Object::Null
            }
        }
        Expression::Function { parameters, body } => Object::Function(Rc::new(Function {
            parameters: parameters.clone(),
            body: body.clone(),
            env: Rc::clone(env),
        })),
        Expression::Call {
            function,
            arguments,
        } => {
            let function = eval_expression(function, env);
            if function.is_error() {
                return function;
            }
            let arguments = match eval_expressions(arguments, env) {
                Ok(arguments) => arguments,
                Err(error) => return error,
            };
            apply_function(function, arguments)
        }
        Expression::Array(elements) => match eval_expressions(elements, env) {
            Ok(elements) => Object::Array(Rc::new(elements)),
            Err(error) => error,
        },
        Expression::Hash(pairs) => eval_hash_literal(pairs, env),
        Expression::Index { left, index } => {
            let left = eval_expression(left, env);
            if left.is_error() {
                return left;
            }
            let index = eval_expression(index, env);
            if index.is_error() {
                return index;
            }
            eval_index_expression(left, index)
        }
    }
}

fn eval_identifier(name: &str, env: &EnvRef) -> Object {
    if let Some(value) = env.borrow().get(name) {
        return value;
    }
    if let Some(builtin) = lookup_builtin(name) {
        return Object::Builtin(builtin);
    }
    new_error(format!("identifier not found: {name}"))
}

/// Left-to-right argument evaluation, stopping at the first error
fn eval_expressions(expressions: &[Expression], env: &EnvRef) -> Result<Vec<Object>, Object> {
    let mut results = Vec::with_capacity(expressions.len());

    for expression in expressions {
        let value = eval_expression(expression, env);
        if value.is_error() {
            return Err(value);
        }
        results.push(value);
    }

    Ok(results)
}

fn apply_function(function: Object, arguments: Vec<Object>) -> Object {
    match function {
        Object::Function(function) => {
            if arguments.len() != function.parameters.len() {
                return new_error(format!(
                    "wrong number of arguments: want={}, got={}",
                    function.parameters.len(),
                    arguments.len()
                ));
            }

            let inner_env = child_env(&function.env);
            for (parameter, argument) in function.parameters.iter().zip(arguments) {
                inner_env.borrow_mut().define(parameter.clone(), argument);
            }

            unwrap_return(eval_block(&function.body, &inner_env))
        }
        Object::Builtin(builtin) => (builtin.func)(&arguments),
        other => new_error(format!("not a function: {}", other.type_name())),
    }
}

fn unwrap_return(value: Object) -> Object {
    match value {
        Object::Return(value) => *value,
        value => value,
    }
}

fn eval_prefix(op: PrefixOp, operand: Object) -> Object {
    match op {
        PrefixOp::Bang => Object::Boolean(!operand.is_truthy()),
        PrefixOp::Minus => match operand {
            Object::Integer(value) => Object::Integer(-value),
            other => new_error(format!("unknown operator: -{}", other.type_name())),
        },
    }
}

fn eval_infix(left: Object, op: InfixOp, right: Object) -> Object {
    match (&left, &right) {
        (Object::Integer(left), Object::Integer(right)) => {
            eval_integer_infix(*left, op, *right)
        }
        _ if left.type_name() != right.type_name() => new_error(format!(
            "type mismatch: {} {} {}",
            left.type_name(),
            op,
            right.type_name()
        )),
        (Object::Str(left_str), Object::Str(right_str)) if op == InfixOp::Plus => {
            Object::Str(Rc::new(format!("{left_str}{right_str}")))
        }
        _ => match op {
            InfixOp::Eq => Object::Boolean(left.is_identical(&right)),
            InfixOp::NotEq => Object::Boolean(!left.is_identical(&right)),
            _ => new_error(format!(
                "unknown operator: {} {} {}",
                left.type_name(),
                op,
                right.type_name()
            )),
        },
    }
}

fn eval_integer_infix(left: i64, op: InfixOp, right: i64) -> Object {
    match op {
        InfixOp::Plus => Object::Integer(left + right),
        InfixOp::Minus => Object::Integer(left - right),
        InfixOp::Asterisk => Object::Integer(left * right),
        InfixOp::Slash => {
            if right == 0 {
                new_error("division by zero".to_string())
            } else {
                Object::Integer(left / right)
            }
        }
        InfixOp::Lt => Object::Boolean(left < right),
        InfixOp::Gt => Object::Boolean(left > right),
        InfixOp::Eq => Object::Boolean(left == right),
        InfixOp::NotEq => Object::Boolean(left != right),
    }
}

fn eval_hash_literal(pairs: &[(Expression, Expression)], env: &EnvRef) -> Object {
    let mut hash = HashMap::new();

    for (key_expression, value_expression) in pairs {
        let key = eval_expression(key_expression, env);
        if key.is_error() {
            return key;
        }

        let hash_key: HashKey = match key.hash_key() {
            Some(hash_key) => hash_key,
            None => return new_error(format!("unusable as hash key: {}", key.type_name())),
        };

        let value = eval_expression(value_expression, env);
        if value.is_error() {
            return value;
        }

        hash.insert(hash_key, HashPair { key, value });
    }

    Object::Hash(Rc::new(hash))
}

fn eval_index_expression(left: Object, index: Object) -> Object {
    match (&left, &index) {
        (Object::Array(elements), Object::Integer(position)) => {
            if *position < 0 || *position as usize >= elements.len() {
                Object::Null
            } else {
                elements[*position as usize].clone()
            }
        }
        (Object::Hash(pairs), _) => match index.hash_key() {
            Some(hash_key) => pairs
                .get(&hash_key)
                .map(|pair| pair.value.clone())
                .unwrap_or(Object::Null),
            None => new_error(format!("unusable as hash key: {}", index.type_name())),
        },
        _ => new_error(format!(
            "index operator not supported: {}",
            left.type_name()
        )),
    }
}

fn new_error(message: String) -> Object {
    Object::Error(message)
}

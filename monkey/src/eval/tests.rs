//! Evaluator tests

use super::eval_program;
use crate::object::{Environment, Object};
use crate::parser::parse;
use std::rc::Rc;

fn eval(input: &str) -> Object {
    let program = parse(input).expect("parse should succeed");
    let env = Environment::new().into_ref();
    eval_program(&program, &env)
}

fn expect_int(input: &str, expected: i64) {
    assert_eq!(eval(input), Object::Integer(expected), "input: {input}");
}

fn expect_bool(input: &str, expected: bool) {
    assert_eq!(eval(input), Object::Boolean(expected), "input: {input}");
}

fn expect_null(input: &str) {
    assert_eq!(eval(input), Object::Null, "input: {input}");
}

fn expect_error(input: &str, message: &str) {
    match eval(input) {
        Object::Error(actual) => assert_eq!(actual, message, "input: {input}"),
        other => panic!("expected error for input {input}, got {other:?}"),
    }
}

#[test]
fn test_integer_expressions() {
    let tests = [
        ("5", 5),
        ("10", 10),
        ("-5", -5),
        ("-10", -10),
        ("5 * 2", 10),
        ("3 + 2 * 5", 13),
        ("-4 * 6", -24),
        ("6 / 7", 0),
        ("10 / 5 + 2", 4),
        ("5 + 5 + 5 + 5 - 10", 10),
        ("2 * 2 * 2 * 2 * 2", 32),
        ("(5 + 10 * 2 + 15 / 3) * 2 + -10", 50),
    ];

    for (input, expected) in tests {
        expect_int(input, expected);
    }
}

#[test]
fn test_boolean_expressions() {
    let tests = [
        ("true", true),
        ("false", false),
        ("1 < 2", true),
        ("1 > 2", false),
        ("1 == 1", true),
        ("2 != 3", true),
        ("true == true", true),
        ("false == false", true),
        ("true != false", true),
        ("(1 < 2) == true", true),
        ("(1 > 2) == false", true),
    ];

    for (input, expected) in tests {
        expect_bool(input, expected);
    }
}

#[test]
fn test_bang_operator() {
    let tests = [
        ("!true", false),
        ("!false", true),
        ("!5", false),
        ("!!true", true),
        ("!!false", false),
        ("!!5", true),
    ];

    for (input, expected) in tests {
        expect_bool(input, expected);
    }
}

#[test]
fn test_if_else_expressions() {
    expect_int("if (true) { 10 }", 10);
    expect_null("if (false) { 10 }");
    expect_int("if (1) { 10 }", 10);
    expect_int("if (1 < 2) { 10 }", 10);
    expect_null("if (1 > 2) { 10 }");
    expect_int("if (1 > 2) { 10 } else { 20 }", 20);
    expect_int("if (1 < 2) { 10 } else { 20 }", 10);
}

#[test]
fn test_return_statements() {
    let tests = [
        ("return 10;", 10),
        ("return 10; 9;", 10),
        ("9; return 2 * 5; 8;", 10),
        ("if (10 > 1) { if (10 > 1) { return 10; } return 1; }", 10),
    ];

    for (input, expected) in tests {
        expect_int(input, expected);
    }
}

#[test]
fn test_bare_return() {
    expect_null("return;");
    expect_null("let f = fn() { return; 10; }; f();");
}

#[test]
fn test_let_statements() {
    let tests = [
        ("let a = 5; a;", 5),
        ("let a = 5 * 8; a;", 40),
        ("let a = 5; let b = a; b;", 5),
        ("let a = 5; let b = a; let c = a + b + 2; c;", 12),
    ];

    for (input, expected) in tests {
        expect_int(input, expected);
    }
}

#[test]
fn test_functions_and_calls() {
    let tests = [
        ("let identity = fn(x) { x; }; identity(5);", 5),
        ("let identity = fn(x) { return x; }; identity(5);", 5),
        ("let double = fn(x) { x * 2; }; double(5);", 10),
        ("let add = fn(x, y) { x + y; }; add(5, 5);", 10),
        ("let add = fn(x, y) { x + y; }; add(5 + 5, add(5, 5));", 20),
        ("fn(x) { x; }(5)", 5),
    ];

    for (input, expected) in tests {
        expect_int(input, expected);
    }
}

#[test]
fn test_closures() {
    expect_int(
        "let newAdder = fn(x) { fn(y) { x + y }; };
         let addTwo = newAdder(2);
         addTwo(2);",
        4,
    );
    expect_int(
        "let make = fn(x) { fn(y) { x + y } };
         let add2 = make(2);
         add2(3)",
        5,
    );
    // The closure keeps its defining environment alive
    expect_int(
        "let counterFrom = fn(n) { fn() { n + 1 } };
         let next = counterFrom(41);
         next();",
        42,
    );
}

#[test]
fn test_recursion() {
    expect_int(
        "let fib = fn(x) {
           if (x == 0) { 0 } else {
             if (x == 1) { 1 } else {
               fib(x - 1) + fib(x - 2)
             }
           }
         };
         fib(10)",
        55,
    );
}

#[test]
fn test_string_expressions() {
    assert_eq!(
        eval(r#""hello world""#),
        Object::Str(Rc::new("hello world".to_string()))
    );
    assert_eq!(
        eval(r#""foo" + "bar""#),
        Object::Str(Rc::new("foobar".to_string()))
    );
    expect_error(r#""a" - "b""#, "unknown operator: STRING - STRING");
}

#[test]
fn test_string_identity_equality() {
    expect_bool(r#""a" == "a""#, false);
    expect_bool(r#"let s = "a"; s == s"#, true);
}

#[test]
fn test_array_literals_and_indexing() {
    assert_eq!(
        eval("[1, 2 * 2, 3 + 3]"),
        Object::Array(Rc::new(vec![
            Object::Integer(1),
            Object::Integer(4),
            Object::Integer(6),
        ]))
    );

    let tests = [
        ("[1, 2, 3][0]", 1),
        ("[1, 2, 3][1]", 2),
        ("[1, 2, 3][2]", 3),
        ("let i = 0; [1][i];", 1),
        ("[1, 2, 3][1 + 1];", 3),
        ("let myArray = [1, 2, 3]; myArray[2];", 3),
        (
            "let myArray = [1, 2, 3]; myArray[0] + myArray[1] + myArray[2];",
            6,
        ),
    ];
    for (input, expected) in tests {
        expect_int(input, expected);
    }

    expect_null("[1, 2, 3][3]");
    expect_null("[1, 2, 3][-1]");
}

#[test]
fn test_hash_literals_and_indexing() {
    let tests = [
        (r#"{"one": 1}["one"]"#, 1),
        (r#"let key = "one"; {"one": 1}[key]"#, 1),
        ("{1: 1, 2: 2}[2]", 2),
        ("{true: 5}[true]", 5),
        ("{false: 6}[false]", 6),
        (r#"let m = {1: 2, "k": 3}; m[1] + m["k"]"#, 5),
    ];
    for (input, expected) in tests {
        expect_int(input, expected);
    }

    expect_null(r#"{"one": 1}["two"]"#);
    expect_null("{}[0]");
    expect_error("{fn(x) { x }: 1}", "unusable as hash key: FUNCTION");
    expect_error("{1: 2}[fn(x) { x }]", "unusable as hash key: FUNCTION");
}

#[test]
fn test_builtin_functions() {
    let tests = [
        (r#"len("")"#, 0),
        (r#"len("four")"#, 4),
        ("len([1, 2, 3])", 3),
        ("first([1, 2, 3])", 1),
        ("last([1, 2, 3])", 3),
        ("len(push([1, 2], 3))", 3),
        ("len(tail([1, 2, 3]))", 2),
    ];
    for (input, expected) in tests {
        expect_int(input, expected);
    }

    expect_null("first([])");
    expect_null("print(1)");
    expect_error("len(1)", "argument to `len` not supported, got INTEGER");
    expect_error(
        r#"len("one", "two")"#,
        "wrong number of arguments (expected = 1)",
    );
}

#[test]
fn test_error_handling() {
    let tests = [
        ("5 + true;", "type mismatch: INTEGER + BOOLEAN"),
        ("5 + true; 5;", "type mismatch: INTEGER + BOOLEAN"),
        ("-true", "unknown operator: -BOOLEAN"),
        ("true + false;", "unknown operator: BOOLEAN + BOOLEAN"),
        ("5; true + false; 5", "unknown operator: BOOLEAN + BOOLEAN"),
        (
            "if (10 > 1) { true + false; }",
            "unknown operator: BOOLEAN + BOOLEAN",
        ),
        (
            "if (10 > 1) { if (10 > 1) { return true + false; } return 1; }",
            "unknown operator: BOOLEAN + BOOLEAN",
        ),
        ("foobar", "identifier not found: foobar"),
        ("5 / 0", "division by zero"),
        ("5(1)", "not a function: INTEGER"),
        (
            "let add = fn(x, y) { x + y }; add(1)",
            "wrong number of arguments: want=2, got=1",
        ),
        ("[1][true]", "index operator not supported: ARRAY"),
    ];

    for (input, message) in tests {
        expect_error(input, message);
    }
}

#[test]
fn test_errors_stop_evaluation() {
    // The error propagates out of the array literal before the division runs
    expect_error("[5 + true, 1 / 0]", "type mismatch: INTEGER + BOOLEAN");
    expect_error("len(5 + true)", "type mismatch: INTEGER + BOOLEAN");
    expect_error("let x = 5 + true; x", "type mismatch: INTEGER + BOOLEAN");
}

//! VM tests

use super::VM;
use crate::compiler::Compiler;
use crate::error::RuntimeError;
use crate::object::{HashPair, Object};
use crate::parser::parse;
use std::collections::HashMap;
use std::rc::Rc;

fn run(input: &str) -> Result<Object, RuntimeError> {
    let program = parse(input).expect("parse should succeed");
    let mut compiler = Compiler::new();
    compiler.compile(&program).expect("compile should succeed");
    let mut vm = VM::new(compiler.bytecode());
    vm.run()?;
    Ok(vm.last_popped().clone())
}

fn expect(input: &str, expected: Object) {
    match run(input) {
        Ok(actual) => assert_eq!(actual, expected, "input: {input}"),
        Err(error) => panic!("vm error for input {input}: {error}"),
    }
}

fn expect_error(input: &str, message: &str) {
    match run(input) {
        Ok(result) => panic!("expected error for input {input}, got {result}"),
        Err(error) => assert_eq!(error.message, message, "input: {input}"),
    }
}

fn int(value: i64) -> Object {
    Object::Integer(value)
}

fn string(value: &str) -> Object {
    Object::Str(Rc::new(value.to_string()))
}

fn int_array(values: &[i64]) -> Object {
    Object::Array(Rc::new(values.iter().map(|&v| int(v)).collect()))
}

fn int_hash(pairs: &[(i64, i64)]) -> Object {
    let mut map = HashMap::new();
    for &(key, value) in pairs {
        let key = int(key);
        map.insert(
            key.hash_key().unwrap(),
            HashPair {
                key,
                value: int(value),
            },
        );
    }
    Object::Hash(Rc::new(map))
}

#[test]
fn test_integer_arithmetic() {
    let tests = [
        ("1", 1),
        ("2", 2),
        ("1 + 2", 3),
        ("1 - 2", -1),
        ("3 - 5", -2),
        ("8 * 9", 72),
        ("4 / 3", 1),
        ("50 / 2 * 2 + 10 - 5", 55),
        ("5 * (2 + 10)", 60),
        ("(3 + 9) * 2", 24),
        ("2 * (3 + 9)", 24),
        ("3 + 9 * 2", 21),
        ("-5", -5),
        ("-10", -10),
        ("-50 + 100 + -50", 0),
        ("(5 + 10 * 2 + 15 / 3) * 2 + -10", 50),
    ];

    for (input, expected) in tests {
        expect(input, int(expected));
    }
}

#[test]
fn test_boolean_expressions() {
    let tests = [
        ("true", true),
        ("false", false),
        ("1 < 2", true),
        ("1 > 2", false),
        ("1 < 1", false),
        ("1 > 1", false),
        ("1 == 1", true),
        ("1 != 1", false),
        ("1 == 2", false),
        ("1 != 2", true),
        ("true == true", true),
        ("false == false", true),
        ("true == false", false),
        ("true != false", true),
        ("(1 < 2) == true", true),
        ("(1 < 2) == false", false),
        ("(1 > 2) == true", false),
        ("!true", false),
        ("!false", true),
        ("!5", false),
        ("!!true", true),
        ("!!false", false),
        ("!!5", true),
        ("!(if (false) { 5; })", true),
    ];

    for (input, expected) in tests {
        expect(input, Object::Boolean(expected));
    }
}

#[test]
fn test_conditionals() {
    let tests = [
        ("if (true) { 10 }", int(10)),
        ("if (true) { 10 } else { 20 }", int(10)),
        ("if (false) { 10 } else { 20 }", int(20)),
        ("if (1) { 10 }", int(10)),
        ("if (1 < 2) { 10 }", int(10)),
        ("if (1 < 2) { 10 } else { 20 }", int(10)),
        ("if (1 > 2) { 10 } else { 20 }", int(20)),
        ("if (1 > 2) { 10 }", Object::Null),
        ("if (false) { 10 }", Object::Null),
        ("if ((if (false) { 10 })) { 10 } else { 20 }", int(20)),
    ];

    for (input, expected) in tests {
        expect(input, expected);
    }
}

#[test]
fn test_global_let_statements() {
    let tests = [
        ("let one = 1; one", 1),
        ("let one = 1; let two = 2; one + two", 3),
        ("let one = 1; let two = one + one; one + two", 3),
        ("let a = 5; let b = a; let c = a + b + 2; c", 12),
    ];

    for (input, expected) in tests {
        expect(input, int(expected));
    }
}

#[test]
fn test_string_expressions() {
    expect(r#""monkey""#, string("monkey"));
    expect(r#""mon" + "key""#, string("monkey"));
    expect(r#""mon" + "key" + "banana""#, string("monkeybanana"));
    expect(r#""foo" + "bar""#, string("foobar"));
}

#[test]
fn test_string_identity_equality() {
    // Distinct allocations are never equal; a binding is equal to itself.
    expect(r#""a" == "a""#, Object::Boolean(false));
    expect(r#"let s = "a"; s == s"#, Object::Boolean(true));
    expect(r#""a" != "b""#, Object::Boolean(true));
}

#[test]
fn test_array_literals() {
    expect("[]", int_array(&[]));
    expect("[1, 2, 3]", int_array(&[1, 2, 3]));
    expect("[1 + 2, 3 * 4, 5 + 6]", int_array(&[3, 12, 11]));
}

#[test]
fn test_hash_literals() {
    expect("{}", int_hash(&[]));
    expect("{1: 2, 2: 3}", int_hash(&[(1, 2), (2, 3)]));
    expect("{1 + 1: 2 * 2, 3 + 3: 4 * 4}", int_hash(&[(2, 4), (6, 16)]));
}

#[test]
fn test_index_expressions() {
    let tests = [
        ("[1, 2, 3][1]", int(2)),
        ("[1, 2, 3][0 + 2]", int(3)),
        ("[[1, 1, 1]][0][0]", int(1)),
        ("[][0]", Object::Null),
        ("[1, 2, 3][99]", Object::Null),
        ("[1][-1]", Object::Null),
        ("{1: 1, 2: 2}[1]", int(1)),
        ("{1: 1, 2: 2}[2]", int(2)),
        ("{1: 1}[0]", Object::Null),
        ("{}[0]", Object::Null),
        (r#"let m = {1: 2, "k": 3}; m[1] + m["k"]"#, int(5)),
    ];

    for (input, expected) in tests {
        expect(input, expected);
    }
}

#[test]
fn test_calling_functions_without_arguments() {
    let tests = [
        ("let fivePlusTen = fn() { 5 + 10; }; fivePlusTen();", 15),
        ("let one = fn() { 1; }; let two = fn() { 2; }; one() + two()", 3),
        (
            "let a = fn() { 1 }; let b = fn() { a() + 1 }; let c = fn() { b() + 1 }; c();",
            3,
        ),
    ];

    for (input, expected) in tests {
        expect(input, int(expected));
    }
}

#[test]
fn test_functions_with_return_statements() {
    let tests = [
        ("let earlyExit = fn() { return 99; 100; }; earlyExit();", 99),
        ("let earlyExit = fn() { return 99; return 100; }; earlyExit();", 99),
    ];

    for (input, expected) in tests {
        expect(input, int(expected));
    }
}

#[test]
fn test_functions_without_return_value() {
    let tests = [
        "let noReturn = fn() { }; noReturn();",
        "let noReturn = fn() { }; let noReturnTwo = fn() { noReturn(); }; noReturn(); noReturnTwo();",
        "let bare = fn() { return; }; bare();",
    ];

    for input in tests {
        expect(input, Object::Null);
    }
}

#[test]
fn test_first_class_functions() {
    expect(
        "let returnsOne = fn() { 1; };
         let returnsOneReturner = fn() { returnsOne; };
         returnsOneReturner()();",
        int(1),
    );
}

#[test]
fn test_calling_functions_with_bindings() {
    let tests = [
        ("let one = fn() { let one = 1; one }; one();", 1),
        (
            "let oneAndTwo = fn() { let one = 1; let two = 2; one + two; }; oneAndTwo();",
            3,
        ),
        (
            "let oneAndTwo = fn() { let one = 1; let two = 2; one + two; };
             let threeAndFour = fn() { let three = 3; let four = 4; three + four; };
             oneAndTwo() + threeAndFour();",
            10,
        ),
        (
            "let firstFoobar = fn() { let foobar = 50; foobar; };
             let secondFoobar = fn() { let foobar = 100; foobar; };
             firstFoobar() + secondFoobar();",
            150,
        ),
        (
            "let globalSeed = 50;
             let minusOne = fn() { let num = 1; globalSeed - num; };
             let minusTwo = fn() { let num = 2; globalSeed - num; };
             minusOne() + minusTwo();",
            97,
        ),
    ];

    for (input, expected) in tests {
        expect(input, int(expected));
    }
}

#[test]
fn test_calling_functions_with_arguments_and_bindings() {
    let tests = [
        ("let identity = fn(a) { a; }; identity(4);", 4),
        ("let sum = fn(a, b) { a + b; }; sum(1, 2);", 3),
        ("let sum = fn(a, b) { let c = a + b; c; }; sum(1, 2);", 3),
        (
            "let sum = fn(a, b) { let c = a + b; c; }; sum(1, 2) + sum(3, 4);",
            10,
        ),
        (
            "let sum = fn(a, b) { let c = a + b; c; };
             let outer = fn() { sum(1, 2) + sum(3, 4); };
             outer();",
            10,
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
            50,
        ),
    ];

    for (input, expected) in tests {
        expect(input, int(expected));
    }
}

#[test]
fn test_calling_functions_with_wrong_arguments() {
    let tests = [
        ("fn() { 1; }(1);", "wrong number of arguments: want=0, got=1"),
        ("fn(a) { a; }();", "wrong number of arguments: want=1, got=0"),
        (
            "fn(a, b) { a + b; }(1);",
            "wrong number of arguments: want=2, got=1",
        ),
    ];

    for (input, message) in tests {
        expect_error(input, message);
    }
}

#[test]
fn test_builtin_functions() {
    let tests = [
        (r#"len("")"#, int(0)),
        (r#"len("four")"#, int(4)),
        (r#"len("hello world")"#, int(11)),
        ("len([1, 2, 3])", int(3)),
        ("len([])", int(0)),
        ("first([1, 2, 3])", int(1)),
        ("first([])", Object::Null),
        ("last([1, 2, 3])", int(3)),
        ("last([])", Object::Null),
        ("tail([1, 2, 3])", int_array(&[2, 3])),
        ("tail([])", Object::Null),
        ("push([], 1)", int_array(&[1])),
        ("len(push([1, 2], 3))", int(3)),
        ("print(1)", Object::Null),
    ];

    for (input, expected) in tests {
        expect(input, expected);
    }
}

#[test]
fn test_builtin_function_errors() {
    let tests = [
        ("len(1)", "argument to `len` not supported, got INTEGER"),
        (
            r#"len("one", "two")"#,
            "wrong number of arguments (expected = 1)",
        ),
        ("first(1)", "argument to `first` must be array"),
        ("push(1, 1)", "argument to `push` must be array"),
    ];

    for (input, message) in tests {
        expect_error(input, message);
    }
}

#[test]
fn test_closures() {
    let tests = [
        (
            "let newClosure = fn(a) { fn() { a; }; };
             let closure = newClosure(99);
             closure();",
            99,
        ),
        (
            "let make = fn(x) { fn(y) { x + y } };
             let add2 = make(2);
             add2(3)",
            5,
        ),
        (
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
            14,
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
            14,
        ),
        (
            "let newClosure = fn(a, b) {
               let one = fn() { a; };
               let two = fn() { b; };
               fn() { one() + two(); };
             };
             let closure = newClosure(9, 90);
             closure();",
            99,
        ),
    ];

    for (input, expected) in tests {
        expect(input, int(expected));
    }
}

#[test]
fn test_recursive_functions() {
    let tests = [
        (
            "let countDown = fn(x) { if (x == 0) { return 0; } else { countDown(x - 1); } };
             countDown(1);",
            0,
        ),
        (
            "let countDown = fn(x) { if (x == 0) { return 0; } else { countDown(x - 1); } };
             let wrapper = fn() { countDown(1); };
             wrapper();",
            0,
        ),
        (
            "let wrapper = fn() {
               let countDown = fn(x) { if (x == 0) { return 0; } else { countDown(x - 1); } };
               countDown(1);
             };
             wrapper();",
            0,
        ),
        (
            "let fib = fn(x) {
               if (x == 0) { 0 } else {
                 if (x == 1) { 1 } else {
                   fib(x - 1) + fib(x - 2)
                 }
               }
             };
             fib(10)",
            55,
        ),
    ];

    for (input, expected) in tests {
        expect(input, int(expected));
    }
}

#[test]
fn test_error_messages() {
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
        (r#""a" - "b""#, "unknown operator: STRING - STRING"),
        ("true > false", "unknown operator: BOOLEAN > BOOLEAN"),
        ("5 > true", "type mismatch: INTEGER > BOOLEAN"),
        ("5 / 0", "division by zero"),
        ("1()", "calling non-function: INTEGER"),
        (r#""s"[0]"#, "index operator not supported: STRING"),
        ("{fn(x) { x }: 1}", "unusable as hash key: CLOSURE"),
        ("{1: 2}[fn(x) { x }]", "unusable as hash key: CLOSURE"),
    ];

    for (input, message) in tests {
        expect_error(input, message);
    }
}

#[test]
fn test_stack_overflow() {
    let input = format!("[{}]", vec!["1"; super::STACK_SIZE + 10].join(", "));
    expect_error(&input, "stack overflow");
}

#[test]
fn test_frame_overflow() {
    expect_error("let f = fn() { f(); }; f();", "frame overflow");
}

#[test]
fn test_stack_is_empty_after_each_statement() {
    let program = parse("1; 2; 3;").unwrap();
    let mut compiler = Compiler::new();
    compiler.compile(&program).unwrap();
    let mut vm = VM::new(compiler.bytecode());
    vm.run().unwrap();

    assert_eq!(vm.sp, 0);
    assert_eq!(vm.last_popped(), &int(3));
}

#[test]
fn test_globals_survive_across_runs() {
    let mut compiler = Compiler::new();
    let program = parse("let x = 40;").unwrap();
    compiler.compile(&program).unwrap();
    let bytecode = compiler.bytecode();
    let (symbols, constants) = compiler.into_state();

    let mut vm = VM::new(bytecode);
    vm.run().unwrap();
    let globals = vm.into_globals();

    let mut compiler = Compiler::with_state(symbols, constants);
    let program = parse("x + 2").unwrap();
    compiler.compile(&program).unwrap();
    let mut vm = VM::with_globals(compiler.bytecode(), globals);
    vm.run().unwrap();

    assert_eq!(vm.last_popped(), &int(42));
}

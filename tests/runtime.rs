use minipar::{
    backend::{Instruction, Op},
    runtime::Options,
};
use test_case::test_case;

mod common;

#[test_case("float_promotion", "3.5\n"; "float promotion")]
#[test_case("loop", "0\n1\n2\n"; "while loop")]
#[test_case("function_call", "5\n"; "function call")]
#[test_case("repeated_calls", "3\n"; "repeated function calls")]
#[test_case("early_return", "9 8\n2\n"; "early return and nested calls")]
#[test_case("matrix", "3\n"; "nested array access")]
#[test_case("arrays", "[1, 2, 3, 0, 9]\n5\n"; "array concat and growth")]
#[test_case("channels", "42\n"; "channel send and receive")]
#[test_case("factorial", "ok\n"; "loop and branch")]
#[test_case("print_many", "sum: 3 [1, 2] 2.5\n"; "variadic print")]
#[test_case("calculator", "0\n"; "calculator without legacy recompute")]
fn runtime(name: &str, expected: &str) {
    let output = common::run(name, Options::default()).unwrap();

    assert_eq!(output.stdout, expected);
}

#[test_case(7, "+", 3, 10; "add")]
#[test_case(7, "-", 10, -3; "sub")]
#[test_case(6, "*", 7, 42; "mul")]
#[test_case(7, "/", 2, 3; "div truncates")]
#[test_case(-7, "/", 2, -3; "div truncates toward zero")]
#[test_case(5, "/", 0, 0; "div by zero")]
fn integer_arithmetic(a: i64, op: &str, b: i64, expected: i64) {
    let source = format!("x = {a} {op} {b}; print x;");
    let output = common::run_source(&source, Options::default()).unwrap();

    assert_eq!(output.stdout, format!("{expected}\n"));
    assert_eq!(output.ints.get("x"), Some(&expected));
}

#[test_case("function_call"; "single call")]
#[test_case("repeated_calls"; "calls in a loop")]
#[test_case("early_return"; "early returns")]
fn call_stack_is_empty_after_calls(name: &str) {
    let output = common::run(name, Options::default()).unwrap();

    assert_eq!(output.call_depth, 0);
}

#[test]
fn final_int_environment() {
    let output = common::run("factorial", Options::default()).unwrap();

    assert_eq!(output.ints.get("acc"), Some(&120));
    assert_eq!(output.ints.get("n"), Some(&1));
}

#[test]
fn legacy_calculator_recomputes_result() {
    let options = Options {
        legacy_calculator: true,
        ..Options::default()
    };
    let output = common::run("calculator", options).unwrap();

    assert_eq!(output.stdout, "48\n");
    assert_eq!(output.ints.get("resultado"), Some(&48));
}

#[test]
fn partial_message_is_not_received() {
    let instr = |result: &str, op: Op, arg1: &str, arg2: &str| {
        Instruction::new(result, op, arg1, arg2)
    };
    let instructions = vec![
        instr("", Op::Send, "c", "2"),
        instr("c", Op::SendArg, "1", "0"),
        instr("", Op::Receive, "c", "2"),
        instr("x", Op::RecvArg, "c", "0"),
        instr("y", Op::RecvArg, "c", "1"),
        // the second argument completes the message after the first receive
        instr("c", Op::SendArg, "2", "1"),
        instr("", Op::Receive, "c", "2"),
        instr("u", Op::RecvArg, "c", "0"),
        instr("v", Op::RecvArg, "c", "1"),
    ];
    let output = common::execute(&instructions, Options::default()).unwrap();

    assert_eq!(output.ints.get("x"), Some(&0));
    assert_eq!(output.ints.get("y"), Some(&0));
    assert_eq!(output.ints.get("u"), Some(&1));
    assert_eq!(output.ints.get("v"), Some(&2));
}

#[test]
fn step_limit() {
    let options = Options {
        max_steps: Some(50),
        ..Options::default()
    };
    let output = common::run_source("i = 0; while (1) { i = i + 1; }", options).unwrap();

    assert!(output.ints.get("i").is_some_and(|i| *i > 0));
}

#[test]
fn run_from_library() {
    let mut out = vec![];
    let ints = minipar::run("x = 2 * 21; print x;", &mut out).unwrap();

    assert_eq!(String::from_utf8(out).unwrap(), "42\n");
    assert_eq!(ints.get("x"), Some(&42));
}

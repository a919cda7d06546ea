// Integration tests for whole Wyrd programs
// These run hardcoded source strings through the public API the way an
// embedding host would, checking results, printed output and state that
// outlives a single evaluation.

use pretty_assertions::assert_eq;
use wyrd_core::builtins::{BuiltinDef, INTEGER, STRING};
use wyrd_core::error::ErrorCategory;
use wyrd_core::value::ValueType;
use wyrd_core::{BufferOutput, Interpreter, InterpreterConfig, RuntimeError, Value};

fn setup_interpreter() -> (Interpreter, BufferOutput) {
    let mut interp = Interpreter::new();
    let out = BufferOutput::new();
    interp.set_output(Box::new(out.clone()));
    (interp, out)
}

fn run(code: &str) -> Result<Value, RuntimeError> {
    let (mut interp, _) = setup_interpreter();
    interp.eval_str(code)
}

fn run_ok(code: &str) -> Value {
    match run(code) {
        Ok(value) => value,
        Err(e) => panic!("program failed: {e}\n{code}"),
    }
}

#[test]
fn test_factorial_function() {
    let code = r#"
        ; recursion through the caller's context
        fact: fn { n } {
            either n < 2 { 1 } { n * ( fact n - 1 ) }
        }
        fact 10
    "#;
    assert_eq!(run_ok(code), Value::Integer(3628800));
}

#[test]
fn test_naive_fibonacci() {
    let code = r#"
        fib: fn { n } {
            either n < 2 { n } { ( fib n - 1 ) + ( fib n - 2 ) }
        }
        fib 15
    "#;
    assert_eq!(run_ok(code), Value::Integer(610));
}

#[test]
fn test_closure_counter_keeps_its_own_state() {
    let code = r#"
        make-counter: does {
            state: context { var 'n 0 }
            closure { } { do\in state { n:: n + 1 } }
        }
        c: make-counter
        c c c
    "#;
    let (mut interp, _) = setup_interpreter();
    assert_eq!(interp.eval_str(code), Ok(Value::Integer(3)));
}

#[test]
fn test_left_to_right_and_qmath_precedence() {
    assert_eq!(run_ok("2 + 3 * 4"), Value::Integer(20));
    assert_eq!(run_ok("qmath { 2 + 3 * 4 }"), Value::Integer(14));
    assert_eq!(run_ok("a: 6 qmath { ?a * ?a - 1 }"), Value::Integer(35));
}

#[test]
fn test_qmath_division_by_zero_fails() {
    let err = run("qmath { 1 / 0 }").unwrap_err();
    assert!(err.to_string().contains("division by zero"), "{err}");
    assert_eq!(run_ok("qmath { 1 / 0 } |fix { -1 }"), Value::Integer(-1));
}

#[test]
fn test_arg_error_names_position_and_skips_callback() {
    fn shout(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
        interp.writeln("called");
        Ok(args[1].clone())
    }

    let (mut interp, out) = setup_interpreter();
    interp.register_builtin(
        BuiltinDef::new("shout", 2, "Repeats a string.", shout).with_args(&[STRING, INTEGER]),
    );

    assert_eq!(interp.eval_str("shout \"hey\" 3"), Ok(Value::Integer(3)));
    assert_eq!(out.contents(), "called\n");
    out.clear();

    let err = interp.eval_str("shout \"hey\" \"three\"").unwrap_err();
    let RuntimeError::Failure(value) = err else {
        panic!("expected a failure value, got {err:?}");
    };
    assert_eq!(
        value.category,
        ErrorCategory::Arg {
            builtin: "shout".into(),
            position: 2,
            accepted: vec![ValueType::Integer],
        }
    );
    assert_eq!(out.contents(), "");
}

#[test]
fn test_constants_and_vars() {
    let (mut interp, _) = setup_interpreter();
    interp.eval_str("limit: 10 var 'count 0").unwrap();

    let err = interp.eval_str("limit:: 11").unwrap_err();
    assert!(err.to_string().contains("can't modify constant limit"), "{err}");
    assert!(interp.eval_str("set! 11 'limit").is_err());
    assert_eq!(interp.eval_str("limit"), Ok(Value::Integer(10)));

    assert_eq!(interp.eval_str("count:: count + 1 count"), Ok(Value::Integer(1)));
    assert_eq!(interp.eval_str("change! 1 'count"), Ok(Value::Boolean(false)));
    assert_eq!(interp.eval_str("change! 2 'count"), Ok(Value::Boolean(true)));
    assert_eq!(interp.eval_str("is-var? 'count"), Ok(Value::Boolean(true)));
    assert_eq!(interp.eval_str("is-var? 'limit"), Ok(Value::Boolean(false)));
}

#[test]
fn test_modify_reaches_the_nearest_owner() {
    let code = r#"
        var 'total 0
        add: fn { x } { total:: total + x }
        add 5 add 7
        total
    "#;
    assert_eq!(run_ok(code), Value::Integer(12));
}

#[test]
fn test_nearest_binding_shadows_outer() {
    let (mut interp, _) = setup_interpreter();
    assert_eq!(
        interp.eval_str("x: 1 c: context { x: 2 y: x } c/y"),
        Ok(Value::Integer(2))
    );
    assert_eq!(interp.eval_str("x"), Ok(Value::Integer(1)));
}

#[test]
fn test_defer_runs_in_order_with_live_values() {
    let code = r#"
        f: does {
            var 'n 1
            defer { print n }
            defer { print "second" }
            n:: 5
            print "body"
            n
        }
        f
    "#;
    let (mut interp, out) = setup_interpreter();
    assert_eq!(interp.eval_str(code), Ok(Value::Integer(5)));
    assert_eq!(out.contents(), "body\n5\nsecond\n");
}

#[test]
fn test_do_in_restores_context() {
    let (mut interp, _) = setup_interpreter();
    interp.eval_str("c: context { a: 1 }").unwrap();
    assert_eq!(interp.eval_str("do\\in c { a + 1 }"), Ok(Value::Integer(2)));
    assert_eq!(interp.ctx, interp.top);
    assert!(interp.eval_str("do\\in c { fail \"inner\" }").is_err());
    assert_eq!(interp.ctx, interp.top);
    assert!(interp.eval_str("a").is_err());
}

#[test]
fn test_failure_handling_pipeline() {
    let code = r#"
        load: fn { key } {
            either key = "ok" { 200 } { ^fail { 404 "not found" } }
        }
        [
            load "ok" |fix { 0 }
            load "missing" |fix { 0 }
            load "missing" |disarm |status?
            load "missing" |check "loading failed" |disarm |cause? |message?
        ]
    "#;
    assert_eq!(
        run_ok(code),
        Value::block(vec![
            Value::Integer(200),
            Value::Integer(0),
            Value::Integer(404),
            Value::string("not found"),
        ])
    );
}

#[test]
fn test_unhandled_failure_surfaces_at_top() {
    let err = run("print \"before\" fail \"stop\" print \"after\"").unwrap_err();
    assert_eq!(err.to_string(), "Error: stop");
}

#[test]
fn test_interpreter_recovers_after_error() {
    let (mut interp, _) = setup_interpreter();
    assert!(interp.eval_str("no-such-word").is_err());
    assert_eq!(interp.eval_str("1 + 1"), Ok(Value::Integer(2)));
}

#[test]
fn test_generic_dispatch_on_receiver_kind() {
    assert_eq!(run_ok("\"hello\" |length?"), Value::Integer(5));
    assert_eq!(run_ok("{ 1 2 3 } .length?"), Value::Integer(3));
    assert_eq!(run_ok("list { 1 2 } |length?"), Value::Integer(2));
    assert_eq!(run_ok("21 .double"), Value::Integer(42));
    assert_eq!(run_ok("integer//double 5"), Value::Integer(10));
    assert!(run("2.5 .double").is_err());
}

#[test]
fn test_math_module() {
    assert_eq!(run_ok("math/abs -7"), Value::Integer(7));
    assert_eq!(run_ok("math/max 2 9"), Value::Integer(9));
    assert!(run("abs -7").is_err());
}

#[test]
fn test_prelude_words() {
    assert_eq!(run_ok("negate 4"), Value::Integer(-4));
    assert_eq!(run_ok("square 12"), Value::Integer(144));
    assert_eq!(run_ok("[ even? 4 odd? 4 zero? 0 ]"), Value::block(vec![
        Value::Boolean(true),
        Value::Boolean(false),
        Value::Boolean(true),
    ]));
}

#[test]
fn test_without_prelude() {
    let mut interp = Interpreter::with_config(InterpreterConfig {
        load_prelude: false,
        ..InterpreterConfig::default()
    });
    assert!(interp.eval_str("square 3").is_err());
    assert_eq!(interp.eval_str("3 * 3"), Ok(Value::Integer(9)));
}

#[test]
fn test_state_round_trip_through_dump() {
    let (mut first, _) = setup_interpreter();
    first
        .eval_str(
            r#"
            name: "wyrd"
            var 'runs 3
            greet: fn { who } { "hi " + who }
            settings: context { depth: 2 }
            "#,
        )
        .unwrap();
    let dump = first.eval_str("dump\\state").unwrap();
    let Value::String(source) = dump else {
        panic!("dump\\state returned {dump:?}");
    };

    let (mut second, _) = setup_interpreter();
    let top = second.top;
    let restored = wyrd_core::persist::restore_source(&mut second, &source, top).unwrap();
    assert_eq!(restored, 4);
    assert_eq!(second.eval_str("greet name"), Ok(Value::string("hi wyrd")));
    assert_eq!(second.eval_str("runs:: runs + 1 runs"), Ok(Value::Integer(4)));
    assert_eq!(second.eval_str("settings/depth"), Ok(Value::Integer(2)));
    assert!(second.eval_str("name:: \"other\"").is_err());
}

#[test]
fn test_collection_words_and_error_kinds_survive_a_dump() {
    let (mut first, _) = setup_interpreter();
    first
        .eval_str(
            r#"
            colors: list { 'red 'green }
            lookup: dict { "primary" 'blue "fallback" list { 'grey } }
            grid: table { name shade } { "sky" 'light "sea" 'deep }
            missing: try { nth { 1 } 5 }
            "#,
        )
        .unwrap();
    let Ok(Value::String(source)) = first.eval_str("dump\\state") else {
        panic!("dump\\state did not return source");
    };
    assert!(source.contains("colors: list { 'red 'green }"), "{source}");
    assert!(source.contains("failure\\kind { lookup-error }"), "{source}");

    let (mut second, _) = setup_interpreter();
    let top = second.top;
    assert_eq!(wyrd_core::persist::restore_source(&mut second, &source, top), Ok(4));
    for name in ["colors", "lookup", "grid", "missing"] {
        assert_eq!(second.eval_str(name), first.eval_str(name), "{name}");
    }
    let Ok(Value::Error(err)) = second.eval_str("missing") else {
        panic!("missing did not reload as an error");
    };
    assert_eq!(err.category, ErrorCategory::Lookup);
}

#[test]
fn test_non_finite_decimal_blocks_the_dump() {
    let (mut interp, _) = setup_interpreter();
    interp.eval_str("ok: 1.5 d: 1e308 * 10.0").unwrap();
    let err = interp.eval_str("dump\\state").unwrap_err();
    assert!(err.to_string().contains("can't serialize d: decimal inf"), "{err}");
}

#[test]
fn test_save_and_restore_state_through_a_file() {
    let path = std::env::temp_dir().join(format!("wyrd-state-{}.wyrd", std::process::id()));
    let path_literal = format!("{:?}", path.display().to_string());

    let (mut first, _) = setup_interpreter();
    first
        .eval_str("var 'visits 2 tags: list { 'new 'hot } conf: context { port: 8080 }")
        .unwrap();
    first.eval_str(&format!("save\\state {path_literal}")).unwrap();
    let saved = std::fs::read_to_string(&path).unwrap();
    assert!(saved.starts_with("; wyrd state saved "), "{saved}");

    let (mut second, _) = setup_interpreter();
    let restored = second.eval_str(&format!("restore\\state {path_literal}"));
    std::fs::remove_file(&path).unwrap();

    assert_eq!(restored, Ok(Value::Integer(3)));
    assert_eq!(second.eval_str("visits:: visits + 1 visits"), Ok(Value::Integer(3)));
    assert_eq!(second.eval_str("tags"), first.eval_str("tags"));
    assert_eq!(second.eval_str("conf/port"), Ok(Value::Integer(8080)));
}

#[test]
fn test_contexts_from_finished_calls_are_reclaimed() {
    let (mut interp, _) = setup_interpreter();
    interp.eval_str("f: fn { n } { c: current n }").unwrap();
    let baseline = interp.contexts.live_count();
    interp.eval_str("loop 1000 { f 1 }").unwrap();
    assert_eq!(interp.contexts.live_count(), baseline);
}

#[test]
fn test_deep_recursion_grows_the_stack() {
    let code = r#"
        count-down: fn { n } { either n = 0 { 0 } { count-down n - 1 } }
        count-down 2000
    "#;
    assert_eq!(run_ok(code), Value::Integer(0));
}

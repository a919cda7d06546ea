// Control-flow primitives
//
// Blocks handed to these builtins are evaluated in the caller's context.
// Whatever flags the inner evaluation raised are left in place, so a
// `return` or an error inside a loop body stops the loop and everything
// around it.

use crate::builtins::{ANY, BLOCK, BuiltinDef, CONTEXT, INTEGER};
use crate::error::RuntimeError;
use crate::interpreter::Interpreter;
use crate::primitives::{block_arg, context_arg, integer_arg};
use crate::value::{Block, Value, ValueType};

fn stop_requested(interp: &Interpreter) -> bool {
    interp.error_flag || interp.return_flag || interp.skip_flag
}

// do { body } -> value
fn do_(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let block = block_arg("do", &args[0])?;
    Ok(interp.do_block(block))
}

// if condition { body } -> value or void
fn if_(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let block = block_arg("if", &args[1])?;
    if args[0].is_truthy() {
        Ok(interp.do_block(block))
    } else {
        Ok(Value::Void)
    }
}

// either condition { then } { else } -> value
fn either(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let branch = if args[0].is_truthy() { &args[1] } else { &args[2] };
    let block = block_arg("either", branch)?;
    Ok(interp.do_block(block))
}

// loop n { body } -> last value
// Runs the body n times with the 1-based counter injected.
fn loop_(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let count = integer_arg("loop", &args[0])?;
    let block = block_arg("loop", &args[1])?;
    let mut result = Value::Void;
    for i in 1..=count {
        result = interp.do_block_inj(block, Value::Integer(i));
        if stop_requested(interp) {
            break;
        }
    }
    Ok(result)
}

// for series { body } -> last value
fn for_(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let block = block_arg("for", &args[1])?;
    let items: Vec<Value> = match &args[0] {
        Value::Block(b) => b.items.to_vec(),
        Value::List(items) => items.as_ref().clone(),
        Value::String(s) => s.chars().map(|c| Value::String(c.to_string().into())).collect(),
        other => {
            return Err(RuntimeError::builtin(
                "for",
                format!("can't iterate over {}", other.value_type()),
            ));
        }
    };
    let mut result = Value::Void;
    for item in items {
        result = interp.do_block_inj(block, item);
        if stop_requested(interp) {
            break;
        }
    }
    Ok(result)
}

// return value
fn return_(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    interp.return_flag = true;
    Ok(args[0].clone())
}

// or-return value default -> value
// A failed first argument ends the enclosing function with the default as
// its result; anything else passes through.
fn or_return(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    match &args[0] {
        Value::Error(_) => {
            interp.skip_flag = true;
            Ok(args[1].clone())
        }
        value => Ok(value.clone()),
    }
}

// defer { body }
fn defer(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let block = block_arg("defer", &args[0])?;
    interp.defer_blocks.push(block.clone());
    Ok(Value::Void)
}

// defer\ value { body }
// RUST CONCEPT: Building code as data
// `defer\ value block` registers the expression `value .with block`, so
// the block later runs with the value captured now injected.
fn defer_with(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let block = block_arg("defer\\", &args[1])?;
    let value = match &args[0] {
        // keep a word value from being looked up when the block runs
        Value::Word(word) => Value::Tagword(*word),
        other => other.clone(),
    };
    let with = interp.word("with");
    interp.defer_blocks.push(Block::new(vec![
        value,
        Value::Opword(with),
        Value::Block(block.clone()),
    ]));
    Ok(Value::Void)
}

// collect! value
// Appends to the frame's forced result, which replaces the function's
// normal result when it exits.
fn collect(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let value = args[0].clone();
    let mut items = match interp.forced_result.take() {
        Some(Value::Block(block)) => block.items.to_vec(),
        _ => Vec::new(),
    };
    items.push(value.clone());
    interp.forced_result = Some(Value::block(items));
    Ok(value)
}

// returns! value
fn returns(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    interp.forced_result = Some(args[0].clone());
    Ok(args[0].clone())
}

// collected -> { values }
fn collected(interp: &mut Interpreter, _: &[Value]) -> Result<Value, RuntimeError> {
    Ok(interp
        .forced_result
        .clone()
        .unwrap_or_else(|| Value::Block(Block::new(Vec::new()))))
}

// do\in context { body } -> value
fn do_in(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let ctx = context_arg("do\\in", &args[0])?;
    let block = block_arg("do\\in", &args[1])?;
    interp.context(ctx)?;
    Ok(interp.do_block_in(ctx, block))
}

// do\par context { body } -> value
// Evaluates in the given context with the caller's context temporarily
// installed as its parent. The old parent is put back on every path.
fn do_par(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let ctx = context_arg("do\\par", &args[0])?;
    let block = block_arg("do\\par", &args[1])?;
    let caller = interp.ctx;
    if ctx == caller {
        return Ok(interp.do_block(block));
    }

    let saved = interp.context_mut(ctx)?.parent.replace(caller);
    let result = interp.do_block_in(ctx, block);
    if let Ok(context) = interp.context_mut(ctx) {
        context.parent = saved;
    }
    Ok(result)
}

const ANY_ITERABLE: &[ValueType] = &[ValueType::Block, ValueType::List, ValueType::String];

pub const BUILTINS: &[BuiltinDef] = &[
    BuiltinDef::new("do", 1, "Evaluates a block and returns its last value.", do_)
        .mark_pure()
        .with_args(&[BLOCK]),
    BuiltinDef::new("if", 2, "Evaluates the block when the condition is truthy.", if_)
        .mark_pure()
        .with_args(&[ANY, BLOCK]),
    BuiltinDef::new("either", 3, "Evaluates the first block when the condition is truthy, else the second.", either)
        .mark_pure()
        .with_args(&[ANY, BLOCK, BLOCK]),
    BuiltinDef::new("loop", 2, "Evaluates the block n times, injecting the 1-based counter.", loop_)
        .mark_pure()
        .with_args(&[INTEGER, BLOCK]),
    BuiltinDef::new("for", 2, "Evaluates the block once per item, injecting the item.", for_)
        .mark_pure()
        .with_args(&[ANY_ITERABLE, BLOCK]),
    BuiltinDef::new("return", 1, "Returns a value from the enclosing function.", return_).mark_pure(),
    BuiltinDef::new("or-return", 2, "Returns the default from the enclosing function if the value failed.", or_return)
        .mark_pure()
        .with_failure(),
    BuiltinDef::new("defer", 1, "Runs the block when the enclosing function exits.", defer)
        .with_args(&[BLOCK]),
    BuiltinDef::new("defer\\", 2, "Like defer, injecting the value captured now into the block.", defer_with)
        .with_args(&[ANY, BLOCK]),
    BuiltinDef::new("collect!", 1, "Appends a value to the enclosing function's collected result.", collect),
    BuiltinDef::new("returns!", 1, "Sets the value the enclosing function returns on exit.", returns),
    BuiltinDef::new("collected", 0, "The values collected so far in this function.", collected),
    BuiltinDef::new("do\\in", 2, "Evaluates a block inside the given context.", do_in)
        .with_args(&[CONTEXT, BLOCK]),
    BuiltinDef::new("do\\par", 2, "Evaluates a block in a context whose parent is temporarily the caller's context.", do_par)
        .with_args(&[CONTEXT, BLOCK]),
];

#[cfg(test)]
mod tests {
    use crate::primitives::test_support::capturing;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_do_if_either() {
        let (mut interp, _) = capturing();
        assert_eq!(interp.eval_str("do { 1 + 2 }"), Ok(Value::Integer(3)));
        assert_eq!(interp.eval_str("if 1 { 5 }"), Ok(Value::Integer(5)));
        assert_eq!(interp.eval_str("if 0 { 5 }"), Ok(Value::Void));
        assert_eq!(interp.eval_str("either 0 { 1 } { 2 }"), Ok(Value::Integer(2)));
    }

    #[test]
    fn test_loop_injects_counter() {
        let (mut interp, _) = capturing();
        assert_eq!(
            interp.eval_str("x:: 0 loop 4 { + x ::x } x"),
            Ok(Value::Integer(10))
        );
    }

    #[test]
    fn test_for_over_block() {
        let (mut interp, out) = capturing();
        interp.eval_str("for { 1 2 3 } { .print }").unwrap();
        assert_eq!(out.contents(), "1\n2\n3\n");
    }

    #[test]
    fn test_return_stops_loop() {
        let (mut interp, out) = capturing();
        let result = interp.eval_str("f: does { loop 5 { .print , if 2 = 2 { return 99 } } 0 } f");
        assert_eq!(result, Ok(Value::Integer(99)));
        assert_eq!(out.contents(), "1\n");
    }

    #[test]
    fn test_or_return_leaves_function_with_default() {
        let (mut interp, _) = capturing();
        let result = interp.eval_str("g: fn { x } { y: or-return 100 / x -1 , y * 10 } [ g 0 g 5 ]");
        assert_eq!(
            result,
            Ok(Value::block(vec![Value::Integer(-1), Value::Decimal(200.0)]))
        );
    }

    #[test]
    fn test_defer_runs_at_function_exit_in_order() {
        let (mut interp, out) = capturing();
        interp
            .eval_str("f: does { defer { print \"a\" } defer\\ 5 { .print } print \"body\" } f")
            .unwrap();
        assert_eq!(out.contents(), "body\na\n5\n");
    }

    #[test]
    fn test_collect_and_returns() {
        let (mut interp, _) = capturing();
        assert_eq!(
            interp.eval_str("f: does { collect! 1 collect! 2 x: collected returns! length? x } f"),
            Ok(Value::Integer(2))
        );
        assert_eq!(
            interp.eval_str("f: does { collect! 1 collect! 2 0 } f"),
            Ok(Value::block(vec![Value::Integer(1), Value::Integer(2)]))
        );
        assert_eq!(
            interp.eval_str("f: does { returns! 7 1 } f"),
            Ok(Value::Integer(7))
        );
    }

    #[test]
    fn test_do_in_restores_context_on_failure() {
        let (mut interp, _) = capturing();
        interp.eval_str("c: context { a: 1 }").unwrap();
        assert_eq!(interp.eval_str("do\\in c { a + 1 }"), Ok(Value::Integer(2)));
        assert!(interp.eval_str("do\\in c { fail \"x\" }").is_err());
        assert_eq!(interp.ctx, interp.top);
    }

    #[test]
    fn test_do_par_restores_parent() {
        let (mut interp, _) = capturing();
        interp.eval_str("c: isolate { a: 1 } b: 41").unwrap();
        assert_eq!(interp.eval_str("do\\par c { a + b }"), Ok(Value::Integer(42)));
        // without the caller as parent, `b` is out of reach again
        assert!(interp.eval_str("do\\in c { b }").is_err());
    }
}

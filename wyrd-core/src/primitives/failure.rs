// Failure construction, inspection and recovery
//
// A failure is an Error value in the result register with the failure flag
// raised. Builtins here that take failures as arguments are declared with
// `with_failure()`, so the evaluator lowers the flag before calling them and
// they see the Error as an ordinary value. The `^` variants also raise the
// return flag, ending the enclosing function with the failure as its result.

use crate::builtins::{ANY, BLOCK, BuiltinDef, ERROR};
use crate::error::{ErrorCategory, ErrorValue, RuntimeError};
use crate::interpreter::Interpreter;
use crate::primitives::block_arg;
use crate::value::{Block, Value, ValueType};
use std::rc::Rc;

const ERROR_SPEC: &[ValueType] = &[
    ValueType::String,
    ValueType::Integer,
    ValueType::Block,
    ValueType::Error,
];

/// Builds an error from `"message"`, a status code, `{ status "message" }`
/// or an existing error.
pub(crate) fn error_from_spec(builtin: &str, spec: &Value) -> Result<ErrorValue, RuntimeError> {
    match spec {
        Value::String(message) => Ok(ErrorValue::new(ErrorCategory::User, 0, message.as_ref())),
        Value::Integer(status) => Ok(ErrorValue::new(ErrorCategory::User, *status, "")),
        Value::Error(err) => Ok(err.as_ref().clone()),
        Value::Block(block) => {
            let mut err = ErrorValue::new(ErrorCategory::User, 0, "");
            for item in block.items.iter() {
                match item {
                    Value::Integer(status) => err.status = *status,
                    Value::String(message) => err.message = message.to_string(),
                    other => {
                        return Err(RuntimeError::builtin(
                            builtin,
                            format!("unexpected {} in failure spec", other.value_type()),
                        ));
                    }
                }
            }
            Ok(err)
        }
        other => Err(RuntimeError::builtin(
            builtin,
            format!("can't make a failure from {}", other.value_type()),
        )),
    }
}

// Reads `{ lookup-error }`, `{ builtin-error "name" }`, `{ modify-error "word" }`
// or `{ arg-error "builtin" position { kinds } }`, the forms a dump writes.
fn category_from_spec(interp: &Interpreter, block: &Block) -> Result<ErrorCategory, RuntimeError> {
    let bad = || RuntimeError::builtin("failure\\kind", "unknown error kind");
    let name = match block.items.first() {
        Some(Value::Word(w) | Value::Tagword(w)) => interp.words.name(*w),
        _ => return Err(bad()),
    };
    let text = |index: usize| match block.items.get(index) {
        Some(Value::String(s)) => Ok(s.clone()),
        _ => Err(bad()),
    };
    Ok(match name {
        "failure" => ErrorCategory::User,
        "lookup-error" => ErrorCategory::Lookup,
        "parse-error" => ErrorCategory::Parse,
        "builtin-error" => ErrorCategory::Builtin { builtin: text(1)? },
        "modify-error" => ErrorCategory::Modify { word: text(1)? },
        "arg-error" => {
            let position = match block.items.get(2) {
                Some(Value::Integer(n)) => usize::try_from(*n).map_err(|_| bad())?,
                _ => return Err(bad()),
            };
            let accepted = match block.items.get(3) {
                Some(Value::Block(kinds)) => kinds
                    .items
                    .iter()
                    .map(|kind| match kind {
                        Value::Word(w) => ValueType::from_name(interp.words.name(*w)).ok_or_else(bad),
                        _ => Err(bad()),
                    })
                    .collect::<Result<Vec<_>, _>>()?,
                _ => return Err(bad()),
            };
            ErrorCategory::Arg {
                builtin: text(1)?,
                position,
                accepted,
            }
        }
        _ => return Err(bad()),
    })
}

fn raise(err: ErrorValue) -> Result<Value, RuntimeError> {
    Err(RuntimeError::Failure(Rc::new(err)))
}

// fail spec -> failure
fn fail(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    raise(error_from_spec("fail", &args[0])?)
}

// ^fail spec -> failure, returned
fn fail_return(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let err = error_from_spec("^fail", &args[0])?;
    interp.return_flag = true;
    raise(err)
}

// failure spec -> error
fn failure(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Error(Rc::new(error_from_spec("failure", &args[0])?)))
}

// failure\kind { kind ... } spec -> error
fn failure_kind(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let kind = block_arg("failure\\kind", &args[0])?;
    let mut err = error_from_spec("failure\\kind", &args[1])?;
    err.category = category_from_spec(interp, kind)?;
    Ok(Value::Error(Rc::new(err)))
}

// failure\wrap spec cause -> error
fn failure_wrap(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let err = error_from_spec("failure\\wrap", &args[0])?;
    match &args[1] {
        Value::Error(parent) => Ok(Value::Error(Rc::new(err.wrapping(parent.clone())))),
        _ => Ok(Value::Error(Rc::new(err))),
    }
}

// refail cause spec -> failure
// Wraps an existing failure in a new one and raises it.
fn refail(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let err = error_from_spec("refail", &args[1])?;
    match &args[0] {
        Value::Error(parent) => raise(err.wrapping(parent.clone())),
        _ => raise(err),
    }
}

fn check_impl(interp: &mut Interpreter, args: &[Value], name: &str, returning: bool) -> Result<Value, RuntimeError> {
    match &args[0] {
        Value::Error(cause) => {
            let err = error_from_spec(name, &args[1])?.wrapping(cause.clone());
            if returning {
                interp.return_flag = true;
            }
            raise(err)
        }
        value => Ok(value.clone()),
    }
}

// check value spec -> value or failure
fn check(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    check_impl(interp, args, "check", false)
}

// ^check value spec -> value or failure, returned
fn check_return(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    check_impl(interp, args, "^check", true)
}

fn ensure_impl(interp: &mut Interpreter, args: &[Value], name: &str, returning: bool) -> Result<Value, RuntimeError> {
    if args[0].is_truthy() {
        return Ok(args[0].clone());
    }
    let err = error_from_spec(name, &args[1])?;
    if returning {
        interp.return_flag = true;
    }
    raise(err)
}

// ensure value spec -> value or failure
fn ensure(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    ensure_impl(interp, args, "ensure", false)
}

// ^ensure value spec -> value or failure, returned
fn ensure_return(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    ensure_impl(interp, args, "^ensure", true)
}

// fix value { handler } -> value
// On a failure, evaluates the block with the failure injected.
fn fix(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let block = block_arg("fix", &args[1])?;
    match &args[0] {
        Value::Error(_) => Ok(interp.do_block_inj(block, args[0].clone())),
        value => Ok(value.clone()),
    }
}

// ^fix value { handler } -> value
fn fix_return(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let block = block_arg("^fix", &args[1])?;
    match &args[0] {
        Value::Error(_) => {
            let result = interp.do_block_inj(block, args[0].clone());
            interp.return_flag = true;
            Ok(result)
        }
        value => Ok(value.clone()),
    }
}

// fix\either value { on-failure } { otherwise } -> value
fn fix_either(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let branch = if matches!(args[0], Value::Error(_)) { &args[1] } else { &args[2] };
    let block = block_arg("fix\\either", branch)?;
    Ok(interp.do_block_inj(block, args[0].clone()))
}

// fix\else value { body } -> value
// Runs the block only when the value did not fail; a failure is raised
// again untouched.
fn fix_else(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let block = block_arg("fix\\else", &args[1])?;
    match &args[0] {
        Value::Error(err) => Err(RuntimeError::Failure(err.clone())),
        value => Ok(interp.do_block_inj(block, value.clone())),
    }
}

// disarm failure -> error
fn disarm(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(args[0].clone())
}

// failed? value -> 1 or 0
fn is_failed(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Integer(i64::from(matches!(args[0], Value::Error(_)))))
}

fn error_arg<'a>(builtin: &str, value: &'a Value) -> Result<&'a Rc<ErrorValue>, RuntimeError> {
    match value {
        Value::Error(err) => Ok(err),
        other => Err(RuntimeError::builtin(
            builtin,
            format!("expected an error, got {}", other.value_type()),
        )),
    }
}

// status? error -> integer
fn status(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Integer(error_arg("status?", &args[0])?.status))
}

// message? error -> string
fn message(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::string(&error_arg("message?", &args[0])?.message))
}

// cause? error -> error
fn cause(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Error(error_arg("cause?", &args[0])?.root_cause()))
}

// try { body } -> value or error
// Evaluates a block and hands back whatever it produced, failure included,
// as a plain value.
fn try_(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let block = block_arg("try", &args[0])?;
    let result = interp.do_block(block);
    interp.failure_flag = false;
    interp.error_flag = false;
    Ok(result)
}

// with value { body } -> value
fn with(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let block = block_arg("with", &args[1])?;
    Ok(interp.do_block_inj(block, args[0].clone()))
}

pub const BUILTINS: &[BuiltinDef] = &[
    BuiltinDef::new("fail", 1, "Raises a failure from a message, status or { status \"message\" } block.", fail)
        .mark_pure()
        .with_args(&[ERROR_SPEC]),
    BuiltinDef::new("^fail", 1, "Raises a failure and returns it from the enclosing function.", fail_return)
        .mark_pure()
        .with_args(&[ERROR_SPEC]),
    BuiltinDef::new("failure", 1, "Creates an error value without raising it.", failure)
        .mark_pure()
        .with_args(&[ERROR_SPEC]),
    BuiltinDef::new("failure\\kind", 2, "Creates an error value of the kind named by the block.", failure_kind)
        .mark_pure()
        .with_args(&[BLOCK, ERROR_SPEC]),
    BuiltinDef::new("failure\\wrap", 2, "Creates an error value with a parent cause.", failure_wrap)
        .mark_pure()
        .with_failure()
        .with_args(&[ERROR_SPEC, ERROR]),
    BuiltinDef::new("refail", 2, "Wraps a failure in a new one and raises it.", refail)
        .mark_pure()
        .with_failure()
        .with_args(&[ANY, ERROR_SPEC]),
    BuiltinDef::new("check", 2, "Wraps a failed value in a new failure; other values pass.", check)
        .mark_pure()
        .with_failure()
        .with_args(&[ANY, ERROR_SPEC]),
    BuiltinDef::new("^check", 2, "Like check, returning from the enclosing function on failure.", check_return)
        .mark_pure()
        .with_failure()
        .with_args(&[ANY, ERROR_SPEC]),
    BuiltinDef::new("ensure", 2, "Raises a failure unless the value is truthy.", ensure)
        .mark_pure()
        .with_args(&[ANY, ERROR_SPEC]),
    BuiltinDef::new("^ensure", 2, "Like ensure, returning from the enclosing function on failure.", ensure_return)
        .mark_pure()
        .with_args(&[ANY, ERROR_SPEC]),
    BuiltinDef::new("fix", 2, "Evaluates the block with the failure injected when the value failed.", fix)
        .mark_pure()
        .with_failure()
        .with_args(&[ANY, BLOCK]),
    BuiltinDef::new("^fix", 2, "Like fix, returning the block's result from the enclosing function.", fix_return)
        .mark_pure()
        .with_failure()
        .with_args(&[ANY, BLOCK]),
    BuiltinDef::new("fix\\either", 3, "Evaluates the first block on failure, the second otherwise.", fix_either)
        .mark_pure()
        .with_failure()
        .with_args(&[ANY, BLOCK, BLOCK]),
    BuiltinDef::new("fix\\else", 2, "Evaluates the block when the value did not fail.", fix_else)
        .mark_pure()
        .with_failure()
        .with_args(&[ANY, BLOCK]),
    BuiltinDef::new("disarm", 1, "Turns a failure into a plain error value.", disarm)
        .mark_pure()
        .with_failure(),
    BuiltinDef::new("failed?", 1, "1 when the value is a failure, 0 otherwise.", is_failed)
        .mark_pure()
        .with_failure(),
    BuiltinDef::new("status?", 1, "The status code of an error.", status)
        .mark_pure()
        .with_failure()
        .with_args(&[ERROR]),
    BuiltinDef::new("message?", 1, "The message of an error.", message)
        .mark_pure()
        .with_failure()
        .with_args(&[ERROR]),
    BuiltinDef::new("cause?", 1, "The innermost cause of an error chain.", cause)
        .mark_pure()
        .with_failure()
        .with_args(&[ERROR]),
    BuiltinDef::new("try", 1, "Evaluates a block, returning a failure as a plain value.", try_)
        .mark_pure()
        .with_args(&[BLOCK]),
    BuiltinDef::new("with", 2, "Evaluates the block with the value injected.", with)
        .mark_pure()
        .with_failure()
        .with_args(&[ANY, BLOCK]),
];

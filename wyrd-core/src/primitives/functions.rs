// Function builders and variable declaration
//
// A function is a parameter list and a body block. Where its call context
// is parented decides what the body can see: the caller's context for
// `fn`, the defining context for `closure`, and only the pure builtins for
// `pfn`.

use crate::builtins::{ANY, BLOCK, BuiltinDef};
use crate::error::RuntimeError;
use crate::interpreter::Interpreter;
use crate::primitives::{block_arg, word_arg};
use crate::value::{Block, Function, Value, ValueType};
use crate::words::Word;
use std::rc::Rc;

const MAX_PARAMS: usize = 5;

const FUNCTION: &[ValueType] = &[ValueType::Function];
const WORD_OR_TAG: &[ValueType] = &[ValueType::Word, ValueType::Tagword];

// RUST CONCEPT: Parsing a spec block into a typed parameter list
// Words are parameters; strings (docs) and blocks (type hints) are kept in
// the spec for introspection but don't bind anything.
fn params_from_spec(builtin: &str, spec: &Block) -> Result<Rc<[Word]>, RuntimeError> {
    let mut params = Vec::new();
    for item in spec.items.iter() {
        match item {
            Value::Word(word) => params.push(*word),
            Value::String(_) | Value::Block(_) => {}
            other => {
                return Err(RuntimeError::builtin(
                    builtin,
                    format!("unexpected {} in function spec", other.value_type()),
                ));
            }
        }
    }
    if params.len() > MAX_PARAMS {
        return Err(RuntimeError::builtin(
            builtin,
            format!("functions take at most {MAX_PARAMS} arguments"),
        ));
    }
    Ok(params.into())
}

fn make_function(
    builtin: &str,
    spec: &Value,
    body: &Value,
    pure: bool,
    closure: Option<crate::context::CtxId>,
) -> Result<Value, RuntimeError> {
    let spec = block_arg(builtin, spec)?;
    let body = block_arg(builtin, body)?;
    Ok(Value::Function(Rc::new(Function {
        spec: spec.clone(),
        params: params_from_spec(builtin, spec)?,
        body: body.clone(),
        pure,
        closure,
    })))
}

// var 'word value -> value
// Declares a mutable binding in the current context.
fn var(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let word = word_arg("var", &args[0])?;
    let ctx = interp.ctx;
    if interp.context(ctx)?.contains(word) {
        return Err(RuntimeError::builtin(
            "var",
            format!("{} is already bound in this context", interp.word_name(word)),
        ));
    }
    interp.context_mut(ctx)?.declare_var(word, args[1].clone());
    Ok(args[1].clone())
}

// does { body } -> function
fn does(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    make_function("does", &Value::block(Vec::new()), &args[0], false, None)
}

// fn1 { body using it } -> function
fn fn1(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let it = interp.word("it");
    make_function("fn1", &Value::block(vec![Value::Word(it)]), &args[0], false, None)
}

// fn { args } { body } -> function
fn fn_(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    make_function("fn", &args[0], &args[1], false, None)
}

// pfn { args } { body } -> function
fn pfn(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    make_function("pfn", &args[0], &args[1], true, None)
}

// closure { args } { body } -> function
// The defining context outlives this call because the function holds it.
fn closure(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let ctx = interp.ctx;
    interp.contexts.capture(ctx);
    make_function("closure", &args[0], &args[1], false, Some(ctx))
}

// fn\spec? function -> block
fn fn_spec(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    match &args[0] {
        Value::Function(func) => Ok(Value::Block(func.spec.clone())),
        _ => Ok(Value::Void),
    }
}

// fn\body? function -> block
fn fn_body(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    match &args[0] {
        Value::Function(func) => Ok(Value::Block(func.body.clone())),
        _ => Ok(Value::Void),
    }
}

pub const BUILTINS: &[BuiltinDef] = &[
    BuiltinDef::new("var", 2, "Declares a variable that can later be changed with :: or change!.", var)
        .with_args(&[WORD_OR_TAG, ANY]),
    BuiltinDef::new("does", 1, "Creates a function without arguments.", does)
        .mark_pure()
        .with_args(&[BLOCK]),
    BuiltinDef::new("fn1", 1, "Creates a function of one argument named it.", fn1)
        .mark_pure()
        .with_args(&[BLOCK]),
    BuiltinDef::new("fn", 2, "Creates a function from an argument spec and a body.", fn_)
        .mark_pure()
        .with_args(&[BLOCK, BLOCK]),
    BuiltinDef::new("pfn", 2, "Creates a pure function; its body sees only pure builtins.", pfn)
        .mark_pure()
        .with_args(&[BLOCK, BLOCK]),
    BuiltinDef::new("closure", 2, "Creates a function that keeps the context it was defined in.", closure)
        .with_args(&[BLOCK, BLOCK]),
    BuiltinDef::new("fn\\spec?", 1, "The argument spec block of a function.", fn_spec)
        .mark_pure()
        .with_args(&[FUNCTION]),
    BuiltinDef::new("fn\\body?", 1, "The body block of a function.", fn_body)
        .mark_pure()
        .with_args(&[FUNCTION]),
];

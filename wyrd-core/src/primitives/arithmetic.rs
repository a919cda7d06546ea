// Arithmetic, comparison and logic primitives
//
// Operators are bound under their underscore-prefixed names (`_+`, `_<`) so
// `1 + 2` reaches them as opwords. Every entry here is pure.

use crate::builtins::{ANY, BuiltinDef, INTEGER, NUMBER};
use crate::error::RuntimeError;
use crate::interpreter::Interpreter;
use crate::value::Value;
use num_traits::{CheckedAdd, CheckedDiv, CheckedMul, CheckedRem, CheckedSub};
use std::cmp::Ordering;

// RUST CONCEPT: Numeric type promotion
// Integer op Integer stays exact; a Decimal on either side promotes the
// pair to f64. Once a float is involved precision is already gone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Promoted {
    Ints(i64, i64),
    Decs(f64, f64),
}

pub(crate) fn promote(a: &Value, b: &Value) -> Option<Promoted> {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => Some(Promoted::Ints(*x, *y)),
        (Value::Integer(x), Value::Decimal(y)) => Some(Promoted::Decs(*x as f64, *y)),
        (Value::Decimal(x), Value::Integer(y)) => Some(Promoted::Decs(*x, *y as f64)),
        (Value::Decimal(x), Value::Decimal(y)) => Some(Promoted::Decs(*x, *y)),
        _ => None,
    }
}

fn numeric_pair(name: &str, a: &Value, b: &Value) -> Result<Promoted, RuntimeError> {
    promote(a, b).ok_or_else(|| {
        RuntimeError::builtin(
            name,
            format!("cannot combine {} and {}", a.value_type(), b.value_type()),
        )
    })
}

fn checked(name: &str, result: Option<i64>) -> Result<Value, RuntimeError> {
    result
        .map(Value::Integer)
        .ok_or_else(|| RuntimeError::builtin(name, "integer overflow"))
}

// Addition: a + b -> sum, or joined text when either side is a string
fn add(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let (a, b) = (&args[0], &args[1]);
    // Handle string concatenation
    if matches!(a, Value::String(_)) || matches!(b, Value::String(_)) {
        let text = format!("{}{}", a.to_text(&interp.words), b.to_text(&interp.words));
        return Ok(Value::String(text.into()));
    }
    match numeric_pair("+", a, b)? {
        Promoted::Ints(x, y) => checked("+", CheckedAdd::checked_add(&x, &y)),
        Promoted::Decs(x, y) => Ok(Value::Decimal(x + y)),
    }
}

// Subtraction: a - b -> difference
fn subtract(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    match numeric_pair("-", &args[0], &args[1])? {
        Promoted::Ints(x, y) => checked("-", CheckedSub::checked_sub(&x, &y)),
        Promoted::Decs(x, y) => Ok(Value::Decimal(x - y)),
    }
}

// Multiplication: a * b -> product
fn multiply(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    match numeric_pair("*", &args[0], &args[1])? {
        Promoted::Ints(x, y) => checked("*", CheckedMul::checked_mul(&x, &y)),
        Promoted::Decs(x, y) => Ok(Value::Decimal(x * y)),
    }
}

// Division: a / b -> decimal quotient
// `/` always produces a decimal
fn divide(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let (x, y) = match numeric_pair("/", &args[0], &args[1])? {
        Promoted::Ints(x, y) => (x as f64, y as f64),
        Promoted::Decs(x, y) => (x, y),
    };
    if y == 0.0 {
        return Err(RuntimeError::builtin("/", "division by zero"));
    }
    Ok(Value::Decimal(x / y))
}

// Integer division: a // b -> quotient
fn int_divide(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    match numeric_pair("//", &args[0], &args[1])? {
        Promoted::Ints(_, 0) => Err(RuntimeError::builtin("//", "division by zero")),
        Promoted::Ints(x, y) => checked("//", CheckedDiv::checked_div(&x, &y)),
        Promoted::Decs(..) => Err(RuntimeError::builtin("//", "expects integers")),
    }
}

// Remainder: a % b -> remainder
fn remainder(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    match numeric_pair("%", &args[0], &args[1])? {
        Promoted::Ints(_, 0) => Err(RuntimeError::builtin("%", "division by zero")),
        Promoted::Ints(x, y) => checked("%", CheckedRem::checked_rem(&x, &y)),
        Promoted::Decs(..) => Err(RuntimeError::builtin("%", "expects integers")),
    }
}

/// Equality that treats `1` and `1.0` as the same number and falls back
/// to structural equality for everything else.
pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    match promote(a, b) {
        Some(Promoted::Ints(x, y)) => x == y,
        Some(Promoted::Decs(x, y)) => x == y,
        None => a == b,
    }
}

pub(crate) fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (promote(a, b), a, b) {
        (Some(Promoted::Ints(x, y)), _, _) => Some(x.cmp(&y)),
        (Some(Promoted::Decs(x, y)), _, _) => x.partial_cmp(&y),
        (None, Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn ordering(name: &str, args: &[Value], accept: fn(Ordering) -> bool) -> Result<Value, RuntimeError> {
    match compare_values(&args[0], &args[1]) {
        Some(ord) => Ok(Value::Boolean(accept(ord))),
        None => Err(RuntimeError::builtin(
            name,
            format!(
                "cannot compare {} and {}",
                args[0].value_type(),
                args[1].value_type()
            ),
        )),
    }
}

// Equals: a = b -> boolean
fn equals(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Boolean(values_equal(&args[0], &args[1])))
}

// Not equals: a != b -> boolean
fn not_equal(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Boolean(!values_equal(&args[0], &args[1])))
}

// Less than: a < b -> boolean
fn less_than(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    ordering("<", args, Ordering::is_lt)
}

// Greater than: a > b -> boolean
fn greater_than(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    ordering(">", args, Ordering::is_gt)
}

// Less or equal: a <= b -> boolean
fn less_equal(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    ordering("<=", args, Ordering::is_le)
}

// Greater or equal: a >= b -> boolean
fn greater_equal(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    ordering(">=", args, Ordering::is_ge)
}

// inc n -> n + 1
fn inc(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    match &args[0] {
        Value::Integer(i) => checked("inc", CheckedAdd::checked_add(i, &1)),
        _ => Ok(Value::Void),
    }
}

// dec n -> n - 1
fn dec(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    match &args[0] {
        Value::Integer(i) => checked("dec", CheckedSub::checked_sub(i, &1)),
        _ => Ok(Value::Void),
    }
}

// not value -> boolean
fn not(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Boolean(!args[0].is_truthy()))
}

// and a b -> boolean
fn and(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Boolean(args[0].is_truthy() && args[1].is_truthy()))
}

// or a b -> boolean
fn or(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Boolean(args[0].is_truthy() || args[1].is_truthy()))
}

pub const BUILTINS: &[BuiltinDef] = &[
    BuiltinDef::new("_+", 2, "Adds two numbers, or concatenates when either side is a string.", add)
        .mark_pure(),
    BuiltinDef::new("_-", 2, "Subtracts the second number from the first.", subtract)
        .mark_pure()
        .with_args(&[NUMBER, NUMBER]),
    BuiltinDef::new("_*", 2, "Multiplies two numbers.", multiply)
        .mark_pure()
        .with_args(&[NUMBER, NUMBER]),
    BuiltinDef::new("_/", 2, "Divides two numbers, always giving a decimal.", divide)
        .mark_pure()
        .with_args(&[NUMBER, NUMBER]),
    BuiltinDef::new("_//", 2, "Integer division, truncating toward zero.", int_divide)
        .mark_pure()
        .with_args(&[INTEGER, INTEGER]),
    BuiltinDef::new("_%", 2, "Integer remainder.", remainder)
        .mark_pure()
        .with_args(&[INTEGER, INTEGER]),
    BuiltinDef::new("_=", 2, "True when both values are equal; 1 and 1.0 are equal.", equals)
        .mark_pure(),
    BuiltinDef::new("_!=", 2, "True when the values differ.", not_equal).mark_pure(),
    BuiltinDef::new("_<", 2, "Numeric or string less-than.", less_than).mark_pure(),
    BuiltinDef::new("_>", 2, "Numeric or string greater-than.", greater_than).mark_pure(),
    BuiltinDef::new("_<=", 2, "Numeric or string less-or-equal.", less_equal).mark_pure(),
    BuiltinDef::new("_>=", 2, "Numeric or string greater-or-equal.", greater_equal).mark_pure(),
    BuiltinDef::new("inc", 1, "Adds one to an integer.", inc)
        .mark_pure()
        .with_args(&[INTEGER]),
    BuiltinDef::new("dec", 1, "Subtracts one from an integer.", dec)
        .mark_pure()
        .with_args(&[INTEGER]),
    BuiltinDef::new("not", 1, "Logical negation of a value's truthiness.", not)
        .mark_pure()
        .with_args(&[ANY]),
    BuiltinDef::new("and", 2, "True when both values are truthy.", and).mark_pure(),
    BuiltinDef::new("or", 2, "True when either value is truthy.", or).mark_pure(),
];

// The `math` module - registered as a context, reached as math/abs etc.

use crate::builtins::{BuiltinDef, NUMBER};
use crate::error::RuntimeError;
use crate::interpreter::Interpreter;
use crate::primitives::arithmetic::{Promoted, promote};
use crate::value::Value;

// math/abs n -> |n|
fn abs(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    match &args[0] {
        Value::Integer(i) => i
            .checked_abs()
            .map(Value::Integer)
            .ok_or_else(|| RuntimeError::builtin("abs", "integer overflow")),
        Value::Decimal(d) => Ok(Value::Decimal(d.abs())),
        other => Err(RuntimeError::builtin(
            "abs",
            format!("expects a number, got {}", other.value_type()),
        )),
    }
}

// RUST CONCEPT: Picking one of two promoted operands
// The result keeps the chosen operand's own type: max 1 2.5 is 2.5,
// max 3 2.5 is 3.
fn pick(name: &str, args: &[Value], take_first: fn(f64, f64) -> bool) -> Result<Value, RuntimeError> {
    let (a, b) = match promote(&args[0], &args[1]) {
        Some(Promoted::Ints(a, b)) => (a as f64, b as f64),
        Some(Promoted::Decs(a, b)) => (a, b),
        None => return Err(RuntimeError::builtin(name, "expects two numbers")),
    };
    Ok(if take_first(a, b) { args[0].clone() } else { args[1].clone() })
}

// math/max a b -> larger
fn max(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    pick("max", args, |a, b| a >= b)
}

// math/min a b -> smaller
fn min(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    pick("min", args, |a, b| a <= b)
}

pub const BUILTINS: &[BuiltinDef] = &[
    BuiltinDef::new("abs", 1, "Absolute value.", abs)
        .mark_pure()
        .with_args(&[NUMBER]),
    BuiltinDef::new("max", 2, "The larger of two numbers.", max)
        .mark_pure()
        .with_args(&[NUMBER, NUMBER]),
    BuiltinDef::new("min", 2, "The smaller of two numbers.", min)
        .mark_pure()
        .with_args(&[NUMBER, NUMBER]),
];

#[cfg(test)]
mod tests {
    use crate::primitives::test_support::capturing;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_module_members_through_paths() {
        let (mut interp, _) = capturing();
        assert_eq!(interp.eval_str("math/abs -4"), Ok(Value::Integer(4)));
        assert_eq!(interp.eval_str("math/max 1 2.5"), Ok(Value::Decimal(2.5)));
        assert_eq!(interp.eval_str("math/min 3 2.5"), Ok(Value::Decimal(2.5)));
        assert_eq!(interp.eval_str("math/max 3 2.5"), Ok(Value::Integer(3)));
    }

    #[test]
    fn test_module_members_are_not_global() {
        let (mut interp, _) = capturing();
        assert!(interp.eval_str("abs -4").is_err());
    }

    #[test]
    fn test_abs_overflow() {
        let (mut interp, _) = capturing();
        assert!(interp.eval_str("math/abs -9223372036854775808").is_err());
    }
}

// qmath: single-pass infix arithmetic with operator precedence
//
// Two stacks (values and pending operators) are driven directly from the
// block's series. When an operator arrives, every pending operator that
// binds at least as tightly is applied first, then the new one is pushed;
// whatever is left at the end is applied in stack order. No intermediate
// postfix block is built.
//
// Precedence, loosest to tightest:
//   0  < > = <= >=
//   1  + -
//   2  * / // %

use crate::builtins::{BLOCK, BuiltinDef};
use crate::error::RuntimeError;
use crate::interpreter::Interpreter;
use crate::value::{Block, Value, operator_text};
use num_traits::{CheckedAdd, CheckedDiv, CheckedMul, CheckedRem, CheckedSub};
use std::cmp::Ordering;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Op {
    Add,
    Sub,
    Mul,
    Div,
    IntDiv,
    Rem,
    Lt,
    Gt,
    Eq,
    Le,
    Ge,
}

impl Op {
    fn from_symbol(symbol: &str) -> Option<Op> {
        Some(match symbol {
            "+" => Op::Add,
            "-" => Op::Sub,
            "*" => Op::Mul,
            "/" => Op::Div,
            "//" => Op::IntDiv,
            "%" => Op::Rem,
            "<" => Op::Lt,
            ">" => Op::Gt,
            "=" => Op::Eq,
            "<=" => Op::Le,
            ">=" => Op::Ge,
            _ => return None,
        })
    }

    fn precedence(self) -> u8 {
        match self {
            Op::Lt | Op::Gt | Op::Eq | Op::Le | Op::Ge => 0,
            Op::Add | Op::Sub => 1,
            Op::Mul | Op::Div | Op::IntDiv | Op::Rem => 2,
        }
    }
}

fn qmath_error(message: impl Into<String>) -> RuntimeError {
    RuntimeError::builtin("qmath", message)
}

fn type_error() -> RuntimeError {
    qmath_error("type error in arithmetic expression")
}

// RUST CONCEPT: Checked integer arithmetic through num-traits
// Overflow and zero divisors come back as None instead of panicking.
fn int_op<F>(a: i64, b: i64, f: F) -> Result<Value, RuntimeError>
where
    F: FnOnce(&i64, &i64) -> Option<i64>,
{
    f(&a, &b)
        .map(Value::Integer)
        .ok_or_else(|| qmath_error("integer overflow"))
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Integer(i) => Some(*i as f64),
        Value::Decimal(d) => Some(*d),
        _ => None,
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    let (l, r) = (as_f64(left)?, as_f64(right)?);
    l.partial_cmp(&r)
}

fn apply(op: Op, left: Value, right: Value) -> Result<Value, RuntimeError> {
    use Value::{Decimal, Integer};

    match op {
        Op::Add | Op::Sub | Op::Mul => match (&left, &right) {
            (Integer(a), Integer(b)) => match op {
                Op::Add => int_op(*a, *b, <i64 as CheckedAdd>::checked_add),
                Op::Sub => int_op(*a, *b, <i64 as CheckedSub>::checked_sub),
                _ => int_op(*a, *b, <i64 as CheckedMul>::checked_mul),
            },
            _ => {
                let (a, b) = (as_f64(&left).ok_or_else(type_error)?, as_f64(&right).ok_or_else(type_error)?);
                Ok(Decimal(match op {
                    Op::Add => a + b,
                    Op::Sub => a - b,
                    _ => a * b,
                }))
            }
        },
        Op::Div => {
            if matches!(right, Integer(0)) && matches!(left, Integer(_)) {
                return Err(qmath_error("division by zero"));
            }
            let (a, b) = (as_f64(&left).ok_or_else(type_error)?, as_f64(&right).ok_or_else(type_error)?);
            Ok(Decimal(a / b))
        }
        Op::IntDiv | Op::Rem => match (&left, &right) {
            (Integer(_), Integer(0)) => Err(qmath_error("division by zero")),
            (Integer(a), Integer(b)) if op == Op::IntDiv => int_op(*a, *b, <i64 as CheckedDiv>::checked_div),
            (Integer(a), Integer(b)) => int_op(*a, *b, <i64 as CheckedRem>::checked_rem),
            _ => Err(type_error()),
        },
        Op::Eq => Ok(Value::Boolean(match compare(&left, &right) {
            Some(ordering) => ordering == Ordering::Equal,
            None => match (as_f64(&left), as_f64(&right)) {
                // NaN on a numeric side is never equal
                (Some(_), Some(_)) => false,
                _ => left == right,
            },
        })),
        Op::Lt | Op::Gt | Op::Le | Op::Ge => {
            let (a, b) = (as_f64(&left).ok_or_else(type_error)?, as_f64(&right).ok_or_else(type_error)?);
            Ok(Value::Boolean(match op {
                Op::Lt => a < b,
                Op::Gt => a > b,
                Op::Le => a <= b,
                _ => a >= b,
            }))
        }
    }
}

fn apply_top(values: &mut Vec<Value>, ops: &mut Vec<Op>) -> Result<(), RuntimeError> {
    let (Some(op), Some(right), Some(left)) = (ops.pop(), values.pop(), values.pop()) else {
        return Err(type_error());
    };
    values.push(apply(op, left, right)?);
    Ok(())
}

/// Evaluates an infix expression block. Nested blocks are sub-expressions,
/// getwords read variables through the current context chain.
pub fn eval_qmath(interp: &mut Interpreter, block: &Block) -> Result<Value, RuntimeError> {
    crate::stack::ensure_sufficient_stack(|| {
        let mut values: Vec<Value> = Vec::with_capacity(8);
        let mut ops: Vec<Op> = Vec::with_capacity(4);

        for token in block.items.iter() {
            match token {
                Value::Integer(_) | Value::Decimal(_) => values.push(token.clone()),
                Value::Getword(word) => match interp.lookup(*word) {
                    Some((value, _)) => values.push(value),
                    None => {
                        return Err(qmath_error(format!(
                            "variable not found: {}",
                            interp.words.name(*word)
                        )));
                    }
                },
                Value::Block(inner) => values.push(eval_qmath(interp, inner)?),
                Value::Opword(word) => {
                    let name = interp.words.name(*word);
                    let Some(op) = operator_text(name).and_then(Op::from_symbol) else {
                        return Err(qmath_error(format!("unsupported operator: {name}")));
                    };
                    while ops.last().is_some_and(|top| top.precedence() >= op.precedence()) {
                        apply_top(&mut values, &mut ops)?;
                    }
                    ops.push(op);
                }
                _ => return Err(qmath_error("unexpected token type in block")),
            }
        }

        while !ops.is_empty() {
            apply_top(&mut values, &mut ops)?;
        }
        Ok(values.into_iter().next().unwrap_or(Value::Void))
    })
}

// qmath { expression } -> value, with * and / binding tighter than + and -
fn qmath(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    match &args[0] {
        Value::Block(block) => eval_qmath(interp, block),
        _ => Err(type_error()),
    }
}

pub const BUILTINS: &[BuiltinDef] = &[BuiltinDef::new(
    "qmath",
    1,
    "Evaluates an infix math block with operator precedence.\nUsage: qmath { ?a * 2 + 1 }\nOperators: + - * / // % < > = <= >=",
    qmath,
)
.mark_pure()
.with_args(&[BLOCK])];

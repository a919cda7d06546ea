// Collections, type inspection and conversions
//
// `length?` and `double` are not bound as words at all. They live only in
// the generic table under their receiver kinds, so `length? s` and
// `s .length?` resolve by the kind of `s`.

use crate::builtins::{ANY, BLOCK, BuiltinDef, INTEGER, STRING};
use crate::error::RuntimeError;
use crate::interpreter::Interpreter;
use crate::primitives::{block_arg, integer_arg};
use crate::value::{Table, Value, ValueType};
use num_traits::ToPrimitive;
use std::collections::BTreeMap;
use std::rc::Rc;

const SEQUENCE: &[ValueType] = &[ValueType::Block, ValueType::List, ValueType::String];

// RUST CONCEPT: Borrowed view over the sequence-like values
fn sequence_items(builtin: &str, value: &Value) -> Result<Vec<Value>, RuntimeError> {
    match value {
        Value::Block(block) => Ok(block.items.to_vec()),
        Value::List(items) => Ok(items.as_ref().clone()),
        Value::String(s) => Ok(s.chars().map(|c| Value::String(c.to_string().into())).collect()),
        other => Err(RuntimeError::builtin(
            builtin,
            format!("{} is not a sequence", other.value_type()),
        )),
    }
}

// length? series -> count
fn length(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let len = match &args[0] {
        Value::String(s) => s.chars().count(),
        Value::Block(block) => block.len(),
        Value::List(items) => items.len(),
        Value::Dict(entries) => entries.len(),
        Value::Table(table) => table.rows.len(),
        other => {
            return Err(RuntimeError::builtin(
                "length?",
                format!("{} has no length", other.value_type()),
            ));
        }
    };
    Ok(Value::Integer(i64::try_from(len).unwrap_or(i64::MAX)))
}

// integer//double n -> n * 2
fn double(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let n = integer_arg("double", &args[0])?;
    n.checked_mul(2)
        .map(Value::Integer)
        .ok_or_else(|| RuntimeError::builtin("double", "integer overflow"))
}

fn nth_item(builtin: &str, value: &Value, index: i64) -> Result<Value, RuntimeError> {
    let items = sequence_items(builtin, value)?;
    let len = items.len();
    usize::try_from(index)
        .ok()
        .and_then(|i| i.checked_sub(1))
        .and_then(|i| items.into_iter().nth(i))
        .ok_or(RuntimeError::IndexOutOfRange { index, len })
}

// first series -> item
fn first(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    nth_item("first", &args[0], 1)
}

// nth series index -> item
// 1-based
fn nth(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let index = integer_arg("nth", &args[1])?;
    nth_item("nth", &args[0], index)
}

// Each expression of the block becomes one item. If evaluation stopped on
// an error the error is handed back with its flags intact.
fn evaluated_items(interp: &mut Interpreter, builtin: &str, value: &Value) -> Result<Result<Vec<Value>, Value>, RuntimeError> {
    let block = block_arg(builtin, value)?;
    Ok(interp.reduce_block(block).ok_or_else(|| interp.res.clone()))
}

// list { expressions } -> list
fn list(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(match evaluated_items(interp, "list", &args[0])? {
        Ok(items) => Value::List(Rc::new(items)),
        Err(err) => err,
    })
}

fn key_text(interp: &Interpreter, builtin: &str, key: &Value) -> Result<Rc<str>, RuntimeError> {
    match key {
        Value::String(s) => Ok(s.clone()),
        Value::Word(w) | Value::Tagword(w) => Ok(interp.words.name_rc(*w)),
        other => Err(RuntimeError::builtin(
            builtin,
            format!("{} can't be a key", other.value_type()),
        )),
    }
}

// dict { key value ... } -> dict
fn dict(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let items = match evaluated_items(interp, "dict", &args[0])? {
        Ok(items) => items,
        Err(err) => return Ok(err),
    };
    if items.len() % 2 != 0 {
        return Err(RuntimeError::builtin("dict", "expects key value pairs"));
    }
    let mut entries = BTreeMap::new();
    for pair in items.chunks(2) {
        entries.insert(key_text(interp, "dict", &pair[0])?, pair[1].clone());
    }
    Ok(Value::Dict(Rc::new(entries)))
}

// table { columns } { values } -> table
fn table(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let header = block_arg("table", &args[0])?;
    let columns = header
        .items
        .iter()
        .map(|column| key_text(interp, "table", column))
        .collect::<Result<Vec<_>, _>>()?;
    if columns.is_empty() {
        return Err(RuntimeError::builtin("table", "needs at least one column"));
    }
    let values = match evaluated_items(interp, "table", &args[1])? {
        Ok(values) => values,
        Err(err) => return Ok(err),
    };
    if values.len() % columns.len() != 0 {
        return Err(RuntimeError::builtin(
            "table",
            format!("{} values don't fill rows of {} columns", values.len(), columns.len()),
        ));
    }
    let rows = values.chunks(columns.len()).map(Rc::from).collect();
    Ok(Value::Table(Rc::new(Table {
        columns: columns.into(),
        rows,
    })))
}

// type? value -> word
fn type_of(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Word(args[0].value_type().word()))
}

// to-string value -> string
fn to_string(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::String(args[0].to_text(&interp.words).into()))
}

// to-integer value -> integer
fn to_integer(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    match &args[0] {
        Value::Integer(i) => Ok(Value::Integer(*i)),
        Value::Decimal(d) => d
            .trunc()
            .to_i64()
            .map(Value::Integer)
            .ok_or_else(|| RuntimeError::builtin("to-integer", format!("{d} is out of range"))),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| RuntimeError::builtin("to-integer", format!("can't parse \"{s}\""))),
        Value::Boolean(b) => Ok(Value::Integer(i64::from(*b))),
        other => Err(RuntimeError::builtin(
            "to-integer",
            format!("can't convert {}", other.value_type()),
        )),
    }
}

// to-decimal value -> decimal
fn to_decimal(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    match &args[0] {
        Value::Decimal(d) => Ok(Value::Decimal(*d)),
        Value::Integer(i) => i
            .to_f64()
            .map(Value::Decimal)
            .ok_or_else(|| RuntimeError::builtin("to-decimal", "integer out of range")),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Decimal)
            .map_err(|_| RuntimeError::builtin("to-decimal", format!("can't parse \"{s}\""))),
        other => Err(RuntimeError::builtin(
            "to-decimal",
            format!("can't convert {}", other.value_type()),
        )),
    }
}

pub const BUILTINS: &[BuiltinDef] = &[
    BuiltinDef::new("length?", 1, "Number of characters in a string.", length)
        .mark_pure()
        .with_kind("string")
        .with_args(&[STRING]),
    BuiltinDef::new("length?", 1, "Number of items in a block.", length)
        .mark_pure()
        .with_kind("block")
        .with_args(&[BLOCK]),
    BuiltinDef::new("length?", 1, "Number of items in a list.", length)
        .mark_pure()
        .with_kind("list"),
    BuiltinDef::new("length?", 1, "Number of entries in a dict.", length)
        .mark_pure()
        .with_kind("dict"),
    BuiltinDef::new("length?", 1, "Number of rows in a table.", length)
        .mark_pure()
        .with_kind("table"),
    BuiltinDef::new("double", 1, "Twice the integer.", double)
        .mark_pure()
        .with_kind("integer")
        .with_args(&[INTEGER]),
    BuiltinDef::new("first", 1, "The first item of a block, list or string.", first)
        .mark_pure()
        .with_args(&[SEQUENCE]),
    BuiltinDef::new("nth", 2, "The item at a 1-based position.", nth)
        .mark_pure()
        .with_args(&[SEQUENCE, INTEGER]),
    BuiltinDef::new("list", 1, "A list of the values the block evaluates to.", list)
        .mark_pure()
        .with_args(&[BLOCK]),
    BuiltinDef::new("dict", 1, "A dict from a block of evaluated key value pairs.", dict)
        .mark_pure()
        .with_args(&[BLOCK]),
    BuiltinDef::new("table", 2, "A table from a block of column names and a block of row values.", table)
        .mark_pure()
        .with_args(&[BLOCK, BLOCK]),
    BuiltinDef::new("type?", 1, "The type of a value, as a word.", type_of)
        .mark_pure()
        .with_failure()
        .with_args(&[ANY]),
    BuiltinDef::new("to-string", 1, "The printed form of a value.", to_string).mark_pure(),
    BuiltinDef::new("to-integer", 1, "Converts a decimal, string or boolean to an integer.", to_integer)
        .mark_pure(),
    BuiltinDef::new("to-decimal", 1, "Converts an integer or string to a decimal.", to_decimal)
        .mark_pure(),
];

#[cfg(test)]
mod tests {
    use crate::primitives::test_support::capturing;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_length_dispatches_by_kind() {
        let (mut interp, _) = capturing();
        assert_eq!(interp.eval_str("length? \"héllo\""), Ok(Value::Integer(5)));
        assert_eq!(interp.eval_str("{ 1 2 3 } .length?"), Ok(Value::Integer(3)));
        assert_eq!(interp.eval_str("list { 1 2 } |length?"), Ok(Value::Integer(2)));
        // no integer//length?
        assert!(interp.eval_str("length? 5").is_err());
    }

    #[test]
    fn test_kind_qualified_name_is_callable_directly() {
        let (mut interp, _) = capturing();
        assert_eq!(interp.eval_str("integer//double 8"), Ok(Value::Integer(16)));
    }

    #[test]
    fn test_first_and_nth() {
        let (mut interp, _) = capturing();
        assert_eq!(interp.eval_str("first { 7 8 }"), Ok(Value::Integer(7)));
        assert_eq!(interp.eval_str("nth { 7 8 9 } 3"), Ok(Value::Integer(9)));
        assert_eq!(interp.eval_str("nth \"abc\" 2"), Ok(Value::string("b")));
        let err = interp.eval_str("nth { 7 8 } 3").unwrap_err();
        assert!(err.to_string().contains("index 3 out of range for length 2"));
        assert!(interp.eval_str("nth { 7 } 0").is_err());
        assert!(interp.eval_str("first { }").is_err());
    }

    #[test]
    fn test_list_evaluates_items() {
        let (mut interp, _) = capturing();
        assert_eq!(
            interp.eval_str("list { 1 + 1 \"x\" }"),
            Ok(Value::List(std::rc::Rc::new(vec![Value::Integer(2), Value::string("x")])))
        );
    }

    #[test]
    fn test_dict_and_table() {
        let (mut interp, _) = capturing();
        assert_eq!(interp.eval_str("dict { \"a\" 1 'b 2 } |length?"), Ok(Value::Integer(2)));
        assert!(interp.eval_str("dict { \"a\" }").is_err());
        assert_eq!(
            interp.eval_str("table { \"name\" \"age\" } { \"ann\" 30 \"bo\" 4 } |length?"),
            Ok(Value::Integer(2))
        );
        assert!(interp.eval_str("table { a b } { 1 2 3 }").is_err());
    }

    #[test]
    fn test_type_and_conversions() {
        let (mut interp, _) = capturing();
        let ty = interp.eval_str("type? 1.5").unwrap();
        assert_eq!(ty.inspect(&interp.words), "decimal");
        assert_eq!(interp.eval_str("to-string 42"), Ok(Value::string("42")));
        assert_eq!(interp.eval_str("to-integer \"17\""), Ok(Value::Integer(17)));
        assert_eq!(interp.eval_str("to-integer 2.9"), Ok(Value::Integer(2)));
        assert_eq!(interp.eval_str("to-decimal 2"), Ok(Value::Decimal(2.0)));
        assert!(interp.eval_str("to-integer \"x\"").is_err());
    }
}

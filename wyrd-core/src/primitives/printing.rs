// Printing primitives - all output goes through the interpreter's Output
// Usage: print "hi"   42 .print   { 1 2 } |probe

use crate::builtins::BuiltinDef;
use crate::error::RuntimeError;
use crate::interpreter::Interpreter;
use crate::value::Value;

// print value -> value
// User-friendly printing - strings without quotes for readability
fn print(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let text = args[0].to_text(&interp.words);
    interp.writeln(&text);
    Ok(args[0].clone())
}

// prns value -> value
// Print with a trailing space instead of a newline
fn prns(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let mut text = args[0].to_text(&interp.words);
    text.push(' ');
    interp.write_str(&text);
    Ok(args[0].clone())
}

// probe value -> value
// Developer form: strings quoted, opaque values shown as [kind ...]
fn probe(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let text = args[0].inspect(&interp.words);
    interp.writeln(&text);
    Ok(args[0].clone())
}

// mold value -> string
fn mold(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    match args[0].mold(&interp.words) {
        Some(text) => Ok(Value::String(text.into())),
        None => Err(RuntimeError::builtin(
            "mold",
            format!("{} has no loadable form", args[0].value_type()),
        )),
    }
}

pub const BUILTINS: &[BuiltinDef] = &[
    BuiltinDef::new("print", 1, "Prints a value followed by a newline.", print),
    BuiltinDef::new("prns", 1, "Prints a value followed by a space.", prns),
    BuiltinDef::new("probe", 1, "Prints the inspected form of a value, failures included.", probe)
        .with_failure(),
    BuiltinDef::new("mold", 1, "The loadable source form of a value, as a string.", mold).mark_pure(),
];

#[cfg(test)]
mod tests {
    use crate::primitives::test_support::capturing;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_print_and_prns() {
        let (mut interp, out) = capturing();
        interp.eval_str("prns 1 prns \"two\" print \"three\"").unwrap();
        assert_eq!(out.contents(), "1 two three\n");
    }

    #[test]
    fn test_probe_quotes_strings() {
        let (mut interp, out) = capturing();
        interp.eval_str("probe \"s\" probe { 1 a }").unwrap();
        assert_eq!(out.contents(), "\"s\"\n{ 1 a }\n");
    }

    #[test]
    fn test_mold() {
        let (mut interp, _) = capturing();
        assert_eq!(
            interp.eval_str("mold { x: 1 \"q\" }"),
            Ok(Value::string("{ x: 1 \"q\" }"))
        );
        assert!(interp.eval_str("mold ?print").is_err());
    }
}

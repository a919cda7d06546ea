// Persisted state builtins - thin wrappers over crate::persist

use crate::builtins::{BuiltinDef, STRING};
use crate::error::RuntimeError;
use crate::interpreter::Interpreter;
use crate::persist;
use crate::value::Value;
use std::path::Path;

fn path_arg<'a>(builtin: &str, value: &'a Value) -> Result<&'a Path, RuntimeError> {
    match value {
        Value::String(s) => Ok(Path::new(s.as_ref())),
        other => Err(RuntimeError::builtin(
            builtin,
            format!("expected a path string, got {}", other.value_type()),
        )),
    }
}

// dump\state -> string
fn dump_state(interp: &mut Interpreter, _: &[Value]) -> Result<Value, RuntimeError> {
    let ctx = interp.ctx;
    Ok(Value::String(persist::dump_context(interp, ctx)?.into()))
}

// save\state "file" -> "file"
fn save_state(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    persist::save_state(interp, path_arg("save\\state", &args[0])?)?;
    Ok(args[0].clone())
}

// restore\state "file" -> count
fn restore_state(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let count = persist::restore_state(interp, path_arg("restore\\state", &args[0])?)?;
    Ok(Value::Integer(i64::try_from(count).unwrap_or(i64::MAX)))
}

pub const BUILTINS: &[BuiltinDef] = &[
    BuiltinDef::new("dump\\state", 0, "The current context's bindings as loadable source.", dump_state),
    BuiltinDef::new("save\\state", 1, "Writes the current context's bindings to a file.", save_state)
        .with_args(&[STRING]),
    BuiltinDef::new("restore\\state", 1, "Loads bindings saved with save\\state into the current context.", restore_state)
        .with_args(&[STRING]),
];

#[cfg(test)]
mod tests {
    use crate::primitives::test_support::capturing;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_dump_state_returns_source() {
        let (mut interp, _) = capturing();
        assert_eq!(
            interp.eval_str("a: 1 var 'b \"x\" dump\\state"),
            Ok(Value::string("a: 1\nvar 'b \"x\"\n"))
        );
    }

    #[test]
    fn test_save_and_restore_through_a_file() {
        let path = std::env::temp_dir().join(format!("wyrd-state-{}.wyrd", std::process::id()));
        let path_text = path.display().to_string().replace('\\', "\\\\");

        let (mut first, _) = capturing();
        first
            .eval_str(&format!("greeting: \"hi\" var 'hits 2 save\\state \"{path_text}\""))
            .unwrap();
        let saved = std::fs::read_to_string(&path).unwrap();
        assert!(saved.starts_with("; wyrd state saved "));

        let (mut second, _) = capturing();
        assert_eq!(
            second.eval_str(&format!("restore\\state \"{path_text}\"")),
            Ok(Value::Integer(2))
        );
        assert_eq!(second.eval_str("hits:: hits + 1 greeting + hits"), Ok(Value::string("hi3")));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file_fails() {
        let (mut interp, _) = capturing();
        assert!(interp.eval_str("restore\\state \"/nonexistent/wyrd/state\"").is_err());
    }
}

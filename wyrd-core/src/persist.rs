//! Persisted interpreter state.
//!
//! A dump is ordinary source: evaluating it rebuilds the bindings it was
//! taken from. Bindings are written one per line in word-index order,
//! constants as `name: value` and variables as `var 'name value`, with
//! nested contexts written out recursively as `name: context { ... }`.
//!
//! ```text
//! ; wyrd state saved 2026-10-18T09:30:00+00:00
//! limit: 10
//! var 'count 3
//! greet: fn { name } { print name }
//! config: context {
//!     host: "localhost"
//! }
//! ```

use crate::context::{Context, CtxId};
use crate::error::RuntimeError;
use crate::interpreter::Interpreter;
use crate::parser::load_source;
use crate::value::Value;
use std::path::Path;
use tracing::{debug, info};

const INDENT: &str = "    ";

fn unserializable(word: &str, what: &str) -> RuntimeError {
    RuntimeError::builtin("dump\\state", format!("can't serialize {word}: {what}"))
}

// The source form of a bound value, or None when reloading it would not
// give the same value back.
fn dump_value(interp: &Interpreter, value: &Value) -> Option<String> {
    value.mold_evaluated(&interp.words)
}

fn describe(value: &Value) -> String {
    match value {
        Value::Decimal(d) => format!("decimal {d} has no literal form"),
        other => other.value_type().name().to_string(),
    }
}

fn write_context(
    interp: &Interpreter,
    ctx: CtxId,
    depth: usize,
    out: &mut String,
    visiting: &mut Vec<CtxId>,
) -> Result<usize, RuntimeError> {
    let context = interp.context(ctx)?;
    let mut count = 0;
    for word in context.words() {
        let Some(value) = context.get(word) else {
            continue;
        };
        let name = interp.words.name(word);
        // builtins registered under their own name come back with a fresh
        // interpreter; aliases of them can't be written down
        if let Value::Builtin(bi) = value
            && bi.name.as_ref() == name
        {
            continue;
        }

        out.push_str(&INDENT.repeat(depth));
        if context.is_var(word) {
            out.push_str(&format!("var '{name} "));
        } else {
            out.push_str(&format!("{name}: "));
        }

        match value {
            Value::Context(inner) => {
                if visiting.contains(inner) {
                    return Err(unserializable(name, "context refers back to an enclosing one"));
                }
                visiting.push(*inner);
                out.push_str("context {\n");
                count += write_context(interp, *inner, depth + 1, out, visiting)?;
                visiting.pop();
                out.push_str(&INDENT.repeat(depth));
                out.push_str("}\n");
            }
            other => {
                let text = dump_value(interp, other)
                    .ok_or_else(|| unserializable(name, &describe(other)))?;
                out.push_str(&text);
                out.push('\n');
            }
        }
        count += 1;
    }
    Ok(count)
}

/// Writes the bindings of `ctx` (and the contexts bound inside it) as
/// loadable source.
pub fn dump_context(interp: &Interpreter, ctx: CtxId) -> Result<String, RuntimeError> {
    let mut out = String::new();
    let count = write_context(interp, ctx, 0, &mut out, &mut vec![ctx])?;
    debug!(bindings = count, "state dumped");
    Ok(out)
}

/// Evaluates a dump and copies what it binds into `target`.
///
/// The script runs in a scratch child of the root context, so it sees the
/// builtins but not whatever `target` already holds. Existing bindings in
/// `target` with the same names are replaced, variables stay variables,
/// and contexts the script created are re-parented under `target`.
pub fn restore_source(interp: &mut Interpreter, source: &str, target: CtxId) -> Result<usize, RuntimeError> {
    interp.context(target)?;
    let block = load_source(source, &mut interp.words)?;

    let scratch = interp.contexts.alloc(Context::new(Some(interp.root)));
    interp.do_block_in(scratch, &block);
    if interp.error_flag || interp.failure_flag {
        let err = interp.res.clone();
        interp.reset_flags();
        interp.contexts.discard(scratch);
        return Err(match err {
            Value::Error(err) => RuntimeError::Failure(err),
            _ => RuntimeError::builtin("restore\\state", "state script failed"),
        });
    }

    let restored = interp.context(scratch)?.clone();
    let words = restored.words();
    for word in &words {
        let Some(value) = restored.get(*word) else {
            continue;
        };
        if let Value::Context(inner) = value
            && let Some(inner) = interp.contexts.get_mut(*inner)
            && inner.parent == Some(scratch)
        {
            inner.parent = Some(target);
        }
        let context = interp.context_mut(target)?;
        if restored.is_var(*word) {
            context.declare_var(*word, value.clone());
        } else {
            context.unset(*word);
            context.set(*word, value.clone());
        }
    }
    interp.contexts.discard(scratch);
    debug!(bindings = words.len(), "state restored");
    Ok(words.len())
}

/// Saves the current context's bindings to a file, behind a timestamp
/// comment line.
pub fn save_state(interp: &Interpreter, path: &Path) -> Result<(), RuntimeError> {
    let body = dump_context(interp, interp.ctx)?;
    let stamp = chrono::Local::now().to_rfc3339();
    let text = format!("; wyrd state saved {stamp}\n{body}");
    std::fs::write(path, text).map_err(|e| {
        RuntimeError::builtin("save\\state", format!("{}: {e}", path.display()))
    })?;
    info!(path = %path.display(), "state saved");
    Ok(())
}

pub fn restore_state(interp: &mut Interpreter, path: &Path) -> Result<usize, RuntimeError> {
    let source = std::fs::read_to_string(path).map_err(|e| {
        RuntimeError::builtin("restore\\state", format!("{}: {e}", path.display()))
    })?;
    let target = interp.ctx;
    let count = restore_source(interp, &source, target)?;
    info!(path = %path.display(), bindings = count, "state restored");
    Ok(count)
}

// Primitives module - one builtin table per area of the language

// Numbers and logic
pub mod arithmetic;
pub mod math;

// Evaluation and scope
pub mod control;
pub mod functions;
pub mod contexts;
pub mod failure;

// Data
pub mod collections;

// I/O and persistence
pub mod printing;
pub mod state;

use crate::context::CtxId;
use crate::error::RuntimeError;
use crate::value::{Block, Value};
use crate::words::Word;

// RUST CONCEPT: Argument extraction helpers
// The evaluator has already type-checked every argument against the
// builtin's accept set, so these only fail when a table entry declares
// looser types than the body expects.
pub(crate) fn block_arg<'a>(builtin: &str, value: &'a Value) -> Result<&'a Block, RuntimeError> {
    match value {
        Value::Block(block) => Ok(block),
        other => Err(RuntimeError::builtin(
            builtin,
            format!("expected a block, got {}", other.value_type()),
        )),
    }
}

pub(crate) fn context_arg(builtin: &str, value: &Value) -> Result<CtxId, RuntimeError> {
    match value {
        Value::Context(id) => Ok(*id),
        other => Err(RuntimeError::builtin(
            builtin,
            format!("expected a context, got {}", other.value_type()),
        )),
    }
}

/// Words are accepted bare (`'x` evaluates to a word) or as tagwords.
pub(crate) fn word_arg(builtin: &str, value: &Value) -> Result<Word, RuntimeError> {
    match value {
        Value::Word(word) | Value::Tagword(word) => Ok(*word),
        other => Err(RuntimeError::builtin(
            builtin,
            format!("expected a word, got {}", other.value_type()),
        )),
    }
}

pub(crate) fn integer_arg(builtin: &str, value: &Value) -> Result<i64, RuntimeError> {
    match value {
        Value::Integer(i) => Ok(*i),
        other => Err(RuntimeError::builtin(
            builtin,
            format!("expected an integer, got {}", other.value_type()),
        )),
    }
}

// RUST CONCEPT: Wyrd Prelude Module
// The standard words loaded into the root context at startup, written in
// Wyrd itself on top of the builtins

use crate::error::RuntimeError;
use crate::interpreter::Interpreter;
use crate::parser::load_source;
use tracing::debug;

// RUST CONCEPT: Multi-line raw string of real Wyrd source
// Each line is an ordinary set-word binding, so the prelude goes through
// exactly the same evaluation path as user code.
const PRELUDE: &str = r#"
    ; numbers
    negate: fn { n "Zero minus n." } { 0 - n }
    square: fn { n "n times itself." } { n * n }
    zero?: fn { n "True when n is zero." } { n = 0 }
    positive?: fn { n "True when n is above zero." } { n > 0 }
    negative?: fn { n "True when n is below zero." } { n < 0 }
    even?: fn { n "True when n is divisible by two." } { n % 2 = 0 }
    odd?: fn { n "True when n is not divisible by two." } { not even? n }

    ; control
    unless: fn { cond blk "Evaluates blk when cond is falsy." } { if not cond blk }
"#;

/// Evaluates the prelude into the root context.
pub fn load_prelude(interp: &mut Interpreter) -> Result<(), RuntimeError> {
    let block = load_source(PRELUDE, &mut interp.words)?;
    let root = interp.root;
    interp.with_context(root, |interp| interp.eval_top(&block))?;
    debug!("prelude loaded");
    Ok(())
}

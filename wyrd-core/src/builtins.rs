// Builtin declaration and registration
//
// Every native builtin is a BuiltinDef in a `BUILTINS` table owned by the
// primitives module that implements it. Registration walks the tables once at
// startup and binds each entry in the root context; pure entries are bound in
// the pure root as well, and kind-qualified entries land in the generic
// dispatch table under an explicit (kind, name) word pair.

use crate::interpreter::Interpreter;
use crate::primitives;
use crate::value::{BuiltinFn, ValueType};
use tracing::debug;

/// Accept-set shorthands used by the primitive tables.
pub const ANY: &[ValueType] = &[];
pub const INTEGER: &[ValueType] = &[ValueType::Integer];
pub const NUMBER: &[ValueType] = &[ValueType::Integer, ValueType::Decimal];
pub const STRING: &[ValueType] = &[ValueType::String];
pub const BLOCK: &[ValueType] = &[ValueType::Block];
pub const CONTEXT: &[ValueType] = &[ValueType::Context];
pub const WORDLIKE: &[ValueType] = &[ValueType::Word, ValueType::Tagword];
pub const ERROR: &[ValueType] = &[ValueType::Error];

// RUST CONCEPT: Plain-data descriptor with a fn pointer
// BuiltinDef is Copy, so the static tables can be iterated and each entry
// moved into an Rc<Builtin> without any allocation besides the name.
#[derive(Clone, Copy)]
pub struct BuiltinDef {
    pub name: &'static str,
    /// Namespace for generic dispatch; registers under `kind//name`.
    pub kind: Option<&'static str>,
    pub arity: usize,
    pub pure: bool,
    pub accepts_failure: bool,
    /// Accepted types per argument position; an empty set accepts anything.
    pub args: &'static [&'static [ValueType]],
    pub doc: &'static str,
    pub func: BuiltinFn,
}

impl BuiltinDef {
    pub const fn new(name: &'static str, arity: usize, doc: &'static str, func: BuiltinFn) -> Self {
        Self {
            name,
            kind: None,
            arity,
            pure: false,
            accepts_failure: false,
            args: &[],
            doc,
            func,
        }
    }

    pub const fn mark_pure(mut self) -> Self {
        self.pure = true;
        self
    }

    pub const fn with_failure(mut self) -> Self {
        self.accepts_failure = true;
        self
    }

    pub const fn with_args(mut self, args: &'static [&'static [ValueType]]) -> Self {
        self.args = args;
        self
    }

    pub const fn with_kind(mut self, kind: &'static str) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Accepted types for a zero-based argument position.
    pub fn accepted(&self, position: usize) -> &'static [ValueType] {
        self.args.get(position).copied().unwrap_or(ANY)
    }
}

pub fn register_builtins(interp: &mut Interpreter) {
    let tables: [&[BuiltinDef]; 9] = [
        primitives::arithmetic::BUILTINS,
        primitives::control::BUILTINS,
        primitives::functions::BUILTINS,
        primitives::contexts::BUILTINS,
        primitives::failure::BUILTINS,
        primitives::collections::BUILTINS,
        primitives::printing::BUILTINS,
        primitives::state::BUILTINS,
        crate::qmath::BUILTINS,
    ];

    let mut count = 0;
    for table in tables {
        for def in table {
            interp.register_builtin(*def);
            count += 1;
        }
    }

    interp.register_module("math", primitives::math::BUILTINS);
    debug!(count, modules = 1, "registered builtins");
}

//! # Wyrd Core
//!
//! Interpreter library for Wyrd, a small homoiconic language in the Rebol
//! family.
//!
//! Source text loads into blocks of values, and blocks are evaluated left
//! to right against a tree of contexts. Words are interned once and
//! compared by index everywhere after that.
//!
//! ## Features
//!
//! - **Homoiconic**: code is a block of values until something evaluates it
//! - **Op-words and pipe-words**: `1 + 2 |print` without precedence rules
//! - **Failures as values**: errors travel through flags and can be handled
//!   with `fix`, `check` or `try` instead of unwinding
//! - **Generic dispatch**: `length?` picks an implementation by receiver kind
//! - **Persisted state**: `save\state` writes bindings back out as source
//!
//! ## Example
//!
//! ```
//! use wyrd_core::{Interpreter, Value};
//!
//! let mut interp = Interpreter::new();
//! let result = interp.eval_str("x: 20 x + 1 * 2").unwrap();
//! assert_eq!(result, Value::Integer(42));
//! ```

// Public modules
pub mod builtins;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod interpreter;
pub mod output;
pub mod parser;
pub mod persist;
pub mod prelude;
pub mod primitives;
pub mod qmath;
pub mod series;
pub mod stdout_output;
pub mod tokenizer;
pub mod value;
pub mod words;

// Internal modules
mod stack;

// Re-export commonly used types
pub use context::{Context, CtxId};
pub use error::{ErrorCategory, ErrorValue, RuntimeError};
pub use interpreter::{Interpreter, InterpreterConfig};
pub use output::{BufferOutput, Output};
pub use parser::{ParseError, load_source};
pub use stdout_output::StdoutOutput;
pub use value::{Block, Value, ValueType};
pub use words::{Word, WordTable};

// Error taxonomy for the evaluator and the in-language error value
//
// RuntimeError is what native code returns. The evaluator never unwinds on
// it: a returned error becomes an ErrorValue in the result register and a
// raised failure flag, checked after every step.

use crate::parser::ParseError;
use crate::value::ValueType;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("{builtin}: argument {position} expects {}, got {got}", type_list(.accepted))]
    Arg {
        builtin: Rc<str>,
        position: usize,
        accepted: Vec<ValueType>,
        got: ValueType,
    },

    #[error("{builtin}: {message}")]
    Builtin { builtin: Rc<str>, message: String },

    #[error("can't modify constant {word}, declare it with var to make it mutable")]
    Modify { word: Rc<str> },

    #[error("word not found: {word}")]
    WordNotFound { word: Rc<str> },

    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("context is no longer live")]
    StaleContext,

    #[error("{0}")]
    Failure(Rc<ErrorValue>),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
}

impl RuntimeError {
    pub fn builtin(builtin: &str, message: impl Into<String>) -> Self {
        RuntimeError::Builtin {
            builtin: builtin.into(),
            message: message.into(),
        }
    }

    /// The in-language value this error is stored as.
    pub fn to_error_value(&self) -> Rc<ErrorValue> {
        let category = match self {
            RuntimeError::Failure(err) => return err.clone(),
            RuntimeError::Arg {
                builtin,
                position,
                accepted,
                ..
            } => ErrorCategory::Arg {
                builtin: builtin.clone(),
                position: *position,
                accepted: accepted.clone(),
            },
            RuntimeError::Builtin { builtin, .. } => ErrorCategory::Builtin {
                builtin: builtin.clone(),
            },
            RuntimeError::Modify { word } => ErrorCategory::Modify { word: word.clone() },
            RuntimeError::WordNotFound { .. }
            | RuntimeError::IndexOutOfRange { .. }
            | RuntimeError::StaleContext => ErrorCategory::Lookup,
            RuntimeError::Parse(_) => ErrorCategory::Parse,
        };
        Rc::new(ErrorValue::new(category, 0, self.to_string()))
    }
}

fn type_list(types: &[ValueType]) -> String {
    let names: Vec<&str> = types.iter().map(|t| t.name()).collect();
    names.join(" or ")
}

/// Which branch of the taxonomy produced an error value.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorCategory {
    /// Raised by user code through `fail`, `failure` and friends.
    User,
    Arg {
        builtin: Rc<str>,
        position: usize,
        accepted: Vec<ValueType>,
    },
    Builtin {
        builtin: Rc<str>,
    },
    Modify {
        word: Rc<str>,
    },
    Lookup,
    Parse,
}

impl ErrorCategory {
    pub fn name(&self) -> &'static str {
        match self {
            ErrorCategory::User => "failure",
            ErrorCategory::Arg { .. } => "arg-error",
            ErrorCategory::Builtin { .. } => "builtin-error",
            ErrorCategory::Modify { .. } => "modify-error",
            ErrorCategory::Lookup => "lookup-error",
            ErrorCategory::Parse => "parse-error",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ErrorValue {
    pub category: ErrorCategory,
    pub status: i64,
    pub message: String,
    pub parent: Option<Rc<ErrorValue>>,
}

impl ErrorValue {
    pub fn new(category: ErrorCategory, status: i64, message: impl Into<String>) -> Self {
        Self {
            category,
            status,
            message: message.into(),
            parent: None,
        }
    }

    pub fn wrapping(mut self, parent: Rc<ErrorValue>) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Follows the parent chain to the innermost cause.
    pub fn root_cause(self: &Rc<Self>) -> Rc<ErrorValue> {
        let mut current = self.clone();
        while let Some(parent) = current.parent.clone() {
            current = parent;
        }
        current
    }

    fn write_chain(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        if self.status != 0 {
            write!(f, "Error({}): {}", self.status, self.message)?;
        } else {
            write!(f, "Error: {}", self.message)?;
        }
        if let Some(parent) = &self.parent {
            writeln!(f)?;
            for _ in 0..depth {
                f.write_str("  ")?;
            }
            parent.write_chain(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_chain(f, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_arg_error_message_names_position_and_types() {
        let err = RuntimeError::Arg {
            builtin: "qmath".into(),
            position: 1,
            accepted: vec![ValueType::Block],
            got: ValueType::Integer,
        };
        assert_eq!(err.to_string(), "qmath: argument 1 expects block, got integer");

        let value = err.to_error_value();
        assert_eq!(
            value.category,
            ErrorCategory::Arg {
                builtin: "qmath".into(),
                position: 1,
                accepted: vec![ValueType::Block],
            }
        );
    }

    #[test]
    fn test_error_chain_display() {
        let inner = Rc::new(ErrorValue::new(ErrorCategory::User, 404, "not found"));
        let outer = ErrorValue::new(ErrorCategory::User, 0, "loading config").wrapping(inner);
        assert_eq!(
            outer.to_string(),
            "Error: loading config\n  Error(404): not found"
        );
    }

    #[test]
    fn test_root_cause() {
        let root = Rc::new(ErrorValue::new(ErrorCategory::User, 1, "root"));
        let mid = Rc::new(ErrorValue::new(ErrorCategory::User, 2, "mid").wrapping(root.clone()));
        let top = Rc::new(ErrorValue::new(ErrorCategory::User, 3, "top").wrapping(mid));
        assert_eq!(top.root_cause(), root);
    }

    #[test]
    fn test_failure_keeps_its_value() {
        let value = Rc::new(ErrorValue::new(ErrorCategory::User, 7, "custom"));
        let err = RuntimeError::Failure(value.clone());
        assert!(Rc::ptr_eq(&err.to_error_value(), &value));
        assert_eq!(err.to_string(), "Error(7): custom");
    }
}

// The value model: one closed sum type for everything a program can hold
//
// RUST CONCEPT: Exhaustive matching
// Adding a variant makes every `match` over Value fail to compile until it is
// handled, which is how new value kinds get wired through the evaluator.

use crate::builtins::BuiltinDef;
use crate::context::CtxId;
use crate::error::{ErrorCategory, ErrorValue};
use crate::series::Series;
use crate::words::{Word, WordTable};
use std::any::Any;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

// RUST CONCEPT: Fieldless enum with explicit discriminants
// The word table interns these names first, in this order, so the
// discriminant of a type is also the index of the word naming it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum ValueType {
    Void = 0,
    Integer,
    Decimal,
    Boolean,
    String,
    Word,
    Setword,
    LSetword,
    Modword,
    LModword,
    Getword,
    Opword,
    Pipeword,
    Tagword,
    Xword,
    CPath,
    Comma,
    Block,
    List,
    Dict,
    Table,
    TableRow,
    Context,
    Function,
    Builtin,
    Native,
    Error,
    Ref,
}

impl ValueType {
    pub const ALL: [ValueType; 28] = [
        ValueType::Void,
        ValueType::Integer,
        ValueType::Decimal,
        ValueType::Boolean,
        ValueType::String,
        ValueType::Word,
        ValueType::Setword,
        ValueType::LSetword,
        ValueType::Modword,
        ValueType::LModword,
        ValueType::Getword,
        ValueType::Opword,
        ValueType::Pipeword,
        ValueType::Tagword,
        ValueType::Xword,
        ValueType::CPath,
        ValueType::Comma,
        ValueType::Block,
        ValueType::List,
        ValueType::Dict,
        ValueType::Table,
        ValueType::TableRow,
        ValueType::Context,
        ValueType::Function,
        ValueType::Builtin,
        ValueType::Native,
        ValueType::Error,
        ValueType::Ref,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ValueType::Void => "void",
            ValueType::Integer => "integer",
            ValueType::Decimal => "decimal",
            ValueType::Boolean => "boolean",
            ValueType::String => "string",
            ValueType::Word => "word",
            ValueType::Setword => "setword",
            ValueType::LSetword => "lsetword",
            ValueType::Modword => "modword",
            ValueType::LModword => "lmodword",
            ValueType::Getword => "getword",
            ValueType::Opword => "opword",
            ValueType::Pipeword => "pipeword",
            ValueType::Tagword => "tagword",
            ValueType::Xword => "xword",
            ValueType::CPath => "cpath",
            ValueType::Comma => "comma",
            ValueType::Block => "block",
            ValueType::List => "list",
            ValueType::Dict => "dict",
            ValueType::Table => "table",
            ValueType::TableRow => "table-row",
            ValueType::Context => "context",
            ValueType::Function => "function",
            ValueType::Builtin => "builtin",
            ValueType::Native => "native",
            ValueType::Error => "error",
            ValueType::Ref => "ref",
        }
    }

    pub fn word(self) -> Word {
        Word::from_index(self as usize)
    }

    pub fn from_name(name: &str) -> Option<ValueType> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockMode {
    /// `{ }` a literal, never evaluated on its own
    Curly,
    /// `[ ]` every expression is evaluated and the results collected
    Square,
    /// `( )` evaluated as a group in place
    Paren,
}

#[derive(Clone, Debug)]
pub struct Block {
    pub items: Rc<[Value]>,
    pub mode: BlockMode,
}

impl Block {
    pub fn new(items: Vec<Value>) -> Self {
        Self::with_mode(items, BlockMode::Curly)
    }

    pub fn with_mode(items: Vec<Value>, mode: BlockMode) -> Self {
        Self {
            items: items.into(),
            mode,
        }
    }

    pub fn series(&self) -> Series {
        Series::new(self.items.clone())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A user-defined callable: parameter words plus a body evaluated in a fresh
/// child context.
#[derive(Debug)]
pub struct Function {
    pub spec: Block,
    pub params: Rc<[Word]>,
    pub body: Block,
    pub pure: bool,
    /// Captured definition context for closures.
    pub closure: Option<CtxId>,
}

impl Function {
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// Signature every native builtin implements.
pub type BuiltinFn = fn(&mut crate::Interpreter, &[Value]) -> Result<Value, crate::RuntimeError>;

#[derive(Clone)]
pub struct Builtin {
    /// Name it was registered under, used in error messages.
    pub name: Rc<str>,
    pub def: BuiltinDef,
}

impl Builtin {
    pub fn arity(&self) -> usize {
        self.def.arity
    }
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtin")
            .field("name", &self.name)
            .field("arity", &self.def.arity)
            .field("pure", &self.def.pure)
            .field("accepts_failure", &self.def.accepts_failure)
            .finish()
    }
}

/// Opaque foreign handle. The kind is used for generic dispatch and messages.
#[derive(Clone)]
pub struct Native {
    pub kind: Word,
    pub payload: Rc<dyn Any>,
}

impl fmt::Debug for Native {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Native").field("kind", &self.kind).finish()
    }
}

#[derive(Debug, PartialEq)]
pub struct Table {
    pub columns: Rc<[Rc<str>]>,
    pub rows: Vec<Rc<[Value]>>,
}

#[derive(Debug, PartialEq)]
pub struct TableRow {
    pub columns: Rc<[Rc<str>]>,
    pub values: Rc<[Value]>,
}

#[derive(Clone, Debug)]
pub enum Value {
    Void,
    Integer(i64),
    Decimal(f64),
    Boolean(bool),
    String(Rc<str>),
    Word(Word),
    Setword(Word),
    LSetword(Word),
    Modword(Word),
    LModword(Word),
    Getword(Word),
    Opword(Word),
    Pipeword(Word),
    Tagword(Word),
    Xword(Word),
    CPath(Rc<[Word]>),
    Comma,
    Block(Block),
    List(Rc<Vec<Value>>),
    Dict(Rc<BTreeMap<Rc<str>, Value>>),
    Table(Rc<Table>),
    TableRow(Rc<TableRow>),
    Context(CtxId),
    Function(Rc<Function>),
    Builtin(Rc<Builtin>),
    Native(Native),
    Error(Rc<ErrorValue>),
    // RUST CONCEPT: Shared mutability is opt-in
    // Only values explicitly wrapped with `ref` are aliased between holders
    Ref(Rc<RefCell<Value>>),
}

impl Value {
    pub fn string(text: &str) -> Self {
        Value::String(text.into())
    }

    pub fn block(items: Vec<Value>) -> Self {
        Value::Block(Block::new(items))
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Void => ValueType::Void,
            Value::Integer(_) => ValueType::Integer,
            Value::Decimal(_) => ValueType::Decimal,
            Value::Boolean(_) => ValueType::Boolean,
            Value::String(_) => ValueType::String,
            Value::Word(_) => ValueType::Word,
            Value::Setword(_) => ValueType::Setword,
            Value::LSetword(_) => ValueType::LSetword,
            Value::Modword(_) => ValueType::Modword,
            Value::LModword(_) => ValueType::LModword,
            Value::Getword(_) => ValueType::Getword,
            Value::Opword(_) => ValueType::Opword,
            Value::Pipeword(_) => ValueType::Pipeword,
            Value::Tagword(_) => ValueType::Tagword,
            Value::Xword(_) => ValueType::Xword,
            Value::CPath(_) => ValueType::CPath,
            Value::Comma => ValueType::Comma,
            Value::Block(_) => ValueType::Block,
            Value::List(_) => ValueType::List,
            Value::Dict(_) => ValueType::Dict,
            Value::Table(_) => ValueType::Table,
            Value::TableRow(_) => ValueType::TableRow,
            Value::Context(_) => ValueType::Context,
            Value::Function(_) => ValueType::Function,
            Value::Builtin(_) => ValueType::Builtin,
            Value::Native(_) => ValueType::Native,
            Value::Error(_) => ValueType::Error,
            Value::Ref(_) => ValueType::Ref,
        }
    }

    /// Dispatch tag. Natives carry their own kind; contexts may carry a kind
    /// word, which the interpreter resolves through the arena.
    pub fn kind(&self) -> Word {
        match self {
            Value::Native(native) => native.kind,
            other => other.value_type().word(),
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_) | Value::Builtin(_))
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Boolean(b) => *b,
            Value::Void => false,
            Value::Integer(i) => *i != 0,
            Value::Decimal(d) => *d != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Error(_) => false,
            _ => true,
        }
    }

    /// Human-readable form used by `print`: strings without quotes.
    pub fn to_text(&self, words: &WordTable) -> String {
        match self {
            Value::String(s) => s.to_string(),
            Value::Error(err) => err.to_string(),
            other => other.inspect(words),
        }
    }

    /// Readable form that never fails; opaque values render as `[kind ...]`.
    pub fn inspect(&self, words: &WordTable) -> String {
        let mut out = String::new();
        self.write_into(words, &mut out, false);
        out
    }

    /// Loader-readable form, or None when the value (or something nested in
    /// it) has no textual representation.
    pub fn mold(&self, words: &WordTable) -> Option<String> {
        let mut out = String::new();
        self.write_into(words, &mut out, true).then_some(out)
    }

    /// Like [`Value::mold`], for a position that will be evaluated on reload:
    /// the right-hand side of a binding or an item of a list, dict or table.
    /// Words come out quoted, and values that would evaluate to something
    /// else (set-words, paths, `[ ]` blocks) have no such form.
    pub fn mold_evaluated(&self, words: &WordTable) -> Option<String> {
        let mut out = String::new();
        self.write_evaluated(words, &mut out).then_some(out)
    }

    fn write_evaluated(&self, words: &WordTable, out: &mut String) -> bool {
        match self {
            Value::Word(w) => {
                out.push('\'');
                out.push_str(words.name(*w));
                true
            }
            Value::Block(block) if block.mode != BlockMode::Curly => false,
            Value::Void
            | Value::Integer(_)
            | Value::Decimal(_)
            | Value::Boolean(_)
            | Value::String(_)
            | Value::Block(_)
            | Value::List(_)
            | Value::Dict(_)
            | Value::Table(_)
            | Value::Function(_)
            | Value::Error(_) => self.write_into(words, out, true),
            _ => false,
        }
    }

    // Items of collections reload through evaluation, so strict output
    // writes them in evaluated form.
    fn write_item(&self, words: &WordTable, out: &mut String, strict: bool) -> bool {
        if strict {
            self.write_evaluated(words, out)
        } else {
            self.write_into(words, out, false)
        }
    }

    fn write_into(&self, words: &WordTable, out: &mut String, strict: bool) -> bool {
        match self {
            Value::Void => out.push('_'),
            Value::Integer(i) => out.push_str(&i.to_string()),
            // inf and NaN have no literal and would reload as words
            Value::Decimal(d) if strict && !d.is_finite() => return false,
            Value::Decimal(d) => out.push_str(&format_decimal(*d)),
            Value::Boolean(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::String(s) => write_string_literal(s, out),
            Value::Word(w) => out.push_str(words.name(*w)),
            Value::Setword(w) => {
                out.push_str(words.name(*w));
                out.push(':');
            }
            Value::LSetword(w) => {
                out.push(':');
                out.push_str(words.name(*w));
            }
            Value::Modword(w) => {
                out.push_str(words.name(*w));
                out.push_str("::");
            }
            Value::LModword(w) => {
                out.push_str("::");
                out.push_str(words.name(*w));
            }
            Value::Getword(w) => {
                out.push('?');
                out.push_str(words.name(*w));
            }
            Value::Opword(w) => {
                let name = words.name(*w);
                match operator_text(name) {
                    Some(op) => out.push_str(op),
                    None => {
                        out.push('.');
                        out.push_str(name);
                    }
                }
            }
            Value::Pipeword(w) => {
                let name = words.name(*w);
                out.push('|');
                out.push_str(operator_text(name).unwrap_or(name));
            }
            Value::Tagword(w) => {
                out.push('\'');
                out.push_str(words.name(*w));
            }
            Value::Xword(w) => {
                out.push('<');
                out.push_str(words.name(*w));
                out.push('>');
            }
            Value::CPath(path) => {
                for (i, w) in path.iter().enumerate() {
                    if i > 0 {
                        out.push('/');
                    }
                    out.push_str(words.name(*w));
                }
            }
            Value::Comma => out.push(','),
            Value::Block(block) => {
                let (open, close) = match block.mode {
                    BlockMode::Curly => ('{', '}'),
                    BlockMode::Square => ('[', ']'),
                    BlockMode::Paren => ('(', ')'),
                };
                out.push(open);
                for item in block.items.iter() {
                    out.push(' ');
                    if !item.write_into(words, out, strict) {
                        return false;
                    }
                }
                out.push(' ');
                out.push(close);
            }
            Value::List(items) => {
                out.push_str("list {");
                for item in items.iter() {
                    out.push(' ');
                    if !item.write_item(words, out, strict) {
                        return false;
                    }
                }
                out.push_str(" }");
            }
            Value::Dict(entries) => {
                out.push_str("dict {");
                for (key, item) in entries.iter() {
                    out.push(' ');
                    write_string_literal(key, out);
                    out.push(' ');
                    if !item.write_item(words, out, strict) {
                        return false;
                    }
                }
                out.push_str(" }");
            }
            Value::Table(table) => {
                out.push_str("table {");
                for column in table.columns.iter() {
                    out.push(' ');
                    write_string_literal(column, out);
                }
                out.push_str(" } {");
                for row in &table.rows {
                    for item in row.iter() {
                        out.push(' ');
                        if !item.write_item(words, out, strict) {
                            return false;
                        }
                    }
                }
                out.push_str(" }");
            }
            Value::TableRow(row) => {
                if strict {
                    return false;
                }
                out.push_str("[row");
                for (column, item) in row.columns.iter().zip(row.values.iter()) {
                    out.push(' ');
                    out.push_str(column);
                    out.push(':');
                    out.push(' ');
                    item.write_into(words, out, false);
                }
                out.push(']');
            }
            Value::Function(func) => {
                if func.closure.is_some() && strict {
                    return false;
                }
                out.push_str(if func.pure { "pfn " } else { "fn " });
                if !Value::Block(func.spec.clone()).write_into(words, out, strict) {
                    return false;
                }
                out.push(' ');
                if !Value::Block(func.body.clone()).write_into(words, out, strict) {
                    return false;
                }
            }
            Value::Error(err) => write_error(err, out),
            Value::Context(_) => {
                if strict {
                    return false;
                }
                out.push_str("[context]");
            }
            Value::Builtin(bi) => {
                if strict {
                    return false;
                }
                out.push_str("[builtin ");
                out.push_str(&bi.name);
                out.push(']');
            }
            Value::Native(native) => {
                if strict {
                    return false;
                }
                out.push_str("[native ");
                out.push_str(words.name(native.kind));
                out.push(']');
            }
            Value::Ref(cell) => {
                if strict {
                    return false;
                }
                out.push_str("[ref ");
                cell.borrow().write_into(words, out, false);
                out.push(']');
            }
        }
        true
    }
}

fn format_decimal(d: f64) -> String {
    // Debug keeps the fractional part (1.0, not 1) so it reloads as a decimal
    format!("{d:?}")
}

fn write_string_literal(s: &str, out: &mut String) {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
}

// User failures reload through `failure`; other categories are named with
// `failure\kind` so they come back as the same kind of error.
fn write_error(err: &ErrorValue, out: &mut String) {
    if err.parent.is_some() {
        out.push_str("failure\\wrap ");
    } else if err.category == ErrorCategory::User {
        out.push_str("failure ");
    }
    if err.category != ErrorCategory::User {
        out.push_str("failure\\kind ");
        write_category(&err.category, out);
        out.push(' ');
    }
    out.push_str("{ ");
    out.push_str(&err.status.to_string());
    out.push(' ');
    write_string_literal(&err.message, out);
    out.push_str(" }");
    if let Some(parent) = &err.parent {
        out.push(' ');
        write_error(parent, out);
    }
}

fn write_category(category: &ErrorCategory, out: &mut String) {
    out.push_str("{ ");
    out.push_str(category.name());
    match category {
        ErrorCategory::Arg {
            builtin,
            position,
            accepted,
        } => {
            out.push(' ');
            write_string_literal(builtin, out);
            out.push_str(&format!(" {position} {{"));
            for kind in accepted {
                out.push(' ');
                out.push_str(kind.name());
            }
            out.push_str(" }");
        }
        ErrorCategory::Builtin { builtin: name } | ErrorCategory::Modify { word: name } => {
            out.push(' ');
            write_string_literal(name, out);
        }
        ErrorCategory::User | ErrorCategory::Lookup | ErrorCategory::Parse => {}
    }
    out.push_str(" }");
}

/// Operator words are interned with a leading underscore (`+` is `_+`).
pub fn operator_text(name: &str) -> Option<&str> {
    let op = name.strip_prefix('_')?;
    (!op.is_empty() && op.chars().all(is_operator_char)).then_some(op)
}

pub fn is_operator_char(ch: char) -> bool {
    matches!(ch, '+' | '-' | '*' | '/' | '%' | '=' | '<' | '>' | '!')
}

// RUST CONCEPT: Manual PartialEq
// Structural equality for data, identity for callables and handles
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Void, Value::Void) => true,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Word(a), Value::Word(b))
            | (Value::Setword(a), Value::Setword(b))
            | (Value::LSetword(a), Value::LSetword(b))
            | (Value::Modword(a), Value::Modword(b))
            | (Value::LModword(a), Value::LModword(b))
            | (Value::Getword(a), Value::Getword(b))
            | (Value::Opword(a), Value::Opword(b))
            | (Value::Pipeword(a), Value::Pipeword(b))
            | (Value::Tagword(a), Value::Tagword(b))
            | (Value::Xword(a), Value::Xword(b)) => a == b,
            (Value::CPath(a), Value::CPath(b)) => a == b,
            (Value::Comma, Value::Comma) => true,
            (Value::Block(a), Value::Block(b)) => a.items == b.items,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Dict(a), Value::Dict(b)) => a == b,
            (Value::Table(a), Value::Table(b)) => a == b,
            (Value::TableRow(a), Value::TableRow(b)) => a == b,
            (Value::Context(a), Value::Context(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => {
                a.kind == b.kind && Rc::ptr_eq(&a.payload, &b.payload)
            }
            (Value::Error(a), Value::Error(b)) => a == b,
            (Value::Ref(a), Value::Ref(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_value_type_discriminants_follow_all() {
        for (i, ty) in ValueType::ALL.iter().enumerate() {
            assert_eq!(*ty as usize, i);
        }
    }

    #[test]
    fn test_is_truthy() {
        assert!(Value::Boolean(true).is_truthy());
        assert!(!Value::Boolean(false).is_truthy());
        assert!(!Value::Void.is_truthy());
        assert!(!Value::Integer(0).is_truthy());
        assert!(Value::Integer(-3).is_truthy());
        assert!(!Value::string("").is_truthy());
        assert!(Value::block(vec![]).is_truthy());
    }

    #[test]
    fn test_mold_words_and_blocks() {
        let mut words = WordTable::new();
        let x = words.intern("x");
        let plus = words.intern("_+");
        let block = Value::block(vec![
            Value::Setword(x),
            Value::Integer(1),
            Value::Opword(plus),
            Value::Decimal(2.0),
            Value::Getword(x),
            Value::string("a \"q\""),
        ]);
        assert_eq!(
            block.mold(&words).unwrap(),
            "{ x: 1 + 2.0 ?x \"a \\\"q\\\"\" }"
        );
    }

    #[test]
    fn test_mold_error_chain() {
        let words = WordTable::new();
        let inner = Rc::new(ErrorValue::new(ErrorCategory::User, 404, "missing"));
        let outer = ErrorValue::new(ErrorCategory::User, 0, "load failed").wrapping(inner);
        assert_eq!(
            Value::Error(Rc::new(outer)).mold(&words).unwrap(),
            "failure\\wrap { 0 \"load failed\" } failure { 404 \"missing\" }"
        );
    }

    #[test]
    fn test_mold_error_keeps_category() {
        let words = WordTable::new();
        let lookup = ErrorValue::new(ErrorCategory::Lookup, 0, "index 5 out of range");
        assert_eq!(
            Value::Error(Rc::new(lookup)).mold(&words).unwrap(),
            "failure\\kind { lookup-error } { 0 \"index 5 out of range\" }"
        );
        let arg = ErrorValue::new(
            ErrorCategory::Arg {
                builtin: "shout".into(),
                position: 2,
                accepted: vec![ValueType::Integer, ValueType::Decimal],
            },
            0,
            "bad",
        );
        let outer = ErrorValue::new(ErrorCategory::Modify { word: "x".into() }, 1, "no").wrapping(Rc::new(arg));
        assert_eq!(
            Value::Error(Rc::new(outer)).mold(&words).unwrap(),
            "failure\\wrap failure\\kind { modify-error \"x\" } { 1 \"no\" } \
             failure\\kind { arg-error \"shout\" 2 { integer decimal } } { 0 \"bad\" }"
        );
    }

    #[test]
    fn test_collection_items_mold_in_evaluated_form() {
        let mut words = WordTable::new();
        let red = words.intern("red");
        let x = words.intern("x");
        let colors = Value::List(Rc::new(vec![Value::Word(red), Value::block(vec![Value::Word(red)])]));
        assert_eq!(colors.mold(&words).unwrap(), "list { 'red { red } }");
        assert_eq!(colors.inspect(&words), "list { red { red } }");

        let mut entries = BTreeMap::new();
        entries.insert(Rc::from("k"), Value::Setword(x));
        assert_eq!(Value::Dict(Rc::new(entries)).mold(&words), None);
        assert_eq!(Value::Word(red).mold_evaluated(&words).unwrap(), "'red");
        assert_eq!(Value::Word(red).mold(&words).unwrap(), "red");
    }

    #[test]
    fn test_non_finite_decimals_do_not_mold() {
        let words = WordTable::new();
        assert_eq!(Value::Decimal(f64::INFINITY).mold(&words), None);
        assert_eq!(Value::Decimal(f64::NAN).mold_evaluated(&words), None);
        assert_eq!(Value::List(Rc::new(vec![Value::Decimal(f64::NEG_INFINITY)])).mold(&words), None);
        assert_eq!(Value::Decimal(f64::INFINITY).inspect(&words), "inf");
        assert_eq!(Value::Decimal(2.5).mold(&words).unwrap(), "2.5");
    }

    #[test]
    fn test_value_type_from_name() {
        assert_eq!(ValueType::from_name("table-row"), Some(ValueType::TableRow));
        assert_eq!(ValueType::from_name("integer"), Some(ValueType::Integer));
        assert_eq!(ValueType::from_name("nothing"), None);
    }

    #[test]
    fn test_context_and_native_do_not_mold() {
        let mut words = WordTable::new();
        let kind = words.intern("file-handle");
        let native = Value::Native(Native {
            kind,
            payload: Rc::new(7_u8),
        });
        assert_eq!(native.mold(&words), None);
        assert_eq!(native.inspect(&words), "[native file-handle]");
        assert_eq!(native.kind(), kind);
    }

    #[test]
    fn test_equality_is_structural_for_data() {
        assert_eq!(
            Value::block(vec![Value::Integer(1), Value::string("a")]),
            Value::block(vec![Value::Integer(1), Value::string("a")])
        );
        assert_ne!(Value::Integer(1), Value::Decimal(1.0));
        let cell = Rc::new(RefCell::new(Value::Integer(1)));
        assert_eq!(Value::Ref(cell.clone()), Value::Ref(cell));
        assert_ne!(
            Value::Ref(Rc::new(RefCell::new(Value::Void))),
            Value::Ref(Rc::new(RefCell::new(Value::Void)))
        );
    }

    #[test]
    fn test_operator_text() {
        assert_eq!(operator_text("_+"), Some("+"));
        assert_eq!(operator_text("_//"), Some("//"));
        assert_eq!(operator_text("_private"), None);
        assert_eq!(operator_text("print"), None);
    }
}

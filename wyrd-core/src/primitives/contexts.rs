// Context construction, introspection and binding primitives
//
// Every context handed out as a value is captured in the arena, so it
// survives the call that created it.

use crate::builtins::{ANY, BLOCK, BuiltinDef, CONTEXT, WORDLIKE};
use crate::context::{Context, CtxId};
use crate::error::RuntimeError;
use crate::interpreter::Interpreter;
use crate::primitives::{block_arg, context_arg, word_arg};
use crate::value::{Block, Value, ValueType};
use crate::words::Word;
use std::cell::RefCell;
use std::rc::Rc;

const WORD_OR_BLOCK: &[ValueType] = &[ValueType::Word, ValueType::Tagword, ValueType::Block];
const REF: &[ValueType] = &[ValueType::Ref];

fn failed(interp: &Interpreter) -> bool {
    interp.error_flag || interp.failure_flag
}

// Builds a context under `parent`, evaluates the block inside it and
// returns the context, or the error if the block failed.
fn build_context(
    interp: &mut Interpreter,
    parent: Option<CtxId>,
    block: &Block,
) -> Result<(CtxId, Value), Value> {
    let (id, value) = interp.new_context_value(parent);
    let result = interp.do_block_in(id, block);
    if failed(interp) {
        return Err(result);
    }
    Ok((id, value))
}

// context { body } -> context
fn context(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let block = block_arg("context", &args[0])?;
    let parent = Some(interp.ctx);
    Ok(build_context(interp, parent, block).map_or_else(|err| err, |(_, value)| value))
}

// raw-context { body } -> context
// No parent at all: the block can only bind literals.
fn raw_context(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let block = block_arg("raw-context", &args[0])?;
    Ok(build_context(interp, None, block).map_or_else(|err| err, |(_, value)| value))
}

// isolate { body } -> context
// Evaluated with the current context as parent, then detached from it.
fn isolate(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let block = block_arg("isolate", &args[0])?;
    let parent = Some(interp.ctx);
    match build_context(interp, parent, block) {
        Ok((id, value)) => {
            interp.context_mut(id)?.parent = None;
            Ok(value)
        }
        Err(err) => Ok(err),
    }
}

// context\pure { body } -> context
fn context_pure(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let block = block_arg("context\\pure", &args[0])?;
    let parent = Some(interp.pure_root);
    Ok(build_context(interp, parent, block).map_or_else(|err| err, |(_, value)| value))
}

// private { body } -> value
// Evaluates in a throwaway child context and returns the block's value;
// the bindings made inside stay private to it.
fn private(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let block = block_arg("private", &args[0])?;
    let id = interp.contexts.alloc(Context::new(Some(interp.ctx)));
    let result = interp.do_block_in(id, block);
    interp.contexts.release(id);
    Ok(result)
}

// extends parent { body } -> context
fn extends(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let parent = context_arg("extends", &args[0])?;
    let block = block_arg("extends", &args[1])?;
    interp.context(parent)?;
    Ok(build_context(interp, Some(parent), block).map_or_else(|err| err, |(_, value)| value))
}

// current -> context
fn current(interp: &mut Interpreter, _: &[Value]) -> Result<Value, RuntimeError> {
    let ctx = interp.ctx;
    Ok(interp.context_value(ctx))
}

fn parent_of_id(interp: &mut Interpreter, id: CtxId) -> Result<Value, RuntimeError> {
    match interp.context(id)?.parent {
        Some(parent) => Ok(interp.context_value(parent)),
        None => Ok(Value::Void),
    }
}

// parent? -> context or void
fn parent(interp: &mut Interpreter, _: &[Value]) -> Result<Value, RuntimeError> {
    let ctx = interp.ctx;
    parent_of_id(interp, ctx)
}

// parent\of context -> context or void
fn parent_of(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let id = context_arg("parent\\of", &args[0])?;
    parent_of_id(interp, id)
}

// The context holding the nearest binding of `word`, or the current one
// when nothing binds it.
fn owner_of(interp: &Interpreter, word: Word) -> CtxId {
    interp.lookup(word).map_or(interp.ctx, |(_, owner)| owner)
}

// Where an assignment to a word lands. A ref bound to the word is written
// through, so every holder of the ref sees the change; anything else must
// be a var and goes through Interpreter::modify_in.
enum Target {
    Cell(Rc<RefCell<Value>>),
    Binding(CtxId, Word),
}

// RUST CONCEPT: Validate, then mutate
// Resolving never writes, so a block of assignments can be checked in full
// before the first one is applied.
fn resolve_target(interp: &Interpreter, builtin: &str, target: &Value) -> Result<Target, RuntimeError> {
    let word = word_arg(builtin, target)?;
    match interp.lookup(word) {
        Some((Value::Ref(cell), _)) => Ok(Target::Cell(cell)),
        Some((_, owner)) if interp.context(owner)?.is_var(word) => Ok(Target::Binding(owner, word)),
        Some(_) => Err(RuntimeError::Modify {
            word: interp.words.name_rc(word),
        }),
        None => Err(RuntimeError::WordNotFound {
            word: interp.words.name_rc(word),
        }),
    }
}

fn assign(interp: &mut Interpreter, target: Target, value: Value) -> Result<bool, RuntimeError> {
    match target {
        Target::Cell(cell) => {
            let changed = *cell.borrow() != value;
            cell.replace(value);
            Ok(changed)
        }
        Target::Binding(owner, word) => interp.modify_in(owner, word, value),
    }
}

// set! value 'word -> value   set! { values } { words } -> { values }
// Either every word in the block is assigned or none is.
fn set(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    match &args[1] {
        Value::Block(words) => {
            let Value::Block(values) = &args[0] else {
                return Err(RuntimeError::builtin("set!", "setting a block of words needs a block of values"));
            };
            if words.len() != values.len() {
                return Err(RuntimeError::builtin(
                    "set!",
                    format!("{} words but {} values", words.len(), values.len()),
                ));
            }
            let targets = words
                .items
                .iter()
                .map(|target| resolve_target(interp, "set!", target))
                .collect::<Result<Vec<_>, _>>()?;
            for (target, value) in targets.into_iter().zip(values.items.iter()) {
                assign(interp, target, value.clone())?;
            }
        }
        target => {
            let target = resolve_target(interp, "set!", target)?;
            assign(interp, target, args[0].clone())?;
        }
    }
    Ok(args[0].clone())
}

// change! value 'word -> changed?
fn change(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let target = resolve_target(interp, "change!", &args[1])?;
    let changed = assign(interp, target, args[0].clone())?;
    Ok(Value::Boolean(changed))
}

// unset! 'word -> old value
fn unset(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let word = word_arg("unset!", &args[0])?;
    let ctx = interp.ctx;
    Ok(interp.context_mut(ctx)?.unset(word).unwrap_or(Value::Void))
}

// is-var? 'word -> boolean
fn is_var(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let word = word_arg("is-var?", &args[0])?;
    let owner = owner_of(interp, word);
    Ok(Value::Boolean(interp.context(owner)?.is_var(word)))
}

// words? context -> { words }
fn words(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    let id = context_arg("words?", &args[0])?;
    let words = interp.context(id)?.words();
    Ok(Value::block(words.into_iter().map(Value::Word).collect()))
}

// doc\of? ?word -> string or void
fn doc_of(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    match &args[0] {
        Value::Builtin(bi) => Ok(Value::string(bi.def.doc)),
        Value::Context(id) => Ok(match &interp.context(*id)?.doc {
            Some(doc) => Value::String(doc.clone()),
            None => Value::Void,
        }),
        Value::Function(func) => {
            // the first string in a spec is its doc
            let doc = func.spec.items.iter().find(|item| matches!(item, Value::String(_)));
            Ok(doc.cloned().unwrap_or(Value::Void))
        }
        _ => Ok(Value::Void),
    }
}

// kind? value -> word
fn kind(interp: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Word(interp.kind_of(&args[0])))
}

// ref value -> ref
fn ref_(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    Ok(Value::Ref(Rc::new(RefCell::new(args[0].clone()))))
}

// deref ref -> value
fn deref(_: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    match &args[0] {
        Value::Ref(cell) => Ok(cell.borrow().clone()),
        other => Ok(other.clone()),
    }
}

pub const BUILTINS: &[BuiltinDef] = &[
    BuiltinDef::new("context", 1, "Evaluates a block in a new child context and returns the context.", context)
        .with_args(&[BLOCK]),
    BuiltinDef::new("raw-context", 1, "Like context, without a parent.", raw_context)
        .with_args(&[BLOCK]),
    BuiltinDef::new("isolate", 1, "Like context, detached from its parent once built.", isolate)
        .with_args(&[BLOCK]),
    BuiltinDef::new("context\\pure", 1, "Like context, seeing only pure builtins.", context_pure)
        .with_args(&[BLOCK]),
    BuiltinDef::new("private", 1, "Evaluates a block in a throwaway context and returns its value.", private)
        .with_args(&[BLOCK]),
    BuiltinDef::new("extends", 2, "Creates a child of the given context from a block.", extends)
        .with_args(&[CONTEXT, BLOCK]),
    BuiltinDef::new("current", 0, "The current context.", current),
    BuiltinDef::new("parent?", 0, "The parent of the current context.", parent),
    BuiltinDef::new("parent\\of", 1, "The parent of a context.", parent_of).with_args(&[CONTEXT]),
    BuiltinDef::new("set!", 2, "Changes a variable or a ref, or each word in a block to the matching value.", set)
        .with_args(&[ANY, WORD_OR_BLOCK]),
    BuiltinDef::new("change!", 2, "Changes a variable or a ref and returns whether its value changed.", change)
        .with_args(&[ANY, WORDLIKE]),
    BuiltinDef::new("unset!", 1, "Removes a binding from the current context.", unset)
        .with_args(&[WORDLIKE]),
    BuiltinDef::new("is-var?", 1, "True when the nearest binding of a word is a variable.", is_var)
        .with_args(&[WORDLIKE]),
    BuiltinDef::new("words?", 1, "The words bound in a context.", words).with_args(&[CONTEXT]),
    BuiltinDef::new("doc\\of?", 1, "The doc string of a builtin, function or context.", doc_of),
    BuiltinDef::new("kind?", 1, "The dispatch kind of a value.", kind).mark_pure(),
    BuiltinDef::new("ref", 1, "Wraps a value in a shared mutable reference.", ref_),
    BuiltinDef::new("deref", 1, "The value inside a reference.", deref).with_args(&[REF]),
];

#[cfg(test)]
mod tests {
    use crate::primitives::test_support::capturing;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_context_path_access() {
        let (mut interp, _) = capturing();
        assert_eq!(
            interp.eval_str("c: context { a: 1 b: a + 1 } c/b"),
            Ok(Value::Integer(2))
        );
    }

    #[test]
    fn test_nearest_binding_wins() {
        let (mut interp, _) = capturing();
        assert_eq!(
            interp.eval_str("x: 1 c: context { x: 2 y: x } c/y"),
            Ok(Value::Integer(2))
        );
        assert_eq!(interp.eval_str("x"), Ok(Value::Integer(1)));
    }

    #[test]
    fn test_set_and_change_respect_var() {
        let (mut interp, _) = capturing();
        interp.eval_str("k: 1 var 'v 1").unwrap();
        assert!(interp.eval_str("set! 2 'k").is_err());
        assert_eq!(interp.eval_str("k"), Ok(Value::Integer(1)));
        assert_eq!(interp.eval_str("change! 1 'v"), Ok(Value::Boolean(false)));
        assert_eq!(interp.eval_str("change! 5 'v"), Ok(Value::Boolean(true)));
        assert_eq!(interp.eval_str("set! { 7 } { v } v"), Ok(Value::Integer(7)));
    }

    #[test]
    fn test_raw_context_has_no_builtins() {
        let (mut interp, _) = capturing();
        assert_eq!(interp.eval_str("r: raw-context { a: 1 } r/a"), Ok(Value::Integer(1)));
        assert!(interp.eval_str("raw-context { a: inc 1 }").is_err());
    }

    #[test]
    fn test_extends_and_parent() {
        let (mut interp, _) = capturing();
        interp.eval_str("base: context { a: 10 } child: extends base { b: a + 1 }").unwrap();
        assert_eq!(interp.eval_str("child/b"), Ok(Value::Integer(11)));
        assert_eq!(interp.eval_str("parent\\of child |= base"), Ok(Value::Boolean(true)));
        assert_eq!(interp.eval_str("isolate { a: 1 } |parent\\of"), Ok(Value::Void));
    }

    #[test]
    fn test_private_returns_value_and_hides_bindings() {
        let (mut interp, _) = capturing();
        assert_eq!(interp.eval_str("private { t: 3 t * 2 }"), Ok(Value::Integer(6)));
        assert!(interp.eval_str("t").is_err());
    }

    #[test]
    fn test_is_var_and_unset() {
        let (mut interp, _) = capturing();
        interp.eval_str("a: 1 var 'b 2").unwrap();
        assert_eq!(interp.eval_str("is-var? 'a"), Ok(Value::Boolean(false)));
        assert_eq!(interp.eval_str("is-var? 'b"), Ok(Value::Boolean(true)));
        interp.eval_str("unset! 'a").unwrap();
        assert!(interp.eval_str("a").is_err());
    }

    #[test]
    fn test_words_and_kind() {
        let (mut interp, _) = capturing();
        interp.eval_str("c: context { p: 1 q: 2 }").unwrap();
        assert_eq!(interp.eval_str("words? c |length?"), Ok(Value::Integer(2)));
        let kind = interp.eval_str("kind? 1").unwrap();
        assert_eq!(kind.inspect(&interp.words), "integer");
    }

    #[test]
    fn test_set_block_is_all_or_nothing() {
        let (mut interp, _) = capturing();
        interp.eval_str("var 'a 1 var 'b 2 k: 3").unwrap();
        assert!(interp.eval_str("set! { 10 20 } { a k }").is_err());
        assert!(interp.eval_str("set! { 10 20 } { a missing }").is_err());
        assert_eq!(interp.eval_str("a"), Ok(Value::Integer(1)));

        let err = interp.eval_str("set! { 10 20 30 } { a b }").unwrap_err();
        assert!(err.to_string().contains("2 words but 3 values"), "{err}");
        assert_eq!(interp.eval_str("set! { 10 20 } { a b } [ a b ]"), Ok(Value::block(vec![
            Value::Integer(10),
            Value::Integer(20),
        ])));
    }

    #[test]
    fn test_ref_shares_mutation_point() {
        let (mut interp, _) = capturing();
        assert_eq!(interp.eval_str("r: ref 5 deref r"), Ok(Value::Integer(5)));
        interp.eval_str("s: r").unwrap();
        assert_eq!(interp.eval_str("change! 2 'r"), Ok(Value::Boolean(true)));
        assert_eq!(interp.eval_str("deref s"), Ok(Value::Integer(2)));
        assert_eq!(interp.eval_str("change! 2 's"), Ok(Value::Boolean(false)));
        interp.eval_str("set! 9 's").unwrap();
        assert_eq!(interp.eval_str("deref r"), Ok(Value::Integer(9)));
        // the binding itself is still a constant
        assert_eq!(interp.eval_str("is-var? 'r"), Ok(Value::Boolean(false)));
    }

    #[test]
    fn test_doc_of_builtin() {
        let (mut interp, _) = capturing();
        assert_eq!(
            interp.eval_str("doc\\of? ?current"),
            Ok(Value::string("The current context."))
        );
    }
}

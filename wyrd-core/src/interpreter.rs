// The interpreter: process-wide tables plus the registers of the running frame
//
// RUST CONCEPT: One owned runtime object
// The word table, context arena, generic dispatch table and output sink all
// live here and are reached through `&mut Interpreter`; nothing is global.
//
// The per-frame registers (series, ctx, res, flags, forced result, defer
// list) are plain fields. Nested evaluation swaps them out and puts them back
// through the closure-based helpers below, so every exit path restores them.

use crate::builtins::{BuiltinDef, register_builtins};
use crate::context::{BindError, Context, ContextArena, CtxId};
use crate::error::RuntimeError;
use crate::output::{BufferOutput, Output};
use crate::parser::load_source;
use crate::series::Series;
use crate::value::{Block, Builtin, Value};
use crate::words::{Word, WordTable};
use rustc_hash::FxHashMap;
use std::path::PathBuf;
use std::rc::Rc;
use tracing::{debug, trace, warn};

#[derive(Debug, Clone)]
pub struct InterpreterConfig {
    /// Evaluate the prelude into the root context at construction.
    pub load_prelude: bool,
    /// Write unhandled failures to the output in addition to returning them.
    pub echo_failures: bool,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            load_prelude: true,
            echo_failures: false,
        }
    }
}

// Registers saved by a function call and put back when it returns
pub(crate) struct Frame {
    series: Series,
    ctx: CtxId,
    forced_result: Option<Value>,
    defer_blocks: Vec<Block>,
}

pub struct Interpreter {
    pub words: WordTable,
    pub contexts: ContextArena,
    /// Holds every builtin and the prelude.
    pub root: CtxId,
    /// Holds only pure builtins; parent of every `pfn` call.
    pub pure_root: CtxId,
    /// Where user code runs by default; a child of root.
    pub top: CtxId,
    pub(crate) generics: FxHashMap<(Word, Word), Value>,
    pub script_path: Option<PathBuf>,

    pub(crate) series: Series,
    pub ctx: CtxId,
    pub res: Value,
    pub failure_flag: bool,
    pub error_flag: bool,
    pub return_flag: bool,
    pub skip_flag: bool,
    pub forced_result: Option<Value>,
    pub(crate) defer_blocks: Vec<Block>,
    pub(crate) in_error_handler: bool,
    // nesting of eval_top; contexts are collected when the outermost returns
    eval_depth: usize,

    output: Box<dyn Output>,
    config: InterpreterConfig,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_config(InterpreterConfig::default())
    }

    pub fn with_config(config: InterpreterConfig) -> Self {
        let mut contexts = ContextArena::new();
        let root = contexts.alloc(Context::new(None));
        let pure_root = contexts.alloc(Context::new(None));
        let top = contexts.alloc(Context::new(Some(root)));
        // root-level contexts are never released
        contexts.capture(top);
        contexts.capture(pure_root);

        let mut interp = Self {
            words: WordTable::new(),
            contexts,
            root,
            pure_root,
            top,
            generics: FxHashMap::default(),
            script_path: None,
            series: Series::empty(),
            ctx: top,
            res: Value::Void,
            failure_flag: false,
            error_flag: false,
            return_flag: false,
            skip_flag: false,
            forced_result: None,
            defer_blocks: Vec::new(),
            in_error_handler: false,
            eval_depth: 0,
            output: Box::new(BufferOutput::new()),
            config,
        };

        register_builtins(&mut interp);

        if interp.config.load_prelude
            && let Err(e) = crate::prelude::load_prelude(&mut interp)
        {
            warn!(error = %e, "prelude failed to load");
        }

        interp
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    pub fn set_output(&mut self, output: Box<dyn Output>) {
        self.output = output;
    }

    pub fn set_script_path(&mut self, path: impl Into<PathBuf>) {
        self.script_path = Some(path.into());
    }

    /// Write text to the output, ignoring sink errors the way a terminal would.
    pub fn write_str(&mut self, text: &str) {
        if self.output.write(text.as_bytes()).is_err() {
            warn!("output write failed");
        }
        let _ = self.output.flush();
    }

    pub fn writeln(&mut self, text: &str) {
        self.write_str(text);
        self.write_str("\n");
    }

    pub fn word(&mut self, name: &str) -> Word {
        self.words.intern(name)
    }

    pub fn word_name(&self, word: Word) -> &str {
        self.words.name(word)
    }

    // RUST CONCEPT: Registration builds values once
    // Kind-qualified builtins are keyed by an explicit (kind, name) word pair
    // so dispatch never splits strings.
    pub fn register_builtin(&mut self, def: BuiltinDef) {
        let target = self.root;
        self.register_into(target, def);
    }

    fn register_into(&mut self, target: CtxId, def: BuiltinDef) {
        let full_name = match def.kind {
            Some(kind) => format!("{kind}//{}", def.name),
            None => def.name.to_string(),
        };
        let value = Value::Builtin(Rc::new(Builtin {
            name: full_name.as_str().into(),
            def,
        }));

        let word = self.words.intern(&full_name);
        if let Some(kind) = def.kind {
            let kind = self.words.intern(kind);
            let member = self.words.intern(def.name);
            self.generics.insert((kind, member), value.clone());
        }
        if def.pure
            && let Some(pure) = self.contexts.get_mut(self.pure_root)
        {
            pure.set(word, value.clone());
        }
        if let Some(ctx) = self.contexts.get_mut(target) {
            ctx.set(word, value);
        }
    }

    /// Registers `defs` into a fresh child context of root and binds that
    /// context under `name`, so members are reached as `name/member`.
    pub fn register_module(&mut self, name: &str, defs: &[BuiltinDef]) -> CtxId {
        let module = self.contexts.alloc(Context::new(Some(self.root)));
        self.contexts.capture(module);
        let name_word = self.words.intern(name);
        if let Some(ctx) = self.contexts.get_mut(module) {
            ctx.kind = Some(name_word);
        }
        for def in defs {
            self.register_into(module, *def);
        }
        if let Some(root) = self.contexts.get_mut(self.root) {
            root.set(name_word, Value::Context(module));
        }
        debug!(module = name, count = defs.len(), "registered module");
        module
    }

    pub fn generic(&self, kind: Word, name: Word) -> Option<Value> {
        self.generics.get(&(kind, name)).cloned()
    }

    /// Kind used for generic dispatch: a context's own kind word when it has
    /// one, the value's kind otherwise.
    pub fn kind_of(&self, value: &Value) -> Word {
        if let Value::Context(id) = value
            && let Some(kind) = self.contexts.get(*id).and_then(|c| c.kind)
        {
            return kind;
        }
        value.kind()
    }

    /// Looks a word up from the current context outward.
    pub fn lookup(&self, word: Word) -> Option<(Value, CtxId)> {
        self.contexts.lookup(self.ctx, word)
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        let word = self.words.lookup(name)?;
        self.lookup(word).map(|(value, _)| value)
    }

    pub fn context(&self, id: CtxId) -> Result<&Context, RuntimeError> {
        self.contexts.get(id).ok_or(RuntimeError::StaleContext)
    }

    pub fn context_mut(&mut self, id: CtxId) -> Result<&mut Context, RuntimeError> {
        self.contexts.get_mut(id).ok_or(RuntimeError::StaleContext)
    }

    /// Allocates a context and returns it as a value. The context lives as
    /// long as some binding, closure or collection can still reach it.
    pub fn new_context_value(&mut self, parent: Option<CtxId>) -> (CtxId, Value) {
        let id = self.contexts.alloc(Context::new(parent));
        self.contexts.capture(id);
        debug!(?id, ?parent, "context created");
        (id, Value::Context(id))
    }

    pub fn context_value(&mut self, id: CtxId) -> Value {
        self.contexts.capture(id);
        Value::Context(id)
    }

    /// Frees every context that no root, binding or `held` value can reach.
    /// Only safe when no frame keeps a context solely on the Rust stack,
    /// which is why `eval_top` calls it once the outermost block is done.
    pub fn collect_contexts(&mut self, held: &Value) -> usize {
        let roots = [self.root, self.pure_root, self.top, self.ctx];
        let freed = self.contexts.collect(&roots, &[held]);
        if freed > 0 {
            debug!(freed, live = self.contexts.live_count(), "contexts collected");
        }
        freed
    }

    /// The single mutation entry point for existing bindings.
    pub fn modify_in(&mut self, ctx: CtxId, word: Word, value: Value) -> Result<bool, RuntimeError> {
        let result = self.context_mut(ctx)?.modify(word, value);
        result.map_err(|e| self.bind_error(e))
    }

    pub(crate) fn bind_error(&self, err: BindError) -> RuntimeError {
        match err {
            BindError::NotVariable(word) => RuntimeError::Modify {
                word: self.words.name_rc(word),
            },
            BindError::Unbound(word) => RuntimeError::WordNotFound {
                word: self.words.name_rc(word),
            },
            BindError::Stale => RuntimeError::StaleContext,
        }
    }

    /// Raises a failure carrying `err` in the result register.
    pub fn set_failure(&mut self, err: RuntimeError) {
        self.res = Value::Error(err.to_error_value());
        self.failure_flag = true;
    }

    /// Raises an unrecoverable error for the current block.
    pub fn set_error(&mut self, err: RuntimeError) {
        self.set_failure(err);
        self.error_flag = true;
    }

    pub fn reset_flags(&mut self) {
        self.failure_flag = false;
        self.error_flag = false;
        self.return_flag = false;
        self.skip_flag = false;
    }

    // RUST CONCEPT: Scoped register swap
    // The closure runs with a different series; the old one is put back no
    // matter how the closure finishes.
    pub(crate) fn with_series<R>(&mut self, series: Series, f: impl FnOnce(&mut Self) -> R) -> R {
        let saved = std::mem::replace(&mut self.series, series);
        let result = crate::stack::ensure_sufficient_stack(|| f(self));
        self.series = saved;
        result
    }

    pub(crate) fn with_context<R>(&mut self, ctx: CtxId, f: impl FnOnce(&mut Self) -> R) -> R {
        let saved = std::mem::replace(&mut self.ctx, ctx);
        let result = f(self);
        self.ctx = saved;
        result
    }

    /// Evaluates a block in the current context and returns the result
    /// register. Flags are left for the caller to inspect.
    pub fn do_block(&mut self, block: &Block) -> Value {
        self.with_series(block.series(), |interp| {
            interp.eval_block();
        });
        self.res.clone()
    }

    /// Evaluates a block with `inj` as the initial result value.
    pub fn do_block_inj(&mut self, block: &Block, inj: Value) -> Value {
        self.with_series(block.series(), |interp| {
            interp.eval_block_inj(inj);
        });
        self.res.clone()
    }

    pub fn do_block_in(&mut self, ctx: CtxId, block: &Block) -> Value {
        self.with_context(ctx, |interp| interp.do_block(block))
    }

    pub(crate) fn push_frame(&mut self, series: Series, ctx: CtxId) -> Frame {
        Frame {
            series: std::mem::replace(&mut self.series, series),
            ctx: std::mem::replace(&mut self.ctx, ctx),
            forced_result: self.forced_result.take(),
            defer_blocks: std::mem::take(&mut self.defer_blocks),
        }
    }

    pub(crate) fn pop_frame(&mut self, frame: Frame) {
        self.series = frame.series;
        self.ctx = frame.ctx;
        self.forced_result = frame.forced_result;
        self.defer_blocks = frame.defer_blocks;
    }

    /// Runs the current frame's deferred blocks in registration order
    /// against the live context and result register.
    pub(crate) fn run_defers(&mut self) {
        if self.defer_blocks.is_empty() {
            return;
        }
        let blocks = std::mem::take(&mut self.defer_blocks);
        debug!(count = blocks.len(), "running deferred blocks");

        let res = self.res.clone();
        let flags = (self.failure_flag, self.error_flag, self.return_flag, self.skip_flag);
        self.reset_flags();
        let mut deferred_error = None;
        for block in &blocks {
            self.do_block_inj(block, res.clone());
            if self.error_flag && deferred_error.is_none() {
                deferred_error = Some(self.res.clone());
            }
            self.reset_flags();
        }

        (self.failure_flag, self.error_flag, self.return_flag, self.skip_flag) = flags;
        self.res = res;
        // a deferred block that errs surfaces only when the frame itself did not
        if let Some(err) = deferred_error
            && !self.error_flag
        {
            self.res = err;
            self.failure_flag = true;
            self.error_flag = true;
        }
    }

    /// Loads and evaluates source text in the current context.
    pub fn eval_str(&mut self, source: &str) -> Result<Value, RuntimeError> {
        let block = load_source(source, &mut self.words)?;
        self.eval_top(&block)
    }

    /// Evaluates a top-level block: unhandled errors come back as `Err` and
    /// the flags are cleared so the interpreter can keep going.
    pub fn eval_top(&mut self, block: &Block) -> Result<Value, RuntimeError> {
        trace!(len = block.len(), "evaluating top-level block");
        self.reset_flags();
        self.res = Value::Void;
        self.eval_depth += 1;
        self.do_block(block);
        self.run_defers();
        self.eval_depth -= 1;

        let failed = self.error_flag || self.failure_flag;
        let result = std::mem::replace(&mut self.res, Value::Void);
        self.reset_flags();
        self.forced_result = None;
        if self.eval_depth == 0 {
            self.collect_contexts(&result);
        }

        if !failed {
            return Ok(result);
        }
        let err = match result {
            Value::Error(err) => err,
            other => RuntimeError::builtin("eval", format!("evaluation failed with {}", other.inspect(&self.words)))
                .to_error_value(),
        };
        if self.config.echo_failures {
            let text = err.to_string();
            self.writeln(&text);
        }
        Err(RuntimeError::Failure(err))
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueType;

    fn bare() -> Interpreter {
        Interpreter::with_config(InterpreterConfig {
            load_prelude: false,
            ..InterpreterConfig::default()
        })
    }

    #[test]
    fn test_root_contexts_are_distinct() {
        let interp = bare();
        assert_ne!(interp.root, interp.top);
        assert_ne!(interp.root, interp.pure_root);
        assert_eq!(interp.ctx, interp.top);
        assert_eq!(interp.context(interp.top).unwrap().parent, Some(interp.root));
    }

    #[test]
    fn test_pure_builtins_are_in_pure_root() {
        let mut interp = bare();
        let plus = interp.word("_+");
        let print = interp.word("print");
        let pure = interp.context(interp.pure_root).unwrap();
        assert!(pure.contains(plus));
        assert!(!pure.contains(print));
    }

    #[test]
    fn test_kind_qualified_builtins_go_to_generics() {
        let mut interp = bare();
        let integer = ValueType::Integer.word();
        let double = interp.word("double");
        assert!(matches!(interp.generic(integer, double), Some(Value::Builtin(_))));
        assert!(interp.get("integer//double").is_some());
    }

    #[test]
    fn test_modules_bind_a_context() {
        let interp = bare();
        match interp.get("math") {
            Some(Value::Context(id)) => {
                assert!(interp.contexts.is_live(id));
            }
            other => panic!("expected module context, got {other:?}"),
        }
    }

    #[test]
    fn test_modify_in_maps_bind_errors() {
        let mut interp = bare();
        let w = interp.word("fixed");
        let top = interp.top;
        interp.context_mut(top).unwrap().set(w, Value::Integer(1));
        assert_eq!(
            interp.modify_in(top, w, Value::Integer(2)),
            Err(RuntimeError::Modify { word: "fixed".into() })
        );
    }

    #[test]
    fn test_dropped_contexts_are_collected() {
        let mut interp = bare();
        interp.eval_str("f: fn { n } { c: current n }").unwrap();
        let baseline = interp.contexts.live_count();
        assert_eq!(interp.eval_str("loop 1000 { f 1 } 7"), Ok(Value::Integer(7)));
        assert_eq!(interp.contexts.live_count(), baseline);
    }

    #[test]
    fn test_reachable_contexts_survive_collection() {
        let mut interp = bare();
        interp
            .eval_str(
                r#"
                var 'kept 0
                keep: fn { x } { kept:: list { current } x }
                counter: does { state: context { var 'n 0 } closure { } { do\in state { n:: n + 1 } } }
                tick: counter
                keep 3
                "#,
            )
            .unwrap();
        assert_eq!(interp.eval_str("tick tick"), Ok(Value::Integer(2)));
        assert_eq!(interp.eval_str("tick"), Ok(Value::Integer(3)));
        assert!(matches!(interp.eval_str("kept |first"), Ok(Value::Context(_))));
    }

    #[test]
    fn test_eval_top_clears_flags_after_error() {
        let mut interp = bare();
        assert!(interp.eval_str("fail \"boom\"").is_err());
        assert!(!interp.error_flag);
        assert!(!interp.failure_flag);
        assert_eq!(interp.eval_str("1 + 1").unwrap(), Value::Integer(2));
    }
}

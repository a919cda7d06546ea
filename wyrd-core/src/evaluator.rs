// This module implements the series-walking evaluator for Wyrd
//
// WYRD EXECUTION MODEL:
// 1. Literals become the result value
// 2. Words are looked up through the context chain; builtins and functions
//    are called and gather their arguments from the following tokens
// 3. Opwords and pipewords call with the current result as first argument
// 4. Setwords evaluate the next expression and bind it
// 5. Blocks in { } are data; ( ) evaluate in place; [ ] evaluate each item
//
// RUST CONCEPT: Flags instead of unwinding
// Nothing in here returns an error. A failing step stores an Error value in
// `res` and raises a flag; every loop checks the flags after each step and
// stops when one of them asks for it. Recursion depth follows source nesting,
// and each recursive entry goes through `ensure_sufficient_stack`.

use crate::context::{Context, CtxId};
use crate::error::RuntimeError;
use crate::interpreter::Interpreter;
use crate::stack::ensure_sufficient_stack;
use crate::value::{Block, BlockMode, Builtin, Function, Value};
use crate::words::Word;
use std::rc::Rc;
use tracing::trace;

/// How a callable was reached, which decides how its arguments are gathered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CallMode {
    /// `name a b`
    Prefix,
    /// `a .name b` or `a + b`: remaining arguments are single concrete values
    Op,
    /// `a |name b`: remaining arguments are full limited expressions
    Pipe,
}

impl Interpreter {
    /// Evaluates the current series to its end or until a flag stops it.
    pub(crate) fn eval_block(&mut self) {
        self.eval_block_from(None);
    }

    /// Like `eval_block`, with `inj` as the result value the first
    /// expression starts from, so a leading opword applies to it.
    pub(crate) fn eval_block_inj(&mut self, inj: Value) {
        self.eval_block_from(Some(inj));
    }

    fn eval_block_from(&mut self, mut inj: Option<Value>) {
        ensure_sufficient_stack(|| {
            self.res = inj.clone().unwrap_or(Value::Void);
            while !self.series.at_end() {
                match inj.take() {
                    Some(value) => {
                        self.res = value;
                        self.maybe_eval_opword_on_right(false);
                    }
                    None => self.eval_expression(false),
                }
                if self.check_flags_after_expression() {
                    break;
                }
                self.maybe_accept_comma();
            }
        });
    }

    // Returns true when the block should stop. A failure nobody handled by
    // the end of its expression becomes an error, unless the context chain
    // defines an `error-handler` block to take it.
    fn check_flags_after_expression(&mut self) -> bool {
        if self.failure_flag && !self.return_flag && !self.error_flag {
            if !self.in_error_handler && self.run_error_handler() {
                return self.error_flag || self.return_flag;
            }
            self.error_flag = true;
            return true;
        }
        self.error_flag || self.return_flag || self.skip_flag
    }

    fn run_error_handler(&mut self) -> bool {
        let Some(word) = self.words.lookup("error-handler") else {
            return false;
        };
        let Some((Value::Block(handler), _)) = self.lookup(word) else {
            return false;
        };
        let failure = self.res.clone();
        self.failure_flag = false;
        self.in_error_handler = true;
        self.do_block_inj(&handler, failure);
        self.in_error_handler = false;
        if self.failure_flag && !self.return_flag {
            self.error_flag = true;
        }
        true
    }

    fn maybe_accept_comma(&mut self) {
        if matches!(self.series.peek(), Some(Value::Comma)) {
            self.series.next();
        }
    }

    /// One full expression: a concrete value plus any trailing opwords, and
    /// pipewords and left-setwords unless `limited`.
    pub(crate) fn eval_expression(&mut self, limited: bool) {
        self.eval_expression_concrete();
        self.maybe_eval_opword_on_right(limited);
    }

    fn maybe_eval_opword_on_right(&mut self, limited: bool) {
        loop {
            if self.error_flag || self.return_flag {
                return;
            }
            match self.series.peek() {
                Some(Value::Opword(word)) => {
                    let word = *word;
                    self.series.next();
                    let left = self.res.clone();
                    self.eval_word(word, Some(left), CallMode::Op);
                }
                Some(Value::Pipeword(word)) if !limited => {
                    let word = *word;
                    self.series.next();
                    let left = self.res.clone();
                    self.eval_word(word, Some(left), CallMode::Pipe);
                }
                Some(Value::LSetword(word)) if !limited => {
                    let word = *word;
                    self.series.next();
                    self.bind_result(word);
                }
                Some(Value::LModword(word)) if !limited => {
                    let word = *word;
                    self.series.next();
                    let value = self.res.clone();
                    self.modify_nearest(word, value);
                }
                _ => return,
            }
        }
    }

    /// One value with no trailing operators.
    pub(crate) fn eval_expression_concrete(&mut self) {
        let Some(token) = self.series.pop() else {
            self.set_error(RuntimeError::builtin(
                "eval",
                "expected a value but the block ended",
            ));
            return;
        };

        match token {
            Value::Block(block) => self.eval_block_literal(block),
            Value::Word(word) => self.eval_word(word, None, CallMode::Prefix),
            Value::CPath(path) => self.eval_cpath(&path),
            Value::Setword(word) => {
                self.eval_expression(false);
                if self.error_flag || self.return_flag || self.failure_flag {
                    return;
                }
                self.bind_result(word);
            }
            Value::Modword(word) => {
                self.eval_expression(false);
                if self.error_flag || self.return_flag || self.failure_flag {
                    return;
                }
                let value = self.res.clone();
                self.modify_nearest(word, value);
            }
            Value::LSetword(word) => self.bind_result(word),
            Value::LModword(word) => {
                let value = self.res.clone();
                self.modify_nearest(word, value);
            }
            Value::Getword(word) => match self.lookup(word) {
                Some((value, _)) => self.res = value,
                None => self.set_error(RuntimeError::WordNotFound {
                    word: self.words.name_rc(word),
                }),
            },
            // an operator at the start of an expression is called as prefix
            Value::Opword(word) | Value::Pipeword(word) => {
                self.eval_word(word, None, CallMode::Prefix);
            }
            Value::Tagword(word) => self.res = Value::Word(word),
            Value::Comma => self.set_error(RuntimeError::builtin(
                "eval",
                "expression guard (comma) inside an expression",
            )),
            Value::Builtin(bi) => self.call_builtin(&bi, None, CallMode::Prefix),
            Value::Function(func) => self.call_function(&func, None, CallMode::Prefix, None),
            other => self.res = other,
        }
    }

    fn eval_block_literal(&mut self, block: Block) {
        match block.mode {
            BlockMode::Curly => self.res = Value::Block(block),
            BlockMode::Paren => {
                self.do_block(&block);
            }
            BlockMode::Square => {
                if let Some(items) = self.reduce_block(&block) {
                    self.res = Value::block(items);
                }
            }
        }
    }

    /// Evaluates every expression of a block and collects the results.
    /// Returns None when evaluation stopped on an error or a return.
    pub(crate) fn reduce_block(&mut self, block: &Block) -> Option<Vec<Value>> {
        let items = self.with_series(block.series(), |interp| {
            let mut items = Vec::new();
            while !interp.series.at_end() {
                interp.eval_expression(false);
                if interp.failure_flag && !interp.return_flag {
                    interp.error_flag = true;
                }
                if interp.error_flag || interp.return_flag {
                    break;
                }
                items.push(interp.res.clone());
                interp.maybe_accept_comma();
            }
            items
        });
        (!self.error_flag && !self.return_flag).then_some(items)
    }

    // Setword and left-setword binding in the current context. A word
    // already bound here goes through `modify`, so rebinding a constant is a
    // ModifyError; a word bound only further out is shadowed.
    fn bind_result(&mut self, word: Word) {
        let value = self.res.clone();
        let ctx = self.ctx;
        let bound_here = match self.context(ctx) {
            Ok(c) => c.contains(word),
            Err(e) => {
                self.set_error(e);
                return;
            }
        };
        if bound_here {
            if let Err(e) = self.modify_in(ctx, word, value) {
                self.set_error(e);
            }
        } else if let Ok(c) = self.context_mut(ctx) {
            c.set(word, value);
        }
    }

    // Modword binding: the nearest owner of the word is modified (it must be
    // a var); an unbound word becomes a new var in the current context.
    fn modify_nearest(&mut self, word: Word, value: Value) {
        match self.lookup(word) {
            Some((_, owner)) => {
                if let Err(e) = self.modify_in(owner, word, value) {
                    self.set_error(e);
                }
            }
            None => {
                let ctx = self.ctx;
                match self.context_mut(ctx) {
                    Ok(c) => c.declare_var(word, value),
                    Err(e) => self.set_error(e),
                }
            }
        }
    }

    pub(crate) fn eval_word(&mut self, word: Word, left: Option<Value>, mode: CallMode) {
        match self.lookup(word) {
            Some((value, _)) => self.eval_object(word, value, left, mode, None),
            None => self.eval_unbound_word(word, left, mode),
        }
    }

    fn eval_object(
        &mut self,
        word: Word,
        value: Value,
        left: Option<Value>,
        mode: CallMode,
        owner: Option<CtxId>,
    ) {
        match value {
            Value::Builtin(bi) => self.call_builtin(&bi, left, mode),
            Value::Function(func) => self.call_function(&func, left, mode, owner),
            other => match left {
                None => self.res = other,
                Some(_) => self.set_error(RuntimeError::builtin(
                    "eval",
                    format!("{} is not callable", self.words.name(word)),
                )),
            },
        }
    }

    // Generic dispatch: an unbound word is looked up by the kind of its
    // receiver, either the left value or the next concrete value.
    fn eval_unbound_word(&mut self, word: Word, left: Option<Value>, mode: CallMode) {
        let receiver = match left {
            Some(value) => Some(value),
            None if !self.series.at_end() => {
                self.eval_expression_concrete();
                if self.error_flag || self.return_flag {
                    return;
                }
                Some(self.res.clone())
            }
            None => None,
        };

        if let Some(receiver) = receiver {
            let kind = self.kind_of(&receiver);
            if let Some(callable) = self.generic(kind, word) {
                trace!(word = self.words.name(word), kind = self.words.name(kind), "generic dispatch");
                self.eval_object(word, callable, Some(receiver), mode, None);
                return;
            }
        }

        if self.failure_flag {
            self.error_flag = true;
        } else {
            self.set_error(RuntimeError::WordNotFound {
                word: self.words.name_rc(word),
            });
        }
    }

    // a/b/c: every segment but the last must name a context
    fn eval_cpath(&mut self, path: &Rc<[Word]>) {
        let mut current = self.ctx;
        let mut found = None;
        for (i, word) in path.iter().enumerate() {
            let Some((value, owner)) = self.contexts.lookup(current, *word) else {
                self.set_error(RuntimeError::WordNotFound {
                    word: self.path_text(path).into(),
                });
                return;
            };
            if i + 1 == path.len() {
                found = Some((*word, value, owner));
            } else if let Value::Context(next) = value {
                current = next;
            } else {
                self.set_error(RuntimeError::builtin(
                    "eval",
                    format!("{} is not a context", self.words.name(*word)),
                ));
                return;
            }
        }
        if let Some((word, value, _)) = found {
            self.eval_object(word, value, None, CallMode::Prefix, Some(current));
        }
    }

    fn path_text(&self, path: &[Word]) -> String {
        let names: Vec<&str> = path.iter().map(|w| self.words.name(*w)).collect();
        names.join("/")
    }

    // Gathers one argument; returns false when the caller must stop.
    fn gather_arg(&mut self, name: &str, position: usize, mode: CallMode, accepts_failure: bool) -> bool {
        if self.series.at_end() {
            self.set_error(RuntimeError::builtin(
                name,
                format!("missing argument {position}"),
            ));
            return false;
        }
        match mode {
            CallMode::Op => self.eval_expression_concrete(),
            CallMode::Prefix | CallMode::Pipe => self.eval_expression(true),
        }
        if self.error_flag || self.return_flag {
            return false;
        }
        if self.failure_flag && !accepts_failure {
            self.error_flag = true;
            return false;
        }
        true
    }

    pub(crate) fn call_builtin(&mut self, bi: &Rc<Builtin>, left: Option<Value>, mode: CallMode) {
        let def = bi.def;
        trace!(builtin = %bi.name, arity = def.arity, "call builtin");

        let mut args = Vec::with_capacity(def.arity);
        if let Some(left) = left {
            if def.arity == 0 {
                self.set_error(RuntimeError::builtin(&bi.name, "takes no arguments"));
                return;
            }
            if self.failure_flag && !def.accepts_failure {
                self.error_flag = true;
                return;
            }
            args.push(left);
        }
        while args.len() < def.arity {
            if !self.gather_arg(&bi.name, args.len() + 1, mode, def.accepts_failure) {
                return;
            }
            args.push(self.res.clone());
        }

        self.invoke_builtin(bi, &args);
    }

    // Type-checks gathered arguments and runs the callback. A mismatch is
    // an ArgError failure and the callback never runs.
    fn invoke_builtin(&mut self, bi: &Builtin, args: &[Value]) {
        let def = bi.def;
        for (i, arg) in args.iter().enumerate() {
            let accepted = def.accepted(i);
            let got = arg.value_type();
            if accepted.is_empty() || accepted.contains(&got) {
                continue;
            }
            // builtins that take failures get them in any position
            if def.accepts_failure && matches!(arg, Value::Error(_)) {
                continue;
            }
            self.set_failure(RuntimeError::Arg {
                builtin: bi.name.clone(),
                position: i + 1,
                accepted: accepted.to_vec(),
                got,
            });
            return;
        }

        if def.accepts_failure {
            self.failure_flag = false;
        }
        match (def.func)(self, args) {
            Ok(value) => self.res = value,
            Err(e) => self.set_failure(e),
        }
    }

    pub(crate) fn call_function(
        &mut self,
        func: &Rc<Function>,
        left: Option<Value>,
        mode: CallMode,
        owner: Option<CtxId>,
    ) {
        let arity = func.arity();
        trace!(arity, pure = func.pure, "call function");

        let mut args = Vec::with_capacity(arity);
        if let Some(left) = left {
            if arity == 0 {
                self.set_error(RuntimeError::builtin("fn", "function takes no arguments"));
                return;
            }
            if self.failure_flag {
                self.error_flag = true;
                return;
            }
            args.push(left);
        }
        while args.len() < arity {
            if !self.gather_arg("fn", args.len() + 1, mode, false) {
                return;
            }
            args.push(self.res.clone());
        }

        self.invoke_function(func, args, owner);
    }

    fn invoke_function(&mut self, func: &Function, args: Vec<Value>, owner: Option<CtxId>) {
        let parent = if func.pure {
            self.pure_root
        } else if let Some(closure) = func.closure {
            closure
        } else {
            owner.unwrap_or(self.ctx)
        };
        let mut context = Context::new(Some(parent));
        for (param, arg) in func.params.iter().zip(args.iter()) {
            context.set(*param, arg.clone());
        }
        let fn_ctx = self.contexts.alloc(context);

        let frame = self.push_frame(func.body.series(), fn_ctx);
        match args.into_iter().next() {
            Some(first) => self.eval_block_inj(first),
            None => self.eval_block(),
        }
        self.run_defers();
        if let Some(forced) = self.forced_result.take() {
            self.res = forced;
        }
        self.return_flag = false;
        self.skip_flag = false;
        self.pop_frame(frame);
        self.contexts.release(fn_ctx);
    }

    /// Calls a function or builtin value with arguments already in hand and
    /// returns the result register. Flags are left for the caller.
    pub fn call_with_args(&mut self, callable: &Value, args: &[Value]) -> Value {
        match callable {
            Value::Builtin(bi) if bi.arity() == args.len() => self.invoke_builtin(bi, args),
            Value::Function(func) if func.arity() == args.len() => {
                self.invoke_function(func, args.to_vec(), None);
            }
            Value::Builtin(_) | Value::Function(_) => self.set_failure(RuntimeError::builtin(
                "call",
                format!("expected {} arguments, got {}", callable_arity(callable), args.len()),
            )),
            other => self.res = other.clone(),
        }
        self.res.clone()
    }
}

fn callable_arity(callable: &Value) -> usize {
    match callable {
        Value::Builtin(bi) => bi.arity(),
        Value::Function(func) => func.arity(),
        _ => 0,
    }
}

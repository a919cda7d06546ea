//! Contexts and the arena that owns them.
//!
//! A context maps words to values and links to at most one parent. Parents
//! are `CtxId` handles into a [`ContextArena`], never owning pointers, so a
//! context stored as a value inside one of its own descendants is just a
//! number.
//!
//! Function frames nobody captured are released as soon as the call
//! returns. Everything else is reclaimed by [`ContextArena::collect`], which
//! marks what is reachable from the interpreter's roots through parent links
//! and context handles held in values, then frees the rest. Cycles between
//! contexts are reclaimed the same way.
//!
//! Handles are generational: releasing a slot bumps its generation, and a
//! handle minted before the release no longer resolves.

use crate::value::Value;
use crate::words::Word;
use rustc_hash::{FxHashMap, FxHashSet};
use std::rc::Rc;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CtxId {
    index: u32,
    generation: u32,
}

/// Why a binding could not be modified. Word names are resolved by the
/// interpreter when this becomes a `RuntimeError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("word is bound as a constant")]
    NotVariable(Word),
    #[error("word is not bound in this context")]
    Unbound(Word),
    #[error("context handle is no longer live")]
    Stale,
}

#[derive(Debug, Clone, Default)]
pub struct Context {
    bindings: FxHashMap<Word, Value>,
    vars: FxHashSet<Word>,
    pub parent: Option<CtxId>,
    pub kind: Option<Word>,
    pub doc: Option<Rc<str>>,
}

impl Context {
    pub fn new(parent: Option<CtxId>) -> Self {
        Self {
            parent,
            ..Self::default()
        }
    }

    pub fn get(&self, word: Word) -> Option<&Value> {
        self.bindings.get(&word)
    }

    pub fn contains(&self, word: Word) -> bool {
        self.bindings.contains_key(&word)
    }

    /// Creates or overwrites a binding without consulting mutability.
    /// Used for registration, parameter binding and state restore.
    pub fn set(&mut self, word: Word, value: Value) {
        self.bindings.insert(word, value);
    }

    pub fn declare_var(&mut self, word: Word, value: Value) {
        self.bindings.insert(word, value);
        self.vars.insert(word);
    }

    /// The one place an existing binding is changed. Only words declared
    /// through `var` may be modified; the result says whether the stored
    /// value actually changed.
    pub fn modify(&mut self, word: Word, value: Value) -> Result<bool, BindError> {
        if !self.vars.contains(&word) {
            return Err(if self.bindings.contains_key(&word) {
                BindError::NotVariable(word)
            } else {
                BindError::Unbound(word)
            });
        }
        let changed = self.bindings.get(&word) != Some(&value);
        self.bindings.insert(word, value);
        Ok(changed)
    }

    pub fn unset(&mut self, word: Word) -> Option<Value> {
        self.vars.remove(&word);
        self.bindings.remove(&word)
    }

    pub fn mark_var(&mut self, word: Word) {
        self.vars.insert(word);
    }

    pub fn is_var(&self, word: Word) -> bool {
        self.vars.contains(&word)
    }

    /// Bound words in word-index order, which is also interning order.
    pub fn words(&self) -> Vec<Word> {
        let mut words: Vec<Word> = self.bindings.keys().copied().collect();
        words.sort_unstable();
        words
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

struct Slot {
    generation: u32,
    captured: bool,
    context: Option<Context>,
}

#[derive(Default)]
pub struct ContextArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl ContextArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, context: Context) -> CtxId {
        if let Some(index) = self.free.pop()
            && let Some(slot) = self.slots.get_mut(index as usize)
        {
            slot.context = Some(context);
            slot.captured = false;
            return CtxId {
                index,
                generation: slot.generation,
            };
        }
        let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        self.slots.push(Slot {
            generation: 0,
            captured: false,
            context: Some(context),
        });
        CtxId {
            index,
            generation: 0,
        }
    }

    fn slot(&self, id: CtxId) -> Option<&Slot> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation && slot.context.is_some())
    }

    fn slot_mut(&mut self, id: CtxId) -> Option<&mut Slot> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation && slot.context.is_some())
    }

    pub fn get(&self, id: CtxId) -> Option<&Context> {
        self.slot(id).and_then(|slot| slot.context.as_ref())
    }

    pub fn get_mut(&mut self, id: CtxId) -> Option<&mut Context> {
        self.slot_mut(id).and_then(|slot| slot.context.as_mut())
    }

    pub fn is_live(&self, id: CtxId) -> bool {
        self.slot(id).is_some()
    }

    /// Marks a context and its whole parent chain as reachable from a value,
    /// so `release` keeps them alive.
    pub fn capture(&mut self, id: CtxId) {
        let mut current = Some(id);
        let mut hops = 0;
        while let Some(cid) = current {
            if hops > self.slots.len() {
                break;
            }
            hops += 1;
            let Some(slot) = self.slot_mut(cid) else {
                break;
            };
            if slot.captured {
                break;
            }
            slot.captured = true;
            current = slot.context.as_ref().and_then(|c| c.parent);
        }
    }

    pub fn is_captured(&self, id: CtxId) -> bool {
        self.slot(id).is_some_and(|slot| slot.captured)
    }

    /// Frees a context unless a value still refers to it. Returns whether the
    /// slot was freed.
    pub fn release(&mut self, id: CtxId) -> bool {
        if self.is_captured(id) {
            return false;
        }
        self.free_slot(id)
    }

    /// Frees a context regardless of capture.
    pub fn discard(&mut self, id: CtxId) -> bool {
        self.free_slot(id)
    }

    fn free_slot(&mut self, id: CtxId) -> bool {
        let Some(slot) = self.slot_mut(id) else {
            return false;
        };
        slot.context = None;
        slot.captured = false;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        true
    }

    /// Walks from `start` outward through parents and returns the nearest
    /// binding together with the context that holds it.
    pub fn lookup(&self, start: CtxId, word: Word) -> Option<(Value, CtxId)> {
        let mut current = Some(start);
        let mut hops = 0;
        while let Some(id) = current {
            // a parent chain rewired into a loop must still terminate
            if hops > self.slots.len() {
                return None;
            }
            hops += 1;
            let ctx = self.get(id)?;
            if let Some(value) = ctx.get(word) {
                return Some((value.clone(), id));
            }
            current = ctx.parent;
        }
        None
    }

    /// Frees every context that cannot be reached from `roots` or from a
    /// context handle inside `held`. Reachability follows parent links and
    /// every handle found in a bound value, including closures, refs and
    /// values nested in collections. Returns how many slots were freed.
    pub fn collect(&mut self, roots: &[CtxId], held: &[&Value]) -> usize {
        let mut marked = vec![false; self.slots.len()];
        let mut pending: Vec<CtxId> = roots.to_vec();
        let mut values: Vec<Value> = held.iter().map(|value| (*value).clone()).collect();
        let mut seen_refs = FxHashSet::default();

        loop {
            while let Some(value) = values.pop() {
                push_handles(&value, &mut pending, &mut values, &mut seen_refs);
            }
            let Some(id) = pending.pop() else {
                break;
            };
            let Some(ctx) = self.get(id) else {
                continue;
            };
            let index = id.index as usize;
            if marked[index] {
                continue;
            }
            marked[index] = true;
            pending.extend(ctx.parent);
            values.extend(ctx.bindings.values().cloned());
        }

        let dead: Vec<CtxId> = self
            .slots
            .iter()
            .zip(marked)
            .enumerate()
            .filter(|(_, (slot, marked))| slot.context.is_some() && !marked)
            .map(|(index, (slot, _))| CtxId {
                index: u32::try_from(index).unwrap_or(u32::MAX),
                generation: slot.generation,
            })
            .collect();
        for id in &dead {
            self.free_slot(*id);
        }
        dead.len()
    }

    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.context.is_some()).count()
    }
}

// Queues the context handles directly inside `value` and the values nested
// in it. Refs are entered once each, since a ref can end up holding itself.
fn push_handles(
    value: &Value,
    contexts: &mut Vec<CtxId>,
    values: &mut Vec<Value>,
    seen_refs: &mut FxHashSet<usize>,
) {
    match value {
        Value::Context(id) => contexts.push(*id),
        Value::Function(function) => {
            contexts.extend(function.closure);
            values.extend(function.body.items.iter().cloned());
        }
        Value::Block(block) => values.extend(block.items.iter().cloned()),
        Value::List(items) => values.extend(items.iter().cloned()),
        Value::Dict(map) => values.extend(map.values().cloned()),
        Value::Table(table) => {
            for row in &table.rows {
                values.extend(row.iter().cloned());
            }
        }
        Value::TableRow(row) => values.extend(row.values.iter().cloned()),
        Value::Ref(cell) => {
            if seen_refs.insert(Rc::as_ptr(cell) as usize) {
                values.push(cell.borrow().clone());
            }
        }
        _ => {}
    }
}

impl std::fmt::Debug for ContextArena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextArena")
            .field("slots", &self.slots.len())
            .field("live", &self.live_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::words::WordTable;

    #[test]
    fn test_nearest_binding_wins() {
        let mut words = WordTable::new();
        let x = words.intern("x");
        let mut arena = ContextArena::new();
        let parent = arena.alloc(Context::new(None));
        let child = arena.alloc(Context::new(Some(parent)));
        arena.get_mut(parent).unwrap().set(x, Value::Integer(1));
        arena.get_mut(child).unwrap().set(x, Value::Integer(2));

        assert_eq!(arena.lookup(child, x), Some((Value::Integer(2), child)));
        assert_eq!(arena.lookup(parent, x), Some((Value::Integer(1), parent)));
    }

    #[test]
    fn test_lookup_walks_to_parent() {
        let mut words = WordTable::new();
        let y = words.intern("y");
        let mut arena = ContextArena::new();
        let parent = arena.alloc(Context::new(None));
        let child = arena.alloc(Context::new(Some(parent)));
        arena.get_mut(parent).unwrap().set(y, Value::Boolean(true));
        assert_eq!(arena.lookup(child, y), Some((Value::Boolean(true), parent)));
        assert_eq!(arena.lookup(child, words.intern("z")), None);
    }

    #[test]
    fn test_modify_requires_var() {
        let mut words = WordTable::new();
        let c = words.intern("c");
        let v = words.intern("v");
        let mut ctx = Context::new(None);
        ctx.set(c, Value::Integer(1));
        ctx.declare_var(v, Value::Integer(1));

        assert_eq!(ctx.modify(c, Value::Integer(2)), Err(BindError::NotVariable(c)));
        assert_eq!(ctx.get(c), Some(&Value::Integer(1)));

        assert_eq!(ctx.modify(v, Value::Integer(1)), Ok(false));
        assert_eq!(ctx.modify(v, Value::Integer(5)), Ok(true));
        assert_eq!(ctx.get(v), Some(&Value::Integer(5)));

        let missing = words.intern("missing");
        assert_eq!(ctx.modify(missing, Value::Void), Err(BindError::Unbound(missing)));
    }

    #[test]
    fn test_release_bumps_generation() {
        let mut arena = ContextArena::new();
        let id = arena.alloc(Context::new(None));
        assert!(arena.release(id));
        assert!(arena.get(id).is_none());

        let reused = arena.alloc(Context::new(None));
        assert_ne!(id, reused);
        assert!(arena.get(reused).is_some());
        assert!(arena.get(id).is_none());
    }

    #[test]
    fn test_captured_contexts_survive_release() {
        let mut arena = ContextArena::new();
        let parent = arena.alloc(Context::new(None));
        let child = arena.alloc(Context::new(Some(parent)));
        arena.capture(child);
        assert!(arena.is_captured(parent));
        assert!(!arena.release(parent));
        assert!(!arena.release(child));
        assert!(arena.is_live(child));
        assert!(arena.discard(child));
        assert!(!arena.is_live(child));
    }

    #[test]
    fn test_lookup_terminates_on_parent_cycle() {
        let mut words = WordTable::new();
        let w = words.intern("nowhere");
        let mut arena = ContextArena::new();
        let a = arena.alloc(Context::new(None));
        let b = arena.alloc(Context::new(Some(a)));
        arena.get_mut(a).unwrap().parent = Some(b);
        assert_eq!(arena.lookup(a, w), None);
    }

    #[test]
    fn test_collect_frees_unreachable_contexts() {
        let mut words = WordTable::new();
        let held = words.intern("held");
        let mut arena = ContextArena::new();
        let root = arena.alloc(Context::new(None));
        let kept = arena.alloc(Context::new(None));
        let kept_parent = arena.alloc(Context::new(None));
        let dropped = arena.alloc(Context::new(Some(root)));
        arena.capture(dropped);
        arena.get_mut(kept).unwrap().parent = Some(kept_parent);
        arena.get_mut(root).unwrap().set(held, Value::List(Rc::new(vec![Value::Context(kept)])));

        assert_eq!(arena.collect(&[root], &[]), 1);
        assert!(arena.is_live(kept));
        assert!(arena.is_live(kept_parent));
        assert!(!arena.is_live(dropped));
        assert_eq!(arena.live_count(), 3);
    }

    #[test]
    fn test_collect_reclaims_cycles_and_survives_self_refs() {
        let mut words = WordTable::new();
        let me = words.intern("me");
        let mut arena = ContextArena::new();
        let root = arena.alloc(Context::new(None));
        let a = arena.alloc(Context::new(None));
        let b = arena.alloc(Context::new(Some(a)));
        arena.get_mut(a).unwrap().set(me, Value::Context(b));

        let cell = Rc::new(std::cell::RefCell::new(Value::Void));
        let looped = Value::Ref(cell.clone());
        cell.replace(Value::List(Rc::new(vec![looped.clone(), Value::Context(root)])));

        assert_eq!(arena.collect(&[], &[&looped]), 2);
        assert!(arena.is_live(root));
        assert!(!arena.is_live(a));
        assert!(!arena.is_live(b));
        // break the ref cycle so the test does not leak
        cell.replace(Value::Void);
    }
}

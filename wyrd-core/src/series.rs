// Series: the cursor-addressable token stream the evaluator consumes
//
// A series shares its items with the Block it came from; only the cursor is
// owned, so saving and restoring a series around nested evaluation is cheap.

use crate::value::Value;
use std::rc::Rc;

#[derive(Clone, Debug)]
pub struct Series {
    items: Rc<[Value]>,
    pos: usize,
}

impl Series {
    pub fn new(items: Rc<[Value]>) -> Self {
        Self { items, pos: 0 }
    }

    pub fn empty() -> Self {
        Self::new(Rc::from(Vec::new()))
    }

    /// Returns the value at the cursor and advances past it.
    pub fn pop(&mut self) -> Option<Value> {
        let value = self.items.get(self.pos).cloned();
        if value.is_some() {
            self.pos += 1;
        }
        value
    }

    pub fn peek(&self) -> Option<&Value> {
        self.items.get(self.pos)
    }

    /// Skips the value at the cursor.
    pub fn next(&mut self) {
        if self.pos < self.items.len() {
            self.pos += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos.min(self.items.len());
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.items.len()
    }

    pub fn items(&self) -> &Rc<[Value]> {
        &self.items
    }
}

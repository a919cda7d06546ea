// Word table: bidirectional interning of identifiers to small integer indices
//
// Every identifier in a program is compared by its index, never by its text.
// The reverse vector lets us recover the text for printing and error messages.

use crate::value::ValueType;
use rustc_hash::FxHashMap;
use std::fmt;
use std::rc::Rc;

// RUST CONCEPT: Newtype around an integer
// A Word is Copy and hashes as a plain u32, so contexts can key on it cheaply
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Word(u32);

impl Word {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) fn from_index(index: usize) -> Self {
        Word(u32::try_from(index).unwrap_or(u32::MAX))
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub struct WordTable {
    index: FxHashMap<Rc<str>, Word>,
    names: Vec<Rc<str>>,
}

impl WordTable {
    /// Creates a table with every value type name pre-interned, so that
    /// `ValueType::word()` is the word of the type's own name.
    pub fn new() -> Self {
        let mut table = Self {
            index: FxHashMap::default(),
            names: Vec::with_capacity(512),
        };
        for ty in ValueType::ALL {
            table.intern(ty.name());
        }
        table
    }

    pub fn intern(&mut self, name: &str) -> Word {
        if let Some(word) = self.index.get(name) {
            return *word;
        }
        let word = Word::from_index(self.names.len());
        let text: Rc<str> = name.into();
        self.names.push(text.clone());
        self.index.insert(text, word);
        word
    }

    pub fn lookup(&self, name: &str) -> Option<Word> {
        self.index.get(name).copied()
    }

    pub fn name(&self, word: Word) -> &str {
        self.names.get(word.index()).map_or("<unknown-word>", |s| s)
    }

    pub fn name_rc(&self, word: Word) -> Rc<str> {
        self.names
            .get(word.index())
            .cloned()
            .unwrap_or_else(|| Rc::from("<unknown-word>"))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for WordTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for WordTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WordTable")
            .field("len", &self.names.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interning_is_stable() {
        let mut words = WordTable::new();
        let a = words.intern("alpha");
        let b = words.intern("beta");
        assert_ne!(a, b);
        assert_eq!(words.intern("alpha"), a);
        assert_eq!(words.name(a), "alpha");
        assert_eq!(words.lookup("beta"), Some(b));
        assert_eq!(words.lookup("gamma"), None);
    }

    #[test]
    fn test_type_names_are_preinterned() {
        let words = WordTable::new();
        for ty in ValueType::ALL {
            assert_eq!(words.lookup(ty.name()), Some(ty.word()));
            assert_eq!(words.name(ty.word()), ty.name());
        }
    }

    #[test]
    fn test_unknown_word_has_placeholder_name() {
        let words = WordTable::new();
        assert_eq!(words.name(Word::from_index(1_000_000)), "<unknown-word>");
    }
}

//! Identity-keyed record of finished nodes
//!
//! Node ids are dense arena indices, so membership is a growable bitset.
//! Entries are never removed: once a text node or block has been handled it
//! stays handled for the lifetime of the document.

use crate::dom::NodeId;

const WORD_BITS: usize = u64::BITS as usize;

#[derive(Debug, Clone, Default)]
pub struct ProcessedSet {
    words: Vec<u64>,
    len: usize,
}

impl ProcessedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `id` as processed. Returns false if it already was.
    pub fn insert(&mut self, id: NodeId) -> bool {
        let (word, bit) = Self::slot(id);
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        let mask = 1u64 << bit;
        if self.words[word] & mask != 0 {
            return false;
        }
        self.words[word] |= mask;
        self.len += 1;
        true
    }

    pub fn contains(&self, id: NodeId) -> bool {
        let (word, bit) = Self::slot(id);
        self.words
            .get(word)
            .is_some_and(|w| w & (1u64 << bit) != 0)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn slot(id: NodeId) -> (usize, usize) {
        (id.index() / WORD_BITS, id.index() % WORD_BITS)
    }
}

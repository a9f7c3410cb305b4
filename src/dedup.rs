//! Insertion-ordered deduplication for merged result lists.
//!
//! [`OrderedSet`] merges any number of input sequences into one sequence
//! with no two values sharing the same derived key, while keeping a
//! stable, deterministic order. On a key collision the stored value is
//! overwritten **in place** — the position never moves to the tail. A
//! caller that wants sequence B to define the base ordering over sequence
//! A must therefore add B first.

use std::collections::HashMap;
use std::hash::Hash;

/// An insertion-ordered set keyed by a caller-supplied key function.
pub struct OrderedSet<K, V, F>
where
    K: Eq + Hash,
    F: Fn(&V) -> K,
{
    key_fn: F,
    values: Vec<V>,
    positions: HashMap<K, usize>,
}

impl<K, V, F> OrderedSet<K, V, F>
where
    K: Eq + Hash,
    F: Fn(&V) -> K,
{
    /// Create an empty set with the given key function.
    pub fn new(key_fn: F) -> Self {
        Self {
            key_fn,
            values: Vec::new(),
            positions: HashMap::new(),
        }
    }

    /// Insert one value.
    ///
    /// A new key appends at the tail; an existing key overwrites the
    /// stored value at its original position. O(1) amortized.
    pub fn add(&mut self, value: V) {
        let key = (self.key_fn)(&value);
        match self.positions.get(&key) {
            Some(&pos) => self.values[pos] = value,
            None => {
                self.positions.insert(key, self.values.len());
                self.values.push(value);
            }
        }
    }

    /// Insert every value from an iterator, in order.
    pub fn extend<I: IntoIterator<Item = V>>(&mut self, iter: I) {
        for value in iter {
            self.add(value);
        }
    }

    /// Number of distinct keys seen so far.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// `true` if nothing has been added.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Materialize the values in first-insertion order.
    pub fn into_vec(self) -> Vec<V> {
        self.values
    }
}

//! Least recently used cache on top of an insertion ordered map.
//!
//! The front of the map holds the least recently used entry. A hit moves the
//! entry to the back, an insert beyond capacity evicts from the front.

use std::{borrow::Borrow, hash::Hash};

use indexmap::IndexMap;

#[derive(Debug, Clone)]
pub struct LruCache<K, V> {
    entries: IndexMap<K, V>,
    /// `None` means unbounded
    capacity: Option<usize>,
}

impl<K: Hash + Eq, V> LruCache<K, V> {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            entries: IndexMap::new(),
            capacity,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up `key` and marks it as most recently used.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let index = self.entries.get_index_of(key)?;
        let last = self.entries.len() - 1;
        self.entries.move_index(index, last);
        self.entries.get_index(last).map(|(_, v)| v)
    }

    /// Looks up `key` without touching the recency order.
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.get(key)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.contains_key(key)
    }

    /// Inserts `value` as the most recently used entry.
    ///
    /// Returns the entries evicted to stay within capacity.
    pub fn insert(&mut self, key: K, value: V) -> Vec<(K, V)> {
        self.entries.shift_remove(&key);
        self.entries.insert(key, value);

        let mut evicted = Vec::new();

        if let Some(capacity) = self.capacity {
            while self.entries.len() > capacity.max(1) {
                match self.entries.shift_remove_index(0) {
                    Some(entry) => evicted.push(entry),
                    None => break,
                }
            }
        }

        evicted
    }

    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.shift_remove(key)
    }

    pub fn retain(&mut self, keep: impl FnMut(&K, &mut V) -> bool) {
        self.entries.retain(keep);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Keys from least to most recently used.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }
}

impl<K: Hash + Eq, V> Default for LruCache<K, V> {
    fn default() -> Self {
        Self::unbounded()
    }
}

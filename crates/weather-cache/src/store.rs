//! Write-ordered storage with oldest-first eviction.
//!
//! Generalized from a plain FIFO eviction store: since [`super::Cache::put`]
//! always stamps entries with a monotonically non-decreasing clock,
//! write order and `created_at` order coincide — *provided* an overwrite of
//! an existing key re-queues it to the back. A plain FIFO store does not do
//! this (it only orders first insertions), which would let a key retain a
//! stale position after being refreshed; that would violate the "evict
//! smallest `created_at`" invariant, so this store requeues on overwrite.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

pub(crate) struct WriteOrderedStore<K, V> {
    data: HashMap<K, V>,
    order: VecDeque<K>,
    capacity: usize,
}

impl<K: Hash + Eq + Clone, V> WriteOrderedStore<K, V> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            data: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub(crate) fn get(&self, key: &K) -> Option<&V> {
        self.data.get(key)
    }

    pub(crate) fn remove(&mut self, key: &K) -> Option<V> {
        self.order.retain(|k| k != key);
        self.data.remove(key)
    }

    /// Inserts or overwrites `key`, requeuing it to the back of the write
    /// order. Returns the evicted `(key, value)` if the store was at
    /// capacity and `key` was not already present.
    pub(crate) fn insert(&mut self, key: K, value: V) -> Option<(K, V)> {
        let is_update = self.data.contains_key(&key);

        let evicted = if !is_update && self.data.len() >= self.capacity {
            self.order.pop_front().and_then(|oldest| {
                let value = self.data.remove(&oldest)?;
                Some((oldest, value))
            })
        } else {
            None
        };

        if is_update {
            self.order.retain(|k| k != &key);
        }
        self.order.push_back(key.clone());
        self.data.insert(key, value);

        evicted
    }

    pub(crate) fn len(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_write_when_full() {
        let mut store = WriteOrderedStore::new(2);
        store.insert("a", 1);
        store.insert("b", 2);
        let evicted = store.insert("c", 3);
        assert_eq!(evicted, Some(("a", 1)));
        assert_eq!(store.get(&"a"), None);
        assert_eq!(store.get(&"b"), Some(&2));
        assert_eq!(store.get(&"c"), Some(&3));
    }

    #[test]
    fn overwrite_requeues_to_the_back() {
        let mut store = WriteOrderedStore::new(2);
        store.insert("a", 1);
        store.insert("b", 2);
        // Refresh "a" — it should no longer be the eviction target.
        store.insert("a", 10);
        let evicted = store.insert("c", 3);
        assert_eq!(evicted, Some(("b", 2)));
        assert_eq!(store.get(&"a"), Some(&10));
        assert_eq!(store.get(&"c"), Some(&3));
    }

    #[test]
    fn remove_drops_from_both_structures() {
        let mut store = WriteOrderedStore::new(4);
        store.insert("a", 1);
        store.insert("b", 2);
        assert_eq!(store.remove(&"a"), Some(1));
        assert_eq!(store.len(), 1);
        // "a" no longer occupies an order slot, so filling the capacity
        // with fresh keys should not evict "b".
        store.insert("c", 3);
        store.insert("d", 4);
        assert_eq!(store.get(&"b"), Some(&2));
    }
}

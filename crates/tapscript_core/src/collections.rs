//! Collection types used by the binding layer.

use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::hash::Hash;

/// An ordered map that preserves insertion order.
/// Used for scopes, where bindings are reported in declaration order.
#[derive(Debug, Clone)]
pub struct OrderedMap<K, V> {
    entries: Vec<(K, V)>,
    index: FxHashMap<K, usize>,
}

impl<K: Eq + Hash + Clone, V> OrderedMap<K, V> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: FxHashMap::default(),
        }
    }

    /// Return the value stored under `key`, inserting `make()` first if absent.
    /// The boolean is true when a new entry was created.
    pub fn get_or_insert_with(&mut self, key: K, make: impl FnOnce() -> V) -> (&mut V, bool) {
        let (idx, created) = match self.index.get(&key).copied() {
            Some(idx) => (idx, false),
            None => {
                let idx = self.entries.len();
                self.index.insert(key.clone(), idx);
                self.entries.push((key, make()));
                (idx, true)
            }
        };
        (&mut self.entries[idx].1, created)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.index.get(key).map(|&idx| &self.entries[idx].1)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.index
            .get(key)
            .copied()
            .map(move |idx| &mut self.entries[idx].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }
}

impl<K: Eq + Hash + Clone, V> Default for OrderedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// A multimap keyed by integer priority.
///
/// Iteration yields values by ascending priority; values sharing a priority
/// come back in the order they were inserted.
#[derive(Debug, Clone)]
pub struct PriorityMap<V> {
    buckets: BTreeMap<i32, Vec<V>>,
    len: usize,
}

impl<V> PriorityMap<V> {
    pub fn new() -> Self {
        Self {
            buckets: BTreeMap::new(),
            len: 0,
        }
    }

    pub fn insert(&mut self, priority: i32, value: V) {
        self.buckets.entry(priority).or_default().push(value);
        self.len += 1;
    }

    /// Keep only the values for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(i32, &V) -> bool) {
        for (&priority, bucket) in self.buckets.iter_mut() {
            bucket.retain(|v| keep(priority, v));
        }
        self.buckets.retain(|_, bucket| !bucket.is_empty());
        self.len = self.buckets.values().map(Vec::len).sum();
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, &V)> {
        self.buckets
            .iter()
            .flat_map(|(&priority, bucket)| bucket.iter().map(move |v| (priority, v)))
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.buckets.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<V> Default for PriorityMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

//! Memoizes bind groups (or anything else) that depend on resources which
//! change only when render targets are recreated.

use std::{collections::HashMap, hash::Hash};

pub struct BindingCache<K, V = wgpu::BindGroup> {
    entries: HashMap<K, V>,
}

impl<K, V> Default for BindingCache<K, V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash, V> BindingCache<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the entry for `key`, running `create` only on a miss.
    pub fn get_or_create(&mut self, key: K, create: impl FnOnce() -> V) -> &V {
        self.entries.entry(key).or_insert_with(create)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

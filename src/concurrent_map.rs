//! A thread-safe mapping from an integer key to a tagged [`crate::value::Value`].
//!
//! A single `parking_lot::RwLock` guards an ordered `BTreeMap`. This is
//! deliberately the simplest thing that could work: node data maps are small
//! and short-lived compared to the tree-structural locks in [`crate::node`],
//! so there is no benefit from sharding or lock-free structures here.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::value::{TypedValue, Value};

#[derive(Debug, Default)]
pub struct ConcurrentMap {
    inner: RwLock<BTreeMap<u32, Value>>,
}

impl ConcurrentMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<T: TypedValue>(&self, key: u32) -> Option<T> {
        let guard = self.inner.read();
        guard.get(&key).and_then(|v| T::from_value(v))
    }

    pub fn put<T: TypedValue>(&self, key: u32, value: T) {
        let mut guard = self.inner.write();
        guard.insert(key, value.into_value());
    }

    pub fn remove(&self, key: u32) -> bool {
        let mut guard = self.inner.write();
        guard.remove(&key).is_some()
    }

    pub fn size(&self) -> usize {
        self.inner.read().len()
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }

    /// A point-in-time, ordered snapshot of the map's contents.
    pub fn snapshot(&self) -> Vec<(u32, Value)> {
        self.inner
            .read()
            .iter()
            .map(|(k, v)| (*k, v.clone()))
            .collect()
    }
}

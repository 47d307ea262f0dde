//! A composite lock that freezes an entire volume subtree for the duration
//! of a structural edit (mount, unmount, detach, or the single-node case of
//! a mounted child's creation).
//!
//! Acquiring one walks the subtree pre-order, taking each [`Node`]'s
//! exclusive lock and never releasing it until the whole [`SubtreeLock`]
//! drops, at which point every guard is released in the exact reverse of
//! its acquisition order. This is what lets a caller hold an entire subtree
//! immutable while grafting or pruning it from a storage tree, without
//! re-entrant locking and without a lock ordering that could deadlock
//! against a concurrent acquisition elsewhere, since every acquisition
//! walks `children` in the same deterministic order.
//!
//! Built on `owning_ref::OwningHandle`, which pairs an owned `Arc<Node>`
//! with a lock guard derived from its address — the textbook use of that
//! crate for holding a guard whose lifetime outlives the local stack frame
//! that acquired it.

use std::collections::HashMap;
use std::sync::Arc;

use owning_ref::OwningHandle;
use parking_lot::RwLockWriteGuard;

use crate::node::{Node, NodeInner};

type NodeGuard = OwningHandle<Arc<Node>, RwLockWriteGuard<'static, NodeInner>>;

pub struct SubtreeLock {
    order: Vec<usize>,
    guards: HashMap<usize, NodeGuard>,
}

impl SubtreeLock {
    /// Acquires exclusive locks on `root` and every descendant, pre-order.
    pub fn acquire(root: &Arc<Node>) -> SubtreeLock {
        let mut lock = SubtreeLock {
            order: Vec::new(),
            guards: HashMap::new(),
        };
        lock.acquire_recursive(root);
        lock
    }

    fn acquire_recursive(&mut self, node: &Arc<Node>) {
        let key = Arc::as_ptr(node) as usize;
        if self.guards.contains_key(&key) {
            return;
        }
        let handle: NodeGuard = OwningHandle::new_with_fn(node.clone(), |ptr| {
            let node_ref: &Node = unsafe { &*ptr };
            node_ref.inner.write()
        });
        let children: Vec<Arc<Node>> = handle.children.values().cloned().collect();
        self.order.push(key);
        self.guards.insert(key, handle);
        for child in &children {
            self.acquire_recursive(child);
        }
    }

    pub fn inner(&self, node: &Arc<Node>) -> &NodeInner {
        let key = Arc::as_ptr(node) as usize;
        self.guards
            .get(&key)
            .expect("node is not covered by this subtree lock")
    }

    pub fn inner_mut(&mut self, node: &Arc<Node>) -> &mut NodeInner {
        let key = Arc::as_ptr(node) as usize;
        self.guards
            .get_mut(&key)
            .expect("node is not covered by this subtree lock")
    }
}

impl Drop for SubtreeLock {
    fn drop(&mut self) {
        // Remove in reverse acquisition order; each `remove` drops its guard
        // immediately since the returned `Option` is a temporary.
        for key in self.order.iter().rev() {
            self.guards.remove(key);
        }
    }
}

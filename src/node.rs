//! Volume tree nodes.
//!
//! A [`Node`] is user-owned: callers build volumes bottom-up with
//! [`Node::create`]/[`Node::create_child`], attach typed data to them, and
//! hand them to a [`crate::storage::Storage`] via `mount`. A node knows
//! nothing about *which* storages mount it beyond the back-reference list
//! needed to propagate later structural changes (§4.1 of the design) — the
//! merge and priority logic all lives on the storage side.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use log::{debug, trace};
use parking_lot::{RwLock, RwLockReadGuard};

use crate::concurrent_map::ConcurrentMap;
use crate::path::validate_name;
use crate::storage_node::StorageNode;
use crate::subtree_lock::SubtreeLock;
use crate::value::TypedValue;

/// A record of one storage node that currently mounts this volume node,
/// kept so that later child attach/detach on the volume side can be fanned
/// out without a global search.
#[derive(Clone)]
pub(crate) struct MountBackref {
    pub storage_node: Weak<StorageNode>,
    pub depth: usize,
    pub priority: u64,
}

pub(crate) struct NodeInner {
    pub children: BTreeMap<String, Arc<Node>>,
    pub mount_backrefs: Vec<MountBackref>,
}

impl NodeInner {
    fn empty() -> Self {
        NodeInner {
            children: BTreeMap::new(),
            mount_backrefs: Vec::new(),
        }
    }
}

pub struct Node {
    name: String,
    parent: RwLock<Weak<Node>>,
    pub(crate) inner: RwLock<NodeInner>,
    data: ConcurrentMap,
}

impl Node {
    /// Creates a detached root node with an empty name.
    pub fn create() -> Arc<Node> {
        Arc::new(Node {
            name: String::new(),
            parent: RwLock::new(Weak::new()),
            inner: RwLock::new(NodeInner::empty()),
            data: ConcurrentMap::new(),
        })
    }

    /// Creates a new child under `parent` and, if `parent` is itself
    /// mounted anywhere, immediately grafts the new (empty) child into
    /// every storage node that mounts `parent`.
    ///
    /// Fails (returns `None`) when `name` is empty, contains the path
    /// separator, or `parent` already has a child by that name.
    pub fn create_child(parent: &Arc<Node>, name: &str) -> Option<Arc<Node>> {
        if validate_name(name).is_err() {
            return None;
        }

        let mut parent_inner = parent.inner.write();
        if parent_inner.children.contains_key(name) {
            return None;
        }

        let child = Arc::new(Node {
            name: name.to_string(),
            parent: RwLock::new(Arc::downgrade(parent)),
            inner: RwLock::new(NodeInner::empty()),
            data: ConcurrentMap::new(),
        });
        parent_inner.children.insert(name.to_string(), child.clone());

        if !parent_inner.mount_backrefs.is_empty() {
            let backrefs = parent_inner.mount_backrefs.clone();
            let mut subtree = SubtreeLock::acquire(&child);
            for backref in backrefs {
                if let Some(storage_node) = backref.storage_node.upgrade() {
                    storage_node.attach_mounted_child(
                        backref.depth,
                        backref.priority,
                        &child,
                        &mut subtree,
                    );
                }
            }
        }

        trace!("node: created child '{}' under '{}'", name, parent.name);
        Some(child)
    }

    pub fn get_child(&self, name: &str) -> Option<Arc<Node>> {
        self.inner.read().children.get(name).cloned()
    }

    pub fn get_parent(&self) -> Option<Arc<Node>> {
        self.parent.read().upgrade()
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    /// A scoped, shared-locked view over this node's children in name
    /// order. Holds the node's lock for as long as the view is alive.
    pub fn get_children(&self) -> ChildrenView<'_> {
        ChildrenView {
            guard: self.inner.read(),
        }
    }

    pub fn get<T: TypedValue>(&self, key: u32) -> Option<T> {
        self.data.get(key)
    }

    pub fn put<T: TypedValue>(&self, key: u32, value: T) {
        self.data.put(key, value)
    }

    pub fn remove(&self, key: u32) -> bool {
        self.data.remove(key)
    }

    /// Detaches this node from its parent, unmounting it from every
    /// storage node that currently mounts the parent. Returns `false` if
    /// there is no parent, or if a concurrent `detach` already won the
    /// race — exactly one concurrent racer returns `true`.
    pub fn detach(self: &Arc<Node>) -> bool {
        let Some(parent) = self.get_parent() else {
            return false;
        };

        let mut parent_inner = parent.inner.write();
        match parent_inner.children.get(&self.name) {
            Some(current) if Arc::ptr_eq(current, self) => {}
            _ => return false,
        }

        let mut subtree = SubtreeLock::acquire(self);
        let backrefs = parent_inner.mount_backrefs.clone();
        for backref in backrefs.iter().rev() {
            if let Some(storage_node) = backref.storage_node.upgrade() {
                storage_node.detach_mounted_child(backref.depth, self, &mut subtree);
            }
        }
        parent_inner.children.remove(&self.name);
        drop(parent_inner);
        drop(subtree);

        *self.parent.write() = Weak::new();
        debug!("node: detached '{}'", self.name);
        true
    }
}

pub struct ChildrenView<'a> {
    guard: RwLockReadGuard<'a, NodeInner>,
}

impl<'a> ChildrenView<'a> {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<Node>)> {
        self.guard.children.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.guard.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard.children.is_empty()
    }
}

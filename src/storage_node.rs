//! Storage tree nodes — the engine-owned overlay that clients actually
//! read through. Each node carries a priority-ordered list of mounted
//! volume references; a typed read walks that list from highest to lowest
//! priority and returns the first matching type, implementing
//! last-mounted-wins collision resolution.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::trace;
use parking_lot::RwLock;

use crate::node::{MountBackref, Node};
use crate::subtree_lock::SubtreeLock;
use crate::value::TypedValue;

struct MountedVolume {
    volume: Arc<Node>,
    depth: usize,
    priority: u64,
}

struct StorageNodeInner {
    children: BTreeMap<String, Arc<StorageNode>>,
    /// Ascending by priority; reads iterate in reverse for highest-first.
    mounted_volumes: Vec<MountedVolume>,
    virtual_mount_count: u64,
}

pub struct StorageNode {
    inner: RwLock<StorageNodeInner>,
}

impl StorageNode {
    pub(crate) fn empty() -> Arc<StorageNode> {
        Arc::new(StorageNode {
            inner: RwLock::new(StorageNodeInner {
                children: BTreeMap::new(),
                mounted_volumes: Vec::new(),
                virtual_mount_count: 0,
            }),
        })
    }

    pub fn get_child(&self, name: &str) -> Option<Arc<StorageNode>> {
        self.inner.read().children.get(name).cloned()
    }

    /// Reads through the merged view: the highest-priority mounted volume
    /// carrying a value of type `T` under `key` wins.
    pub fn get<T: TypedValue>(&self, key: u32) -> Option<T> {
        let inner = self.inner.read();
        for mounted in inner.mounted_volumes.iter().rev() {
            if let Some(value) = mounted.volume.get::<T>(key) {
                return Some(value);
            }
        }
        None
    }

    /// Grafts `volume`'s subtree into this storage node at `depth`,
    /// recording the mount and the reciprocal back-reference. Holds this
    /// node's exclusive lock for the whole call, including the recursive
    /// descent into freshly created or existing storage children.
    pub(crate) fn mount(
        self: &Arc<StorageNode>,
        volume: &Arc<Node>,
        depth: usize,
        priority: u64,
        subtree: &mut SubtreeLock,
    ) {
        let mut inner = self.inner.write();
        let pos = inner
            .mounted_volumes
            .partition_point(|m| m.priority < priority);
        inner.mounted_volumes.insert(
            pos,
            MountedVolume {
                volume: volume.clone(),
                depth,
                priority,
            },
        );

        let children: Vec<Arc<Node>> = {
            let node_inner = subtree.inner_mut(volume);
            node_inner.mount_backrefs.push(MountBackref {
                storage_node: Arc::downgrade(self),
                depth,
                priority,
            });
            node_inner.children.values().cloned().collect()
        };

        for child in children {
            let name = child.get_name().to_string();
            let s_child = inner
                .children
                .entry(name)
                .or_insert_with(StorageNode::empty)
                .clone();
            s_child.mount(&child, depth + 1, priority, subtree);
        }
    }

    /// Reverses [`StorageNode::mount`] for the `(volume, depth)` pair.
    /// Returns `true` if this node is now fully empty and should be
    /// detached by the caller.
    pub(crate) fn unmount(
        self: &Arc<StorageNode>,
        volume: &Arc<Node>,
        depth: usize,
        subtree: &mut SubtreeLock,
    ) -> bool {
        let mut inner = self.inner.write();

        let children_reversed: Vec<Arc<Node>> = {
            let node_inner = subtree.inner(volume);
            let mut kids: Vec<Arc<Node>> = node_inner.children.values().cloned().collect();
            kids.reverse();
            kids
        };

        for child in children_reversed {
            let name = child.get_name().to_string();
            let s_child = inner
                .children
                .get(&name)
                .cloned()
                .expect("mount invariant violated: missing storage child during unmount");
            if s_child.unmount(&child, depth + 1, subtree) {
                inner.children.remove(&name);
            }
        }

        let idx = inner
            .mounted_volumes
            .iter()
            .rposition(|m| Arc::ptr_eq(&m.volume, volume) && m.depth == depth)
            .expect("mount invariant violated: missing mounted_volumes entry during unmount");
        inner.mounted_volumes.remove(idx);

        {
            let node_inner = subtree.inner_mut(volume);
            if let Some(pos) = node_inner.mount_backrefs.iter().rposition(|b| {
                b.depth == depth
                    && b.storage_node
                        .upgrade()
                        .map_or(false, |s| Arc::ptr_eq(&s, self))
            }) {
                node_inner.mount_backrefs.remove(pos);
            }
        }

        inner.mounted_volumes.is_empty()
            && inner.virtual_mount_count == 0
            && inner.children.is_empty()
    }

    /// Propagates the creation of a new volume child into the
    /// corresponding storage child, creating it if absent.
    pub(crate) fn attach_mounted_child(
        self: &Arc<StorageNode>,
        depth: usize,
        priority: u64,
        child: &Arc<Node>,
        subtree: &mut SubtreeLock,
    ) {
        let name = child.get_name().to_string();
        let mut inner = self.inner.write();
        let s_child = inner
            .children
            .entry(name)
            .or_insert_with(StorageNode::empty)
            .clone();
        s_child.mount(child, depth + 1, priority, subtree);
    }

    /// Propagates the detachment of a volume child into the corresponding
    /// storage child, removing it if it becomes empty.
    pub(crate) fn detach_mounted_child(
        self: &Arc<StorageNode>,
        depth: usize,
        child: &Arc<Node>,
        subtree: &mut SubtreeLock,
    ) {
        let name = child.get_name().to_string();
        let mut inner = self.inner.write();
        let s_child = match inner.children.get(&name) {
            Some(c) => c.clone(),
            None => return,
        };
        if s_child.unmount(child, depth + 1, subtree) {
            inner.children.remove(&name);
        }
    }

    /// Walks `segments` as path-intermediate ("virtual") nodes, creating
    /// them as needed, then performs the real mount at the terminal node.
    pub(crate) fn mount_virtual(
        self: &Arc<StorageNode>,
        segments: &[&str],
        volume: &Arc<Node>,
        priority: u64,
        subtree: &mut SubtreeLock,
    ) {
        let Some((head, rest)) = segments.split_first() else {
            self.mount(volume, 0, priority, subtree);
            return;
        };
        let s_child = {
            let mut inner = self.inner.write();
            inner.virtual_mount_count += 1;
            inner
                .children
                .entry((*head).to_string())
                .or_insert_with(StorageNode::empty)
                .clone()
        };
        s_child.mount_virtual(rest, volume, priority, subtree);
    }

    /// Reverses [`StorageNode::mount_virtual`]. Returns `true` if this
    /// node is now fully empty.
    pub(crate) fn unmount_virtual(
        self: &Arc<StorageNode>,
        segments: &[&str],
        volume: &Arc<Node>,
        subtree: &mut SubtreeLock,
    ) -> bool {
        let Some((head, rest)) = segments.split_first() else {
            return self.unmount(volume, 0, subtree);
        };
        let s_child = {
            let inner = self.inner.read();
            inner
                .children
                .get(*head)
                .cloned()
                .expect("virtual mount invariant violated: missing path child")
        };
        let child_empty = s_child.unmount_virtual(rest, volume, subtree);

        let mut inner = self.inner.write();
        inner.virtual_mount_count -= 1;
        if child_empty {
            inner.children.remove(*head);
            trace!("storage_node: pruned empty virtual child '{}'", head);
        }
        inner.mounted_volumes.is_empty()
            && inner.virtual_mount_count == 0
            && inner.children.is_empty()
    }
}

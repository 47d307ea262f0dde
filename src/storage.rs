//! The public entry point: validates paths, assigns mount priorities, and
//! dispatches into the storage tree rooted at [`StorageNode`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, warn};
use parking_lot::RwLock;

use crate::node::Node;
use crate::path::{mount_segments, split_segments_lenient, validate_mount_path};
use crate::storage_node::StorageNode;
use crate::subtree_lock::SubtreeLock;

struct MountEntry {
    path: String,
    volume: Arc<Node>,
}

/// A mounted overlay of volume trees, merged by last-mounted-wins priority.
pub struct Storage {
    root: Arc<StorageNode>,
    mounts: RwLock<Vec<MountEntry>>,
    next_priority: AtomicU64,
}

impl Storage {
    pub fn new() -> Self {
        Storage {
            root: StorageNode::empty(),
            mounts: RwLock::new(Vec::new()),
            next_priority: AtomicU64::new(1),
        }
    }

    /// Mounts `volume`'s subtree at `path`. `path` must be non-empty, start
    /// with `/`, and contain no consecutive separators; a single trailing
    /// separator is tolerated. Returns `false` on a malformed path.
    pub fn mount(&self, path: &str, volume: &Arc<Node>) -> bool {
        let Ok(body) = validate_mount_path(path) else {
            warn!("storage: rejected mount at malformed path '{}'", path);
            return false;
        };
        let segments = mount_segments(body);

        let mut mounts = self.mounts.write();
        let priority = self.next_priority.fetch_add(1, Ordering::SeqCst);
        let mut subtree = SubtreeLock::acquire(volume);
        self.root.mount_virtual(&segments, volume, priority, &mut subtree);
        mounts.push(MountEntry {
            path: path.to_string(),
            volume: volume.clone(),
        });
        debug!("storage: mounted '{}' at priority {}", path, priority);
        true
    }

    /// Unmounts the most-recently-mounted `(path, volume)` pair recorded
    /// (LIFO over duplicate mounts of the same path and volume). Returns
    /// `false` if no matching mount is recorded or the path is malformed.
    pub fn unmount(&self, path: &str, volume: &Arc<Node>) -> bool {
        let Ok(body) = validate_mount_path(path) else {
            return false;
        };
        let segments = mount_segments(body);

        let mut mounts = self.mounts.write();
        let Some(idx) = mounts
            .iter()
            .rposition(|m| m.path == path && Arc::ptr_eq(&m.volume, volume))
        else {
            return false;
        };
        mounts.remove(idx);
        let mut subtree = SubtreeLock::acquire(volume);
        self.root.unmount_virtual(&segments, volume, &mut subtree);
        debug!("storage: unmounted '{}'", path);
        true
    }

    /// Resolves a virtual path to its storage node. Leniently tolerates a
    /// single trailing separator; an interior double separator simply
    /// fails to resolve rather than being explicitly rejected.
    pub fn get_node(&self, path: &str) -> Option<Arc<StorageNode>> {
        let segments = split_segments_lenient(path).ok()?;
        let mut current = self.root.clone();
        for segment in segments {
            current = current.get_child(segment)?;
        }
        Some(current)
    }

    /// A snapshot of the currently recorded mount list, in mount order.
    pub fn get_mount_points(&self) -> Vec<(String, Arc<Node>)> {
        self.mounts
            .read()
            .iter()
            .map(|m| (m.path.clone(), m.volume.clone()))
            .collect()
    }
}

impl Default for Storage {
    fn default() -> Self {
        Storage::new()
    }
}

impl Drop for Storage {
    fn drop(&mut self) {
        let entries = std::mem::take(&mut *self.mounts.write());
        for entry in entries.into_iter().rev() {
            let Ok(body) = validate_mount_path(&entry.path) else {
                continue;
            };
            let segments = mount_segments(body);
            let mut subtree = SubtreeLock::acquire(&entry.volume);
            self.root
                .unmount_virtual(&segments, &entry.volume, &mut subtree);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mk_volume(value: &str) -> Arc<Node> {
        let v = Node::create();
        v.put(123u32, value.to_string());
        v
    }

    #[test]
    fn priority_ordering_last_mounted_wins() {
        let s = Storage::new();
        let v1 = mk_volume("data1");
        let v2 = mk_volume("data2");
        let v3 = mk_volume("data3");

        assert!(s.mount("/", &v1));
        assert!(s.mount("/", &v2));
        assert!(s.mount("/", &v3));

        assert_eq!(
            s.get_node("/").unwrap().get::<String>(123),
            Some("data3".to_string())
        );

        assert!(s.unmount("/", &v3));
        assert_eq!(
            s.get_node("/").unwrap().get::<String>(123),
            Some("data2".to_string())
        );
    }

    #[test]
    fn hierarchy_destruction() {
        let s = Storage::new();
        let v1 = Node::create();
        let foo1 = Node::create_child(&v1, "foo").unwrap();
        let bar1 = Node::create_child(&foo1, "bar").unwrap();
        Node::create_child(&bar1, "baz").unwrap();

        let v2 = Node::create();
        let bar2 = Node::create_child(&v2, "bar").unwrap();
        Node::create_child(&bar2, "baz").unwrap();

        assert!(s.mount("/virtual/path", &v1));
        assert!(s.mount("/virtual/path/foo", &v2));

        assert!(s.get_node("/virtual/path/foo/bar/baz").is_some());
        assert!(s.unmount("/virtual/path", &v1));
        assert!(
            s.get_node("/virtual/path/foo/bar/baz").is_some(),
            "v2 still covers this path after v1 is unmounted"
        );
        assert!(s.unmount("/virtual/path/foo", &v2));
        assert!(s.get_node("/virtual").is_none());
    }

    #[test]
    fn mounted_child_creation_propagates() {
        let s = Storage::new();
        let v = Node::create();
        assert!(s.mount("/", &v));
        let child = Node::create_child(&v, "test").unwrap();
        child.put(123u32, 1u32);
        assert_eq!(s.get_node("/test").unwrap().get::<u32>(123), Some(1));
    }

    #[test]
    fn detach_of_mounted_subtree_propagates() {
        let s = Storage::new();
        let v = Node::create();
        assert!(s.mount("/", &v));
        let child = Node::create_child(&v, "test").unwrap();
        assert!(s.get_node("/test").is_some());
        assert!(child.detach());
        assert!(s.get_node("/test").is_none());
    }

    #[test]
    fn trailing_separator_is_tolerated() {
        let s = Storage::new();
        let v = Node::create();
        assert!(s.mount("/path/", &v));
        let a = s.get_node("/path").unwrap();
        let b = s.get_node("/path/").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn heterogeneous_type_collision_all_readable() {
        let s = Storage::new();
        let v_str = Node::create();
        v_str.put(123u32, "hello".to_string());
        let v_u32 = Node::create();
        v_u32.put(123u32, 7u32);
        let v_f32 = Node::create();
        v_f32.put(123u32, 1.5f32);

        assert!(s.mount("/", &v_str));
        assert!(s.mount("/", &v_u32));
        assert!(s.mount("/", &v_f32));

        let node = s.get_node("/").unwrap();
        assert_eq!(node.get::<String>(123), Some("hello".to_string()));
        assert_eq!(node.get::<u32>(123), Some(7));
        assert_eq!(node.get::<f32>(123), Some(1.5));
    }

    #[test]
    fn lifo_unmount_on_duplicate_paths() {
        let s = Storage::new();
        let v1 = mk_volume("v1");
        let v2 = mk_volume("v2");

        assert!(s.mount("/", &v1));
        assert!(s.mount("/", &v2));
        assert!(s.mount("/", &v1));
        assert!(s.unmount("/", &v1));

        assert_eq!(
            s.get_node("/").unwrap().get::<String>(123),
            Some("v2".to_string())
        );
    }

    #[test]
    fn malformed_paths_are_rejected() {
        let s = Storage::new();
        let v = Node::create();
        assert!(!s.mount("", &v));
        assert!(!s.mount("a/b", &v));
        assert!(!s.mount("//a", &v));
        assert!(!s.mount("/a//b", &v));
        assert!(s.get_node("not-a-path").is_none());
    }

    #[test]
    fn drop_unmounts_everything() {
        let v = mk_volume("v");
        {
            let s = Storage::new();
            assert!(s.mount("/a/b", &v));
        }
        // the volume survives its mounting storage's drop and can be
        // remounted elsewhere without carrying stale back-references.
        let s2 = Storage::new();
        assert!(s2.mount("/other", &v));
        assert_eq!(
            s2.get_node("/other").unwrap().get::<String>(123),
            Some("v".to_string())
        );
    }
}

//! A concurrent, in-memory key/value store organized as a tree of volumes
//! that can be mounted into an overlay storage tree at arbitrary virtual
//! paths, with last-mounted-wins priority merging on reads.
//!
//! Two tree kinds cooperate: [`Node`] is the user-owned volume tree;
//! [`StorageNode`], reachable through [`Storage`], is the engine-owned
//! merged view produced by mounting volumes into it.

mod blob;
mod concurrent_map;
mod error;
mod node;
mod path;
mod storage;
mod storage_node;
mod subtree_lock;
mod value;

pub use blob::Blob;
pub use node::{ChildrenView, Node};
pub use storage::Storage;
pub use storage_node::StorageNode;
pub use value::{TypedValue, Value};

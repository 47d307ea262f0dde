//! A small shared, immutable byte buffer.
//!
//! Mirrors the crate's other bundled collaborators: it exists because the
//! overlay engine needs *a* opaque binary value type, not because blobs are
//! interesting on their own. Two blobs are equal only if they share the same
//! backing allocation — content equality is deliberately not implemented,
//! since the engine never needs to compare blob contents, only identity.

use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct Blob(Arc<[u8]>);

impl Blob {
    pub fn from_slice(data: &[u8]) -> Self {
        Blob(Arc::from(data))
    }

    pub fn from_vec(data: Vec<u8>) -> Self {
        Blob(Arc::from(data.into_boxed_slice()))
    }

    pub fn data(&self) -> &[u8] {
        &self.0
    }

    pub fn size(&self) -> usize {
        self.0.len()
    }
}

impl PartialEq for Blob {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for Blob {}

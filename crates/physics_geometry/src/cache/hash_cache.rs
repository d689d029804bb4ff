//! Shape identity to content hash memo
//!
//! Hashing a triangle mesh or a large union walks its whole payload, and the
//! same shape is usually asked for once per particle that references it. The
//! cache remembers the hash per shape allocation.
//!
//! Entries are keyed by the `Arc` allocation address and hold a weak
//! reference to the shape. Once the shape is dropped its address may be
//! reused by an unrelated allocation, so an entry whose weak reference no
//! longer upgrades to the queried shape is treated as a miss.

use crate::shapes::{structural_hash, GeometryKey, ImplicitObject, ImplicitRef};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

#[derive(Debug, Clone)]
struct HashEntry {
    shape: Weak<ImplicitObject>,
    hash: GeometryKey,
}

impl HashEntry {
    fn matches(&self, shape: &ImplicitRef) -> bool {
        self.shape.upgrade().is_some_and(|alive| Arc::ptr_eq(&alive, shape))
    }
}

/// Thread-safe memo of shape content hashes
#[derive(Debug, Default)]
pub struct HashCache {
    entries: RwLock<HashMap<usize, HashEntry>>,
}

fn identity(shape: &ImplicitRef) -> usize {
    Arc::as_ptr(shape) as usize
}

impl HashCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached hash of `shape`, computing and storing it on a miss
    pub fn get_and_cache_geometry_hash(&self, shape: &ImplicitRef) -> GeometryKey {
        let key = identity(shape);

        if let Some(entry) = self.entries.read().get(&key) {
            if entry.matches(shape) {
                return entry.hash;
            }
        }

        let hash = structural_hash(shape);
        self.cache_implicit_object_hash(shape, hash);
        hash
    }

    /// Returns true if a live entry exists for `shape`
    pub fn has_geometry_in_hash_cache(&self, shape: &ImplicitRef) -> bool {
        self.entries
            .read()
            .get(&identity(shape))
            .is_some_and(|entry| entry.matches(shape))
    }

    /// Store `hash` for `shape`, replacing any previous entry
    pub fn cache_implicit_object_hash(&self, shape: &ImplicitRef, hash: GeometryKey) {
        self.entries.write().insert(
            identity(shape),
            HashEntry {
                shape: Arc::downgrade(shape),
                hash,
            },
        );
    }

    /// Number of stored entries, including stale ones
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is stored
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every entry
    pub fn reset(&self) {
        self.entries.write().clear();
    }
}

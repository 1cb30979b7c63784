//! Key-value persistence boundary.
//!
//! The calibrator only ever talks to a [`ParamStore`]; hosts inject the
//! implementation. [`MemoryStore`] backs tests and simulation,
//! [`FileStore`](file::FileStore) backs on-vehicle deployments.

pub mod file;

use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use parking_lot::Mutex;

pub use file::FileStore;

/// Minimal key-value store interface.
///
/// Reads at startup and writes after block completions are both best
/// effort: the store is treated as eventually consistent and a failed
/// write never affects estimator correctness.
pub trait ParamStore: Send {
    /// Fetch the value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Store `value` under `key`, replacing any previous value.
    fn put(&mut self, key: &str, value: &[u8]) -> io::Result<()>;
}

/// In-memory store with shared-handle semantics.
///
/// Clones share the same underlying map, so a test can keep a handle
/// while the calibrator owns another.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// True when nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl ParamStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.inner.lock().get(key).cloned()
    }

    fn put(&mut self, key: &str, value: &[u8]) -> io::Result<()> {
        self.inner.lock().insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_round_trip() {
        let mut store = MemoryStore::new();
        assert!(store.get("missing").is_none());
        store.put("key", b"value").unwrap();
        assert_eq!(store.get("key").as_deref(), Some(b"value".as_ref()));
    }

    #[test]
    fn test_memory_store_overwrites() {
        let mut store = MemoryStore::new();
        store.put("key", b"old").unwrap();
        store.put("key", b"new").unwrap();
        assert_eq!(store.get("key").as_deref(), Some(b"new".as_ref()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_clones_share_contents() {
        let mut store = MemoryStore::new();
        let handle = store.clone();
        store.put("key", b"value").unwrap();
        assert_eq!(handle.get("key").as_deref(), Some(b"value".as_ref()));
    }
}

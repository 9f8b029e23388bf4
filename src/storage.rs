//! Persistent key-value storage boundary.
//!
//! DESIGN
//! ======
//! Components never touch a concrete storage medium directly; they receive
//! a [`KeyValueStore`] at construction. In a browser host the shim wraps
//! `localStorage`; everywhere else (and in every test) [`MemoryStore`]
//! stands in. Each component owns disjoint keys, so no multi-key
//! transaction support is needed.
//!
//! ERROR HANDLING
//! ==============
//! Storage can be disabled or over quota at any time. Callers are expected
//! to log and continue in memory rather than propagate; nothing in this
//! crate treats a storage failure as fatal.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Error raised by a [`KeyValueStore`] implementation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StorageError {
    /// The backing medium is disabled or inaccessible.
    #[error("storage is unavailable")]
    Unavailable,
    /// The backing medium refused the write for lack of space.
    #[error("storage quota exceeded")]
    QuotaExceeded,
}

/// String-keyed persistent storage shared by all components on an origin.
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the medium cannot be read at all;
    /// a missing key is `Ok(None)`.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, overwriting any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the write is rejected.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove the value stored under `key`. Removing a missing key is not
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the medium cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory [`KeyValueStore`]. Clones share the same map, so a test can
/// keep a handle and inspect what a component persisted.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.inner.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.inner.lock().unwrap().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.lock().unwrap().remove(key);
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[path = "storage_test.rs"]
mod tests;

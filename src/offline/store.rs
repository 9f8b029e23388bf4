//! Namespaced cache storage with entry-count and age bounds.
//!
//! DESIGN
//! ======
//! Each namespace is an independently configured bucket of responses keyed
//! by request identity, with last-write-wins semantics. Bounds are enforced
//! lazily: the entry-count cap evicts the oldest-inserted keys on write,
//! and the age cap treats over-age entries as absent on lookup (removing
//! them in passing). There is no background sweep.
//!
//! Namespaces are opened once from static configuration at worker install
//! and stay fixed for the process lifetime; a new worker version opens its
//! own set and purges the rest during activation.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::offline::fetch::Response;

/// Static configuration for one namespace.
#[derive(Clone, Debug)]
pub struct NamespaceConfig {
    pub name: String,
    /// Entry-count cap. `None` means unbounded (precache).
    pub max_entries: Option<usize>,
    /// Age cap. Entries older than this read as absent. `None` disables.
    pub max_age: Option<Duration>,
}

impl NamespaceConfig {
    /// An unbounded namespace.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self { name: name.to_owned(), max_entries: None, max_age: None }
    }

    #[must_use]
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    #[must_use]
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }
}

struct Entry {
    response: Response,
    inserted_at: Instant,
}

struct Namespace {
    config: NamespaceConfig,
    entries: HashMap<String, Entry>,
    /// Keys in insertion order; rewrites move a key to the back.
    order: VecDeque<String>,
}

impl Namespace {
    fn new(config: NamespaceConfig) -> Self {
        Self { config, entries: HashMap::new(), order: VecDeque::new() }
    }

    fn lookup_at(&mut self, key: &str, now: Instant) -> Option<Response> {
        let expired = match self.entries.get(key) {
            Some(entry) => match self.config.max_age {
                Some(max_age) => now.duration_since(entry.inserted_at) > max_age,
                None => false,
            },
            None => return None,
        };
        if expired {
            self.remove(key);
            return None;
        }
        self.entries.get(key).map(|entry| entry.response.clone())
    }

    fn put_at(&mut self, key: &str, response: Response, now: Instant) {
        if self.entries.contains_key(key) {
            self.order.retain(|k| k != key);
        }
        self.order.push_back(key.to_owned());
        self.entries.insert(key.to_owned(), Entry { response, inserted_at: now });

        if let Some(max_entries) = self.config.max_entries {
            while self.order.len() > max_entries {
                if let Some(oldest) = self.order.pop_front() {
                    self.entries.remove(&oldest);
                    debug!(namespace = %self.config.name, key = %oldest, "evicted oldest entry");
                }
            }
        }
    }

    fn remove(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.order.retain(|k| k != key);
        }
    }
}

/// All cache namespaces for one worker instance. Shared across concurrent
/// in-flight fetch events; every operation takes the single lock briefly.
#[derive(Default)]
pub struct CacheStorage {
    namespaces: Mutex<HashMap<String, Namespace>>,
}

impl CacheStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a namespace. Opening an existing name keeps the original
    /// configuration and contents.
    pub fn open(&self, config: NamespaceConfig) {
        let mut namespaces = self.namespaces.lock().unwrap_or_else(PoisonError::into_inner);
        namespaces.entry(config.name.clone()).or_insert_with(|| Namespace::new(config));
    }

    /// Read an entry, honoring the namespace age bound at `now`.
    #[must_use]
    pub fn lookup_at(&self, namespace: &str, key: &str, now: Instant) -> Option<Response> {
        let mut namespaces = self.namespaces.lock().unwrap_or_else(PoisonError::into_inner);
        namespaces.get_mut(namespace)?.lookup_at(key, now)
    }

    /// Read an entry against the current time.
    #[must_use]
    pub fn lookup(&self, namespace: &str, key: &str) -> Option<Response> {
        self.lookup_at(namespace, key, Instant::now())
    }

    /// Write an entry stamped `now`, overwriting any previous value and
    /// enforcing the entry-count cap. Writes to an unopened namespace are
    /// dropped with a warning; strategies only reference configured names.
    pub fn put_at(&self, namespace: &str, key: &str, response: Response, now: Instant) {
        let mut namespaces = self.namespaces.lock().unwrap_or_else(PoisonError::into_inner);
        match namespaces.get_mut(namespace) {
            Some(ns) => ns.put_at(key, response, now),
            None => warn!(namespace, key, "dropping write to unopened cache namespace"),
        }
    }

    /// Write an entry stamped with the current time.
    pub fn put(&self, namespace: &str, key: &str, response: Response) {
        self.put_at(namespace, key, response, Instant::now());
    }

    /// Entry count, including entries an age-aware lookup would skip.
    #[must_use]
    pub fn len(&self, namespace: &str) -> usize {
        let namespaces = self.namespaces.lock().unwrap_or_else(PoisonError::into_inner);
        namespaces.get(namespace).map_or(0, |ns| ns.entries.len())
    }

    #[must_use]
    pub fn is_empty(&self, namespace: &str) -> bool {
        self.len(namespace) == 0
    }

    /// Keys in insertion order.
    #[must_use]
    pub fn keys(&self, namespace: &str) -> Vec<String> {
        let namespaces = self.namespaces.lock().unwrap_or_else(PoisonError::into_inner);
        namespaces.get(namespace).map_or_else(Vec::new, |ns| ns.order.iter().cloned().collect())
    }

    /// Names of all open namespaces, unordered.
    #[must_use]
    pub fn namespace_names(&self) -> Vec<String> {
        self.namespaces.lock().unwrap_or_else(PoisonError::into_inner).keys().cloned().collect()
    }

    /// Drop every namespace whose name is not in `keep`. Runs during
    /// worker activation to clear previous-version buckets.
    pub fn purge_except(&self, keep: &[&str]) {
        let mut namespaces = self.namespaces.lock().unwrap_or_else(PoisonError::into_inner);
        namespaces.retain(|name, _| {
            let kept = keep.contains(&name.as_str());
            if !kept {
                debug!(namespace = %name, "purging stale cache namespace");
            }
            kept
        });
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;

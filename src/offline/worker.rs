//! Worker lifecycle: install-time precache, route dispatch, offline fallback.
//!
//! ARCHITECTURE
//! ============
//! One [`OfflineWorker`] instance serves every page of an origin from its
//! own background context. Install precaches a static manifest and the
//! offline fallback document; activation purges namespaces left behind by
//! a previous worker version; after that every intercepted request flows
//! through [`OfflineWorker::handle_fetch`], which routes it by class:
//!
//! - navigations → network-first in `pages`
//! - styles and scripts → stale-while-revalidate in `assets`
//! - images → cache-first in `images`
//! - fonts, audio, video, and screenshot URLs → cache-first in `other-assets`
//! - everything else → straight to the network, uncached
//!
//! A failed navigation is the only place the offline fallback substitutes:
//! first the precached copy of the requested page, then the fallback
//! document. Subresource failures propagate to the requester.
//!
//! ERROR HANDLING
//! ==============
//! Install is best-effort per manifest entry; a dead network at install
//! time yields an empty precache and a logged warning per entry, never an
//! aborted install.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::offline::fetch::{Destination, Network, NetworkError, Request, Response};
use crate::offline::store::{CacheStorage, NamespaceConfig};
use crate::offline::strategy::Strategy;

/// Namespace holding install-time precached resources.
pub const PRECACHE_NAMESPACE: &str = "precache";
/// Namespace holding only the offline fallback document.
pub const OFFLINE_NAMESPACE: &str = "offline";
/// Namespace for navigated pages.
pub const PAGES_NAMESPACE: &str = "pages";
/// Namespace for styles and scripts.
pub const ASSETS_NAMESPACE: &str = "assets";
/// Namespace for images.
pub const IMAGES_NAMESPACE: &str = "images";
/// Namespace for fonts, audio, video, and screenshots.
pub const OTHER_ASSETS_NAMESPACE: &str = "other-assets";

/// Default offline fallback document URL.
pub const DEFAULT_OFFLINE_FALLBACK: &str = "/offline.html";

const PAGES_MAX_ENTRIES: usize = 50;
const PAGES_MAX_AGE: Duration = Duration::from_secs(30 * 24 * 60 * 60);
const ASSETS_MAX_ENTRIES: usize = 60;
const ASSETS_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);
const IMAGES_MAX_ENTRIES: usize = 60;
const IMAGES_MAX_AGE: Duration = Duration::from_secs(30 * 24 * 60 * 60);
const OTHER_ASSETS_MAX_ENTRIES: usize = 30;
const OTHER_ASSETS_MAX_AGE: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// One precache manifest entry. The revision rides along so a build can
/// stamp content versions; install rewrites every entry regardless.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrecacheEntry {
    pub url: String,
    pub revision: String,
}

impl PrecacheEntry {
    #[must_use]
    pub fn new(url: &str, revision: &str) -> Self {
        Self { url: url.to_owned(), revision: revision.to_owned() }
    }
}

/// Parse a JSON precache manifest: `[{"url": "...", "revision": "..."}]`.
///
/// # Errors
///
/// Returns the underlying `serde_json` error for malformed input.
pub fn parse_manifest(json: &str) -> Result<Vec<PrecacheEntry>, serde_json::Error> {
    serde_json::from_str(json)
}

type Matcher = Box<dyn Fn(&Request) -> bool + Send + Sync>;

/// Ordered matcher→strategy table. The first matching route wins; an
/// unmatched request is not intercepted.
#[derive(Default)]
pub struct Router {
    routes: Vec<(Matcher, Strategy)>,
}

impl Router {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard site table described in the module docs.
    #[must_use]
    pub fn site_defaults() -> Self {
        let mut router = Self::new();
        router.register(Request::is_navigation, Strategy::network_first(PAGES_NAMESPACE));
        router.register(
            |r| matches!(r.destination, Destination::Style | Destination::Script),
            Strategy::stale_while_revalidate(ASSETS_NAMESPACE),
        );
        router.register(
            |r| r.destination == Destination::Image,
            Strategy::cache_first(IMAGES_NAMESPACE),
        );
        router.register(
            |r| {
                matches!(r.destination, Destination::Font | Destination::Audio | Destination::Video)
                    || r.url.contains("/screenshots/")
            },
            Strategy::cache_first(OTHER_ASSETS_NAMESPACE),
        );
        router
    }

    /// Append a route. Registration order is match order.
    pub fn register(
        &mut self,
        matcher: impl Fn(&Request) -> bool + Send + Sync + 'static,
        strategy: Strategy,
    ) {
        self.routes.push((Box::new(matcher), strategy));
    }

    /// First strategy whose matcher accepts `request`, if any.
    #[must_use]
    pub fn route(&self, request: &Request) -> Option<&Strategy> {
        self.routes.iter().find(|(matches, _)| matches(request)).map(|(_, strategy)| strategy)
    }
}

/// The offline cache manager.
pub struct OfflineWorker {
    store: Arc<CacheStorage>,
    network: Arc<dyn Network>,
    router: Router,
    offline_fallback: String,
}

impl OfflineWorker {
    /// A worker with the standard route table and namespace bounds.
    #[must_use]
    pub fn new(network: Arc<dyn Network>) -> Self {
        Self::with_router(network, Router::site_defaults())
    }

    /// A worker with a custom route table. The standard namespaces are
    /// still opened; open extra ones through [`OfflineWorker::store`].
    #[must_use]
    pub fn with_router(network: Arc<dyn Network>, router: Router) -> Self {
        let store = Arc::new(CacheStorage::new());
        store.open(NamespaceConfig::new(PRECACHE_NAMESPACE));
        store.open(NamespaceConfig::new(OFFLINE_NAMESPACE));
        store.open(
            NamespaceConfig::new(PAGES_NAMESPACE)
                .with_max_entries(PAGES_MAX_ENTRIES)
                .with_max_age(PAGES_MAX_AGE),
        );
        store.open(
            NamespaceConfig::new(ASSETS_NAMESPACE)
                .with_max_entries(ASSETS_MAX_ENTRIES)
                .with_max_age(ASSETS_MAX_AGE),
        );
        store.open(
            NamespaceConfig::new(IMAGES_NAMESPACE)
                .with_max_entries(IMAGES_MAX_ENTRIES)
                .with_max_age(IMAGES_MAX_AGE),
        );
        store.open(
            NamespaceConfig::new(OTHER_ASSETS_NAMESPACE)
                .with_max_entries(OTHER_ASSETS_MAX_ENTRIES)
                .with_max_age(OTHER_ASSETS_MAX_AGE),
        );
        Self {
            store,
            network,
            router,
            offline_fallback: DEFAULT_OFFLINE_FALLBACK.to_owned(),
        }
    }

    /// Override the offline fallback document URL.
    pub fn set_offline_fallback(&mut self, url: &str) {
        url.clone_into(&mut self.offline_fallback);
    }

    /// The worker's cache storage, shared with in-flight strategies.
    #[must_use]
    pub fn store(&self) -> &Arc<CacheStorage> {
        &self.store
    }

    /// Install phase: precache the manifest and the offline fallback.
    /// Best-effort per entry; returns how many entries were precached.
    pub async fn install(&self, manifest: &[PrecacheEntry]) -> usize {
        let mut precached = 0;
        for entry in manifest {
            let request = Request::get(&entry.url);
            match self.network.fetch(&request).await {
                Ok(response) if response.is_ok() => {
                    self.store.put(PRECACHE_NAMESPACE, &request.cache_key(), response);
                    precached += 1;
                }
                Ok(response) => {
                    warn!(url = %entry.url, status = response.status, "skipping precache entry");
                }
                Err(e) => {
                    warn!(url = %entry.url, error = %e, "failed to precache entry");
                }
            }
        }

        let fallback = Request::get(&self.offline_fallback);
        match self.network.fetch(&fallback).await {
            Ok(response) if response.is_ok() => {
                self.store.put(OFFLINE_NAMESPACE, &fallback.cache_key(), response);
            }
            Ok(response) => {
                warn!(url = %self.offline_fallback, status = response.status,
                    "offline fallback unavailable");
            }
            Err(e) => {
                warn!(url = %self.offline_fallback, error = %e, "offline fallback unavailable");
            }
        }

        info!(precached, total = manifest.len(), "worker install complete");
        precached
    }

    /// Activation phase: purge namespaces a previous worker version left
    /// behind.
    pub fn activate(&self) {
        self.store.purge_except(&[
            PRECACHE_NAMESPACE,
            OFFLINE_NAMESPACE,
            PAGES_NAMESPACE,
            ASSETS_NAMESPACE,
            IMAGES_NAMESPACE,
            OTHER_ASSETS_NAMESPACE,
        ]);
        info!("worker activated");
    }

    /// Resolve one intercepted request. Failed navigations fall back to
    /// the precached copy of the page, then the offline fallback document;
    /// that path is the only guaranteed-success one once install has run.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError`] when no cached, precached, or live
    /// response exists for the request.
    pub async fn handle_fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        let Some(strategy) = self.router.route(request) else {
            // Not intercepted: browser-default behavior, no caching.
            return self.network.fetch(request).await;
        };

        let result = strategy.handle(request, &self.store, &self.network).await;
        if !request.is_navigation() {
            return result;
        }
        result.or_else(|e| self.navigation_fallback(request).ok_or(e))
    }

    fn navigation_fallback(&self, request: &Request) -> Option<Response> {
        if let Some(precached) = self.store.lookup(PRECACHE_NAMESPACE, &request.cache_key()) {
            return Some(precached);
        }
        let fallback_key = Request::get(&self.offline_fallback).cache_key();
        self.store
            .lookup(OFFLINE_NAMESPACE, &fallback_key)
            .or_else(|| self.store.lookup(PRECACHE_NAMESPACE, &fallback_key))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[path = "worker_test.rs"]
mod tests;

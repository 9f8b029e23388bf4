//! Caching strategies: the read/write ordering policy per request class.
//!
//! DESIGN
//! ======
//! Three policies, reimplemented directly rather than delegated to a
//! caching framework:
//!
//! - **cache-first** — serve the cached copy without touching the network;
//!   on a miss, fetch once, cache successful responses, return.
//! - **network-first** — always try the network first and cache successful
//!   responses; only a network *error* falls back to the cached copy, so
//!   stale content is never served while the network is reachable.
//! - **stale-while-revalidate** — serve the cached copy immediately and
//!   refresh it from the network in a background task whose failure is
//!   absorbed; a miss blocks on the network once.
//!
//! Only 2xx responses are written to cache under any policy. Concurrent
//! writes to the same key need no coordination beyond the store's
//! last-write-wins keys.

use std::sync::Arc;

use tracing::debug;

use crate::offline::fetch::{Network, NetworkError, Request, Response};
use crate::offline::store::CacheStorage;

/// Which read/write ordering a [`Strategy`] applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrategyKind {
    CacheFirst,
    NetworkFirst,
    StaleWhileRevalidate,
}

/// A strategy bound to the namespace it reads and writes.
#[derive(Clone, Debug)]
pub struct Strategy {
    kind: StrategyKind,
    namespace: String,
}

impl Strategy {
    #[must_use]
    pub fn cache_first(namespace: &str) -> Self {
        Self { kind: StrategyKind::CacheFirst, namespace: namespace.to_owned() }
    }

    #[must_use]
    pub fn network_first(namespace: &str) -> Self {
        Self { kind: StrategyKind::NetworkFirst, namespace: namespace.to_owned() }
    }

    #[must_use]
    pub fn stale_while_revalidate(namespace: &str) -> Self {
        Self { kind: StrategyKind::StaleWhileRevalidate, namespace: namespace.to_owned() }
    }

    #[must_use]
    pub fn kind(&self) -> StrategyKind {
        self.kind
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Resolve `request` under this strategy.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError`] when neither cache nor network produced a
    /// response. Offline-fallback substitution for navigations happens a
    /// layer up, not here.
    pub async fn handle(
        &self,
        request: &Request,
        store: &Arc<CacheStorage>,
        network: &Arc<dyn Network>,
    ) -> Result<Response, NetworkError> {
        match self.kind {
            StrategyKind::CacheFirst => self.cache_first_handle(request, store, network).await,
            StrategyKind::NetworkFirst => self.network_first_handle(request, store, network).await,
            StrategyKind::StaleWhileRevalidate => {
                self.stale_while_revalidate_handle(request, store, network).await
            }
        }
    }

    async fn cache_first_handle(
        &self,
        request: &Request,
        store: &Arc<CacheStorage>,
        network: &Arc<dyn Network>,
    ) -> Result<Response, NetworkError> {
        let key = request.cache_key();
        if let Some(cached) = store.lookup(&self.namespace, &key) {
            debug!(namespace = %self.namespace, url = %request.url, "cache-first hit");
            return Ok(cached);
        }
        let response = network.fetch(request).await?;
        if response.is_ok() {
            store.put(&self.namespace, &key, response.clone());
        }
        Ok(response)
    }

    async fn network_first_handle(
        &self,
        request: &Request,
        store: &Arc<CacheStorage>,
        network: &Arc<dyn Network>,
    ) -> Result<Response, NetworkError> {
        let key = request.cache_key();
        match network.fetch(request).await {
            Ok(response) => {
                if response.is_ok() {
                    store.put(&self.namespace, &key, response.clone());
                }
                Ok(response)
            }
            Err(e) => {
                debug!(namespace = %self.namespace, url = %request.url, error = %e,
                    "network-first falling back to cache");
                store.lookup(&self.namespace, &key).ok_or(e)
            }
        }
    }

    async fn stale_while_revalidate_handle(
        &self,
        request: &Request,
        store: &Arc<CacheStorage>,
        network: &Arc<dyn Network>,
    ) -> Result<Response, NetworkError> {
        let key = request.cache_key();
        if let Some(cached) = store.lookup(&self.namespace, &key) {
            spawn_revalidate(
                self.namespace.clone(),
                request.clone(),
                Arc::clone(store),
                Arc::clone(network),
            );
            return Ok(cached);
        }
        // No copy to serve stale: block on the network once.
        let response = network.fetch(request).await?;
        if response.is_ok() {
            store.put(&self.namespace, &key, response.clone());
        }
        Ok(response)
    }
}

/// Refresh a cache entry in the background. Failures are absorbed: the
/// caller already has a response in hand.
fn spawn_revalidate(
    namespace: String,
    request: Request,
    store: Arc<CacheStorage>,
    network: Arc<dyn Network>,
) {
    tokio::spawn(async move {
        match network.fetch(&request).await {
            Ok(response) if response.is_ok() => {
                store.put(&namespace, &request.cache_key(), response);
            }
            Ok(response) => {
                debug!(namespace = %namespace, url = %request.url, status = response.status,
                    "revalidation returned error status; keeping cached copy");
            }
            Err(e) => {
                debug!(namespace = %namespace, url = %request.url, error = %e,
                    "revalidation failed; keeping cached copy");
            }
        }
    });
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[path = "strategy_test.rs"]
mod tests;

//! Offline cache manager.
//!
//! Intercepts resource requests for an origin and serves them per
//! resource-class strategy, with bounded namespaces and an offline
//! fallback for navigations. See [`worker::OfflineWorker`] for the
//! lifecycle entry points.

pub mod fetch;
pub mod store;
pub mod strategy;
pub mod worker;

pub use fetch::{
    Destination, FixedNetwork, Method, Network, NetworkError, Request, RequestMode, Response,
};
pub use store::{CacheStorage, NamespaceConfig};
pub use strategy::{Strategy, StrategyKind};
pub use worker::{OfflineWorker, PrecacheEntry, Router, parse_manifest};

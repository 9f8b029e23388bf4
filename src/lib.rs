//! # sitekit
//!
//! Host-agnostic core for an offline-first static site: a service-worker
//! cache manager (per-class caching strategies, bounded namespaces,
//! install-time precache, offline fallback) and the client-side preference
//! components (theme toggle, cookie consent) that persist user choices and
//! rebroadcast changes.
//!
//! Browser concerns are injected at the seams — storage, the system
//! color-scheme signal, and the network are traits, so the state machines
//! run and test anywhere. A thin browser shim adapts `localStorage`,
//! `matchMedia`, and fetch events to them and drives component lifecycles.

pub mod consent;
pub mod offline;
pub mod signal;
pub mod storage;
pub mod theme;

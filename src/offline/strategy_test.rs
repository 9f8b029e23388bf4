use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::offline::fetch::{Destination, FixedNetwork};
use crate::offline::store::NamespaceConfig;

fn harness(namespace: &str) -> (Arc<CacheStorage>, FixedNetwork, Arc<dyn Network>) {
    let store = Arc::new(CacheStorage::new());
    store.open(NamespaceConfig::new(namespace));
    let network = FixedNetwork::new();
    let dyn_network: Arc<dyn Network> = Arc::new(network.clone());
    (store, network, dyn_network)
}

/// Let spawned revalidation tasks run to completion.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

// =============================================================================
// CACHE-FIRST
// =============================================================================

#[tokio::test]
async fn cache_first_fetches_once_then_serves_cache() {
    let (store, network, dyn_network) = harness("images");
    network.serve("/logo.png", Response::ok(b"png"));
    let strategy = Strategy::cache_first("images");
    let request = Request::get("/logo.png").with_destination(Destination::Image);

    let first = strategy.handle(&request, &store, &dyn_network).await.unwrap();
    let second = strategy.handle(&request, &store, &dyn_network).await.unwrap();

    assert_eq!(first.body, b"png");
    assert_eq!(second.body, b"png");
    // The second request never touched the network.
    assert_eq!(network.request_count("/logo.png"), 1);
    assert_eq!(store.len("images"), 1);
}

#[tokio::test]
async fn cache_first_miss_propagates_network_error() {
    let (store, network, dyn_network) = harness("images");
    network.set_offline(true);
    let strategy = Strategy::cache_first("images");

    let result = strategy.handle(&Request::get("/logo.png"), &store, &dyn_network).await;
    assert!(matches!(result, Err(NetworkError::Offline)));
}

#[tokio::test]
async fn cache_first_does_not_cache_error_statuses() {
    let (store, network, dyn_network) = harness("images");
    network.serve("/missing.png", Response::with_status(404));
    let strategy = Strategy::cache_first("images");
    let request = Request::get("/missing.png");

    assert_eq!(strategy.handle(&request, &store, &dyn_network).await.unwrap().status, 404);
    assert_eq!(strategy.handle(&request, &store, &dyn_network).await.unwrap().status, 404);
    // Both requests reached the network; nothing was cached.
    assert_eq!(network.request_count("/missing.png"), 2);
    assert!(store.is_empty("images"));
}

// =============================================================================
// NETWORK-FIRST
// =============================================================================

#[tokio::test]
async fn network_first_never_serves_stale_when_network_reachable() {
    let (store, network, dyn_network) = harness("pages");
    let request = Request::navigation("/about.html");
    store.put("pages", &request.cache_key(), Response::ok(b"stale"));
    network.serve("/about.html", Response::ok(b"fresh"));
    let strategy = Strategy::network_first("pages");

    let response = strategy.handle(&request, &store, &dyn_network).await.unwrap();
    assert_eq!(response.body, b"fresh");
    // The fresh copy replaced the stale one.
    assert_eq!(store.lookup("pages", &request.cache_key()).unwrap().body, b"fresh");
}

#[tokio::test]
async fn network_first_serves_cache_when_offline() {
    let (store, network, dyn_network) = harness("pages");
    let request = Request::navigation("/about.html");
    network.serve("/about.html", Response::ok(b"page"));
    let strategy = Strategy::network_first("pages");

    strategy.handle(&request, &store, &dyn_network).await.unwrap();
    network.set_offline(true);

    let response = strategy.handle(&request, &store, &dyn_network).await.unwrap();
    assert_eq!(response.body, b"page");
    // The network attempt still preceded the cache read.
    assert_eq!(network.request_count("/about.html"), 2);
}

#[tokio::test]
async fn network_first_errors_with_no_cache_and_no_network() {
    let (store, network, dyn_network) = harness("pages");
    network.set_offline(true);
    let strategy = Strategy::network_first("pages");

    let result = strategy.handle(&Request::navigation("/new.html"), &store, &dyn_network).await;
    assert!(matches!(result, Err(NetworkError::Offline)));
}

// =============================================================================
// STALE-WHILE-REVALIDATE
// =============================================================================

#[tokio::test]
async fn swr_serves_cached_copy_even_when_offline() {
    let (store, network, dyn_network) = harness("assets");
    let request = Request::get("/app.js").with_destination(Destination::Script);
    store.put("assets", &request.cache_key(), Response::ok(b"cached js"));
    network.set_offline(true);
    let strategy = Strategy::stale_while_revalidate("assets");

    let response = strategy.handle(&request, &store, &dyn_network).await.unwrap();
    assert_eq!(response.body, b"cached js");

    settle().await;
    // A background attempt was made and its failure silently absorbed.
    assert_eq!(network.request_count("/app.js"), 1);
    assert_eq!(store.lookup("assets", &request.cache_key()).unwrap().body, b"cached js");
}

#[tokio::test]
async fn swr_background_refresh_overwrites_entry() {
    let (store, network, dyn_network) = harness("assets");
    let request = Request::get("/app.js").with_destination(Destination::Script);
    store.put("assets", &request.cache_key(), Response::ok(b"old"));
    network.serve("/app.js", Response::ok(b"new"));
    let strategy = Strategy::stale_while_revalidate("assets");

    let response = strategy.handle(&request, &store, &dyn_network).await.unwrap();
    // The stale copy is returned without waiting for the refresh.
    assert_eq!(response.body, b"old");

    settle().await;
    assert_eq!(store.lookup("assets", &request.cache_key()).unwrap().body, b"new");
}

#[tokio::test]
async fn swr_miss_blocks_on_network_once() {
    let (store, network, dyn_network) = harness("assets");
    let request = Request::get("/app.js").with_destination(Destination::Script);
    network.serve("/app.js", Response::ok(b"js"));
    let strategy = Strategy::stale_while_revalidate("assets");

    let response = strategy.handle(&request, &store, &dyn_network).await.unwrap();
    assert_eq!(response.body, b"js");
    assert_eq!(network.request_count("/app.js"), 1);
    assert_eq!(store.len("assets"), 1);
}

#[tokio::test]
async fn swr_miss_with_no_network_propagates_error() {
    let (store, network, dyn_network) = harness("assets");
    network.set_offline(true);
    let strategy = Strategy::stale_while_revalidate("assets");

    let result = strategy.handle(&Request::get("/app.js"), &store, &dyn_network).await;
    assert!(matches!(result, Err(NetworkError::Offline)));
}

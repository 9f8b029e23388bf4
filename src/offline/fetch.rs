//! Request/response model at the fetch-interception boundary.
//!
//! The worker never talks to a real socket; it sees [`Request`] values and
//! resolves them via an injected [`Network`]. A browser shim adapts real
//! fetch events and the real `fetch()` call; [`FixedNetwork`] serves canned
//! responses for tests and offline development.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

/// HTTP method. Cache identity includes the method, so it is explicit even
/// though intercepted traffic is almost always `GET`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Method {
    #[default]
    Get,
    Head,
    Post,
    Put,
    Delete,
}

impl Method {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the request was initiated. Only [`RequestMode::Navigate`] affects
/// routing; the rest exist so the shim can pass requests through unchanged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RequestMode {
    /// Top-level document load.
    Navigate,
    #[default]
    SameOrigin,
    Cors,
    NoCors,
}

/// Resource class the response will be consumed as.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Destination {
    Document,
    Style,
    Script,
    Image,
    Font,
    Audio,
    Video,
    #[default]
    Other,
}

/// An intercepted resource request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub mode: RequestMode,
    pub destination: Destination,
}

impl Request {
    /// A plain `GET` subresource request.
    #[must_use]
    pub fn get(url: &str) -> Self {
        Self {
            method: Method::Get,
            url: url.to_owned(),
            mode: RequestMode::SameOrigin,
            destination: Destination::Other,
        }
    }

    /// A top-level document navigation.
    #[must_use]
    pub fn navigation(url: &str) -> Self {
        Self {
            method: Method::Get,
            url: url.to_owned(),
            mode: RequestMode::Navigate,
            destination: Destination::Document,
        }
    }

    #[must_use]
    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    #[must_use]
    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    /// Normalized cache identity: method plus URL. Namespacing is the
    /// store's concern.
    #[must_use]
    pub fn cache_key(&self) -> String {
        format!("{} {}", self.method, self.url)
    }
}

/// A resolved response: status, headers, body bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    /// A `200 OK` response with the given body.
    #[must_use]
    pub fn ok(body: &[u8]) -> Self {
        Self { status: 200, headers: Vec::new(), body: body.to_vec() }
    }

    /// A bodyless response with the given status.
    #[must_use]
    pub fn with_status(status: u16) -> Self {
        Self { status, headers: Vec::new(), body: Vec::new() }
    }

    /// Whether the status is in the successful range. Only such responses
    /// are written to cache.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Error resolving a request against the network.
#[derive(Debug, Clone, thiserror::Error)]
pub enum NetworkError {
    /// No connectivity at all.
    #[error("network unreachable")]
    Offline,
    /// The request failed below the HTTP layer.
    #[error("request failed: {0}")]
    Failed(String),
}

/// The outbound network boundary.
#[async_trait]
pub trait Network: Send + Sync {
    /// Resolve `request` against the live network.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError`] when no response was obtained at all;
    /// HTTP error statuses come back as `Ok` responses.
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError>;
}

/// Canned [`Network`]: a URL→response table with an offline switch and a
/// request log. Clones share state.
#[derive(Clone, Default)]
pub struct FixedNetwork {
    inner: Arc<Mutex<FixedNetworkState>>,
}

#[derive(Default)]
struct FixedNetworkState {
    routes: HashMap<String, Response>,
    offline: bool,
    log: Vec<String>,
}

impl FixedNetwork {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `response` for `url`.
    pub fn serve(&self, url: &str, response: Response) {
        self.inner.lock().unwrap().routes.insert(url.to_owned(), response);
    }

    /// Stop serving `url`; subsequent fetches fail.
    pub fn drop_route(&self, url: &str) {
        self.inner.lock().unwrap().routes.remove(url);
    }

    /// Simulate losing or regaining connectivity.
    pub fn set_offline(&self, offline: bool) {
        self.inner.lock().unwrap().offline = offline;
    }

    /// URLs fetched so far, in order. Offline attempts are logged too.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.inner.lock().unwrap().log.clone()
    }

    /// How many fetches reached `url`.
    #[must_use]
    pub fn request_count(&self, url: &str) -> usize {
        self.inner.lock().unwrap().log.iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl Network for FixedNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        let mut state = self.inner.lock().unwrap();
        state.log.push(request.url.clone());
        if state.offline {
            return Err(NetworkError::Offline);
        }
        state
            .routes
            .get(&request.url)
            .cloned()
            .ok_or_else(|| NetworkError::Failed(format!("no route for {}", request.url)))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[path = "fetch_test.rs"]
mod tests;

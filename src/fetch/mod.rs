//! Network access — the [`Fetcher`] seam and its `reqwest` implementation.
//!
//! Every strategy reaches the network through a [`Fetcher`]. A fetch either
//! resolves with a [`Response`] of any status (a `404` is still a response) or
//! fails with a [`FetchError`], which the dispatcher treats as "offline".
//!
//! No timeout is applied: a fetch that never settles keeps its caller waiting.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;
use tracing::debug;

use crate::http::{Headers, Request, Response, StatusCode};

const USER_AGENT_VALUE: &str = concat!("swcache/", env!("CARGO_PKG_VERSION"));

/// Request headers that belong to the client connection and are not forwarded.
const SKIPPED_REQUEST_HEADERS: &[&str] = &[
    "host",
    "connection",
    "keep-alive",
    "proxy-connection",
    "transfer-encoding",
    "content-length",
];

/// Errors produced while fetching from the network.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error fetching {url}: {message}")]
    Network { url: String, message: String },

    #[error("failed to read response body from {url}: {message}")]
    Body { url: String, message: String },

    #[error("method {method} cannot be sent over the network")]
    InvalidMethod { method: String },

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Boxed future returned by [`Fetcher::fetch`].
pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<Response, FetchError>> + Send + 'a>>;

/// The network side of every caching strategy.
///
/// Implementations must be `Send + Sync`: a single fetcher is shared by every
/// concurrent request and by detached background refreshes.
pub trait Fetcher: Send + Sync {
    /// Performs `request` against the network.
    ///
    /// Non-success statuses are returned as `Ok`; only transport failures are
    /// errors.
    fn fetch<'a>(&'a self, request: &'a Request) -> FetchFuture<'a>;
}

/// [`Fetcher`] backed by a shared [`reqwest::Client`].
///
/// Redirects are followed the way a browser fetch follows them. The client is
/// built without a request timeout.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Creates a fetcher with its own connection pool.
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT_VALUE)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wraps a preconfigured client (proxies, TLS roots, and so on).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch<'a>(&'a self, request: &'a Request) -> FetchFuture<'a> {
        Box::pin(async move {
            let url = request.url().as_str();
            let method = reqwest::Method::from_bytes(request.method().as_str().as_bytes())
                .map_err(|_| FetchError::InvalidMethod {
                    method: request.method().to_string(),
                })?;

            let mut builder = self.client.request(method, request.url().clone());
            for (name, value) in request.headers().iter() {
                if SKIPPED_REQUEST_HEADERS
                    .iter()
                    .any(|h| name.eq_ignore_ascii_case(h))
                {
                    continue;
                }
                builder = builder.header(name, value);
            }
            if !request.body_bytes().is_empty() {
                builder = builder.body(request.body_bytes().clone());
            }

            debug!(method = %request.method(), url = %url, "fetching from network");
            let upstream = builder.send().await.map_err(|e| FetchError::Network {
                url: url.to_owned(),
                message: e.to_string(),
            })?;

            let status = StatusCode::from_u16(upstream.status().as_u16()).ok_or_else(|| {
                FetchError::Network {
                    url: url.to_owned(),
                    message: format!("invalid status code {}", upstream.status().as_u16()),
                }
            })?;

            let headers = collect_headers(upstream.headers(), url);

            let body = upstream.bytes().await.map_err(|e| FetchError::Body {
                url: url.to_owned(),
                message: e.to_string(),
            })?;

            debug!(url = %url, status = status.as_u16(), bytes = body.len(), "network response");
            Ok(Response::new(status).headers_from(headers).body(body))
        })
    }
}

/// Copies upstream headers into a [`Headers`] snapshot. Values that are not
/// valid UTF-8 cannot be stored and are dropped.
fn collect_headers(upstream: &reqwest::header::HeaderMap, url: &str) -> Headers {
    let mut headers = Headers::with_capacity(upstream.len());
    for (name, value) in upstream {
        match value.to_str() {
            Ok(value) => headers.insert(name.as_str(), value),
            Err(_) => debug!(header = %name, url = %url, "dropping non-UTF-8 response header"),
        }
    }
    headers
}

//! # swcache
//!
//! Offline-first HTTP caching in the style of a browser service worker:
//! versioned named caches plus a dispatcher that answers each `GET` with
//! cache-first, network-first, or stale-while-revalidate depending on its path.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use swcache::{CacheConfig, CacheWorker, HttpFetcher, Request};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let worker = CacheWorker::new(CacheConfig::default(), Arc::new(HttpFetcher::new()?))?;
//!     worker.handle_install().await?;
//!     worker.handle_activate().await;
//!
//!     let response = worker.respond(Request::get("http://127.0.0.1:5000/")?).await;
//!     println!("{}", response.status());
//!     Ok(())
//! }
//! ```

// ── Core ──────────────────────────────────────────────────────────────────────
pub mod cache;
pub mod http;
pub mod worker;

// ── Supporting layers ─────────────────────────────────────────────────────────
pub mod background;
pub mod config;
pub mod fetch;
pub mod server;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use cache::{Cache, CacheError, CacheKey, CacheStorage};
pub use config::{CacheConfig, ConfigError};
pub use fetch::{FetchError, Fetcher, HttpFetcher};
pub use http::{Headers, Method, Request, Response, StatusCode};
pub use server::{Server, ServerError};
pub use worker::{CacheWorker, FetchOutcome, Strategy, WorkerError, WorkerMessage};

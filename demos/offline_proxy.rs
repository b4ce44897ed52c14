//! Runs a caching proxy in front of a local site.
//!
//! ```text
//! RUST_LOG=swcache=debug cargo run --example offline_proxy -- swcache.json
//! curl http://127.0.0.1:8080/static/css/styles.css
//! ```
//!
//! Without a config path the built-in defaults are used (origin
//! `http://127.0.0.1:5000`).

use std::sync::Arc;

use swcache::{CacheConfig, CacheWorker, HttpFetcher, Server};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("swcache=info")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => CacheConfig::from_file(path)?,
        None => CacheConfig::default(),
    };

    let worker = CacheWorker::new(config, Arc::new(HttpFetcher::new()?))?;
    worker.handle_install().await?;
    worker.handle_activate().await;

    let server = Server::bind("127.0.0.1:8080").await?;
    server
        .run_until(Arc::new(worker), async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

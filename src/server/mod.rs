//! Caching proxy front end.
//!
//! Accepts HTTP/1.1 connections with Tokio and answers every request through a
//! shared [`CacheWorker`], the way a browser routes page requests through its
//! service worker. Point a client at the proxy either directly (origin-form
//! requests go to the configured origin) or as an HTTP proxy (absolute-form).

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BytesMut;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::ConfigError;
use crate::http::{
    Response, StatusCode,
    request::{Request, RequestError},
};
use crate::worker::CacheWorker;

/// Errors produced by the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid worker config: {0}")]
    Config(#[from] ConfigError),
}

/// Largest request (head plus body) buffered before answering 413 (8 MiB).
const MAX_REQUEST_SIZE: usize = 8 * 1024 * 1024;

/// Initial read buffer capacity per connection.
const INITIAL_BUF_SIZE: usize = 4096;

/// TCP listener that feeds requests to a [`CacheWorker`].
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use swcache::config::CacheConfig;
/// use swcache::fetch::HttpFetcher;
/// use swcache::server::Server;
/// use swcache::worker::CacheWorker;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let worker = CacheWorker::new(CacheConfig::default(), Arc::new(HttpFetcher::new()?))?;
///     let server = Server::bind("127.0.0.1:8080").await?;
///     server.run(Arc::new(worker)).await?;
///     Ok(())
/// }
/// ```
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Server {
    /// Binds the server to the given TCP address.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address cannot be bound.
    pub async fn bind(addr: impl AsRef<str>) -> Result<Self, ServerError> {
        let addr = addr.as_ref();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: addr.to_owned(),
                source: e,
            })?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serves connections until the process is terminated.
    pub async fn run(self, worker: Arc<CacheWorker>) -> Result<(), ServerError> {
        self.run_until(worker, std::future::pending::<()>()).await
    }

    /// Serves connections until `shutdown` resolves, then waits for pending
    /// background refreshes before returning.
    ///
    /// Connections still open at shutdown are left to finish on their own
    /// tasks.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] if the worker's origin is not a valid URL.
    pub async fn run_until<S>(self, worker: Arc<CacheWorker>, shutdown: S) -> Result<(), ServerError>
    where
        S: Future<Output = ()>,
    {
        let origin = Arc::new(worker.config().origin_url()?);
        info!(address = %self.local_addr, origin = %origin, "swcache proxy listening");
        tokio::pin!(shutdown);

        loop {
            let (stream, peer_addr) = tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        error!(error = %e, "failed to accept connection");
                        continue;
                    }
                },
            };

            debug!(peer = %peer_addr, "connection accepted");
            let worker = Arc::clone(&worker);
            let origin = Arc::clone(&origin);

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, peer_addr, worker, origin).await {
                    warn!(peer = %peer_addr, error = %e, "connection closed with error");
                }
            });
        }

        let settled = worker.settle().await;
        info!(settled, "shutdown: background refreshes settled");
        Ok(())
    }
}

/// Serves one persistent connection until the peer closes or asks for
/// `Connection: close`.
///
/// Requests already buffered are answered before the socket is read again, so
/// pipelined requests sent in one write all get a response.
async fn handle_connection(
    mut stream: TcpStream,
    peer_addr: SocketAddr,
    worker: Arc<CacheWorker>,
    origin: Arc<Url>,
) -> Result<(), std::io::Error> {
    let mut buf = BytesMut::with_capacity(INITIAL_BUF_SIZE);

    loop {
        let (request, body_offset) = match Request::parse(&buf, &origin) {
            Ok(pair) => pair,
            Err(RequestError::Incomplete) => {
                if buf.len() > MAX_REQUEST_SIZE {
                    warn!(
                        peer = %peer_addr,
                        size = buf.len(),
                        "request head too large, sending 413"
                    );
                    return reject_too_large(&mut stream).await;
                }
                if stream.read_buf(&mut buf).await? == 0 {
                    debug!(peer = %peer_addr, "connection closed by peer");
                    break;
                }
                continue;
            }
            Err(e) => {
                warn!(peer = %peer_addr, error = %e, "bad request, sending 400");
                let response =
                    Response::new(StatusCode::BAD_REQUEST).body(format!("Bad Request: {e}"));
                stream.write_all(&response.to_wire(false)).await?;
                break;
            }
        };

        let content_length = request.content_length().unwrap_or(0);
        let Some(total_needed) = body_offset
            .checked_add(content_length)
            .filter(|&total| total <= MAX_REQUEST_SIZE)
        else {
            warn!(peer = %peer_addr, content_length, "request body too large, sending 413");
            return reject_too_large(&mut stream).await;
        };

        if buf.len() < total_needed {
            if stream.read_buf(&mut buf).await? == 0 {
                debug!(peer = %peer_addr, "connection closed mid-body");
                break;
            }
            continue;
        }

        let consumed = buf.split_to(total_needed).freeze();
        let request = request.body(consumed.slice(body_offset..));
        let keep_alive = request.is_keep_alive();

        debug!(
            peer = %peer_addr,
            method = %request.method(),
            url = %request.url(),
            buffered = buf.len(),
            "dispatching request"
        );

        let response = worker.respond(request).await;
        stream.write_all(&response.to_wire(keep_alive)).await?;
        stream.flush().await?;

        if !keep_alive {
            debug!(peer = %peer_addr, "Connection: close, shutting down");
            break;
        }
    }

    Ok(())
}

async fn reject_too_large(stream: &mut TcpStream) -> Result<(), std::io::Error> {
    let response = Response::new(StatusCode::PAYLOAD_TOO_LARGE).body("Request entity too large");
    stream.write_all(&response.to_wire(false)).await?;
    stream.flush().await
}

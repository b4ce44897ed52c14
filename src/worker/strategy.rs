//! The three caching strategies and the rule choosing between them.

use std::fmt;
use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::{CacheWorker, RefreshOutcome, RefreshStatus};
use crate::cache::{Cache, CacheKey};
use crate::config::CacheConfig;
use crate::http::{Request, Response};

/// How a `GET` request is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Static cache, then network. Successful network responses are stored.
    CacheFirst,
    /// Network, then dynamic cache. Successful network responses are stored.
    NetworkFirst,
    /// Dynamic cache immediately, refreshed from the network in the background.
    StaleWhileRevalidate,
}

impl Strategy {
    /// Picks the strategy for a request path. First match wins: the static
    /// prefix, then the API prefix, then everything else.
    ///
    /// # Examples
    ///
    /// ```
    /// use swcache::config::CacheConfig;
    /// use swcache::worker::Strategy;
    ///
    /// let config = CacheConfig::default();
    /// assert_eq!(Strategy::for_path(&config, "/static/css/styles.css"), Strategy::CacheFirst);
    /// assert_eq!(Strategy::for_path(&config, "/api/languages"), Strategy::NetworkFirst);
    /// assert_eq!(Strategy::for_path(&config, "/language/rust"), Strategy::StaleWhileRevalidate);
    /// ```
    pub fn for_path(config: &CacheConfig, path: &str) -> Self {
        if path.starts_with(&config.static_prefix) {
            Self::CacheFirst
        } else if path.starts_with(&config.api_prefix) {
            Self::NetworkFirst
        } else {
            Self::StaleWhileRevalidate
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CacheFirst => "cache-first",
            Self::NetworkFirst => "network-first",
            Self::StaleWhileRevalidate => "stale-while-revalidate",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl CacheWorker {
    pub(super) async fn cache_first(&self, request: Request) -> Response {
        let cache = self.storage.open(&self.config.static_cache).await;
        if let Some(hit) = cache.match_request(&request).await {
            debug!(url = %request.url(), "static cache hit");
            return hit;
        }

        match self.fetcher.fetch(&request).await {
            Ok(response) => {
                if response.is_success() {
                    store(&cache, &request, response.clone()).await;
                }
                response
            }
            Err(e) => {
                warn!(url = %request.url(), error = %e, "cache-first fetch failed, serving offline response");
                Response::offline()
            }
        }
    }

    pub(super) async fn network_first(&self, request: Request) -> Response {
        let cache = self.storage.open(&self.config.dynamic_cache).await;

        match self.fetcher.fetch(&request).await {
            Ok(response) => {
                if response.is_success() {
                    store(&cache, &request, response.clone()).await;
                }
                response
            }
            Err(e) => {
                warn!(url = %request.url(), error = %e, "network failed, trying cache");
                match cache.match_request(&request).await {
                    Some(hit) => hit,
                    None => Response::offline(),
                }
            }
        }
    }

    pub(super) async fn stale_while_revalidate(&self, request: Request) -> Response {
        let cache = self.storage.open(&self.config.dynamic_cache).await;
        let cached = cache.match_request(&request).await;

        let (tx, rx) = oneshot::channel();
        let fetcher = Arc::clone(&self.fetcher);
        let hook = self.refresh_hook.clone();
        let refresh_request = request.clone();

        self.background.spawn(async move {
            let result = fetcher.fetch(&refresh_request).await;
            let status = match &result {
                Ok(response) if response.is_success() => {
                    match cache.put(&refresh_request, response.clone()).await {
                        Ok(()) => RefreshStatus::Updated,
                        Err(e) => RefreshStatus::Failed(e.to_string()),
                    }
                }
                Ok(response) => RefreshStatus::Skipped {
                    status: response.status(),
                },
                Err(e) => RefreshStatus::Failed(e.to_string()),
            };
            debug!(url = %refresh_request.url(), ?status, "background refresh settled");

            // Nobody is listening when a cached copy was already served.
            let _ = tx.send(result);

            if let Some(hook) = hook {
                hook(&RefreshOutcome {
                    key: CacheKey::for_request(&refresh_request),
                    status,
                });
            }
        });

        if let Some(hit) = cached {
            debug!(url = %request.url(), "serving stale copy while revalidating");
            return hit;
        }

        match rx.await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(url = %request.url(), error = %e, "no cached copy and network failed, serving offline response");
                Response::offline()
            }
            Err(_) => {
                warn!(url = %request.url(), "refresh task ended without a result");
                Response::offline()
            }
        }
    }
}

/// Writes a copy into `cache`; a failed write is logged and otherwise ignored.
async fn store(cache: &Cache, request: &Request, response: Response) {
    if let Err(e) = cache.put(request, response).await {
        warn!(cache = %cache.name(), url = %request.url(), error = %e, "cache store failed");
    }
}

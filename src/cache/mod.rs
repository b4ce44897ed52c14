//! Named response caches.
//!
//! [`CacheStorage`] is the registry of every named [`Cache`] the worker owns.
//! A cache maps a [`CacheKey`] (method + URL) to a full [`Response`] snapshot.
//! Entries never expire on their own; a cache is reclaimed wholesale by
//! deleting its name from the storage.
//!
//! Both levels are safe to share across tasks. Locks are only held for the
//! duration of a map operation, never across a network fetch.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use crate::fetch::Fetcher;
use crate::http::{Method, Request, Response};

/// Errors produced by cache writes.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("only GET requests can be cached, got {method}")]
    UnsupportedMethod { method: String },

    #[error("failed to add {url} to cache: {reason}")]
    AddAll { url: String, reason: String },
}

/// Identity of a cache entry: request method plus URL, fragment removed.
///
/// # Examples
///
/// ```
/// use swcache::cache::CacheKey;
/// use swcache::http::Request;
///
/// let a = CacheKey::for_request(&Request::get("http://site.test/page#top").unwrap());
/// let b = CacheKey::for_request(&Request::get("http://site.test/page").unwrap());
/// assert_eq!(a, b);
/// assert_eq!(a.to_string(), "GET http://site.test/page");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    method: Method,
    url: String,
}

impl CacheKey {
    pub fn for_request(request: &Request) -> Self {
        let mut url = request.url().clone();
        url.set_fragment(None);
        Self {
            method: request.method().clone(),
            url: url.into(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// A single named cache of request → response pairs.
#[derive(Debug)]
pub struct Cache {
    name: String,
    entries: RwLock<HashMap<CacheKey, Response>>,
}

impl Cache {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a copy of the stored response for `request`, if any.
    pub async fn match_request(&self, request: &Request) -> Option<Response> {
        let key = CacheKey::for_request(request);
        self.entries.read().await.get(&key).cloned()
    }

    /// Stores `response` under `request`, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// [`CacheError::UnsupportedMethod`] for anything but `GET`.
    pub async fn put(&self, request: &Request, response: Response) -> Result<(), CacheError> {
        let key = Self::cacheable_key(request)?;
        debug!(cache = %self.name, key = %key, status = response.status().as_u16(), "cache put");
        self.entries.write().await.insert(key, response);
        Ok(())
    }

    /// Removes the entry for `request`. Returns `true` if one existed.
    pub async fn delete(&self, request: &Request) -> bool {
        let key = CacheKey::for_request(request);
        self.entries.write().await.remove(&key).is_some()
    }

    pub async fn keys(&self) -> Vec<CacheKey> {
        self.entries.read().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Fetches every request and stores all responses, or stores nothing.
    ///
    /// A transport failure or a non-success status on any single request
    /// aborts the whole operation before anything is written.
    pub async fn add_all(&self, fetcher: &dyn Fetcher, requests: &[Request]) -> Result<(), CacheError> {
        let mut fetched = Vec::with_capacity(requests.len());
        for request in requests {
            let key = Self::cacheable_key(request)?;
            let response = fetcher.fetch(request).await.map_err(|e| CacheError::AddAll {
                url: request.url().to_string(),
                reason: e.to_string(),
            })?;
            if !response.is_success() {
                return Err(CacheError::AddAll {
                    url: request.url().to_string(),
                    reason: format!("bad status {}", response.status()),
                });
            }
            fetched.push((key, response));
        }

        let mut entries = self.entries.write().await;
        for (key, response) in fetched {
            entries.insert(key, response);
        }
        debug!(cache = %self.name, count = requests.len(), "cache add_all complete");
        Ok(())
    }

    fn cacheable_key(request: &Request) -> Result<CacheKey, CacheError> {
        if request.method() != &Method::Get {
            return Err(CacheError::UnsupportedMethod {
                method: request.method().to_string(),
            });
        }
        Ok(CacheKey::for_request(request))
    }
}

/// Registry of named caches, in creation order.
///
/// # Examples
///
/// ```
/// use swcache::cache::CacheStorage;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let storage = CacheStorage::new();
/// storage.open("static-v1").await;
/// storage.open("dynamic-v1").await;
/// assert_eq!(storage.keys().await, vec!["static-v1", "dynamic-v1"]);
///
/// assert!(storage.delete("static-v1").await);
/// assert!(!storage.has("static-v1").await);
/// # }
/// ```
#[derive(Debug, Default)]
pub struct CacheStorage {
    caches: RwLock<Vec<Arc<Cache>>>,
}

impl CacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cache called `name`, creating it on first open.
    pub async fn open(&self, name: &str) -> Arc<Cache> {
        if let Some(cache) = self.find(name).await {
            return cache;
        }
        let mut caches = self.caches.write().await;
        // Another task may have created it between the two locks.
        if let Some(cache) = caches.iter().find(|c| c.name == name) {
            return Arc::clone(cache);
        }
        let cache = Arc::new(Cache::new(name));
        caches.push(Arc::clone(&cache));
        debug!(cache = %name, "cache created");
        cache
    }

    pub async fn has(&self, name: &str) -> bool {
        self.find(name).await.is_some()
    }

    /// Lists cache names in creation order.
    pub async fn keys(&self) -> Vec<String> {
        self.caches
            .read()
            .await
            .iter()
            .map(|c| c.name.clone())
            .collect()
    }

    /// Deletes the cache called `name`. Returns `true` if it existed.
    ///
    /// Handles already obtained through [`open`](Self::open) stay usable but
    /// are no longer reachable from the storage.
    pub async fn delete(&self, name: &str) -> bool {
        let mut caches = self.caches.write().await;
        let before = caches.len();
        caches.retain(|c| c.name != name);
        caches.len() < before
    }

    /// Looks `request` up in every cache, oldest first.
    pub async fn match_any(&self, request: &Request) -> Option<Response> {
        let caches: Vec<Arc<Cache>> = self.caches.read().await.clone();
        for cache in caches {
            if let Some(response) = cache.match_request(request).await {
                return Some(response);
            }
        }
        None
    }

    async fn find(&self, name: &str) -> Option<Arc<Cache>> {
        self.caches
            .read()
            .await
            .iter()
            .find(|c| c.name == name)
            .cloned()
    }
}

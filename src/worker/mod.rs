//! The cache strategy dispatcher.
//!
//! [`CacheWorker`] exposes the lifecycle of an offline-capable service worker
//! as plain async methods:
//!
//! - [`handle_install`](CacheWorker::handle_install) precaches the static
//!   asset list, all or nothing.
//! - [`handle_activate`](CacheWorker::handle_activate) deletes caches left by
//!   previous versions.
//! - [`handle_fetch`](CacheWorker::handle_fetch) answers a request with one of
//!   the three [`Strategy`] variants, or declines it.
//! - [`handle_message`](CacheWorker::handle_message) and
//!   [`handle_periodic_sync`](CacheWorker::handle_periodic_sync) cover the
//!   skip-waiting signal and scheduled cleanup.
//!
//! Fetch handling never fails: the worst outcome is a `503` with body
//! `"Offline"`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

mod strategy;

pub use strategy::Strategy;

use crate::background::BackgroundTasks;
use crate::cache::{CacheError, CacheKey, CacheStorage};
use crate::config::{CacheConfig, ConfigError};
use crate::fetch::Fetcher;
use crate::http::{Method, Request, Response, StatusCode};

/// Periodic-sync tag that triggers a cleanup pass.
pub const CLEANUP_SYNC_TAG: &str = "cache-cleanup";

/// Errors returned by the lifecycle entry points.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("install failed: {0}")]
    Install(#[from] CacheError),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("malformed worker message: {0}")]
    Message(#[from] serde_json::Error),
}

/// Where the worker is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    /// Install failed; this worker version will never activate.
    Redundant,
}

/// A message posted to the worker by a page.
///
/// # Examples
///
/// ```
/// use swcache::worker::WorkerMessage;
///
/// let msg: WorkerMessage = serde_json::from_str(r#"{"type":"SKIP_WAITING"}"#).unwrap();
/// assert_eq!(msg, WorkerMessage::SkipWaiting);
///
/// let other: WorkerMessage = serde_json::from_str(r#"{"type":"PING"}"#).unwrap();
/// assert_eq!(other, WorkerMessage::Unknown);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerMessage {
    /// Activate immediately instead of waiting for old instances to close.
    SkipWaiting,
    #[serde(other)]
    Unknown,
}

/// Result of [`CacheWorker::handle_fetch`].
#[derive(Debug)]
pub enum FetchOutcome {
    /// The worker answered the request.
    Respond(Response),
    /// The worker declined; the caller should use default network handling.
    Fallthrough(Request),
}

impl FetchOutcome {
    /// Returns the response, or `None` for a fall-through.
    pub fn into_response(self) -> Option<Response> {
        match self {
            Self::Respond(response) => Some(response),
            Self::Fallthrough(_) => None,
        }
    }
}

/// How a background refresh ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshStatus {
    /// The dynamic cache now holds the fresh response.
    Updated,
    /// The network answered with a non-success status; the cache is untouched.
    Skipped { status: StatusCode },
    /// The fetch or the cache write failed.
    Failed(String),
}

/// Reported to the [`RefreshHook`] when a background refresh settles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub key: CacheKey,
    pub status: RefreshStatus,
}

/// Callback invoked after each stale-while-revalidate refresh settles.
pub type RefreshHook = Arc<dyn Fn(&RefreshOutcome) + Send + Sync>;

/// Request-intercepting cache dispatcher.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use swcache::config::CacheConfig;
/// use swcache::fetch::HttpFetcher;
/// use swcache::http::Request;
/// use swcache::worker::CacheWorker;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = CacheConfig::default().with_origin("http://127.0.0.1:5000");
///     let worker = CacheWorker::new(config, Arc::new(HttpFetcher::new()?))?;
///
///     worker.handle_install().await?;
///     worker.handle_activate().await;
///
///     let request = Request::get("http://127.0.0.1:5000/static/css/styles.css")?;
///     let response = worker.respond(request).await;
///     println!("{}", response.status());
///
///     worker.settle().await;
///     Ok(())
/// }
/// ```
pub struct CacheWorker {
    config: CacheConfig,
    storage: Arc<CacheStorage>,
    fetcher: Arc<dyn Fetcher>,
    background: BackgroundTasks,
    refresh_hook: Option<RefreshHook>,
    state: RwLock<WorkerState>,
    skip_waiting: AtomicBool,
    claimed: AtomicBool,
}

impl CacheWorker {
    /// Creates a worker over a fresh, empty [`CacheStorage`].
    ///
    /// # Errors
    ///
    /// [`WorkerError::Config`] if `config` fails validation.
    pub fn new(config: CacheConfig, fetcher: Arc<dyn Fetcher>) -> Result<Self, WorkerError> {
        config.validate()?;
        Ok(Self {
            config,
            storage: Arc::new(CacheStorage::new()),
            fetcher,
            background: BackgroundTasks::new(),
            refresh_hook: None,
            state: RwLock::new(WorkerState::Parsed),
            skip_waiting: AtomicBool::new(false),
            claimed: AtomicBool::new(false),
        })
    }

    /// Uses an existing storage, e.g. one left behind by a previous version.
    #[must_use]
    pub fn with_storage(mut self, storage: Arc<CacheStorage>) -> Self {
        self.storage = storage;
        self
    }

    #[must_use]
    pub fn with_refresh_hook(mut self, hook: RefreshHook) -> Self {
        self.refresh_hook = Some(hook);
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<CacheStorage> {
        &self.storage
    }

    pub fn state(&self) -> WorkerState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// `true` once skip-waiting was requested, by install or by a message.
    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    /// `true` once activation has taken control of open clients.
    pub fn claimed(&self) -> bool {
        self.claimed.load(Ordering::SeqCst)
    }

    /// Precaches every configured static asset into the static cache.
    ///
    /// If any asset fails to fetch or answers with a non-success status, no
    /// asset is stored, the worker becomes [`WorkerState::Redundant`], and the
    /// error is returned. On success skip-waiting is requested.
    pub async fn handle_install(&self) -> Result<(), WorkerError> {
        self.set_state(WorkerState::Installing);
        info!(cache = %self.config.static_cache, "installing");

        match self.precache().await {
            Ok(()) => {
                self.set_state(WorkerState::Installed);
                info!("installation complete");
                self.skip_waiting();
                Ok(())
            }
            Err(e) => {
                self.set_state(WorkerState::Redundant);
                warn!(error = %e, "installation failed");
                Err(e)
            }
        }
    }

    /// Deletes caches from previous versions and claims clients.
    ///
    /// Returns the names of the deleted caches.
    pub async fn handle_activate(&self) -> Vec<String> {
        self.set_state(WorkerState::Activating);
        info!("activating");

        let deleted = self.cleanup().await;
        self.claimed.store(true, Ordering::SeqCst);
        self.set_state(WorkerState::Activated);
        info!(deleted = deleted.len(), "activation complete");
        deleted
    }

    /// Answers an intercepted request.
    ///
    /// Only `GET` is intercepted; anything else comes back as
    /// [`FetchOutcome::Fallthrough`] without touching cache or network.
    pub async fn handle_fetch(&self, request: Request) -> FetchOutcome {
        if request.method() != &Method::Get {
            debug!(method = %request.method(), url = %request.url(), "not intercepted");
            return FetchOutcome::Fallthrough(request);
        }

        let strategy = Strategy::for_path(&self.config, request.path());
        debug!(%strategy, url = %request.url(), "routing request");

        let response = match strategy {
            Strategy::CacheFirst => self.cache_first(request).await,
            Strategy::NetworkFirst => self.network_first(request).await,
            Strategy::StaleWhileRevalidate => self.stale_while_revalidate(request).await,
        };
        FetchOutcome::Respond(response)
    }

    /// Resolves a request completely: through [`handle_fetch`](Self::handle_fetch)
    /// when intercepted, straight to the network otherwise. A network failure
    /// on a declined request becomes `502 Bad Gateway`.
    pub async fn respond(&self, request: Request) -> Response {
        match self.handle_fetch(request).await {
            FetchOutcome::Respond(response) => response,
            FetchOutcome::Fallthrough(request) => match self.fetcher.fetch(&request).await {
                Ok(response) => response,
                Err(e) => {
                    warn!(url = %request.url(), error = %e, "pass-through fetch failed");
                    Response::new(StatusCode::BAD_GATEWAY)
                        .header("Content-Type", "text/plain; charset=utf-8")
                        .body(format!("Bad Gateway: {e}"))
                }
            },
        }
    }

    /// Handles a page message. Returns `true` if the message was acted upon.
    pub fn handle_message(&self, message: &WorkerMessage) -> bool {
        match message {
            WorkerMessage::SkipWaiting => {
                self.skip_waiting();
                true
            }
            WorkerMessage::Unknown => false,
        }
    }

    /// Parses a JSON message (`{"type": "..."}`) and handles it.
    pub fn handle_message_json(&self, json: &str) -> Result<bool, WorkerError> {
        let message: WorkerMessage = serde_json::from_str(json)?;
        Ok(self.handle_message(&message))
    }

    /// Runs cleanup for the [`CLEANUP_SYNC_TAG`] tag; ignores every other tag.
    pub async fn handle_periodic_sync(&self, tag: &str) -> Option<Vec<String>> {
        if tag != CLEANUP_SYNC_TAG {
            debug!(tag, "ignoring periodic sync");
            return None;
        }
        let deleted = self.cleanup().await;
        info!(deleted = deleted.len(), "cache cleanup completed");
        Some(deleted)
    }

    /// Deletes every cache whose name is neither the static nor the dynamic
    /// cache name. Returns the deleted names.
    pub async fn cleanup(&self) -> Vec<String> {
        let mut deleted = Vec::new();
        for name in self.storage.keys().await {
            if self.config.is_current_cache(&name) {
                continue;
            }
            info!(cache = %name, "deleting old cache");
            if self.storage.delete(&name).await {
                deleted.push(name);
            }
        }
        deleted
    }

    /// Waits for every outstanding background refresh to finish.
    pub async fn settle(&self) -> usize {
        self.background.settle().await
    }

    fn skip_waiting(&self) {
        self.skip_waiting.store(true, Ordering::SeqCst);
    }

    async fn precache(&self) -> Result<(), WorkerError> {
        let requests = self.config.asset_requests()?;
        let cache = self.storage.open(&self.config.static_cache).await;
        info!(count = requests.len(), "caching static assets");
        cache.add_all(self.fetcher.as_ref(), &requests).await?;
        Ok(())
    }

    fn set_state(&self, state: WorkerState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use tokio::sync::Notify;
    use url::Url;

    use super::*;
    use crate::fetch::{FetchError, FetchFuture};

    const ORIGIN: &str = "http://site.test";

    /// Network double. Answers `200` with `"<path> v<version>"`, `404` for
    /// paths containing `missing`, and fails while offline or for paths
    /// containing `broken`. When gated, each fetch waits for one permit.
    #[derive(Default)]
    struct ScriptedFetcher {
        offline: AtomicBool,
        version: AtomicUsize,
        calls: AtomicUsize,
        gate: Mutex<Option<Arc<Notify>>>,
    }

    impl ScriptedFetcher {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn go_offline(&self) {
            self.offline.store(true, Ordering::SeqCst);
        }

        fn bump_version(&self) {
            self.version.fetch_add(1, Ordering::SeqCst);
        }

        fn gate(&self) -> Arc<Notify> {
            let notify = Arc::new(Notify::new());
            *self.gate.lock().unwrap() = Some(Arc::clone(&notify));
            notify
        }
    }

    impl Fetcher for ScriptedFetcher {
        fn fetch<'a>(&'a self, request: &'a Request) -> FetchFuture<'a> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                let gate = self.gate.lock().unwrap().clone();
                if let Some(gate) = gate {
                    gate.notified().await;
                }

                let path = request.path();
                if self.offline.load(Ordering::SeqCst) || path.contains("broken") {
                    return Err(FetchError::Network {
                        url: request.url().to_string(),
                        message: "connection refused".into(),
                    });
                }
                if path.contains("missing") {
                    return Ok(Response::new(StatusCode::NOT_FOUND).body("not found"));
                }
                let version = self.version.load(Ordering::SeqCst);
                Ok(Response::new(StatusCode::OK).body(format!("{path} v{version}")))
            })
        }
    }

    fn config() -> CacheConfig {
        CacheConfig::default()
            .with_origin(ORIGIN)
            .with_cache_names("static_v1", "dynamic_v1")
            .with_static_assets(["/", "/static/css/styles.css", "/static/js/main.js"])
    }

    fn worker() -> (CacheWorker, Arc<ScriptedFetcher>) {
        let fetcher = Arc::new(ScriptedFetcher::default());
        let worker = CacheWorker::new(config(), fetcher.clone()).unwrap();
        (worker, fetcher)
    }

    fn get(path: &str) -> Request {
        Request::get(&format!("{ORIGIN}{path}")).unwrap()
    }

    async fn body_of(worker: &CacheWorker, path: &str) -> (StatusCode, String) {
        let response = worker
            .handle_fetch(get(path))
            .await
            .into_response()
            .expect("GET must be intercepted");
        (response.status(), response.text().unwrap_or_default().to_owned())
    }

    #[test]
    fn invalid_config_rejected() {
        let fetcher = Arc::new(ScriptedFetcher::default());
        let bad = config().with_cache_names("v1", "v1");
        assert!(matches!(
            CacheWorker::new(bad, fetcher),
            Err(WorkerError::Config(_))
        ));
    }

    #[tokio::test]
    async fn non_get_falls_through_untouched() {
        let (worker, fetcher) = worker();
        let url = Url::parse(&format!("{ORIGIN}/api/comments")).unwrap();
        let request = Request::new(Method::Post, url).body("hi");

        match worker.handle_fetch(request).await {
            FetchOutcome::Fallthrough(req) => assert_eq!(req.method(), &Method::Post),
            FetchOutcome::Respond(_) => panic!("POST must not be intercepted"),
        }
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn cache_first_serves_cached_copy_without_network() {
        let (worker, fetcher) = worker();

        let first = body_of(&worker, "/static/app.js").await;
        assert_eq!(first, (StatusCode::OK, "/static/app.js v0".into()));
        assert_eq!(fetcher.calls(), 1);

        fetcher.bump_version();
        fetcher.go_offline();
        for _ in 0..3 {
            assert_eq!(body_of(&worker, "/static/app.js").await, first);
        }
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn cache_first_does_not_store_error_status() {
        let (worker, fetcher) = worker();

        let (status, _) = body_of(&worker, "/static/missing.png").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        body_of(&worker, "/static/missing.png").await;

        assert_eq!(fetcher.calls(), 2);
        let cache = worker.storage().open("static_v1").await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn cache_first_offline_without_copy() {
        let (worker, fetcher) = worker();
        fetcher.go_offline();

        let (status, body) = body_of(&worker, "/static/app.js").await;
        assert_eq!(status.as_u16(), 503);
        assert_eq!(body, "Offline");
    }

    #[tokio::test]
    async fn network_first_updates_cache_on_every_success() {
        let (worker, fetcher) = worker();
        let cache = worker.storage().open("dynamic_v1").await;

        for version in 0..3 {
            let (_, body) = body_of(&worker, "/api/languages").await;
            let expected = format!("/api/languages v{version}");
            assert_eq!(body, expected);

            let stored = cache.match_request(&get("/api/languages")).await.unwrap();
            assert_eq!(stored.text(), Some(expected.as_str()));
            fetcher.bump_version();
        }
        assert_eq!(fetcher.calls(), 3);
    }

    #[tokio::test]
    async fn network_first_falls_back_to_cache() {
        let (worker, fetcher) = worker();
        body_of(&worker, "/api/languages").await;
        fetcher.go_offline();

        let (status, body) = body_of(&worker, "/api/languages").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "/api/languages v0");

        let (status, body) = body_of(&worker, "/api/other").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body, "Offline");
    }

    #[tokio::test]
    async fn network_first_returns_error_status_unstored() {
        let (worker, _) = worker();
        let (status, _) = body_of(&worker, "/api/missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(worker.storage().open("dynamic_v1").await.is_empty().await);
    }

    #[tokio::test]
    async fn stale_while_revalidate_answers_before_network_resolves() {
        let outcomes = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&outcomes);
        let fetcher = Arc::new(ScriptedFetcher::default());
        let worker = CacheWorker::new(config(), fetcher.clone())
            .unwrap()
            .with_refresh_hook(Arc::new(move |outcome: &RefreshOutcome| {
                sink.lock().unwrap().push(outcome.clone());
            }));

        let cache = worker.storage().open("dynamic_v1").await;
        let page = get("/language/rust");
        cache
            .put(&page, Response::new(StatusCode::OK).body("stale page"))
            .await
            .unwrap();

        let gate = fetcher.gate();
        let response = tokio::time::timeout(Duration::from_secs(1), worker.handle_fetch(page.clone()))
            .await
            .expect("cached copy must not wait for the network")
            .into_response()
            .unwrap();
        assert_eq!(response.text(), Some("stale page"));
        assert!(outcomes.lock().unwrap().is_empty());

        gate.notify_one();
        assert_eq!(worker.settle().await, 1);

        let refreshed = cache.match_request(&page).await.unwrap();
        assert_eq!(refreshed.text(), Some("/language/rust v0"));
        let outcomes = outcomes.lock().unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].status, RefreshStatus::Updated);
        assert_eq!(outcomes[0].key, CacheKey::for_request(&page));
    }

    #[tokio::test]
    async fn stale_while_revalidate_miss_waits_for_network() {
        let (worker, fetcher) = worker();

        let (status, body) = body_of(&worker, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "/ v0");
        assert_eq!(fetcher.calls(), 1);

        worker.settle().await;
        let cache = worker.storage().open("dynamic_v1").await;
        assert!(cache.match_request(&get("/")).await.is_some());
    }

    #[tokio::test]
    async fn stale_while_revalidate_serves_cache_when_offline() {
        let outcomes = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&outcomes);
        let fetcher = Arc::new(ScriptedFetcher::default());
        let worker = CacheWorker::new(config(), fetcher.clone())
            .unwrap()
            .with_refresh_hook(Arc::new(move |outcome: &RefreshOutcome| {
                sink.lock().unwrap().push(outcome.status.clone());
            }));

        body_of(&worker, "/about").await;
        worker.settle().await;
        fetcher.go_offline();

        let (status, body) = body_of(&worker, "/about").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "/about v0");
        worker.settle().await;

        let outcomes = outcomes.lock().unwrap();
        assert_eq!(outcomes[0], RefreshStatus::Updated);
        assert!(matches!(outcomes[1], RefreshStatus::Failed(_)));
    }

    #[tokio::test]
    async fn stale_while_revalidate_offline_without_copy() {
        let (worker, fetcher) = worker();
        fetcher.go_offline();

        let (status, body) = body_of(&worker, "/language/go").await;
        assert_eq!(status.as_u16(), 503);
        assert_eq!(body, "Offline");
    }

    #[tokio::test]
    async fn stale_while_revalidate_keeps_cache_on_error_status() {
        let (worker, _) = worker();
        let cache = worker.storage().open("dynamic_v1").await;
        let page = get("/missing-page");
        cache
            .put(&page, Response::new(StatusCode::OK).body("old"))
            .await
            .unwrap();

        body_of(&worker, "/missing-page").await;
        worker.settle().await;

        let kept = cache.match_request(&page).await.unwrap();
        assert_eq!(kept.text(), Some("old"));
    }

    #[tokio::test]
    async fn install_precaches_static_assets() {
        let (worker, fetcher) = worker();
        assert_eq!(worker.state(), WorkerState::Parsed);

        worker.handle_install().await.unwrap();

        assert_eq!(worker.state(), WorkerState::Installed);
        assert!(worker.skip_waiting_requested());
        let cache = worker.storage().open("static_v1").await;
        assert_eq!(cache.len().await, 3);
        assert_eq!(fetcher.calls(), 3);

        // Precached assets are now served cache-first with no network.
        body_of(&worker, "/static/js/main.js").await;
        assert_eq!(fetcher.calls(), 3);
    }

    #[tokio::test]
    async fn install_is_all_or_nothing() {
        let fetcher = Arc::new(ScriptedFetcher::default());
        let assets = config().with_static_assets([
            "/",
            "/static/css/styles.css",
            "/static/broken.js",
            "/static/js/main.js",
        ]);
        let worker = CacheWorker::new(assets, fetcher).unwrap();

        let err = worker.handle_install().await.unwrap_err();

        assert!(matches!(err, WorkerError::Install(CacheError::AddAll { .. })));
        assert_eq!(worker.state(), WorkerState::Redundant);
        assert!(!worker.skip_waiting_requested());
        assert!(worker.storage().open("static_v1").await.is_empty().await);
    }

    #[tokio::test]
    async fn activate_deletes_old_versions() {
        let storage = Arc::new(CacheStorage::new());
        for name in ["static_v1", "dynamic_v1", "old_v0"] {
            storage.open(name).await;
        }
        let (worker, _) = worker();
        let worker = worker.with_storage(Arc::clone(&storage));

        let deleted = worker.handle_activate().await;

        assert_eq!(deleted, vec!["old_v0"]);
        assert_eq!(storage.keys().await, vec!["static_v1", "dynamic_v1"]);
        assert_eq!(worker.state(), WorkerState::Activated);
        assert!(worker.claimed());
    }

    #[tokio::test]
    async fn periodic_sync_only_on_cleanup_tag() {
        let (worker, _) = worker();
        worker.storage().open("async-pw-static-v0").await;

        assert_eq!(worker.handle_periodic_sync("content-sync").await, None);
        assert!(worker.storage().has("async-pw-static-v0").await);

        let deleted = worker.handle_periodic_sync(CLEANUP_SYNC_TAG).await;
        assert_eq!(deleted, Some(vec!["async-pw-static-v0".to_owned()]));
        assert!(!worker.storage().has("async-pw-static-v0").await);
    }

    #[test]
    fn skip_waiting_message() {
        let (worker, _) = worker();
        assert!(!worker.handle_message_json(r#"{"type":"PING"}"#).unwrap());
        assert!(!worker.skip_waiting_requested());

        assert!(worker.handle_message_json(r#"{"type":"SKIP_WAITING"}"#).unwrap());
        assert!(worker.skip_waiting_requested());

        assert!(matches!(
            worker.handle_message_json("not json"),
            Err(WorkerError::Message(_))
        ));
    }

    #[tokio::test]
    async fn respond_passes_declined_requests_to_network() {
        let (worker, fetcher) = worker();
        let url = Url::parse(&format!("{ORIGIN}/api/comments")).unwrap();

        let response = worker.respond(Request::new(Method::Post, url.clone())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(fetcher.calls(), 1);

        fetcher.go_offline();
        let response = worker.respond(Request::new(Method::Post, url)).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}

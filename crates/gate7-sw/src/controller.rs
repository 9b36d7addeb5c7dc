//! The offline cache controller.
//!
//! One object, four entry points: [`on_install`], [`on_activate`],
//! [`on_fetch`] and [`on_message`]. Hosts call them; the controller never
//! reaches back into the host.
//!
//! [`on_install`]: OfflineCacheController::on_install
//! [`on_activate`]: OfflineCacheController::on_activate
//! [`on_fetch`]: OfflineCacheController::on_fetch
//! [`on_message`]: OfflineCacheController::on_message

use std::sync::{Arc, Mutex};

use futures::future::join_all;
use gate7_common::with_timeout;
use gate7_net::{Destination, Fetcher, Request, Response};
use http::StatusCode;
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::cache::{cache_key, CacheEntry, CacheStorage};
use crate::classify::{classify, Disposition, IgnoreReason};
use crate::config::OfflineConfig;
use crate::fallback;
use crate::lifecycle::{Clients, ServiceWorkerState, WorkerMessage};
use crate::response::FetchResponse;
use crate::SwError;

/// What the host should do with an intercepted fetch.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// Not handled; let the default network path run.
    Passthrough(IgnoreReason),
    /// Answer the page with this response.
    Respond(FetchResponse),
}

impl FetchOutcome {
    pub fn response(&self) -> Option<&FetchResponse> {
        match self {
            FetchOutcome::Respond(response) => Some(response),
            FetchOutcome::Passthrough(_) => None,
        }
    }

    pub fn into_response(self) -> Option<FetchResponse> {
        match self {
            FetchOutcome::Respond(response) => Some(response),
            FetchOutcome::Passthrough(_) => None,
        }
    }
}

/// Result of the install step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    /// Cache version populated.
    pub cache_name: String,
    /// Manifest entries now cached.
    pub cached: Vec<String>,
    /// Manifest entries that could not be fetched.
    pub failed: Vec<String>,
}

/// Result of the activate step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivateReport {
    /// Stale cache versions deleted.
    pub deleted: Vec<String>,
    /// Clients newly controlled.
    pub claimed: Vec<String>,
}

#[derive(Debug, Default)]
struct Lifecycle {
    state: ServiceWorkerState,
    skip_waiting: bool,
    clients: Clients,
}

/// Offline cache controller for one site origin.
pub struct OfflineCacheController {
    config: Arc<OfflineConfig>,
    fetcher: Arc<dyn Fetcher>,
    caches: Arc<RwLock<CacheStorage>>,
    lifecycle: RwLock<Lifecycle>,
    writes: Mutex<JoinSet<()>>,
}

impl OfflineCacheController {
    /// Create a controller with empty cache storage.
    pub fn new(config: OfflineConfig, fetcher: Arc<dyn Fetcher>) -> Self {
        Self::with_storage(config, fetcher, CacheStorage::new())
    }

    /// Create a controller over previously persisted cache storage.
    pub fn with_storage(
        config: OfflineConfig,
        fetcher: Arc<dyn Fetcher>,
        storage: CacheStorage,
    ) -> Self {
        Self {
            config: Arc::new(config),
            fetcher,
            caches: Arc::new(RwLock::new(storage)),
            lifecycle: RwLock::new(Lifecycle::default()),
            writes: Mutex::new(JoinSet::new()),
        }
    }

    pub fn config(&self) -> &OfflineConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> ServiceWorkerState {
        self.lifecycle.read().await.state
    }

    /// Whether the worker asked to skip the waiting phase.
    pub async fn skip_waiting_requested(&self) -> bool {
        self.lifecycle.read().await.skip_waiting
    }

    /// Copy of the cache storage, for persistence and inspection.
    pub async fn snapshot(&self) -> CacheStorage {
        self.caches.read().await.clone()
    }

    /// Register an open page. Returns its client ID.
    pub async fn open_client(&self, url: Url) -> String {
        self.lifecycle.write().await.clients.open(url)
    }

    pub async fn controls(&self, client_id: &str) -> bool {
        self.lifecycle.read().await.clients.is_controlled(client_id)
    }

    // ==================== Lifecycle ====================

    /// Install: open the current cache version and pre-cache the manifest.
    ///
    /// Never fails as a whole. Assets that cannot be fetched are logged and
    /// left to be cached lazily on first use.
    pub async fn on_install(&self) -> InstallReport {
        self.set_state(ServiceWorkerState::Installing).await;
        info!(cache = %self.config.cache_name, assets = self.config.manifest.len(), "Installing");

        self.caches.write().await.open(&self.config.cache_name);

        let fetches = self.config.manifest.iter().map(|path| async move {
            let outcome = match self.config.resolve(path) {
                Ok(url) => self.fetch_asset(url).await,
                Err(e) => Err(e),
            };
            (path.clone(), outcome)
        });
        let results = join_all(fetches).await;

        let mut report = InstallReport {
            cache_name: self.config.cache_name.clone(),
            ..Default::default()
        };

        {
            let mut caches = self.caches.write().await;
            let cache = caches.open(&self.config.cache_name);
            for (path, outcome) in results {
                match outcome.and_then(|entry| cache.put(entry)) {
                    Ok(()) => report.cached.push(path),
                    Err(e) => {
                        warn!(
                            path = %path,
                            category = e.category(),
                            error = %e,
                            "Failed to pre-cache asset"
                        );
                        report.failed.push(path);
                    }
                }
            }
        }

        if report.failed.is_empty() {
            info!(cached = report.cached.len(), "App shell cached");
        } else {
            error!(
                cached = report.cached.len(),
                failed = report.failed.len(),
                "App shell partially cached"
            );
        }

        self.set_state(ServiceWorkerState::Installed).await;
        self.skip_waiting().await;
        report
    }

    async fn fetch_asset(&self, url: Url) -> Result<CacheEntry, SwError> {
        let response = self.fetcher.fetch(Request::get(url.clone())).await?;
        if response.status != StatusCode::OK {
            return Err(SwError::cache(format!(
                "{} answered {}",
                url, response.status
            )));
        }
        Ok(CacheEntry::from_response(&response, &url))
    }

    /// Activate: delete every cache version except the current one, then
    /// claim all open clients.
    pub async fn on_activate(&self) -> ActivateReport {
        self.set_state(ServiceWorkerState::Activating).await;
        info!(cache = %self.config.cache_name, "Activating");

        let deleted = {
            let mut caches = self.caches.write().await;
            let stale: Vec<String> = caches
                .keys()
                .into_iter()
                .filter(|name| *name != self.config.cache_name)
                .map(str::to_string)
                .collect();
            for name in &stale {
                info!(cache = %name, "Deleting old cache");
                caches.delete(name);
            }
            stale
        };

        let claimed = {
            let mut lifecycle = self.lifecycle.write().await;
            lifecycle.state = ServiceWorkerState::Activated;
            lifecycle.skip_waiting = false;
            lifecycle.clients.claim()
        };
        debug!(claimed = claimed.len(), "Clients claimed");

        ActivateReport { deleted, claimed }
    }

    /// Handle a message posted by a page.
    pub async fn on_message(&self, data: &str) -> Option<WorkerMessage> {
        let message = WorkerMessage::parse(data)?;
        match message {
            WorkerMessage::SkipWaiting => self.skip_waiting().await,
        }
        Some(message)
    }

    /// Take the worker out of service once its host stops. A redundant
    /// worker never sees another fetch and drops control of its clients.
    pub async fn retire(&self) {
        let mut lifecycle = self.lifecycle.write().await;
        lifecycle.state = ServiceWorkerState::Redundant;
        lifecycle.skip_waiting = false;
        lifecycle.clients = Clients::default();
        info!(cache = %self.config.cache_name, "Worker is redundant");
    }

    async fn skip_waiting(&self) {
        self.lifecycle.write().await.skip_waiting = true;
    }

    async fn set_state(&self, state: ServiceWorkerState) {
        self.lifecycle.write().await.state = state;
        debug!(%state, "Worker state changed");
    }

    // ==================== Fetch ====================

    /// Handle one intercepted request.
    ///
    /// Classification happens before any I/O. Every intercepted request
    /// resolves to some response; failures never reach the page.
    pub async fn on_fetch(&self, request: Request) -> FetchOutcome {
        let disposition = classify(&request, &self.config);
        debug!(url = %request.url, %disposition, "Classified request");

        match disposition {
            Disposition::Ignore(reason) => FetchOutcome::Passthrough(reason),
            Disposition::CacheFirst => FetchOutcome::Respond(self.cache_first(request).await),
            Disposition::NetworkFirst(destination) => {
                FetchOutcome::Respond(self.network_first(request, destination).await)
            }
        }
    }

    async fn cache_first(&self, request: Request) -> FetchResponse {
        let key = cache_key(&request.url);
        if let Some(cached) = self.lookup(&key).await {
            return cached;
        }

        let url = request.url.clone();
        match self.fetcher.fetch(request).await {
            Ok(response) => self.respond_from_network(response, &url),
            Err(e) => {
                error!(url = %url, error = %e, "Fetch failed for image");
                fallback::blank_image()
            }
        }
    }

    async fn network_first(&self, request: Request, destination: Destination) -> FetchResponse {
        let url = request.url.clone();
        let fetcher = Arc::clone(&self.fetcher);

        let failure = match with_timeout(self.config.network_timeout(), || fetcher.fetch(request))
            .await
        {
            Ok(Ok(response)) => return self.respond_from_network(response, &url),
            Ok(Err(e)) => SwError::from(e),
            Err(e) => SwError::from(e),
        };
        error!(
            url = %url,
            category = failure.category(),
            error = %failure,
            "Network request failed"
        );

        if let Some(cached) = self.lookup(&cache_key(&url)).await {
            info!(url = %url, "Serving from cache");
            return cached;
        }

        match destination {
            Destination::Document => self.offline_page().await,
            other => fallback::placeholder(other),
        }
    }

    async fn offline_page(&self) -> FetchResponse {
        match self.config.offline_page_url() {
            Ok(page) => match self.lookup(&cache_key(&page)).await {
                Some(cached) => cached,
                None => fallback::offline_document(),
            },
            Err(e) => {
                warn!(error = %e, "Offline page URL is invalid");
                fallback::offline_document()
            }
        }
    }

    fn respond_from_network(&self, response: Response, url: &Url) -> FetchResponse {
        if response.status == StatusCode::OK {
            self.store_in_background(CacheEntry::from_response(&response, url));
        }
        FetchResponse::from_network(response)
    }

    async fn lookup(&self, key: &str) -> Option<FetchResponse> {
        let caches = self.caches.read().await;
        caches
            .match_in(&self.config.cache_name, key)
            .map(FetchResponse::from_cache)
    }

    // ==================== Background writes ====================

    /// Write `entry` into the current cache without blocking the response.
    fn store_in_background(&self, entry: CacheEntry) {
        let caches = Arc::clone(&self.caches);
        let cache_name = self.config.cache_name.clone();

        let task = async move {
            let url = entry.url.clone();
            let mut caches = caches.write().await;
            match caches.open(&cache_name).put(entry) {
                Ok(()) => debug!(url = %url, cache = %cache_name, "Cached response"),
                Err(e) => warn!(
                    url = %url,
                    category = e.category(),
                    error = %e,
                    "Cache write failed"
                ),
            }
        };

        match self.writes.lock() {
            Ok(mut writes) => {
                while writes.try_join_next().is_some() {}
                writes.spawn(task);
            }
            Err(_) => {
                warn!("Background write tracker poisoned, detaching cache write");
                tokio::spawn(task);
            }
        }
    }

    /// Wait for every background cache write started so far.
    pub async fn settle(&self) {
        let mut pending = match self.writes.lock() {
            Ok(mut writes) => std::mem::take(&mut *writes),
            Err(_) => return,
        };

        while let Some(result) = pending.join_next().await {
            if let Err(e) = result {
                warn!(error = %e, "Background cache write aborted");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use gate7_net::NetError;
    use hashbrown::HashMap;
    use http::{HeaderMap, HeaderValue, Method};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Scripted network: path → (delay, status, body). Unknown paths fail.
    #[derive(Default)]
    struct ScriptedFetcher {
        routes: HashMap<String, (Duration, u16, &'static str)>,
        calls: AtomicUsize,
    }

    impl ScriptedFetcher {
        fn route(mut self, path: &str, status: u16, body: &'static str) -> Self {
            self.routes
                .insert(path.to_string(), (Duration::ZERO, status, body));
            self
        }

        fn slow(mut self, path: &str, delay: Duration, body: &'static str) -> Self {
            self.routes.insert(path.to_string(), (delay, 200, body));
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Fetcher for ScriptedFetcher {
        async fn fetch(&self, request: Request) -> Result<Response, NetError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let Some(&(delay, status, body)) = self.routes.get(request.url.path()) else {
                return Err(NetError::RequestFailed("connection refused".into()));
            };
            tokio::time::sleep(delay).await;
            let mut headers = HeaderMap::new();
            headers.insert("content-type", HeaderValue::from_static("text/plain"));
            Ok(Response {
                request_id: request.id,
                url: request.url,
                status: StatusCode::from_u16(status).unwrap(),
                headers,
                content_type: None,
                body: Bytes::from_static(body.as_bytes()),
            })
        }
    }

    fn url(path: &str) -> Url {
        Url::parse("https://gate7.vn").unwrap().join(path).unwrap()
    }

    fn controller(fetcher: ScriptedFetcher) -> (OfflineCacheController, Arc<ScriptedFetcher>) {
        let fetcher = Arc::new(fetcher);
        let config = OfflineConfig::new(
            url("/"),
            "gate7-v3",
            vec!["/index.html".into(), "/css/a.css".into()],
        );
        (
            OfflineCacheController::new(config, fetcher.clone()),
            fetcher,
        )
    }

    async fn cached_paths(controller: &OfflineCacheController) -> Vec<String> {
        let storage = controller.snapshot().await;
        let mut keys: Vec<String> = storage
            .get("gate7-v3")
            .map(|c| c.keys().into_iter().map(str::to_string).collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    #[tokio::test]
    async fn test_install_populates_current_cache() {
        let (controller, _) = controller(
            ScriptedFetcher::default()
                .route("/index.html", 200, "<html>home</html>")
                .route("/css/a.css", 200, "body{}"),
        );

        let report = controller.on_install().await;

        assert_eq!(report.cached.len(), 2);
        assert!(report.failed.is_empty());
        assert_eq!(
            cached_paths(&controller).await,
            vec![
                "https://gate7.vn/css/a.css".to_string(),
                "https://gate7.vn/index.html".to_string()
            ]
        );
        assert_eq!(controller.state().await, ServiceWorkerState::Installed);
        assert!(controller.skip_waiting_requested().await);
    }

    #[tokio::test]
    async fn test_install_tolerates_partial_failure() {
        let (controller, _) = controller(
            ScriptedFetcher::default()
                .route("/index.html", 200, "<html>home</html>")
                .route("/css/a.css", 500, "oops"),
        );

        let report = controller.on_install().await;

        assert_eq!(report.cached, vec!["/index.html".to_string()]);
        assert_eq!(report.failed, vec!["/css/a.css".to_string()]);
        assert_eq!(cached_paths(&controller).await.len(), 1);
        assert_eq!(controller.state().await, ServiceWorkerState::Installed);
    }

    #[tokio::test]
    async fn test_activate_deletes_only_stale_versions() {
        let (controller, _) =
            controller(ScriptedFetcher::default().route("/index.html", 200, "home"));
        {
            let mut caches = controller.caches.write().await;
            caches.open("gate7-v1");
            caches.open("gate7-v2");
        }
        controller.on_install().await;
        let home = controller.open_client(url("/")).await;

        let report = controller.on_activate().await;

        let mut deleted = report.deleted.clone();
        deleted.sort();
        assert_eq!(deleted, vec!["gate7-v1".to_string(), "gate7-v2".to_string()]);
        assert_eq!(report.claimed, vec![home.clone()]);
        assert!(controller.controls(&home).await);

        let storage = controller.snapshot().await;
        assert_eq!(storage.keys(), vec!["gate7-v3"]);
        assert_eq!(storage.get("gate7-v3").unwrap().len(), 1);
        assert_eq!(controller.state().await, ServiceWorkerState::Activated);
        assert!(!controller.skip_waiting_requested().await);
    }

    #[tokio::test]
    async fn test_message_skip_waiting() {
        let (controller, _) = controller(ScriptedFetcher::default());
        assert!(!controller.skip_waiting_requested().await);

        assert_eq!(controller.on_message(r#"{"type":"PING"}"#).await, None);
        assert!(!controller.skip_waiting_requested().await);

        assert_eq!(
            controller.on_message(r#"{"type":"SKIP_WAITING"}"#).await,
            Some(WorkerMessage::SkipWaiting)
        );
        assert!(controller.skip_waiting_requested().await);
    }

    #[tokio::test]
    async fn test_retire_makes_worker_redundant() {
        let (controller, _) =
            controller(ScriptedFetcher::default().route("/index.html", 200, "home"));
        let client = controller.open_client(url("/")).await;
        controller.on_install().await;
        controller.on_activate().await;
        assert!(controller.controls(&client).await);

        controller.retire().await;
        assert_eq!(controller.state().await, ServiceWorkerState::Redundant);
        assert!(!controller.state().await.can_intercept_fetch());
        assert!(!controller.controls(&client).await);
        // Cached assets outlive the worker.
        assert!(controller
            .snapshot()
            .await
            .match_in("gate7-v3", "https://gate7.vn/index.html")
            .is_some());
    }

    #[tokio::test]
    async fn test_ignored_requests_never_touch_network() {
        let (controller, fetcher) = controller(ScriptedFetcher::default());

        let post = Request::new(Method::POST, url("/save-notification"));
        let cdn = Request::get(Url::parse("https://cdn.jsdelivr.net/npm/a.png").unwrap());
        let other = Request::get(Url::parse("https://example.com/index.html").unwrap());

        assert!(matches!(
            controller.on_fetch(post).await,
            FetchOutcome::Passthrough(IgnoreReason::NonGet)
        ));
        assert!(matches!(
            controller.on_fetch(cdn).await,
            FetchOutcome::Passthrough(IgnoreReason::Cdn)
        ));
        assert!(matches!(
            controller.on_fetch(other).await,
            FetchOutcome::Passthrough(IgnoreReason::CrossOrigin)
        ));
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_cache_first_hit_skips_network() {
        let (controller, fetcher) =
            controller(ScriptedFetcher::default().route("/images/logo.png", 200, "PNG"));

        // First request populates the cache in the background.
        let first = controller.on_fetch(Request::get(url("/images/logo.png"))).await;
        assert_eq!(first.response().unwrap().body, Bytes::from_static(b"PNG"));
        controller.settle().await;
        assert_eq!(fetcher.calls(), 1);

        let second = controller
            .on_fetch(Request::get(url("/images/logo.png")))
            .await
            .into_response()
            .unwrap();
        assert!(second.from_cache_hit());
        assert_eq!(second.body, Bytes::from_static(b"PNG"));
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_cache_first_non_200_is_returned_but_not_cached() {
        let (controller, _) =
            controller(ScriptedFetcher::default().route("/images/gone.png", 404, ""));

        let response = controller
            .on_fetch(Request::get(url("/images/gone.png")))
            .await
            .into_response()
            .unwrap();
        controller.settle().await;

        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert!(cached_paths(&controller).await.is_empty());
    }

    #[tokio::test]
    async fn test_cache_first_failure_returns_blank_image() {
        let (controller, _) = controller(ScriptedFetcher::default());

        let response = controller
            .on_fetch(Request::get(url("/fonts/gate7.woff2")))
            .await
            .into_response()
            .unwrap();

        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.content_type(), Some("image/png"));
        assert!(response.body.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_first_has_no_timeout() {
        let (controller, _) = controller(ScriptedFetcher::default().slow(
            "/images/header.png",
            Duration::from_secs(10),
            "BIG",
        ));

        let response = controller
            .on_fetch(Request::get(url("/images/header.png")))
            .await
            .into_response()
            .unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body, Bytes::from_static(b"BIG"));
    }

    #[tokio::test]
    async fn test_network_first_success_updates_cache() {
        let (controller, _) =
            controller(ScriptedFetcher::default().route("/menu/index.html", 200, "menu"));

        let response = controller
            .on_fetch(Request::navigate(url("/menu/index.html")))
            .await
            .into_response()
            .unwrap();
        assert_eq!(response.source, crate::ResponseSource::Network);

        controller.settle().await;
        assert_eq!(
            cached_paths(&controller).await,
            vec!["https://gate7.vn/menu/index.html".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_first_timeout_discards_late_response() {
        let (controller, _) = controller(ScriptedFetcher::default().slow(
            "/css/a.css",
            Duration::from_millis(5000),
            "late",
        ));

        let response = controller
            .on_fetch(Request::get(url("/css/a.css")))
            .await
            .into_response()
            .unwrap();

        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.content_type(), Some("text/css"));

        tokio::time::sleep(Duration::from_secs(10)).await;
        controller.settle().await;
        assert!(cached_paths(&controller).await.is_empty());
    }

    #[tokio::test]
    async fn test_network_first_falls_back_to_exact_cache_entry() {
        let (controller, _) =
            controller(ScriptedFetcher::default().route("/js/app.js", 200, "old"));
        controller.on_fetch(Request::get(url("/js/app.js"))).await;
        controller.settle().await;

        // Network goes away.
        let offline = OfflineCacheController::with_storage(
            controller.config().clone(),
            Arc::new(ScriptedFetcher::default()),
            controller.snapshot().await,
        );
        let response = offline
            .on_fetch(Request::get(url("/js/app.js")))
            .await
            .into_response()
            .unwrap();

        assert!(response.from_cache_hit());
        assert_eq!(response.body, Bytes::from_static(b"old"));
    }

    #[tokio::test]
    async fn test_document_falls_back_to_offline_page_then_inline_html() {
        let (controller, _) = controller(ScriptedFetcher::default());

        let response = controller
            .on_fetch(Request::navigate(url("/hiring/")))
            .await
            .into_response()
            .unwrap();
        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.content_type(), Some("text/html"));

        let mut storage = CacheStorage::new();
        let headers = vec![("content-type".to_string(), "text/html".to_string())];
        storage
            .open("gate7-v3")
            .put(CacheEntry {
                url: "https://gate7.vn/index.html".into(),
                method: "GET".into(),
                status: 200,
                headers,
                body: Bytes::from_static(b"<html>home</html>"),
                cached_at: 0,
            })
            .unwrap();
        let with_home = OfflineCacheController::with_storage(
            controller.config().clone(),
            Arc::new(ScriptedFetcher::default()),
            storage,
        );

        let response = with_home
            .on_fetch(Request::navigate(url("/hiring/")))
            .await
            .into_response()
            .unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body, Bytes::from_static(b"<html>home</html>"));
    }

    #[tokio::test]
    async fn test_script_and_other_placeholders() {
        let (controller, _) = controller(ScriptedFetcher::default());

        let script = controller
            .on_fetch(Request::get(url("/js/scroll-animations.js")))
            .await
            .into_response()
            .unwrap();
        assert_eq!(script.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(script.content_type(), Some("text/javascript"));
        assert_eq!(script.body, Bytes::from_static(b"/* Offline */"));

        let other = controller
            .on_fetch(Request::get(url("/manifest.json")))
            .await
            .into_response()
            .unwrap();
        assert_eq!(other.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(other.content_type(), Some("text/javascript"));
        assert_eq!(other.body, Bytes::from_static(b"/* Offline */"));
    }

    #[tokio::test]
    async fn test_stale_versions_are_not_consulted() {
        let mut storage = CacheStorage::new();
        storage
            .open("gate7-v1")
            .put(CacheEntry {
                url: "https://gate7.vn/images/logo.png".into(),
                method: "GET".into(),
                status: 200,
                headers: Vec::new(),
                body: Bytes::from_static(b"OLD"),
                cached_at: 0,
            })
            .unwrap();
        let fetcher = Arc::new(ScriptedFetcher::default().route("/images/logo.png", 200, "NEW"));
        let controller = OfflineCacheController::with_storage(
            OfflineConfig::new(url("/"), "gate7-v3", vec![]),
            fetcher.clone(),
            storage,
        );

        let response = controller
            .on_fetch(Request::get(url("/images/logo.png")))
            .await
            .into_response()
            .unwrap();
        assert_eq!(response.body, Bytes::from_static(b"NEW"));
        assert_eq!(fetcher.calls(), 1);
    }
}

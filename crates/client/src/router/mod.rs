//! The offline cache router.
//!
//! [`CacheRouter`] sits between the app and the network. Every outbound `GET`
//! is classified ([`classify`]) and answered by one of five strategies over
//! three versioned partitions:
//!
//! | Class          | Strategy                       | Partition   |
//! |----------------|--------------------------------|-------------|
//! | `api`          | network-first, timed fallback  | `api-v*`    |
//! | `static-asset` | cache-first                    | `static-v*` |
//! | `cdn-asset`    | stale-while-revalidate         | `static-v*` |
//! | `app-shell`    | cached shell, offline page     | `static-v*` |
//! | `generic`      | network-first                  | `dynamic-v*`|
//!
//! The router also owns the partition lifecycle ([`lifecycle`]), the control
//! message surface ([`control`]), background sync ([`sync`]), and push
//! notification translation ([`notify`]).
//!
//! The router is a cheap-to-clone handle. Clones share the store, the client
//! registry, and the worker state.

pub mod classify;
pub mod clients;
pub mod control;
pub mod lifecycle;
pub mod notify;
mod offline;
mod strategy;
pub mod sync;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::task::JoinSet;
use url::Url;

use constellation_core::{AppConfig, Clock, Error, PartitionStore, Request, Response, SystemClock};

use crate::fetch::Fetcher;

pub use classify::{Classifier, RequestClass};
pub use clients::{ClientConnection, ClientId, ClientMessage, Clients};
pub use control::{ControlMessage, ControlReply};
pub use lifecycle::{ActivationReport, CacheStatus, WorkerState};
pub use notify::{ClickOutcome, Notification, NotificationAction, NotificationData, PushPayload};
pub use sync::{ANALYTICS_SYNC, GITHUB_DATA_SYNC, SyncOutcome};

/// The three partition families. Names carry the build version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartitionKind {
    Static,
    Dynamic,
    Api,
}

impl PartitionKind {
    pub const ALL: [PartitionKind; 3] = [PartitionKind::Static, PartitionKind::Dynamic, PartitionKind::Api];

    pub fn prefix(self) -> &'static str {
        match self {
            PartitionKind::Static => "static",
            PartitionKind::Dynamic => "dynamic",
            PartitionKind::Api => "api",
        }
    }

    pub fn name(self, version: &str) -> String {
        format!("{}-v{version}", self.prefix())
    }
}

/// Router settings resolved from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct RouterSettings {
    pub version: String,
    pub origin: Url,
    pub app_root: String,
    pub api_host: String,
    pub cdn_allowlist: Vec<String>,
    pub precache: Vec<String>,
    pub api_ttl: chrono::Duration,
}

impl RouterSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let origin =
            Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("origin {}: {e}", config.origin)))?;

        Ok(Self {
            version: config.version.clone(),
            origin,
            app_root: config.app_root.clone(),
            api_host: config.api_host.clone(),
            cdn_allowlist: config.cdn_allowlist.clone(),
            precache: config.precache.clone(),
            api_ttl: config.api_ttl(),
        })
    }

    pub fn partition_name(&self, kind: PartitionKind) -> String {
        kind.name(&self.version)
    }

    /// Names of the partitions this version owns.
    pub fn current_partitions(&self) -> Vec<String> {
        PartitionKind::ALL.iter().map(|kind| self.partition_name(*kind)).collect()
    }

    /// Absolute URL of the cached app shell document.
    pub fn shell_url(&self) -> Result<Url, Error> {
        self.origin
            .join(&format!("{}index.html", self.app_root))
            .map_err(|e| Error::InvalidUrl(e.to_string()))
    }

    /// Absolute URL of the app root.
    pub fn app_url(&self) -> Result<Url, Error> {
        self.origin.join(&self.app_root).map_err(|e| Error::InvalidUrl(e.to_string()))
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        let config = AppConfig { version: "1".into(), ..Default::default() };
        Self::from_config(&config).unwrap()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct RouterInner {
    settings: RouterSettings,
    classifier: Classifier,
    store: Arc<dyn PartitionStore>,
    fetcher: Arc<dyn Fetcher>,
    clock: Arc<dyn Clock>,
    clients: Clients,
    state: Mutex<WorkerState>,
    pending_sync: Mutex<Vec<String>>,
    refreshes: Mutex<JoinSet<()>>,
}

/// Request interceptor and partition lifecycle owner.
#[derive(Clone)]
pub struct CacheRouter {
    inner: Arc<RouterInner>,
}

impl fmt::Debug for CacheRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheRouter")
            .field("version", &self.inner.settings.version)
            .field("origin", &self.inner.settings.origin.as_str())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl CacheRouter {
    pub fn new(settings: RouterSettings, store: Arc<dyn PartitionStore>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self::with_clock(settings, store, fetcher, Arc::new(SystemClock))
    }

    pub fn with_clock(
        settings: RouterSettings, store: Arc<dyn PartitionStore>, fetcher: Arc<dyn Fetcher>, clock: Arc<dyn Clock>,
    ) -> Self {
        let classifier = Classifier::new(&settings);
        Self {
            inner: Arc::new(RouterInner {
                settings,
                classifier,
                store,
                fetcher,
                clock,
                clients: Clients::default(),
                state: Mutex::new(WorkerState::Parsed),
                pending_sync: Mutex::new(Vec::new()),
                refreshes: Mutex::new(JoinSet::new()),
            }),
        }
    }

    pub fn settings(&self) -> &RouterSettings {
        &self.inner.settings
    }

    pub fn clients(&self) -> &Clients {
        &self.inner.clients
    }

    pub fn classify(&self, url: &Url) -> RequestClass {
        self.inner.classifier.classify(url)
    }

    pub fn partition_name(&self, kind: PartitionKind) -> String {
        self.inner.settings.partition_name(kind)
    }

    /// Register a page. Pages that connect after activation start out controlled.
    pub fn connect_client(&self, url: Url) -> ClientConnection {
        let controlled = self.state() == WorkerState::Activated;
        self.inner.clients.connect(url, controlled)
    }

    /// Answer a request from the partitions and the network.
    ///
    /// Returns `None` for requests the router does not intercept (anything but
    /// `GET`); the caller forwards those untouched. Intercepted requests always
    /// get a response, synthesized if necessary.
    pub async fn handle_fetch(&self, request: &Request) -> Option<Response> {
        if !request.method.is_cacheable() {
            tracing::debug!(method = %request.method, url = %request.url, "not intercepted");
            return None;
        }

        let class = self.classify(&request.url);
        tracing::debug!(url = %request.url, class = %class, "routing request");

        let response = match class {
            RequestClass::Api => self.api_network_first(request).await,
            RequestClass::StaticAsset => self.cache_first(request, offline::ASSET_UNAVAILABLE).await,
            RequestClass::CdnAsset => self.stale_while_revalidate(request).await,
            RequestClass::AppShell => self.app_shell().await,
            RequestClass::Generic => self.network_first(request).await,
        };

        Some(response)
    }

    /// Wait for every background refresh spawned so far.
    pub async fn settle(&self) {
        let mut pending = std::mem::take(&mut *lock(&self.inner.refreshes));
        while let Some(result) = pending.join_next().await {
            if let Err(e) = result {
                tracing::warn!(error = %e, "background refresh task failed");
            }
        }
    }

    fn spawn_refresh<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut refreshes = lock(&self.inner.refreshes);
        while refreshes.try_join_next().is_some() {}
        refreshes.spawn(task);
    }
}

#[async_trait]
impl Fetcher for CacheRouter {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        match self.handle_fetch(request).await {
            Some(response) => Ok(response),
            None => self.inner.fetcher.fetch(request).await,
        }
    }
}

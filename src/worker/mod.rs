//! The edge cache worker
//!
//! [`EdgeWorker`] owns every component and exposes the lifecycle:
//!
//! 1. `on_install` - pre-warm `pages` with the listed assets, start the monitor
//! 2. `on_activate` - probe the origin right away, start serving
//! 3. `handle` / `on_message` - requests and client messages
//! 4. `shutdown` - stop the monitor

pub mod fetch;
pub mod router;

use bytes::Bytes;
use futures::future::join_all;
use http_body_util::Full;
use hyper::{Request, Response};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};
use url::Url;

use crate::cache::{AssetPolicyTable, CacheStore};
use crate::connection::{ConnectionMonitor, ConnectionStatus};
use crate::origin::Origin;
use crate::video::{ClientMessage, ClientRegistry, CurrentVideo, VideoResolver};

pub use fetch::CachingFetcher;
pub use router::FetchRouter;

/// Static worker configuration
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub origin_url: Url,
    pub probe_url: Url,
    pub selection_endpoint: String,
    pub selection_redirect: String,
    pub namespace: String,
    pub probe_interval: Duration,
    pub probe_timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    Created,
    Installed,
    Active,
    Stopped,
}

/// Result of pre-warming
#[derive(Debug, Clone, Default, Serialize)]
pub struct InstallReport {
    pub cached: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
}

pub struct EdgeWorker {
    config: WorkerConfig,
    cache: Arc<CacheStore>,
    status: ConnectionStatus,
    clients: Arc<ClientRegistry>,
    fetcher: Arc<CachingFetcher>,
    resolver: Arc<VideoResolver>,
    router: FetchRouter,
    monitor: Arc<ConnectionMonitor>,
    phase: RwLock<LifecyclePhase>,
    started_at: Instant,
}

impl EdgeWorker {
    pub fn new(config: WorkerConfig, policies: Arc<AssetPolicyTable>, origin: Arc<dyn Origin>) -> Self {
        Self::with_state(config, policies, origin, ConnectionStatus::new(), CurrentVideo::new())
    }

    /// Build with externally owned state handles
    pub fn with_state(
        config: WorkerConfig,
        policies: Arc<AssetPolicyTable>,
        origin: Arc<dyn Origin>,
        status: ConnectionStatus,
        current: CurrentVideo,
    ) -> Self {
        let cache = Arc::new(CacheStore::new(policies));
        let clients = Arc::new(ClientRegistry::new());
        let fetcher = Arc::new(CachingFetcher::new(
            Arc::clone(&origin),
            config.origin_url.clone(),
            Arc::clone(&cache),
            status.clone(),
        ));
        let resolver = Arc::new(VideoResolver::new(
            Arc::clone(&fetcher),
            current,
            Arc::clone(&clients),
            &config.namespace,
        ));
        let router = FetchRouter::new(
            Arc::clone(&fetcher),
            Arc::clone(&resolver),
            &config.selection_endpoint,
            &config.selection_redirect,
        );
        let monitor = Arc::new(ConnectionMonitor::new(
            origin,
            config.probe_url.clone(),
            config.probe_interval,
            config.probe_timeout,
            status.clone(),
        ));

        Self {
            config,
            cache,
            status,
            clients,
            fetcher,
            resolver,
            router,
            monitor,
            phase: RwLock::new(LifecyclePhase::Created),
            started_at: Instant::now(),
        }
    }

    /// Pre-warm listed assets and start the connection monitor.
    ///
    /// Failed assets are reported, never fatal.
    pub async fn on_install(&self) -> InstallReport {
        let paths: Vec<String> = self
            .cache
            .policies()
            .asset_paths()
            .into_iter()
            .map(str::to_string)
            .collect();
        info!(assets = paths.len(), "Pre-loading assets into pages");

        let results = join_all(paths.iter().map(|path| self.fetcher.prewarm(path))).await;

        let mut report = InstallReport::default();
        for (path, result) in paths.into_iter().zip(results) {
            match result {
                Ok(true) => report.cached.push(path),
                Ok(false) => report.skipped.push(path),
                Err(e) => {
                    warn!(path = %path, error = %e, "Failed to pre-load asset");
                    report.failed.push(path);
                }
            }
        }

        self.monitor.start().await;
        *self.phase.write().await = LifecyclePhase::Installed;
        info!(
            cached = report.cached.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Worker installed"
        );
        report
    }

    /// Re-check connectivity now and start serving. Returns the online state.
    pub async fn on_activate(&self) -> bool {
        let online = self.monitor.check_now().await;
        *self.phase.write().await = LifecyclePhase::Active;
        info!(online, "Worker active");
        online
    }

    /// Handle a client message, returning the reply if one is due
    pub async fn on_message(&self, message: ClientMessage) -> Option<ClientMessage> {
        debug!(message = message.name(), "Client message");
        match message {
            ClientMessage::VideoGet => {
                Some(ClientMessage::video_set(self.resolver.current_video().await))
            }
            ClientMessage::VideoSet { value } => {
                self.resolver.set_current(value).await;
                None
            }
            ClientMessage::NamespaceGet => Some(ClientMessage::NamespaceSet {
                value: self.resolver.namespace().to_string(),
            }),
            ClientMessage::NamespaceSet { value } => {
                debug!(namespace = %value, "Ignoring namespace/set from client");
                None
            }
        }
    }

    pub async fn handle(&self, request: Request<Bytes>) -> Response<Full<Bytes>> {
        self.router.route(request).await
    }

    /// Stop background work
    pub async fn shutdown(&self) {
        self.monitor.stop().await;
        *self.phase.write().await = LifecyclePhase::Stopped;
        info!("Worker stopped");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientMessage> {
        self.clients.subscribe()
    }

    pub fn clients(&self) -> &Arc<ClientRegistry> {
        &self.clients
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    pub fn monitor(&self) -> &Arc<ConnectionMonitor> {
        &self.monitor
    }

    pub async fn current_video(&self) -> Option<String> {
        self.resolver.current_video().await
    }

    pub async fn phase(&self) -> LifecyclePhase {
        *self.phase.read().await
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

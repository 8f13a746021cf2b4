//! Scripted in-memory origin for tests

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use hyper::header::HeaderMap;
use hyper::StatusCode;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;

use super::{Origin, OriginRequest};
use crate::types::{ClipwayError, FetchedResponse, Result};

/// Answers from a fixed table keyed by `"{METHOD} {path}"`
#[derive(Default)]
pub struct ScriptedOrigin {
    routes: DashMap<String, FetchedResponse>,
    down: AtomicBool,
    probe_delay_ms: AtomicUsize,
    fetch_delay_ms: AtomicUsize,
    fetches: AtomicUsize,
    probes: AtomicUsize,
}

impl ScriptedOrigin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(&self, method: &str, path: &str, response: FetchedResponse) {
        self.routes.insert(format!("{} {}", method, path), response);
    }

    pub fn serve_ok(&self, path: &str, body: &'static [u8], content_type: &str) {
        self.serve("GET", path, FetchedResponse::ok(Bytes::from_static(body), content_type));
    }

    pub fn serve_status(&self, path: &str, status: StatusCode) {
        self.serve(
            "GET",
            path,
            FetchedResponse::new(status, HeaderMap::new(), Bytes::from_static(b"origin error")),
        );
    }

    /// Make every fetch and probe fail at the transport level
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub fn set_probe_delay(&self, delay: Duration) {
        self.probe_delay_ms
            .store(delay.as_millis() as usize, Ordering::SeqCst);
    }

    /// Hold every fetch for `delay` before answering
    pub fn set_fetch_delay(&self, delay: Duration) {
        self.fetch_delay_ms
            .store(delay.as_millis() as usize, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Origin for ScriptedOrigin {
    async fn fetch(&self, request: OriginRequest) -> Result<FetchedResponse> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let delay = self.fetch_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay as u64)).await;
        }
        if self.down.load(Ordering::SeqCst) {
            return Err(ClipwayError::Network("connection refused".into()));
        }

        let key = format!("{} {}", request.method, request.url.path());
        Ok(self.routes.get(&key).map(|r| r.value().clone()).unwrap_or_else(|| {
            FetchedResponse::new(StatusCode::NOT_FOUND, HeaderMap::new(), Bytes::from_static(b"missing"))
        }))
    }

    async fn probe(&self, _url: &Url, _timeout: Duration) -> Result<()> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        let delay = self.probe_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay as u64)).await;
        }
        if self.down.load(Ordering::SeqCst) {
            Err(ClipwayError::Network("connection refused".into()))
        } else {
            Ok(())
        }
    }
}

//! Health and version endpoints
//!
//! - /health - liveness plus what the worker currently believes about the origin
//! - /version - build information

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{self, HeaderValue};
use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::cache::{Partition, PartitionStats};
use crate::worker::{EdgeWorker, LifecyclePhase};

#[derive(Serialize)]
pub struct HealthResponse {
    /// Always true while the process is serving
    pub healthy: bool,
    /// "online" or "offline", from the connection monitor
    pub status: &'static str,
    pub online: bool,
    pub phase: LifecyclePhase,
    pub version: &'static str,
    /// Seconds since the worker was created
    pub uptime: u64,
    pub timestamp: String,
    pub clients: usize,
    #[serde(rename = "currentVideo")]
    pub current_video: Option<String>,
    pub cache: CacheHealth,
}

#[derive(Serialize)]
pub struct CacheHealth {
    pub pages: PartitionStats,
    pub clips: PartitionStats,
    #[serde(rename = "assetPolicies")]
    pub asset_policies: usize,
}

#[derive(Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
    pub commit: &'static str,
    pub build_time: &'static str,
    pub service: &'static str,
}

pub async fn build_health_response(worker: &EdgeWorker) -> HealthResponse {
    let status = worker.status();
    HealthResponse {
        healthy: true,
        status: status.label(),
        online: status.is_online(),
        phase: worker.phase().await,
        version: env!("CARGO_PKG_VERSION"),
        uptime: worker.uptime().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        clients: worker.clients().client_count(),
        current_video: worker.current_video().await,
        cache: CacheHealth {
            pages: worker.cache().stats(Partition::Pages),
            clips: worker.cache().stats(Partition::Clips),
            asset_policies: worker.cache().policies().len(),
        },
    }
}

/// Handle /health
pub async fn health_check(worker: &EdgeWorker) -> Response<Full<Bytes>> {
    let response = build_health_response(worker).await;
    let body = serde_json::to_string(&response)
        .unwrap_or_else(|_| r#"{"healthy":true,"error":"Serialization failed"}"#.to_string());
    json_ok(body)
}

/// Handle /version
pub fn version_info() -> Response<Full<Bytes>> {
    let response = VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("GIT_COMMIT_SHORT").unwrap_or("unknown"),
        build_time: option_env!("BUILD_TIMESTAMP").unwrap_or("unknown"),
        service: "clipway",
    };
    let body = serde_json::to_string(&response)
        .unwrap_or_else(|_| r#"{"version":"unknown","commit":"unknown"}"#.to_string());
    json_ok(body)
}

fn json_ok(body: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

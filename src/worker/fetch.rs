//! Cache-aware fetching
//!
//! Two strategies:
//!
//! - **cache first** for clips: a stored clip is always served, the network is
//!   used only on a miss while online
//! - **network first** for pages: fresh content while online, with the stored
//!   copy as fallback; no network attempt at all while offline

use hyper::Method;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

use crate::cache::{CacheKey, CacheStore, Partition};
use crate::connection::ConnectionStatus;
use crate::origin::{Origin, OriginRequest};
use crate::types::{ClipwayError, FetchedResponse, Result};

pub struct CachingFetcher {
    origin: Arc<dyn Origin>,
    origin_url: Url,
    cache: Arc<CacheStore>,
    status: ConnectionStatus,
}

impl CachingFetcher {
    pub fn new(
        origin: Arc<dyn Origin>,
        origin_url: Url,
        cache: Arc<CacheStore>,
        status: ConnectionStatus,
    ) -> Self {
        Self {
            origin,
            origin_url,
            cache,
            status,
        }
    }

    pub fn origin_url(&self) -> &Url {
        &self.origin_url
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    /// Absolute origin URL for a path (with optional query)
    pub fn key_for(&self, method: Method, path_and_query: &str) -> Result<CacheKey> {
        CacheKey::for_path(method, &self.origin_url, path_and_query)
    }

    /// Fetch a clip, preferring the `clips` partition.
    ///
    /// Always requests the whole body; ranges are cut from the stored copy.
    pub async fn fetch_clip(&self, path_and_query: &str) -> Result<FetchedResponse> {
        let key = self.key_for(Method::GET, path_and_query)?;

        if let Some(entry) = self.cache.get_response(Partition::Clips, &key) {
            return Ok(entry.response);
        }

        if !self.status.is_online() {
            debug!(key = %key, "Offline clip miss");
            return Err(ClipwayError::CacheMiss(key.url.path().to_string()));
        }

        let response = self.origin.fetch(OriginRequest::get(key.url.clone())).await?;
        self.cache
            .cache_response(Partition::Clips, &key, &response, &Method::GET);
        Ok(response)
    }

    /// Fetch a page or asset through the `pages` partition
    pub async fn fetch_page(&self, request: OriginRequest) -> Result<FetchedResponse> {
        let key = CacheKey::new(request.method.clone(), request.url.clone());

        if !self.status.is_online() {
            return match self.cache.get_response(Partition::Pages, &key) {
                Some(entry) => Ok(entry.response),
                None => {
                    debug!(key = %key, "Offline page miss");
                    Err(ClipwayError::CacheMiss(key.url.path().to_string()))
                }
            };
        }

        let method = request.method.clone();
        match self.origin.fetch(request).await {
            Ok(response) => {
                self.cache
                    .cache_response(Partition::Pages, &key, &response, &method);
                Ok(response)
            }
            Err(e) if e.is_transient() => {
                warn!(key = %key, error = %e, "Origin fetch failed, trying cache");
                match self.cache.get_response(Partition::Pages, &key) {
                    Some(entry) => Ok(entry.response),
                    None => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Fetch an asset into `pages` regardless of connection state.
    ///
    /// Returns whether the policy allowed the write.
    pub async fn prewarm(&self, path: &str) -> Result<bool> {
        let key = self.key_for(Method::GET, path)?;
        let response = self.origin.fetch(OriginRequest::get(key.url.clone())).await?;
        Ok(self
            .cache
            .cache_response(Partition::Pages, &key, &response, &Method::GET))
    }
}

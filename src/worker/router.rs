//! Request dispatch
//!
//! First match wins:
//!
//! | Path | Handling |
//! |------|----------|
//! | selection endpoint | decode, resolve, `303` to the redirect |
//! | `<namespace>/current` | current state as JSON |
//! | `/clips/...` | cache first, then range slicing |
//! | `<namespace>/localvideo/...` | `clips` partition only, then range slicing |
//! | anything else | network first through `pages` |

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{self, HeaderValue};
use hyper::{Method, Request, Response, StatusCode};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::cache::Partition;
use crate::origin::OriginRequest;
use crate::routes::errors::error_response;
use crate::routes::range::slice_response;
use crate::routes::selection::parse_submission;
use crate::types::{ClipwayError, Result};
use crate::video::{VideoResolver, CURRENT_VIDEO_KEY};

use super::fetch::CachingFetcher;

pub struct FetchRouter {
    fetcher: Arc<CachingFetcher>,
    resolver: Arc<VideoResolver>,
    selection_endpoint: String,
    selection_redirect: String,
    current_path: String,
    local_video_prefix: String,
}

impl FetchRouter {
    pub fn new(
        fetcher: Arc<CachingFetcher>,
        resolver: Arc<VideoResolver>,
        selection_endpoint: &str,
        selection_redirect: &str,
    ) -> Self {
        let current_path = format!("{}/current", resolver.namespace());
        let local_video_prefix = resolver.local_video_prefix();
        Self {
            fetcher,
            resolver,
            selection_endpoint: selection_endpoint.to_string(),
            selection_redirect: selection_redirect.to_string(),
            current_path,
            local_video_prefix,
        }
    }

    /// Answer a request. Never fails: errors become HTML error pages.
    pub async fn route(&self, request: Request<Bytes>) -> Response<Full<Bytes>> {
        match self.dispatch(request).await {
            Ok(response) => response,
            Err(e) => error_response(e),
        }
    }

    async fn dispatch(&self, request: Request<Bytes>) -> Result<Response<Full<Bytes>>> {
        let (parts, body) = request.into_parts();
        let path = parts.uri.path();
        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or(path);
        let range = parts
            .headers
            .get(header::RANGE)
            .and_then(|v| v.to_str().ok());
        let readable = parts.method == Method::GET || parts.method == Method::HEAD;

        if path == self.selection_endpoint {
            let submission =
                parse_submission(&parts.method, &parts.headers, parts.uri.query(), body).await?;
            let resolved = self.resolver.resolve_selection(submission).await?;
            debug!(video = %resolved.url, "Selection handled, redirecting");
            return Ok(self.redirect());
        }

        if path == self.current_path {
            let params: HashMap<String, String> =
                serde_urlencoded::from_str(parts.uri.query().unwrap_or("")).unwrap_or_default();
            let key = params
                .get("key")
                .map(String::as_str)
                .unwrap_or(CURRENT_VIDEO_KEY);
            let json = self.resolver.current(key).await?;
            return Ok(json_response(json));
        }

        if readable && is_clip_path(path) {
            let response = self.fetcher.fetch_clip(path_and_query).await?;
            return Ok(slice_response(response, range));
        }

        if readable && path.starts_with(&self.local_video_prefix) {
            let key = self.fetcher.key_for(Method::GET, path)?;
            return match self.fetcher.cache().get_response(Partition::Clips, &key) {
                Some(entry) => Ok(slice_response(entry.response, range)),
                None => Err(ClipwayError::NotFound(format!("local video {}", path))),
            };
        }

        let url = self.fetcher.origin_url().join(path_and_query)?;
        let origin_request = OriginRequest {
            method: parts.method.clone(),
            url,
            headers: Default::default(),
            body: Bytes::new(),
        }
        .with_client_headers(&parts.headers)
        .with_body(body);

        let response = self.fetcher.fetch_page(origin_request).await?;
        if parts.method == Method::HEAD {
            return Ok(response.into_head_response());
        }
        Ok(response.into_response())
    }

    fn redirect(&self) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(Bytes::new()));
        *response.status_mut() = StatusCode::SEE_OTHER;
        if let Ok(location) = HeaderValue::from_str(&self.selection_redirect) {
            response.headers_mut().insert(header::LOCATION, location);
        }
        response
            .headers_mut()
            .insert(header::CONTENT_LENGTH, HeaderValue::from_static("0"));
        response
    }
}

fn is_clip_path(path: &str) -> bool {
    path == "/clips" || path.starts_with("/clips/")
}

fn json_response(json: String) -> Response<Full<Bytes>> {
    let length = json.len();
    let mut response = Response::new(Full::new(Bytes::from(json)));
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

//! Access to the origin server
//!
//! The worker never talks to the network directly. Everything goes through an
//! [`Origin`], so routing and monitoring can be exercised against an in-memory
//! origin in tests.

pub mod http;
#[cfg(test)]
pub mod mock;

use async_trait::async_trait;
use bytes::Bytes;
use hyper::header::{self, HeaderMap};
use hyper::Method;
use std::time::Duration;
use url::Url;

use crate::types::{FetchedResponse, Result};

pub use http::HttpOrigin;

/// Request headers that must not be forwarded to the origin
const NOT_FORWARDED: [header::HeaderName; 6] = [
    header::HOST,
    header::CONNECTION,
    header::UPGRADE,
    header::TRANSFER_ENCODING,
    header::CONTENT_LENGTH,
    header::RANGE,
];

/// A request to replay against the origin
#[derive(Debug, Clone)]
pub struct OriginRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl OriginRequest {
    /// Bodiless GET, used for clips and pre-warming
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Copy client headers, dropping the ones that describe the client's hop.
    ///
    /// `Range` is dropped as well: the worker always fetches whole bodies and
    /// slices them itself.
    pub fn with_client_headers(mut self, headers: &HeaderMap) -> Self {
        let mut forwarded = headers.clone();
        for name in NOT_FORWARDED.iter() {
            forwarded.remove(name);
        }
        self.headers = forwarded;
        self
    }

    pub fn with_body(mut self, body: Bytes) -> Self {
        self.body = body;
        self
    }
}

/// Network fetch primitive
#[async_trait]
pub trait Origin: Send + Sync {
    /// Perform a request and buffer the full response.
    ///
    /// Any HTTP status is `Ok`; only transport failures are `Err`.
    async fn fetch(&self, request: OriginRequest) -> Result<FetchedResponse>;

    /// Reachability probe. `Ok` for any HTTP answer within `timeout`.
    async fn probe(&self, url: &Url, timeout: Duration) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;

    #[test]
    fn test_client_headers_filtered() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("worker.local"));
        headers.insert(header::RANGE, HeaderValue::from_static("bytes=0-1"));
        headers.insert(header::ACCEPT, HeaderValue::from_static("text/html"));

        let url = Url::parse("http://localhost:5000/").unwrap();
        let request = OriginRequest::get(url).with_client_headers(&headers);

        assert!(request.headers.get(header::HOST).is_none());
        assert!(request.headers.get(header::RANGE).is_none());
        assert_eq!(request.headers[header::ACCEPT], "text/html");
    }
}

//! Buffered HTTP response shared by the origin client and the cache.

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{self, HeaderMap, HeaderValue};
use hyper::{Response, StatusCode};

/// Headers that describe a single hop and must not be replayed from cache
const HOP_BY_HOP: [header::HeaderName; 4] = [
    header::CONNECTION,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::TRAILER,
];

/// A fully buffered response: what the origin returned, or what the cache holds
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl FetchedResponse {
    /// Create a response, dropping hop-by-hop headers
    pub fn new(status: StatusCode, mut headers: HeaderMap, body: Bytes) -> Self {
        for name in HOP_BY_HOP.iter() {
            headers.remove(name);
        }
        Self { status, headers, body }
    }

    /// A 200 response with only a content type
    pub fn ok(body: Bytes, content_type: &str) -> Self {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(content_type) {
            headers.insert(header::CONTENT_TYPE, value);
        }
        Self::new(StatusCode::OK, headers, body)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Whether this response is itself a byte range of a larger resource
    pub fn is_partial(&self) -> bool {
        self.status == StatusCode::PARTIAL_CONTENT
    }

    pub fn len(&self) -> u64 {
        self.body.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Build the wire response. Content-Length always reflects the buffered body.
    pub fn into_response(self) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(self.body.clone()));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
            .headers_mut()
            .insert(header::CONTENT_LENGTH, HeaderValue::from(self.body.len()));
        response
    }

    /// Build the reply to a HEAD request. The body is empty, so an upstream
    /// `Content-Length` is kept as sent.
    pub fn into_head_response(self) -> Response<Full<Bytes>> {
        if self.body.is_empty() && self.headers.contains_key(header::CONTENT_LENGTH) {
            let mut response = Response::new(Full::new(Bytes::new()));
            *response.status_mut() = self.status;
            *response.headers_mut() = self.headers;
            return response;
        }
        self.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hop_by_hop_headers_dropped() {
        let mut headers = HeaderMap::new();
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html"));

        let response = FetchedResponse::new(StatusCode::OK, headers, Bytes::from_static(b"<p>"));
        assert!(response.headers.get(header::TRANSFER_ENCODING).is_none());
        assert_eq!(response.content_type(), Some("text/html"));
    }

    #[test]
    fn test_into_response_sets_length() {
        let response = FetchedResponse::ok(Bytes::from_static(b"hello"), "text/plain");
        let wire = response.into_response();
        assert_eq!(wire.status(), StatusCode::OK);
        assert_eq!(wire.headers()[header::CONTENT_LENGTH], "5");
    }

    #[test]
    fn test_head_response_keeps_upstream_length() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("1234"));
        let head = FetchedResponse::new(StatusCode::OK, headers, Bytes::new());

        let wire = head.into_head_response();
        assert_eq!(wire.headers()[header::CONTENT_LENGTH], "1234");

        let buffered = FetchedResponse::ok(Bytes::from_static(b"abc"), "text/plain");
        assert_eq!(buffered.into_head_response().headers()[header::CONTENT_LENGTH], "3");
    }
}

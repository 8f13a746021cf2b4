//! Byte-range slicing for cached media
//!
//! Clips are cached whole; seeking in a `<video>` element issues `Range`
//! requests, which are answered here by cutting the cached body.
//!
//! - `bytes=start-end` - inclusive end
//! - `bytes=start-` - through the last byte
//!
//! Headers with a comma (multi-range), another unit, or no start position are
//! treated as absent and the full body is served. A start at or beyond the end
//! of the content, or an end before the start, is unsatisfiable (416).

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{self, HeaderValue};
use hyper::{Response, StatusCode};
use tracing::debug;

use crate::routes::errors::error_response;
use crate::types::{ClipwayError, FetchedResponse};

/// A single parsed byte range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeRequest {
    pub unit: String,
    pub start: u64,
    /// Inclusive last byte, if given
    pub end: Option<u64>,
}

/// Outcome of slicing a body against a range header
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SliceResult {
    /// Serve the body as stored, with its original status
    Full,
    /// Serve `length` bytes starting at `start`
    Partial { start: u64, length: u64, body: Bytes },
    /// Nothing in the content matches the range
    Unsatisfiable { total_size: u64 },
}

/// Parse HTTP Range header.
///
/// Returns `None` for anything that is not a single `bytes` range with a
/// decimal start.
pub fn parse_range_header(range_header: &str) -> Option<RangeRequest> {
    if range_header.contains(',') {
        return None;
    }

    let (unit, range_str) = range_header.trim().split_once('=')?;
    let unit = unit.trim();
    if unit != "bytes" {
        return None;
    }

    let parts: Vec<&str> = range_str.trim().split('-').collect();
    if parts.len() != 2 {
        return None;
    }

    let start = parse_position(parts[0])?;
    let end = if parts[1].is_empty() {
        None
    } else {
        Some(parse_position(parts[1])?)
    };

    Some(RangeRequest {
        unit: unit.to_string(),
        start,
        end,
    })
}

fn parse_position(part: &str) -> Option<u64> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

/// Slice a fully stored body.
///
/// Pure: identical inputs always give identical output.
pub fn slice(
    body: &Bytes,
    total_size: u64,
    range_header: Option<&str>,
    already_partial: bool,
) -> SliceResult {
    if already_partial {
        return SliceResult::Full;
    }
    let Some(range) = range_header.and_then(parse_range_header) else {
        return SliceResult::Full;
    };

    if range.start >= total_size {
        return SliceResult::Unsatisfiable { total_size };
    }

    let requested_end = range.end.unwrap_or(u64::MAX);
    if requested_end < range.start {
        return SliceResult::Unsatisfiable { total_size };
    }

    // End is clamped before any arithmetic
    let last = requested_end.min(total_size - 1);
    let length = last - range.start + 1;
    let from = range.start as usize;
    let to = (range.start + length).min(body.len() as u64) as usize;
    if from >= to {
        return SliceResult::Unsatisfiable { total_size };
    }

    SliceResult::Partial {
        start: range.start,
        length: (to - from) as u64,
        body: body.slice(from..to),
    }
}

/// Apply a range header to a stored media response and build the reply
pub fn slice_response(response: FetchedResponse, range_header: Option<&str>) -> Response<Full<Bytes>> {
    let total_size = response.len();
    // Error bodies are not media
    let passthrough = response.is_partial() || response.status != StatusCode::OK;

    match slice(&response.body, total_size, range_header, passthrough) {
        SliceResult::Full => {
            let mut reply = response.into_response();
            reply
                .headers_mut()
                .insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
            reply
        }
        SliceResult::Partial { start, length, body } => {
            let end = start + length - 1;
            debug!(range = %format!("{}-{}", start, end), size = length, "Serving partial content");

            let mut partial = FetchedResponse::new(StatusCode::PARTIAL_CONTENT, response.headers, body);
            partial.headers.remove(header::ETAG);
            if let Ok(value) = HeaderValue::from_str(&format!("bytes {}-{}/{}", start, end, total_size)) {
                partial.headers.insert(header::CONTENT_RANGE, value);
            }
            partial
                .headers
                .insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
            partial.into_response()
        }
        SliceResult::Unsatisfiable { total_size } => {
            debug!(range = ?range_header, total_size, "Range not satisfiable");
            error_response(ClipwayError::RangeNotSatisfiable { total_size })
        }
    }
}

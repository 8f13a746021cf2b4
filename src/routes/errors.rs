//! Canned HTML error pages
//!
//! Every failure the worker surfaces becomes one of these, so a browser always
//! receives a readable page with the right status.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{header, Response, StatusCode};
use tracing::warn;

use crate::types::{ClipwayError, ValidationError};

/// Render a minimal error page
pub fn error_page(status: StatusCode, message: &str) -> String {
    let code = status.as_u16();
    let reason = status.canonical_reason().unwrap_or("Error");
    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{code} | {reason}</title></head>\n\
         <body>\n<h1>{code} {reason}</h1>\n<p>{message}</p>\n</body>\n</html>\n",
        code = code,
        reason = reason,
        message = escape_html(message),
    )
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// User-facing message for an error
fn describe(err: &ClipwayError) -> String {
    match err {
        ClipwayError::Validation(ValidationError::BadRequest(_)) => {
            "Select a video file or a clip before submitting.".to_string()
        }
        ClipwayError::Validation(ValidationError::MethodNotAllowed(method)) => {
            format!("Video selection does not accept {} requests.", method)
        }
        ClipwayError::Validation(ValidationError::UnknownLocalVideo(name)) => {
            format!("The local video \"{}\" is not stored on this device.", name)
        }
        ClipwayError::RangeNotSatisfiable { .. } => {
            "The requested byte range is outside the video.".to_string()
        }
        ClipwayError::Network(_) => {
            "The server could not be reached and no saved copy exists.".to_string()
        }
        ClipwayError::CacheMiss(_) => {
            "You are offline and this page has not been saved for offline use.".to_string()
        }
        ClipwayError::NotFound(what) => format!("Could not find {}.", what),
        ClipwayError::Config(_) | ClipwayError::Internal(_) => {
            "Something went wrong while handling this request.".to_string()
        }
    }
}

/// Convert ClipwayError to HTTP response
pub fn error_response(err: ClipwayError) -> Response<Full<Bytes>> {
    let status = err.status_code();
    if status.is_server_error() {
        warn!(status = %status, error = %err, "Request failed");
    }

    let mut builder = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "text/html; charset=utf-8");

    match &err {
        ClipwayError::Validation(ValidationError::MethodNotAllowed(_)) => {
            builder = builder.header(header::ALLOW, "GET, POST");
        }
        ClipwayError::RangeNotSatisfiable { total_size } => {
            builder = builder.header(header::CONTENT_RANGE, format!("bytes */{}", total_size));
        }
        _ => {}
    }

    let body = error_page(status, &describe(&err));
    builder
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|_| {
            let mut fallback = Response::new(Full::new(Bytes::new()));
            *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            fallback
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_not_allowed_has_allow_header() {
        let response = error_response(ValidationError::MethodNotAllowed("PUT".into()).into());
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "GET, POST");
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/html"));
    }

    #[test]
    fn test_unsatisfiable_has_content_range() {
        let response = error_response(ClipwayError::RangeNotSatisfiable { total_size: 1000 });
        assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
        assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes */1000");
    }

    #[test]
    fn test_page_escapes_message() {
        let page = error_page(StatusCode::NOT_FOUND, "<script>");
        assert!(page.contains("&lt;script&gt;"));
        assert!(page.contains("404 Not Found"));
    }
}

//! Error types for clipway
//!
//! Every variant maps to an HTTP status so a failure anywhere in the worker
//! still ends as a well-formed response.

use hyper::StatusCode;

/// Client-facing validation failures from the video selection endpoint
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Neither a file nor a complete clip pair was submitted
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Selection submitted with something other than GET or POST
    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    /// GET selection named a local video that is not in the cache
    #[error("Unknown local video: {0}")]
    UnknownLocalVideo(String),
}

/// Main error type for clipway operations
#[derive(Debug, thiserror::Error)]
pub enum ClipwayError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Range not satisfiable (content is {total_size} bytes)")]
    RangeNotSatisfiable { total_size: u64 },

    /// Transient origin failure. Callers try the cache before surfacing it.
    #[error("Network error: {0}")]
    Network(String),

    /// Neither the cache nor the network could answer
    #[error("Not cached and origin unavailable: {0}")]
    CacheMiss(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ClipwayError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(ValidationError::BadRequest(_)) => StatusCode::BAD_REQUEST,
            Self::Validation(ValidationError::MethodNotAllowed(_)) => StatusCode::METHOD_NOT_ALLOWED,
            Self::Validation(ValidationError::UnknownLocalVideo(_)) => StatusCode::NOT_FOUND,
            Self::RangeNotSatisfiable { .. } => StatusCode::RANGE_NOT_SATISFIABLE,
            Self::Network(_) => StatusCode::BAD_GATEWAY,
            Self::CacheMiss(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the cache should be consulted before surfacing this error
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<std::io::Error> for ClipwayError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for ClipwayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(format!("JSON error: {}", err))
    }
}

impl From<url::ParseError> for ClipwayError {
    fn from(err: url::ParseError) -> Self {
        Self::Config(format!("Invalid URL: {}", err))
    }
}

impl From<reqwest::Error> for ClipwayError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

impl From<hyper::Error> for ClipwayError {
    fn from(err: hyper::Error) -> Self {
        Self::Internal(format!("HTTP error: {}", err))
    }
}

/// Result type alias for clipway operations
pub type Result<T> = std::result::Result<T, ClipwayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_status_codes() {
        let err: ClipwayError = ValidationError::BadRequest("empty".into()).into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err: ClipwayError = ValidationError::MethodNotAllowed("PUT".into()).into();
        assert_eq!(err.status_code(), StatusCode::METHOD_NOT_ALLOWED);

        let err: ClipwayError = ValidationError::UnknownLocalVideo("a.mp4".into()).into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_origin_failures() {
        assert_eq!(
            ClipwayError::Network("refused".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ClipwayError::CacheMiss("/page".into()).status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert!(ClipwayError::Network("refused".into()).is_transient());
        assert!(!ClipwayError::CacheMiss("/page".into()).is_transient());
    }
}

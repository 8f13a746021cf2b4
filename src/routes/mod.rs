//! HTTP route handlers
//!
//! Pure request/response helpers used by the worker and the front-end.

pub mod errors;
pub mod health;
pub mod range;
pub mod selection;

pub use errors::{error_page, error_response};
pub use health::{health_check, version_info, HealthResponse};
pub use range::{parse_range_header, slice, slice_response, RangeRequest, SliceResult};
pub use selection::parse_submission;

//! Shared types

pub mod error;
pub mod response;

pub use error::{ClipwayError, Result, ValidationError};
pub use response::FetchedResponse;

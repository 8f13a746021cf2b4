//! Origin reachability tracking
//!
//! [`ConnectionMonitor`] owns the probe schedule; [`ConnectionStatus`] is the
//! shared flag the fetch path reads on every request.

pub mod monitor;
pub mod status;

pub use monitor::{ConnectionMonitor, DEFAULT_PROBE_INTERVAL, DEFAULT_PROBE_TIMEOUT};
pub use status::ConnectionStatus;

//! HTTP front-end
//!
//! Serves `/health` and `/version`, upgrades `<namespace>/messages` to a
//! WebSocket, and passes everything else to the worker.

pub mod http;
pub mod websocket;

pub use http::{run, serve};

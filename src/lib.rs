//! clipway - offline edge cache for match clips
//!
//! Sits between browsers and the origin server and decides, per request,
//! whether to answer from the local cache, go to the network, or produce an
//! error page. Clips keep playing (and seeking) while the origin is away.
//!
//! ## Components
//!
//! - **Cache**: asset policies and the `pages` / `clips` partitions
//! - **Connection**: periodic reachability probe and the shared online flag
//! - **Video**: selection handling, current video state, client broadcasts
//! - **Worker**: request routing and lifecycle
//! - **Server**: hyper front-end and the client WebSocket

pub mod cache;
pub mod config;
pub mod connection;
pub mod origin;
pub mod routes;
pub mod server;
pub mod types;
pub mod video;
pub mod worker;

pub use config::Args;
pub use server::run;
pub use types::{ClipwayError, Result};
pub use worker::{EdgeWorker, WorkerConfig};

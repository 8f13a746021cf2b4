//! Video selection state and client notification
//!
//! - [`CurrentVideo`] - the single "what is playing" slot
//! - [`VideoResolver`] - selection form handling
//! - [`ClientRegistry`] - fan-out of `video/set` to connected clients
//! - [`ClientMessage`] - the JSON message protocol

pub mod clients;
pub mod messages;
pub mod resolver;
pub mod state;

pub use clients::{ClientHandle, ClientInfo, ClientRegistry};
pub use messages::ClientMessage;
pub use resolver::{ClipRef, LocalFile, ResolvedVideo, Submission, VideoResolver, VideoSource};
pub use state::{CurrentVideo, CURRENT_VIDEO_KEY};

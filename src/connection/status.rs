use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared online/offline flag.
///
/// Cloning yields another handle to the same flag. Only the connection monitor
/// writes it in production.
#[derive(Debug, Clone)]
pub struct ConnectionStatus(Arc<AtomicBool>);

impl ConnectionStatus {
    /// Starts ONLINE
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_online(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Store a new state, returning the previous one
    pub fn set_online(&self, online: bool) -> bool {
        self.0.swap(online, Ordering::SeqCst)
    }

    pub fn label(&self) -> &'static str {
        if self.is_online() {
            "online"
        } else {
            "offline"
        }
    }
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_share_state() {
        let status = ConnectionStatus::new();
        let other = status.clone();
        assert!(status.is_online());

        assert!(other.set_online(false));
        assert!(!status.is_online());
        assert_eq!(status.label(), "offline");
    }
}

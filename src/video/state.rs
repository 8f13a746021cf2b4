use std::sync::Arc;
use tokio::sync::RwLock;

/// Key under which the current selection is stored
pub const CURRENT_VIDEO_KEY: &str = "video";

/// The currently selected video URL, shared by the resolver and the
/// message handler. Empty at startup.
#[derive(Debug, Clone, Default)]
pub struct CurrentVideo(Arc<RwLock<Option<String>>>);

impl CurrentVideo {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self) -> Option<String> {
        self.0.read().await.clone()
    }

    /// Replace the selection, returning the previous value
    pub async fn set(&self, value: Option<String>) -> Option<String> {
        std::mem::replace(&mut *self.0.write().await, value)
    }

    /// Look up a state slot by key. Only `video` exists.
    pub async fn lookup(&self, key: &str) -> Option<String> {
        if key == CURRENT_VIDEO_KEY {
            self.get().await
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_returns_previous() {
        let current = CurrentVideo::new();
        assert_eq!(current.get().await, None);

        assert_eq!(current.set(Some("/clips/load/g1/c1".into())).await, None);
        assert_eq!(
            current.set(Some("/clips/load/g1/c2".into())).await,
            Some("/clips/load/g1/c1".into())
        );
        assert_eq!(current.lookup("video").await, Some("/clips/load/g1/c2".into()));
        assert_eq!(current.lookup("audio").await, None);
    }
}

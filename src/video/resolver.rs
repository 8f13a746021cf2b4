//! Video selection
//!
//! Turns a selection form submission into the URL clients should play, makes
//! sure the media is in the `clips` partition, records it as current and tells
//! every connected client.

use bytes::Bytes;
use hyper::Method;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use super::clients::ClientRegistry;
use super::messages::ClientMessage;
use super::state::CurrentVideo;
use crate::cache::Partition;
use crate::types::{FetchedResponse, Result, ValidationError};
use crate::worker::fetch::CachingFetcher;

/// An uploaded video file
#[derive(Debug, Clone)]
pub struct LocalFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl LocalFile {
    fn is_usable(&self) -> bool {
        !self.file_name.trim().is_empty() && !self.data.is_empty()
    }
}

/// A remote clip, served by the origin under `/clips/load/<group>/<name>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipRef {
    pub group: String,
    pub name: String,
}

impl ClipRef {
    pub fn path(&self) -> String {
        format!(
            "/clips/load/{}/{}",
            urlencoding::encode(&self.group),
            urlencoding::encode(&self.name)
        )
    }
}

/// Fields of a selection request, from a form body or a query string
#[derive(Debug, Clone, Default)]
pub struct Submission {
    /// Uploaded file content (multipart POST only)
    pub upload: Option<LocalFile>,
    /// Name of an already stored local video
    pub file: Option<String>,
    pub clip_group: Option<String>,
    pub clip_name: Option<String>,
}

impl Submission {
    fn clip(&self) -> Option<ClipRef> {
        let group = non_empty(self.clip_group.as_deref())?;
        let name = non_empty(self.clip_name.as_deref())?;
        Some(ClipRef {
            group: group.to_string(),
            name: name.to_string(),
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoSource {
    Upload,
    Stored,
    Clip,
}

/// Outcome of a successful selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedVideo {
    /// Path clients load the video from
    pub url: String,
    pub source: VideoSource,
}

pub struct VideoResolver {
    fetcher: Arc<CachingFetcher>,
    current: CurrentVideo,
    clients: Arc<ClientRegistry>,
    namespace: String,
}

impl VideoResolver {
    pub fn new(
        fetcher: Arc<CachingFetcher>,
        current: CurrentVideo,
        clients: Arc<ClientRegistry>,
        namespace: &str,
    ) -> Self {
        Self {
            fetcher,
            current,
            clients,
            namespace: namespace.trim_end_matches('/').to_string(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Path prefix for stored local videos
    pub fn local_video_prefix(&self) -> String {
        format!("{}/localvideo/", self.namespace)
    }

    /// Path a local video with this file name is stored under
    pub fn local_video_path(&self, file_name: &str) -> String {
        format!("{}{}", self.local_video_prefix(), urlencoding::encode(file_name))
    }

    /// Resolve a selection and make it current.
    ///
    /// Priority: uploaded file, then stored file name, then clip pair.
    pub async fn resolve_selection(&self, submission: Submission) -> Result<ResolvedVideo> {
        let resolved = if let Some(upload) = submission.upload.as_ref().filter(|f| f.is_usable()) {
            self.store_upload(upload)?
        } else if let Some(name) = non_empty(submission.file.as_deref()) {
            self.select_stored(name)?
        } else if let Some(clip) = submission.clip() {
            self.fetch_clip(&clip).await?
        } else {
            return Err(ValidationError::BadRequest(
                "Neither a video file nor a clip was selected".to_string(),
            )
            .into());
        };

        self.set_current(Some(resolved.url.clone())).await;
        Ok(resolved)
    }

    fn store_upload(&self, upload: &LocalFile) -> Result<ResolvedVideo> {
        let path = self.local_video_path(&upload.file_name);
        let key = self.fetcher.key_for(Method::GET, &path)?;
        let content_type = upload
            .content_type
            .as_deref()
            .unwrap_or("application/octet-stream");

        self.fetcher.cache().put_response(
            Partition::Clips,
            &key,
            FetchedResponse::ok(upload.data.clone(), content_type),
        );
        info!(file = %upload.file_name, size = upload.data.len(), "Stored local video");

        Ok(ResolvedVideo {
            url: path,
            source: VideoSource::Upload,
        })
    }

    fn select_stored(&self, file_name: &str) -> Result<ResolvedVideo> {
        let path = self.local_video_path(file_name);
        let key = self.fetcher.key_for(Method::GET, &path)?;
        if !self.fetcher.cache().contains(Partition::Clips, &key) {
            return Err(ValidationError::UnknownLocalVideo(file_name.to_string()).into());
        }
        Ok(ResolvedVideo {
            url: path,
            source: VideoSource::Stored,
        })
    }

    async fn fetch_clip(&self, clip: &ClipRef) -> Result<ResolvedVideo> {
        let path = clip.path();
        let response = self.fetcher.fetch_clip(&path).await?;
        debug!(clip = %path, status = %response.status, "Clip selected");
        Ok(ResolvedVideo {
            url: path,
            source: VideoSource::Clip,
        })
    }

    /// Replace the current selection and broadcast it.
    ///
    /// Stored local videos stay in the `clips` partition so they can be
    /// selected again by name; an upload under the same name overwrites.
    pub async fn set_current(&self, value: Option<String>) {
        let previous = self.current.set(value.clone()).await;
        info!(video = ?value, previous = ?previous, "Current video set");
        self.clients.broadcast(ClientMessage::video_set(value));
    }

    /// Value of a state slot, serialised as JSON (`null` when empty)
    pub async fn current(&self, key: &str) -> Result<String> {
        Ok(serde_json::to_string(&self.current.lookup(key).await)?)
    }

    pub async fn current_video(&self) -> Option<String> {
        self.current.get().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{AssetPolicyTable, CacheStore};
    use crate::connection::ConnectionStatus;
    use crate::origin::mock::ScriptedOrigin;
    use crate::types::ClipwayError;
    use url::Url;

    struct Fixture {
        origin: Arc<ScriptedOrigin>,
        fetcher: Arc<CachingFetcher>,
        clients: Arc<ClientRegistry>,
        resolver: VideoResolver,
    }

    fn fixture() -> Fixture {
        let origin = Arc::new(ScriptedOrigin::new());
        let fetcher = Arc::new(CachingFetcher::new(
            origin.clone(),
            Url::parse("http://localhost:5000").unwrap(),
            Arc::new(CacheStore::new(Arc::new(AssetPolicyTable::default()))),
            ConnectionStatus::new(),
        ));
        let clients = Arc::new(ClientRegistry::new());
        let resolver = VideoResolver::new(fetcher.clone(), CurrentVideo::new(), clients.clone(), "/client/");
        Fixture {
            origin,
            fetcher,
            clients,
            resolver,
        }
    }

    fn upload(name: &str, data: &'static [u8]) -> Submission {
        Submission {
            upload: Some(LocalFile {
                file_name: name.to_string(),
                content_type: Some("video/mp4".to_string()),
                data: Bytes::from_static(data),
            }),
            ..Default::default()
        }
    }

    fn clip(group: &str, name: &str) -> Submission {
        Submission {
            clip_group: Some(group.to_string()),
            clip_name: Some(name.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_remote_clip_selected_and_broadcast() {
        let f = fixture();
        f.origin.serve_ok("/clips/load/g1/c1", b"clip", "video/mp4");
        let mut rx = f.clients.subscribe();

        let resolved = f.resolver.resolve_selection(clip("g1", "c1")).await.unwrap();
        assert_eq!(resolved.url, "/clips/load/g1/c1");
        assert_eq!(resolved.source, VideoSource::Clip);
        assert_eq!(f.resolver.current_video().await, Some("/clips/load/g1/c1".into()));
        assert_eq!(
            rx.recv().await.unwrap(),
            ClientMessage::video_set(Some("/clips/load/g1/c1".into()))
        );

        let key = f.fetcher.key_for(Method::GET, "/clips/load/g1/c1").unwrap();
        assert!(f.fetcher.cache().contains(Partition::Clips, &key));
    }

    #[tokio::test]
    async fn test_upload_wins_over_clip() {
        let f = fixture();
        let mut submission = upload("match.mp4", b"local bytes");
        submission.clip_group = Some("g1".into());
        submission.clip_name = Some("c1".into());

        let resolved = f.resolver.resolve_selection(submission).await.unwrap();
        assert_eq!(resolved.url, "/client/localvideo/match.mp4");
        assert_eq!(resolved.source, VideoSource::Upload);
        assert_eq!(f.origin.fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_upload_falls_through_to_clip() {
        let f = fixture();
        f.origin.serve_ok("/clips/load/g1/c1", b"clip", "video/mp4");
        let mut submission = upload("", b"");
        submission.clip_group = Some("g1".into());
        submission.clip_name = Some("c1".into());

        let resolved = f.resolver.resolve_selection(submission).await.unwrap();
        assert_eq!(resolved.source, VideoSource::Clip);
    }

    #[tokio::test]
    async fn test_nothing_selected_is_bad_request() {
        let f = fixture();
        let err = f
            .resolver
            .resolve_selection(Submission {
                clip_group: Some("g1".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClipwayError::Validation(ValidationError::BadRequest(_))
        ));
        assert_eq!(f.resolver.current_video().await, None);
    }

    #[tokio::test]
    async fn test_stored_video_by_name() {
        let f = fixture();
        f.resolver
            .resolve_selection(upload("a.mp4", b"aaaa"))
            .await
            .unwrap();

        let resolved = f
            .resolver
            .resolve_selection(Submission {
                file: Some("a.mp4".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(resolved.source, VideoSource::Stored);

        let err = f
            .resolver
            .resolve_selection(Submission {
                file: Some("missing.mp4".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), hyper::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_replaced_local_video_can_be_reselected() {
        let f = fixture();
        f.resolver.resolve_selection(upload("a.mp4", b"aaaa")).await.unwrap();
        f.resolver.resolve_selection(upload("b.mp4", b"bbbb")).await.unwrap();
        f.origin.serve_ok("/clips/load/g1/c1", b"clip", "video/mp4");
        f.resolver.resolve_selection(clip("g1", "c1")).await.unwrap();

        let resolved = f
            .resolver
            .resolve_selection(Submission {
                file: Some("a.mp4".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(resolved.url, "/client/localvideo/a.mp4");
        assert_eq!(resolved.source, VideoSource::Stored);

        let b = f.fetcher.key_for(Method::GET, "/client/localvideo/b.mp4").unwrap();
        assert!(f.fetcher.cache().contains(Partition::Clips, &b));
    }

    #[tokio::test]
    async fn test_upload_with_same_name_overwrites() {
        let f = fixture();
        f.resolver.resolve_selection(upload("a.mp4", b"old")).await.unwrap();
        f.resolver.resolve_selection(upload("a.mp4", b"new bytes")).await.unwrap();

        let a = f.fetcher.key_for(Method::GET, "/client/localvideo/a.mp4").unwrap();
        let entry = f.fetcher.cache().get_response(Partition::Clips, &a).unwrap();
        assert_eq!(entry.response.body, Bytes::from_static(b"new bytes"));
    }

    #[tokio::test]
    async fn test_current_serialised_as_json() {
        let f = fixture();
        assert_eq!(f.resolver.current("video").await.unwrap(), "null");
        f.resolver.set_current(Some("/clips/load/g1/c1".into())).await;
        assert_eq!(f.resolver.current("video").await.unwrap(), "\"/clips/load/g1/c1\"");
    }

    #[test]
    fn test_clip_path_encoded() {
        let clip = ClipRef {
            group: "group one".into(),
            name: "c/1".into(),
        };
        assert_eq!(clip.path(), "/clips/load/group%20one/c%2F1");
    }
}

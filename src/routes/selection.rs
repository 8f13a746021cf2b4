//! Video selection request decoding
//!
//! Reads the `file`, `clip_group` and `clip_name` fields from:
//! - GET query string
//! - POST `application/x-www-form-urlencoded` body
//! - POST `multipart/form-data` body (the only way to upload a file)

use bytes::Bytes;
use hyper::header::{self, HeaderMap};
use hyper::Method;
use serde::Deserialize;
use std::convert::Infallible;
use tracing::debug;

use crate::types::{ClipwayError, Result, ValidationError};
use crate::video::{LocalFile, Submission};

#[derive(Debug, Default, Deserialize)]
struct SelectionFields {
    file: Option<String>,
    clip_group: Option<String>,
    clip_name: Option<String>,
}

impl From<SelectionFields> for Submission {
    fn from(fields: SelectionFields) -> Self {
        Submission {
            upload: None,
            file: fields.file,
            clip_group: fields.clip_group,
            clip_name: fields.clip_name,
        }
    }
}

fn bad_request(context: &str, err: impl std::fmt::Display) -> ClipwayError {
    ValidationError::BadRequest(format!("{}: {}", context, err)).into()
}

/// Decode a selection request
pub async fn parse_submission(
    method: &Method,
    headers: &HeaderMap,
    query: Option<&str>,
    body: Bytes,
) -> Result<Submission> {
    if *method == Method::GET {
        let fields: SelectionFields = serde_urlencoded::from_str(query.unwrap_or(""))
            .map_err(|e| bad_request("Invalid query", e))?;
        return Ok(fields.into());
    }

    if *method != Method::POST {
        return Err(ValidationError::MethodNotAllowed(method.to_string()).into());
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if content_type
        .to_ascii_lowercase()
        .starts_with("multipart/form-data")
    {
        parse_multipart(content_type, body).await
    } else {
        let fields: SelectionFields =
            serde_urlencoded::from_bytes(&body).map_err(|e| bad_request("Invalid form", e))?;
        Ok(fields.into())
    }
}

async fn parse_multipart(content_type: &str, body: Bytes) -> Result<Submission> {
    let boundary =
        multer::parse_boundary(content_type).map_err(|e| bad_request("Invalid multipart", e))?;
    let stream = futures::stream::once(async move { Ok::<Bytes, Infallible>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut submission = Submission::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request("Invalid multipart", e))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(|m| m.to_string());
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| bad_request("Invalid upload", e))?;
                match file_name {
                    Some(file_name) => {
                        debug!(file = %file_name, size = data.len(), "Received upload");
                        submission.upload = Some(LocalFile {
                            file_name,
                            content_type,
                            data,
                        });
                    }
                    None => submission.file = Some(String::from_utf8_lossy(&data).into_owned()),
                }
            }
            Some("clip_group") => {
                submission.clip_group = Some(field.text().await.map_err(|e| bad_request("Invalid field", e))?);
            }
            Some("clip_name") => {
                submission.clip_name = Some(field.text().await.map_err(|e| bad_request("Invalid field", e))?);
            }
            _ => {}
        }
    }

    Ok(submission)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;

    fn headers(content_type: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        headers
    }

    #[tokio::test]
    async fn test_get_query() {
        let submission = parse_submission(
            &Method::GET,
            &HeaderMap::new(),
            Some("clip_group=g1&clip_name=c%201"),
            Bytes::new(),
        )
        .await
        .unwrap();
        assert_eq!(submission.clip_group.as_deref(), Some("g1"));
        assert_eq!(submission.clip_name.as_deref(), Some("c 1"));
        assert!(submission.upload.is_none());
    }

    #[tokio::test]
    async fn test_urlencoded_post() {
        let submission = parse_submission(
            &Method::POST,
            &headers("application/x-www-form-urlencoded"),
            None,
            Bytes::from_static(b"clip_group=g1&clip_name=c1"),
        )
        .await
        .unwrap();
        assert_eq!(submission.clip_name.as_deref(), Some("c1"));
    }

    #[tokio::test]
    async fn test_multipart_upload() {
        let body = "--XYZ\r\n\
            Content-Disposition: form-data; name=\"file\"; filename=\"match.mp4\"\r\n\
            Content-Type: video/mp4\r\n\r\n\
            VIDEODATA\r\n\
            --XYZ\r\n\
            Content-Disposition: form-data; name=\"clip_group\"\r\n\r\n\
            g1\r\n\
            --XYZ--\r\n";

        let submission = parse_submission(
            &Method::POST,
            &headers("multipart/form-data; boundary=XYZ"),
            None,
            Bytes::from(body),
        )
        .await
        .unwrap();

        let upload = submission.upload.unwrap();
        assert_eq!(upload.file_name, "match.mp4");
        assert_eq!(upload.content_type.as_deref(), Some("video/mp4"));
        assert_eq!(upload.data, Bytes::from_static(b"VIDEODATA"));
        assert_eq!(submission.clip_group.as_deref(), Some("g1"));
    }

    #[tokio::test]
    async fn test_other_methods_rejected() {
        let err = parse_submission(&Method::PUT, &HeaderMap::new(), None, Bytes::new())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), hyper::StatusCode::METHOD_NOT_ALLOWED);
    }
}

//! reqwest-backed origin client

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{Origin, OriginRequest};
use crate::types::{ClipwayError, FetchedResponse, Result};

/// Origin reached over HTTP
#[derive(Clone)]
pub struct HttpOrigin {
    client: reqwest::Client,
}

impl HttpOrigin {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("clipway/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClipwayError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

}

#[async_trait]
impl Origin for HttpOrigin {
    async fn fetch(&self, request: OriginRequest) -> Result<FetchedResponse> {
        let OriginRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let mut builder = self.client.request(method.clone(), url.clone()).headers(headers);
        if !body.is_empty() {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        debug!(method = %method, url = %url, status = %status, size = body.len(), "Origin fetch");
        Ok(FetchedResponse::new(status, headers, body))
    }

    /// Reachability only: any HTTP reply counts, whatever its status.
    async fn probe(&self, url: &Url, timeout: Duration) -> Result<()> {
        let response = self
            .client
            .head(url.clone())
            .timeout(timeout)
            .send()
            .await?;

        debug!(url = %url, status = %response.status(), "Probe answered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answer one request with a fixed status line
    async fn answer_once(status_line: &'static str) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf).await;
            let reply = format!(
                "HTTP/1.1 {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                status_line
            );
            let _ = stream.write_all(reply.as_bytes()).await;
        });
        Url::parse(&format!("http://{}/", addr)).unwrap()
    }

    #[tokio::test]
    async fn test_probe_accepts_error_status() {
        let origin = HttpOrigin::new().unwrap();
        for status in ["405 Method Not Allowed", "404 Not Found", "503 Service Unavailable"] {
            let url = answer_once(status).await;
            tokio_test::assert_ok!(origin.probe(&url, Duration::from_secs(2)).await);
        }
    }

    #[tokio::test]
    async fn test_probe_fails_when_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let origin = HttpOrigin::new().unwrap();
        let url = Url::parse(&format!("http://{}/", addr)).unwrap();
        let err = origin.probe(&url, Duration::from_secs(2)).await.unwrap_err();
        assert!(matches!(err, ClipwayError::Network(_)));
    }
}

//! HTTP server implementation
//!
//! hyper http1 with TokioIo. Every request except the front-end's own routes is
//! buffered and handed to the [`EdgeWorker`].

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::routes::{self, error_response};
use crate::server::websocket;
use crate::types::{ClipwayError, Result};
use crate::worker::EdgeWorker;

/// Accept connections until `shutdown` resolves
pub async fn run(
    worker: Arc<EdgeWorker>,
    listen: SocketAddr,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    let listener = TcpListener::bind(listen).await?;
    serve(worker, listener, shutdown).await
}

/// Serve on an already bound listener
pub async fn serve(
    worker: Arc<EdgeWorker>,
    listener: TcpListener,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    info!(
        listen = %listener.local_addr()?,
        origin = %worker.config().origin_url,
        "clipway listening"
    );
    info!(
        path = format!("{}/messages", worker.config().namespace),
        "Client message channel enabled"
    );

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown requested, no longer accepting connections");
                return Ok(());
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    let worker = Arc::clone(&worker);
                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);

                        let service = service_fn(move |req| {
                            let worker = Arc::clone(&worker);
                            async move { handle_request(worker, addr, req).await }
                        });

                        if let Err(err) = http1::Builder::new()
                            .serve_connection(io, service)
                            .with_upgrades()
                            .await
                        {
                            debug!("Error serving connection from {}: {:?}", addr, err);
                        }
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {:?}", e);
                }
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    worker: Arc<EdgeWorker>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    debug!("[{}] {} {}", addr, method, path);

    let messages_path = format!("{}/messages", worker.config().namespace);

    match (&method, path.as_str()) {
        (&Method::GET, "/health") | (&Method::GET, "/healthz") => {
            return Ok(routes::health_check(&worker).await);
        }
        (&Method::GET, "/version") => return Ok(routes::version_info()),
        (&Method::GET, p) if p == messages_path => {
            return Ok(websocket::handle_messages_ws(worker, req));
        }
        _ => {}
    }

    let (parts, body) = req.into_parts();
    let body = body.collect().await?.to_bytes();
    let request = Request::from_parts(parts, body);

    // Detached so a client disconnect never cancels a fetch-and-store
    let handle = tokio::spawn(async move { worker.handle(request).await });
    let response = match handle.await {
        Ok(response) => response,
        Err(e) => {
            error!(path = %path, error = %e, "Worker task failed");
            error_response(ClipwayError::Internal(e.to_string()))
        }
    };

    debug!("[{}] {} {} -> {}", addr, method, path, response.status());
    Ok(response)
}

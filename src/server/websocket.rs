//! Client message channel over WebSocket
//!
//! Each connection is registered with the worker's [`ClientRegistry`] and
//! receives every broadcast. Incoming text frames are decoded as
//! [`ClientMessage`]s and replies go back on the same socket.
//!
//! [`ClientRegistry`]: crate::video::ClientRegistry

use futures_util::{SinkExt, StreamExt};
use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::{Request, Response, StatusCode};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, error, info, warn};

use crate::video::ClientMessage;
use crate::worker::EdgeWorker;

/// WebSocket type after upgrade
type HyperWebSocket =
    hyper_tungstenite::WebSocketStream<hyper_util::rt::TokioIo<hyper::upgrade::Upgraded>>;

fn plain(status: StatusCode, message: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(message.as_bytes())));
    *response.status_mut() = status;
    response
}

/// Handle WebSocket upgrade for the message channel
pub fn handle_messages_ws(worker: Arc<EdgeWorker>, req: Request<Incoming>) -> Response<Full<Bytes>> {
    if !hyper_tungstenite::is_upgrade_request(&req) {
        return plain(StatusCode::BAD_REQUEST, "WebSocket upgrade required");
    }

    let (response, websocket) = match hyper_tungstenite::upgrade(req, None) {
        Ok(upgrade) => upgrade,
        Err(e) => {
            error!("WebSocket upgrade failed: {}", e);
            return plain(StatusCode::INTERNAL_SERVER_ERROR, "WebSocket upgrade failed");
        }
    };

    tokio::spawn(async move {
        match websocket.await {
            Ok(ws) => {
                if let Err(e) = handle_connection(ws, worker).await {
                    warn!("Client WebSocket error: {}", e);
                }
            }
            Err(e) => error!("WebSocket connection failed: {}", e),
        }
    });

    let (parts, _body) = response.into_parts();
    Response::from_parts(parts, Full::new(Bytes::new()))
}

async fn handle_connection(
    ws: HyperWebSocket,
    worker: Arc<EdgeWorker>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let (mut sender, mut receiver) = ws.split();
    let mut client = worker.clients().register("websocket");
    let client_id = client.id;

    let result = loop {
        tokio::select! {
            msg = client.receiver.recv() => {
                match msg {
                    Ok(message) => {
                        let json = match serde_json::to_string(&message) {
                            Ok(json) => json,
                            Err(e) => break Err(e.into()),
                        };
                        if sender.send(WsMessage::Text(json)).await.is_err() {
                            break Ok(());
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break Ok(()),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(client_id = %client_id, skipped, "Client lagging behind broadcasts");
                        continue;
                    }
                }
            }

            msg = receiver.next() => {
                match msg {
                    Some(Ok(WsMessage::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(message) => {
                                if let Some(reply) = worker.on_message(message).await {
                                    let json = match serde_json::to_string(&reply) {
                                        Ok(json) => json,
                                        Err(e) => break Err(e.into()),
                                    };
                                    if sender.send(WsMessage::Text(json)).await.is_err() {
                                        break Ok(());
                                    }
                                }
                            }
                            Err(e) => {
                                debug!(client_id = %client_id, error = %e, "Ignoring unrecognised message");
                            }
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | None => break Ok(()),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break Err(e.into()),
                }
            }
        }
    };

    worker.clients().unregister(&client_id);
    info!(client_id = %client_id, "Client WebSocket closed");
    result
}

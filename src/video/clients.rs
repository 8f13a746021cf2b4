//! Registry of connected clients
//!
//! Broadcasts fan out through a tokio broadcast channel; each transport
//! connection registers itself so the registry can report who is listening.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

use super::messages::ClientMessage;

const BROADCAST_CAPACITY: usize = 64;

/// A connected client
#[derive(Debug, Clone, Serialize)]
pub struct ClientInfo {
    pub id: Uuid,
    pub transport: &'static str,
    pub connected_at: DateTime<Utc>,
}

/// Handle held by a connection for as long as it is open
pub struct ClientHandle {
    pub id: Uuid,
    pub receiver: broadcast::Receiver<ClientMessage>,
}

pub struct ClientRegistry {
    sender: broadcast::Sender<ClientMessage>,
    clients: DashMap<Uuid, ClientInfo>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            sender,
            clients: DashMap::new(),
        }
    }

    /// Register a client and subscribe it to broadcasts
    pub fn register(&self, transport: &'static str) -> ClientHandle {
        let id = Uuid::new_v4();
        self.clients.insert(
            id,
            ClientInfo {
                id,
                transport,
                connected_at: Utc::now(),
            },
        );
        info!(client_id = %id, transport, total = self.clients.len(), "Client connected");
        ClientHandle {
            id,
            receiver: self.sender.subscribe(),
        }
    }

    pub fn unregister(&self, id: &Uuid) {
        if self.clients.remove(id).is_some() {
            info!(client_id = %id, total = self.clients.len(), "Client disconnected");
        }
    }

    /// Subscribe without registering, for in-process observers
    pub fn subscribe(&self) -> broadcast::Receiver<ClientMessage> {
        self.sender.subscribe()
    }

    /// Send to every subscriber; returns how many received it
    pub fn broadcast(&self, message: ClientMessage) -> usize {
        let name = message.name();
        // No subscribers is not an error
        let delivered = self.sender.send(message).unwrap_or(0);
        debug!(message = name, delivered, "Broadcast");
        delivered
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

//! Live set of open WebSocket connections.

use axum::extract::ws::Message;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

pub type ConnId = String;

/// Handle to one open connection.
///
/// Messages pushed into the handle are drained by the connection's writer
/// task, so a slow or dead peer never stalls whoever is sending. The channel
/// is unbounded; once the peer is gone the push fails and the message drops.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    pub id: ConnId,
    pub connected_at: DateTime<Utc>,
    tx: mpsc::UnboundedSender<Message>,
}

impl ConnectionHandle {
    pub fn new(id: ConnId, tx: mpsc::UnboundedSender<Message>) -> Self {
        Self {
            id,
            connected_at: Utc::now(),
            tx,
        }
    }

    /// Queue a message for this connection.
    /// Returns false if the connection's writer task is gone (peer closed);
    /// callers treat that as a no-op.
    pub fn send(&self, msg: Message) -> bool {
        self.tx.send(msg).is_ok()
    }
}

/// Registry of currently open connections.
///
/// Membership mirrors the set of open sockets: a connection is registered
/// before its ack is sent and removed synchronously when its socket loop
/// exits.
#[derive(Clone, Default)]
pub struct Registry {
    conns: Arc<RwLock<HashMap<ConnId, ConnectionHandle>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection. No-op if the id is already registered.
    pub async fn register(&self, handle: ConnectionHandle) {
        let mut conns = self.conns.write().await;
        conns.entry(handle.id.clone()).or_insert(handle);
    }

    /// Remove a connection. An absent id is not an error.
    pub async fn unregister(&self, id: &str) {
        self.conns.write().await.remove(id);
    }

    /// Consistent snapshot of the current membership, taken for one fan-out.
    pub async fn snapshot(&self) -> Vec<ConnectionHandle> {
        self.conns.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.conns.read().await.len()
    }
}

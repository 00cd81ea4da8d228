//! Wire envelopes sent to WebSocket clients.

use serde::{Deserialize, Serialize};

/// Messages the server writes to clients.
///
/// Serialized untagged so the wire shapes stay exactly
/// `{"connection":"ok"}` and `{"message":"<payload>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerMessage {
    /// One-time acknowledgment sent to a connection right after it registers.
    Connected { connection: String },
    /// Fan-out envelope wrapping one inbound payload.
    Broadcast { message: String },
}

impl ServerMessage {
    pub fn connected() -> Self {
        Self::Connected {
            connection: "ok".to_string(),
        }
    }

    pub fn broadcast(payload: impl Into<String>) -> Self {
        Self::Broadcast {
            message: payload.into(),
        }
    }
}

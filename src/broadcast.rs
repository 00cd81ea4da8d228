//! Message fan-out to every registered connection.

use axum::extract::ws::Message;

use crate::protocol::ServerMessage;
use crate::registry::Registry;

/// Deliver `payload` to every connection in a fresh registry snapshot.
///
/// The sender is in the snapshot like everyone else and receives its own
/// message back; there is no self-exclusion. Delivery goes through each
/// connection's own outbox, so one dead or slow recipient cannot hold up the
/// rest.
pub async fn fan_out(registry: &Registry, payload: String) {
    let envelope = ServerMessage::broadcast(payload);
    let json = match serde_json::to_string(&envelope) {
        Ok(json) => json,
        Err(e) => {
            tracing::error!("Failed to serialize broadcast envelope: {}", e);
            return;
        }
    };

    let recipients = registry.snapshot().await;
    tracing::debug!("Broadcasting to {} connections", recipients.len());

    for conn in recipients {
        // A connection that closed mid-broadcast just misses the message.
        if !conn.send(Message::Text(json.clone().into())) {
            tracing::debug!("Connection {} already closed, skipping", conn.id);
        }
    }
}

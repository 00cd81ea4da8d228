use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::broadcast;
use crate::protocol::ServerMessage;
use crate::registry::ConnectionHandle;
use crate::state::AppState;

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    tracing::info!("WebSocket connection request");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    let conn_id = ulid::Ulid::new().to_string();
    let handle = ConnectionHandle::new(conn_id.clone(), tx);

    // Writer task: drains this connection's outbox into the socket. Keeping
    // all writes on one task means a slow peer only ever stalls itself.
    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                break;
            }
        }
    });

    state.registry.register(handle.clone()).await;
    let open = state.registry.len().await;
    tracing::info!("Connection {} registered ({} open)", conn_id, open);

    // The ack goes to the new connection only, no fan-out.
    if let Ok(json) = serde_json::to_string(&ServerMessage::connected()) {
        if !handle.send(Message::Text(json.into())) {
            tracing::error!("Failed to queue connection ack for {}", conn_id);
        }
    }

    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                tracing::debug!("Message from {}", conn_id);
                broadcast::fan_out(&state.registry, text.to_string()).await;
            }
            Ok(Message::Binary(data)) => {
                // Binary frames are fanned out as (lossy) UTF-8 text.
                let payload = String::from_utf8_lossy(&data).into_owned();
                broadcast::fan_out(&state.registry, payload).await;
            }
            Ok(Message::Close(_)) => {
                tracing::info!("Connection {} closed by peer", conn_id);
                break;
            }
            Ok(Message::Ping(data)) => {
                if !handle.send(Message::Pong(data)) {
                    break;
                }
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!("WebSocket error on {}: {}", conn_id, e);
                break;
            }
        }
    }

    // Synchronous removal keeps the registry mirroring the open sockets.
    state.registry.unregister(&conn_id).await;
    writer.abort();
    let open = state.registry.len().await;
    tracing::info!("Connection {} unregistered ({} open)", conn_id, open);
}

use axum::{middleware, routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wscast::{config::ServerConfig, gate, probes, state::AppState, ws};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wscast=debug,tower_http=debug,axum=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting wscast...");

    let server_config = ServerConfig::from_env();
    let gate_config = Arc::new(gate::GateConfig::from_env());

    let state = Arc::new(AppState::new());

    // WebSocket route behind the shared-secret header gate
    let ws_routes = Router::new()
        .route("/wss", get(ws::ws_handler))
        .layer(middleware::from_fn_with_state(
            gate_config.clone(),
            gate::gate_middleware,
        ));

    // Health probes stay outside the gate: each serves its own checker
    let app = Router::new()
        .merge(ws_routes)
        .route("/health", get(probes::edge_health))
        .route("/", get(probes::target_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], server_config.port));
    tracing::info!("WebSocket server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

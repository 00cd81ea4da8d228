//! Liveness endpoints for the two external health checkers.
//!
//! Both are plain handlers with no shared locks, so they answer regardless of
//! connection or broadcast load. Neither sits behind the header gate.

/// GET /health — polled by the edge-level checker.
pub async fn edge_health() -> &'static str {
    tracing::debug!("Edge health check");
    "Ok"
}

/// GET / — polled by the routing-layer target checker.
pub async fn target_health() -> &'static str {
    tracing::debug!("Target group health check");
    "Ok"
}

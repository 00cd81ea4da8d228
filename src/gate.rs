//! Shared-secret header gate for the WebSocket route.
//!
//! The edge injects a secret header into every request it forwards. Anything
//! arriving without that header never came through the edge and is refused
//! with a fixed status before any connection handling runs.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

pub const DEFAULT_HEADER_NAME: &str = "x-edge-secret";

/// Header the edge injects and the secret it must carry.
#[derive(Debug, Clone)]
pub struct GateConfig {
    pub header_name: String,
    /// Shared secret (None = enforcement disabled)
    pub secret: Option<String>,
}

impl GateConfig {
    /// Load gate config from environment variables.
    /// GATE_HEADER_SECRET must be set to enable enforcement;
    /// GATE_HEADER_NAME overrides the default header name.
    pub fn from_env() -> Self {
        let header_name = std::env::var("GATE_HEADER_NAME")
            .ok()
            .map(|s| s.trim().to_ascii_lowercase())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_HEADER_NAME.to_string());

        let secret = std::env::var("GATE_HEADER_SECRET")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        if secret.is_some() {
            tracing::info!("Edge gate enabled on header {}", header_name);
        } else {
            tracing::warn!("Edge gate DISABLED - origin is reachable without the edge!");
        }

        Self {
            header_name,
            secret,
        }
    }

    /// Check if enforcement is enabled
    pub fn is_enabled(&self) -> bool {
        self.secret.is_some()
    }

    /// Validate a presented header value against the shared secret
    pub fn validate(&self, presented: &str) -> bool {
        match &self.secret {
            // Use constant-time comparison to prevent timing attacks
            Some(secret) => constant_time_eq(secret.as_bytes(), presented.as_bytes()),
            None => true, // Gate disabled, allow all
        }
    }
}

/// Constant-time byte comparison to prevent timing attacks
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

/// Middleware enforcing the shared-secret header on gated routes.
pub async fn gate_middleware(
    State(config): State<Arc<GateConfig>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !config.is_enabled() {
        return next.run(request).await;
    }

    let presented = request
        .headers()
        .get(&config.header_name)
        .and_then(|v| v.to_str().ok());

    match presented {
        Some(value) if config.validate(value) => next.run(request).await,
        Some(_) => {
            tracing::warn!("Rejected request with wrong {} value", config.header_name);
            (StatusCode::FORBIDDEN, "Forbidden").into_response()
        }
        None => {
            tracing::warn!("Rejected request missing {} header", config.header_name);
            (StatusCode::FORBIDDEN, "Forbidden").into_response()
        }
    }
}

//! One-shot access-gate enforcement, run at deployment lifecycle events.
//!
//! Usage: `gatectl <create|update|delete>`
//!
//! Environment:
//! - `EDGE_API_URL` — base URL of the edge control plane (create/update)
//! - `DISTRIBUTION_ID` — distribution to update (create/update)
//! - `GATE_HEADER_NAME` — header to inject (default `x-edge-secret`)
//! - `GATE_HEADER_SECRET` — shared secret; generated and printed when unset
//! - `GATE_SECRET_LENGTH` — length of a generated secret (default 32)

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wscast::edge::{
    generate_secret, CustomHeader, GateEnforcer, HeaderRuleRequest, HttpControlPlane,
    LifecycleEvent, DEFAULT_SECRET_LENGTH,
};
use wscast::gate;

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gatectl=info,wscast=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!("Gate enforcement failed: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let action = match std::env::args().nth(1) {
        Some(action) => action,
        None => {
            eprintln!("usage: gatectl <create|update|delete>");
            std::process::exit(2);
        }
    };

    let event = match action.as_str() {
        "delete" => LifecycleEvent::Delete,
        "create" | "update" => {
            let request = build_request()?;
            if action == "create" {
                LifecycleEvent::Create(request)
            } else {
                LifecycleEvent::Update(request)
            }
        }
        other => {
            eprintln!("unknown action: {} (expected create|update|delete)", other);
            std::process::exit(2);
        }
    };

    // Delete never contacts the control plane, so the URL may stay unset.
    let base_url =
        std::env::var("EDGE_API_URL").unwrap_or_else(|_| "http://127.0.0.1:8081".to_string());
    let control_plane = HttpControlPlane::new(base_url)?;

    let mut enforcer = GateEnforcer::new(control_plane);
    enforcer.handle_event(event).await?;

    tracing::info!("Gate enforcement finished in phase {:?}", enforcer.phase());
    Ok(())
}

fn build_request() -> Result<HeaderRuleRequest, Box<dyn std::error::Error>> {
    let distribution_id =
        std::env::var("DISTRIBUTION_ID").map_err(|_| "DISTRIBUTION_ID must be set")?;

    let header_name = std::env::var("GATE_HEADER_NAME")
        .ok()
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| gate::DEFAULT_HEADER_NAME.to_string());

    let header_value = match std::env::var("GATE_HEADER_SECRET") {
        Ok(s) if !s.trim().is_empty() => s.trim().to_string(),
        _ => {
            let length = std::env::var("GATE_SECRET_LENGTH")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_SECRET_LENGTH);
            let secret = generate_secret(length);
            // Printed once so the origin's GATE_HEADER_SECRET can be set to
            // the same value before traffic is accepted.
            println!("GATE_HEADER_SECRET={}", secret);
            secret
        }
    };

    Ok(HeaderRuleRequest {
        distribution_id,
        custom_headers: vec![CustomHeader {
            header_name,
            header_value,
        }],
    })
}

//! Provisioning-time access-gate enforcement.
//!
//! Generates the shared secret and propagates it into the edge distribution's
//! custom-header configuration through a fetch-merge-submit protocol guarded
//! by the distribution's version token. Runs once per deployment lifecycle
//! event, out-of-band from live traffic.

pub mod http;

pub use http::HttpControlPlane;

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Result type for edge control-plane operations
pub type EdgeResult<T> = Result<T, EdgeError>;

/// Errors from the edge control plane.
#[derive(Debug, thiserror::Error)]
pub enum EdgeError {
    /// The version token went stale between fetch and submit. The caller must
    /// re-fetch and retry; nothing retries internally.
    #[error("version conflict updating distribution {0}: configuration changed since fetch")]
    Conflict(String),

    #[error("distribution {0} not found")]
    NotFound(String),

    #[error("control plane transport error: {0}")]
    Transport(String),

    #[error("invalid header rule: {0}")]
    InvalidConfig(String),
}

/// Alphabet for shared secrets: upper and lower letters plus digits.
const SECRET_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Default secret length. The length is configurable, but anything much
/// shorter than this leaves the gate guessable.
pub const DEFAULT_SECRET_LENGTH: usize = 32;

/// Generate a random shared secret of `length` characters.
pub fn generate_secret(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| SECRET_CHARS[rng.random_range(0..SECRET_CHARS.len())] as char)
        .collect()
}

/// One custom header the edge injects into origin-bound requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomHeader {
    pub header_name: String,
    pub header_value: String,
}

/// The slice of the distribution configuration this crate manages.
///
/// Fields owned by other operators ride along in `rest` and are submitted
/// back unchanged, so an enforcement run never clobbers them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistributionConfig {
    #[serde(rename = "CustomHeaders", default)]
    pub custom_headers: Vec<CustomHeader>,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, serde_json::Value>,
}

/// A distribution as returned by the control plane, with its version token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Distribution {
    pub id: String,
    #[serde(rename = "ETag")]
    pub etag: String,
    pub config: DistributionConfig,
}

/// Provisioning input: which distribution, and which headers to enforce.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HeaderRuleRequest {
    pub distribution_id: String,
    pub custom_headers: Vec<CustomHeader>,
}

/// Deployment lifecycle events that trigger the enforcer.
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    Create(HeaderRuleRequest),
    Update(HeaderRuleRequest),
    Delete,
}

/// Phases of one enforcement run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnforcerPhase {
    Idle,
    Fetching,
    Merging,
    Submitting,
    Done,
    Failed,
}

/// Control-plane operations the enforcer needs from the edge.
#[async_trait]
pub trait EdgeControlPlane: Send + Sync {
    async fn get_distribution(&self, id: &str) -> EdgeResult<Distribution>;

    /// Submit `config`, guarded by the version token from the matching fetch.
    async fn update_distribution(
        &self,
        id: &str,
        config: DistributionConfig,
        if_match: &str,
    ) -> EdgeResult<Distribution>;
}

#[async_trait]
impl<T: EdgeControlPlane + ?Sized> EdgeControlPlane for std::sync::Arc<T> {
    async fn get_distribution(&self, id: &str) -> EdgeResult<Distribution> {
        (**self).get_distribution(id).await
    }

    async fn update_distribution(
        &self,
        id: &str,
        config: DistributionConfig,
        if_match: &str,
    ) -> EdgeResult<Distribution> {
        (**self).update_distribution(id, config, if_match).await
    }
}

/// Drives one fetch-merge-submit run per lifecycle event.
pub struct GateEnforcer<C> {
    control_plane: C,
    phase: EnforcerPhase,
}

impl<C: EdgeControlPlane> GateEnforcer<C> {
    pub fn new(control_plane: C) -> Self {
        Self {
            control_plane,
            phase: EnforcerPhase::Idle,
        }
    }

    pub fn phase(&self) -> EnforcerPhase {
        self.phase
    }

    /// Handle one lifecycle event.
    ///
    /// Create and Update propagate the header rule to the edge; Delete makes
    /// no control-plane contact. A version conflict or transport failure is
    /// surfaced to the caller and leaves the machine in `Failed`; there is no
    /// internal retry.
    pub async fn handle_event(&mut self, event: LifecycleEvent) -> EdgeResult<()> {
        match event {
            LifecycleEvent::Create(req) | LifecycleEvent::Update(req) => {
                tracing::info!(
                    "Updating distribution {} custom headers",
                    req.distribution_id
                );
                self.apply_header_rule(req).await
            }
            LifecycleEvent::Delete => {
                tracing::info!("Delete event: leaving edge configuration untouched");
                self.phase = EnforcerPhase::Done;
                Ok(())
            }
        }
    }

    async fn apply_header_rule(&mut self, req: HeaderRuleRequest) -> EdgeResult<()> {
        self.phase = EnforcerPhase::Fetching;
        let distribution = match self.control_plane.get_distribution(&req.distribution_id).await {
            Ok(d) => d,
            Err(e) => {
                self.phase = EnforcerPhase::Failed;
                return Err(e);
            }
        };

        self.phase = EnforcerPhase::Merging;
        if let Some(bad) = req.custom_headers.iter().find(|h| h.header_name.is_empty()) {
            self.phase = EnforcerPhase::Failed;
            return Err(EdgeError::InvalidConfig(format!(
                "empty header name (value {:?})",
                bad.header_value
            )));
        }
        let mut config = distribution.config;
        config.custom_headers = merge_headers(config.custom_headers, &req.custom_headers);

        self.phase = EnforcerPhase::Submitting;
        match self
            .control_plane
            .update_distribution(&req.distribution_id, config, &distribution.etag)
            .await
        {
            Ok(updated) => {
                tracing::info!(
                    "Distribution {} updated with custom headers (etag {})",
                    req.distribution_id,
                    updated.etag
                );
                self.phase = EnforcerPhase::Done;
                Ok(())
            }
            Err(e) => {
                self.phase = EnforcerPhase::Failed;
                Err(e)
            }
        }
    }
}

/// Merge the requested headers into the existing set, replacing entries with
/// the same name. Applying the same request twice yields the same set: one
/// entry per header name, never duplicates.
pub fn merge_headers(existing: Vec<CustomHeader>, requested: &[CustomHeader]) -> Vec<CustomHeader> {
    let mut merged = existing;
    for header in requested {
        match merged
            .iter_mut()
            .find(|h| h.header_name.eq_ignore_ascii_case(&header.header_name))
        {
            Some(slot) => *slot = header.clone(),
            None => merged.push(header.clone()),
        }
    }
    merged
}

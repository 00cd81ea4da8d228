//! reqwest-backed client for the edge control plane.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use super::{Distribution, DistributionConfig, EdgeControlPlane, EdgeError, EdgeResult};

/// HTTP client for the edge control plane's distribution API.
pub struct HttpControlPlane {
    base_url: String,
    client: reqwest::Client,
}

impl HttpControlPlane {
    pub fn new(base_url: impl Into<String>) -> EdgeResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| EdgeError::Transport(format!("failed to build HTTP client: {}", e)))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { base_url, client })
    }

    fn distribution_url(&self, id: &str) -> String {
        format!("{}/distributions/{}", self.base_url, id)
    }
}

#[async_trait]
impl EdgeControlPlane for HttpControlPlane {
    async fn get_distribution(&self, id: &str) -> EdgeResult<Distribution> {
        let response = self
            .client
            .get(self.distribution_url(id))
            .send()
            .await
            .map_err(|e| EdgeError::Transport(format!("fetch failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(EdgeError::NotFound(id.to_string()));
        }
        if !status.is_success() {
            return Err(EdgeError::Transport(format!(
                "fetch returned status {}",
                status
            )));
        }

        response
            .json::<Distribution>()
            .await
            .map_err(|e| EdgeError::Transport(format!("invalid fetch response: {}", e)))
    }

    async fn update_distribution(
        &self,
        id: &str,
        config: DistributionConfig,
        if_match: &str,
    ) -> EdgeResult<Distribution> {
        let response = self
            .client
            .put(self.distribution_url(id))
            .header(reqwest::header::IF_MATCH, if_match)
            .json(&config)
            .send()
            .await
            .map_err(|e| EdgeError::Transport(format!("update failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::PRECONDITION_FAILED {
            return Err(EdgeError::Conflict(id.to_string()));
        }
        if status == StatusCode::NOT_FOUND {
            return Err(EdgeError::NotFound(id.to_string()));
        }
        if !status.is_success() {
            return Err(EdgeError::Transport(format!(
                "update returned status {}",
                status
            )));
        }

        response
            .json::<Distribution>()
            .await
            .map_err(|e| EdgeError::Transport(format!("invalid update response: {}", e)))
    }
}

//! Server configuration from the environment.

pub const DEFAULT_PORT: u16 = 8080;

/// Runtime configuration for the broadcast server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

impl ServerConfig {
    /// Load server config from environment variables.
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_PORT);

        Self { port }
    }
}

use crate::registry::Registry;

/// Shared server state handed to axum handlers.
#[derive(Clone, Default)]
pub struct AppState {
    pub registry: Registry,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }
}

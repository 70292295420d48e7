//! HTTP handlers

use axum::{extract::State, Json};
use flyover_core::{Config, WebConfig};
use std::sync::Arc;
use tracing::debug;

/// Shared server state
pub struct AppState {
    pub config: Config,
    /// Map API key read from the environment at startup
    api_key: Option<String>,
}

impl AppState {
    pub fn new(config: Config, api_key: Option<String>) -> Arc<Self> {
        Arc::new(Self { config, api_key })
    }

    /// Browser config with the API key filled in
    pub fn web_config(&self) -> WebConfig {
        self.config.to_web_config(self.api_key.clone())
    }
}

/// Config consumed by the wasm overlay at startup
pub async fn get_web_config(State(state): State<Arc<AppState>>) -> Json<WebConfig> {
    debug!("Serving web config");
    Json(state.web_config())
}

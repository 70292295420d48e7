//! Web server setup and routing

use anyhow::Result;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::{self, AppState};

/// Build the router: config endpoint, model assets, and the static page
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/config.json", get(api::get_web_config))
        .nest_service("/assets", ServeDir::new(&state.config.server.assets_dir))
        // Static files (index.html and the wasm bundle)
        .fallback_service(ServeDir::new(&state.config.server.web_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run plain HTTP server
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let bind = state.config.server.bind.clone();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!(address = %bind, "Starting web server");
    axum::serve(listener, app).await?;
    Ok(())
}

//! Flyover server - Main entry point
//!
//! Serves the wasm overlay, its assets, and the browser config.

mod api;
mod server;

use anyhow::Result;
use clap::Parser;
use flyover_core::config;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "flyover")]
#[command(about = "Serve the Flyover 3D map overlay")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "flyover.toml")]
    config: PathBuf,

    /// Bind address for web server
    #[arg(short, long)]
    bind: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Write a default configuration file and exit
    #[arg(long)]
    init: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Flyover v{}", env!("CARGO_PKG_VERSION"));

    if args.init {
        config::save_default_config(&args.config)?;
        info!(path = %args.config.display(), "Wrote default configuration");
        return Ok(());
    }

    let mut config = config::load_config(&args.config)?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }

    // Refuse to serve a fly-in that can never finish
    config.schedule().validate(&config.initial_view())?;

    let api_key = std::env::var(&config.server.api_key_env).ok();
    if api_key.is_none() {
        tracing::warn!(
            var = %config.server.api_key_env,
            "Map API key not set; the page will not be able to load the map"
        );
    }

    info!(
        lat = config.view.lat,
        lng = config.view.lng,
        asset = %config.asset.path,
        "Configuration loaded"
    );

    let state = api::AppState::new(config, api_key);
    server::run(state).await
}

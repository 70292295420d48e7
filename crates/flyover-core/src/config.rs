//! Configuration loading
//!
//! `flyover.toml` drives both the server and the browser binding. The server
//! reads the file and hands the browser a [`WebConfig`] as JSON, adding the
//! map API key from the environment so it never lives in the file.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::schedule::{
    Schedule, DEFAULT_HEADING_STEP, DEFAULT_HEADING_TARGET, DEFAULT_TILT_STEP,
    DEFAULT_TILT_TARGET, DEFAULT_ZOOM_STEP, DEFAULT_ZOOM_TARGET,
};
use crate::view::{LatLng, LatLngAltitude, ViewState};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
    #[error("Failed to parse web config: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub view: ViewConfig,
    #[serde(default)]
    pub animation: AnimationConfig,
    #[serde(default)]
    pub anchor: AnchorConfig,
    #[serde(default)]
    pub asset: AssetConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapConfig {
    /// Cloud map style ID (vector maps are required for tilt and heading)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_id: Option<String>,
    /// DOM element id the map is mounted into
    #[serde(default = "default_container_id")]
    pub container_id: String,
    #[serde(default = "default_true")]
    pub disable_default_ui: bool,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            map_id: None,
            container_id: default_container_id(),
            disable_default_ui: true,
        }
    }
}

fn default_container_id() -> String {
    "map".to_string()
}

fn default_true() -> bool {
    true
}

/// Initial map view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewConfig {
    #[serde(default = "default_lat")]
    pub lat: f64,
    #[serde(default = "default_lng")]
    pub lng: f64,
    #[serde(default = "default_zoom")]
    pub zoom: f64,
    #[serde(default = "default_tilt")]
    pub tilt: f64,
    #[serde(default = "default_heading")]
    pub heading: f64,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            lat: default_lat(),
            lng: default_lng(),
            zoom: default_zoom(),
            tilt: default_tilt(),
            heading: default_heading(),
        }
    }
}

fn default_lat() -> f64 {
    43.661036
}

fn default_lng() -> f64 {
    -79.371277
}

fn default_zoom() -> f64 {
    17.0
}

fn default_tilt() -> f64 {
    10.0
}

fn default_heading() -> f64 {
    10.0
}

/// Fly-in targets and per-frame increments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationConfig {
    #[serde(default = "default_tilt_target")]
    pub tilt_target: f64,
    #[serde(default = "default_tilt_step")]
    pub tilt_step: f64,
    #[serde(default = "default_zoom_target")]
    pub zoom_target: f64,
    #[serde(default = "default_zoom_step")]
    pub zoom_step: f64,
    #[serde(default = "default_heading_target")]
    pub heading_target: f64,
    #[serde(default = "default_heading_step")]
    pub heading_step: f64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            tilt_target: default_tilt_target(),
            tilt_step: default_tilt_step(),
            zoom_target: default_zoom_target(),
            zoom_step: default_zoom_step(),
            heading_target: default_heading_target(),
            heading_step: default_heading_step(),
        }
    }
}

fn default_tilt_target() -> f64 {
    DEFAULT_TILT_TARGET
}

fn default_tilt_step() -> f64 {
    DEFAULT_TILT_STEP
}

fn default_zoom_target() -> f64 {
    DEFAULT_ZOOM_TARGET
}

fn default_zoom_step() -> f64 {
    DEFAULT_ZOOM_STEP
}

fn default_heading_target() -> f64 {
    DEFAULT_HEADING_TARGET
}

fn default_heading_step() -> f64 {
    DEFAULT_HEADING_STEP
}

/// Geographic anchor of the 3D scene origin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchorConfig {
    /// Defaults to the view center when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    /// Defaults to the view center when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    /// Altitude above ground in meters
    #[serde(default = "default_altitude")]
    pub altitude: f64,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            lat: None,
            lng: None,
            altitude: default_altitude(),
        }
    }
}

fn default_altitude() -> f64 {
    120.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Path or URL of the glTF scene, as seen from the browser
    #[serde(default = "default_asset_path")]
    pub path: String,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            path: default_asset_path(),
        }
    }
}

fn default_asset_path() -> String {
    "assets/low_poly_scooter/scene.gltf".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the web server
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Directory holding index.html and the wasm bundle
    #[serde(default = "default_web_dir")]
    pub web_dir: String,
    /// Directory served under /assets
    #[serde(default = "default_assets_dir")]
    pub assets_dir: String,
    /// Environment variable holding the map API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            web_dir: default_web_dir(),
            assets_dir: default_assets_dir(),
            api_key_env: default_api_key_env(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_web_dir() -> String {
    "web".to_string()
}

fn default_assets_dir() -> String {
    "assets".to_string()
}

fn default_api_key_env() -> String {
    "FLYOVER_MAP_API_KEY".to_string()
}

/// What the browser binding needs to bootstrap the map and overlay
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub view: ViewConfig,
    #[serde(default)]
    pub animation: AnimationConfig,
    #[serde(default)]
    pub anchor: AnchorConfig,
    #[serde(default)]
    pub asset: AssetConfig,
}

impl WebConfig {
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn initial_view(&self) -> ViewState {
        initial_view(&self.view)
    }

    pub fn schedule(&self) -> Schedule {
        schedule(&self.animation)
    }

    pub fn anchor(&self) -> LatLngAltitude {
        anchor(&self.anchor, &self.view)
    }
}

impl Config {
    /// Load configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn initial_view(&self) -> ViewState {
        initial_view(&self.view)
    }

    pub fn schedule(&self) -> Schedule {
        schedule(&self.animation)
    }

    pub fn anchor(&self) -> LatLngAltitude {
        anchor(&self.anchor, &self.view)
    }

    /// Browser-facing subset, with the API key filled in by the caller
    pub fn to_web_config(&self, api_key: Option<String>) -> WebConfig {
        WebConfig {
            api_key,
            map: self.map.clone(),
            view: self.view.clone(),
            animation: self.animation.clone(),
            anchor: self.anchor.clone(),
            asset: self.asset.clone(),
        }
    }
}

fn initial_view(view: &ViewConfig) -> ViewState {
    ViewState::new(LatLng::new(view.lat, view.lng), view.tilt, view.zoom, view.heading)
}

fn schedule(animation: &AnimationConfig) -> Schedule {
    Schedule::new(
        (animation.tilt_target, animation.tilt_step),
        (animation.zoom_target, animation.zoom_step),
        (animation.heading_target, animation.heading_step),
    )
}

fn anchor(anchor: &AnchorConfig, view: &ViewConfig) -> LatLngAltitude {
    LatLng::new(anchor.lat.unwrap_or(view.lat), anchor.lng.unwrap_or(view.lng))
        .with_altitude(anchor.altitude)
}

/// Load configuration from file, falling back to defaults if it is missing
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config = Config::from_toml(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}

/// Save default configuration to file
pub fn save_default_config(path: &Path) -> Result<(), ConfigError> {
    let content = toml::to_string_pretty(&Config::default())?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::Phase;

    #[test]
    fn test_defaults_match_fly_in() {
        let config = Config::default();
        let view = config.initial_view();

        assert_eq!(view.center, LatLng::new(43.661036, -79.371277));
        assert_eq!(view.tilt, 10.0);
        assert_eq!(view.zoom, 17.0);
        assert_eq!(view.heading, 10.0);
        assert_eq!(config.anchor().altitude, 120.0);
        assert!(config.schedule().validate(&view).is_ok());
        assert_eq!(config.schedule().phase_for(&view), Phase::Tilt);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = Config::from_toml(
            r#"
            [view]
            tilt = 30.0

            [anchor]
            lat = 1.0
            altitude = 80.0
            "#,
        )
        .unwrap();

        assert_eq!(config.view.tilt, 30.0);
        assert_eq!(config.view.zoom, 17.0);
        assert_eq!(config.animation.zoom_step, 0.04);
        let anchor = config.anchor();
        assert_eq!(anchor.lat, 1.0);
        assert_eq!(anchor.lng, -79.371277);
        assert_eq!(anchor.altitude, 80.0);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:8080");
    }

    #[test]
    fn test_save_then_load_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flyover.toml");
        save_default_config(&path).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.asset.path, "assets/low_poly_scooter/scene.gltf");
        assert_eq!(config.animation.heading_target, 125.0);
    }

    #[test]
    fn test_web_config_carries_api_key() {
        let web = Config::default().to_web_config(Some("key-123".to_string()));
        let json = serde_json::to_string(&web).unwrap();
        let parsed = WebConfig::from_json(&json).unwrap();

        assert_eq!(parsed.api_key.as_deref(), Some("key-123"));
        assert_eq!(parsed.initial_view(), Config::default().initial_view());
        assert_eq!(parsed.map.container_id, "map");
    }
}

//! Flyover Core - View state, fly-in schedule, and host map capabilities
//!
//! This crate provides the host-agnostic pieces of the Flyover overlay:
//! - Geographic types and the mutable map view state
//! - The staged tilt/zoom/heading schedule and its per-frame scheduler
//! - Traits describing what the overlay needs from the host map
//! - TOML configuration shared by the server and the browser binding

pub mod config;
pub mod host;
pub mod schedule;
pub mod scheduler;
pub mod view;

pub use config::{Config, ConfigError, WebConfig};
pub use host::{MapHost, ProjectionMatrix, TransformError, TransformProvider};
pub use schedule::{Phase, PhaseStep, Schedule, ScheduleError, ViewParam};
pub use scheduler::{AnimationScheduler, Tick};
pub use view::{CameraOptions, LatLng, LatLngAltitude, ViewState};

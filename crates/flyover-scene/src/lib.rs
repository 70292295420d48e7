//! Flyover Scene - Anchored 3D scene and overlay lifecycle
//!
//! This crate holds everything between the host map's overlay callbacks and
//! the renderer: the scene graph with its single anchored asset, the
//! camera projector that follows the host map's transform, and the
//! lifecycle controller that runs the fly-in.

pub mod camera;
pub mod models;
pub mod overlay;
pub mod render;
pub mod scene;

// Re-export commonly used types
pub use camera::CameraProjector;
pub use models::{AssetLoader, LoadError, LoadSink, LoadState};
pub use overlay::{AnimationLoop, OverlayController, OverlayError, OverlayEvent, OverlaySettings};
pub use render::{ContextError, Renderer, RendererFactory};
pub use scene::{AssetGroup, AssetTransform, SceneGraph};

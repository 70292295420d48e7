//! Renderer seam
//!
//! The overlay draws into the host map's own graphics context, so the
//! renderer is created from host-supplied context parameters and must leave
//! that context the way it found it after every frame.

use thiserror::Error;

use crate::scene::SceneGraph;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContextError {
    #[error("No graphics context supplied")]
    Missing,
    #[error("Renderer creation failed: {0}")]
    Rejected(String),
}

pub trait Renderer {
    type Root;

    /// The host draws into the same buffer, so the overlay turns this off
    fn set_auto_clear(&mut self, enabled: bool);

    fn render(&mut self, scene: &SceneGraph<Self::Root>);

    /// Restore GL state so the host map's own drawing is not corrupted
    fn reset_state(&mut self);
}

/// Builds a renderer each time the host hands over a (restored) context
pub trait RendererFactory {
    /// Graphics parameters passed with the context-ready callback
    type Context;
    type Root;
    type Renderer: Renderer<Root = Self::Root>;

    fn create(&mut self, context: &Self::Context) -> Result<Self::Renderer, ContextError>;
}

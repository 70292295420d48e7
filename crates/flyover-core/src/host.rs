//! Capabilities the overlay consumes from the host map service

use thiserror::Error;

use crate::view::{CameraOptions, LatLngAltitude};

/// 4x4 column-major matrix as produced by the host's geo transformer
pub type ProjectionMatrix = [f64; 16];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    #[error("Transform matrix has {0} elements, expected 16")]
    BadLength(usize),
}

/// The host map as seen by the overlay
///
/// Both calls are fire-and-forget; the host animates toward requested
/// camera values on its own.
pub trait MapHost {
    /// Move the host map camera to the given tilt/heading/zoom
    fn move_camera(&mut self, options: CameraOptions);

    /// Ask the host to schedule another draw callback for the overlay
    fn request_redraw(&mut self);
}

/// Per-frame geo transformer handed to the overlay's draw callback
///
/// The returned matrix reflects the view the host map actually rendered
/// this frame, which can lag behind what was last requested.
pub trait TransformProvider {
    fn from_lat_lng_altitude(&self, at: LatLngAltitude) -> Result<ProjectionMatrix, TransformError>;
}

impl<F> TransformProvider for F
where
    F: Fn(LatLngAltitude) -> ProjectionMatrix,
{
    fn from_lat_lng_altitude(&self, at: LatLngAltitude) -> Result<ProjectionMatrix, TransformError> {
        Ok(self(at))
    }
}

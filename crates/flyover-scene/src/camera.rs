//! Camera projection synced to the host map

use bevy::math::DMat4;
use flyover_core::{LatLngAltitude, TransformError, TransformProvider};

use crate::scene::OverlayCamera;

/// Derives the overlay camera's projection from the host transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraProjector {
    anchor: LatLngAltitude,
}

impl CameraProjector {
    pub fn new(anchor: LatLngAltitude) -> Self {
        Self { anchor }
    }

    pub fn anchor(&self) -> LatLngAltitude {
        self.anchor
    }

    /// Query the host for this frame's matrix at the anchor and apply it as is
    ///
    /// On error the camera keeps its previous projection.
    pub fn project<T>(&self, provider: &T, camera: &mut OverlayCamera) -> Result<(), TransformError>
    where
        T: TransformProvider + ?Sized,
    {
        let matrix = provider.from_lat_lng_altitude(self.anchor)?;
        camera.projection = DMat4::from_cols_array(&matrix);
        Ok(())
    }
}

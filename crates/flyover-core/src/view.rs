//! Geographic coordinates and the map view state driven by the fly-in

use serde::{Deserialize, Serialize};

/// A geographic coordinate in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Lift this coordinate to an altitude above ground
    pub fn with_altitude(self, altitude: f64) -> LatLngAltitude {
        LatLngAltitude {
            lat: self.lat,
            lng: self.lng,
            altitude,
        }
    }
}

/// A geographic coordinate plus altitude in map units (meters)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatLngAltitude {
    pub lat: f64,
    pub lng: f64,
    pub altitude: f64,
}

/// Map view parameters advanced by the animation and pushed to the host map
///
/// Tilt and heading are in degrees, zoom is a (fractional) zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub center: LatLng,
    pub tilt: f64,
    pub zoom: f64,
    pub heading: f64,
}

impl ViewState {
    pub fn new(center: LatLng, tilt: f64, zoom: f64, heading: f64) -> Self {
        Self {
            center,
            tilt,
            zoom,
            heading,
        }
    }

    /// Camera parameters to send to the host map for this state
    pub fn camera_options(&self) -> CameraOptions {
        CameraOptions::from(self)
    }
}

/// Payload of a host map `move_camera` call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraOptions {
    pub tilt: f64,
    pub heading: f64,
    pub zoom: f64,
}

impl From<&ViewState> for CameraOptions {
    fn from(view: &ViewState) -> Self {
        Self {
            tilt: view.tilt,
            heading: view.heading,
            zoom: view.zoom,
        }
    }
}

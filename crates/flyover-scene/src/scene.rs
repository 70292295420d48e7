//! Scene graph - camera, ambient light, and the single anchored asset

use bevy::math::{DMat4, Mat4, Quat, Vec3};
use std::f32::consts::FRAC_PI_2;

/// Uniform scale applied to the loaded asset
pub const ASSET_SCALE: f32 = 25.0;
/// Rotation about X that stands the asset up on the map plane (radians)
pub const ASSET_ROTATION_X: f32 = FRAC_PI_2;
/// Offset along Z that sets the asset down from the anchor altitude
pub const ASSET_DEPTH_OFFSET: f32 = -120.0;

/// Ambient light color (white)
pub const LIGHT_COLOR: u32 = 0xffffff;
pub const LIGHT_INTENSITY: f32 = 2.0;

/// The overlay camera
///
/// Only the projection matters; it is overwritten from the host map's
/// transform on every draw. Kept in f64 so it matches the host's matrix
/// exactly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayCamera {
    pub projection: DMat4,
}

impl Default for OverlayCamera {
    fn default() -> Self {
        Self {
            projection: DMat4::IDENTITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientLight {
    pub color: u32,
    pub intensity: f32,
}

impl Default for AmbientLight {
    fn default() -> Self {
        Self {
            color: LIGHT_COLOR,
            intensity: LIGHT_INTENSITY,
        }
    }
}

/// Local transform of the asset group
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssetTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl AssetTransform {
    /// Fixed placement calibrated for the 120 m anchor altitude
    pub fn anchored() -> Self {
        Self {
            translation: Vec3::new(0.0, 0.0, ASSET_DEPTH_OFFSET),
            rotation: Quat::from_rotation_x(ASSET_ROTATION_X),
            scale: Vec3::splat(ASSET_SCALE),
        }
    }

    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// A loaded asset root and where it sits in the scene
#[derive(Debug, Clone)]
pub struct AssetGroup<R> {
    pub root: R,
    pub transform: AssetTransform,
}

/// Everything the renderer draws
#[derive(Debug, Clone)]
pub struct SceneGraph<R> {
    pub camera: OverlayCamera,
    pub light: AmbientLight,
    asset: Option<AssetGroup<R>>,
}

impl<R> Default for SceneGraph<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> SceneGraph<R> {
    /// Camera and light with an empty asset slot
    pub fn new() -> Self {
        Self {
            camera: OverlayCamera::default(),
            light: AmbientLight::default(),
            asset: None,
        }
    }

    /// Insert the loaded asset with its fixed placement
    ///
    /// The scene holds at most one asset; inserting again replaces it.
    pub fn insert_asset(&mut self, root: R) -> Option<AssetGroup<R>> {
        self.asset.replace(AssetGroup {
            root,
            transform: AssetTransform::anchored(),
        })
    }

    pub fn asset(&self) -> Option<&AssetGroup<R>> {
        self.asset.as_ref()
    }

    pub fn has_asset(&self) -> bool {
        self.asset.is_some()
    }
}

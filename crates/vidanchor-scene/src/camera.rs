//! Camera state and the view/projection matrices derived from it

use glam::Mat4;
use serde::{Deserialize, Serialize};
use vidanchor_core::Pose;

/// Near/far clip distances, in the same units as poses (meters)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipPlanes {
    pub near: f32,
    pub far: f32,
}

impl Default for ClipPlanes {
    fn default() -> Self {
        Self {
            near: 0.1,
            far: 100.0,
        }
    }
}

/// Physical camera as reported by the AR session for one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraState {
    /// Camera pose in world space
    pub pose: Pose,
    /// Vertical field of view in radians
    pub fov_y: f32,
    /// Viewport width / height
    pub aspect: f32,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            pose: Pose::IDENTITY,
            fov_y: 60f32.to_radians(),
            aspect: 9.0 / 16.0,
        }
    }
}

impl CameraState {
    /// World-to-camera matrix
    pub fn view_matrix(&self) -> Mat4 {
        self.pose.to_matrix().inverse()
    }

    /// Right-handed GL projection (clip z in -1..1)
    pub fn projection_matrix(&self, clip: &ClipPlanes) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov_y, self.aspect, clip.near, clip.far)
    }
}

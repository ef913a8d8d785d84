//! Pose and tracked-target types reported by the AR session

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Rigid transform in world space: translation (meters) plus rotation quaternion
///
/// Poses are values. Combining two poses always yields a new pose; nothing
/// mutates a pose in place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    #[serde(default)]
    translation: Vec3,
    /// Quaternion as (x, y, z, w)
    #[serde(default)]
    rotation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    /// Pure translation with identity rotation
    pub fn from_translation(translation: Vec3) -> Self {
        Self::new(translation, Quat::IDENTITY)
    }

    /// Build from raw arrays, rotation given as (x, y, z, w)
    pub fn from_arrays(translation: [f32; 3], rotation: [f32; 4]) -> Self {
        Self::new(Vec3::from_array(translation), Quat::from_array(rotation))
    }

    pub fn translation(&self) -> Vec3 {
        self.translation
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    /// Keep this pose's translation but take the rotation of `other`
    pub fn with_rotation_of(&self, other: &Pose) -> Pose {
        Pose::new(self.translation, other.rotation)
    }

    /// Apply `local` in the frame of this pose (parent * child)
    pub fn compose(&self, local: &Pose) -> Pose {
        Pose::new(
            self.translation + self.rotation * local.translation,
            self.rotation * local.rotation,
        )
    }

    /// Column-major 4x4 model matrix
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.translation)
    }

    /// Same matrix flattened column-major, the layout GL-style renderers expect
    pub fn to_cols_array(&self) -> [f32; 16] {
        self.to_matrix().to_cols_array()
    }
}

/// Tracking state of a recognised target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingState {
    /// Recognised earlier but not currently tracked; may resume
    #[default]
    Paused,
    /// Actively tracked this frame
    Tracking,
    /// Tracking has permanently ended for this target
    Stopped,
}

impl std::fmt::Display for TrackingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TrackingState::Paused => "paused",
            TrackingState::Tracking => "tracking",
            TrackingState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// A reference image recognised by the AR session in the current frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedTarget {
    /// Name of the reference image (unique per database entry)
    pub name: String,
    /// Pose of the image center in world space
    #[serde(default)]
    pub center_pose: Pose,
    pub state: TrackingState,
}

impl TrackedTarget {
    pub fn new(name: impl Into<String>, center_pose: Pose, state: TrackingState) -> Self {
        Self {
            name: name.into(),
            center_pose,
            state,
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.state == TrackingState::Tracking
    }
}

//! Boundaries to the AR session, renderer and input layer
//!
//! Everything the pipeline needs from the outside world for one tick is
//! carried by [`FrameContext`]; nothing is cached in long-lived mutable
//! fields between callbacks.

use glam::Mat4;
use std::sync::Arc;
use thiserror::Error;
use vidanchor_core::{Pose, TrackedTarget};

use crate::anchor::Anchor;
use crate::camera::CameraState;
use crate::node::{NodeId, SceneNode};

/// Why an AR session could not be started on this attempt
///
/// All causes are terminal for the current attempt and recoverable by the
/// user; the host retries on its next resume.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("AR runtime is not installed")]
    RuntimeNotInstalled,
    #[error("User declined AR runtime installation")]
    UserDeclinedInstall,
    #[error("AR runtime is too old")]
    RuntimeTooOld,
    #[error("Application is too old for the installed AR runtime")]
    AppTooOld,
    #[error("Device does not support AR: {0}")]
    DeviceUnsupported(String),
    #[error("Camera is not available")]
    CameraUnavailable,
    #[error("Camera permission was denied")]
    CameraPermissionDenied,
}

impl SessionError {
    /// Message shown to the user for this cause
    pub fn user_message(&self) -> &'static str {
        match self {
            SessionError::RuntimeNotInstalled => "Please install ARCore",
            SessionError::UserDeclinedInstall => "Please install ARCore",
            SessionError::RuntimeTooOld => "Please update ARCore",
            SessionError::AppTooOld => "Please update this app",
            SessionError::DeviceUnsupported(_) => "This device does not support AR",
            SessionError::CameraUnavailable => "Camera not available. Please restart the app.",
            SessionError::CameraPermissionDenied => {
                "Camera permissions are needed to run this application"
            }
        }
    }
}

/// Per-tick snapshot of the AR session
#[derive(Debug, Clone, Default)]
pub struct FrameContext {
    /// Monotonic tick counter, for logging
    pub tick: u64,
    pub camera: CameraState,
    /// Device orientation/position estimate from the platform sensors
    pub sensor_pose: Pose,
    /// Targets whose tracking state or pose changed since the previous tick
    pub updated_targets: Vec<TrackedTarget>,
}

/// The AR session as seen by the pipeline
pub trait ArSession {
    /// Pin `pose` in world space
    fn create_anchor(&mut self, pose: Pose) -> Anchor;
}

/// Renderer scene graph
pub trait SceneGraph {
    fn add_node(&mut self, node: Arc<dyn SceneNode>);

    fn remove_node(&mut self, id: NodeId);
}

/// Video texture renderer drawing the overlay quad
pub trait VideoRenderer {
    fn play(&mut self, source: &str);

    /// Overlay model matrix for the next draw
    fn update(&mut self, transform: &Mat4);

    fn draw(&mut self, view: &Mat4, projection: &Mat4);

    fn is_started(&self) -> bool;
}

/// Input layer delivering taps on scene nodes
pub trait InputLayer {
    /// Start routing taps on `node`. The host reports them back through
    /// `OverlayController::on_tap`.
    fn register_tap(&mut self, node: NodeId, target_name: &str);
}

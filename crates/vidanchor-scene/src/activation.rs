//! Tap activation: where the overlay goes and the anchor that holds it

use tracing::{debug, info};
use vidanchor_core::{Pose, TrackedTarget};

use crate::anchor::Anchor;
use crate::session::ArSession;

/// Overlay placement for an activation: the target's center position with
/// the device's current orientation, so the overlay faces the viewer rather
/// than lying in the marker plane. No smoothing.
pub fn resolve_activation_pose(target_center: &Pose, sensor_pose: &Pose) -> Pose {
    target_center.with_rotation_of(sensor_pose)
}

/// The anchor holding the video overlay, tagged with the activation it
/// belongs to
#[derive(Debug, Clone)]
pub struct OverlayAnchor {
    anchor: Anchor,
    activation: u64,
}

impl OverlayAnchor {
    pub fn anchor(&self) -> &Anchor {
        &self.anchor
    }

    /// Increments with every activation; distinguishes replaced anchors
    pub fn activation(&self) -> u64 {
        self.activation
    }
}

/// Owns the single overlay anchor slot and the overlay visibility flag
#[derive(Debug, Default)]
pub struct GestureActivation {
    current: Option<OverlayAnchor>,
    visible: bool,
    activations: u64,
}

impl GestureActivation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place the overlay for a tap on `target`'s proxy node.
    ///
    /// Any previous overlay anchor is detached and replaced; the overlay
    /// becomes visible.
    pub fn on_activate(
        &mut self,
        target: &TrackedTarget,
        sensor_pose: &Pose,
        session: &mut dyn ArSession,
    ) -> &OverlayAnchor {
        let pose = resolve_activation_pose(&target.center_pose, sensor_pose);

        if let Some(previous) = self.current.take() {
            previous.anchor.detach();
            debug!(anchor = %previous.anchor.id(), "Replaced overlay anchor");
        }

        self.activations += 1;
        let anchor = session.create_anchor(pose);
        self.visible = true;
        info!(
            target = %target.name,
            anchor = %anchor.id(),
            activation = self.activations,
            "Overlay activated"
        );

        self.current.insert(OverlayAnchor {
            anchor,
            activation: self.activations,
        })
    }

    /// Hide the overlay. Returns false if it was not shown.
    pub fn dismiss(&mut self) -> bool {
        if !self.visible {
            return false;
        }
        self.visible = false;
        debug!("Overlay dismissed");
        true
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// The live overlay anchor, shown or not
    pub fn overlay(&self) -> Option<&OverlayAnchor> {
        self.current.as_ref()
    }

    /// The overlay anchor if the overlay is currently shown
    pub fn visible_overlay(&self) -> Option<&OverlayAnchor> {
        self.current.as_ref().filter(|_| self.visible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingSession;
    use glam::{Quat, Vec3};
    use vidanchor_core::TrackingState;

    fn earth_target() -> TrackedTarget {
        TrackedTarget::new(
            "earth",
            Pose::new(Vec3::new(0.3, -0.2, -1.2), Quat::from_rotation_x(-1.2)),
            TrackingState::Tracking,
        )
    }

    #[test]
    fn test_pose_combines_target_translation_and_sensor_rotation() {
        let target = earth_target();
        let sensor = Pose::new(Vec3::new(5.0, 5.0, 5.0), Quat::from_rotation_y(0.7));

        let pose = resolve_activation_pose(&target.center_pose, &sensor);
        assert_eq!(pose.translation(), target.center_pose.translation());
        assert_eq!(pose.rotation(), sensor.rotation());
        assert_ne!(pose.rotation(), target.center_pose.rotation());

        // Pure: same inputs, same pose
        assert_eq!(pose, resolve_activation_pose(&target.center_pose, &sensor));
    }

    #[test]
    fn test_activation_replaces_previous_anchor() {
        let mut activation = GestureActivation::new();
        let mut session = RecordingSession::default();
        let sensor = Pose::new(Vec3::ZERO, Quat::from_rotation_y(0.7));

        let first = activation.on_activate(&earth_target(), &sensor, &mut session).clone();
        let second = activation.on_activate(&earth_target(), &sensor, &mut session).clone();

        assert!(first.anchor().is_detached());
        assert!(!second.anchor().is_detached());
        assert_ne!(first.activation(), second.activation());
        assert_eq!(activation.overlay().unwrap().anchor().id(), second.anchor().id());
        assert_eq!(second.anchor().pose().rotation(), sensor.rotation());
    }

    #[test]
    fn test_dismiss_hides_overlay() {
        let mut activation = GestureActivation::new();
        let mut session = RecordingSession::default();
        assert!(!activation.dismiss());

        activation.on_activate(&earth_target(), &Pose::IDENTITY, &mut session);
        assert!(activation.visible_overlay().is_some());

        assert!(activation.dismiss());
        assert!(!activation.is_visible());
        assert!(activation.visible_overlay().is_none());
        assert!(activation.overlay().is_some());
    }
}

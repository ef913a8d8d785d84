//! Frame-synchronised overlay controller
//!
//! Ties the dispatcher, activation and playback together on the host's
//! tick boundary: the scene-update notification (`on_update`) always runs
//! before the same tick's `on_draw`, and taps/back presses arrive in between.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use vidanchor_core::{AssetHandle, DiagnosticLog, Pose};

use crate::activation::GestureActivation;
use crate::anchor::AnchorManager;
use crate::camera::ClipPlanes;
use crate::dispatcher::{TrackingLossPolicy, TrackingUpdateDispatcher};
use crate::node::NodeId;
use crate::playback::{OverlayPlaybackState, OverlayPlaybackStateMachine};
use crate::session::{ArSession, FrameContext, InputLayer, SceneGraph, VideoRenderer};

/// Behaviour knobs for one overlay target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlaySettings {
    /// Reference image name that gets an anchor and tap handler
    pub recognized_target: String,
    /// Video source played on the overlay
    pub video_source: String,
    pub clip: ClipPlanes,
    pub loss_policy: TrackingLossPolicy,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            recognized_target: "earth".to_string(),
            video_source: "planet.mp4".to_string(),
            clip: ClipPlanes::default(),
            loss_policy: TrackingLossPolicy::Persist,
        }
    }
}

pub struct OverlayController {
    dispatcher: TrackingUpdateDispatcher,
    activation: GestureActivation,
    playback: OverlayPlaybackStateMachine,
}

impl OverlayController {
    /// `asset` is the marker model displayed on the proxy node
    pub fn new(settings: OverlaySettings, asset: AssetHandle, diagnostics: DiagnosticLog) -> Self {
        let anchors = AnchorManager::new(asset, diagnostics);
        Self {
            dispatcher: TrackingUpdateDispatcher::new(
                settings.recognized_target,
                settings.loss_policy,
                anchors,
            ),
            activation: GestureActivation::new(),
            playback: OverlayPlaybackStateMachine::new(settings.video_source, settings.clip),
        }
    }

    /// Scene-update notification for the tick
    pub fn on_update(
        &mut self,
        frame: &FrameContext,
        session: &mut dyn ArSession,
        scene: &mut dyn SceneGraph,
        input: &mut dyn InputLayer,
    ) {
        self.dispatcher.on_frame_tick(frame, session, scene, input);
    }

    /// Tap on a scene node. Returns the overlay pose when the tap activated
    /// the overlay.
    pub fn on_tap(
        &mut self,
        node: NodeId,
        frame: &FrameContext,
        session: &mut dyn ArSession,
    ) -> Option<Pose> {
        let Some(target) = self.dispatcher.target_for_node(node) else {
            warn!(node = %node, "Tap on a node without a tracked target");
            return None;
        };
        let overlay = self.activation.on_activate(target, &frame.sensor_pose, session);
        Some(overlay.anchor().pose())
    }

    /// Draw tick for the video overlay
    pub fn on_draw(&mut self, frame: &FrameContext, renderer: &mut dyn VideoRenderer) {
        self.playback
            .on_draw_tick(self.activation.visible_overlay(), &frame.camera, renderer);
    }

    /// Back navigation. Hides the overlay if shown; returns false when there
    /// was nothing to hide and the host should handle the press itself.
    pub fn on_back_pressed(&mut self) -> bool {
        if !self.activation.dismiss() {
            return false;
        }
        self.playback.reset();
        debug!("Overlay hidden");
        true
    }

    /// The "point your camera at the image" hint stays up until something
    /// is tracked
    pub fn fit_hint_visible(&self) -> bool {
        !self.dispatcher.tracking_seen()
    }

    pub fn dispatcher(&self) -> &TrackingUpdateDispatcher {
        &self.dispatcher
    }

    pub fn activation(&self) -> &GestureActivation {
        &self.activation
    }

    pub fn playback_state(&self) -> OverlayPlaybackState {
        self.playback.state()
    }

    pub fn frames_drawn(&self) -> u64 {
        self.playback.frames_drawn()
    }
}

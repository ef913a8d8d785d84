//! Overlay playback state machine
//!
//! ```text
//!   Idle --(visible overlay, draw tick)--> Loading --(play issued)--> Playing
//!    ^                                                                  |
//!    +----------------------- dismiss / new overlay anchor -------------+
//! ```
//!
//! While an overlay anchor stays live the state only moves forward. Every
//! draw tick in Loading or Playing submits the anchor transform and the
//! camera matrices to the video renderer.

use serde::Serialize;
use tracing::{debug, info};

use crate::activation::OverlayAnchor;
use crate::camera::{CameraState, ClipPlanes};
use crate::session::VideoRenderer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayPlaybackState {
    #[default]
    Idle,
    Loading,
    Playing,
}

pub struct OverlayPlaybackStateMachine {
    state: OverlayPlaybackState,
    source: String,
    clip: ClipPlanes,
    /// Activation the current playback belongs to
    activation: Option<u64>,
    frames_drawn: u64,
}

impl OverlayPlaybackStateMachine {
    pub fn new(source: impl Into<String>, clip: ClipPlanes) -> Self {
        Self {
            state: OverlayPlaybackState::Idle,
            source: source.into(),
            clip,
            activation: None,
            frames_drawn: 0,
        }
    }

    pub fn state(&self) -> OverlayPlaybackState {
        self.state
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    /// One draw tick. `overlay` is the visible overlay anchor, if any.
    pub fn on_draw_tick(
        &mut self,
        overlay: Option<&OverlayAnchor>,
        camera: &CameraState,
        renderer: &mut dyn VideoRenderer,
    ) {
        let Some(overlay) = overlay else {
            if self.state != OverlayPlaybackState::Idle {
                self.reset();
            }
            return;
        };

        if self.state != OverlayPlaybackState::Idle && self.activation != Some(overlay.activation()) {
            debug!(activation = overlay.activation(), "Overlay anchor replaced, restarting playback");
            self.reset();
        }

        if self.state == OverlayPlaybackState::Idle {
            self.start(overlay, renderer);
        }

        let transform = overlay.anchor().pose().to_matrix();
        renderer.update(&transform);
        renderer.draw(&camera.view_matrix(), &camera.projection_matrix(&self.clip));
        self.frames_drawn += 1;
    }

    fn start(&mut self, overlay: &OverlayAnchor, renderer: &mut dyn VideoRenderer) {
        self.state = OverlayPlaybackState::Loading;
        self.activation = Some(overlay.activation());

        if renderer.is_started() {
            debug!(source = %self.source, "Video already playing, reusing stream");
        } else {
            renderer.play(&self.source);
            info!(source = %self.source, activation = overlay.activation(), "Started overlay playback");
        }

        // Fire-and-forget: no acknowledgement from the renderer
        self.state = OverlayPlaybackState::Playing;
    }

    /// Back to Idle, e.g. when the overlay is dismissed
    pub fn reset(&mut self) {
        self.state = OverlayPlaybackState::Idle;
        self.activation = None;
    }
}

//! Per-tick handling of the session's tracking updates

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, trace};
use vidanchor_core::{TrackedTarget, TrackingState};

use crate::anchor::{AnchorManager, AnchorRecord};
use crate::node::{NodeId, SceneNode};
use crate::session::{ArSession, FrameContext, InputLayer, SceneGraph};

/// What happens to a target's anchor once the session stops tracking it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingLossPolicy {
    /// Anchor and proxy node stay in the scene indefinitely
    #[default]
    Persist,
    /// Retire the anchor when the target reports `Stopped`
    RetireOnStop,
}

/// Routes tracking updates for the recognised target into the anchor manager
pub struct TrackingUpdateDispatcher {
    recognized_name: String,
    loss_policy: TrackingLossPolicy,
    anchors: AnchorManager,
    /// Latest snapshot of the recognised target, used to resolve taps
    latest: Option<TrackedTarget>,
    tracking_seen: bool,
}

impl TrackingUpdateDispatcher {
    pub fn new(
        recognized_name: impl Into<String>,
        loss_policy: TrackingLossPolicy,
        anchors: AnchorManager,
    ) -> Self {
        Self {
            recognized_name: recognized_name.into(),
            loss_policy,
            anchors,
            latest: None,
            tracking_seen: false,
        }
    }

    /// Process the targets updated this tick. Runs before the tick's draw.
    pub fn on_frame_tick(
        &mut self,
        frame: &FrameContext,
        session: &mut dyn ArSession,
        scene: &mut dyn SceneGraph,
        input: &mut dyn InputLayer,
    ) {
        for target in &frame.updated_targets {
            if target.name == self.recognized_name {
                // Keep the freshest pose even while not tracking; taps resolve against it
                self.latest = Some(target.clone());
            }

            if !target.is_tracking() {
                self.on_not_tracking(target, scene);
                continue;
            }

            self.tracking_seen = true;
            if target.name != self.recognized_name {
                debug!(tick = frame.tick, target = %target.name, "Ignoring unrecognised target");
                continue;
            }

            let record = self.anchors.attach(target, session, scene);
            if record.claim_tap_registration() {
                input.register_tap(record.node().id(), &target.name);
                info!(target = %target.name, node = %record.node().id(), "Registered tap handler");
            }
        }
    }

    fn on_not_tracking(&mut self, target: &TrackedTarget, scene: &mut dyn SceneGraph) {
        let retire = target.state == TrackingState::Stopped
            && self.loss_policy == TrackingLossPolicy::RetireOnStop
            && target.name == self.recognized_name;

        if retire {
            if self.anchors.retire(&target.name, scene).is_some() {
                self.latest = None;
            }
        } else {
            trace!(target = %target.name, state = %target.state, "Skipping non-tracking target");
        }
    }

    /// Latest snapshot of the target whose proxy node is `node`
    pub fn target_for_node(&self, node: NodeId) -> Option<&TrackedTarget> {
        let record = self.anchors.find_by_node(node)?;
        self.latest
            .as_ref()
            .filter(|t| t.name == record.target_name())
    }

    pub fn record(&self) -> Option<Arc<AnchorRecord>> {
        self.anchors.get(&self.recognized_name)
    }

    pub fn anchors(&self) -> &AnchorManager {
        &self.anchors
    }

    pub fn recognized_name(&self) -> &str {
        &self.recognized_name
    }

    /// True once any target has been reported as tracking
    pub fn tracking_seen(&self) -> bool {
        self.tracking_seen
    }
}

//! Recording doubles for the session, scene, renderer and input traits

use glam::{Mat4, Vec3};
use std::sync::Arc;
use vidanchor_core::{Pose, RenderableAsset, TrackedTarget, TrackingState};

use crate::anchor::Anchor;
use crate::node::{NodeId, SceneNode};
use crate::session::{ArSession, InputLayer, SceneGraph, VideoRenderer};

pub fn model() -> Arc<RenderableAsset> {
    Arc::new(RenderableAsset::from_bytes("earth", "earth.sfb", b"sfb-model".to_vec()).unwrap())
}

pub fn target(name: &str, state: TrackingState, translation: [f32; 3]) -> TrackedTarget {
    TrackedTarget::new(name, Pose::from_translation(Vec3::from_array(translation)), state)
}

#[derive(Default)]
pub struct RecordingSession {
    pub anchors: Vec<Anchor>,
}

impl ArSession for RecordingSession {
    fn create_anchor(&mut self, pose: Pose) -> Anchor {
        let anchor = Anchor::new(pose);
        self.anchors.push(anchor.clone());
        anchor
    }
}

#[derive(Default)]
pub struct RecordingScene {
    pub nodes: Vec<Arc<dyn SceneNode>>,
    pub added: usize,
    pub removed: usize,
}

impl SceneGraph for RecordingScene {
    fn add_node(&mut self, node: Arc<dyn SceneNode>) {
        self.added += 1;
        self.nodes.push(node);
    }

    fn remove_node(&mut self, id: NodeId) {
        self.removed += 1;
        self.nodes.retain(|n| n.id() != id);
    }
}

#[derive(Default)]
pub struct RecordingRenderer {
    pub plays: Vec<String>,
    pub updates: Vec<Mat4>,
    pub draws: Vec<(Mat4, Mat4)>,
    pub started: bool,
}

impl VideoRenderer for RecordingRenderer {
    fn play(&mut self, source: &str) {
        self.plays.push(source.to_string());
        self.started = true;
    }

    fn update(&mut self, transform: &Mat4) {
        self.updates.push(*transform);
    }

    fn draw(&mut self, view: &Mat4, projection: &Mat4) {
        self.draws.push((*view, *projection));
    }

    fn is_started(&self) -> bool {
        self.started
    }
}

#[derive(Default)]
pub struct RecordingInput {
    pub taps: Vec<(NodeId, String)>,
}

impl InputLayer for RecordingInput {
    fn register_tap(&mut self, node: NodeId, target_name: &str) {
        self.taps.push((node, target_name.to_string()));
    }
}

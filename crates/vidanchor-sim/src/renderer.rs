//! Headless scene graph, input layer and video renderer
//!
//! They record what a real renderer would be asked to do and log it.

use glam::Mat4;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, trace};
use vidanchor_scene::{InputLayer, NodeId, SceneGraph, SceneNode, VideoRenderer};

#[derive(Default)]
pub struct LoggingScene {
    nodes: Vec<Arc<dyn SceneNode>>,
}

impl LoggingScene {
    pub fn nodes(&self) -> &[Arc<dyn SceneNode>] {
        &self.nodes
    }

    /// Nodes whose renderable has been attached
    pub fn nodes_with_renderable(&self) -> usize {
        self.nodes.iter().filter(|n| n.renderable().is_some()).count()
    }
}

impl SceneGraph for LoggingScene {
    fn add_node(&mut self, node: Arc<dyn SceneNode>) {
        info!(
            node = %node.id(),
            name = node.name(),
            translation = ?node.world_pose().translation(),
            "Node added"
        );
        self.nodes.push(node);
    }

    fn remove_node(&mut self, id: NodeId) {
        let Some(index) = self.nodes.iter().position(|n| n.id() == id) else {
            debug!(node = %id, "Node not in scene");
            return;
        };
        let node = self.nodes.remove(index);
        for child in node.children() {
            self.remove_node(child);
        }
        info!(node = %id, "Node removed");
    }
}

/// Tap routing table, keyed by the target name a node was registered for
#[derive(Default)]
pub struct LoggingInput {
    taps: HashMap<String, NodeId>,
    registrations: usize,
}

impl LoggingInput {
    pub fn node_for(&self, target_name: &str) -> Option<NodeId> {
        self.taps.get(target_name).copied()
    }

    /// Every registration so far, including nodes since replaced
    pub fn registrations(&self) -> usize {
        self.registrations
    }
}

impl InputLayer for LoggingInput {
    fn register_tap(&mut self, node: NodeId, target_name: &str) {
        debug!(node = %node, target = target_name, "Tap routed");
        self.taps.insert(target_name.to_string(), node);
        self.registrations += 1;
    }
}

#[derive(Default)]
pub struct LoggingVideo {
    started: bool,
    plays: Vec<String>,
    last_transform: Option<Mat4>,
    draws: u64,
}

impl LoggingVideo {
    pub fn plays(&self) -> &[String] {
        &self.plays
    }

    pub fn draws(&self) -> u64 {
        self.draws
    }

    pub fn last_transform(&self) -> Option<Mat4> {
        self.last_transform
    }
}

impl VideoRenderer for LoggingVideo {
    fn play(&mut self, source: &str) {
        info!(source, "Video playback started");
        self.started = true;
        self.plays.push(source.to_string());
    }

    fn update(&mut self, transform: &Mat4) {
        self.last_transform = Some(*transform);
    }

    fn draw(&mut self, _view: &Mat4, _projection: &Mat4) {
        self.draws += 1;
        trace!(draws = self.draws, "Video quad drawn");
    }

    fn is_started(&self) -> bool {
        self.started
    }
}

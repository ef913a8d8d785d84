//! Scene nodes carried by anchors

use parking_lot::Mutex;
use std::sync::Arc;
use uuid::Uuid;
use vidanchor_core::{Pose, RenderableAsset};

use crate::anchor::Anchor;

/// Identifier of a node in the renderer's scene graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(Uuid);

impl NodeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the renderer needs from anything placed in the scene graph:
/// an identity, a local transform, the anchor it hangs from, and optionally
/// a renderable to draw.
pub trait SceneNode: Send + Sync {
    fn id(&self) -> NodeId;

    fn name(&self) -> &str;

    /// Transform relative to the anchor
    fn local_pose(&self) -> Pose;

    fn anchor(&self) -> &Anchor;

    fn renderable(&self) -> Option<Arc<RenderableAsset>>;

    /// Nodes parented to this one; they leave the scene with it
    fn children(&self) -> Vec<NodeId> {
        Vec::new()
    }

    /// Current world transform, following the anchor as the session refines it
    fn world_pose(&self) -> Pose {
        self.anchor().pose().compose(&self.local_pose())
    }
}

/// Node parented to a target's anchor, displaying the marker model
///
/// The renderable slot starts empty when the model is still loading and is
/// filled by the asset completion, possibly from another thread.
pub struct ProxyNode {
    id: NodeId,
    name: String,
    local_pose: Pose,
    anchor: Anchor,
    renderable: Mutex<Option<Arc<RenderableAsset>>>,
    children: Mutex<Vec<NodeId>>,
}

impl std::fmt::Debug for ProxyNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyNode")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("anchor", &self.anchor.id())
            .field("has_renderable", &self.renderable.lock().is_some())
            .finish()
    }
}

impl ProxyNode {
    /// Node sitting exactly at the anchor origin
    pub fn new(name: impl Into<String>, anchor: Anchor) -> Self {
        Self {
            id: NodeId::new(),
            name: name.into(),
            local_pose: Pose::IDENTITY,
            anchor,
            renderable: Mutex::new(None),
            children: Mutex::new(Vec::new()),
        }
    }

    /// Fill the renderable slot. Returns false if it was already filled,
    /// in which case the existing renderable is kept.
    pub fn set_renderable(&self, asset: Arc<RenderableAsset>) -> bool {
        let mut slot = self.renderable.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(asset);
        true
    }

    /// Parent `child` to this node. Adding the same child twice is a no-op.
    pub fn add_child(&self, child: NodeId) {
        let mut children = self.children.lock();
        if !children.contains(&child) {
            children.push(child);
        }
    }
}

impl SceneNode for ProxyNode {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn local_pose(&self) -> Pose {
        self.local_pose
    }

    fn anchor(&self) -> &Anchor {
        &self.anchor
    }

    fn renderable(&self) -> Option<Arc<RenderableAsset>> {
        self.renderable.lock().clone()
    }

    fn children(&self) -> Vec<NodeId> {
        self.children.lock().clone()
    }
}

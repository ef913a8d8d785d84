//! Spatial anchors and the per-target anchor registry
//!
//! [`AnchorManager`] keeps at most one [`AnchorRecord`] per target name. A
//! record pairs the anchor pinned at the target's center with the proxy node
//! that displays the marker model. Attaching is idempotent: repeated tracking
//! updates for an anchored target return the existing record.
//!
//! When the marker model is still loading, the record is created right away
//! with an empty node and the asset completion fills it in later. The
//! completion only holds a weak reference to the node, so a completion that
//! arrives after the record was retired does nothing.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use vidanchor_core::{AssetHandle, DiagnosticKind, DiagnosticLog, Pose, TrackedTarget};

use crate::node::{NodeId, ProxyNode, SceneNode};
use crate::session::{ArSession, SceneGraph};

/// Identifier of a session anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnchorId(Uuid);

impl std::fmt::Display for AnchorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug)]
struct AnchorInner {
    id: AnchorId,
    pose: RwLock<Pose>,
    detached: AtomicBool,
}

/// A pose pinned in world space by the AR session
///
/// Clones share the same anchor. The session may refine the pose between
/// frames through [`Anchor::set_pose`]; readers always see the latest value.
#[derive(Debug, Clone)]
pub struct Anchor {
    inner: Arc<AnchorInner>,
}

impl Anchor {
    pub fn new(pose: Pose) -> Self {
        Self {
            inner: Arc::new(AnchorInner {
                id: AnchorId(Uuid::new_v4()),
                pose: RwLock::new(pose),
                detached: AtomicBool::new(false),
            }),
        }
    }

    pub fn id(&self) -> AnchorId {
        self.inner.id
    }

    pub fn pose(&self) -> Pose {
        *self.inner.pose.read()
    }

    /// Session-side pose refinement
    pub fn set_pose(&self, pose: Pose) {
        *self.inner.pose.write() = pose;
    }

    /// Stop tracking this anchor. Idempotent.
    pub fn detach(&self) {
        self.inner.detached.store(true, Ordering::Release);
    }

    pub fn is_detached(&self) -> bool {
        self.inner.detached.load(Ordering::Acquire)
    }
}

/// One target's anchor plus the proxy node parented to it
#[derive(Debug)]
pub struct AnchorRecord {
    target_name: String,
    anchor: Anchor,
    node: Arc<ProxyNode>,
    tap_registered: AtomicBool,
}

impl AnchorRecord {
    fn new(target_name: String, anchor: Anchor, node: Arc<ProxyNode>) -> Self {
        Self {
            target_name,
            anchor,
            node,
            tap_registered: AtomicBool::new(false),
        }
    }

    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    pub fn anchor(&self) -> &Anchor {
        &self.anchor
    }

    pub fn node(&self) -> &Arc<ProxyNode> {
        &self.node
    }

    /// Returns true exactly once per record; the caller that gets `true`
    /// registers the tap handler.
    pub fn claim_tap_registration(&self) -> bool {
        !self.tap_registered.swap(true, Ordering::AcqRel)
    }

    pub fn tap_registered(&self) -> bool {
        self.tap_registered.load(Ordering::Acquire)
    }
}

/// Registry of live anchor records, keyed by target name
pub struct AnchorManager {
    asset: AssetHandle,
    records: HashMap<String, Arc<AnchorRecord>>,
    diagnostics: DiagnosticLog,
    anchors_created: usize,
}

impl AnchorManager {
    /// Manager whose proxy nodes all display the renderable behind `asset`
    pub fn new(asset: AssetHandle, diagnostics: DiagnosticLog) -> Self {
        Self {
            asset,
            records: HashMap::new(),
            diagnostics,
            anchors_created: 0,
        }
    }

    /// Anchor `target` and add its proxy node to the scene.
    ///
    /// If a record already exists for the target name this is a no-op that
    /// returns that record. Never blocks on the asset load.
    pub fn attach(
        &mut self,
        target: &TrackedTarget,
        session: &mut dyn ArSession,
        scene: &mut dyn SceneGraph,
    ) -> Arc<AnchorRecord> {
        if let Some(existing) = self.records.get(&target.name) {
            return Arc::clone(existing);
        }

        let anchor = session.create_anchor(target.center_pose);
        self.anchors_created += 1;
        let node = Arc::new(ProxyNode::new(target.name.clone(), anchor.clone()));

        match self.asset.get_if_ready() {
            Some(asset) => {
                node.set_renderable(asset);
            }
            None => self.populate_when_loaded(&node, &target.name),
        }

        scene.add_node(node.clone());

        let record = Arc::new(AnchorRecord::new(target.name.clone(), anchor, node));
        self.records.insert(target.name.clone(), Arc::clone(&record));

        info!(
            target = %target.name,
            anchor = %record.anchor().id(),
            node = %record.node().id(),
            renderable = record.node().renderable().is_some(),
            "Anchored target"
        );
        record
    }

    fn populate_when_loaded(&self, node: &Arc<ProxyNode>, target_name: &str) {
        let weak = Arc::downgrade(node);
        let diagnostics = self.diagnostics.clone();
        let target_name = target_name.to_string();

        debug!(target = %target_name, key = %self.asset.registry_key(), "Renderable pending, deferring");
        self.asset.on_complete(move |outcome| {
            let node = match weak.upgrade() {
                Some(node) if !node.anchor().is_detached() => node,
                _ => {
                    debug!(target = %target_name, "Anchor retired before the load finished");
                    return;
                }
            };
            match outcome {
                Ok(asset) => {
                    node.set_renderable(Arc::clone(asset));
                    debug!(target = %target_name, node = %node.id(), "Renderable attached to proxy node");
                }
                Err(e) => {
                    warn!(target = %target_name, error = %e, "Proxy node has no renderable");
                    diagnostics.record(
                        DiagnosticKind::AssetLoad,
                        format!("{}: {}", target_name, e),
                    );
                }
            }
        });
    }

    /// Detach the target's anchor, remove its node from the scene and forget
    /// the record. A later `attach` for the same name creates a fresh record.
    pub fn retire(&mut self, target_name: &str, scene: &mut dyn SceneGraph) -> Option<Arc<AnchorRecord>> {
        let record = self.records.remove(target_name)?;
        record.anchor().detach();
        scene.remove_node(record.node().id());
        info!(target = %target_name, anchor = %record.anchor().id(), "Retired anchor");
        Some(record)
    }

    pub fn get(&self, target_name: &str) -> Option<Arc<AnchorRecord>> {
        self.records.get(target_name).cloned()
    }

    /// Record whose proxy node has the given id
    pub fn find_by_node(&self, node: NodeId) -> Option<Arc<AnchorRecord>> {
        self.records
            .values()
            .find(|r| r.node().id() == node)
            .cloned()
    }

    pub fn live_count(&self) -> usize {
        self.records.len()
    }

    /// Total anchors created over the manager's lifetime
    pub fn anchors_created(&self) -> usize {
        self.anchors_created
    }
}

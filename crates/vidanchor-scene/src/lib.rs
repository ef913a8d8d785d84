//! vidanchor Scene - Anchor lifecycle and frame-synchronised overlay pipeline
//!
//! This crate turns the AR session's per-frame tracking updates into scene
//! state: one anchored proxy node per recognised target, a viewer-facing
//! overlay anchor created on tap, and a playback state machine that submits
//! the overlay transform to the video renderer every draw tick.
//!
//! The AR session, scene graph, video renderer and input layer are external
//! collaborators reached through the traits in [`session`].

pub mod activation;
pub mod anchor;
pub mod camera;
pub mod controller;
pub mod dispatcher;
pub mod node;
pub mod playback;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use activation::{resolve_activation_pose, GestureActivation, OverlayAnchor};
pub use anchor::{Anchor, AnchorId, AnchorManager, AnchorRecord};
pub use camera::{CameraState, ClipPlanes};
pub use controller::{OverlayController, OverlaySettings};
pub use dispatcher::{TrackingLossPolicy, TrackingUpdateDispatcher};
pub use node::{NodeId, ProxyNode, SceneNode};
pub use playback::{OverlayPlaybackState, OverlayPlaybackStateMachine};
pub use session::{ArSession, FrameContext, InputLayer, SceneGraph, SessionError, VideoRenderer};

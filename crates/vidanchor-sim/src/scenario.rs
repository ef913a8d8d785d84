//! Scripted AR session input
//!
//! A scenario file stands in for the platform: it lists the availability
//! reported on each resume attempt and, tick by tick, what the camera sees.
//!
//! ```toml
//! resume_attempts = ["install_requested", "ready"]
//! frame_interval_ms = 16
//!
//! [[tick]]
//! repeat = 3
//! [[tick.targets]]
//! name = "earth"
//! state = "tracking"
//! center_pose = { translation = [0.0, 0.0, -1.0] }
//!
//! [[tick]]
//! tap = "earth"
//! sensor_pose = { rotation = [0.0, 0.3826834, 0.0, 0.9238795] }
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};
use vidanchor_core::{Pose, TargetDatabase, TrackedTarget};
use vidanchor_scene::{Anchor, ArSession, CameraState};

use crate::bootstrap::Availability;

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Availability reported on each resume, in order
    #[serde(default = "default_resume_attempts")]
    pub resume_attempts: Vec<Availability>,
    /// Wall-clock time between ticks; 0 runs as fast as possible
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
    #[serde(default, rename = "tick")]
    pub ticks: Vec<TickScript>,
}

fn default_resume_attempts() -> Vec<Availability> {
    vec![Availability::Ready]
}

fn default_frame_interval_ms() -> u64 {
    16
}

/// One scripted frame, optionally repeated
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TickScript {
    pub repeat: u32,
    pub camera: CameraState,
    pub sensor_pose: Pose,
    /// Targets reported as updated on this frame
    pub targets: Vec<TrackedTarget>,
    /// Tap the proxy node registered for this target name
    pub tap: Option<String>,
    pub back: bool,
    /// Host lifecycle: pause/resume the session before the frame
    pub pause: bool,
    pub resume: bool,
}

impl Default for TickScript {
    fn default() -> Self {
        Self {
            repeat: 1,
            camera: CameraState::default(),
            sensor_pose: Pose::IDENTITY,
            targets: Vec::new(),
            tap: None,
            back: false,
            pause: false,
            resume: false,
        }
    }
}

/// Load a scenario file
pub fn load_scenario(path: &Path) -> Result<Scenario> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenario {}", path.display()))?;
    let scenario: Scenario = toml::from_str(&content)
        .with_context(|| format!("Failed to parse scenario {}", path.display()))?;
    info!(
        path = %path.display(),
        ticks = scenario.ticks.iter().map(|t| t.repeat as u64).sum::<u64>(),
        "Loaded scenario"
    );
    Ok(scenario)
}

/// Session driven by the scenario script
pub struct ScriptedSession {
    database: Option<TargetDatabase>,
    anchors: Vec<Anchor>,
    paused: bool,
}

impl ScriptedSession {
    /// `database` is `None` when image tracking could not be configured
    pub fn new(database: Option<TargetDatabase>) -> Self {
        Self {
            database,
            anchors: Vec::new(),
            paused: false,
        }
    }

    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            info!("Session paused");
        }
    }

    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            info!("Session resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn image_tracking(&self) -> bool {
        self.database.is_some()
    }

    /// Scripted targets the session can actually report: only names in the
    /// reference database, and nothing without one
    pub fn visible_targets(&self, scripted: &[TrackedTarget]) -> Vec<TrackedTarget> {
        let Some(database) = &self.database else {
            return Vec::new();
        };
        scripted
            .iter()
            .filter(|target| {
                let known = database.contains(&target.name);
                if !known {
                    debug!(target = %target.name, "Dropping target missing from database");
                }
                known
            })
            .cloned()
            .collect()
    }

    /// Every anchor created over the session, detached ones included
    pub fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }
}

impl ArSession for ScriptedSession {
    fn create_anchor(&mut self, pose: Pose) -> Anchor {
        let anchor = Anchor::new(pose);
        debug!(anchor = %anchor.id(), translation = ?pose.translation(), "Created anchor");
        self.anchors.push(anchor.clone());
        anchor
    }
}

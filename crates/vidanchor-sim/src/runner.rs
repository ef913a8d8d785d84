//! Drives the overlay controller through a scenario, one tick at a time

use anyhow::Result;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};
use vidanchor_core::{AssetHandle, AsyncAssetLoader, Diagnostic, DiagnosticLog};
use vidanchor_scene::{FrameContext, OverlayController, OverlayPlaybackState};

use crate::bootstrap::{ResumeOutcome, SessionBootstrap};
use crate::config::Config;
use crate::renderer::{LoggingInput, LoggingScene, LoggingVideo};
use crate::scenario::{Scenario, ScriptedSession, TickScript};

/// What the run left behind
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub session_started: bool,
    pub image_tracking: bool,
    pub ticks: u64,
    pub anchors_created: usize,
    pub live_records: usize,
    pub scene_nodes: usize,
    pub nodes_with_renderable: usize,
    pub tap_registrations: usize,
    pub activations: u64,
    pub overlay_visible: bool,
    pub playback_state: OverlayPlaybackState,
    pub frames_drawn: u64,
    pub plays: usize,
    pub diagnostics: Vec<Diagnostic>,
}

/// A started session with its controller and headless host
pub struct Simulation {
    controller: OverlayController,
    asset: AssetHandle,
    session: ScriptedSession,
    scene: LoggingScene,
    input: LoggingInput,
    video: LoggingVideo,
    diagnostics: DiagnosticLog,
    tick: u64,
    activations: u64,
}

impl Simulation {
    /// Bootstrap the session, retrying once per scripted resume attempt.
    /// Returns `None` if no attempt succeeded.
    pub fn start(
        config: &Config,
        config_dir: &Path,
        scenario: &Scenario,
        diagnostics: DiagnosticLog,
    ) -> Option<Self> {
        let assets_dir = config.assets_dir(config_dir);
        let mut bootstrap = SessionBootstrap::new(diagnostics.clone());

        let configuration = scenario.resume_attempts.iter().find_map(|availability| {
            match bootstrap.resume(*availability, &config.reference_images, &assets_dir) {
                ResumeOutcome::Started(configuration) => Some(configuration),
                ResumeOutcome::InstallRequested | ResumeOutcome::Failed(_) => None,
            }
        })?;

        // Start the model load as soon as the session is up; never awaited
        let loader = AsyncAssetLoader::new(Handle::current(), &assets_dir);
        let asset = loader.load(&config.overlay.model_source, &config.overlay.model_registry_key);

        Some(Self {
            controller: OverlayController::new(
                config.to_overlay_settings(),
                asset.clone(),
                diagnostics.clone(),
            ),
            asset,
            session: ScriptedSession::new(configuration.image_database),
            scene: LoggingScene::default(),
            input: LoggingInput::default(),
            video: LoggingVideo::default(),
            diagnostics,
            tick: 0,
            activations: 0,
        })
    }

    /// Marker model handle, shared with every proxy node
    pub fn asset(&self) -> &AssetHandle {
        &self.asset
    }

    pub fn controller(&self) -> &OverlayController {
        &self.controller
    }

    /// Run one frame of `script`. `first` is false for repeats, which do not
    /// replay the tap or back press.
    pub fn step(&mut self, script: &TickScript, first: bool) {
        if script.pause {
            self.session.pause();
        }
        if script.resume {
            self.session.resume();
        }
        if self.session.is_paused() {
            debug!("Session paused, no frame");
            return;
        }

        self.tick += 1;
        let frame = FrameContext {
            tick: self.tick,
            camera: script.camera,
            sensor_pose: script.sensor_pose,
            updated_targets: self.session.visible_targets(&script.targets),
        };

        self.controller
            .on_update(&frame, &mut self.session, &mut self.scene, &mut self.input);

        if first {
            if let Some(name) = &script.tap {
                self.tap(name, &frame);
            }
            if script.back && !self.controller.on_back_pressed() {
                info!("Back press not consumed, host would close");
            }
        }

        self.controller.on_draw(&frame, &mut self.video);

        if self.controller.fit_hint_visible() {
            debug!(tick = self.tick, "Waiting for a reference image");
        }
    }

    fn tap(&mut self, target_name: &str, frame: &FrameContext) {
        let Some(node) = self.input.node_for(target_name) else {
            warn!(target = target_name, "Tap on a target with no registered node");
            return;
        };
        if self.controller.on_tap(node, frame, &mut self.session).is_some() {
            self.activations += 1;
        }
    }

    pub fn summary(&self) -> Summary {
        let anchors = self.controller.dispatcher().anchors();
        Summary {
            session_started: true,
            image_tracking: self.session.image_tracking(),
            ticks: self.tick,
            anchors_created: anchors.anchors_created(),
            live_records: anchors.live_count(),
            scene_nodes: self.scene.nodes().len(),
            nodes_with_renderable: self.scene.nodes_with_renderable(),
            tap_registrations: self.input.registrations(),
            activations: self.activations,
            overlay_visible: self.controller.activation().is_visible(),
            playback_state: self.controller.playback_state(),
            frames_drawn: self.controller.frames_drawn(),
            plays: self.video.plays().len(),
            diagnostics: self.diagnostics.entries(),
        }
    }
}

fn not_started(diagnostics: &DiagnosticLog) -> Summary {
    Summary {
        session_started: false,
        image_tracking: false,
        ticks: 0,
        anchors_created: 0,
        live_records: 0,
        scene_nodes: 0,
        nodes_with_renderable: 0,
        tap_registrations: 0,
        activations: 0,
        overlay_visible: false,
        playback_state: OverlayPlaybackState::Idle,
        frames_drawn: 0,
        plays: 0,
        diagnostics: diagnostics.entries(),
    }
}

/// Run a whole scenario against `config`
pub async fn run(config: &Config, config_dir: &Path, scenario: &Scenario) -> Result<Summary> {
    let diagnostics = DiagnosticLog::new();
    let Some(mut sim) = Simulation::start(config, config_dir, scenario, diagnostics.clone()) else {
        warn!(
            attempts = scenario.resume_attempts.len(),
            "Session never started"
        );
        return Ok(not_started(&diagnostics));
    };

    let interval = Duration::from_millis(scenario.frame_interval_ms);
    for script in &scenario.ticks {
        for i in 0..script.repeat {
            sim.step(script, i == 0);
            if interval.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(interval).await;
            }
        }
    }

    let summary = sim.summary();
    info!(
        ticks = summary.ticks,
        anchors = summary.anchors_created,
        frames = summary.frames_drawn,
        "Scenario complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::Availability;
    use glam::{Quat, Vec3};
    use tempfile::TempDir;
    use tokio::sync::oneshot;
    use vidanchor_core::{DiagnosticKind, Pose, TrackedTarget, TrackingState};
    use vidanchor_scene::TrackingLossPolicy;

    /// Assets dir with the earth reference image and marker model
    fn setup() -> (TempDir, Config) {
        let temp_dir = TempDir::new().unwrap();
        let assets = temp_dir.path().join("assets");
        std::fs::create_dir(&assets).unwrap();
        image::RgbImage::new(16, 16).save(assets.join("earth.png")).unwrap();
        std::fs::write(assets.join("earth.sfb"), b"sfb-model").unwrap();

        let mut config = Config::default();
        config.reference_images[0].path = "earth.png".to_string();
        (temp_dir, config)
    }

    fn earth(state: TrackingState) -> TrackedTarget {
        TrackedTarget::new("earth", Pose::from_translation(Vec3::new(0.0, 0.0, -1.0)), state)
    }

    fn tick(targets: Vec<TrackedTarget>) -> TickScript {
        TickScript {
            targets,
            ..Default::default()
        }
    }

    async fn wait_for_asset(sim: &Simulation) {
        let (tx, rx) = oneshot::channel();
        sim.asset().on_complete(move |outcome| {
            let _ = tx.send(outcome.is_ok());
        });
        assert!(rx.await.unwrap());
    }

    #[tokio::test]
    async fn test_tap_activates_overlay_with_sensor_rotation() {
        let (temp_dir, config) = setup();
        let scenario: Scenario = toml::from_str("frame_interval_ms = 0").unwrap();
        let mut sim = Simulation::start(&config, temp_dir.path(), &scenario, DiagnosticLog::new()).unwrap();
        wait_for_asset(&sim).await;

        sim.step(&tick(vec![earth(TrackingState::Paused)]), true);
        assert_eq!(sim.summary().anchors_created, 0);

        sim.step(&tick(vec![earth(TrackingState::Tracking)]), true);
        let sensor = Pose::new(Vec3::new(0.0, 1.5, 0.0), Quat::from_rotation_y(0.5));
        let tap = TickScript {
            tap: Some("earth".to_string()),
            sensor_pose: sensor,
            ..tick(vec![earth(TrackingState::Tracking)])
        };
        sim.step(&tap, true);
        for _ in 0..3 {
            sim.step(&tick(Vec::new()), false);
        }

        let summary = sim.summary();
        assert!(summary.image_tracking);
        assert_eq!(summary.ticks, 6);
        assert_eq!(summary.live_records, 1);
        assert_eq!(summary.nodes_with_renderable, 1);
        assert_eq!(summary.tap_registrations, 1);
        assert_eq!(summary.activations, 1);
        assert_eq!(summary.playback_state, OverlayPlaybackState::Playing);
        assert_eq!(summary.frames_drawn, 4);
        assert_eq!(summary.plays, 1);
        // target anchor + overlay anchor
        assert_eq!(sim.session.anchors().len(), 2);
        assert_eq!(sim.session.anchors()[1].pose().rotation(), sensor.rotation());
    }

    #[tokio::test]
    async fn test_back_press_and_pause() {
        let (temp_dir, config) = setup();
        let scenario: Scenario = toml::from_str("frame_interval_ms = 0").unwrap();
        let mut sim = Simulation::start(&config, temp_dir.path(), &scenario, DiagnosticLog::new()).unwrap();

        sim.step(&tick(vec![earth(TrackingState::Tracking)]), true);
        sim.step(
            &TickScript {
                tap: Some("earth".to_string()),
                ..Default::default()
            },
            true,
        );
        sim.step(
            &TickScript {
                back: true,
                ..Default::default()
            },
            true,
        );
        assert!(!sim.summary().overlay_visible);
        assert_eq!(sim.summary().playback_state, OverlayPlaybackState::Idle);

        sim.step(
            &TickScript {
                pause: true,
                ..tick(vec![earth(TrackingState::Tracking)])
            },
            true,
        );
        assert_eq!(sim.summary().ticks, 3);
        sim.step(
            &TickScript {
                resume: true,
                ..Default::default()
            },
            true,
        );
        assert_eq!(sim.summary().ticks, 4);
        assert_eq!(sim.summary().frames_drawn, 1);
    }

    #[tokio::test]
    async fn test_unknown_tap_is_ignored() {
        let (temp_dir, config) = setup();
        let scenario: Scenario = toml::from_str("frame_interval_ms = 0").unwrap();
        let mut sim = Simulation::start(&config, temp_dir.path(), &scenario, DiagnosticLog::new()).unwrap();

        sim.step(
            &TickScript {
                tap: Some("earth".to_string()),
                ..Default::default()
            },
            true,
        );
        assert_eq!(sim.summary().activations, 0);
        assert!(sim.controller().fit_hint_visible());
    }

    #[tokio::test]
    async fn test_reattach_after_retire_counts_each_registration() {
        let (temp_dir, mut config) = setup();
        config.overlay.loss_policy = TrackingLossPolicy::RetireOnStop;
        let scenario = Scenario {
            resume_attempts: vec![Availability::Ready],
            frame_interval_ms: 0,
            ticks: vec![
                tick(vec![earth(TrackingState::Tracking)]),
                tick(vec![earth(TrackingState::Stopped)]),
                tick(vec![earth(TrackingState::Tracking)]),
            ],
        };

        let summary = run(&config, temp_dir.path(), &scenario).await.unwrap();
        assert_eq!(summary.anchors_created, 2);
        assert_eq!(summary.live_records, 1);
        assert_eq!(summary.scene_nodes, 1);
        assert_eq!(summary.tap_registrations, 2);
    }

    #[tokio::test]
    async fn test_run_never_started() {
        let (temp_dir, config) = setup();
        let scenario = Scenario {
            resume_attempts: vec![Availability::CameraPermissionDenied, Availability::AppTooOld],
            frame_interval_ms: 0,
            ticks: vec![tick(vec![earth(TrackingState::Tracking)])],
        };

        let summary = run(&config, temp_dir.path(), &scenario).await.unwrap();
        assert!(!summary.session_started);
        assert_eq!(summary.ticks, 0);
        assert_eq!(summary.diagnostics.len(), 2);
        assert!(summary
            .diagnostics
            .iter()
            .all(|d| d.kind == DiagnosticKind::Bootstrap));
    }

    #[tokio::test]
    async fn test_run_without_image_database() {
        let (temp_dir, mut config) = setup();
        config.reference_images[0].path = "missing.png".to_string();
        let scenario = Scenario {
            resume_attempts: vec![Availability::InstallRequested, Availability::Ready],
            frame_interval_ms: 0,
            ticks: vec![TickScript {
                repeat: 5,
                ..tick(vec![earth(TrackingState::Tracking)])
            }],
        };

        let summary = run(&config, temp_dir.path(), &scenario).await.unwrap();
        assert!(summary.session_started);
        assert!(!summary.image_tracking);
        assert_eq!(summary.ticks, 5);
        assert_eq!(summary.anchors_created, 0);
        assert_eq!(summary.diagnostics.len(), 1);
        assert_eq!(summary.diagnostics[0].kind, DiagnosticKind::TargetDatabase);
    }

    #[tokio::test]
    async fn test_run_repeats_tracking_without_duplicate_anchors() {
        let (temp_dir, config) = setup();
        let scenario = Scenario {
            resume_attempts: vec![Availability::Ready],
            frame_interval_ms: 1,
            ticks: vec![
                TickScript {
                    repeat: 10,
                    ..tick(vec![earth(TrackingState::Tracking)])
                },
                TickScript {
                    tap: Some("earth".to_string()),
                    repeat: 4,
                    ..tick(vec![earth(TrackingState::Tracking)])
                },
            ],
        };

        let summary = run(&config, temp_dir.path(), &scenario).await.unwrap();
        assert_eq!(summary.ticks, 14);
        assert_eq!(summary.anchors_created, 1);
        assert_eq!(summary.scene_nodes, 1);
        assert_eq!(summary.activations, 1);
        assert_eq!(summary.frames_drawn, 4);
        assert_eq!(summary.plays, 1);
    }
}

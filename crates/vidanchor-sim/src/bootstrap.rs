//! Session bootstrap: runtime availability checks and session configuration
//!
//! Each resume is one startup attempt. A failed attempt is reported once
//! with a user-facing notice and retried on the next resume; nothing here
//! is fatal to the process.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{error, info, warn};
use vidanchor_core::{DiagnosticKind, DiagnosticLog, ReferenceImage, TargetDatabase};
use vidanchor_scene::SessionError;

/// What the platform reports when a session is requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    #[default]
    Ready,
    /// Runtime missing; an install prompt can be shown
    InstallRequested,
    RuntimeNotInstalled,
    RuntimeTooOld,
    AppTooOld,
    DeviceUnsupported,
    CameraUnavailable,
    CameraPermissionDenied,
}

/// How frames are delivered once configured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    /// Frames are delivered as soon as the camera produces them
    LatestCameraImage,
}

/// Result of configuring a started session
#[derive(Debug, Clone)]
pub struct SessionConfiguration {
    /// `None` when the database could not be built; image tracking is off
    pub image_database: Option<TargetDatabase>,
    pub update_mode: UpdateMode,
}

#[derive(Debug)]
pub enum ResumeOutcome {
    Started(SessionConfiguration),
    /// Install prompt shown; try again on the next resume
    InstallRequested,
    Failed(SessionError),
}

pub struct SessionBootstrap {
    install_requested: bool,
    diagnostics: DiagnosticLog,
}

impl SessionBootstrap {
    pub fn new(diagnostics: DiagnosticLog) -> Self {
        Self {
            install_requested: false,
            diagnostics,
        }
    }

    /// One startup attempt
    pub fn resume(
        &mut self,
        availability: Availability,
        reference_images: &[ReferenceImage],
        assets_dir: &Path,
    ) -> ResumeOutcome {
        match self.check(availability) {
            Ok(true) => {}
            Ok(false) => return ResumeOutcome::InstallRequested,
            Err(e) => {
                error!(error = %e, notice = e.user_message(), "Failed to create session");
                self.diagnostics.record(DiagnosticKind::Bootstrap, e.to_string());
                return ResumeOutcome::Failed(e);
            }
        }

        let configuration = configure_session(reference_images, assets_dir, &self.diagnostics);
        info!(
            image_tracking = configuration.image_database.is_some(),
            "Session started"
        );
        ResumeOutcome::Started(configuration)
    }

    /// Ok(true) when a session can be created, Ok(false) when an install
    /// prompt was just shown
    fn check(&mut self, availability: Availability) -> Result<bool, SessionError> {
        match availability {
            Availability::Ready => Ok(true),
            // Only prompt once; a second request means the prompt was dismissed
            Availability::InstallRequested if !self.install_requested => {
                self.install_requested = true;
                info!("Requested AR runtime install");
                Ok(false)
            }
            Availability::InstallRequested => Err(SessionError::UserDeclinedInstall),
            Availability::RuntimeNotInstalled => Err(SessionError::RuntimeNotInstalled),
            Availability::RuntimeTooOld => Err(SessionError::RuntimeTooOld),
            Availability::AppTooOld => Err(SessionError::AppTooOld),
            Availability::DeviceUnsupported => Err(SessionError::DeviceUnsupported(
                "platform reported no AR support".to_string(),
            )),
            Availability::CameraUnavailable => Err(SessionError::CameraUnavailable),
            Availability::CameraPermissionDenied => Err(SessionError::CameraPermissionDenied),
        }
    }
}

/// Build the reference-image database. A failure is reported and the
/// session runs without image tracking.
pub fn configure_session(
    reference_images: &[ReferenceImage],
    assets_dir: &Path,
    diagnostics: &DiagnosticLog,
) -> SessionConfiguration {
    let image_database = match TargetDatabase::build(reference_images, assets_dir) {
        Ok(db) => Some(db),
        Err(e) => {
            warn!(
                error = %e,
                notice = "Could not setup augmented image database",
                "Image tracking disabled"
            );
            diagnostics.record(DiagnosticKind::TargetDatabase, e.to_string());
            None
        }
    };

    SessionConfiguration {
        image_database,
        update_mode: UpdateMode::LatestCameraImage,
    }
}

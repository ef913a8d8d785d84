//! vidanchor Core - Pose types, asset loading, and target database
//!
//! This crate provides the foundational types for the vidanchor system:
//! - Pose and tracked-target types reported by the AR session
//! - Deferred renderable loading with single-fire completion
//! - Reference-image database used to recognise planar targets
//! - A shared diagnostic log for non-fatal failures

pub mod asset;
pub mod diagnostics;
pub mod pose;
pub mod target_db;

pub use asset::{sha256_hex, AssetError, AssetHandle, AssetOutcome, AsyncAssetLoader, RenderableAsset};
pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticLog};
pub use pose::{Pose, TrackedTarget, TrackingState};
pub use target_db::{ReferenceImage, TargetDatabase, TargetDatabaseError, TargetEntry};

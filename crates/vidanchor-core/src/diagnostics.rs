//! Record of non-fatal failures
//!
//! Asset and configuration errors never propagate through the frame loop.
//! They are logged where they happen and recorded here so the host can show
//! a notice or report them later.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A renderable failed to load; the node stays empty
    AssetLoad,
    /// The reference-image database could not be built
    TargetDatabase,
    /// Session bootstrap failed for this attempt
    Bootstrap,
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub at: DateTime<Utc>,
    pub kind: DiagnosticKind,
    pub message: String,
}

/// Cloneable, thread-safe diagnostic log
#[derive(Debug, Clone, Default)]
pub struct DiagnosticLog {
    entries: Arc<Mutex<Vec<Diagnostic>>>,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, kind: DiagnosticKind, message: impl Into<String>) {
        self.entries.lock().push(Diagnostic {
            at: Utc::now(),
            kind,
            message: message.into(),
        });
    }

    /// Snapshot of all entries in recording order
    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries.lock().clone()
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.entries.lock().iter().filter(|d| d.kind == kind).count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

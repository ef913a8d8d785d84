//! Reference-image database - maps target names to decoded reference images
//!
//! The AR session recognises planar targets by comparing camera frames
//! against these images. Building the database decodes every image up front
//! so a missing or corrupt file is reported once at configuration time.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum TargetDatabaseError {
    #[error("No reference images configured")]
    Empty,
    #[error("Duplicate reference image name: {0}")]
    DuplicateName(String),
    #[error("Failed to decode reference image {name}: {source}")]
    Decode {
        name: String,
        #[source]
        source: image::ImageError,
    },
    #[error("Reference image {0} has no pixels")]
    ZeroSized(String),
}

/// One configured reference image
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceImage {
    /// Target name reported back by the session (e.g., "earth")
    pub name: String,
    /// Image path, relative to the assets directory
    pub path: String,
    /// Printed width in meters, if known; helps the session estimate scale faster
    #[serde(default)]
    pub physical_width_m: Option<f32>,
}

/// A decoded database entry
#[derive(Debug, Clone, PartialEq)]
pub struct TargetEntry {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub physical_width_m: Option<f32>,
}

/// Database of recognisable targets
#[derive(Debug, Clone, Default)]
pub struct TargetDatabase {
    entries: Vec<TargetEntry>,
}

impl TargetDatabase {
    /// Decode every configured image relative to `base_dir`
    pub fn build(images: &[ReferenceImage], base_dir: &Path) -> Result<Self, TargetDatabaseError> {
        if images.is_empty() {
            return Err(TargetDatabaseError::Empty);
        }

        let mut seen = HashSet::new();
        for reference in images {
            if !seen.insert(reference.name.as_str()) {
                return Err(TargetDatabaseError::DuplicateName(reference.name.clone()));
            }
        }

        let mut entries = Vec::with_capacity(images.len());
        for reference in images {
            let path = base_dir.join(&reference.path);
            let decoded = image::open(&path).map_err(|source| TargetDatabaseError::Decode {
                name: reference.name.clone(),
                source,
            })?;
            if decoded.width() == 0 || decoded.height() == 0 {
                return Err(TargetDatabaseError::ZeroSized(reference.name.clone()));
            }

            debug!(
                name = %reference.name,
                width = decoded.width(),
                height = decoded.height(),
                "Decoded reference image"
            );
            entries.push(TargetEntry {
                name: reference.name.clone(),
                width: decoded.width(),
                height: decoded.height(),
                physical_width_m: reference.physical_width_m,
            });
        }

        info!(targets = entries.len(), "Built reference-image database");
        Ok(Self { entries })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&TargetEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }
}

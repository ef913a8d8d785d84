//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;
use vidanchor_core::ReferenceImage;
use vidanchor_scene::{ClipPlanes, OverlaySettings, TrackingLossPolicy};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub overlay: OverlayConfig,
    #[serde(default)]
    pub assets: AssetsConfig,
    #[serde(default, rename = "reference_image")]
    pub reference_images: Vec<ReferenceImage>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            overlay: OverlayConfig::default(),
            assets: AssetsConfig::default(),
            reference_images: vec![ReferenceImage {
                name: default_target(),
                path: "earth.jpg".to_string(),
                physical_width_m: None,
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Reference image that gets the marker model and activates the video
    #[serde(default = "default_target")]
    pub target: String,
    /// Marker model source, relative to the assets directory
    #[serde(default = "default_model_source")]
    pub model_source: String,
    /// Registry key shared by every node showing the marker model
    #[serde(default = "default_target")]
    pub model_registry_key: String,
    /// Video played on the overlay
    #[serde(default = "default_video_source")]
    pub video_source: String,
    /// Near clip distance in meters
    #[serde(default = "default_near")]
    pub near: f32,
    /// Far clip distance in meters
    #[serde(default = "default_far")]
    pub far: f32,
    /// What to do with the anchor when tracking stops
    #[serde(default)]
    pub loss_policy: TrackingLossPolicy,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            target: default_target(),
            model_source: default_model_source(),
            model_registry_key: default_target(),
            video_source: default_video_source(),
            near: default_near(),
            far: default_far(),
            loss_policy: TrackingLossPolicy::Persist,
        }
    }
}

fn default_target() -> String {
    "earth".to_string()
}

fn default_model_source() -> String {
    "earth.sfb".to_string()
}

fn default_video_source() -> String {
    "planet.mp4".to_string()
}

fn default_near() -> f32 {
    0.1
}

fn default_far() -> f32 {
    100.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetsConfig {
    /// Directory holding models and reference images
    #[serde(default = "default_assets_path")]
    pub path: String,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            path: default_assets_path(),
        }
    }
}

fn default_assets_path() -> String {
    "./assets".to_string()
}

impl Config {
    /// Convert to the controller's settings
    pub fn to_overlay_settings(&self) -> OverlaySettings {
        OverlaySettings {
            recognized_target: self.overlay.target.clone(),
            video_source: self.overlay.video_source.clone(),
            clip: ClipPlanes {
                near: self.overlay.near,
                far: self.overlay.far,
            },
            loss_policy: self.overlay.loss_policy,
        }
    }

    /// Assets directory, resolved against the directory of the config file
    pub fn assets_dir(&self, config_dir: &Path) -> PathBuf {
        config_dir.join(&self.assets.path)
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.overlay.near > 0.0 && self.overlay.far > self.overlay.near,
            "invalid clip planes: near={} far={}",
            self.overlay.near,
            self.overlay.far
        );
        anyhow::ensure!(!self.overlay.target.is_empty(), "overlay target name is empty");
        Ok(())
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    let config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        info!(path = %path.display(), "Loaded configuration");
        config
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Config::default()
    };

    config.validate()?;
    Ok(config)
}

/// Save default configuration to file
pub fn save_default_config(path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(&Config::default())?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = load_config(&temp_dir.path().join("absent.toml")).unwrap();

        assert_eq!(config.overlay.target, "earth");
        assert_eq!(config.overlay.video_source, "planet.mp4");
        assert_eq!(config.reference_images.len(), 1);
        let settings = config.to_overlay_settings();
        assert_eq!(settings.clip, ClipPlanes::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("vidanchor.toml");
        std::fs::write(
            &path,
            r#"
[overlay]
target = "moon"
loss_policy = "retire_on_stop"

[[reference_image]]
name = "moon"
path = "moon.png"
physical_width_m = 0.2
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.overlay.target, "moon");
        assert_eq!(config.overlay.model_source, "earth.sfb");
        assert_eq!(config.overlay.far, 100.0);
        assert_eq!(config.overlay.loss_policy, TrackingLossPolicy::RetireOnStop);
        assert_eq!(config.reference_images[0].physical_width_m, Some(0.2));
    }

    #[test]
    fn test_rejects_bad_clip_planes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("vidanchor.toml");
        std::fs::write(&path, "[overlay]\nnear = 5.0\nfar = 1.0\n").unwrap();

        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_default_config_round_trips() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("vidanchor.toml");
        save_default_config(&path).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.reference_images[0].name, "earth");
    }
}

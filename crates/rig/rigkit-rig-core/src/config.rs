//! Rigging configuration.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glam::DVec3;
use rigkit_scene_core::SceneConfig;
use serde::{Deserialize, Serialize};

/// Tunables shared by every module installed through a [`Rigger`](crate::Rigger).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RigConfig {
    /// Prefix for generated module names (`instance_1`, `instance_2`, ...).
    pub default_name_base: String,
    /// Offset of a module's default hook target from its root control.
    pub hook_anchor_offset: DVec3,
    /// Offset of a segment's pole anchor from the parent translation control.
    pub segment_pole_offset: DVec3,
    /// Offset of a synthesized pole locator from the chain root.
    pub synthesized_pole_offset: DVec3,
    /// Stop stretchy segments from shrinking below their rest length.
    pub lock_minimum_length: bool,
    /// Initial `creationPoseWeight` of a locked module.
    pub default_creation_pose_weight: f64,
    /// Extra template directory layered over the built-in templates.
    pub templates: Option<PathBuf>,
    pub scene: SceneConfig,
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            default_name_base: "instance_".to_string(),
            hook_anchor_offset: DVec3::new(0.0, 0.001, 0.0),
            segment_pole_offset: DVec3::new(0.0, -0.5, 0.0),
            synthesized_pole_offset: DVec3::new(0.0, 1.0, 0.0),
            lock_minimum_length: false,
            default_creation_pose_weight: 1.0,
            templates: None,
            scene: SceneConfig::default(),
        }
    }
}

impl RigConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("failed to parse rig config")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read rig config {}", path.display()))?;
        Self::from_json_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = RigConfig::from_json_str(r#"{ "lock_minimum_length": true }"#).unwrap();
        assert!(config.lock_minimum_length);
        assert_eq!(config.default_name_base, "instance_");
        assert_eq!(config.hook_anchor_offset, DVec3::new(0.0, 0.001, 0.0));
        assert_eq!(config.scene.max_passes, SceneConfig::default().max_passes);
    }

    #[test]
    fn malformed_json_is_reported() {
        let err = RigConfig::from_json_str("{ nope").unwrap_err();
        assert!(err.to_string().contains("rig config"));
    }
}

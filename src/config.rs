// src/config.rs

use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "sandbox.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self { title: "Sandbox 3D".to_string(), width: 800, height: 600 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    pub scene: PathBuf,
    pub player_model: PathBuf,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            scene: PathBuf::from("Data/Level0.scene"),
            player_model: PathBuf::from("Data/Player/player.obj"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub front: [f32; 3],
    pub fov_y_deg: f32,
    pub near: f32,
    pub far: f32,
    /// Height above the top of the player model in fixed mode.
    pub eye_height: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 3.0],
            front: [0.0, 0.0, -1.0],
            fov_y_deg: 45.0,
            near: 0.1,
            far: 100.0,
            eye_height: 0.4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub speed: f32,
    pub jump_strength: f32,
    pub gravity: f32,
    pub ground_y: f32,
    pub max_health: f32,
    /// Free fall distance that costs nothing.
    pub fall_damage_height: f32,
    pub spawn: [f32; 3],
    pub scale: [f32; 3],
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            speed: 2.5,
            jump_strength: 5.0,
            gravity: -5.0,
            ground_y: 0.0,
            max_health: 100.0,
            fall_damage_height: 1.0,
            spawn: [0.0, 0.0, 0.0],
            scale: [0.2, 0.7, 0.1],
        }
    }
}

impl PlayerConfig {
    pub fn spawn_position(&self) -> Vec3 {
        Vec3::from_array(self.spawn)
    }

    pub fn scale(&self) -> Vec3 {
        Vec3::from_array(self.scale)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BloomConfig {
    pub enabled: bool,
    pub threshold: f32,
    pub strength: f32,
}

impl Default for BloomConfig {
    fn default() -> Self {
        Self { enabled: true, threshold: 0.6, strength: 0.8 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SinkingPlatformConfig {
    pub model: usize,
    pub rest_on: usize,
    pub speed: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    pub window: WindowConfig,
    pub assets: AssetConfig,
    pub camera: CameraConfig,
    pub player: PlayerConfig,
    pub bloom: BloomConfig,
    pub sinking_platform: Option<SinkingPlatformConfig>,
}

impl SandboxConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text).map_err(|source| ConfigError::Json {
            path: path.display().to_string(),
            source,
        })
    }

    /// Reads `path` when it exists, otherwise falls back to defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("No {} found, using default configuration", path.display());
            return Ok(Self::default());
        }
        let config = Self::load(path)?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_sandbox_tuning() {
        let c = SandboxConfig::default();
        assert_eq!((c.window.width, c.window.height), (800, 600));
        assert_eq!(c.player.speed, 2.5);
        assert_eq!(c.player.jump_strength, 5.0);
        assert_eq!(c.player.gravity, -5.0);
        assert_eq!(c.camera.fov_y_deg, 45.0);
        assert_eq!(c.bloom.threshold, 0.6);
        assert_eq!(c.bloom.strength, 0.8);
        assert!(c.sinking_platform.is_none());
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let c = SandboxConfig::from_json(
            r#"{ "player": { "speed": 4.0 }, "bloom": { "enabled": false },
                 "sinking_platform": { "model": 2, "rest_on": 0, "speed": 0.5 } }"#,
        )
        .unwrap();
        assert_eq!(c.player.speed, 4.0);
        assert_eq!(c.player.jump_strength, 5.0);
        assert!(!c.bloom.enabled);
        assert_eq!(c.bloom.threshold, 0.6);
        assert_eq!(c.window, WindowConfig::default());
        assert_eq!(c.sinking_platform, Some(SinkingPlatformConfig { model: 2, rest_on: 0, speed: 0.5 }));
    }

    #[test]
    fn empty_object_is_default() {
        assert_eq!(SandboxConfig::from_json("{}").unwrap(), SandboxConfig::default());
    }

    #[test]
    fn missing_file_falls_back_to_default() {
        let c = SandboxConfig::load_or_default("definitely/not/sandbox.json").unwrap();
        assert_eq!(c, SandboxConfig::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let path = std::env::temp_dir().join(format!("sandbox3d_{}_bad.json", std::process::id()));
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(SandboxConfig::load_or_default(&path), Err(ConfigError::Json { .. })));
        std::fs::remove_file(path).ok();
    }
}

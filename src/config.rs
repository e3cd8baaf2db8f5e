//! Grounding configuration, persisted as TOML.
//!
//! Camera calibration and scoring scales are explicit configuration rather than
//! constants, so scenes with different camera setups or tuned scoring parameters can
//! be processed concurrently.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::geometry::{Camera, DEFAULT_CAMERA_ANGLE, DEFAULT_CAMERA_POSITION};

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Camera calibration as it appears in config files and scene documents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    /// World-space position.
    #[serde(default = "default_camera_position")]
    pub position: [f64; 3],
    /// Euler rotation (radians).
    #[serde(default)]
    pub rotation: [f64; 3],
    /// Field-of-view angle (radians).
    #[serde(default = "default_camera_angle")]
    pub angle: f64,
}

fn default_camera_position() -> [f64; 3] {
    DEFAULT_CAMERA_POSITION
}
fn default_camera_angle() -> f64 {
    DEFAULT_CAMERA_ANGLE
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: default_camera_position(),
            rotation: [0.0; 3],
            angle: default_camera_angle(),
        }
    }
}

impl CameraConfig {
    pub fn to_camera(&self) -> Camera {
        Camera {
            position: self.position.into(),
            rotation: self.rotation.into(),
            angle: self.angle,
        }
    }
}

/// Weights of the relation score.
///
/// A match scores `dist_scale * distance + ratio_scale * alignment`, where
/// `alignment` is the share of the distance that lies along the relation's axis.
/// Both scales are empirical knobs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_dist_scale")]
    pub dist_scale: f64,
    #[serde(default = "default_ratio_scale")]
    pub ratio_scale: f64,
}

fn default_dist_scale() -> f64 {
    -0.3
}
fn default_ratio_scale() -> f64 {
    1.0
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            dist_scale: default_dist_scale(),
            ratio_scale: default_ratio_scale(),
        }
    }
}

/// Top-level grounding configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundConfig {
    /// Camera used when a scene document carries none.
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    /// Upper bound on propagation rounds.
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,
    /// A seed mention matching at most this many entities is taken as certain.
    #[serde(default = "default_max_seed_matches")]
    pub max_seed_matches: usize,
}

fn default_max_rounds() -> usize {
    32
}
fn default_max_seed_matches() -> usize {
    1
}

impl Default for GroundConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            scoring: ScoringConfig::default(),
            max_rounds: default_max_rounds(),
            max_seed_matches: default_max_seed_matches(),
        }
    }
}

impl GroundConfig {
    /// Check that every field is usable.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_rounds == 0 {
            return Err(ConfigError::Invalid {
                message: "max_rounds must be > 0".into(),
            });
        }
        if self.max_seed_matches == 0 {
            return Err(ConfigError::Invalid {
                message: "max_seed_matches must be > 0".into(),
            });
        }
        if !self.scoring.dist_scale.is_finite() || !self.scoring.ratio_scale.is_finite() {
            return Err(ConfigError::Invalid {
                message: "scoring scales must be finite".into(),
            });
        }
        let cam = &self.camera;
        if !cam
            .position
            .iter()
            .chain(cam.rotation.iter())
            .chain(std::iter::once(&cam.angle))
            .all(|v| v.is_finite())
        {
            return Err(ConfigError::Invalid {
                message: "camera parameters must be finite".into(),
            });
        }
        Ok(())
    }

    /// Parse and validate a TOML string. `origin` names the source in errors.
    pub fn from_toml_str(content: &str, origin: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: origin.to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&content, &path.display().to_string())
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = self.to_toml()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    pub fn to_toml(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid {
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_calibration() {
        let config = GroundConfig::default();
        assert_eq!(config.camera.position, [7.21, -6.83, 5.12]);
        assert_eq!(config.scoring.dist_scale, -0.3);
        assert_eq!(config.scoring.ratio_scale, 1.0);
        assert_eq!(config.max_rounds, 32);
        assert_eq!(config.max_seed_matches, 1);
        config.validate().unwrap();
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config = GroundConfig::from_toml_str(
            "max_rounds = 5\n[scoring]\nratio_scale = 2.0\n",
            "inline",
        )
        .unwrap();
        assert_eq!(config.max_rounds, 5);
        assert_eq!(config.scoring.ratio_scale, 2.0);
        assert_eq!(config.scoring.dist_scale, -0.3);
        assert_eq!(config.camera, CameraConfig::default());
    }

    #[test]
    fn zero_rounds_rejected() {
        let err = GroundConfig::from_toml_str("max_rounds = 0", "inline").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn bad_toml_reports_parse_error() {
        let err = GroundConfig::from_toml_str("max_rounds = [", "inline").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn save_then_load_from_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("ground.toml");
        let mut config = GroundConfig::default();
        config.camera.position = [1.0, 2.0, 3.0];
        config.max_seed_matches = 2;
        config.save(&path).unwrap();

        let loaded = GroundConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = GroundConfig::load(Path::new("/nonexistent/ground.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn camera_config_converts() {
        let cam = CameraConfig {
            position: [1.0, 0.0, 2.0],
            rotation: [0.0, 0.5, 0.0],
            angle: 1.0,
        }
        .to_camera();
        assert_eq!(cam.position.z, 2.0);
        assert_eq!(cam.rotation.y, 0.5);
        assert_eq!(cam.angle, 1.0);
    }
}

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{GuideError, GuideResult};

/// Step size used when blending a new estimate into a bin.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningRate {
    /// Constant rate in `(0, 1]`
    Fixed(f32),
    /// `1 / (1 + visits)`, a running average of every estimate seen
    #[default]
    VisitDecay,
}

impl LearningRate {
    #[inline]
    pub fn alpha(&self, visits: u32) -> f32 {
        match *self {
            LearningRate::Fixed(a) => a,
            LearningRate::VisitDecay => 1.0 / (1.0 + visits as f32),
        }
    }
}

/// Which sampling structure backs the guider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuiderKind {
    /// Hemisphere histogram per cell, range tree sampling
    #[default]
    QTable,
    /// Sphere histogram per cell shared by all normals, linear scan sampling
    Sphere,
}

/// Largest spatial resolution whose `R^3` cell indices fit the `i32`
/// indices of a guide table file.
pub const MAX_SCENE_RESOLUTION: u32 = 1290;

/// Largest directional resolution. The sphere guider's hemisphere map holds
/// `2 R^4` entries.
pub const MAX_ANGLE_RESOLUTION: u32 = 32;

/// Guider parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuiderConfig {
    /// Spatial cells per axis
    pub scene_resolution: u32,
    /// Directional bins per axis of the hemisphere grid
    pub angle_resolution: u32,
    pub learning_rate: LearningRate,
    /// Lower bound applied to every bin weight
    pub weight_floor: f32,
    /// Weight of every bin of a newly created cell
    pub initial_weight: f32,
    /// Table to resume from at `init`
    pub import_path: Option<PathBuf>,
    /// Where `done` writes the learned table
    pub export_path: Option<PathBuf>,
}

impl Default for GuiderConfig {
    fn default() -> Self {
        Self {
            scene_resolution: 50,
            angle_resolution: 8,
            learning_rate: LearningRate::default(),
            weight_floor: 0.1,
            initial_weight: 1.0,
            import_path: None,
            export_path: None,
        }
    }
}

impl GuiderConfig {
    pub fn validate(&self) -> GuideResult<()> {
        if self.scene_resolution == 0 || self.angle_resolution == 0 {
            return Err(GuideError::InvalidConfig(format!(
                "resolutions must be positive (scene {}, angle {})",
                self.scene_resolution, self.angle_resolution
            )));
        }
        if self.scene_resolution > MAX_SCENE_RESOLUTION {
            return Err(GuideError::InvalidConfig(format!(
                "scene resolution {} above {}",
                self.scene_resolution, MAX_SCENE_RESOLUTION
            )));
        }
        if self.angle_resolution > MAX_ANGLE_RESOLUTION {
            return Err(GuideError::InvalidConfig(format!(
                "angle resolution {} above {}",
                self.angle_resolution, MAX_ANGLE_RESOLUTION
            )));
        }
        if let LearningRate::Fixed(a) = self.learning_rate {
            if !(a > 0.0 && a <= 1.0) {
                return Err(GuideError::InvalidConfig(format!(
                    "learning rate {} outside (0, 1]",
                    a
                )));
            }
        }
        if !(self.weight_floor > 0.0) || !self.weight_floor.is_finite() {
            return Err(GuideError::InvalidConfig(format!(
                "weight floor {} must be positive",
                self.weight_floor
            )));
        }
        if !(self.initial_weight >= self.weight_floor) || !self.initial_weight.is_finite() {
            return Err(GuideError::InvalidConfig(format!(
                "initial weight {} below the floor {}",
                self.initial_weight, self.weight_floor
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = GuiderConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scene_resolution, 50);
        assert_eq!(config.angle_resolution, 8);
    }

    #[test]
    fn test_from_json() {
        let config: GuiderConfig = serde_json::from_str(
            r#"{ "angle_resolution": 4, "learning_rate": { "fixed": 0.25 }, "export_path": "out.qtable" }"#,
        )
        .unwrap();
        assert_eq!(config.angle_resolution, 4);
        assert_eq!(config.learning_rate, LearningRate::Fixed(0.25));
        assert_eq!(config.export_path, Some(PathBuf::from("out.qtable")));
        assert_eq!(config.weight_floor, 0.1);
    }

    #[test]
    fn test_rejects_bad_values() {
        let bad = [
            GuiderConfig { angle_resolution: 0, ..Default::default() },
            GuiderConfig { scene_resolution: 2000, ..Default::default() },
            GuiderConfig { scene_resolution: MAX_SCENE_RESOLUTION + 1, ..Default::default() },
            GuiderConfig { angle_resolution: MAX_ANGLE_RESOLUTION + 1, ..Default::default() },
            GuiderConfig { learning_rate: LearningRate::Fixed(0.0), ..Default::default() },
            GuiderConfig { learning_rate: LearningRate::Fixed(1.5), ..Default::default() },
            GuiderConfig { weight_floor: 0.0, ..Default::default() },
            GuiderConfig { weight_floor: f32::NAN, ..Default::default() },
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(GuideError::InvalidConfig(_))));
        }
    }

    #[test]
    fn test_largest_resolution_fits_table_indices() {
        let config = GuiderConfig {
            scene_resolution: MAX_SCENE_RESOLUTION,
            angle_resolution: MAX_ANGLE_RESOLUTION,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert!((MAX_SCENE_RESOLUTION as u64).pow(3) <= i32::MAX as u64);
        assert!((MAX_SCENE_RESOLUTION as u64 + 1).pow(3) > i32::MAX as u64);
    }

    #[test]
    fn test_visit_decay() {
        let rate = LearningRate::VisitDecay;
        assert_eq!(rate.alpha(0), 1.0);
        assert_eq!(rate.alpha(3), 0.25);
    }
}

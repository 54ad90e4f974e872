//! Terrain configuration. Every field has a serde default so partial config
//! files stay valid as new settings are added.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TerrainError};
use crate::mesh::MAX_RESOLUTION;

/// Settings for one terrain body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainConfig {
    /// Quads along each patch edge.
    #[serde(default = "default_resolution")]
    pub resolution: u32,
    /// Maximum wall-clock seconds the split/merge pass may spend per frame.
    #[serde(default = "default_budget")]
    pub budget: f32,
    /// Minimum seconds between re-evaluations of the same patch.
    #[serde(default = "default_delay_min")]
    pub delay_min: f32,
    /// Maximum seconds between re-evaluations of the same patch.
    #[serde(default = "default_delay_max")]
    pub delay_max: f32,
    /// Patches shallower than this get colliders (0 = no colliders).
    #[serde(default)]
    pub max_collider_depth: u32,
    /// Fraction the skirt ring is pulled toward the center at depth 0.
    /// Halves with every depth level.
    #[serde(default = "default_skirt_thickness")]
    pub skirt_thickness: f32,
    /// Inner radius of the terrain (displacement can go below it).
    #[serde(default = "default_radius")]
    pub radius: f32,
    /// Height range above the radius (displacement can go above it).
    #[serde(default = "default_height")]
    pub height: f32,
    /// Displacement before any displacer runs (0 = radius, 1 = radius + height).
    #[serde(default = "default_displacement")]
    pub default_displacement: f32,
    /// Vertex color before any vertex modifier runs.
    #[serde(default = "default_color")]
    pub default_color: [f32; 4],
    /// Local observer distance for a patch at each depth to split.
    /// Should start large and get smaller.
    #[serde(default = "default_split_distances")]
    pub split_distances: Vec<f32>,
    /// Seed for cooldown jitter.
    #[serde(default)]
    pub seed: u64,
}

fn default_resolution() -> u32 {
    5
}
fn default_budget() -> f32 {
    0.01
}
fn default_delay_min() -> f32 {
    0.5
}
fn default_delay_max() -> f32 {
    1.0
}
fn default_skirt_thickness() -> f32 {
    0.1
}
fn default_radius() -> f32 {
    1.0
}
fn default_height() -> f32 {
    0.1
}
fn default_displacement() -> f32 {
    0.5
}
fn default_color() -> [f32; 4] {
    [1.0, 1.0, 1.0, 1.0]
}
fn default_split_distances() -> Vec<f32> {
    vec![10.0, 5.0, 2.5, 1.25, 0.75]
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            resolution: default_resolution(),
            budget: default_budget(),
            delay_min: default_delay_min(),
            delay_max: default_delay_max(),
            max_collider_depth: 0,
            skirt_thickness: default_skirt_thickness(),
            radius: default_radius(),
            height: default_height(),
            default_displacement: default_displacement(),
            default_color: default_color(),
            split_distances: default_split_distances(),
            seed: 0,
        }
    }
}

impl TerrainConfig {
    /// Reject settings no terrain can be built with.
    pub fn validate(&self) -> Result<()> {
        if self.resolution == 0 || self.resolution > MAX_RESOLUTION {
            return Err(TerrainError::InvalidResolution(self.resolution));
        }
        if !self.radius.is_finite() || !self.height.is_finite() {
            return Err(TerrainError::InvalidConfig(format!(
                "radius {} and height {} must be finite",
                self.radius, self.height
            )));
        }
        Ok(())
    }

    /// Settings that still work but are probably a mistake.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !self.distances_in_order() {
            warnings.push("split distances should start large and get smaller".to_string());
        }
        if self.budget <= 0.0 || self.budget >= 1.0 {
            warnings.push(format!("budget {} should be within (0, 1) seconds", self.budget));
        }
        if self.delay_min < 0.0 || self.delay_min >= 10.0 {
            warnings.push(format!("delay_min {} should be within [0, 10)", self.delay_min));
        }
        if self.delay_max <= 0.0 || self.delay_max >= 10.0 {
            warnings.push(format!("delay_max {} should be within (0, 10)", self.delay_max));
        }
        if self.delay_min > self.delay_max {
            warnings.push(format!(
                "delay_min {} is greater than delay_max {}",
                self.delay_min, self.delay_max
            ));
        }
        if self.radius <= 0.0 {
            warnings.push(format!("radius {} should be positive", self.radius));
        }
        if self.height <= 0.0 {
            warnings.push(format!("height {} should be positive", self.height));
        }
        warnings
    }

    /// True when every split distance is strictly smaller than the previous one.
    pub fn distances_in_order(&self) -> bool {
        self.split_distances.windows(2).all(|w| w[1] < w[0])
    }

    /// Append a split distance half the size of the current last one (5.0 when empty).
    pub fn push_split_distance(&mut self) {
        let next = self.split_distances.last().map_or(5.0, |last| last * 0.5);
        self.split_distances.push(next);
    }

    /// Cooldown range with the bounds in ascending order.
    pub fn delay_range(&self) -> (f32, f32) {
        let lo = self.delay_min.min(self.delay_max).max(0.0);
        let hi = self.delay_min.max(self.delay_max).max(lo);
        (lo, hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid_and_quiet() {
        let config = TerrainConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.warnings().is_empty(), "{:?}", config.warnings());
    }

    #[test]
    fn out_of_range_resolution_is_rejected() {
        for resolution in [0, MAX_RESOLUTION + 1, 65535] {
            let config = TerrainConfig {
                resolution,
                ..Default::default()
            };
            assert_eq!(config.validate(), Err(TerrainError::InvalidResolution(resolution)));
        }
        let largest = TerrainConfig {
            resolution: MAX_RESOLUTION,
            ..Default::default()
        };
        assert!(largest.validate().is_ok());
    }

    #[test]
    fn increasing_distances_only_warn() {
        let config = TerrainConfig {
            split_distances: vec![1.0, 2.0, 0.5],
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert!(!config.distances_in_order());
        assert_eq!(config.warnings().len(), 1);
    }

    #[test]
    fn push_split_distance_halves_the_last_entry() {
        let mut config = TerrainConfig {
            split_distances: Vec::new(),
            ..Default::default()
        };
        config.push_split_distance();
        config.push_split_distance();
        assert_eq!(config.split_distances, vec![5.0, 2.5]);
    }

    #[test]
    fn delay_range_orders_swapped_bounds() {
        let config = TerrainConfig {
            delay_min: 2.0,
            delay_max: 1.0,
            ..Default::default()
        };
        assert_eq!(config.delay_range(), (1.0, 2.0));
    }
}

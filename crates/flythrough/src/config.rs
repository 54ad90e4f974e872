//! Flythrough settings. Loaded from flythrough.ron at startup.

use quadsphere::TerrainConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings for one scripted descent toward a terrain body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlythroughConfig {
    /// LOD and mesh settings for the body.
    #[serde(default)]
    pub terrain: TerrainConfig,
    /// Uniform scale of the body in world space.
    #[serde(default = "default_body_scale")]
    pub body_scale: f32,
    /// Number of simulated frames.
    #[serde(default = "default_frames")]
    pub frames: u32,
    /// Simulated seconds per frame. Ignored when `realtime` is set.
    #[serde(default = "default_frame_seconds")]
    pub frame_seconds: f32,
    /// Step frames by the wall clock instead of `frame_seconds`.
    #[serde(default)]
    pub realtime: bool,
    /// Observer starting altitude above the surface, in world units.
    #[serde(default = "default_start_altitude")]
    pub start_altitude: f32,
    /// The observer stops descending at this altitude.
    #[serde(default = "default_min_altitude")]
    pub min_altitude: f32,
    /// Fraction of the current altitude covered per second.
    #[serde(default = "default_descent_rate")]
    pub descent_rate: f32,
    /// Strength of the noise displacer. 0 leaves the sphere smooth.
    #[serde(default = "default_noise_strength")]
    pub noise_strength: f32,
    /// Leaf depth that receives scattered props.
    #[serde(default = "default_scatter_depth")]
    pub scatter_depth: u32,
    /// Log stats every this many frames.
    #[serde(default = "default_log_interval")]
    pub log_interval: u32,
}

fn default_body_scale() -> f32 {
    1.0
}
fn default_frames() -> u32 {
    600
}
fn default_frame_seconds() -> f32 {
    1.0 / 60.0
}
fn default_start_altitude() -> f32 {
    12.0
}
fn default_min_altitude() -> f32 {
    0.05
}
fn default_descent_rate() -> f32 {
    0.5
}
fn default_noise_strength() -> f32 {
    0.6
}
fn default_scatter_depth() -> u32 {
    3
}
fn default_log_interval() -> u32 {
    60
}

impl Default for FlythroughConfig {
    fn default() -> Self {
        Self {
            terrain: TerrainConfig::default(),
            body_scale: default_body_scale(),
            frames: default_frames(),
            frame_seconds: default_frame_seconds(),
            realtime: false,
            start_altitude: default_start_altitude(),
            min_altitude: default_min_altitude(),
            descent_rate: default_descent_rate(),
            noise_strength: default_noise_strength(),
            scatter_depth: default_scatter_depth(),
            log_interval: default_log_interval(),
        }
    }
}

impl FlythroughConfig {
    /// Load config from `path`, or `flythrough.ron` in the current directory.
    /// If the file is missing or invalid, returns default config.
    pub fn load(path: Option<&Path>) -> Self {
        let path = path.map(Path::to_path_buf).unwrap_or_else(config_path);
        match std::fs::read_to_string(&path) {
            Ok(data) => match ron::from_str(&data) {
                Ok(c) => return c,
                Err(e) => log::warn!("Invalid config at {:?}: {}, using defaults", path, e),
            },
            Err(_) => log::info!("No config at {:?}, using defaults", path),
        }
        Self::default()
    }
}

fn config_path() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join("flythrough.ron")
}

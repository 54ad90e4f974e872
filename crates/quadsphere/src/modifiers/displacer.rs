//! Height displacers: procedural noise and equirectangular heightmaps.

use std::f32::consts::PI;

use glam::{Vec2, Vec3};
use noise::{NoiseFn, Perlin, Simplex};

use crate::modifier::Displacement;

/// Seeds for the noise generators, derived only from the terrain seed so the
/// same seed always yields the same surface.
fn noise_seed(seed: u64, offset: u64) -> u32 {
    ((seed.wrapping_add(offset))
        .wrapping_mul(0x9e3779b97f4a7c15_u64)
        .wrapping_add(offset.wrapping_mul(0x6c078965_u64))
        >> 32) as u32
}

/// Equirectangular UV of a direction: `u` wraps around the Y axis, `v` runs
/// from the south pole (0) to the north pole (1).
pub fn cartesian_to_polar_uv(position: Vec3) -> Vec2 {
    let length = position.length();
    if length == 0.0 {
        return Vec2::splat(0.5);
    }
    let longitude = position.x.atan2(position.z);
    let latitude = (position.y / length).clamp(-1.0, 1.0).asin();
    Vec2::new(0.5 - longitude / (PI * 2.0), 0.5 + latitude / PI)
}

/// Fractal noise over the unit sphere.
#[derive(Debug, Clone)]
pub struct NoiseDisplacer {
    perlin: Perlin,
    simplex: Simplex,
    pub octaves: u32,
    /// Base frequency on the unit sphere.
    pub frequency: f64,
    pub persistence: f64,
    pub lacunarity: f64,
    /// Scale of the `[-0.5, 0.5]` noise contribution.
    pub strength: f32,
}

impl NoiseDisplacer {
    pub fn new(seed: u64) -> Self {
        Self {
            perlin: Perlin::new(noise_seed(seed, 0)),
            simplex: Simplex::new(noise_seed(seed, 1)),
            octaves: 6,
            frequency: 2.0,
            persistence: 0.5,
            lacunarity: 2.0,
            strength: 1.0,
        }
    }

    /// Noise in `[0, 1]` at a point on the unit sphere.
    pub fn sample(&self, direction: Vec3) -> f64 {
        let [x, y, z] = direction.as_dvec3().to_array();
        let mut value = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = self.frequency;
        let mut max_value = 0.0;

        for _ in 0..self.octaves {
            let p = [x * frequency, y * frequency, z * frequency];
            let q = [p[0] + 1000.0, p[1] + 1000.0, p[2] + 1000.0];
            value += (self.perlin.get(p) * 0.7 + self.simplex.get(q) * 0.3) * amplitude;
            max_value += amplitude;

            amplitude *= self.persistence;
            frequency *= self.lacunarity;
        }

        if max_value == 0.0 {
            return 0.5;
        }
        ((value / max_value + 1.0) * 0.5).clamp(0.0, 1.0)
    }
}

impl Displacement for NoiseDisplacer {
    fn displace(&self, local_position: Vec3, displacement: &mut f32) {
        let sample = self.sample(local_position.normalize_or_zero()) as f32;
        *displacement += (sample - 0.5) * self.strength;
    }
}

/// Heights sampled from an equirectangular grid of values in `[0, 1]`.
#[derive(Debug, Clone)]
pub struct HeightmapDisplacer {
    width: usize,
    height: usize,
    heights: Vec<f32>,
    pub strength: f32,
}

impl HeightmapDisplacer {
    /// `heights` is row-major, row 0 at the south pole. Returns `None` when the
    /// grid is empty or does not match `width * height`.
    pub fn new(width: usize, height: usize, heights: Vec<f32>, strength: f32) -> Option<Self> {
        if width == 0 || height == 0 || heights.len() != width * height {
            return None;
        }
        Some(Self {
            width,
            height,
            heights,
            strength,
        })
    }

    /// Bilinear sample. `u` wraps, `v` clamps.
    pub fn sample(&self, uv: Vec2) -> f32 {
        let x = uv.x.rem_euclid(1.0) * self.width as f32 - 0.5;
        let y = uv.y.clamp(0.0, 1.0) * self.height as f32 - 0.5;
        let fx = x - x.floor();
        let fy = y - y.floor();

        let wrap = |i: f32| (i as isize).rem_euclid(self.width as isize) as usize;
        let clamp = |j: f32| (j.max(0.0) as usize).min(self.height - 1);
        let x0 = wrap(x.floor());
        let x1 = wrap(x.floor() + 1.0);
        let y0 = clamp(y.floor());
        let y1 = clamp(y.floor() + 1.0);

        let at = |x: usize, y: usize| self.heights[y * self.width + x];
        let bottom = at(x0, y0) + (at(x1, y0) - at(x0, y0)) * fx;
        let top = at(x0, y1) + (at(x1, y1) - at(x0, y1)) * fx;
        bottom + (top - bottom) * fy
    }
}

impl Displacement for HeightmapDisplacer {
    fn displace(&self, local_position: Vec3, displacement: &mut f32) {
        let sample = self.sample(cartesian_to_polar_uv(local_position));
        *displacement += (sample - 0.5) * self.strength;
    }
}

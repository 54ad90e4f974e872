//! Vertex modifiers that recolor and remap UVs.

use glam::Vec4;

use super::displacer::cartesian_to_polar_uv;
use crate::modifier::{VertexData, VertexModifier};

/// Hermite falloff from 1 at `t <= 0` to 0 at `t >= 1`.
fn falloff(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - t * t * (3.0 - 2.0 * t)
}

/// Blends toward `color` where the surface is near a target altitude and slope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AltitudeColor {
    pub color: Vec4,
    /// Distance from the body center with full weight.
    pub height: f32,
    /// How far from `height` the weight fades to zero. 0 disables the height term.
    pub height_allowance: f32,
    /// Slope with full weight: 0 is flat, 1 is vertical.
    pub slope: f32,
    /// 0 disables the slope term.
    pub slope_allowance: f32,
}

impl Default for AltitudeColor {
    fn default() -> Self {
        Self {
            color: Vec4::ONE,
            height: 1.0,
            height_allowance: 0.2,
            slope: 0.0,
            slope_allowance: 0.5,
        }
    }
}

impl AltitudeColor {
    pub fn weight(&self, vertex: &VertexData) -> f32 {
        let distance = vertex.position.length();
        let mut weight = 1.0;

        if self.height_allowance != 0.0 {
            weight *= falloff((distance - self.height).abs() / self.height_allowance);
        }
        if self.slope_allowance != 0.0 && distance > 0.0 {
            let slope = 1.0 - vertex.normal.dot(vertex.position / distance);
            weight *= falloff((slope - self.slope).abs() / self.slope_allowance);
        }
        weight
    }
}

impl VertexModifier for AltitudeColor {
    fn modify(&self, vertex: &mut VertexData) {
        let weight = self.weight(vertex);
        vertex.color = vertex.color.lerp(self.color, weight);
    }
}

/// Replaces the first UV set with an equirectangular projection.
///
/// Vertices sitting on the `u` seam are pushed to the side of the seam their
/// patch lies on, so a patch never stretches its texture across the whole map.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CylindricalUv;

impl VertexModifier for CylindricalUv {
    fn modify(&self, vertex: &mut VertexData) {
        let mut uv = cartesian_to_polar_uv(vertex.position);
        if uv.x < 0.001 {
            if vertex.point_center.x < 0.0 {
                uv.x = 1.0;
            }
        } else if uv.x > 0.999 && vertex.point_center.x > 0.0 {
            uv.x = 0.0;
        }
        vertex.coord1 = uv;
    }
}

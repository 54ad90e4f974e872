//! Surface height, position and normal queries.

use engine_core::Transform;
use glam::Vec3;

use crate::config::TerrainConfig;
use crate::modifier::Displacement;

/// The displaced sphere shared by mesh generation and surface queries.
pub struct Surface {
    pub radius: f32,
    pub height: f32,
    pub default_displacement: f32,
    displacers: Vec<Box<dyn Displacement>>,
}

impl Surface {
    pub fn new(config: &TerrainConfig) -> Self {
        Self {
            radius: config.radius,
            height: config.height,
            default_displacement: config.default_displacement,
            displacers: Vec::new(),
        }
    }

    pub(crate) fn apply_config(&mut self, config: &TerrainConfig) {
        self.radius = config.radius;
        self.height = config.height;
        self.default_displacement = config.default_displacement;
    }

    pub fn add_displacer(&mut self, displacer: Box<dyn Displacement>) {
        self.displacers.push(displacer);
    }

    pub fn displacer_count(&self) -> usize {
        self.displacers.len()
    }

    /// Default displacement plus every displacer's contribution.
    pub fn displacement(&self, local_position: Vec3) -> f32 {
        let mut displacement = self.default_displacement;
        for displacer in &self.displacers {
            displacer.displace(local_position, &mut displacement);
        }
        displacement
    }

    /// Distance from the center to the surface in the direction of `local_position`.
    pub fn height_local(&self, local_position: Vec3) -> f32 {
        self.radius + self.height * self.displacement(local_position)
    }

    /// Surface point under `local_position`. The origin maps to the origin.
    pub fn position_local(&self, local_position: Vec3) -> Vec3 {
        local_position.normalize_or_zero() * self.height_local(local_position)
    }

    /// Surface normal from four samples offset by `local_right` and
    /// `local_forward`. Always points away from the center.
    pub fn normal_local(&self, local_position: Vec3, local_right: Vec3, local_forward: Vec3) -> Vec3 {
        let right = self.position_local(local_position + local_right);
        let left = self.position_local(local_position - local_right);
        let forward = self.position_local(local_position + local_forward);
        let back = self.position_local(local_position - local_forward);

        let normal = (right - left)
            .normalize_or_zero()
            .cross((forward - back).normalize_or_zero())
            .normalize_or_zero();

        if normal.dot(local_position) < 0.0 {
            -normal
        } else {
            normal
        }
    }

    /// Distance from the body's world position to the surface under `world_position`.
    pub fn height_world(&self, frame: &Transform, world_position: Vec3) -> f32 {
        let surface = self.position_local(frame.inverse_transform_point(world_position));
        frame.transform_point(surface).distance(frame.position)
    }

    /// World surface point under `world_position`, lifted by `offset` along the surface direction.
    pub fn position_world(&self, frame: &Transform, world_position: Vec3, offset: f32) -> Vec3 {
        let surface = self.position_local(frame.inverse_transform_point(world_position));
        frame.transform_point(surface) + frame.transform_direction(surface).normalize_or_zero() * offset
    }

    pub fn normal_world(&self, frame: &Transform, world_position: Vec3, world_right: Vec3, world_forward: Vec3) -> Vec3 {
        let local = frame.inverse_transform_point(world_position);
        let right = frame.inverse_transform_direction(world_right);
        let forward = frame.inverse_transform_direction(world_forward);
        frame.transform_direction(self.normal_local(local, right, forward))
    }
}

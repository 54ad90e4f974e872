//! Common ECS components used across the engine.

use glam::Vec3;
use hecs::World;

use crate::Transform;

/// Tag component for entities whose position drives terrain level of detail.
#[derive(Debug, Clone, Copy, Default)]
pub struct Observer;

/// Velocity component for moving entities.
#[derive(Debug, Clone, Copy, Default)]
pub struct Velocity {
    pub linear: Vec3,
}

impl Velocity {
    pub fn new(linear: Vec3) -> Self {
        Self { linear }
    }
}

/// Move every entity with a velocity by `dt` seconds.
pub fn integrate_velocities(world: &mut World, dt: f32) {
    for (_, (transform, velocity)) in world.query_mut::<(&mut Transform, &Velocity)>() {
        transform.translate(velocity.linear * dt);
    }
}

/// Collect the positions of all [`Observer`] entities, expressed in the local
/// space of `frame`. `out` is cleared first so callers can reuse the buffer.
pub fn gather_local_observers(world: &World, frame: &Transform, out: &mut Vec<Vec3>) {
    out.clear();
    for (_, (transform, _)) in world.query::<(&Transform, &Observer)>().iter() {
        out.push(frame.inverse_transform_point(transform.position));
    }
}

//! Strategy traits the terrain calls while building and scheduling patches.
//!
//! Modifiers are registered on a [`crate::Terrain`] and run in registration
//! order: displacements are summed, vertex modifiers are chained, and
//! populators are notified as patches become or stop being drawn leaves.

use std::any::Any;

use glam::{Vec2, Vec3, Vec4};

use crate::patch::{Patch, PatchId};
use crate::surface::Surface;

/// Adds a height contribution for an undeformed local position.
///
/// `displacement` starts at the terrain's default displacement and is
/// mapped to `radius + height * displacement` after every displacer ran.
pub trait Displacement {
    fn displace(&self, local_position: Vec3, displacement: &mut f32);
}

/// Per-vertex attributes handed to each [`VertexModifier`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexData {
    /// Surface position in local space.
    pub position: Vec3,
    /// Average of the patch's undeformed corner points.
    pub point_center: Vec3,
    pub coord1: Vec2,
    /// Position within the patch, `(0, 0)` at BL and `(1, 1)` at TR.
    pub coord2: Vec2,
    pub color: Vec4,
    pub normal: Vec3,
    /// Tangent with handedness in `w`.
    pub tangent: Vec4,
}

/// Rewrites vertex attributes after positions and normals are known.
pub trait VertexModifier {
    fn modify(&self, vertex: &mut VertexData);
}

/// Notified when a patch becomes a drawn leaf and when it stops being one.
pub trait PatchPopulator {
    fn populate(&mut self, id: PatchId, patch: &Patch, surface: &Surface);

    fn depopulate(&mut self, id: PatchId);

    fn as_any(&self) -> &dyn Any;
}

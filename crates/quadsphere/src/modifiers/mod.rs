//! Ready-made displacers, vertex modifiers and populators.

mod displacer;
mod paint;
mod scatter;

pub use displacer::{cartesian_to_polar_uv, HeightmapDisplacer, NoiseDisplacer};
pub use paint::{AltitudeColor, CylindricalUv};
pub use scatter::{CountCurve, Prop, ScatterSpawner};

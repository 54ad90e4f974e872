//! Quadtree level-of-detail terrain for spherical bodies.
//!
//! A body is a cube of six root patches projected onto a displaced sphere.
//! Patches split into four children as observers approach and merge back as
//! they leave, with a hysteresis band so a patch never flickers between the
//! two. Re-evaluation runs a slice at a time under a per-frame time budget.

pub mod config;
pub mod error;
pub mod face;
pub mod lod;
pub mod mesh;
pub mod modifier;
pub mod modifiers;
pub mod patch;
pub mod scheduler;
pub mod surface;
pub mod terrain;

pub use config::TerrainConfig;
pub use error::{Result, TerrainError};
pub use face::CubeFace;
pub use lod::{LodChange, LodDecision};
pub use mesh::{PatchMesh, TerrainVertex, MAX_RESOLUTION};
pub use modifier::{Displacement, PatchPopulator, VertexData, VertexModifier};
pub use patch::{Patch, PatchId, Quad};
pub use scheduler::{PassReport, SchedulerPhase};
pub use surface::Surface;
pub use terrain::{Terrain, TerrainStats};

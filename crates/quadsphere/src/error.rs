//! Error types for terrain construction and mesh generation.

use thiserror::Error;

use crate::patch::PatchId;

#[derive(Debug, Error, PartialEq)]
pub enum TerrainError {
    /// Patch meshes need between 1 and `MAX_RESOLUTION` quads per edge.
    #[error("cannot generate a patch mesh with a resolution of {0}")]
    InvalidResolution(u32),
    /// The id was released back to the pool or never allocated.
    #[error("patch {0:?} does not exist")]
    PatchNotFound(PatchId),
    #[error("invalid terrain config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, TerrainError>;

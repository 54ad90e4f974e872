//! Core engine types shared by the terrain crates.
//!
//! This crate provides the foundational types used across the workspace:
//! - Transform and local/world space conversion
//! - Frame time management
//! - Observer components for ECS-driven LOD

pub mod components;
pub mod time;
pub mod transform;

pub use components::*;
pub use time::*;
pub use transform::*;

// Re-export commonly used types
pub use glam::{Quat, Vec2, Vec3, Vec4};
pub use hecs::{Entity, World};

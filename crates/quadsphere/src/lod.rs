//! Split/merge decision rule.

use glam::Vec3;

/// Patches split below `threshold * SPLIT_FACTOR`...
pub const SPLIT_FACTOR: f32 = 0.9;
/// ...and merge above `threshold * MERGE_FACTOR`. Anything between holds.
pub const MERGE_FACTOR: f32 = 1.1;

/// What a patch at a given depth and distance should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LodDecision {
    /// Deeper than the configured thresholds; must become a leaf.
    ForceMerge,
    Merge,
    Split,
    Hold,
}

/// What [`crate::Terrain::evaluate`] actually changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LodChange {
    Unchanged,
    Split,
    Merged,
}

/// Distance from `center` to the nearest observer, infinity when there are none.
pub fn nearest_distance(center: Vec3, observers: &[Vec3]) -> f32 {
    observers
        .iter()
        .map(|observer| center.distance(*observer))
        .fold(f32::INFINITY, f32::min)
}

pub fn decide(depth: u32, best_distance: f32, split_distances: &[f32]) -> LodDecision {
    let Some(&threshold) = split_distances.get(depth as usize) else {
        return LodDecision::ForceMerge;
    };

    if best_distance > threshold * MERGE_FACTOR {
        LodDecision::Merge
    } else if best_distance < threshold * SPLIT_FACTOR {
        LodDecision::Split
    } else {
        LodDecision::Hold
    }
}

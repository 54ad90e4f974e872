//! Scatters props over leaf patches at a chosen depth.

use std::any::Any;
use std::collections::HashMap;

use glam::{Quat, Vec3};
use rand::prelude::*;

use crate::modifier::PatchPopulator;
use crate::patch::{Patch, PatchId};
use crate::surface::Surface;

/// A spawned prop in the terrain's local space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prop {
    /// Index into the spawner's prop kinds.
    pub kind: usize,
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: f32,
}

/// Piecewise-linear curve through `(x, y)` keys sorted by `x`, clamped at both ends.
#[derive(Debug, Clone, PartialEq)]
pub struct CountCurve {
    keys: Vec<(f32, f32)>,
}

impl CountCurve {
    pub fn new(mut keys: Vec<(f32, f32)>) -> Self {
        keys.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { keys }
    }

    pub fn evaluate(&self, x: f32) -> f32 {
        let (Some(first), Some(last)) = (self.keys.first(), self.keys.last()) else {
            return 0.0;
        };
        if x <= first.0 {
            return first.1;
        }
        if x >= last.0 {
            return last.1;
        }
        for pair in self.keys.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if x <= b.0 {
                let span = b.0 - a.0;
                if span <= 0.0 {
                    return b.1;
                }
                return a.1 + (b.1 - a.1) * (x - a.0) / span;
            }
        }
        last.1
    }
}

impl Default for CountCurve {
    /// Zero to three props, uniformly.
    fn default() -> Self {
        Self::new(vec![(0.0, 0.0), (1.0, 3.0)])
    }
}

pub struct ScatterSpawner {
    /// Only leaves at exactly this depth get props.
    pub depth: u32,
    /// Number of prop kinds to pick from. 0 spawns nothing.
    pub kinds: usize,
    /// Maps a uniform sample to a prop count (floored).
    pub count: CountCurve,
    pub scale_min: f32,
    pub scale_max: f32,
    /// Sample offset used to align props to the surface normal. 0 aligns to the
    /// radial direction instead.
    pub align_to_normal: f32,
    rng: StdRng,
    spawned: HashMap<PatchId, Vec<Prop>>,
}

impl ScatterSpawner {
    pub fn new(depth: u32, kinds: usize, seed: u64) -> Self {
        Self {
            depth,
            kinds,
            count: CountCurve::default(),
            scale_min: 1.0,
            scale_max: 1.1,
            align_to_normal: 0.0,
            rng: StdRng::seed_from_u64(seed),
            spawned: HashMap::new(),
        }
    }

    /// Props currently alive on `id`.
    pub fn props(&self, id: PatchId) -> &[Prop] {
        self.spawned.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn all_props(&self) -> impl Iterator<Item = &Prop> {
        self.spawned.values().flatten()
    }

    pub fn prop_count(&self) -> usize {
        self.spawned.values().map(Vec::len).sum()
    }

    fn spawn(&mut self, patch: &Patch, surface: &Surface) -> Prop {
        let kind = self.rng.gen_range(0..self.kinds);
        let point = patch.points.sample(self.rng.gen(), self.rng.gen());
        let position = surface.position_local(point);
        let yaw = Quat::from_rotation_y(self.rng.gen_range(0.0..std::f32::consts::TAU));
        let (low, high) = (self.scale_min.min(self.scale_max), self.scale_min.max(self.scale_max));
        let scale = if low.is_finite() && high.is_finite() {
            self.rng.gen_range(low..=high)
        } else {
            1.0
        };

        let mut up = position.normalize_or_zero();
        if self.align_to_normal != 0.0 && up != Vec3::ZERO {
            let frame = Quat::from_rotation_arc(Vec3::Y, up) * yaw;
            let right = frame * Vec3::X * self.align_to_normal;
            let forward = frame * Vec3::Z * self.align_to_normal;
            up = surface.normal_local(position, right, forward);
        }
        let rotation = if up == Vec3::ZERO {
            yaw
        } else {
            Quat::from_rotation_arc(Vec3::Y, up) * yaw
        };

        Prop {
            kind,
            position,
            rotation,
            scale,
        }
    }
}

impl PatchPopulator for ScatterSpawner {
    fn populate(&mut self, id: PatchId, patch: &Patch, surface: &Surface) {
        if patch.depth != self.depth || self.kinds == 0 {
            return;
        }
        let count = self.count.evaluate(self.rng.gen()).floor().max(0.0) as usize;
        if count == 0 {
            return;
        }
        let props = (0..count).map(|_| self.spawn(patch, surface)).collect();
        self.spawned.insert(id, props);
    }

    fn depopulate(&mut self, id: PatchId) {
        self.spawned.remove(&id);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

//! Budgeted split/merge scheduling.
//!
//! Re-evaluating every patch every frame scales with tree size, so patches
//! are instead collected into a list once their cooldown expires and the
//! list is drained a slice per frame within a wall-clock budget. Collection
//! stamps every visited patch with the pass sequence; only patches carrying
//! the current sequence are evaluated, so patches created while a pass is
//! draining wait for the next collection.

use rand::prelude::*;

use crate::patch::{PatchArena, PatchId};

/// Where the scheduler is between frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerPhase {
    /// Waiting for enough time to pass before the next collection.
    Idle,
    /// A collected list is being evaluated.
    Evaluating,
}

/// What one [`crate::Terrain::late_update`] call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Patches queued by a collection this frame.
    pub collected: usize,
    pub evaluated: usize,
    /// Queued patches skipped because they were released or restamped.
    pub stale: usize,
    pub splits: usize,
    pub merges: usize,
}

#[derive(Debug)]
pub struct Scheduler {
    queue: Vec<PatchId>,
    cursor: usize,
    sequence: u32,
    /// Seconds since the last collection.
    age: f32,
    rng: StdRng,
}

impl Scheduler {
    pub fn new(seed: u64) -> Self {
        Self {
            queue: Vec::new(),
            cursor: 0,
            sequence: 0,
            age: 0.0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn phase(&self) -> SchedulerPhase {
        if self.cursor < self.queue.len() {
            SchedulerPhase::Evaluating
        } else {
            SchedulerPhase::Idle
        }
    }

    /// Sequence of the current (or last) collection. Never 0 once a pass ran.
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Queued patches not yet consumed.
    pub fn pending(&self) -> usize {
        self.queue.len() - self.cursor
    }

    pub(crate) fn advance(&mut self, dt: f32) {
        self.age += dt;
    }

    /// A new collection may start once half the minimum delay has passed.
    pub(crate) fn ready_to_collect(&self, delay_min: f32) -> bool {
        self.age > delay_min * 0.5
    }

    pub(crate) fn reset_queue(&mut self) {
        self.queue.clear();
        self.cursor = 0;
    }

    /// Walk every tree under `roots`, stamping and cooling down each patch and
    /// queueing those whose cooldown expired. Returns the number queued.
    pub(crate) fn collect(&mut self, patches: &mut PatchArena, roots: &[PatchId]) -> usize {
        let elapsed = self.age;
        self.age = 0.0;
        self.reset_queue();
        self.sequence = self.sequence % i32::MAX as u32 + 1;

        for &root in roots {
            collect_patch(patches, root, self.sequence, elapsed, &mut self.queue);
        }
        self.queue.len()
    }

    pub(crate) fn pop(&mut self) -> Option<PatchId> {
        let id = self.queue.get(self.cursor).copied()?;
        self.cursor += 1;
        Some(id)
    }

    /// Random cooldown within `[min, max]`.
    pub(crate) fn roll_cooldown(&mut self, (min, max): (f32, f32)) -> f32 {
        self.rng.gen_range(min..=max)
    }
}

fn collect_patch(patches: &mut PatchArena, id: PatchId, sequence: u32, elapsed: f32, queue: &mut Vec<PatchId>) {
    let Some(patch) = patches.get_mut(id) else {
        return;
    };
    patch.sequence = sequence;
    patch.cooldown -= elapsed;
    if patch.cooldown <= 0.0 {
        queue.push(id);
    }

    if let Some(children) = patch.children {
        for child in children {
            collect_patch(patches, child, sequence, elapsed, queue);
        }
    }
}

//! Quadtree patches and the generational arena that owns them.
//!
//! Patches never reference each other directly: parents and children are
//! [`PatchId`]s into a [`PatchArena`]. Releasing a patch bumps its slot's
//! generation, so any id still held for it (for example in a scheduling list)
//! stops resolving instead of aliasing whatever patch reuses the slot.

use std::ops::{Add, Mul, Sub};

use glam::{Vec2, Vec3};

use crate::face::CubeFace;
use crate::mesh::{PatchMesh, PatchShape};

/// Handle to a patch in a [`PatchArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PatchId {
    index: u32,
    generation: u32,
}

impl PatchId {
    pub fn index(self) -> usize {
        self.index as usize
    }
}

/// Four values laid out on the corners of a quadrilateral.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Quad<T> {
    pub bl: T,
    pub br: T,
    pub tl: T,
    pub tr: T,
}

impl<T> Quad<T>
where
    T: Copy + Add<Output = T> + Sub<Output = T> + Mul<f32, Output = T>,
{
    /// Bilinear interpolation: `u` runs left to right, `v` bottom to top.
    /// Values outside `[0, 1]` extrapolate along the edges.
    pub fn sample(&self, u: f32, v: f32) -> T {
        let bottom = self.bl + (self.br - self.bl) * u;
        let top = self.tl + (self.tr - self.tl) * u;
        bottom + (top - bottom) * v
    }

    pub fn average(&self) -> T {
        (self.bl + self.br + self.tl + self.tr) * 0.25
    }

    /// Split into four quadrants ordered `[BL, BR, TL, TR]`.
    pub fn quarters(&self) -> [Quad<T>; 4] {
        let cc = (self.bl + self.tr) * 0.5;
        let bc = (self.bl + self.br) * 0.5;
        let tc = (self.tl + self.tr) * 0.5;
        let cl = (self.tl + self.bl) * 0.5;
        let cr = (self.tr + self.br) * 0.5;

        [
            Quad { bl: self.bl, br: bc, tl: cl, tr: cc },
            Quad { bl: bc, br: self.br, tl: cc, tr: cr },
            Quad { bl: cl, br: cc, tl: self.tl, tr: tc },
            Quad { bl: cc, br: cr, tl: tc, tr: self.tr },
        ]
    }
}

/// A quadrant of a cube-sphere face.
#[derive(Debug)]
pub struct Patch {
    /// Face this patch's tree is rooted on.
    pub face: CubeFace,
    pub parent: Option<PatchId>,
    /// Subdivision level; roots are 0.
    pub depth: u32,
    /// Undeformed plane positions of the corners in local space.
    pub points: Quad<Vec3>,
    pub coords: Quad<Vec2>,
    /// `[BL, BR, TL, TR]` when split.
    pub children: Option<[PatchId; 4]>,
    /// Center of the mesh bounds in local space.
    pub mesh_center: Vec3,
    /// Seconds until this patch can be re-evaluated.
    pub cooldown: f32,
    /// Collection pass that last visited this patch (0 = none).
    pub sequence: u32,
    /// Mesh should be drawn. False exactly when the patch is split.
    pub visible: bool,
    /// Mesh should back a collider.
    pub collider: bool,
    /// Populators have been told about this patch.
    pub populated: bool,
    pub mesh: PatchMesh,
}

impl Patch {
    /// A visible leaf covering `shape`. Mesh, center and scheduling state are
    /// filled in by the terrain.
    pub fn new(face: CubeFace, parent: Option<PatchId>, shape: PatchShape, mesh: PatchMesh) -> Self {
        Self {
            face,
            parent,
            depth: shape.depth,
            points: shape.points,
            coords: shape.coords,
            children: None,
            mesh_center: Vec3::ZERO,
            cooldown: 0.0,
            sequence: 0,
            visible: true,
            collider: false,
            populated: false,
            mesh,
        }
    }

    /// Root leaf covering the whole of `face`.
    pub fn root(face: CubeFace) -> Self {
        let shape = PatchShape {
            depth: 0,
            points: face.points(),
            coords: face.coords(),
        };
        Self::new(face, None, shape, PatchMesh::default())
    }

    pub fn is_split(&self) -> bool {
        self.children.is_some()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    patch: Option<Patch>,
}

/// Free-list arena of patches.
#[derive(Debug, Default)]
pub struct PatchArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl PatchArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a patch, reusing a released slot when one is available.
    pub fn insert(&mut self, patch: Patch) -> PatchId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.patch = Some(patch);
            return PatchId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            patch: Some(patch),
        });
        PatchId { index, generation: 0 }
    }

    /// Take a patch out of the arena and invalidate its id.
    pub fn remove(&mut self, id: PatchId) -> Option<Patch> {
        let slot = self.slots.get_mut(id.index())?;
        if slot.generation != id.generation {
            return None;
        }
        let patch = slot.patch.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;
        Some(patch)
    }

    pub fn get(&self, id: PatchId) -> Option<&Patch> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.patch.as_ref())
    }

    pub fn get_mut(&mut self, id: PatchId) -> Option<&mut Patch> {
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.patch.as_mut())
    }

    pub fn contains(&self, id: PatchId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live patches.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of released slots waiting for reuse.
    pub fn pooled(&self) -> usize {
        self.free.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PatchId, &Patch)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.patch.as_ref().map(|patch| {
                (
                    PatchId {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    patch,
                )
            })
        })
    }
}

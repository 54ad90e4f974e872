//! Terrain body: six quadtrees of patches over a displaced cube-sphere.

use engine_core::FrameBudget;
use glam::{Vec3, Vec4};

use crate::config::TerrainConfig;
use crate::error::{Result, TerrainError};
use crate::face::CubeFace;
use crate::lod::{decide, nearest_distance, LodChange, LodDecision};
use crate::mesh::{MeshBuilder, MeshPool, MeshSettings, PatchMesh, PatchShape};
use crate::modifier::{Displacement, PatchPopulator, VertexModifier};
use crate::patch::{Patch, PatchArena, PatchId};
use crate::scheduler::{PassReport, Scheduler, SchedulerPhase};
use crate::surface::Surface;

/// Snapshot of the tree for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TerrainStats {
    pub patches: usize,
    pub leaves: usize,
    pub max_depth: u32,
    pub colliders: usize,
    /// Vertices across all drawn leaves.
    pub vertices: usize,
}

/// A level-of-detail terrain body.
///
/// Call [`Terrain::update`] then [`Terrain::late_update`] once per frame with
/// observer positions in the terrain's local space.
pub struct Terrain {
    config: TerrainConfig,
    surface: Surface,
    vertex_modifiers: Vec<Box<dyn VertexModifier>>,
    populators: Vec<Box<dyn PatchPopulator>>,
    patches: PatchArena,
    meshes: MeshPool,
    builder: MeshBuilder,
    roots: [Option<PatchId>; 6],
    scheduler: Scheduler,
    meshes_dirty: bool,
}

impl Terrain {
    /// Create a terrain. Root patches are built on the first update or
    /// [`Terrain::validate_roots`] call, after modifiers are registered.
    pub fn new(config: TerrainConfig) -> Result<Self> {
        config.validate()?;
        for warning in config.warnings() {
            log::warn!("Terrain config: {}", warning);
        }

        Ok(Self {
            surface: Surface::new(&config),
            scheduler: Scheduler::new(config.seed),
            config,
            vertex_modifiers: Vec::new(),
            populators: Vec::new(),
            patches: PatchArena::new(),
            meshes: MeshPool::default(),
            builder: MeshBuilder::new(),
            roots: [None; 6],
            meshes_dirty: false,
        })
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    /// Replace the config. Meshes are regenerated on the next update.
    pub fn set_config(&mut self, config: TerrainConfig) -> Result<()> {
        config.validate()?;
        for warning in config.warnings() {
            log::warn!("Terrain config: {}", warning);
        }
        self.surface.apply_config(&config);
        self.config = config;
        self.meshes_dirty = true;
        Ok(())
    }

    /// Change the split distances. Takes effect as patches are re-evaluated.
    pub fn set_split_distances(&mut self, split_distances: Vec<f32>) {
        self.config.split_distances = split_distances;
        if !self.config.distances_in_order() {
            log::warn!("Terrain config: split distances should start large and get smaller");
        }
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn add_displacer(&mut self, displacer: Box<dyn Displacement>) {
        self.surface.add_displacer(displacer);
        self.meshes_dirty = true;
    }

    pub fn add_vertex_modifier(&mut self, modifier: Box<dyn VertexModifier>) {
        self.vertex_modifiers.push(modifier);
        self.meshes_dirty = true;
    }

    pub fn add_populator(&mut self, populator: Box<dyn PatchPopulator>) {
        self.populators.push(populator);
        self.meshes_dirty = true;
    }

    /// First registered populator of type `T`.
    pub fn populator<T: 'static>(&self) -> Option<&T> {
        self.populators.iter().find_map(|p| p.as_any().downcast_ref::<T>())
    }

    pub fn patches(&self) -> &PatchArena {
        &self.patches
    }

    pub fn patch(&self, id: PatchId) -> Option<&Patch> {
        self.patches.get(id)
    }

    pub fn root(&self, face: CubeFace) -> Option<PatchId> {
        self.roots[face.index()]
    }

    fn root_ids(&self) -> Vec<PatchId> {
        self.roots.iter().flatten().copied().collect()
    }

    pub fn scheduler_phase(&self) -> SchedulerPhase {
        self.scheduler.phase()
    }

    /// Meshes released by merges and waiting for reuse.
    pub fn pooled_meshes(&self) -> usize {
        self.meshes.len()
    }

    /// Patches whose meshes should be drawn.
    pub fn visible_patches(&self) -> impl Iterator<Item = (PatchId, &Patch)> {
        self.patches.iter().filter(|(_, p)| p.visible)
    }

    /// Patches whose meshes should back colliders.
    pub fn collider_patches(&self) -> impl Iterator<Item = (PatchId, &Patch)> {
        self.patches.iter().filter(|(_, p)| p.collider)
    }

    pub fn stats(&self) -> TerrainStats {
        let mut stats = TerrainStats::default();
        for (_, patch) in self.patches.iter() {
            stats.patches += 1;
            stats.max_depth = stats.max_depth.max(patch.depth);
            if patch.collider {
                stats.colliders += 1;
            }
            if patch.is_leaf() {
                stats.leaves += 1;
                stats.vertices += patch.mesh.vertex_count();
            }
        }
        stats
    }

    /// Request regeneration of every mesh on the next [`Terrain::update`].
    pub fn mark_meshes_dirty(&mut self) {
        self.meshes_dirty = true;
    }

    /// Per-frame phase one: apply pending mesh regeneration and make sure all
    /// six roots exist.
    pub fn update(&mut self) -> Result<()> {
        if self.meshes_dirty {
            self.update_meshes()?;
        }
        self.validate_roots()
    }

    /// Per-frame phase two: run the budgeted split/merge pass. `dt` is the
    /// frame time in seconds.
    pub fn late_update(&mut self, dt: f32, observers: &[Vec3]) -> Result<PassReport> {
        let mut report = PassReport::default();
        self.scheduler.advance(dt);

        if self.scheduler.phase() == SchedulerPhase::Evaluating {
            let budget = FrameBudget::start(self.config.budget);
            let delays = self.config.delay_range();

            // At least one patch per frame so a tiny budget still drains the list.
            while report.evaluated + report.stale == 0 || !budget.exhausted() {
                let Some(id) = self.scheduler.pop() else {
                    break;
                };
                let sequence = self.scheduler.sequence();
                if !self.patches.get(id).is_some_and(|p| p.sequence == sequence) {
                    report.stale += 1;
                    continue;
                }

                match self.evaluate(id, observers)? {
                    LodChange::Split => report.splits += 1,
                    LodChange::Merged => report.merges += 1,
                    LodChange::Unchanged => {}
                }
                let cooldown = self.scheduler.roll_cooldown(delays);
                if let Some(patch) = self.patches.get_mut(id) {
                    patch.cooldown = cooldown;
                }
                report.evaluated += 1;
            }

            if self.scheduler.phase() == SchedulerPhase::Idle {
                log::debug!(
                    "Terrain pass {} drained: {} patches, {} leaves",
                    self.scheduler.sequence(),
                    self.patches.len(),
                    self.patches.iter().filter(|(_, p)| p.is_leaf()).count()
                );
            }
        } else {
            self.scheduler.reset_queue();
            if self.scheduler.ready_to_collect(self.config.delay_min) {
                self.validate_roots()?;
                let roots = self.root_ids();
                report.collected = self.scheduler.collect(&mut self.patches, &roots);
            }
        }

        Ok(report)
    }

    /// Build any missing root patch.
    pub fn validate_roots(&mut self) -> Result<()> {
        for face in CubeFace::ALL {
            if self.roots[face.index()].is_none() {
                let id = self.create_patch(Patch::root(face))?;
                log::debug!("Created root patch {}", face.name());
                self.roots[face.index()] = Some(id);
            }
        }
        Ok(())
    }

    /// Regenerate every mesh in every tree now.
    pub fn update_meshes(&mut self) -> Result<()> {
        self.meshes_dirty = false;
        for root in self.root_ids() {
            self.regenerate_tree(root)?;
        }
        self.validate_roots()
    }

    fn regenerate_tree(&mut self, id: PatchId) -> Result<()> {
        self.generate_mesh(id)?;
        if let Some(children) = self.children(id) {
            for child in children {
                self.regenerate_tree(child)?;
            }
        }
        Ok(())
    }

    /// Refresh the collider flag of every patch.
    pub fn update_colliders(&mut self) -> Result<()> {
        self.validate_roots()?;
        let ids: Vec<PatchId> = self.patches.iter().map(|(id, _)| id).collect();
        for id in ids {
            self.update_collider(id);
        }
        Ok(())
    }

    /// Evaluate every patch depth first against `observers`.
    pub fn update_splits(&mut self, observers: &[Vec3]) -> Result<()> {
        self.validate_roots()?;
        for root in self.root_ids() {
            self.evaluate_tree(root, observers)?;
        }
        Ok(())
    }

    /// Evaluate `id`, then its children (including any it just split into).
    pub fn evaluate_tree(&mut self, id: PatchId, observers: &[Vec3]) -> Result<()> {
        self.evaluate(id, observers)?;
        if let Some(children) = self.children(id) {
            for child in children {
                self.evaluate_tree(child, observers)?;
            }
        }
        Ok(())
    }

    /// Split or merge a single patch based on its nearest observer.
    pub fn evaluate(&mut self, id: PatchId, observers: &[Vec3]) -> Result<LodChange> {
        let patch = self.patches.get(id).ok_or(TerrainError::PatchNotFound(id))?;
        let distance = nearest_distance(patch.mesh_center, observers);
        let split = patch.is_split();

        match decide(patch.depth, distance, &self.config.split_distances) {
            LodDecision::ForceMerge | LodDecision::Merge if split => {
                self.merge(id)?;
                Ok(LodChange::Merged)
            }
            LodDecision::Split if !split => {
                self.split(id)?;
                Ok(LodChange::Split)
            }
            _ => Ok(LodChange::Unchanged),
        }
    }

    /// Subdivide a leaf into four children. Does nothing if already split.
    pub fn split(&mut self, id: PatchId) -> Result<()> {
        let patch = self.patches.get(id).ok_or(TerrainError::PatchNotFound(id))?;
        if patch.is_split() {
            return Ok(());
        }
        let face = patch.face;
        let depth = patch.depth + 1;
        let points = patch.points.quarters();
        let coords = patch.coords.quarters();

        let mut children = Vec::with_capacity(4);
        for (points, coords) in points.into_iter().zip(coords) {
            let shape = PatchShape { depth, points, coords };
            match self.create_patch(Patch::new(face, Some(id), shape, PatchMesh::default())) {
                Ok(child) => children.push(child),
                Err(e) => {
                    for child in children {
                        self.release(child);
                    }
                    return Err(e);
                }
            }
        }

        if let Some(patch) = self.patches.get_mut(id) {
            patch.children = Some([children[0], children[1], children[2], children[3]]);
            patch.visible = false;
        }
        self.depopulate(id);
        self.update_collider(id);
        log::debug!("Split patch {:?} into depth {}", id, depth);
        Ok(())
    }

    /// Release all descendants and show this patch again. Does nothing on a leaf.
    pub fn merge(&mut self, id: PatchId) -> Result<()> {
        let patch = self.patches.get_mut(id).ok_or(TerrainError::PatchNotFound(id))?;
        let Some(children) = patch.children.take() else {
            return Ok(());
        };
        patch.visible = true;

        for child in children {
            self.release(child);
        }
        self.update_collider(id);
        self.populate(id);
        log::debug!("Merged patch {:?}", id);
        Ok(())
    }

    /// Regenerate one patch's mesh from its corners and the current modifiers.
    pub fn generate_mesh(&mut self, id: PatchId) -> Result<()> {
        let settings = MeshSettings {
            resolution: self.config.resolution,
            skirt_thickness: self.config.skirt_thickness,
            default_color: Vec4::from_array(self.config.default_color),
        };
        let patch = self.patches.get_mut(id).ok_or(TerrainError::PatchNotFound(id))?;
        let shape = PatchShape {
            depth: patch.depth,
            points: patch.points,
            coords: patch.coords,
        };

        let mut mesh = std::mem::take(&mut patch.mesh);
        let built = self
            .builder
            .build(&settings, &shape, &self.surface, &self.vertex_modifiers, &mut mesh);
        patch.mesh = mesh;
        patch.mesh_center = built?;

        self.depopulate(id);
        self.populate(id);
        Ok(())
    }

    fn children(&self, id: PatchId) -> Option<[PatchId; 4]> {
        self.patches.get(id).and_then(|p| p.children)
    }

    /// Insert a new leaf with a pooled mesh and build it.
    fn create_patch(&mut self, mut patch: Patch) -> Result<PatchId> {
        patch.mesh = self.meshes.acquire();
        let id = self.patches.insert(patch);

        if let Err(e) = self.generate_mesh(id) {
            self.release(id);
            return Err(e);
        }
        self.update_collider(id);
        Ok(id)
    }

    /// Release a patch and its subtree back to the pools.
    fn release(&mut self, id: PatchId) {
        if let Some(children) = self.patches.get_mut(id).and_then(|p| p.children.take()) {
            for child in children {
                self.release(child);
            }
        }
        self.depopulate(id);
        if let Some(patch) = self.patches.remove(id) {
            self.meshes.release(patch.mesh);
        }
    }

    fn update_collider(&mut self, id: PatchId) {
        let max_depth = self.config.max_collider_depth;
        if let Some(patch) = self.patches.get_mut(id) {
            patch.collider = patch.depth < max_depth && (patch.is_leaf() || patch.depth + 1 == max_depth);
        }
    }

    /// Tell populators about a drawn leaf, once.
    fn populate(&mut self, id: PatchId) {
        let Some(patch) = self.patches.get_mut(id) else {
            return;
        };
        if patch.populated || !patch.is_leaf() {
            return;
        }
        patch.populated = true;

        let patch = &*patch;
        for populator in &mut self.populators {
            populator.populate(id, patch, &self.surface);
        }
    }

    fn depopulate(&mut self, id: PatchId) {
        let Some(patch) = self.patches.get_mut(id) else {
            return;
        };
        if !patch.populated {
            return;
        }
        patch.populated = false;

        for populator in &mut self.populators {
            populator.depopulate(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modifier::VertexData;
    use std::any::Any;

    fn terrain() -> Terrain {
        let mut terrain = Terrain::new(TerrainConfig::default()).unwrap();
        terrain.validate_roots().unwrap();
        terrain
    }

    fn root(terrain: &Terrain) -> PatchId {
        terrain.root(CubeFace::PositiveZ).unwrap()
    }

    fn center(terrain: &Terrain, id: PatchId) -> Vec3 {
        terrain.patch(id).unwrap().mesh_center
    }

    /// Split along the BL corner down to `depth` and return that leaf.
    fn leaf_at_depth(terrain: &mut Terrain, depth: u32) -> PatchId {
        let mut id = root(terrain);
        for _ in 0..depth {
            terrain.split(id).unwrap();
            id = terrain.patch(id).unwrap().children.unwrap()[0];
        }
        id
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<(bool, PatchId)>,
    }

    impl PatchPopulator for Recorder {
        fn populate(&mut self, id: PatchId, patch: &Patch, _surface: &Surface) {
            assert!(patch.is_leaf());
            self.events.push((true, id));
        }

        fn depopulate(&mut self, id: PatchId) {
            self.events.push((false, id));
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct Raise(f32);

    impl Displacement for Raise {
        fn displace(&self, _local_position: Vec3, displacement: &mut f32) {
            *displacement += self.0;
        }
    }

    #[test]
    fn roots_cover_all_six_faces() {
        let terrain = terrain();
        let stats = terrain.stats();
        assert_eq!(stats.patches, 6);
        assert_eq!(stats.leaves, 6);
        for face in CubeFace::ALL {
            let patch = terrain.patch(terrain.root(face).unwrap()).unwrap();
            assert_eq!(patch.depth, 0);
            assert!(patch.visible);
            assert!(patch.mesh_center.dot(face.axes().0) > 0.5);
            assert_eq!(patch.mesh.vertex_count(), 36 + 20);
        }
    }

    #[test]
    fn split_then_merge_restores_the_leaf() {
        let mut terrain = terrain();
        let id = root(&terrain);
        let before = center(&terrain, id);

        assert_eq!(terrain.evaluate(id, &[before]).unwrap(), LodChange::Split);
        let patch = terrain.patch(id).unwrap();
        assert!(patch.is_split());
        assert!(!patch.visible);
        let children = patch.children.unwrap();
        for child in children {
            let child = terrain.patch(child).unwrap();
            assert_eq!(child.depth, 1);
            assert_eq!(child.face, CubeFace::PositiveZ);
            assert_eq!(child.parent, Some(id));
            assert!(child.visible);
            assert_eq!(child.mesh.vertex_count(), 56);
        }
        assert_eq!(terrain.patches().len(), 10);

        assert_eq!(terrain.evaluate(id, &[]).unwrap(), LodChange::Merged);
        let patch = terrain.patch(id).unwrap();
        assert!(patch.is_leaf());
        assert!(patch.visible);
        assert!((patch.mesh_center - before).length() < 1e-5);
        assert_eq!(patch.mesh.vertex_count(), 56);
        assert_eq!(terrain.patches().len(), 6);
        assert_eq!(terrain.patches().pooled(), 4);
        assert_eq!(terrain.pooled_meshes(), 4);
        assert!(children.iter().all(|c| terrain.patch(*c).is_none()));
    }

    #[test]
    fn merge_releases_whole_subtrees() {
        let mut terrain = terrain();
        leaf_at_depth(&mut terrain, 3);
        assert_eq!(terrain.patches().len(), 6 + 12);

        terrain.merge(root(&terrain)).unwrap();
        assert_eq!(terrain.patches().len(), 6);
        assert_eq!(terrain.pooled_meshes(), 12);

        // Pooled slots and meshes are handed out again.
        leaf_at_depth(&mut terrain, 1);
        assert_eq!(terrain.pooled_meshes(), 8);
        assert_eq!(terrain.patches().pooled(), 8);
    }

    #[test]
    fn depth_two_leaf_splits_then_merges_at_example_distances() {
        let mut terrain = terrain();
        let id = leaf_at_depth(&mut terrain, 2);
        let c = center(&terrain, id);
        let outward = c.normalize();

        assert_eq!(terrain.evaluate(id, &[c + outward * 1.5]).unwrap(), LodChange::Split);
        let children = terrain.patch(id).unwrap().children.unwrap();
        assert!(children.iter().all(|child| terrain.patch(*child).unwrap().depth == 3));

        assert_eq!(terrain.evaluate(id, &[c + outward * 3.0]).unwrap(), LodChange::Merged);
        assert!(terrain.patch(id).unwrap().is_leaf());
    }

    #[test]
    fn hysteresis_band_never_toggles() {
        let mut terrain = terrain();
        let id = leaf_at_depth(&mut terrain, 2);
        let c = center(&terrain, id);
        let observer = [c + c.normalize() * 2.5];

        for _ in 0..5 {
            assert_eq!(terrain.evaluate(id, &observer).unwrap(), LodChange::Unchanged);
        }
        assert!(terrain.patch(id).unwrap().is_leaf());

        terrain.split(id).unwrap();
        for _ in 0..5 {
            assert_eq!(terrain.evaluate(id, &observer).unwrap(), LodChange::Unchanged);
        }
        assert!(terrain.patch(id).unwrap().is_split());
    }

    #[test]
    fn patches_past_the_thresholds_are_forced_to_leaves() {
        let mut terrain = terrain();
        let deep = leaf_at_depth(&mut terrain, 5);
        let c = center(&terrain, deep);
        assert_eq!(terrain.evaluate(deep, &[c]).unwrap(), LodChange::Unchanged);
        assert!(terrain.patch(deep).unwrap().is_leaf());

        // Shrinking the table at runtime merges now-too-deep split patches.
        let parent = terrain.patch(deep).unwrap().parent.unwrap();
        terrain.set_split_distances(vec![10.0, 5.0]);
        assert_eq!(terrain.evaluate(parent, &[c]).unwrap(), LodChange::Merged);
    }

    #[test]
    fn update_splits_refines_toward_the_observer() {
        let mut terrain = terrain();
        let c = center(&terrain, root(&terrain));
        terrain.update_splits(&[c]).unwrap();

        let stats = terrain.stats();
        assert_eq!(stats.max_depth, 5);
        assert!(stats.leaves > 6);
        for (_, patch) in terrain.patches().iter() {
            assert_eq!(patch.visible, patch.is_leaf());
            if let Some(children) = patch.children {
                assert!(children.iter().all(|child| terrain.patch(*child).is_some()));
            }
        }

        terrain.update_splits(&[]).unwrap();
        assert_eq!(terrain.stats().patches, 6);
    }

    #[test]
    fn populators_follow_leaf_transitions() {
        let mut terrain = Terrain::new(TerrainConfig::default()).unwrap();
        terrain.add_populator(Box::new(Recorder::default()));
        terrain.update().unwrap();
        let id = root(&terrain);
        let populated = |t: &Terrain| t.populator::<Recorder>().unwrap().events.clone();
        assert_eq!(populated(&terrain).len(), 6);
        assert!(populated(&terrain).iter().all(|(on, _)| *on));

        terrain.split(id).unwrap();
        let events = populated(&terrain);
        let children = terrain.patch(id).unwrap().children.unwrap();
        assert_eq!(&events[6..10], &children.map(|c| (true, c)));
        assert_eq!(events[10], (false, id));

        terrain.merge(id).unwrap();
        let events = populated(&terrain);
        assert_eq!(&events[11..15], &children.map(|c| (false, c)));
        assert_eq!(events[15], (true, id));
    }

    #[test]
    fn colliders_stop_at_the_max_depth() {
        let mut terrain = Terrain::new(TerrainConfig {
            max_collider_depth: 2,
            ..Default::default()
        })
        .unwrap();
        terrain.validate_roots().unwrap();
        let id = root(&terrain);
        assert!(terrain.patch(id).unwrap().collider);

        terrain.split(id).unwrap();
        assert!(!terrain.patch(id).unwrap().collider);
        let child = terrain.patch(id).unwrap().children.unwrap()[0];
        assert!(terrain.patch(child).unwrap().collider);

        terrain.split(child).unwrap();
        assert!(terrain.patch(child).unwrap().collider);
        let grandchild = terrain.patch(child).unwrap().children.unwrap()[0];
        assert!(!terrain.patch(grandchild).unwrap().collider);

        // Root gone, its 4 children plus the 5 other roots.
        assert_eq!(terrain.collider_patches().count(), 4 + 5);
    }

    struct Paint(Vec4);

    impl VertexModifier for Paint {
        fn modify(&self, vertex: &mut VertexData) {
            vertex.color = self.0;
        }
    }

    #[test]
    fn vertex_modifiers_repaint_every_mesh() {
        let mut terrain = terrain();
        let id = leaf_at_depth(&mut terrain, 1);
        let green = Vec4::new(0.0, 1.0, 0.0, 1.0);

        terrain.add_vertex_modifier(Box::new(Paint(green)));
        terrain.update().unwrap();
        for (_, patch) in terrain.patches().iter() {
            assert!(patch.mesh.colors.iter().all(|c| *c == green));
        }
        assert!(!terrain.patch(id).unwrap().mesh.is_empty());
    }

    #[test]
    fn dirty_meshes_regenerate_on_update() {
        let mut terrain = terrain();
        let id = root(&terrain);
        let before = center(&terrain, id).length();

        terrain.add_displacer(Box::new(Raise(1.0)));
        terrain.update().unwrap();
        let after = center(&terrain, id).length();
        assert!(after > before + 0.05, "{} -> {}", before, after);
    }

    #[test]
    fn missing_patches_are_reported() {
        let mut terrain = terrain();
        let id = leaf_at_depth(&mut terrain, 1);
        terrain.merge(root(&terrain)).unwrap();
        assert_eq!(terrain.generate_mesh(id), Err(TerrainError::PatchNotFound(id)));
        assert_eq!(terrain.evaluate(id, &[]), Err(TerrainError::PatchNotFound(id)));
    }

    #[test]
    fn zero_resolution_config_is_rejected() {
        let mut terrain = terrain();
        let result = terrain.set_config(TerrainConfig {
            resolution: 0,
            ..Default::default()
        });
        assert_eq!(result, Err(TerrainError::InvalidResolution(0)));
        assert_eq!(terrain.config().resolution, 5);
    }

    #[test]
    fn scheduled_pass_collects_then_evaluates() {
        let mut terrain = Terrain::new(TerrainConfig {
            budget: 10.0,
            split_distances: vec![1.0],
            ..Default::default()
        })
        .unwrap();
        terrain.update().unwrap();
        let observer = [center(&terrain, root(&terrain))];

        let report = terrain.late_update(0.3, &observer).unwrap();
        assert_eq!(report.collected, 6);
        assert_eq!(terrain.scheduler_phase(), SchedulerPhase::Evaluating);

        let report = terrain.late_update(0.016, &observer).unwrap();
        assert_eq!(report.evaluated, 6);
        assert_eq!(report.splits, 1);
        assert_eq!(terrain.scheduler_phase(), SchedulerPhase::Idle);

        // Children created during the pass were not evaluated in it.
        assert_eq!(terrain.stats().max_depth, 1);
        for (_, patch) in terrain.patches().iter() {
            if patch.depth == 0 {
                assert!((0.5..=1.0).contains(&patch.cooldown));
            } else {
                assert_eq!(patch.sequence, 0);
            }
        }

        // Next collection queues only the new children; roots are cooling down.
        let report = terrain.late_update(0.3, &observer).unwrap();
        assert_eq!(report.collected, 4);
    }

    #[test]
    fn merged_children_are_skipped_as_stale() {
        let mut terrain = Terrain::new(TerrainConfig {
            budget: 10.0,
            ..Default::default()
        })
        .unwrap();
        terrain.update().unwrap();
        terrain.split(root(&terrain)).unwrap();

        assert_eq!(terrain.late_update(0.3, &[]).unwrap().collected, 10);
        let report = terrain.late_update(0.016, &[]).unwrap();
        assert_eq!(report.merges, 1);
        assert_eq!(report.evaluated, 6);
        assert_eq!(report.stale, 4);
    }

    #[test]
    fn huge_and_infinite_budgets_drain_in_one_frame() {
        for budget in [1.0e20, f32::INFINITY] {
            let mut terrain = Terrain::new(TerrainConfig {
                budget,
                ..Default::default()
            })
            .unwrap();
            terrain.update().unwrap();
            assert_eq!(terrain.late_update(0.3, &[]).unwrap().collected, 6);
            let report = terrain.late_update(0.016, &[]).unwrap();
            assert_eq!(report.evaluated, 6);
            assert_eq!(terrain.scheduler_phase(), SchedulerPhase::Idle);
        }
    }

    #[test]
    fn zero_budget_still_makes_progress() {
        let mut terrain = Terrain::new(TerrainConfig {
            budget: 0.0,
            ..Default::default()
        })
        .unwrap();
        terrain.update().unwrap();
        terrain.late_update(0.3, &[]).unwrap();
        for remaining in (0..6).rev() {
            let report = terrain.late_update(0.016, &[]).unwrap();
            assert_eq!(report.evaluated, 1);
            assert_eq!(terrain.scheduler.pending(), remaining);
        }
    }
}

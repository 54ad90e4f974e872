//! Patch mesh generation with LOD skirts.
//!
//! Each patch mesh is a `(R+1)^2` vertex grid plus a ring of `4R` skirt
//! vertices. The skirt copies the border vertices and pulls them toward the
//! body's center, so cracks against coarser neighbours are covered by a
//! vertical band instead of showing the background.
//!
//! Normals are computed on a grid padded by one sample on each side, so
//! border normals include geometry that belongs to the neighbouring patch
//! and shading stays continuous across patch edges.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3, Vec4};

use crate::error::{Result, TerrainError};
use crate::modifier::{VertexData, VertexModifier};
use crate::patch::Quad;
use crate::surface::Surface;

/// Interleaved vertex for renderer upload.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct TerrainVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tangent: [f32; 4],
    pub uv: [f32; 2],
    pub uv2: [f32; 2],
    pub color: [f32; 4],
}

/// CPU-side mesh buffers owned by one patch.
#[derive(Debug, Clone, Default)]
pub struct PatchMesh {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub tangents: Vec<Vec4>,
    pub coords1: Vec<Vec2>,
    pub coords2: Vec<Vec2>,
    pub colors: Vec<Vec4>,
    pub indices: Vec<u32>,
}

impl PatchMesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Drop the contents but keep the allocations for reuse.
    pub fn clear(&mut self) {
        self.positions.clear();
        self.normals.clear();
        self.tangents.clear();
        self.coords1.clear();
        self.coords2.clear();
        self.colors.clear();
        self.indices.clear();
    }

    /// Size every vertex stream to `count`. Streams that already have the
    /// right length are left alone and get overwritten in place.
    fn require_vertices(&mut self, count: usize) {
        if self.positions.len() != count {
            self.positions.resize(count, Vec3::ZERO);
            self.normals.resize(count, Vec3::ZERO);
            self.tangents.resize(count, Vec4::ZERO);
            self.coords1.resize(count, Vec2::ZERO);
            self.coords2.resize(count, Vec2::ZERO);
            self.colors.resize(count, Vec4::ZERO);
        }
    }

    /// Center of the axis-aligned bounds of all positions (zero when empty).
    pub fn bounds_center(&self) -> Vec3 {
        let Some(first) = self.positions.first() else {
            return Vec3::ZERO;
        };
        let (min, max) = self
            .positions
            .iter()
            .fold((*first, *first), |(min, max), p| (min.min(*p), max.max(*p)));
        (min + max) * 0.5
    }

    pub fn interleaved(&self) -> Vec<TerrainVertex> {
        (0..self.vertex_count())
            .map(|i| TerrainVertex {
                position: self.positions[i].to_array(),
                normal: self.normals[i].to_array(),
                tangent: self.tangents[i].to_array(),
                uv: self.coords1[i].to_array(),
                uv2: self.coords2[i].to_array(),
                color: self.colors[i].to_array(),
            })
            .collect()
    }
}

/// Free list of released mesh buffers.
#[derive(Debug, Default)]
pub struct MeshPool {
    meshes: Vec<PatchMesh>,
}

impl MeshPool {
    pub fn acquire(&mut self) -> PatchMesh {
        self.meshes.pop().unwrap_or_default()
    }

    pub fn release(&mut self, mut mesh: PatchMesh) {
        mesh.clear();
        self.meshes.push(mesh);
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}

/// Per-terrain mesh settings.
#[derive(Debug, Clone, Copy)]
pub struct MeshSettings {
    /// Quads along each patch edge.
    pub resolution: u32,
    pub skirt_thickness: f32,
    pub default_color: Vec4,
}

/// The part of a patch the mesh is built from.
#[derive(Debug, Clone, Copy)]
pub struct PatchShape {
    pub depth: u32,
    pub points: Quad<Vec3>,
    pub coords: Quad<Vec2>,
}

/// Scratch buffers reused across every patch of a terrain.
#[derive(Debug, Default)]
pub struct MeshBuilder {
    /// Surface points including one padding ring, `(R+3)^2`.
    spots: Vec<Vec3>,
    /// Unnormalized cell normals including the padding ring, `(R+2)^2`.
    cell_normals: Vec<Vec3>,
    cell_tangents: Vec<Vec3>,
    /// Closed rings of skirt vertices and the border vertices they copy.
    outer: Vec<u32>,
    inner: Vec<u32>,
    skirt_indices: Vec<u32>,
    ring_resolution: u32,
}

/// Largest supported quads-per-edge. Keeps vertex indices and ring
/// arithmetic well inside `u32`.
pub const MAX_RESOLUTION: u32 = 1024;

/// Vertices in a patch mesh of the given resolution.
pub fn vertex_count(resolution: u32) -> usize {
    let r = resolution as usize;
    (r + 1) * (r + 1) + r * 4
}

/// Indices in a patch mesh of the given resolution.
pub fn index_count(resolution: u32) -> usize {
    let r = resolution as usize;
    r * r * 6 + r * 24
}

/// Factor skirt positions are scaled by at `depth`.
pub fn skirt_scale(skirt_thickness: f32, depth: u32) -> f32 {
    1.0 - skirt_thickness * 0.5f32.powi(depth as i32)
}

fn triangle_area(a: Vec3, b: Vec3, c: Vec3) -> f32 {
    (a - b).cross(a - c).length() * 0.5
}

impl MeshBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill `mesh` for `shape` and return the center of its bounds.
    pub fn build(
        &mut self,
        settings: &MeshSettings,
        shape: &PatchShape,
        surface: &Surface,
        modifiers: &[Box<dyn VertexModifier>],
        mesh: &mut PatchMesh,
    ) -> Result<Vec3> {
        if settings.resolution == 0 || settings.resolution > MAX_RESOLUTION {
            return Err(TerrainError::InvalidResolution(settings.resolution));
        }
        let res = settings.resolution as usize;

        self.calculate_points(res, shape, surface);
        self.calculate_cells(res);
        self.calculate_vertex_data(res, shape, settings.default_color, modifiers, mesh);
        self.require_rings(settings.resolution);
        self.calculate_indices(res, mesh);
        self.calculate_skirt(res, skirt_scale(settings.skirt_thickness, shape.depth), mesh);

        Ok(mesh.bounds_center())
    }

    fn calculate_points(&mut self, res: usize, shape: &PatchShape, surface: &Surface) {
        let spot_res = res + 3;
        let step = 1.0 / res as f32;
        self.spots.clear();
        self.spots.resize(spot_res * spot_res, Vec3::ZERO);

        for y in 0..spot_res {
            let v = (y as f32 - 1.0) * step;
            for x in 0..spot_res {
                let u = (x as f32 - 1.0) * step;
                self.spots[y * spot_res + x] = surface.position_local(shape.points.sample(u, v));
            }
        }
    }

    fn calculate_cells(&mut self, res: usize) {
        let cell_res = res + 2;
        let spot_res = res + 3;
        self.cell_normals.clear();
        self.cell_normals.resize(cell_res * cell_res, Vec3::ZERO);
        self.cell_tangents.clear();
        self.cell_tangents.resize(cell_res * cell_res, Vec3::ZERO);

        for y in 0..cell_res {
            for x in 0..cell_res {
                let bl = self.spots[y * spot_res + x];
                let br = self.spots[y * spot_res + x + 1];
                let tl = self.spots[(y + 1) * spot_res + x];
                let tr = self.spots[(y + 1) * spot_res + x + 1];

                let horizontal = (bl - br) + (tl - tr);
                let vertical = (bl - tl) + (br - tr);
                let cell = y * cell_res + x;

                self.cell_normals[cell] = horizontal.cross(vertical);
                self.cell_tangents[cell] = vertical;
            }
        }
    }

    fn calculate_vertex_data(
        &mut self,
        res: usize,
        shape: &PatchShape,
        default_color: Vec4,
        modifiers: &[Box<dyn VertexModifier>],
        mesh: &mut PatchMesh,
    ) {
        let vert_res = res + 1;
        let cell_res = res + 2;
        let spot_res = res + 3;
        let recip = 1.0 / res as f32;
        let point_center = shape.points.average();

        mesh.require_vertices(vertex_count(res as u32));

        for y in 0..vert_res {
            let v = y as f32 * recip;
            for x in 0..vert_res {
                let u = x as f32 * recip;
                let bl = y * cell_res + x;
                let tl = bl + cell_res;
                let normal = self.cell_normals[bl]
                    + self.cell_normals[bl + 1]
                    + self.cell_normals[tl]
                    + self.cell_normals[tl + 1];
                let tangent = self.cell_tangents[bl]
                    + self.cell_tangents[bl + 1]
                    + self.cell_tangents[tl]
                    + self.cell_tangents[tl + 1];

                let mut vertex = VertexData {
                    position: self.spots[(y + 1) * spot_res + x + 1],
                    point_center,
                    coord1: shape.coords.sample(u, v),
                    coord2: Vec2::new(u, v),
                    color: default_color,
                    normal: normal.normalize_or_zero(),
                    tangent: tangent.normalize_or_zero().extend(1.0),
                };
                for modifier in modifiers {
                    modifier.modify(&mut vertex);
                }

                let i = y * vert_res + x;
                mesh.positions[i] = vertex.position;
                mesh.normals[i] = vertex.normal;
                mesh.tangents[i] = vertex.tangent;
                mesh.coords1[i] = vertex.coord1;
                mesh.coords2[i] = vertex.coord2;
                mesh.colors[i] = vertex.color;
            }
        }
    }

    /// Rebuild the skirt rings and strip when the resolution changed.
    fn require_rings(&mut self, resolution: u32) {
        if self.ring_resolution == resolution && !self.skirt_indices.is_empty() {
            return;
        }
        self.ring_resolution = resolution;

        let res = resolution;
        let vert_res = res + 1;
        let vert_tot = vert_res * vert_res;
        let quads = (res * 4) as usize;

        let outer_a = vert_tot;
        let outer_b = outer_a + res;
        let outer_c = outer_b + res;
        let outer_d = outer_c + res;
        let inner_a = 0;
        let inner_b = vert_res - 1;
        let inner_c = vert_tot - 1;
        let inner_d = vert_tot - vert_res;

        self.outer.clear();
        self.outer.resize(quads + 1, 0);
        self.inner.clear();
        self.inner.resize(quads + 1, 0);

        for i in 0..res {
            let side = res as usize;
            let k = i as usize;

            // BL -> BR
            self.outer[k] = outer_a + i;
            self.inner[k] = inner_a + i;
            // BR -> TR
            self.outer[k + side] = outer_b + i;
            self.inner[k + side] = inner_b + i * vert_res;
            // TR -> TL
            self.outer[k + side * 2] = outer_c + i;
            self.inner[k + side * 2] = inner_c - i;
            // TL -> BL
            self.outer[k + side * 3] = outer_d + i;
            self.inner[k + side * 3] = inner_d - i * vert_res;
        }
        self.outer[quads] = self.outer[0];
        self.inner[quads] = self.inner[0];

        self.skirt_indices.clear();
        self.skirt_indices.reserve(quads * 6);
        for i in 0..quads {
            let bl = self.outer[i];
            let br = self.outer[i + 1];
            let tl = self.inner[i];
            let tr = self.inner[i + 1];
            self.skirt_indices.extend_from_slice(&[bl, br, tl, tr, tl, br]);
        }
    }

    /// Triangulate the grid, turning each quad's diagonal to whichever split
    /// has the smaller surface area, then append the skirt strip.
    fn calculate_indices(&self, res: usize, mesh: &mut PatchMesh) {
        let vert_res = res + 1;
        mesh.indices.clear();
        mesh.indices.reserve(index_count(res as u32));

        for y in 0..res {
            for x in 0..res {
                let a = y * vert_res + x;
                let b = a + 1;
                let c = a + vert_res;
                let d = b + vert_res;
                let (pa, pb, pc, pd) = (mesh.positions[a], mesh.positions[b], mesh.positions[c], mesh.positions[d]);

                let keep = triangle_area(pa, pb, pc) + triangle_area(pd, pc, pb);
                let turn = triangle_area(pa, pb, pd) + triangle_area(pd, pc, pa);
                let [a, b, c, d] = [a as u32, b as u32, c as u32, d as u32];

                if keep <= turn {
                    mesh.indices.extend_from_slice(&[a, b, c, d, c, b]);
                } else {
                    mesh.indices.extend_from_slice(&[a, b, d, d, c, a]);
                }
            }
        }

        mesh.indices.extend_from_slice(&self.skirt_indices);
    }

    fn calculate_skirt(&self, res: usize, scale: f32, mesh: &mut PatchMesh) {
        for i in 0..res * 4 {
            let outer = self.outer[i] as usize;
            let inner = self.inner[i] as usize;

            mesh.positions[outer] = mesh.positions[inner] * scale;
            mesh.normals[outer] = mesh.normals[inner];
            mesh.tangents[outer] = mesh.tangents[inner];
            mesh.coords1[outer] = mesh.coords1[inner];
            mesh.coords2[outer] = mesh.coords2[inner];
            mesh.colors[outer] = mesh.colors[inner];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TerrainConfig;
    use crate::face::CubeFace;

    fn settings(resolution: u32) -> MeshSettings {
        MeshSettings {
            resolution,
            skirt_thickness: 0.1,
            default_color: Vec4::ONE,
        }
    }

    fn face_shape(depth: u32) -> PatchShape {
        PatchShape {
            depth,
            points: CubeFace::PositiveZ.points(),
            coords: CubeFace::PositiveZ.coords(),
        }
    }

    fn build(resolution: u32, depth: u32) -> PatchMesh {
        let surface = Surface::new(&TerrainConfig::default());
        let mut builder = MeshBuilder::new();
        let mut mesh = PatchMesh::default();
        builder
            .build(&settings(resolution), &face_shape(depth), &surface, &[], &mut mesh)
            .unwrap();
        mesh
    }

    #[test]
    fn vertex_and_index_counts_include_the_skirt() {
        for r in [1, 2, 5, 16] {
            let mesh = build(r, 0);
            assert_eq!(mesh.vertex_count(), ((r + 1) * (r + 1) + 4 * r) as usize);
            assert_eq!(mesh.indices.len(), index_count(r));
            assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertex_count()));
        }
    }

    #[test]
    fn skirt_copies_border_attributes_and_scales_positions() {
        let res = 5u32;
        for depth in [0, 3] {
            let surface = Surface::new(&TerrainConfig::default());
            let mut builder = MeshBuilder::new();
            let mut mesh = PatchMesh::default();
            builder
                .build(&settings(res), &face_shape(depth), &surface, &[], &mut mesh)
                .unwrap();

            let scale = skirt_scale(0.1, depth);
            for i in 0..(res * 4) as usize {
                let outer = builder.outer[i] as usize;
                let inner = builder.inner[i] as usize;
                assert!(outer >= ((res + 1) * (res + 1)) as usize);
                assert!((mesh.positions[outer] - mesh.positions[inner] * scale).length() < 1e-6);
                assert_eq!(mesh.normals[outer], mesh.normals[inner]);
                assert_eq!(mesh.tangents[outer], mesh.tangents[inner]);
                assert_eq!(mesh.coords1[outer], mesh.coords1[inner]);
                assert_eq!(mesh.coords2[outer], mesh.coords2[inner]);
                assert_eq!(mesh.colors[outer], mesh.colors[inner]);
            }
        }
    }

    #[test]
    fn inner_ring_walks_the_border() {
        let res = 3u32;
        let mut builder = MeshBuilder::new();
        builder.require_rings(res);
        // 4x4 vertex grid: border in BL -> BR -> TR -> TL order.
        assert_eq!(&builder.inner[..12], &[0, 1, 2, 3, 7, 11, 15, 14, 13, 12, 8, 4]);
        assert_eq!(builder.inner[12], 0);
        assert_eq!(builder.outer[0], 16);
        assert_eq!(builder.outer[11], 27);
        assert_eq!(builder.outer[12], 16);
    }

    #[test]
    fn vertices_sit_on_the_surface_with_outward_normals() {
        let config = TerrainConfig::default();
        let mesh = build(4, 0);
        let expected = config.radius + config.height * config.default_displacement;
        for i in 0..25 {
            assert!((mesh.positions[i].length() - expected).abs() < 1e-5);
            assert!(mesh.normals[i].dot(mesh.positions[i]) > 0.0);
        }
        assert_eq!(mesh.coords2[0], Vec2::ZERO);
        assert_eq!(mesh.coords2[24], Vec2::ONE);
        assert_eq!(mesh.coords1[0], Vec2::new(1.0, 0.0));
    }

    fn first_quad_indices(corners: [Vec3; 4]) -> [u32; 6] {
        let mut mesh = PatchMesh::default();
        mesh.require_vertices(vertex_count(1));
        mesh.positions[..4].copy_from_slice(&corners);
        let mut builder = MeshBuilder::new();
        builder.require_rings(1);
        builder.calculate_indices(1, &mut mesh);
        let mut quad = [0; 6];
        quad.copy_from_slice(&mesh.indices[..6]);
        quad
    }

    #[test]
    fn diagonal_follows_the_smaller_area() {
        // Corners are BL, BR, TL, TR. Raising TR folds the quad along BR-TL.
        let tr_raised = [Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::new(1.0, 1.0, 1.0)];
        assert_eq!(first_quad_indices(tr_raised), [0, 1, 2, 3, 2, 1]);

        // Raising BR folds it along BL-TR instead.
        let br_raised = [Vec3::ZERO, Vec3::new(1.0, 0.0, 1.0), Vec3::Y, Vec3::new(1.0, 1.0, 0.0)];
        assert_eq!(first_quad_indices(br_raised), [0, 1, 3, 3, 2, 0]);
    }

    struct Tint(Vec4);

    impl VertexModifier for Tint {
        fn modify(&self, vertex: &mut VertexData) {
            vertex.color = self.0;
            vertex.coord1 = vertex.coord2 * 2.0;
        }
    }

    struct Dim(f32);

    impl VertexModifier for Dim {
        fn modify(&self, vertex: &mut VertexData) {
            vertex.color *= self.0;
        }
    }

    #[test]
    fn modifiers_run_in_order_and_reach_the_skirt() {
        let surface = Surface::new(&TerrainConfig::default());
        let red = Vec4::new(1.0, 0.0, 0.0, 1.0);
        let modifiers: Vec<Box<dyn VertexModifier>> = vec![Box::new(Tint(red)), Box::new(Dim(0.5))];
        let mut builder = MeshBuilder::new();
        let mut mesh = PatchMesh::default();
        builder
            .build(&settings(4), &face_shape(0), &surface, &modifiers, &mut mesh)
            .unwrap();

        assert_eq!(mesh.vertex_count(), 25 + 16);
        for i in 0..mesh.vertex_count() {
            assert_eq!(mesh.colors[i], red * 0.5, "vertex {}", i);
            assert_eq!(mesh.coords1[i], mesh.coords2[i] * 2.0, "vertex {}", i);
        }
        assert_eq!(mesh.coords1[24], Vec2::splat(2.0));

        // Reversed, the tint overwrites the dimming.
        let modifiers: Vec<Box<dyn VertexModifier>> = vec![Box::new(Dim(0.5)), Box::new(Tint(red))];
        builder
            .build(&settings(4), &face_shape(0), &surface, &modifiers, &mut mesh)
            .unwrap();
        assert!(mesh.colors.iter().all(|c| *c == red));
    }

    #[test]
    fn buffers_are_reused_when_the_count_is_unchanged() {
        let surface = Surface::new(&TerrainConfig::default());
        let mut builder = MeshBuilder::new();
        let mut mesh = PatchMesh::default();
        builder.build(&settings(5), &face_shape(0), &surface, &[], &mut mesh).unwrap();
        let before = mesh.positions.as_ptr();
        builder.build(&settings(5), &face_shape(1), &surface, &[], &mut mesh).unwrap();
        assert_eq!(before, mesh.positions.as_ptr());
    }

    #[test]
    fn out_of_range_resolution_is_rejected() {
        let surface = Surface::new(&TerrainConfig::default());
        for resolution in [0, MAX_RESOLUTION + 1, 65535, u32::MAX] {
            let mut mesh = PatchMesh::default();
            let result = MeshBuilder::new().build(&settings(resolution), &face_shape(0), &surface, &[], &mut mesh);
            assert_eq!(result, Err(TerrainError::InvalidResolution(resolution)));
            assert!(mesh.is_empty());
        }
    }

    #[test]
    fn interleaved_vertices_match_the_streams() {
        let mesh = build(2, 0);
        let vertices = mesh.interleaved();
        assert_eq!(vertices.len(), mesh.vertex_count());
        assert_eq!(vertices[4].position, mesh.positions[4].to_array());
        assert_eq!(bytemuck::cast_slice::<TerrainVertex, u8>(&vertices).len(), vertices.len() * 72);
    }
}

//! Render-ready meshes
//!
//! A [`RenderableMesh`] is what the geometry cache stores and what render
//! components receive: one interleaved vertex and index buffer per level of
//! detail. It is immutable once built and shared through `Arc`.
//!
//! # Build paths
//!
//! - **Topology-checked** (default): the generator soup goes through
//!   [`DynamicMesh::from_raw`] with manifold repair, then every extra LOD is
//!   simplified from the previous one to `total / (lod * 2)` triangles.
//! - **Pass-through**: the soup is copied straight into LOD 0. No validation,
//!   no extra LODs.

use super::dynamic_mesh::{DynamicMesh, MeshBuildReport};
use super::generators::{MeshGenerator, RawMeshData};
use super::simplify::simplify_to_triangle_count;
use crate::foundation::math::{Vec2, Vec3};
use crate::shapes::GeometryKey;
use bytemuck::{Pod, Zeroable};
use std::collections::HashMap;

/// Interleaved vertex uploaded to the GPU
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Position in mesh space
    pub position: [f32; 3],
    /// Normal vector
    pub normal: [f32; 3],
    /// Texture coordinates (zero when UVs are disabled)
    pub tex_coord: [f32; 2],
}

impl Vertex {
    fn new(position: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self {
            position: position.into(),
            normal: normal.into(),
            tex_coord: uv.into(),
        }
    }
}

/// One level of detail
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshLod {
    /// Unique (position, normal, uv) corners
    pub vertices: Vec<Vertex>,
    /// Three indices per triangle
    pub indices: Vec<u32>,
    /// Number of polygon groups in this LOD
    pub polygon_group_count: usize,
}

/// Corner identity used to weld render vertices: (position, normal, uv) indices
type CornerKey = (u32, u32, u32);

#[derive(Default)]
struct LodWriter {
    lod: MeshLod,
    welded: HashMap<CornerKey, u32>,
}

impl LodWriter {
    fn corner(&mut self, key: CornerKey, make: impl FnOnce() -> Vertex) -> u32 {
        let index = *self.welded.entry(key).or_insert_with(|| {
            self.lod.vertices.push(make());
            (self.lod.vertices.len() - 1) as u32
        });
        self.lod.indices.push(index);
        index
    }
}

impl MeshLod {
    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Vertex buffer as raw bytes
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Index buffer as raw bytes
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Weld a topology-checked mesh into render buffers
    pub fn from_dynamic(mesh: &DynamicMesh) -> Self {
        let mut writer = LodWriter::default();
        let normals = mesh.normals();
        let uvs = mesh.uvs();

        for (triangle_id, triangle) in mesh.triangles().iter().enumerate() {
            let id = triangle_id as u32;
            let normal_corners = normals.triangle(id).unwrap_or([u32::MAX; 3]);
            let uv_corners = uvs.and_then(|overlay| overlay.triangle(id)).unwrap_or([u32::MAX; 3]);

            for corner in 0..3 {
                let vertex = triangle[corner];
                writer.corner((vertex, normal_corners[corner], uv_corners[corner]), || {
                    Vertex::new(
                        mesh.vertices()[vertex as usize],
                        normals.corner_value(id, corner).unwrap_or_else(|| mesh.triangle_normal(id)),
                        uvs.and_then(|overlay| overlay.corner_value(id, corner)).unwrap_or_else(Vec2::zeros),
                    )
                });
            }
        }

        writer.lod.polygon_group_count = mesh.polygon_group_count();
        writer.lod
    }

    /// Copy a generator soup into render buffers without validation
    ///
    /// Corners that reference missing attributes fall back to a +Z normal and
    /// zero UV; triangles that reference missing positions are skipped.
    pub fn from_raw(raw: &RawMeshData, with_uvs: bool) -> Self {
        let mut writer = LodWriter::default();
        let mut groups: Vec<u32> = Vec::new();

        for (index, triangle) in raw.triangles.iter().enumerate() {
            if triangle.iter().any(|&vertex| vertex as usize >= raw.positions.len()) {
                log::warn!("Pass-through triangle {index} references a missing vertex, skipping");
                continue;
            }

            let normal_corners = raw.triangle_normals.get(index).copied().unwrap_or([u32::MAX; 3]);
            let uv_corners = if with_uvs {
                raw.triangle_uvs.get(index).copied().unwrap_or([u32::MAX; 3])
            } else {
                [u32::MAX; 3]
            };

            for corner in 0..3 {
                let vertex = triangle[corner];
                writer.corner((vertex, normal_corners[corner], uv_corners[corner]), || {
                    Vertex::new(
                        raw.positions[vertex as usize],
                        raw.normals.get(normal_corners[corner] as usize).copied().unwrap_or_else(Vec3::z),
                        raw.uvs.get(uv_corners[corner] as usize).copied().unwrap_or_else(Vec2::zeros),
                    )
                });
            }

            groups.push(raw.polygon_groups.get(index).copied().unwrap_or(0));
        }

        groups.sort_unstable();
        groups.dedup();
        writer.lod.polygon_group_count = groups.len();
        writer.lod
    }
}

/// Options that shape how a mesh is built
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshBuildOptions {
    /// Use the topology-checked path
    pub use_custom_mesh_generator: bool,
    /// Keep the UV channel
    pub include_uvs: bool,
}

impl Default for MeshBuildOptions {
    fn default() -> Self {
        Self {
            use_custom_mesh_generator: true,
            include_uvs: true,
        }
    }
}

/// Immutable, shareable render mesh with one or more LODs
#[derive(Debug, Clone, PartialEq)]
pub struct RenderableMesh {
    key: GeometryKey,
    name: String,
    lods: Vec<MeshLod>,
    report: MeshBuildReport,
}

impl RenderableMesh {
    /// Generate and build a mesh for `key`
    ///
    /// `lod_count` is clamped to at least 1; the pass-through path always
    /// produces exactly one LOD.
    pub fn build(key: GeometryKey, generator: &dyn MeshGenerator, lod_count: usize, options: MeshBuildOptions) -> Self {
        let raw = generator.generate();
        let name = format!("{}_{key:08x}", generator.name());

        if !options.use_custom_mesh_generator {
            let report = MeshBuildReport {
                appended: raw.triangle_count(),
                ..MeshBuildReport::default()
            };
            return Self {
                key,
                name,
                lods: vec![MeshLod::from_raw(&raw, options.include_uvs)],
                report,
            };
        }

        let (base, report) = DynamicMesh::from_raw(&raw, options.include_uvs);
        let total = base.triangle_count();
        let mut lods = Vec::with_capacity(lod_count.max(1));
        lods.push(MeshLod::from_dynamic(&base));

        let mut previous = base;
        for lod in 1..lod_count.max(1) {
            let target = total / (lod * 2);
            let simplified = simplify_to_triangle_count(&previous, target);
            lods.push(MeshLod::from_dynamic(&simplified));
            previous = simplified;
        }

        log::debug!(
            "Built mesh {name}: {} LODs, {} triangles ({} repaired, {} skipped, {} dropped)",
            lods.len(),
            total,
            report.repaired,
            report.skipped,
            report.dropped
        );

        Self {
            key,
            name,
            lods,
            report,
        }
    }

    /// Cache key this mesh was built for
    pub fn key(&self) -> GeometryKey {
        self.key
    }

    /// Debug name, generator name plus key
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All LODs, most detailed first
    pub fn lods(&self) -> &[MeshLod] {
        &self.lods
    }

    /// Number of LODs
    pub fn lod_count(&self) -> usize {
        self.lods.len()
    }

    /// A single LOD
    pub fn lod(&self, index: usize) -> Option<&MeshLod> {
        self.lods.get(index)
    }

    /// Conversion counters of LOD 0
    pub fn report(&self) -> &MeshBuildReport {
        &self.report
    }

    /// Returns true if LOD 0 has no triangles
    pub fn is_empty(&self) -> bool {
        self.lods.first().map_or(true, |lod| lod.indices.is_empty())
    }
}

//! Procedural mesh generators
//!
//! Each generator is a small value object describing one shape. Nothing is
//! computed until [`MeshGenerator::generate`] runs, which happens on a
//! generation worker thread.
//!
//! Output is a [`RawMeshData`] triangle soup with per-corner normal and UV
//! indices and one polygon group per triangle. Topology validation and repair
//! happen later, when the soup is turned into a [`DynamicMesh`](super::DynamicMesh).

use crate::foundation::math::{constants, Vec2, Vec3};
use rayon::prelude::*;

/// Above this many triangles the triangle mesh generator runs per-triangle
/// work on the rayon pool; below it the dispatch overhead dominates
pub const PARALLEL_TRIANGLE_THRESHOLD: usize = 64;

/// Default latitude and longitude steps for spheres
pub const DEFAULT_SPHERE_STEPS: usize = 25;

/// Default circle and arc steps for capsules
pub const DEFAULT_CAPSULE_STEPS: usize = 12;

/// Triangle soup produced by a generator
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawMeshData {
    /// Vertex positions
    pub positions: Vec<Vec3>,
    /// Normal elements referenced by `triangle_normals`
    pub normals: Vec<Vec3>,
    /// UV elements referenced by `triangle_uvs`
    pub uvs: Vec<Vec2>,
    /// Triangles as position index triples
    pub triangles: Vec<[u32; 3]>,
    /// Per-corner normal element indices, parallel to `triangles`
    pub triangle_normals: Vec<[u32; 3]>,
    /// Per-corner UV element indices, parallel to `triangles`
    pub triangle_uvs: Vec<[u32; 3]>,
    /// Polygon group of each triangle, parallel to `triangles`
    pub polygon_groups: Vec<u32>,
}

impl RawMeshData {
    /// Number of triangles in the soup
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Flip the winding of every triangle, keeping corner attributes attached
    /// to the same vertices
    pub fn reverse_orientation(&mut self) {
        for triangle in &mut self.triangles {
            triangle.swap(1, 2);
        }
        for corners in &mut self.triangle_normals {
            corners.swap(1, 2);
        }
        for corners in &mut self.triangle_uvs {
            corners.swap(1, 2);
        }
        for normal in &mut self.normals {
            *normal = -*normal;
        }
    }

    /// Append a triangle whose corners share one normal and one UV per vertex
    fn push_vertex_attributed_triangle(&mut self, triangle: [u32; 3], group: u32) {
        self.triangles.push(triangle);
        self.triangle_normals.push(triangle);
        self.triangle_uvs.push(triangle);
        self.polygon_groups.push(group);
    }
}

/// A shape that knows how to produce its own triangle soup
pub trait MeshGenerator: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Produce the triangle soup
    fn generate(&self) -> RawMeshData;
}

fn scaled_steps(base: usize, complexity_factor: f32, minimum: usize) -> usize {
    let factor = if complexity_factor.is_finite() { complexity_factor.max(0.0) } else { 1.0 };
    ((base as f32 * factor).round() as usize).max(minimum)
}

/// Surface of revolution around +Z: rings described by (z offset, polar angle)
/// stitched between a north and a south pole. Spheres and capsules share it.
fn lathe(center: Vec3, radius: f32, rings: &[(f32, f32)], segments: usize, pole_offsets: (f32, f32)) -> RawMeshData {
    let mut data = RawMeshData::default();
    let ring_count = rings.len();
    let v_step = 1.0 / (ring_count + 1) as f32;

    data.positions.push(center + Vec3::new(0.0, 0.0, pole_offsets.0 + radius));
    data.normals.push(Vec3::z());
    data.uvs.push(Vec2::new(0.5, 0.0));

    for (ring_index, &(z_offset, phi)) in rings.iter().enumerate() {
        let (sin_phi, cos_phi) = phi.sin_cos();
        for segment in 0..segments {
            let theta = constants::TAU * segment as f32 / segments as f32;
            let (sin_theta, cos_theta) = theta.sin_cos();
            let normal = Vec3::new(sin_phi * cos_theta, sin_phi * sin_theta, cos_phi);

            data.positions.push(center + Vec3::new(0.0, 0.0, z_offset) + normal * radius);
            data.normals.push(normal);
            data.uvs.push(Vec2::new(segment as f32 / segments as f32, (ring_index + 1) as f32 * v_step));
        }
    }

    let south = data.positions.len() as u32;
    data.positions.push(center + Vec3::new(0.0, 0.0, pole_offsets.1 - radius));
    data.normals.push(-Vec3::z());
    data.uvs.push(Vec2::new(0.5, 1.0));

    let ring_base = |ring: usize| (1 + ring * segments) as u32;
    let mut group = 0;

    for segment in 0..segments {
        let next = (segment + 1) % segments;
        data.push_vertex_attributed_triangle([0, ring_base(0) + segment as u32, ring_base(0) + next as u32], group);
        group += 1;
    }

    for ring in 0..ring_count.saturating_sub(1) {
        for segment in 0..segments {
            let next = (segment + 1) % segments;
            let a = ring_base(ring) + segment as u32;
            let b = ring_base(ring) + next as u32;
            let c = ring_base(ring + 1) + segment as u32;
            let d = ring_base(ring + 1) + next as u32;
            data.push_vertex_attributed_triangle([a, c, d], group);
            data.push_vertex_attributed_triangle([a, d, b], group);
            group += 1;
        }
    }

    let last = ring_count - 1;
    for segment in 0..segments {
        let next = (segment + 1) % segments;
        data.push_vertex_attributed_triangle([ring_base(last) + segment as u32, south, ring_base(last) + next as u32], group);
        group += 1;
    }

    data
}

/// Planar UV for a corner, projected on the plane most aligned with `normal`
fn planar_uv(position: &Vec3, normal: &Vec3) -> Vec2 {
    let abs = normal.abs();
    if abs.z >= abs.x && abs.z >= abs.y {
        Vec2::new(position.x, position.y)
    } else if abs.x >= abs.y {
        Vec2::new(position.y, position.z)
    } else {
        Vec2::new(position.x, position.z)
    }
}

fn flat_normal(a: &Vec3, b: &Vec3, c: &Vec3) -> Vec3 {
    (b - a).cross(&(c - a)).try_normalize(f32::EPSILON).unwrap_or_else(Vec3::z)
}

/// Fan-triangulate polygon faces, one polygon group and one normal per face
fn polygon_faces(positions: Vec<Vec3>, faces: &[Vec<u32>]) -> RawMeshData {
    let mut data = RawMeshData {
        positions,
        ..RawMeshData::default()
    };
    let vertex_count = data.positions.len() as u32;

    for (group, face) in faces.iter().enumerate() {
        if face.len() < 3 || face.iter().any(|&index| index >= vertex_count) {
            log::warn!("Skipping malformed polygon face {group} with {} indices", face.len());
            continue;
        }

        let normal = flat_normal(
            &data.positions[face[0] as usize],
            &data.positions[face[1] as usize],
            &data.positions[face[2] as usize],
        );
        let normal_index = data.normals.len() as u32;
        data.normals.push(normal);

        let uv_base = data.uvs.len() as u32;
        for &index in face {
            data.uvs.push(planar_uv(&data.positions[index as usize], &normal));
        }

        for corner in 1..face.len() - 1 {
            data.triangles.push([face[0], face[corner], face[corner + 1]]);
            data.triangle_normals.push([normal_index; 3]);
            data.triangle_uvs.push([uv_base, uv_base + corner as u32, uv_base + corner as u32 + 1]);
            data.polygon_groups.push(group as u32);
        }
    }

    data
}

/// Latitude/longitude sphere
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereGenerator {
    /// Sphere center
    pub center: Vec3,
    /// Sphere radius
    pub radius: f32,
    /// Latitude steps (pole to pole)
    pub phi_steps: usize,
    /// Longitude steps (around the axis)
    pub theta_steps: usize,
}

impl SphereGenerator {
    /// Sphere with step counts scaled by `complexity_factor`
    pub fn new(center: Vec3, radius: f32, complexity_factor: f32) -> Self {
        Self {
            center,
            radius: radius.max(constants::KINDA_SMALL_NUMBER),
            phi_steps: scaled_steps(DEFAULT_SPHERE_STEPS, complexity_factor, 3),
            theta_steps: scaled_steps(DEFAULT_SPHERE_STEPS, complexity_factor, 3),
        }
    }
}

impl MeshGenerator for SphereGenerator {
    fn name(&self) -> &'static str {
        "Sphere"
    }

    fn generate(&self) -> RawMeshData {
        let rings: Vec<(f32, f32)> = (1..self.phi_steps)
            .map(|ring| (0.0, constants::PI * ring as f32 / self.phi_steps as f32))
            .collect();
        lathe(self.center, self.radius, &rings, self.theta_steps, (0.0, 0.0))
    }
}

/// Minimal oriented box: 8 corners, 12 triangles, one normal per face
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxGenerator {
    /// Box center
    pub center: Vec3,
    /// Half size along each axis
    pub half_extents: Vec3,
}

impl MeshGenerator for BoxGenerator {
    fn name(&self) -> &'static str {
        "Box"
    }

    fn generate(&self) -> RawMeshData {
        let hull = crate::shapes::ConvexHull::cuboid(self.half_extents);
        let positions = hull.vertices.iter().map(|vertex| vertex + self.center).collect();
        polygon_faces(positions, &hull.faces)
    }
}

/// Hemisphere-capped cylinder along +Z, centered on the segment midpoint
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapsuleGenerator {
    /// Sweep radius
    pub radius: f32,
    /// Length of the inner segment
    pub segment_length: f32,
    /// Steps around the axis
    pub circle_steps: usize,
    /// Steps along each hemisphere arc
    pub arc_steps: usize,
}

impl CapsuleGenerator {
    /// Capsule with step counts scaled by `complexity_factor`
    ///
    /// Radius and steps are floor-clamped so a degenerate recording still
    /// yields a valid closed mesh.
    pub fn new(radius: f32, segment_length: f32, complexity_factor: f32) -> Self {
        Self {
            radius: radius.max(constants::KINDA_SMALL_NUMBER),
            segment_length: segment_length.max(0.0),
            circle_steps: scaled_steps(DEFAULT_CAPSULE_STEPS, complexity_factor, 3),
            arc_steps: scaled_steps(DEFAULT_CAPSULE_STEPS / 2, complexity_factor, 1),
        }
    }
}

impl MeshGenerator for CapsuleGenerator {
    fn name(&self) -> &'static str {
        "Capsule"
    }

    fn generate(&self) -> RawMeshData {
        let half = self.segment_length * 0.5;
        let quarter_turn = constants::PI * 0.5;
        let arc = self.arc_steps as f32;

        let mut rings = Vec::with_capacity(self.arc_steps * 2);
        for step in 1..=self.arc_steps {
            rings.push((half, quarter_turn * step as f32 / arc));
        }
        for step in 0..self.arc_steps {
            rings.push((-half, quarter_turn + quarter_turn * step as f32 / arc));
        }

        lathe(Vec3::zeros(), self.radius, &rings, self.circle_steps, (half, -half))
    }
}

/// Convex hull from its vertex and face lists
#[derive(Debug, Clone, PartialEq)]
pub struct ConvexGenerator {
    /// Hull vertices
    pub vertices: Vec<Vec3>,
    /// Hull faces as vertex loops
    pub faces: Vec<Vec<u32>>,
}

impl MeshGenerator for ConvexGenerator {
    fn name(&self) -> &'static str {
        "Convex"
    }

    fn generate(&self) -> RawMeshData {
        polygon_faces(self.vertices.clone(), &self.faces)
    }
}

/// Flat-shaded triangle mesh
///
/// Every triangle gets its own face normal, stored as three duplicated normal
/// entries; no smoothing across triangles.
#[derive(Debug, Clone, PartialEq)]
pub struct TriangleMeshGenerator {
    /// Mesh vertices
    pub vertices: Vec<Vec3>,
    /// Triangles as vertex index triples
    pub triangles: Vec<[u32; 3]>,
    /// Flip winding after generation
    pub reverse_orientation: bool,
}

impl TriangleMeshGenerator {
    fn corner_attributes(&self, triangle: &[u32; 3]) -> Option<(Vec3, [Vec2; 3])> {
        let a = self.vertices.get(triangle[0] as usize)?;
        let b = self.vertices.get(triangle[1] as usize)?;
        let c = self.vertices.get(triangle[2] as usize)?;
        let normal = flat_normal(a, b, c);
        Some((normal, [planar_uv(a, &normal), planar_uv(b, &normal), planar_uv(c, &normal)]))
    }
}

impl MeshGenerator for TriangleMeshGenerator {
    fn name(&self) -> &'static str {
        "TriangleMesh"
    }

    fn generate(&self) -> RawMeshData {
        let per_triangle: Vec<Option<(Vec3, [Vec2; 3])>> = if self.triangles.len() > PARALLEL_TRIANGLE_THRESHOLD {
            self.triangles.par_iter().map(|triangle| self.corner_attributes(triangle)).collect()
        } else {
            self.triangles.iter().map(|triangle| self.corner_attributes(triangle)).collect()
        };

        let mut data = RawMeshData {
            positions: self.vertices.clone(),
            ..RawMeshData::default()
        };
        data.normals.reserve(self.triangles.len() * 3);
        data.uvs.reserve(self.triangles.len() * 3);

        for (index, (triangle, attributes)) in self.triangles.iter().zip(per_triangle).enumerate() {
            let Some((normal, uvs)) = attributes else {
                log::warn!("Triangle {index} references a vertex outside the mesh, skipping");
                continue;
            };

            let base = data.normals.len() as u32;
            data.normals.extend([normal; 3]);
            data.uvs.extend(uvs);
            data.triangles.push(*triangle);
            data.triangle_normals.push([base, base + 1, base + 2]);
            data.triangle_uvs.push([base, base + 1, base + 2]);
            data.polygon_groups.push(0);
        }

        if self.reverse_orientation {
            data.reverse_orientation();
        }

        data
    }
}

/// Height field grid
///
/// Cells are stored in the height field's native winding, which faces down;
/// the generator reverses it so the surface faces +Z.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightFieldGenerator {
    /// Row-major heights
    pub heights: Vec<f32>,
    /// Samples along Y
    pub rows: usize,
    /// Samples along X
    pub columns: usize,
    /// Cell spacing along X and Y, height multiplier along Z
    pub scale: Vec3,
    /// Flip winding after generation
    pub reverse_orientation: bool,
}

impl MeshGenerator for HeightFieldGenerator {
    fn name(&self) -> &'static str {
        "HeightField"
    }

    fn generate(&self) -> RawMeshData {
        if self.rows < 2 || self.columns < 2 || self.heights.len() < self.rows * self.columns {
            log::warn!(
                "Height field {}x{} with {} samples cannot be triangulated",
                self.rows,
                self.columns,
                self.heights.len()
            );
            return RawMeshData::default();
        }

        let mut vertices = Vec::with_capacity(self.rows * self.columns);
        for row in 0..self.rows {
            for column in 0..self.columns {
                let height = self.heights[row * self.columns + column];
                vertices.push(Vec3::new(
                    column as f32 * self.scale.x,
                    row as f32 * self.scale.y,
                    height * self.scale.z,
                ));
            }
        }

        let index = |row: usize, column: usize| (row * self.columns + column) as u32;
        let mut triangles = Vec::with_capacity((self.rows - 1) * (self.columns - 1) * 2);
        for row in 0..self.rows - 1 {
            for column in 0..self.columns - 1 {
                let a = index(row, column);
                let b = index(row, column + 1);
                let c = index(row + 1, column);
                let d = index(row + 1, column + 1);
                triangles.push([a, d, b]);
                triangles.push([a, c, d]);
            }
        }

        TriangleMeshGenerator {
            vertices,
            triangles,
            reverse_orientation: self.reverse_orientation,
        }
        .generate()
    }
}

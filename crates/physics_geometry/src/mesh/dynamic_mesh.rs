//! Topology-checked triangle mesh
//!
//! [`DynamicMesh`] tracks which triangles share each edge so it can refuse
//! triangles that would make the surface non-manifold. Normal and UV
//! attributes live in overlays: element arrays plus per-triangle element
//! triples, so a seam can split attributes without splitting positions.
//!
//! [`DynamicMesh::from_raw`] converts a generator soup and applies the repair
//! rules:
//!
//! - a non-manifold triangle gets three fresh copies of its vertices and is
//!   appended once more (one attempt, no recursion)
//! - an exact duplicate triangle is skipped and counted
//! - anything else is dropped with a warning

use super::generators::RawMeshData;
use crate::foundation::math::{Vec2, Vec3};
use std::collections::HashMap;

/// Why a triangle could not be appended
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendTriangleError {
    /// A triangle with the same three vertices already exists
    #[error("duplicate triangle")]
    Duplicate,
    /// One of the triangle's edges already has two triangles
    #[error("edge already shared by two triangles")]
    NonManifold,
    /// Out-of-range or repeated vertex index
    #[error("invalid triangle {0:?}")]
    Invalid([u32; 3]),
}

/// Per-triangle attribute layer
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeOverlay<T> {
    elements: Vec<T>,
    triangle_elements: Vec<[u32; 3]>,
}

impl<T> Default for AttributeOverlay<T> {
    fn default() -> Self {
        Self {
            elements: Vec::new(),
            triangle_elements: Vec::new(),
        }
    }
}

impl<T: Copy> AttributeOverlay<T> {
    /// Append an element and return its index
    pub fn append_element(&mut self, value: T) -> u32 {
        self.elements.push(value);
        (self.elements.len() - 1) as u32
    }

    /// Element values
    pub fn elements(&self) -> &[T] {
        &self.elements
    }

    /// Element indices of a triangle's corners
    pub fn triangle(&self, triangle_id: u32) -> Option<[u32; 3]> {
        self.triangle_elements.get(triangle_id as usize).copied()
    }

    /// Attribute value at one corner of a triangle
    pub fn corner_value(&self, triangle_id: u32, corner: usize) -> Option<T> {
        let element = self.triangle(triangle_id)?[corner];
        self.elements.get(element as usize).copied()
    }

    fn set_triangle(&mut self, triangle_id: u32, corners: [u32; 3]) {
        let index = triangle_id as usize;
        if index >= self.triangle_elements.len() {
            self.triangle_elements.resize(index + 1, [0; 3]);
        }
        self.triangle_elements[index] = corners;
    }
}

/// Triangle mesh with edge adjacency and attribute overlays
#[derive(Debug, Clone, Default)]
pub struct DynamicMesh {
    vertices: Vec<Vec3>,
    triangles: Vec<[u32; 3]>,
    triangle_groups: Vec<u32>,
    edge_triangles: HashMap<(u32, u32), Vec<u32>>,
    normals: AttributeOverlay<Vec3>,
    uvs: Option<AttributeOverlay<Vec2>>,
}

fn edge_key(a: u32, b: u32) -> (u32, u32) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

fn same_vertex_set(a: &[u32; 3], b: &[u32; 3]) -> bool {
    let mut a = *a;
    let mut b = *b;
    a.sort_unstable();
    b.sort_unstable();
    a == b
}

/// Outcome counters of a raw soup conversion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeshBuildReport {
    /// Triangles appended on the first attempt
    pub appended: usize,
    /// Non-manifold triangles appended after vertex duplication
    pub repaired: usize,
    /// Exact duplicates skipped
    pub skipped: usize,
    /// Triangles rejected for any other reason
    pub dropped: usize,
}

impl MeshBuildReport {
    /// Triangles present in the built mesh
    pub fn triangle_count(&self) -> usize {
        self.appended + self.repaired
    }
}

impl DynamicMesh {
    /// Create an empty mesh, with or without a UV overlay
    pub fn new(with_uvs: bool) -> Self {
        Self {
            uvs: with_uvs.then(AttributeOverlay::default),
            ..Self::default()
        }
    }

    /// Append a vertex and return its id
    pub fn append_vertex(&mut self, position: Vec3) -> u32 {
        self.vertices.push(position);
        (self.vertices.len() - 1) as u32
    }

    /// Append a triangle in polygon group `group`
    pub fn append_triangle(&mut self, triangle: [u32; 3], group: u32) -> Result<u32, AppendTriangleError> {
        let [a, b, c] = triangle;
        let vertex_count = self.vertices.len() as u32;
        if a == b || b == c || c == a || triangle.iter().any(|&vertex| vertex >= vertex_count) {
            return Err(AppendTriangleError::Invalid(triangle));
        }

        let edges = [edge_key(a, b), edge_key(b, c), edge_key(c, a)];

        for edge in &edges {
            if let Some(existing) = self.edge_triangles.get(edge) {
                if existing
                    .iter()
                    .any(|&other| same_vertex_set(&self.triangles[other as usize], &triangle))
                {
                    return Err(AppendTriangleError::Duplicate);
                }
            }
        }

        if edges
            .iter()
            .any(|edge| self.edge_triangles.get(edge).is_some_and(|existing| existing.len() >= 2))
        {
            return Err(AppendTriangleError::NonManifold);
        }

        let id = self.triangles.len() as u32;
        self.triangles.push(triangle);
        self.triangle_groups.push(group);
        for edge in edges {
            self.edge_triangles.entry(edge).or_default().push(id);
        }
        Ok(id)
    }

    /// Vertex positions
    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    /// Triangles as vertex id triples
    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    /// Polygon group per triangle
    pub fn triangle_groups(&self) -> &[u32] {
        &self.triangle_groups
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Number of distinct polygon groups
    pub fn polygon_group_count(&self) -> usize {
        let mut groups = self.triangle_groups.clone();
        groups.sort_unstable();
        groups.dedup();
        groups.len()
    }

    /// Triangle ids adjacent to an edge
    pub fn edge_triangles(&self, a: u32, b: u32) -> &[u32] {
        self.edge_triangles.get(&edge_key(a, b)).map_or(&[], Vec::as_slice)
    }

    /// Edges used by exactly one triangle
    pub fn boundary_edge_count(&self) -> usize {
        self.edge_triangles.values().filter(|triangles| triangles.len() == 1).count()
    }

    /// Normal overlay
    pub fn normals(&self) -> &AttributeOverlay<Vec3> {
        &self.normals
    }

    /// Mutable normal overlay
    pub fn normals_mut(&mut self) -> &mut AttributeOverlay<Vec3> {
        &mut self.normals
    }

    /// UV overlay, absent when UVs are disabled
    pub fn uvs(&self) -> Option<&AttributeOverlay<Vec2>> {
        self.uvs.as_ref()
    }

    /// Mutable UV overlay
    pub fn uvs_mut(&mut self) -> Option<&mut AttributeOverlay<Vec2>> {
        self.uvs.as_mut()
    }

    /// Assign normal elements to a triangle's corners
    pub fn set_triangle_normals(&mut self, triangle_id: u32, corners: [u32; 3]) {
        self.normals.set_triangle(triangle_id, corners);
    }

    /// Assign UV elements to a triangle's corners (ignored without a UV overlay)
    pub fn set_triangle_uvs(&mut self, triangle_id: u32, corners: [u32; 3]) {
        if let Some(uvs) = self.uvs.as_mut() {
            uvs.set_triangle(triangle_id, corners);
        }
    }

    /// Flat normal of a triangle
    pub fn triangle_normal(&self, triangle_id: u32) -> Vec3 {
        let [a, b, c] = self.triangles[triangle_id as usize];
        let (a, b, c) = (
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        );
        (b - a).cross(&(c - a)).try_normalize(f32::EPSILON).unwrap_or_else(Vec3::z)
    }

    /// Convert a generator soup, repairing what can be repaired
    pub fn from_raw(raw: &RawMeshData, with_uvs: bool) -> (Self, MeshBuildReport) {
        let mut mesh = Self::new(with_uvs && !raw.uvs.is_empty());
        let mut report = MeshBuildReport::default();

        mesh.vertices = raw.positions.clone();
        mesh.normals.elements = raw.normals.clone();
        if let Some(uvs) = mesh.uvs.as_mut() {
            uvs.elements = raw.uvs.clone();
        }

        for (index, &triangle) in raw.triangles.iter().enumerate() {
            let group = raw.polygon_groups.get(index).copied().unwrap_or(0);

            let triangle_id = match mesh.append_triangle(triangle, group) {
                Ok(id) => {
                    report.appended += 1;
                    id
                }
                Err(AppendTriangleError::NonManifold) => {
                    let duplicated = triangle.map(|vertex| {
                        let position = mesh.vertices[vertex as usize];
                        mesh.append_vertex(position)
                    });
                    match mesh.append_triangle(duplicated, group) {
                        Ok(id) => {
                            report.repaired += 1;
                            id
                        }
                        Err(error) => {
                            log::warn!("Triangle {index} {triangle:?} still rejected after repair: {error}");
                            report.dropped += 1;
                            continue;
                        }
                    }
                }
                Err(AppendTriangleError::Duplicate) => {
                    report.skipped += 1;
                    continue;
                }
                Err(error) => {
                    log::warn!("Dropping triangle {index}: {error}");
                    report.dropped += 1;
                    continue;
                }
            };

            match raw.triangle_normals.get(index) {
                Some(&corners) if corners.iter().all(|&element| (element as usize) < raw.normals.len()) => {
                    mesh.set_triangle_normals(triangle_id, corners);
                }
                _ => {
                    let normal = mesh.triangle_normal(triangle_id);
                    let element = mesh.normals.append_element(normal);
                    mesh.set_triangle_normals(triangle_id, [element; 3]);
                }
            }

            if mesh.uvs.is_some() {
                let corners = raw
                    .triangle_uvs
                    .get(index)
                    .copied()
                    .filter(|corners| corners.iter().all(|&element| (element as usize) < raw.uvs.len()))
                    .unwrap_or([0; 3]);
                mesh.set_triangle_uvs(triangle_id, corners);
            }
        }

        if report.dropped > 0 {
            log::error!(
                "Mesh conversion dropped {} of {} triangles",
                report.dropped,
                raw.triangles.len()
            );
        }

        (mesh, report)
    }
}

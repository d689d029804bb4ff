//! Edge-collapse simplification for level-of-detail meshes
//!
//! Collapses the shortest interior edge into its midpoint until the target
//! triangle count is reached or no legal collapse remains. Vertices on open
//! boundaries, on non-manifold edges and on polygon group seams are locked,
//! which keeps silhouettes and face borders in place.
//!
//! A collapse of edge (a, b) is legal when:
//!
//! - the edge is interior (exactly two triangles)
//! - a and b share exactly two neighbors (link condition)
//! - no surviving triangle around a or b flips its facing

use super::dynamic_mesh::DynamicMesh;
use crate::foundation::math::{Vec2, Vec3};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

struct Collapser {
    positions: Vec<Vec3>,
    triangles: Vec<[u32; 3]>,
    alive: Vec<bool>,
    alive_count: usize,
    vertex_triangles: Vec<Vec<usize>>,
    locked: Vec<bool>,
    removed: Vec<bool>,
}

fn contains(triangle: &[u32; 3], vertex: usize) -> bool {
    triangle.iter().any(|&v| v as usize == vertex)
}

fn face_normal(a: &Vec3, b: &Vec3, c: &Vec3) -> Vec3 {
    (b - a).cross(&(c - a))
}

/// Vertices touching an open edge, a non-manifold edge or a group seam
fn locked_vertices(mesh: &DynamicMesh) -> Vec<bool> {
    let mut edge_groups: HashMap<(u32, u32), Vec<u32>> = HashMap::new();
    for (triangle, &group) in mesh.triangles().iter().zip(mesh.triangle_groups()) {
        for corner in 0..3 {
            let (a, b) = (triangle[corner], triangle[(corner + 1) % 3]);
            edge_groups.entry((a.min(b), a.max(b))).or_default().push(group);
        }
    }

    let mut locked = vec![false; mesh.vertices().len()];
    for ((a, b), groups) in edge_groups {
        let seam = groups.len() != 2 || groups[0] != groups[1];
        if seam {
            locked[a as usize] = true;
            locked[b as usize] = true;
        }
    }
    locked
}

impl Collapser {
    fn new(mesh: &DynamicMesh) -> Self {
        let mut vertex_triangles = vec![Vec::new(); mesh.vertices().len()];
        for (index, triangle) in mesh.triangles().iter().enumerate() {
            for &vertex in triangle {
                vertex_triangles[vertex as usize].push(index);
            }
        }

        Self {
            positions: mesh.vertices().to_vec(),
            triangles: mesh.triangles().to_vec(),
            alive: vec![true; mesh.triangle_count()],
            alive_count: mesh.triangle_count(),
            vertex_triangles,
            locked: locked_vertices(mesh),
            removed: vec![false; mesh.vertices().len()],
        }
    }

    fn neighbors(&self, vertex: usize) -> Vec<usize> {
        let mut result: Vec<usize> = self.vertex_triangles[vertex]
            .iter()
            .filter(|&&triangle| self.alive[triangle])
            .flat_map(|&triangle| self.triangles[triangle])
            .map(|v| v as usize)
            .filter(|&v| v != vertex)
            .collect();
        result.sort_unstable();
        result.dedup();
        result
    }

    fn edge_length(&self, a: usize, b: usize) -> f32 {
        (self.positions[a] - self.positions[b]).norm()
    }

    fn candidate(&self, a: usize, b: usize) -> Reverse<(u32, usize, usize)> {
        Reverse((self.edge_length(a, b).to_bits(), a.min(b), a.max(b)))
    }

    fn collapsible(&self, a: usize, b: usize) -> bool {
        !self.locked[a] && !self.locked[b] && !self.removed[a] && !self.removed[b]
    }

    fn shared_triangles(&self, a: usize, b: usize) -> Vec<usize> {
        self.vertex_triangles[a]
            .iter()
            .copied()
            .filter(|&triangle| self.alive[triangle] && contains(&self.triangles[triangle], b))
            .collect()
    }

    fn would_flip(&self, a: usize, b: usize, target: &Vec3, shared: &[usize]) -> bool {
        for &vertex in &[a, b] {
            for &triangle in &self.vertex_triangles[vertex] {
                if !self.alive[triangle] || shared.contains(&triangle) {
                    continue;
                }
                let corners = self.triangles[triangle];
                let before = corners.map(|v| self.positions[v as usize]);
                let after = corners.map(|v| {
                    if v as usize == a || v as usize == b {
                        *target
                    } else {
                        self.positions[v as usize]
                    }
                });
                let normal_before = face_normal(&before[0], &before[1], &before[2]);
                let normal_after = face_normal(&after[0], &after[1], &after[2]);
                if normal_before.dot(&normal_after) <= 0.0 {
                    return true;
                }
            }
        }
        false
    }

    /// Try to collapse `b` into `a`; returns true on success
    fn collapse(&mut self, a: usize, b: usize) -> bool {
        let shared = self.shared_triangles(a, b);
        if shared.len() != 2 {
            return false;
        }

        let neighbors_a = self.neighbors(a);
        let common = self
            .neighbors(b)
            .into_iter()
            .filter(|vertex| neighbors_a.binary_search(vertex).is_ok())
            .count();
        if common != 2 {
            return false;
        }

        let midpoint = (self.positions[a] + self.positions[b]) * 0.5;
        if self.would_flip(a, b, &midpoint, &shared) {
            return false;
        }

        self.positions[a] = midpoint;
        for triangle in shared {
            self.alive[triangle] = false;
            self.alive_count -= 1;
        }

        let moved = std::mem::take(&mut self.vertex_triangles[b]);
        for triangle in moved {
            if !self.alive[triangle] {
                continue;
            }
            for vertex in &mut self.triangles[triangle] {
                if *vertex as usize == b {
                    *vertex = a as u32;
                }
            }
            self.vertex_triangles[a].push(triangle);
        }
        self.removed[b] = true;

        let alive = &self.alive;
        self.vertex_triangles[a].retain(|&triangle| alive[triangle]);
        self.vertex_triangles[a].sort_unstable();
        self.vertex_triangles[a].dedup();
        true
    }

    fn run(&mut self, target_triangle_count: usize) {
        let mut heap = BinaryHeap::new();
        for triangle in &self.triangles {
            for corner in 0..3 {
                let (a, b) = (triangle[corner] as usize, triangle[(corner + 1) % 3] as usize);
                if a < b && self.collapsible(a, b) {
                    heap.push(self.candidate(a, b));
                }
            }
        }

        while self.alive_count > target_triangle_count {
            let Some(Reverse((length_bits, a, b))) = heap.pop() else {
                break;
            };
            if !self.collapsible(a, b) {
                continue;
            }
            let current = self.edge_length(a, b);
            if current.to_bits() != length_bits {
                heap.push(self.candidate(a, b));
                continue;
            }

            if self.collapse(a, b) {
                for neighbor in self.neighbors(a) {
                    if self.collapsible(a, neighbor) {
                        heap.push(self.candidate(a, neighbor));
                    }
                }
            }
        }
    }
}

/// Per-vertex UV taken from the first corner that references each vertex
fn vertex_uvs(mesh: &DynamicMesh) -> Option<Vec<Vec2>> {
    let overlay = mesh.uvs()?;
    let mut uvs = vec![Vec2::zeros(); mesh.vertices().len()];
    let mut seen = vec![false; mesh.vertices().len()];
    for (triangle_id, triangle) in mesh.triangles().iter().enumerate() {
        for (corner, &vertex) in triangle.iter().enumerate() {
            if seen[vertex as usize] {
                continue;
            }
            if let Some(uv) = overlay.corner_value(triangle_id as u32, corner) {
                uvs[vertex as usize] = uv;
                seen[vertex as usize] = true;
            }
        }
    }
    Some(uvs)
}

/// Simplify `source` toward `target_triangle_count` triangles
///
/// The result carries flat per-triangle normals and, when the source has UVs,
/// one UV per surviving vertex. If the target is already met the source is
/// cloned unchanged.
pub fn simplify_to_triangle_count(source: &DynamicMesh, target_triangle_count: usize) -> DynamicMesh {
    if source.triangle_count() <= target_triangle_count {
        return source.clone();
    }

    let mut collapser = Collapser::new(source);
    collapser.run(target_triangle_count);

    let source_uvs = vertex_uvs(source);
    let mut result = DynamicMesh::new(source_uvs.is_some());
    let mut remap: HashMap<u32, u32> = HashMap::new();

    for (index, triangle) in collapser.triangles.iter().enumerate() {
        if !collapser.alive[index] {
            continue;
        }

        let mapped = triangle.map(|vertex| {
            *remap
                .entry(vertex)
                .or_insert_with(|| result.append_vertex(collapser.positions[vertex as usize]))
        });

        let triangle_id = match result.append_triangle(mapped, source.triangle_groups()[index]) {
            Ok(id) => id,
            Err(error) => {
                log::warn!("Simplified triangle {index} rejected: {error}");
                continue;
            }
        };

        let normal = result.triangle_normal(triangle_id);
        let element = result.normals_mut().append_element(normal);
        result.set_triangle_normals(triangle_id, [element; 3]);

        if let Some(uvs) = source_uvs.as_ref() {
            let corners = triangle.map(|vertex| uvs[vertex as usize]);
            if let Some(overlay) = result.uvs_mut() {
                let elements = corners.map(|uv| overlay.append_element(uv));
                result.set_triangle_uvs(triangle_id, elements);
            }
        }
    }

    log::trace!(
        "Simplified {} -> {} triangles (target {target_triangle_count})",
        source.triangle_count(),
        result.triangle_count()
    );

    result
}

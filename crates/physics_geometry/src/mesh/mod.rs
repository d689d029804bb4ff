//! Mesh generation and building
//!
//! - [`generators`]: procedural generators, one per supported shape kind
//! - [`factory`]: picks the generator for a concrete shape
//! - [`dynamic_mesh`]: topology-checked mesh with manifold repair
//! - [`simplify`]: edge-collapse simplification for LODs
//! - [`renderable`]: the immutable render mesh stored by the geometry cache

pub mod dynamic_mesh;
pub mod factory;
pub mod generators;
pub mod renderable;
pub mod simplify;

pub use dynamic_mesh::{AppendTriangleError, AttributeOverlay, DynamicMesh, MeshBuildReport};
pub use factory::{create_generator, has_generator};
pub use generators::{MeshGenerator, RawMeshData};
pub use renderable::{MeshBuildOptions, MeshLod, RenderableMesh, Vertex};
pub use simplify::simplify_to_triangle_count;

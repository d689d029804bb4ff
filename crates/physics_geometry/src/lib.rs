//! # Physics Geometry
//!
//! Turns recorded collision shape hierarchies into renderable meshes for a
//! physics debugger.
//!
//! ## Features
//!
//! - **Hierarchy extraction**: unions, transformed wrappers and packed
//!   (scaled / instanced) shapes are flattened into per-leaf handles
//! - **Content-hash caching**: identical geometry is generated once and shared
//! - **Simple shape deduplication**: every box and every sphere share one
//!   unit mesh sized through the instance transform
//! - **Asynchronous generation**: cache misses are built on a worker pool
//! - **Budgeted ticking**: finished meshes are applied to pooled render
//!   components within a per-frame time budget
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use physics_geometry::prelude::*;
//! use std::sync::Arc;
//!
//! struct Scene;
//!
//! impl GeometrySceneEvents for Scene {
//!     fn on_geometry_loaded(&self, key: GeometryKey) {
//!         println!("mesh {key:08x} ready");
//!     }
//! }
//!
//! fn main() -> Result<(), GeometryError> {
//!     let scene: Arc<dyn GeometrySceneEvents> = Arc::new(Scene);
//!     let mut builder = GeometryBuilder::new(GeometrySettings::default())?;
//!     builder.initialize(Arc::downgrade(&scene));
//!
//!     let root = ImplicitObject::union(vec![
//!         ImplicitObject::sphere(Vec3::zeros(), 1.0),
//!         ImplicitObject::cuboid(Vec3::new(2.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 1.0)),
//!     ]);
//!     let mut handles = Vec::new();
//!     builder.create_meshes_from_implicit_object(&root, &mut handles, 1, &Transform::identity(), 2);
//!     for handle in &handles {
//!         builder.create_instanced_mesh_data(handle, 0, 0, MeshAttributes::empty());
//!     }
//!
//!     builder.tick(1.0 / 60.0);
//!     builder.deinitialize();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Core utilities
pub mod foundation;
pub mod config;
pub mod error;

// Shape model and pipeline stages
pub mod shapes;
pub mod mesh;
pub mod cache;
pub mod extraction;

// Render side
pub mod components;
pub mod pool;
pub mod scheduler;
pub mod scene;
pub mod builder;

#[cfg(test)]
mod tests;

pub use builder::{GeometryBuilder, GeometryBuilderStats};
pub use error::{GeometryError, GeometryResult};

/// Common imports for library users
pub mod prelude {
    pub use crate::{
        builder::{GeometryBuilder, GeometryBuilderStats},
        components::{ComponentId, GeometryComponent, InstanceRef, MaterialKind, MeshAttributes},
        config::{Config, GeometrySettings},
        error::{GeometryError, GeometryResult},
        extraction::ExtractedGeometryDataHandle,
        foundation::math::{Quat, Transform, Vec3, Vec4},
        mesh::RenderableMesh,
        scene::GeometrySceneEvents,
        scheduler::TickSummary,
        shapes::{GeometryKey, ImplicitObject, ImplicitRef},
    };
}

//! Render components fed by the geometry pipeline
//!
//! The pipeline never depends on a concrete component type. It talks to the
//! [`GeometryComponent`] capability trait; the two implementations shipped
//! here cover the common cases:
//!
//! - [`StaticMeshComponent`]: one mesh, one render instance
//! - [`InstancedMeshComponent`]: one mesh, many render instances that share
//!   the same [`MeshAttributes`]
//!
//! [`InstancedMeshData`] is the particle side of a render instance. It is
//! shared between the particle that owns it and the component it is attached
//! to, so index changes made by the component are visible to the particle.

pub mod instance;
pub mod instanced_mesh;
pub mod static_mesh;

pub use instance::{InstanceRef, InstanceState, InstancedMeshData, ShapeCollisionData};
pub use instanced_mesh::InstancedMeshComponent;
pub use static_mesh::StaticMeshComponent;

use crate::foundation::math::{Transform, Vec4};
use crate::mesh::RenderableMesh;
use crate::shapes::GeometryKey;
use bitflags::bitflags;
use std::sync::Arc;

slotmap::new_key_type! {
    /// Key of a live component in the component container
    pub struct ComponentId;
}

bitflags! {
    /// Flags selecting which component bucket an instance belongs to
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MeshAttributes: u8 {
        /// Negative determinant transform, needs flipped culling
        const MIRRORED = 1 << 0;
        /// Rendered with the translucent material
        const TRANSLUCENT = 1 << 1;
    }
}

/// Material family a component is drawn with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialKind {
    /// Opaque debug material
    Opaque,
    /// Translucent debug material
    Translucent,
}

impl MaterialKind {
    /// Material required by a set of mesh attributes
    pub fn for_attributes(attributes: MeshAttributes) -> Self {
        if attributes.contains(MeshAttributes::TRANSLUCENT) {
            Self::Translucent
        } else {
            Self::Opaque
        }
    }
}

/// Concrete component family, used to route disposal to the right pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    /// [`StaticMeshComponent`]
    Static,
    /// [`InstancedMeshComponent`]
    Instanced,
}

/// Capability set the pipeline needs from a render component
pub trait GeometryComponent: Send {
    /// Concrete family
    fn kind(&self) -> ComponentKind;

    /// Debug name
    fn name(&self) -> &str;

    /// Geometry key the component displays, if assigned
    fn geometry_key(&self) -> Option<GeometryKey>;

    /// Assign the geometry key; drops any mesh built for another key
    fn set_geometry_key(&mut self, key: GeometryKey);

    /// Mesh currently applied
    fn mesh(&self) -> Option<&Arc<RenderableMesh>>;

    /// Returns true once a mesh has been applied
    fn is_mesh_ready(&self) -> bool {
        self.mesh().is_some()
    }

    /// Apply a built mesh
    fn apply_mesh(&mut self, mesh: Arc<RenderableMesh>);

    /// Bucket flags
    fn mesh_attributes(&self) -> MeshAttributes;

    /// Change the bucket flags
    fn set_mesh_attributes(&mut self, attributes: MeshAttributes);

    /// Assigned material
    fn material(&self) -> Option<MaterialKind>;

    /// Assign a material
    fn assign_material(&mut self, material: MaterialKind);

    /// Add a render instance and return its index
    fn add_instance(&mut self, state: InstanceState) -> usize;

    /// Remove the instance at `index`
    ///
    /// Removal swaps the last instance into `index`. Returns the previous
    /// index of the moved instance, or `None` if nothing moved.
    fn remove_instance(&mut self, index: usize) -> Option<usize>;

    /// Number of render instances
    fn instance_count(&self) -> usize;

    /// Render state of one instance
    fn instance(&self, index: usize) -> Option<&InstanceState>;

    /// Update visibility; false if the index is out of range
    fn set_instance_visibility(&mut self, index: usize, visible: bool) -> bool;

    /// Update color; false if the index is out of range
    fn set_instance_color(&mut self, index: usize, color: Vec4) -> bool;

    /// Update world transform; false if the index is out of range
    fn set_instance_transform(&mut self, index: usize, transform: Transform) -> bool;

    /// Update selection; false if the index is out of range
    fn set_instance_selected(&mut self, index: usize, selected: bool) -> bool;

    /// Return to the blank pooled state
    fn reset(&mut self);
}

/// State every component carries regardless of instance layout
#[derive(Debug, Clone, Default)]
pub(crate) struct ComponentCore {
    pub(crate) owner: String,
    pub(crate) name: String,
    pub(crate) geometry_key: Option<GeometryKey>,
    pub(crate) mesh: Option<Arc<RenderableMesh>>,
    pub(crate) attributes: MeshAttributes,
    pub(crate) material: Option<MaterialKind>,
}

impl ComponentCore {
    pub(crate) fn set_geometry_key(&mut self, key: GeometryKey) {
        if self.geometry_key != Some(key) {
            self.mesh = None;
        }
        self.geometry_key = Some(key);
    }

    pub(crate) fn apply_mesh(&mut self, mesh: Arc<RenderableMesh>) {
        if self.geometry_key.is_some_and(|key| key != mesh.key()) {
            log::warn!(
                "Component '{}' expected key {:08x?} but received mesh {}",
                self.name,
                self.geometry_key,
                mesh.name()
            );
        }
        self.geometry_key = Some(mesh.key());
        self.mesh = Some(mesh);
    }

    pub(crate) fn acquire(&mut self, owner: &str, name: &str) {
        self.owner = owner.to_string();
        self.name = name.to_string();
    }
}

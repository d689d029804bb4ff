//! Particle-side render instance data

use super::{ComponentId, MeshAttributes};
use crate::extraction::ExtractedGeometryDataHandle;
use crate::foundation::math::{Transform, Vec4};
use parking_lot::RwLock;
use std::sync::Arc;

/// Shared handle to an instance
pub type InstanceRef = Arc<RwLock<InstancedMeshData>>;

/// Collision flags recorded for one shape of a particle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShapeCollisionData {
    /// Shape takes part in scene queries
    pub query_enabled: bool,
    /// Shape takes part in simulation contacts
    pub simulation_enabled: bool,
    /// Shape only reports overlaps
    pub is_probe: bool,
}

/// Per-instance state pushed into a component
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstanceState {
    /// World transform of the mesh (particle transform times handle transform)
    pub transform: Transform,
    /// RGBA color
    pub color: Vec4,
    /// Drawn at all
    pub visible: bool,
    /// Drawn with the selection highlight
    pub selected: bool,
}

impl Default for InstanceState {
    fn default() -> Self {
        Self {
            transform: Transform::identity(),
            color: Vec4::new(1.0, 1.0, 1.0, 1.0),
            visible: true,
            selected: false,
        }
    }
}

/// One render instance of a geometry handle for one particle
#[derive(Debug, Clone)]
pub struct InstancedMeshData {
    handle: ExtractedGeometryDataHandle,
    pub(crate) component: Option<ComponentId>,
    pub(crate) instance_index: Option<usize>,
    /// Recorded particle id
    pub particle_id: i32,
    /// Recorded solver id
    pub solver_id: i32,
    /// Particle world transform
    pub world_transform: Transform,
    /// RGBA color
    pub color: Vec4,
    /// Visibility
    pub visible: bool,
    /// Selection state
    pub selected: bool,
    /// Bucket flags
    pub attributes: MeshAttributes,
    /// Collision flags of the shape this instance draws
    pub shape_data: ShapeCollisionData,
}

impl InstancedMeshData {
    /// Create detached instance data
    pub fn new(handle: ExtractedGeometryDataHandle, particle_id: i32, solver_id: i32, attributes: MeshAttributes) -> Self {
        Self {
            handle,
            component: None,
            instance_index: None,
            particle_id,
            solver_id,
            world_transform: Transform::identity(),
            color: Vec4::new(1.0, 1.0, 1.0, 1.0),
            visible: true,
            selected: false,
            attributes,
            shape_data: ShapeCollisionData::default(),
        }
    }

    /// Wrap into a shared reference
    pub fn into_shared(self) -> InstanceRef {
        Arc::new(RwLock::new(self))
    }

    /// Geometry handle this instance draws
    pub fn handle(&self) -> &ExtractedGeometryDataHandle {
        &self.handle
    }

    /// Component the instance is attached to
    pub fn component(&self) -> Option<ComponentId> {
        self.component
    }

    /// Index inside the component, `None` while pending or detached
    pub fn instance_index(&self) -> Option<usize> {
        self.instance_index
    }

    /// Render state derived from this data
    pub fn render_state(&self) -> InstanceState {
        InstanceState {
            transform: self.world_transform.combine(self.handle.relative_transform()),
            color: self.color,
            visible: self.visible,
            selected: self.selected,
        }
    }
}

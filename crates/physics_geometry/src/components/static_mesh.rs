//! Single-instance mesh component

use super::{ComponentCore, ComponentKind, GeometryComponent, InstanceState, MaterialKind, MeshAttributes};
use crate::foundation::math::{Transform, Vec4};
use crate::mesh::RenderableMesh;
use crate::pool::Poolable;
use crate::shapes::GeometryKey;
use std::sync::Arc;

/// Component drawing one mesh once
///
/// Adding an instance while one is present replaces it.
#[derive(Debug, Clone, Default)]
pub struct StaticMeshComponent {
    core: ComponentCore,
    instance: Option<InstanceState>,
}

impl StaticMeshComponent {
    /// Owner context set at acquisition
    pub fn owner(&self) -> &str {
        &self.core.owner
    }
}

impl Poolable for StaticMeshComponent {
    fn create_pooled() -> Self {
        Self::default()
    }

    fn on_acquire(&mut self, owner: &str, name: &str) {
        self.core.acquire(owner, name);
    }

    fn reset_pooled(&mut self) {
        self.reset();
    }
}

impl GeometryComponent for StaticMeshComponent {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Static
    }

    fn name(&self) -> &str {
        &self.core.name
    }

    fn geometry_key(&self) -> Option<GeometryKey> {
        self.core.geometry_key
    }

    fn set_geometry_key(&mut self, key: GeometryKey) {
        self.core.set_geometry_key(key);
    }

    fn mesh(&self) -> Option<&Arc<RenderableMesh>> {
        self.core.mesh.as_ref()
    }

    fn apply_mesh(&mut self, mesh: Arc<RenderableMesh>) {
        self.core.apply_mesh(mesh);
    }

    fn mesh_attributes(&self) -> MeshAttributes {
        self.core.attributes
    }

    fn set_mesh_attributes(&mut self, attributes: MeshAttributes) {
        self.core.attributes = attributes;
    }

    fn material(&self) -> Option<MaterialKind> {
        self.core.material
    }

    fn assign_material(&mut self, material: MaterialKind) {
        self.core.material = Some(material);
    }

    fn add_instance(&mut self, state: InstanceState) -> usize {
        self.instance = Some(state);
        0
    }

    fn remove_instance(&mut self, index: usize) -> Option<usize> {
        if index == 0 {
            self.instance = None;
        }
        None
    }

    fn instance_count(&self) -> usize {
        usize::from(self.instance.is_some())
    }

    fn instance(&self, index: usize) -> Option<&InstanceState> {
        if index == 0 {
            self.instance.as_ref()
        } else {
            None
        }
    }

    fn set_instance_visibility(&mut self, index: usize, visible: bool) -> bool {
        match self.instance.as_mut().filter(|_| index == 0) {
            Some(instance) => {
                instance.visible = visible;
                true
            }
            None => false,
        }
    }

    fn set_instance_color(&mut self, index: usize, color: Vec4) -> bool {
        match self.instance.as_mut().filter(|_| index == 0) {
            Some(instance) => {
                instance.color = color;
                true
            }
            None => false,
        }
    }

    fn set_instance_transform(&mut self, index: usize, transform: Transform) -> bool {
        match self.instance.as_mut().filter(|_| index == 0) {
            Some(instance) => {
                instance.transform = transform;
                true
            }
            None => false,
        }
    }

    fn set_instance_selected(&mut self, index: usize, selected: bool) -> bool {
        match self.instance.as_mut().filter(|_| index == 0) {
            Some(instance) => {
                instance.selected = selected;
                true
            }
            None => false,
        }
    }

    fn reset(&mut self) {
        self.core = ComponentCore::default();
        self.instance = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_instance_is_replaced() {
        let mut component = StaticMeshComponent::create_pooled();
        component.add_instance(InstanceState::default());
        let index = component.add_instance(InstanceState {
            visible: false,
            ..InstanceState::default()
        });

        assert_eq!(index, 0);
        assert_eq!(component.instance_count(), 1);
        assert!(!component.instance(0).unwrap().visible);
        assert!(!component.set_instance_selected(1, true));
    }

    #[test]
    fn test_reset_returns_to_blank_state() {
        let mut component = StaticMeshComponent::create_pooled();
        component.on_acquire("scene", "static_0");
        component.set_geometry_key(5);
        component.assign_material(MaterialKind::Opaque);
        component.add_instance(InstanceState::default());

        component.reset_pooled();

        assert_eq!(component.name(), "");
        assert_eq!(component.owner(), "");
        assert!(component.geometry_key().is_none());
        assert!(component.material().is_none());
        assert_eq!(component.instance_count(), 0);
    }
}

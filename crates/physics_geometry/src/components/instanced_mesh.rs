//! Multi-instance mesh component
//!
//! Every instance of a component shares its mesh, material and mesh
//! attributes. Instances are stored densely; removal swaps the last instance
//! into the freed slot so the caller must re-index the moved instance.

use super::{ComponentCore, ComponentKind, GeometryComponent, InstanceState, MaterialKind, MeshAttributes};
use crate::foundation::math::{Transform, Vec4};
use crate::mesh::RenderableMesh;
use crate::pool::Poolable;
use crate::shapes::GeometryKey;
use std::sync::Arc;

/// Component drawing one mesh many times
#[derive(Debug, Clone, Default)]
pub struct InstancedMeshComponent {
    core: ComponentCore,
    instances: Vec<InstanceState>,
}

impl InstancedMeshComponent {
    /// Owner context set at acquisition
    pub fn owner(&self) -> &str {
        &self.core.owner
    }

    /// All instances in index order
    pub fn instances(&self) -> &[InstanceState] {
        &self.instances
    }

    /// Number of instances currently drawn
    pub fn visible_instance_count(&self) -> usize {
        self.instances.iter().filter(|instance| instance.visible).count()
    }

    fn update(&mut self, index: usize, apply: impl FnOnce(&mut InstanceState)) -> bool {
        match self.instances.get_mut(index) {
            Some(instance) => {
                apply(instance);
                true
            }
            None => false,
        }
    }
}

impl Poolable for InstancedMeshComponent {
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

impl GeometryComponent for InstancedMeshComponent {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Instanced
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
        self.instances.push(state);
        self.instances.len() - 1
    }

    fn remove_instance(&mut self, index: usize) -> Option<usize> {
        if index >= self.instances.len() {
            return None;
        }
        let last = self.instances.len() - 1;
        self.instances.swap_remove(index);
        (index != last).then_some(last)
    }

    fn instance_count(&self) -> usize {
        self.instances.len()
    }

    fn instance(&self, index: usize) -> Option<&InstanceState> {
        self.instances.get(index)
    }

    fn set_instance_visibility(&mut self, index: usize, visible: bool) -> bool {
        self.update(index, |instance| instance.visible = visible)
    }

    fn set_instance_color(&mut self, index: usize, color: Vec4) -> bool {
        self.update(index, |instance| instance.color = color)
    }

    fn set_instance_transform(&mut self, index: usize, transform: Transform) -> bool {
        self.update(index, |instance| instance.transform = transform)
    }

    fn set_instance_selected(&mut self, index: usize, selected: bool) -> bool {
        self.update(index, |instance| instance.selected = selected)
    }

    fn reset(&mut self) {
        self.core = ComponentCore::default();
        self.instances.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;

    fn at(x: f32) -> InstanceState {
        InstanceState {
            transform: Transform::from_position(Vec3::new(x, 0.0, 0.0)),
            ..InstanceState::default()
        }
    }

    #[test]
    fn test_remove_swaps_last_into_slot() {
        let mut component = InstancedMeshComponent::create_pooled();
        for x in 0..3 {
            component.add_instance(at(x as f32));
        }

        assert_eq!(component.remove_instance(0), Some(2));
        assert_eq!(component.instance_count(), 2);
        assert_eq!(component.instance(0).unwrap().transform.position.x, 2.0);

        assert_eq!(component.remove_instance(1), None);
        assert_eq!(component.remove_instance(7), None);
        assert_eq!(component.instance_count(), 1);
    }

    #[test]
    fn test_updates_target_one_instance() {
        let mut component = InstancedMeshComponent::create_pooled();
        component.add_instance(at(0.0));
        component.add_instance(at(1.0));

        assert!(component.set_instance_visibility(1, false));
        assert!(component.set_instance_color(0, Vec4::new(1.0, 0.0, 0.0, 1.0)));
        assert!(!component.set_instance_transform(2, Transform::identity()));

        assert_eq!(component.visible_instance_count(), 1);
        assert_eq!(component.instances()[0].color, Vec4::new(1.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn test_new_key_drops_mesh() {
        let mut component = InstancedMeshComponent::create_pooled();
        let generator = crate::mesh::generators::BoxGenerator {
            center: Vec3::zeros(),
            half_extents: Vec3::new(0.5, 0.5, 0.5),
        };
        let mesh = Arc::new(RenderableMesh::build(1, &generator, 1, crate::mesh::MeshBuildOptions::default()));

        component.set_geometry_key(1);
        component.apply_mesh(mesh);
        assert!(component.is_mesh_ready());

        component.set_geometry_key(1);
        assert!(component.is_mesh_ready());
        component.set_geometry_key(2);
        assert!(!component.is_mesh_ready());
    }
}

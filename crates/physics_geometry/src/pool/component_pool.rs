//! Live render components and their recycling pools
//!
//! [`MeshComponentPool`] owns every live component in a slotmap container and
//! recycles released ones through one [`ObjectPool`] per component family.
//! Instanced components are bucketed by (geometry key, mesh attributes): all
//! instances of one mesh with the same flags share one component.

use super::object_pool::{ObjectPool, PoolConfig, PoolStats};
use crate::components::{
    ComponentId, ComponentKind, GeometryComponent, InstanceRef, InstancedMeshComponent, MeshAttributes,
    StaticMeshComponent,
};
use crate::shapes::GeometryKey;
use rayon::ThreadPool;
use slotmap::SlotMap;
use std::collections::HashMap;
use std::sync::Arc;

/// A live component of either family
#[derive(Debug)]
pub enum PooledComponent {
    /// Single-instance component
    Static(StaticMeshComponent),
    /// Multi-instance component
    Instanced(InstancedMeshComponent),
}

impl PooledComponent {
    /// Capability view
    pub fn as_component(&self) -> &dyn GeometryComponent {
        match self {
            Self::Static(component) => component,
            Self::Instanced(component) => component,
        }
    }

    /// Mutable capability view
    pub fn as_component_mut(&mut self) -> &mut dyn GeometryComponent {
        match self {
            Self::Static(component) => component,
            Self::Instanced(component) => component,
        }
    }
}

/// Container slot: the component plus the instance data attached to it
#[derive(Debug)]
pub struct ComponentEntry {
    component: PooledComponent,
    instances: Vec<InstanceRef>,
    bucket: Option<(GeometryKey, MeshAttributes)>,
}

impl ComponentEntry {
    /// Capability view of the component
    pub fn component(&self) -> &dyn GeometryComponent {
        self.component.as_component()
    }

    /// Mutable capability view of the component
    pub fn component_mut(&mut self) -> &mut dyn GeometryComponent {
        self.component.as_component_mut()
    }

    /// Attached instance data, in component index order
    pub fn instances(&self) -> &[InstanceRef] {
        &self.instances
    }
}

/// Counter snapshot of the component pools
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ComponentPoolStats {
    /// Components currently alive in the container
    pub live_components: usize,
    /// Instanced buckets currently alive
    pub instanced_buckets: usize,
    /// Static component pool counters
    pub static_pool: PoolStats,
    /// Instanced component pool counters
    pub instanced_pool: PoolStats,
}

impl ComponentPoolStats {
    /// Hit ratio across both pools
    pub fn hit_ratio(&self) -> f32 {
        let requests = self.static_pool.requests + self.instanced_pool.requests;
        if requests == 0 {
            0.0
        } else {
            (self.static_pool.hits + self.instanced_pool.hits) as f32 / requests as f32
        }
    }
}

/// Owner of every live render component
pub struct MeshComponentPool {
    owner: String,
    static_pool: Arc<ObjectPool<StaticMeshComponent>>,
    instanced_pool: Arc<ObjectPool<InstancedMeshComponent>>,
    components: SlotMap<ComponentId, ComponentEntry>,
    buckets: HashMap<(GeometryKey, MeshAttributes), ComponentId>,
    spawned: usize,
}

impl MeshComponentPool {
    /// Create empty pools for components owned by `owner`
    pub fn new(owner: &str, config: PoolConfig, workers: Option<Arc<ThreadPool>>) -> Self {
        Self {
            owner: owner.to_string(),
            static_pool: ObjectPool::new("static_mesh_components", config, workers.clone()),
            instanced_pool: ObjectPool::new("instanced_mesh_components", config, workers),
            components: SlotMap::with_key(),
            buckets: HashMap::new(),
            spawned: 0,
        }
    }

    /// Apply a new pool configuration to both pools
    pub fn set_config(&self, config: PoolConfig) {
        self.static_pool.set_config(config);
        self.instanced_pool.set_config(config);
    }

    /// Kick off background growth of both pools toward their floor
    pub fn prewarm(&self) {
        self.static_pool.request_growth();
        self.instanced_pool.request_growth();
    }

    fn next_name(&mut self, prefix: &str) -> String {
        self.spawned += 1;
        format!("{prefix}_{}", self.spawned)
    }

    /// Acquire a static component into the container
    pub fn acquire_static(&mut self, key: GeometryKey, attributes: MeshAttributes) -> ComponentId {
        let name = self.next_name("static_mesh");
        let mut component = self.static_pool.acquire(&self.owner, &name);
        component.set_geometry_key(key);
        component.set_mesh_attributes(attributes);

        self.components.insert(ComponentEntry {
            component: PooledComponent::Static(component),
            instances: Vec::new(),
            bucket: None,
        })
    }

    /// Instanced component for (`key`, `attributes`), acquiring one if absent
    ///
    /// The flag is true when the component was newly acquired.
    pub fn find_or_acquire_instanced(&mut self, key: GeometryKey, attributes: MeshAttributes) -> (ComponentId, bool) {
        if let Some(&id) = self.buckets.get(&(key, attributes)) {
            if self.components.contains_key(id) {
                return (id, false);
            }
        }

        let name = self.next_name("instanced_mesh");
        let mut component = self.instanced_pool.acquire(&self.owner, &name);
        component.set_geometry_key(key);
        component.set_mesh_attributes(attributes);

        let id = self.components.insert(ComponentEntry {
            component: PooledComponent::Instanced(component),
            instances: Vec::new(),
            bucket: Some((key, attributes)),
        });
        self.buckets.insert((key, attributes), id);
        (id, true)
    }

    /// Returns true if `id` refers to a live component
    pub fn contains(&self, id: ComponentId) -> bool {
        self.components.contains_key(id)
    }

    /// Live component entry
    pub fn entry(&self, id: ComponentId) -> Option<&ComponentEntry> {
        self.components.get(id)
    }

    /// Live component
    pub fn get(&self, id: ComponentId) -> Option<&dyn GeometryComponent> {
        self.components.get(id).map(ComponentEntry::component)
    }

    /// Mutable live component
    pub fn get_mut(&mut self, id: ComponentId) -> Option<&mut dyn GeometryComponent> {
        self.components.get_mut(id).map(ComponentEntry::component_mut)
    }

    /// Iterate every live component
    pub fn iter(&self) -> impl Iterator<Item = (ComponentId, &dyn GeometryComponent)> {
        self.components.iter().map(|(id, entry)| (id, entry.component()))
    }

    /// Attach `instance` to component `id`; returns the new instance index
    pub fn attach_instance(&mut self, id: ComponentId, instance: &InstanceRef) -> Option<usize> {
        let entry = self.components.get_mut(id)?;
        let mut data = instance.write();
        let index = entry.component_mut().add_instance(data.render_state());

        if entry.component().kind() == ComponentKind::Static {
            for previous in entry.instances.drain(..) {
                if !Arc::ptr_eq(&previous, instance) {
                    let mut previous = previous.write();
                    previous.component = None;
                    previous.instance_index = None;
                }
            }
        }

        data.component = Some(id);
        data.instance_index = Some(index);
        entry.instances.push(instance.clone());
        Some(index)
    }

    /// Detach `instance` from its component
    ///
    /// Returns the component it was attached to and that component's remaining
    /// instance count. Detached or stale instances return `None`.
    pub fn detach_instance(&mut self, instance: &InstanceRef) -> Option<(ComponentId, usize)> {
        let (id, index) = {
            let mut data = instance.write();
            let id = data.component.take()?;
            let index = data.instance_index.take()?;
            (id, index)
        };

        let entry = self.components.get_mut(id)?;
        if !entry.instances.get(index).is_some_and(|attached| Arc::ptr_eq(attached, instance)) {
            log::warn!("Instance index {index} out of sync with component '{}'", entry.component().name());
            return None;
        }

        let moved_from = entry.component_mut().remove_instance(index);
        entry.instances.swap_remove(index);
        if moved_from.is_some() {
            if let Some(moved) = entry.instances.get(index) {
                moved.write().instance_index = Some(index);
            }
        }

        Some((id, entry.component().instance_count()))
    }

    /// Remove component `id` from the container and recycle it
    pub fn release(&mut self, id: ComponentId) -> bool {
        let Some(entry) = self.components.remove(id) else {
            return false;
        };

        if let Some(bucket) = entry.bucket {
            if self.buckets.get(&bucket) == Some(&id) {
                self.buckets.remove(&bucket);
            }
        }

        for instance in &entry.instances {
            let mut data = instance.write();
            data.component = None;
            data.instance_index = None;
        }

        match entry.component {
            PooledComponent::Static(component) => self.static_pool.dispose(component),
            PooledComponent::Instanced(component) => self.instanced_pool.dispose(component),
        }
        true
    }

    /// Number of live components
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Returns true if no component is alive
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Drop every live and pooled component
    pub fn clear(&mut self) {
        for (_, entry) in self.components.drain() {
            for instance in &entry.instances {
                let mut data = instance.write();
                data.component = None;
                data.instance_index = None;
            }
        }
        self.buckets.clear();
        self.static_pool.clear();
        self.instanced_pool.clear();
    }

    /// Counter snapshot
    pub fn stats(&self) -> ComponentPoolStats {
        ComponentPoolStats {
            live_components: self.components.len(),
            instanced_buckets: self.buckets.len(),
            static_pool: self.static_pool.stats(),
            instanced_pool: self.instanced_pool.stats(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{GeometryCache, HashCache};
    use crate::components::InstancedMeshData;
    use crate::extraction::MeshDataHandleFactory;
    use crate::foundation::math::{Transform, Vec3};
    use crate::shapes::ImplicitObject;

    fn pool() -> MeshComponentPool {
        MeshComponentPool::new(
            "test_scene",
            PoolConfig {
                use_pool: true,
                floor_size: 0,
            },
            None,
        )
    }

    fn instance(particle_id: i32) -> InstanceRef {
        let hashes = HashCache::new();
        let cache = Arc::new(GeometryCache::default());
        let mut factory = MeshDataHandleFactory::new(&hashes, &cache, true);
        let shape = ImplicitObject::sphere(Vec3::zeros(), 1.0);
        let handle = factory
            .extract_geometry_data_for_implicit(&shape, &Transform::identity(), 1)
            .unwrap();
        InstancedMeshData::new(handle, particle_id, 0, MeshAttributes::empty()).into_shared()
    }

    #[test]
    fn test_buckets_are_shared_per_key_and_attributes() {
        let mut pool = pool();
        let (a, created_a) = pool.find_or_acquire_instanced(1, MeshAttributes::empty());
        let (b, created_b) = pool.find_or_acquire_instanced(1, MeshAttributes::empty());
        let (c, _) = pool.find_or_acquire_instanced(1, MeshAttributes::TRANSLUCENT);

        assert!(created_a);
        assert!(!created_b);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(pool.stats().instanced_buckets, 2);
    }

    #[test]
    fn test_detach_reindexes_moved_instance() {
        let mut pool = pool();
        let (id, _) = pool.find_or_acquire_instanced(1, MeshAttributes::empty());
        let instances: Vec<InstanceRef> = (0..3).map(instance).collect();
        for instance in &instances {
            pool.attach_instance(id, instance);
        }

        assert_eq!(pool.detach_instance(&instances[0]), Some((id, 2)));
        assert_eq!(instances[2].read().instance_index(), Some(0));
        assert_eq!(instances[1].read().instance_index(), Some(1));
        assert!(instances[0].read().component().is_none());
        assert!(pool.detach_instance(&instances[0]).is_none());
    }

    #[test]
    fn test_release_recycles_into_pool() {
        let mut pool = pool();
        let (id, _) = pool.find_or_acquire_instanced(1, MeshAttributes::empty());
        let attached = instance(7);
        pool.attach_instance(id, &attached);

        assert!(pool.release(id));
        assert!(!pool.contains(id));
        assert!(attached.read().component().is_none());
        assert_eq!(pool.stats().instanced_pool.free, 1);

        let (recycled, created) = pool.find_or_acquire_instanced(2, MeshAttributes::empty());
        assert!(created);
        assert_eq!(pool.get(recycled).unwrap().instance_count(), 0);
        assert_eq!(pool.stats().instanced_pool.hits, 1);
    }

    #[test]
    fn test_static_component_keeps_one_instance() {
        let mut pool = pool();
        let id = pool.acquire_static(3, MeshAttributes::MIRRORED);
        let first = instance(1);
        let second = instance(2);

        pool.attach_instance(id, &first);
        pool.attach_instance(id, &second);

        assert_eq!(pool.entry(id).unwrap().instances().len(), 1);
        assert!(first.read().component().is_none());
        assert_eq!(second.read().instance_index(), Some(0));
        assert_eq!(pool.get(id).unwrap().mesh_attributes(), MeshAttributes::MIRRORED);
    }

    #[test]
    fn test_clear_detaches_everything() {
        let mut pool = pool();
        let (id, _) = pool.find_or_acquire_instanced(1, MeshAttributes::empty());
        let attached = instance(1);
        pool.attach_instance(id, &attached);

        pool.clear();

        assert!(pool.is_empty());
        assert!(attached.read().component().is_none());
        assert_eq!(pool.stats().instanced_pool.free, 0);
    }
}

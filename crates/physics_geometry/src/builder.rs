//! # Geometry Builder
//!
//! Orchestrates the pipeline for one scene: walking shape hierarchies,
//! launching mesh generation, and feeding finished meshes into pooled render
//! components.
//!
//! ## Lifecycle
//!
//! ```text
//! new(settings) ──► initialize(scene) ──► walk / create instances / tick ... ──► deinitialize()
//! ```
//!
//! Nothing in the public API blocks on mesh generation. The only blocking
//! wait is the bounded one in [`GeometryBuilder::deinitialize`], which gives
//! running tasks up to `shutdown_timeout_seconds` to finish before the caches
//! are cleared.

use crate::cache::{GeometryCache, GeometryCacheStats, HashCache};
use crate::components::{
    ComponentId, ComponentKind, GeometryComponent, InstanceRef, InstancedMeshData, MeshAttributes, ShapeCollisionData,
};
use crate::config::GeometrySettings;
use crate::error::{GeometryError, GeometryResult};
use crate::extraction::{
    prebuilt_shape, resolve_geometry_key, ExtractedGeometryDataHandle, HierarchyWalker, MeshDataHandleFactory,
    DEDUPLICATED_TYPES,
};
use crate::foundation::math::Transform;
use crate::foundation::time::Stopwatch;
use crate::mesh::{create_generator, has_generator, MeshBuildOptions, RenderableMesh};
use crate::pool::{ComponentPoolStats, MeshComponentPool, PoolConfig};
use crate::scene::GeometrySceneEvents;
use crate::scheduler::{BoundedQueueScheduler, TickContext, TickSummary};
use crate::shapes::{type_hash, GeometryKey, ImplicitRef};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

const COMPONENT_OWNER: &str = "geometry_builder";

/// Snapshot of pipeline counters
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GeometryBuilderStats {
    /// Mesh cache counters
    pub cache: GeometryCacheStats,
    /// Shapes with a memoized hash
    pub hashed_shapes: usize,
    /// Component container and pool counters
    pub components: ComponentPoolStats,
    /// Tasks waiting for launch
    pub launch_queue: usize,
    /// Components waiting for geometry
    pub waiting_for_geometry: usize,
    /// Components waiting for a material
    pub waiting_for_material: usize,
    /// Empty components waiting to return to their pool
    pub pending_disposal: usize,
}

impl GeometryBuilderStats {
    /// Fraction of component acquisitions served from the pools
    pub fn pool_hit_ratio(&self) -> f32 {
        self.components.hit_ratio()
    }
}

/// Pipeline orchestrator for one scene
pub struct GeometryBuilder {
    settings: GeometrySettings,
    workers: Arc<ThreadPool>,
    hash_cache: HashCache,
    geometry_cache: Arc<GeometryCache>,
    components: MeshComponentPool,
    scheduler: BoundedQueueScheduler,
    pending_disposal: Vec<ComponentId>,
    shape_collision_data: HashMap<GeometryKey, ShapeCollisionData>,
    scene: Option<Weak<dyn GeometrySceneEvents>>,
    initialized: bool,
}

fn build_options(settings: &GeometrySettings) -> MeshBuildOptions {
    MeshBuildOptions {
        use_custom_mesh_generator: settings.use_custom_mesh_generator,
        include_uvs: !settings.disable_uvs,
    }
}

fn pool_config(settings: &GeometrySettings) -> PoolConfig {
    PoolConfig {
        use_pool: settings.use_pool,
        floor_size: settings.pool_floor_size,
    }
}

impl GeometryBuilder {
    /// Create a builder and its generation worker pool
    pub fn new(settings: GeometrySettings) -> GeometryResult<Self> {
        let settings = settings.validated();
        let workers = Arc::new(
            ThreadPoolBuilder::new()
                .num_threads(settings.worker_threads)
                .thread_name(|index| format!("geometry-gen-{index}"))
                .build()?,
        );
        log::info!(
            "Geometry builder created with {} generation workers",
            workers.current_num_threads()
        );

        Ok(Self {
            geometry_cache: Arc::new(GeometryCache::new(build_options(&settings))),
            components: MeshComponentPool::new(COMPONENT_OWNER, pool_config(&settings), Some(workers.clone())),
            hash_cache: HashCache::new(),
            scheduler: BoundedQueueScheduler::new(),
            pending_disposal: Vec::new(),
            shape_collision_data: HashMap::new(),
            scene: None,
            initialized: false,
            workers,
            settings,
        })
    }

    /// Attach to the owning scene, seed shared meshes and warm the pools
    pub fn initialize(&mut self, scene: Weak<dyn GeometrySceneEvents>) {
        if self.initialized {
            log::warn!("Geometry builder initialized twice, replacing the scene");
        }
        self.scene = Some(scene);
        self.initialized = true;

        if self.settings.deduplicate_simple_geometry {
            self.seed_prebuilt_meshes();
        }
        self.components.prewarm();
        log::info!("Geometry builder initialized");
    }

    fn seed_prebuilt_meshes(&self) {
        for object_type in DEDUPLICATED_TYPES {
            let key = type_hash(object_type);
            if self.geometry_cache.has_geometry(key) {
                continue;
            }
            let Some(generator) = prebuilt_shape(object_type).and_then(|shape| create_generator(&shape, 1.0)) else {
                continue;
            };
            let mesh = RenderableMesh::build(
                key,
                generator.as_ref(),
                self.settings.default_lod_count,
                self.geometry_cache.build_options(),
            );
            self.geometry_cache.insert_mesh(key, mesh);
            log::debug!("Seeded shared {object_type} mesh under key {key:08x}");
        }
    }

    /// Returns true between `initialize` and `deinitialize`
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Stop generation, wait for running tasks, and clear every cache and pool
    ///
    /// Tasks still running after `shutdown_timeout_seconds` are abandoned;
    /// their results are discarded by the cache epoch check. Calling this
    /// again is a no-op.
    pub fn deinitialize(&mut self) {
        if !self.initialized {
            return;
        }
        self.initialized = false;

        for task in self.scheduler.take_pending_launches() {
            task.cancel_task();
            task.generate_geometry();
        }

        let running = self.geometry_cache.in_flight_tasks();
        for task in &running {
            task.cancel_task();
        }

        let waited = Stopwatch::start_new();
        let deadline = Instant::now() + Duration::from_secs_f32(self.settings.shutdown_timeout_seconds);
        let stragglers = running
            .iter()
            .filter(|task| !task.wait_for_completion(deadline))
            .count();
        if stragglers > 0 {
            log::warn!(
                "{stragglers} geometry task(s) still running after {}s, abandoning them",
                self.settings.shutdown_timeout_seconds
            );
        }

        log::debug!(
            "Waited {:.1} ms for {} running geometry task(s)",
            waited.elapsed_millis(),
            running.len()
        );

        self.geometry_cache.reset();
        self.hash_cache.reset();
        self.scheduler.clear();
        self.pending_disposal.clear();
        self.shape_collision_data.clear();
        self.components.clear();
        self.scene = None;
        log::info!("Geometry builder deinitialized");
    }

    fn handle_factory(&self) -> MeshDataHandleFactory<'_> {
        MeshDataHandleFactory::new(
            &self.hash_cache,
            &self.geometry_cache,
            self.settings.deduplicate_simple_geometry,
        )
    }

    /// Walk `root` and append one handle per extractable leaf to `out`
    ///
    /// Cache misses are queued for launch on the next tick.
    pub fn create_meshes_from_implicit_object(
        &mut self,
        root: &ImplicitRef,
        out: &mut Vec<ExtractedGeometryDataHandle>,
        lod_count: usize,
        transform: &Transform,
        available_shape_instance_count: usize,
    ) {
        let before = out.len();
        let dispatched = {
            let mut factory = self.handle_factory();
            HierarchyWalker::new(&mut factory, root.clone(), lod_count.max(1), available_shape_instance_count)
                .walk(root, out, transform, 0);
            factory.take_dispatched()
        };

        log::trace!(
            "Walked {} into {} handle(s), {} new generation task(s)",
            root.shape_type().inner,
            out.len() - before,
            dispatched.len()
        );
        self.scheduler.enqueue_launches(dispatched);
    }

    /// Handle for a single leaf shape, outside any hierarchy walk
    pub fn extract_geometry_data_for_implicit(
        &mut self,
        shape: &ImplicitRef,
        transform: &Transform,
    ) -> Option<ExtractedGeometryDataHandle> {
        let lod_count = self.settings.default_lod_count;
        let (handle, dispatched) = {
            let mut factory = self.handle_factory();
            let handle = factory.extract_geometry_data_for_implicit(shape, transform, lod_count);
            (handle, factory.take_dispatched())
        };
        self.scheduler.enqueue_launches(dispatched);
        handle
    }

    /// Returns true if the mesh for `shape` is already cached
    pub fn has_geometry_in_cache(&self, shape: &ImplicitRef) -> bool {
        resolve_geometry_key(&self.hash_cache, shape, self.settings.deduplicate_simple_geometry)
            .is_some_and(|key| self.geometry_cache.has_geometry(key))
    }

    /// Cached mesh for `shape`
    pub fn get_cached_mesh_for_implicit(&self, shape: &ImplicitRef) -> Option<Arc<RenderableMesh>> {
        resolve_geometry_key(&self.hash_cache, shape, self.settings.deduplicate_simple_geometry)
            .and_then(|key| self.geometry_cache.get_cached_mesh(key))
    }

    /// Queue component `id` to receive its mesh once generated
    pub fn request_mesh_for_component(&mut self, id: ComponentId) -> bool {
        if !self.components.contains(id) {
            return false;
        }
        self.scheduler.request_geometry(id)
    }

    /// Run one scheduler tick, then return emptied components to their pools
    pub fn tick(&mut self, delta_seconds: f32) -> TickSummary {
        if !self.initialized {
            return TickSummary::default();
        }

        let scene = self.scene.as_ref().and_then(Weak::upgrade);
        let mut summary = self.scheduler.tick(TickContext {
            budget_seconds: self.settings.generation_task_launch_budget_seconds,
            workers: &self.workers,
            cache: &self.geometry_cache,
            components: &mut self.components,
            scene: scene.as_deref(),
        });
        summary.disposed = self.dispose_empty_components();

        if !summary.is_idle() {
            log::debug!(
                "Tick ({delta_seconds:.3}s): launched {}, meshes applied {}, materials assigned {}, disposed {}",
                summary.launches.processed,
                summary.geometry.processed,
                summary.materials.processed,
                summary.disposed
            );
        }
        summary
    }

    fn dispose_empty_components(&mut self) -> usize {
        let mut disposed = 0;
        for id in std::mem::take(&mut self.pending_disposal) {
            let empty = self
                .components
                .get(id)
                .is_some_and(|component| component.instance_count() == 0);
            if empty && self.components.release(id) {
                disposed += 1;
            }
        }
        disposed
    }

    /// Create a render instance of `handle` in the shared instanced component
    /// for its geometry key and `attributes`
    pub fn create_instanced_mesh_data(
        &mut self,
        handle: &ExtractedGeometryDataHandle,
        particle_id: i32,
        solver_id: i32,
        attributes: MeshAttributes,
    ) -> InstanceRef {
        let instance = self.new_instance(handle, particle_id, solver_id, attributes);
        self.attach_to_bucket(&instance, handle.geometry_key(), attributes);
        instance
    }

    fn new_instance(
        &self,
        handle: &ExtractedGeometryDataHandle,
        particle_id: i32,
        solver_id: i32,
        attributes: MeshAttributes,
    ) -> InstanceRef {
        let mut data = InstancedMeshData::new(handle.clone(), particle_id, solver_id, attributes);
        data.shape_data = self.shape_collision_data(handle);
        data.into_shared()
    }

    /// Record the collision flags of the shape whose packed hash is
    /// `data_component_key`
    ///
    /// Instances created afterwards for handles with that key start with
    /// `data`. Returns the previously recorded flags.
    pub fn record_shape_collision_data(
        &mut self,
        data_component_key: GeometryKey,
        data: ShapeCollisionData,
    ) -> Option<ShapeCollisionData> {
        self.shape_collision_data.insert(data_component_key, data)
    }

    /// Recorded collision flags for `handle`, default flags if none were recorded
    pub fn shape_collision_data(&self, handle: &ExtractedGeometryDataHandle) -> ShapeCollisionData {
        self.shape_collision_data
            .get(&handle.data_component_key())
            .copied()
            .unwrap_or_default()
    }

    fn attach_to_bucket(&mut self, instance: &InstanceRef, key: GeometryKey, attributes: MeshAttributes) {
        let (id, created) = self.components.find_or_acquire_instanced(key, attributes);
        if created {
            log::trace!("New instanced component for key {key:08x} ({attributes:?})");
        }
        self.components.attach_instance(id, instance);
        self.request_mesh_for_component(id);
    }

    /// Create a static component drawing `handle` once
    ///
    /// Fails before `initialize` and for shapes that have no mesh generator.
    pub fn create_static_mesh_component(
        &mut self,
        handle: &ExtractedGeometryDataHandle,
        particle_id: i32,
        solver_id: i32,
        attributes: MeshAttributes,
    ) -> GeometryResult<InstanceRef> {
        if !self.initialized {
            return Err(GeometryError::NotInitialized);
        }
        let object_type = handle.concrete_shape().inner_type();
        if !has_generator(object_type) {
            return Err(GeometryError::UnsupportedShape(object_type));
        }

        let id = self.components.acquire_static(handle.geometry_key(), attributes);
        let instance = self.new_instance(handle, particle_id, solver_id, attributes);
        self.components.attach_instance(id, &instance);
        self.request_mesh_for_component(id);
        Ok(instance)
    }

    /// Change the bucket flags of `instance`, moving it to the matching component
    ///
    /// Returns true if the instance moved.
    pub fn update_instance_attributes(&mut self, instance: &InstanceRef, attributes: MeshAttributes) -> bool {
        let (current, key) = {
            let data = instance.read();
            (data.attributes, data.handle().geometry_key())
        };
        if current == attributes {
            return false;
        }

        let kind = instance
            .read()
            .component()
            .and_then(|id| self.components.get(id))
            .map(|component| component.kind());
        self.detach(instance);
        instance.write().attributes = attributes;
        match kind {
            Some(ComponentKind::Static) => {
                let id = self.components.acquire_static(key, attributes);
                self.components.attach_instance(id, instance);
                self.request_mesh_for_component(id);
            }
            _ => self.attach_to_bucket(instance, key, attributes),
        }
        true
    }

    /// Push the current transform, color, visibility and selection of
    /// `instance` into its component
    pub fn sync_instance_state(&mut self, instance: &InstanceRef) -> bool {
        let data = instance.read();
        let (Some(id), Some(index)) = (data.component(), data.instance_index()) else {
            return false;
        };
        let Some(component) = self.components.get_mut(id) else {
            return false;
        };

        let state = data.render_state();
        component.set_instance_transform(index, state.transform)
            && component.set_instance_color(index, state.color)
            && component.set_instance_visibility(index, state.visible)
            && component.set_instance_selected(index, state.selected)
    }

    /// Detach `instance` from its component
    ///
    /// A component left without instances goes back to its pool on the next
    /// tick. Returns false if the instance was not attached.
    pub fn remove_instanced_mesh_data(&mut self, instance: &InstanceRef) -> bool {
        self.detach(instance)
    }

    fn detach(&mut self, instance: &InstanceRef) -> bool {
        match self.components.detach_instance(instance) {
            Some((id, 0)) => {
                self.pending_disposal.push(id);
                true
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Live component
    pub fn component(&self, id: ComponentId) -> Option<&dyn GeometryComponent> {
        self.components.get(id)
    }

    /// Every live component
    pub fn components(&self) -> impl Iterator<Item = (ComponentId, &dyn GeometryComponent)> {
        self.components.iter()
    }

    /// Current settings
    pub fn settings(&self) -> &GeometrySettings {
        &self.settings
    }

    /// Replace the settings
    ///
    /// Build options apply to meshes generated from now on; meshes already
    /// cached are kept. The worker count only applies to new builders.
    pub fn apply_settings(&mut self, settings: GeometrySettings) {
        let settings = settings.validated();
        if settings.worker_threads != self.settings.worker_threads {
            log::warn!("Worker thread count changes take effect when the builder is recreated");
        }

        self.geometry_cache.set_build_options(build_options(&settings));
        self.components.set_config(pool_config(&settings));

        let enable_dedup = settings.deduplicate_simple_geometry && !self.settings.deduplicate_simple_geometry;
        self.settings = settings;
        if enable_dedup && self.initialized {
            self.seed_prebuilt_meshes();
        }
        log::info!("Geometry settings applied");
    }

    /// Counter snapshot
    pub fn stats(&self) -> GeometryBuilderStats {
        GeometryBuilderStats {
            cache: self.geometry_cache.stats(),
            hashed_shapes: self.hash_cache.len(),
            components: self.components.stats(),
            launch_queue: self.scheduler.launch_queue_len(),
            waiting_for_geometry: self.scheduler.geometry_queue_len(),
            waiting_for_material: self.scheduler.material_queue_len(),
            pending_disposal: self.pending_disposal.len(),
        }
    }

    /// Shared mesh cache
    pub fn geometry_cache(&self) -> &Arc<GeometryCache> {
        &self.geometry_cache
    }
}

impl Drop for GeometryBuilder {
    fn drop(&mut self) {
        self.deinitialize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use crate::scene::testing::RecordingScene;
    use crate::shapes::{ImplicitObject, ImplicitObjectType, Plane};

    fn settings() -> GeometrySettings {
        GeometrySettings::default()
            .with_worker_threads(2)
            .with_pool_floor_size(0)
            .with_tick_budget(0.05)
    }

    fn initialized(settings: GeometrySettings) -> (GeometryBuilder, Arc<RecordingScene>) {
        let scene = Arc::new(RecordingScene::default());
        let mut builder = GeometryBuilder::new(settings).unwrap();
        let events: Arc<dyn GeometrySceneEvents> = scene.clone();
        builder.initialize(Arc::downgrade(&events));
        (builder, scene)
    }

    #[test]
    fn test_initialize_seeds_shared_meshes() {
        let (builder, _scene) = initialized(settings());

        assert!(builder.geometry_cache().has_geometry(type_hash(ImplicitObjectType::Sphere)));
        assert!(builder.geometry_cache().has_geometry(type_hash(ImplicitObjectType::Box)));
        assert!(builder.has_geometry_in_cache(&ImplicitObject::sphere(Vec3::zeros(), 7.0)));
    }

    #[test]
    fn test_without_deduplication_nothing_is_seeded() {
        let (builder, _scene) = initialized(settings().with_deduplication(false));
        assert!(builder.geometry_cache().is_empty());
    }

    #[test]
    fn test_tick_before_initialize_is_idle() {
        let mut builder = GeometryBuilder::new(settings()).unwrap();
        assert!(builder.tick(0.016).is_idle());
    }

    #[test]
    fn test_static_component_requires_generator() {
        let (mut builder, _scene) = initialized(settings());
        let plane = Arc::new(ImplicitObject::Plane(Plane {
            point: Vec3::zeros(),
            normal: Vec3::z(),
        }));
        let handle = builder
            .extract_geometry_data_for_implicit(&plane, &Transform::identity())
            .unwrap();

        let result = builder.create_static_mesh_component(&handle, 1, 0, MeshAttributes::empty());
        assert!(matches!(result, Err(GeometryError::UnsupportedShape(ImplicitObjectType::Plane))));
    }

    #[test]
    fn test_static_component_before_initialize_fails() {
        let mut builder = GeometryBuilder::new(settings()).unwrap();
        let sphere = ImplicitObject::sphere(Vec3::zeros(), 1.0);
        let handle = builder
            .extract_geometry_data_for_implicit(&sphere, &Transform::identity())
            .unwrap();

        let result = builder.create_static_mesh_component(&handle, 1, 0, MeshAttributes::empty());
        assert!(matches!(result, Err(GeometryError::NotInitialized)));
    }

    #[test]
    fn test_attribute_change_moves_instance_between_buckets() {
        let (mut builder, _scene) = initialized(settings());
        let sphere = ImplicitObject::sphere(Vec3::zeros(), 1.0);
        let handle = builder
            .extract_geometry_data_for_implicit(&sphere, &Transform::identity())
            .unwrap();

        let instance = builder.create_instanced_mesh_data(&handle, 1, 0, MeshAttributes::empty());
        let first = instance.read().component().unwrap();

        assert!(builder.update_instance_attributes(&instance, MeshAttributes::TRANSLUCENT));
        assert!(!builder.update_instance_attributes(&instance, MeshAttributes::TRANSLUCENT));

        let second = instance.read().component().unwrap();
        assert_ne!(first, second);
        assert_eq!(builder.stats().pending_disposal, 1);

        let summary = builder.tick(0.016);
        assert_eq!(summary.disposed, 1);
        assert!(builder.component(first).is_none());
    }

    #[test]
    fn test_static_instance_stays_static_on_attribute_change() {
        let (mut builder, _scene) = initialized(settings());
        let capsule = ImplicitObject::capsule(Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0), 0.2);
        let handle = builder
            .extract_geometry_data_for_implicit(&capsule, &Transform::identity())
            .unwrap();
        let instance = builder
            .create_static_mesh_component(&handle, 1, 0, MeshAttributes::empty())
            .unwrap();
        let first = instance.read().component().unwrap();

        assert!(builder.update_instance_attributes(&instance, MeshAttributes::TRANSLUCENT));

        let second = instance.read().component().unwrap();
        assert_ne!(first, second);
        let component = builder.component(second).unwrap();
        assert_eq!(component.kind(), ComponentKind::Static);
        assert_eq!(component.instance_count(), 1);
        assert_eq!(component.mesh_attributes(), MeshAttributes::TRANSLUCENT);
        assert_eq!(instance.read().instance_index(), Some(0));

        builder.tick(0.016);
        assert!(builder.component(first).is_none());
        assert_eq!(builder.stats().components.instanced_buckets, 0);
    }

    #[test]
    fn test_instances_start_with_recorded_collision_data() {
        let (mut builder, _scene) = initialized(settings());
        let sphere = ImplicitObject::sphere(Vec3::zeros(), 1.0);
        let other = ImplicitObject::sphere(Vec3::zeros(), 3.0);
        let handle = builder
            .extract_geometry_data_for_implicit(&sphere, &Transform::identity())
            .unwrap();
        let other_handle = builder
            .extract_geometry_data_for_implicit(&other, &Transform::identity())
            .unwrap();
        let flags = ShapeCollisionData {
            query_enabled: true,
            simulation_enabled: false,
            is_probe: true,
        };

        assert!(builder.record_shape_collision_data(handle.data_component_key(), flags).is_none());

        let instance = builder.create_instanced_mesh_data(&handle, 1, 0, MeshAttributes::empty());
        let fixed = builder
            .create_static_mesh_component(&handle, 2, 0, MeshAttributes::empty())
            .unwrap();
        let unrecorded = builder.create_instanced_mesh_data(&other_handle, 3, 0, MeshAttributes::empty());

        assert_eq!(instance.read().shape_data, flags);
        assert_eq!(fixed.read().shape_data, flags);
        assert_eq!(unrecorded.read().shape_data, ShapeCollisionData::default());

        builder.deinitialize();
        assert_eq!(builder.shape_collision_data(&handle), ShapeCollisionData::default());
    }

    #[test]
    fn test_sync_pushes_instance_state() {
        let (mut builder, _scene) = initialized(settings());
        let sphere = ImplicitObject::sphere(Vec3::zeros(), 1.0);
        let handle = builder
            .extract_geometry_data_for_implicit(&sphere, &Transform::identity())
            .unwrap();
        let instance = builder.create_instanced_mesh_data(&handle, 1, 0, MeshAttributes::empty());

        {
            let mut data = instance.write();
            data.visible = false;
            data.world_transform = Transform::from_position(Vec3::new(0.0, 4.0, 0.0));
        }
        assert!(builder.sync_instance_state(&instance));

        let id = instance.read().component().unwrap();
        let state = *builder.component(id).unwrap().instance(0).unwrap();
        assert!(!state.visible);
        approx::assert_relative_eq!(state.transform.position, Vec3::new(0.0, 4.0, 0.0));
    }

    #[test]
    fn test_apply_settings_updates_build_options() {
        let (mut builder, _scene) = initialized(settings());
        let mut next = settings();
        next.disable_uvs = true;
        next.use_custom_mesh_generator = false;

        builder.apply_settings(next);

        let options = builder.geometry_cache().build_options();
        assert!(!options.include_uvs);
        assert!(!options.use_custom_mesh_generator);
    }

    #[test]
    fn test_deinitialize_is_idempotent() {
        let (mut builder, _scene) = initialized(settings());
        builder.deinitialize();
        builder.deinitialize();

        assert!(!builder.is_initialized());
        assert!(builder.geometry_cache().is_empty());
    }
}

//! Per-leaf geometry handles
//!
//! [`MeshDataHandleFactory::extract_geometry_data_for_implicit`] turns one
//! leaf shape into an [`ExtractedGeometryDataHandle`]:
//!
//! 1. hash the shape as found in the hierarchy (the data component key)
//! 2. unpack scaled and instanced wrappers into the concrete shape
//! 3. pick the cache key: the type tag hash for deduplicated boxes and
//!    spheres, the concrete content hash otherwise
//! 4. dispatch a generation task on a cache miss
//! 5. resolve the transform that places the mesh
//!
//! # Transform rules
//!
//! The relative transform is `parent * unpacked scale * local`, where `local`
//! depends on the concrete shape:
//!
//! - capsule: translate to the segment midpoint, rotate +Z onto the segment
//! - deduplicated sphere: translate to the center, uniform scale by radius
//! - deduplicated box: translate to the center, scale by the full extents
//! - plain sphere: translate to the center
//! - anything else: identity (the mesh already encodes placement)

use crate::cache::{GenerationTask, GeometryCache, HashCache};
use crate::foundation::math::{rotation_from_z_to, Transform, Vec3};
use crate::shapes::{
    needs_unpacking, type_hash, unpack, GeometryKey, ImplicitObject, ImplicitObjectType, ImplicitRef,
};
use std::sync::Arc;

/// Shape kinds that share one pre-built mesh when deduplication is enabled
pub const DEDUPLICATED_TYPES: [ImplicitObjectType; 2] = [ImplicitObjectType::Sphere, ImplicitObjectType::Box];

/// Canonical shape a deduplicated kind's shared mesh is built from
///
/// Unit sphere (radius 1) and unit box (size 1) at the origin, so an instance
/// scale equal to the radius or the extents reproduces the original shape.
pub fn prebuilt_shape(object_type: ImplicitObjectType) -> Option<ImplicitRef> {
    match object_type {
        ImplicitObjectType::Sphere => Some(ImplicitObject::sphere(Vec3::zeros(), 1.0)),
        ImplicitObjectType::Box => Some(ImplicitObject::cuboid(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0))),
        _ => None,
    }
}

/// Everything needed to render one leaf shape of a particle
#[derive(Debug, Clone)]
pub struct ExtractedGeometryDataHandle {
    root_shape: Option<ImplicitRef>,
    leaf_shape: ImplicitRef,
    concrete_shape: ImplicitRef,
    relative_transform: Transform,
    shape_instance_index: usize,
    geometry_key: GeometryKey,
    data_component_key: GeometryKey,
    uses_prebuilt_mesh: bool,
}

impl ExtractedGeometryDataHandle {
    /// Root of the hierarchy this leaf was found in
    pub fn root_shape(&self) -> Option<&ImplicitRef> {
        self.root_shape.as_ref()
    }

    /// Leaf as found in the hierarchy (possibly packed)
    pub fn leaf_shape(&self) -> &ImplicitRef {
        &self.leaf_shape
    }

    /// Unpacked shape the mesh is generated from
    pub fn concrete_shape(&self) -> &ImplicitRef {
        &self.concrete_shape
    }

    /// Transform placing the mesh relative to the particle
    pub fn relative_transform(&self) -> &Transform {
        &self.relative_transform
    }

    /// Index into the particle's per-shape data
    pub fn shape_instance_index(&self) -> usize {
        self.shape_instance_index
    }

    /// Geometry cache key
    pub fn geometry_key(&self) -> GeometryKey {
        self.geometry_key
    }

    /// Hash of the packed leaf, used to correlate per-shape collision data
    pub fn data_component_key(&self) -> GeometryKey {
        self.data_component_key
    }

    /// True when the mesh is a shared unit mesh sized by the transform scale
    pub fn uses_prebuilt_mesh(&self) -> bool {
        self.uses_prebuilt_mesh
    }

    pub(crate) fn set_root_shape(&mut self, root: ImplicitRef) {
        self.root_shape = Some(root);
    }

    pub(crate) fn set_shape_instance_index(&mut self, index: usize) {
        self.shape_instance_index = index;
    }

    /// Overwrite every field with `other`'s, keeping this allocation
    pub fn copy_from(&mut self, other: &ExtractedGeometryDataHandle) {
        self.clone_from(other);
    }
}

/// Builds handles and dispatches generation for cache misses
pub struct MeshDataHandleFactory<'a> {
    hash_cache: &'a HashCache,
    geometry_cache: &'a Arc<GeometryCache>,
    deduplicate_simple_geometry: bool,
    reserved_keys: [GeometryKey; 2],
    dispatched: Vec<Arc<GenerationTask>>,
}

impl<'a> MeshDataHandleFactory<'a> {
    /// Create a factory over the given caches
    pub fn new(hash_cache: &'a HashCache, geometry_cache: &'a Arc<GeometryCache>, deduplicate_simple_geometry: bool) -> Self {
        Self {
            hash_cache,
            geometry_cache,
            deduplicate_simple_geometry,
            reserved_keys: DEDUPLICATED_TYPES.map(type_hash),
            dispatched: Vec::new(),
        }
    }

    /// Build the handle for one leaf shape placed by `transform`
    ///
    /// Returns `None` when the shape cannot be unpacked. Shapes without a mesh
    /// generator still get a handle; their task completes without a mesh.
    pub fn extract_geometry_data_for_implicit(
        &mut self,
        shape: &ImplicitRef,
        transform: &Transform,
        lod_count: usize,
    ) -> Option<ExtractedGeometryDataHandle> {
        let packed_hash = self.hash_cache.get_and_cache_geometry_hash(shape);
        let resolved = resolve_leaf(self.hash_cache, shape, self.deduplicate_simple_geometry)?;

        let concrete_type = resolved.concrete.inner_type();
        let content_key = if resolved.uses_prebuilt_mesh {
            self.hash_cache.get_and_cache_geometry_hash(&resolved.concrete)
        } else {
            resolved.key
        };
        self.check_reserved_collision(content_key, concrete_type);

        if !self.geometry_cache.has_geometry(resolved.key) {
            let generation_shape = if resolved.uses_prebuilt_mesh {
                prebuilt_shape(concrete_type).unwrap_or_else(|| resolved.concrete.clone())
            } else {
                resolved.concrete.clone()
            };
            self.dispatch(resolved.key, generation_shape, lod_count);
        }

        let local = local_transform(&resolved.concrete, resolved.uses_prebuilt_mesh);
        let relative_transform = transform.combine(&resolved.unpacked_transform).combine(&local);

        Some(ExtractedGeometryDataHandle {
            root_shape: None,
            leaf_shape: shape.clone(),
            concrete_shape: resolved.concrete,
            relative_transform,
            shape_instance_index: 0,
            geometry_key: resolved.key,
            data_component_key: packed_hash,
            uses_prebuilt_mesh: resolved.uses_prebuilt_mesh,
        })
    }

    /// Report a content key that equals a deduplicated type key
    ///
    /// Only meaningful while deduplication is on, since the reserved keys are
    /// not used otherwise. Returns true on collision.
    fn check_reserved_collision(&self, content_key: GeometryKey, concrete_type: ImplicitObjectType) -> bool {
        let collides = self.deduplicate_simple_geometry && self.reserved_keys.contains(&content_key);
        if collides {
            log::debug!("Content hash {content_key:08x} of a {concrete_type} collides with a reserved type key");
        }
        collides
    }

    fn dispatch(&mut self, key: GeometryKey, shape: ImplicitRef, lod_count: usize) {
        let task = GenerationTask::new(key, shape, lod_count, self.geometry_cache);
        if self.geometry_cache.begin_generation(&task) {
            log::trace!("Dispatched generation for key {key:08x}");
            self.dispatched.push(task);
        }
    }

    /// Tasks dispatched since the last call, in dispatch order
    pub fn take_dispatched(&mut self) -> Vec<Arc<GenerationTask>> {
        std::mem::take(&mut self.dispatched)
    }
}

struct ResolvedLeaf {
    concrete: ImplicitRef,
    unpacked_transform: Transform,
    key: GeometryKey,
    uses_prebuilt_mesh: bool,
}

fn resolve_leaf(hash_cache: &HashCache, shape: &ImplicitRef, deduplicate: bool) -> Option<ResolvedLeaf> {
    let mut unpacked_transform = Transform::identity();
    let concrete = if needs_unpacking(shape) {
        unpack(shape, &mut unpacked_transform)?
    } else {
        shape.clone()
    };

    let concrete_type = concrete.inner_type();
    let uses_prebuilt_mesh = deduplicate && DEDUPLICATED_TYPES.contains(&concrete_type);
    let key = if uses_prebuilt_mesh {
        type_hash(concrete_type)
    } else {
        hash_cache.get_and_cache_geometry_hash(&concrete)
    };

    Some(ResolvedLeaf {
        concrete,
        unpacked_transform,
        key,
        uses_prebuilt_mesh,
    })
}

/// Cache key `shape` resolves to, without dispatching any generation
///
/// Returns `None` when the shape cannot be unpacked.
pub fn resolve_geometry_key(hash_cache: &HashCache, shape: &ImplicitRef, deduplicate: bool) -> Option<GeometryKey> {
    resolve_leaf(hash_cache, shape, deduplicate).map(|resolved| resolved.key)
}

fn local_transform(concrete: &ImplicitObject, uses_prebuilt_mesh: bool) -> Transform {
    match concrete {
        ImplicitObject::Capsule(capsule) => {
            Transform::from_position_rotation(capsule.center(), rotation_from_z_to(&capsule.axis()))
        }
        ImplicitObject::Sphere(sphere) if uses_prebuilt_mesh => Transform {
            position: sphere.center,
            scale: Vec3::repeat(sphere.radius),
            ..Transform::identity()
        },
        ImplicitObject::Box(shape) if uses_prebuilt_mesh => Transform {
            position: shape.center(),
            scale: shape.extents(),
            ..Transform::identity()
        },
        ImplicitObject::Sphere(sphere) => Transform::from_position(sphere.center),
        _ => Transform::identity(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{constants, Quat};
    use crate::shapes::{structural_hash, ConvexHull};
    use approx::assert_relative_eq;

    struct Fixture {
        hashes: HashCache,
        cache: Arc<GeometryCache>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                hashes: HashCache::new(),
                cache: Arc::new(GeometryCache::default()),
            }
        }

        fn factory(&self, deduplicate: bool) -> MeshDataHandleFactory<'_> {
            MeshDataHandleFactory::new(&self.hashes, &self.cache, deduplicate)
        }
    }

    #[test]
    fn test_deduplicated_boxes_share_key_and_scale_by_extents() {
        let fixture = Fixture::new();
        let mut factory = fixture.factory(true);
        let small = ImplicitObject::cuboid(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0));
        let large = ImplicitObject::cuboid(Vec3::new(0.0, 0.0, 3.0), Vec3::new(2.0, 2.0, 2.0));

        let a = factory.extract_geometry_data_for_implicit(&small, &Transform::identity(), 1).unwrap();
        let b = factory.extract_geometry_data_for_implicit(&large, &Transform::identity(), 1).unwrap();

        assert_eq!(a.geometry_key(), type_hash(ImplicitObjectType::Box));
        assert_eq!(a.geometry_key(), b.geometry_key());
        assert_relative_eq!(a.relative_transform().scale, Vec3::new(1.0, 1.0, 1.0));
        assert_relative_eq!(b.relative_transform().scale, Vec3::new(2.0, 2.0, 2.0));
        assert_relative_eq!(b.relative_transform().position, Vec3::new(0.0, 0.0, 3.0));
        assert!(a.uses_prebuilt_mesh());

        let dispatched = factory.take_dispatched();
        assert_eq!(dispatched.len(), 1);
        assert_eq!(dispatched[0].shape().as_ref(), prebuilt_shape(ImplicitObjectType::Box).unwrap().as_ref());
    }

    #[test]
    fn test_without_deduplication_keys_are_content_hashes() {
        let fixture = Fixture::new();
        let mut factory = fixture.factory(false);
        let sphere = ImplicitObject::sphere(Vec3::new(1.0, 2.0, 3.0), 4.0);

        let handle = factory.extract_geometry_data_for_implicit(&sphere, &Transform::identity(), 1).unwrap();

        assert_eq!(handle.geometry_key(), structural_hash(&sphere));
        assert_relative_eq!(handle.relative_transform().position, Vec3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(handle.relative_transform().scale, Vec3::new(1.0, 1.0, 1.0));
        assert!(!handle.uses_prebuilt_mesh());
    }

    #[test]
    fn test_data_component_key_is_packed_hash() {
        let fixture = Fixture::new();
        let mut factory = fixture.factory(false);
        let convex = Arc::new(ImplicitObject::Convex(ConvexHull::cuboid(Vec3::new(1.0, 1.0, 1.0))));
        let packed = ImplicitObject::scaled(Vec3::new(2.0, 2.0, 2.0), convex.clone());

        let handle = factory.extract_geometry_data_for_implicit(&packed, &Transform::identity(), 1).unwrap();

        assert_eq!(handle.data_component_key(), structural_hash(&packed));
        assert_eq!(handle.geometry_key(), structural_hash(&convex));
        assert!(Arc::ptr_eq(handle.concrete_shape(), &convex));
        assert_relative_eq!(handle.relative_transform().scale, Vec3::new(2.0, 2.0, 2.0));
    }

    #[test]
    fn test_capsule_moves_pivot_and_aligns_axis() {
        let fixture = Fixture::new();
        let mut factory = fixture.factory(true);
        let capsule = ImplicitObject::capsule(Vec3::new(0.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0), 0.5);

        let handle = factory.extract_geometry_data_for_implicit(&capsule, &Transform::identity(), 1).unwrap();
        let transform = handle.relative_transform();

        assert_relative_eq!(transform.position, Vec3::new(1.0, 0.0, 0.0), epsilon = 1e-6);
        assert_relative_eq!(transform.rotation * Vec3::z(), Vec3::x(), epsilon = 1e-6);
    }

    #[test]
    fn test_parent_transform_is_applied_first() {
        let fixture = Fixture::new();
        let mut factory = fixture.factory(true);
        let parent = Transform::from_position_rotation(
            Vec3::new(10.0, 0.0, 0.0),
            Quat::from_axis_angle(&Vec3::z_axis(), constants::PI * 0.5),
        );
        let sphere = ImplicitObject::sphere(Vec3::new(1.0, 0.0, 0.0), 3.0);

        let handle = factory.extract_geometry_data_for_implicit(&sphere, &parent, 1).unwrap();

        assert_relative_eq!(handle.relative_transform().position, Vec3::new(10.0, 1.0, 0.0), epsilon = 1e-5);
        assert_relative_eq!(handle.relative_transform().scale, Vec3::new(3.0, 3.0, 3.0));
    }

    #[test]
    fn test_second_dispatch_for_in_flight_key_is_noop() {
        let fixture = Fixture::new();
        let mut factory = fixture.factory(false);
        let mesh_shape = ImplicitObject::cuboid(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0));

        factory.extract_geometry_data_for_implicit(&mesh_shape, &Transform::identity(), 1);
        factory.extract_geometry_data_for_implicit(&mesh_shape, &Transform::identity(), 1);

        assert_eq!(factory.take_dispatched().len(), 1);
        assert_eq!(fixture.cache.stats().in_flight, 1);
    }

    #[test]
    fn test_unsupported_unpack_yields_no_handle() {
        let fixture = Fixture::new();
        let mut factory = fixture.factory(true);
        let union = ImplicitObject::union(vec![ImplicitObject::sphere(Vec3::zeros(), 1.0)]);
        let scaled = ImplicitObject::scaled(Vec3::new(2.0, 2.0, 2.0), union);

        assert!(factory.extract_geometry_data_for_implicit(&scaled, &Transform::identity(), 1).is_none());
    }

    #[test]
    fn test_resolve_key_matches_extraction_without_dispatch() {
        let fixture = Fixture::new();
        let convex = Arc::new(ImplicitObject::Convex(ConvexHull::cuboid(Vec3::new(1.0, 2.0, 1.0))));
        let packed = ImplicitObject::instanced(convex);

        let resolved = resolve_geometry_key(&fixture.hashes, &packed, true).unwrap();
        assert_eq!(fixture.cache.stats().in_flight, 0);

        let mut factory = fixture.factory(true);
        let handle = factory.extract_geometry_data_for_implicit(&packed, &Transform::identity(), 1).unwrap();
        assert_eq!(handle.geometry_key(), resolved);
    }

    #[test]
    fn test_reserved_collision_checks_every_content_key() {
        let fixture = Fixture::new();
        let box_key = type_hash(ImplicitObjectType::Box);

        let factory = fixture.factory(true);
        assert!(factory.check_reserved_collision(box_key, ImplicitObjectType::Convex));
        assert!(factory.check_reserved_collision(type_hash(ImplicitObjectType::Sphere), ImplicitObjectType::Box));
        assert!(!factory.check_reserved_collision(box_key.wrapping_add(1), ImplicitObjectType::Convex));

        let factory = fixture.factory(false);
        assert!(!factory.check_reserved_collision(box_key, ImplicitObjectType::Convex));
    }

    #[test]
    fn test_copy_from_overwrites_reused_handle() {
        let fixture = Fixture::new();
        let mut factory = fixture.factory(true);
        let sphere = ImplicitObject::sphere(Vec3::zeros(), 1.0);
        let capsule = ImplicitObject::capsule(Vec3::zeros(), Vec3::z(), 0.5);

        let mut reused = factory.extract_geometry_data_for_implicit(&sphere, &Transform::identity(), 1).unwrap();
        let fresh = factory.extract_geometry_data_for_implicit(&capsule, &Transform::identity(), 1).unwrap();
        reused.copy_from(&fresh);

        assert_eq!(reused.geometry_key(), fresh.geometry_key());
        assert!(Arc::ptr_eq(reused.leaf_shape(), &capsule));
        assert!(!reused.uses_prebuilt_mesh());
    }
}

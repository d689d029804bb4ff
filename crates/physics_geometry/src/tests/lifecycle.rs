use super::{initialized_builder, test_settings, tick_until_settled};
use crate::components::{MaterialKind, MeshAttributes};
use crate::foundation::math::{Transform, Vec3};
use crate::shapes::{type_hash, ConvexHull, ImplicitObject, ImplicitObjectType, TriangleMeshShape};
use approx::assert_relative_eq;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[test]
fn test_transformed_box_end_to_end() {
    let (mut builder, scene) = initialized_builder(test_settings());
    let boxed = ImplicitObject::cuboid(Vec3::new(0.0, 1.0, 0.0), Vec3::new(2.0, 2.0, 2.0));
    let root = ImplicitObject::transformed(Transform::from_position(Vec3::new(5.0, 0.0, 0.0)), boxed);

    let mut handles = Vec::new();
    builder.create_meshes_from_implicit_object(&root, &mut handles, 1, &Transform::identity(), 1);

    assert_eq!(handles.len(), 1);
    let handle = &handles[0];
    assert_eq!(handle.geometry_key(), type_hash(ImplicitObjectType::Box));
    assert_relative_eq!(handle.relative_transform().position, Vec3::new(5.0, 1.0, 0.0));
    assert_relative_eq!(handle.relative_transform().scale, Vec3::new(2.0, 2.0, 2.0));

    let instance = builder.create_instanced_mesh_data(handle, 11, 1, MeshAttributes::empty());
    tick_until_settled(&mut builder);

    let id = instance.read().component().unwrap();
    let component = builder.component(id).unwrap();
    assert!(component.is_mesh_ready());
    assert_eq!(component.material(), Some(MaterialKind::Opaque));
    assert_eq!(scene.loaded_keys(), vec![handle.geometry_key()]);
}

#[test]
fn test_generated_geometry_reaches_components() {
    let (mut builder, scene) = initialized_builder(test_settings());
    let hull = Arc::new(ImplicitObject::Convex(ConvexHull::cuboid(Vec3::new(1.0, 0.5, 0.25))));
    let root = ImplicitObject::union(vec![
        ImplicitObject::scaled(Vec3::new(2.0, 2.0, 2.0), hull),
        ImplicitObject::capsule(Vec3::zeros(), Vec3::new(0.0, 0.0, 2.0), 0.5),
    ]);

    let mut handles = Vec::new();
    builder.create_meshes_from_implicit_object(&root, &mut handles, 2, &Transform::identity(), 2);
    assert_eq!(builder.stats().launch_queue, 2);

    let instances: Vec<_> = handles
        .iter()
        .map(|handle| builder.create_instanced_mesh_data(handle, 3, 0, MeshAttributes::TRANSLUCENT))
        .collect();
    tick_until_settled(&mut builder);

    for instance in &instances {
        let id = instance.read().component().unwrap();
        let component = builder.component(id).unwrap();
        assert!(component.is_mesh_ready());
        assert_eq!(component.mesh().unwrap().lod_count(), 2);
        assert_eq!(component.material(), Some(MaterialKind::Translucent));
    }
    assert_eq!(scene.loaded_keys().len(), 2);
    assert!(builder.has_geometry_in_cache(&root.union_children().unwrap()[1]));
}

#[test]
fn test_removed_instances_return_component_to_pool() {
    let (mut builder, _scene) = initialized_builder(test_settings());
    let sphere = ImplicitObject::sphere(Vec3::zeros(), 1.0);
    let handle = builder.extract_geometry_data_for_implicit(&sphere, &Transform::identity()).unwrap();

    let first = builder.create_instanced_mesh_data(&handle, 1, 0, MeshAttributes::empty());
    let second = builder.create_instanced_mesh_data(&handle, 2, 0, MeshAttributes::empty());
    tick_until_settled(&mut builder);

    assert!(builder.remove_instanced_mesh_data(&first));
    assert_eq!(second.read().instance_index(), Some(0));
    assert!(!builder.remove_instanced_mesh_data(&first));

    assert!(builder.remove_instanced_mesh_data(&second));
    let summary = builder.tick(1.0 / 60.0);
    assert_eq!(summary.disposed, 1);

    let stats = builder.stats();
    assert_eq!(stats.components.live_components, 0);
    assert_eq!(stats.components.instanced_pool.free, 1);

    builder.create_instanced_mesh_data(&handle, 3, 0, MeshAttributes::empty());
    assert!(builder.stats().pool_hit_ratio() > 0.0);
}

#[test]
fn test_tick_applies_ready_mesh_before_disposing_emptied_component() {
    let (mut builder, scene) = initialized_builder(test_settings());
    let sphere = ImplicitObject::sphere(Vec3::zeros(), 2.0);
    let handle = builder.extract_geometry_data_for_implicit(&sphere, &Transform::identity()).unwrap();
    assert!(builder.has_geometry_in_cache(&sphere));

    let instance = builder.create_instanced_mesh_data(&handle, 1, 0, MeshAttributes::empty());
    let id = instance.read().component().unwrap();
    assert!(builder.remove_instanced_mesh_data(&instance));

    let summary = builder.tick(1.0 / 60.0);

    assert_eq!(summary.geometry.processed, 1);
    assert_eq!(summary.geometry.stale, 0);
    assert_eq!(summary.disposed, 1);
    assert_eq!(scene.loaded_keys(), vec![type_hash(ImplicitObjectType::Sphere)]);
    assert!(builder.component(id).is_none());
}

#[test]
fn test_static_component_draws_single_instance() {
    let (mut builder, _scene) = initialized_builder(test_settings());
    let capsule = ImplicitObject::capsule(Vec3::zeros(), Vec3::new(1.0, 0.0, 0.0), 0.2);
    let handle = builder.extract_geometry_data_for_implicit(&capsule, &Transform::identity()).unwrap();

    let instance = builder
        .create_static_mesh_component(&handle, 4, 0, MeshAttributes::MIRRORED)
        .unwrap();
    tick_until_settled(&mut builder);

    let id = instance.read().component().unwrap();
    let component = builder.component(id).unwrap();
    assert_eq!(component.instance_count(), 1);
    assert!(component.is_mesh_ready());
    assert_eq!(component.mesh_attributes(), MeshAttributes::MIRRORED);
}

#[test]
fn test_unsupported_shape_settles_without_mesh() {
    let (mut builder, scene) = initialized_builder(test_settings());
    let plane = Arc::new(ImplicitObject::Plane(crate::shapes::Plane {
        point: Vec3::zeros(),
        normal: Vec3::z(),
    }));
    let handle = builder.extract_geometry_data_for_implicit(&plane, &Transform::identity()).unwrap();
    let instance = builder.create_instanced_mesh_data(&handle, 1, 0, MeshAttributes::empty());

    tick_until_settled(&mut builder);

    let id = instance.read().component().unwrap();
    assert!(!builder.component(id).unwrap().is_mesh_ready());
    assert!(scene.loaded_keys().is_empty());
}

#[test]
fn test_dropped_scene_stops_notifications() {
    let (mut builder, scene) = initialized_builder(test_settings());
    drop(scene);
    let sphere = ImplicitObject::sphere(Vec3::zeros(), 1.0);
    let handle = builder.extract_geometry_data_for_implicit(&sphere, &Transform::identity()).unwrap();
    let instance = builder.create_instanced_mesh_data(&handle, 1, 0, MeshAttributes::empty());

    tick_until_settled(&mut builder);

    let id = instance.read().component().unwrap();
    assert!(builder.component(id).unwrap().is_mesh_ready());
}

fn dense_grid(size: usize) -> Arc<ImplicitObject> {
    let mut vertices = Vec::with_capacity((size + 1) * (size + 1));
    for row in 0..=size {
        for column in 0..=size {
            vertices.push(Vec3::new(column as f32, row as f32, ((row * column) % 7) as f32 * 0.1));
        }
    }
    let stride = (size + 1) as u32;
    let mut triangles = Vec::with_capacity(size * size * 2);
    for row in 0..size as u32 {
        for column in 0..size as u32 {
            let corner = row * stride + column;
            triangles.push([corner, corner + 1, corner + stride]);
            triangles.push([corner + 1, corner + stride + 1, corner + stride]);
        }
    }
    Arc::new(ImplicitObject::TriangleMesh(TriangleMeshShape { vertices, triangles }))
}

#[test]
fn test_shutdown_with_tasks_in_flight_is_bounded_and_clean() {
    let mut settings = test_settings();
    settings.shutdown_timeout_seconds = 5.0;
    let (mut builder, _scene) = initialized_builder(settings);

    let root = ImplicitObject::union((4..12).map(dense_grid).collect());
    let mut handles = Vec::new();
    builder.create_meshes_from_implicit_object(&root, &mut handles, 3, &Transform::identity(), 8);
    for handle in &handles {
        builder.create_instanced_mesh_data(handle, 1, 0, MeshAttributes::empty());
    }
    builder.tick(1.0 / 60.0);

    let started = Instant::now();
    builder.deinitialize();

    assert!(started.elapsed() < Duration::from_secs(6));
    let stats = builder.stats();
    assert_eq!(stats.cache.cached_meshes, 0);
    assert_eq!(stats.cache.in_flight, 0);
    assert_eq!(stats.launch_queue, 0);
    assert_eq!(stats.components.live_components, 0);

    std::thread::sleep(Duration::from_millis(50));
    assert!(builder.geometry_cache().is_empty());
    builder.deinitialize();
}

//! Geometry viewer
//!
//! Headless host for the geometry pipeline: builds a sample recording of
//! particles, extracts their collision geometry, ticks the builder until every
//! mesh has reached its component, and logs what happened.
//!
//! Usage: `geometry_viewer [settings.toml | settings.ron]`

use physics_geometry::config::ConfigError;
use physics_geometry::prelude::*;
use physics_geometry::shapes::{ConvexHull, TriangleMeshShape};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::{Duration, Instant};

const PARTICLE_COUNT: usize = 64;
const FRAME_SECONDS: f32 = 1.0 / 60.0;
const READY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(thiserror::Error, Debug)]
enum ViewerError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error("Failed to load settings: {0}")]
    Config(#[from] ConfigError),

    #[error("Geometry was not ready after {0:?}")]
    Timeout(Duration),
}

/// Scene stand-in that only logs
struct LoggingScene;

impl GeometrySceneEvents for LoggingScene {
    fn on_geometry_loaded(&self, key: GeometryKey) {
        log::debug!("Geometry {key:08x} loaded");
    }
}

/// One recorded rigid body
struct Particle {
    id: i32,
    transform: Transform,
    geometry: ImplicitRef,
    available_shape_instances: usize,
}

fn load_settings() -> Result<GeometrySettings, ConfigError> {
    match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading settings from {path}");
            GeometrySettings::load_from_file(&path)
        }
        None => Ok(GeometrySettings::default()),
    }
}

fn wavy_surface(rng: &mut StdRng, size: u32) -> ImplicitRef {
    let stride = size + 1;
    let vertices = (0..stride * stride)
        .map(|index| {
            let (row, column) = (index / stride, index % stride);
            Vec3::new(column as f32, row as f32, rng.gen_range(-0.2..0.2))
        })
        .collect();
    let triangles = (0..size)
        .flat_map(|row| (0..size).map(move |column| row * stride + column))
        .flat_map(|corner| [[corner, corner + 1, corner + stride], [corner + 1, corner + stride + 1, corner + stride]])
        .collect();
    Arc::new(ImplicitObject::TriangleMesh(TriangleMeshShape { vertices, triangles }))
}

fn sample_recording(rng: &mut StdRng) -> Vec<Particle> {
    let hull = Arc::new(ImplicitObject::Convex(ConvexHull::cuboid(Vec3::new(0.5, 0.25, 1.0))));
    let surface = wavy_surface(rng, 12);

    let compound = ImplicitObject::union(vec![
        ImplicitObject::sphere(Vec3::new(0.0, 0.0, 1.0), 0.5),
        ImplicitObject::cuboid(Vec3::zeros(), Vec3::new(1.0, 1.0, 0.5)),
        ImplicitObject::capsule(Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0), 0.25),
    ]);
    let debris = ImplicitObject::union_clustered(vec![
        ImplicitObject::transformed(
            Transform::from_position(Vec3::new(0.5, 0.0, 0.0)),
            ImplicitObject::cuboid(Vec3::zeros(), Vec3::new(0.5, 0.5, 0.5)),
        ),
        ImplicitObject::transformed(
            Transform::from_position(Vec3::new(-0.5, 0.0, 0.0)),
            ImplicitObject::instanced(hull.clone()),
        ),
    ]);

    (0..PARTICLE_COUNT)
        .map(|index| {
            let (geometry, available_shape_instances) = match index % 5 {
                0 => (compound.clone(), 3),
                1 => (ImplicitObject::scaled(Vec3::repeat(rng.gen_range(0.5..2.0)), hull.clone()), 1),
                2 => (surface.clone(), 1),
                3 => (debris.clone(), 1),
                _ => (ImplicitObject::sphere(Vec3::zeros(), rng.gen_range(0.1..1.5)), 1),
            };
            let position = Vec3::new(
                rng.gen_range(-50.0..50.0),
                rng.gen_range(-50.0..50.0),
                rng.gen_range(0.0..20.0),
            );
            Particle {
                id: index as i32,
                transform: Transform::from_position(position),
                geometry,
                available_shape_instances,
            }
        })
        .collect()
}

fn run() -> Result<(), ViewerError> {
    let settings = load_settings()?;
    let lod_count = settings.default_lod_count;

    let scene: Arc<dyn GeometrySceneEvents> = Arc::new(LoggingScene);
    let mut builder = GeometryBuilder::new(settings)?;
    builder.initialize(Arc::downgrade(&scene));

    let mut rng = StdRng::seed_from_u64(0x5eed);
    let particles = sample_recording(&mut rng);

    let mut instances = Vec::new();
    for particle in &particles {
        let mut handles = Vec::new();
        builder.create_meshes_from_implicit_object(
            &particle.geometry,
            &mut handles,
            lod_count,
            &Transform::identity(),
            particle.available_shape_instances,
        );

        for handle in &handles {
            let attributes = if rng.gen_bool(0.2) {
                MeshAttributes::TRANSLUCENT
            } else {
                MeshAttributes::empty()
            };
            let instance = builder.create_instanced_mesh_data(handle, particle.id, 0, attributes);
            instance.write().world_transform = particle.transform;
            builder.sync_instance_state(&instance);
            instances.push(instance);
        }
    }
    log::info!("Recorded {} particles into {} render instances", particles.len(), instances.len());

    let started = Instant::now();
    let mut frames = 0_usize;
    loop {
        builder.tick(FRAME_SECONDS);
        frames += 1;

        let stats = builder.stats();
        let settled = stats.launch_queue == 0
            && stats.cache.in_flight == 0
            && stats.waiting_for_geometry == 0
            && stats.waiting_for_material == 0;
        if settled {
            break;
        }
        if started.elapsed() > READY_TIMEOUT {
            builder.deinitialize();
            return Err(ViewerError::Timeout(READY_TIMEOUT));
        }
        std::thread::sleep(Duration::from_secs_f32(FRAME_SECONDS));
    }

    let stats = builder.stats();
    let ready = builder.components().filter(|(_, component)| component.is_mesh_ready()).count();
    log::info!(
        "Settled after {frames} frames ({:.1} ms): {} meshes cached, {} built, {} discarded",
        started.elapsed().as_secs_f32() * 1000.0,
        stats.cache.cached_meshes,
        stats.cache.built,
        stats.cache.discarded
    );
    log::info!(
        "{ready}/{} components have a mesh, pool hit ratio {:.2}",
        stats.components.live_components,
        stats.pool_hit_ratio()
    );

    for instance in instances.iter().step_by(3) {
        builder.remove_instanced_mesh_data(instance);
    }
    builder.tick(FRAME_SECONDS);
    log::info!("After removals: {:?}", builder.stats().components);

    builder.deinitialize();
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(error) = run() {
        log::error!("{error}");
        std::process::exit(1);
    }
}

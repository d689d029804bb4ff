//! Budgeted per-tick work queues
//!
//! # Architecture
//!
//! ```text
//!                     tick budget / 3 each
//!  ┌──────────────┐   ┌───────────────────────┐   ┌───────────────────────┐
//!  │ task launches│   │ waiting for geometry  │   │ waiting for material  │
//!  │ spawn on pool│   │ apply cached mesh ────┼──►│ assign material       │
//!  └──────────────┘   └───────────────────────┘   └───────────────────────┘
//! ```
//!
//! Every queue polls each of its items at most once per tick and always
//! polls at least one item, even when the budget is already spent. Items that
//! are not ready go to the back of their queue; ids of released components
//! are consumed without effect.

use crate::cache::{GenerationTask, GeometryCache};
use crate::components::{ComponentId, MaterialKind};
use crate::foundation::time::TimeBudget;
use crate::pool::MeshComponentPool;
use crate::scene::GeometrySceneEvents;
use rayon::ThreadPool;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

const QUEUE_COUNT: f32 = 3.0;

/// Outcome of polling one queued item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Poll {
    Done,
    Stale,
    Pending,
}

/// What one queue did during a tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueTickStats {
    /// Items completed and removed
    pub processed: usize,
    /// Items dropped because their target no longer exists
    pub stale: usize,
    /// Items polled but not ready, moved to the back
    pub requeued: usize,
}

impl QueueTickStats {
    /// Items polled this tick
    pub fn polled(&self) -> usize {
        self.processed + self.stale + self.requeued
    }
}

/// What a whole tick did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Generation task launches
    pub launches: QueueTickStats,
    /// Components waiting for their mesh
    pub geometry: QueueTickStats,
    /// Components waiting for their material
    pub materials: QueueTickStats,
    /// Empty components returned to the pools
    pub disposed: usize,
}

impl TickSummary {
    /// Returns true if the tick touched nothing
    pub fn is_idle(&self) -> bool {
        self.launches.polled() + self.geometry.polled() + self.materials.polled() + self.disposed == 0
    }
}

/// Everything a tick needs from its owner
pub struct TickContext<'a> {
    /// Wall-clock budget for the whole tick, in seconds
    pub budget_seconds: f32,
    /// Pool generation tasks are launched on
    pub workers: &'a ThreadPool,
    /// Cache meshes are read from
    pub cache: &'a GeometryCache,
    /// Components meshes and materials are applied to
    pub components: &'a mut MeshComponentPool,
    /// Scene to notify; `None` once the scene is gone
    pub scene: Option<&'a dyn GeometrySceneEvents>,
}

/// Three budgeted queues drained once per tick
#[derive(Default)]
pub struct BoundedQueueScheduler {
    launches: VecDeque<Arc<GenerationTask>>,
    geometry_waits: VecDeque<ComponentId>,
    material_waits: VecDeque<ComponentId>,
    queued_for_geometry: HashSet<ComponentId>,
    queued_for_material: HashSet<ComponentId>,
}

impl BoundedQueueScheduler {
    /// Create empty queues
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue tasks for launch on the worker pool
    pub fn enqueue_launches(&mut self, tasks: impl IntoIterator<Item = Arc<GenerationTask>>) {
        self.launches.extend(tasks);
    }

    /// Queue `id` to receive its mesh; false if it is already queued
    pub fn request_geometry(&mut self, id: ComponentId) -> bool {
        if !self.queued_for_geometry.insert(id) {
            return false;
        }
        self.geometry_waits.push_back(id);
        true
    }

    /// Queue `id` to receive its material; false if it is already queued
    pub fn request_material(&mut self, id: ComponentId) -> bool {
        if !self.queued_for_material.insert(id) {
            return false;
        }
        self.material_waits.push_back(id);
        true
    }

    /// Remove and return every task not launched yet
    pub fn take_pending_launches(&mut self) -> Vec<Arc<GenerationTask>> {
        self.launches.drain(..).collect()
    }

    /// Tasks waiting for launch
    pub fn launch_queue_len(&self) -> usize {
        self.launches.len()
    }

    /// Components waiting for geometry
    pub fn geometry_queue_len(&self) -> usize {
        self.geometry_waits.len()
    }

    /// Components waiting for a material
    pub fn material_queue_len(&self) -> usize {
        self.material_waits.len()
    }

    /// Returns true if all three queues are empty
    pub fn is_empty(&self) -> bool {
        self.launches.is_empty() && self.geometry_waits.is_empty() && self.material_waits.is_empty()
    }

    /// Drop every queued item
    pub fn clear(&mut self) {
        self.launches.clear();
        self.geometry_waits.clear();
        self.material_waits.clear();
        self.queued_for_geometry.clear();
        self.queued_for_material.clear();
    }

    /// Drain the three queues within the context's budget
    pub fn tick(&mut self, context: TickContext<'_>) -> TickSummary {
        let share = context.budget_seconds.max(0.0) / QUEUE_COUNT;
        let TickContext {
            workers,
            cache,
            components,
            scene,
            ..
        } = context;

        let launches = drain(&mut self.launches, share, |task| {
            let task = Arc::clone(task);
            workers.spawn(move || {
                task.generate_geometry();
            });
            Poll::Done
        });

        let mut geometry_ready = Vec::new();
        let geometry = drain(&mut self.geometry_waits, share, |&id| {
            let poll = poll_geometry(id, cache, components, scene);
            if poll != Poll::Pending {
                self.queued_for_geometry.remove(&id);
            }
            if poll == Poll::Done {
                geometry_ready.push(id);
            }
            poll
        });
        for id in geometry_ready {
            self.request_material(id);
        }

        let materials = drain(&mut self.material_waits, share, |&id| {
            let poll = poll_material(id, components, scene);
            if poll != Poll::Pending {
                self.queued_for_material.remove(&id);
            }
            poll
        });

        TickSummary {
            launches,
            geometry,
            materials,
            disposed: 0,
        }
    }
}

fn drain<T>(queue: &mut VecDeque<T>, seconds: f32, mut poll: impl FnMut(&T) -> Poll) -> QueueTickStats {
    let mut stats = QueueTickStats::default();
    let mut budget = TimeBudget::start(seconds);

    for _ in 0..queue.len() {
        if !budget.has_remaining() {
            break;
        }
        let Some(item) = queue.pop_front() else {
            break;
        };
        budget.consume_unit();

        match poll(&item) {
            Poll::Done => stats.processed += 1,
            Poll::Stale => stats.stale += 1,
            Poll::Pending => {
                stats.requeued += 1;
                queue.push_back(item);
            }
        }
    }

    stats
}

fn poll_geometry(
    id: ComponentId,
    cache: &GeometryCache,
    components: &mut MeshComponentPool,
    scene: Option<&dyn GeometrySceneEvents>,
) -> Poll {
    let Some(component) = components.get_mut(id) else {
        return Poll::Stale;
    };
    let Some(key) = component.geometry_key() else {
        return Poll::Stale;
    };
    if component.is_mesh_ready() {
        return Poll::Done;
    }

    match cache.get_cached_mesh(key) {
        Some(mesh) => {
            log::trace!("Applying mesh {} to '{}'", mesh.name(), component.name());
            component.apply_mesh(mesh);
            if let Some(scene) = scene {
                scene.on_geometry_loaded(key);
            }
            Poll::Done
        }
        None if cache.is_known(key) => Poll::Pending,
        None => {
            log::trace!("No mesh will be generated for key {key:08x}, '{}' stays empty", component.name());
            Poll::Stale
        }
    }
}

fn poll_material(id: ComponentId, components: &mut MeshComponentPool, scene: Option<&dyn GeometrySceneEvents>) -> Poll {
    let Some(component) = components.get_mut(id) else {
        return Poll::Stale;
    };

    let material = MaterialKind::for_attributes(component.mesh_attributes());
    if scene.is_some_and(|scene| !scene.is_material_ready(material)) {
        return Poll::Pending;
    }
    component.assign_material(material);
    Poll::Done
}

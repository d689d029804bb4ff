//! Asynchronous mesh generation for one cache key
//!
//! A task is created on the main thread when a key misses the cache, queued
//! for launch, and run once on a worker thread. Lifecycle:
//!
//! ```text
//! Pending --generate_geometry--> Running --> Completed
//!    |
//!    +--cancel_task + generate_geometry--> Canceled
//! ```
//!
//! Cancellation only prevents work that has not started. A running task
//! finishes, and its result is dropped by the cache if the cache was reset in
//! the meantime.

use super::geometry_cache::GeometryCache;
use crate::mesh::{create_generator, RenderableMesh};
use crate::shapes::{GeometryKey, ImplicitRef};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;

/// Complexity used for every generated mesh
const DEFAULT_COMPLEXITY_FACTOR: f32 = 1.0;

/// Lifecycle state of a [`GenerationTask`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Queued, not started
    Pending,
    /// Generating on a worker
    Running,
    /// Finished (with or without a mesh)
    Completed,
    /// Canceled before it started
    Canceled,
}

impl TaskState {
    /// Returns true for the two terminal states
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Completed | Self::Canceled)
    }
}

/// One pending mesh generation
pub struct GenerationTask {
    key: GeometryKey,
    shape: ImplicitRef,
    lod_count: usize,
    epoch: u64,
    cache: Weak<GeometryCache>,
    canceled: AtomicBool,
    state: Mutex<TaskState>,
    finished: Condvar,
}

impl std::fmt::Debug for GenerationTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationTask")
            .field("key", &self.key)
            .field("shape", &self.shape.shape_type())
            .field("lod_count", &self.lod_count)
            .field("state", &self.state())
            .finish()
    }
}

impl GenerationTask {
    /// Create a pending task bound to `cache`
    pub fn new(key: GeometryKey, shape: ImplicitRef, lod_count: usize, cache: &Arc<GeometryCache>) -> Arc<Self> {
        Arc::new(Self {
            key,
            shape,
            lod_count,
            epoch: cache.epoch(),
            cache: Arc::downgrade(cache),
            canceled: AtomicBool::new(false),
            state: Mutex::new(TaskState::Pending),
            finished: Condvar::new(),
        })
    }

    /// Cache key this task generates
    pub fn key(&self) -> GeometryKey {
        self.key
    }

    /// Concrete shape the mesh is generated from
    pub fn shape(&self) -> &ImplicitRef {
        &self.shape
    }

    /// Current state
    pub fn state(&self) -> TaskState {
        *self.state.lock()
    }

    /// Returns true once the task reached a terminal state
    pub fn is_finished(&self) -> bool {
        self.state().is_finished()
    }

    /// Returns true if cancellation was requested
    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Acquire)
    }

    /// Request cancellation; has no effect once the task is running
    pub fn cancel_task(&self) {
        self.canceled.store(true, Ordering::Release);
    }

    /// Run the task
    ///
    /// Returns the cached mesh for the key, or `None` if the task was
    /// canceled, already ran, its cache is gone, or the shape has no generator.
    pub fn generate_geometry(&self) -> Option<Arc<RenderableMesh>> {
        {
            let mut state = self.state.lock();
            if *state != TaskState::Pending {
                return None;
            }
            if self.is_canceled() {
                *state = TaskState::Canceled;
                drop(state);
                if let Some(cache) = self.cache.upgrade() {
                    cache.end_generation(self);
                }
                self.finished.notify_all();
                return None;
            }
            *state = TaskState::Running;
        }

        let result = self.run();

        *self.state.lock() = TaskState::Completed;
        self.finished.notify_all();
        result
    }

    fn run(&self) -> Option<Arc<RenderableMesh>> {
        let Some(cache) = self.cache.upgrade() else {
            log::trace!("Geometry cache dropped before task {:08x} ran", self.key);
            return None;
        };

        let Some(generator) = create_generator(&self.shape, DEFAULT_COMPLEXITY_FACTOR) else {
            log::debug!(
                "No generator for key {:08x} ({})",
                self.key,
                self.shape.shape_type().inner
            );
            cache.end_generation(self);
            return None;
        };

        let mesh = cache.create_and_cache_in_epoch(self.epoch, self.key, generator.as_ref(), self.lod_count);
        if mesh.is_none() {
            cache.end_generation(self);
        }
        mesh
    }

    /// Block until the task finishes or `deadline` passes
    ///
    /// Returns true if the task finished. Pending tasks that never get a
    /// worker count as unfinished.
    pub fn wait_for_completion(&self, deadline: Instant) -> bool {
        let mut state = self.state.lock();
        while !state.is_finished() {
            if self.finished.wait_until(&mut state, deadline).timed_out() {
                return state.is_finished();
            }
        }
        true
    }
}

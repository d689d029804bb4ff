//! Key to mesh cache with in-flight generation bookkeeping
//!
//! # Locking
//!
//! The mesh map and the in-flight map live behind one `RwLock`, so a key
//! moves from "being generated" to "cached" in a single critical section and
//! no reader ever sees it in both maps or in neither. Mesh building runs
//! outside the lock.
//!
//! # Write-once entries
//!
//! Two threads may build the same key concurrently through
//! [`GeometryCache::create_and_cache`]. The first install wins; the loser
//! discards its mesh and returns the winner's `Arc`, so every caller observes
//! the same mesh for a key.
//!
//! # Epochs
//!
//! [`GeometryCache::reset`] bumps an epoch counter. A generation task records
//! the epoch it was created in and its result is discarded if the cache was
//! reset in between, which keeps late stragglers from repopulating a cache
//! that was cleared during shutdown.

use super::generation_task::GenerationTask;
use crate::mesh::{MeshBuildOptions, MeshGenerator, RenderableMesh};
use crate::shapes::GeometryKey;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct CacheState {
    meshes: HashMap<GeometryKey, Arc<RenderableMesh>>,
    in_flight: HashMap<GeometryKey, Arc<GenerationTask>>,
}

/// Shared mesh cache
pub struct GeometryCache {
    state: RwLock<CacheState>,
    options: RwLock<MeshBuildOptions>,
    epoch: AtomicU64,
    built: AtomicUsize,
    discarded: AtomicUsize,
}

/// Snapshot of cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeometryCacheStats {
    /// Meshes currently cached
    pub cached_meshes: usize,
    /// Keys currently being generated
    pub in_flight: usize,
    /// Meshes built since creation
    pub built: usize,
    /// Built meshes thrown away (lost a race or outlived a reset)
    pub discarded: usize,
}

impl Default for GeometryCache {
    fn default() -> Self {
        Self::new(MeshBuildOptions::default())
    }
}

impl GeometryCache {
    /// Create an empty cache
    pub fn new(options: MeshBuildOptions) -> Self {
        Self {
            state: RwLock::new(CacheState::default()),
            options: RwLock::new(options),
            epoch: AtomicU64::new(0),
            built: AtomicUsize::new(0),
            discarded: AtomicUsize::new(0),
        }
    }

    /// Current build options
    pub fn build_options(&self) -> MeshBuildOptions {
        *self.options.read()
    }

    /// Replace the build options used by subsequent builds
    pub fn set_build_options(&self, options: MeshBuildOptions) {
        *self.options.write() = options;
    }

    /// Current reset epoch
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Returns true if a mesh is cached for `key`
    pub fn has_geometry(&self, key: GeometryKey) -> bool {
        self.state.read().meshes.contains_key(&key)
    }

    /// Cached mesh for `key`
    pub fn get_cached_mesh(&self, key: GeometryKey) -> Option<Arc<RenderableMesh>> {
        self.state.read().meshes.get(&key).cloned()
    }

    /// Return the cached mesh for `key`, building it from `generator` if absent
    pub fn create_and_cache(&self, key: GeometryKey, generator: &dyn MeshGenerator, lod_count: usize) -> Arc<RenderableMesh> {
        if let Some(existing) = self.get_cached_mesh(key) {
            return existing;
        }

        let mesh = Arc::new(RenderableMesh::build(key, generator, lod_count, self.build_options()));
        self.built.fetch_add(1, Ordering::Relaxed);
        self.install(key, mesh)
    }

    /// Build and install for a generation task created in `epoch`
    ///
    /// Returns `None` without touching the maps when the cache was reset after
    /// the task was created.
    pub(crate) fn create_and_cache_in_epoch(
        &self,
        epoch: u64,
        key: GeometryKey,
        generator: &dyn MeshGenerator,
        lod_count: usize,
    ) -> Option<Arc<RenderableMesh>> {
        if let Some(existing) = self.get_cached_mesh(key) {
            let mut state = self.state.write();
            if self.epoch() != epoch {
                return None;
            }
            state.in_flight.remove(&key);
            return Some(existing);
        }

        let mesh = Arc::new(RenderableMesh::build(key, generator, lod_count, self.build_options()));
        self.built.fetch_add(1, Ordering::Relaxed);
        self.install_in_epoch(epoch, key, mesh)
    }

    /// Insert a mesh that was built elsewhere (pre-built shared meshes)
    pub fn insert_mesh(&self, key: GeometryKey, mesh: RenderableMesh) -> Arc<RenderableMesh> {
        self.install(key, Arc::new(mesh))
    }

    fn install(&self, key: GeometryKey, mesh: Arc<RenderableMesh>) -> Arc<RenderableMesh> {
        let mut state = self.state.write();
        self.install_locked(&mut state, key, mesh)
    }

    /// Install unless a reset happened since `epoch`
    ///
    /// `reset` bumps the epoch while holding the write lock, so the check and
    /// the insert cannot straddle a reset.
    fn install_in_epoch(&self, epoch: u64, key: GeometryKey, mesh: Arc<RenderableMesh>) -> Option<Arc<RenderableMesh>> {
        let mut state = self.state.write();
        if self.epoch() != epoch {
            self.discarded.fetch_add(1, Ordering::Relaxed);
            log::debug!("Discarding mesh {key:08x} generated before a cache reset");
            return None;
        }
        Some(self.install_locked(&mut state, key, mesh))
    }

    fn install_locked(&self, state: &mut CacheState, key: GeometryKey, mesh: Arc<RenderableMesh>) -> Arc<RenderableMesh> {
        state.in_flight.remove(&key);
        let winner = state.meshes.entry(key).or_insert_with(|| mesh.clone()).clone();
        if !Arc::ptr_eq(&winner, &mesh) {
            self.discarded.fetch_add(1, Ordering::Relaxed);
        }
        winner
    }

    /// In-flight task for `key`
    pub fn in_flight_task(&self, key: GeometryKey) -> Option<Arc<GenerationTask>> {
        self.state.read().in_flight.get(&key).cloned()
    }

    /// Returns true if `key` is cached or being generated
    pub fn is_known(&self, key: GeometryKey) -> bool {
        let state = self.state.read();
        state.meshes.contains_key(&key) || state.in_flight.contains_key(&key)
    }

    /// Register `task` as the generator of its key
    ///
    /// Returns false, leaving the maps untouched, if the key is already cached
    /// or already has a task in flight.
    pub fn begin_generation(&self, task: &Arc<GenerationTask>) -> bool {
        let mut state = self.state.write();
        let key = task.key();
        if state.meshes.contains_key(&key) || state.in_flight.contains_key(&key) {
            return false;
        }
        state.in_flight.insert(key, task.clone());
        true
    }

    /// Remove `task` from the in-flight map if it is still the registered task
    pub fn end_generation(&self, task: &GenerationTask) {
        let mut state = self.state.write();
        let registered = state
            .in_flight
            .get(&task.key())
            .is_some_and(|entry| std::ptr::eq(Arc::as_ptr(entry), task));
        if registered {
            state.in_flight.remove(&task.key());
        }
    }

    /// Snapshot of every in-flight task
    pub fn in_flight_tasks(&self) -> Vec<Arc<GenerationTask>> {
        self.state.read().in_flight.values().cloned().collect()
    }

    /// Number of cached meshes
    pub fn len(&self) -> usize {
        self.state.read().meshes.len()
    }

    /// Returns true if nothing is cached
    pub fn is_empty(&self) -> bool {
        self.state.read().meshes.is_empty()
    }

    /// Counter snapshot
    pub fn stats(&self) -> GeometryCacheStats {
        let state = self.state.read();
        GeometryCacheStats {
            cached_meshes: state.meshes.len(),
            in_flight: state.in_flight.len(),
            built: self.built.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
        }
    }

    /// Drop every mesh and in-flight entry and start a new epoch
    pub fn reset(&self) {
        let mut state = self.state.write();
        self.epoch.fetch_add(1, Ordering::AcqRel);
        state.meshes.clear();
        state.in_flight.clear();
    }
}

//! Caches and asynchronous generation
//!
//! - [`hash_cache`]: shape identity to content hash memo
//! - [`geometry_cache`]: key to mesh map plus in-flight bookkeeping
//! - [`generation_task`]: one pending mesh generation

pub mod generation_task;
pub mod geometry_cache;
pub mod hash_cache;

pub use generation_task::{GenerationTask, TaskState};
pub use geometry_cache::{GeometryCache, GeometryCacheStats};
pub use hash_cache::HashCache;

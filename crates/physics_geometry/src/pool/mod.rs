//! Component pooling
//!
//! - [`object_pool`]: generic recycling pool with background growth
//! - [`component_pool`]: the component container plus one pool per family

pub mod component_pool;
pub mod object_pool;

pub use component_pool::{ComponentEntry, ComponentPoolStats, MeshComponentPool, PooledComponent};
pub use object_pool::{ObjectPool, PoolConfig, PoolStats, Poolable};

//! Library error type
//!
//! Routine geometry failures (unsupported shapes, rejected triangles, stale
//! components) are logged and surface as `None`; only construction-time
//! failures reach callers as [`GeometryError`].

use crate::config::ConfigError;
use crate::shapes::ImplicitObjectType;

/// Errors surfaced by the geometry pipeline
#[derive(thiserror::Error, Debug)]
pub enum GeometryError {
    /// The generation worker pool could not be created
    #[error("Failed to build generation thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// Settings could not be loaded or saved
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An operation that needs an initialized builder ran before `initialize`
    #[error("Geometry builder is not initialized")]
    NotInitialized,

    /// The shape kind has no mesh generator
    #[error("Unsupported shape type: {0}")]
    UnsupportedShape(ImplicitObjectType),
}

/// Result alias for the geometry pipeline
pub type GeometryResult<T> = Result<T, GeometryError>;

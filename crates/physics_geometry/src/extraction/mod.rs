//! Shape hierarchy extraction
//!
//! - [`walker`]: recursive descent producing one handle per leaf
//! - [`handle`]: per-leaf key, transform and dispatch logic

pub mod handle;
pub mod walker;

pub use handle::{
    prebuilt_shape, resolve_geometry_key, ExtractedGeometryDataHandle, MeshDataHandleFactory, DEDUPLICATED_TYPES,
};
pub use walker::HierarchyWalker;

//! Recorded collision shapes
//!
//! - [`implicit`]: the shape model (primitives and composite wrappers)
//! - [`hash`]: structural content hashing and type-tag hashing
//! - [`unpack`]: decoding of scaled and instanced wrappers

pub mod implicit;
pub mod hash;
pub mod unpack;

pub use hash::{structural_hash, type_hash, GeometryKey};
pub use implicit::{
    BoxShape, Capsule, ConvexHull, Cylinder, HeightField, ImplicitObject, ImplicitObjectType, ImplicitRef,
    LevelSet, PackFlags, Plane, ShapeType, Sphere, TriangleMeshShape,
};
pub use unpack::{needs_unpacking, packed_form, unpack, PackedForm};

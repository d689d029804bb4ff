//! Structural shape hashing
//!
//! Two shapes with identical payloads hash identically regardless of where
//! they live in memory, which is what lets the geometry cache share one mesh
//! between particles that reference equal geometry. Floats are hashed by bit
//! pattern, so `0.0` and `-0.0` are distinct; recorded data never relies on
//! that distinction.

use super::implicit::{ImplicitObject, ImplicitObjectType};
use crate::foundation::math::{Quat, Transform, Vec3};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// 32-bit cache key derived from shape content or from a type tag
pub type GeometryKey = u32;

/// Content hash of a shape, including every child of a composite
pub fn structural_hash(object: &ImplicitObject) -> GeometryKey {
    let mut hasher = DefaultHasher::new();
    hash_object(object, &mut hasher);
    fold(hasher.finish())
}

/// Hash of a bare type tag
///
/// Deduplicated boxes and spheres are keyed by this value instead of by their
/// content, so every box (and every sphere) resolves to the same mesh.
pub fn type_hash(object_type: ImplicitObjectType) -> GeometryKey {
    let mut hasher = DefaultHasher::new();
    "implicit-object-type".hash(&mut hasher);
    object_type.hash(&mut hasher);
    fold(hasher.finish())
}

fn fold(value: u64) -> GeometryKey {
    (value ^ (value >> 32)) as u32
}

fn hash_object<H: Hasher>(object: &ImplicitObject, state: &mut H) {
    std::mem::discriminant(object).hash(state);

    match object {
        ImplicitObject::Sphere(sphere) => {
            hash_vec3(&sphere.center, state);
            sphere.radius.to_bits().hash(state);
        }
        ImplicitObject::Box(shape) => {
            hash_vec3(&shape.min, state);
            hash_vec3(&shape.max, state);
        }
        ImplicitObject::Capsule(capsule) => {
            hash_vec3(&capsule.x1, state);
            hash_vec3(&capsule.x2, state);
            capsule.radius.to_bits().hash(state);
        }
        ImplicitObject::Convex(hull) => {
            hull.vertices.len().hash(state);
            hull.vertices.iter().for_each(|vertex| hash_vec3(vertex, state));
            hull.faces.hash(state);
        }
        ImplicitObject::TriangleMesh(mesh) => {
            mesh.vertices.len().hash(state);
            mesh.vertices.iter().for_each(|vertex| hash_vec3(vertex, state));
            mesh.triangles.hash(state);
        }
        ImplicitObject::HeightField(field) => {
            field.rows.hash(state);
            field.columns.hash(state);
            hash_vec3(&field.scale, state);
            field.heights.iter().for_each(|height| height.to_bits().hash(state));
        }
        ImplicitObject::Plane(plane) => {
            hash_vec3(&plane.point, state);
            hash_vec3(&plane.normal, state);
        }
        ImplicitObject::LevelSet(level_set) => {
            level_set.resolution.hash(state);
            level_set.distances.iter().for_each(|distance| distance.to_bits().hash(state));
        }
        ImplicitObject::Cylinder(cylinder) | ImplicitObject::TaperedCylinder(cylinder) => {
            hash_vec3(&cylinder.x1, state);
            hash_vec3(&cylinder.x2, state);
            cylinder.radius1.to_bits().hash(state);
            cylinder.radius2.to_bits().hash(state);
        }
        ImplicitObject::Union(children) | ImplicitObject::UnionClustered(children) => {
            children.len().hash(state);
            for child in children {
                hash_object(child, state);
            }
        }
        ImplicitObject::Transformed { transform, object } => {
            hash_transform(transform, state);
            hash_object(object, state);
        }
        ImplicitObject::Scaled { scale, object } => {
            hash_vec3(scale, state);
            hash_object(object, state);
        }
        ImplicitObject::Instanced { object } => hash_object(object, state),
    }
}

fn hash_vec3<H: Hasher>(vector: &Vec3, state: &mut H) {
    vector.x.to_bits().hash(state);
    vector.y.to_bits().hash(state);
    vector.z.to_bits().hash(state);
}

fn hash_quat<H: Hasher>(rotation: &Quat, state: &mut H) {
    let coords = rotation.coords;
    for component in coords.iter() {
        component.to_bits().hash(state);
    }
}

fn hash_transform<H: Hasher>(transform: &Transform, state: &mut H) {
    hash_vec3(&transform.position, state);
    hash_quat(&transform.rotation, state);
    hash_vec3(&transform.scale, state);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_content_hashes_equal() {
        let a = ImplicitObject::cuboid(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0));
        let b = ImplicitObject::cuboid(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0));
        let c = ImplicitObject::cuboid(Vec3::zeros(), Vec3::new(2.0, 2.0, 2.0));

        assert_eq!(structural_hash(&a), structural_hash(&b));
        assert_ne!(structural_hash(&a), structural_hash(&c));
    }

    #[test]
    fn test_wrapper_changes_hash() {
        let sphere = ImplicitObject::sphere(Vec3::zeros(), 1.0);
        let scaled = ImplicitObject::scaled(Vec3::new(2.0, 2.0, 2.0), sphere.clone());

        assert_ne!(structural_hash(&sphere), structural_hash(&scaled));
    }

    #[test]
    fn test_type_hashes_are_distinct() {
        assert_ne!(type_hash(ImplicitObjectType::Box), type_hash(ImplicitObjectType::Sphere));
        assert_eq!(type_hash(ImplicitObjectType::Box), type_hash(ImplicitObjectType::Box));
    }
}

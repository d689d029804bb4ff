//! Packed shape decoding
//!
//! Scaled and instanced wrappers pack a concrete shape together with metadata
//! that the mesh pipeline needs separately: the concrete shape feeds the mesh
//! generator, the scale moves into the instance transform. Decoding is a switch
//! over (inner kind x {scaled, instanced}).

use super::implicit::{ImplicitObject, ImplicitObjectType, ImplicitRef};
use crate::foundation::math::Transform;

/// How a packed shape wraps its concrete payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackedForm {
    /// No wrapper
    Plain,
    /// Shared reference wrapper
    Instanced,
    /// Scale wrapper
    Scaled,
    /// Scale wrapper around a shared reference
    ScaledInstanced,
}

/// Inner kinds the unpacker knows how to decode
const UNPACKABLE_TYPES: [ImplicitObjectType; 6] = [
    ImplicitObjectType::Sphere,
    ImplicitObjectType::Box,
    ImplicitObjectType::Capsule,
    ImplicitObjectType::Convex,
    ImplicitObjectType::TriangleMesh,
    ImplicitObjectType::HeightField,
];

/// Returns true if the shape must go through [`unpack`] before mesh generation
///
/// Convex, triangle mesh and height field shapes are always recorded in packed
/// form; any scaled or instanced wrapper needs decoding as well.
pub fn needs_unpacking(shape: &ImplicitObject) -> bool {
    let tag = shape.shape_type();
    !tag.flags.is_empty()
        || matches!(
            tag.inner,
            ImplicitObjectType::Convex | ImplicitObjectType::TriangleMesh | ImplicitObjectType::HeightField
        )
}

/// Classify the wrapper layout of a shape
pub fn packed_form(shape: &ImplicitObject) -> PackedForm {
    let tag = shape.shape_type();
    match (tag.is_scaled(), tag.is_instanced()) {
        (false, false) => PackedForm::Plain,
        (false, true) => PackedForm::Instanced,
        (true, false) => PackedForm::Scaled,
        (true, true) => PackedForm::ScaledInstanced,
    }
}

/// Decode a packed shape into its concrete payload
///
/// When the shape is scaled, the extracted scale is multiplied into
/// `out_transform`. Returns `None` (and logs) for inner kinds outside the
/// supported set, which indicates a recording produced by an incompatible
/// physics version rather than bad user input.
pub fn unpack(shape: &ImplicitRef, out_transform: &mut Transform) -> Option<ImplicitRef> {
    let tag = shape.shape_type();
    if !UNPACKABLE_TYPES.contains(&tag.inner) {
        log::error!(
            "Attempted to unpack an unsupported shape type [{}] (scaled: {}, instanced: {})",
            tag.inner,
            tag.is_scaled(),
            tag.is_instanced()
        );
        return None;
    }

    match (packed_form(shape), shape.as_ref()) {
        (PackedForm::Plain, _) => Some(shape.clone()),
        (PackedForm::Scaled | PackedForm::ScaledInstanced, ImplicitObject::Scaled { scale, object }) => {
            out_transform.scale = out_transform.scale.component_mul(scale);
            unpack_child(object, out_transform)
        }
        (PackedForm::Instanced | PackedForm::ScaledInstanced, ImplicitObject::Instanced { object }) => {
            unpack_child(object, out_transform)
        }
        (form, _) => {
            log::error!("Shape tagged as {form:?} does not match its wrapper layout");
            None
        }
    }
}

fn unpack_child(object: &ImplicitRef, out_transform: &mut Transform) -> Option<ImplicitRef> {
    if object.shape_type().flags.is_empty() {
        Some(object.clone())
    } else {
        unpack(object, out_transform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use crate::shapes::implicit::ConvexHull;
    use approx::assert_relative_eq;
    use std::sync::Arc;

    #[test]
    fn test_scaled_sphere_unpacks_to_base_sphere() {
        let sphere = ImplicitObject::sphere(Vec3::zeros(), 1.0);
        let scaled = ImplicitObject::scaled(Vec3::new(2.0, 2.0, 2.0), sphere.clone());

        assert!(needs_unpacking(&scaled));
        let mut transform = Transform::identity();
        let unpacked = unpack(&scaled, &mut transform).unwrap();

        assert!(Arc::ptr_eq(&unpacked, &sphere));
        assert_relative_eq!(transform.scale, Vec3::new(2.0, 2.0, 2.0));
    }

    #[test]
    fn test_scaled_instanced_convex() {
        let convex = Arc::new(ImplicitObject::Convex(ConvexHull::cuboid(Vec3::new(1.0, 1.0, 1.0))));
        let packed = ImplicitObject::scaled(Vec3::new(1.0, 2.0, 3.0), ImplicitObject::instanced(convex.clone()));

        assert_eq!(packed_form(&packed), PackedForm::ScaledInstanced);
        let mut transform = Transform::identity();
        let unpacked = unpack(&packed, &mut transform).unwrap();

        assert!(Arc::ptr_eq(&unpacked, &convex));
        assert_relative_eq!(transform.scale, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_instanced_scaled_convex() {
        let convex = Arc::new(ImplicitObject::Convex(ConvexHull::cuboid(Vec3::new(1.0, 1.0, 1.0))));
        let packed = ImplicitObject::instanced(ImplicitObject::scaled(Vec3::new(3.0, 3.0, 3.0), convex.clone()));

        let mut transform = Transform::identity();
        let unpacked = unpack(&packed, &mut transform).unwrap();

        assert!(Arc::ptr_eq(&unpacked, &convex));
        assert_relative_eq!(transform.scale, Vec3::new(3.0, 3.0, 3.0));
    }

    #[test]
    fn test_plain_convex_needs_unpacking_but_is_returned_as_is() {
        let convex = Arc::new(ImplicitObject::Convex(ConvexHull::cuboid(Vec3::new(1.0, 1.0, 1.0))));
        assert!(needs_unpacking(&convex));

        let mut transform = Transform::identity();
        let unpacked = unpack(&convex, &mut transform).unwrap();
        assert!(Arc::ptr_eq(&unpacked, &convex));
        assert_eq!(transform, Transform::identity());
    }

    #[test]
    fn test_plain_primitives_do_not_need_unpacking() {
        assert!(!needs_unpacking(&ImplicitObject::sphere(Vec3::zeros(), 1.0)));
        assert!(!needs_unpacking(&ImplicitObject::cuboid(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0))));
    }

    #[test]
    fn test_unsupported_type_fails() {
        let union = ImplicitObject::union(vec![ImplicitObject::sphere(Vec3::zeros(), 1.0)]);
        let scaled = ImplicitObject::scaled(Vec3::new(2.0, 2.0, 2.0), union);

        let mut transform = Transform::identity();
        assert!(unpack(&scaled, &mut transform).is_none());
    }
}

//! Shape to generator dispatch

use super::generators::{
    BoxGenerator, CapsuleGenerator, ConvexGenerator, HeightFieldGenerator, MeshGenerator, SphereGenerator,
    TriangleMeshGenerator,
};
use crate::foundation::math::Vec3;
use crate::shapes::{ImplicitObject, ImplicitObjectType};

/// Returns true if concrete shapes of `object_type` can be turned into a mesh
pub fn has_generator(object_type: ImplicitObjectType) -> bool {
    matches!(
        object_type,
        ImplicitObjectType::Sphere
            | ImplicitObjectType::Box
            | ImplicitObjectType::Capsule
            | ImplicitObjectType::Convex
            | ImplicitObjectType::TriangleMesh
            | ImplicitObjectType::HeightField
    )
}

/// Build the generator for a concrete shape
///
/// `shape` must already be unpacked. Spheres and capsules are generated around
/// the origin; their placement travels in the instance transform. Planes,
/// level sets and cylinders have no generator and return `None`; so do
/// composites, which the hierarchy walker never hands to the factory.
pub fn create_generator(shape: &ImplicitObject, complexity_factor: f32) -> Option<Box<dyn MeshGenerator>> {
    match shape {
        ImplicitObject::Sphere(sphere) => Some(Box::new(SphereGenerator::new(
            Vec3::zeros(),
            sphere.radius,
            complexity_factor,
        ))),
        ImplicitObject::Box(shape) => Some(Box::new(BoxGenerator {
            center: shape.center(),
            half_extents: shape.extents() * 0.5,
        })),
        ImplicitObject::Capsule(capsule) => Some(Box::new(CapsuleGenerator::new(
            capsule.radius,
            capsule.height(),
            complexity_factor,
        ))),
        ImplicitObject::Convex(hull) => Some(Box::new(ConvexGenerator {
            vertices: hull.vertices.clone(),
            faces: hull.faces.clone(),
        })),
        ImplicitObject::TriangleMesh(mesh) => Some(Box::new(TriangleMeshGenerator {
            vertices: mesh.vertices.clone(),
            triangles: mesh.triangles.clone(),
            reverse_orientation: false,
        })),
        ImplicitObject::HeightField(field) => Some(Box::new(HeightFieldGenerator {
            heights: field.heights.clone(),
            rows: field.rows,
            columns: field.columns,
            scale: field.scale,
            reverse_orientation: true,
        })),
        other => {
            log::trace!("No mesh generator for shape type [{}]", other.shape_type().inner);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{Cylinder, Plane};

    #[test]
    fn test_supported_primitives_have_generators() {
        let shapes = [
            ImplicitObject::sphere(Vec3::zeros(), 1.0),
            ImplicitObject::cuboid(Vec3::zeros(), Vec3::new(1.0, 2.0, 3.0)),
            ImplicitObject::capsule(Vec3::zeros(), Vec3::z(), 0.5),
        ];
        let names: Vec<&str> = shapes
            .iter()
            .map(|shape| create_generator(shape, 1.0).map(|generator| generator.name()).unwrap_or("none"))
            .collect();

        assert_eq!(names, vec!["Sphere", "Box", "Capsule"]);
    }

    #[test]
    fn test_unsupported_primitives_return_none() {
        let plane = ImplicitObject::Plane(Plane {
            point: Vec3::zeros(),
            normal: Vec3::z(),
        });
        let cylinder = ImplicitObject::Cylinder(Cylinder {
            x1: Vec3::zeros(),
            x2: Vec3::z(),
            radius1: 1.0,
            radius2: 1.0,
        });

        assert!(create_generator(&plane, 1.0).is_none());
        assert!(create_generator(&cylinder, 1.0).is_none());
        let tapered = ImplicitObject::TaperedCylinder(Cylinder {
            x1: Vec3::zeros(),
            x2: Vec3::z(),
            radius1: 1.0,
            radius2: 0.5,
        });
        assert!(create_generator(&tapered, 1.0).is_none());
        assert!(!has_generator(ImplicitObjectType::TaperedCylinder));
        assert!(!has_generator(ImplicitObjectType::Union));
        assert!(has_generator(ImplicitObjectType::HeightField));
    }

    #[test]
    fn test_sphere_is_generated_at_origin() {
        let shape = ImplicitObject::sphere(Vec3::new(5.0, 0.0, 0.0), 2.0);
        let data = create_generator(&shape, 0.5).map(|generator| generator.generate()).unwrap();

        for position in &data.positions {
            approx::assert_relative_eq!(position.norm(), 2.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_box_generator_uses_half_extents() {
        let shape = ImplicitObject::cuboid(Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 4.0, 6.0));
        let data = create_generator(&shape, 1.0).map(|generator| generator.generate()).unwrap();

        let max = data.positions.iter().fold(Vec3::repeat(f32::MIN), |acc, p| acc.sup(p));
        assert_eq!(max, Vec3::new(2.0, 2.0, 3.0));
    }
}

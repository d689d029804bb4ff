//! Math utilities and types
//!
//! Provides the vector, rotation and transform types shared by the shape model,
//! the mesh generators and the render instances.

pub use nalgebra::{Matrix3, Matrix4, Quaternion, Unit, Vector2, Vector3, Vector4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Transform representing position, rotation, and scale
///
/// Composition follows the usual scale-rotate-translate order: a point `p` is
/// mapped to `position + rotation * (scale * p)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Position in 3D space
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform with only position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a transform with position and rotation
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            ..Default::default()
        }
    }

    /// Create a transform carrying only a (possibly non-uniform) scale
    pub fn from_scale(scale: Vec3) -> Self {
        Self {
            scale,
            ..Default::default()
        }
    }

    /// Convert to a transformation matrix
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }

    /// Apply this transform to a point
    pub fn transform_point(&self, point: Point3) -> Point3 {
        Point3::from(self.position + self.rotation * point.coords.component_mul(&self.scale))
    }

    /// Apply this transform to a vector (no translation)
    pub fn transform_vector(&self, vector: Vec3) -> Vec3 {
        self.rotation * vector.component_mul(&self.scale)
    }

    /// Combine this transform with another
    ///
    /// `self` is the parent, `other` is expressed in the parent's local space.
    /// Non-uniform parent scale combined with a rotated child is approximated
    /// component-wise, which is exact for every composition the pipeline makes.
    pub fn combine(&self, other: &Transform) -> Transform {
        Transform {
            position: self.position + self.rotation * (self.scale.component_mul(&other.position)),
            rotation: self.rotation * other.rotation,
            scale: self.scale.component_mul(&other.scale),
        }
    }

    /// Get the inverse transform
    pub fn inverse(&self) -> Transform {
        let inv_scale = Vec3::new(1.0 / self.scale.x, 1.0 / self.scale.y, 1.0 / self.scale.z);
        let inv_rotation = self.rotation.inverse();
        let inv_position = (inv_rotation * -self.position).component_mul(&inv_scale);

        Transform {
            position: inv_position,
            rotation: inv_rotation,
            scale: inv_scale,
        }
    }

    /// Returns true if every component is within `epsilon` of `other`
    pub fn approx_eq(&self, other: &Transform, epsilon: f32) -> bool {
        (self.position - other.position).amax() <= epsilon
            && (self.scale - other.scale).amax() <= epsilon
            && self.rotation.angle_to(&other.rotation) <= epsilon
    }
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// 2 * Pi
    pub const TAU: f32 = 2.0 * PI;

    /// Smallest length treated as non-degenerate by the mesh generators
    pub const KINDA_SMALL_NUMBER: f32 = 1.0e-4;
}

/// Rotation taking +Z onto `direction`
///
/// Falls back to identity for a zero-length direction and to a half turn
/// around X when `direction` points down -Z.
pub fn rotation_from_z_to(direction: &Vec3) -> Quat {
    let Some(axis) = direction.try_normalize(constants::KINDA_SMALL_NUMBER) else {
        return Quat::identity();
    };

    Quat::rotation_between(&Vec3::z(), &axis).unwrap_or_else(|| {
        Quat::from_axis_angle(&Vec3::x_axis(), constants::PI)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_combine_applies_parent_rotation_and_scale() {
        let parent = Transform {
            position: Vec3::new(10.0, 0.0, 0.0),
            rotation: Quat::from_axis_angle(&Vec3::z_axis(), constants::PI * 0.5),
            scale: Vec3::new(2.0, 2.0, 2.0),
        };
        let child = Transform::from_position(Vec3::new(1.0, 0.0, 0.0));

        let combined = parent.combine(&child);

        assert_relative_eq!(combined.position, Vec3::new(10.0, 2.0, 0.0), epsilon = 1e-5);
        assert_relative_eq!(combined.scale, Vec3::new(2.0, 2.0, 2.0));
    }

    #[test]
    fn test_inverse_round_trip() {
        let transform = Transform {
            position: Vec3::new(1.0, -2.0, 3.0),
            rotation: Quat::from_axis_angle(&Vec3::y_axis(), 0.7),
            scale: Vec3::new(2.0, 2.0, 2.0),
        };

        let round_trip = transform.combine(&transform.inverse());

        assert!(round_trip.approx_eq(&Transform::identity(), 1e-5));
    }

    #[test]
    fn test_transform_point_matches_matrix() {
        let transform = Transform {
            position: Vec3::new(0.5, 1.0, -1.0),
            rotation: Quat::from_axis_angle(&Vec3::x_axis(), 0.3),
            scale: Vec3::new(1.0, 2.0, 3.0),
        };
        let point = Point3::new(1.0, 1.0, 1.0);

        let direct = transform.transform_point(point);
        let via_matrix = transform.to_matrix().transform_point(&point);

        assert_relative_eq!(direct, via_matrix, epsilon = 1e-5);
    }

    #[test]
    fn test_rotation_from_z_to_handles_opposite_direction() {
        let down = rotation_from_z_to(&Vec3::new(0.0, 0.0, -3.0));
        assert_relative_eq!(down * Vec3::z(), -Vec3::z(), epsilon = 1e-5);

        let side = rotation_from_z_to(&Vec3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(side * Vec3::z(), Vec3::x(), epsilon = 1e-5);
    }
}

//! Implicit object model
//!
//! Read-only description of recorded physics collision shapes. Primitives carry
//! their payload directly; composites (unions, transformed, scaled and instanced
//! wrappers) reference children through [`ImplicitRef`], whose pointer identity
//! is what the hash cache keys on.

use crate::foundation::math::{Transform, Vec3};
use bitflags::bitflags;
use std::fmt;
use std::sync::Arc;

/// Shared, immutable handle to a recorded shape
pub type ImplicitRef = Arc<ImplicitObject>;

/// Concrete kind of a shape, ignoring packing wrappers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ImplicitObjectType {
    /// Sphere primitive
    Sphere,
    /// Axis-aligned box primitive
    Box,
    /// Infinite plane
    Plane,
    /// Capsule (swept sphere)
    Capsule,
    /// Child with an extra local transform
    Transformed,
    /// Aggregate of children
    Union,
    /// Aggregate of children produced by fracture clustering
    UnionClustered,
    /// Signed distance grid
    LevelSet,
    /// Convex hull
    Convex,
    /// Cylinder with different end radii
    TaperedCylinder,
    /// Cylinder
    Cylinder,
    /// Triangle mesh
    TriangleMesh,
    /// Height field grid
    HeightField,
}

impl ImplicitObjectType {
    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sphere => "Sphere",
            Self::Box => "Box",
            Self::Plane => "Plane",
            Self::Capsule => "Capsule",
            Self::Transformed => "Transformed",
            Self::Union => "Union",
            Self::UnionClustered => "UnionClustered",
            Self::LevelSet => "LevelSet",
            Self::Convex => "Convex",
            Self::TaperedCylinder => "TaperedCylinder",
            Self::Cylinder => "Cylinder",
            Self::TriangleMesh => "TriangleMesh",
            Self::HeightField => "HeightField",
        }
    }
}

impl fmt::Display for ImplicitObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags! {
    /// Packing wrappers applied on top of a concrete shape
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PackFlags: u8 {
        /// The shape is wrapped with a scale
        const SCALED = 1 << 0;
        /// The shape is a shared reference to deduplicated geometry
        const INSTANCED = 1 << 1;
    }
}

/// Full type tag of a shape: concrete kind plus packing flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShapeType {
    /// Concrete kind of the innermost shape
    pub inner: ImplicitObjectType,
    /// Wrappers between this object and the concrete shape
    pub flags: PackFlags,
}

impl ShapeType {
    /// Type tag of an unwrapped shape
    pub fn plain(inner: ImplicitObjectType) -> Self {
        Self {
            inner,
            flags: PackFlags::empty(),
        }
    }

    /// True if the tag carries the scaled wrapper flag
    pub fn is_scaled(&self) -> bool {
        self.flags.contains(PackFlags::SCALED)
    }

    /// True if the tag carries the instanced wrapper flag
    pub fn is_instanced(&self) -> bool {
        self.flags.contains(PackFlags::INSTANCED)
    }
}

/// Sphere primitive
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    /// Center in the shape's local space
    pub center: Vec3,
    /// Radius
    pub radius: f32,
}

/// Axis-aligned box primitive defined by its corners
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxShape {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl BoxShape {
    /// Box centered at `center` with full size `extents`
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self {
            min: center - extents * 0.5,
            max: center + extents * 0.5,
        }
    }

    /// Center of the box
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Full size along each axis
    pub fn extents(&self) -> Vec3 {
        self.max - self.min
    }
}

/// Capsule: segment between two points swept by a radius
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Capsule {
    /// First segment end point
    pub x1: Vec3,
    /// Second segment end point
    pub x2: Vec3,
    /// Sweep radius
    pub radius: f32,
}

impl Capsule {
    /// Midpoint of the segment
    pub fn center(&self) -> Vec3 {
        (self.x1 + self.x2) * 0.5
    }

    /// Segment direction (not normalized)
    pub fn axis(&self) -> Vec3 {
        self.x2 - self.x1
    }

    /// Segment length
    pub fn height(&self) -> f32 {
        self.axis().norm()
    }
}

/// Convex hull with polygonal faces
#[derive(Debug, Clone, PartialEq)]
pub struct ConvexHull {
    /// Hull vertices
    pub vertices: Vec<Vec3>,
    /// Faces as counter-clockwise vertex index loops
    pub faces: Vec<Vec<u32>>,
}

impl ConvexHull {
    /// Hull of an axis-aligned box, six quad faces
    pub fn cuboid(half_extents: Vec3) -> Self {
        let h = half_extents;
        let vertices = vec![
            Vec3::new(-h.x, -h.y, -h.z),
            Vec3::new(h.x, -h.y, -h.z),
            Vec3::new(h.x, h.y, -h.z),
            Vec3::new(-h.x, h.y, -h.z),
            Vec3::new(-h.x, -h.y, h.z),
            Vec3::new(h.x, -h.y, h.z),
            Vec3::new(h.x, h.y, h.z),
            Vec3::new(-h.x, h.y, h.z),
        ];
        let faces = vec![
            vec![0, 3, 2, 1],
            vec![4, 5, 6, 7],
            vec![0, 1, 5, 4],
            vec![2, 3, 7, 6],
            vec![1, 2, 6, 5],
            vec![0, 4, 7, 3],
        ];
        Self { vertices, faces }
    }
}

/// Indexed triangle mesh
#[derive(Debug, Clone, PartialEq)]
pub struct TriangleMeshShape {
    /// Mesh vertices
    pub vertices: Vec<Vec3>,
    /// Triangles as vertex index triples
    pub triangles: Vec<[u32; 3]>,
}

/// Regular height grid
#[derive(Debug, Clone, PartialEq)]
pub struct HeightField {
    /// Row-major heights, `rows * columns` entries
    pub heights: Vec<f32>,
    /// Number of samples along Y
    pub rows: usize,
    /// Number of samples along X
    pub columns: usize,
    /// Cell spacing along X and Y, height multiplier along Z
    pub scale: Vec3,
}

impl HeightField {
    /// Height sample at (`row`, `column`)
    pub fn height_at(&self, row: usize, column: usize) -> f32 {
        self.heights.get(row * self.columns + column).copied().unwrap_or(0.0)
    }
}

/// Infinite plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Any point on the plane
    pub point: Vec3,
    /// Plane normal
    pub normal: Vec3,
}

/// Signed distance grid (opaque to the mesh pipeline)
#[derive(Debug, Clone, PartialEq)]
pub struct LevelSet {
    /// Grid resolution along each axis
    pub resolution: [u32; 3],
    /// Distance samples
    pub distances: Vec<f32>,
}

/// Cylinder, optionally tapered
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cylinder {
    /// Bottom cap center
    pub x1: Vec3,
    /// Top cap center
    pub x2: Vec3,
    /// Radius at `x1`
    pub radius1: f32,
    /// Radius at `x2`
    pub radius2: f32,
}

/// A recorded collision shape
#[derive(Debug, Clone, PartialEq)]
pub enum ImplicitObject {
    /// Sphere primitive
    Sphere(Sphere),
    /// Box primitive
    Box(BoxShape),
    /// Capsule primitive
    Capsule(Capsule),
    /// Convex hull
    Convex(ConvexHull),
    /// Triangle mesh
    TriangleMesh(TriangleMeshShape),
    /// Height field
    HeightField(HeightField),
    /// Infinite plane
    Plane(Plane),
    /// Level set
    LevelSet(LevelSet),
    /// Cylinder
    Cylinder(Cylinder),
    /// Tapered cylinder
    TaperedCylinder(Cylinder),
    /// Aggregate of children
    Union(Vec<ImplicitRef>),
    /// Aggregate of children produced by fracture clustering
    UnionClustered(Vec<ImplicitRef>),
    /// Child with an extra local transform
    Transformed {
        /// Transform applied to the child
        transform: Transform,
        /// Wrapped shape
        object: ImplicitRef,
    },
    /// Child scaled (possibly non-uniformly)
    Scaled {
        /// Scale applied to the child
        scale: Vec3,
        /// Wrapped shape
        object: ImplicitRef,
    },
    /// Shared reference to deduplicated child geometry
    Instanced {
        /// Wrapped shape
        object: ImplicitRef,
    },
}

impl ImplicitObject {
    /// Sphere shorthand
    pub fn sphere(center: Vec3, radius: f32) -> ImplicitRef {
        Arc::new(Self::Sphere(Sphere { center, radius }))
    }

    /// Box shorthand, centered at `center` with full size `extents`
    pub fn cuboid(center: Vec3, extents: Vec3) -> ImplicitRef {
        Arc::new(Self::Box(BoxShape::from_center_extents(center, extents)))
    }

    /// Capsule shorthand
    pub fn capsule(x1: Vec3, x2: Vec3, radius: f32) -> ImplicitRef {
        Arc::new(Self::Capsule(Capsule { x1, x2, radius }))
    }

    /// Union shorthand
    pub fn union(children: Vec<ImplicitRef>) -> ImplicitRef {
        Arc::new(Self::Union(children))
    }

    /// Clustered union shorthand
    pub fn union_clustered(children: Vec<ImplicitRef>) -> ImplicitRef {
        Arc::new(Self::UnionClustered(children))
    }

    /// Transformed wrapper shorthand
    pub fn transformed(transform: Transform, object: ImplicitRef) -> ImplicitRef {
        Arc::new(Self::Transformed { transform, object })
    }

    /// Scaled wrapper shorthand
    pub fn scaled(scale: Vec3, object: ImplicitRef) -> ImplicitRef {
        Arc::new(Self::Scaled { scale, object })
    }

    /// Instanced wrapper shorthand
    pub fn instanced(object: ImplicitRef) -> ImplicitRef {
        Arc::new(Self::Instanced { object })
    }

    /// Concrete kind, looking through scaled and instanced wrappers
    pub fn inner_type(&self) -> ImplicitObjectType {
        self.shape_type().inner
    }

    /// Full type tag including packing flags
    pub fn shape_type(&self) -> ShapeType {
        match self {
            Self::Sphere(_) => ShapeType::plain(ImplicitObjectType::Sphere),
            Self::Box(_) => ShapeType::plain(ImplicitObjectType::Box),
            Self::Capsule(_) => ShapeType::plain(ImplicitObjectType::Capsule),
            Self::Convex(_) => ShapeType::plain(ImplicitObjectType::Convex),
            Self::TriangleMesh(_) => ShapeType::plain(ImplicitObjectType::TriangleMesh),
            Self::HeightField(_) => ShapeType::plain(ImplicitObjectType::HeightField),
            Self::Plane(_) => ShapeType::plain(ImplicitObjectType::Plane),
            Self::LevelSet(_) => ShapeType::plain(ImplicitObjectType::LevelSet),
            Self::Cylinder(_) => ShapeType::plain(ImplicitObjectType::Cylinder),
            Self::TaperedCylinder(_) => ShapeType::plain(ImplicitObjectType::TaperedCylinder),
            Self::Union(_) => ShapeType::plain(ImplicitObjectType::Union),
            Self::UnionClustered(_) => ShapeType::plain(ImplicitObjectType::UnionClustered),
            Self::Transformed { .. } => ShapeType::plain(ImplicitObjectType::Transformed),
            Self::Scaled { object, .. } => {
                let mut tag = object.shape_type();
                tag.flags |= PackFlags::SCALED;
                tag
            }
            Self::Instanced { object } => {
                let mut tag = object.shape_type();
                tag.flags |= PackFlags::INSTANCED;
                tag
            }
        }
    }

    /// Children of a union, `None` for every other shape
    pub fn union_children(&self) -> Option<&[ImplicitRef]> {
        match self {
            Self::Union(children) | Self::UnionClustered(children) => Some(children),
            _ => None,
        }
    }

    /// True for clustered unions
    pub fn is_cluster(&self) -> bool {
        matches!(self, Self::UnionClustered(_))
    }
}

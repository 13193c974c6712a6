//! Query shapes: rays, spheres, and oriented boxes.

use nalgebra::{Isometry3, Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::bounds::Aabb;

/// A ray defined by an origin point and a direction vector.
///
/// The direction does not need to be normalized. A zero direction is legal
/// to construct but deterministically produces no hits when queried.
///
/// # Example
///
/// ```
/// use mesh_bvh::Ray;
/// use nalgebra::{Point3, Vector3};
///
/// let ray = Ray::new(Point3::origin(), Vector3::new(2.0, 0.0, 0.0));
/// let p = ray.point_at(3.0);
/// assert!((p.x - 6.0).abs() < 1e-10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Ray {
    /// The origin of the ray.
    pub origin: Point3<f64>,
    /// The direction of the ray (not necessarily normalized).
    pub direction: Vector3<f64>,
}

impl Ray {
    /// Creates a new ray with the given origin and direction.
    #[must_use]
    pub const fn new(origin: Point3<f64>, direction: Vector3<f64>) -> Self {
        Self { origin, direction }
    }

    /// Returns the point along the ray at parameter `t`.
    #[inline]
    #[must_use]
    pub fn point_at(&self, t: f64) -> Point3<f64> {
        self.origin + self.direction * t
    }

    /// Component-wise reciprocal of the direction, for slab tests.
    ///
    /// Zero components map to infinity, which the slab arithmetic handles.
    #[inline]
    #[must_use]
    pub fn direction_inverse(&self) -> Vector3<f64> {
        Vector3::new(
            1.0 / self.direction.x,
            1.0 / self.direction.y,
            1.0 / self.direction.z,
        )
    }

    /// Check for a degenerate (zero-length) direction.
    #[inline]
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.direction.norm_squared() <= 0.0
    }
}

/// A sphere defined by center and radius.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Sphere {
    /// Center of the sphere.
    pub center: Point3<f64>,
    /// Radius of the sphere. A zero radius degenerates to a point query.
    pub radius: f64,
}

impl Sphere {
    /// Creates a new sphere.
    #[must_use]
    pub const fn new(center: Point3<f64>, radius: f64) -> Self {
        Self { center, radius }
    }
}

/// A box that is axis-aligned in its own local frame.
///
/// `transform` maps box-local coordinates into the mesh's frame, so the box
/// may be arbitrarily rotated and translated relative to the mesh. An
/// identity transform makes this an ordinary AABB query.
///
/// # Example
///
/// ```
/// use mesh_bvh::{Aabb, OrientedBox};
/// use nalgebra::{Isometry3, Point3, Vector3};
///
/// let obb = OrientedBox::new(
///     Aabb::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0)),
///     Isometry3::new(Vector3::new(5.0, 0.0, 0.0), Vector3::zeros()),
/// );
/// assert!((obb.transform.translation.x - 5.0).abs() < 1e-10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OrientedBox {
    /// The box extents in its own local frame.
    pub local: Aabb,
    /// Box-local to mesh-local transform.
    pub transform: Isometry3<f64>,
}

impl OrientedBox {
    /// Creates a new oriented box.
    #[must_use]
    pub const fn new(local: Aabb, transform: Isometry3<f64>) -> Self {
        Self { local, transform }
    }

    /// Creates an axis-aligned box query (identity transform).
    #[must_use]
    pub fn axis_aligned(local: Aabb) -> Self {
        Self {
            local,
            transform: Isometry3::identity(),
        }
    }
}

/// One face plane of an oriented box, with outward normal.
///
/// `signed_distance` is positive outside the box on this face's side.
#[derive(Debug, Clone, Copy)]
pub struct ObbPlane {
    /// Outward unit normal.
    pub normal: Vector3<f64>,
    /// Plane constant: `signed_distance(p) = normal . p + d`.
    pub d: f64,
}

impl ObbPlane {
    fn through(normal: Vector3<f64>, point: &Point3<f64>) -> Self {
        Self {
            normal,
            d: -normal.dot(&point.coords),
        }
    }

    /// Signed distance from a point to the plane.
    #[inline]
    #[must_use]
    pub fn signed_distance(&self, point: &Point3<f64>) -> f64 {
        self.normal.dot(&point.coords) + self.d
    }
}

/// Per-query traversal state for an oriented box.
///
/// Built once per top-level call, never cached across calls, and never
/// stored in shared state: the six face planes and eight corner points in
/// the mesh frame drive node-level rejection, and the inverse transform
/// moves triangle vertices into the box's local frame for the exact leaf
/// tests.
#[derive(Debug, Clone)]
pub struct ObbFrame {
    /// The six face planes in the mesh frame, outward normals.
    pub planes: [ObbPlane; 6],
    /// The eight corner points in the mesh frame.
    pub points: [Point3<f64>; 8],
    /// Mesh-local to box-local transform.
    pub inverse: Isometry3<f64>,
}

impl ObbFrame {
    /// Compute planes, corner points, and the inverse transform for a box.
    #[must_use]
    pub fn new(obb: &OrientedBox) -> Self {
        let rotation = obb.transform.rotation;
        let min = obb.transform * obb.local.min;
        let max = obb.transform * obb.local.max;

        let axes = [
            rotation * Vector3::x(),
            rotation * Vector3::y(),
            rotation * Vector3::z(),
        ];

        let planes = [
            ObbPlane::through(axes[0], &max),
            ObbPlane::through(-axes[0], &min),
            ObbPlane::through(axes[1], &max),
            ObbPlane::through(-axes[1], &min),
            ObbPlane::through(axes[2], &max),
            ObbPlane::through(-axes[2], &min),
        ];

        let points = obb.local.corners().map(|c| obb.transform * c);

        Self {
            planes,
            points,
            inverse: obb.transform.inverse(),
        }
    }

    /// Move a mesh-frame point into the box's local frame.
    #[inline]
    #[must_use]
    pub fn to_local(&self, point: &Point3<f64>) -> Point3<f64> {
        self.inverse * point
    }
}

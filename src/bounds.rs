//! Axis-aligned bounding box and the node-level pruning predicates.
//!
//! BVH nodes carry a compact `[f64; 6]` bounds array; this module
//! reconstructs a box from it and tests overlap against each query shape.
//! The ray and sphere tests are exact; the oriented box test is
//! conservative (it may report overlap for a near miss), which is fine at
//! node level because leaves re-verify with exact triangle tests.

use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::shape::{ObbFrame, Sphere};

/// An axis-aligned bounding box.
///
/// # Example
///
/// ```
/// use mesh_bvh::Aabb;
/// use nalgebra::Point3;
///
/// let aabb = Aabb::new(
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(10.0, 10.0, 10.0),
/// );
/// assert!(aabb.contains(&Point3::new(5.0, 5.0, 5.0)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Aabb {
    /// Minimum corner (smallest x, y, z values).
    pub min: Point3<f64>,
    /// Maximum corner (largest x, y, z values).
    pub max: Point3<f64>,
}

impl Aabb {
    /// Create a new AABB from two corners.
    ///
    /// The corners are reordered per axis if necessary.
    #[must_use]
    pub fn new(a: Point3<f64>, b: Point3<f64>) -> Self {
        Self {
            min: Point3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Point3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Reconstruct a box from the compact node bounds layout
    /// `[min_x, min_y, min_z, max_x, max_y, max_z]`.
    #[inline]
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Point3::new is not const in nalgebra
    pub fn from_bounds(bounds: &[f64; 6]) -> Self {
        Self {
            min: Point3::new(bounds[0], bounds[1], bounds[2]),
            max: Point3::new(bounds[3], bounds[4], bounds[5]),
        }
    }

    /// Convert to the compact node bounds layout.
    #[inline]
    #[must_use]
    pub fn to_bounds(&self) -> [f64; 6] {
        [
            self.min.x, self.min.y, self.min.z, self.max.x, self.max.y, self.max.z,
        ]
    }

    /// Create the tight bounding box of a triangle.
    #[must_use]
    pub fn from_triangle(tri: &[Point3<f64>; 3]) -> Self {
        Self {
            min: Point3::new(
                tri[0].x.min(tri[1].x).min(tri[2].x),
                tri[0].y.min(tri[1].y).min(tri[2].y),
                tri[0].z.min(tri[1].z).min(tri[2].z),
            ),
            max: Point3::new(
                tri[0].x.max(tri[1].x).max(tri[2].x),
                tri[0].y.max(tri[1].y).max(tri[2].y),
                tri[0].z.max(tri[1].z).max(tri[2].z),
            ),
        }
    }

    /// Get the center of the box.
    #[inline]
    #[must_use]
    pub fn center(&self) -> Point3<f64> {
        Point3::new(
            (self.min.x + self.max.x) * 0.5,
            (self.min.y + self.max.y) * 0.5,
            (self.min.z + self.max.z) * 0.5,
        )
    }

    /// Get the half-extents of the box.
    #[inline]
    #[must_use]
    pub fn half_extents(&self) -> Vector3<f64> {
        (self.max - self.min) * 0.5
    }

    /// Check if the box contains a point (boundary inclusive).
    #[inline]
    #[must_use]
    pub fn contains(&self, point: &Point3<f64>) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Check if this box intersects another (touching counts).
    #[inline]
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Get the eight corner points of the box.
    #[must_use]
    pub fn corners(&self) -> [Point3<f64>; 8] {
        [
            Point3::new(self.min.x, self.min.y, self.min.z),
            Point3::new(self.max.x, self.min.y, self.min.z),
            Point3::new(self.min.x, self.max.y, self.min.z),
            Point3::new(self.max.x, self.max.y, self.min.z),
            Point3::new(self.min.x, self.min.y, self.max.z),
            Point3::new(self.max.x, self.min.y, self.max.z),
            Point3::new(self.min.x, self.max.y, self.max.z),
            Point3::new(self.max.x, self.max.y, self.max.z),
        ]
    }

    /// Slab-method ray test.
    ///
    /// `dir_inv` is the component-wise reciprocal of the ray direction,
    /// precomputed once per query. Returns the parametric entry and exit
    /// distances, with the entry clamped to zero for rays starting inside.
    #[must_use]
    pub fn intersect_ray(
        &self,
        origin: &Point3<f64>,
        dir_inv: &Vector3<f64>,
    ) -> Option<(f64, f64)> {
        let t1 = (self.min.x - origin.x) * dir_inv.x;
        let t2 = (self.max.x - origin.x) * dir_inv.x;
        let t3 = (self.min.y - origin.y) * dir_inv.y;
        let t4 = (self.max.y - origin.y) * dir_inv.y;
        let t5 = (self.min.z - origin.z) * dir_inv.z;
        let t6 = (self.max.z - origin.z) * dir_inv.z;

        let t_min = t1.min(t2).max(t3.min(t4)).max(t5.min(t6));
        let t_max = t1.max(t2).min(t3.max(t4)).min(t5.max(t6));

        if t_max >= t_min && t_max >= 0.0 {
            Some((t_min.max(0.0), t_max))
        } else {
            None
        }
    }

    /// Sphere overlap test.
    ///
    /// Squared distance from the sphere center to the nearest point of the
    /// box, compared to the squared radius.
    #[must_use]
    pub fn intersects_sphere(&self, sphere: &Sphere) -> bool {
        let nearest = Point3::new(
            sphere.center.x.clamp(self.min.x, self.max.x),
            sphere.center.y.clamp(self.min.y, self.max.y),
            sphere.center.z.clamp(self.min.z, self.max.z),
        );
        (nearest - sphere.center).norm_squared() <= sphere.radius * sphere.radius
    }

    /// Conservative separating-axis test against an oriented box.
    ///
    /// Tests the three box face axes against the oriented box's corner
    /// points, then the oriented box's six face planes against this box's
    /// corners. Edge-cross axes are skipped, so a disjoint pair can still
    /// report overlap; callers re-verify at leaf level with exact triangle
    /// tests.
    #[must_use]
    pub fn intersects_obb(&self, frame: &ObbFrame) -> bool {
        // Face axes of this box: separated if all corner points of the
        // oriented box project outside one of the three slabs.
        for axis in 0..3 {
            let mut lo = f64::INFINITY;
            let mut hi = f64::NEG_INFINITY;
            for point in &frame.points {
                lo = lo.min(point[axis]);
                hi = hi.max(point[axis]);
            }
            if hi < self.min[axis] || lo > self.max[axis] {
                return false;
            }
        }

        // Face planes of the oriented box: separated if every corner of
        // this box lies outside one of them.
        let corners = self.corners();
        for plane in &frame.planes {
            if corners.iter().all(|c| plane.signed_distance(c) > 0.0) {
                return false;
            }
        }

        true
    }
}

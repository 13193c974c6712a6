//! Exact per-triangle intersection tests.
//!
//! Traversal prunes with conservative node-level bounds predicates; whatever
//! survives is verified here against the actual triangle geometry.

use nalgebra::{Point3, Vector3};

use crate::bounds::Aabb;
use crate::shape::Sphere;

/// Tolerance shared by the exact predicates.
const EPSILON: f64 = 1e-10;

/// Ray-triangle intersection using the Möller–Trumbore algorithm.
///
/// The direction does not need to be normalized; `t` is in units of the
/// direction's length. Returns `(t, u, v)` with `u`, `v` the barycentric
/// coordinates of the hit, or `None` for a miss, a parallel ray, or a
/// degenerate triangle.
///
/// # Example
///
/// ```
/// use mesh_bvh::triangle::ray_triangle_intersect;
/// use nalgebra::{Point3, Vector3};
///
/// let hit = ray_triangle_intersect(
///     &Point3::new(0.25, 0.25, 1.0),
///     &Vector3::new(0.0, 0.0, -1.0),
///     &[
///         Point3::new(0.0, 0.0, 0.0),
///         Point3::new(1.0, 0.0, 0.0),
///         Point3::new(0.0, 1.0, 0.0),
///     ],
/// );
/// let (t, _, _) = hit.expect("ray should hit");
/// assert!((t - 1.0).abs() < 1e-10);
/// ```
#[must_use]
pub fn ray_triangle_intersect(
    origin: &Point3<f64>,
    direction: &Vector3<f64>,
    tri: &[Point3<f64>; 3],
) -> Option<(f64, f64, f64)> {
    let edge1 = tri[1] - tri[0];
    let edge2 = tri[2] - tri[0];

    let h = direction.cross(&edge2);
    let a = edge1.dot(&h);

    // Ray is parallel to triangle
    if a.abs() < EPSILON {
        return None;
    }

    let f = 1.0 / a;
    let s = origin - tri[0];
    let u = f * s.dot(&h);

    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(&edge1);
    let v = f * direction.dot(&q);

    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(&q);

    if t > EPSILON {
        Some((t, u, v))
    } else {
        None
    }
}

/// Compute the closest point on a triangle to a query point.
///
/// Implements the region-based algorithm from "Real-Time Collision
/// Detection" by Christer Ericson.
#[must_use]
pub fn closest_point_on_triangle(point: &Point3<f64>, tri: &[Point3<f64>; 3]) -> Point3<f64> {
    let [v0, v1, v2] = *tri;
    let ab = v1 - v0;
    let ac = v2 - v0;
    let ap = point - v0;

    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);

    // Vertex region outside A
    if d1 <= 0.0 && d2 <= 0.0 {
        return v0;
    }

    let bp = point - v1;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);

    // Vertex region outside B
    if d3 >= 0.0 && d4 <= d3 {
        return v1;
    }

    // Edge region of AB
    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return v0 + ab * v;
    }

    let cp = point - v2;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);

    // Vertex region outside C
    if d6 >= 0.0 && d5 <= d6 {
        return v2;
    }

    // Edge region of AC
    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return v0 + ac * w;
    }

    // Edge region of BC
    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return v1 + (v2 - v1) * w;
    }

    // Face region
    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;

    v0 + ab * v + ac * w
}

/// Exact sphere-triangle overlap test.
///
/// True when the closest point on the triangle lies within the sphere's
/// radius of its center. A zero-radius sphere degenerates to a point-on-
/// triangle test.
#[must_use]
pub fn sphere_intersects_triangle(sphere: &Sphere, tri: &[Point3<f64>; 3]) -> bool {
    let closest = closest_point_on_triangle(&sphere.center, tri);
    (closest - sphere.center).norm_squared() <= sphere.radius * sphere.radius
}

/// Exact triangle-AABB overlap test.
///
/// Separating-axis test over the 13 candidate axes: the three box face
/// axes, the triangle's normal, and the nine cross products of box axes
/// with triangle edges. Used at leaf level with triangle vertices already
/// transformed into the query box's local frame.
#[must_use]
pub fn triangle_intersects_aabb(aabb: &Aabb, tri: &[Point3<f64>; 3]) -> bool {
    let center = aabb.center();
    let h = aabb.half_extents();

    // Work in box-centered coordinates.
    let v = [tri[0] - center, tri[1] - center, tri[2] - center];
    let edges = [v[1] - v[0], v[2] - v[1], v[0] - v[2]];

    // Box face axes.
    for axis in 0..3 {
        let min = v[0][axis].min(v[1][axis]).min(v[2][axis]);
        let max = v[0][axis].max(v[1][axis]).max(v[2][axis]);
        if min > h[axis] || max < -h[axis] {
            return false;
        }
    }

    // Triangle plane.
    let normal = edges[0].cross(&edges[1]);
    let distance = normal.dot(&v[0]);
    let radius = h.x * normal.x.abs() + h.y * normal.y.abs() + h.z * normal.z.abs();
    if distance.abs() > radius {
        return false;
    }

    // Cross products of box axes with triangle edges.
    let box_axes = [Vector3::x(), Vector3::y(), Vector3::z()];
    for box_axis in &box_axes {
        for edge in &edges {
            let axis = box_axis.cross(edge);
            if axis.norm_squared() < EPSILON * EPSILON {
                continue;
            }

            let p0 = axis.dot(&v[0]);
            let p1 = axis.dot(&v[1]);
            let p2 = axis.dot(&v[2]);
            let min = p0.min(p1).min(p2);
            let max = p0.max(p1).max(p2);

            let radius = h.x * axis.x.abs() + h.y * axis.y.abs() + h.z * axis.z.abs();
            if min > radius || max < -radius {
                return false;
            }
        }
    }

    true
}

/// Exact triangle-triangle overlap test using the Separating Axis Theorem.
///
/// Candidate axes are both face normals and the nine pairwise edge cross
/// products, tested sequentially. Coplanar pairs need their own axis set:
/// every edge cross collapses onto the shared normal (or zero), so the six
/// in-plane edge normals are tested instead. Near-zero axes (parallel
/// edges, degenerate triangles) are skipped rather than treated as
/// separating.
#[must_use]
pub fn triangles_intersect(tri_a: &[Point3<f64>; 3], tri_b: &[Point3<f64>; 3]) -> bool {
    // Quick rejection on the triangle bounding boxes.
    if !Aabb::from_triangle(tri_a).intersects(&Aabb::from_triangle(tri_b)) {
        return false;
    }

    let edges_a = [
        tri_a[1] - tri_a[0],
        tri_a[2] - tri_a[1],
        tri_a[0] - tri_a[2],
    ];
    let edges_b = [
        tri_b[1] - tri_b[0],
        tri_b[2] - tri_b[1],
        tri_b[0] - tri_b[2],
    ];

    let normal_a = edges_a[0].cross(&edges_a[1]);
    let normal_b = edges_b[0].cross(&edges_b[1]);

    if axis_separates(&normal_a, tri_a, tri_b) || axis_separates(&normal_b, tri_a, tri_b) {
        return false;
    }

    if is_coplanar(&normal_a, tri_a, tri_b) {
        // Edge crosses decide nothing in a shared plane; only the
        // in-plane edge normals can still separate.
        for edge in edges_a.iter().chain(&edges_b) {
            if axis_separates(&normal_a.cross(edge), tri_a, tri_b) {
                return false;
            }
        }
        return true;
    }

    for edge_a in &edges_a {
        for edge_b in &edges_b {
            if axis_separates(&edge_a.cross(edge_b), tri_a, tri_b) {
                return false;
            }
        }
    }

    true
}

/// Check whether every vertex of `tri_b` lies in `tri_a`'s plane.
fn is_coplanar(
    normal_a: &Vector3<f64>,
    tri_a: &[Point3<f64>; 3],
    tri_b: &[Point3<f64>; 3],
) -> bool {
    let length = normal_a.norm();
    if length < EPSILON {
        return false;
    }
    let unit = normal_a / length;
    tri_b.iter().all(|v| unit.dot(&(v - tri_a[0])).abs() < EPSILON)
}

/// Project both triangles onto an axis and check for a separating gap.
///
/// A near-zero axis decides nothing and reports no separation.
fn axis_separates(axis: &Vector3<f64>, tri_a: &[Point3<f64>; 3], tri_b: &[Point3<f64>; 3]) -> bool {
    if axis.norm_squared() < EPSILON * EPSILON {
        return false;
    }

    let project = |tri: &[Point3<f64>; 3]| {
        let p0 = axis.dot(&tri[0].coords);
        let p1 = axis.dot(&tri[1].coords);
        let p2 = axis.dot(&tri[2].coords);
        (p0.min(p1).min(p2), p0.max(p1).max(p2))
    };

    let (min_a, max_a) = project(tri_a);
    let (min_b, max_b) = project(tri_b);

    max_a < min_b - EPSILON || max_b < min_a - EPSILON
}

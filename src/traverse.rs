//! Query entry points: recursive and stack-based descent over the tree.
//!
//! Every query follows the same layering: a cheap conservative test against
//! a node's bounds decides whether to descend, and triangles that survive to
//! a leaf are verified with the exact tests in [`triangle`](crate::triangle).
//! The nearest-ray query additionally orders children along the stored split
//! axis and prunes the far child when the current best hit provably beats
//! everything in it.

use nalgebra::{Isometry3, Point3, Vector3};
use smallvec::SmallVec;
use tracing::trace;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::bounds::Aabb;
use crate::error::BvhResult;
use crate::mesh::TriangleMesh;
use crate::node::{Bvh, BvhNode};
use crate::shape::{ObbFrame, OrientedBox, Ray, Sphere};
use crate::triangle::{
    ray_triangle_intersect, sphere_intersects_triangle, triangle_intersects_aabb,
    triangles_intersect,
};

/// Inline capacity of the traversal work-stacks; enough for a balanced
/// tree of a few billion triangles before spilling to the heap.
const STACK_SIZE: usize = 32;

/// A single ray-triangle intersection.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RayHit {
    /// The intersection point in mesh coordinates.
    pub point: Point3<f64>,
    /// Euclidean distance from the ray origin to `point`.
    pub distance: f64,
    /// Index of the hit triangle (index-buffer triple / 3).
    pub triangle: u32,
    /// Barycentric coordinates of the hit within the triangle.
    pub barycentric: (f64, f64),
}

impl Bvh {
    /// Find the closest ray-triangle intersection in the tree.
    ///
    /// Children of an internal node are visited in ray order along the
    /// node's split axis; once the near child yields a hit, the far child
    /// is skipped when the hit's along-axis offset from the ray origin is
    /// already closer than both of the far child's bound planes. That
    /// axis-restricted bound may descend more than strictly necessary but
    /// never skips a subtree that could hold a closer hit.
    ///
    /// A degenerate (zero-direction) ray reports no hit. Ties between
    /// equally distant hits resolve to the first-visited child.
    ///
    /// # Errors
    ///
    /// Returns [`BvhError::MeshDataMismatch`](crate::BvhError) if a leaf
    /// references data outside the mesh buffers.
    pub fn closest_ray_hit(&self, mesh: &TriangleMesh, ray: &Ray) -> BvhResult<Option<RayHit>> {
        if ray.is_degenerate() {
            return Ok(None);
        }
        let dir_inv = ray.direction_inverse();
        self.closest_hit_descend(0, mesh, ray, &dir_inv)
    }

    fn closest_hit_descend(
        &self,
        index: u32,
        mesh: &TriangleMesh,
        ray: &Ray,
        dir_inv: &Vector3<f64>,
    ) -> BvhResult<Option<RayHit>> {
        match *self.node(index) {
            BvhNode::Leaf { offset, count, .. } => closest_hit_in_leaf(mesh, ray, offset, count),
            BvhNode::Internal {
                left,
                right,
                split_axis,
                ..
            } => {
                // Whichever side of the split plane the ray comes from is
                // more likely to hold the nearest hit; search it first.
                let axis = split_axis as usize;
                let (near, far) = if ray.direction[axis] >= 0.0 {
                    (left, right)
                } else {
                    (right, left)
                };

                let near_hit = if self
                    .node(near)
                    .aabb()
                    .intersect_ray(&ray.origin, dir_inv)
                    .is_some()
                {
                    self.closest_hit_descend(near, mesh, ray, dir_inv)?
                } else {
                    None
                };

                // If the near child's hit is closer along the split axis
                // than both bound planes of the far child, nothing in the
                // far child can beat it.
                if let Some(hit) = near_hit {
                    let far_bounds = self.node(far).bounds();
                    let to_point = ray.origin[axis] - hit.point[axis];
                    let to_near_plane = ray.origin[axis] - far_bounds[axis];
                    let to_far_plane = ray.origin[axis] - far_bounds[axis + 3];

                    let to_point_sq = to_point * to_point;
                    if to_point_sq <= to_near_plane * to_near_plane
                        && to_point_sq <= to_far_plane * to_far_plane
                    {
                        return Ok(Some(hit));
                    }
                }

                let far_hit = if self
                    .node(far)
                    .aabb()
                    .intersect_ray(&ray.origin, dir_inv)
                    .is_some()
                {
                    self.closest_hit_descend(far, mesh, ray, dir_inv)?
                } else {
                    None
                };

                Ok(match (near_hit, far_hit) {
                    (Some(a), Some(b)) => Some(if a.distance <= b.distance { a } else { b }),
                    (a, b) => a.or(b),
                })
            }
        }
    }

    /// Collect every ray-triangle intersection into `hits`.
    ///
    /// Order across children is unspecified. The accumulator is caller
    /// owned and appended to, so a single allocation can serve many
    /// queries.
    ///
    /// # Errors
    ///
    /// Returns [`BvhError::MeshDataMismatch`](crate::BvhError) if a leaf
    /// references data outside the mesh buffers.
    pub fn all_ray_hits(
        &self,
        mesh: &TriangleMesh,
        ray: &Ray,
        hits: &mut Vec<RayHit>,
    ) -> BvhResult<()> {
        if ray.is_degenerate() {
            return Ok(());
        }
        let dir_inv = ray.direction_inverse();

        let mut stack: SmallVec<[u32; STACK_SIZE]> = SmallVec::new();
        stack.push(0);

        while let Some(index) = stack.pop() {
            match *self.node(index) {
                BvhNode::Leaf { offset, count, .. } => {
                    all_hits_in_leaf(mesh, ray, offset, count, hits)?;
                }
                BvhNode::Internal { left, right, .. } => {
                    for child in [left, right] {
                        if self
                            .node(child)
                            .aabb()
                            .intersect_ray(&ray.origin, &dir_inv)
                            .is_some()
                        {
                            stack.push(child);
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Check whether the sphere touches any triangle in the tree.
    ///
    /// Subtrees whose bounds miss the sphere are rejected outright; leaves
    /// run the exact sphere-triangle test and the first touching triangle
    /// short-circuits the whole query.
    ///
    /// # Errors
    ///
    /// Returns [`BvhError::MeshDataMismatch`](crate::BvhError) if a leaf
    /// references data outside the mesh buffers.
    pub fn intersects_sphere(&self, mesh: &TriangleMesh, sphere: &Sphere) -> BvhResult<bool> {
        let mut stack: SmallVec<[u32; STACK_SIZE]> = SmallVec::new();
        stack.push(0);

        while let Some(index) = stack.pop() {
            let node = self.node(index);
            if !node.aabb().intersects_sphere(sphere) {
                continue;
            }

            match *node {
                BvhNode::Leaf { offset, count, .. } => {
                    for first in leaf_triangles(offset, count) {
                        let tri = mesh.triangle_at(first)?;
                        if sphere_intersects_triangle(sphere, &tri) {
                            return Ok(true);
                        }
                    }
                }
                BvhNode::Internal { left, right, .. } => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }

        Ok(false)
    }

    /// Check whether an oriented box touches any triangle in the tree.
    ///
    /// The box's separating planes, corner points, and inverse transform
    /// are computed once per call (never cached across calls). Node-level
    /// rejection uses the conservative AABB-OBB separating-axis test; at
    /// leaves, triangle vertices are moved into the box's local frame for
    /// the exact axis-aligned test.
    ///
    /// # Errors
    ///
    /// Returns [`BvhError::MeshDataMismatch`](crate::BvhError) if a leaf
    /// references data outside the mesh buffers.
    pub fn intersects_box(&self, mesh: &TriangleMesh, obb: &OrientedBox) -> BvhResult<bool> {
        let frame = ObbFrame::new(obb);
        trace!("oriented box query: rebuilt planes/points/inverse");

        let mut stack: SmallVec<[u32; STACK_SIZE]> = SmallVec::new();
        stack.push(0);

        while let Some(index) = stack.pop() {
            let node = self.node(index);
            if !node.aabb().intersects_obb(&frame) {
                continue;
            }

            match *node {
                BvhNode::Leaf { offset, count, .. } => {
                    for first in leaf_triangles(offset, count) {
                        let tri = mesh.triangle_at(first)?;
                        let local = [
                            frame.to_local(&tri[0]),
                            frame.to_local(&tri[1]),
                            frame.to_local(&tri[2]),
                        ];
                        if triangle_intersects_aabb(&obb.local, &local) {
                            return Ok(true);
                        }
                    }
                }
                BvhNode::Internal { left, right, .. } => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }

        Ok(false)
    }

    /// Check whether any triangle of another mesh touches this tree.
    ///
    /// `other_to_local` maps the other mesh's coordinates into this tree's
    /// frame. Each foreign triangle prunes by its bounding box on the way
    /// down and runs exact triangle-triangle tests at leaves; the first
    /// touching pair short-circuits.
    ///
    /// # Errors
    ///
    /// Returns [`BvhError::MeshDataMismatch`](crate::BvhError) if either
    /// mesh's buffers are inconsistent with the data referenced.
    pub fn intersects_mesh(
        &self,
        mesh: &TriangleMesh,
        other_mesh: &TriangleMesh,
        other_to_local: &Isometry3<f64>,
    ) -> BvhResult<bool> {
        for other_first in (0..other_mesh.indices.len() as u32).step_by(3) {
            let other_tri = other_mesh.triangle_at(other_first)?;
            let other_tri = other_tri.map(|v| other_to_local * v);

            if self.intersects_triangle(mesh, &other_tri)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Check whether any triangle pair between two trees touches.
    ///
    /// Descends both trees simultaneously over pairs of nodes. The other
    /// tree's bounds are mapped into this tree's frame by transforming
    /// their corners and re-boxing, which is conservative; leaf-leaf pairs
    /// verify with exact triangle-triangle tests and the first touching
    /// pair short-circuits.
    ///
    /// # Errors
    ///
    /// Returns [`BvhError::MeshDataMismatch`](crate::BvhError) if either
    /// mesh's buffers are inconsistent with the data referenced.
    pub fn intersects_bvh(
        &self,
        mesh: &TriangleMesh,
        other: &Bvh,
        other_mesh: &TriangleMesh,
        other_to_local: &Isometry3<f64>,
    ) -> BvhResult<bool> {
        let mut stack: SmallVec<[(u32, u32); STACK_SIZE]> = SmallVec::new();
        stack.push((0, 0));

        while let Some((a, b)) = stack.pop() {
            let a_node = self.node(a);
            let b_node = other.node(b);

            let b_world = transformed_aabb(&b_node.aabb(), other_to_local);
            if !a_node.aabb().intersects(&b_world) {
                continue;
            }

            match (*a_node, *b_node) {
                (
                    BvhNode::Leaf { offset, count, .. },
                    BvhNode::Leaf {
                        offset: b_offset,
                        count: b_count,
                        ..
                    },
                ) => {
                    for b_first in leaf_triangles(b_offset, b_count) {
                        let b_tri = other_mesh.triangle_at(b_first)?;
                        let b_tri = b_tri.map(|v| other_to_local * v);
                        for a_first in leaf_triangles(offset, count) {
                            let a_tri = mesh.triangle_at(a_first)?;
                            if triangles_intersect(&a_tri, &b_tri) {
                                return Ok(true);
                            }
                        }
                    }
                }
                (BvhNode::Internal { left, right, .. }, _) => {
                    stack.push((right, b));
                    stack.push((left, b));
                }
                (BvhNode::Leaf { .. }, BvhNode::Internal { left, right, .. }) => {
                    stack.push((a, right));
                    stack.push((a, left));
                }
            }
        }

        Ok(false)
    }

    /// Descend the tree for one foreign triangle already in local frame.
    fn intersects_triangle(
        &self,
        mesh: &TriangleMesh,
        tri: &[Point3<f64>; 3],
    ) -> BvhResult<bool> {
        let tri_aabb = Aabb::from_triangle(tri);

        let mut stack: SmallVec<[u32; STACK_SIZE]> = SmallVec::new();
        stack.push(0);

        while let Some(index) = stack.pop() {
            let node = self.node(index);
            if !node.aabb().intersects(&tri_aabb) {
                continue;
            }

            match *node {
                BvhNode::Leaf { offset, count, .. } => {
                    for first in leaf_triangles(offset, count) {
                        let own = mesh.triangle_at(first)?;
                        if triangles_intersect(&own, tri) {
                            return Ok(true);
                        }
                    }
                }
                BvhNode::Internal { left, right, .. } => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }

        Ok(false)
    }
}

/// Iterate the first-index of each triangle in a leaf range.
fn leaf_triangles(offset: u32, count: u32) -> impl Iterator<Item = u32> {
    (offset..offset + count).step_by(3)
}

/// Closest hit among a leaf's triangles; ties keep the earliest triangle.
fn closest_hit_in_leaf(
    mesh: &TriangleMesh,
    ray: &Ray,
    offset: u32,
    count: u32,
) -> BvhResult<Option<RayHit>> {
    let mut best: Option<RayHit> = None;

    for first in leaf_triangles(offset, count) {
        let tri = mesh.triangle_at(first)?;
        if let Some(hit) = hit_from_intersection(ray, first, &tri) {
            let closer = best.as_ref().is_none_or(|b| hit.distance < b.distance);
            if closer {
                best = Some(hit);
            }
        }
    }

    Ok(best)
}

/// Append every hit among a leaf's triangles.
fn all_hits_in_leaf(
    mesh: &TriangleMesh,
    ray: &Ray,
    offset: u32,
    count: u32,
    hits: &mut Vec<RayHit>,
) -> BvhResult<()> {
    for first in leaf_triangles(offset, count) {
        let tri = mesh.triangle_at(first)?;
        if let Some(hit) = hit_from_intersection(ray, first, &tri) {
            hits.push(hit);
        }
    }
    Ok(())
}

fn hit_from_intersection(ray: &Ray, first_index: u32, tri: &[Point3<f64>; 3]) -> Option<RayHit> {
    let (t, u, v) = ray_triangle_intersect(&ray.origin, &ray.direction, tri)?;
    let point = ray.point_at(t);
    Some(RayHit {
        point,
        distance: t * ray.direction.norm(),
        triangle: first_index / 3,
        barycentric: (u, v),
    })
}

/// Transform a box and take the AABB of its corners (conservative).
fn transformed_aabb(aabb: &Aabb, transform: &Isometry3<f64>) -> Aabb {
    let corners = aabb.corners().map(|c| transform * c);
    let mut min = corners[0];
    let mut max = corners[0];
    for corner in &corners[1..] {
        min = Point3::new(
            min.x.min(corner.x),
            min.y.min(corner.y),
            min.z.min(corner.z),
        );
        max = Point3::new(
            max.x.max(corner.x),
            max.y.max(corner.y),
            max.z.max(corner.z),
        );
    }
    Aabb { min, max }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two x-facing triangles, one inside each of the unit boxes
    /// `[0,0,0]-[1,1,1]` and `[2,0,0]-[3,1,1]`.
    fn two_leaf_fixture() -> (TriangleMesh, Bvh) {
        let positions = [
            0.5, 0.0, 0.0, 0.5, 1.0, 0.0, 0.5, 0.0, 1.0, // triangle 0 at x = 0.5
            2.5, 0.0, 0.0, 2.5, 1.0, 0.0, 2.5, 0.0, 1.0, // triangle 1 at x = 2.5
        ];
        let mesh = TriangleMesh::from_raw(&positions, &[0, 1, 2, 3, 4, 5]);

        let bvh = Bvh::new(vec![
            BvhNode::Internal {
                bounds: [0.0, 0.0, 0.0, 3.0, 1.0, 1.0],
                left: 1,
                right: 2,
                split_axis: 0,
            },
            BvhNode::Leaf {
                bounds: [0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
                offset: 0,
                count: 3,
            },
            BvhNode::Leaf {
                bounds: [2.0, 0.0, 0.0, 3.0, 1.0, 1.0],
                offset: 3,
                count: 3,
            },
        ])
        .expect("fixture arena is valid");

        (mesh, bvh)
    }

    /// One leaf per duplicated triangle, both at the same distance along
    /// the ray, to pin down the tie-break.
    fn tie_fixture() -> (TriangleMesh, Bvh) {
        let positions = [
            0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0, // triangle 0 at y = 1
            0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0, // triangle 1, coincident
        ];
        let mesh = TriangleMesh::from_raw(&positions, &[0, 1, 2, 3, 4, 5]);

        let bvh = Bvh::new(vec![
            BvhNode::Internal {
                bounds: [0.0, 0.0, 0.0, 1.0, 2.0, 1.0],
                left: 1,
                right: 2,
                split_axis: 1,
            },
            BvhNode::Leaf {
                bounds: [0.0, 0.0, 0.0, 1.0, 2.0, 1.0],
                offset: 0,
                count: 3,
            },
            BvhNode::Leaf {
                bounds: [0.0, 0.0, 0.0, 1.0, 2.0, 1.0],
                offset: 3,
                count: 3,
            },
        ])
        .expect("fixture arena is valid");

        (mesh, bvh)
    }

    #[test]
    fn test_closest_hit_stops_at_near_leaf() {
        let (mesh, bvh) = two_leaf_fixture();
        let ray = Ray::new(Point3::new(-1.0, 0.25, 0.25), Vector3::x());

        let hit = bvh
            .closest_ray_hit(&mesh, &ray)
            .expect("mesh is consistent")
            .expect("ray hits triangle 0");

        assert_eq!(hit.triangle, 0);
        assert!((hit.distance - 1.5).abs() < 1e-10);
        assert!((hit.point.x - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_closest_hit_from_far_side() {
        let (mesh, bvh) = two_leaf_fixture();
        let ray = Ray::new(Point3::new(4.0, 0.25, 0.25), -Vector3::x());

        let hit = bvh
            .closest_ray_hit(&mesh, &ray)
            .expect("mesh is consistent")
            .expect("ray hits triangle 1 first");

        assert_eq!(hit.triangle, 1);
        assert!((hit.distance - 1.5).abs() < 1e-10);
    }

    #[test]
    fn test_ray_missing_root_reports_nothing() {
        let (mesh, bvh) = two_leaf_fixture();
        let ray = Ray::new(Point3::new(-1.0, 5.0, 5.0), Vector3::x());

        assert!(bvh
            .closest_ray_hit(&mesh, &ray)
            .expect("mesh is consistent")
            .is_none());

        let mut hits = Vec::new();
        bvh.all_ray_hits(&mesh, &ray, &mut hits)
            .expect("mesh is consistent");
        assert!(hits.is_empty());
    }

    #[test]
    fn test_degenerate_ray_reports_nothing() {
        let (mesh, bvh) = two_leaf_fixture();
        let ray = Ray::new(Point3::new(0.5, 0.25, 0.25), Vector3::zeros());

        assert!(bvh
            .closest_ray_hit(&mesh, &ray)
            .expect("mesh is consistent")
            .is_none());

        let mut hits = Vec::new();
        bvh.all_ray_hits(&mesh, &ray, &mut hits)
            .expect("mesh is consistent");
        assert!(hits.is_empty());
    }

    #[test]
    fn test_all_hits_collects_both() {
        let (mesh, bvh) = two_leaf_fixture();
        let ray = Ray::new(Point3::new(-1.0, 0.25, 0.25), Vector3::x());

        let mut hits = Vec::new();
        bvh.all_ray_hits(&mesh, &ray, &mut hits)
            .expect("mesh is consistent");

        assert_eq!(hits.len(), 2);
        let mut triangles: Vec<u32> = hits.iter().map(|h| h.triangle).collect();
        triangles.sort_unstable();
        assert_eq!(triangles, vec![0, 1]);

        let min = hits
            .iter()
            .map(|h| h.distance)
            .fold(f64::INFINITY, f64::min);
        let closest = bvh
            .closest_ray_hit(&mesh, &ray)
            .expect("mesh is consistent")
            .expect("same ray hits");
        assert!((closest.distance - min).abs() < 1e-12);
    }

    #[test]
    fn test_accumulator_is_appended_not_cleared() {
        let (mesh, bvh) = two_leaf_fixture();
        let ray = Ray::new(Point3::new(-1.0, 0.25, 0.25), Vector3::x());

        let mut hits = Vec::new();
        bvh.all_ray_hits(&mesh, &ray, &mut hits)
            .expect("mesh is consistent");
        bvh.all_ray_hits(&mesh, &ray, &mut hits)
            .expect("mesh is consistent");
        assert_eq!(hits.len(), 4);
    }

    #[test]
    fn test_tie_break_prefers_first_visited_child() {
        let (mesh, bvh) = tie_fixture();

        // Positive direction along the split axis: left child first.
        let ray = Ray::new(Point3::new(0.25, 0.0, 0.25), Vector3::y());
        let hit = bvh
            .closest_ray_hit(&mesh, &ray)
            .expect("mesh is consistent")
            .expect("hits the coincident pair");
        assert_eq!(hit.triangle, 0);

        // Negative direction: right child first.
        let ray = Ray::new(Point3::new(0.25, 2.0, 0.25), -Vector3::y());
        let hit = bvh
            .closest_ray_hit(&mesh, &ray)
            .expect("mesh is consistent")
            .expect("hits the coincident pair");
        assert_eq!(hit.triangle, 1);
    }

    #[test]
    fn test_sphere_overlap_examples() {
        let (mesh, bvh) = two_leaf_fixture();

        let touching = Sphere::new(Point3::new(0.5, 0.5, 0.5), 0.1);
        assert!(bvh
            .intersects_sphere(&mesh, &touching)
            .expect("mesh is consistent"));

        let distant = Sphere::new(Point3::new(5.0, 5.0, 5.0), 0.01);
        assert!(!bvh
            .intersects_sphere(&mesh, &distant)
            .expect("mesh is consistent"));
    }

    #[test]
    fn test_box_overlap_identity() {
        let (mesh, bvh) = two_leaf_fixture();

        let around_first = OrientedBox::axis_aligned(Aabb::new(
            Point3::new(0.25, 0.25, 0.25),
            Point3::new(0.75, 0.75, 0.75),
        ));
        assert!(bvh
            .intersects_box(&mesh, &around_first)
            .expect("mesh is consistent"));

        let in_the_gap = OrientedBox::axis_aligned(Aabb::new(
            Point3::new(1.25, 0.0, 0.0),
            Point3::new(1.75, 1.0, 1.0),
        ));
        assert!(!bvh
            .intersects_box(&mesh, &in_the_gap)
            .expect("mesh is consistent"));
    }

    #[test]
    fn test_box_overlap_transformed() {
        let (mesh, bvh) = two_leaf_fixture();

        // A small box carried onto the first triangle by its transform.
        let obb = OrientedBox::new(
            Aabb::new(Point3::new(-0.1, -0.1, -0.1), Point3::new(0.1, 0.1, 0.1)),
            Isometry3::translation(0.5, 0.25, 0.25),
        );
        assert!(bvh
            .intersects_box(&mesh, &obb)
            .expect("mesh is consistent"));

        // The same box parked between the leaves.
        let obb = OrientedBox::new(
            Aabb::new(Point3::new(-0.1, -0.1, -0.1), Point3::new(0.1, 0.1, 0.1)),
            Isometry3::translation(1.5, 0.25, 0.25),
        );
        assert!(!bvh
            .intersects_box(&mesh, &obb)
            .expect("mesh is consistent"));
    }

    #[test]
    fn test_repeat_query_is_bit_identical() {
        let (mesh, bvh) = two_leaf_fixture();
        let ray = Ray::new(Point3::new(-1.0, 0.3, 0.4), Vector3::new(1.0, 0.01, -0.02));

        let a = bvh
            .closest_ray_hit(&mesh, &ray)
            .expect("mesh is consistent")
            .expect("hit");
        let b = bvh
            .closest_ray_hit(&mesh, &ray)
            .expect("mesh is consistent")
            .expect("hit");

        assert_eq!(a.distance.to_bits(), b.distance.to_bits());
        assert_eq!(a.point, b.point);
        assert_eq!(a.triangle, b.triangle);
    }

    #[test]
    fn test_leaf_range_mismatch_is_reported() {
        let (_, bvh) = two_leaf_fixture();
        // A mesh too small for the second leaf's [3, 6) range.
        let short_mesh = TriangleMesh::from_raw(
            &[0.5, 0.0, 0.0, 0.5, 1.0, 0.0, 0.5, 0.0, 1.0],
            &[0, 1, 2],
        );
        let ray = Ray::new(Point3::new(-1.0, 0.25, 0.25), Vector3::x());

        let mut hits = Vec::new();
        let err = bvh
            .all_ray_hits(&short_mesh, &ray, &mut hits)
            .expect_err("second leaf runs past the index buffer");
        assert!(format!("{err}").contains("mesh data mismatch"));
    }

    #[test]
    fn test_mesh_overlap() {
        let (mesh, bvh) = two_leaf_fixture();

        // A triangle crossing the plane of triangle 0.
        let crossing = TriangleMesh::from_raw(
            &[0.0, 0.25, 0.25, 1.0, 0.25, 0.25, 0.0, 0.75, 0.25],
            &[0, 1, 2],
        );
        assert!(bvh
            .intersects_mesh(&mesh, &crossing, &Isometry3::identity())
            .expect("meshes are consistent"));

        // Slide the same triangle into the gap between the leaves.
        assert!(!bvh
            .intersects_mesh(&mesh, &crossing, &Isometry3::translation(1.2, 0.0, 0.0))
            .expect("meshes are consistent"));
    }

    #[test]
    fn test_mesh_overlap_coplanar_disjoint() {
        let (mesh, bvh) = two_leaf_fixture();

        // Same x = 0.5 plane as triangle 0, past its hypotenuse
        // (y + z >= 1.9 against y + z <= 1) with overlapping bounding
        // boxes, so the leaf-level test has to decide.
        let coplanar = TriangleMesh::from_raw(
            &[0.5, 0.95, 0.95, 0.5, 1.8, 0.95, 0.5, 0.95, 1.8],
            &[0, 1, 2],
        );
        assert!(!bvh
            .intersects_mesh(&mesh, &coplanar, &Isometry3::identity())
            .expect("meshes are consistent"));

        // Slid down within the plane it really does touch.
        assert!(bvh
            .intersects_mesh(&mesh, &coplanar, &Isometry3::translation(0.0, -0.5, -0.5))
            .expect("meshes are consistent"));
    }

    #[test]
    fn test_bvh_overlap() {
        let (mesh, bvh) = two_leaf_fixture();
        let (other_mesh, other_bvh) = two_leaf_fixture();

        // Identity: the trees are coincident.
        assert!(bvh
            .intersects_bvh(&mesh, &other_bvh, &other_mesh, &Isometry3::identity())
            .expect("meshes are consistent"));

        // Shift the other tree well clear of both leaves.
        assert!(!bvh
            .intersects_bvh(
                &mesh,
                &other_bvh,
                &other_mesh,
                &Isometry3::translation(10.0, 0.0, 0.0),
            )
            .expect("meshes are consistent"));

        // Shift by one box: its first triangle lands between the leaves,
        // but its second coincides with nothing... and a shift of 2 lands
        // triangle 0 on triangle 1.
        assert!(bvh
            .intersects_bvh(
                &mesh,
                &other_bvh,
                &other_mesh,
                &Isometry3::translation(2.0, 0.0, 0.0),
            )
            .expect("meshes are consistent"));
    }
}

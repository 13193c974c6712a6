//! Bounding volume hierarchy queries over static triangle meshes.
//!
//! This crate traverses a prebuilt binary BVH whose leaves reference runs of
//! a shared index buffer, answering spatial queries without walking every
//! triangle:
//!
//! - [`Bvh`] - Validated node arena with the root at index 0
//! - [`BvhNode`] - Internal (children plus split axis) or leaf (triangle run)
//! - [`TriangleMesh`] - Vertex positions plus a flat index buffer
//! - [`Ray`], [`RayHit`] - Nearest-hit and all-hits raycasting
//! - [`Sphere`], [`OrientedBox`] - Boolean overlap queries
//!
//! Construction is out of scope: trees arrive from an external builder (or a
//! test helper) and are checked once by [`Bvh::new`], after which queries can
//! trust the arena's shape and only mesh data remains fallible.
//!
//! # Coordinate Systems
//!
//! All geometry is continuous `f64` in the mesh's local frame. Queries against
//! another mesh or tree take an [`Isometry3`] mapping the other coordinates
//! into this frame; oriented boxes carry their own transform.
//!
//! # Raycasting
//!
//! ```
//! use mesh_bvh::{Bvh, BvhNode, Ray, TriangleMesh};
//! use nalgebra::{Point3, Vector3};
//!
//! let mesh = TriangleMesh::from_raw(
//!     &[0.5, 0.0, 0.0, 0.5, 1.0, 0.0, 0.5, 0.0, 1.0],
//!     &[0, 1, 2],
//! );
//! let bvh = Bvh::new(vec![BvhNode::Leaf {
//!     bounds: [0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
//!     offset: 0,
//!     count: 3,
//! }])?;
//!
//! let ray = Ray::new(Point3::new(-1.0, 0.25, 0.25), Vector3::x());
//! let hit = bvh.closest_ray_hit(&mesh, &ray)?.unwrap();
//! assert_eq!(hit.triangle, 0);
//! assert!((hit.distance - 1.5).abs() < 1e-10);
//! # Ok::<(), mesh_bvh::BvhError>(())
//! ```
//!
//! # Overlap Queries
//!
//! ```
//! use mesh_bvh::{Aabb, Bvh, BvhNode, OrientedBox, Sphere, TriangleMesh};
//! use nalgebra::Point3;
//!
//! # let mesh = TriangleMesh::from_raw(
//! #     &[0.5, 0.0, 0.0, 0.5, 1.0, 0.0, 0.5, 0.0, 1.0],
//! #     &[0, 1, 2],
//! # );
//! # let bvh = Bvh::new(vec![BvhNode::Leaf {
//! #     bounds: [0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
//! #     offset: 0,
//! #     count: 3,
//! # }])?;
//! let sphere = Sphere::new(Point3::new(0.5, 0.2, 0.2), 0.1);
//! assert!(bvh.intersects_sphere(&mesh, &sphere)?);
//!
//! let obb = OrientedBox::axis_aligned(Aabb::new(
//!     Point3::new(2.0, 2.0, 2.0),
//!     Point3::new(3.0, 3.0, 3.0),
//! ));
//! assert!(!bvh.intersects_box(&mesh, &obb)?);
//! # Ok::<(), mesh_bvh::BvhError>(())
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them.
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod bounds;
mod error;
mod mesh;
mod node;
mod shape;
mod traverse;
pub mod triangle;

// Re-export core types
pub use bounds::Aabb;
pub use error::{BvhError, BvhResult};
pub use mesh::TriangleMesh;
pub use node::{Bvh, BvhNode, BvhStats};
pub use shape::{ObbFrame, ObbPlane, OrientedBox, Ray, Sphere};
pub use traverse::RayHit;

// Math types that appear in this crate's public API.
pub use nalgebra::{Isometry3, Point3, Vector3};

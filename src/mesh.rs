//! Indexed triangle mesh buffers.

use nalgebra::Point3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{BvhError, BvhResult};

/// The triangle geometry a BVH is queried against.
///
/// Stores a position buffer and an index buffer; every three consecutive
/// indices form one triangle. Both buffers are read-only during traversal,
/// so a single mesh can back concurrent queries from multiple threads.
///
/// # Example
///
/// ```
/// use mesh_bvh::TriangleMesh;
///
/// let positions = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
/// let indices = [0, 1, 2];
///
/// let mesh = TriangleMesh::from_raw(&positions, &indices);
/// assert_eq!(mesh.triangle_count(), 1);
/// ```
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TriangleMesh {
    /// Vertex positions.
    pub positions: Vec<Point3<f64>>,

    /// Triangle indices into `positions`, grouped in triples.
    pub indices: Vec<u32>,
}

impl TriangleMesh {
    /// Create a mesh from position and index buffers.
    #[inline]
    #[must_use]
    pub const fn new(positions: Vec<Point3<f64>>, indices: Vec<u32>) -> Self {
        Self { positions, indices }
    }

    /// Create a mesh from flat coordinate and index arrays.
    ///
    /// `positions` is `[x0, y0, z0, x1, y1, z1, ...]`. Returns an empty mesh
    /// if either array length is not divisible by 3.
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_bvh::TriangleMesh;
    ///
    /// let positions = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    /// let mesh = TriangleMesh::from_raw(&positions, &[0, 1, 2]);
    /// assert_eq!(mesh.positions.len(), 3);
    /// ```
    #[must_use]
    pub fn from_raw(positions: &[f64], indices: &[u32]) -> Self {
        if positions.len() % 3 != 0 || indices.len() % 3 != 0 {
            return Self::default();
        }

        let positions = positions
            .chunks_exact(3)
            .map(|c| Point3::new(c[0], c[1], c[2]))
            .collect();

        Self {
            positions,
            indices: indices.to_vec(),
        }
    }

    /// Number of triangles in the index buffer.
    #[inline]
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Check if the mesh has no triangles.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Fetch the triangle whose first index-buffer entry is `first_index`.
    ///
    /// This is the single fetch primitive shared by every traversal variant.
    /// Out-of-range index data yields [`BvhError::MeshDataMismatch`].
    ///
    /// # Errors
    ///
    /// Returns an error if `first_index + 3` exceeds the index buffer or any
    /// referenced vertex exceeds the position buffer.
    pub fn triangle_at(&self, first_index: u32) -> BvhResult<[Point3<f64>; 3]> {
        let start = first_index as usize;
        let triple: &[u32] = self.indices.get(start..start + 3).ok_or_else(|| {
            BvhError::mesh_mismatch(format!(
                "index range [{start}, {}) exceeds index buffer of length {}",
                start + 3,
                self.indices.len()
            ))
        })?;

        let mut vertices = [Point3::origin(); 3];
        for (corner, &index) in vertices.iter_mut().zip(triple) {
            *corner = *self.positions.get(index as usize).ok_or_else(|| {
                BvhError::mesh_mismatch(format!(
                    "vertex index {index} exceeds position buffer of length {}",
                    self.positions.len()
                ))
            })?;
        }

        Ok(vertices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_triangle() -> TriangleMesh {
        TriangleMesh::from_raw(
            &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            &[0, 1, 2],
        )
    }

    #[test]
    fn test_from_raw() {
        let mesh = single_triangle();
        assert_eq!(mesh.positions.len(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert!(!mesh.is_empty());
    }

    #[test]
    fn test_from_raw_misaligned() {
        let mesh = TriangleMesh::from_raw(&[0.0, 0.0], &[0, 1, 2]);
        assert!(mesh.is_empty());

        let mesh = TriangleMesh::from_raw(&[0.0, 0.0, 0.0], &[0, 1]);
        assert!(mesh.is_empty());
    }

    #[test]
    fn test_triangle_at() {
        let mesh = single_triangle();
        let tri = mesh.triangle_at(0).expect("triangle 0 exists");
        assert!((tri[1].x - 1.0).abs() < f64::EPSILON);
        assert!((tri[2].y - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_triangle_at_range_error() {
        let mesh = single_triangle();
        let err = mesh.triangle_at(3).expect_err("range exceeds index buffer");
        assert!(matches!(err, BvhError::MeshDataMismatch(_)));
    }

    #[test]
    fn test_triangle_at_bad_vertex_index() {
        let mesh = TriangleMesh::from_raw(&[0.0, 0.0, 0.0], &[0, 0, 9]);
        let err = mesh.triangle_at(0).expect_err("vertex index out of range");
        assert!(matches!(err, BvhError::MeshDataMismatch(_)));
    }
}

//! Error types for BVH queries.

use thiserror::Error;

/// Result type alias for BVH operations.
pub type BvhResult<T> = Result<T, BvhError>;

/// Errors that can occur when validating or querying a BVH.
#[derive(Debug, Error)]
pub enum BvhError {
    /// The node arena does not describe a well-formed tree.
    ///
    /// This is a build-side programming error, reported at the offending
    /// node during [`Bvh::new`](crate::Bvh::new) rather than surfacing as a
    /// silently wrong query answer.
    #[error("invalid tree at node {node}: {reason}")]
    InvalidTree {
        /// Arena index of the offending node.
        node: u32,
        /// What was wrong with it.
        reason: String,
    },

    /// A leaf references index or position data outside the mesh buffers.
    #[error("mesh data mismatch: {0}")]
    MeshDataMismatch(String),
}

impl BvhError {
    /// Create an invalid tree error for a specific node.
    #[must_use]
    pub fn invalid_tree(node: u32, reason: impl Into<String>) -> Self {
        Self::InvalidTree {
            node,
            reason: reason.into(),
        }
    }

    /// Create a mesh data mismatch error.
    #[must_use]
    pub fn mesh_mismatch(details: impl Into<String>) -> Self {
        Self::MeshDataMismatch(details.into())
    }
}

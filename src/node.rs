//! BVH node representation and the validated node arena.

use smallvec::SmallVec;
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::bounds::Aabb;
use crate::error::{BvhError, BvhResult};

/// A single BVH node.
///
/// Nodes live in a flat arena owned by [`Bvh`]; internal nodes reference
/// their children by arena index rather than by owning pointer. The bounds
/// are the compact `[min_x, min_y, min_z, max_x, max_y, max_z]` layout, so
/// `bounds[axis]` and `bounds[axis + 3]` are the near and far planes along
/// `axis`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BvhNode {
    /// An internal node with two children.
    Internal {
        /// Bounds containing the union of both children's bounds.
        bounds: [f64; 6],
        /// Arena index of the first-stored child.
        left: u32,
        /// Arena index of the second-stored child.
        right: u32,
        /// The axis (0 = x, 1 = y, 2 = z) the builder split along.
        split_axis: u8,
    },
    /// A leaf node referencing a contiguous index-buffer range.
    ///
    /// `count == 0` is a legitimate empty leaf.
    Leaf {
        /// Bounds containing every referenced triangle.
        bounds: [f64; 6],
        /// First index-buffer entry of the leaf's triangles.
        offset: u32,
        /// Number of index-buffer entries (a multiple of 3).
        count: u32,
    },
}

impl BvhNode {
    /// Get the compact bounds of this node.
    #[inline]
    #[must_use]
    pub const fn bounds(&self) -> &[f64; 6] {
        match self {
            Self::Internal { bounds, .. } | Self::Leaf { bounds, .. } => bounds,
        }
    }

    /// Reconstruct this node's bounding box.
    #[inline]
    #[must_use]
    pub fn aabb(&self) -> Aabb {
        Aabb::from_bounds(self.bounds())
    }
}

/// Structure statistics gathered while validating an arena.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BvhStats {
    /// Number of internal nodes.
    pub internal_count: usize,
    /// Number of leaf nodes.
    pub leaf_count: usize,
    /// Height of the tree (a lone leaf has depth 1).
    pub max_depth: usize,
    /// Total triangles referenced across all leaves.
    pub triangle_count: usize,
}

/// A bounding volume hierarchy over a triangle mesh.
///
/// The tree is built elsewhere and handed over as a flat node arena with
/// the root at index 0; [`Bvh::new`] validates the arena shape once so the
/// query entry points can assume a well-formed tree. The structure is
/// immutable after construction, so
/// concurrent queries through `&self` are safe.
///
/// # Example
///
/// ```
/// use mesh_bvh::{Bvh, BvhNode};
///
/// let bvh = Bvh::new(vec![BvhNode::Leaf {
///     bounds: [0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
///     offset: 0,
///     count: 3,
/// }])
/// .expect("single-leaf tree is valid");
/// assert_eq!(bvh.stats().leaf_count, 1);
/// ```
#[derive(Debug, Clone)]
pub struct Bvh {
    nodes: Vec<BvhNode>,
    stats: BvhStats,
}

impl Bvh {
    /// Maximum accepted tree height.
    ///
    /// Keeps the recursive nearest-hit descent within a predictable stack
    /// bound; a well-formed binary tree only reaches this height with a
    /// pathologically unbalanced build.
    pub const MAX_DEPTH: usize = 128;

    /// Validate an externally built node arena and take ownership of it.
    ///
    /// The root must be node 0 and children must come after their parent
    /// in the arena, each referenced exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`BvhError::InvalidTree`] naming the offending node when the
    /// arena is empty, a child index is out of range or does not follow its
    /// parent, a node is referenced more than once or not at all, a split
    /// axis is not 0-2, a leaf count is not a multiple of 3, a bound is
    /// non-finite, or the tree exceeds [`Self::MAX_DEPTH`].
    pub fn new(nodes: Vec<BvhNode>) -> BvhResult<Self> {
        if nodes.is_empty() {
            return Err(BvhError::invalid_tree(0, "empty node arena"));
        }

        let mut stats = BvhStats::default();
        let mut visited = vec![false; nodes.len()];

        let mut stack: SmallVec<[(u32, usize); 32]> = SmallVec::new();
        stack.push((0, 1));

        while let Some((index, depth)) = stack.pop() {
            let node = &nodes[index as usize];

            if depth > Self::MAX_DEPTH {
                return Err(BvhError::invalid_tree(
                    index,
                    format!("tree deeper than {} levels", Self::MAX_DEPTH),
                ));
            }
            if visited[index as usize] {
                return Err(BvhError::invalid_tree(index, "node referenced twice"));
            }
            visited[index as usize] = true;
            stats.max_depth = stats.max_depth.max(depth);

            if node.bounds().iter().any(|b| !b.is_finite()) {
                return Err(BvhError::invalid_tree(index, "non-finite bounds"));
            }

            match *node {
                BvhNode::Leaf { offset, count, .. } => {
                    if count % 3 != 0 {
                        return Err(BvhError::invalid_tree(
                            index,
                            format!("leaf count {count} is not a multiple of 3"),
                        ));
                    }
                    if offset.checked_add(count).is_none() {
                        return Err(BvhError::invalid_tree(index, "leaf range overflows"));
                    }
                    stats.leaf_count += 1;
                    stats.triangle_count += count as usize / 3;
                }
                BvhNode::Internal {
                    left,
                    right,
                    split_axis,
                    ..
                } => {
                    if split_axis > 2 {
                        return Err(BvhError::invalid_tree(
                            index,
                            format!("split axis {split_axis} out of range"),
                        ));
                    }
                    for child in [left, right] {
                        if child as usize >= nodes.len() {
                            return Err(BvhError::invalid_tree(
                                index,
                                format!("child index {child} out of range"),
                            ));
                        }
                        if child <= index {
                            return Err(BvhError::invalid_tree(
                                index,
                                format!("child index {child} does not follow its parent"),
                            ));
                        }
                    }
                    stats.internal_count += 1;
                    stack.push((right, depth + 1));
                    stack.push((left, depth + 1));
                }
            }
        }

        if let Some(orphan) = visited.iter().position(|&seen| !seen) {
            #[allow(clippy::cast_possible_truncation)] // arena length fits u32 children
            return Err(BvhError::invalid_tree(
                orphan as u32,
                "node unreachable from the root",
            ));
        }

        debug!(
            "validated BVH arena: {} internal, {} leaves, {} triangles, depth {}",
            stats.internal_count, stats.leaf_count, stats.triangle_count, stats.max_depth
        );

        Ok(Self { nodes, stats })
    }

    /// Access the node arena.
    #[inline]
    #[must_use]
    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    /// Fetch a node by arena index.
    ///
    /// Indices come from validated internal nodes, so this is infallible
    /// within the crate.
    #[inline]
    pub(crate) fn node(&self, index: u32) -> &BvhNode {
        &self.nodes[index as usize]
    }

    /// The root node.
    #[inline]
    #[must_use]
    pub fn root(&self) -> &BvhNode {
        &self.nodes[0]
    }

    /// Structure statistics gathered at validation time.
    #[inline]
    #[must_use]
    pub const fn stats(&self) -> BvhStats {
        self.stats
    }
}

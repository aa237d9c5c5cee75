//! kd-tree index structure and configuration.
//!
//! [`KdTreeConfig`] carries the build and query defaults (bucket capacity and
//! check budget). [`FeatureIndex`] owns a flat node arena and borrows the
//! [`VectorSet`] it was built from.

use crate::config;
use crate::error::{MatchError, Result};
use crate::vectors::VectorSet;
use serde::{Deserialize, Serialize};

/// Position of a node in the [`FeatureIndex`] arena.
pub type NodeId = u32;

/// Tuning parameters for building and querying a [`FeatureIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdTreeConfig {
    /// Maximum points per leaf bucket. Must be at least 1.
    pub bucket_capacity: usize,
    /// Default number of point-distance evaluations per query.
    pub check_budget: usize,
}

impl Default for KdTreeConfig {
    fn default() -> Self {
        Self {
            bucket_capacity: config::DEFAULT_BUCKET_CAPACITY,
            check_budget: config::DEFAULT_CHECK_BUDGET,
        }
    }
}

/// A node of the partition tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndexNode {
    /// Points with `v[dim] < threshold` live under `left`, the rest under `right`.
    Split {
        dim: u32,
        threshold: f32,
        left: NodeId,
        right: NodeId,
    },
    /// A bucket: `point_order[start..start + len]`.
    Leaf { start: u32, len: u32 },
}

/// Immutable approximate k-NN index over a borrowed [`VectorSet`].
///
/// Built with [`FeatureIndex::build`] or [`FeatureIndex::with_config`], queried
/// with [`FeatureIndex::find_knn`] or [`FeatureIndex::search`]. Nothing is
/// mutated after construction, so a shared reference can be queried from many
/// threads at once.
#[derive(Debug, Clone)]
pub struct FeatureIndex<'a> {
    pub config: KdTreeConfig,
    pub(crate) vectors: &'a VectorSet,
    pub(crate) nodes: Vec<IndexNode>,
    /// Point indices permuted so that every leaf bucket is a contiguous range.
    pub(crate) point_order: Vec<u32>,
    pub(crate) root: Option<NodeId>,
    pub(crate) depth: usize,
}

impl<'a> FeatureIndex<'a> {
    /// The vector set this index was built from.
    pub fn vectors(&self) -> &'a VectorSet {
        self.vectors
    }

    /// Number of indexed points.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Returns `true` if the index holds no points.
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Vector dimension (D) queries must match.
    pub fn dimension(&self) -> usize {
        self.vectors.dimension()
    }

    /// Root node, or `None` for an index built from an empty set.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Node by id. Panics if `id` is not a node of this index.
    #[inline]
    pub fn node(&self, id: NodeId) -> &IndexNode {
        &self.nodes[id as usize]
    }

    /// Total nodes in the arena.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, IndexNode::Leaf { .. }))
            .count()
    }

    /// Length of the longest root-to-leaf path in edges (0 for a single leaf).
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Point indices held by a leaf bucket.
    #[inline]
    pub fn bucket(&self, start: u32, len: u32) -> &[u32] {
        let start = start as usize;
        &self.point_order[start..start + len as usize]
    }

    /// Rejects a query whose length differs from the index dimension.
    /// An empty index accepts any query.
    pub(crate) fn check_query(&self, position: usize, query: &[f32]) -> Result<()> {
        if !self.is_empty() && query.len() != self.dimension() {
            return Err(MatchError::DimensionMismatch {
                index: position,
                expected: self.dimension(),
                found: query.len(),
            });
        }
        Ok(())
    }
}

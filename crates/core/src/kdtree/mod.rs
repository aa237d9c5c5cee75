//! Approximate k-nearest-neighbor kd-tree.
//!
//! The tree is built once from a [`VectorSet`](crate::VectorSet) by splitting
//! each oversized point subset on its maximum-variance dimension at the median.
//! Nodes live in a flat arena addressed by [`NodeId`]; leaves reference ranges
//! of a permuted point-index array, so no vector data is copied into the tree.
//!
//! Queries run a best-first search: the frontier holds unexplored subtrees keyed
//! by a lower bound on their squared distance to the query, and the search stops
//! after a fixed number of point-distance evaluations (the check budget). A large
//! enough budget makes the search exact.

/// Build: maximum-variance axis selection and median partitioning.
pub mod build;
/// Squared Euclidean distance.
pub mod distance;
/// Index structure, node arena, and configuration.
pub mod index;
/// Best-first bounded search and exact linear scan.
pub mod search;

pub use distance::squared_euclidean;
pub use index::{FeatureIndex, IndexNode, KdTreeConfig, NodeId};
pub use search::{linear_scan, NeighborResult, SearchStats};

//! kd-tree construction.
//!
//! Each subset larger than the bucket capacity is split on the dimension with the
//! largest variance, at the upper median of that dimension. Points strictly below
//! the threshold go left, the rest (including ties) go right. Both halves are
//! always non-empty, so recursion terminates: when the median equals the subset
//! minimum the threshold moves up to the next distinct value, and a subset with
//! zero variance in every dimension (identical points) becomes a leaf no matter
//! its size.

use crate::error::{MatchError, Result};
use crate::kdtree::index::{FeatureIndex, IndexNode, KdTreeConfig, NodeId};
use crate::vectors::VectorSet;
use std::time::Instant;

impl<'a> FeatureIndex<'a> {
    /// Builds an index with the given bucket capacity and the default check budget.
    pub fn build(vectors: &'a VectorSet, bucket_capacity: usize) -> Result<Self> {
        Self::with_config(
            vectors,
            KdTreeConfig {
                bucket_capacity,
                ..KdTreeConfig::default()
            },
        )
    }

    /// Builds an index from a full configuration.
    ///
    /// An empty set produces an index with no nodes. Fails with
    /// [`MatchError::InvalidParameter`] if `bucket_capacity` is zero or the set is
    /// too large to address with 32-bit point ids.
    pub fn with_config(vectors: &'a VectorSet, config: KdTreeConfig) -> Result<Self> {
        if config.bucket_capacity == 0 {
            return Err(MatchError::InvalidParameter(
                "bucket_capacity must be at least 1".to_string(),
            ));
        }
        if vectors.len() > u32::MAX as usize {
            return Err(MatchError::InvalidParameter(format!(
                "{} vectors exceed the index limit of {}",
                vectors.len(),
                u32::MAX
            )));
        }

        let start = Instant::now();
        let mut point_order: Vec<u32> = (0..vectors.len() as u32).collect();
        let mut builder = TreeBuilder::new(vectors, config.bucket_capacity);
        let root = if point_order.is_empty() {
            None
        } else {
            Some(builder.partition(&mut point_order, 0, 0))
        };

        let index = Self {
            config,
            vectors,
            nodes: builder.nodes,
            point_order,
            root,
            depth: builder.max_depth,
        };
        tracing::info!(
            points = index.len(),
            dimension = index.dimension(),
            nodes = index.node_count(),
            leaves = index.leaf_count(),
            depth = index.depth(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Feature index built"
        );
        Ok(index)
    }
}

/// Recursive builder state. Per-dimension statistics buffers are reused across
/// nodes.
struct TreeBuilder<'v> {
    vectors: &'v VectorSet,
    bucket_capacity: usize,
    nodes: Vec<IndexNode>,
    max_depth: usize,
    mean: Vec<f64>,
    m2: Vec<f64>,
    column: Vec<f32>,
}

impl<'v> TreeBuilder<'v> {
    fn new(vectors: &'v VectorSet, bucket_capacity: usize) -> Self {
        let dim = vectors.dimension();
        Self {
            vectors,
            bucket_capacity,
            nodes: Vec::new(),
            max_depth: 0,
            mean: vec![0.0; dim],
            m2: vec![0.0; dim],
            column: Vec::new(),
        }
    }

    /// Builds the subtree for `points`, which occupy `point_order[offset..]`.
    fn partition(&mut self, points: &mut [u32], offset: usize, depth: usize) -> NodeId {
        self.max_depth = self.max_depth.max(depth);
        if points.len() <= self.bucket_capacity {
            return self.push_leaf(offset, points.len());
        }
        let Some((dim, threshold)) = self.choose_split(points) else {
            return self.push_leaf(offset, points.len());
        };

        let vectors = self.vectors;
        let split = stable_partition(points, |p| vectors.vector(p as usize)[dim] < threshold);
        if split == 0 || split == points.len() {
            // Only reachable with NaN components; keep the subset whole.
            return self.push_leaf(offset, points.len());
        }

        let id = self.nodes.len() as NodeId;
        self.nodes.push(IndexNode::Leaf { start: 0, len: 0 });
        let (left_points, right_points) = points.split_at_mut(split);
        let left = self.partition(left_points, offset, depth + 1);
        let right = self.partition(right_points, offset + split, depth + 1);
        self.nodes[id as usize] = IndexNode::Split {
            dim: dim as u32,
            threshold,
            left,
            right,
        };
        id
    }

    fn push_leaf(&mut self, offset: usize, len: usize) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(IndexNode::Leaf {
            start: offset as u32,
            len: len as u32,
        });
        id
    }

    /// Picks the maximum-variance dimension and its split threshold, or `None`
    /// when every dimension is constant over `points`.
    fn choose_split(&mut self, points: &[u32]) -> Option<(usize, f32)> {
        let vectors = self.vectors;
        self.mean.fill(0.0);
        self.m2.fill(0.0);

        // Welford's online variance, one pass over the subset.
        for (seen, &p) in points.iter().enumerate() {
            let count = (seen + 1) as f64;
            for (d, &x) in vectors.vector(p as usize).iter().enumerate() {
                let x = x as f64;
                let delta = x - self.mean[d];
                self.mean[d] += delta / count;
                self.m2[d] += delta * (x - self.mean[d]);
            }
        }

        // First maximum wins, so equal-variance dimensions prefer the lowest index.
        let (dim, spread) = self
            .m2
            .iter()
            .enumerate()
            .fold((0, 0.0f64), |best, (d, &v)| if v > best.1 { (d, v) } else { best });
        if spread <= 0.0 {
            return None;
        }

        self.column.clear();
        self.column
            .extend(points.iter().map(|&p| vectors.vector(p as usize)[dim]));
        self.column.sort_unstable_by(f32::total_cmp);

        let min = self.column[0];
        let median = self.column[self.column.len() / 2];
        let threshold = if median > min {
            median
        } else {
            *self.column.iter().find(|&&x| x > min)?
        };
        Some((dim, threshold))
    }
}

/// Moves points matching `goes_left` to the front, keeping relative order on
/// both sides. Returns the number of points moved left.
fn stable_partition(points: &mut [u32], mut goes_left: impl FnMut(u32) -> bool) -> usize {
    let (left, right): (Vec<u32>, Vec<u32>) = points.iter().copied().partition(|&p| goes_left(p));
    let split = left.len();
    points[..split].copy_from_slice(&left);
    points[split..].copy_from_slice(&right);
    split
}

//! Best-first bounded k-NN search over the kd-tree.
//!
//! The frontier is a min-heap of unexplored subtrees keyed by a lower bound on
//! their squared distance to the query: the largest squared distance to any
//! split hyperplane crossed on the way to that subtree. Each pop descends to
//! the nearest leaf, pushing skipped siblings onto the frontier, then scans the
//! leaf bucket into a bounded top-k heap.
//!
//! The search stops when the frontier is empty, when the closest frontier bound
//! is strictly worse than the k-th best distance found, or when `check_budget`
//! point distances have been evaluated. Evaluation order depends only on the
//! tree and the query, so a larger budget always extends the same sequence of
//! evaluations and can never produce a worse answer.

use crate::config;
use crate::error::{MatchError, Result};
use crate::kdtree::distance::squared_euclidean;
use crate::kdtree::index::{FeatureIndex, IndexNode, NodeId};
use crate::vectors::VectorSet;
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BinaryHeap;

/// A neighbor of a query: a position in the indexed [`VectorSet`] and its
/// squared Euclidean distance to the query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NeighborResult {
    pub index: usize,
    pub distance: f32,
}

/// Work done by one query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Point-distance evaluations performed (never more than the budget).
    pub checks: usize,
    pub leaves_visited: usize,
    /// `true` when the search stopped because the budget ran out.
    pub budget_exhausted: bool,
}

/// An unexplored subtree: (negative lower bound, node).
/// BinaryHeap is a max-heap; negating the bound pops the closest subtree first.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Branch {
    neg_bound: OrderedFloat<f32>,
    node: NodeId,
}

impl Branch {
    fn new(bound: f32, node: NodeId) -> Self {
        Self {
            neg_bound: OrderedFloat(-bound),
            node,
        }
    }

    fn bound(&self) -> f32 {
        -self.neg_bound.0
    }
}

impl Ord for Branch {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.neg_bound
            .cmp(&other.neg_bound)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for Branch {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// A held result: (distance, scan sequence, point). Max-heap by distance, then
/// by sequence, so the top is the worst result and among equal distances the
/// most recently scanned one.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ResultEntry {
    distance: OrderedFloat<f32>,
    seq: usize,
    point: u32,
}

impl Ord for ResultEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.distance
            .cmp(&other.distance)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for ResultEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Fixed-capacity top-k heap. A candidate replaces the worst held result only
/// when strictly closer, so on equal distance the first scanned point stays.
struct TopK {
    heap: BinaryHeap<ResultEntry>,
    capacity: usize,
    // Cached worst distance; avoids a heap peek per evaluation
    worst: f32,
}

impl TopK {
    fn new(capacity: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(capacity + 1),
            capacity,
            worst: f32::INFINITY,
        }
    }

    #[inline]
    fn is_full(&self) -> bool {
        self.heap.len() >= self.capacity
    }

    #[inline]
    fn offer(&mut self, point: u32, distance: f32, seq: usize) {
        if self.is_full() {
            if !(distance < self.worst) {
                return;
            }
            self.heap.pop();
        }
        self.heap.push(ResultEntry {
            distance: OrderedFloat(distance),
            seq,
            point,
        });
        if self.is_full() {
            self.worst = self.heap.peek().map_or(f32::INFINITY, |r| r.distance.0);
        }
    }

    fn into_sorted(self) -> Vec<NeighborResult> {
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|r| NeighborResult {
                index: r.point as usize,
                distance: r.distance.0,
            })
            .collect()
    }
}

impl<'a> FeatureIndex<'a> {
    /// Approximate k-NN for a batch of queries, one result list per query in
    /// input order. Each list holds at most `k` neighbors in ascending distance.
    ///
    /// Every query is validated before any search runs; a query whose length
    /// differs from the index dimension fails the whole call with
    /// [`MatchError::DimensionMismatch`]. Queries are searched in parallel.
    pub fn find_knn<Q>(
        &self,
        queries: &[Q],
        k: usize,
        check_budget: usize,
    ) -> Result<Vec<Vec<NeighborResult>>>
    where
        Q: AsRef<[f32]> + Sync,
    {
        check_k(k)?;
        for (position, query) in queries.iter().enumerate() {
            self.check_query(position, query.as_ref())?;
        }
        tracing::debug!(queries = queries.len(), k, check_budget, "find_knn");

        Ok(queries
            .par_iter()
            .map(|q| self.search_unchecked(q.as_ref(), k, check_budget).0)
            .collect())
    }

    /// Approximate k-NN for a batch using the configured default check budget.
    pub fn find_knn_default<Q>(&self, queries: &[Q], k: usize) -> Result<Vec<Vec<NeighborResult>>>
    where
        Q: AsRef<[f32]> + Sync,
    {
        self.find_knn(queries, k, self.config.check_budget)
    }

    /// Approximate k-NN for one query.
    pub fn search(&self, query: &[f32], k: usize, check_budget: usize) -> Result<Vec<NeighborResult>> {
        self.search_with_stats(query, k, check_budget)
            .map(|(results, _)| results)
    }

    /// Like [`search`](Self::search), also reporting how much work was done.
    pub fn search_with_stats(
        &self,
        query: &[f32],
        k: usize,
        check_budget: usize,
    ) -> Result<(Vec<NeighborResult>, SearchStats)> {
        check_k(k)?;
        self.check_query(0, query)?;
        Ok(self.search_unchecked(query, k, check_budget))
    }

    fn search_unchecked(
        &self,
        query: &[f32],
        k: usize,
        check_budget: usize,
    ) -> (Vec<NeighborResult>, SearchStats) {
        let mut stats = SearchStats::default();
        let Some(root) = self.root else {
            return (Vec::new(), stats);
        };
        if k == 0 || check_budget == 0 {
            return (Vec::new(), stats);
        }

        let mut frontier: BinaryHeap<Branch> = BinaryHeap::new();
        let mut top = TopK::new(k.min(self.len()));
        frontier.push(Branch::new(0.0, root));

        'search: while let Some(branch) = frontier.pop() {
            let bound = branch.bound();
            // The closest unexplored subtree cannot beat the current k-th best
            if top.is_full() && bound > top.worst {
                break;
            }

            let mut node = branch.node;
            loop {
                match *self.node(node) {
                    IndexNode::Split {
                        dim,
                        threshold,
                        left,
                        right,
                    } => {
                        let diff = query[dim as usize] - threshold;
                        let (near, far) = if diff < 0.0 { (left, right) } else { (right, left) };
                        let far_bound = bound.max(diff * diff);
                        if !top.is_full() || far_bound <= top.worst {
                            frontier.push(Branch::new(far_bound, far));
                        }
                        node = near;
                    }
                    IndexNode::Leaf { start, len } => {
                        stats.leaves_visited += 1;
                        for &point in self.bucket(start, len) {
                            if stats.checks >= check_budget {
                                stats.budget_exhausted = true;
                                break 'search;
                            }
                            let distance =
                                squared_euclidean(query, self.vectors.vector(point as usize));
                            top.offer(point, distance, stats.checks);
                            stats.checks += 1;
                        }
                        break;
                    }
                }
            }
        }

        (top.into_sorted(), stats)
    }
}

/// Exact k-NN by scanning every vector. Ties keep the lower index first.
///
/// Used as ground truth when measuring the recall of the tree search.
pub fn linear_scan(vectors: &VectorSet, query: &[f32], k: usize) -> Result<Vec<NeighborResult>> {
    check_k(k)?;
    if vectors.is_empty() || k == 0 {
        return Ok(Vec::new());
    }
    if query.len() != vectors.dimension() {
        return Err(MatchError::DimensionMismatch {
            index: 0,
            expected: vectors.dimension(),
            found: query.len(),
        });
    }
    let mut top = TopK::new(k.min(vectors.len()));
    for (i, v, _) in vectors.iter() {
        top.offer(i as u32, squared_euclidean(query, v), i);
    }
    Ok(top.into_sorted())
}

fn check_k(k: usize) -> Result<()> {
    if k > config::MAX_K {
        return Err(MatchError::InvalidParameter(format!(
            "k must be at most {}, got {}",
            config::MAX_K,
            k
        )));
    }
    Ok(())
}

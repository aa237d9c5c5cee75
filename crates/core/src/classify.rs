//! Nearest-neighbor vote classification.
//!
//! Every query descriptor votes once, for the label of its nearest database
//! descriptor. Votes are kept in an ordered map so the argmax scan visits labels
//! in ascending order; with a strict greater-than comparison the lowest label
//! wins any tie.

use crate::error::{MatchError, Result};
use crate::kdtree::NeighborResult;
use crate::vectors::{Label, VectorSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outcome of a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Prediction {
    /// `label` received `votes` of the `total` votes cast.
    Match { label: Label, votes: u32, total: u32 },
    /// No votes were cast (for example, a query image without descriptors).
    NoMatch,
}

impl Prediction {
    pub fn label(&self) -> Option<Label> {
        match self {
            Prediction::Match { label, .. } => Some(*label),
            Prediction::NoMatch => None,
        }
    }
}

/// Per-query vote counts keyed by label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoteTable {
    votes: BTreeMap<Label, u32>,
}

impl VoteTable {
    /// An empty table. Only labels that receive a vote get an entry.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vote(&mut self, label: Label) {
        *self.votes.entry(label).or_insert(0) += 1;
    }

    /// Votes recorded for `label`.
    pub fn votes(&self, label: Label) -> u32 {
        self.votes.get(&label).copied().unwrap_or(0)
    }

    /// Total votes cast.
    pub fn total(&self) -> u32 {
        self.votes.values().sum()
    }

    /// `(label, votes)` in ascending label order.
    pub fn iter(&self) -> impl Iterator<Item = (Label, u32)> + '_ {
        self.votes.iter().map(|(&label, &votes)| (label, votes))
    }

    /// Label with the most votes; ties go to the lowest label. Returns
    /// [`Prediction::NoMatch`] when no votes were cast.
    pub fn winner(&self) -> Prediction {
        let mut best: Option<(Label, u32)> = None;
        for (label, votes) in self.iter() {
            if votes > best.map_or(0, |(_, v)| v) {
                best = Some((label, votes));
            }
        }
        match best {
            Some((label, votes)) => Prediction::Match {
                label,
                votes,
                total: self.total(),
            },
            None => Prediction::NoMatch,
        }
    }
}

/// Predicts a label from per-descriptor neighbor lists.
///
/// Only the nearest neighbor of each list votes; empty lists are skipped.
/// Fails with [`MatchError::NoClasses`] if `num_classes` is zero and with
/// [`MatchError::OutOfRange`] if a neighbor index lies outside `vectors` or a
/// neighbor's label is not below `num_classes`.
pub fn classify(
    neighbors: &[Vec<NeighborResult>],
    vectors: &VectorSet,
    num_classes: u32,
) -> Result<Prediction> {
    if num_classes == 0 {
        return Err(MatchError::NoClasses);
    }
    let mut table = VoteTable::new();
    for nearest in neighbors.iter().filter_map(|list| list.first()) {
        let label = vectors.label(nearest.index)?;
        if label >= num_classes {
            return Err(MatchError::OutOfRange {
                index: label as usize,
                len: num_classes as usize,
            });
        }
        table.add_vote(label);
    }
    let prediction = table.winner();
    tracing::debug!(descriptors = neighbors.len(), ?prediction, "Classified");
    Ok(prediction)
}

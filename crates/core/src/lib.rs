//! # featurematch-core
//!
//! Object recognition by nearest-neighbor voting over local image descriptors.
//!
//! A labeled descriptor database is loaded into a [`VectorSet`], indexed once by
//! a [`FeatureIndex`] (a maximum-variance kd-tree searched best-first under a
//! bounded check budget), and every descriptor of a query image votes for the
//! label of its nearest database descriptor. The label with the most votes wins.
//!
//! ## Architecture
//!
//! ```text
//! dataset loaders → VectorSet → FeatureIndex::build (once)
//! query descriptors → FeatureIndex::find_knn → classify → Prediction
//! ```
//!
//! This crate has no async dependencies and no interior mutability: a built
//! index is `Send + Sync` and can be queried from any number of threads.

/// Voting classifier: vote tables and label prediction from neighbor lists.
pub mod classify;
/// Global configuration constants: limits, defaults, and default file names.
pub mod config;
/// Loaders for label tables, descriptor databases, and keypoint descriptor files.
pub mod dataset;
/// Error types shared by the index, the vector set, and the classifier.
pub mod error;
/// Approximate k-NN kd-tree: node arena, construction, best-first search, and distance.
pub mod kdtree;
/// Immutable labeled vector storage.
pub mod vectors;

pub use classify::{classify, Prediction, VoteTable};
pub use error::{MatchError, Result};
pub use kdtree::{FeatureIndex, KdTreeConfig, NeighborResult};
pub use vectors::{Label, VectorSet};

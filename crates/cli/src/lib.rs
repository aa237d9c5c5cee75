//! featurematch: command-line recognition pipeline.
//!
//! Loads the label table and descriptor database, builds the feature index
//! once, and classifies query keypoint files by nearest-neighbor voting.
//! The index and classifier live in `featurematch-core`.

/// Database loading, per-query recognition, and report formatting.
pub mod pipeline;

//! Global configuration constants for featurematch.
//!
//! Index tuning defaults, input validation limits, and the default file names
//! used by the dataset loaders. Runtime overrides come from [`KdTreeConfig`]
//! and the command-line arguments of the `featurematch` binary.
//!
//! [`KdTreeConfig`]: crate::kdtree::KdTreeConfig

/// Default maximum number of points held by a kd-tree leaf bucket.
///
/// Smaller buckets make deeper trees with tighter cells; larger buckets make
/// shallower trees and longer exhaustive scans. Typical range: 8–32.
pub const DEFAULT_BUCKET_CAPACITY: usize = 16;

/// Default number of point-distance evaluations a single query may perform.
///
/// Higher values approach exact k-NN at the cost of latency. 250 matches the
/// budget the descriptor database was historically queried with.
pub const DEFAULT_CHECK_BUDGET: usize = 250;

/// Number of neighbors requested per query descriptor when classifying.
pub const DEFAULT_K: usize = 1;

/// Descriptor length produced by the extended SURF extractor.
pub const DEFAULT_DESCRIPTOR_DIM: usize = 128;

/// Maximum allowed descriptor dimension.
pub const MAX_DIMENSION: usize = 4096;

/// Maximum number of results (`k`) per query.
pub const MAX_K: usize = 10_000;

/// Default label-name table: `label<TAB>name` per line.
pub const DEFAULT_OBJECTS_FILE: &str = "object.txt";

/// Default descriptor database: `label<TAB>source<TAB>f0<TAB>...` per line.
pub const DEFAULT_DESCRIPTIONS_FILE: &str = "description.txt";

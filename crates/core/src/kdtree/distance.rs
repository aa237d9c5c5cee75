//! Squared Euclidean distance between descriptors.
//!
//! The index ranks candidates by squared L2 distance, which orders points the
//! same way as true L2 without a square root per evaluation. Callers that need
//! the true distance take the square root of the reported value.

const LANES: usize = 8;

/// Squared Euclidean distance (L2²) between two equal-length slices.
///
/// Accumulates eight independent partial sums so the compiler can vectorize
/// the loop, then folds the remainder.
#[inline]
pub fn squared_euclidean(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let mut acc = [0.0f32; LANES];
    let chunks_a = a.chunks_exact(LANES);
    let chunks_b = b.chunks_exact(LANES);
    let rem_a = chunks_a.remainder();
    let rem_b = chunks_b.remainder();

    for (ca, cb) in chunks_a.zip(chunks_b) {
        for i in 0..LANES {
            let d = ca[i] - cb[i];
            acc[i] += d * d;
        }
    }

    let mut sum: f32 = acc.iter().sum();
    for (x, y) in rem_a.iter().zip(rem_b) {
        let d = x - y;
        sum += d * d;
    }
    sum
}

/// Euclidean distance (L2).
#[inline]
pub fn euclidean(a: &[f32], b: &[f32]) -> f32 {
    squared_euclidean(a, b).sqrt()
}

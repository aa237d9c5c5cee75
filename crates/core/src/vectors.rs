//! Immutable labeled vector storage.
//!
//! A [`VectorSet`] holds N fixed-dimension descriptors in one contiguous arena
//! together with a parallel label array. Position `i` is the identity of a
//! descriptor everywhere downstream: the index stores positions, neighbor
//! results report positions, and the classifier resolves labels by position.

use crate::config;
use crate::error::{MatchError, Result};

/// Object label attached to every database descriptor.
pub type Label = u32;

/// Ordered collection of `(vector, label)` pairs with a single dimension.
///
/// Vectors are stored row-major in a flat `Vec<f32>` of length `len * dimension`.
/// There are no mutation methods; build a new set instead.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorSet {
    data: Vec<f32>,
    labels: Vec<Label>,
    dimension: usize,
}

impl VectorSet {
    /// Builds a set from per-vector rows and parallel labels.
    ///
    /// The dimension is taken from the first vector. Fails with
    /// [`MatchError::DimensionMismatch`] on the first row of a different length
    /// and with [`MatchError::LengthMismatch`] when the label count differs.
    pub fn new(vectors: Vec<Vec<f32>>, labels: Vec<Label>) -> Result<Self> {
        let dimension = vectors.first().map_or(0, Vec::len);
        for (index, v) in vectors.iter().enumerate() {
            if v.len() != dimension {
                return Err(MatchError::DimensionMismatch {
                    index,
                    expected: dimension,
                    found: v.len(),
                });
            }
        }
        if vectors.len() != labels.len() {
            return Err(MatchError::LengthMismatch {
                vectors: vectors.len(),
                labels: labels.len(),
            });
        }
        if !vectors.is_empty() {
            check_dimension(dimension)?;
        }

        let mut data = Vec::with_capacity(vectors.len() * dimension);
        for v in &vectors {
            data.extend_from_slice(v);
        }
        Ok(Self {
            data,
            labels,
            dimension,
        })
    }

    /// Builds a set from a row-major buffer of `labels.len() * dimension` floats.
    pub fn from_flat(dimension: usize, data: Vec<f32>, labels: Vec<Label>) -> Result<Self> {
        check_dimension(dimension)?;
        if data.len() % dimension != 0 {
            return Err(MatchError::DimensionMismatch {
                index: data.len() / dimension,
                expected: dimension,
                found: data.len() % dimension,
            });
        }
        let rows = data.len() / dimension;
        if rows != labels.len() {
            return Err(MatchError::LengthMismatch {
                vectors: rows,
                labels: labels.len(),
            });
        }
        Ok(Self {
            data,
            labels,
            dimension,
        })
    }

    /// An empty set that still carries a dimension, so queries against an index
    /// built from it can be validated once data exists.
    pub fn empty(dimension: usize) -> Self {
        Self {
            data: Vec::new(),
            labels: Vec::new(),
            dimension,
        }
    }

    /// Number of vectors (N).
    #[inline]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Returns `true` if the set holds no vectors.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Vector dimension (D). Zero for a set built from no vectors.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Returns vector `i` and its label, or [`MatchError::OutOfRange`].
    pub fn get(&self, i: usize) -> Result<(&[f32], Label)> {
        if i >= self.len() {
            return Err(MatchError::OutOfRange {
                index: i,
                len: self.len(),
            });
        }
        Ok((self.vector(i), self.labels[i]))
    }

    /// Vector `i` without a range check. Panics if `i >= len()`.
    #[inline]
    pub fn vector(&self, i: usize) -> &[f32] {
        let start = i * self.dimension;
        &self.data[start..start + self.dimension]
    }

    /// Label of vector `i`, or [`MatchError::OutOfRange`].
    pub fn label(&self, i: usize) -> Result<Label> {
        self.labels.get(i).copied().ok_or(MatchError::OutOfRange {
            index: i,
            len: self.len(),
        })
    }

    /// All labels in index order.
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Iterates `(index, vector, label)` in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[f32], Label)> + '_ {
        self.labels
            .iter()
            .enumerate()
            .map(move |(i, &label)| (i, self.vector(i), label))
    }
}

fn check_dimension(dimension: usize) -> Result<()> {
    if dimension == 0 || dimension > config::MAX_DIMENSION {
        return Err(MatchError::InvalidParameter(format!(
            "dimension must be in 1..={}, got {}",
            config::MAX_DIMENSION,
            dimension
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_and_get() {
        let set = VectorSet::new(vec![vec![1.0, 2.0], vec![3.0, 4.0]], vec![7, 9]).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.dimension(), 2);
        let (v, label) = set.get(1).unwrap();
        assert_eq!(v, &[3.0, 4.0]);
        assert_eq!(label, 9);
    }

    #[test]
    fn test_dimension_mismatch_reports_first_offender() {
        let err = VectorSet::new(
            vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0], vec![6.0]],
            vec![0, 0, 0, 0],
        )
        .unwrap_err();
        assert_eq!(
            err,
            MatchError::DimensionMismatch {
                index: 2,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn test_length_mismatch() {
        let err = VectorSet::new(vec![vec![1.0], vec![2.0]], vec![0]).unwrap_err();
        assert_eq!(
            err,
            MatchError::LengthMismatch {
                vectors: 2,
                labels: 1
            }
        );
    }

    #[test]
    fn test_get_out_of_range() {
        let set = VectorSet::new(vec![vec![1.0]], vec![0]).unwrap();
        assert_eq!(
            set.get(1).unwrap_err(),
            MatchError::OutOfRange { index: 1, len: 1 }
        );
        assert!(set.label(5).is_err());
    }

    #[test]
    fn test_empty_set() {
        let set = VectorSet::new(Vec::new(), Vec::new()).unwrap();
        assert!(set.is_empty());
        assert_eq!(set.dimension(), 0);
        assert!(set.get(0).is_err());
    }

    #[test]
    fn test_zero_dimension_rejected() {
        let err = VectorSet::new(vec![vec![], vec![]], vec![0, 1]).unwrap_err();
        assert!(matches!(err, MatchError::InvalidParameter(_)), "got {err:?}");
    }

    #[test]
    fn test_from_flat() {
        let set = VectorSet::from_flat(3, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0], vec![1, 2]).unwrap();
        assert_eq!(set.vector(1), &[3.0, 4.0, 5.0]);
        assert!(VectorSet::from_flat(3, vec![0.0; 5], vec![1, 2]).is_err());
        assert!(VectorSet::from_flat(3, vec![0.0; 6], vec![1]).is_err());
    }

    #[test]
    fn test_iter_in_index_order() {
        let set = VectorSet::new(vec![vec![1.0], vec![2.0], vec![3.0]], vec![5, 6, 7]).unwrap();
        let collected: Vec<(usize, f32, Label)> =
            set.iter().map(|(i, v, l)| (i, v[0], l)).collect();
        assert_eq!(collected, vec![(0, 1.0, 5), (1, 2.0, 6), (2, 3.0, 7)]);
    }
}

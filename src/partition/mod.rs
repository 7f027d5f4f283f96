//! Block-partitioned vectors and matrices
//!
//! A logical vector of length `n` is cut into contiguous blocks described by
//! a [`Partitioning`]. Matrices carry one partitioning for their rows and one
//! for their columns, and store a dense tile per `(row-block, col-block)`.
//! Every structure in this module is an immutable value: operations return
//! new instances.
#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use std::fmt;
use std::ops::Range;

mod matrix;
mod psd;
mod triangular;
mod vector;

pub use matrix::PartitionedMatrix;
pub use psd::PartitionedPsdMatrix;
pub use triangular::{LowerTriPartitionedMatrix, UpperTriPartitionedMatrix};
pub use vector::PartitionedVector;

/// The sizes of the contiguous blocks a logical dimension is cut into.
///
/// # Example
///
/// ```
/// # use partgp::partition::Partitioning;
/// let part = Partitioning::uniform(7, 3).unwrap();
///
/// assert_eq!(part.sizes(), &[3, 3, 1]);
/// assert_eq!(part.offset(2), 6);
/// assert_eq!(part.len(), 7);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(try_from = "Vec<usize>"))]
#[cfg_attr(feature = "serde1", serde(into = "Vec<usize>"))]
pub struct Partitioning {
    sizes: Vec<usize>,
    offsets: Vec<usize>,
}

impl Partitioning {
    /// Cut `len` into blocks of `block_size`. The final block is shorter when
    /// `block_size` does not divide `len`.
    pub fn uniform(len: usize, block_size: usize) -> Result<Self, PartitionError> {
        if block_size == 0 {
            return Err(PartitionError::InvalidPartitioning {
                reason: "block size must be greater than zero".to_string(),
            });
        }
        let n_full = len / block_size;
        let rem = len % block_size;
        let mut sizes = vec![block_size; n_full];
        if rem > 0 {
            sizes.push(rem);
        }
        Ok(Self::new_unchecked(sizes))
    }

    /// Create a partitioning from explicit block sizes
    pub fn from_sizes(sizes: Vec<usize>) -> Result<Self, PartitionError> {
        match sizes.iter().position(|&s| s == 0) {
            Some(block) => Err(PartitionError::InvalidPartitioning {
                reason: format!("block {block} is empty"),
            }),
            None => Ok(Self::new_unchecked(sizes)),
        }
    }

    pub(crate) fn new_unchecked(sizes: Vec<usize>) -> Self {
        let mut offsets = Vec::with_capacity(sizes.len() + 1);
        offsets.push(0);
        let mut acc = 0;
        for s in &sizes {
            acc += s;
            offsets.push(acc);
        }
        Self { sizes, offsets }
    }

    /// Number of blocks
    #[inline]
    #[must_use]
    pub fn n_blocks(&self) -> usize {
        self.sizes.len()
    }

    /// Total logical length
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.offsets[self.sizes.len()]
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Block sizes in block order
    #[inline]
    #[must_use]
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Size of block `block`
    #[inline]
    #[must_use]
    pub fn size(&self, block: usize) -> usize {
        self.sizes[block]
    }

    /// Logical index of the first element of `block`
    #[inline]
    #[must_use]
    pub fn offset(&self, block: usize) -> usize {
        self.offsets[block]
    }

    /// Logical index range covered by `block`
    #[inline]
    #[must_use]
    pub fn range(&self, block: usize) -> Range<usize> {
        self.offsets[block]..self.offsets[block + 1]
    }

    /// The block holding logical index `ix` and the position inside it
    #[must_use]
    pub fn locate(&self, ix: usize) -> Option<(usize, usize)> {
        if ix >= self.len() {
            return None;
        }
        // offsets is sorted and starts at zero, so the partition point is >= 1
        let block = self.offsets.partition_point(|&o| o <= ix) - 1;
        Some((block, ix - self.offsets[block]))
    }

    /// Sub-partitioning over a contiguous range of blocks
    pub fn slice(&self, blocks: Range<usize>) -> Result<Self, PartitionError> {
        if blocks.start > blocks.end || blocks.end > self.n_blocks() {
            return Err(PartitionError::InvalidPartitioning {
                reason: format!(
                    "block range {:?} out of bounds for {} blocks",
                    blocks,
                    self.n_blocks()
                ),
            });
        }
        Ok(Self::new_unchecked(self.sizes[blocks].to_vec()))
    }

    /// Partitioning of the concatenation of two partitioned dimensions
    #[must_use]
    pub fn concat(&self, other: &Self) -> Self {
        let sizes = [self.sizes.as_slice(), other.sizes.as_slice()].concat();
        Self::new_unchecked(sizes)
    }

    pub(crate) fn ensure_same(
        &self,
        other: &Self,
        op: &'static str,
    ) -> Result<(), PartitionError> {
        if self == other {
            Ok(())
        } else {
            Err(PartitionError::DimensionMismatch {
                op,
                left: self.sizes.clone(),
                right: other.sizes.clone(),
            })
        }
    }
}

impl Default for Partitioning {
    /// No blocks, length zero
    fn default() -> Self {
        Self::new_unchecked(Vec::new())
    }
}

impl TryFrom<Vec<usize>> for Partitioning {
    type Error = PartitionError;

    fn try_from(sizes: Vec<usize>) -> Result<Self, Self::Error> {
        Self::from_sizes(sizes)
    }
}

impl From<Partitioning> for Vec<usize> {
    fn from(part: Partitioning) -> Self {
        part.sizes
    }
}

/// Errors from partitioned algebra
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionError {
    /// The operands of `op` are partitioned differently
    DimensionMismatch {
        /// Name of the operation
        op: &'static str,
        /// Block sizes of the left operand
        left: Vec<usize>,
        /// Block sizes of the right operand
        right: Vec<usize>,
    },
    /// Blocks or tiles do not describe a valid partitioned structure
    InvalidPartitioning {
        /// What is wrong with it
        reason: String,
    },
    /// The residual of a diagonal block is not positive definite
    NotPositiveDefinite {
        /// Index of the failing diagonal block
        block: usize,
    },
    /// A diagonal block of a triangular system is singular
    SingularBlock {
        /// Index of the failing diagonal block
        block: usize,
    },
}

impl std::error::Error for PartitionError {}

impl fmt::Display for PartitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DimensionMismatch { op, left, right } => write!(
                f,
                "dimension mismatch in {op}: blocks {left:?} vs {right:?}"
            ),
            Self::InvalidPartitioning { reason } => {
                write!(f, "invalid partitioning: {reason}")
            }
            Self::NotPositiveDefinite { block } => write!(
                f,
                "matrix is not positive definite (diagonal block {block})"
            ),
            Self::SingularBlock { block } => {
                write!(f, "diagonal block {block} is singular")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_with_ragged_tail() {
        let part = Partitioning::uniform(10, 4).unwrap();
        assert_eq!(part.sizes(), &[4, 4, 2]);
        assert_eq!(part.range(2), 8..10);
        assert_eq!(part.len(), 10);
    }

    #[test]
    fn uniform_empty_has_no_blocks() {
        let part = Partitioning::uniform(0, 3).unwrap();
        assert_eq!(part.n_blocks(), 0);
        assert!(part.is_empty());
    }

    #[test]
    fn default_is_empty() {
        let part = Partitioning::default();
        assert_eq!(part.len(), 0);
        assert_eq!(part.n_blocks(), 0);
        assert_eq!(part, Partitioning::uniform(0, 2).unwrap());
    }

    #[test]
    fn zero_block_size_is_rejected() {
        assert!(matches!(
            Partitioning::uniform(5, 0),
            Err(PartitionError::InvalidPartitioning { .. })
        ));
    }

    #[test]
    fn empty_block_is_rejected() {
        assert!(Partitioning::from_sizes(vec![2, 0, 1]).is_err());
        assert!(Partitioning::from_sizes(vec![2, 1]).is_ok());
    }

    #[test]
    fn locate_finds_block_and_position() {
        let part = Partitioning::from_sizes(vec![2, 3, 1]).unwrap();
        assert_eq!(part.locate(0), Some((0, 0)));
        assert_eq!(part.locate(1), Some((0, 1)));
        assert_eq!(part.locate(2), Some((1, 0)));
        assert_eq!(part.locate(5), Some((2, 0)));
        assert_eq!(part.locate(6), None);
    }

    #[test]
    fn slice_reindexes_from_zero() {
        let part = Partitioning::from_sizes(vec![2, 3, 1]).unwrap();
        let sub = part.slice(1..3).unwrap();
        assert_eq!(sub.sizes(), &[3, 1]);
        assert_eq!(sub.offset(0), 0);
        assert!(part.slice(2..4).is_err());
    }
}

use nalgebra::{DMatrix, DVector};
use std::ops::Range;

#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use super::{PartitionError, Partitioning};

/// A dense vector split into contiguous blocks.
///
/// # Example
///
/// ```
/// # use partgp::partition::PartitionedVector;
/// let v = PartitionedVector::from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0], 2).unwrap();
///
/// assert_eq!(v.n_blocks(), 3);
/// assert_eq!(v.block(2).len(), 1);
/// assert_eq!(v.to_vec(), vec![1.0, 2.0, 3.0, 4.0, 5.0]);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
#[cfg_attr(feature = "serde1", serde(try_from = "PartitionedVectorRaw"))]
pub struct PartitionedVector {
    partitioning: Partitioning,
    blocks: Vec<DVector<f64>>,
}

#[cfg(feature = "serde1")]
#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
struct PartitionedVectorRaw {
    partitioning: Partitioning,
    blocks: Vec<DVector<f64>>,
}

#[cfg(feature = "serde1")]
impl TryFrom<PartitionedVectorRaw> for PartitionedVector {
    type Error = PartitionError;

    fn try_from(raw: PartitionedVectorRaw) -> Result<Self, Self::Error> {
        let vector = Self::from_dvectors(raw.blocks)?;
        raw.partitioning
            .ensure_same(vector.partitioning(), "deserialize")?;
        Ok(vector)
    }
}

impl PartitionedVector {
    /// Build from `(block index, block)` pairs. The pairs may come in any
    /// order, but the indices must cover `0..k` exactly once and no block may
    /// be empty.
    pub fn from_blocks(
        mut blocks: Vec<(usize, DVector<f64>)>,
    ) -> Result<Self, PartitionError> {
        blocks.sort_by_key(|(ix, _)| *ix);
        for (expected, (ix, _)) in blocks.iter().enumerate() {
            if *ix != expected {
                return Err(PartitionError::InvalidPartitioning {
                    reason: format!(
                        "block indices must be contiguous from zero: expected {expected}, found {ix}"
                    ),
                });
            }
        }
        Self::from_dvectors(blocks.into_iter().map(|(_, b)| b).collect())
    }

    pub(crate) fn new_unchecked(
        partitioning: Partitioning,
        blocks: Vec<DVector<f64>>,
    ) -> Self {
        debug_assert_eq!(partitioning.n_blocks(), blocks.len());
        Self {
            partitioning,
            blocks,
        }
    }

    /// Build from blocks already in block order
    pub fn from_dvectors(
        blocks: Vec<DVector<f64>>,
    ) -> Result<Self, PartitionError> {
        let partitioning =
            Partitioning::from_sizes(blocks.iter().map(DVector::len).collect())?;
        Ok(Self {
            partitioning,
            blocks,
        })
    }

    /// Group a flat sequence into blocks of `block_size`; the last block may
    /// be shorter.
    pub fn from_slice(
        xs: &[f64],
        block_size: usize,
    ) -> Result<Self, PartitionError> {
        let partitioning = Partitioning::uniform(xs.len(), block_size)?;
        Ok(Self::from_flat(&partitioning, xs))
    }

    /// Build a vector of logical length `len` from a function of the index
    pub fn from_fn<F>(
        len: usize,
        block_size: usize,
        mut f: F,
    ) -> Result<Self, PartitionError>
    where
        F: FnMut(usize) -> f64,
    {
        let partitioning = Partitioning::uniform(len, block_size)?;
        let blocks = (0..partitioning.n_blocks())
            .map(|b| {
                let offset = partitioning.offset(b);
                DVector::from_fn(partitioning.size(b), |i, _| f(offset + i))
            })
            .collect();
        Ok(Self {
            partitioning,
            blocks,
        })
    }

    /// Build a vector laid out by `partitioning` from flat data. Panics if
    /// the lengths disagree.
    pub(crate) fn from_flat(partitioning: &Partitioning, xs: &[f64]) -> Self {
        assert_eq!(partitioning.len(), xs.len());
        let blocks = (0..partitioning.n_blocks())
            .map(|b| DVector::from_column_slice(&xs[partitioning.range(b)]))
            .collect();
        Self {
            partitioning: partitioning.clone(),
            blocks,
        }
    }

    /// Every entry equal to `value`
    #[must_use]
    pub fn from_element(partitioning: &Partitioning, value: f64) -> Self {
        let blocks = partitioning
            .sizes()
            .iter()
            .map(|&s| DVector::from_element(s, value))
            .collect();
        Self {
            partitioning: partitioning.clone(),
            blocks,
        }
    }

    #[must_use]
    pub fn zeros(partitioning: &Partitioning) -> Self {
        Self::from_element(partitioning, 0.0)
    }

    /// Logical length
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.partitioning.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.partitioning.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn n_blocks(&self) -> usize {
        self.blocks.len()
    }

    #[inline]
    #[must_use]
    pub fn partitioning(&self) -> &Partitioning {
        &self.partitioning
    }

    /// The dense sub-vector of block `ix`
    #[inline]
    #[must_use]
    pub fn block(&self, ix: usize) -> &DVector<f64> {
        &self.blocks[ix]
    }

    /// Iterate over `(block index, block)` in block order
    pub fn blocks(&self) -> impl Iterator<Item = (usize, &DVector<f64>)> {
        self.blocks.iter().enumerate()
    }

    /// Entry at logical index `ix`
    #[must_use]
    pub fn get(&self, ix: usize) -> Option<f64> {
        self.partitioning
            .locate(ix)
            .map(|(b, i)| self.blocks[b][i])
    }

    /// Concatenate the blocks in index order
    #[must_use]
    pub fn to_vec(&self) -> Vec<f64> {
        self.blocks
            .iter()
            .flat_map(|b| b.iter().copied())
            .collect()
    }

    #[must_use]
    pub fn to_dvector(&self) -> DVector<f64> {
        DVector::from_vec(self.to_vec())
    }

    /// Apply `f` to every entry, keeping the partitioning
    #[must_use]
    pub fn map<F>(&self, mut f: F) -> Self
    where
        F: FnMut(f64) -> f64,
    {
        Self {
            partitioning: self.partitioning.clone(),
            blocks: self.blocks.iter().map(|b| b.map(&mut f)).collect(),
        }
    }

    #[must_use]
    pub fn scale(&self, factor: f64) -> Self {
        self.map(|x| x * factor)
    }

    /// Combine two identically partitioned vectors entry by entry
    pub fn try_zip_map<F>(
        &self,
        other: &Self,
        op: &'static str,
        mut f: F,
    ) -> Result<Self, PartitionError>
    where
        F: FnMut(f64, f64) -> f64,
    {
        self.partitioning.ensure_same(&other.partitioning, op)?;
        let blocks = self
            .blocks
            .iter()
            .zip(other.blocks.iter())
            .map(|(a, b)| a.zip_map(b, &mut f))
            .collect();
        Ok(Self {
            partitioning: self.partitioning.clone(),
            blocks,
        })
    }

    /// Block-wise sum
    pub fn try_add(&self, other: &Self) -> Result<Self, PartitionError> {
        self.try_zip_map(other, "add", |a, b| a + b)
    }

    /// Block-wise difference
    pub fn try_sub(&self, other: &Self) -> Result<Self, PartitionError> {
        self.try_zip_map(other, "sub", |a, b| a - b)
    }

    /// Sum over blocks of the per-block inner product
    ///
    /// # Example
    ///
    /// ```
    /// # use partgp::partition::PartitionedVector;
    /// let a = PartitionedVector::from_slice(&[1.0, 2.0, 3.0], 2).unwrap();
    /// let b = PartitionedVector::from_slice(&[4.0, 5.0, 6.0], 2).unwrap();
    /// assert_eq!(a.dot(&b).unwrap(), 32.0);
    ///
    /// // Same data, different blocks
    /// let c = PartitionedVector::from_slice(&[4.0, 5.0, 6.0], 1).unwrap();
    /// assert!(a.dot(&c).is_err());
    /// ```
    pub fn dot(&self, other: &Self) -> Result<f64, PartitionError> {
        self.partitioning.ensure_same(&other.partitioning, "dot")?;
        Ok(self
            .blocks
            .iter()
            .zip(other.blocks.iter())
            .map(|(a, b)| a.dot(b))
            .sum())
    }

    #[must_use]
    pub fn sum(&self) -> f64 {
        self.blocks.iter().map(|b| b.sum()).sum()
    }

    #[must_use]
    pub fn norm_squared(&self) -> f64 {
        self.blocks.iter().map(DVector::norm_squared).sum()
    }

    /// Append the blocks of `other` after those of `self`
    #[must_use]
    pub fn concat(&self, other: &Self) -> Self {
        let blocks = self
            .blocks
            .iter()
            .chain(other.blocks.iter())
            .cloned()
            .collect();
        Self {
            partitioning: self.partitioning.concat(&other.partitioning),
            blocks,
        }
    }

    /// The blocks in `range`, re-indexed from zero
    pub fn slice_blocks(
        &self,
        range: Range<usize>,
    ) -> Result<Self, PartitionError> {
        let partitioning = self.partitioning.slice(range.clone())?;
        Ok(Self {
            partitioning,
            blocks: self.blocks[range].to_vec(),
        })
    }

    /// Entry-wise comparison with relative and absolute tolerance
    #[must_use]
    pub fn relative_eq(&self, other: &Self, rel: f64, abs: f64) -> bool {
        self.partitioning == other.partitioning
            && self
                .blocks
                .iter()
                .zip(other.blocks.iter())
                .all(|(a, b)| a.relative_eq(b, rel, abs))
    }

    /// The blocks as single-column matrices
    pub(crate) fn to_columns(&self) -> Vec<DMatrix<f64>> {
        self.blocks
            .iter()
            .map(|b| DMatrix::from_column_slice(b.len(), 1, b.as_slice()))
            .collect()
    }

    /// Inverse of [`Self::to_columns`]
    pub(crate) fn from_columns(
        partitioning: &Partitioning,
        columns: Vec<DMatrix<f64>>,
    ) -> Self {
        let blocks = columns
            .into_iter()
            .map(|c| DVector::from_column_slice(c.as_slice()))
            .collect();
        Self {
            partitioning: partitioning.clone(),
            blocks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn from_blocks_accepts_any_order() {
        let v = PartitionedVector::from_blocks(vec![
            (1, DVector::from_column_slice(&[3.0])),
            (0, DVector::from_column_slice(&[1.0, 2.0])),
        ])
        .unwrap();
        assert_eq!(v.to_vec(), vec![1.0, 2.0, 3.0]);
        assert_eq!(v.partitioning().sizes(), &[2, 1]);
    }

    #[test]
    fn from_blocks_rejects_gaps_and_empty_blocks() {
        let gap = PartitionedVector::from_blocks(vec![
            (0, DVector::from_column_slice(&[1.0])),
            (2, DVector::from_column_slice(&[3.0])),
        ]);
        assert!(matches!(
            gap,
            Err(PartitionError::InvalidPartitioning { .. })
        ));

        let empty = PartitionedVector::from_blocks(vec![
            (0, DVector::from_column_slice(&[1.0])),
            (1, DVector::zeros(0)),
        ]);
        assert!(matches!(
            empty,
            Err(PartitionError::InvalidPartitioning { .. })
        ));
    }

    #[test]
    fn add_requires_same_partitioning() {
        let a = PartitionedVector::from_slice(&[1.0, 2.0, 3.0, 4.0], 2).unwrap();
        let b = PartitionedVector::from_slice(&[1.0, 2.0, 3.0, 4.0], 3).unwrap();
        assert!(matches!(
            a.try_add(&b),
            Err(PartitionError::DimensionMismatch { op: "add", .. })
        ));
        let c = a.try_add(&a).unwrap();
        assert_eq!(c.to_vec(), vec![2.0, 4.0, 6.0, 8.0]);
        let z = a.try_sub(&a).unwrap();
        assert_eq!(z.sum(), 0.0);
    }

    #[test]
    fn concat_and_slice() {
        let a = PartitionedVector::from_slice(&[1.0, 2.0, 3.0], 2).unwrap();
        let b = PartitionedVector::from_slice(&[4.0, 5.0], 2).unwrap();
        let c = a.concat(&b);
        assert_eq!(c.partitioning().sizes(), &[2, 1, 2]);
        assert_eq!(c.to_vec(), vec![1.0, 2.0, 3.0, 4.0, 5.0]);

        let s = c.slice_blocks(1..3).unwrap();
        assert_eq!(s.to_vec(), vec![3.0, 4.0, 5.0]);
        assert_eq!(s.block(0).len(), 1);
        assert!(c.slice_blocks(2..4).is_err());
    }

    #[test]
    fn get_by_logical_index() {
        let v = PartitionedVector::from_fn(5, 2, |i| i as f64 * 10.0).unwrap();
        assert_eq!(v.get(3), Some(30.0));
        assert_eq!(v.get(4), Some(40.0));
        assert_eq!(v.get(5), None);
    }

    proptest! {
        #[test]
        fn flat_round_trip(
            xs in prop::collection::vec(-1e6_f64..1e6, 0..64),
            block_size in 1_usize..10,
        ) {
            let v = PartitionedVector::from_slice(&xs, block_size).unwrap();
            prop_assert_eq!(v.len(), xs.len());
            prop_assert!(v.blocks().all(|(_, b)| !b.is_empty() && b.len() <= block_size));
            prop_assert_eq!(v.to_vec(), xs);
        }

        #[test]
        fn mismatched_partitioning_fails(
            n in 2_usize..40,
            b1 in 1_usize..8,
            b2 in 1_usize..8,
        ) {
            let p1 = Partitioning::uniform(n, b1).unwrap();
            let p2 = Partitioning::uniform(n, b2).unwrap();
            prop_assume!(p1 != p2);
            let a = PartitionedVector::from_element(&p1, 1.0);
            let b = PartitionedVector::from_element(&p2, 1.0);
            let is_mismatch = |e: &PartitionError| {
                matches!(e, PartitionError::DimensionMismatch { .. })
            };
            prop_assert!(a.try_add(&b).err().as_ref().is_some_and(is_mismatch));
            prop_assert!(a.dot(&b).err().as_ref().is_some_and(is_mismatch));
        }
    }

    #[cfg(feature = "serde1")]
    #[test]
    fn serde_round_trip_and_validation() {
        let v = PartitionedVector::from_slice(&[1.0, 2.0, 3.0], 2).unwrap();
        let s = serde_json::to_string(&v).unwrap();
        let back: PartitionedVector = serde_json::from_str(&s).unwrap();
        assert_eq!(v, back);

        let mut value: serde_json::Value = serde_json::from_str(&s).unwrap();
        value["partitioning"] = serde_json::json!([3]);
        let res: Result<PartitionedVector, _> = serde_json::from_value(value);
        assert!(res.is_err());
    }
}

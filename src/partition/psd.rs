use nalgebra::DMatrix;
use std::ops::Deref;

#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use super::triangular::lower_index;
use super::{
    LowerTriPartitionedMatrix, PartitionError, PartitionedMatrix, Partitioning,
};

/// A symmetric positive semi-definite partitioned matrix.
///
/// Rows and columns share one partitioning. Symmetry and definiteness are the
/// caller's responsibility; only the shape is checked. A failed
/// [`cholesky`](Self::cholesky) is how non-definiteness surfaces.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(try_from = "PartitionedMatrix"))]
pub struct PartitionedPsdMatrix(PartitionedMatrix);

impl TryFrom<PartitionedMatrix> for PartitionedPsdMatrix {
    type Error = PartitionError;

    fn try_from(mat: PartitionedMatrix) -> Result<Self, Self::Error> {
        Self::new(mat)
    }
}

impl PartitionedPsdMatrix {
    /// Wrap a partitioned matrix whose row and column partitionings are equal
    pub fn new(mat: PartitionedMatrix) -> Result<Self, PartitionError> {
        mat.rows().ensure_same(mat.cols(), "psd")?;
        Ok(Self(mat))
    }

    pub(crate) fn new_unchecked(mat: PartitionedMatrix) -> Self {
        Self(mat)
    }

    /// Build from the packed lower tiles `(0,0), (1,0), (1,1), (2,0), …`.
    /// Upper tiles are mirrored and the upper triangle of each diagonal tile
    /// is overwritten with its lower triangle.
    pub fn from_lower_tiles(
        partitioning: &Partitioning,
        lower: Vec<DMatrix<f64>>,
    ) -> Result<Self, PartitionError> {
        let k = partitioning.n_blocks();
        if lower.len() != k * (k + 1) / 2 {
            return Err(PartitionError::InvalidPartitioning {
                reason: format!(
                    "expected {} lower tiles for {k} blocks, found {}",
                    k * (k + 1) / 2,
                    lower.len()
                ),
            });
        }
        for r in 0..k {
            for c in 0..=r {
                let shape = lower[lower_index(r, c)].shape();
                if shape != (partitioning.size(r), partitioning.size(c)) {
                    return Err(PartitionError::InvalidPartitioning {
                        reason: format!(
                            "lower tile ({r}, {c}) has shape {shape:?}"
                        ),
                    });
                }
            }
        }
        Ok(Self::from_lower_unchecked(partitioning, lower))
    }

    pub(crate) fn from_lower_unchecked(
        partitioning: &Partitioning,
        mut lower: Vec<DMatrix<f64>>,
    ) -> Self {
        let k = partitioning.n_blocks();
        let mut tiles = Vec::with_capacity(k * k);
        for r in 0..k {
            lower[lower_index(r, r)].fill_upper_triangle_with_lower_triangle();
            for c in 0..k {
                let tile = if r >= c {
                    lower[lower_index(r, c)].clone()
                } else {
                    lower[lower_index(c, r)].transpose()
                };
                tiles.push(tile);
            }
        }
        Self(PartitionedMatrix::new_unchecked(
            partitioning.clone(),
            partitioning.clone(),
            tiles,
        ))
    }

    /// Evaluate `f(i, j)` for `i >= j` only and mirror the rest
    #[must_use]
    pub fn from_symmetric_fn<F>(partitioning: &Partitioning, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> f64,
    {
        let k = partitioning.n_blocks();
        let mut lower = Vec::with_capacity(k * (k + 1) / 2);
        for r in 0..k {
            for c in 0..=r {
                let (r0, c0) = (partitioning.offset(r), partitioning.offset(c));
                let tile = DMatrix::from_fn(
                    partitioning.size(r),
                    partitioning.size(c),
                    |i, j| {
                        if r == c && j > i {
                            0.0
                        } else {
                            f(r0 + i, c0 + j)
                        }
                    },
                );
                lower.push(tile);
            }
        }
        Self::from_lower_unchecked(partitioning, lower)
    }

    #[must_use]
    pub fn identity(partitioning: &Partitioning) -> Self {
        Self(PartitionedMatrix::identity(partitioning))
    }

    /// The shared row and column partitioning
    #[inline]
    #[must_use]
    pub fn partitioning(&self) -> &Partitioning {
        self.0.rows()
    }

    #[inline]
    #[must_use]
    pub fn as_matrix(&self) -> &PartitionedMatrix {
        &self.0
    }

    #[inline]
    #[must_use]
    pub fn into_matrix(self) -> PartitionedMatrix {
        self.0
    }

    /// `self + value·I`
    #[must_use]
    pub fn add_diagonal(&self, value: f64) -> Self {
        let (rows, cols, mut tiles) = self.0.clone().into_tiles();
        let k = rows.n_blocks();
        for b in 0..k {
            let tile = &mut tiles[b * k + b];
            for d in 0..tile.nrows() {
                tile[(d, d)] += value;
            }
        }
        Self(PartitionedMatrix::new_unchecked(rows, cols, tiles))
    }

    /// Sum of two PSD matrices, which is again PSD
    pub fn try_add(&self, other: &Self) -> Result<Self, PartitionError> {
        self.0.try_add(&other.0).map(Self)
    }

    /// Scale by a non-negative factor
    #[must_use]
    pub fn scale(&self, factor: f64) -> Self {
        Self(self.0.scale(factor))
    }

    /// Blocked Cholesky factorization `K = L·Lᵀ`.
    ///
    /// Block rows are processed in increasing order. Within a row the
    /// off-diagonal tiles come first,
    /// `L(i,j) = (K(i,j) - Σ_{l<j} L(i,l)·L(j,l)ᵀ)·L(j,j)⁻ᵀ`,
    /// then the diagonal tile is the dense Cholesky factor of
    /// `K(i,i) - Σ_{j<i} L(i,j)·L(i,j)ᵀ`.
    ///
    /// # Errors
    ///
    /// [`PartitionError::NotPositiveDefinite`] naming the first diagonal
    /// block whose residual has no Cholesky factor.
    ///
    /// # Example
    ///
    /// ```
    /// # use partgp::partition::{PartitionedPsdMatrix, Partitioning};
    /// let part = Partitioning::uniform(5, 2).unwrap();
    /// let k = PartitionedPsdMatrix::from_symmetric_fn(&part, |i, j| {
    ///     (-0.5 * (i as f64 - j as f64).powi(2)).exp() + if i == j { 0.1 } else { 0.0 }
    /// });
    ///
    /// let l = k.cholesky().unwrap();
    /// let llt = l.to_dense() * l.to_dense().transpose();
    ///
    /// assert!(llt.relative_eq(&k.to_dense(), 1e-10, 1e-10));
    /// ```
    pub fn cholesky(&self) -> Result<LowerTriPartitionedMatrix, PartitionError> {
        let part = self.partitioning();
        let k = part.n_blocks();
        let mut tiles: Vec<DMatrix<f64>> = Vec::with_capacity(k * (k + 1) / 2);

        for i in 0..k {
            for j in 0..i {
                let mut residual = self.tile(i, j).clone();
                for l in 0..j {
                    residual -= &tiles[lower_index(i, l)]
                        * tiles[lower_index(j, l)].transpose();
                }
                // X·L(j,j)ᵀ = R  <=>  L(j,j)·Xᵀ = Rᵀ
                let xt = tiles[lower_index(j, j)]
                    .solve_lower_triangular(&residual.transpose())
                    .ok_or(PartitionError::SingularBlock { block: j })?;
                tiles.push(xt.transpose());
            }

            let mut residual = self.tile(i, i).clone();
            for j in 0..i {
                let lij = &tiles[lower_index(i, j)];
                residual -= lij * lij.transpose();
            }
            let chol = residual
                .cholesky()
                .ok_or(PartitionError::NotPositiveDefinite { block: i })?;
            tiles.push(chol.unpack());
        }

        Ok(LowerTriPartitionedMatrix::new_unchecked(part.clone(), tiles))
    }

    /// `ln |K|` through the blocked Cholesky factor
    pub fn ln_det(&self) -> Result<f64, PartitionError> {
        self.cholesky().map(|l| 2.0 * l.ln_det())
    }
}

impl Deref for PartitionedPsdMatrix {
    type Target = PartitionedMatrix;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<PartitionedPsdMatrix> for PartitionedMatrix {
    fn from(psd: PartitionedPsdMatrix) -> Self {
        psd.0
    }
}

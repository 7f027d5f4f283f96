use rand::Rng;
use rand_distr::StandardNormal;
use std::fmt;
use std::sync::OnceLock;

#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use crate::consts::LN_2PI;
use crate::partition::{
    LowerTriPartitionedMatrix, PartitionError, PartitionedPsdMatrix,
    PartitionedVector, Partitioning,
};
use crate::traits::{Mean, Variance};

/// [Multivariate Gaussian/Normal Distribution](https://en.wikipedia.org/wiki/Multivariate_normal_distribution),
/// 𝒩(μ, Σ), with a block-partitioned mean and covariance.
///
/// The blocked Cholesky factor of Σ is computed on first use and cached.
///
/// # Example
///
/// ```
/// use partgp::dist::BlockedMvGaussian;
/// use partgp::traits::Mean;
/// use rand::SeedableRng;
///
/// let mut rng = rand::rngs::StdRng::seed_from_u64(0xABCD);
/// let mvg = BlockedMvGaussian::standard(5, 2).unwrap();
///
/// let xs = mvg.sample(3, &mut rng).unwrap();
/// assert_eq!(xs.len(), 3);
/// assert_eq!(xs[0].partitioning().sizes(), &[2, 2, 1]);
/// assert_eq!(mvg.mean().unwrap().to_vec(), vec![0.0; 5]);
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct BlockedMvGaussian {
    mu: PartitionedVector,
    cov: PartitionedPsdMatrix,
    #[cfg_attr(feature = "serde1", serde(skip))]
    factor: OnceLock<LowerTriPartitionedMatrix>,
}

impl PartialEq for BlockedMvGaussian {
    fn eq(&self, other: &Self) -> bool {
        self.mu == other.mu && self.cov == other.cov
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BlockedMvGaussianError {
    /// μ and Σ are not partitioned the same way
    MuCovMismatch(PartitionError),
    /// Σ has no Cholesky factor
    CovNotPositiveDefinite(PartitionError),
    /// The argument is partitioned differently than μ
    Partition(PartitionError),
}

impl std::error::Error for BlockedMvGaussianError {}

impl fmt::Display for BlockedMvGaussianError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MuCovMismatch(e) => {
                write!(f, "Partitioning of μ and Σ must match: {e}")
            }
            Self::CovNotPositiveDefinite(e) => {
                write!(f, "Σ is not positive definite: {e}")
            }
            Self::Partition(e) => write!(f, "{e}"),
        }
    }
}

impl From<PartitionError> for BlockedMvGaussianError {
    fn from(e: PartitionError) -> Self {
        Self::Partition(e)
    }
}

impl BlockedMvGaussian {
    /// Create a new blocked multivariate Gaussian. The row partitioning of
    /// `cov` must equal the partitioning of `mu`.
    pub fn new(
        mu: PartitionedVector,
        cov: PartitionedPsdMatrix,
    ) -> Result<Self, BlockedMvGaussianError> {
        cov.partitioning()
            .ensure_same(mu.partitioning(), "mvg")
            .map_err(BlockedMvGaussianError::MuCovMismatch)?;
        Ok(Self::new_unchecked(mu, cov))
    }

    pub(crate) fn new_unchecked(
        mu: PartitionedVector,
        cov: PartitionedPsdMatrix,
    ) -> Self {
        Self {
            mu,
            cov,
            factor: OnceLock::new(),
        }
    }

    /// Zero mean, identity covariance, cut into blocks of `block_size`
    pub fn standard(
        dims: usize,
        block_size: usize,
    ) -> Result<Self, BlockedMvGaussianError> {
        let part = Partitioning::uniform(dims, block_size)?;
        Ok(Self::new_unchecked(
            PartitionedVector::zeros(&part),
            PartitionedPsdMatrix::identity(&part),
        ))
    }

    #[inline]
    #[must_use]
    pub fn mu(&self) -> &PartitionedVector {
        &self.mu
    }

    #[inline]
    #[must_use]
    pub fn cov(&self) -> &PartitionedPsdMatrix {
        &self.cov
    }

    #[inline]
    #[must_use]
    pub fn dims(&self) -> usize {
        self.mu.len()
    }

    /// Lower blocked Cholesky factor `L` of Σ, computed once
    pub fn factor(
        &self,
    ) -> Result<&LowerTriPartitionedMatrix, BlockedMvGaussianError> {
        if let Some(factor) = self.factor.get() {
            return Ok(factor);
        }
        let factor = self
            .cov
            .cholesky()
            .map_err(BlockedMvGaussianError::CovNotPositiveDefinite)?;
        Ok(self.factor.get_or_init(|| factor))
    }

    /// Draw `μ + L·z` with `z` standard normal
    pub fn draw<R: Rng>(
        &self,
        rng: &mut R,
    ) -> Result<PartitionedVector, BlockedMvGaussianError> {
        let factor = self.factor()?;
        let z = self.mu.map(|_| rng.sample(StandardNormal));
        Ok(self.mu.try_add(&factor.mul_vector(&z)?)?)
    }

    /// Multiple draws
    pub fn sample<R: Rng>(
        &self,
        n: usize,
        rng: &mut R,
    ) -> Result<Vec<PartitionedVector>, BlockedMvGaussianError> {
        (0..n).map(|_| self.draw(rng)).collect()
    }

    /// Log density up to the normalizer, `-½ (x-μ)ᵀ Σ⁻¹ (x-μ)`
    pub fn ln_f(
        &self,
        x: &PartitionedVector,
    ) -> Result<f64, BlockedMvGaussianError> {
        let diff = x.try_sub(&self.mu)?;
        let z = self.factor()?.solve_vector(&diff)?;
        Ok(-0.5 * z.norm_squared())
    }

    /// `(n/2) ln 2π + ½ ln|Σ|`
    pub fn ln_normalizer(&self) -> Result<f64, BlockedMvGaussianError> {
        let n = self.dims() as f64;
        Ok(0.5 * n * LN_2PI + self.factor()?.ln_det())
    }

    /// Log density
    pub fn ln_pdf(
        &self,
        x: &PartitionedVector,
    ) -> Result<f64, BlockedMvGaussianError> {
        Ok(self.ln_f(x)? - self.ln_normalizer()?)
    }

    /// `(μ - s·L·1, μ + s·L·1)`
    pub fn confidence_interval(
        &self,
        s: f64,
    ) -> Result<(PartitionedVector, PartitionedVector), BlockedMvGaussianError>
    {
        let ones = self.mu.map(|_| 1.0);
        let width = self.factor()?.mul_vector(&ones)?.scale(s);
        Ok((self.mu.try_sub(&width)?, self.mu.try_add(&width)?))
    }
}

impl Mean<PartitionedVector> for BlockedMvGaussian {
    fn mean(&self) -> Option<PartitionedVector> {
        Some(self.mu.clone())
    }
}

impl Variance<PartitionedVector> for BlockedMvGaussian {
    fn variance(&self) -> Option<PartitionedVector> {
        self.cov.diagonal().ok()
    }
}

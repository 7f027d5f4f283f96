//! Covariance kernels
//!
//! A kernel is a pairwise covariance over an index type `I` with a set of
//! named hyperparameters. Kernels compose with `+` and `*`; the composite
//! namespaces the hyperparameters of its left and right children under
//! `lhs` and `rhs`.
use itertools::iproduct;
use nalgebra::{DMatrix, DVector};
use std::f64;
use std::fmt;

use crate::partition::{
    PartitionError, PartitionedMatrix, PartitionedPsdMatrix, Partitioning,
};

mod hyper;
pub use hyper::*;

mod misc;
pub use self::misc::*;

mod blocked;
pub use self::blocked::*;

mod constant_kernel;
pub use self::constant_kernel::*;

mod ops;
pub use self::ops::*;

mod rbf;
pub use self::rbf::*;
mod white_kernel;
pub use self::white_kernel::*;
mod linear_kernel;
pub use self::linear_kernel::*;
mod rational_quadratic;
pub use self::rational_quadratic::*;
mod exp_sin_squared;
pub use self::exp_sin_squared::*;

/// Named, positional hyperparameters of a kernel.
///
/// Nothing here depends on the index type, so configurations can be handled
/// without naming it.
pub trait Hyperparameterized: fmt::Debug + Clone {
    /// Paths of every hyperparameter in positional order
    fn hyperparameter_names(&self) -> Vec<HyperPath>;

    /// Current hyperparameter values on their natural scale, in the order of
    /// [`hyperparameter_names`](Self::hyperparameter_names)
    fn hyperparameter_values(&self) -> Vec<f64>;

    fn n_hyperparameters(&self) -> usize {
        self.hyperparameter_names().len()
    }

    /// New kernel of the same shape from positional natural-scale values
    fn reparameterize(&self, values: &[f64]) -> Result<Self, KernelError>;

    /// Hyperparameters held fixed during optimization
    fn blocked(&self) -> Vec<HyperPath> {
        Vec::new()
    }

    /// All hyperparameters keyed by path
    fn hyperparameters(&self) -> Hyperparameters {
        self.hyperparameter_names()
            .into_iter()
            .zip(self.hyperparameter_values())
            .collect()
    }

    /// The hyperparameters that are not blocked
    fn free_hyperparameters(&self) -> Hyperparameters {
        let blocked = self.blocked();
        self.hyperparameter_names()
            .into_iter()
            .zip(self.hyperparameter_values())
            .filter(|(name, _)| !blocked.contains(name))
            .collect()
    }

    /// New kernel with its hyperparameters taken from `config`.
    ///
    /// Every non-blocked hyperparameter must be present. Blocked ones fall
    /// back to their current value when absent. Paths `config` holds that the
    /// kernel does not know are ignored.
    fn with_hyperparameters(
        &self,
        config: &Hyperparameters,
    ) -> Result<Self, KernelError> {
        let blocked = self.blocked();
        let values = self
            .hyperparameter_names()
            .into_iter()
            .zip(self.hyperparameter_values())
            .map(|(name, current)| match config.get(&name) {
                Some(value) => Ok(value),
                None if blocked.contains(&name) => Ok(current),
                None => Err(KernelError::MissingHyperParameter(name)),
            })
            .collect::<Result<Vec<f64>, KernelError>>()?;
        self.reparameterize(&values)
    }

    /// Hold the hyperparameter at `path` fixed
    fn with_blocked(
        self,
        path: HyperPath,
    ) -> Result<BlockedKernel<Self>, KernelError> {
        if self.hyperparameter_names().contains(&path) {
            Ok(BlockedKernel::new_unchecked(self, vec![path]))
        } else {
            Err(KernelError::UnknownHyperParameter(path))
        }
    }
}

/// Kernel Function
pub trait Kernel<I>: Hyperparameterized {
    /// Covariance between `x` and `y` under the current hyperparameters
    fn evaluate(&self, x: &I, y: &I) -> f64;

    /// Write the derivative of `evaluate(x, y)` with respect to every
    /// hyperparameter into `out`, positionally. `out` has
    /// `n_hyperparameters()` entries.
    fn gradient_into(&self, x: &I, y: &I, out: &mut [f64]);

    /// Reports if the given kernel function is stationary.
    fn is_stationary(&self) -> bool;

    /// Evaluate under an explicit configuration without touching `self`
    fn evaluate_at(
        &self,
        config: &Hyperparameters,
        x: &I,
        y: &I,
    ) -> Result<f64, KernelError> {
        Ok(self.with_hyperparameters(config)?.evaluate(x, y))
    }

    /// Derivative of `evaluate(x, y)` for every non-blocked hyperparameter
    fn gradient(&self, x: &I, y: &I) -> Hyperparameters {
        let mut out = vec![0.0; self.n_hyperparameters()];
        self.gradient_into(x, y, &mut out);
        let blocked = self.blocked();
        self.hyperparameter_names()
            .into_iter()
            .zip(out)
            .filter(|(name, _)| !blocked.contains(name))
            .collect()
    }

    /// [`gradient`](Self::gradient) under an explicit configuration
    fn gradient_at(
        &self,
        config: &Hyperparameters,
        x: &I,
        y: &I,
    ) -> Result<Hyperparameters, KernelError> {
        Ok(self.with_hyperparameters(config)?.gradient(x, y))
    }

    /// Gram matrix of `xs`, partitioned into blocks of `block_size`. Only the
    /// lower tiles are evaluated; the upper ones are mirrored.
    fn covariance(
        &self,
        xs: &[I],
        block_size: usize,
    ) -> Result<PartitionedPsdMatrix, KernelError> {
        let part = Partitioning::uniform(xs.len(), block_size)?;
        Ok(PartitionedPsdMatrix::from_symmetric_fn(&part, |i, j| {
            self.evaluate(&xs[i], &xs[j])
        }))
    }

    /// [`covariance`](Self::covariance) under an explicit configuration
    fn covariance_at(
        &self,
        config: &Hyperparameters,
        xs: &[I],
        block_size: usize,
    ) -> Result<PartitionedPsdMatrix, KernelError> {
        self.with_hyperparameters(config)?.covariance(xs, block_size)
    }

    /// `K(xs, ys)` with rows and columns both cut into blocks of
    /// `block_size`
    fn cross_covariance(
        &self,
        xs: &[I],
        ys: &[I],
        block_size: usize,
    ) -> Result<PartitionedMatrix, KernelError> {
        let rows = Partitioning::uniform(xs.len(), block_size)?;
        let cols = Partitioning::uniform(ys.len(), block_size)?;
        Ok(PartitionedMatrix::from_fn(&rows, &cols, |i, j| {
            self.evaluate(&xs[i], &ys[j])
        }))
    }

    /// One partitioned matrix `∂K/∂h` per non-blocked hyperparameter `h`,
    /// in name order
    fn covariance_gradient(
        &self,
        xs: &[I],
        block_size: usize,
    ) -> Result<Vec<(HyperPath, PartitionedPsdMatrix)>, KernelError> {
        let part = Partitioning::uniform(xs.len(), block_size)?;
        let names = self.hyperparameter_names();
        let blocked = self.blocked();
        let free: Vec<usize> = (0..names.len())
            .filter(|&h| !blocked.contains(&names[h]))
            .collect();

        let k = part.n_blocks();
        let mut lower: Vec<Vec<DMatrix<f64>>> =
            vec![Vec::with_capacity(k * (k + 1) / 2); free.len()];
        let mut buf = vec![0.0; names.len()];

        for r in 0..k {
            for c in 0..=r {
                let (r0, c0) = (part.offset(r), part.offset(c));
                let mut tiles: Vec<DMatrix<f64>> = free
                    .iter()
                    .map(|_| DMatrix::zeros(part.size(r), part.size(c)))
                    .collect();
                for (i, j) in iproduct!(0..part.size(r), 0..part.size(c)) {
                    if r == c && j > i {
                        continue;
                    }
                    self.gradient_into(&xs[r0 + i], &xs[c0 + j], &mut buf);
                    for (tile, &h) in tiles.iter_mut().zip(free.iter()) {
                        tile[(i, j)] = buf[h];
                    }
                }
                for (acc, tile) in lower.iter_mut().zip(tiles) {
                    acc.push(tile);
                }
            }
        }

        Ok(free
            .into_iter()
            .zip(lower)
            .map(|(h, tiles)| {
                (
                    names[h].clone(),
                    PartitionedPsdMatrix::from_lower_unchecked(&part, tiles),
                )
            })
            .collect())
    }

    /// Returns the diagonal of the kernel(x, x)
    ///
    /// A stationary kernel has the same value at every point, so it is
    /// evaluated once.
    fn diag(&self, xs: &[I]) -> DVector<f64> {
        match xs.first() {
            Some(x) if self.is_stationary() => {
                DVector::from_element(xs.len(), self.evaluate(x, x))
            }
            _ => DVector::from_iterator(
                xs.len(),
                xs.iter().map(|x| self.evaluate(x, x)),
            ),
        }
    }

    fn add<B: Kernel<I>>(self, other: B) -> AddKernel<Self, B> {
        AddKernel::new(self, other)
    }

    fn mul<B: Kernel<I>>(self, other: B) -> ProductKernel<Self, B> {
        ProductKernel::new(self, other)
    }
}

/// Errors from Kernel construction and evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum KernelError {
    /// Parameter Out of Bounds
    ParameterOutOfBounds {
        /// Name of parameter
        name: String,
        /// Value given
        given: f64,
        /// Lower and upper bounds on value
        bounds: (f64, f64),
    },
    /// A configuration lacks a hyperparameter the kernel needs
    MissingHyperParameter(HyperPath),
    /// The kernel has no hyperparameter at this path
    UnknownHyperParameter(HyperPath),
    /// Positional values of the wrong length
    WrongParameterCount {
        /// Number the kernel takes
        expected: usize,
        /// Number given
        given: usize,
    },
    /// Building a partitioned matrix failed
    Partition(PartitionError),
}

impl std::error::Error for KernelError {}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParameterOutOfBounds {
                name,
                given,
                bounds,
            } => write!(
                f,
                "Parameter {} is out of bounds ({}, {}), given: {}",
                name, bounds.0, bounds.1, given
            ),
            Self::MissingHyperParameter(path) => {
                write!(f, "Missing hyperparameter {path}")
            }
            Self::UnknownHyperParameter(path) => {
                write!(f, "Unknown hyperparameter {path}")
            }
            Self::WrongParameterCount { expected, given } => write!(
                f,
                "Expected {expected} parameters, {given} were given"
            ),
            Self::Partition(e) => write!(f, "{e}"),
        }
    }
}

impl From<PartitionError> for KernelError {
    fn from(e: PartitionError) -> Self {
        Self::Partition(e)
    }
}

/// Split positional values for a kernel expecting exactly `N`
pub(crate) fn exact_params<const N: usize>(
    values: &[f64],
) -> Result<[f64; N], KernelError> {
    values
        .try_into()
        .map_err(|_| KernelError::WrongParameterCount {
            expected: N,
            given: values.len(),
        })
}

pub(crate) fn out_of_bounds(
    name: &str,
    given: f64,
    bounds: (f64, f64),
) -> KernelError {
    KernelError::ParameterOutOfBounds {
        name: name.to_string(),
        given,
        bounds,
    }
}

macro_rules! impl_mul_add {
    ($type: ty) => {
        impl<B> std::ops::Mul<B> for $type {
            type Output = ProductKernel<$type, B>;

            fn mul(self, rhs: B) -> Self::Output {
                ProductKernel::new(self, rhs)
            }
        }

        impl<B> std::ops::Add<B> for $type {
            type Output = AddKernel<$type, B>;

            fn add(self, rhs: B) -> Self::Output {
                AddKernel::new(self, rhs)
            }
        }
    };
}

impl_mul_add!(ConstantKernel);
impl_mul_add!(RBFKernel);
impl_mul_add!(ExpSineSquaredKernel);
impl_mul_add!(RationalQuadratic);
impl_mul_add!(WhiteKernel);
impl_mul_add!(LinearKernel);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_hyperparameters_requires_free_names() {
        let kernel = ConstantKernel::new(2.0).unwrap() * RBFKernel::new(1.0).unwrap();
        let config = Hyperparameters::new()
            .with(HyperPath::new(["lhs", "constant", "value"]), 3.0);
        assert_eq!(
            kernel.with_hyperparameters(&config).unwrap_err(),
            KernelError::MissingHyperParameter(HyperPath::new([
                "rhs",
                "rbf",
                "length_scale"
            ]))
        );

        let blocked = kernel
            .with_blocked(HyperPath::new(["rhs", "rbf", "length_scale"]))
            .unwrap();
        let updated = blocked.with_hyperparameters(&config).unwrap();
        assert_eq!(updated.hyperparameter_values(), vec![3.0, 1.0]);
        assert_eq!(
            updated.free_hyperparameters(),
            Hyperparameters::new()
                .with(HyperPath::new(["lhs", "constant", "value"]), 3.0)
        );
    }

    #[test]
    fn with_blocked_rejects_unknown_path() {
        let kernel = RBFKernel::default();
        let err = kernel
            .with_blocked(HyperPath::leaf("rbf", "periodicity"))
            .unwrap_err();
        assert!(matches!(err, KernelError::UnknownHyperParameter(_)));
    }

    #[test]
    fn covariance_is_symmetric_and_blocked() {
        let kernel = RBFKernel::new(1.5).unwrap();
        let xs: Vec<f64> = (0..7).map(f64::from).collect();
        let cov = kernel.covariance(&xs, 3).unwrap();
        assert_eq!(cov.partitioning().sizes(), &[3, 3, 1]);
        let dense = cov.to_dense();
        assert_eq!(dense, dense.transpose());
        for i in 0..7 {
            for j in 0..7 {
                assert_eq!(dense[(i, j)], kernel.evaluate(&xs[i], &xs[j]));
            }
        }
    }

    #[test]
    fn diag_matches_evaluate() {
        let xs = vec![0.0, 3.0, -2.5];
        let stationary = RBFKernel::new(1.5).unwrap() + WhiteKernel::new(0.5).unwrap();
        assert!(Kernel::<f64>::is_stationary(&stationary));
        let diag = stationary.diag(&xs);
        assert_eq!(diag, DVector::from_element(3, 1.5));
        for (d, x) in diag.iter().zip(xs.iter()) {
            assert_eq!(*d, stationary.evaluate(x, x));
        }
        assert_eq!(stationary.diag(&Vec::<f64>::new()).len(), 0);

        let trend = RBFKernel::new(1.5).unwrap() + LinearKernel::new(1.0).unwrap();
        assert!(!Kernel::<f64>::is_stationary(&trend));
        assert_eq!(
            trend.diag(&xs),
            DVector::from_column_slice(&[2.0, 11.0, 8.25])
        );
    }

    #[test]
    fn covariance_gradient_skips_blocked() {
        let kernel = (ConstantKernel::new(2.0).unwrap()
            * RBFKernel::new(1.0).unwrap())
        .with_blocked(HyperPath::new(["lhs", "constant", "value"]))
        .unwrap();
        let xs = vec![0.0, 0.5, 2.0];
        let grads = kernel.covariance_gradient(&xs, 2).unwrap();
        assert_eq!(grads.len(), 1);
        let (path, dk) = &grads[0];
        assert_eq!(path, &HyperPath::new(["rhs", "rbf", "length_scale"]));
        let expected = kernel.gradient(&xs[2], &xs[0]);
        assert::close(dk.get(2, 0).unwrap(), expected.get(path).unwrap(), 1e-14);
        assert::close(dk.get(0, 2).unwrap(), expected.get(path).unwrap(), 1e-14);
    }
}

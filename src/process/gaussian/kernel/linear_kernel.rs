use super::{
    exact_params, out_of_bounds, Euclidean, HyperPath, Hyperparameterized,
    Kernel, KernelError,
};
use std::f64;

#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

/// Linear (dot product) kernel
///
/// ```math
///     K(\mathbf{x}, \mathbf{x'}) = \sigma_0 + \mathbf{x} \cdot \mathbf{x'}
/// ```
///
/// # Parameters
/// * `offset` - Inhomogeneity, `σ₀ ≥ 0`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct LinearKernel {
    offset: f64,
}

impl LinearKernel {
    pub fn new(offset: f64) -> Result<Self, KernelError> {
        if offset >= 0.0 && offset.is_finite() {
            Ok(Self { offset })
        } else {
            Err(out_of_bounds("offset", offset, (0.0, f64::INFINITY)))
        }
    }

    /// Create a new `LinearKernel` without checking parameters
    #[must_use]
    pub fn new_unchecked(offset: f64) -> Self {
        Self { offset }
    }

    #[inline]
    #[must_use]
    pub fn offset(&self) -> f64 {
        self.offset
    }
}

impl Default for LinearKernel {
    fn default() -> Self {
        Self { offset: 0.0 }
    }
}

impl Hyperparameterized for LinearKernel {
    fn hyperparameter_names(&self) -> Vec<HyperPath> {
        vec![HyperPath::leaf("linear", "offset")]
    }

    fn hyperparameter_values(&self) -> Vec<f64> {
        vec![self.offset]
    }

    fn n_hyperparameters(&self) -> usize {
        1
    }

    fn reparameterize(&self, values: &[f64]) -> Result<Self, KernelError> {
        let [offset] = exact_params(values)?;
        Self::new(offset)
    }
}

impl<I: Euclidean> Kernel<I> for LinearKernel {
    fn evaluate(&self, x: &I, y: &I) -> f64 {
        self.offset + x.inner(y)
    }

    fn gradient_into(&self, _x: &I, _y: &I, out: &mut [f64]) {
        out[0] = 1.0;
    }

    fn is_stationary(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    #[test]
    fn linear_kernel() -> Result<(), KernelError> {
        let kernel = LinearKernel::new(1.0)?;
        let xs = vec![0.0, 1.0, 2.0];
        let cov = kernel.covariance(&xs, 2)?.to_dense();
        let expected = DMatrix::from_row_slice(
            3,
            3,
            &[1.0, 1.0, 1.0, 1.0, 2.0, 3.0, 1.0, 3.0, 5.0],
        );
        assert!(cov.relative_eq(&expected, 1E-12, 1E-12));
        assert!(!<LinearKernel as Kernel<f64>>::is_stationary(&kernel));

        let (x, y): ([f64; 2], [f64; 2]) = ([1.0, 2.0], [3.0, 4.0]);
        let grad = kernel.gradient(&x, &y);
        assert_eq!(grad.get(&HyperPath::leaf("linear", "offset")), Some(1.0));
        assert::close(kernel.evaluate(&x, &y), 12.0, 1E-12);
        Ok(())
    }

    #[test]
    fn negative_offset_is_rejected() {
        assert!(LinearKernel::new(-0.5).is_err());
        assert!(LinearKernel::new(0.0).is_ok());
    }
}

use super::{
    exact_params, out_of_bounds, HyperPath, Hyperparameterized, Kernel,
    KernelError,
};
use std::f64;

#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

/// White Noise Kernel
///
/// Takes the value `noise_level` when both inputs are equal and zero
/// otherwise. Used as the noise model of a Gaussian process.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct WhiteKernel {
    /// Level of the noise
    noise_level: f64,
}

impl WhiteKernel {
    /// Create a new WhiteKernel with the given level of noise. A level of
    /// zero is allowed and makes the kernel vanish.
    pub fn new(noise_level: f64) -> Result<Self, KernelError> {
        if noise_level >= 0.0 && noise_level.is_finite() {
            Ok(Self { noise_level })
        } else {
            Err(out_of_bounds(
                "noise_level",
                noise_level,
                (0.0, f64::INFINITY),
            ))
        }
    }

    /// Create a new WhiteKernel without checking the parameters
    #[must_use]
    pub fn new_unchecked(noise_level: f64) -> Self {
        Self { noise_level }
    }

    #[inline]
    #[must_use]
    pub fn noise_level(&self) -> f64 {
        self.noise_level
    }
}

impl Default for WhiteKernel {
    fn default() -> Self {
        Self { noise_level: 1.0 }
    }
}

impl Hyperparameterized for WhiteKernel {
    fn hyperparameter_names(&self) -> Vec<HyperPath> {
        vec![HyperPath::leaf("white", "noise_level")]
    }

    fn hyperparameter_values(&self) -> Vec<f64> {
        vec![self.noise_level]
    }

    fn n_hyperparameters(&self) -> usize {
        1
    }

    fn reparameterize(&self, values: &[f64]) -> Result<Self, KernelError> {
        let [noise_level] = exact_params(values)?;
        Self::new(noise_level)
    }
}

impl<I: PartialEq> Kernel<I> for WhiteKernel {
    fn evaluate(&self, x: &I, y: &I) -> f64 {
        if x == y {
            self.noise_level
        } else {
            0.0
        }
    }

    fn gradient_into(&self, x: &I, y: &I, out: &mut [f64]) {
        out[0] = if x == y { 1.0 } else { 0.0 };
    }

    fn is_stationary(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{DMatrix, DVector};

    #[test]
    fn white_kernel() -> Result<(), KernelError> {
        let kernel = WhiteKernel::new(2.0)?;
        let xs = vec![[1.0, 2.0], [3.0, 4.0], [1.0, 2.0]];

        let cov = kernel.covariance(&xs, 2)?.to_dense();
        let expected = DMatrix::from_row_slice(
            3,
            3,
            &[2.0, 0.0, 2.0, 0.0, 2.0, 0.0, 2.0, 0.0, 2.0],
        );
        assert!(cov.relative_eq(&expected, 1E-12, 1E-12));
        assert_eq!(kernel.diag(&xs), DVector::from_element(3, 2.0));

        let path = HyperPath::leaf("white", "noise_level");
        assert_eq!(kernel.gradient(&xs[0], &xs[1]).get(&path), Some(0.0));
        assert_eq!(kernel.gradient(&xs[0], &xs[2]).get(&path), Some(1.0));
        Ok(())
    }

    #[test]
    fn zero_noise_is_allowed() {
        assert!(WhiteKernel::new(0.0).is_ok());
        assert!(matches!(
            WhiteKernel::new(-1E-3),
            Err(KernelError::ParameterOutOfBounds { .. })
        ));
    }
}

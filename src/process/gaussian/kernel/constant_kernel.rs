use super::{
    exact_params, out_of_bounds, HyperPath, Hyperparameterized, Kernel,
    KernelError,
};
use std::f64;

#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

/// Kernel taking the same value for every pair of inputs
///
/// Mostly useful as the amplitude in a product, e.g.
/// `ConstantKernel::new(2.0)? * RBFKernel::new(1.0)?`.
///
/// # Parameters
/// * `value` - the covariance, strictly positive.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct ConstantKernel {
    value: f64,
}

impl ConstantKernel {
    pub fn new(value: f64) -> Result<Self, KernelError> {
        if value > 0.0 && value.is_finite() {
            Ok(Self { value })
        } else {
            Err(out_of_bounds("value", value, (0.0, f64::INFINITY)))
        }
    }

    /// Create a new `ConstantKernel` without checking parameters
    #[must_use]
    pub fn new_unchecked(value: f64) -> Self {
        Self { value }
    }

    #[inline]
    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
    }
}

impl Default for ConstantKernel {
    fn default() -> Self {
        Self { value: 1.0 }
    }
}

impl std::convert::TryFrom<f64> for ConstantKernel {
    type Error = KernelError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl Hyperparameterized for ConstantKernel {
    fn hyperparameter_names(&self) -> Vec<HyperPath> {
        vec![HyperPath::leaf("constant", "value")]
    }

    fn hyperparameter_values(&self) -> Vec<f64> {
        vec![self.value]
    }

    fn n_hyperparameters(&self) -> usize {
        1
    }

    fn reparameterize(&self, values: &[f64]) -> Result<Self, KernelError> {
        let [value] = exact_params(values)?;
        Self::new(value)
    }
}

impl<I> Kernel<I> for ConstantKernel {
    fn evaluate(&self, _x: &I, _y: &I) -> f64 {
        self.value
    }

    fn gradient_into(&self, _x: &I, _y: &I, out: &mut [f64]) {
        out[0] = 1.0;
    }

    fn is_stationary(&self) -> bool {
        true
    }
}

use super::{
    exact_params, out_of_bounds, Euclidean, HyperPath, Hyperparameterized,
    Kernel, KernelError,
};
use std::f64;
use std::f64::consts::PI;

#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

/// Exp Sine^2 Kernel
/// k(x_i, x_j) = exp(-2 (sin(pi / periodicity * d(x_i, x_j)) / length_scale) ^ 2)
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct ExpSineSquaredKernel {
    length_scale: f64,
    periodicity: f64,
}

impl ExpSineSquaredKernel {
    /// Create a new ExpSineSquaredKernel
    pub fn new(length_scale: f64, periodicity: f64) -> Result<Self, KernelError> {
        if !(length_scale > 0.0 && length_scale.is_finite()) {
            Err(out_of_bounds(
                "length_scale",
                length_scale,
                (0.0, f64::INFINITY),
            ))
        } else if !(periodicity > 0.0 && periodicity.is_finite()) {
            Err(out_of_bounds(
                "periodicity",
                periodicity,
                (0.0, f64::INFINITY),
            ))
        } else {
            Ok(Self {
                length_scale,
                periodicity,
            })
        }
    }

    #[must_use]
    pub fn new_unchecked(length_scale: f64, periodicity: f64) -> Self {
        Self {
            length_scale,
            periodicity,
        }
    }

    #[inline]
    #[must_use]
    pub fn length_scale(&self) -> f64 {
        self.length_scale
    }

    #[inline]
    #[must_use]
    pub fn periodicity(&self) -> f64 {
        self.periodicity
    }
}

impl Default for ExpSineSquaredKernel {
    fn default() -> Self {
        Self {
            length_scale: 1.0,
            periodicity: 1.0,
        }
    }
}

impl Hyperparameterized for ExpSineSquaredKernel {
    fn hyperparameter_names(&self) -> Vec<HyperPath> {
        vec![
            HyperPath::leaf("exp_sine_squared", "length_scale"),
            HyperPath::leaf("exp_sine_squared", "periodicity"),
        ]
    }

    fn hyperparameter_values(&self) -> Vec<f64> {
        vec![self.length_scale, self.periodicity]
    }

    fn n_hyperparameters(&self) -> usize {
        2
    }

    fn reparameterize(&self, values: &[f64]) -> Result<Self, KernelError> {
        let [length_scale, periodicity] = exact_params(values)?;
        Self::new(length_scale, periodicity)
    }
}

impl<I: Euclidean> Kernel<I> for ExpSineSquaredKernel {
    fn evaluate(&self, x: &I, y: &I) -> f64 {
        let d = x.sq_distance(y).sqrt();
        let s = (PI * d / self.periodicity).sin();
        let l2 = self.length_scale * self.length_scale;
        (-2.0 * s * s / l2).exp()
    }

    fn gradient_into(&self, x: &I, y: &I, out: &mut [f64]) {
        let l = self.length_scale;
        let p = self.periodicity;
        let d = x.sq_distance(y).sqrt();
        let arg = PI * d / p;
        let (s, c) = arg.sin_cos();
        let k = (-2.0 * s * s / (l * l)).exp();

        out[0] = 4.0 * s * s / (l * l * l) * k;
        out[1] = 4.0 * s * c * PI * d / (l * l * p * p) * k;
    }

    fn is_stationary(&self) -> bool {
        true
    }
}

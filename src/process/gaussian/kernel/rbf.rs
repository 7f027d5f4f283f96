use super::{
    exact_params, out_of_bounds, Euclidean, HyperPath, Hyperparameterized,
    Kernel, KernelError,
};
use std::f64;

#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

/// Radial-basis function (RBF) kernel
/// The distance metric here is L2 (Euclidean).
///
/// ```math
///     K(\mathbf{x}, \mathbf{x'}) = \exp\left(-\frac{\|\mathbf{x} - \mathbf{x'}\|^2}{2\ell^2}\right)
/// ```
///
/// # Parameters
/// * `l` - Length scale.
///
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct RBFKernel {
    length_scale: f64,
}

impl RBFKernel {
    /// Create a new rbf kernel with the given length scale
    pub fn new(length_scale: f64) -> Result<Self, KernelError> {
        if length_scale > 0.0 && length_scale.is_finite() {
            Ok(Self { length_scale })
        } else {
            Err(out_of_bounds(
                "length_scale",
                length_scale,
                (0.0, f64::INFINITY),
            ))
        }
    }

    /// Create a new `RBFKernel` without checking parameters
    #[must_use]
    pub fn new_unchecked(length_scale: f64) -> Self {
        Self { length_scale }
    }

    #[inline]
    #[must_use]
    pub fn length_scale(&self) -> f64 {
        self.length_scale
    }
}

impl Default for RBFKernel {
    fn default() -> Self {
        Self { length_scale: 1.0 }
    }
}

impl Hyperparameterized for RBFKernel {
    fn hyperparameter_names(&self) -> Vec<HyperPath> {
        vec![HyperPath::leaf("rbf", "length_scale")]
    }

    fn hyperparameter_values(&self) -> Vec<f64> {
        vec![self.length_scale]
    }

    fn n_hyperparameters(&self) -> usize {
        1
    }

    fn reparameterize(&self, values: &[f64]) -> Result<Self, KernelError> {
        let [length_scale] = exact_params(values)?;
        Self::new(length_scale)
    }
}

impl<I: Euclidean> Kernel<I> for RBFKernel {
    fn evaluate(&self, x: &I, y: &I) -> f64 {
        let l2 = self.length_scale * self.length_scale;
        (-0.5 * x.sq_distance(y) / l2).exp()
    }

    fn gradient_into(&self, x: &I, y: &I, out: &mut [f64]) {
        let l = self.length_scale;
        let d2 = x.sq_distance(y);
        let k = (-0.5 * d2 / (l * l)).exp();
        out[0] = k * d2 / (l * l * l);
    }

    fn is_stationary(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{DMatrix, DVector};

    const E: f64 = std::f64::consts::E;

    #[test]
    fn rbf_gradient() -> Result<(), KernelError> {
        let path = HyperPath::leaf("rbf", "length_scale");
        let x = [1.0, 2.0];
        let y = [3.0, 4.0];

        let r = RBFKernel::default();
        assert::close(r.evaluate(&x, &y), 1.0 / E.powi(4), 1E-12);
        assert::close(r.gradient(&x, &y).get(&path).unwrap(), 8.0 / E.powi(4), 1E-12);
        assert_eq!(r.gradient(&x, &x).get(&path), Some(0.0));

        let r = RBFKernel::new(4.0)?;
        assert::close(r.evaluate(&x, &y), (-0.25_f64).exp(), 1E-12);
        // d2 / l^3 = 8 / 64
        assert::close(
            r.gradient(&x, &y).get(&path).unwrap(),
            0.125 * (-0.25_f64).exp(),
            1E-12,
        );
        Ok(())
    }

    #[test]
    fn rbf_simple() {
        let kernel = RBFKernel::default();
        assert_eq!(kernel.hyperparameter_values(), vec![1.0]);
        assert_eq!(
            kernel,
            kernel
                .reparameterize(&[1.0])
                .expect("Should create kernel from params")
        );
        assert!(<RBFKernel as Kernel<f64>>::is_stationary(&kernel));
        assert!(RBFKernel::new(0.0).is_err());
    }

    #[test]
    fn rbf_1d() -> Result<(), KernelError> {
        let xs = vec![0.0, 1.0, 2.0, 3.0];
        let kernel = RBFKernel::default();

        let cov = kernel.covariance(&xs, 3)?.to_dense();
        let expected_cov = DMatrix::from_column_slice(
            4,
            4,
            &[
                1.,
                0.606_530_66,
                0.135_335_28,
                0.011_109,
                0.606_530_66,
                1.,
                0.606_530_66,
                0.135_335_28,
                0.135_335_28,
                0.606_530_66,
                1.,
                0.606_530_66,
                0.011_109,
                0.135_335_28,
                0.606_530_66,
                1.,
            ],
        );

        assert!(expected_cov.relative_eq(&cov, 1E-6, 1E-6));
        let expected_diag = DVector::from_column_slice(&[1., 1., 1., 1.]);
        assert_eq!(kernel.diag(&xs), expected_diag);
        Ok(())
    }

    #[test]
    fn rbf_different_sizes() -> Result<(), KernelError> {
        let kernel = RBFKernel::default();

        let x1 = vec![-4., -3., -2., -1., 1.];
        let x2 = vec![-5., -4., -3., -2., -1., 0., 1., 2., 3., 4.];

        let cov = kernel.cross_covariance(&x1, &x2, 4)?;
        assert_eq!(cov.shape(), (5, 10));
        assert_eq!(cov.rows().sizes(), &[4, 1]);
        assert_eq!(cov.cols().sizes(), &[4, 4, 2]);

        let cov = cov.to_dense();
        let expected_row = [
            6.065_306_60e-01,
            1.000_000_00e+00,
            6.065_306_60e-01,
            1.353_352_83e-01,
            1.110_899_65e-02,
            3.354_626_28e-04,
            3.726_653_17e-06,
            1.522_997_97e-08,
            2.289_734_85e-11,
            1.266_416_55e-14,
        ];
        for (j, expected) in expected_row.iter().enumerate() {
            assert::close(cov[(0, j)], *expected, 1E-8);
        }
        Ok(())
    }
}

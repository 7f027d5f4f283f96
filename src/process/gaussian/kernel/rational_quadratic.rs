use super::{
    exact_params, out_of_bounds, Euclidean, HyperPath, Hyperparameterized,
    Kernel, KernelError,
};
use std::f64;

#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

/// Rational Quadratic Kernel
///
/// ```math
///     K(\mathbf{x}, \mathbf{x'}) = \left(1 + \frac{\|\mathbf{x} - \mathbf{x'}\|^2}{2\alpha\ell^2}\right)^{-\alpha}
/// ```
///
/// # Parameters
/// `scale` -- Length scale
/// `mixture` -- Mixture Scale
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct RationalQuadratic {
    scale: f64,
    mixture: f64,
}

impl RationalQuadratic {
    /// Create a new RationalQuadratic kernel
    pub fn new(scale: f64, mixture: f64) -> Result<Self, KernelError> {
        if !(scale > 0.0 && scale.is_finite()) {
            Err(out_of_bounds("scale", scale, (0.0, f64::INFINITY)))
        } else if !(mixture > 0.0 && mixture.is_finite()) {
            Err(out_of_bounds("mixture", mixture, (0.0, f64::INFINITY)))
        } else {
            Ok(Self { scale, mixture })
        }
    }

    /// Create a new RationalQuadratic without checking values
    #[must_use]
    pub fn new_unchecked(scale: f64, mixture: f64) -> Self {
        Self { scale, mixture }
    }

    #[inline]
    #[must_use]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    #[inline]
    #[must_use]
    pub fn mixture(&self) -> f64 {
        self.mixture
    }

    // 1 + d² / (2αl²)
    #[inline]
    fn base(&self, d2: f64) -> f64 {
        1.0 + d2 / (2.0 * self.mixture * self.scale * self.scale)
    }
}

impl Default for RationalQuadratic {
    fn default() -> Self {
        Self {
            scale: 1.0,
            mixture: 1.0,
        }
    }
}

impl Hyperparameterized for RationalQuadratic {
    fn hyperparameter_names(&self) -> Vec<HyperPath> {
        vec![
            HyperPath::leaf("rational_quadratic", "scale"),
            HyperPath::leaf("rational_quadratic", "mixture"),
        ]
    }

    fn hyperparameter_values(&self) -> Vec<f64> {
        vec![self.scale, self.mixture]
    }

    fn n_hyperparameters(&self) -> usize {
        2
    }

    fn reparameterize(&self, values: &[f64]) -> Result<Self, KernelError> {
        let [scale, mixture] = exact_params(values)?;
        Self::new(scale, mixture)
    }
}

impl<I: Euclidean> Kernel<I> for RationalQuadratic {
    fn evaluate(&self, x: &I, y: &I) -> f64 {
        self.base(x.sq_distance(y)).powf(-self.mixture)
    }

    fn gradient_into(&self, x: &I, y: &I, out: &mut [f64]) {
        let l = self.scale;
        let a = self.mixture;
        let d2 = x.sq_distance(y);
        let base = self.base(d2);
        let k = base.powf(-a);

        out[0] = k * d2 / (l * l * l * base);
        out[1] = k * (d2 / (2.0 * a * l * l * base) - base.ln());
    }

    fn is_stationary(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    #[test]
    fn rational_quadratic() -> Result<(), KernelError> {
        let kernel = RationalQuadratic::new(3.0, 5.0)?;
        assert!(<RationalQuadratic as Kernel<f64>>::is_stationary(&kernel));

        let xs = vec![[1.0, 2.0], [3.0, 4.0]];
        let cov = kernel.covariance(&xs, 1)?.to_dense();

        // d² = 8, base = 1 + 8 / 90
        let off = (1.0_f64 + 8.0 / 90.0).powf(-5.0);
        let expected = DMatrix::from_row_slice(2, 2, &[1.0, off, off, 1.0]);
        assert!(cov.relative_eq(&expected, 1E-12, 1E-12));
        Ok(())
    }

    #[test]
    fn gradient_matches_finite_differences() -> Result<(), KernelError> {
        let kernel = RationalQuadratic::new(1.3, 0.7)?;
        let (x, y) = (0.2_f64, 1.9_f64);
        let analytic = kernel.gradient(&x, &y);
        let h = 1E-6;

        for (ix, path) in kernel.hyperparameter_names().iter().enumerate() {
            let mut up = kernel.hyperparameter_values();
            let mut down = up.clone();
            up[ix] += h;
            down[ix] -= h;
            let fd = (kernel.reparameterize(&up)?.evaluate(&x, &y)
                - kernel.reparameterize(&down)?.evaluate(&x, &y))
                / (2.0 * h);
            assert::close(analytic.get(path).unwrap(), fd, 1E-7);
        }
        Ok(())
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(RationalQuadratic::new(0.0, 1.0).is_err());
        assert!(RationalQuadratic::new(1.0, -1.0).is_err());
        assert!(RationalQuadratic::default().reparameterize(&[1.0]).is_err());
    }
}

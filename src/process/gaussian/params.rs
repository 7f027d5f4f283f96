#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use super::GpError;

/// Settings for maximizing the log marginal likelihood
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct OptimizeParams {
    /// Maximum number of BFGS iterations per start
    pub max_iter: usize,
    /// Stop once the gradient norm falls below this
    pub accuracy: f64,
    /// Number of random restarts after the first run
    pub n_restarts: usize,
    /// Standard deviation of the restart perturbation, in log space
    pub restart_scale: f64,
}

impl Default for OptimizeParams {
    fn default() -> Self {
        Self {
            max_iter: 200,
            accuracy: 1E-6,
            n_restarts: 0,
            restart_scale: 1.0,
        }
    }
}

impl OptimizeParams {
    #[must_use]
    pub fn with_max_iter(self, max_iter: usize) -> Self {
        Self { max_iter, ..self }
    }

    #[must_use]
    pub fn with_accuracy(self, accuracy: f64) -> Self {
        Self { accuracy, ..self }
    }

    #[must_use]
    pub fn with_n_restarts(self, n_restarts: usize) -> Self {
        Self { n_restarts, ..self }
    }

    #[must_use]
    pub fn with_restart_scale(self, restart_scale: f64) -> Self {
        Self {
            restart_scale,
            ..self
        }
    }

    fn validate(&self) -> Result<(), GpError> {
        if !(self.accuracy > 0.0) {
            Err(GpError::InvalidParameters(format!(
                "optimizer accuracy must be positive, given {}",
                self.accuracy
            )))
        } else if !(self.restart_scale > 0.0 && self.restart_scale.is_finite())
        {
            Err(GpError::InvalidParameters(format!(
                "restart scale must be positive and finite, given {}",
                self.restart_scale
            )))
        } else {
            Ok(())
        }
    }
}

/// Parameters for running GaussianProcess
///
/// # Example
///
/// ```
/// # use partgp::process::gaussian::{GaussianProcessParams, OptimizeParams};
/// let params = GaussianProcessParams::default()
///     .with_block_size(64)
///     .with_jitter(1E-8)
///     .with_optimize_params(OptimizeParams::default().with_n_restarts(4));
///
/// assert_eq!(params.block_size, 64);
/// assert_eq!(params.optimize.n_restarts, 4);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde1", serde(rename_all = "snake_case"))]
pub struct GaussianProcessParams {
    /// Size of the blocks the training and test sets are cut into
    pub block_size: usize,
    /// Added to the diagonal of the Gram matrix
    pub jitter: f64,
    /// Optimization parameters
    pub optimize: OptimizeParams,
}

impl Default for GaussianProcessParams {
    fn default() -> Self {
        Self {
            block_size: 256,
            jitter: 1E-10,
            optimize: OptimizeParams::default(),
        }
    }
}

impl GaussianProcessParams {
    #[must_use]
    pub fn with_block_size(self, block_size: usize) -> Self {
        Self { block_size, ..self }
    }

    #[must_use]
    pub fn with_jitter(self, jitter: f64) -> Self {
        Self { jitter, ..self }
    }

    #[must_use]
    pub fn with_optimize_params(self, optimize: OptimizeParams) -> Self {
        Self { optimize, ..self }
    }

    pub(crate) fn validate(&self) -> Result<(), GpError> {
        if self.block_size == 0 {
            return Err(GpError::InvalidParameters(
                "block size must be positive".to_string(),
            ));
        }
        if !(self.jitter >= 0.0 && self.jitter.is_finite()) {
            return Err(GpError::InvalidParameters(format!(
                "jitter must be non-negative and finite, given {}",
                self.jitter
            )));
        }
        self.optimize.validate()
    }
}

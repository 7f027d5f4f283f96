//! Gaussian Processes
//!
//! Regression with a Gaussian process prior. The Gram matrix of the training
//! inputs is built and factored block by block, so every linear algebra step
//! works on tiles of at most `block_size × block_size`.
//!
//! # Example
//!
//! ```
//! use partgp::process::gaussian::kernel::{RBFKernel, WhiteKernel};
//! use partgp::process::gaussian::{GaussianProcess, GaussianProcessParams, GpState};
//!
//! let xs: Vec<f64> = (0..10).map(f64::from).collect();
//! let ys: Vec<f64> = xs.iter().map(|x| x.sin()).collect();
//!
//! let mut gp = GaussianProcess::new(
//!     RBFKernel::new(1.5).unwrap(),
//!     WhiteKernel::new(0.01).unwrap(),
//!     xs,
//!     ys,
//!     GaussianProcessParams::default().with_block_size(3),
//! )
//! .unwrap();
//!
//! assert_eq!(gp.state(), GpState::Uninitialized);
//! let ln_m = gp.ln_m().unwrap();
//! assert_eq!(gp.state(), GpState::Trained);
//! assert!(ln_m.is_finite());
//!
//! let pred = gp.predict(&[2.5, 4.5]).unwrap();
//! assert!((pred.mean[0] - 2.5_f64.sin()).abs() < 0.1);
//! ```
use log::{debug, trace};
use nalgebra::DVector;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::consts::HALF_LN_2PI;
use crate::dist::BlockedMvGaussian;
use crate::partition::{
    LowerTriPartitionedMatrix, PartitionError, PartitionedMatrix,
    PartitionedPsdMatrix, PartitionedVector, Partitioning,
};
use crate::process::RandomProcess;

pub mod kernel;
mod optimize;
mod params;

use kernel::{Hyperparameterized, Hyperparameters, Kernel, KernelError};
pub use params::{GaussianProcessParams, OptimizeParams};

const COVARIANCE: &str = "covariance";
const NOISE: &str = "noise";

/// Prior mean function `m(x)`
pub type PriorMean<I> = Arc<dyn Fn(&I) -> f64 + Send + Sync>;

/// Where a [`GaussianProcess`] stands relative to its cached fit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpState {
    /// Never fitted
    Uninitialized,
    /// The cached fit matches the current hyperparameters
    Trained,
    /// Mutated since the last fit
    Stale,
}

/// Errors from Gaussian process construction and fitting
#[derive(Debug, Clone, PartialEq)]
pub enum GpError {
    /// The Gram matrix is not positive definite; `block` is the first
    /// diagonal block whose residual failed
    NotPositiveDefinite { block: usize },
    /// Different numbers of inputs and outputs
    TrainingSizeMismatch { n_inputs: usize, n_outputs: usize },
    /// No training data
    EmptyTrainingSet,
    /// Invalid model parameters
    InvalidParameters(String),
    /// Error from a kernel
    Kernel(KernelError),
    /// Error from the partitioned algebra
    Partition(PartitionError),
}

impl GpError {
    /// Whether an optimizer should score the configuration that produced
    /// this error as zero likelihood and move on
    #[must_use]
    pub fn is_rejected_configuration(&self) -> bool {
        matches!(
            self,
            Self::NotPositiveDefinite { .. }
                | Self::Kernel(KernelError::ParameterOutOfBounds { .. })
        )
    }
}

impl std::error::Error for GpError {}

impl fmt::Display for GpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPositiveDefinite { block } => write!(
                f,
                "The kernel is not returning a positive-definite matrix \
                 (block {block}). Try adding a small, constant noise."
            ),
            Self::TrainingSizeMismatch {
                n_inputs,
                n_outputs,
            } => write!(
                f,
                "{n_inputs} training inputs were given with {n_outputs} outputs"
            ),
            Self::EmptyTrainingSet => write!(f, "The training set is empty"),
            Self::InvalidParameters(msg) => {
                write!(f, "Invalid parameters: {msg}")
            }
            Self::Kernel(e) => write!(f, "Kernel error: {e}"),
            Self::Partition(e) => write!(f, "{e}"),
        }
    }
}

impl From<PartitionError> for GpError {
    fn from(e: PartitionError) -> Self {
        match e {
            PartitionError::NotPositiveDefinite { block } => {
                Self::NotPositiveDefinite { block }
            }
            e => Self::Partition(e),
        }
    }
}

impl From<KernelError> for GpError {
    fn from(e: KernelError) -> Self {
        match e {
            KernelError::Partition(e) => e.into(),
            e => Self::Kernel(e),
        }
    }
}

// report paths the way the model names them
fn namespaced(e: KernelError, prefix: &str) -> KernelError {
    match e {
        KernelError::MissingHyperParameter(path) => {
            KernelError::MissingHyperParameter(path.prefixed(prefix))
        }
        KernelError::UnknownHyperParameter(path) => {
            KernelError::UnknownHyperParameter(path.prefixed(prefix))
        }
        e => e,
    }
}

/// Point predictions of the latent function
#[derive(Clone, Debug, PartialEq)]
pub struct Prediction {
    /// Posterior mean
    pub mean: DVector<f64>,
    /// Posterior marginal variance
    pub variance: DVector<f64>,
}

impl Prediction {
    /// Posterior marginal standard deviation
    #[must_use]
    pub fn std(&self) -> DVector<f64> {
        self.variance.map(f64::sqrt)
    }
}

#[derive(Debug)]
struct Fitted {
    version: u64,
    /// Blocked Cholesky factor of the Gram matrix
    factor: LowerTriPartitionedMatrix,
    /// `K⁻¹ (y - m)`
    alpha: PartitionedVector,
    ln_m: f64,
    k_inv: OnceLock<PartitionedPsdMatrix>,
}

impl Fitted {
    fn k_inv(&self) -> Result<&PartitionedPsdMatrix, GpError> {
        if let Some(k_inv) = self.k_inv.get() {
            return Ok(k_inv);
        }
        let k_inv = self.factor.cholesky_inverse()?;
        Ok(self.k_inv.get_or_init(|| k_inv))
    }
}

/// Gaussian process regression over inputs of type `I`
///
/// `K` is the covariance kernel and `N` the noise kernel, typically a
/// [`WhiteKernel`](kernel::WhiteKernel). Their hyperparameters are
/// namespaced under `covariance` and `noise` respectively.
///
/// Queries that need the fit take `&mut self` and cache it; any mutation of
/// the hyperparameters or of the prior mean invalidates the cache.
#[derive(Clone)]
pub struct GaussianProcess<I, K, N> {
    /// x values used in training
    x_train: Vec<I>,
    /// y values used in training
    y_train: PartitionedVector,
    /// Covariance Kernel
    kernel: K,
    /// Noise Kernel
    noise: N,
    /// Given parameters
    params: GaussianProcessParams,
    prior_mean: Option<PriorMean<I>>,
    version: u64,
    fitted: Option<Arc<Fitted>>,
}

impl<I, K, N> fmt::Debug for GaussianProcess<I, K, N>
where
    K: fmt::Debug,
    N: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GaussianProcess")
            .field("n", &self.x_train.len())
            .field("kernel", &self.kernel)
            .field("noise", &self.noise)
            .field("params", &self.params)
            .field("has_prior_mean", &self.prior_mean.is_some())
            .field("version", &self.version)
            .finish()
    }
}

impl<I, K, N> GaussianProcess<I, K, N>
where
    K: Kernel<I>,
    N: Kernel<I>,
{
    /// Create a Gaussian Process on the given data points
    ///
    /// # Arguments
    /// * `kernel` - Kernel to use to determine covariance
    /// * `noise` - Kernel modelling the observation noise
    /// * `x_train` - Values to use for input into `f`
    /// * `y_train` - Known values for `f(x)`
    /// * `params` - GaussianProcessParams to use. Can just use
    ///   `GaussianProcessParams::default()`.
    pub fn new(
        kernel: K,
        noise: N,
        x_train: Vec<I>,
        y_train: Vec<f64>,
        params: GaussianProcessParams,
    ) -> Result<Self, GpError> {
        params.validate()?;
        if x_train.len() != y_train.len() {
            return Err(GpError::TrainingSizeMismatch {
                n_inputs: x_train.len(),
                n_outputs: y_train.len(),
            });
        }
        if x_train.is_empty() {
            return Err(GpError::EmptyTrainingSet);
        }
        let y_train = PartitionedVector::from_slice(&y_train, params.block_size)?;
        Ok(Self {
            x_train,
            y_train,
            kernel,
            noise,
            params,
            prior_mean: None,
            version: 0,
            fitted: None,
        })
    }

    /// Create a Gaussian Process from `(x, y)` pairs
    pub fn from_pairs<P>(
        kernel: K,
        noise: N,
        pairs: P,
        params: GaussianProcessParams,
    ) -> Result<Self, GpError>
    where
        P: IntoIterator<Item = (I, f64)>,
    {
        let (x_train, y_train) = pairs.into_iter().unzip();
        Self::new(kernel, noise, x_train, y_train, params)
    }

    /// Use `m(x) = f(x)` as the prior mean instead of zero
    #[must_use]
    pub fn with_prior_mean<F>(mut self, f: F) -> Self
    where
        F: Fn(&I) -> f64 + Send + Sync + 'static,
    {
        self.prior_mean = Some(Arc::new(f));
        self.version += 1;
        self
    }

    /// Return the kernel being used in this GP
    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Return the noise kernel
    pub fn noise(&self) -> &N {
        &self.noise
    }

    pub fn params(&self) -> &GaussianProcessParams {
        &self.params
    }

    pub fn x_train(&self) -> &[I] {
        &self.x_train
    }

    pub fn y_train(&self) -> &PartitionedVector {
        &self.y_train
    }

    /// Number of training points
    pub fn n(&self) -> usize {
        self.x_train.len()
    }

    pub fn state(&self) -> GpState {
        match &self.fitted {
            None => GpState::Uninitialized,
            Some(fit) if fit.version == self.version => GpState::Trained,
            Some(_) => GpState::Stale,
        }
    }

    /// All hyperparameters of the covariance and noise kernels
    pub fn hyperparameters(&self) -> Hyperparameters {
        let mut hp = self.kernel.hyperparameters().prefixed(COVARIANCE);
        hp.extend(self.noise.hyperparameters().prefixed(NOISE));
        hp
    }

    /// The hyperparameters that are not blocked
    pub fn free_hyperparameters(&self) -> Hyperparameters {
        let mut hp = self.kernel.free_hyperparameters().prefixed(COVARIANCE);
        hp.extend(self.noise.free_hyperparameters().prefixed(NOISE));
        hp
    }

    fn configured(&self, config: &Hyperparameters) -> Result<(K, N), GpError> {
        let kernel = self
            .kernel
            .with_hyperparameters(&config.strip_prefix(COVARIANCE))
            .map_err(|e| namespaced(e, COVARIANCE))?;
        let noise = self
            .noise
            .with_hyperparameters(&config.strip_prefix(NOISE))
            .map_err(|e| namespaced(e, NOISE))?;
        Ok((kernel, noise))
    }

    /// Replace the hyperparameters. Every free hyperparameter must be
    /// present in `config`; nothing changes on error.
    pub fn set_hyperparameters(
        &mut self,
        config: &Hyperparameters,
    ) -> Result<(), GpError> {
        let (kernel, noise) = self.configured(config)?;
        self.kernel = kernel;
        self.noise = noise;
        self.version += 1;
        Ok(())
    }

    /// A copy of this model with its hyperparameters replaced
    pub fn with_hyperparameters(
        &self,
        config: &Hyperparameters,
    ) -> Result<Self, GpError>
    where
        I: Clone,
    {
        let (kernel, noise) = self.configured(config)?;
        Ok(Self {
            x_train: self.x_train.clone(),
            y_train: self.y_train.clone(),
            kernel,
            noise,
            params: self.params.clone(),
            prior_mean: self.prior_mean.clone(),
            version: self.version + 1,
            fitted: self.fitted.clone(),
        })
    }

    fn prior_mean_at(&self, xs: &[I], partitioning: &Partitioning) -> PartitionedVector {
        match &self.prior_mean {
            Some(m) => {
                let values: Vec<f64> = xs.iter().map(|x| m(x)).collect();
                PartitionedVector::from_flat(partitioning, &values)
            }
            None => PartitionedVector::zeros(partitioning),
        }
    }

    fn fit_with(&self, kernel: &K, noise: &N) -> Result<Fitted, GpError> {
        let bs = self.params.block_size;
        let gram = kernel
            .covariance(&self.x_train, bs)?
            .try_add(&noise.covariance(&self.x_train, bs)?)?
            .add_diagonal(self.params.jitter);
        let factor = gram.cholesky()?;

        let m = self.prior_mean_at(&self.x_train, self.y_train.partitioning());
        let residual = self.y_train.try_sub(&m)?;
        let alpha = factor.tr_solve_vector(&factor.solve_vector(&residual)?)?;

        let n = self.n() as f64;
        let ln_m =
            -0.5 * residual.dot(&alpha)? - factor.ln_det() - n * HALF_LN_2PI;
        trace!("gp: ln_m = {}", ln_m);

        Ok(Fitted {
            version: self.version,
            factor,
            alpha,
            ln_m,
            k_inv: OnceLock::new(),
        })
    }

    fn fitted(&mut self) -> Result<Arc<Fitted>, GpError> {
        if let Some(fit) = &self.fitted {
            if fit.version == self.version {
                return Ok(Arc::clone(fit));
            }
        }
        debug!(
            "gp: fitting n = {}, block_size = {}, version = {}",
            self.n(),
            self.params.block_size,
            self.version
        );
        let fit = Arc::new(self.fit_with(&self.kernel, &self.noise)?);
        self.fitted = Some(Arc::clone(&fit));
        Ok(fit)
    }

    /// Fit the model now if the cached fit is missing or stale
    pub fn train(&mut self) -> Result<(), GpError> {
        self.fitted().map(|_| ())
    }

    /// Return the log marginal likelihood
    pub fn ln_m(&mut self) -> Result<f64, GpError> {
        Ok(self.fitted()?.ln_m)
    }

    /// Return the inverse of the Gram matrix
    pub fn k_inv(&mut self) -> Result<PartitionedPsdMatrix, GpError> {
        Ok(self.fitted()?.k_inv()?.clone())
    }

    // GPML Equation 5.9
    fn gradient_with(
        &self,
        kernel: &K,
        noise: &N,
        fit: &Fitted,
    ) -> Result<Hyperparameters, GpError> {
        let bs = self.params.block_size;
        let dk_cov = kernel.covariance_gradient(&self.x_train, bs)?;
        let dk_noise = noise.covariance_gradient(&self.x_train, bs)?;
        let k_inv = fit.k_inv()?;

        let mut grad = Hyperparameters::new();
        let parts = dk_cov
            .into_iter()
            .map(|(path, dk)| (path.prefixed(COVARIANCE), dk))
            .chain(
                dk_noise
                    .into_iter()
                    .map(|(path, dk)| (path.prefixed(NOISE), dk)),
            );
        for (path, dk) in parts {
            let quad = fit.alpha.dot(&dk.mul_vector(&fit.alpha)?)?;
            let tr = k_inv.trace_product(&dk)?;
            grad.insert(path, 0.5 * (quad - tr));
        }
        Ok(grad)
    }

    /// Gradient of the log marginal likelihood with respect to every free
    /// hyperparameter
    pub fn ln_m_gradient(&mut self) -> Result<Hyperparameters, GpError> {
        let fit = self.fitted()?;
        self.gradient_with(&self.kernel, &self.noise, &fit)
    }

    /// Log marginal likelihood and its gradient under another configuration.
    /// The cached fit is neither used nor touched.
    pub fn ln_m_with_hyperparameters(
        &self,
        config: &Hyperparameters,
    ) -> Result<(f64, Hyperparameters), GpError> {
        let (kernel, noise) = self.configured(config)?;
        let fit = self.fit_with(&kernel, &noise)?;
        let grad = self.gradient_with(&kernel, &noise, &fit)?;
        Ok((fit.ln_m, grad))
    }

    // mean m(xs) + K*ᵀ α and V = L⁻¹ K*
    fn conditioned(
        &mut self,
        xs: &[I],
    ) -> Result<(PartitionedVector, PartitionedMatrix), GpError> {
        let fit = self.fitted()?;
        let bs = self.params.block_size;
        let k_star = self.kernel.cross_covariance(&self.x_train, xs, bs)?;

        let part = Partitioning::uniform(xs.len(), bs)?;
        let mean = self
            .prior_mean_at(xs, &part)
            .try_add(&k_star.transpose().mul_vector(&fit.alpha)?)?;
        let v = fit.factor.solve_matrix(&k_star)?;
        Ok((mean, v))
    }

    /// Posterior distribution of the latent function at `xs`.
    ///
    /// The jitter is added to the diagonal of the posterior covariance as it
    /// is to the Gram matrix, so the result can be factored even where the
    /// training data pin the function down exactly.
    pub fn posterior(&mut self, xs: &[I]) -> Result<BlockedMvGaussian, GpError> {
        let (mean, v) = self.conditioned(xs)?;
        let k_ss = self.kernel.covariance(xs, self.params.block_size)?;
        let cov = k_ss.as_matrix().try_sub(&v.transpose().mul_matrix(&v)?)?;
        Ok(BlockedMvGaussian::new_unchecked(
            mean,
            PartitionedPsdMatrix::new(cov)?.add_diagonal(self.params.jitter),
        ))
    }

    /// Posterior mean and marginal variance of the latent function at `xs`,
    /// without forming the full posterior covariance
    pub fn predict(&mut self, xs: &[I]) -> Result<Prediction, GpError> {
        let (mean, v) = self.conditioned(xs)?;
        let explained = v.column_norms_squared().to_dvector();
        let variance = self
            .kernel
            .diag(xs)
            .zip_map(&explained, |k, e| (k - e).max(0.0));
        Ok(Prediction {
            mean: mean.to_dvector(),
            variance,
        })
    }
}

impl<I, K, N> RandomProcess<I> for GaussianProcess<I, K, N>
where
    K: Kernel<I>,
    N: Kernel<I>,
{
    type SampleFunction = BlockedMvGaussian;
    type Error = GpError;

    fn sample_function(
        &mut self,
        indices: &[I],
    ) -> Result<Self::SampleFunction, Self::Error> {
        self.posterior(indices)
    }

    fn ln_m(&mut self) -> Result<f64, Self::Error> {
        GaussianProcess::ln_m(self)
    }

    fn ln_m_with_hyperparameters(
        &self,
        config: &Hyperparameters,
    ) -> Result<(f64, Hyperparameters), Self::Error> {
        GaussianProcess::ln_m_with_hyperparameters(self, config)
    }

    fn hyperparameters(&self) -> Hyperparameters {
        GaussianProcess::hyperparameters(self)
    }

    fn set_hyperparameters(
        &mut self,
        config: &Hyperparameters,
    ) -> Result<(), Self::Error> {
        GaussianProcess::set_hyperparameters(self, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::gaussian::kernel::{
        ConstantKernel, HyperPath, RBFKernel, WhiteKernel,
    };
    use nalgebra::DMatrix;

    fn arange(start: f64, stop: f64, step_size: f64) -> Vec<f64> {
        let size = ((stop - start) / step_size).floor() as usize;
        (0..size).map(|i| start + (i as f64) * step_size).collect()
    }

    fn simple_gp(
        block_size: usize,
    ) -> GaussianProcess<f64, RBFKernel, WhiteKernel> {
        let x_train = vec![-4.0, -3.0, -2.0, -1.0, 1.0];
        let y_train = x_train.iter().map(|x: &f64| x.sin()).collect();
        GaussianProcess::new(
            RBFKernel::default(),
            WhiteKernel::new(1E-10).unwrap(),
            x_train,
            y_train,
            GaussianProcessParams::default().with_block_size(block_size),
        )
        .unwrap()
    }

    #[test]
    fn simple() {
        let mut gp = simple_gp(2);
        let xs = arange(-5.0, 5.0, 1.0);
        let pred = gp.predict(&xs).unwrap();

        let expected_mean = DVector::from_column_slice(&[
            0.61409752,
            0.7568025,
            -0.14112001,
            -0.90929743,
            -0.84147098,
            0.08533365,
            0.84147098,
            0.5639856,
            0.12742202,
            0.01047683,
        ]);
        assert!(pred.mean.relative_eq(&expected_mean, 1E-6, 1E-6));

        // the training points are interpolated
        for &ix in &[1, 2, 3, 4, 6] {
            assert::close(pred.variance[ix], 0.0, 1E-6);
        }
        assert::close(pred.variance[0], 5.09625632e-01, 1E-6);
    }

    #[test]
    fn ln_m_matches_dense() {
        let mut gp = simple_gp(2);
        let xs = gp.x_train().to_vec();
        let y = gp.y_train().to_dvector();
        let k = DMatrix::from_fn(5, 5, |i, j| {
            (-0.5 * (xs[i] - xs[j]).powi(2)).exp()
                + if i == j { 1E-10 + 1E-10 } else { 0.0 }
        });
        let chol = k.cholesky().unwrap();
        let alpha = chol.solve(&y);
        let expected = -0.5 * y.dot(&alpha)
            - chol.l().diagonal().map(f64::ln).sum()
            - 5.0 * HALF_LN_2PI;
        assert::close(gp.ln_m().unwrap(), expected, 1E-8);
    }

    #[test]
    fn state_transitions() {
        let mut gp = simple_gp(3);
        assert_eq!(gp.state(), GpState::Uninitialized);

        let mut config = gp.hyperparameters();
        config.insert(
            HyperPath::new(["covariance", "rbf", "length_scale"]),
            2.0,
        );
        gp.set_hyperparameters(&config).unwrap();
        assert_eq!(gp.state(), GpState::Uninitialized);

        gp.train().unwrap();
        assert_eq!(gp.state(), GpState::Trained);

        gp.set_hyperparameters(&gp.hyperparameters()).unwrap();
        assert_eq!(gp.state(), GpState::Stale);
        gp.ln_m().unwrap();
        assert_eq!(gp.state(), GpState::Trained);

        let other = gp.with_hyperparameters(&config).unwrap();
        assert_eq!(other.state(), GpState::Stale);
        assert_eq!(gp.state(), GpState::Trained);
    }

    #[test]
    fn missing_hyperparameter_leaves_model_untouched() {
        let mut gp = simple_gp(3);
        gp.train().unwrap();
        let config = Hyperparameters::new().with(
            HyperPath::new(["covariance", "rbf", "length_scale"]),
            2.0,
        );
        let err = gp.set_hyperparameters(&config).unwrap_err();
        assert_eq!(
            err,
            GpError::Kernel(KernelError::MissingHyperParameter(HyperPath::new(
                ["noise", "white", "noise_level"]
            )))
        );
        assert_eq!(gp.state(), GpState::Trained);
        assert_eq!(gp.kernel().length_scale(), 1.0);
    }

    #[test]
    fn construction_is_validated() {
        let err = GaussianProcess::new(
            RBFKernel::default(),
            WhiteKernel::default(),
            vec![0.0, 1.0],
            vec![0.0],
            GaussianProcessParams::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            GpError::TrainingSizeMismatch {
                n_inputs: 2,
                n_outputs: 1
            }
        );

        let err = GaussianProcess::<f64, _, _>::new(
            RBFKernel::default(),
            WhiteKernel::default(),
            vec![],
            vec![],
            GaussianProcessParams::default(),
        )
        .unwrap_err();
        assert_eq!(err, GpError::EmptyTrainingSet);
    }

    #[test]
    fn not_positive_definite_is_rejected() {
        // duplicated inputs without noise or jitter give a singular Gram
        let mut gp = GaussianProcess::new(
            ConstantKernel::new(1.0).unwrap(),
            WhiteKernel::new(0.0).unwrap(),
            vec![0.0, 0.0, 1.0],
            vec![1.0, 2.0, 3.0],
            GaussianProcessParams::default()
                .with_block_size(2)
                .with_jitter(0.0),
        )
        .unwrap();
        let err = gp.ln_m().unwrap_err();
        assert!(matches!(err, GpError::NotPositiveDefinite { .. }));
        assert!(err.is_rejected_configuration());
        assert_eq!(gp.state(), GpState::Uninitialized);
    }

    #[test]
    fn prior_mean_shifts_predictions() {
        let mut gp = simple_gp(2);
        let base = gp.predict(&[10.0]).unwrap().mean[0];
        let mut shifted = gp.with_prior_mean(|_| 3.0);
        assert_eq!(shifted.state(), GpState::Stale);
        // far from the data the prediction reverts to the prior mean
        let pred = shifted.predict(&[10.0]).unwrap().mean[0];
        assert::close(pred - base, 3.0, 1E-6);
    }

    #[test]
    fn posterior_matches_predict() {
        let mut gp = simple_gp(2);
        let xs = arange(-5.0, 5.0, 0.5);
        let post = gp.posterior(&xs).unwrap();
        let pred = gp.predict(&xs).unwrap();

        assert!(post.mu().to_dvector().relative_eq(&pred.mean, 1E-12, 1E-12));
        let diag = post.cov().diagonal().unwrap().to_dvector();
        let jitter = gp.params().jitter;
        for i in 0..xs.len() {
            assert::close(diag[i], pred.variance[i] + jitter, 1E-12);
        }
    }
}

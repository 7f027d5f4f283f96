//! Random processes
use crate::process::gaussian::kernel::Hyperparameters;

pub mod gaussian;

/// A random process indexed by values of type `I` whose hyperparameters can
/// be read, replaced, and scored by the log marginal likelihood
pub trait RandomProcess<I> {
    /// Type of the sample function, aka trajectory of the process.
    type SampleFunction;

    /// Errors from fitting the process
    type Error: std::error::Error;

    /// Create a sample function at the indices given.
    fn sample_function(
        &mut self,
        indices: &[I],
    ) -> Result<Self::SampleFunction, Self::Error>;

    /// Compute the log marginal likelihood
    fn ln_m(&mut self) -> Result<f64, Self::Error>;

    /// Compute the log marginal likelihood with a different set of
    /// hyperparameters, along with its gradient. The process itself is not
    /// modified.
    fn ln_m_with_hyperparameters(
        &self,
        config: &Hyperparameters,
    ) -> Result<(f64, Hyperparameters), Self::Error>;

    /// Get the hyperparameters
    fn hyperparameters(&self) -> Hyperparameters;

    /// Set with the given hyperparameters
    fn set_hyperparameters(
        &mut self,
        config: &Hyperparameters,
    ) -> Result<(), Self::Error>;
}

use super::{
    AddKernel, HyperPath, Hyperparameterized, Kernel, KernelError, ProductKernel,
};

#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

/// A kernel with some hyperparameters held fixed.
///
/// Blocked hyperparameters still appear in
/// [`hyperparameters`](Hyperparameterized::hyperparameters) but are left out
/// of gradients and of the free set an optimizer works on.
///
/// # Example
///
/// ```
/// use partgp::process::gaussian::kernel::*;
///
/// let kernel = (ConstantKernel::new(2.0).unwrap() * RBFKernel::new(1.0).unwrap())
///     .with_blocked(HyperPath::new(["lhs", "constant", "value"]))
///     .unwrap();
///
/// assert_eq!(kernel.hyperparameters().len(), 2);
/// assert_eq!(kernel.free_hyperparameters().len(), 1);
/// assert_eq!(kernel.gradient(&0.0, &1.0).len(), 1);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
pub struct BlockedKernel<K> {
    kernel: K,
    blocked: Vec<HyperPath>,
}

impl<K: Hyperparameterized> BlockedKernel<K> {
    pub(crate) fn new_unchecked(kernel: K, blocked: Vec<HyperPath>) -> Self {
        Self { kernel, blocked }
    }

    /// Block one more hyperparameter
    pub fn and_blocked(mut self, path: HyperPath) -> Result<Self, KernelError> {
        if !self.kernel.hyperparameter_names().contains(&path) {
            return Err(KernelError::UnknownHyperParameter(path));
        }
        if !self.blocked.contains(&path) {
            self.blocked.push(path);
        }
        Ok(self)
    }

    /// The wrapped kernel
    #[inline]
    #[must_use]
    pub fn inner(&self) -> &K {
        &self.kernel
    }

    #[must_use]
    pub fn into_inner(self) -> K {
        self.kernel
    }
}

impl<K: Hyperparameterized> Hyperparameterized for BlockedKernel<K> {
    fn hyperparameter_names(&self) -> Vec<HyperPath> {
        self.kernel.hyperparameter_names()
    }

    fn hyperparameter_values(&self) -> Vec<f64> {
        self.kernel.hyperparameter_values()
    }

    fn n_hyperparameters(&self) -> usize {
        self.kernel.n_hyperparameters()
    }

    fn reparameterize(&self, values: &[f64]) -> Result<Self, KernelError> {
        Ok(Self {
            kernel: self.kernel.reparameterize(values)?,
            blocked: self.blocked.clone(),
        })
    }

    fn blocked(&self) -> Vec<HyperPath> {
        let mut blocked = self.kernel.blocked();
        for path in &self.blocked {
            if !blocked.contains(path) {
                blocked.push(path.clone());
            }
        }
        blocked
    }
}

impl<I, K: Kernel<I>> Kernel<I> for BlockedKernel<K> {
    fn evaluate(&self, x: &I, y: &I) -> f64 {
        self.kernel.evaluate(x, y)
    }

    fn gradient_into(&self, x: &I, y: &I, out: &mut [f64]) {
        self.kernel.gradient_into(x, y, out);
    }

    fn is_stationary(&self) -> bool {
        self.kernel.is_stationary()
    }
}

impl<K, B> std::ops::Add<B> for BlockedKernel<K> {
    type Output = AddKernel<Self, B>;

    fn add(self, rhs: B) -> Self::Output {
        AddKernel::new(self, rhs)
    }
}

impl<K, B> std::ops::Mul<B> for BlockedKernel<K> {
    type Output = ProductKernel<Self, B>;

    fn mul(self, rhs: B) -> Self::Output {
        ProductKernel::new(self, rhs)
    }
}

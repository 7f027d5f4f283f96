//! Summary statistics shared by the distributions in this crate

/// Has a mean
pub trait Mean<M> {
    /// Returns `None` if the mean is undefined
    fn mean(&self) -> Option<M>;
}

/// Has a (marginal) variance
pub trait Variance<V> {
    /// Returns `None` if the variance is undefined
    fn variance(&self) -> Option<V>;
}

//! Probability distributions over partitioned vectors
mod mvg;

pub use mvg::{BlockedMvGaussian, BlockedMvGaussianError};

//! Block-partitioned linear algebra and Gaussian process regression
//!
//! Vectors and matrices are cut into blocks by a [`partition::Partitioning`]
//! and every factorization, solve, and product works one block at a time.
//! The Gaussian process in [`process::gaussian`] builds its Gram matrix and
//! Cholesky factor on top of these types.
pub mod consts;
pub mod dist;
pub mod partition;
pub mod process;
pub mod traits;

use super::{HyperPath, Hyperparameterized, Kernel, KernelError};

#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

const LHS: &str = "lhs";
const RHS: &str = "rhs";

fn namespaced(a: Vec<HyperPath>, b: Vec<HyperPath>) -> Vec<HyperPath> {
    a.iter()
        .map(|p| p.prefixed(LHS))
        .chain(b.iter().map(|p| p.prefixed(RHS)))
        .collect()
}

macro_rules! impl_composite {
    ($kind: ident) => {
        impl<A, B> $kind<A, B> {
            /// Construct a new Kernel from two other Kernels
            pub fn new(a: A, b: B) -> Self {
                Self { a, b }
            }

            /// The left operand
            pub fn lhs(&self) -> &A {
                &self.a
            }

            /// The right operand
            pub fn rhs(&self) -> &B {
                &self.b
            }
        }

        impl<A, B> Hyperparameterized for $kind<A, B>
        where
            A: Hyperparameterized,
            B: Hyperparameterized,
        {
            fn hyperparameter_names(&self) -> Vec<HyperPath> {
                namespaced(
                    self.a.hyperparameter_names(),
                    self.b.hyperparameter_names(),
                )
            }

            fn hyperparameter_values(&self) -> Vec<f64> {
                let mut values = self.a.hyperparameter_values();
                values.extend(self.b.hyperparameter_values());
                values
            }

            fn n_hyperparameters(&self) -> usize {
                self.a.n_hyperparameters() + self.b.n_hyperparameters()
            }

            fn reparameterize(
                &self,
                values: &[f64],
            ) -> Result<Self, KernelError> {
                let n = self.n_hyperparameters();
                if values.len() != n {
                    return Err(KernelError::WrongParameterCount {
                        expected: n,
                        given: values.len(),
                    });
                }
                let (a_values, b_values) =
                    values.split_at(self.a.n_hyperparameters());
                Ok(Self::new(
                    self.a.reparameterize(a_values)?,
                    self.b.reparameterize(b_values)?,
                ))
            }

            fn blocked(&self) -> Vec<HyperPath> {
                namespaced(self.a.blocked(), self.b.blocked())
            }
        }

        impl<A, B, C> std::ops::Mul<C> for $kind<A, B> {
            type Output = ProductKernel<Self, C>;

            fn mul(self, rhs: C) -> Self::Output {
                ProductKernel::new(self, rhs)
            }
        }

        impl<A, B, C> std::ops::Add<C> for $kind<A, B> {
            type Output = AddKernel<Self, C>;

            fn add(self, rhs: C) -> Self::Output {
                AddKernel::new(self, rhs)
            }
        }
    };
}

/// Kernel representing the sum of two other kernels
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
pub struct AddKernel<A, B> {
    a: A,
    b: B,
}

impl_composite!(AddKernel);

impl<I, A, B> Kernel<I> for AddKernel<A, B>
where
    A: Kernel<I>,
    B: Kernel<I>,
{
    fn evaluate(&self, x: &I, y: &I) -> f64 {
        self.a.evaluate(x, y) + self.b.evaluate(x, y)
    }

    fn gradient_into(&self, x: &I, y: &I, out: &mut [f64]) {
        let (out_a, out_b) = out.split_at_mut(self.a.n_hyperparameters());
        self.a.gradient_into(x, y, out_a);
        self.b.gradient_into(x, y, out_b);
    }

    fn is_stationary(&self) -> bool {
        self.a.is_stationary() && self.b.is_stationary()
    }
}

/// Kernel representing the product of two other kernels
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
pub struct ProductKernel<A, B> {
    a: A,
    b: B,
}

impl_composite!(ProductKernel);

impl<I, A, B> Kernel<I> for ProductKernel<A, B>
where
    A: Kernel<I>,
    B: Kernel<I>,
{
    fn evaluate(&self, x: &I, y: &I) -> f64 {
        self.a.evaluate(x, y) * self.b.evaluate(x, y)
    }

    // product rule: each side's gradient scales by the other side's value
    fn gradient_into(&self, x: &I, y: &I, out: &mut [f64]) {
        let k_a = self.a.evaluate(x, y);
        let k_b = self.b.evaluate(x, y);
        let (out_a, out_b) = out.split_at_mut(self.a.n_hyperparameters());
        self.a.gradient_into(x, y, out_a);
        self.b.gradient_into(x, y, out_b);
        out_a.iter_mut().for_each(|g| *g *= k_b);
        out_b.iter_mut().for_each(|g| *g *= k_a);
    }

    fn is_stationary(&self) -> bool {
        self.a.is_stationary() && self.b.is_stationary()
    }
}

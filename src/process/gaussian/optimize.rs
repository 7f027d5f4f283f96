//! Maximum likelihood estimation of the hyperparameters
//!
//! BFGS with a backtracking line search, run on the log of the free
//! hyperparameters.
use log::{debug, trace, warn};
use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand_distr::Normal;

use super::kernel::{HyperPath, Hyperparameters, Kernel};
use super::{GaussianProcess, GpError, OptimizeParams};

/// Sufficient decrease constant of the Armijo condition
const ARMIJO_C1: f64 = 1E-4;
/// Step halvings before a line search gives up
const MAX_HALVINGS: usize = 40;

struct Accepted {
    x: DVector<f64>,
    f_x: f64,
    g_x: DVector<f64>,
}

// Halve the step until the Armijo condition holds. Rejected
// configurations evaluate to +∞ and never satisfy it.
fn backtrack<F>(
    f: &mut F,
    x: &DVector<f64>,
    f_x: f64,
    search_dir: &DVector<f64>,
    slope: f64,
) -> Result<Option<Accepted>, GpError>
where
    F: FnMut(&DVector<f64>) -> Result<(f64, DVector<f64>), GpError>,
{
    let mut step = 1.0;
    for _ in 0..MAX_HALVINGS {
        let x_t = x + search_dir * step;
        let (f_t, g_t) = f(&x_t)?;
        if f_t.is_finite() && f_t <= f_x + ARMIJO_C1 * step * slope {
            return Ok(Some(Accepted {
                x: x_t,
                f_x: f_t,
                g_x: g_t,
            }));
        }
        step *= 0.5;
    }
    Ok(None)
}

/// Minimize `f`, which returns the value and gradient at a point. Returns
/// the best point found and its value, which is never worse than the start.
pub(crate) fn bfgs<F>(
    x0: DVector<f64>,
    params: &OptimizeParams,
    mut f: F,
) -> Result<(DVector<f64>, f64), GpError>
where
    F: FnMut(&DVector<f64>) -> Result<(f64, DVector<f64>), GpError>,
{
    let n = x0.len();
    let mut x = x0;
    let (mut f_x, mut g_x) = f(&x)?;
    if !f_x.is_finite() {
        debug!("bfgs: rejected starting point x = {}", x);
        return Ok((x, f_x));
    }

    let mut b_inv = DMatrix::identity(n, n);
    for i in 0..params.max_iter {
        if g_x.norm() < params.accuracy {
            debug!("bfgs: converged after {} iterations, f = {}", i, f_x);
            break;
        }

        let mut search_dir = -(&b_inv * &g_x);
        let mut slope = g_x.dot(&search_dir);
        if slope >= 0.0 {
            // not a descent direction; restart from steepest descent
            b_inv = DMatrix::identity(n, n);
            search_dir = -g_x.clone();
            slope = -g_x.norm_squared();
        }

        let next = match backtrack(&mut f, &x, f_x, &search_dir, slope)? {
            Some(next) => next,
            None => {
                debug!("bfgs: line search failed at i = {}, f = {}", i, f_x);
                break;
            }
        };

        let s: DVector<f64> = &next.x - &x;
        let y: DVector<f64> = &next.g_x - &g_x;
        let sty: f64 = s.dot(&y);
        if sty > f64::EPSILON {
            let sst: DMatrix<f64> = &s * s.transpose();
            let yt_bi_y: f64 = y.dot(&(&b_inv * &y));

            let add = ((sty + yt_bi_y) * &sst) / (sty * sty);
            let sub = (&b_inv * &y * s.transpose()
                + &s * (y.transpose() * &b_inv))
                / sty;

            b_inv += &add - &sub;
        }

        x = next.x;
        f_x = next.f_x;
        g_x = next.g_x;
        trace!("bfgs: i = {}, f = {}, x = {}", i, f_x, x);
    }
    Ok((x, f_x))
}

impl<I, K, N> GaussianProcess<I, K, N>
where
    K: Kernel<I>,
    N: Kernel<I>,
{
    /// Optimize the free hyperparameters such that `ln_m` is maximized.
    ///
    /// The search runs on the log of every free hyperparameter that is
    /// strictly positive; the others keep their value. After the first run
    /// from the current values, `n_restarts` more runs start from the
    /// current values perturbed by a normal draw in log space. A
    /// configuration whose Gram matrix is not positive definite, or whose
    /// kernel rejects a value, scores as zero likelihood.
    ///
    /// Returns the trained model. Its `ln_m` is never below the starting
    /// one.
    pub fn optimize<R: Rng>(mut self, rng: &mut R) -> Result<Self, GpError> {
        let params = self.params.optimize.clone();
        let base = self.hyperparameters();
        let (paths, values): (Vec<HyperPath>, Vec<f64>) = self
            .free_hyperparameters()
            .into_iter()
            .filter(|(_, value)| *value > 0.0)
            .unzip();

        if paths.is_empty() {
            debug!("optimize: no free hyperparameters");
            self.train()?;
            return Ok(self);
        }

        let best = {
            let to_config = |theta: &DVector<f64>| -> Hyperparameters {
                let mut config = base.clone();
                for (path, t) in paths.iter().zip(theta.iter()) {
                    config.insert(path.clone(), t.exp());
                }
                config
            };

            let model = &self;
            // negative log marginal likelihood and its gradient in log space
            let objective = |theta: &DVector<f64>| {
                match model.ln_m_with_hyperparameters(&to_config(theta)) {
                    Ok((ln_m, grad)) => {
                        let g = DVector::from_iterator(
                            theta.len(),
                            paths.iter().zip(theta.iter()).map(|(path, t)| {
                                -grad.get(path).unwrap_or(0.0) * t.exp()
                            }),
                        );
                        Ok((-ln_m, g))
                    }
                    Err(e) if e.is_rejected_configuration() => {
                        trace!("optimize: rejected configuration ({})", e);
                        Ok((f64::INFINITY, DVector::zeros(theta.len())))
                    }
                    Err(e) => Err(e),
                }
            };

            let theta_0 =
                DVector::from_iterator(values.len(), values.iter().map(|v| v.ln()));
            let (f_0, _) = objective(&theta_0)?;
            let mut best: Option<(DVector<f64>, f64)> = None;
            let mut best_f = f_0;

            let normal = Normal::new(0.0, params.restart_scale)
                .map_err(|e| GpError::InvalidParameters(e.to_string()))?;

            for run in 0..=params.n_restarts {
                let start = if run == 0 {
                    theta_0.clone()
                } else {
                    theta_0.map(|t| t + rng.sample(normal))
                };
                let (theta, f) = bfgs(start, &params, &objective)?;
                debug!("optimize: run {}, -ln_m = {}", run, f);
                if f < best_f {
                    best_f = f;
                    best = Some((theta, f));
                }
            }
            if !best_f.is_finite() {
                warn!("optimize: every configuration tried was rejected");
            }
            best.map(|(theta, _)| to_config(&theta))
        };

        if let Some(config) = best {
            self.set_hyperparameters(&config)?;
        }
        self.train()?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> OptimizeParams {
        OptimizeParams::default()
            .with_max_iter(1000)
            .with_accuracy(1E-8)
    }

    #[test]
    fn bfgs_x_cubed() {
        let res = bfgs(DVector::zeros(1), &params(), |v| {
            let x = v[0];
            let y = -(x - 1.0).powi(3) - (x - 1.0).powi(2);
            let dy_dx = -3.0 * x.powi(2) + 4.0 * x - 1.0;
            let g = DVector::from_column_slice(&[dy_dx]);
            Ok((y, g))
        });

        assert!(res.is_ok());
        assert::close(res.unwrap().0[0], 1.0 / 3.0, 1E-5);
    }

    #[test]
    fn bfgs_rosenbrock() {
        let x0: DVector<f64> = DVector::zeros(2);
        let f = |x: &DVector<f64>| {
            let y =
                (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0].powi(2)).powi(2);
            let gx =
                -400.0 * (x[1] - x[0].powi(2)) * x[0] - 2.0 * (1.0 - x[0]);
            let gy = 200.0 * (x[1] - x[0].powi(2));
            Ok((y, DVector::from_column_slice(&[gx, gy])))
        };

        let (xmin, fmin) = bfgs(x0, &params(), f).unwrap();
        let expected = DVector::from_column_slice(&[1.0, 1.0]);
        assert!(xmin.relative_eq(&expected, 1E-5, 1E-5));
        assert::close(fmin, 0.0, 1E-10);
    }

    #[test]
    fn bfgs_keeps_rejected_start() {
        let res = bfgs(DVector::zeros(2), &params(), |v| {
            Ok((f64::INFINITY, DVector::zeros(v.len())))
        })
        .unwrap();
        assert_eq!(res.0, DVector::zeros(2));
        assert!(res.1.is_infinite());
    }

    #[test]
    fn bfgs_avoids_infeasible_region() {
        // minimum at 2, but everything past 1.5 is rejected
        let res = bfgs(DVector::zeros(1), &params(), |v| {
            let x = v[0];
            if x > 1.5 {
                Ok((f64::INFINITY, DVector::zeros(1)))
            } else {
                Ok(((x - 2.0).powi(2), DVector::from_element(1, 2.0 * (x - 2.0))))
            }
        })
        .unwrap();
        assert!(res.0[0] <= 1.5);
        assert!(res.1 < 4.0);
    }
}

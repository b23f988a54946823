//! # Levenberg–Marquardt nonlinear least squares
//!
//! A small, dense Levenberg–Marquardt minimizer for problems with a handful of parameters
//! and up to a few thousand residuals.
//!
//! The problem is described through the [`LeastSquaresProblem`] trait (residual vector and
//! optionally its Jacobian), the solver minimizes
//!
//! ```text
//! cost(x) = ½ Σ rᵢ(x)²
//! ```
//!
//! Each iteration solves the damped normal equations
//!
//! ```text
//! (JᵀJ + λ · diag(JᵀJ)) δ = −Jᵀr
//! ```
//!
//! with a Cholesky factorization (`nalgebra`). A step is accepted when it lowers the cost;
//! λ is then divided by 10, otherwise multiplied by 10 and the step retried.
//!
//! Termination
//! -----------------
//! * [`Termination::Converged`] – the relative cost decrease of an accepted step fell
//!   below `tolerance`, or the cost reached zero.
//! * [`Termination::Stalled`] – no damped step lowers the cost any more (λ exceeded its
//!   cap): the iterate sits at a minimum up to floating-point resolution.
//! * [`Termination::MaxIterations`] – the iteration budget ran out first.
//! * [`Termination::NonFiniteCost`] – the residuals at the starting point are not finite.
//!
//! Bounds
//! -----------------
//! Optional box [`Bounds`] are enforced by projecting every trial point onto the box.
use nalgebra::{DMatrix, DVector};

use crate::lightfit_errors::LightfitError;

/// A nonlinear least-squares problem `min ½‖r(x)‖²`.
pub trait LeastSquaresProblem {
    /// Number of free parameters.
    fn parameter_count(&self) -> usize;

    /// Residual vector at `params`.
    fn residuals(&self, params: &DVector<f64>) -> DVector<f64>;

    /// Jacobian `∂rᵢ/∂xⱼ` at `params`.
    ///
    /// The default implementation uses forward finite differences with a step
    /// `√ε · max(|xⱼ|, 1)`.
    fn jacobian(&self, params: &DVector<f64>) -> DMatrix<f64> {
        let base = self.residuals(params);
        let mut jac = DMatrix::zeros(base.len(), params.len());
        let sqrt_eps = f64::EPSILON.sqrt();
        for j in 0..params.len() {
            let h = sqrt_eps * params[j].abs().max(1.0);
            let mut shifted = params.clone();
            shifted[j] += h;
            let column = (self.residuals(&shifted) - &base) / h;
            jac.set_column(j, &column);
        }
        jac
    }
}

/// Box constraints `lower ≤ x ≤ upper` (per parameter, infinite bounds allowed).
#[derive(Debug, Clone, PartialEq)]
pub struct Bounds {
    lower: DVector<f64>,
    upper: DVector<f64>,
}

impl Bounds {
    /// Build bounds, checking matching lengths, `lower ≤ upper` and no NaN.
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> Result<Self, LightfitError> {
        if lower.len() != upper.len() {
            return Err(LightfitError::InvalidFitParameter(format!(
                "bounds length mismatch: {} lower, {} upper",
                lower.len(),
                upper.len()
            )));
        }
        if let Some((lo, hi)) = lower.iter().zip(&upper).find(|(lo, hi)| !(lo <= hi)) {
            return Err(LightfitError::InvalidFitParameter(format!(
                "invalid bound pair [{lo}, {hi}]"
            )));
        }
        Ok(Bounds {
            lower: DVector::from_vec(lower),
            upper: DVector::from_vec(upper),
        })
    }

    pub fn len(&self) -> usize {
        self.lower.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    /// Clamp `x` into the box.
    pub fn project(&self, x: &DVector<f64>) -> DVector<f64> {
        x.zip_zip_map(&self.lower, &self.upper, |v, lo, hi| v.clamp(lo, hi))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Converged,
    Stalled,
    MaxIterations,
    NonFiniteCost,
}

impl Termination {
    /// Whether the solver stopped at a minimum (converged or stalled).
    pub fn is_success(&self) -> bool {
        matches!(self, Termination::Converged | Termination::Stalled)
    }
}

/// Outcome of one [`LevenbergMarquardt::minimize`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverReport {
    pub params: DVector<f64>,
    /// Final residual sum of squares `Σ rᵢ²`.
    pub residual_sum_of_squares: f64,
    pub iterations: usize,
    pub termination: Termination,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LevenbergMarquardt {
    tolerance: f64,
    max_iterations: usize,
    initial_damping: f64,
    max_damping: f64,
}

impl Default for LevenbergMarquardt {
    fn default() -> Self {
        LevenbergMarquardt {
            tolerance: 1e-10,
            max_iterations: 200,
            initial_damping: 1e-3,
            max_damping: 1e16,
        }
    }
}

const MIN_DAMPING: f64 = 1e-12;

impl LevenbergMarquardt {
    pub fn new(tolerance: f64, max_iterations: usize) -> Self {
        LevenbergMarquardt {
            tolerance,
            max_iterations,
            ..Default::default()
        }
    }

    pub fn with_initial_damping(mut self, damping: f64) -> Self {
        self.initial_damping = damping;
        self
    }

    pub fn with_max_damping(mut self, damping: f64) -> Self {
        self.max_damping = damping;
        self
    }

    /// Minimize `½‖r(x)‖²` starting from `x0`.
    ///
    /// Arguments
    /// -----------------
    /// * `problem`: Residuals (and Jacobian) to minimize.
    /// * `x0`: Initial guess, projected onto `bounds` when given.
    /// * `bounds`: Optional box constraints.
    ///
    /// Return
    /// ----------
    /// * A [`SolverReport`] holding the last accepted iterate; the caller decides what a
    ///   [`Termination`] other than `Converged`/`Stalled` means for it.
    pub fn minimize<P>(&self, problem: &P, x0: DVector<f64>, bounds: Option<&Bounds>) -> SolverReport
    where
        P: LeastSquaresProblem + ?Sized,
    {
        debug_assert_eq!(x0.len(), problem.parameter_count());
        let project = |x: DVector<f64>| match bounds {
            Some(b) => b.project(&x),
            None => x,
        };

        let mut x = project(x0);
        let mut r = problem.residuals(&x);
        let mut rss = r.norm_squared();
        let mut damping = self.initial_damping;

        let report = |params, rss, iterations, termination| SolverReport {
            params,
            residual_sum_of_squares: rss,
            iterations,
            termination,
        };

        if !rss.is_finite() {
            return report(x, rss, 0, Termination::NonFiniteCost);
        }

        for iteration in 1..=self.max_iterations {
            if rss == 0.0 {
                return report(x, rss, iteration - 1, Termination::Converged);
            }

            let jac = problem.jacobian(&x);
            let jtj = jac.tr_mul(&jac);
            let gradient = jac.tr_mul(&r);
            let scale = jtj.diagonal().map(|d| d.max(f64::MIN_POSITIVE));

            loop {
                let mut damped = jtj.clone();
                for k in 0..damped.nrows() {
                    damped[(k, k)] += damping * scale[k];
                }

                let step = damped.cholesky().map(|chol| -chol.solve(&gradient));
                if let Some(step) = step.filter(|s| s.iter().all(|v| v.is_finite())) {
                    let trial = project(&x + &step);
                    let trial_r = problem.residuals(&trial);
                    let trial_rss = trial_r.norm_squared();

                    if trial_rss.is_finite() && trial_rss < rss {
                        let improvement = (rss - trial_rss) / rss;
                        x = trial;
                        r = trial_r;
                        rss = trial_rss;
                        damping = (damping / 10.0).max(MIN_DAMPING);

                        if improvement < self.tolerance {
                            return report(x, rss, iteration, Termination::Converged);
                        }
                        break;
                    }
                }

                damping *= 10.0;
                if damping > self.max_damping {
                    return report(x, rss, iteration, Termination::Stalled);
                }
            }
        }

        report(x, rss, self.max_iterations, Termination::MaxIterations)
    }
}

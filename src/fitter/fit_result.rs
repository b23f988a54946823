//! Outcome of one blackbody fit.
//!
//! A [`FitResult`] always carries the snapshot time; its [`FitOutcome`] is either a
//! [`ConvergedFit`] or a [`FitFailure`]. Failures are ordinary values: the pipeline turns
//! them into invalid light-curve entries and diagnostics, never into errors.
use std::fmt;

use crate::{
    constants::{Centimeter, Days, Kelvin},
    planck::BlackbodyParams,
};

/// Why a fit produced no usable parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FitFailureKind {
    /// Iteration budget exhausted, or the model could not be evaluated at the start point.
    NoConvergence,
    /// Data too sparse, flat or noisy to constrain a temperature.
    DegenerateInput,
    /// The minimizer converged to a non-positive or non-finite temperature/radius.
    NonPhysicalResult,
}

impl fmt::Display for FitFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FitFailureKind::NoConvergence => "NoConvergence",
            FitFailureKind::DegenerateInput => "DegenerateInput",
            FitFailureKind::NonPhysicalResult => "NonPhysicalResult",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FitFailure {
    pub kind: FitFailureKind,
    pub detail: String,
    /// Residual sum of squares at the last accepted iterate, when one was evaluated.
    pub last_cost: Option<f64>,
}

impl fmt::Display for FitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.detail)?;
        if let Some(cost) = self.last_cost {
            write!(f, " (last RSS {cost:.3e})")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvergedFit {
    pub params: BlackbodyParams,
    /// Final residual sum of squares in the residual space of the fit.
    pub chi_square: f64,
    pub iterations: usize,
    pub points_used: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FitOutcome {
    Converged(ConvergedFit),
    Failed(FitFailure),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    pub time: Days,
    pub outcome: FitOutcome,
}

impl FitResult {
    pub fn converged(time: Days, fit: ConvergedFit) -> Self {
        FitResult {
            time,
            outcome: FitOutcome::Converged(fit),
        }
    }

    pub fn failed(time: Days, kind: FitFailureKind, detail: impl Into<String>, last_cost: Option<f64>) -> Self {
        FitResult {
            time,
            outcome: FitOutcome::Failed(FitFailure {
                kind,
                detail: detail.into(),
                last_cost,
            }),
        }
    }

    pub fn is_converged(&self) -> bool {
        matches!(self.outcome, FitOutcome::Converged(_))
    }

    pub fn params(&self) -> Option<BlackbodyParams> {
        match &self.outcome {
            FitOutcome::Converged(fit) => Some(fit.params),
            FitOutcome::Failed(_) => None,
        }
    }

    pub fn temperature(&self) -> Option<Kelvin> {
        self.params().map(|p| p.temperature)
    }

    pub fn radius(&self) -> Option<Centimeter> {
        self.params().map(|p| p.radius)
    }

    pub fn chi_square(&self) -> Option<f64> {
        match &self.outcome {
            FitOutcome::Converged(fit) => Some(fit.chi_square),
            FitOutcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&FitFailure> {
        match &self.outcome {
            FitOutcome::Converged(_) => None,
            FitOutcome::Failed(failure) => Some(failure),
        }
    }

    /// Failure cause, present iff the fit did not converge.
    pub fn failure_reason(&self) -> Option<FitFailureKind> {
        self.failure().map(|f| f.kind)
    }
}

impl fmt::Display for FitResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            FitOutcome::Converged(fit) => write!(
                f,
                "t = {:.4} d: T = {:.1} K, R = {:.3e} cm (RSS {:.3e}, {} it, {} pts)",
                self.time,
                fit.params.temperature,
                fit.params.radius,
                fit.chi_square,
                fit.iterations,
                fit.points_used
            ),
            FitOutcome::Failed(failure) => write!(f, "t = {:.4} d: {failure}", self.time),
        }
    }
}

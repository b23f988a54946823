//! # Blackbody fitting parameters
//!
//! This module defines [`FitParams`], the configuration consumed by
//! [`BlackbodyFitter`](crate::fitter::blackbody::BlackbodyFitter), and its validating
//! builder.
//!
//! ## Pipeline overview
//!
//! 1. **Point selection**
//!    Points outside the optional `fit_window` band are dropped. In log-flux residual
//!    space, points with flux ≤ `flux_floor` are dropped as well (the logarithm of an empty
//!    or noise-negative bin carries no information), and so are points below
//!    `detection_threshold` times the estimated noise level. The remaining log residuals
//!    are weighted by flux over noise.
//!
//! 2. **Degeneracy screening**
//!    Fewer than three usable points, a non-positive peak, a relative flux spread below
//!    `flatness_tolerance`, or a mean flux with a signal-to-noise ratio below
//!    `min_signal_to_noise` yield a `DegenerateInput` failure without running the solver.
//!
//! 3. **Levenberg–Marquardt**
//!    The model is fitted from a Wien-law seed, stopping when the relative improvement of
//!    the residual sum of squares falls below `tolerance`, or failing with `NoConvergence`
//!    after `max_iterations`. Optional `temperature_bounds` / `radius_bounds` are enforced
//!    by projection.
//!
//! ## Example
//!
//! ```rust
//! use lightfit::bands::BandDefinition;
//! use lightfit::fitter::{FitParams, ResidualSpace};
//!
//! let params = FitParams::builder()
//!     .tolerance(1e-12)
//!     .max_iterations(100)
//!     .residual_space(ResidualSpace::LogFlux)
//!     .fit_window(Some(BandDefinition::ztf_optical()))
//!     .build()
//!     .unwrap();
//! assert_eq!(params.max_iterations, 100);
//! ```
//!
//! ## See also
//!
//! * [`crate::fitter::blackbody::BlackbodyFitter`] – consumes these parameters.
//! * [`crate::fitter::levenberg_marquardt::LevenbergMarquardt`] – the minimizer.
//! * [`crate::fitter::fit_result::FitResult`] – fit outcome.
use std::cmp::Ordering::{Equal, Greater, Less};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    bands::BandDefinition,
    constants::{Centimeter, Kelvin},
    lightfit_errors::LightfitError,
};

pub mod blackbody;
pub mod fit_result;
pub mod levenberg_marquardt;

/// Space in which residuals between data and model are formed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResidualSpace {
    /// `ln F_model − ln F_obs`, weighted by `F / σ̂` when a noise level can be estimated.
    #[default]
    LogFlux,
    /// `(F_model − F_obs) / F_peak`: dominated by the points near the peak, keeps
    /// non-positive samples.
    Flux,
}

impl fmt::Display for ResidualSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResidualSpace::LogFlux => write!(f, "log_flux"),
            ResidualSpace::Flux => write!(f, "flux"),
        }
    }
}

/// Configuration of the blackbody fit.
///
/// Fields
/// -----------------
/// **Convergence**
/// * `tolerance` – relative RSS improvement under which an accepted step ends the fit.
/// * `max_iterations` – Levenberg–Marquardt iteration budget.
/// * `initial_damping` – starting λ of the damped normal equations.
///
/// **Data selection**
/// * `residual_space` – log-flux (default) or linear flux residuals.
/// * `flux_floor` – in log-flux space, points with flux ≤ floor are ignored.
/// * `fit_window` – optional band restricting the fitted points.
/// * `detection_threshold` – in log-flux space, points below this many noise σ are
///   ignored; `0` keeps every positive point.
///
/// **Degeneracy screening**
/// * `flatness_tolerance` – minimum `(max − min) / max` of the fitted fluxes.
/// * `min_signal_to_noise` – minimum `mean / (σ_noise / √n)`; `0` disables the check.
///
/// **Physical bounds**
/// * `temperature_bounds`, `radius_bounds` – optional `[min, max]` boxes.
///
/// Defaults
/// -----------------
/// * `tolerance`: 1e-10
/// * `max_iterations`: 200
/// * `initial_damping`: 1e-3
/// * `residual_space`: `LogFlux`
/// * `flux_floor`: 0.0
/// * `fit_window`: none
/// * `detection_threshold`: 3.0
/// * `flatness_tolerance`: 1e-6
/// * `min_signal_to_noise`: 5.0
/// * `temperature_bounds`, `radius_bounds`: none
#[derive(Debug, Clone, PartialEq)]
pub struct FitParams {
    pub tolerance: f64,
    pub max_iterations: usize,
    pub initial_damping: f64,

    pub residual_space: ResidualSpace,
    pub flux_floor: f64,
    pub fit_window: Option<BandDefinition>,
    pub detection_threshold: f64,

    pub flatness_tolerance: f64,
    pub min_signal_to_noise: f64,

    pub temperature_bounds: Option<(Kelvin, Kelvin)>,
    pub radius_bounds: Option<(Centimeter, Centimeter)>,
}

impl FitParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> FitParamsBuilder {
        FitParamsBuilder::new()
    }
}

impl Default for FitParams {
    fn default() -> Self {
        FitParams {
            tolerance: 1e-10,
            max_iterations: 200,
            initial_damping: 1e-3,

            residual_space: ResidualSpace::LogFlux,
            flux_floor: 0.0,
            fit_window: None,
            detection_threshold: 3.0,

            flatness_tolerance: 1e-6,
            min_signal_to_noise: 5.0,

            temperature_bounds: None,
            radius_bounds: None,
        }
    }
}

/// Builder for [`FitParams`], with validation.
#[derive(Debug, Clone)]
pub struct FitParamsBuilder {
    params: FitParams,
}

impl Default for FitParamsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FitParamsBuilder {
    pub fn new() -> Self {
        Self {
            params: FitParams::default(),
        }
    }

    // --- Convergence ---
    pub fn tolerance(mut self, v: f64) -> Self {
        self.params.tolerance = v;
        self
    }
    pub fn max_iterations(mut self, v: usize) -> Self {
        self.params.max_iterations = v;
        self
    }
    pub fn initial_damping(mut self, v: f64) -> Self {
        self.params.initial_damping = v;
        self
    }

    // --- Data selection ---
    pub fn residual_space(mut self, v: ResidualSpace) -> Self {
        self.params.residual_space = v;
        self
    }
    pub fn flux_floor(mut self, v: f64) -> Self {
        self.params.flux_floor = v;
        self
    }
    pub fn fit_window(mut self, v: Option<BandDefinition>) -> Self {
        self.params.fit_window = v;
        self
    }
    pub fn detection_threshold(mut self, v: f64) -> Self {
        self.params.detection_threshold = v;
        self
    }

    // --- Degeneracy ---
    pub fn flatness_tolerance(mut self, v: f64) -> Self {
        self.params.flatness_tolerance = v;
        self
    }
    pub fn min_signal_to_noise(mut self, v: f64) -> Self {
        self.params.min_signal_to_noise = v;
        self
    }

    // --- Bounds ---
    pub fn temperature_bounds(mut self, v: Option<(Kelvin, Kelvin)>) -> Self {
        self.params.temperature_bounds = v;
        self
    }
    pub fn radius_bounds(mut self, v: Option<(Centimeter, Centimeter)>) -> Self {
        self.params.radius_bounds = v;
        self
    }

    /// Return true iff x > 0.0 and comparable (i.e., not NaN).
    #[inline]
    fn gt0(x: f64) -> bool {
        x.partial_cmp(&0.0) == Some(Greater)
    }

    /// Return true iff x >= 0.0 and comparable (i.e., not NaN).
    #[inline]
    fn ge0(x: f64) -> bool {
        matches!(x.partial_cmp(&0.0), Some(Greater) | Some(Equal))
    }

    /// Return true iff a <= b and comparable (i.e., not NaN).
    #[inline]
    fn le(a: f64, b: f64) -> bool {
        matches!(a.partial_cmp(&b), Some(Less) | Some(Equal))
    }

    fn check_bounds(name: &str, bounds: Option<(f64, f64)>) -> Result<(), LightfitError> {
        match bounds {
            Some((lo, hi)) if !(Self::ge0(lo) && Self::gt0(hi) && Self::le(lo, hi)) => Err(
                LightfitError::InvalidFitParameter(format!("{name} must satisfy 0 <= min <= max, max > 0")),
            ),
            _ => Ok(()),
        }
    }

    /// Validate and produce the [`FitParams`].
    ///
    /// Validation rules
    /// -----------------
    /// * `tolerance > 0`, `initial_damping > 0`, `max_iterations ≥ 1`.
    /// * `flux_floor ≥ 0` and finite, `detection_threshold ≥ 0` and finite.
    /// * `flatness_tolerance ≥ 0`, `min_signal_to_noise ≥ 0`.
    /// * `fit_window`, when set, is a valid band.
    /// * bounds, when set, satisfy `0 ≤ min ≤ max` with `max > 0`.
    ///
    /// Returns
    /// -----------------
    /// * `Ok(FitParams)` or [`LightfitError::InvalidFitParameter`] /
    ///   [`LightfitError::InvalidBand`] naming the first offending field.
    pub fn build(self) -> Result<FitParams, LightfitError> {
        let p = &self.params;

        if !Self::gt0(p.tolerance) {
            return Err(LightfitError::InvalidFitParameter(
                "tolerance must be > 0".into(),
            ));
        }
        if !Self::gt0(p.initial_damping) {
            return Err(LightfitError::InvalidFitParameter(
                "initial_damping must be > 0".into(),
            ));
        }
        if p.max_iterations == 0 {
            return Err(LightfitError::InvalidFitParameter(
                "max_iterations must be >= 1".into(),
            ));
        }
        if !(Self::ge0(p.flux_floor) && p.flux_floor.is_finite()) {
            return Err(LightfitError::InvalidFitParameter(
                "flux_floor must be finite and >= 0".into(),
            ));
        }
        if !(Self::ge0(p.detection_threshold) && p.detection_threshold.is_finite()) {
            return Err(LightfitError::InvalidFitParameter(
                "detection_threshold must be finite and >= 0".into(),
            ));
        }
        if !Self::ge0(p.flatness_tolerance) {
            return Err(LightfitError::InvalidFitParameter(
                "flatness_tolerance must be >= 0".into(),
            ));
        }
        if !Self::ge0(p.min_signal_to_noise) {
            return Err(LightfitError::InvalidFitParameter(
                "min_signal_to_noise must be >= 0".into(),
            ));
        }
        if let Some(band) = &p.fit_window {
            band.validate()?;
        }
        Self::check_bounds("temperature_bounds", p.temperature_bounds)?;
        Self::check_bounds("radius_bounds", p.radius_bounds)?;

        Ok(self.params)
    }
}

impl fmt::Display for FitParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let window = self
            .fit_window
            .as_ref()
            .map_or_else(|| "full spectrum".to_string(), |b| b.to_string());

        if f.alternate() {
            const PARAM_COL: usize = 44;
            writeln!(f, "Blackbody Fit Parameters")?;
            writeln!(f, "------------------------")?;

            macro_rules! line {
                ($fmt:expr, $val:expr, $comment:expr) => {{
                    let s = format!($fmt, $val);
                    let pad = if s.len() < PARAM_COL {
                        " ".repeat(PARAM_COL - s.len())
                    } else {
                        " ".to_string()
                    };
                    writeln!(f, "  {}{}# {}", s, pad, $comment)
                }};
            }

            writeln!(f, "[Convergence]")?;
            line!("tolerance           = {:.1e}", self.tolerance, "Relative RSS improvement")?;
            line!("max_iterations      = {}", self.max_iterations, "Iteration budget")?;
            line!("initial_damping     = {:.1e}", self.initial_damping, "Starting LM damping")?;

            writeln!(f, "\n[Data selection]")?;
            line!("residual_space      = {}", self.residual_space, "Residual definition")?;
            line!("flux_floor          = {:.3e}", self.flux_floor, "Log-space flux floor")?;
            line!("fit_window          = {}", window, "Fitted spectral range")?;
            line!("detection_threshold = {:.2}", self.detection_threshold, "Noise σ for log-space points")?;

            writeln!(f, "\n[Degeneracy screening]")?;
            line!("flatness_tolerance  = {:.1e}", self.flatness_tolerance, "Minimum relative spread")?;
            line!("min_signal_to_noise = {:.2}", self.min_signal_to_noise, "Minimum mean-flux SNR")?;

            writeln!(f, "\n[Physical bounds]")?;
            line!("temperature_bounds  = {:?} K", self.temperature_bounds, "Box on T")?;
            line!("radius_bounds       = {:?} cm", self.radius_bounds, "Box on R")?;

            Ok(())
        } else {
            write!(
                f,
                "FitParams(tolerance={:.1e}, max_iterations={}, residual_space={}, window={})",
                self.tolerance, self.max_iterations, self.residual_space, window
            )
        }
    }
}

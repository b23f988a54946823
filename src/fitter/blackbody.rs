//! # Single-temperature blackbody fitter
//!
//! Fits `F_λ = π B_λ(λ, T) (R / D)²` to one [`SpectralSnapshot`] with the
//! [`LevenbergMarquardt`] minimizer.
//!
//! Parametrization
//! -----------------
//! The solver works on the dimensionless pair `(u, v) = (T / T₀, R / R₀)` where `(T₀, R₀)`
//! is the initial guess, so both parameters are O(1) regardless of the physical scale.
//! The Jacobian is analytic:
//!
//! ```text
//! ∂ ln F / ∂T = x eˣ / (eˣ − 1) / T      with x = hc / (λ k T)
//! ∂ ln F / ∂R = 2 / R
//! ```
//!
//! Noise weighting
//! -----------------
//! In log-flux space each residual is multiplied by `wᵢ = Fᵢ / σ̂`, where `σ̂` is the
//! [`noise_level`] of the windowed flux. For additive noise this turns `ln F` residuals
//! into flux residuals in units of the noise, so samples near the noise floor no longer
//! dominate the cost. Samples below `detection_threshold · σ̂` are left out when at least
//! [`MIN_USABLE_POINTS`] remain above it. With fewer than [`MIN_NOISE_SAMPLES`] samples no
//! noise estimate is made and the residuals stay unweighted.
//!
//! Seeding
//! -----------------
//! `T₀ = b_λ / λ_peak` (Wien displacement law on the brightest fitted sample) and
//! `R₀ = D √(F_peak / (π B_λ(λ_peak, T₀)))`, i.e. the radius matching the peak flux.
//!
//! Failures
//! -----------------
//! Expected failures are returned as [`FitResult`] values:
//! `DegenerateInput` from the screening step, `NoConvergence` when the iteration budget is
//! exhausted, `NonPhysicalResult` when the minimum lies at T ≤ 0 or R ≤ 0.
use std::sync::Arc;

use log::debug;
use nalgebra::{DMatrix, DVector};

use crate::{
    constants::{Centimeter, ConstantsRegistry},
    fitter::{
        fit_result::{ConvergedFit, FitFailureKind, FitResult},
        levenberg_marquardt::{Bounds, LeastSquaresProblem, LevenbergMarquardt, Termination},
        FitParams, ResidualSpace,
    },
    planck::{
        ln_model_flux, ln_model_gradient, model_flux, radius_from_flux,
        wien_temperature_from_wavelength, BlackbodyParams,
    },
    snapshot::SpectralSnapshot,
};

/// Minimum number of samples needed to constrain two parameters with a residual.
pub const MIN_USABLE_POINTS: usize = 3;

/// Minimum number of samples for a noise estimate from second differences.
pub const MIN_NOISE_SAMPLES: usize = 8;

/// Residuals of the blackbody model on a fixed set of samples, in scaled parameters.
struct BlackbodyProblem<'a> {
    registry: &'a ConstantsRegistry,
    wavelength: Vec<Centimeter>,
    /// Observed values in residual space: `ln F` or `F / F_peak`.
    observed: Vec<f64>,
    distance: Centimeter,
    scale: BlackbodyParams,
    space: ResidualSpace,
    peak_flux: f64,
    weights: Vec<f64>,
}

impl BlackbodyProblem<'_> {
    fn unscale(&self, p: &DVector<f64>) -> BlackbodyParams {
        BlackbodyParams {
            temperature: p[0] * self.scale.temperature,
            radius: p[1] * self.scale.radius,
        }
    }

    fn raw_residual(&self, lam: Centimeter, obs: f64, params: &BlackbodyParams) -> f64 {
        match self.space {
            ResidualSpace::LogFlux => ln_model_flux(self.registry, lam, params, self.distance) - obs,
            ResidualSpace::Flux => {
                model_flux(self.registry, lam, params, self.distance) / self.peak_flux - obs
            }
        }
    }

    /// Residual sum of squares without the noise weights.
    fn unweighted_rss(&self, p: &DVector<f64>) -> f64 {
        let params = self.unscale(p);
        self.wavelength
            .iter()
            .zip(&self.observed)
            .map(|(&lam, &obs)| self.raw_residual(lam, obs, &params).powi(2))
            .sum()
    }
}

impl LeastSquaresProblem for BlackbodyProblem<'_> {
    fn parameter_count(&self) -> usize {
        2
    }

    fn residuals(&self, p: &DVector<f64>) -> DVector<f64> {
        let params = self.unscale(p);
        DVector::from_iterator(
            self.wavelength.len(),
            self.wavelength
                .iter()
                .zip(&self.observed)
                .zip(&self.weights)
                .map(|((&lam, &obs), &w)| w * self.raw_residual(lam, obs, &params)),
        )
    }

    fn jacobian(&self, p: &DVector<f64>) -> DMatrix<f64> {
        let params = self.unscale(p);
        let reg = self.registry;
        let mut jac = DMatrix::zeros(self.wavelength.len(), 2);
        for (i, (&lam, &w)) in self.wavelength.iter().zip(&self.weights).enumerate() {
            let (d_t, d_r) = ln_model_gradient(reg, lam, &params);
            let factor = match self.space {
                ResidualSpace::LogFlux => w,
                ResidualSpace::Flux => w * model_flux(reg, lam, &params, self.distance) / self.peak_flux,
            };
            jac[(i, 0)] = factor * d_t * self.scale.temperature;
            jac[(i, 1)] = factor * d_r * self.scale.radius;
        }
        jac
    }
}

/// Fits the single-temperature model to snapshots, sharing one read-only registry.
#[derive(Debug, Clone)]
pub struct BlackbodyFitter {
    registry: Arc<ConstantsRegistry>,
    params: FitParams,
}

impl BlackbodyFitter {
    pub fn new(registry: Arc<ConstantsRegistry>, params: FitParams) -> Self {
        BlackbodyFitter { registry, params }
    }

    pub fn params(&self) -> &FitParams {
        &self.params
    }

    pub fn registry(&self) -> &ConstantsRegistry {
        &self.registry
    }

    /// Fit a snapshot starting from the Wien-law seed.
    ///
    /// Arguments
    /// -----------------
    /// * `snapshot`: Validated spectrum.
    ///
    /// Return
    /// ----------
    /// * A [`FitResult`] carrying the snapshot time and either the converged parameters or
    ///   the failure cause. This never errors: structural problems were rejected when the
    ///   snapshot was built.
    ///
    /// See also
    /// ------------
    /// * [`BlackbodyFitter::fit_with_guess`] – same fit from an explicit start point.
    /// * [`BlackbodyFitter::initial_guess`] – the seed used here.
    pub fn fit(&self, snapshot: &SpectralSnapshot) -> FitResult {
        self.run(snapshot, None)
    }

    /// Fit a snapshot starting from `guess` instead of the Wien-law seed.
    pub fn fit_with_guess(&self, snapshot: &SpectralSnapshot, guess: BlackbodyParams) -> FitResult {
        self.run(snapshot, Some(guess))
    }

    /// Wien-law seed computed on the points the fit would use, if any are usable.
    pub fn initial_guess(&self, snapshot: &SpectralSnapshot) -> Option<BlackbodyParams> {
        let (windowed_wavelength, windowed_flux) = self.windowed_points(snapshot);
        let noise = noise_level(&windowed_flux);
        let (wavelength, flux) = self.usable_points(&windowed_wavelength, &windowed_flux, noise);
        self.seed(&wavelength, &flux, snapshot.distance())
    }

    /// Samples inside the fit window (all samples when no window is set).
    fn windowed_points(&self, snapshot: &SpectralSnapshot) -> (Vec<f64>, Vec<f64>) {
        let range = self
            .params
            .fit_window
            .as_ref()
            .map(|band| band.wavelength_range_cm(&self.registry));
        snapshot
            .samples()
            .filter(|(lam, _)| range.map_or(true, |(lo, hi)| (lo..=hi).contains(lam)))
            .unzip()
    }

    /// Windowed samples that can enter the residuals.
    ///
    /// In log-flux space only positive samples above `flux_floor` qualify, and of those
    /// the ones above `detection_threshold · noise` when enough of them are left.
    fn usable_points(
        &self,
        wavelength: &[f64],
        flux: &[f64],
        noise: Option<f64>,
    ) -> (Vec<f64>, Vec<f64>) {
        let samples = wavelength.iter().copied().zip(flux.iter().copied());
        match self.params.residual_space {
            ResidualSpace::LogFlux => {
                let floor = self.params.flux_floor;
                let positive: Vec<(f64, f64)> =
                    samples.filter(|&(_, f)| f > floor && f > 0.0).collect();
                let threshold = noise.map_or(0.0, |sigma| self.params.detection_threshold * sigma);
                let detected: Vec<(f64, f64)> =
                    positive.iter().copied().filter(|&(_, f)| f > threshold).collect();
                if detected.len() >= MIN_USABLE_POINTS {
                    detected.into_iter().unzip()
                } else {
                    positive.into_iter().unzip()
                }
            }
            ResidualSpace::Flux => samples.unzip(),
        }
    }

    /// Residual weights: `F / σ̂` in log-flux space when a noise level is known, else 1.
    fn weights(&self, flux: &[f64], noise: Option<f64>) -> Vec<f64> {
        match (self.params.residual_space, noise) {
            (ResidualSpace::LogFlux, Some(sigma)) => flux.iter().map(|f| f / sigma).collect(),
            _ => vec![1.0; flux.len()],
        }
    }

    fn seed(&self, wavelength: &[f64], flux: &[f64], distance: Centimeter) -> Option<BlackbodyParams> {
        let (idx, &peak) = flux
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))?;
        if peak <= 0.0 {
            return None;
        }
        let temperature = wien_temperature_from_wavelength(&self.registry, wavelength[idx]);
        let radius = radius_from_flux(&self.registry, wavelength[idx], peak, temperature, distance);
        let guess = BlackbodyParams {
            temperature,
            radius,
        };
        (guess.temperature.is_finite()
            && guess.temperature > 0.0
            && guess.radius.is_finite()
            && guess.radius > 0.0)
            .then_some(guess)
    }

    /// Screening run before the solver. Returns the reason when the data cannot
    /// constrain a temperature.
    fn degeneracy(
        &self,
        windowed_flux: &[f64],
        usable_flux: &[f64],
        noise: Option<f64>,
    ) -> Option<String> {
        if usable_flux.len() < MIN_USABLE_POINTS {
            return Some(format!(
                "only {} usable points, at least {MIN_USABLE_POINTS} required",
                usable_flux.len()
            ));
        }

        let max = usable_flux.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = usable_flux.iter().copied().fold(f64::INFINITY, f64::min);
        if max <= 0.0 {
            return Some(format!("non-positive peak flux {max:e}"));
        }
        let spread = (max - min) / max;
        if spread < self.params.flatness_tolerance {
            return Some(format!("flat spectrum (relative spread {spread:.3e})"));
        }

        if self.params.min_signal_to_noise > 0.0 {
            if let Some(snr) = noise.map(|sigma| signal_to_noise(windowed_flux, sigma)) {
                if snr < self.params.min_signal_to_noise {
                    return Some(format!("mean flux indistinguishable from noise (SNR {snr:.2})"));
                }
            }
        }
        None
    }

    fn run(&self, snapshot: &SpectralSnapshot, guess: Option<BlackbodyParams>) -> FitResult {
        let time = snapshot.time();
        let (windowed_wavelength, windowed_flux) = self.windowed_points(snapshot);
        let noise = noise_level(&windowed_flux);
        let (wavelength, flux) = self.usable_points(&windowed_wavelength, &windowed_flux, noise);

        if let Some(reason) = self.degeneracy(&windowed_flux, &flux, noise) {
            debug!("{}: degenerate input: {reason}", snapshot.label());
            return FitResult::failed(time, FitFailureKind::DegenerateInput, reason, None);
        }

        let seed = match guess.or_else(|| self.seed(&wavelength, &flux, snapshot.distance())) {
            Some(seed) if seed.temperature != 0.0 && seed.radius != 0.0 => seed,
            _ => {
                return FitResult::failed(
                    time,
                    FitFailureKind::DegenerateInput,
                    "no usable initial guess",
                    None,
                )
            }
        };

        let peak_flux = flux.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let observed: Vec<f64> = match self.params.residual_space {
            ResidualSpace::LogFlux => flux.iter().map(|f| f.ln()).collect(),
            ResidualSpace::Flux => flux.iter().map(|f| f / peak_flux).collect(),
        };
        let points_used = wavelength.len();
        let weights = self.weights(&flux, noise);

        let problem = BlackbodyProblem {
            registry: &self.registry,
            wavelength,
            observed,
            distance: snapshot.distance(),
            scale: seed,
            space: self.params.residual_space,
            peak_flux,
            weights,
        };

        let bounds = self.scaled_bounds(&seed);
        let solver = LevenbergMarquardt::new(self.params.tolerance, self.params.max_iterations)
            .with_initial_damping(self.params.initial_damping);
        let report = solver.minimize(&problem, DVector::from_vec(vec![1.0, 1.0]), bounds.as_ref());

        debug!(
            "{}: LM stopped after {} iterations ({:?}), RSS = {:.3e}",
            snapshot.label(),
            report.iterations,
            report.termination,
            report.residual_sum_of_squares
        );

        match report.termination {
            Termination::NonFiniteCost => {
                return FitResult::failed(
                    time,
                    FitFailureKind::NoConvergence,
                    "model not finite at the initial guess",
                    None,
                )
            }
            Termination::MaxIterations => {
                return FitResult::failed(
                    time,
                    FitFailureKind::NoConvergence,
                    format!("no convergence after {} iterations", report.iterations),
                    Some(problem.unweighted_rss(&report.params)),
                )
            }
            Termination::Converged | Termination::Stalled => {}
        }

        let params = problem.unscale(&report.params);
        let chi_square = problem.unweighted_rss(&report.params);
        let physical = params.temperature.is_finite()
            && params.temperature > 0.0
            && params.radius.is_finite()
            && params.radius > 0.0;
        if !physical {
            return FitResult::failed(
                time,
                FitFailureKind::NonPhysicalResult,
                format!(
                    "converged to T = {:e} K, R = {:e} cm",
                    params.temperature, params.radius
                ),
                Some(chi_square),
            );
        }

        FitResult::converged(
            time,
            ConvergedFit {
                params,
                chi_square,
                iterations: report.iterations,
                points_used,
            },
        )
    }

    /// Physical bounds expressed on the scaled parameters `(T / T₀, R / R₀)`.
    fn scaled_bounds(&self, seed: &BlackbodyParams) -> Option<Bounds> {
        let t = self.params.temperature_bounds;
        let r = self.params.radius_bounds;
        if t.is_none() && r.is_none() {
            return None;
        }
        let scale = |bounds: Option<(f64, f64)>, s: f64| match bounds {
            // seeds are positive except for explicit guesses
            Some((lo, hi)) if s > 0.0 => (lo / s, hi / s),
            Some((lo, hi)) => (hi / s, lo / s),
            None => (f64::NEG_INFINITY, f64::INFINITY),
        };
        let (t_lo, t_hi) = scale(t, seed.temperature);
        let (r_lo, r_hi) = scale(r, seed.radius);
        Bounds::new(vec![t_lo, r_lo], vec![t_hi, r_hi]).ok()
    }
}

/// Robust noise level of a flux sequence from its second differences.
///
/// `σ̂ = 1.4826 · median|f[i−1] − 2f[i] + f[i+1]| / √6`, which ignores the smooth part of
/// the spectrum. Returns `None` below [`MIN_NOISE_SAMPLES`] samples, where the median of
/// the second differences still follows the shape of the spectrum, or when the estimate is
/// zero (noise-free data).
pub fn noise_level(flux: &[f64]) -> Option<f64> {
    if flux.len() < MIN_NOISE_SAMPLES {
        return None;
    }
    let mut second_diff: Vec<f64> = flux
        .windows(3)
        .map(|w| (w[0] - 2.0 * w[1] + w[2]).abs())
        .collect();
    second_diff.sort_by(f64::total_cmp);
    let mid = second_diff.len() / 2;
    let median = if second_diff.len() % 2 == 0 {
        0.5 * (second_diff[mid - 1] + second_diff[mid])
    } else {
        second_diff[mid]
    };

    let sigma = 1.4826 * median / 6f64.sqrt();
    (sigma > 0.0).then_some(sigma)
}

fn signal_to_noise(flux: &[f64], sigma: f64) -> f64 {
    let n = flux.len() as f64;
    let mean = flux.iter().sum::<f64>() / n;
    mean / (sigma / n.sqrt())
}

/// Signal-to-noise ratio of the mean flux, `mean / (σ̂ / √n)` with `σ̂` from
/// [`noise_level`].
pub fn mean_signal_to_noise(flux: &[f64]) -> Option<f64> {
    noise_level(flux).map(|sigma| signal_to_noise(flux, sigma))
}

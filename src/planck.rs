//! # Single-temperature thermal-emission model
//!
//! Planck-function helpers used by the fitter (model and Jacobian), by the physics
//! engine (band integrals) and by the synthetic snapshot generator.
//!
//! ## Model
//!
//! The flux density received at distance `D` from a sphere of radius `R` radiating as a
//! blackbody of temperature `T` is
//!
//! ```text
//! F_λ(λ) = π · B_λ(λ, T) · (R / D)²
//! B_λ(λ, T) = (2hc² / λ⁵) / (exp(hc / λkT) − 1)
//! ```
//!
//! so that `4πD² ∫F_λ dλ = 4πR²σT⁴`.
//!
//! All evaluations go through the logarithm (`ln B_λ`) to stay finite deep in the Wien
//! tail, where `exp(hc/λkT)` overflows long before the flux becomes irrelevant for a
//! log-space fit.
use std::f64::consts::PI;

use crate::constants::{Centimeter, ConstantsRegistry, Hertz, Kelvin};

/// Blackbody parameters of one fitted snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlackbodyParams {
    pub temperature: Kelvin,
    pub radius: Centimeter,
}

/// `ln(eˣ − 1)` without overflow for large `x` nor cancellation for small `x`.
#[inline]
pub fn ln_expm1(x: f64) -> f64 {
    if x > 30.0 {
        x + (-(-x).exp()).ln_1p()
    } else {
        x.exp_m1().ln()
    }
}

/// `x eˣ / (eˣ − 1)`, the logarithmic derivative factor of the Planck function.
#[inline]
fn planck_log_slope(x: f64) -> f64 {
    if x > 700.0 {
        x
    } else {
        x / -(-x).exp_m1()
    }
}

/// Dimensionless photon energy `x = hc / (λ k T)`.
#[inline]
pub fn reduced_energy(reg: &ConstantsRegistry, wavelength: Centimeter, temperature: Kelvin) -> f64 {
    reg.hc_over_k() / (wavelength * temperature)
}

/// `ln B_λ(λ, T)` in erg s⁻¹ cm⁻² cm⁻¹ sr⁻¹. Returns `-inf` for `T ≤ 0`.
pub fn ln_planck_lambda(reg: &ConstantsRegistry, wavelength: Centimeter, temperature: Kelvin) -> f64 {
    if temperature <= 0.0 || !temperature.is_finite() {
        return f64::NEG_INFINITY;
    }
    let c = reg.speed_of_light();
    let x = reduced_energy(reg, wavelength, temperature);
    (2.0 * reg.planck() * c * c).ln() - 5.0 * wavelength.ln() - ln_expm1(x)
}

/// Planck spectral radiance per unit wavelength, B_λ(λ, T).
#[inline]
pub fn planck_lambda(reg: &ConstantsRegistry, wavelength: Centimeter, temperature: Kelvin) -> f64 {
    ln_planck_lambda(reg, wavelength, temperature).exp()
}

/// Planck spectral radiance per unit frequency, B_ν(ν, T).
pub fn planck_nu(reg: &ConstantsRegistry, frequency: Hertz, temperature: Kelvin) -> f64 {
    if temperature <= 0.0 || !temperature.is_finite() {
        return 0.0;
    }
    let c = reg.speed_of_light();
    let x = reg.planck() * frequency / (reg.boltzmann() * temperature);
    let ln_b = (2.0 * reg.planck() / (c * c)).ln() + 3.0 * frequency.ln() - ln_expm1(x);
    ln_b.exp()
}

/// Geometric dilution factor `π (R / D)²` between radiance and received flux.
#[inline]
pub fn dilution(radius: Centimeter, distance: Centimeter) -> f64 {
    PI * (radius / distance).powi(2)
}

/// `ln F_λ` of the model at one wavelength.
#[inline]
pub fn ln_model_flux(
    reg: &ConstantsRegistry,
    wavelength: Centimeter,
    params: &BlackbodyParams,
    distance: Centimeter,
) -> f64 {
    ln_planck_lambda(reg, wavelength, params.temperature) + dilution(params.radius, distance).ln()
}

/// Model flux density F_λ at one wavelength (erg s⁻¹ cm⁻² cm⁻¹).
#[inline]
pub fn model_flux(
    reg: &ConstantsRegistry,
    wavelength: Centimeter,
    params: &BlackbodyParams,
    distance: Centimeter,
) -> f64 {
    if params.temperature <= 0.0 {
        return 0.0;
    }
    ln_model_flux(reg, wavelength, params, distance).exp()
}

/// Partial derivatives of `ln F_λ` with respect to `(T, R)`.
///
/// `∂lnF/∂T = x eˣ / (eˣ − 1) / T` and `∂lnF/∂R = 2 / R`.
#[inline]
pub fn ln_model_gradient(
    reg: &ConstantsRegistry,
    wavelength: Centimeter,
    params: &BlackbodyParams,
) -> (f64, f64) {
    let x = reduced_energy(reg, wavelength, params.temperature);
    (
        planck_log_slope(x) / params.temperature,
        2.0 / params.radius,
    )
}

/// Colour temperature from the wavelength of peak F_λ (Wien displacement law).
#[inline]
pub fn wien_temperature_from_wavelength(reg: &ConstantsRegistry, peak: Centimeter) -> Kelvin {
    reg.wien_lambda() / peak
}

/// Colour temperature from the frequency of peak F_ν (Wien displacement law).
#[inline]
pub fn wien_temperature_from_frequency(reg: &ConstantsRegistry, peak: Hertz) -> Kelvin {
    peak / reg.wien_nu()
}

/// Radius reproducing a flux `flux` at `wavelength` for temperature `temperature`:
/// `R = D √(F / (π B_λ))`.
pub fn radius_from_flux(
    reg: &ConstantsRegistry,
    wavelength: Centimeter,
    flux: f64,
    temperature: Kelvin,
    distance: Centimeter,
) -> Centimeter {
    let ln_ratio = flux.ln() - PI.ln() - ln_planck_lambda(reg, wavelength, temperature);
    distance * (0.5 * ln_ratio).exp()
}

#[cfg(test)]
mod planck_test {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_ln_expm1_regimes() {
        assert_relative_eq!(ln_expm1(1e-8), (1e-8f64).ln(), max_relative = 1e-7);
        assert_relative_eq!(ln_expm1(1.0), (1f64.exp() - 1.0).ln(), max_relative = 1e-14);
        assert_relative_eq!(ln_expm1(800.0), 800.0, max_relative = 1e-15);
    }

    #[test]
    fn test_planck_lambda_peak() {
        let reg = ConstantsRegistry::cgs();
        let t = 3.0e4;
        let peak = reg.wien_lambda() / t;
        let b_peak = planck_lambda(&reg, peak, t);
        assert!(b_peak > planck_lambda(&reg, peak * 0.98, t));
        assert!(b_peak > planck_lambda(&reg, peak * 1.02, t));
    }

    #[test]
    fn test_planck_nu_lambda_consistency() {
        // B_λ = B_ν c / λ²
        let reg = ConstantsRegistry::cgs();
        let t = 1.5e4;
        let lam = 2.5e-5;
        let nu = reg.speed_of_light() / lam;
        assert_relative_eq!(
            planck_lambda(&reg, lam, t),
            planck_nu(&reg, nu, t) * reg.speed_of_light() / (lam * lam),
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_wien_tail_is_finite_in_log() {
        let reg = ConstantsRegistry::cgs();
        let ln_b = ln_planck_lambda(&reg, 1e-9, 1e3);
        assert!(ln_b.is_finite());
        assert_eq!(planck_lambda(&reg, 1e-9, 1e3), 0.0);
        assert_eq!(ln_planck_lambda(&reg, 1e-5, 0.0), f64::NEG_INFINITY);
        assert_eq!(planck_nu(&reg, 1e15, -1.0), 0.0);
    }

    #[test]
    fn test_gradient_matches_finite_difference() {
        let reg = ConstantsRegistry::cgs();
        let params = BlackbodyParams {
            temperature: 2.0e4,
            radius: 1.0e14,
        };
        let lam = 3.0e-5;
        let d = 1.0e26;
        let (d_t, d_r) = ln_model_gradient(&reg, lam, &params);

        let h_t = params.temperature * 1e-6;
        let up = BlackbodyParams {
            temperature: params.temperature + h_t,
            ..params
        };
        let down = BlackbodyParams {
            temperature: params.temperature - h_t,
            ..params
        };
        let fd_t = (ln_model_flux(&reg, lam, &up, d) - ln_model_flux(&reg, lam, &down, d)) / (2.0 * h_t);
        assert_relative_eq!(d_t, fd_t, max_relative = 1e-6);

        let h_r = params.radius * 1e-6;
        let up = BlackbodyParams {
            radius: params.radius + h_r,
            ..params
        };
        let down = BlackbodyParams {
            radius: params.radius - h_r,
            ..params
        };
        let fd_r = (ln_model_flux(&reg, lam, &up, d) - ln_model_flux(&reg, lam, &down, d)) / (2.0 * h_r);
        assert_relative_eq!(d_r, fd_r, max_relative = 1e-6);
    }

    #[test]
    fn test_radius_from_flux_inverts_model() {
        let reg = ConstantsRegistry::cgs();
        let params = BlackbodyParams {
            temperature: 4.0e4,
            radius: 7.0e14,
        };
        let d = 3.0e26;
        let lam = 1.2e-5;
        let flux = model_flux(&reg, lam, &params, d);
        assert_relative_eq!(
            radius_from_flux(&reg, lam, flux, params.temperature, d),
            params.radius,
            max_relative = 1e-12
        );
    }
}

//! # Physics engine: luminosities from fitted blackbody parameters
//!
//! Turns a [`FitResult`] into [`DerivedLuminosities`]:
//!
//! * **Bolometric luminosity**, closed form: `L_bol = 4π R² σ T⁴`.
//! * **Band luminosity**, integrated numerically on the *model* (never on the data):
//!
//! ```text
//! L_band = 4π² R² ∫_band B_λ(λ, T) dλ
//!        = 4π² R² · (2 k⁴ T⁴ / h³c²) · ∫_{x_hi}^{x_lo} x³ / (eˣ − 1) dx,   x = hc / (λ k T)
//! ```
//!
//! The dimensionless form keeps the integrand O(1) for any temperature. Integration over
//! the whole spectrum gives `π⁴/15` and reproduces `L_bol`.
//!
//! Besides its primary band the engine can carry extra bands
//! ([`PhysicsEngine::with_extra_bands`]); each one adds a [`BandLuminosity`] to every
//! derived entry, e.g. an optical band next to the X-ray one.
//!
//! Units
//! -----------------
//! Inputs in K and cm, outputs in erg s⁻¹.
//!
//! See also
//! -----------------
//! * [`crate::physics::quadrature`] – adaptive Simpson integrator.
//! * [`crate::bands::BandDefinition`] – band bounds and unit handling.
use std::{f64::consts::PI, sync::Arc};

use crate::{
    bands::BandDefinition,
    constants::{Centimeter, ConstantsRegistry, Days, ErgPerSec, Kelvin},
    fitter::fit_result::FitResult,
    planck::{wien_temperature_from_wavelength, BlackbodyParams},
    snapshot::SpectralSnapshot,
};

pub mod quadrature;

use quadrature::adaptive_simpson;

/// Default relative accuracy of band integrals.
pub const BAND_REL_TOL: f64 = 1e-10;

/// Upper limit of the dimensionless integration variable; `x³/(eˣ−1)` underflows past it.
const X_MAX: f64 = 700.0;

/// Luminosity in one named band.
#[derive(Debug, Clone, PartialEq)]
pub struct BandLuminosity {
    pub band: String,
    pub luminosity: ErgPerSec,
}

/// Luminosities derived from one fit. Invalid entries carry zeros in every numeric field.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedLuminosities {
    pub time: Days,
    pub bolometric_luminosity: ErgPerSec,
    pub band: String,
    pub band_luminosity: ErgPerSec,
    pub temperature: Kelvin,
    pub radius: Centimeter,
    pub valid: bool,
    /// Luminosities in the engine's extra bands, in configuration order.
    pub extra_bands: Vec<BandLuminosity>,
}

impl DerivedLuminosities {
    /// Gap marker for a snapshot whose fit did not converge.
    pub fn gap(time: Days, band: impl Into<String>) -> Self {
        DerivedLuminosities {
            time,
            bolometric_luminosity: 0.0,
            band: band.into(),
            band_luminosity: 0.0,
            temperature: 0.0,
            radius: 0.0,
            valid: false,
            extra_bands: Vec::new(),
        }
    }

    /// `L_bol / L_band`, the bolometric correction of the primary band.
    pub fn bolometric_to_band_ratio(&self) -> Option<f64> {
        (self.valid && self.band_luminosity > 0.0)
            .then(|| self.bolometric_luminosity / self.band_luminosity)
    }

    /// Luminosity in `band`, primary or extra.
    pub fn luminosity_in(&self, band: &str) -> Option<ErgPerSec> {
        if self.band == band {
            return Some(self.band_luminosity);
        }
        self.extra_bands
            .iter()
            .find(|b| b.band == band)
            .map(|b| b.luminosity)
    }
}

#[derive(Debug, Clone)]
pub struct PhysicsEngine {
    registry: Arc<ConstantsRegistry>,
    band: BandDefinition,
    extra_bands: Vec<BandDefinition>,
    rel_tol: f64,
}

impl PhysicsEngine {
    pub fn new(registry: Arc<ConstantsRegistry>, band: BandDefinition) -> Self {
        PhysicsEngine {
            registry,
            band,
            extra_bands: Vec::new(),
            rel_tol: BAND_REL_TOL,
        }
    }

    /// Also integrate `bands` for every derived entry.
    pub fn with_extra_bands(mut self, bands: Vec<BandDefinition>) -> Self {
        self.extra_bands = bands;
        self
    }

    pub fn extra_bands(&self) -> &[BandDefinition] {
        &self.extra_bands
    }

    pub fn with_tolerance(mut self, rel_tol: f64) -> Self {
        self.rel_tol = rel_tol;
        self
    }

    pub fn band(&self) -> &BandDefinition {
        &self.band
    }

    /// `L_bol = 4π R² σ T⁴`.
    pub fn bolometric_luminosity(&self, params: &BlackbodyParams) -> ErgPerSec {
        4.0 * PI
            * params.radius.powi(2)
            * self.registry.stefan_boltzmann()
            * params.temperature.powi(4)
    }

    /// `∫ B_λ(λ, T) dλ` over `[lower, upper]` (cm). `lower` may be 0 and `upper` infinite.
    ///
    /// Arguments
    /// -----------------
    /// * `lower`, `upper`: Wavelength interval in cm, `0 ≤ lower ≤ upper`.
    /// * `temperature`: Blackbody temperature in K.
    ///
    /// Return
    /// ----------
    /// * The wavelength-integrated radiance in erg s⁻¹ cm⁻² sr⁻¹, 0 for an empty
    ///   interval or a non-positive temperature.
    pub fn planck_integral(&self, lower: Centimeter, upper: Centimeter, temperature: Kelvin) -> f64 {
        if !(temperature > 0.0) || !(upper > lower) {
            return 0.0;
        }
        let reg = self.registry.as_ref();
        let hc_kt = reg.hc_over_k() / temperature;

        // short wavelengths map to large x
        let x_hi = if lower > 0.0 { (hc_kt / lower).min(X_MAX) } else { X_MAX };
        let x_lo = (hc_kt / upper).min(X_MAX);
        if x_lo >= x_hi {
            return 0.0;
        }

        let kernel = |x: f64| {
            if x <= 0.0 {
                0.0
            } else {
                x.powi(3) / x.exp_m1()
            }
        };
        let integral = adaptive_simpson(kernel, x_lo, x_hi, self.rel_tol);

        let kt = reg.boltzmann() * temperature;
        let c = reg.speed_of_light();
        2.0 * kt.powi(4) / (reg.planck().powi(3) * c * c) * integral
    }

    /// Luminosity emitted between two wavelengths (cm): `4π² R² ∫ B_λ dλ`.
    pub fn interval_luminosity(
        &self,
        params: &BlackbodyParams,
        lower: Centimeter,
        upper: Centimeter,
    ) -> ErgPerSec {
        4.0 * PI * PI
            * params.radius.powi(2)
            * self.planck_integral(lower, upper, params.temperature)
    }

    /// Luminosity emitted inside `band`.
    pub fn band_luminosity(&self, params: &BlackbodyParams, band: &BandDefinition) -> ErgPerSec {
        let (lower, upper) = band.wavelength_range_cm(&self.registry);
        self.interval_luminosity(params, lower, upper)
    }

    /// Radius of a blackbody of temperature `T` emitting `L`: `R = √(L / 4πσT⁴)`.
    pub fn effective_radius(&self, luminosity: ErgPerSec, temperature: Kelvin) -> Centimeter {
        (luminosity / (4.0 * PI * self.registry.stefan_boltzmann() * temperature.powi(4))).sqrt()
    }

    /// Colour temperature of a snapshot from the wavelength of its brightest sample.
    pub fn colour_temperature(&self, snapshot: &SpectralSnapshot) -> Option<Kelvin> {
        let (_, peak, flux) = snapshot.peak();
        (flux > 0.0).then(|| wien_temperature_from_wavelength(&self.registry, peak))
    }

    /// Luminosities of one fit in the engine's bands; a gap entry when the fit failed.
    pub fn derive(&self, fit: &FitResult) -> DerivedLuminosities {
        let Some(params) = fit.params() else {
            let mut gap = DerivedLuminosities::gap(fit.time, self.band.name.clone());
            gap.extra_bands = self
                .extra_bands
                .iter()
                .map(|b| BandLuminosity {
                    band: b.name.clone(),
                    luminosity: 0.0,
                })
                .collect();
            return gap;
        };
        DerivedLuminosities {
            time: fit.time,
            bolometric_luminosity: self.bolometric_luminosity(&params),
            band: self.band.name.clone(),
            band_luminosity: self.band_luminosity(&params, &self.band),
            temperature: params.temperature,
            radius: params.radius,
            valid: true,
            extra_bands: self
                .extra_bands
                .iter()
                .map(|b| BandLuminosity {
                    band: b.name.clone(),
                    luminosity: self.band_luminosity(&params, b),
                })
                .collect(),
        }
    }
}

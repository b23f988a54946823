//! # Constants and type definitions for Lightfit
//!
//! This module centralizes the **physical constants**, **conversion factors**, and the
//! read-only [`ConstantsRegistry`] injected into every numerical component of the crate
//! (snapshot loader, blackbody fitter, physics engine).
//!
//! ## Overview
//!
//! - CGS physical constants (Planck, Boltzmann, Stefan–Boltzmann, speed of light)
//! - Wien displacement constants in wavelength and frequency form
//! - Unit conversions (keV ↔ erg, cm ↔ nm, seconds ↔ days)
//! - [`SimulationUnits`], the scale factors between simulation-native units and CGS
//! - Type aliases documenting the unit carried by an `f64`
//!
//! ## Registry lifecycle
//!
//! A [`ConstantsRegistry`] is built **once**, explicitly, and then only shared by
//! reference (typically behind an [`Arc`](std::sync::Arc)). It exposes no mutating
//! method. For callers that do not care about simulation units, a process-wide CGS
//! instance is available through [`ConstantsRegistry::global`]; it is initialized
//! lazily on first access and never written afterwards.
//!
//! ```rust
//! use lightfit::constants::{ConstantsRegistry, SimulationUnits};
//!
//! let units = SimulationUnits {
//!     time_to_seconds: 1.0,
//!     length_to_cm: 3.085_677_581e18, // parsec
//!     flux_to_cgs: 1.0,
//! };
//! let registry = ConstantsRegistry::with_units(units);
//! assert_eq!(registry.units().length_to_cm, 3.085_677_581e18);
//! ```
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::lightfit_errors::LightfitError;

// -------------------------------------------------------------------------------------------------
// Physical constants (CGS)
// -------------------------------------------------------------------------------------------------

/// Boltzmann constant in erg / K
pub const BOLTZMANN: f64 = 1.380_649e-16;

/// Planck constant in erg·s
pub const PLANCK: f64 = 6.626_070_15e-27;

/// Stefan–Boltzmann constant in erg / (cm²·K⁴·s)
pub const STEFAN_BOLTZMANN: f64 = 5.670_374_419e-5;

/// Speed of light in cm / s
pub const SPEED_OF_LIGHT: f64 = 2.997_924_58e10;

/// Wien displacement constant for the peak of B_λ, in cm·K
pub const WIEN_LAMBDA: f64 = 0.289_777_195_5;

/// Wien displacement constant for the peak of B_ν, in Hz / K
pub const WIEN_NU: f64 = 5.878_925_757e10;

// -------------------------------------------------------------------------------------------------
// Unit conversions
// -------------------------------------------------------------------------------------------------

/// erg per keV
pub const KEV_TO_ERG: f64 = 1.602_176_634e-9;

/// nm per cm
pub const CM_TO_NM: f64 = 1e7;

/// Number of seconds in a day
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Astronomical Unit in cm
pub const AU_CM: f64 = 1.495_978_707e13;

/// Solar luminosity in erg / s
pub const L_SUN: f64 = 3.846e33;

/// Frequency (Hz) of a 1 keV photon
pub const KEV_TO_HZ: f64 = KEV_TO_ERG / PLANCK;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Temperature in Kelvin
pub type Kelvin = f64;
/// Length in centimeters
pub type Centimeter = f64;
/// Length in nanometers
pub type Nanometer = f64;
/// Frequency in Hertz
pub type Hertz = f64;
/// Photon energy in keV
pub type KeV = f64;
/// Luminosity in erg / s
pub type ErgPerSec = f64;
/// Time in days
pub type Days = f64;

// -------------------------------------------------------------------------------------------------
// Registry
// -------------------------------------------------------------------------------------------------

/// Scale factors converting simulation-native quantities to CGS.
///
/// Every factor multiplies a raw simulation value:
///
/// * `time_to_seconds` – simulation time unit → s (the loader then converts to days),
/// * `length_to_cm` – simulation length unit → cm (applied to the snapshot distance),
/// * `flux_to_cgs` – simulation flux unit → erg s⁻¹ cm⁻² per spectral unit.
///
/// The default is the identity (the simulation already writes CGS).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationUnits {
    pub time_to_seconds: f64,
    pub length_to_cm: f64,
    pub flux_to_cgs: f64,
}

impl Default for SimulationUnits {
    fn default() -> Self {
        SimulationUnits {
            time_to_seconds: 1.0,
            length_to_cm: 1.0,
            flux_to_cgs: 1.0,
        }
    }
}

impl SimulationUnits {
    /// Check that every factor is finite and strictly positive.
    pub fn validate(&self) -> Result<(), LightfitError> {
        let factors = [
            ("time_to_seconds", self.time_to_seconds),
            ("length_to_cm", self.length_to_cm),
            ("flux_to_cgs", self.flux_to_cgs),
        ];
        for (name, value) in factors {
            if !(value.is_finite() && value > 0.0) {
                return Err(LightfitError::InvalidConfig(format!(
                    "simulation unit factor {name} must be finite and > 0, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Read-only set of physical constants and unit conversions.
///
/// Fields are private; the registry is built through [`ConstantsRegistry::cgs`] or
/// [`ConstantsRegistry::with_units`] and never mutated afterwards, so sharing it across
/// worker threads needs no synchronization.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantsRegistry {
    stefan_boltzmann: f64,
    speed_of_light: f64,
    planck: f64,
    boltzmann: f64,
    wien_lambda: f64,
    wien_nu: f64,
    kev_to_erg: f64,
    cm_to_nm: f64,
    seconds_per_day: f64,
    units: SimulationUnits,
}

static GLOBAL_CGS: LazyLock<ConstantsRegistry> = LazyLock::new(ConstantsRegistry::cgs);

impl Default for ConstantsRegistry {
    fn default() -> Self {
        Self::cgs()
    }
}

impl ConstantsRegistry {
    /// Registry holding CGS constants and identity simulation units.
    pub fn cgs() -> Self {
        Self::with_units(SimulationUnits::default())
    }

    /// Registry holding CGS constants and the given simulation unit factors.
    pub fn with_units(units: SimulationUnits) -> Self {
        ConstantsRegistry {
            stefan_boltzmann: STEFAN_BOLTZMANN,
            speed_of_light: SPEED_OF_LIGHT,
            planck: PLANCK,
            boltzmann: BOLTZMANN,
            wien_lambda: WIEN_LAMBDA,
            wien_nu: WIEN_NU,
            kev_to_erg: KEV_TO_ERG,
            cm_to_nm: CM_TO_NM,
            seconds_per_day: SECONDS_PER_DAY,
            units,
        }
    }

    /// Process-wide CGS registry, initialized on first access.
    pub fn global() -> &'static ConstantsRegistry {
        &GLOBAL_CGS
    }

    #[inline]
    pub fn stefan_boltzmann(&self) -> f64 {
        self.stefan_boltzmann
    }

    #[inline]
    pub fn speed_of_light(&self) -> f64 {
        self.speed_of_light
    }

    #[inline]
    pub fn planck(&self) -> f64 {
        self.planck
    }

    #[inline]
    pub fn boltzmann(&self) -> f64 {
        self.boltzmann
    }

    #[inline]
    pub fn wien_lambda(&self) -> f64 {
        self.wien_lambda
    }

    #[inline]
    pub fn wien_nu(&self) -> f64 {
        self.wien_nu
    }

    #[inline]
    pub fn kev_to_erg(&self) -> f64 {
        self.kev_to_erg
    }

    #[inline]
    pub fn cm_to_nm(&self) -> f64 {
        self.cm_to_nm
    }

    #[inline]
    pub fn seconds_per_day(&self) -> f64 {
        self.seconds_per_day
    }

    #[inline]
    pub fn units(&self) -> &SimulationUnits {
        &self.units
    }

    /// `hc / k`, the second radiation constant, in cm·K.
    #[inline]
    pub fn hc_over_k(&self) -> f64 {
        self.planck * self.speed_of_light / self.boltzmann
    }

    /// Convert a raw simulation time to days.
    #[inline]
    pub fn sim_time_to_days(&self, time: f64) -> Days {
        time * self.units.time_to_seconds / self.seconds_per_day
    }

    /// Convert a raw simulation length to cm.
    #[inline]
    pub fn sim_length_to_cm(&self, length: f64) -> Centimeter {
        length * self.units.length_to_cm
    }

    /// Convert a raw simulation flux value to CGS.
    #[inline]
    pub fn sim_flux_to_cgs(&self, flux: f64) -> f64 {
        flux * self.units.flux_to_cgs
    }

    /// Stefan–Boltzmann constant recomputed from h, k and c: `2π⁵k⁴ / (15h³c²)`.
    ///
    /// Used by consistency checks between closed-form and integrated luminosities.
    pub fn stefan_boltzmann_from_planck(&self) -> f64 {
        let pi5 = std::f64::consts::PI.powi(5);
        2.0 * pi5 * self.boltzmann.powi(4)
            / (15.0 * self.planck.powi(3) * self.speed_of_light.powi(2))
    }
}

#[cfg(test)]
mod constants_test {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_stefan_boltzmann_consistency() {
        let reg = ConstantsRegistry::cgs();
        assert_relative_eq!(
            reg.stefan_boltzmann_from_planck(),
            reg.stefan_boltzmann(),
            max_relative = 1e-8
        );
    }

    #[test]
    fn test_wien_constants_match_radiation_constant() {
        // x_peak of x^5/(e^x-1) is 4.965114231744276, of x^3/(e^x-1) is 2.821439372122079
        let reg = ConstantsRegistry::cgs();
        assert_relative_eq!(
            reg.hc_over_k() / 4.965_114_231_744_276,
            reg.wien_lambda(),
            max_relative = 1e-8
        );
        assert_relative_eq!(
            2.821_439_372_122_079 * reg.boltzmann() / reg.planck(),
            reg.wien_nu(),
            max_relative = 1e-8
        );
    }

    #[test]
    fn test_simulation_unit_conversion() {
        let reg = ConstantsRegistry::with_units(SimulationUnits {
            time_to_seconds: 3600.0,
            length_to_cm: 1e5,
            flux_to_cgs: 2.0,
        });
        assert_relative_eq!(reg.sim_time_to_days(48.0), 2.0);
        assert_relative_eq!(reg.sim_length_to_cm(3.0), 3e5);
        assert_relative_eq!(reg.sim_flux_to_cgs(4.0), 8.0);
    }

    #[test]
    fn test_invalid_units_rejected() {
        let units = SimulationUnits {
            time_to_seconds: 0.0,
            ..SimulationUnits::default()
        };
        assert!(matches!(
            units.validate(),
            Err(LightfitError::InvalidConfig(_))
        ));
        assert!(SimulationUnits::default().validate().is_ok());
    }

    #[test]
    fn test_global_is_cgs() {
        assert_eq!(ConstantsRegistry::global(), &ConstantsRegistry::cgs());
    }
}

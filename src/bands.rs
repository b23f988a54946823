//! # Spectral bands
//!
//! A [`BandDefinition`] names a restricted spectral interval (e.g. the soft X-ray band of
//! Swift/XRT or the optical band of ZTF) over which the physics engine integrates the
//! fitted model, or to which the fitter can restrict its data.
//!
//! Bounds may be expressed in **nanometers**, **Hertz** or **keV** ([`BandUnit`]); the
//! only place they are interpreted is [`BandDefinition::wavelength_range_cm`], which
//! converts them to an ordered wavelength interval in cm through the
//! [`ConstantsRegistry`].
//!
//! Presets
//! -----------------
//! * [`BandDefinition::swift_xray`] – 0.3–10 keV
//! * [`BandDefinition::ztf_optical`] – 367.6–901 nm
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    constants::{Centimeter, ConstantsRegistry},
    conversion::{hz_to_cm, kev_to_hz, nm_to_cm},
    lightfit_errors::LightfitError,
};

/// Unit of the bounds of a [`BandDefinition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BandUnit {
    #[default]
    Nanometer,
    Hertz,
    KeV,
}

impl fmt::Display for BandUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BandUnit::Nanometer => write!(f, "nm"),
            BandUnit::Hertz => write!(f, "Hz"),
            BandUnit::KeV => write!(f, "keV"),
        }
    }
}

/// A named spectral interval `[lower, upper]` in a given [`BandUnit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandDefinition {
    pub name: String,
    pub lower_bound: f64,
    pub upper_bound: f64,
    #[serde(default)]
    pub unit: BandUnit,
}

impl BandDefinition {
    /// Build a band, checking `0 < lower < upper` with finite bounds.
    ///
    /// Arguments
    /// -----------------
    /// * `name`: Label carried into the light-curve entries (e.g. `"X-ray"`).
    /// * `lower_bound`, `upper_bound`: Interval bounds in `unit`.
    /// * `unit`: Unit of the bounds.
    ///
    /// Return
    /// ----------
    /// * The band, or [`LightfitError::InvalidBand`] when the bounds are not ordered,
    ///   not finite, or not strictly positive.
    pub fn new(
        name: impl Into<String>,
        lower_bound: f64,
        upper_bound: f64,
        unit: BandUnit,
    ) -> Result<Self, LightfitError> {
        let band = BandDefinition {
            name: name.into(),
            lower_bound,
            upper_bound,
            unit,
        };
        band.validate()?;
        Ok(band)
    }

    /// Swift/XRT soft X-ray band, 0.3–10 keV.
    pub fn swift_xray() -> Self {
        BandDefinition {
            name: "X-ray".into(),
            lower_bound: 0.3,
            upper_bound: 10.0,
            unit: BandUnit::KeV,
        }
    }

    /// ZTF optical band, 367.6–901 nm.
    pub fn ztf_optical() -> Self {
        BandDefinition {
            name: "Optical/UV".into(),
            lower_bound: 367.6,
            upper_bound: 901.0,
            unit: BandUnit::Nanometer,
        }
    }

    pub fn validate(&self) -> Result<(), LightfitError> {
        if self.name.trim().is_empty() {
            return Err(LightfitError::InvalidBand("band name is empty".into()));
        }
        if !(self.lower_bound.is_finite() && self.upper_bound.is_finite()) {
            return Err(LightfitError::InvalidBand(format!(
                "{}: bounds must be finite",
                self.name
            )));
        }
        if self.lower_bound <= 0.0 || self.lower_bound >= self.upper_bound {
            return Err(LightfitError::InvalidBand(format!(
                "{}: require 0 < lower ({}) < upper ({})",
                self.name, self.lower_bound, self.upper_bound
            )));
        }
        Ok(())
    }

    /// Convert the band to an ordered wavelength interval `(λ_min, λ_max)` in cm.
    ///
    /// Frequency and energy bounds swap order: the upper frequency/energy maps to the
    /// lower wavelength.
    pub fn wavelength_range_cm(&self, reg: &ConstantsRegistry) -> (Centimeter, Centimeter) {
        match self.unit {
            BandUnit::Nanometer => (
                nm_to_cm(reg, self.lower_bound),
                nm_to_cm(reg, self.upper_bound),
            ),
            BandUnit::Hertz => (
                hz_to_cm(reg, self.upper_bound),
                hz_to_cm(reg, self.lower_bound),
            ),
            BandUnit::KeV => (
                hz_to_cm(reg, kev_to_hz(reg, self.upper_bound)),
                hz_to_cm(reg, kev_to_hz(reg, self.lower_bound)),
            ),
        }
    }

    /// Whether a wavelength (cm) lies inside the band, bounds included.
    pub fn contains_cm(&self, reg: &ConstantsRegistry, wavelength: Centimeter) -> bool {
        let (lo, hi) = self.wavelength_range_cm(reg);
        (lo..=hi).contains(&wavelength)
    }
}

impl fmt::Display for BandDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}, {}] {}",
            self.name, self.lower_bound, self.upper_bound, self.unit
        )
    }
}

//! Spectral unit conversions between photon energy, frequency and wavelength.
//!
//! All helpers take the [`ConstantsRegistry`] so that every conversion in the crate goes
//! through the same constant values.
use crate::constants::{Centimeter, ConstantsRegistry, Hertz, KeV, Nanometer};

/// keV → Hz
#[inline]
pub fn kev_to_hz(reg: &ConstantsRegistry, energy: KeV) -> Hertz {
    energy * reg.kev_to_erg() / reg.planck()
}

/// Hz → keV
#[inline]
pub fn hz_to_kev(reg: &ConstantsRegistry, frequency: Hertz) -> KeV {
    frequency * reg.planck() / reg.kev_to_erg()
}

/// Hz → cm
#[inline]
pub fn hz_to_cm(reg: &ConstantsRegistry, frequency: Hertz) -> Centimeter {
    reg.speed_of_light() / frequency
}

/// cm → Hz
#[inline]
pub fn cm_to_hz(reg: &ConstantsRegistry, wavelength: Centimeter) -> Hertz {
    reg.speed_of_light() / wavelength
}

/// nm → cm
#[inline]
pub fn nm_to_cm(reg: &ConstantsRegistry, wavelength: Nanometer) -> Centimeter {
    wavelength / reg.cm_to_nm()
}

/// cm → nm
#[inline]
pub fn cm_to_nm(reg: &ConstantsRegistry, wavelength: Centimeter) -> Nanometer {
    wavelength * reg.cm_to_nm()
}

/// keV → nm
#[inline]
pub fn kev_to_nm(reg: &ConstantsRegistry, energy: KeV) -> Nanometer {
    cm_to_nm(reg, hz_to_cm(reg, kev_to_hz(reg, energy)))
}

/// nm → keV
#[inline]
pub fn nm_to_kev(reg: &ConstantsRegistry, wavelength: Nanometer) -> KeV {
    hz_to_kev(reg, cm_to_hz(reg, nm_to_cm(reg, wavelength)))
}

/// Convert a flux density per unit frequency (F_ν) at `frequency` into a flux density per
/// unit wavelength (F_λ, per cm): `F_λ = F_ν ν² / c`.
#[inline]
pub fn f_nu_to_f_lambda(reg: &ConstantsRegistry, f_nu: f64, frequency: Hertz) -> f64 {
    f_nu * frequency * frequency / reg.speed_of_light()
}

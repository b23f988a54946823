//! # Spectral snapshots: ingestion and validation
//!
//! A [`SpectralSnapshot`] is one simulation timestep's spectrum, already converted to CGS
//! at the loader boundary: a strictly increasing wavelength grid (cm), the received flux
//! density per unit wavelength F_λ (erg s⁻¹ cm⁻² cm⁻¹), the distance to the source (cm)
//! and the simulation time (days).
//!
//! Modules
//! -----------------
//! * [`spec_reader`](crate::snapshot::spec_reader) – [`SnapshotLoader`](crate::snapshot::spec_reader::SnapshotLoader),
//!   the text-record parser.
//! * [`companion`](crate::snapshot::companion) – Reader for the `lightcurve_<stem>.out`
//!   companion file written by the simulation next to each spectrum.
//! * [`source`](crate::snapshot::source) – [`InputRef`](crate::snapshot::source::InputRef)
//!   and the [`SnapshotSource`](crate::snapshot::source::SnapshotSource) trait yielding the
//!   batch of inputs.
//!
//! Invariants
//! -----------------
//! * `wavelength.len() == flux.len() >= min_spectral_points`
//! * `wavelength` strictly increasing, finite and positive
//! * `flux` finite (it may be negative: noise)
//! * `distance` finite and positive, `time` finite
//!
//! These are enforced once in [`SpectralSnapshot::new`]; a snapshot is immutable after
//! construction.
use itertools::Itertools;

use crate::{
    constants::{Centimeter, Days, ErgPerSec, Kelvin},
    lightfit_errors::MalformedInputError,
};

pub mod companion;
pub mod source;
pub mod spec_reader;

/// Global quantities reported by the simulation for the same timestep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationReference {
    pub total_luminosity: ErgPerSec,
    pub effective_radius: Centimeter,
    pub effective_temperature: Kelvin,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpectralSnapshot {
    label: String,
    time: Days,
    wavelength: Vec<Centimeter>,
    flux: Vec<f64>,
    distance: Centimeter,
    reference: Option<SimulationReference>,
}

impl SpectralSnapshot {
    /// Validate and build a snapshot.
    ///
    /// The grid is brought into strictly increasing order when that is possible without
    /// ambiguity: a strictly decreasing grid (typical after a frequency → wavelength
    /// conversion) is reversed, any other ordering is sorted together with its flux.
    /// Duplicated abscissae cannot be resolved and are rejected.
    ///
    /// Arguments
    /// -----------------
    /// * `label`: Reference of the input the snapshot comes from (used in diagnostics).
    /// * `time`: Simulation time in days.
    /// * `wavelength`: Wavelength grid in cm.
    /// * `flux`: F_λ values, same length as `wavelength`.
    /// * `distance`: Distance to the source in cm.
    /// * `min_points`: Minimum number of spectral points required.
    ///
    /// Return
    /// ----------
    /// * The snapshot, or the first [`MalformedInputError`] found.
    pub fn new(
        label: impl Into<String>,
        time: Days,
        wavelength: Vec<Centimeter>,
        flux: Vec<f64>,
        distance: Centimeter,
        min_points: usize,
    ) -> Result<Self, MalformedInputError> {
        if wavelength.len() != flux.len() {
            return Err(MalformedInputError::LengthMismatch {
                wavelength: wavelength.len(),
                flux: flux.len(),
            });
        }
        if wavelength.is_empty() {
            return Err(MalformedInputError::EmptyInput);
        }
        if wavelength.len() < min_points {
            return Err(MalformedInputError::NotEnoughPoints {
                found: wavelength.len(),
                required: min_points,
            });
        }
        if !time.is_finite() {
            return Err(MalformedInputError::NonFiniteTime(time));
        }
        if !(distance.is_finite() && distance > 0.0) {
            return Err(MalformedInputError::NonPositiveDistance(distance));
        }
        if let Some(&bad) = wavelength.iter().find(|w| !(w.is_finite() && **w > 0.0)) {
            return Err(MalformedInputError::NonPositiveAbscissa(bad));
        }
        if let Some(idx) = flux.iter().position(|f| !f.is_finite()) {
            return Err(MalformedInputError::NonFiniteFlux(idx));
        }

        let (wavelength, flux) = into_increasing_grid(wavelength, flux)?;

        Ok(SpectralSnapshot {
            label: label.into(),
            time,
            wavelength,
            flux,
            distance,
            reference: None,
        })
    }

    /// Attach the simulation-reported totals for this timestep.
    pub fn with_reference(mut self, reference: SimulationReference) -> Self {
        self.reference = Some(reference);
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn time(&self) -> Days {
        self.time
    }

    pub fn wavelength(&self) -> &[Centimeter] {
        &self.wavelength
    }

    pub fn flux(&self) -> &[f64] {
        &self.flux
    }

    pub fn distance(&self) -> Centimeter {
        self.distance
    }

    pub fn reference(&self) -> Option<&SimulationReference> {
        self.reference.as_ref()
    }

    pub fn len(&self) -> usize {
        self.wavelength.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavelength.is_empty()
    }

    /// Index and value of the maximum flux sample.
    pub fn peak(&self) -> (usize, Centimeter, f64) {
        let (idx, &flux) = self
            .flux
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .unwrap_or((0, &0.0));
        (idx, self.wavelength[idx], flux)
    }

    /// Iterate over `(wavelength, flux)` pairs.
    pub fn samples(&self) -> impl Iterator<Item = (Centimeter, f64)> + '_ {
        self.wavelength.iter().copied().zip(self.flux.iter().copied())
    }
}

fn into_increasing_grid(
    wavelength: Vec<f64>,
    flux: Vec<f64>,
) -> Result<(Vec<f64>, Vec<f64>), MalformedInputError> {
    if wavelength.iter().tuple_windows().all(|(a, b)| a < b) {
        return Ok((wavelength, flux));
    }

    if wavelength.iter().tuple_windows().all(|(a, b)| a > b) {
        let wavelength = wavelength.into_iter().rev().collect();
        let flux = flux.into_iter().rev().collect();
        return Ok((wavelength, flux));
    }

    let mut pairs: Vec<(f64, f64)> = wavelength.into_iter().zip(flux).collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
    if let Some(((dup, _), _)) = pairs.iter().tuple_windows().find(|(a, b)| a.0 == b.0) {
        return Err(MalformedInputError::NonMonotonicGrid(*dup));
    }

    Ok(pairs.into_iter().unzip())
}

#[cfg(test)]
mod snapshot_test {
    use super::*;

    fn grid() -> (Vec<f64>, Vec<f64>) {
        (vec![1.0, 2.0, 3.0, 4.0], vec![0.5, 1.5, 1.0, -0.1])
    }

    #[test]
    fn test_valid_snapshot() {
        let (w, f) = grid();
        let snap = SpectralSnapshot::new("a", 1.0, w.clone(), f.clone(), 10.0, 3).unwrap();
        assert_eq!(snap.wavelength(), w.as_slice());
        assert_eq!(snap.flux(), f.as_slice());
        assert_eq!(snap.peak(), (1, 2.0, 1.5));
        assert_eq!(snap.len(), 4);
        assert!(snap.reference().is_none());
    }

    #[test]
    fn test_decreasing_grid_is_reversed() {
        let snap = SpectralSnapshot::new(
            "a",
            0.0,
            vec![4.0, 3.0, 2.0, 1.0],
            vec![-0.1, 1.0, 1.5, 0.5],
            1.0,
            3,
        )
        .unwrap();
        let (w, f) = grid();
        assert_eq!(snap.wavelength(), w.as_slice());
        assert_eq!(snap.flux(), f.as_slice());
    }

    #[test]
    fn test_unsorted_grid_is_sorted() {
        let snap = SpectralSnapshot::new(
            "a",
            0.0,
            vec![2.0, 1.0, 4.0, 3.0],
            vec![1.5, 0.5, -0.1, 1.0],
            1.0,
            3,
        )
        .unwrap();
        let (w, f) = grid();
        assert_eq!(snap.wavelength(), w.as_slice());
        assert_eq!(snap.flux(), f.as_slice());
    }

    #[test]
    fn test_duplicate_abscissa_rejected() {
        let err = SpectralSnapshot::new(
            "a",
            0.0,
            vec![2.0, 1.0, 2.0, 3.0],
            vec![1.0; 4],
            1.0,
            3,
        )
        .unwrap_err();
        assert_eq!(err, MalformedInputError::NonMonotonicGrid(2.0));
    }

    #[test]
    fn test_structural_errors() {
        assert_eq!(
            SpectralSnapshot::new("a", 0.0, vec![1.0, 2.0], vec![1.0], 1.0, 1).unwrap_err(),
            MalformedInputError::LengthMismatch {
                wavelength: 2,
                flux: 1
            }
        );
        assert_eq!(
            SpectralSnapshot::new("a", 0.0, vec![], vec![], 1.0, 1).unwrap_err(),
            MalformedInputError::EmptyInput
        );
        assert_eq!(
            SpectralSnapshot::new("a", 0.0, vec![1.0, 2.0], vec![1.0, 1.0], 1.0, 3).unwrap_err(),
            MalformedInputError::NotEnoughPoints {
                found: 2,
                required: 3
            }
        );
        assert_eq!(
            SpectralSnapshot::new("a", 0.0, vec![1.0, 2.0], vec![1.0, 1.0], 0.0, 1).unwrap_err(),
            MalformedInputError::NonPositiveDistance(0.0)
        );
        assert_eq!(
            SpectralSnapshot::new("a", 0.0, vec![-1.0, 2.0], vec![1.0, 1.0], 1.0, 1).unwrap_err(),
            MalformedInputError::NonPositiveAbscissa(-1.0)
        );
        assert_eq!(
            SpectralSnapshot::new("a", 0.0, vec![1.0, 2.0], vec![1.0, f64::NAN], 1.0, 1)
                .unwrap_err(),
            MalformedInputError::NonFiniteFlux(1)
        );
        assert!(matches!(
            SpectralSnapshot::new("a", f64::NAN, vec![1.0, 2.0], vec![1.0, 1.0], 1.0, 1),
            Err(MalformedInputError::NonFiniteTime(_))
        ));
    }
}

//! # Synthetic blackbody snapshots
//!
//! Generator for spectra of a known single-temperature blackbody, optionally perturbed by
//! Gaussian noise. Used to exercise the fitter and the pipeline against ground truth, in
//! tests, benchmarks and the demo program.
//!
//! The generator produces either
//! * a validated [`SpectralSnapshot`] ([`SyntheticSpectrum::snapshot`]), or
//! * a text record in the `.spec` layout, wavelength axis in nm
//!   ([`SyntheticSpectrum::render_record`] / [`SyntheticSpectrum::input`]), expressed in
//!   the simulation units of the registry so that [`SnapshotLoader`](crate::snapshot::spec_reader::SnapshotLoader)
//!   reads back the same physical values.
//!
//! Noise
//! -----------------
//! * [`Noise::Relative`]`(σ)`: `F ← F · (1 + σ·ε)`
//! * [`Noise::Absolute`]`(σ)`: `F ← F + σ·ε`, σ in erg s⁻¹ cm⁻² cm⁻¹
//!
//! with `ε ~ N(0, 1)` drawn from the caller's RNG; seed a `StdRng` for reproducibility.
//!
//! ## Example
//!
//! ```rust
//! use lightfit::constants::ConstantsRegistry;
//! use lightfit::planck::BlackbodyParams;
//! use lightfit::synthetic::{Noise, SyntheticSpectrum};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let reg = ConstantsRegistry::cgs();
//! let mut rng = StdRng::seed_from_u64(42);
//! let snapshot = SyntheticSpectrum::new(BlackbodyParams { temperature: 2.0e4, radius: 1.0e14 })
//!     .time(12.5)
//!     .noise(Noise::Relative(0.01))
//!     .snapshot(&reg, &mut rng)
//!     .unwrap();
//! assert_eq!(snapshot.len(), 200);
//! ```
use rand::Rng;
use rand_distr::StandardNormal;

use crate::{
    constants::{Centimeter, ConstantsRegistry, Days, Nanometer},
    conversion::nm_to_cm,
    lightfit_errors::MalformedInputError,
    planck::{model_flux, BlackbodyParams},
    snapshot::{source::InputRef, SpectralSnapshot},
};

/// Gaussian perturbation applied to every flux sample.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Noise {
    #[default]
    None,
    Relative(f64),
    Absolute(f64),
}

impl Noise {
    fn apply<R: Rng + ?Sized>(&self, flux: f64, rng: &mut R) -> f64 {
        match *self {
            Noise::None => flux,
            Noise::Relative(sigma) => {
                let eps: f64 = rng.sample(StandardNormal);
                flux * (1.0 + sigma * eps)
            }
            Noise::Absolute(sigma) => {
                let eps: f64 = rng.sample(StandardNormal);
                flux + sigma * eps
            }
        }
    }
}

/// Description of a synthetic spectrum on a logarithmic wavelength grid.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticSpectrum {
    pub params: BlackbodyParams,
    pub distance: Centimeter,
    pub time: Days,
    /// Grid bounds in nm.
    pub wavelength_range: (Nanometer, Nanometer),
    pub points: usize,
    pub noise: Noise,
}

impl SyntheticSpectrum {
    /// 200 points log-spaced over 10–10⁵ nm, source at 10²⁶ cm, time 1 day, no noise.
    pub fn new(params: BlackbodyParams) -> Self {
        SyntheticSpectrum {
            params,
            distance: 1.0e26,
            time: 1.0,
            wavelength_range: (10.0, 1.0e5),
            points: 200,
            noise: Noise::None,
        }
    }

    pub fn distance(mut self, distance: Centimeter) -> Self {
        self.distance = distance;
        self
    }

    pub fn time(mut self, time: Days) -> Self {
        self.time = time;
        self
    }

    pub fn wavelength_range(mut self, min: Nanometer, max: Nanometer) -> Self {
        self.wavelength_range = (min, max);
        self
    }

    pub fn points(mut self, points: usize) -> Self {
        self.points = points;
        self
    }

    pub fn noise(mut self, noise: Noise) -> Self {
        self.noise = noise;
        self
    }

    /// Log-spaced wavelength grid in nm.
    pub fn grid_nm(&self) -> Vec<Nanometer> {
        let (lo, hi) = self.wavelength_range;
        match self.points {
            0 => Vec::new(),
            1 => vec![lo],
            n => {
                let step = (hi / lo).ln() / (n - 1) as f64;
                (0..n).map(|i| lo * (step * i as f64).exp()).collect()
            }
        }
    }

    /// Noisy F_λ samples (erg s⁻¹ cm⁻² cm⁻¹) on the grid, wavelengths in cm.
    pub fn samples<R: Rng + ?Sized>(
        &self,
        reg: &ConstantsRegistry,
        rng: &mut R,
    ) -> (Vec<Centimeter>, Vec<f64>) {
        self.grid_nm()
            .into_iter()
            .map(|nm| {
                let cm = nm_to_cm(reg, nm);
                let flux = model_flux(reg, cm, &self.params, self.distance);
                (cm, self.noise.apply(flux, rng))
            })
            .unzip()
    }

    /// Build a validated snapshot labelled `synthetic-T<temperature>`.
    pub fn snapshot<R: Rng + ?Sized>(
        &self,
        reg: &ConstantsRegistry,
        rng: &mut R,
    ) -> Result<SpectralSnapshot, MalformedInputError> {
        let (wavelength, flux) = self.samples(reg, rng);
        SpectralSnapshot::new(
            format!("synthetic-T{:.0}", self.params.temperature),
            self.time,
            wavelength,
            flux,
            self.distance,
            1,
        )
    }

    /// Render a `.spec` text record (wavelength axis, nm and per-nm flux) in the simulation
    /// units of `reg`.
    pub fn render_record<R: Rng + ?Sized>(&self, reg: &ConstantsRegistry, rng: &mut R) -> String {
        let units = reg.units();
        let (wavelength, flux) = self.samples(reg, rng);

        let header = format!(
            "# time: {:e}\n# distance: {:e}\n# axis: wavelength\n",
            self.time * reg.seconds_per_day() / units.time_to_seconds,
            self.distance / units.length_to_cm,
        );
        let rows = wavelength.iter().zip(&flux).map(|(cm, f)| {
            let nm = cm * reg.cm_to_nm();
            let per_nm = f / reg.cm_to_nm() / units.flux_to_cgs;
            format!("{nm:e} {per_nm:e}\n")
        });
        std::iter::once(header).chain(rows).collect()
    }

    /// In-memory input holding [`render_record`](Self::render_record).
    pub fn input<R: Rng + ?Sized>(
        &self,
        label: impl Into<String>,
        reg: &ConstantsRegistry,
        rng: &mut R,
    ) -> InputRef {
        InputRef::memory(label, self.render_record(reg, rng))
    }
}

#[cfg(test)]
mod synthetic_test {
    use super::*;
    use crate::{constants::ConstantsRegistry, snapshot::spec_reader::SnapshotLoader};
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, SeedableRng};
    use std::sync::Arc;

    fn spectrum() -> SyntheticSpectrum {
        SyntheticSpectrum::new(BlackbodyParams {
            temperature: 3.0e4,
            radius: 2.0e14,
        })
        .time(4.0)
        .points(50)
    }

    #[test]
    fn test_grid_bounds() {
        let grid = spectrum().wavelength_range(10.0, 1000.0).grid_nm();
        assert_eq!(grid.len(), 50);
        assert_relative_eq!(grid[0], 10.0);
        assert_relative_eq!(grid[49], 1000.0, max_relative = 1e-12);
        assert!(grid.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_noiseless_snapshot_matches_model() {
        let reg = ConstantsRegistry::cgs();
        let mut rng = StdRng::seed_from_u64(1);
        let s = spectrum();
        let snap = s.snapshot(&reg, &mut rng).unwrap();
        for (w, f) in snap.samples() {
            assert_eq!(f, model_flux(&reg, w, &s.params, s.distance));
        }
    }

    #[test]
    fn test_seeded_noise_is_reproducible() {
        let reg = ConstantsRegistry::cgs();
        let s = spectrum().noise(Noise::Relative(0.05));
        let a = s.samples(&reg, &mut StdRng::seed_from_u64(7)).1;
        let b = s.samples(&reg, &mut StdRng::seed_from_u64(7)).1;
        let clean = spectrum().samples(&reg, &mut StdRng::seed_from_u64(7)).1;
        assert_eq!(a, b);
        assert_ne!(a, clean);
    }

    #[test]
    fn test_record_layout() {
        let reg = ConstantsRegistry::cgs();
        let text = spectrum()
            .points(3)
            .render_record(&reg, &mut StdRng::seed_from_u64(1));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 6);
        assert!(lines[0].starts_with("# time: "));
        assert!(lines[1].starts_with("# distance: "));
        assert_eq!(lines[2], "# axis: wavelength");
        assert!(lines[3..].iter().all(|l| l.split_whitespace().count() == 2));
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn test_record_round_trips_through_loader() {
        let reg = Arc::new(ConstantsRegistry::cgs());
        let s = spectrum();
        let input = s.input("synthetic.spec", &reg, &mut StdRng::seed_from_u64(3));
        let snap = SnapshotLoader::new(Arc::clone(&reg)).load(&input).unwrap();
        assert_relative_eq!(snap.time(), 4.0, max_relative = 1e-12);
        assert_relative_eq!(snap.distance(), s.distance, max_relative = 1e-12);
        assert_eq!(snap.len(), 50);
        let expected = s.snapshot(&reg, &mut StdRng::seed_from_u64(3)).unwrap();
        for ((_, f), (_, g)) in snap.samples().zip(expected.samples()) {
            assert_relative_eq!(f, g, max_relative = 1e-12);
        }
    }
}

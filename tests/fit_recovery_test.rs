mod common;

use lightfit::{
    bands::BandDefinition,
    fitter::{fit_result::FitFailureKind, FitParams, ResidualSpace},
    synthetic::{Noise, SyntheticSpectrum},
    BlackbodyFitter,
};
use rand::{rngs::StdRng, SeedableRng};

use crate::common::{assert_fit_close, params, registry};

#[test]
fn test_noiseless_recovery() {
    let reg = registry();
    let fitter = BlackbodyFitter::new(reg.clone(), FitParams::default());
    let mut rng = StdRng::seed_from_u64(42);

    for (t, r, lo) in [(8.0e3, 5.0e14, 10.0), (3.0e4, 1.0e14, 10.0), (2.0e5, 3.0e12, 1.0)] {
        let truth = params(t, r);
        let snapshot = SyntheticSpectrum::new(truth)
            .wavelength_range(lo, lo * 1.0e4)
            .snapshot(&reg, &mut rng)
            .unwrap();
        let fit = fitter.fit(&snapshot);
        assert_fit_close(&fit, &truth, 1e-3);
        assert!(fit.chi_square().unwrap() < 1e-8);
    }
}

#[test]
fn test_recovery_in_flux_space() {
    let reg = registry();
    let fit_params = FitParams::builder()
        .residual_space(ResidualSpace::Flux)
        .build()
        .unwrap();
    let fitter = BlackbodyFitter::new(reg.clone(), fit_params);
    let truth = params(2.5e4, 2.0e14);
    let snapshot = SyntheticSpectrum::new(truth)
        .snapshot(&reg, &mut StdRng::seed_from_u64(1))
        .unwrap();
    assert_fit_close(&fitter.fit(&snapshot), &truth, 1e-3);
}

#[test]
fn test_recovery_with_relative_noise() {
    let reg = registry();
    let fitter = BlackbodyFitter::new(reg.clone(), FitParams::default());
    let truth = params(3.0e4, 1.0e14);
    let snapshot = SyntheticSpectrum::new(truth)
        .noise(Noise::Relative(0.05))
        .snapshot(&reg, &mut StdRng::seed_from_u64(2024))
        .unwrap();
    assert_fit_close(&fitter.fit(&snapshot), &truth, 0.05);
}

#[test]
fn test_recovery_with_additive_noise() {
    let reg = registry();
    let fitter = BlackbodyFitter::new(reg.clone(), FitParams::default());
    let truth = params(3.0e4, 1.0e14);
    let clean = SyntheticSpectrum::new(truth);
    let (_, flux) = clean.samples(&reg, &mut StdRng::seed_from_u64(0));
    let peak = flux.iter().copied().fold(0.0, f64::max);

    for (level, seed) in [(0.01, 1), (0.01, 2), (0.01, 3), (0.001, 4)] {
        let snapshot = clean
            .clone()
            .noise(Noise::Absolute(level * peak))
            .snapshot(&reg, &mut StdRng::seed_from_u64(seed))
            .unwrap();
        assert_fit_close(&fitter.fit(&snapshot), &truth, 0.05);
    }
}

#[test]
fn test_optical_window_fit() {
    let reg = registry();
    let fit_params = FitParams::builder()
        .fit_window(Some(BandDefinition::ztf_optical()))
        .build()
        .unwrap();
    let fitter = BlackbodyFitter::new(reg.clone(), fit_params);
    let truth = params(1.5e4, 4.0e14);
    let snapshot = SyntheticSpectrum::new(truth)
        .points(400)
        .snapshot(&reg, &mut StdRng::seed_from_u64(5))
        .unwrap();
    let fit = fitter.fit(&snapshot);
    assert_fit_close(&fit, &truth, 1e-3);
}

#[test]
fn test_pure_noise_is_degenerate() {
    let reg = registry();
    let fitter = BlackbodyFitter::new(reg.clone(), FitParams::default());
    let snapshot = SyntheticSpectrum::new(params(3.0e4, 1.0e-10))
        .noise(Noise::Absolute(1.0))
        .snapshot(&reg, &mut StdRng::seed_from_u64(9))
        .unwrap();
    let fit = fitter.fit(&snapshot);
    assert_eq!(fit.failure_reason(), Some(FitFailureKind::DegenerateInput));
    assert!(fit.params().is_none());
}

#[test]
fn test_fit_is_deterministic() {
    let reg = registry();
    let fitter = BlackbodyFitter::new(reg.clone(), FitParams::default());
    let snapshot = SyntheticSpectrum::new(params(2.0e4, 1.0e14))
        .noise(Noise::Relative(0.02))
        .snapshot(&reg, &mut StdRng::seed_from_u64(77))
        .unwrap();
    assert_eq!(fitter.fit(&snapshot), fitter.fit(&snapshot));
}

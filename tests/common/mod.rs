#![allow(dead_code)]

use std::sync::Arc;

use approx::assert_relative_eq;
use lightfit::{
    constants::ConstantsRegistry,
    planck::BlackbodyParams,
    snapshot::source::InputRef,
    synthetic::{Noise, SyntheticSpectrum},
    FitResult,
};
use rand::{rngs::StdRng, SeedableRng};

pub fn registry() -> Arc<ConstantsRegistry> {
    Arc::new(ConstantsRegistry::cgs())
}

pub fn params(temperature: f64, radius: f64) -> BlackbodyParams {
    BlackbodyParams {
        temperature,
        radius,
    }
}

/// In-memory inputs for a cooling, expanding source sampled at `times` (days).
pub fn synthetic_batch(times: &[f64], noise: Noise, seed: u64) -> Vec<InputRef> {
    let reg = ConstantsRegistry::cgs();
    let mut rng = StdRng::seed_from_u64(seed);
    times
        .iter()
        .map(|&t| {
            SyntheticSpectrum::new(params(4.0e4 / (1.0 + 0.1 * t), 1.0e14 * (1.0 + 0.2 * t)))
                .time(t)
                .noise(noise)
                .input(format!("day_{t}.spec"), &reg, &mut rng)
        })
        .collect()
}

pub fn assert_fit_close(fit: &FitResult, expected: &BlackbodyParams, max_relative: f64) {
    let p = fit
        .params()
        .unwrap_or_else(|| panic!("fit did not converge: {fit}"));
    assert_relative_eq!(p.temperature, expected.temperature, max_relative = max_relative);
    assert_relative_eq!(p.radius, expected.radius, max_relative = max_relative);
}

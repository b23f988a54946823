use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use lightfit::{
    constants::ConstantsRegistry,
    fitter::{FitParams, ResidualSpace},
    planck::BlackbodyParams,
    synthetic::{Noise, SyntheticSpectrum},
    BlackbodyFitter, SpectralSnapshot,
};

/// Noisy snapshots with temperatures drawn log-uniformly in [5e3, 2e5] K.
fn make_snapshots(reg: &ConstantsRegistry, rng: &mut StdRng, n: usize) -> Vec<SpectralSnapshot> {
    (0..n)
        .map(|_| {
            let temperature = 10f64.powf(rng.random_range(3.7..=5.3));
            let radius = 10f64.powf(rng.random_range(12.0..=15.0));
            SyntheticSpectrum::new(BlackbodyParams {
                temperature,
                radius,
            })
            .wavelength_range(1.0, 1.0e5)
            .noise(Noise::Relative(0.02))
            .snapshot(reg, rng)
            .expect("synthetic snapshot is valid")
        })
        .collect()
}

fn bench_fit(c: &mut Criterion) {
    let reg = Arc::new(ConstantsRegistry::cgs());
    let mut rng = StdRng::seed_from_u64(0xB1AC_B0D1);

    for space in [ResidualSpace::LogFlux, ResidualSpace::Flux] {
        let params = FitParams::builder()
            .residual_space(space)
            .build()
            .expect("valid fit parameters");
        let fitter = BlackbodyFitter::new(reg.clone(), params);

        c.bench_function(&format!("fit_blackbody/{space}/200pts"), |b| {
            b.iter_batched(
                || make_snapshots(&reg, &mut rng, 16),
                |snapshots| {
                    for s in &snapshots {
                        black_box(fitter.fit(black_box(s)));
                    }
                },
                BatchSize::SmallInput,
            )
        });
    }
}

criterion_group!(benches, bench_fit);
criterion_main!(benches);

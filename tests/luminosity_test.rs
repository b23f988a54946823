mod common;

use std::f64::consts::PI;

use approx::assert_relative_eq;
use lightfit::{
    bands::{BandDefinition, BandUnit},
    synthetic::SyntheticSpectrum,
    BlackbodyFitter, PhysicsEngine,
};
use rand::{rngs::StdRng, SeedableRng};

use crate::common::{params, registry};

#[test]
fn test_bolometric_is_stefan_boltzmann() {
    let reg = registry();
    let engine = PhysicsEngine::new(reg.clone(), BandDefinition::swift_xray());
    for (t, r) in [(5.0e3_f64, 1.0e15_f64), (3.0e4, 1.0e14), (1.0e6, 1.0e11)] {
        let expected = 4.0 * PI * r * r * reg.stefan_boltzmann() * t.powi(4);
        assert_relative_eq!(
            engine.bolometric_luminosity(&params(t, r)),
            expected,
            max_relative = 1e-12
        );
    }
}

#[test]
fn test_band_luminosity_tends_to_bolometric() {
    let reg = registry();
    let p = params(3.0e4, 1.0e14);
    let engine = PhysicsEngine::new(reg.clone(), BandDefinition::swift_xray());
    let wide = BandDefinition::new("all", 1.0e-3, 1.0e9, BandUnit::Nanometer).unwrap();
    assert_relative_eq!(
        engine.band_luminosity(&p, &wide),
        engine.bolometric_luminosity(&p),
        max_relative = 1e-6
    );
}

#[test]
fn test_adjacent_bands_add_up() {
    let reg = registry();
    let p = params(2.0e4, 2.0e14);
    let engine = PhysicsEngine::new(reg.clone(), BandDefinition::ztf_optical());
    let uv = BandDefinition::new("uv", 100.0, 367.6, BandUnit::Nanometer).unwrap();
    let both = BandDefinition::new("uv+optical", 100.0, 901.0, BandUnit::Nanometer).unwrap();

    let optical = engine.band_luminosity(&p, engine.band());
    assert!(optical > 0.0 && optical < engine.bolometric_luminosity(&p));
    assert_relative_eq!(
        engine.band_luminosity(&p, &uv) + optical,
        engine.band_luminosity(&p, &both),
        max_relative = 1e-8
    );
}

#[test]
fn test_same_band_in_different_units() {
    let reg = registry();
    let engine = PhysicsEngine::new(reg.clone(), BandDefinition::swift_xray());
    let p = params(1.0e6, 1.0e11);
    let kev = engine.band_luminosity(&p, &BandDefinition::swift_xray());
    let nm = BandDefinition::new(
        "X-ray",
        1.239_841_984 / 10.0,
        1.239_841_984 / 0.3,
        BandUnit::Nanometer,
    )
    .unwrap();
    assert_relative_eq!(engine.band_luminosity(&p, &nm), kev, max_relative = 1e-6);
}

#[test]
fn test_derived_from_fit() {
    let reg = registry();
    let truth = params(3.5e4, 8.0e13);
    let snapshot = SyntheticSpectrum::new(truth)
        .time(7.0)
        .snapshot(&reg, &mut StdRng::seed_from_u64(3))
        .unwrap();
    let fit = BlackbodyFitter::new(reg.clone(), Default::default()).fit(&snapshot);
    let engine = PhysicsEngine::new(reg.clone(), BandDefinition::swift_xray());
    let derived = engine.derive(&fit);

    assert!(derived.valid);
    assert_eq!(derived.time, 7.0);
    assert_relative_eq!(
        derived.bolometric_luminosity,
        engine.bolometric_luminosity(&truth),
        max_relative = 5e-3
    );
    assert!(derived.band_luminosity < derived.bolometric_luminosity);
    assert_relative_eq!(
        engine.effective_radius(derived.bolometric_luminosity, derived.temperature),
        derived.radius,
        max_relative = 1e-10
    );
}

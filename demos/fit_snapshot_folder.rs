//! Fit every `.spec` record of a folder and print the resulting light curve as CSV.
//!
//! ```text
//! cargo run --example fit_snapshot_folder -- [<spectra dir> [<config.json>]]
//! ```
//!
//! Without arguments, a cooling synthetic source is written to a temporary folder first.
//! Set `RUST_LOG=debug` to see the per-fit details.
use std::env;

use camino::{Utf8Path, Utf8PathBuf};
use rand::rngs::StdRng;
use rand::SeedableRng;

use lightfit::{
    constants::ConstantsRegistry,
    lightcurve::export::{write_diagnostics_csv, write_series_csv},
    planck::BlackbodyParams,
    synthetic::{Noise, SyntheticSpectrum},
    BandDefinition, LightfitError, Pipeline, PipelineConfig,
};

/// Write `n` noisy spectra of a cooling, expanding blackbody into `dir`.
fn write_synthetic_folder(dir: &Utf8Path, n: usize) -> Result<(), LightfitError> {
    let reg = ConstantsRegistry::cgs();
    let mut rng = StdRng::seed_from_u64(42);
    for i in 0..n {
        let t = 1.0 + 2.0 * i as f64;
        let record = SyntheticSpectrum::new(BlackbodyParams {
            temperature: 5.0e4 * t.powf(-0.4),
            radius: 2.0e14 * t.powf(0.5),
        })
        .time(t)
        .noise(Noise::Relative(0.03))
        .render_record(&reg, &mut rng);
        std::fs::write(dir.join(format!("tde_{i:05}.spec")), record)?;
    }
    Ok(())
}

fn main() -> Result<(), LightfitError> {
    env_logger::init();
    let args: Vec<String> = env::args().skip(1).collect();

    let scratch = tempfile::tempdir()?;
    let spectra = match args.first() {
        Some(dir) => Utf8PathBuf::from(dir),
        None => {
            let dir = Utf8PathBuf::from_path_buf(scratch.path().to_path_buf())
                .map_err(|p| LightfitError::Utf8PathError(p.display().to_string()))?;
            write_synthetic_folder(&dir, 12)?;
            dir
        }
    };

    let mut config = match args.get(1) {
        Some(path) => PipelineConfig::from_json_file(Utf8Path::new(path))?,
        None => PipelineConfig::builder()
            .band(BandDefinition::swift_xray())
            .extra_bands(vec![BandDefinition::ztf_optical()])
            .build()?,
    };
    config.input_location = Some(spectra);
    eprintln!("{config:#}");

    let output = Pipeline::new(config)?.run_configured()?;
    eprintln!("{}", output.series);

    write_series_csv(&output.series, std::io::stdout().lock())?;
    if !output.diagnostics.is_empty() {
        write_diagnostics_csv(&output.diagnostics, std::io::stderr().lock())?;
    }
    Ok(())
}

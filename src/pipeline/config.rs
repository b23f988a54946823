//! # Pipeline configuration
//!
//! [`PipelineConfig`] gathers everything a batch run needs: where the inputs are, which
//! band to integrate, the fit controls, the gap policy and the execution model. It can be
//! built in code through [`PipelineConfig::builder`] or read from JSON
//! ([`PipelineConfig::from_json_file`]); both paths end in [`PipelineConfig::validate`].
//!
//! ## Example
//!
//! ```rust
//! use lightfit::pipeline::config::PipelineConfig;
//!
//! let config = PipelineConfig::from_json_str(
//!     r#"{
//!         "input_location": "run42/spectra",
//!         "band": { "name": "X-ray", "lower_bound": 0.3, "upper_bound": 10.0, "unit": "kev" },
//!         "max_iterations": 100,
//!         "default_distance": 3.0e26
//!     }"#,
//! )
//! .unwrap();
//! assert_eq!(config.max_iterations, 100);
//! assert!(config.parallel);
//! ```
//!
//! Field defaults
//! -----------------
//! * `input_location`: none, `input_extension`: `"spec"`
//! * `band` (also read as `band_definition`): Swift X-ray, 0.3–10 keV
//! * `extra_bands`: none
//! * `fit_tolerance`: 1e-10, `max_iterations`: 200, `min_spectral_points`: 3
//! * `gap_policy`: `mark`, `residual_space`: `log_flux`, `fit_window`: none
//! * `flux_floor`: 0, `detection_threshold`: 3, `min_signal_to_noise`: 5
//! * `default_distance`: none (cm), `units`: identity
//! * `parallel`: true, `threads`: rayon default, `batch_timeout_ms`: none
use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::{
    bands::BandDefinition,
    constants::{Centimeter, ConstantsRegistry, SimulationUnits},
    fitter::{blackbody::MIN_USABLE_POINTS, FitParams, ResidualSpace},
    lightcurve::aggregator::GapPolicy,
    lightfit_errors::LightfitError,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Directory scanned for inputs by [`Pipeline::run_configured`](crate::pipeline::Pipeline::run_configured).
    pub input_location: Option<Utf8PathBuf>,
    pub input_extension: String,
    #[serde(alias = "band_definition")]
    pub band: BandDefinition,
    /// Further bands integrated for every entry, each exported as its own column.
    pub extra_bands: Vec<BandDefinition>,

    pub fit_tolerance: f64,
    pub max_iterations: usize,
    pub min_spectral_points: usize,
    pub residual_space: ResidualSpace,
    pub fit_window: Option<BandDefinition>,
    pub flux_floor: f64,
    pub detection_threshold: f64,
    pub min_signal_to_noise: f64,

    pub gap_policy: GapPolicy,
    /// Distance (cm) for records without a distance header.
    pub default_distance: Option<Centimeter>,
    pub units: SimulationUnits,

    pub parallel: bool,
    pub threads: Option<usize>,
    pub batch_timeout_ms: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            input_location: None,
            input_extension: "spec".into(),
            band: BandDefinition::swift_xray(),
            extra_bands: Vec::new(),

            fit_tolerance: 1e-10,
            max_iterations: 200,
            min_spectral_points: MIN_USABLE_POINTS,
            residual_space: ResidualSpace::LogFlux,
            fit_window: None,
            flux_floor: 0.0,
            detection_threshold: 3.0,
            min_signal_to_noise: 5.0,

            gap_policy: GapPolicy::Mark,
            default_distance: None,
            units: SimulationUnits::default(),

            parallel: true,
            threads: None,
            batch_timeout_ms: None,
        }
    }
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::new()
    }

    /// Parse and validate a JSON configuration; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, LightfitError> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Utf8Path) -> Result<Self, LightfitError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Check every field, including the derived [`FitParams`].
    ///
    /// Validation rules
    /// -----------------
    /// * `band`, `extra_bands` and `fit_window` are valid bands, all band names distinct.
    /// * `min_spectral_points ≥ 3`.
    /// * `default_distance`, when set, is finite and > 0.
    /// * `units` factors are finite and > 0.
    /// * `threads`, when set, is ≥ 1.
    /// * fit controls pass [`FitParamsBuilder::build`](crate::fitter::FitParamsBuilder::build).
    pub fn validate(&self) -> Result<(), LightfitError> {
        self.band.validate()?;
        let mut names = vec![self.band.name.as_str()];
        for band in &self.extra_bands {
            band.validate()?;
            if names.contains(&band.name.as_str()) {
                return Err(LightfitError::InvalidConfig(format!(
                    "band name {:?} used twice",
                    band.name
                )));
            }
            names.push(band.name.as_str());
        }
        if self.min_spectral_points < MIN_USABLE_POINTS {
            return Err(LightfitError::InvalidConfig(format!(
                "min_spectral_points must be >= {MIN_USABLE_POINTS}, got {}",
                self.min_spectral_points
            )));
        }
        if let Some(d) = self.default_distance {
            if !(d.is_finite() && d > 0.0) {
                return Err(LightfitError::InvalidConfig(format!(
                    "default_distance must be finite and > 0, got {d}"
                )));
            }
        }
        if self.threads == Some(0) {
            return Err(LightfitError::InvalidConfig("threads must be >= 1".into()));
        }
        if self.input_extension.trim_start_matches('.').is_empty() {
            return Err(LightfitError::InvalidConfig("input_extension is empty".into()));
        }
        self.units.validate()?;
        self.fit_params()?;
        Ok(())
    }

    /// Fit controls carried by this configuration.
    pub fn fit_params(&self) -> Result<FitParams, LightfitError> {
        FitParams::builder()
            .tolerance(self.fit_tolerance)
            .max_iterations(self.max_iterations)
            .residual_space(self.residual_space)
            .fit_window(self.fit_window.clone())
            .flux_floor(self.flux_floor)
            .detection_threshold(self.detection_threshold)
            .min_signal_to_noise(self.min_signal_to_noise)
            .build()
    }

    /// Registry holding CGS constants and this configuration's simulation units.
    pub fn registry(&self) -> ConstantsRegistry {
        ConstantsRegistry::with_units(self.units)
    }
}

/// Builder for [`PipelineConfig`], with validation.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input_location(mut self, v: impl Into<Utf8PathBuf>) -> Self {
        self.config.input_location = Some(v.into());
        self
    }
    pub fn input_extension(mut self, v: impl Into<String>) -> Self {
        self.config.input_extension = v.into();
        self
    }
    pub fn band(mut self, v: BandDefinition) -> Self {
        self.config.band = v;
        self
    }
    pub fn extra_bands(mut self, v: Vec<BandDefinition>) -> Self {
        self.config.extra_bands = v;
        self
    }
    pub fn fit_tolerance(mut self, v: f64) -> Self {
        self.config.fit_tolerance = v;
        self
    }
    pub fn max_iterations(mut self, v: usize) -> Self {
        self.config.max_iterations = v;
        self
    }
    pub fn min_spectral_points(mut self, v: usize) -> Self {
        self.config.min_spectral_points = v;
        self
    }
    pub fn residual_space(mut self, v: ResidualSpace) -> Self {
        self.config.residual_space = v;
        self
    }
    pub fn fit_window(mut self, v: Option<BandDefinition>) -> Self {
        self.config.fit_window = v;
        self
    }
    pub fn flux_floor(mut self, v: f64) -> Self {
        self.config.flux_floor = v;
        self
    }
    pub fn detection_threshold(mut self, v: f64) -> Self {
        self.config.detection_threshold = v;
        self
    }
    pub fn min_signal_to_noise(mut self, v: f64) -> Self {
        self.config.min_signal_to_noise = v;
        self
    }
    pub fn gap_policy(mut self, v: GapPolicy) -> Self {
        self.config.gap_policy = v;
        self
    }
    pub fn default_distance(mut self, v: Option<Centimeter>) -> Self {
        self.config.default_distance = v;
        self
    }
    pub fn units(mut self, v: SimulationUnits) -> Self {
        self.config.units = v;
        self
    }
    pub fn parallel(mut self, v: bool) -> Self {
        self.config.parallel = v;
        self
    }
    pub fn threads(mut self, v: Option<usize>) -> Self {
        self.config.threads = v;
        self
    }
    pub fn batch_timeout_ms(mut self, v: Option<u64>) -> Self {
        self.config.batch_timeout_ms = v;
        self
    }

    pub fn build(self) -> Result<PipelineConfig, LightfitError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl fmt::Display for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let location = self
            .input_location
            .as_ref()
            .map_or("<none>", |p| p.as_str());
        let threads = self
            .threads
            .map_or_else(|| "auto".to_string(), |t| t.to_string());

        if f.alternate() {
            const PARAM_COL: usize = 44;
            writeln!(f, "Pipeline Configuration")?;
            writeln!(f, "----------------------")?;

            macro_rules! line {
                ($fmt:expr, $val:expr, $comment:expr) => {{
                    let s = format!($fmt, $val);
                    let pad = if s.len() < PARAM_COL {
                        " ".repeat(PARAM_COL - s.len())
                    } else {
                        " ".to_string()
                    };
                    writeln!(f, "  {}{}# {}", s, pad, $comment)
                }};
            }

            writeln!(f, "[Inputs]")?;
            line!("input_location      = {}", location, "Directory of spectra")?;
            line!("input_extension     = {}", self.input_extension, "Input file extension")?;
            line!("min_spectral_points = {}", self.min_spectral_points, "Minimum points per record")?;
            line!("default_distance    = {:?}", self.default_distance, "Distance without header (cm)")?;

            writeln!(f, "\n[Fit]")?;
            line!("fit_tolerance       = {:.1e}", self.fit_tolerance, "Relative RSS improvement")?;
            line!("max_iterations      = {}", self.max_iterations, "Iteration budget")?;
            line!("residual_space      = {}", self.residual_space, "Residual definition")?;
            line!("min_signal_to_noise = {:.2}", self.min_signal_to_noise, "Degeneracy threshold")?;

            writeln!(f, "\n[Light curve]")?;
            line!("band                = {}", self.band, "Integrated band")?;
            for band in &self.extra_bands {
                line!("extra_band          = {}", band, "Additional band")?;
            }
            line!("gap_policy          = {}", self.gap_policy, "Failed-fit entries")?;

            writeln!(f, "\n[Execution]")?;
            line!("parallel            = {}", self.parallel, "Data-parallel batch")?;
            line!("threads             = {}", threads, "Worker threads")?;
            line!("batch_timeout_ms    = {:?}", self.batch_timeout_ms, "Wall-clock budget")?;

            Ok(())
        } else {
            write!(
                f,
                "PipelineConfig(input={}, band={}, tolerance={:.1e}, max_iterations={}, gap_policy={}, threads={})",
                location, self.band, self.fit_tolerance, self.max_iterations, self.gap_policy, threads
            )
        }
    }
}

#[cfg(test)]
mod config_test {
    use super::*;
    use crate::bands::BandUnit;

    #[test]
    fn test_builder_defaults() {
        let config = PipelineConfig::builder().build().unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.fit_params().unwrap().max_iterations, 200);
        assert!(format!("{config:#}").contains("[Execution]"));
        assert_eq!(
            format!("{config}"),
            "PipelineConfig(input=<none>, band=X-ray [0.3, 10] keV, tolerance=1.0e-10, max_iterations=200, gap_policy=mark, threads=auto)"
        );
    }

    #[test]
    fn test_invalid_configs() {
        let bad_band = BandDefinition {
            name: "b".into(),
            lower_bound: 2.0,
            upper_bound: 1.0,
            unit: BandUnit::Nanometer,
        };
        assert!(matches!(
            PipelineConfig::builder().band(bad_band).build(),
            Err(LightfitError::InvalidBand(_))
        ));
        assert!(matches!(
            PipelineConfig::builder()
                .extra_bands(vec![BandDefinition::swift_xray()])
                .build(),
            Err(LightfitError::InvalidConfig(_))
        ));
        assert!(matches!(
            PipelineConfig::builder().min_spectral_points(2).build(),
            Err(LightfitError::InvalidConfig(_))
        ));
        assert!(matches!(
            PipelineConfig::builder().threads(Some(0)).build(),
            Err(LightfitError::InvalidConfig(_))
        ));
        assert!(matches!(
            PipelineConfig::builder().default_distance(Some(-1.0)).build(),
            Err(LightfitError::InvalidConfig(_))
        ));
        assert!(matches!(
            PipelineConfig::builder().max_iterations(0).build(),
            Err(LightfitError::InvalidFitParameter(_))
        ));
        assert!(matches!(
            PipelineConfig::builder()
                .units(SimulationUnits {
                    time_to_seconds: 0.0,
                    ..Default::default()
                })
                .build(),
            Err(LightfitError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_json() {
        let config = PipelineConfig::from_json_str(
            r#"{"gap_policy": "omit", "residual_space": "flux", "threads": 2,
                "fit_window": {"name": "Optical/UV", "lower_bound": 367.6, "upper_bound": 901.0},
                "units": {"time_to_seconds": 86400.0}}"#,
        )
        .unwrap();
        assert_eq!(config.gap_policy, GapPolicy::Omit);
        assert_eq!(config.residual_space, ResidualSpace::Flux);
        assert_eq!(config.threads, Some(2));
        assert_eq!(config.fit_window, Some(BandDefinition::ztf_optical()));
        assert_eq!(config.units.time_to_seconds, 86400.0);
        assert_eq!(config.units.length_to_cm, 1.0);

        assert!(matches!(
            PipelineConfig::from_json_str(r#"{"max_iteration": 3}"#),
            Err(LightfitError::JsonError(_))
        ));
        assert!(matches!(
            PipelineConfig::from_json_str(r#"{"max_iterations": 0}"#),
            Err(LightfitError::InvalidFitParameter(_))
        ));
    }

    #[test]
    fn test_band_definition_key() {
        let config = PipelineConfig::from_json_str(
            r#"{"input_location": "x",
                "band_definition": {"name": "X-ray", "lower_bound": 0.3, "upper_bound": 10.0, "unit": "kev"},
                "fit_tolerance": 1e-8, "max_iterations": 100, "min_spectral_points": 5}"#,
        )
        .unwrap();
        assert_eq!(config.band, BandDefinition::swift_xray());
        assert_eq!(config.fit_tolerance, 1e-8);
        assert_eq!(config.min_spectral_points, 5);

        let nm = PipelineConfig::from_json_str(
            r#"{"band_definition": {"name": "Optical/UV", "lower_bound": 367.6, "upper_bound": 901.0}}"#,
        )
        .unwrap();
        assert_eq!(nm.band, BandDefinition::ztf_optical());

        let both = PipelineConfig::from_json_str(
            r#"{"extra_bands": [{"name": "Optical/UV", "lower_bound": 367.6, "upper_bound": 901.0}]}"#,
        )
        .unwrap();
        assert_eq!(both.extra_bands, vec![BandDefinition::ztf_optical()]);
        assert!(format!("{both:#}").contains("extra_band"));
    }

    #[test]
    fn test_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8Path::from_path(dir.path()).unwrap().join("config.json");
        std::fs::write(&path, r#"{"input_location": "spectra", "parallel": false}"#).unwrap();
        let config = PipelineConfig::from_json_file(&path).unwrap();
        assert_eq!(config.input_location, Some(Utf8PathBuf::from("spectra")));
        assert!(!config.parallel);

        assert!(matches!(
            PipelineConfig::from_json_file(&path.with_file_name("missing.json")),
            Err(LightfitError::IoError(_))
        ));
    }
}

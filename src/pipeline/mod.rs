//! # Batch pipeline: spectra → light curve
//!
//! [`Pipeline`] drives **Load → Fit → Derive → Aggregate** over every input of a
//! [`SnapshotSource`], isolating failures per input:
//!
//! * a [`MalformedInputError`](crate::lightfit_errors::MalformedInputError) skips the
//!   input with a `load` [`Diagnostic`],
//! * a failed fit still produces a gap entry, plus a `fit` diagnostic,
//! * inputs not started before the optional batch time budget elapses are skipped with a
//!   `timeout` diagnostic.
//!
//! Only aggregator contract violations (two inputs at the same time) abort the batch.
//!
//! Concurrency
//! -----------------
//! Per-input work depends only on the input and the shared read-only
//! [`ConstantsRegistry`]. With `parallel = true`, inputs are processed on a rayon pool
//! (the global one, or a dedicated pool of `threads` workers); the aggregator orders the
//! entries by time and diagnostics are reported in input order, so the output is the same
//! whatever the scheduling.
//!
//! ## Example
//!
//! ```rust,no_run
//! use lightfit::pipeline::{config::PipelineConfig, Pipeline};
//! use lightfit::snapshot::source::DirectorySource;
//!
//! let config = PipelineConfig::builder()
//!     .default_distance(Some(3.0e26))
//!     .build()
//!     .unwrap();
//! let pipeline = Pipeline::new(config).unwrap();
//! let output = pipeline.run(&DirectorySource::new("run42/spectra")).unwrap();
//! println!("{}", output.series);
//! for d in &output.diagnostics {
//!     eprintln!("{d}");
//! }
//! ```
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::{
    constants::ConstantsRegistry,
    fitter::blackbody::BlackbodyFitter,
    lightcurve::{
        aggregator::LightcurveAggregator, LightcurveEntry, LightcurveSeries,
    },
    lightfit_errors::LightfitError,
    physics::PhysicsEngine,
    snapshot::{
        source::{DirectorySource, InputRef, SnapshotSource},
        spec_reader::SnapshotLoader,
    },
};

pub mod config;
pub mod diagnostics;
pub mod progress;

use config::PipelineConfig;
use diagnostics::Diagnostic;
use progress::{BatchProgress, InputOutcome};

/// Result of one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub series: LightcurveSeries,
    /// One entry per skipped or degraded input, in input order.
    pub diagnostics: Vec<Diagnostic>,
}

/// What processing one input produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Processed {
    /// Entry to aggregate (a gap entry when the fit failed), with the fit diagnostic if any.
    Entry {
        entry: LightcurveEntry,
        diagnostic: Option<Diagnostic>,
    },
    /// Input skipped before producing an entry.
    Skipped(Diagnostic),
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    registry: Arc<ConstantsRegistry>,
    loader: SnapshotLoader,
    fitter: BlackbodyFitter,
    physics: PhysicsEngine,
}

impl Pipeline {
    /// Validate the configuration and assemble loader, fitter and physics engine around one
    /// shared registry.
    pub fn new(config: PipelineConfig) -> Result<Self, LightfitError> {
        config.validate()?;
        let registry = Arc::new(config.registry());
        let loader = SnapshotLoader::new(Arc::clone(&registry))
            .with_min_points(config.min_spectral_points)
            .with_default_distance(config.default_distance);
        let fitter = BlackbodyFitter::new(Arc::clone(&registry), config.fit_params()?);
        let physics = PhysicsEngine::new(Arc::clone(&registry), config.band.clone())
            .with_extra_bands(config.extra_bands.clone());

        Ok(Pipeline {
            config,
            registry,
            loader,
            fitter,
            physics,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn registry(&self) -> &ConstantsRegistry {
        &self.registry
    }

    pub fn fitter(&self) -> &BlackbodyFitter {
        &self.fitter
    }

    pub fn physics(&self) -> &PhysicsEngine {
        &self.physics
    }

    /// Load, fit and derive one input. Never fails: problems become diagnostics.
    pub fn process(&self, input: &InputRef) -> Processed {
        let snapshot = match self.loader.load(input) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("skipping {}: {e}", input.label());
                return Processed::Skipped(Diagnostic::load(input.label(), &e));
            }
        };

        let fit = self.fitter.fit(&snapshot);
        debug!("{}: {fit}", input.label());
        let diagnostic = fit.failure().map(|failure| {
            warn!("fit failed for {}: {failure}", input.label());
            Diagnostic::fit(input.label(), failure)
        });

        let entry = LightcurveEntry::new(self.physics.derive(&fit))
            .with_source(input.label())
            .with_reference(snapshot.reference().copied())
            .with_colour_temperature(self.physics.colour_temperature(&snapshot));

        Processed::Entry { entry, diagnostic }
    }

    /// Process every input of `source` and return the finalized light curve.
    ///
    /// Arguments
    /// -----------------
    /// * `source`: Provider of the ordered input list.
    ///
    /// Return
    /// ----------
    /// * [`PipelineOutput`] with the time-ordered series and the diagnostics.
    /// * `Err` when the source cannot be listed, the worker pool cannot be built, or two
    ///   inputs share the same time ([`LightfitError::DuplicateTime`]).
    pub fn run<S>(&self, source: &S) -> Result<PipelineOutput, LightfitError>
    where
        S: SnapshotSource + ?Sized,
    {
        let inputs = source.inputs()?;
        let start = Instant::now();
        let deadline = self
            .config
            .batch_timeout_ms
            .map(|ms| start + Duration::from_millis(ms));
        info!("processing {} inputs ({})", inputs.len(), self.config);

        let aggregator = LightcurveAggregator::new(self.config.gap_policy);
        let progress = BatchProgress::new(inputs.len());

        let step = |input: &InputRef| -> Result<Option<Diagnostic>, LightfitError> {
            let outcome = match deadline {
                Some(d) if Instant::now() >= d => {
                    warn!("batch time budget exhausted, skipping {}", input.label());
                    Processed::Skipped(Diagnostic::timeout(input.label()))
                }
                _ => self.process(input),
            };
            match outcome {
                Processed::Entry { entry, diagnostic } => {
                    progress.tick(if diagnostic.is_some() {
                        InputOutcome::Gap
                    } else {
                        InputOutcome::Fitted
                    });
                    aggregator.accumulate(entry)?;
                    Ok(diagnostic)
                }
                Processed::Skipped(diagnostic) => {
                    progress.tick(InputOutcome::Skipped);
                    Ok(Some(diagnostic))
                }
            }
        };

        let outcomes: Vec<Result<Option<Diagnostic>, LightfitError>> = if self.config.parallel {
            match self.config.threads {
                Some(threads) => rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()?
                    .install(|| inputs.par_iter().map(step).collect()),
                None => inputs.par_iter().map(step).collect(),
            }
        } else {
            inputs.iter().map(step).collect()
        };
        progress.finish();

        let diagnostics = outcomes
            .into_iter()
            .filter_map(Result::transpose)
            .collect::<Result<Vec<_>, _>>()?;
        let series = aggregator.finalize()?;

        info!(
            "{} inputs ({}) in {:.2?}: {} entries in the series",
            progress.tally().processed(),
            progress.tally(),
            start.elapsed(),
            series.len()
        );
        Ok(PipelineOutput {
            series,
            diagnostics,
        })
    }

    /// Run on the directory named by `input_location`.
    pub fn run_configured(&self) -> Result<PipelineOutput, LightfitError> {
        let location = self.config.input_location.as_ref().ok_or_else(|| {
            LightfitError::InvalidConfig("input_location is not set".into())
        })?;
        let source = DirectorySource::with_extension(location, self.config.input_extension.as_str());
        self.run(&source)
    }
}

#[cfg(test)]
mod pipeline_test {
    use super::*;
    use crate::pipeline::diagnostics::Stage;

    fn record(time: f64, temperature: f64) -> String {
        let reg = ConstantsRegistry::cgs();
        let params = crate::planck::BlackbodyParams {
            temperature,
            radius: 1e14,
        };
        let mut text = format!("# time: {}\n# distance: 1e26\n# axis: wavelength\n", time * 86_400.0);
        for i in 0..60 {
            let nm = 20.0 * 1.08f64.powi(i);
            let flux = crate::planck::model_flux(&reg, nm * 1e-7, &params, 1e26) * 1e-7;
            text.push_str(&format!("{nm} {flux:e}\n"));
        }
        text
    }

    fn pipeline(parallel: bool) -> Pipeline {
        Pipeline::new(PipelineConfig::builder().parallel(parallel).build().unwrap()).unwrap()
    }

    #[test]
    fn test_process_outcomes() {
        let p = pipeline(false);
        match p.process(&InputRef::memory("good", record(1.0, 2e4))) {
            Processed::Entry { entry, diagnostic } => {
                assert!(entry.is_valid());
                assert!(diagnostic.is_none());
                assert_eq!(entry.source.as_deref(), Some("good"));
                let colour = entry.colour_temperature.unwrap();
                assert!((colour - 2e4).abs() < 0.1 * 2e4, "{colour}");
            }
            other => panic!("unexpected {other:?}"),
        }
        match p.process(&InputRef::memory("bad", "# time: 1\n")) {
            Processed::Skipped(d) => assert_eq!(d.stage, Stage::Load),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_zero_timeout_skips_everything() {
        let config = PipelineConfig::builder()
            .batch_timeout_ms(Some(0))
            .build()
            .unwrap();
        let inputs = vec![
            InputRef::memory("a", record(1.0, 2e4)),
            InputRef::memory("b", record(2.0, 2e4)),
        ];
        let output = Pipeline::new(config).unwrap().run(&inputs).unwrap();
        assert!(output.series.is_empty());
        assert_eq!(output.diagnostics.len(), 2);
        assert!(output.diagnostics.iter().all(|d| d.stage == Stage::Timeout));
    }

    #[test]
    fn test_run_configured_requires_location() {
        assert!(matches!(
            pipeline(true).run_configured(),
            Err(LightfitError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_duplicate_time_escalates() {
        let inputs = vec![
            InputRef::memory("a", record(1.0, 2e4)),
            InputRef::memory("b", record(1.0, 3e4)),
        ];
        assert_eq!(
            pipeline(false).run(&inputs),
            Err(LightfitError::DuplicateTime(1.0))
        );
    }
}

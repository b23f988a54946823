//! # lightfit
//!
//! Blackbody fits and light curves from time-ordered simulation spectra.
//!
//! Each snapshot spectrum is fitted with a single-temperature Planck model
//! `F_λ = π B_λ(T) (R / D)²`; the fitted `(T, R)` give a bolometric luminosity
//! `4π R² σ T⁴` and a band luminosity integrated over a survey band. The per-snapshot
//! results are gathered into a time-ordered [`LightcurveSeries`](crate::lightcurve::LightcurveSeries).
//!
//! Modules
//! -----------------
//! * [`snapshot`] – Ingestion and validation of spectral records.
//! * [`fitter`] – Levenberg–Marquardt blackbody fit.
//! * [`physics`] – Luminosities from fitted parameters.
//! * [`lightcurve`] – Time-ordered aggregation and CSV export.
//! * [`pipeline`] – Batch driver with per-input failure isolation.
//! * [`synthetic`] – Known-truth spectra for tests and benchmarks.
pub mod bands;
pub mod constants;
pub mod conversion;
pub mod fitter;
pub mod lightcurve;
pub mod lightfit_errors;
pub mod physics;
pub mod pipeline;
pub mod planck;
pub mod snapshot;
pub mod synthetic;

pub use bands::BandDefinition;
pub use constants::ConstantsRegistry;
pub use fitter::{blackbody::BlackbodyFitter, fit_result::FitResult, FitParams};
pub use lightcurve::{aggregator::LightcurveAggregator, LightcurveEntry, LightcurveSeries};
pub use lightfit_errors::{LightfitError, MalformedInputError};
pub use physics::{BandLuminosity, DerivedLuminosities, PhysicsEngine};
pub use pipeline::{config::PipelineConfig, Pipeline, PipelineOutput};
pub use planck::BlackbodyParams;
pub use snapshot::{source::InputRef, SpectralSnapshot};

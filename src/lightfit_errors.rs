use thiserror::Error;

/// Structural problems in one snapshot input record.
///
/// These are data-quality errors: the pipeline records them as diagnostics, skips the
/// offending input and keeps processing the batch.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MalformedInputError {
    #[error("Unable to read input: {0}")]
    Unreadable(String),

    #[error("Input contains no spectral data")]
    EmptyInput,

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid header line {line}: {content}")]
    InvalidHeader { line: usize, content: String },

    #[error("Invalid data line {line}: {content}")]
    InvalidDataLine { line: usize, content: String },

    #[error("Column length mismatch: {wavelength} wavelengths for {flux} flux values")]
    LengthMismatch { wavelength: usize, flux: usize },

    #[error("Not enough spectral points: found {found}, at least {required} required")]
    NotEnoughPoints { found: usize, required: usize },

    #[error("Spectral grid contains duplicate abscissa {0}")]
    NonMonotonicGrid(f64),

    #[error("Spectral grid value must be finite and > 0, got {0}")]
    NonPositiveAbscissa(f64),

    #[error("Flux value is not finite at index {0}")]
    NonFiniteFlux(usize),

    #[error("Distance must be finite and > 0, got {0}")]
    NonPositiveDistance(f64),

    #[error("Simulation time must be finite, got {0}")]
    NonFiniteTime(f64),

    #[error("Companion light-curve file {path} is invalid: {reason}")]
    InvalidCompanion { path: String, reason: String },
}

#[derive(Error, Debug)]
pub enum LightfitError {
    #[error("Malformed snapshot input: {0}")]
    MalformedInput(#[from] MalformedInputError),

    #[error("Two light-curve entries claim the same time: {0}")]
    DuplicateTime(f64),

    #[error("Light-curve entry time must be finite, got {0}")]
    NonFiniteTime(f64),

    #[error("The light-curve series is already finalized")]
    SeriesFinalized,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid fit parameter: {0}")]
    InvalidFitParameter(String),

    #[error("Invalid band definition: {0}")]
    InvalidBand(String),

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV export error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON configuration error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Unable to build the worker pool: {0}")]
    ThreadPoolError(#[from] rayon::ThreadPoolBuildError),

    #[error("UTF-8 Path error: {0}")]
    Utf8PathError(String),
}

impl PartialEq for LightfitError {
    fn eq(&self, other: &Self) -> bool {
        use LightfitError::*;
        match (self, other) {
            (MalformedInput(a), MalformedInput(b)) => a == b,
            (DuplicateTime(a), DuplicateTime(b)) => a == b,
            (NonFiniteTime(a), NonFiniteTime(b)) => a.to_bits() == b.to_bits(),
            (InvalidConfig(a), InvalidConfig(b)) => a == b,
            (InvalidFitParameter(a), InvalidFitParameter(b)) => a == b,
            (InvalidBand(a), InvalidBand(b)) => a == b,
            (Utf8PathError(a), Utf8PathError(b)) => a == b,

            // foreign errors are not comparable: same variant is enough
            (IoError(_), IoError(_)) => true,
            (CsvError(_), CsvError(_)) => true,
            (JsonError(_), JsonError(_)) => true,
            (ThreadPoolError(_), ThreadPoolError(_)) => true,

            (SeriesFinalized, SeriesFinalized) => true,

            _ => false,
        }
    }
}

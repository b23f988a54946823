//! Per-input diagnostics emitted by the pipeline.
use std::fmt;

use serde::Serialize;

use crate::{fitter::fit_result::FitFailure, lightfit_errors::MalformedInputError};

/// Stage at which an input was skipped or degraded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Load,
    Fit,
    Timeout,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Load => write!(f, "load"),
            Stage::Fit => write!(f, "fit"),
            Stage::Timeout => write!(f, "timeout"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub input_reference: String,
    pub stage: Stage,
    pub reason: String,
}

impl Diagnostic {
    pub fn load(input_reference: impl Into<String>, error: &MalformedInputError) -> Self {
        Diagnostic {
            input_reference: input_reference.into(),
            stage: Stage::Load,
            reason: error.to_string(),
        }
    }

    pub fn fit(input_reference: impl Into<String>, failure: &FitFailure) -> Self {
        Diagnostic {
            input_reference: input_reference.into(),
            stage: Stage::Fit,
            reason: failure.to_string(),
        }
    }

    pub fn timeout(input_reference: impl Into<String>) -> Self {
        Diagnostic {
            input_reference: input_reference.into(),
            stage: Stage::Timeout,
            reason: "batch time budget exhausted before processing".into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.stage, self.input_reference, self.reason)
    }
}

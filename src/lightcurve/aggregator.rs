//! Thread-safe light-curve aggregation.
//!
//! [`LightcurveAggregator`] accepts entries in any order and from any thread; a mutex
//! guards a `BTreeMap` keyed by time, so the finalized series comes out sorted whatever
//! the completion order of the workers.
//!
//! Contract
//! -----------------
//! * A second entry for an existing time fails with [`LightfitError::DuplicateTime`],
//!   unless it is submitted through [`LightcurveAggregator::replace`].
//! * A non-finite time fails with [`LightfitError::NonFiniteTime`].
//! * After [`LightcurveAggregator::finalize`], every call fails with
//!   [`LightfitError::SeriesFinalized`].
use std::{
    collections::BTreeMap,
    fmt,
    sync::{Mutex, MutexGuard, PoisonError},
};

use ordered_float::NotNan;
use serde::{Deserialize, Serialize};

use crate::{
    lightcurve::{LightcurveEntry, LightcurveSeries},
    lightfit_errors::LightfitError,
};

/// What to do with invalid (failed-fit) entries at finalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GapPolicy {
    /// Keep them as explicit gap markers.
    #[default]
    Mark,
    /// Drop them from the series.
    Omit,
}

impl fmt::Display for GapPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GapPolicy::Mark => write!(f, "mark"),
            GapPolicy::Omit => write!(f, "omit"),
        }
    }
}

#[derive(Debug, Default)]
struct AggregatorState {
    entries: BTreeMap<NotNan<f64>, LightcurveEntry>,
    finalized: bool,
}

#[derive(Debug, Default)]
pub struct LightcurveAggregator {
    state: Mutex<AggregatorState>,
    policy: GapPolicy,
}

impl LightcurveAggregator {
    pub fn new(policy: GapPolicy) -> Self {
        LightcurveAggregator {
            state: Mutex::new(AggregatorState::default()),
            policy,
        }
    }

    pub fn policy(&self) -> GapPolicy {
        self.policy
    }

    // every mutation is a single insert: a poisoned state is still consistent
    fn lock(&self) -> MutexGuard<'_, AggregatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn key(entry: &LightcurveEntry) -> Result<NotNan<f64>, LightfitError> {
        let time = entry.time();
        if !time.is_finite() {
            return Err(LightfitError::NonFiniteTime(time));
        }
        NotNan::new(time).map_err(|_| LightfitError::NonFiniteTime(time))
    }

    /// Add an entry.
    ///
    /// Arguments
    /// -----------------
    /// * `entry`: Light-curve entry, or anything convertible into one (e.g.
    ///   [`DerivedLuminosities`](crate::physics::DerivedLuminosities)).
    ///
    /// Return
    /// ----------
    /// * `Ok(())`, or [`LightfitError::DuplicateTime`], [`LightfitError::NonFiniteTime`],
    ///   [`LightfitError::SeriesFinalized`]. The aggregator is unchanged on error.
    pub fn accumulate(&self, entry: impl Into<LightcurveEntry>) -> Result<(), LightfitError> {
        let entry = entry.into();
        let key = Self::key(&entry)?;
        let mut state = self.lock();
        if state.finalized {
            return Err(LightfitError::SeriesFinalized);
        }
        if state.entries.contains_key(&key) {
            return Err(LightfitError::DuplicateTime(entry.time()));
        }
        state.entries.insert(key, entry);
        Ok(())
    }

    /// Add or overwrite the entry at the same time, returning the previous one.
    pub fn replace(
        &self,
        entry: impl Into<LightcurveEntry>,
    ) -> Result<Option<LightcurveEntry>, LightfitError> {
        let entry = entry.into();
        let key = Self::key(&entry)?;
        let mut state = self.lock();
        if state.finalized {
            return Err(LightfitError::SeriesFinalized);
        }
        Ok(state.entries.insert(key, entry))
    }

    /// Number of entries collected so far (gaps included).
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Freeze the aggregator and produce the time-ordered series.
    ///
    /// Invalid entries are kept or dropped according to the [`GapPolicy`].
    pub fn finalize(&self) -> Result<LightcurveSeries, LightfitError> {
        let mut state = self.lock();
        if state.finalized {
            return Err(LightfitError::SeriesFinalized);
        }
        state.finalized = true;

        let entries = std::mem::take(&mut state.entries)
            .into_values()
            .filter(|e| self.policy == GapPolicy::Mark || e.is_valid())
            .collect();
        Ok(LightcurveSeries::from_sorted(entries))
    }
}

//! # Light-curve series
//!
//! A [`LightcurveSeries`] is the finalized, immutable output of a batch: entries strictly
//! increasing and unique by time. Failed fits appear as explicit invalid gap entries unless
//! the [`GapPolicy`](crate::lightcurve::aggregator::GapPolicy) omits them.
//!
//! Modules
//! -----------------
//! * [`aggregator`](crate::lightcurve::aggregator) – thread-safe collection of entries and
//!   finalization.
//! * [`export`](crate::lightcurve::export) – CSV serialization of series and diagnostics.
use std::fmt;

use crate::{
    constants::{Days, Kelvin},
    physics::DerivedLuminosities,
    snapshot::SimulationReference,
};

pub mod aggregator;
pub mod export;

/// One point of the light curve.
#[derive(Debug, Clone, PartialEq)]
pub struct LightcurveEntry {
    pub luminosities: DerivedLuminosities,
    /// Input the entry was derived from.
    pub source: Option<String>,
    /// Totals reported by the simulation for the same timestep.
    pub reference: Option<SimulationReference>,
    /// Wien temperature of the spectrum peak, independent of the fit.
    pub colour_temperature: Option<Kelvin>,
}

impl LightcurveEntry {
    pub fn new(luminosities: DerivedLuminosities) -> Self {
        LightcurveEntry {
            luminosities,
            source: None,
            reference: None,
            colour_temperature: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_reference(mut self, reference: Option<SimulationReference>) -> Self {
        self.reference = reference;
        self
    }

    pub fn with_colour_temperature(mut self, temperature: Option<Kelvin>) -> Self {
        self.colour_temperature = temperature;
        self
    }

    pub fn time(&self) -> Days {
        self.luminosities.time
    }

    pub fn is_valid(&self) -> bool {
        self.luminosities.valid
    }
}

impl From<DerivedLuminosities> for LightcurveEntry {
    fn from(luminosities: DerivedLuminosities) -> Self {
        LightcurveEntry::new(luminosities)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LightcurveSeries {
    entries: Vec<LightcurveEntry>,
}

impl LightcurveSeries {
    /// Wrap entries already sorted and unique by time.
    pub(crate) fn from_sorted(entries: Vec<LightcurveEntry>) -> Self {
        debug_assert!(entries.windows(2).all(|w| w[0].time() < w[1].time()));
        LightcurveSeries { entries }
    }

    pub fn entries(&self) -> &[LightcurveEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &LightcurveEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn times(&self) -> Vec<Days> {
        self.entries.iter().map(LightcurveEntry::time).collect()
    }

    pub fn valid_entries(&self) -> impl Iterator<Item = &LightcurveEntry> {
        self.entries.iter().filter(|e| e.is_valid())
    }

    pub fn gap_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_valid()).count()
    }

    /// Valid entry with the largest bolometric luminosity (earliest one on ties).
    pub fn peak(&self) -> Option<&LightcurveEntry> {
        self.valid_entries().fold(None, |best: Option<&LightcurveEntry>, e| match best {
            Some(b) if b.luminosities.bolometric_luminosity >= e.luminosities.bolometric_luminosity => {
                Some(b)
            }
            _ => Some(e),
        })
    }

    /// Time of every entry relative to the bolometric peak, `t − t_peak` in days.
    ///
    /// Returns `None` when the series has no valid entry.
    pub fn time_since_peak(&self) -> Option<Vec<Days>> {
        let t_peak = self.peak()?.time();
        Some(self.entries.iter().map(|e| e.time() - t_peak).collect())
    }
}

impl<'a> IntoIterator for &'a LightcurveSeries {
    type Item = &'a LightcurveEntry;
    type IntoIter = std::slice::Iter<'a, LightcurveEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl fmt::Display for LightcurveSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Light curve: {} entries ({} gaps)",
            self.len(),
            self.gap_count()
        )?;
        writeln!(
            f,
            "{:>12}  {:>12}  {:>12}  {:>12}  {:>12}",
            "time [d]", "L_bol", "L_band", "T [K]", "R [cm]"
        )?;
        for e in &self.entries {
            let l = &e.luminosities;
            if l.valid {
                writeln!(
                    f,
                    "{:>12.4}  {:>12.4e}  {:>12.4e}  {:>12.1}  {:>12.4e}",
                    l.time, l.bolometric_luminosity, l.band_luminosity, l.temperature, l.radius
                )?;
            } else {
                writeln!(f, "{:>12.4}  {:>12}", l.time, "gap")?;
            }
        }
        Ok(())
    }
}

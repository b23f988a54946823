//! CSV export of light curves and diagnostics.
//!
//! Columns of the light-curve file:
//!
//! ```text
//! time,bolometric_luminosity,band,band_luminosity,temperature,radius,valid,
//! time_since_peak,source,sim_total_luminosity,sim_effective_radius,sim_effective_temperature,
//! colour_temperature,bolometric_to_band_ratio[,<extra band>_luminosity...]
//! ```
//!
//! `time_since_peak` is empty when the series has no valid entry, the `sim_*` columns when
//! the snapshot came without a companion light-curve file. One `<name>_luminosity` column
//! follows for every extra band found in the series.
use std::io::Write;

use camino::Utf8Path;
use itertools::Itertools;

use crate::{
    lightcurve::{LightcurveEntry, LightcurveSeries},
    lightfit_errors::LightfitError,
    pipeline::diagnostics::Diagnostic,
};

const FIXED_COLUMNS: [&str; 14] = [
    "time",
    "bolometric_luminosity",
    "band",
    "band_luminosity",
    "temperature",
    "radius",
    "valid",
    "time_since_peak",
    "source",
    "sim_total_luminosity",
    "sim_effective_radius",
    "sim_effective_temperature",
    "colour_temperature",
    "bolometric_to_band_ratio",
];

fn number(x: f64) -> String {
    format!("{x:?}")
}

fn optional(x: Option<f64>) -> String {
    x.map(number).unwrap_or_default()
}

/// Names of the extra bands present in `series`, in order of first appearance.
pub fn extra_band_names(series: &LightcurveSeries) -> Vec<&str> {
    series
        .iter()
        .flat_map(|e| e.luminosities.extra_bands.iter().map(|b| b.band.as_str()))
        .unique()
        .collect()
}

/// Header row for a series with the given extra bands.
pub fn header(extra_bands: &[&str]) -> Vec<String> {
    FIXED_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(extra_bands.iter().map(|b| format!("{b}_luminosity")))
        .collect()
}

/// One CSV row for `entry`, aligned with [`header`].
pub fn record(entry: &LightcurveEntry, peak_time: Option<f64>, extra_bands: &[&str]) -> Vec<String> {
    let l = &entry.luminosities;
    let reference = entry.reference;
    let mut row = vec![
        number(l.time),
        number(l.bolometric_luminosity),
        l.band.clone(),
        number(l.band_luminosity),
        number(l.temperature),
        number(l.radius),
        l.valid.to_string(),
        optional(peak_time.map(|t| l.time - t)),
        entry.source.clone().unwrap_or_default(),
        optional(reference.map(|r| r.total_luminosity)),
        optional(reference.map(|r| r.effective_radius)),
        optional(reference.map(|r| r.effective_temperature)),
        optional(entry.colour_temperature),
        optional(l.bolometric_to_band_ratio()),
    ];
    row.extend(extra_bands.iter().map(|b| optional(l.luminosity_in(b))));
    row
}

/// Write a series as CSV (header included) to any writer.
pub fn write_series_csv<W: Write>(series: &LightcurveSeries, writer: W) -> Result<(), LightfitError> {
    let peak_time = series.peak().map(LightcurveEntry::time);
    let extra_bands = extra_band_names(series);
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(header(&extra_bands))?;
    for entry in series {
        csv.write_record(record(entry, peak_time, &extra_bands))?;
    }
    csv.flush()?;
    Ok(())
}

/// Write a series as CSV to `path`, creating or truncating the file.
pub fn write_series_csv_file(series: &LightcurveSeries, path: &Utf8Path) -> Result<(), LightfitError> {
    let file = std::fs::File::create(path)?;
    write_series_csv(series, file)
}

/// Write diagnostics as CSV (`input_reference,stage,reason`).
pub fn write_diagnostics_csv<W: Write>(diagnostics: &[Diagnostic], writer: W) -> Result<(), LightfitError> {
    let mut csv = csv::Writer::from_writer(writer);
    for d in diagnostics {
        csv.serialize(d)?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_diagnostics_csv_file(diagnostics: &[Diagnostic], path: &Utf8Path) -> Result<(), LightfitError> {
    let file = std::fs::File::create(path)?;
    write_diagnostics_csv(diagnostics, file)
}

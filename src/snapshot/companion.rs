//! Companion light-curve files.
//!
//! The radiation-hydrodynamics code writes, next to each numbered spectrum
//! `<name>_NNNNN*.spec`, a one-row file `lightcurve_<name>_NNNNN*.out` holding the
//! global quantities of the same timestep:
//!
//! ```text
//! <time [sim]>  <L_tot [erg/s]>  <R_eff [sim]>  <T_eff [K]>
//! ```
//!
//! The loader uses it to date spectra that carry no `# time:` header, and keeps the other
//! three columns as a [`SimulationReference`] for comparison with the fitted values.
use std::sync::LazyLock;

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;

use crate::{
    constants::{ConstantsRegistry, Days},
    lightfit_errors::MalformedInputError,
    snapshot::SimulationReference,
};

static SNAPSHOT_INDEX: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"_(\d{5})[^/]*\.spec$"));

/// Content of one companion file, converted to days / cm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompanionRecord {
    pub time: Days,
    pub reference: SimulationReference,
}

/// Five-digit timestep index embedded in a spectrum file name, if any.
///
/// ```
/// use camino::Utf8Path;
/// use lightfit::snapshot::companion::snapshot_index;
///
/// assert_eq!(snapshot_index(Utf8Path::new("run/tde_00042.spec")), Some(42));
/// assert_eq!(snapshot_index(Utf8Path::new("run/tde.spec")), None);
/// ```
pub fn snapshot_index(spec_path: &Utf8Path) -> Option<u32> {
    let file_name = spec_path.file_name()?;
    let regex = SNAPSHOT_INDEX.as_ref().ok()?;
    regex
        .captures(file_name)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Path of the companion file of a spectrum: `lightcurve_<stem>.out` in the same directory.
pub fn companion_path(spec_path: &Utf8Path) -> Utf8PathBuf {
    let stem = spec_path.file_stem().unwrap_or_default();
    let name = format!("lightcurve_{stem}.out");
    match spec_path.parent() {
        Some(dir) => dir.join(name),
        None => Utf8PathBuf::from(name),
    }
}

/// Read the companion file of a numbered spectrum.
///
/// Arguments
/// -----------------
/// * `reg`: Registry converting simulation time and length units.
/// * `spec_path`: Path of the `.spec` file.
///
/// Return
/// ----------
/// * `Ok(None)` when the spectrum name carries no timestep index (no companion expected),
/// * `Ok(Some(record))` when the companion exists and parses,
/// * [`MalformedInputError::InvalidCompanion`] when it is expected but missing or invalid.
pub fn read_companion(
    reg: &ConstantsRegistry,
    spec_path: &Utf8Path,
) -> Result<Option<CompanionRecord>, MalformedInputError> {
    if snapshot_index(spec_path).is_none() {
        return Ok(None);
    }

    let path = companion_path(spec_path);
    let invalid = |reason: String| MalformedInputError::InvalidCompanion {
        path: path.to_string(),
        reason,
    };

    let contents = std::fs::read_to_string(&path).map_err(|e| invalid(e.to_string()))?;
    let row = parse_companion_row(&contents).map_err(invalid)?;

    Ok(Some(CompanionRecord {
        time: reg.sim_time_to_days(row[0]),
        reference: SimulationReference {
            total_luminosity: row[1],
            effective_radius: reg.sim_length_to_cm(row[2]),
            effective_temperature: row[3],
        },
    }))
}

/// First data row of a companion file as four finite numbers.
fn parse_companion_row(contents: &str) -> Result<[f64; 4], String> {
    let line = contents
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.starts_with('#'))
        .ok_or_else(|| "no data row".to_string())?;

    let values = line
        .split_whitespace()
        .map(|tok| tok.parse::<f64>().map_err(|_| format!("not a number: {tok}")))
        .collect::<Result<Vec<_>, _>>()?;

    if values.len() < 4 {
        return Err(format!("expected 4 columns, found {}", values.len()));
    }
    if let Some(bad) = values[..4].iter().find(|v| !v.is_finite()) {
        return Err(format!("non-finite value {bad}"));
    }
    Ok([values[0], values[1], values[2], values[3]])
}

#[cfg(test)]
mod companion_test {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_snapshot_index() {
        assert_eq!(snapshot_index(Utf8Path::new("a/b/tde_00010.spec")), Some(10));
        assert_eq!(snapshot_index(Utf8Path::new("tde_00010_ray2.spec")), Some(10));
        assert_eq!(snapshot_index(Utf8Path::new("tde_0001.spec")), None);
        assert_eq!(snapshot_index(Utf8Path::new("tde_00010.txt")), None);
    }

    #[test]
    fn test_companion_path() {
        assert_eq!(
            companion_path(Utf8Path::new("run/tde_00010.spec")),
            Utf8PathBuf::from("run/lightcurve_tde_00010.out")
        );
    }

    #[test]
    fn test_parse_row() {
        assert_eq!(
            parse_companion_row("# header\n\n 8.64e4 1e44 2e14 3e4 extra\n1 2 3 4\n").unwrap(),
            [8.64e4, 1e44, 2e14, 3e4]
        );
        assert!(parse_companion_row("").is_err());
        assert!(parse_companion_row("1 2 3").is_err());
        assert!(parse_companion_row("1 2 x 4").is_err());
        assert!(parse_companion_row("1 2 nan 4").is_err());
    }

    #[test]
    fn test_read_companion() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let spec = root.join("tde_00003.spec");
        std::fs::write(root.join("lightcurve_tde_00003.out"), "172800 1e44 2e14 3e4\n").unwrap();

        let reg = ConstantsRegistry::cgs();
        let record = read_companion(&reg, &spec).unwrap().unwrap();
        assert_relative_eq!(record.time, 2.0);
        assert_eq!(record.reference.total_luminosity, 1e44);
        assert_eq!(record.reference.effective_temperature, 3e4);

        assert_eq!(read_companion(&reg, &root.join("tde.spec")).unwrap(), None);
        assert!(matches!(
            read_companion(&reg, &root.join("tde_00004.spec")),
            Err(MalformedInputError::InvalidCompanion { .. })
        ));
    }
}

//! # Spectrum record reader
//!
//! Parses the whitespace-delimited text records written by the simulation into validated
//! [`SpectralSnapshot`]s.
//!
//! Format
//! -----------------
//! ```text
//! # time: <simulation time>
//! # distance: <simulation length>
//! # axis: frequency | wavelength
//! <abscissa> <flux>
//! ...
//! ```
//!
//! * Header lines start with `#`; `key: value` pairs with unknown keys are ignored, as
//!   are free-text comments.
//! * `axis` defaults to `frequency`: the abscissa is then ν in Hz and the flux F_ν. With
//!   `wavelength`, the abscissa is λ in nm and the flux F_λ per nm.
//! * Additional columns after the flux are ignored.
//! * `inf` flux values mark empty bins and are read as zero emission; NaN is malformed.
//!
//! Units
//! -----------------
//! Time and distance are in simulation units and go through the
//! [`ConstantsRegistry`] (time → days, length → cm); fluxes are multiplied by the
//! simulation flux factor and converted to F_λ per cm on a cm grid.
//!
//! When the time header is missing and the record is a numbered file on disk, the time is
//! taken from the companion light-curve file (see [`companion`](crate::snapshot::companion)).
//! When the distance header is missing, the loader's default distance (cm) is used.
use std::{str::FromStr, sync::Arc};

use camino::Utf8Path;

use crate::{
    constants::{Centimeter, ConstantsRegistry},
    conversion::{f_nu_to_f_lambda, hz_to_cm, nm_to_cm},
    lightfit_errors::MalformedInputError,
    snapshot::{companion::read_companion, source::InputRef, SpectralSnapshot},
};

/// Physical meaning of the first data column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpectralAxis {
    /// ν in Hz, flux is F_ν.
    #[default]
    Frequency,
    /// λ in nm, flux is F_λ per nm.
    Wavelength,
}

impl FromStr for SpectralAxis {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "frequency" | "nu" | "hz" => Ok(SpectralAxis::Frequency),
            "wavelength" | "lambda" | "nm" => Ok(SpectralAxis::Wavelength),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Default)]
struct RawRecord {
    time: Option<f64>,
    distance: Option<f64>,
    axis: SpectralAxis,
    abscissa: Vec<f64>,
    flux: Vec<f64>,
}

/// Loader turning [`InputRef`]s into validated [`SpectralSnapshot`]s.
#[derive(Debug, Clone)]
pub struct SnapshotLoader {
    registry: Arc<ConstantsRegistry>,
    min_points: usize,
    default_distance: Option<Centimeter>,
}

impl SnapshotLoader {
    pub fn new(registry: Arc<ConstantsRegistry>) -> Self {
        SnapshotLoader {
            registry,
            min_points: 3,
            default_distance: None,
        }
    }

    /// Minimum number of spectral points a record must hold.
    pub fn with_min_points(mut self, min_points: usize) -> Self {
        self.min_points = min_points;
        self
    }

    /// Distance in cm used when a record has no `# distance:` header.
    pub fn with_default_distance(mut self, distance: Option<Centimeter>) -> Self {
        self.default_distance = distance;
        self
    }

    pub fn min_points(&self) -> usize {
        self.min_points
    }

    /// Read and validate one input.
    ///
    /// Arguments
    /// -----------------
    /// * `input`: File or in-memory record.
    ///
    /// Return
    /// ----------
    /// * The snapshot, or the [`MalformedInputError`] describing the first structural
    ///   problem met (unreadable file, missing field, bad line, invalid grid...).
    pub fn load(&self, input: &InputRef) -> Result<SpectralSnapshot, MalformedInputError> {
        let contents = input
            .read_to_string()
            .map_err(|e| MalformedInputError::Unreadable(format!("{}: {e}", input.label())))?;
        self.parse(input.label(), &contents, input.path())
    }

    /// Parse the text of one record.
    ///
    /// `path` is used only to locate the companion light-curve file when the record has
    /// no time header.
    pub fn parse(
        &self,
        label: &str,
        contents: &str,
        path: Option<&Utf8Path>,
    ) -> Result<SpectralSnapshot, MalformedInputError> {
        let reg = self.registry.as_ref();
        let raw = parse_record(contents)?;

        let companion = match (raw.time, path) {
            (None, Some(path)) => read_companion(reg, path)?,
            _ => None,
        };

        let time = match (raw.time, &companion) {
            (Some(t), _) => reg.sim_time_to_days(t),
            (None, Some(record)) => record.time,
            (None, None) => return Err(MalformedInputError::MissingField("time".into())),
        };

        let distance = match (raw.distance, self.default_distance) {
            (Some(d), _) => reg.sim_length_to_cm(d),
            (None, Some(d)) => d,
            (None, None) => return Err(MalformedInputError::MissingField("distance".into())),
        };

        if let Some(&bad) = raw.abscissa.iter().find(|x| !(x.is_finite() && **x > 0.0)) {
            return Err(MalformedInputError::NonPositiveAbscissa(bad));
        }

        let (wavelength, flux): (Vec<_>, Vec<_>) = raw
            .abscissa
            .iter()
            .zip(&raw.flux)
            .map(|(&x, &f)| {
                let f = reg.sim_flux_to_cgs(f);
                match raw.axis {
                    SpectralAxis::Frequency => (hz_to_cm(reg, x), f_nu_to_f_lambda(reg, f, x)),
                    SpectralAxis::Wavelength => (nm_to_cm(reg, x), f * reg.cm_to_nm()),
                }
            })
            .unzip();

        let snapshot =
            SpectralSnapshot::new(label, time, wavelength, flux, distance, self.min_points)?;

        Ok(match companion {
            Some(record) => snapshot.with_reference(record.reference),
            None => snapshot,
        })
    }
}

fn parse_value(line: usize, content: &str, value: &str) -> Result<f64, MalformedInputError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| MalformedInputError::InvalidHeader {
            line,
            content: content.to_string(),
        })
}

fn parse_record(contents: &str) -> Result<RawRecord, MalformedInputError> {
    let mut raw = RawRecord::default();

    for (idx, line) in contents.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(header) = trimmed.strip_prefix('#') {
            let Some((key, value)) = header.split_once(':') else {
                continue;
            };
            match key.trim().to_ascii_lowercase().as_str() {
                "time" => raw.time = Some(parse_value(line_no, trimmed, value)?),
                "distance" => raw.distance = Some(parse_value(line_no, trimmed, value)?),
                "axis" => {
                    raw.axis = value.parse().map_err(|_| MalformedInputError::InvalidHeader {
                        line: line_no,
                        content: trimmed.to_string(),
                    })?
                }
                _ => {}
            }
            continue;
        }

        let invalid = || MalformedInputError::InvalidDataLine {
            line: line_no,
            content: trimmed.to_string(),
        };
        let mut columns = trimmed.split_whitespace();
        let (Some(x), Some(f)) = (columns.next(), columns.next()) else {
            return Err(invalid());
        };
        let x: f64 = x.parse().map_err(|_| invalid())?;
        let f: f64 = f.parse().map_err(|_| invalid())?;

        if f.is_nan() {
            return Err(MalformedInputError::NonFiniteFlux(raw.flux.len()));
        }
        raw.abscissa.push(x);
        raw.flux.push(if f == f64::INFINITY { 0.0 } else { f });
    }

    if raw.abscissa.is_empty() {
        return Err(MalformedInputError::EmptyInput);
    }
    Ok(raw)
}

#[cfg(test)]
mod spec_reader_test {
    use approx::assert_relative_eq;

    use super::*;

    fn loader() -> SnapshotLoader {
        SnapshotLoader::new(Arc::new(ConstantsRegistry::cgs()))
    }

    const FREQUENCY_RECORD: &str = "\
# time: 172800
# distance: 1e26
# produced by the radiation transport step
1e15 2e-26
2e15 4e-26
4e15 inf
";

    #[test]
    fn test_parse_frequency_record() {
        let reg = ConstantsRegistry::cgs();
        let snap = loader().parse("rec", FREQUENCY_RECORD, None).unwrap();
        assert_relative_eq!(snap.time(), 2.0);
        assert_eq!(snap.distance(), 1e26);
        assert_eq!(snap.len(), 3);

        // frequency grid reversed into increasing wavelength
        let c = reg.speed_of_light();
        assert_relative_eq!(snap.wavelength()[0], c / 4e15);
        assert_relative_eq!(snap.wavelength()[2], c / 1e15);
        assert_eq!(snap.flux()[0], 0.0);
        assert_relative_eq!(snap.flux()[1], 4e-26 * 4e30 / c);
        assert_relative_eq!(snap.flux()[2], 2e-26 * 1e30 / c);
    }

    #[test]
    fn test_parse_wavelength_record() {
        let text = "# time: 0\n# distance: 10\n# axis: wavelength\n100 1\n200 2 0.5\n300 3\n";
        let snap = loader().parse("rec", text, None).unwrap();
        assert_relative_eq!(snap.wavelength()[0], 1e-5);
        assert_relative_eq!(snap.flux()[1], 2e7);
    }

    #[test]
    fn test_default_distance_and_units() {
        let reg = ConstantsRegistry::with_units(crate::constants::SimulationUnits {
            time_to_seconds: 86_400.0,
            length_to_cm: 2.0,
            flux_to_cgs: 10.0,
        });
        let loader = SnapshotLoader::new(Arc::new(reg)).with_default_distance(Some(5e25));
        let snap = loader
            .parse("rec", "# time: 3\n# axis: wavelength\n1 1\n2 1\n3 1\n", None)
            .unwrap();
        assert_relative_eq!(snap.time(), 3.0);
        assert_eq!(snap.distance(), 5e25);
        assert_relative_eq!(snap.flux()[0], 1e8);

        let snap = loader
            .parse("rec", "# time: 1\n# distance: 4\n# axis: wavelength\n1 1\n2 1\n3 1\n", None)
            .unwrap();
        assert_eq!(snap.distance(), 8.0);
    }

    #[test]
    fn test_malformed_records() {
        let l = loader();
        assert_eq!(
            l.parse("r", "# distance: 1\n1 1\n2 1\n3 1\n", None).unwrap_err(),
            MalformedInputError::MissingField("time".into())
        );
        assert_eq!(
            l.parse("r", "# time: 1\n1 1\n2 1\n3 1\n", None).unwrap_err(),
            MalformedInputError::MissingField("distance".into())
        );
        assert_eq!(
            l.parse("r", "# time: 1\n# distance: 1\n", None).unwrap_err(),
            MalformedInputError::EmptyInput
        );
        assert_eq!(
            l.parse("r", "# time: x\n1 1\n", None).unwrap_err(),
            MalformedInputError::InvalidHeader {
                line: 1,
                content: "# time: x".into()
            }
        );
        assert_eq!(
            l.parse("r", "# time: 1\n# distance: 1\n1 1\n2\n", None).unwrap_err(),
            MalformedInputError::InvalidDataLine {
                line: 4,
                content: "2".into()
            }
        );
        assert_eq!(
            l.parse("r", "# time: 1\n# distance: 1\n1 1\n2 nan\n3 1\n", None).unwrap_err(),
            MalformedInputError::NonFiniteFlux(1)
        );
        assert_eq!(
            l.parse("r", "# time: 1\n# distance: 1\n1 1\n0 1\n3 1\n", None).unwrap_err(),
            MalformedInputError::NonPositiveAbscissa(0.0)
        );
        assert_eq!(
            l.parse("r", "# time: 1\n# distance: -1\n1 1\n2 1\n3 1\n", None).unwrap_err(),
            MalformedInputError::NonPositiveDistance(-1.0)
        );
        assert!(matches!(
            l.parse("r", "# time: 1\n# distance: 1\n# axis: energy\n1 1\n", None),
            Err(MalformedInputError::InvalidHeader { line: 3, .. })
        ));
        assert!(matches!(
            l.with_min_points(5)
                .parse("r", "# time: 1\n# distance: 1\n1 1\n2 1\n3 1\n", None),
            Err(MalformedInputError::NotEnoughPoints {
                found: 3,
                required: 5
            })
        ));
    }

    #[test]
    fn test_load_with_companion() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let spec = root.join("tde_00007.spec");
        std::fs::write(&spec, "1e15 1\n2e15 2\n3e15 1\n").unwrap();
        std::fs::write(root.join("lightcurve_tde_00007.out"), "86400 1e44 2e14 3e4\n").unwrap();

        let snap = loader()
            .with_default_distance(Some(1e26))
            .load(&InputRef::file(spec))
            .unwrap();
        assert_relative_eq!(snap.time(), 1.0);
        assert_eq!(snap.reference().unwrap().effective_radius, 2e14);
    }

    #[test]
    fn test_unreadable_file() {
        assert!(matches!(
            loader().load(&InputRef::file("/no/such/file.spec")),
            Err(MalformedInputError::Unreadable(_))
        ));
    }
}

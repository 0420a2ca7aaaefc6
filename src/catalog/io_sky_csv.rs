//! Sky catalog CSV reader.
//!
//! Sky models are stored headerless, one source per line, in the column
//! order simulation tools exchange them in:
//!
//! ```text
//! ra, dec, stokes_i, stokes_q, stokes_u, stokes_v, ref_freq_hz,
//! spectral_index, rotation_measure, major_arcsec, minor_arcsec, position_angle_deg
//! ```
//!
//! Lines starting with `#` and blank lines are skipped. The first three
//! columns are required; missing trailing columns default to zero and
//! columns past the twelfth are ignored. Polarisation and rotation measure
//! are parsed for validation but not carried, since evaluation only
//! compares total intensity.
//!
//! Source ids are the zero-based data row index.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use super::model::{SkyCatalog, SkySource, SourceShape};
use crate::error::SkymatchError;

const REQUIRED_COLUMNS: usize = 3;
const KNOWN_COLUMNS: usize = 12;

const COL_RA: usize = 0;
const COL_DEC: usize = 1;
const COL_STOKES_I: usize = 2;
const COL_REF_FREQ: usize = 6;
const COL_SPECTRAL_INDEX: usize = 7;
const COL_MAJOR: usize = 9;
const COL_MINOR: usize = 10;
const COL_PA: usize = 11;

/// Reads a sky catalog from a CSV file. The catalog has no transform
/// attached yet.
pub fn read_sky_csv(path: &Path) -> Result<SkyCatalog, SkymatchError> {
    let file = File::open(path).map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            SkymatchError::NotFound {
                what: "sky catalog",
                path: path.to_path_buf(),
            }
        } else {
            SkymatchError::Io(err)
        }
    })?;
    parse_sky(BufReader::new(file), path)
}

/// Reads a sky catalog from a CSV string.
pub fn from_sky_csv_str(csv_str: &str) -> Result<SkyCatalog, SkymatchError> {
    from_sky_csv_slice(csv_str.as_bytes())
}

/// Reads a sky catalog from CSV bytes.
pub fn from_sky_csv_slice(bytes: &[u8]) -> Result<SkyCatalog, SkymatchError> {
    parse_sky(bytes, Path::new("<bytes>"))
}

fn parse_sky<R: Read>(reader: R, path: &Path) -> Result<SkyCatalog, SkymatchError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut sources = Vec::new();
    for result in csv_reader.records() {
        let record = result.map_err(|source| SkymatchError::SkyCsvParse {
            path: path.to_path_buf(),
            source,
        })?;
        // a line of bare separators carries no data
        if record.iter().all(str::is_empty) {
            continue;
        }

        let line = record.position().map(|p| p.line()).unwrap_or(0);
        if record.len() < REQUIRED_COLUMNS {
            return Err(SkymatchError::SkyCsvInvalid {
                path: path.to_path_buf(),
                message: format!(
                    "line {}: expected at least {} columns (ra, dec, stokes_i), found {}",
                    line,
                    REQUIRED_COLUMNS,
                    record.len()
                ),
            });
        }

        let mut values = [0.0f64; KNOWN_COLUMNS];
        for (col, field) in record.iter().take(KNOWN_COLUMNS).enumerate() {
            if field.is_empty() {
                continue;
            }
            values[col] = field.parse().map_err(|_| SkymatchError::SkyCsvInvalid {
                path: path.to_path_buf(),
                message: format!("line {}, column {}: '{}' is not a number", line, col + 1, field),
            })?;
        }

        let id = sources.len() as u64;
        sources.push(
            SkySource::new(id, values[COL_RA], values[COL_DEC], values[COL_STOKES_I])
                .with_spectrum(values[COL_REF_FREQ], values[COL_SPECTRAL_INDEX])
                .with_shape(SourceShape::new(
                    values[COL_MAJOR],
                    values[COL_MINOR],
                    values[COL_PA],
                )),
        );
    }

    Ok(SkyCatalog::new(sources))
}

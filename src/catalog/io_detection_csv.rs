//! Detection catalog CSV reader and writer.
//!
//! This is the on-disk contract for source-finder output, so the column
//! order is fixed and documented:
//!
//! ```text
//! id,pixel_x,pixel_y,flux,ra,dec,x_err,y_err,flux_err,major,minor,position_angle
//! ```
//!
//! - `id`: detection id (unsigned integer, unique within the file)
//! - `pixel_x`, `pixel_y`: zero-based pixel position
//! - `flux`: flux estimate in Jy
//! - `ra`, `dec`: optional sky position in degrees (both or neither)
//! - `x_err`, `y_err`, `flux_err`: optional 1-sigma errors
//! - `major`, `minor`, `position_angle`: optional shape (pixels, degrees)
//!
//! Optional columns may be left empty, or omitted from the header entirely
//! when reading.
//!
//! # Deterministic Output
//!
//! The writer emits rows in catalog order and always writes the header,
//! even for an empty catalog. Floats are written in shortest round-trip
//! form, so a write/read cycle reproduces positions and fluxes exactly.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::model::{DetectedSource, DetectionCatalog, PositionErrors, SkyPosition, SourceShape};
use super::{Coord, DetectionId};
use crate::error::SkymatchError;

/// Column header of the detection CSV, in on-disk order.
pub const DETECTION_CSV_HEADER: [&str; 12] = [
    "id",
    "pixel_x",
    "pixel_y",
    "flux",
    "ra",
    "dec",
    "x_err",
    "y_err",
    "flux_err",
    "major",
    "minor",
    "position_angle",
];

// ============================================================================
// Detection CSV Schema Type (internal to this module)
// ============================================================================

/// A single row in the detection CSV format.
#[derive(Debug, Serialize, Deserialize)]
struct DetectionRow {
    id: u64,
    pixel_x: f64,
    pixel_y: f64,
    flux: f64,
    #[serde(default)]
    ra: Option<f64>,
    #[serde(default)]
    dec: Option<f64>,
    #[serde(default)]
    x_err: Option<f64>,
    #[serde(default)]
    y_err: Option<f64>,
    #[serde(default)]
    flux_err: Option<f64>,
    #[serde(default)]
    major: Option<f64>,
    #[serde(default)]
    minor: Option<f64>,
    #[serde(default)]
    position_angle: Option<f64>,
}

/// Metadata attached to a catalog read from CSV.
#[derive(Clone, Debug, Default)]
pub struct DetectionCsvOptions {
    /// Image the detections were made on. A missing file is logged and
    /// dropped rather than failing the read.
    pub source_image: Option<PathBuf>,
    /// Pixel scale of that image, in degrees.
    pub pixel_scale_deg: Option<f64>,
}

// ============================================================================
// Public API
// ============================================================================

/// Reads a detection catalog from a CSV file.
///
/// # Errors
/// Returns an error if the file cannot be read, a required column is
/// missing, a field is malformed, or two rows share an id.
///
/// # Example
/// ```no_run
/// use std::path::Path;
/// use skymatch::catalog::io_detection_csv::{read_detection_csv, DetectionCsvOptions};
///
/// let catalog = read_detection_csv(Path::new("detections.csv"), &DetectionCsvOptions::default())?;
/// # Ok::<(), skymatch::SkymatchError>(())
/// ```
pub fn read_detection_csv(
    path: &Path,
    options: &DetectionCsvOptions,
) -> Result<DetectionCatalog, SkymatchError> {
    let file = File::open(path).map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            SkymatchError::NotFound {
                what: "detection CSV",
                path: path.to_path_buf(),
            }
        } else {
            SkymatchError::Io(err)
        }
    })?;
    let rows = read_rows(BufReader::new(file), path)?;
    let mut catalog = rows_to_catalog(rows, path)?;

    if let Some(scale) = options.pixel_scale_deg {
        catalog = catalog.with_pixel_scale(scale);
    }
    if let Some(image) = &options.source_image {
        catalog.attach_source_image_lenient(image);
    }
    Ok(catalog)
}

/// Writes a detection catalog to a CSV file.
pub fn write_detection_csv(path: &Path, catalog: &DetectionCatalog) -> Result<(), SkymatchError> {
    let file = File::create(path).map_err(SkymatchError::Io)?;
    let writer = BufWriter::new(file);

    let csv_writer = write_rows(writer, catalog, path)?;
    csv_writer
        .into_inner()
        .map_err(|e| SkymatchError::Io(e.into_error()))?
        .flush()
        .map_err(SkymatchError::Io)?;

    Ok(())
}

/// Reads a detection catalog from a CSV string.
///
/// Useful for testing without file I/O.
pub fn from_detection_csv_str(csv_str: &str) -> Result<DetectionCatalog, SkymatchError> {
    from_detection_csv_slice(csv_str.as_bytes())
}

/// Reads a detection catalog from CSV bytes.
///
/// Useful for fuzzing and processing raw bytes without requiring UTF-8 upfront.
pub fn from_detection_csv_slice(bytes: &[u8]) -> Result<DetectionCatalog, SkymatchError> {
    let dummy_path = Path::new("<bytes>");
    let rows = read_rows(bytes, dummy_path)?;
    rows_to_catalog(rows, dummy_path)
}

/// Writes a detection catalog to a CSV string.
pub fn to_detection_csv_string(catalog: &DetectionCatalog) -> Result<String, SkymatchError> {
    let dummy_path = Path::new("<string>");
    let csv_writer = write_rows(Vec::new(), catalog, dummy_path)?;

    let bytes = csv_writer
        .into_inner()
        .map_err(|e| SkymatchError::Io(e.into_error()))?;

    String::from_utf8(bytes).map_err(|e| SkymatchError::DetectionCsvInvalid {
        path: dummy_path.to_path_buf(),
        message: format!("Invalid UTF-8 in output: {}", e),
    })
}

// ============================================================================
// Conversion: CSV -> catalog
// ============================================================================

fn read_rows<R: Read>(reader: R, path: &Path) -> Result<Vec<DetectionRow>, SkymatchError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for result in csv_reader.deserialize() {
        let row: DetectionRow = result.map_err(|source| SkymatchError::DetectionCsvParse {
            path: path.to_path_buf(),
            source,
        })?;
        rows.push(row);
    }
    Ok(rows)
}

/// Converts CSV rows to a catalog, preserving row order.
fn rows_to_catalog(rows: Vec<DetectionRow>, path: &Path) -> Result<DetectionCatalog, SkymatchError> {
    let invalid = |message: String| SkymatchError::DetectionCsvInvalid {
        path: path.to_path_buf(),
        message,
    };

    // data rows are numbered from 1, after the header
    let mut first_row_by_id: HashMap<u64, usize> = HashMap::with_capacity(rows.len());
    let mut sources = Vec::with_capacity(rows.len());

    for (idx, row) in rows.into_iter().enumerate() {
        let row_number = idx + 1;
        if let Some(first) = first_row_by_id.insert(row.id, row_number) {
            return Err(invalid(format!(
                "duplicate id {} (rows {} and {})",
                row.id, first, row_number
            )));
        }

        let sky_position = match (row.ra, row.dec) {
            (Some(ra), Some(dec)) => Some(SkyPosition::new(ra, dec)),
            (None, None) => None,
            _ => {
                return Err(invalid(format!(
                    "row {} has only one of ra/dec",
                    row_number
                )))
            }
        };

        let shape = match (row.major, row.minor) {
            (Some(major), Some(minor)) => Some(SourceShape::new(
                major,
                minor,
                row.position_angle.unwrap_or(0.0),
            )),
            (None, None) if row.position_angle.is_none() => None,
            _ => {
                return Err(invalid(format!(
                    "row {} has an incomplete shape (major and minor are both required)",
                    row_number
                )))
            }
        };

        sources.push(DetectedSource {
            id: DetectionId::new(row.id),
            position: Coord::new(row.pixel_x, row.pixel_y),
            flux: row.flux,
            sky_position,
            errors: PositionErrors {
                x: row.x_err,
                y: row.y_err,
                flux: row.flux_err,
            },
            shape,
        });
    }

    // ids were checked above, so this cannot fail on duplicates
    DetectionCatalog::new(sources).map_err(|e| invalid(e.to_string()))
}

// ============================================================================
// Conversion: catalog -> CSV
// ============================================================================

fn write_rows<W: Write>(
    writer: W,
    catalog: &DetectionCatalog,
    path: &Path,
) -> Result<csv::Writer<W>, SkymatchError> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    let write_err = |source| SkymatchError::DetectionCsvWrite {
        path: path.to_path_buf(),
        source,
    };

    csv_writer
        .write_record(DETECTION_CSV_HEADER)
        .map_err(write_err)?;

    for source in catalog.sources() {
        let row = DetectionRow {
            id: source.id.as_u64(),
            pixel_x: source.position.x,
            pixel_y: source.position.y,
            flux: source.flux,
            ra: source.sky_position.map(|p| p.ra_deg),
            dec: source.sky_position.map(|p| p.dec_deg),
            x_err: source.errors.x,
            y_err: source.errors.y,
            flux_err: source.errors.flux,
            major: source.shape.map(|s| s.major),
            minor: source.shape.map(|s| s.minor),
            position_angle: source.shape.map(|s| s.position_angle),
        };
        csv_writer.serialize(&row).map_err(write_err)?;
    }

    Ok(csv_writer)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_detection_csv() -> &'static str {
        "id,pixel_x,pixel_y,flux,ra,dec,x_err,y_err,flux_err,major,minor,position_angle\n\
         0,10.5,10.2,0.12,250.01,-80.02,0.1,0.1,0.01,3.2,2.9,12.0\n\
         1,200.0,311.75,0.5,,,,,,,,\n\
         2,43.125,7.0,0.031,250.2,-79.9,,,,,,\n"
    }

    #[test]
    fn test_read_basic() {
        let catalog = from_detection_csv_str(sample_detection_csv()).expect("parse failed");
        assert_eq!(catalog.len(), 3);

        let first = &catalog.sources()[0];
        assert_eq!(first.id, DetectionId(0));
        assert_eq!(first.position.x, 10.5);
        assert_eq!(first.position.y, 10.2);
        assert_eq!(first.sky_position, Some(SkyPosition::new(250.01, -80.02)));
        assert_eq!(first.shape, Some(SourceShape::new(3.2, 2.9, 12.0)));
        assert_eq!(first.errors.flux, Some(0.01));

        let second = &catalog.sources()[1];
        assert!(second.sky_position.is_none());
        assert!(second.shape.is_none());
        assert!(second.errors.is_empty());
    }

    #[test]
    fn test_optional_columns_may_be_absent() {
        let csv = "id,pixel_x,pixel_y,flux\n7,1.0,2.0,0.3\n";
        let catalog = from_detection_csv_str(csv).expect("parse failed");
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.sources()[0].id, DetectionId(7));
    }

    #[test]
    fn test_roundtrip_is_exact() {
        let original = from_detection_csv_str(sample_detection_csv()).expect("parse failed");
        let csv_str = to_detection_csv_string(&original).expect("serialize failed");
        let restored = from_detection_csv_str(&csv_str).expect("parse failed");
        assert_eq!(original, restored);
    }

    #[test]
    fn test_header_is_stable_even_when_empty() {
        let empty = DetectionCatalog::new(vec![]).unwrap();
        let csv_str = to_detection_csv_string(&empty).expect("serialize failed");
        assert_eq!(csv_str.trim_end(), DETECTION_CSV_HEADER.join(","));

        let restored = from_detection_csv_str(&csv_str).expect("parse failed");
        assert!(restored.is_empty());
    }

    #[test]
    fn test_missing_required_column_is_format_error() {
        let csv = "id,pixel_x,flux\n1,2.0,0.1\n";
        let err = from_detection_csv_str(csv).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Format);
    }

    #[test]
    fn test_non_numeric_pixel_is_format_error() {
        let csv = "id,pixel_x,pixel_y,flux\n1,abc,2.0,0.1\n";
        let err = from_detection_csv_str(csv).unwrap_err();
        assert!(matches!(err, SkymatchError::DetectionCsvParse { .. }));
    }

    #[test]
    fn test_duplicate_id_is_format_error() {
        let csv = "id,pixel_x,pixel_y,flux\n1,1.0,2.0,0.1\n1,3.0,4.0,0.2\n";
        let err = from_detection_csv_str(csv).unwrap_err();
        match err {
            SkymatchError::DetectionCsvInvalid { message, .. } => {
                assert!(message.contains("duplicate id 1"), "{message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_half_sky_position_is_rejected() {
        let csv = "id,pixel_x,pixel_y,flux,ra,dec\n1,1.0,2.0,0.1,250.0,\n";
        assert!(from_detection_csv_str(csv).is_err());
    }

    #[test]
    fn test_rows_keep_file_order() {
        let csv = "id,pixel_x,pixel_y,flux\n9,1.0,1.0,0.1\n3,2.0,2.0,0.1\n5,3.0,3.0,0.1\n";
        let catalog = from_detection_csv_str(csv).expect("parse failed");
        let ids: Vec<u64> = catalog.sources().iter().map(|s| s.id.as_u64()).collect();
        assert_eq!(ids, vec![9, 3, 5]);

        let written = to_detection_csv_string(&catalog).expect("serialize failed");
        let lines: Vec<&str> = written.lines().collect();
        assert!(lines[1].starts_with("9,"));
        assert!(lines[2].starts_with("3,"));
        assert!(lines[3].starts_with("5,"));
    }
}

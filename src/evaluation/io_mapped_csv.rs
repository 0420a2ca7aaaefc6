//! Mapped array CSV reader and writer.
//!
//! The mapped CSV is the artifact downstream tooling compares across runs:
//!
//! ```text
//! truth_id,detection_id,truth_x,truth_y,detection_x,detection_y,distance,matched
//! ```
//!
//! An absent side is written with id `-1` and `NaN` coordinates, and an
//! unmatched row has distance `inf`. Rows keep the order of the
//! [`MappedArray`].

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::mapped::{MappedArray, MappedRow};
use crate::catalog::{Coord, DetectionId, SkySourceId};
use crate::error::SkymatchError;

/// Column header of the mapped CSV, in on-disk order.
pub const MAPPED_CSV_HEADER: [&str; 8] = [
    "truth_id",
    "detection_id",
    "truth_x",
    "truth_y",
    "detection_x",
    "detection_y",
    "distance",
    "matched",
];

const ABSENT_ID: i64 = -1;

#[derive(Debug, Serialize, Deserialize)]
struct MappedCsvRow {
    truth_id: i64,
    detection_id: i64,
    truth_x: f64,
    truth_y: f64,
    detection_x: f64,
    detection_y: f64,
    distance: f64,
    matched: bool,
}

/// Writes a mapped array to a CSV file.
pub fn write_mapped_csv(path: &Path, mapped: &MappedArray) -> Result<(), SkymatchError> {
    let file = File::create(path).map_err(SkymatchError::Io)?;
    let writer = BufWriter::new(file);

    let csv_writer = write_rows(writer, mapped, path)?;
    csv_writer
        .into_inner()
        .map_err(|e| SkymatchError::Io(e.into_error()))?
        .flush()
        .map_err(SkymatchError::Io)?;

    Ok(())
}

/// Writes a mapped array to a CSV string.
pub fn to_mapped_csv_string(mapped: &MappedArray) -> Result<String, SkymatchError> {
    let dummy_path = Path::new("<string>");
    let csv_writer = write_rows(Vec::new(), mapped, dummy_path)?;

    let bytes = csv_writer
        .into_inner()
        .map_err(|e| SkymatchError::Io(e.into_error()))?;

    String::from_utf8(bytes).map_err(|e| SkymatchError::MappedCsvInvalid {
        path: dummy_path.to_path_buf(),
        message: format!("Invalid UTF-8 in output: {}", e),
    })
}

/// Reads a mapped array back from a CSV string, e.g. to compare two runs.
pub fn from_mapped_csv_str(csv_str: &str) -> Result<MappedArray, SkymatchError> {
    read_rows(csv_str.as_bytes(), Path::new("<string>"))
}

// ============================================================================
// Conversion: CSV -> mapped array
// ============================================================================

fn read_rows<R: Read>(reader: R, path: &Path) -> Result<MappedArray, SkymatchError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let invalid = |message: String| SkymatchError::MappedCsvInvalid {
        path: path.to_path_buf(),
        message,
    };

    let mut rows = Vec::new();
    for (idx, result) in csv_reader.deserialize().enumerate() {
        let row: MappedCsvRow = result.map_err(|source| SkymatchError::MappedCsvParse {
            path: path.to_path_buf(),
            source,
        })?;
        let row_number = idx + 1;

        let truth_id = decode_id(row.truth_id)
            .ok_or_else(|| invalid(format!("row {}: bad truth_id {}", row_number, row.truth_id)))?;
        let detection_id = decode_id(row.detection_id).ok_or_else(|| {
            invalid(format!(
                "row {}: bad detection_id {}",
                row_number, row.detection_id
            ))
        })?;

        if truth_id.is_none() && detection_id.is_none() {
            return Err(invalid(format!("row {}: both ids are absent", row_number)));
        }
        if row.matched && (truth_id.is_none() || detection_id.is_none()) {
            return Err(invalid(format!(
                "row {}: matched row needs both ids",
                row_number
            )));
        }

        rows.push(MappedRow {
            truth_id: truth_id.map(SkySourceId::new),
            detection_id: detection_id.map(DetectionId::new),
            truth: Coord::new(row.truth_x, row.truth_y),
            detection: Coord::new(row.detection_x, row.detection_y),
            distance: row.distance,
            matched: row.matched,
        });
    }

    Ok(MappedArray::new(rows))
}

/// `-1` is the absent sentinel; other negative values are malformed.
fn decode_id(raw: i64) -> Option<Option<u64>> {
    match raw {
        ABSENT_ID => Some(None),
        id if id >= 0 => Some(Some(id as u64)),
        _ => None,
    }
}

// ============================================================================
// Conversion: mapped array -> CSV
// ============================================================================

fn write_rows<W: Write>(
    writer: W,
    mapped: &MappedArray,
    path: &Path,
) -> Result<csv::Writer<W>, SkymatchError> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    let write_err = |source| SkymatchError::MappedCsvWrite {
        path: path.to_path_buf(),
        source,
    };
    let encode_id = |id: Option<u64>| -> Result<i64, SkymatchError> {
        match id {
            None => Ok(ABSENT_ID),
            Some(id) => i64::try_from(id).map_err(|_| SkymatchError::MappedCsvInvalid {
                path: path.to_path_buf(),
                message: format!("id {} does not fit the signed id column", id),
            }),
        }
    };

    csv_writer.write_record(MAPPED_CSV_HEADER).map_err(write_err)?;

    for row in mapped {
        let csv_row = MappedCsvRow {
            truth_id: encode_id(row.truth_id.map(|id| id.as_u64()))?,
            detection_id: encode_id(row.detection_id.map(|id| id.as_u64()))?,
            truth_x: row.truth.x,
            truth_y: row.truth.y,
            detection_x: row.detection.x,
            detection_y: row.detection.y,
            distance: row.distance,
            matched: row.matched,
        };
        csv_writer.serialize(&csv_row).map_err(write_err)?;
    }

    Ok(csv_writer)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DetectedSource, TruthPoint};

    fn sample_mapped() -> MappedArray {
        let t0 = TruthPoint::from_pixel(0u64, 10.0, 10.0, 1.0);
        let t1 = TruthPoint::from_pixel(1u64, 50.0, 50.0, 1.0);
        let d0 = DetectedSource::new(7u64, 10.5, 10.2, 0.9);
        let d1 = DetectedSource::new(8u64, 90.0, 3.0, 0.1);
        MappedArray::new(vec![
            MappedRow::matched(&t0, &d0, 0.29f64.sqrt()),
            MappedRow::missed(&t1),
            MappedRow::spurious(&d1),
        ])
    }

    #[test]
    fn test_header_and_sentinels() {
        let csv = to_mapped_csv_string(&sample_mapped()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some(MAPPED_CSV_HEADER.join(",").as_str()));
        assert!(lines.next().unwrap().starts_with("0,7,10.0,10.0,10.5,10.2,"));
        assert_eq!(lines.next(), Some("1,-1,50.0,50.0,NaN,NaN,inf,false"));
        assert_eq!(lines.next(), Some("-1,8,NaN,NaN,90.0,3.0,inf,false"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_empty_array_still_has_header() {
        let csv = to_mapped_csv_string(&MappedArray::default()).unwrap();
        assert_eq!(csv.trim_end(), MAPPED_CSV_HEADER.join(","));
    }

    #[test]
    fn test_read_back_for_comparison() {
        let mapped = sample_mapped();
        let csv = to_mapped_csv_string(&mapped).unwrap();
        let restored = from_mapped_csv_str(&csv).unwrap();
        assert_eq!(restored, mapped);
    }

    #[test]
    fn test_rejects_bad_sentinel() {
        let csv = "truth_id,detection_id,truth_x,truth_y,detection_x,detection_y,distance,matched\n\
                   -2,1,NaN,NaN,1.0,1.0,inf,false\n";
        let err = from_mapped_csv_str(csv).unwrap_err();
        assert!(matches!(err, SkymatchError::MappedCsvInvalid { .. }));
    }

    #[test]
    fn test_rejects_half_matched_row() {
        let csv = "truth_id,detection_id,truth_x,truth_y,detection_x,detection_y,distance,matched\n\
                   0,-1,1.0,1.0,NaN,NaN,0.5,true\n";
        assert!(from_mapped_csv_str(csv).is_err());
    }
}

//! The mapped array: the persisted record of which truth source was paired
//! with which detection.

use serde::Serialize;

use crate::catalog::{Coord, DetectedSource, DetectionId, Pixel, SkySourceId, TruthPoint};

/// One row of a [`MappedArray`].
///
/// A missed truth source has no detection side (NaN coordinates), a
/// spurious detection has no truth side, and both have an infinite
/// distance.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct MappedRow {
    pub truth_id: Option<SkySourceId>,
    pub detection_id: Option<DetectionId>,
    pub truth: Coord<Pixel>,
    pub detection: Coord<Pixel>,
    pub distance: f64,
    pub matched: bool,
}

impl MappedRow {
    pub fn matched(truth: &TruthPoint, detection: &DetectedSource, distance: f64) -> Self {
        Self {
            truth_id: Some(truth.id),
            detection_id: Some(detection.id),
            truth: truth.position,
            detection: detection.position,
            distance,
            matched: true,
        }
    }

    pub fn missed(truth: &TruthPoint) -> Self {
        Self {
            truth_id: Some(truth.id),
            detection_id: None,
            truth: truth.position,
            detection: Coord::nan(),
            distance: f64::INFINITY,
            matched: false,
        }
    }

    pub fn spurious(detection: &DetectedSource) -> Self {
        Self {
            truth_id: None,
            detection_id: Some(detection.id),
            truth: Coord::nan(),
            detection: detection.position,
            distance: f64::INFINITY,
            matched: false,
        }
    }
}

fn same(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

// NaN marks an absent side, so two rows with NaN in the same place are equal.
impl PartialEq for MappedRow {
    fn eq(&self, other: &Self) -> bool {
        self.truth_id == other.truth_id
            && self.detection_id == other.detection_id
            && same(self.truth.x, other.truth.x)
            && same(self.truth.y, other.truth.y)
            && same(self.detection.x, other.detection.x)
            && same(self.detection.y, other.detection.y)
            && same(self.distance, other.distance)
            && self.matched == other.matched
    }
}

/// Every truth source and every detection, each in exactly one row.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MappedArray {
    rows: Vec<MappedRow>,
}

impl MappedArray {
    pub fn new(rows: Vec<MappedRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[MappedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MappedRow> {
        self.rows.iter()
    }

    /// Number of matched rows.
    pub fn matched_count(&self) -> usize {
        self.rows.iter().filter(|row| row.matched).count()
    }
}

impl<'a> IntoIterator for &'a MappedArray {
    type Item = &'a MappedRow;
    type IntoIter = std::slice::Iter<'a, MappedRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_rows() {
        let truth = TruthPoint::from_pixel(2u64, 1.0, 2.0, 0.5);
        let detection = DetectedSource::new(9u64, 40.0, 41.0, 0.2);

        let missed = MappedRow::missed(&truth);
        assert_eq!(missed.detection_id, None);
        assert!(missed.detection.x.is_nan());
        assert!(missed.distance.is_infinite());
        assert!(!missed.matched);

        let spurious = MappedRow::spurious(&detection);
        assert_eq!(spurious.truth_id, None);
        assert_eq!(spurious.detection_id, Some(DetectionId(9)));
        assert!(spurious.truth.y.is_nan());
    }

    #[test]
    fn rows_with_nan_sides_compare_equal() {
        let truth = TruthPoint::from_pixel(0u64, 1.0, 2.0, 0.5);
        assert_eq!(MappedRow::missed(&truth), MappedRow::missed(&truth));
        assert_ne!(
            MappedRow::missed(&truth),
            MappedRow::missed(&TruthPoint::from_pixel(0u64, 1.0, 2.5, 0.5))
        );
    }
}

//! Evaluation report types and text formatting.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use super::mapped::{MappedArray, MappedRow};
use super::overlay::{OverlayLink, OverlayMarker, PlotOverlay};
use crate::catalog::{DetectedSource, DetectionCatalog, DetectionId, SkySourceId, TruthPoint};
use crate::matching::Assignment;

/// The result of evaluating one detection catalog against its ground truth.
///
/// A report is immutable: a different tolerance needs a new evaluation and
/// produces a new report.
#[derive(Clone, Debug, Serialize)]
pub struct EvaluationReport {
    /// Matching tolerance the report was computed with, in pixels.
    pub tolerance_px: f64,
    /// True/false positive and negative counts.
    pub counts: MatchCounts,
    /// Ratios derived from the counts.
    pub scores: Scores,
    /// Pixel distance statistics over matched pairs.
    pub distance: DistanceStats,
    /// Detected-to-true flux ratio statistics over matched pairs.
    pub flux: FluxStats,
    /// One entry per matched pair, in ascending truth order.
    pub residuals: Vec<MatchResidual>,

    #[serde(skip)]
    truth: Vec<TruthPoint>,
    #[serde(skip)]
    detections: Vec<DetectedSource>,
    #[serde(skip)]
    assignment: Assignment,
    #[serde(skip)]
    source_image: Option<PathBuf>,
}

/// Detection outcome counts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MatchCounts {
    /// Matched pairs.
    pub true_positives: usize,
    /// Detections with no matched truth source.
    pub false_positives: usize,
    /// Truth sources with no matched detection.
    pub false_negatives: usize,
    /// Truth sources that could not take part (non-finite or off-image).
    /// Already included in `false_negatives`.
    pub excluded_truth: usize,
    /// Detections that could not take part. Already included in
    /// `false_positives`.
    pub excluded_detections: usize,
}

/// Score ratios; `None` where the denominator is zero.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Scores {
    /// TP / (TP + FP)
    pub precision: Option<f64>,
    /// TP / (TP + FN)
    pub recall: Option<f64>,
    /// TP / (TP + FP + FN)
    pub accuracy: Option<f64>,
    /// Harmonic mean of precision and recall.
    pub f_score: Option<f64>,
}

impl Scores {
    fn from_counts(counts: &MatchCounts) -> Self {
        let tp = counts.true_positives;
        let precision = ratio(tp, tp + counts.false_positives);
        let recall = ratio(tp, tp + counts.false_negatives);
        let accuracy = ratio(tp, tp + counts.false_positives + counts.false_negatives);
        let f_score = match (precision, recall) {
            (Some(p), Some(r)) if p + r > 0.0 => Some(2.0 * p * r / (p + r)),
            _ => None,
        };
        Self {
            precision,
            recall,
            accuracy,
            f_score,
        }
    }
}

fn ratio(numerator: usize, denominator: usize) -> Option<f64> {
    if denominator == 0 {
        None
    } else {
        Some(numerator as f64 / denominator as f64)
    }
}

/// Match distance statistics in pixels; all `None` without matches.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DistanceStats {
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub max: Option<f64>,
}

/// Flux ratio statistics; `None` when no matched pair has a usable ratio.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FluxStats {
    pub mean_ratio: Option<f64>,
    pub median_ratio: Option<f64>,
}

/// Per-match residuals.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MatchResidual {
    pub truth_id: SkySourceId,
    pub detection_id: DetectionId,
    /// Detection minus truth, in pixels.
    pub dx: f64,
    pub dy: f64,
    pub distance: f64,
    /// Detected flux over true flux; `None` if the true flux is zero or
    /// either flux is non-finite.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flux_ratio: Option<f64>,
    /// Truth minus detection RA, scaled by cos(dec), in degrees. Only set
    /// when the detection carries a sky position.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ra_error_deg: Option<f64>,
    /// Truth minus detection declination, in degrees.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dec_error_deg: Option<f64>,
}

impl EvaluationReport {
    pub(crate) fn from_assignment(
        truth: Vec<TruthPoint>,
        detections: &DetectionCatalog,
        assignment: Assignment,
        tolerance_px: f64,
    ) -> Self {
        let counts = MatchCounts {
            true_positives: assignment.matches.len(),
            false_positives: assignment.unmatched_detections.len(),
            false_negatives: assignment.unmatched_truth.len(),
            excluded_truth: assignment.excluded_truth.len(),
            excluded_detections: assignment.excluded_detections.len(),
        };
        let scores = Scores::from_counts(&counts);

        let detection_sources = detections.sources();
        let residuals: Vec<MatchResidual> = assignment
            .matches
            .iter()
            .map(|m| residual(&truth[m.truth], &detection_sources[m.detection], m.distance))
            .collect();

        let distances: Vec<f64> = residuals.iter().map(|r| r.distance).collect();
        let distance = DistanceStats {
            mean: mean(&distances),
            median: median(&distances),
            max: distances.iter().copied().reduce(f64::max),
        };

        let ratios: Vec<f64> = residuals.iter().filter_map(|r| r.flux_ratio).collect();
        let flux = FluxStats {
            mean_ratio: mean(&ratios),
            median_ratio: median(&ratios),
        };

        Self {
            tolerance_px,
            counts,
            scores,
            distance,
            flux,
            residuals,
            truth,
            detections: detection_sources.to_vec(),
            assignment,
            source_image: detections.source_image().map(Path::to_path_buf),
        }
    }

    /// Confusion matrix `[[0, FP], [FN, TP]]`: rows are truth absent/present,
    /// columns are detected no/yes. Source detection has no true negatives,
    /// so that cell is always zero.
    pub fn confusion_matrix(&self) -> [[usize; 2]; 2] {
        [
            [0, self.counts.false_positives],
            [self.counts.false_negatives, self.counts.true_positives],
        ]
    }

    /// The underlying matcher result (indices into the evaluated inputs).
    pub fn assignment(&self) -> &Assignment {
        &self.assignment
    }

    /// Truth points the detections were evaluated against.
    pub fn truth(&self) -> &[TruthPoint] {
        &self.truth
    }

    pub fn detections(&self) -> &[DetectedSource] {
        &self.detections
    }

    pub fn source_image(&self) -> Option<&Path> {
        self.source_image.as_deref()
    }

    /// Builds the mapped array: one row per truth source in truth order
    /// (matched or missed), then one row per unmatched detection in
    /// detection order.
    pub fn mapped_array(&self) -> MappedArray {
        let mut rows = Vec::with_capacity(self.truth.len() + self.assignment.unmatched_detections.len());

        for (index, truth) in self.truth.iter().enumerate() {
            let row = match self.assignment.detection_for_truth(index) {
                Some(m) => MappedRow::matched(truth, &self.detections[m.detection], m.distance),
                None => MappedRow::missed(truth),
            };
            rows.push(row);
        }
        for &index in &self.assignment.unmatched_detections {
            rows.push(MappedRow::spurious(&self.detections[index]));
        }

        MappedArray::new(rows)
    }

    /// Plot-ready coordinates for an external renderer.
    ///
    /// Sources with non-finite positions have nothing to draw and are left
    /// out of the markers.
    pub fn overlay(&self) -> PlotOverlay {
        let mut matched_truth = vec![false; self.truth.len()];
        let mut matched_detections = vec![false; self.detections.len()];
        let mut links = Vec::with_capacity(self.assignment.matches.len());

        for m in &self.assignment.matches {
            matched_truth[m.truth] = true;
            matched_detections[m.detection] = true;
            let truth = &self.truth[m.truth];
            let detection = &self.detections[m.detection];
            links.push(OverlayLink {
                truth_id: truth.id.as_u64(),
                detection_id: detection.id.as_u64(),
                from: [truth.position.x, truth.position.y],
                to: [detection.position.x, detection.position.y],
                distance: m.distance,
            });
        }

        let truth = self
            .truth
            .iter()
            .zip(&matched_truth)
            .filter(|(t, _)| t.position.is_finite())
            .map(|(t, &matched)| OverlayMarker {
                id: t.id.as_u64(),
                x: t.position.x,
                y: t.position.y,
                matched,
            })
            .collect();
        let detections = self
            .detections
            .iter()
            .zip(&matched_detections)
            .filter(|(d, _)| d.position.is_finite())
            .map(|(d, &matched)| OverlayMarker {
                id: d.id.as_u64(),
                x: d.position.x,
                y: d.position.y,
                matched,
            })
            .collect();

        PlotOverlay {
            source_image: self.source_image.clone(),
            truth,
            detections,
            links,
        }
    }
}

fn residual(truth: &TruthPoint, detection: &DetectedSource, distance: f64) -> MatchResidual {
    let flux_ratio = if truth.flux != 0.0 && truth.flux.is_finite() && detection.flux.is_finite() {
        Some(detection.flux / truth.flux)
    } else {
        None
    };

    let (ra_error_deg, dec_error_deg) = match detection.sky_position {
        Some(sky) if sky.is_finite() && truth.sky.is_finite() => {
            // shortest way round the RA circle
            let dra = (truth.sky.ra_deg - sky.ra_deg + 180.0).rem_euclid(360.0) - 180.0;
            (
                Some(dra * truth.sky.dec_deg.to_radians().cos()),
                Some(truth.sky.dec_deg - sky.dec_deg),
            )
        }
        _ => (None, None),
    };

    MatchResidual {
        truth_id: truth.id,
        detection_id: detection.id,
        dx: detection.position.x - truth.position.x,
        dy: detection.position.y - truth.position.y,
        distance,
        flux_ratio,
        ra_error_deg,
        dec_error_deg,
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

struct Score(Option<f64>);

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(value) => write!(f, "{value:.3}"),
            None => write!(f, "n/a"),
        }
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Tolerance:   {} px", self.tolerance_px)?;
        writeln!(
            f,
            "Matches:     {} true positives, {} false positives, {} false negatives",
            self.counts.true_positives, self.counts.false_positives, self.counts.false_negatives
        )?;
        if self.counts.excluded_truth > 0 || self.counts.excluded_detections > 0 {
            writeln!(
                f,
                "Excluded:    {} truth, {} detections (non-finite or off-image)",
                self.counts.excluded_truth, self.counts.excluded_detections
            )?;
        }
        writeln!(f, "Precision:   {}", Score(self.scores.precision))?;
        writeln!(f, "Recall:      {}", Score(self.scores.recall))?;
        writeln!(f, "Accuracy:    {}", Score(self.scores.accuracy))?;
        writeln!(f, "F-score:     {}", Score(self.scores.f_score))?;
        writeln!(
            f,
            "Distance:    mean {}, median {}, max {} px",
            Score(self.distance.mean),
            Score(self.distance.median),
            Score(self.distance.max)
        )?;
        writeln!(
            f,
            "Flux ratio:  mean {}, median {}",
            Score(self.flux.mean_ratio),
            Score(self.flux.median_ratio)
        )?;

        let [[_, fp], [fn_, tp]] = self.confusion_matrix();
        writeln!(f)?;
        writeln!(f, "Confusion matrix (rows: truth absent/present, cols: detected no/yes):")?;
        writeln!(f, "  {:>6} {:>6}", 0, fp)?;
        writeln!(f, "  {:>6} {:>6}", fn_, tp)?;

        Ok(())
    }
}

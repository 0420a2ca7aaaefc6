//! Detection evaluation against a ground-truth sky model.
//!
//! [`evaluate_detections`] projects the sky catalog into pixel space, runs
//! the matcher and wraps the result in an [`EvaluationReport`]. Callers that
//! already hold pixel-space truth use [`evaluate_truth_points`].

pub mod io_mapped_csv;
mod mapped;
pub mod overlay;
mod report;

pub use mapped::{MappedArray, MappedRow};
pub use overlay::{write_overlay_json, OverlayLink, OverlayMarker, PlotOverlay};
pub use report::{
    DistanceStats, EvaluationReport, FluxStats, MatchCounts, MatchResidual, Scores,
};

use crate::catalog::projector::project_sky_catalog;
use crate::catalog::{DetectionCatalog, SkyCatalog, TruthPoint};
use crate::error::SkymatchError;
use crate::matching::{
    match_positions, CandidateIndex, MatchOptions, PixelBounds, DEFAULT_TOLERANCE_PX,
};

/// Evaluation options.
#[derive(Clone, Debug)]
pub struct EvaluateOptions {
    /// Maximum pixel distance of a match. Must be finite and non-negative.
    pub tolerance_px: f64,
    /// Exclude sources outside this image extent from matching.
    pub bounds: Option<PixelBounds>,
    pub index: CandidateIndex,
}

impl Default for EvaluateOptions {
    fn default() -> Self {
        Self {
            tolerance_px: DEFAULT_TOLERANCE_PX,
            bounds: None,
            index: CandidateIndex::Exhaustive,
        }
    }
}

impl EvaluateOptions {
    pub fn with_tolerance(mut self, tolerance_px: f64) -> Self {
        self.tolerance_px = tolerance_px;
        self
    }

    fn check(&self) -> Result<(), SkymatchError> {
        if !self.tolerance_px.is_finite() || self.tolerance_px < 0.0 {
            return Err(SkymatchError::Configuration(format!(
                "tolerance must be a finite, non-negative pixel distance, got {}",
                self.tolerance_px
            )));
        }
        if let Some(bounds) = self.bounds {
            if bounds.width == 0 || bounds.height == 0 {
                return Err(SkymatchError::Configuration(format!(
                    "image bounds must be non-empty, got {}x{}",
                    bounds.width, bounds.height
                )));
            }
        }
        Ok(())
    }

    fn match_options(&self) -> MatchOptions {
        MatchOptions {
            tolerance_px: self.tolerance_px,
            bounds: self.bounds,
            index: self.index,
        }
    }
}

/// Evaluates `detections` against the sources of `sky`.
///
/// # Errors
/// Returns a configuration error if `sky` has no transform attached or the
/// options are invalid. Nothing is matched in that case.
pub fn evaluate_detections(
    sky: &SkyCatalog,
    detections: &DetectionCatalog,
    opts: &EvaluateOptions,
) -> Result<EvaluationReport, SkymatchError> {
    opts.check()?;
    let truth = project_sky_catalog(sky)?;
    Ok(evaluate_owned(truth, detections, opts))
}

/// Evaluates `detections` against truth that is already in pixel space.
pub fn evaluate_truth_points(
    truth: &[TruthPoint],
    detections: &DetectionCatalog,
    opts: &EvaluateOptions,
) -> Result<EvaluationReport, SkymatchError> {
    opts.check()?;
    Ok(evaluate_owned(truth.to_vec(), detections, opts))
}

fn evaluate_owned(
    truth: Vec<TruthPoint>,
    detections: &DetectionCatalog,
    opts: &EvaluateOptions,
) -> EvaluationReport {
    let truth_positions: Vec<_> = truth.iter().map(|t| t.position).collect();
    let assignment = match_positions(
        &truth_positions,
        &detections.positions(),
        &opts.match_options(),
    );

    let report =
        EvaluationReport::from_assignment(truth, detections, assignment, opts.tolerance_px);
    log::info!(
        "evaluated {} detections against {} truth sources: {} TP, {} FP, {} FN",
        detections.len(),
        report.truth().len(),
        report.counts.true_positives,
        report.counts.false_positives,
        report.counts.false_negatives
    );
    report
}

//! Uniform-grid candidate search.
//!
//! Detections are bucketed into square cells slightly larger than the
//! tolerance, so any pair within tolerance sits in the same or an adjacent
//! cell. Distances are computed exactly as in the exhaustive search, which
//! keeps the candidate set (and therefore the assignment) identical.

use std::collections::HashMap;

use super::Candidate;
use crate::catalog::{Coord, Pixel};

/// Relative padding of the cell size, absorbing rounding in `x / cell`.
const CELL_PADDING: f64 = 1e-6;

/// The grid needs a positive, finite cell size.
pub(super) fn usable(tolerance_px: f64) -> bool {
    tolerance_px.is_finite() && tolerance_px > 0.0
}

fn cell_of(p: &Coord<Pixel>, cell: f64) -> (i64, i64) {
    ((p.x / cell).floor() as i64, (p.y / cell).floor() as i64)
}

pub(super) fn candidates(
    truth: &[Coord<Pixel>],
    truth_ok: &[bool],
    detections: &[Coord<Pixel>],
    detection_ok: &[bool],
    tolerance_px: f64,
) -> Vec<Candidate> {
    let cell = tolerance_px * (1.0 + CELL_PADDING);

    let mut buckets: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
    for (di, d) in detections.iter().enumerate() {
        if detection_ok[di] {
            buckets.entry(cell_of(d, cell)).or_default().push(di);
        }
    }

    let mut candidates = Vec::new();
    for (ti, t) in truth.iter().enumerate() {
        if !truth_ok[ti] {
            continue;
        }
        let (cx, cy) = cell_of(t, cell);
        for gx in cx.saturating_sub(1)..=cx.saturating_add(1) {
            for gy in cy.saturating_sub(1)..=cy.saturating_add(1) {
                let Some(bucket) = buckets.get(&(gx, gy)) else {
                    continue;
                };
                for &di in bucket {
                    let distance = t.distance_to(&detections[di]);
                    if distance <= tolerance_px {
                        candidates.push(Candidate {
                            distance,
                            truth: ti,
                            detection: di,
                        });
                    }
                }
            }
        }
    }
    candidates
}

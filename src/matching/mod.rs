//! Tolerance-bounded 1:1 assignment of detections to ground truth.
//!
//! Every (truth, detection) pair closer than the tolerance is a candidate.
//! Candidates are committed greedily from the closest pair outwards, and a
//! committed pair removes both of its sources from further consideration.
//! Ties on distance are broken by truth index, then detection index, so the
//! result only depends on the input order and the tolerance.
//!
//! Growing the tolerance never loses a match: the candidates under a smaller
//! tolerance form a sorted prefix of those under a larger one.

mod grid;

use std::cmp::Ordering;

use serde::Serialize;

use crate::catalog::{Coord, Pixel};

/// Default matching tolerance in pixels.
pub const DEFAULT_TOLERANCE_PX: f64 = 5.0;

/// How candidate pairs are enumerated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateIndex {
    /// Compare every truth source with every detection.
    #[default]
    Exhaustive,
    /// Bucket detections into a uniform grid with tolerance-sized cells and
    /// only compare neighbouring cells. Gives the same assignment.
    Grid,
}

/// Image extent used to exclude off-image positions from matching.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PixelBounds {
    pub width: u32,
    pub height: u32,
}

impl PixelBounds {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True if `p` lies in `[0, width) x [0, height)`.
    pub fn contains(&self, p: &Coord<Pixel>) -> bool {
        p.x >= 0.0 && p.y >= 0.0 && p.x < self.width as f64 && p.y < self.height as f64
    }
}

/// Matcher options.
#[derive(Clone, Debug)]
pub struct MatchOptions {
    /// Maximum Euclidean pixel distance of a match (inclusive).
    pub tolerance_px: f64,
    /// If set, positions outside the image never become candidates.
    pub bounds: Option<PixelBounds>,
    pub index: CandidateIndex,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            tolerance_px: DEFAULT_TOLERANCE_PX,
            bounds: None,
            index: CandidateIndex::Exhaustive,
        }
    }
}

/// One committed truth/detection pair (indices into the matcher inputs).
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Match {
    pub truth: usize,
    pub detection: usize,
    pub distance: f64,
}

/// Result of a matcher run.
///
/// `excluded_truth` and `excluded_detections` are the subsets of the
/// unmatched lists that were never eligible (non-finite or off-image).
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Assignment {
    /// Sorted by truth index.
    pub matches: Vec<Match>,
    pub unmatched_truth: Vec<usize>,
    pub unmatched_detections: Vec<usize>,
    pub excluded_truth: Vec<usize>,
    pub excluded_detections: Vec<usize>,
}

impl Assignment {
    /// Detection index matched to truth `index`, if any.
    pub fn detection_for_truth(&self, index: usize) -> Option<&Match> {
        self.matches
            .binary_search_by_key(&index, |m| m.truth)
            .ok()
            .map(|pos| &self.matches[pos])
    }
}

/// A candidate pair within tolerance.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Candidate {
    pub distance: f64,
    pub truth: usize,
    pub detection: usize,
}

fn candidate_order(a: &Candidate, b: &Candidate) -> Ordering {
    a.distance
        .total_cmp(&b.distance)
        .then(a.truth.cmp(&b.truth))
        .then(a.detection.cmp(&b.detection))
}

/// Computes the greedy nearest-distance assignment.
///
/// Never fails: empty inputs, a zero tolerance or positions that are all
/// NaN simply produce an assignment with no matches. A negative or NaN
/// tolerance admits no candidates.
pub fn match_positions(
    truth: &[Coord<Pixel>],
    detections: &[Coord<Pixel>],
    opts: &MatchOptions,
) -> Assignment {
    let eligible = |p: &Coord<Pixel>| {
        p.is_finite() && opts.bounds.map_or(true, |bounds| bounds.contains(p))
    };
    let truth_ok: Vec<bool> = truth.iter().map(eligible).collect();
    let detection_ok: Vec<bool> = detections.iter().map(eligible).collect();

    let mut candidates = match opts.index {
        CandidateIndex::Grid if grid::usable(opts.tolerance_px) => grid::candidates(
            truth,
            &truth_ok,
            detections,
            &detection_ok,
            opts.tolerance_px,
        ),
        _ => exhaustive_candidates(
            truth,
            &truth_ok,
            detections,
            &detection_ok,
            opts.tolerance_px,
        ),
    };
    candidates.sort_by(candidate_order);

    let mut truth_used = vec![false; truth.len()];
    let mut detection_used = vec![false; detections.len()];
    let mut matches = Vec::new();

    for candidate in &candidates {
        if truth_used[candidate.truth] || detection_used[candidate.detection] {
            continue;
        }
        truth_used[candidate.truth] = true;
        detection_used[candidate.detection] = true;
        matches.push(Match {
            truth: candidate.truth,
            detection: candidate.detection,
            distance: candidate.distance,
        });
    }
    matches.sort_by_key(|m| m.truth);

    let unmatched = |used: &[bool]| -> Vec<usize> {
        used.iter()
            .enumerate()
            .filter(|(_, used)| !**used)
            .map(|(idx, _)| idx)
            .collect()
    };
    let excluded = |ok: &[bool]| -> Vec<usize> {
        ok.iter()
            .enumerate()
            .filter(|(_, ok)| !**ok)
            .map(|(idx, _)| idx)
            .collect()
    };

    log::debug!(
        "matched {} pairs from {} candidates ({} truth, {} detections, tolerance {} px)",
        matches.len(),
        candidates.len(),
        truth.len(),
        detections.len(),
        opts.tolerance_px
    );

    Assignment {
        matches,
        unmatched_truth: unmatched(&truth_used),
        unmatched_detections: unmatched(&detection_used),
        excluded_truth: excluded(&truth_ok),
        excluded_detections: excluded(&detection_ok),
    }
}

/// Fuzz-only entrypoint: panics if the grid index and the exhaustive search
/// disagree on any input.
#[cfg(feature = "fuzzing")]
pub fn fuzz_grid_agrees(truth: &[Coord<Pixel>], detections: &[Coord<Pixel>], tolerance_px: f64) {
    let exhaustive = MatchOptions {
        tolerance_px,
        bounds: None,
        index: CandidateIndex::Exhaustive,
    };
    let grid = MatchOptions {
        index: CandidateIndex::Grid,
        ..exhaustive.clone()
    };
    assert_eq!(
        match_positions(truth, detections, &exhaustive),
        match_positions(truth, detections, &grid)
    );
}

fn exhaustive_candidates(
    truth: &[Coord<Pixel>],
    truth_ok: &[bool],
    detections: &[Coord<Pixel>],
    detection_ok: &[bool],
    tolerance_px: f64,
) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    for (ti, t) in truth.iter().enumerate() {
        if !truth_ok[ti] {
            continue;
        }
        for (di, d) in detections.iter().enumerate() {
            if !detection_ok[di] {
                continue;
            }
            let distance = t.distance_to(d);
            if distance <= tolerance_px {
                candidates.push(Candidate {
                    distance,
                    truth: ti,
                    detection: di,
                });
            }
        }
    }
    candidates
}

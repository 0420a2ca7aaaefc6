#![allow(dead_code)]

use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};
use skymatch::catalog::{
    Coord, DetectedSource, DetectionCatalog, Pixel, PositionErrors, SourceShape,
};
use skymatch::matching::Assignment;

/// Position tolerance for CSV round trips (floats are written exactly).
pub const EPS_POSITION: f64 = 1e-9;

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// A pixel position inside `[0, extent) x [0, extent)`.
pub fn arb_pixel(extent: f64) -> BoxedStrategy<Coord<Pixel>> {
    (0.0..extent, 0.0..extent)
        .prop_map(|(x, y)| Coord::new(x, y))
        .boxed()
}

/// Up to `max_points` positions in a square field. Small fields make
/// contested candidates (one detection near several truth sources) common.
pub fn arb_field(max_points: usize, extent: f64) -> BoxedStrategy<Vec<Coord<Pixel>>> {
    proptest::collection::vec(arb_pixel(extent), 0..=max_points).boxed()
}

/// Positions on a 1/4-pixel lattice, so exact distance ties and points on
/// grid cell boundaries occur often.
pub fn arb_lattice_field(max_points: usize, cells: u32) -> BoxedStrategy<Vec<Coord<Pixel>>> {
    proptest::collection::vec((0..cells * 4, 0..cells * 4), 0..=max_points)
        .prop_map(|points| {
            points
                .into_iter()
                .map(|(x, y)| Coord::new(x as f64 / 4.0, y as f64 / 4.0))
                .collect()
        })
        .boxed()
}

fn arb_optional(range: std::ops::Range<f64>) -> BoxedStrategy<Option<f64>> {
    proptest::option::of(range).boxed()
}

/// A detection catalog with unique ids and a random mix of optional columns.
pub fn arb_detection_catalog(max_sources: usize) -> BoxedStrategy<DetectionCatalog> {
    proptest::collection::vec(
        (
            0.0..4096.0f64,
            0.0..4096.0f64,
            -1.0..10.0f64,
            proptest::option::of((0.0..360.0f64, -90.0..90.0f64)),
            arb_optional(0.0..2.0),
            arb_optional(0.0..2.0),
            arb_optional(0.0..1.0),
            proptest::option::of((1.0..20.0f64, 0.5..1.0f64, 0.0..180.0f64)),
        ),
        0..=max_sources,
    )
    .prop_map(|rows| {
        let sources = rows
            .into_iter()
            .enumerate()
            .map(|(i, (x, y, flux, sky, x_err, y_err, flux_err, shape))| {
                let mut source = DetectedSource::new(i as u64 * 3 + 1, x, y, flux).with_errors(
                    PositionErrors {
                        x: x_err,
                        y: y_err,
                        flux: flux_err,
                    },
                );
                if let Some((ra, dec)) = sky {
                    source = source.with_sky_position(ra, dec);
                }
                if let Some((major, axis_ratio, pa)) = shape {
                    source = source.with_shape(SourceShape::new(major, major * axis_ratio, pa));
                }
                source
            })
            .collect();
        DetectionCatalog::new(sources).expect("ids are unique by construction")
    })
    .boxed()
}

/// Checks the structural invariants every assignment must satisfy.
pub fn assert_assignment_consistent(
    assignment: &Assignment,
    truth_len: usize,
    detection_len: usize,
    tolerance_px: f64,
) -> Result<(), String> {
    let mut truth_seen = vec![0usize; truth_len];
    let mut detection_seen = vec![0usize; detection_len];

    for m in &assignment.matches {
        if m.distance > tolerance_px {
            return Err(format!(
                "match ({}, {}) has distance {} above tolerance {}",
                m.truth, m.detection, m.distance, tolerance_px
            ));
        }
        truth_seen[m.truth] += 1;
        detection_seen[m.detection] += 1;
    }
    for &t in &assignment.unmatched_truth {
        truth_seen[t] += 1;
    }
    for &d in &assignment.unmatched_detections {
        detection_seen[d] += 1;
    }

    if let Some(t) = truth_seen.iter().position(|&n| n != 1) {
        return Err(format!("truth {} appears {} times", t, truth_seen[t]));
    }
    if let Some(d) = detection_seen.iter().position(|&n| n != 1) {
        return Err(format!("detection {} appears {} times", d, detection_seen[d]));
    }

    if !assignment.matches.windows(2).all(|w| w[0].truth < w[1].truth) {
        return Err("matches are not in ascending truth order".to_string());
    }
    Ok(())
}

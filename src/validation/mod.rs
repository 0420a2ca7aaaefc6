//! Catalog validation for skymatch.
//!
//! Checks the inputs of an evaluation before it runs:
//! - Identity (unique detection ids)
//! - Positions (finite, on the image, declination in range)
//! - Flux and measurement metadata (finite, positive, sane shapes)
//!
//! Unlike the readers, validation never stops at the first problem: every
//! issue is collected into a [`ValidationReport`].

mod report;

pub use report::{IssueCode, IssueContext, Severity, ValidationIssue, ValidationReport};

use std::collections::HashMap;

use crate::catalog::{DetectedSource, DetectionId, SkyCatalog, SourceShape};
use crate::matching::PixelBounds;

/// Options for validation behavior.
#[derive(Clone, Debug, Default)]
pub struct ValidateOptions {
    /// If true, treat warnings as errors.
    pub strict: bool,
    /// Image extent for bounds checks; skipped when `None`.
    pub bounds: Option<PixelBounds>,
}

/// Validates detected sources and returns every issue found.
///
/// Takes a plain slice so finder output can be checked before it is turned
/// into a [`DetectionCatalog`](crate::catalog::DetectionCatalog), which would
/// reject duplicate ids outright.
pub fn validate_detections(
    sources: &[DetectedSource],
    opts: &ValidateOptions,
) -> ValidationReport {
    let mut report = ValidationReport::new();
    let mut seen_ids: HashMap<DetectionId, usize> = HashMap::new();

    for (idx, source) in sources.iter().enumerate() {
        let id = source.id.as_u64();
        let context = || IssueContext::Detection { id };

        if let Some(first_idx) = seen_ids.get(&source.id) {
            report.add(ValidationIssue::error(
                IssueCode::DuplicateDetectionId,
                format!(
                    "Duplicate detection ID {} (first seen at index {})",
                    id, first_idx
                ),
                context(),
            ));
        } else {
            seen_ids.insert(source.id, idx);
        }

        let p = source.position;
        if !p.is_finite() {
            report.add(ValidationIssue::error(
                IssueCode::NonFinitePixelPosition,
                format!("Non-finite pixel position ({}, {})", p.x, p.y),
                context(),
            ));
        } else if let Some(bounds) = opts.bounds {
            if !bounds.contains(&p) {
                report.add(ValidationIssue::warning(
                    IssueCode::OutOfImageBounds,
                    format!(
                        "Position ({:.2}, {:.2}) is outside the {}x{} image",
                        p.x, p.y, bounds.width, bounds.height
                    ),
                    context(),
                ));
            }
        }

        check_flux(source.flux, context(), &mut report);

        if let Some(sky) = source.sky_position {
            check_sky_position(sky.ra_deg, sky.dec_deg, context(), &mut report);
        }

        for (name, value) in [
            ("x", source.errors.x),
            ("y", source.errors.y),
            ("flux", source.errors.flux),
        ] {
            if let Some(value) = value {
                if !value.is_finite() || value < 0.0 {
                    report.add(ValidationIssue::warning(
                        IssueCode::InvalidMeasurementError,
                        format!("Invalid {} error {}", name, value),
                        context(),
                    ));
                }
            }
        }

        if let Some(shape) = source.shape {
            check_shape(&shape, context(), &mut report);
        }
    }

    report
}

/// Validates a sky catalog. With a transform attached, sources are also
/// checked against the projection domain and the image bounds.
pub fn validate_sky(sky: &SkyCatalog, opts: &ValidateOptions) -> ValidationReport {
    let mut report = ValidationReport::new();

    let transform = sky.transform().ok();
    if transform.is_none() && opts.bounds.is_some() {
        report.add(ValidationIssue::warning(
            IssueCode::MissingTransform,
            "No world-coordinate transform attached; skipping image bounds checks",
            IssueContext::Catalog,
        ));
    }

    for source in sky.sources() {
        let id = source.id.as_u64();
        let context = || IssueContext::SkySource { id };
        let position = source.position;

        let position_ok =
            check_sky_position(position.ra_deg, position.dec_deg, context(), &mut report);
        check_flux(source.flux, context(), &mut report);
        check_shape(&source.shape, context(), &mut report);

        let Some(transform) = transform else {
            continue;
        };
        if !position_ok {
            continue;
        }

        let pixel = transform.world_to_pixel(position.ra_deg, position.dec_deg);
        if !pixel.is_finite() {
            report.add(ValidationIssue::warning(
                IssueCode::OutsideProjection,
                format!(
                    "({:.4}, {:.4}) cannot be projected onto the image plane",
                    position.ra_deg, position.dec_deg
                ),
                context(),
            ));
        } else if let Some(bounds) = opts.bounds {
            if !bounds.contains(&pixel) {
                report.add(ValidationIssue::warning(
                    IssueCode::OutOfImageBounds,
                    format!(
                        "Projects to ({:.2}, {:.2}), outside the {}x{} image",
                        pixel.x, pixel.y, bounds.width, bounds.height
                    ),
                    context(),
                ));
            }
        }
    }

    report
}

/// Returns true if the position is usable.
fn check_sky_position(
    ra_deg: f64,
    dec_deg: f64,
    context: IssueContext,
    report: &mut ValidationReport,
) -> bool {
    if !ra_deg.is_finite() || !dec_deg.is_finite() {
        report.add(ValidationIssue::error(
            IssueCode::NonFiniteSkyPosition,
            format!("Non-finite sky position ({}, {})", ra_deg, dec_deg),
            context,
        ));
        return false;
    }
    if !(-90.0..=90.0).contains(&dec_deg) {
        report.add(ValidationIssue::error(
            IssueCode::DecOutOfRange,
            format!("Declination {} is outside [-90, 90]", dec_deg),
            context,
        ));
        return false;
    }
    true
}

fn check_flux(flux: f64, context: IssueContext, report: &mut ValidationReport) {
    if !flux.is_finite() {
        report.add(ValidationIssue::error(
            IssueCode::NonFiniteFlux,
            format!("Non-finite flux {}", flux),
            context,
        ));
    } else if flux <= 0.0 {
        report.add(ValidationIssue::warning(
            IssueCode::NonPositiveFlux,
            format!("Zero or negative flux {}", flux),
            context,
        ));
    }
}

fn check_shape(shape: &SourceShape, context: IssueContext, report: &mut ValidationReport) {
    if shape.major < 0.0 || shape.minor < 0.0 || shape.minor > shape.major {
        report.add(ValidationIssue::warning(
            IssueCode::InvalidShape,
            format!(
                "Shape major {} / minor {} (need 0 <= minor <= major)",
                shape.major, shape.minor
            ),
            context,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{PositionErrors, Projection, SkyPosition, SkySource, WorldTransform};

    fn valid_detections() -> Vec<DetectedSource> {
        vec![
            DetectedSource::new(0u64, 10.0, 12.0, 0.3),
            DetectedSource::new(1u64, 100.5, 40.25, 1.2).with_sky_position(250.0, -80.0),
        ]
    }

    fn sky_with_transform() -> SkyCatalog {
        sky_of(vec![SkySource::new(0u64, 250.0, -80.0, 1.0)])
    }

    fn sky_of(sources: Vec<SkySource>) -> SkyCatalog {
        let transform = WorldTransform::image_centered(
            Projection::Sin,
            SkyPosition::new(250.0, -80.0),
            0.002,
            512,
            512,
        )
        .unwrap();
        SkyCatalog::new(sources).with_transform(transform)
    }

    #[test]
    fn test_valid_detections() {
        let report = validate_detections(&valid_detections(), &ValidateOptions::default());
        assert!(
            report.is_clean(),
            "Expected no issues, got: {:?}",
            report.issues
        );
    }

    #[test]
    fn test_duplicate_detection_id() {
        let mut sources = valid_detections();
        sources.push(DetectedSource::new(1u64, 5.0, 5.0, 0.1));

        let report = validate_detections(&sources, &ValidateOptions::default());
        assert_eq!(report.error_count(), 1);
        assert!(report.has(IssueCode::DuplicateDetectionId));
    }

    #[test]
    fn test_non_finite_position_skips_bounds_check() {
        let sources = vec![DetectedSource::new(0u64, f64::NAN, 3.0, 0.1)];
        let opts = ValidateOptions {
            bounds: Some(PixelBounds::new(64, 64)),
            ..Default::default()
        };
        let report = validate_detections(&sources, &opts);
        assert!(report.has(IssueCode::NonFinitePixelPosition));
        assert!(!report.has(IssueCode::OutOfImageBounds));
    }

    #[test]
    fn test_out_of_bounds_is_warning() {
        let sources = vec![DetectedSource::new(0u64, 64.0, 3.0, 0.1)];
        let opts = ValidateOptions {
            bounds: Some(PixelBounds::new(64, 64)),
            ..Default::default()
        };
        let report = validate_detections(&sources, &opts);
        assert!(report.is_ok());
        assert_eq!(report.warning_count(), 1);
        assert!(report.has(IssueCode::OutOfImageBounds));
    }

    #[test]
    fn test_flux_checks() {
        let sources = vec![
            DetectedSource::new(0u64, 1.0, 1.0, f64::INFINITY),
            DetectedSource::new(1u64, 1.0, 1.0, -0.5),
        ];
        let report = validate_detections(&sources, &ValidateOptions::default());
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.warning_count(), 1);
        assert!(report.has(IssueCode::NonFiniteFlux));
        assert!(report.has(IssueCode::NonPositiveFlux));
    }

    #[test]
    fn test_metadata_checks() {
        let sources = vec![DetectedSource::new(0u64, 1.0, 1.0, 1.0)
            .with_sky_position(10.0, 95.0)
            .with_errors(PositionErrors {
                x: Some(-0.1),
                y: None,
                flux: None,
            })
            .with_shape(SourceShape::new(2.0, 3.0, 0.0))];
        let report = validate_detections(&sources, &ValidateOptions::default());
        assert!(report.has(IssueCode::DecOutOfRange));
        assert!(report.has(IssueCode::InvalidMeasurementError));
        assert!(report.has(IssueCode::InvalidShape));
    }

    #[test]
    fn test_valid_sky() {
        let opts = ValidateOptions {
            bounds: Some(PixelBounds::new(512, 512)),
            ..Default::default()
        };
        let report = validate_sky(&sky_with_transform(), &opts);
        assert!(report.is_clean(), "{:?}", report.issues);
    }

    #[test]
    fn test_sky_source_off_image_and_off_sphere() {
        let sky = sky_of(vec![
            SkySource::new(0u64, 250.0, -80.0, 1.0),
            SkySource::new(1u64, 250.0, -70.0, 1.0),
            SkySource::new(2u64, 70.0, 80.0, 1.0),
            SkySource::new(3u64, 250.0, -91.0, 1.0),
        ]);

        let opts = ValidateOptions {
            bounds: Some(PixelBounds::new(512, 512)),
            ..Default::default()
        };
        let report = validate_sky(&sky, &opts);
        assert!(report.has(IssueCode::OutOfImageBounds));
        assert!(report.has(IssueCode::OutsideProjection));
        assert!(report.has(IssueCode::DecOutOfRange));
        assert_eq!(report.error_count(), 1);
    }

    #[test]
    fn test_sky_without_transform_warns_once() {
        let sky = SkyCatalog::new(vec![
            SkySource::new(0u64, 250.0, -80.0, 1.0),
            SkySource::new(1u64, 250.1, -80.0, 1.0),
        ]);
        let opts = ValidateOptions {
            bounds: Some(PixelBounds::new(512, 512)),
            ..Default::default()
        };
        let report = validate_sky(&sky, &opts);
        assert_eq!(report.warning_count(), 1);
        assert!(report.has(IssueCode::MissingTransform));
    }

    #[test]
    fn test_report_serializes() {
        let sources = vec![DetectedSource::new(0u64, f64::NAN, 1.0, 1.0)];
        let report = validate_detections(&sources, &ValidateOptions::default());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["issues"][0]["severity"], "error");
        assert_eq!(json["issues"][0]["code"], "NonFinitePixelPosition");
        assert_eq!(json["issues"][0]["context"]["kind"], "detection");
        assert_eq!(json["issues"][0]["context"]["id"], 0);
    }
}

//! Core catalog model: ground-truth sky sources and detected sources.
//!
//! A [`SkyCatalog`] lives in sky coordinates and only reaches pixel space
//! through an attached [`WorldTransform`]. A [`DetectionCatalog`] lives in
//! pixel space from the start, since that is what a source finder measures.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::ids::{DetectionId, SkySourceId};
use super::space::Pixel;
use super::wcs::{Projection, WorldTransform};
use super::Coord;
use crate::error::SkymatchError;

/// A position on the celestial sphere, in degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SkyPosition {
    pub ra_deg: f64,
    pub dec_deg: f64,
}

impl SkyPosition {
    pub fn new(ra_deg: f64, dec_deg: f64) -> Self {
        Self { ra_deg, dec_deg }
    }

    pub fn is_finite(&self) -> bool {
        self.ra_deg.is_finite() && self.dec_deg.is_finite()
    }
}

/// Elliptical source shape.
///
/// Sky catalogs give the axes as FWHM in arcsec; detections give them in
/// pixels. The position angle is in degrees east of north in both cases.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceShape {
    pub major: f64,
    pub minor: f64,
    pub position_angle: f64,
}

impl SourceShape {
    pub fn new(major: f64, minor: f64, position_angle: f64) -> Self {
        Self {
            major,
            minor,
            position_angle,
        }
    }

    /// True for an unresolved source (both axes zero).
    pub fn is_point(&self) -> bool {
        self.major == 0.0 && self.minor == 0.0
    }
}

/// A ground-truth source of the simulated sky.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SkySource {
    /// Row index of the source in its catalog.
    pub id: SkySourceId,

    pub position: SkyPosition,

    /// Stokes I flux density in Jy.
    pub flux: f64,

    /// Frequency the flux is quoted at, in Hz.
    #[serde(default)]
    pub reference_frequency_hz: f64,

    #[serde(default)]
    pub spectral_index: f64,

    #[serde(default)]
    pub shape: SourceShape,
}

impl SkySource {
    /// Creates an unresolved source with a flat spectrum.
    pub fn new(id: impl Into<SkySourceId>, ra_deg: f64, dec_deg: f64, flux: f64) -> Self {
        Self {
            id: id.into(),
            position: SkyPosition::new(ra_deg, dec_deg),
            flux,
            reference_frequency_hz: 0.0,
            spectral_index: 0.0,
            shape: SourceShape::default(),
        }
    }

    pub fn with_shape(mut self, shape: SourceShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_spectrum(mut self, reference_frequency_hz: f64, spectral_index: f64) -> Self {
        self.reference_frequency_hz = reference_frequency_hz;
        self.spectral_index = spectral_index;
        self
    }
}

/// The ground-truth sky model of one simulation.
///
/// Sources are fixed once the catalog is built. Pixel-space operations need
/// a [`WorldTransform`]; it is attached once by a setup step and never
/// defaulted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SkyCatalog {
    sources: Vec<SkySource>,
    transform: Option<WorldTransform>,
}

impl SkyCatalog {
    pub fn new(sources: Vec<SkySource>) -> Self {
        Self {
            sources,
            transform: None,
        }
    }

    /// Attaches a world-coordinate transform.
    pub fn with_transform(mut self, transform: WorldTransform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Attaches an image-centered transform for a `width` x `height` image.
    pub fn setup_image_transform(
        &mut self,
        projection: Projection,
        phase_center: SkyPosition,
        pixel_scale_deg: f64,
        width: u32,
        height: u32,
    ) -> Result<(), SkymatchError> {
        let transform =
            WorldTransform::image_centered(projection, phase_center, pixel_scale_deg, width, height)?;
        self.transform = Some(transform);
        Ok(())
    }

    /// The attached transform, or a configuration error if none was set up.
    pub fn transform(&self) -> Result<&WorldTransform, SkymatchError> {
        self.transform.as_ref().ok_or_else(|| {
            SkymatchError::Configuration(
                "sky catalog has no world-coordinate transform; attach one before projecting"
                    .to_string(),
            )
        })
    }

    pub fn has_transform(&self) -> bool {
        self.transform.is_some()
    }

    pub fn sources(&self) -> &[SkySource] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// 1-sigma measurement errors reported by a source finder.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionErrors {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub flux: Option<f64>,
}

impl PositionErrors {
    pub fn is_empty(&self) -> bool {
        self.x.is_none() && self.y.is_none() && self.flux.is_none()
    }
}

/// A source located by the external source finder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectedSource {
    pub id: DetectionId,

    pub position: Coord<Pixel>,

    /// Flux estimate in Jy (peak or integrated, as the finder reports it).
    pub flux: f64,

    /// Sky position if the finder reported one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sky_position: Option<SkyPosition>,

    #[serde(default, skip_serializing_if = "PositionErrors::is_empty")]
    pub errors: PositionErrors,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<SourceShape>,
}

impl DetectedSource {
    pub fn new(id: impl Into<DetectionId>, x: f64, y: f64, flux: f64) -> Self {
        Self {
            id: id.into(),
            position: Coord::new(x, y),
            flux,
            sky_position: None,
            errors: PositionErrors::default(),
            shape: None,
        }
    }

    pub fn with_sky_position(mut self, ra_deg: f64, dec_deg: f64) -> Self {
        self.sky_position = Some(SkyPosition::new(ra_deg, dec_deg));
        self
    }

    pub fn with_errors(mut self, errors: PositionErrors) -> Self {
        self.errors = errors;
        self
    }

    pub fn with_shape(mut self, shape: SourceShape) -> Self {
        self.shape = Some(shape);
        self
    }
}

/// Sources found in one image, in pixel space.
///
/// Equality treats NaN as equal to NaN, so a catalog holding non-finite
/// positions still equals its own CSV round trip.
#[derive(Clone, Debug, Default)]
pub struct DetectionCatalog {
    sources: Vec<DetectedSource>,
    source_image: Option<PathBuf>,
    pixel_scale_deg: Option<f64>,
}

impl DetectionCatalog {
    /// Builds a catalog, rejecting duplicate detection ids.
    pub fn new(sources: Vec<DetectedSource>) -> Result<Self, SkymatchError> {
        let mut seen = HashSet::with_capacity(sources.len());
        for (idx, source) in sources.iter().enumerate() {
            if !seen.insert(source.id) {
                return Err(SkymatchError::DetectionInvalid(format!(
                    "duplicate detection id {} at index {}",
                    source.id, idx
                )));
            }
        }
        Ok(Self {
            sources,
            source_image: None,
            pixel_scale_deg: None,
        })
    }

    pub fn with_pixel_scale(mut self, pixel_scale_deg: f64) -> Self {
        self.pixel_scale_deg = Some(pixel_scale_deg);
        self
    }

    /// Records the image the detections were made on.
    ///
    /// Fails with [`SkymatchError::NotFound`] if the file does not exist.
    pub fn attach_source_image(&mut self, path: impl AsRef<Path>) -> Result<(), SkymatchError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(SkymatchError::NotFound {
                what: "source image",
                path: path.to_path_buf(),
            });
        }
        self.source_image = Some(path.to_path_buf());
        Ok(())
    }

    /// Like [`attach_source_image`](Self::attach_source_image), but a missing
    /// image is only logged: plotting is optional, evaluation is not.
    pub fn attach_source_image_lenient(&mut self, path: impl AsRef<Path>) {
        if let Err(err) = self.attach_source_image(path) {
            log::warn!("{err}; continuing without a plotting background");
        }
    }

    pub fn sources(&self) -> &[DetectedSource] {
        &self.sources
    }

    pub fn source_image(&self) -> Option<&Path> {
        self.source_image.as_deref()
    }

    pub fn pixel_scale_deg(&self) -> Option<f64> {
        self.pixel_scale_deg
    }

    pub fn positions(&self) -> Vec<Coord<Pixel>> {
        self.sources.iter().map(|s| s.position).collect()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

fn same(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

fn same_opt(a: Option<f64>, b: Option<f64>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => same(a, b),
        (None, None) => true,
        _ => false,
    }
}

fn same_source(a: &DetectedSource, b: &DetectedSource) -> bool {
    let sky = match (a.sky_position, b.sky_position) {
        (Some(p), Some(q)) => same(p.ra_deg, q.ra_deg) && same(p.dec_deg, q.dec_deg),
        (None, None) => true,
        _ => false,
    };
    let shape = match (a.shape, b.shape) {
        (Some(p), Some(q)) => {
            same(p.major, q.major)
                && same(p.minor, q.minor)
                && same(p.position_angle, q.position_angle)
        }
        (None, None) => true,
        _ => false,
    };
    a.id == b.id
        && same(a.position.x, b.position.x)
        && same(a.position.y, b.position.y)
        && same(a.flux, b.flux)
        && sky
        && shape
        && same_opt(a.errors.x, b.errors.x)
        && same_opt(a.errors.y, b.errors.y)
        && same_opt(a.errors.flux, b.errors.flux)
}

impl PartialEq for DetectionCatalog {
    fn eq(&self, other: &Self) -> bool {
        self.source_image == other.source_image
            && same_opt(self.pixel_scale_deg, other.pixel_scale_deg)
            && self.sources.len() == other.sources.len()
            && self
                .sources
                .iter()
                .zip(&other.sources)
                .all(|(a, b)| same_source(a, b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sky_sources_are_read_through_accessor() {
        let sky = SkyCatalog::new(vec![
            SkySource::new(0u64, 10.0, -30.0, 1.0),
            SkySource::new(1u64, 11.0, -31.0, 2.0),
        ]);
        assert_eq!(sky.sources().len(), 2);
        assert_eq!(sky.sources()[1].id, SkySourceId(1));
        assert_eq!(sky.sources()[1].flux, 2.0);
    }

    #[test]
    fn catalogs_with_nan_positions_compare_equal() {
        let catalog = || {
            DetectionCatalog::new(vec![
                DetectedSource::new(0u64, f64::NAN, 3.0, 1.0),
                DetectedSource::new(1u64, 4.0, 5.0, f64::NAN).with_sky_position(f64::NAN, 0.0),
            ])
            .unwrap()
        };
        assert_eq!(catalog(), catalog());

        let other = DetectionCatalog::new(vec![
            DetectedSource::new(0u64, 2.0, 3.0, 1.0),
            DetectedSource::new(1u64, 4.0, 5.0, f64::NAN).with_sky_position(f64::NAN, 0.0),
        ])
        .unwrap();
        assert_ne!(catalog(), other);
    }

    #[test]
    fn duplicate_detection_ids_are_rejected() {
        let result = DetectionCatalog::new(vec![
            DetectedSource::new(1u64, 1.0, 1.0, 0.5),
            DetectedSource::new(1u64, 2.0, 2.0, 0.5),
        ]);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Format);
    }

    #[test]
    fn transform_is_required_before_pixel_work() {
        let sky = SkyCatalog::new(vec![SkySource::new(0u64, 10.0, -30.0, 1.0)]);
        let err = sky.transform().unwrap_err();
        assert!(matches!(err, SkymatchError::Configuration(_)));
    }

    #[test]
    fn setup_image_transform_attaches_transform() {
        let mut sky = SkyCatalog::new(vec![]);
        sky.setup_image_transform(
            Projection::Sin,
            SkyPosition::new(10.0, -30.0),
            0.001,
            1024,
            1024,
        )
        .expect("valid setup");
        assert!(sky.has_transform());
        assert_eq!(sky.transform().unwrap().reference_pixel().x, 512.0);
    }

    #[test]
    fn missing_source_image_is_not_found() {
        let mut catalog = DetectionCatalog::new(vec![]).unwrap();
        let err = catalog
            .attach_source_image("/definitely/not/here/restored.fits")
            .unwrap_err();
        assert!(matches!(err, SkymatchError::NotFound { .. }));

        catalog.attach_source_image_lenient("/definitely/not/here/restored.fits");
        assert!(catalog.source_image().is_none());
    }

    #[test]
    fn builder_pattern_sets_optional_fields() {
        let det = DetectedSource::new(4u64, 10.0, 11.0, 0.2)
            .with_sky_position(250.0, -80.0)
            .with_shape(SourceShape::new(3.0, 2.0, 45.0));
        assert_eq!(det.sky_position, Some(SkyPosition::new(250.0, -80.0)));
        assert!(!det.shape.unwrap().is_point());
        assert!(det.errors.is_empty());
    }
}

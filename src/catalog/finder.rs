//! Adapter from source-finder output to a [`DetectionCatalog`].
//!
//! Source finders are external collaborators. All this crate needs from one
//! is the capability captured by [`SourceFinderResult`]: a pixel position
//! and a flux per detected source. The two concrete inputs are an in-memory
//! finder result and a detection CSV written earlier; [`DetectionInput`]
//! selects between them and [`load_detections`] normalizes either into the
//! same catalog.

use std::path::{Path, PathBuf};

use super::io_detection_csv::{read_detection_csv, DetectionCsvOptions};
use super::model::{DetectedSource, DetectionCatalog, PositionErrors, SkyPosition, SourceShape};
use super::{Coord, DetectionId};
use crate::error::SkymatchError;

/// Per-source access to a source finder's result.
pub trait SourceFinderResult {
    /// Number of detected sources.
    fn source_count(&self) -> usize;

    /// Zero-based pixel position `(x, y)` of source `index`.
    fn pixel_position(&self, index: usize) -> (f64, f64);

    /// Flux estimate of source `index`, in Jy.
    fn flux(&self, index: usize) -> f64;

    /// Identity of source `index`; defaults to its position in the result.
    fn source_id(&self, index: usize) -> u64 {
        index as u64
    }

    fn sky_position(&self, _index: usize) -> Option<SkyPosition> {
        None
    }

    fn errors(&self, _index: usize) -> PositionErrors {
        PositionErrors::default()
    }

    fn shape(&self, _index: usize) -> Option<SourceShape> {
        None
    }

    /// Image the finder ran on, kept for plotting.
    fn source_image(&self) -> Option<&Path> {
        None
    }

    fn pixel_scale_deg(&self) -> Option<f64> {
        None
    }
}

/// A source-finder result held in memory, as produced by a binding to an
/// external finder.
#[derive(Clone, Debug, Default)]
pub struct InMemoryDetections {
    pub sources: Vec<DetectedSource>,
    pub source_image: Option<PathBuf>,
    pub pixel_scale_deg: Option<f64>,
}

impl InMemoryDetections {
    pub fn new(sources: Vec<DetectedSource>) -> Self {
        Self {
            sources,
            source_image: None,
            pixel_scale_deg: None,
        }
    }

    /// Builds a result from bare `(x, y, flux)` triples; ids are the
    /// positions in `points`.
    pub fn from_points(points: &[(f64, f64, f64)]) -> Self {
        Self::new(
            points
                .iter()
                .enumerate()
                .map(|(i, &(x, y, flux))| DetectedSource::new(i as u64, x, y, flux))
                .collect(),
        )
    }
}

impl SourceFinderResult for InMemoryDetections {
    fn source_count(&self) -> usize {
        self.sources.len()
    }

    fn pixel_position(&self, index: usize) -> (f64, f64) {
        let p = self.sources[index].position;
        (p.x, p.y)
    }

    fn flux(&self, index: usize) -> f64 {
        self.sources[index].flux
    }

    fn source_id(&self, index: usize) -> u64 {
        self.sources[index].id.as_u64()
    }

    fn sky_position(&self, index: usize) -> Option<SkyPosition> {
        self.sources[index].sky_position
    }

    fn errors(&self, index: usize) -> PositionErrors {
        self.sources[index].errors
    }

    fn shape(&self, index: usize) -> Option<SourceShape> {
        self.sources[index].shape
    }

    fn source_image(&self) -> Option<&Path> {
        self.source_image.as_deref()
    }

    fn pixel_scale_deg(&self) -> Option<f64> {
        self.pixel_scale_deg
    }
}

/// Where a detection catalog comes from.
pub enum DetectionInput<'a> {
    /// A live source-finder result.
    Finder(&'a dyn SourceFinderResult),
    /// A detection CSV persisted by an earlier run.
    Csv {
        path: &'a Path,
        options: DetectionCsvOptions,
    },
}

/// Normalizes either input variant into a [`DetectionCatalog`].
pub fn load_detections(input: DetectionInput<'_>) -> Result<DetectionCatalog, SkymatchError> {
    match input {
        DetectionInput::Finder(result) => from_finder(result),
        DetectionInput::Csv { path, options } => read_detection_csv(path, &options),
    }
}

/// Copies a finder result into a catalog, preserving source order.
///
/// Fails if two sources share an id. A missing source image is logged and
/// dropped, the same as on the CSV path.
pub fn from_finder(result: &dyn SourceFinderResult) -> Result<DetectionCatalog, SkymatchError> {
    let sources = (0..result.source_count())
        .map(|i| {
            let (x, y) = result.pixel_position(i);
            DetectedSource {
                id: DetectionId::new(result.source_id(i)),
                position: Coord::new(x, y),
                flux: result.flux(i),
                sky_position: result.sky_position(i),
                errors: result.errors(i),
                shape: result.shape(i),
            }
        })
        .collect();

    let mut catalog = DetectionCatalog::new(sources)?;
    if let Some(scale) = result.pixel_scale_deg() {
        catalog = catalog.with_pixel_scale(scale);
    }
    if let Some(image) = result.source_image() {
        catalog.attach_source_image_lenient(image);
    }
    Ok(catalog)
}

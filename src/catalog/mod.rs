//! Catalog types for source detection evaluation.
//!
//! Two catalogs meet in this crate: the ground-truth [`SkyCatalog`] that a
//! simulation was run with, and the [`DetectionCatalog`] a source finder
//! produced from the resulting image. The sky catalog lives in sky
//! coordinates until a [`WorldTransform`] projects it into pixel space, where
//! the detections already are.
//!
//! # Design Principles
//!
//! 1. **Type Safety**: Newtype ids keep truth and detection identities
//!    apart, and marker types keep pixel positions apart from projection
//!    plane offsets.
//!
//! 2. **Explicit Setup**: A sky catalog has no transform until one is
//!    attached. Projecting without one is a configuration error, never an
//!    implicit default.
//!
//! 3. **Permissive Positions**: Non-finite positions are representable (a
//!    source outside the projection domain projects to NaN) so that the
//!    matcher and validation can report them instead of panicking.
//!
//! # Example
//!
//! ```
//! use skymatch::catalog::{Projection, SkyCatalog, SkyPosition, SkySource, WorldTransform};
//! use skymatch::catalog::projector::project_sky_catalog;
//!
//! let transform = WorldTransform::image_centered(
//!     Projection::Sin,
//!     SkyPosition::new(250.0, -80.0),
//!     0.002,
//!     512,
//!     512,
//! )?;
//! let sky = SkyCatalog::new(vec![SkySource::new(0u64, 250.0, -80.0, 1.0)])
//!     .with_transform(transform);
//! let truth = project_sky_catalog(&sky)?;
//! assert!((truth[0].position.x - 256.0).abs() < 1e-9);
//! # Ok::<(), skymatch::SkymatchError>(())
//! ```

mod coord;
pub mod finder;
mod ids;
pub mod io_detection_csv;
pub mod io_sky_csv;
mod model;
pub mod projector;
mod space;
mod wcs;

// Re-export core types for convenient access
pub use coord::Coord;
pub use finder::{load_detections, DetectionInput, InMemoryDetections, SourceFinderResult};
pub use ids::{DetectionId, SkySourceId};
pub use model::{
    DetectedSource, DetectionCatalog, PositionErrors, SkyCatalog, SkyPosition, SkySource,
    SourceShape,
};
pub use projector::TruthPoint;
pub use space::{Pixel, Plane};
pub use wcs::{Projection, WorldTransform};

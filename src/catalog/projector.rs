//! Projection of a sky catalog into image pixel space.

use serde::Serialize;

use super::model::{SkyCatalog, SkyPosition};
use super::{Coord, Pixel, SkySourceId};
use crate::error::SkymatchError;

/// A ground-truth source placed on the image.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TruthPoint {
    pub id: SkySourceId,
    pub sky: SkyPosition,
    /// Floating-point pixel position; NaN when the source falls outside the
    /// projection's domain.
    pub position: Coord<Pixel>,
    pub flux: f64,
}

impl TruthPoint {
    /// A truth point that is already in pixel space, with no sky position.
    pub fn from_pixel(id: impl Into<SkySourceId>, x: f64, y: f64, flux: f64) -> Self {
        Self {
            id: id.into(),
            sky: SkyPosition::new(f64::NAN, f64::NAN),
            position: Coord::new(x, y),
            flux,
        }
    }
}

/// Projects every source of `sky` through its attached transform.
///
/// Output order follows catalog order. No rounding or clamping is applied.
pub fn project_sky_catalog(sky: &SkyCatalog) -> Result<Vec<TruthPoint>, SkymatchError> {
    let transform = sky.transform()?;

    Ok(sky
        .sources()
        .iter()
        .map(|source| TruthPoint {
            id: source.id,
            sky: source.position,
            position: transform.world_to_pixel(source.position.ra_deg, source.position.dec_deg),
            flux: source.flux,
        })
        .collect())
}

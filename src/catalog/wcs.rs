//! World-coordinate transform between sky positions and image pixels.
//!
//! Implements the two zenithal projections radio images are written with:
//! slant orthographic (`SIN`, the interferometric default) and gnomonic
//! (`TAN`). Pixel coordinates are zero-based.
//!
//! The transform follows the FITS WCS chain: pixel offset from the reference
//! pixel, through the CD matrix, to projection-plane degrees, to the sphere.
//! Reference: Calabretta & Greisen (2002), FITS WCS Paper II, §5.1.

use serde::{Deserialize, Serialize};

use super::model::SkyPosition;
use super::{Coord, Pixel, Plane};
use crate::error::SkymatchError;

/// Zenithal projection used by a [`WorldTransform`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Projection {
    /// Slant orthographic projection (`SIN`).
    #[default]
    Sin,
    /// Gnomonic projection (`TAN`).
    Tan,
}

/// A configured sky <-> pixel transform.
#[derive(Clone, Debug, PartialEq)]
pub struct WorldTransform {
    projection: Projection,
    reference_sky: SkyPosition,
    reference_pixel: Coord<Pixel>,
    /// Degrees per pixel: `plane = cd * (pixel - reference_pixel)`.
    cd: [[f64; 2]; 2],
    inverse_cd: [[f64; 2]; 2],
}

impl WorldTransform {
    /// Builds the conventional radio-image layout: square pixels of
    /// `pixel_scale_deg`, north up, RA increasing to the left.
    pub fn new(
        projection: Projection,
        reference_sky: SkyPosition,
        reference_pixel: Coord<Pixel>,
        pixel_scale_deg: f64,
    ) -> Result<Self, SkymatchError> {
        if !pixel_scale_deg.is_finite() || pixel_scale_deg <= 0.0 {
            return Err(SkymatchError::Configuration(format!(
                "pixel scale must be positive and finite, got {}",
                pixel_scale_deg
            )));
        }
        Self::with_cd(
            projection,
            reference_sky,
            reference_pixel,
            [[-pixel_scale_deg, 0.0], [0.0, pixel_scale_deg]],
        )
    }

    /// Builds a transform whose reference pixel is the center of a
    /// `width` x `height` image.
    pub fn image_centered(
        projection: Projection,
        phase_center: SkyPosition,
        pixel_scale_deg: f64,
        width: u32,
        height: u32,
    ) -> Result<Self, SkymatchError> {
        let center = Coord::new(width as f64 / 2.0, height as f64 / 2.0);
        Self::new(projection, phase_center, center, pixel_scale_deg)
    }

    /// Builds a transform from an explicit CD matrix (degrees per pixel).
    pub fn with_cd(
        projection: Projection,
        reference_sky: SkyPosition,
        reference_pixel: Coord<Pixel>,
        cd: [[f64; 2]; 2],
    ) -> Result<Self, SkymatchError> {
        if !reference_sky.is_finite() || !reference_pixel.is_finite() {
            return Err(SkymatchError::Configuration(
                "reference sky position and reference pixel must be finite".to_string(),
            ));
        }
        if reference_sky.dec_deg.abs() > 90.0 {
            return Err(SkymatchError::Configuration(format!(
                "reference declination {} is outside [-90, 90]",
                reference_sky.dec_deg
            )));
        }
        let inverse_cd = invert_2x2(&cd).ok_or_else(|| {
            SkymatchError::Configuration(format!("CD matrix {:?} is singular", cd))
        })?;

        Ok(Self {
            projection,
            reference_sky,
            reference_pixel,
            cd,
            inverse_cd,
        })
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    pub fn reference_sky(&self) -> SkyPosition {
        self.reference_sky
    }

    pub fn reference_pixel(&self) -> Coord<Pixel> {
        self.reference_pixel
    }

    pub fn cd(&self) -> [[f64; 2]; 2] {
        self.cd
    }

    /// Geometric-mean pixel scale in degrees.
    pub fn pixel_scale_deg(&self) -> f64 {
        let det = self.cd[0][0] * self.cd[1][1] - self.cd[0][1] * self.cd[1][0];
        det.abs().sqrt()
    }

    /// Projects a sky position to pixel coordinates.
    ///
    /// Returns NaN coordinates when the position lies outside the
    /// projection's valid domain (the far hemisphere for `SIN`, at or beyond
    /// 90 degrees from the reference for `TAN`).
    pub fn world_to_pixel(&self, ra_deg: f64, dec_deg: f64) -> Coord<Pixel> {
        match self.world_to_plane(ra_deg, dec_deg) {
            Some(plane) => self.plane_to_pixel(plane),
            None => Coord::nan(),
        }
    }

    /// Inverse of [`world_to_pixel`](Self::world_to_pixel).
    ///
    /// Returns `None` for pixels that do not map onto the sphere.
    pub fn pixel_to_world(&self, x: f64, y: f64) -> Option<SkyPosition> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        let dx = x - self.reference_pixel.x;
        let dy = y - self.reference_pixel.y;
        let plane: Coord<Plane> = Coord::new(
            self.cd[0][0] * dx + self.cd[0][1] * dy,
            self.cd[1][0] * dx + self.cd[1][1] * dy,
        );
        self.plane_to_world(plane)
    }

    fn plane_to_pixel(&self, plane: Coord<Plane>) -> Coord<Pixel> {
        let inv = &self.inverse_cd;
        Coord::new(
            self.reference_pixel.x + inv[0][0] * plane.x + inv[0][1] * plane.y,
            self.reference_pixel.y + inv[1][0] * plane.x + inv[1][1] * plane.y,
        )
    }

    fn world_to_plane(&self, ra_deg: f64, dec_deg: f64) -> Option<Coord<Plane>> {
        if !ra_deg.is_finite() || !dec_deg.is_finite() || dec_deg.abs() > 90.0 {
            return None;
        }
        let ra = ra_deg.to_radians();
        let dec = dec_deg.to_radians();
        let ra0 = self.reference_sky.ra_deg.to_radians();
        let dec0 = self.reference_sky.dec_deg.to_radians();

        let da = ra - ra0;
        let (sin_dec, cos_dec) = dec.sin_cos();
        let (sin_dec0, cos_dec0) = dec0.sin_cos();
        let cos_da = da.cos();

        // cosine of the angular distance from the reference position
        let cos_c = sin_dec * sin_dec0 + cos_dec * cos_dec0 * cos_da;
        let xi = cos_dec * da.sin();
        let eta = sin_dec * cos_dec0 - cos_dec * sin_dec0 * cos_da;

        let (xi, eta) = match self.projection {
            Projection::Sin => {
                if cos_c < 0.0 {
                    return None;
                }
                (xi, eta)
            }
            Projection::Tan => {
                if cos_c <= 1e-12 {
                    return None;
                }
                (xi / cos_c, eta / cos_c)
            }
        };

        Some(Coord::new(xi.to_degrees(), eta.to_degrees()))
    }

    fn plane_to_world(&self, plane: Coord<Plane>) -> Option<SkyPosition> {
        let xi = plane.x.to_radians();
        let eta = plane.y.to_radians();
        let ra0 = self.reference_sky.ra_deg.to_radians();
        let dec0 = self.reference_sky.dec_deg.to_radians();

        let rho = (xi * xi + eta * eta).sqrt();
        if rho < 1e-15 {
            return Some(self.reference_sky);
        }

        let c = match self.projection {
            Projection::Sin => {
                if rho > 1.0 {
                    return None;
                }
                rho.asin()
            }
            Projection::Tan => rho.atan(),
        };
        let (sin_c, cos_c) = c.sin_cos();
        let (sin_dec0, cos_dec0) = dec0.sin_cos();

        let dec = (cos_c * sin_dec0 + eta * sin_c * cos_dec0 / rho)
            .clamp(-1.0, 1.0)
            .asin();
        let ra = ra0 + (xi * sin_c).atan2(rho * cos_dec0 * cos_c - eta * sin_dec0 * sin_c);

        Some(SkyPosition::new(
            ra.to_degrees().rem_euclid(360.0),
            dec.to_degrees(),
        ))
    }
}

/// Invert a 2x2 matrix. Returns `None` if singular.
fn invert_2x2(m: &[[f64; 2]; 2]) -> Option<[[f64; 2]; 2]> {
    let det = m[0][0] * m[1][1] - m[0][1] * m[1][0];
    if !det.is_finite() || det.abs() < 1e-30 {
        return None;
    }
    let inv_det = 1.0 / det;
    Some([
        [m[1][1] * inv_det, -m[0][1] * inv_det],
        [-m[1][0] * inv_det, m[0][0] * inv_det],
    ])
}

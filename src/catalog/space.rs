//! Coordinate space marker types.
//!
//! These are zero-sized types (ZSTs) used as type parameters to distinguish
//! image pixel positions from tangent-plane offsets at compile time.

use std::fmt;

/// Marker type for zero-based image pixel coordinates.
///
/// `x` runs along image columns and `y` along rows; pixel centers sit on
/// integer values.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pixel {}

/// Marker type for intermediate world coordinates (projection-plane offsets
/// from the reference sky position, in degrees).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Plane {}

impl fmt::Debug for Pixel {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}

impl fmt::Debug for Plane {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}

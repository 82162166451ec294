//! Mathematical utilities and decisions.

use euclid::{Point2D, Vector2D};

mod geometry;
pub use geometry::*;
mod rect;
pub use rect::*;

/// Unit-of-measure type for coordinates in the play area.
///
/// One unit is roughly one pixel at the default zoom level.
#[expect(clippy::exhaustive_enums)]
#[derive(Debug, Eq, PartialEq)]
pub enum Arena {}

/// Coordinates in the play area.
pub type FreeCoordinate = f64;

/// Positions in the play area.
pub type FreePoint = Point2D<FreeCoordinate, Arena>;

/// Vectors in the play area: displacements, and velocities in units per second.
pub type FreeVector = Vector2D<FreeCoordinate, Arena>;

/// Returns `vector` scaled to length 1, or the zero vector if it has no well-defined
/// direction (zero, NaN, or infinite length).
///
/// ```
/// # extern crate skirmish_base as skirmish;
/// use skirmish::math::{normalize_or_zero, FreeVector};
///
/// assert_eq!(normalize_or_zero(FreeVector::new(0.0, -3.0)), FreeVector::new(0.0, -1.0));
/// assert_eq!(normalize_or_zero(FreeVector::zero()), FreeVector::zero());
/// ```
#[inline]
pub fn normalize_or_zero(vector: FreeVector) -> FreeVector {
    let length = vector.length();
    if length > 0.0 && length.is_finite() {
        vector / length
    } else {
        FreeVector::zero()
    }
}

/// Returns the unit vector pointing in the direction `heading`, in radians
/// counterclockwise from +X.
#[inline]
pub fn heading_vector(heading: FreeCoordinate) -> FreeVector {
    let (sin, cos) = heading.sin_cos();
    FreeVector::new(cos, sin)
}

use core::cmp::Ordering;
use core::fmt;

use manyfmt::Fmt;

use crate::math::{FreeCoordinate, FreePoint, FreeVector};
use crate::util::ConciseDebug;

/// Axis-aligned rectangle in the play area.
///
/// Used as the query shape for spatial lookups and as the footprint of moving bodies.
/// Both bounds are inclusive, so a rectangle of zero size still contains its point.
#[derive(Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rect {
    lower_bounds: FreePoint,
    upper_bounds: FreePoint,
}

impl Rect {
    /// The [`Rect`] of zero size at the origin.
    pub const ZERO: Rect = Rect {
        lower_bounds: FreePoint::new(0., 0.),
        upper_bounds: FreePoint::new(0., 0.),
    };

    /// Constructs a [`Rect`] from individual coordinates.
    ///
    /// Panics if the coordinates are misordered or NaN.
    #[inline]
    #[track_caller]
    pub fn new(
        lx: FreeCoordinate,
        hx: FreeCoordinate,
        ly: FreeCoordinate,
        hy: FreeCoordinate,
    ) -> Self {
        Self::from_lower_upper(FreePoint::new(lx, ly), FreePoint::new(hx, hy))
    }

    /// Constructs a [`Rect`] from most-negative and most-positive corner points.
    ///
    /// Panics if the points are not in the proper order or if they are NaN.
    #[inline]
    #[track_caller]
    pub fn from_lower_upper(lower_bounds: FreePoint, upper_bounds: FreePoint) -> Self {
        match Self::checked_from_lower_upper(lower_bounds, upper_bounds) {
            Some(rect) => rect,
            None => panic!(
                "invalid Rect points that are misordered or NaN: \
                lower {lower_bounds:?} upper {upper_bounds:?}"
            ),
        }
    }

    /// Constructs a [`Rect`] from most-negative and most-positive corner points.
    ///
    /// Returns [`None`] if the points are not in the proper order or if they are NaN.
    #[inline]
    pub fn checked_from_lower_upper(lower_bounds: FreePoint, upper_bounds: FreePoint) -> Option<Self> {
        if lower_bounds.x <= upper_bounds.x && lower_bounds.y <= upper_bounds.y {
            Some(Self {
                lower_bounds,
                upper_bounds,
            })
        } else {
            None
        }
    }

    /// Constructs the smallest [`Rect`] containing both points, which may be any two
    /// opposite corners.
    ///
    /// NaN coordinates are treated as absent, so the result may be smaller than expected
    /// but is always valid.
    ///
    /// ```
    /// # extern crate skirmish_base as skirmish;
    /// use skirmish::math::{FreePoint, Rect};
    ///
    /// assert_eq!(
    ///     Rect::spanning(FreePoint::new(3.0, -1.0), FreePoint::new(1.0, 2.0)),
    ///     Rect::new(1.0, 3.0, -1.0, 2.0),
    /// );
    /// ```
    #[inline]
    pub fn spanning(a: FreePoint, b: FreePoint) -> Self {
        Self {
            lower_bounds: a.min(b),
            upper_bounds: a.max(b),
        }
    }

    /// The [`Rect`] of zero size located at `point`.
    #[inline]
    pub fn around_point(point: FreePoint) -> Self {
        Self::spanning(point, point)
    }

    /// The smallest [`Rect`] containing all of `points`, or [`None`] if there are none.
    #[inline]
    pub fn bounding(points: impl IntoIterator<Item = FreePoint>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = Self::around_point(points.next()?);
        Some(points.fold(first, |rect, point| rect.union(Self::around_point(point))))
    }

    /// The most negative corner of the rectangle.
    #[inline]
    pub const fn lower_bounds(&self) -> FreePoint {
        self.lower_bounds
    }

    /// The most positive corner of the rectangle.
    #[inline]
    pub const fn upper_bounds(&self) -> FreePoint {
        self.upper_bounds
    }

    /// Size of the rectangle in each axis; equivalent to
    /// `self.upper_bounds() - self.lower_bounds()`.
    #[inline]
    pub fn size(&self) -> FreeVector {
        self.upper_bounds - self.lower_bounds
    }

    /// The center of the rectangle.
    #[inline]
    pub fn center(&self) -> FreePoint {
        self.lower_bounds.lerp(self.upper_bounds, 0.5)
    }

    /// Returns whether this rectangle, including the boundary, contains the point.
    #[inline]
    pub fn contains(&self, point: FreePoint) -> bool {
        self.lower_bounds.x <= point.x
            && point.x <= self.upper_bounds.x
            && self.lower_bounds.y <= point.y
            && point.y <= self.upper_bounds.y
    }

    /// Returns whether this rectangle, including the boundary, intersects the other
    /// rectangle.
    ///
    /// ```
    /// # extern crate skirmish_base as skirmish;
    /// use skirmish::math::Rect;
    ///
    /// let a = Rect::new(0.0, 1.0, 0.0, 1.0);
    /// assert!(a.intersects(Rect::new(1.0, 2.0, 0.5, 0.6)));
    /// assert!(!a.intersects(Rect::new(1.5, 2.0, 0.0, 1.0)));
    /// ```
    #[inline]
    pub fn intersects(&self, other: Rect) -> bool {
        let axis_overlaps = |lower: FreeCoordinate, upper: FreeCoordinate| {
            matches!(
                lower.partial_cmp(&upper),
                Some(Ordering::Less | Ordering::Equal)
            )
        };
        axis_overlaps(
            self.lower_bounds.x.max(other.lower_bounds.x),
            self.upper_bounds.x.min(other.upper_bounds.x),
        ) && axis_overlaps(
            self.lower_bounds.y.max(other.lower_bounds.y),
            self.upper_bounds.y.min(other.upper_bounds.y),
        )
    }

    /// Returns the smallest rectangle containing both inputs.
    #[inline]
    #[must_use]
    pub fn union(self, other: Rect) -> Self {
        Self {
            lower_bounds: self.lower_bounds.min(other.lower_bounds),
            upper_bounds: self.upper_bounds.max(other.upper_bounds),
        }
    }

    /// Enlarges the rectangle by the given distance in every direction.
    ///
    /// If `distance` is negative, shrinks it instead, but a rectangle will never be
    /// shrunk past its center point. NaN distances also collapse to the center.
    #[inline]
    #[must_use]
    pub fn expand(self, distance: FreeCoordinate) -> Self {
        let distance_vec = FreeVector::splat(distance);
        match Self::checked_from_lower_upper(
            self.lower_bounds - distance_vec,
            self.upper_bounds + distance_vec,
        ) {
            Some(rect) => rect,
            None => Self::around_point(self.center()),
        }
    }

    /// Translates the rectangle by `offset`.
    #[inline]
    #[must_use]
    pub fn translate(self, offset: FreeVector) -> Self {
        Self {
            lower_bounds: self.lower_bounds + offset,
            upper_bounds: self.upper_bounds + offset,
        }
    }
}

impl fmt::Debug for Rect {
    #[allow(clippy::missing_inline_in_public_items)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Rect {
            lower_bounds: l,
            upper_bounds: u,
        } = *self;
        f.debug_tuple("Rect")
            .field(&(l.x..=u.x))
            .field(&(l.y..=u.y))
            .finish()
    }
}

impl Fmt<ConciseDebug> for Rect {
    #[allow(clippy::missing_inline_in_public_items)]
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>, _: &ConciseDebug) -> fmt::Result {
        let Rect {
            lower_bounds: l,
            upper_bounds: u,
        } = *self;
        write!(fmt, "[{:+.1}..{:+.1}, {:+.1}..{:+.1}]", l.x, u.x, l.y, u.y)
    }
}

/// [`Rect`] rejects NaN values, so it can implement [`Eq`]
/// even though it contains floats.
impl Eq for Rect {}

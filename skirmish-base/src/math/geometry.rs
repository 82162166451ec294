//! Closed-form intersection routines for circles and polygons.

use crate::math::{FreeCoordinate, FreePoint, FreeVector};

/// Finds the smallest root of `a·x² + b·x + c = 0` that lies in `0 ..= upper_bound`.
///
/// Returns [`None`] if there are no real roots or none in the interval. This is the
/// "time of impact" primitive used throughout collision detection: `x` is a time, and
/// the quadratic is the squared distance between two moving things minus the squared
/// contact distance.
///
/// The roots are computed in the form that is numerically stable when `a` is close
/// to zero (Numerical Recipes §5.6). Degenerate inputs such as `a = b = 0` produce
/// NaN or infinite candidates, which fail the interval check rather than being reported.
///
/// ```
/// # extern crate skirmish_base as skirmish;
/// use skirmish::math::find_lowest_root_in_interval;
///
/// // (x - 1)(x - 3) = x² - 4x + 3
/// assert_eq!(find_lowest_root_in_interval(1.0, -4.0, 3.0, 10.0), Some(1.0));
/// assert_eq!(find_lowest_root_in_interval(1.0, -4.0, 3.0, 2.0), Some(1.0));
/// assert_eq!(find_lowest_root_in_interval(1.0, -4.0, 3.0, 0.5), None);
/// // No real roots.
/// assert_eq!(find_lowest_root_in_interval(1.0, 0.0, 1.0, 10.0), None);
/// ```
#[inline]
pub fn find_lowest_root_in_interval(
    a: FreeCoordinate,
    b: FreeCoordinate,
    c: FreeCoordinate,
    upper_bound: FreeCoordinate,
) -> Option<FreeCoordinate> {
    let determinant = b * b - 4.0 * a * c;
    if determinant < 0.0 {
        return None;
    }

    let q = -0.5 * (b + b.signum() * determinant.sqrt());
    let mut x1 = q / a;
    let mut x2 = c / q;
    if x2 < x1 {
        core::mem::swap(&mut x1, &mut x2);
    }

    let admissible = |x: FreeCoordinate| (0.0..=upper_bound).contains(&x);
    if admissible(x1) {
        Some(x1)
    } else if admissible(x2) {
        Some(x2)
    } else {
        None
    }
}

/// Returns whether `point` lies inside the polygon whose vertices are `polygon`,
/// in order, with an implicit closing edge.
///
/// Uses the even-odd crossing rule, so self-intersecting polygons have holes where
/// they overlap themselves. Polygons with fewer than three vertices contain nothing.
///
/// ```
/// # extern crate skirmish_base as skirmish;
/// use skirmish::math::{polygon_contains_point, FreePoint};
///
/// let square = [
///     FreePoint::new(0.0, 0.0),
///     FreePoint::new(10.0, 0.0),
///     FreePoint::new(10.0, 10.0),
///     FreePoint::new(0.0, 10.0),
/// ];
/// assert!(polygon_contains_point(&square, FreePoint::new(5.0, 5.0)));
/// assert!(!polygon_contains_point(&square, FreePoint::new(15.0, 5.0)));
/// ```
#[inline]
pub fn polygon_contains_point(polygon: &[FreePoint], point: FreePoint) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut previous = polygon[polygon.len() - 1];
    for &vertex in polygon {
        if (vertex.y > point.y) != (previous.y > point.y) {
            let crossing_x =
                vertex.x + (point.y - vertex.y) * (previous.x - vertex.x) / (previous.y - vertex.y);
            if point.x < crossing_x {
                inside = !inside;
            }
        }
        previous = vertex;
    }
    inside
}

/// Result of [`polygon_swept_circle_intersect()`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub struct SweptContact {
    /// Fraction of the sweep, in `0.0 ..= 1.0`, at which the circle first touches.
    pub fraction: FreeCoordinate,
    /// The point on the polygon's boundary that the circle touches.
    ///
    /// If the circle's center started inside the polygon, this is instead the
    /// circle's starting center, and `fraction` is zero.
    pub point: FreePoint,
}

/// Sweeps a circle of `radius` from `center` to `center + delta` and finds the first
/// time it touches the polygon's boundary.
///
/// `polygon` is treated as closed if it has three or more vertices; a two-vertex
/// polygon is a single line segment. A circle that is already touching an edge only
/// counts as colliding with it if it is moving towards that edge, so that something
/// resting against a wall can leave it.
#[inline]
pub fn polygon_swept_circle_intersect(
    polygon: &[FreePoint],
    center: FreePoint,
    delta: FreeVector,
    radius: FreeCoordinate,
) -> Option<SweptContact> {
    if polygon.len() >= 3 && polygon_contains_point(polygon, center) {
        return Some(SweptContact {
            fraction: 0.0,
            point: center,
        });
    }

    let edge_count = match polygon.len() {
        0 | 1 => return None,
        2 => 1,
        n => n,
    };

    (0..edge_count)
        .filter_map(|i| {
            let start = polygon[i];
            let end = polygon.get(i + 1).copied().unwrap_or(polygon[0]);
            segment_swept_circle_intersect(start, end, center, delta, radius)
        })
        .fold(None, |best: Option<SweptContact>, candidate| match best {
            Some(best) if best.fraction <= candidate.fraction => Some(best),
            _ => Some(candidate),
        })
}

/// Swept circle against one line segment, including its endpoints.
fn segment_swept_circle_intersect(
    start: FreePoint,
    end: FreePoint,
    center: FreePoint,
    delta: FreeVector,
    radius: FreeCoordinate,
) -> Option<SweptContact> {
    let mut best: Option<SweptContact> = None;
    let mut consider = |fraction: FreeCoordinate, point: FreePoint| {
        if best.is_none_or(|b| fraction < b.fraction) {
            best = Some(SweptContact { fraction, point });
        }
    };

    // Flat face of the segment.
    let edge = end - start;
    let length = edge.length();
    if length > 0.0 {
        let tangent = edge / length;
        let mut normal = FreeVector::new(-tangent.y, tangent.x);
        let mut distance = (center - start).dot(normal);
        if distance < 0.0 {
            normal = -normal;
            distance = -distance;
        }
        let approach_speed = -delta.dot(normal);
        if approach_speed > 0.0 {
            let fraction = if distance <= radius {
                0.0
            } else {
                (distance - radius) / approach_speed
            };
            if fraction <= 1.0 {
                let center_at_contact = center + delta * fraction;
                let along = (center_at_contact - start).dot(tangent);
                if (0.0..=length).contains(&along) {
                    consider(fraction, start + tangent * along);
                }
            }
        }
    }

    // Rounded ends.
    for vertex in [start, end] {
        let offset = center - vertex;
        if delta.dot(offset) >= 0.0 {
            // Not approaching this vertex.
            continue;
        }
        let c = offset.square_length() - radius * radius;
        let fraction = if c <= 0.0 {
            Some(0.0)
        } else {
            find_lowest_root_in_interval(delta.square_length(), 2.0 * delta.dot(offset), c, 1.0)
        };
        if let Some(fraction) = fraction {
            consider(fraction, vertex);
        }
    }

    best
}

//! Velocity changes resulting from contact.
//!
//! These are pure functions of the participants' state; [`move_body()`](super::move_body)
//! decides which one applies and writes the results back.

use crate::math::{FreeCoordinate, FreePoint, FreeVector, find_lowest_root_in_interval, normalize_or_zero};

/// Multiple of the normal component of velocity that is removed when bouncing off a
/// barrier. `1.0` would stop dead against the wall; `2.0` would be a perfect reflection.
pub const COLLISION_ELASTICITY: FreeCoordinate = 1.7;

/// Coefficient of restitution in collisions between bodies.
pub const RESTITUTION: FreeCoordinate = 0.9;

/// Upper bound on the result of [`min_separation_time()`], in seconds.
pub const MAX_SEPARATION_TIME: FreeCoordinate = 100_000.0;

/// Returns the velocity of a body at `position`, moving at `velocity`, after it bounces
/// off a barrier it touched at `contact`.
///
/// ```
/// use skirmish::math::{FreePoint, FreeVector};
/// use skirmish::physics::bounce_velocity;
///
/// // Hitting a wall to the right, head on.
/// let v = bounce_velocity(
///     FreePoint::new(0.0, 0.0),
///     FreePoint::new(10.0, 0.0),
///     FreeVector::new(100.0, 0.0),
/// );
/// assert!((v.x - -70.0).abs() < 1e-9);
/// ```
pub fn bounce_velocity(position: FreePoint, contact: FreePoint, velocity: FreeVector) -> FreeVector {
    let normal = normalize_or_zero(position - contact);
    velocity - normal * (COLLISION_ELASTICITY * normal.dot(velocity))
}

/// Computes the velocities of two bodies after they collide, given the direction
/// `axis` from the first body's center to the second's.
///
/// Only the components of velocity along `axis` change; momentum along it is
/// conserved, and the relative speed along it is scaled by [`RESTITUTION`].
pub fn exchange_momentum(
    velocity_1: FreeVector,
    mass_1: FreeCoordinate,
    velocity_2: FreeVector,
    mass_2: FreeCoordinate,
    axis: FreeVector,
) -> (FreeVector, FreeVector) {
    let axis = normalize_or_zero(axis);
    let v1i = velocity_1.dot(axis);
    let v2i = velocity_2.dot(axis);
    let momentum = mass_1 * v1i + mass_2 * v2i;
    let total_mass = mass_1 + mass_2;

    let v1f = (RESTITUTION * mass_2 * (v2i - v1i) + momentum) / total_mass;
    let v2f = (RESTITUTION * mass_1 * (v1i - v2i) + momentum) / total_mass;

    (
        velocity_1 + axis * (v1f - v1i),
        velocity_2 + axis * (v2f - v2i),
    )
}

/// Returns how long a body at `other_position` moving at `other_velocity` needs to get
/// at least `radius_sum` away from `intended`, or [`None`] if it never does within
/// [`MAX_SEPARATION_TIME`].
///
/// This is how far a displaced body is pushed along its own path to make room for a
/// body that intends to end its move at `intended`.
pub fn min_separation_time(
    other_position: FreePoint,
    other_velocity: FreeVector,
    intended: FreePoint,
    radius_sum: FreeCoordinate,
) -> Option<FreeCoordinate> {
    let offset = other_position - intended;
    find_lowest_root_in_interval(
        other_velocity.dot(other_velocity),
        2.0 * other_velocity.dot(offset),
        offset.dot(offset) - radius_sum * radius_sum,
        MAX_SEPARATION_TIME,
    )
}

//! Swept collision detection: finding the first thing a moving body would hit.

use std::fmt;

use manyfmt::Refmt as _;

use crate::math::{
    FreeCoordinate, FreePoint, FreeVector, Rect, find_lowest_root_in_interval, normalize_or_zero,
    polygon_swept_circle_intersect,
};
use crate::physics::{DynamicBody, StateRole};
use crate::space::{BodyId, ContactRules, Obstacle, ObstacleId, Shape};
use crate::util::ConciseDebug;

/// Identifies anything a body can collide with.
#[expect(clippy::exhaustive_enums)]
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ColliderId {
    /// Static geometry.
    ///
    /// Listed first so that sorting candidates puts obstacles before bodies.
    Obstacle(ObstacleId),
    /// Another moving body.
    Body(BodyId),
}

impl ColliderId {
    /// Returns the body id, if this refers to a body.
    pub fn body(self) -> Option<BodyId> {
        match self {
            ColliderId::Body(id) => Some(id),
            ColliderId::Obstacle(_) => None,
        }
    }
}

impl From<BodyId> for ColliderId {
    fn from(id: BodyId) -> Self {
        ColliderId::Body(id)
    }
}

impl From<ObstacleId> for ColliderId {
    fn from(id: ObstacleId) -> Self {
        ColliderId::Obstacle(id)
    }
}

/// Borrowed view of one collision candidate, as returned by
/// [`SpatialQuery::collider()`].
#[derive(Clone, Copy, Debug)]
#[expect(clippy::exhaustive_enums)]
pub enum Collider<'a> {
    #[allow(missing_docs)]
    Obstacle(ObstacleId, &'a Obstacle),
    #[allow(missing_docs)]
    Body(BodyId, &'a DynamicBody),
}

impl<'a> Collider<'a> {
    /// Id of this collider.
    pub fn id(&self) -> ColliderId {
        match *self {
            Collider::Obstacle(id, _) => ColliderId::Obstacle(id),
            Collider::Body(id, _) => ColliderId::Body(id),
        }
    }

    /// Vertices, if this collider is polygonal.
    pub fn polygon(&self) -> Option<&'a [FreePoint]> {
        match *self {
            Collider::Obstacle(_, obstacle) => match obstacle.shape() {
                Shape::Polygon(vertices) => Some(vertices),
                Shape::Circle { .. } => None,
            },
            Collider::Body(..) => None,
        }
    }

    /// Center and radius, if this collider is circular. Bodies are seen at the position
    /// of the given role.
    pub fn circle(&self, role: StateRole) -> Option<(FreePoint, FreeCoordinate)> {
        match *self {
            Collider::Obstacle(_, obstacle) => match *obstacle.shape() {
                Shape::Circle { center, radius } => Some((center, radius)),
                Shape::Polygon(_) => None,
            },
            Collider::Body(_, body) => Some(body.collision_circle(role)),
        }
    }

    /// Whether this collider is something bodies bounce off. Bodies are always solid.
    pub fn is_solid(&self) -> bool {
        match *self {
            Collider::Obstacle(_, obstacle) => obstacle.solid,
            Collider::Body(..) => true,
        }
    }
}

/// Spatial index of everything a body might collide with.
///
/// [`Space`](crate::space::Space) implements this by linear scan; a game with many
/// obstacles may supply something smarter.
pub trait SpatialQuery {
    /// Appends to `out` the id of every collider whose bounds intersect `region`.
    ///
    /// Bodies are matched by their [`DynamicBody::extent()`]. The order of results does
    /// not matter.
    fn query_region(&self, region: Rect, out: &mut Vec<ColliderId>);

    /// Looks up a collider.
    fn collider(&self, id: ColliderId) -> Option<Collider<'_>>;

    /// Whether the collider currently takes part in collision detection.
    fn collision_enabled(&self, id: ColliderId) -> bool;
}

/// The first contact along a body's path, as found by [`find_first_collision()`].
#[derive(Clone, Copy, PartialEq)]
#[non_exhaustive]
pub struct Collision {
    /// What was hit.
    pub target: ColliderId,
    /// Seconds from the start of the move until contact.
    pub time: FreeCoordinate,
    /// `time` as a fraction of the travel time that was searched.
    pub fraction: FreeCoordinate,
    /// The point of contact, on the surface of the thing hit.
    pub point: FreePoint,
}

impl fmt::Debug for Collision {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            target,
            time,
            fraction,
            point,
        } = self;
        fmt.debug_struct("Collision")
            .field("target", target)
            .field("time", time)
            .field("fraction", fraction)
            .field("point", &point.refmt(&ConciseDebug))
            .finish()
    }
}

/// Finds the earliest contact of body `mover`, in state `role`, traveling with its
/// current velocity for `travel_time` seconds.
///
/// Obstacles are considered before bodies, and a later candidate only replaces the
/// best found so far if it is strictly earlier, so obstacles win ties. Candidates that
/// either side's [`ContactRules::collide()`] rejects are ignored.
pub fn find_first_collision<S: SpatialQuery + ?Sized>(
    world: &S,
    rules: &dyn ContactRules,
    mover: BodyId,
    role: StateRole,
    travel_time: FreeCoordinate,
) -> Option<Collision> {
    let Some(Collider::Body(_, body)) = world.collider(ColliderId::Body(mover)) else {
        log::trace!("find_first_collision: no body {mover:?}");
        return None;
    };
    let start = body.position(role);
    let velocity = body.velocity(role);
    let radius = body.radius();
    let mover_collider = Collider::Body(mover, body);

    let mut candidates = Vec::new();
    world.query_region(
        Rect::spanning(start, start + velocity * travel_time).expand(radius),
        &mut candidates,
    );
    // Stable sort by variant only.
    candidates.sort_by_key(|id| matches!(id, ColliderId::Body(_)));

    let mut best: Option<Collision> = None;
    let mut time_limit = travel_time;
    for candidate_id in candidates {
        if candidate_id == ColliderId::Body(mover) || !world.collision_enabled(candidate_id) {
            continue;
        }
        let Some(candidate) = world.collider(candidate_id) else {
            continue;
        };

        let contact = if let Some(polygon) = candidate.polygon() {
            polygon_swept_circle_intersect(polygon, start, velocity * time_limit, radius)
                .filter(|contact| !(contact.point == start && candidate.is_solid()))
                .map(|contact| (contact.fraction * time_limit, contact.point))
        } else if let Some((center, other_radius)) = candidate.circle(role) {
            circle_time_of_impact(start, velocity, radius, center, other_radius, time_limit)
        } else {
            None
        };
        let Some((time, point)) = contact else {
            continue;
        };

        if !(rules.collide(mover_collider, candidate) && rules.collide(candidate, mover_collider))
        {
            continue;
        }

        if best.is_none_or(|b| time < b.time) {
            best = Some(Collision {
                target: candidate_id,
                time,
                fraction: if travel_time > 0.0 {
                    time / travel_time
                } else {
                    0.0
                },
                point,
            });
            time_limit = time;
            if time <= 0.0 {
                break;
            }
        }
    }
    best
}

/// Time of first contact between a circle moving with `velocity` and a stationary
/// circle, within `0 ..= time_limit`, and the contact point on the stationary circle's
/// surface.
///
/// Only reports contact if the circles are closing. Circles that already overlap make
/// contact at time zero, at the point of the moving circle nearest the other.
pub fn circle_time_of_impact(
    start: FreePoint,
    velocity: FreeVector,
    radius: FreeCoordinate,
    center: FreePoint,
    other_radius: FreeCoordinate,
    time_limit: FreeCoordinate,
) -> Option<(FreeCoordinate, FreePoint)> {
    let offset = start - center;
    let closing = velocity.dot(offset);
    if closing >= 0.0 {
        return None;
    }
    let contact_distance = radius + other_radius;
    let c = offset.square_length() - contact_distance * contact_distance;
    if c <= 0.0 {
        return Some((0.0, start - normalize_or_zero(offset) * radius));
    }
    let time =
        find_lowest_root_in_interval(velocity.square_length(), 2.0 * closing, c, time_limit)?;
    let position_at_contact = start + velocity * time;
    Some((
        time,
        center + normalize_or_zero(position_at_contact - center) * other_radius,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn circle_head_on() {
        let (time, point) = circle_time_of_impact(
            FreePoint::new(0.0, 0.0),
            FreeVector::new(100.0, 0.0),
            10.0,
            FreePoint::new(50.0, 0.0),
            10.0,
            1.0,
        )
        .unwrap();
        assert_eq!(time, 0.3);
        assert_eq!(point, FreePoint::new(40.0, 0.0));
    }

    #[test]
    fn circle_receding_is_ignored() {
        assert_eq!(
            circle_time_of_impact(
                FreePoint::new(0.0, 0.0),
                FreeVector::new(-100.0, 0.0),
                10.0,
                FreePoint::new(15.0, 0.0),
                10.0,
                1.0,
            ),
            None
        );
    }

    #[test]
    fn circle_overlapping_is_immediate() {
        let (time, point) = circle_time_of_impact(
            FreePoint::new(0.0, 0.0),
            FreeVector::new(1.0, 0.0),
            10.0,
            FreePoint::new(15.0, 0.0),
            10.0,
            1.0,
        )
        .unwrap();
        assert_eq!(time, 0.0);
        assert_eq!(point, FreePoint::new(10.0, 0.0));
    }

    #[test]
    fn circle_out_of_reach() {
        assert_eq!(
            circle_time_of_impact(
                FreePoint::new(0.0, 0.0),
                FreeVector::new(100.0, 0.0),
                10.0,
                FreePoint::new(500.0, 0.0),
                10.0,
                1.0,
            ),
            None
        );
    }

    #[test]
    fn collider_ids_sort_obstacles_first() {
        let mut ids = vec![
            ColliderId::Body(BodyId::for_testing(0)),
            ColliderId::Obstacle(ObstacleId::for_testing(5)),
        ];
        ids.sort();
        assert!(matches!(ids[0], ColliderId::Obstacle(_)));
    }
}

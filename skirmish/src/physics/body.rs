use core::fmt;

use manyfmt::Refmt as _;

use crate::math::{FreeCoordinate, FreePoint, FreeVector, Rect, normalize_or_zero};
use crate::net::{SyncState, UpdateMask};
use crate::physics::{DerivedRole, EXTENT_PADDING, HIT_BUDGET, MotionState, StateRole};
use crate::util::ConciseDebug;
use crate::zone::ZoneMembership;

/// Fraction of an impulse's velocity, per unit of mass, that [`DynamicBody::apply_impulse()`]
/// transfers to the body.
pub const IMPULSE_TRANSFER: FreeCoordinate = 0.3;

/// A moving circular object: a craft, a free-floating item, or a projectile.
///
/// A body's actual position is stored directly in the body, and is what the body's
/// [`extent()`](Self::extent) and collision circle are computed from; everything else
/// about its motion is in its [`MotionState`].
#[derive(Clone, PartialEq)]
pub struct DynamicBody {
    /// Actual position.
    position: FreePoint,
    motion: MotionState,

    mass: FreeCoordinate,
    radius: FreeCoordinate,

    /// Whether the render state is being moved toward the actual state.
    pub(crate) interpolating: bool,
    /// Remaining displacements this body may cause during the current tick.
    pub(crate) hit_budget: u8,
    /// Whether collision detection currently considers this body at all.
    /// Cleared only transiently, while a search has set it aside.
    pub(crate) collision_enabled: bool,

    /// Whether other bodies, by default, collide with this body.
    /// See [`DefaultContactRules`](crate::space::DefaultContactRules).
    pub collideable: bool,
    /// Identifier announced to peers in the body's first network update.
    pub item_id: u16,

    pub(crate) sync: SyncState,
    pub(crate) zones: ZoneMembership,
    // When adding a field, don't forget to expand the Debug impl.
}

impl fmt::Debug for DynamicBody {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("DynamicBody")
            .field("position", &self.position.refmt(&ConciseDebug))
            .field("motion", &self.motion)
            .field("mass", &self.mass)
            .field("radius", &self.radius)
            .field("interpolating", &self.interpolating)
            .field("hit_budget", &self.hit_budget)
            .field("collision_enabled", &self.collision_enabled)
            .field("collideable", &self.collideable)
            .field("item_id", &self.item_id)
            .field("sync", &self.sync)
            .field("zones", &self.zones)
            .finish()
    }
}

impl DynamicBody {
    /// Constructs a stationary [`DynamicBody`] with every role at `position`.
    ///
    /// Panics if `radius` is negative or `mass` is not positive, or either is not finite.
    #[track_caller]
    pub fn new(position: FreePoint, radius: FreeCoordinate, mass: FreeCoordinate) -> Self {
        assert!(
            radius.is_finite() && radius >= 0.0,
            "body radius must be finite and non-negative, not {radius}"
        );
        assert!(
            mass.is_finite() && mass > 0.0,
            "body mass must be finite and positive, not {mass}"
        );
        Self {
            position,
            motion: MotionState::new(position, FreeVector::zero(), 0.0),
            mass,
            radius,
            interpolating: false,
            hit_budget: HIT_BUDGET,
            collision_enabled: true,
            collideable: true,
            item_id: 0,
            sync: SyncState::new(),
            zones: ZoneMembership::default(),
        }
    }

    /// Sets the velocity of every role, returning the modified body.
    #[must_use]
    pub fn with_velocity(mut self, velocity: FreeVector) -> Self {
        for role in StateRole::ALL {
            self.motion.set_velocity(role, velocity);
        }
        self
    }

    /// Position as seen by the given role.
    pub fn position(&self, role: StateRole) -> FreePoint {
        match role.derived() {
            None => self.position,
            Some(derived) => self.motion.position(derived),
        }
    }

    /// Velocity as seen by the given role, in units per second.
    pub fn velocity(&self, role: StateRole) -> FreeVector {
        self.motion.velocity(role)
    }

    /// Heading as seen by the given role, in radians counterclockwise from +X.
    pub fn heading(&self, role: StateRole) -> FreeCoordinate {
        self.motion.heading(role)
    }

    /// Sets one role's position without marking the body as needing a network update.
    pub(crate) fn set_position(&mut self, role: StateRole, position: FreePoint) {
        match role.derived() {
            None => self.position = position,
            Some(derived) => self.motion.set_position(derived, position),
        }
    }

    /// Sets one role's velocity without marking the body as needing a network update.
    pub(crate) fn set_velocity(&mut self, role: StateRole, velocity: FreeVector) {
        self.motion.set_velocity(role, velocity);
    }

    /// Sets one role's heading.
    pub fn set_heading(&mut self, role: StateRole, heading: FreeCoordinate) {
        self.motion.set_heading(role, heading);
    }

    /// Moves the body's authoritative position, and schedules a network update if it
    /// changed.
    pub fn set_actual_position(&mut self, position: FreePoint) {
        if position != self.position {
            self.position = position;
            self.sync.mark(UpdateMask::POSITION);
        }
    }

    /// Changes the body's authoritative velocity and schedules a network update.
    pub fn set_actual_velocity(&mut self, velocity: FreeVector) {
        self.motion.set_velocity(StateRole::Actual, velocity);
        self.sync.mark(UpdateMask::POSITION);
    }

    /// Sets position, velocity, and heading of every role at once, as when the body is
    /// placed or respawned.
    pub fn set_pos_vel_heading(
        &mut self,
        position: FreePoint,
        velocity: FreeVector,
        heading: FreeCoordinate,
    ) {
        self.position = position;
        self.motion = MotionState::new(position, velocity, heading);
    }

    /// Copies position, velocity, and heading from one role to another.
    pub fn copy_state(&mut self, from: StateRole, to: StateRole) {
        if from == to {
            return;
        }
        self.set_position(to, self.position(from));
        self.motion.set_velocity(to, self.motion.velocity(from));
        self.motion.set_heading(to, self.motion.heading(from));
    }

    /// Mass, which determines how velocity is shared in collisions between bodies.
    pub fn mass(&self) -> FreeCoordinate {
        self.mass
    }

    /// Radius of the body's collision circle.
    pub fn radius(&self) -> FreeCoordinate {
        self.radius
    }

    /// Center and radius of the body's collision circle for the given role.
    pub fn collision_circle(&self, role: StateRole) -> (FreePoint, FreeCoordinate) {
        (self.position(role), self.radius)
    }

    /// Whether the render state is currently gliding toward the actual state.
    pub fn is_interpolating(&self) -> bool {
        self.interpolating
    }

    /// Displacements this body may still cause during the current tick.
    pub fn hit_budget(&self) -> u8 {
        self.hit_budget
    }

    /// Network synchronization bookkeeping.
    pub fn sync(&self) -> &SyncState {
        &self.sync
    }

    /// Zones this body was found in on the most recent tick.
    pub fn zones(&self) -> &ZoneMembership {
        &self.zones
    }

    /// The region that any view of this body may occupy: the span from its actual to its
    /// render position, expanded by its radius plus [`EXTENT_PADDING`].
    ///
    /// Spatial queries match a body by this rectangle, so that searching for either
    /// role's position finds it.
    pub fn extent(&self) -> Rect {
        Rect::spanning(
            self.position,
            self.motion.position(DerivedRole::Render),
        )
        .expand(self.radius + EXTENT_PADDING)
    }

    /// Pushes the body away from `source` (such as the point of an explosion) with an
    /// impulse whose velocity is `impulse`.
    ///
    /// Only the part of `impulse` along the line from `source` to the body's center has
    /// any effect, and heavier bodies are pushed less.
    pub fn apply_impulse(&mut self, source: FreePoint, impulse: FreeVector) {
        let direction = normalize_or_zero(self.position - source);
        let delta_v = direction * (direction.dot(impulse) * IMPULSE_TRANSFER / self.mass);
        let velocity = self.velocity(StateRole::Actual) + delta_v;
        self.set_actual_velocity(velocity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn new_body_roles_agree() {
        let body = DynamicBody::new(FreePoint::new(5.0, -5.0), 10.0, 1.0)
            .with_velocity(FreeVector::new(1.0, 0.0));
        for role in StateRole::ALL {
            assert_eq!(body.position(role), FreePoint::new(5.0, -5.0));
            assert_eq!(body.velocity(role), FreeVector::new(1.0, 0.0));
        }
        assert_eq!(body.hit_budget(), HIT_BUDGET);
    }

    #[test]
    #[should_panic = "body mass must be finite and positive, not 0"]
    fn zero_mass() {
        let _ = DynamicBody::new(FreePoint::origin(), 1.0, 0.0);
    }

    #[test]
    fn actual_position_is_separate_from_render() {
        let mut body = DynamicBody::new(FreePoint::origin(), 10.0, 1.0);
        body.set_position(StateRole::Actual, FreePoint::new(100.0, 0.0));
        assert_eq!(body.position(StateRole::Actual), FreePoint::new(100.0, 0.0));
        assert_eq!(body.position(StateRole::Render), FreePoint::origin());

        body.copy_state(StateRole::Actual, StateRole::Render);
        assert_eq!(body.position(StateRole::Render), FreePoint::new(100.0, 0.0));
    }

    #[test]
    fn extent_covers_both_roles() {
        let mut body = DynamicBody::new(FreePoint::origin(), 5.0, 1.0);
        body.set_position(StateRole::Actual, FreePoint::new(100.0, 20.0));
        assert_eq!(body.extent(), Rect::new(-15.0, 115.0, -15.0, 35.0));
    }

    #[test]
    fn set_actual_position_marks_only_on_change() {
        let mut body = DynamicBody::new(FreePoint::origin(), 5.0, 1.0);
        body.sync.take_pending();

        body.set_actual_position(FreePoint::origin());
        assert_eq!(body.sync().pending(), UpdateMask::empty());

        body.set_actual_position(FreePoint::new(1.0, 0.0));
        assert_eq!(body.sync().pending(), UpdateMask::POSITION);
    }

    #[test]
    fn impulse_pushes_away_from_source() {
        let mut body = DynamicBody::new(FreePoint::new(10.0, 0.0), 5.0, 2.0);
        // Only the component along the source-to-body line counts.
        body.apply_impulse(FreePoint::origin(), FreeVector::new(100.0, 50.0));
        assert_eq!(body.velocity(StateRole::Actual), FreeVector::new(15.0, 0.0));
        assert!(body.sync().pending().contains(UpdateMask::POSITION));
    }
}

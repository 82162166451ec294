use core::fmt;

use manyfmt::Refmt as _;

use crate::math::{FreeCoordinate, FreePoint, FreeVector};
use crate::util::ConciseDebug;

/// Which of a body's three kinematic views an operation reads or writes.
#[expect(clippy::exhaustive_enums)]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StateRole {
    /// Authoritative state, advanced by the simulation.
    Actual,
    /// State used for display. On a peer this lags or leads [`StateRole::Actual`]
    /// while interpolating.
    Render,
    /// State as of the most recent network update received.
    LastSynced,
}

impl StateRole {
    /// All roles, in index order.
    pub const ALL: [Self; 3] = [Self::Actual, Self::Render, Self::LastSynced];

    const fn index(self) -> usize {
        match self {
            Self::Actual => 0,
            Self::Render => 1,
            Self::LastSynced => 2,
        }
    }

    /// Returns the [`DerivedRole`] for this role, or [`None`] for [`StateRole::Actual`],
    /// whose position is not stored in a [`MotionState`].
    pub const fn derived(self) -> Option<DerivedRole> {
        match self {
            Self::Actual => None,
            Self::Render => Some(DerivedRole::Render),
            Self::LastSynced => Some(DerivedRole::LastSynced),
        }
    }
}

/// The roles whose position is stored in a [`MotionState`] slot.
///
/// The actual position belongs to the body itself (it is what the body is indexed by),
/// so the slot accessors for position only accept these roles.
#[expect(clippy::exhaustive_enums)]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DerivedRole {
    /// See [`StateRole::Render`].
    Render,
    /// See [`StateRole::LastSynced`].
    LastSynced,
}

impl From<DerivedRole> for StateRole {
    fn from(role: DerivedRole) -> Self {
        match role {
            DerivedRole::Render => StateRole::Render,
            DerivedRole::LastSynced => StateRole::LastSynced,
        }
    }
}

/// Triple-buffered kinematic record of a body: velocity and heading for every
/// [`StateRole`], and position for the [`DerivedRole`]s.
#[derive(Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotionState {
    velocity: [FreeVector; 3],
    heading: [FreeCoordinate; 3],
    derived_position: [FreePoint; 2],
}

impl MotionState {
    /// Constructs a [`MotionState`] in which every role holds the same values.
    pub fn new(position: FreePoint, velocity: FreeVector, heading: FreeCoordinate) -> Self {
        Self {
            velocity: [velocity; 3],
            heading: [heading; 3],
            derived_position: [position; 2],
        }
    }

    /// Velocity in units per second.
    pub fn velocity(&self, role: StateRole) -> FreeVector {
        self.velocity[role.index()]
    }

    /// Sets the velocity of one role.
    pub fn set_velocity(&mut self, role: StateRole, velocity: FreeVector) {
        self.velocity[role.index()] = velocity;
    }

    /// Heading in radians counterclockwise from +X.
    pub fn heading(&self, role: StateRole) -> FreeCoordinate {
        self.heading[role.index()]
    }

    /// Sets the heading of one role.
    pub fn set_heading(&mut self, role: StateRole, heading: FreeCoordinate) {
        self.heading[role.index()] = heading;
    }

    /// Position of one of the non-authoritative roles.
    pub fn position(&self, role: DerivedRole) -> FreePoint {
        self.derived_position[role as usize]
    }

    /// Sets the position of one of the non-authoritative roles.
    pub fn set_position(&mut self, role: DerivedRole, position: FreePoint) {
        self.derived_position[role as usize] = position;
    }
}

impl fmt::Debug for MotionState {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            velocity,
            heading,
            derived_position,
        } = self;
        fmt.debug_struct("MotionState")
            .field("velocity", &velocity.refmt(&ConciseDebug))
            .field("heading", heading)
            .field("derived_position", &derived_position.refmt(&ConciseDebug))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn roles_are_independent() {
        let mut state = MotionState::new(FreePoint::new(1.0, 2.0), FreeVector::new(3.0, 4.0), 0.5);
        state.set_velocity(StateRole::Render, FreeVector::new(-1.0, 0.0));
        state.set_heading(StateRole::LastSynced, 2.0);
        state.set_position(DerivedRole::Render, FreePoint::new(9.0, 9.0));

        assert_eq!(state.velocity(StateRole::Actual), FreeVector::new(3.0, 4.0));
        assert_eq!(state.velocity(StateRole::Render), FreeVector::new(-1.0, 0.0));
        assert_eq!(state.velocity(StateRole::LastSynced), FreeVector::new(3.0, 4.0));
        assert_eq!(state.heading(StateRole::Actual), 0.5);
        assert_eq!(state.heading(StateRole::LastSynced), 2.0);
        assert_eq!(state.position(DerivedRole::Render), FreePoint::new(9.0, 9.0));
        assert_eq!(state.position(DerivedRole::LastSynced), FreePoint::new(1.0, 2.0));
    }

    #[test]
    fn derived_role_mapping() {
        for role in StateRole::ALL {
            match role.derived() {
                None => assert_eq!(role, StateRole::Actual),
                Some(derived) => assert_eq!(StateRole::from(derived), role),
            }
        }
    }
}

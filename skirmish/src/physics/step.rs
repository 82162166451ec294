//! Advancing one body through time, colliding as it goes.

use std::fmt;

use arrayvec::ArrayVec;
use manyfmt::{Fmt, Refmt as _};

use crate::math::{FreeCoordinate, FreePoint, FreeVector};
use crate::physics::{
    ColliderId, SpatialQuery as _, StateRole, bounce_velocity, exchange_momentum, find_first_collision,
    min_separation_time,
};
use crate::space::{BodyId, Side, Space};
use crate::util::ConciseDebug;

/// Remaining move time below which a move is considered finished, in seconds.
pub const MOVE_TIME_EPSILON: FreeCoordinate = 1e-6;

/// Speed below which a body moving under its own power does not bother to move.
pub const VELOCITY_EPSILON: FreeCoordinate = 1e-5;

/// Maximum number of collisions resolved in one call to [`move_body()`], not counting
/// contacts that are passed through.
pub const MAX_MOVE_ATTEMPTS: usize = 8;

/// Extra time a displaced body is moved beyond what is needed to make room, so that
/// the displacing body does not immediately touch it again.
pub const DISPLACE_EPSILON: FreeCoordinate = 0.002;

/// If a move uses every attempt and still has more than this fraction of its time
/// left, the body is stopped.
const STALL_FRACTION: FreeCoordinate = 0.98;

/// The bodies that have pushed a body being displaced, outermost first.
///
/// A displaced body never pushes back against a member of its chain, which is what
/// stops two bodies from displacing each other forever. Each level of displacement
/// gets its own copy.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DisplacerChain(Vec<BodyId>);

impl DisplacerChain {
    /// Constructs an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `body` has displaced the body this chain belongs to.
    pub fn contains(&self, body: BodyId) -> bool {
        self.0.contains(&body)
    }

    /// Appends `body` unless it is already present.
    pub fn push(&mut self, body: BodyId) {
        if !self.contains(body) {
            self.0.push(body);
        }
    }

    /// The displacing bodies, outermost first.
    pub fn as_slice(&self) -> &[BodyId] {
        &self.0
    }
}

/// What [`move_body()`] did about a contact.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum ContactResponse {
    /// The contact was handled by [`ContactRules::collided()`](crate::space::ContactRules::collided),
    /// or the obstacle was not solid; the body continued through it.
    PassedThrough,
    /// The body bounced off a solid obstacle.
    Bounced,
    /// The two bodies exchanged momentum.
    Exchanged,
    /// The other body was pushed out of the way.
    Displaced,
    /// The other body needed pushing, but the mover's hit budget was used up.
    Blocked,
    /// The move ended at this contact.
    Halted,
}

/// A contact encountered during [`move_body()`].
#[derive(Clone, Copy, PartialEq)]
#[non_exhaustive]
pub struct Contact {
    /// What was touched.
    pub target: ColliderId,
    /// Point of contact.
    pub point: FreePoint,
    /// What happened next.
    pub response: ContactResponse,
}

impl fmt::Debug for Contact {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            fmt,
            "{:?} {:?} at {:?}",
            self.response,
            self.target,
            self.point.refmt(&ConciseDebug)
        )
    }
}

/// One straight-line piece of a [`MoveInfo`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub struct MoveSegment {
    /// The change in position.
    pub delta_position: FreeVector,
    /// The contact that ended this segment, or [`None`] if the segment used all of the
    /// remaining time.
    pub stopped_by: Option<Contact>,
}

impl Fmt<ConciseDebug> for MoveSegment {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>, _: &ConciseDebug) -> fmt::Result {
        let mut nonempty = false;
        if self.delta_position != FreeVector::zero() {
            nonempty = true;
            write!(fmt, "move {:?}", self.delta_position.refmt(&ConciseDebug))?;
        }
        if let Some(stopped_by) = &self.stopped_by {
            if nonempty {
                write!(fmt, " ")?;
            }
            nonempty = true;
            write!(fmt, "stopped by {stopped_by:?}")?;
        }
        if !nonempty {
            write!(fmt, "0")?;
        }
        Ok(())
    }
}

/// Diagnostic data returned by [`move_body()`]. The exact contents of this structure
/// are unstable; use only [`Debug`] formatting to examine its contents unless you have
/// a specific need for one of the values.
#[derive(Clone, Debug, Default, PartialEq)]
#[non_exhaustive]
pub struct MoveInfo {
    /// Straight-line distance from the starting position to the final position.
    pub distance: FreeCoordinate,
    /// Number of collisions resolved, not counting ones passed through.
    pub attempts: usize,
    /// Whether the body was stopped because it could make no progress.
    pub stalled: bool,
    /// The individual segments of the move. Only the first [`MAX_MOVE_ATTEMPTS`]
    /// are recorded.
    pub segments: ArrayVec<MoveSegment, MAX_MOVE_ATTEMPTS>,
}

impl Fmt<ConciseDebug> for MoveInfo {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>, fopt: &ConciseDebug) -> fmt::Result {
        fmt.debug_struct("MoveInfo")
            .field("distance", &format_args!("{:.3}", self.distance))
            .field("attempts", &self.attempts)
            .field("stalled", &self.stalled)
            .field(
                "segments",
                &self
                    .segments
                    .iter()
                    .map(|segment| segment.refmt(fopt))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Moves body `id`'s `role` state along its velocity for `move_time` seconds,
/// resolving every collision on the way.
///
/// `displacers` is [`None`] when the body moves under its own power, and otherwise
/// lists the bodies that are pushing it, in which case it moves even if its own
/// velocity is negligible and stops at the first thing it pushes back against.
///
/// Obstacles and bodies passed through are excluded from collision until this
/// returns, including during any displacements it causes, and are always restored
/// before it returns.
pub fn move_body(
    space: &mut Space,
    id: BodyId,
    move_time: FreeCoordinate,
    role: StateRole,
    displacers: Option<DisplacerChain>,
) -> MoveInfo {
    let Some(start_position) = space.body(id).map(|body| body.position(role)) else {
        log::trace!("move_body: no body {id:?}");
        return MoveInfo::default();
    };
    let displaced = displacers.is_some();
    let mut chain = displacers.unwrap_or_default();

    let mut remaining = move_time;
    let mut attempts = 0;
    let mut segments = ArrayVec::new();
    let mut record = |delta_position: FreeVector, stopped_by: Option<Contact>| {
        // Excess segments are dropped.
        let _ = segments.try_push(MoveSegment {
            delta_position,
            stopped_by,
        });
    };

    {
        let mut guard = scopeguard::guard(
            (&mut *space, Vec::<ColliderId>::new()),
            |(space, suppressed)| {
                for target in suppressed {
                    space.set_collision_enabled(target, true);
                }
            },
        );
        let (space, suppressed) = &mut *guard;

        while remaining > MOVE_TIME_EPSILON && attempts < MAX_MOVE_ATTEMPTS {
            let Some(body) = space.body(id) else { break };
            let position = body.position(role);
            let velocity = body.velocity(role);

            if !displaced && velocity.length() < VELOCITY_EPSILON {
                break;
            }
            attempts += 1;

            let Some(collision) = find_first_collision(&**space, space.rules(), id, role, remaining)
            else {
                let delta = velocity * remaining;
                set_position(space, id, role, position + delta);
                record(delta, None);
                break;
            };

            let delta = velocity * collision.time;
            set_position(space, id, role, position + delta);
            let contact = |response| {
                Some(Contact {
                    target: collision.target,
                    point: collision.point,
                    response,
                })
            };

            let (Some(this), Some(other)) = (
                space.collider(ColliderId::Body(id)),
                space.collider(collision.target),
            ) else {
                break;
            };
            let rules = space.rules();
            let passes_through = rules.collided(this, other, role)
                || rules.collided(other, this, role)
                || !other.is_solid();

            if passes_through {
                space.set_collision_enabled(collision.target, false);
                suppressed.push(collision.target);
                attempts -= 1;
                record(delta, contact(ContactResponse::PassedThrough));
            } else if let ColliderId::Body(target) = collision.target {
                if displaced && chain.contains(target) {
                    record(delta, contact(ContactResponse::Halted));
                    break;
                }
                let (Some(this), Some(other)) = (space.body(id), space.body(target)) else {
                    break;
                };

                let velocity_delta = other.velocity(role) - this.velocity(role);
                let position_delta = other.position(role) - this.position(role);
                if position_delta.dot(velocity_delta) < 0.0 {
                    let (this_velocity, other_velocity) = exchange_momentum(
                        this.velocity(role),
                        this.mass(),
                        other.velocity(role),
                        other.mass(),
                        position_delta,
                    );
                    let peer = space.side() == Side::Peer;
                    if let Some(body) = space.body_mut(id) {
                        body.set_velocity(role, this_velocity);
                    }
                    if let Some(other) = space.body_mut(target) {
                        other.set_velocity(role, other_velocity);
                        if peer {
                            other.sync.set_waiting_for_sync();
                        }
                    }
                    space.rules_mut().bodies_collided(id, target, role);
                    record(delta, contact(ContactResponse::Exchanged));
                    if displaced {
                        break;
                    }
                } else {
                    let intended = this.position(role) + this.velocity(role) * remaining;
                    let separation = min_separation_time(
                        other.position(role),
                        other.velocity(role),
                        intended,
                        this.radius() + other.radius(),
                    );
                    let Some(separation) = separation.filter(|&t| t > 0.0) else {
                        log::debug!("move_body: cannot separate {id:?} from {target:?}");
                        record(delta, contact(ContactResponse::Halted));
                        break;
                    };

                    chain.push(id);
                    if this.hit_budget > 0 {
                        move_body(
                            space,
                            target,
                            separation + DISPLACE_EPSILON,
                            role,
                            Some(chain.clone()),
                        );
                        if let Some(body) = space.body_mut(id) {
                            body.hit_budget -= 1;
                        }
                        record(delta, contact(ContactResponse::Displaced));
                    } else {
                        record(delta, contact(ContactResponse::Blocked));
                    }
                }
            } else {
                if let Some(body) = space.body_mut(id) {
                    let bounced = bounce_velocity(body.position(role), collision.point, velocity);
                    body.set_velocity(role, bounced);
                }
                record(delta, contact(ContactResponse::Bounced));
            }

            remaining -= collision.time;
        }
    }

    let stalled = attempts == MAX_MOVE_ATTEMPTS && remaining > move_time * STALL_FRACTION;
    let Some(body) = space.body_mut(id) else {
        return MoveInfo::default();
    };
    if stalled {
        log::debug!(
            "move_body: {id:?} made no progress in {attempts} attempts; stopping it"
        );
        body.set_velocity(role, FreeVector::zero());
    }

    MoveInfo {
        distance: (body.position(role) - start_position).length(),
        attempts,
        stalled,
        segments,
    }
}

fn set_position(space: &mut Space, id: BodyId, role: StateRole, position: FreePoint) {
    if let Some(body) = space.body_mut(id) {
        body.set_position(role, position);
    }
}

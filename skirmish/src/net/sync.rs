use crate::math::{FreeCoordinate, FreePoint, FreeVector};
use crate::net::{
    BitReader, BitWriter, DecodeError, read_compressed_point, read_compressed_velocity,
    write_compressed_point, write_compressed_velocity,
};
use crate::physics::{DynamicBody, StateRole};

bitflags::bitflags! {
    /// Parts of a body's state that need to be sent to peers.
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct UpdateMask: u8 {
        /// The body is new to peers; send its item id.
        const INITIAL = 1 << 0;
        /// Position and velocity have changed.
        const POSITION = 1 << 1;
        /// The position change is a discontinuity that peers should not smooth over.
        const WARP = 1 << 2;
    }
}

/// Squared change in velocity, since the last update sent, that forces a new update.
pub const VELOCITY_RESEND_THRESHOLD_SQUARED: FreeCoordinate = 100.0;

/// Value the authority's resend timer is reset to after each update. The timer counts
/// down by `(speed + RESEND_SPEED_BIAS)` per second, so faster bodies are updated
/// more often.
pub const RESEND_TIMER: FreeCoordinate = 100.0;

/// See [`RESEND_TIMER`].
pub const RESEND_SPEED_BIAS: FreeCoordinate = 20.0;

/// Seconds a peer waits for the authority to confirm a locally predicted collision of a
/// body that was at rest in the last update, before undoing it.
pub const REVERT_TIME_AT_REST: FreeCoordinate = 0.5;

/// Like [`REVERT_TIME_AT_REST`], for a body that was moving.
pub const REVERT_TIME_MOVING: FreeCoordinate = 5.0;

/// Squared speed below which a body counts as at rest for [`REVERT_TIME_AT_REST`].
const AT_REST_SPEED_SQUARED: FreeCoordinate = 1e-4;

/// Per-body network bookkeeping.
#[derive(Clone, Debug, PartialEq)]
pub struct SyncState {
    pending: UpdateMask,
    /// On the authority, counts down to a periodic resend. On a peer, counts down to
    /// reverting an unconfirmed collision.
    update_timer: FreeCoordinate,
    /// Velocity as of the last update sent.
    prev_sent_velocity: FreeVector,
    /// Whether a peer predicted a collision that changed this body's motion and is
    /// waiting for the authority to confirm it.
    waiting_for_sync: bool,
}

impl Default for SyncState {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncState {
    /// State of a body not yet announced to any peer.
    pub fn new() -> Self {
        Self {
            pending: UpdateMask::INITIAL | UpdateMask::POSITION | UpdateMask::WARP,
            update_timer: 0.0,
            prev_sent_velocity: FreeVector::zero(),
            waiting_for_sync: false,
        }
    }

    /// Parts of the state that have changed since the last update was taken.
    pub fn pending(&self) -> UpdateMask {
        self.pending
    }

    /// Records that parts of the state need sending.
    pub fn mark(&mut self, mask: UpdateMask) {
        self.pending |= mask;
    }

    /// Returns and clears the pending mask.
    pub fn take_pending(&mut self) -> UpdateMask {
        core::mem::take(&mut self.pending)
    }

    /// See the field of the same name.
    pub fn waiting_for_sync(&self) -> bool {
        self.waiting_for_sync
    }

    pub(crate) fn set_waiting_for_sync(&mut self) {
        self.waiting_for_sync = true;
    }

    /// Current value of the resend or revert timer.
    pub fn update_timer(&self) -> FreeCoordinate {
        self.update_timer
    }

    /// Authority-side bookkeeping after a body has moved for `dt` seconds: decides
    /// whether its motion has changed enough, or enough time has passed, to send an
    /// update.
    ///
    /// `off_render` is whether the body's actual position differs from its render
    /// position, which on the authority is the position as of the previous tick.
    pub fn note_authority_tick(
        &mut self,
        velocity: FreeVector,
        off_render: bool,
        dt: FreeCoordinate,
    ) {
        if velocity.square_length() != 0.0 {
            self.update_timer -= (velocity.length() + RESEND_SPEED_BIAS) * dt;
            if self.update_timer < 0.0
                || (velocity - self.prev_sent_velocity).square_length()
                    > VELOCITY_RESEND_THRESHOLD_SQUARED
            {
                self.mark(UpdateMask::POSITION);
                self.update_timer = RESEND_TIMER;
                self.prev_sent_velocity = velocity;
            }
        } else if self.prev_sent_velocity.square_length() != 0.0 || off_render {
            // Tell peers it stopped.
            self.mark(UpdateMask::POSITION);
            self.prev_sent_velocity = FreeVector::zero();
        }
    }

    /// Peer-side bookkeeping after `dt` seconds. Returns true if the body has waited
    /// too long for confirmation and should revert to its last received state.
    pub fn note_peer_tick(&mut self, dt: FreeCoordinate) -> bool {
        if !self.waiting_for_sync {
            return false;
        }
        self.update_timer -= dt;
        if self.update_timer < 0.0 {
            self.waiting_for_sync = false;
            true
        } else {
            false
        }
    }

    /// Peer-side bookkeeping after adopting a position update.
    pub fn note_received(&mut self, velocity: FreeVector) {
        self.waiting_for_sync = false;
        self.update_timer = if velocity.square_length() < AT_REST_SPEED_SQUARED {
            REVERT_TIME_AT_REST
        } else {
            REVERT_TIME_MOVING
        };
    }
}

/// Runs the authority's per-tick bookkeeping for `body`, then brings its render state
/// up to date.
pub(crate) fn authority_tick(body: &mut DynamicBody, dt: FreeCoordinate) {
    let velocity = body.velocity(StateRole::Actual);
    let off_render = body.position(StateRole::Actual) != body.position(StateRole::Render);
    body.sync.note_authority_tick(velocity, off_render, dt);
    body.copy_state(StateRole::Actual, StateRole::Render);
}

/// Runs a peer's per-tick bookkeeping for `body`, undoing an unconfirmed prediction if
/// it has waited too long.
pub(crate) fn peer_tick(body: &mut DynamicBody, dt: FreeCoordinate) -> bool {
    let revert = body.sync.note_peer_tick(dt);
    if revert {
        body.copy_state(StateRole::LastSynced, StateRole::Actual);
    }
    revert
}

/// Position and velocity part of a [`BodyUpdate`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub struct PositionUpdate {
    /// Actual position.
    pub position: FreePoint,
    /// Actual velocity.
    pub velocity: FreeVector,
    /// Whether the receiver should jump to the new state instead of smoothing.
    pub snap: bool,
}

/// One body's state as sent from the authority to peers.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[non_exhaustive]
pub struct BodyUpdate {
    /// Present only in the first update for a body.
    pub item_id: Option<u16>,
    /// Present if the body has moved.
    pub position: Option<PositionUpdate>,
}

impl BodyUpdate {
    /// Constructs the update that conveys the parts of `body` selected by `mask`.
    pub fn from_body(body: &DynamicBody, mask: UpdateMask) -> Self {
        Self {
            item_id: mask.contains(UpdateMask::INITIAL).then_some(body.item_id),
            position: mask.contains(UpdateMask::POSITION).then(|| PositionUpdate {
                position: body.position(StateRole::Actual),
                velocity: body.velocity(StateRole::Actual),
                snap: mask.contains(UpdateMask::WARP),
            }),
        }
    }

    /// Encodes the update.
    pub fn write(&self, writer: &mut BitWriter) {
        if let Some(item_id) = self.item_id {
            writer.write_flag(true);
            writer.write_ranged_u32(u32::from(item_id), 0, u32::from(u16::MAX));
        } else {
            writer.write_flag(false);
        }
        if let Some(update) = self.position {
            writer.write_flag(true);
            write_compressed_point(writer, update.position);
            write_compressed_velocity(writer, update.velocity);
            writer.write_flag(update.snap);
        } else {
            writer.write_flag(false);
        }
    }

    /// Decodes an update written by [`BodyUpdate::write()`].
    pub fn read(reader: &mut BitReader<'_>) -> Result<Self, DecodeError> {
        let item_id = if reader.read_flag()? {
            let raw = reader.read_ranged_u32(0, u32::from(u16::MAX))?;
            Some(u16::try_from(raw).map_err(|_| DecodeError::OutOfRange {
                value: u64::from(raw),
                max: u64::from(u16::MAX),
            })?)
        } else {
            None
        };
        let position = if reader.read_flag()? {
            let position = read_compressed_point(reader)?;
            let velocity = read_compressed_velocity(reader)?;
            let snap = reader.read_flag()?;
            Some(PositionUpdate {
                position,
                velocity,
                snap,
            })
        } else {
            None
        };
        Ok(Self { item_id, position })
    }
}

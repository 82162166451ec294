//! Motion, collision, and network smoothing core for a client/server 2D arena game.
//!
//! This crate advances every moving thing in a [`Space`](space::Space) once per tick,
//! detecting collisions continuously along each body's path (so fast bodies cannot
//! tunnel through walls), resolving them by bouncing, exchanging momentum, or pushing
//! slower bodies out of the way, and reporting when bodies enter or leave zones.
//! On the network side, it decides when a body's state needs to be sent, encodes it
//! compactly, and on the receiving side smooths the displayed position toward the
//! authoritative one instead of letting it jump.
//!
//! ## Package organization
//!
//! * [`math`] contains the coordinate types and closed-form geometry routines.
//! * [`physics`] contains [`DynamicBody`](physics::DynamicBody) and its triple-buffered
//!   [`MotionState`](physics::MotionState), collision detection and response,
//!   and the per-body [`move_body()`](physics::move_body) stepper.
//! * [`space`] owns bodies and obstacles and drives a whole tick.
//! * [`zone`] tracks membership in labeled regions.
//! * [`net`] is the bit-level synchronization protocol.
//! * [`time`] and [`util`] contain small supporting types.
//!
//! ## Roles
//!
//! Every body keeps three views of where it is, selected by
//! [`StateRole`](physics::StateRole): the authoritative *actual* state that the
//! simulation advances, the *render* state that is displayed, and the *last synced*
//! state most recently received from the network. On the authority the render state
//! simply follows the actual state; on a peer it is interpolated toward it.

pub mod math;
pub mod net;
pub mod physics;
pub mod space;
pub mod time;
pub mod util;
pub mod zone;

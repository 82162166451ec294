//! Network synchronization of body state between the authority and peers.
//!
//! The authority decides, per body, when an update is worth sending
//! ([`SyncState`]), and encodes it into a compact bit stream ([`BodyUpdate`]).
//! Peers decode it, adopt the authoritative state, and smooth over the jump
//! (see [`Space::receive_update()`](crate::space::Space::receive_update)).

mod bits;
pub use bits::*;
mod compress;
pub use compress::*;
mod sync;
pub use sync::*;

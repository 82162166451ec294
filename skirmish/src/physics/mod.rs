//! Continuously moving bodies and collision.

use crate::math::FreeCoordinate;

mod body;
pub use body::*;
mod collision;
pub use collision::*;
mod interpolate;
pub use interpolate::*;
mod response;
pub use response::*;
mod state;
pub use state::*;
mod step;
pub use step::*;


/// Number of chained displacements a single body may cause per tick.
///
/// Reset at the start of every tick. When many bodies are jammed together this is what
/// keeps displacement recursion finite, independent of the displacer-chain check.
pub const HIT_BUDGET: u8 = 16;

/// Extra margin around a body's positions that its [`DynamicBody::extent()`] covers.
pub const EXTENT_PADDING: FreeCoordinate = 10.0;

//! Mathematical utilities and decisions.

#[doc(inline)]
pub use skirmish_base::math::*;

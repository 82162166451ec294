//! Data types for simulated time.

#[doc(inline)]
pub use skirmish_base::time::*;

//! Data types for simulated time.

use core::fmt;

use manyfmt::Refmt as _;

use crate::util::ConciseDebug;

#[doc(no_inline)]
pub use core::time::Duration;

/// Specifies an amount of time passing in the simulation.
///
/// [`Tick`] values are passed along through the `step()` operations that advance time.
/// The simulation does not require ticks to be of uniform length; each one carries its
/// own duration.
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct Tick {
    delta_t: Duration,

    /// Whether game time is paused, and `delta_t` should not be considered
    /// as an amount of game time passing. See [`Self::paused()`] for details.
    paused: bool,
}

impl Tick {
    /// Constructs a non-paused [`Tick`] of the given length.
    #[inline]
    pub const fn from_duration(delta_t: Duration) -> Self {
        Self {
            delta_t,
            paused: false,
        }
    }

    /// Constructs a non-paused [`Tick`] from a whole number of milliseconds,
    /// which is the unit in which player moves are timed.
    #[inline]
    pub const fn from_millis(millis: u64) -> Self {
        Self::from_duration(Duration::from_millis(millis))
    }

    /// Constructs a non-paused [`Tick`] from a duration expressed in fractional seconds.
    ///
    /// Negative or NaN inputs produce a zero-length tick.
    #[inline]
    pub fn from_seconds(dt: f64) -> Self {
        Self::from_duration(Duration::try_from_secs_f64(dt).unwrap_or(Duration::ZERO))
    }

    /// Returns the amount of time passed, as a [`Duration`].
    #[inline]
    pub fn delta_t(self) -> Duration {
        self.delta_t
    }

    /// Returns the amount of time passed, as a floating-point number of seconds.
    #[inline]
    pub fn delta_t_f64(self) -> f64 {
        self.delta_t.as_secs_f64()
    }

    /// Set the paused flag. See [`Tick::paused`] for more information.
    #[inline]
    #[must_use]
    pub fn pause(self) -> Self {
        Self {
            paused: true,
            ..self
        }
    }

    /// Returns the "paused" state of this Tick. If true, then step operations should
    /// not perform any changes that reflect "in-game" time passing. They should still
    /// take care of bookkeeping that would otherwise leave a stale or inconsistent view.
    #[inline]
    pub fn paused(&self) -> bool {
        self.paused
    }
}

impl fmt::Debug for Tick {
    #[allow(clippy::missing_inline_in_public_items)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { delta_t, paused } = self;
        write!(f, "Tick({}", delta_t.refmt(&ConciseDebug))?;
        if *paused {
            write!(f, ", paused")?;
        }
        write!(f, ")")
    }
}

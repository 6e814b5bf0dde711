// Monotonic time values used throughout the congestion-control core.
//
// `Duration` and `Timepoint` carry microsecond resolution plus the sentinel
// values (`Zero`, `Infinite`, `Uninitialized`) the controllers need to model
// "no RTT observed yet" without threading `Option<Duration>` through every
// call site.

use std::cmp::Ordering;
use std::ops::{Add, Sub};
use std::time::Instant;

const INFINITE_MICROS: u64 = u64::MAX;

/// A span of time with microsecond resolution.
///
/// `Duration::infinite()` behaves as an absorbing maximum: adding any finite
/// duration to it saturates back to infinite, and it compares greater than
/// any finite duration.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Duration(u64);

impl Duration {
    pub const fn zero() -> Self {
        Duration(0)
    }

    pub const fn infinite() -> Self {
        Duration(INFINITE_MICROS)
    }

    pub const fn from_micros(micros: u64) -> Self {
        Duration(micros)
    }

    pub const fn from_millis(millis: u64) -> Self {
        Duration(millis.saturating_mul(1_000))
    }

    pub const fn from_secs(secs: u64) -> Self {
        Duration(secs.saturating_mul(1_000_000))
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub const fn is_infinite(&self) -> bool {
        self.0 == INFINITE_MICROS
    }

    pub const fn as_micros(&self) -> u64 {
        self.0
    }

    pub const fn as_millis_f64(&self) -> f64 {
        self.0 as f64 / 1_000.0
    }

    pub const fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / 1_000_000.0
    }

    /// Multiplies by a rational `num/den`, saturating at `infinite()`.
    pub fn checked_mul_ratio(self, num: u64, den: u64) -> Self {
        if self.is_infinite() {
            return Duration::infinite();
        }
        match self.0.checked_mul(num) {
            Some(v) => Duration((v / den).min(INFINITE_MICROS - 1)),
            None => Duration::infinite(),
        }
    }

    pub fn max(self, other: Self) -> Self {
        if self >= other {
            self
        } else {
            other
        }
    }

    pub fn min(self, other: Self) -> Self {
        if self <= other {
            self
        } else {
            other
        }
    }
}

impl std::fmt::Debug for Duration {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if self.is_infinite() {
            write!(f, "Duration(infinite)")
        } else {
            write!(f, "Duration({}us)", self.0)
        }
    }
}

impl Default for Duration {
    fn default() -> Self {
        Duration::zero()
    }
}

impl Add for Duration {
    type Output = Duration;

    fn add(self, rhs: Duration) -> Duration {
        if self.is_infinite() || rhs.is_infinite() {
            return Duration::infinite();
        }
        Duration(self.0.saturating_add(rhs.0).min(INFINITE_MICROS - 1))
    }
}

impl Sub for Duration {
    type Output = Duration;

    /// Saturates at zero; never panics on underflow.
    fn sub(self, rhs: Duration) -> Duration {
        if self.is_infinite() {
            return Duration::infinite();
        }
        Duration(self.0.saturating_sub(rhs.0))
    }
}

/// A point in time, offset from some arbitrary epoch.
///
/// `Uninitialized` is distinct from `Zero`: a controller that has never seen
/// a timestamp should use `Timepoint::uninitialized()`, not `Timepoint::zero()`,
/// so that "never set" is never silently treated as "set to the epoch".
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timepoint(Repr);

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
enum Repr {
    Uninitialized,
    Finite(u64),
    Infinite,
}

impl Timepoint {
    pub const fn zero() -> Self {
        Timepoint(Repr::Finite(0))
    }

    pub const fn infinite() -> Self {
        Timepoint(Repr::Infinite)
    }

    pub const fn uninitialized() -> Self {
        Timepoint(Repr::Uninitialized)
    }

    pub const fn from_micros(micros: u64) -> Self {
        Timepoint(Repr::Finite(micros))
    }

    pub const fn is_initialized(&self) -> bool {
        !matches!(self.0, Repr::Uninitialized)
    }

    pub const fn is_infinite(&self) -> bool {
        matches!(self.0, Repr::Infinite)
    }

    pub const fn as_micros(&self) -> u64 {
        match self.0 {
            Repr::Finite(v) => v,
            Repr::Uninitialized => 0,
            Repr::Infinite => u64::MAX,
        }
    }
}

impl std::fmt::Debug for Timepoint {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self.0 {
            Repr::Uninitialized => write!(f, "Timepoint(uninitialized)"),
            Repr::Infinite => write!(f, "Timepoint(infinite)"),
            Repr::Finite(v) => write!(f, "Timepoint({}us)", v),
        }
    }
}

impl Default for Timepoint {
    fn default() -> Self {
        Timepoint::uninitialized()
    }
}

impl PartialOrd for Timepoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timepoint {
    fn cmp(&self, other: &Self) -> Ordering {
        // Uninitialized sorts before everything, including Zero, so that a
        // controller comparing "last deflation time" against the current
        // time never mistakes "never happened" for "happened at time 0".
        fn rank(r: &Repr) -> (u8, u64) {
            match r {
                Repr::Uninitialized => (0, 0),
                Repr::Finite(v) => (1, *v),
                Repr::Infinite => (2, 0),
            }
        }
        rank(&self.0).cmp(&rank(&other.0))
    }
}

impl Add<Duration> for Timepoint {
    type Output = Timepoint;

    fn add(self, rhs: Duration) -> Timepoint {
        match self.0 {
            Repr::Uninitialized => self,
            Repr::Infinite => self,
            Repr::Finite(v) => {
                if rhs.is_infinite() {
                    Timepoint::infinite()
                } else {
                    Timepoint(Repr::Finite(v.saturating_add(rhs.as_micros())))
                }
            }
        }
    }
}

impl Sub for Timepoint {
    type Output = Duration;

    /// Saturates at zero; never panics when `rhs` is later than `self`.
    fn sub(self, rhs: Timepoint) -> Duration {
        match (self.0, rhs.0) {
            (Repr::Finite(a), Repr::Finite(b)) => Duration::from_micros(a.saturating_sub(b)),
            (Repr::Infinite, _) => Duration::infinite(),
            _ => Duration::zero(),
        }
    }
}

/// Supplies the current time to the sender loop; the core never calls this
/// itself, it only receives `Timepoint`s produced by a `Clock`.
pub trait Clock {
    fn now(&self) -> Timepoint;
}

/// A `Clock` backed by `std::time::Instant`, anchored at construction time.
#[derive(Debug)]
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        SystemClock {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        SystemClock::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timepoint {
        Timepoint::from_micros(self.epoch.elapsed().as_micros() as u64)
    }
}

/// A settable `Clock` test double; never advances on its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct ManualClock {
    now: Timepoint,
}

impl ManualClock {
    pub fn new() -> Self {
        ManualClock {
            now: Timepoint::zero(),
        }
    }

    pub fn set(&mut self, now: Timepoint) {
        self.now = now;
    }

    pub fn advance(&mut self, by: Duration) {
        self.now = self.now + by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timepoint {
        self.now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_infinite_absorbs_addition() {
        let d = Duration::infinite() + Duration::from_millis(5);
        assert!(d.is_infinite());
    }

    #[test]
    fn duration_subtraction_saturates() {
        let d = Duration::from_millis(5) - Duration::from_millis(10);
        assert_eq!(d, Duration::zero());
    }

    #[test]
    fn timepoint_uninitialized_orders_before_zero() {
        assert!(Timepoint::uninitialized() < Timepoint::zero());
        assert!(Timepoint::zero() < Timepoint::infinite());
    }

    #[test]
    fn timepoint_sub_saturates_at_zero() {
        let earlier = Timepoint::from_micros(10);
        let later = Timepoint::from_micros(100);
        assert_eq!(earlier - later, Duration::zero());
        assert_eq!(later - earlier, Duration::from_micros(90));
    }

    #[test]
    fn manual_clock_does_not_advance_on_its_own() {
        let mut clock = ManualClock::new();
        let t0 = clock.now();
        let t1 = clock.now();
        assert_eq!(t0, t1);
        clock.advance(Duration::from_millis(1));
        assert!(clock.now() > t0);
    }
}

//! A time interface that can be replaced by a fake time implementation
//! during testing.
//!
//! All aging decisions in the cache are based on absolute timestamps with
//! second precision, obtained from a [`Clock`]. The [`SystemClock`] is the
//! one to use in production; the [`FakeClock`] lets tests move time
//! forward deterministically.

use core::fmt;
use core::ops;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::base::Ttl;

//------------ Timestamp -----------------------------------------------------

/// A point in time, in whole seconds since the clock's epoch.
///
/// The epoch is whenever the clock was created, which for the cache means
/// process start. [`Timestamp::ZERO`] doubles as the "forcibly expired"
/// sentinel stamped onto database records before a configuration reload.
#[derive(
    Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd,
)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The clock's epoch, also the forced-expiry sentinel.
    pub const ZERO: Timestamp = Timestamp(0);

    /// Creates a timestamp the given number of seconds after the epoch.
    #[must_use]
    pub const fn from_secs(secs: u64) -> Self {
        Timestamp(secs)
    }

    /// Returns the number of seconds since the epoch.
    #[must_use]
    pub const fn as_secs(self) -> u64 {
        self.0
    }

    /// Returns the time elapsed from `earlier` to `self`.
    ///
    /// Returns a zero duration if `earlier` is actually later.
    #[must_use]
    pub fn duration_since(self, earlier: Timestamp) -> Duration {
        Duration::from_secs(self.0.saturating_sub(earlier.0))
    }
}

//--- Add

impl ops::Add<Ttl> for Timestamp {
    type Output = Timestamp;

    fn add(self, ttl: Ttl) -> Self::Output {
        Timestamp(self.0.saturating_add(u64::from(ttl.as_secs())))
    }
}

impl ops::Add<Duration> for Timestamp {
    type Output = Timestamp;

    fn add(self, duration: Duration) -> Self::Output {
        Timestamp(self.0.saturating_add(duration.as_secs()))
    }
}

//--- Display

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

//------------ Clock ---------------------------------------------------------

/// A source of the current time.
pub trait Clock: Clone + Send + Sync + 'static {
    /// Creates a new instance of the clock.
    ///
    /// The moment of creation becomes the clock's epoch.
    fn new() -> Self;

    /// Returns the current time.
    fn now(&self) -> Timestamp;
}

//------------ SystemClock ---------------------------------------------------

/// Implementation of the [`Clock`] trait using [`std::time::Instant`].
#[derive(Clone, Debug)]
pub struct SystemClock {
    /// The moment the clock was created.
    origin: Instant,
}

impl Clock for SystemClock {
    fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    fn now(&self) -> Timestamp {
        Timestamp::from_secs(self.origin.elapsed().as_secs())
    }
}

//------------ FakeClock -----------------------------------------------------

/// Implementation of the [`Clock`] trait to fake the passing of time,
/// for example for testing.
///
/// Time only moves when [`FakeClock::adjust_time`] is called. Clones share
/// the same current time.
#[derive(Clone, Debug)]
pub struct FakeClock {
    /// The current fake time.
    now: Arc<Mutex<Duration>>,
}

impl FakeClock {
    /// Advances the current time by a [`Duration`].
    pub fn adjust_time(&self, adjust: Duration) {
        let mut now = self.now.lock();
        *now = now.checked_add(adjust).expect("fake time overflow");
    }
}

impl Clock for FakeClock {
    fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Duration::from_secs(0))),
        }
    }

    fn now(&self) -> Timestamp {
        Timestamp::from_secs(self.now.lock().as_secs())
    }
}

//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fake_clock() {
        let clock = FakeClock::new();
        assert_eq!(clock.now(), Timestamp::ZERO);
        clock.adjust_time(Duration::from_secs(30));
        assert_eq!(clock.now(), Timestamp::from_secs(30));
        let other = clock.clone();
        other.adjust_time(Duration::from_secs(12));
        assert_eq!(clock.now(), Timestamp::from_secs(42));
    }

    #[test]
    fn timestamp_arithmetic() {
        let ts = Timestamp::from_secs(100);
        assert_eq!((ts + Ttl::from_secs(20)).as_secs(), 120);
        assert_eq!(
            ts.duration_since(Timestamp::from_secs(40)),
            Duration::from_secs(60)
        );
        assert_eq!(
            Timestamp::from_secs(40).duration_since(ts),
            Duration::ZERO
        );
    }
}

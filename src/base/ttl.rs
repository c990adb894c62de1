//! The time-to-live value of resource records.

use core::fmt;
use core::ops;
use std::time::Duration;

//------------ Ttl -----------------------------------------------------------

/// How many seconds a resource record may be held before discarding it.
///
/// According to [RFC 2181](https://datatracker.ietf.org/doc/html/rfc2181#section-8)
/// TTL values have second-level precision, which is why this type exists
/// instead of using [`std::time::Duration`] directly: a `Duration` can
/// represent time down to the nanosecond which is simply not needed and
/// might cause confusion when the value travels over the network.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
pub struct Ttl(u32);

impl Ttl {
    /// A time-to-live of one second.
    pub const SECOND: Ttl = Ttl::from_secs(1);

    /// A time-to-live of one minute.
    pub const MINUTE: Ttl = Ttl::from_mins(1);

    /// A time-to-live of one hour.
    pub const HOUR: Ttl = Ttl::from_hours(1);

    /// A time-to-live of one day.
    pub const DAY: Ttl = Ttl::from_days(1);

    /// A time-to-live of zero.
    pub const ZERO: Ttl = Ttl::from_secs(0);

    /// The maximum theoretical time to live.
    pub const MAX: Ttl = Ttl::from_secs(u32::MAX);

    /// The practical maximum time to live as recommended by [RFC 8767](https://datatracker.ietf.org/doc/html/rfc8767#section-4).
    pub const CAP: Ttl = Ttl::from_secs(604_800);

    /// Returns the total time to live in seconds.
    #[must_use]
    #[inline]
    pub const fn as_secs(&self) -> u32 {
        self.0
    }

    /// Creates a new `Ttl` from the specified number of seconds.
    #[must_use]
    #[inline]
    pub const fn from_secs(secs: u32) -> Self {
        Self(secs)
    }

    /// Creates a new `Ttl` from the specified number of minutes.
    ///
    /// Saturates at [`Ttl::MAX`].
    #[must_use]
    #[inline]
    pub const fn from_mins(minutes: u32) -> Self {
        Self(minutes.saturating_mul(60))
    }

    /// Creates a new `Ttl` from the specified number of hours.
    ///
    /// Saturates at [`Ttl::MAX`].
    #[must_use]
    #[inline]
    pub const fn from_hours(hours: u32) -> Self {
        Self(hours.saturating_mul(3600))
    }

    /// Creates a new `Ttl` from the specified number of days.
    ///
    /// Saturates at [`Ttl::MAX`].
    #[must_use]
    #[inline]
    pub const fn from_days(days: u32) -> Self {
        Self(days.saturating_mul(86_400))
    }

    /// Converts a `Ttl` into a [`std::time::Duration`].
    #[must_use]
    #[inline]
    pub const fn into_duration(self) -> Duration {
        Duration::from_secs(self.0 as u64)
    }

    /// Creates a `Ttl` from a [`std::time::Duration`], discarding
    /// sub-second precision and saturating at [`Ttl::MAX`].
    #[must_use]
    #[inline]
    pub const fn from_duration_lossy(duration: Duration) -> Self {
        let secs = duration.as_secs();
        if secs > u32::MAX as u64 {
            Self::MAX
        } else {
            Self(secs as u32)
        }
    }

    /// Saturating `Ttl` addition.
    #[must_use]
    #[inline]
    pub const fn saturating_add(self, rhs: Ttl) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    /// Saturating `Ttl` subtraction.
    #[must_use]
    #[inline]
    pub const fn saturating_sub(self, rhs: Ttl) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    /// Returns the larger of two values.
    #[must_use]
    #[inline]
    pub fn max(self, rhs: Ttl) -> Self {
        Self(self.0.max(rhs.0))
    }
}

//--- Display

impl fmt::Display for Ttl {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

//--- Add and Sub

impl ops::Add for Ttl {
    type Output = Ttl;

    fn add(self, rhs: Ttl) -> Self::Output {
        self.saturating_add(rhs)
    }
}

impl ops::Sub for Ttl {
    type Output = Ttl;

    fn sub(self, rhs: Ttl) -> Self::Output {
        self.saturating_sub(rhs)
    }
}

//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::Ttl;

    #[test]
    fn units() {
        assert_eq!(Ttl::from_mins(2).as_secs(), 120);
        assert_eq!(Ttl::from_hours(2).as_secs(), 7200);
        assert_eq!(Ttl::from_days(2).as_secs(), 172_800);
    }

    #[test]
    fn saturation() {
        assert_eq!(Ttl::MAX + Ttl::SECOND, Ttl::MAX);
        assert_eq!(Ttl::ZERO - Ttl::SECOND, Ttl::ZERO);
        assert_eq!(Ttl::from_mins(u32::MAX), Ttl::MAX);
    }
}

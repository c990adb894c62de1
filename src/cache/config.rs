//! Configuration of the resolver cache.

use std::time::Duration;

use crate::base::Ttl;
use crate::utils::config::DefMinMax;

/// Configuration limit for the target number of cached domain names.
///
/// The aging sweep tries to keep the number of live names around this
/// value by shrinking the acceptable idle time whenever the table is over
/// target.
const TARGET_DN_COUNT: DefMinMax<usize> =
    DefMinMax::new(4_000, 1, 1_000_000_000);

/// Limit on how often the global aging sweep considers running.
const AGING_FREQUENCY: DefMinMax<Duration> = DefMinMax::new(
    Duration::from_secs(3600),
    Duration::from_secs(60),
    Duration::from_secs(604_800),
);

/// Limit on the ceiling of the dynamic idle-time threshold.
///
/// While the table is under target, a name may stay cached this long
/// without being referenced before it becomes a candidate for eviction.
const MAX_IDLE: DefMinMax<Duration> = DefMinMax::new(
    Duration::from_secs(604_800),
    Duration::from_secs(3600),
    Duration::from_secs(6_048_000),
);

/// Limit on the floor of the dynamic idle-time threshold.
///
/// Repeated halving while over target never pushes the threshold below
/// this value.
const MIN_IDLE: DefMinMax<Duration> = DefMinMax::new(
    Duration::from_secs(300),
    Duration::from_secs(60),
    Duration::from_secs(3600),
);

/// Limit on the per-name aging reserve.
///
/// A name referenced more recently than this is never touched by
/// incremental aging, whatever the dynamic threshold says.
const RESERVE_IDLE: DefMinMax<Duration> = DefMinMax::new(
    Duration::from_secs(300),
    Duration::from_secs(1),
    Duration::from_secs(3600),
);

/// Limit on the TTL floor for records learned from the network.
///
/// Records claiming a shorter TTL get the default TTL instead so they
/// cannot expire before the query that fetched them has been answered.
const MIN_TTL: DefMinMax<Ttl> = DefMinMax::new(
    Ttl::from_mins(2),
    Ttl::from_secs(1),
    Ttl::from_hours(1),
);

/// Limit on the TTL substituted for records below the TTL floor.
const DEFAULT_TTL: DefMinMax<Ttl> = DefMinMax::new(
    Ttl::from_mins(10),
    Ttl::from_mins(1),
    Ttl::from_days(1),
);

/// Limit on the effective TTL of records from the local database.
///
/// Statically configured records do not really expire; they carry a TTL
/// long enough to outlive any aging decision until the next reload.
const DB_TTL: DefMinMax<Ttl> = DefMinMax::new(
    Ttl::from_days(365),
    Ttl::from_days(1),
    Ttl::MAX,
);

//------------ Config --------------------------------------------------------

/// Configuration of a cache.
#[derive(Clone, Debug)]
pub struct Config {
    /// Target number of live domain names.
    target_dn_count: usize,

    /// How often the global sweep considers running.
    aging_frequency: Duration,

    /// Ceiling of the dynamic idle-time threshold.
    max_idle: Duration,

    /// Floor of the dynamic idle-time threshold.
    min_idle: Duration,

    /// Idle time below which a name is exempt from incremental aging.
    reserve_idle: Duration,

    /// TTL floor for network records.
    min_ttl: Ttl,

    /// TTL substituted for records below the floor.
    default_ttl: Ttl,

    /// Effective TTL of database records.
    db_ttl: Ttl,
}

impl Config {
    /// Creates a new config with default values.
    ///
    /// The default values are documented at the relevant set_* methods.
    #[must_use]
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets the target number of live domain names.
    ///
    /// The value has to be at least one and the default is 4,000. The
    /// table may exceed the target between sweeps; the aging machinery
    /// merely steers towards it.
    pub fn set_target_dn_count(&mut self, value: usize) {
        self.target_dn_count = TARGET_DN_COUNT.limit(value)
    }

    /// Returns the target number of live domain names.
    #[must_use]
    pub fn target_dn_count(&self) -> usize {
        self.target_dn_count
    }

    /// Sets how often the global aging sweep considers running.
    ///
    /// The value has to be at least 60 seconds, at most a week, and the
    /// default is one hour.
    pub fn set_aging_frequency(&mut self, value: Duration) {
        self.aging_frequency = AGING_FREQUENCY.limit(value)
    }

    /// Returns how often the global aging sweep considers running.
    #[must_use]
    pub fn aging_frequency(&self) -> Duration {
        self.aging_frequency
    }

    /// Sets the ceiling of the dynamic idle-time threshold.
    ///
    /// The value has to be at least one hour and the default is one week.
    pub fn set_max_idle(&mut self, value: Duration) {
        self.max_idle = MAX_IDLE.limit(value)
    }

    /// Returns the ceiling of the dynamic idle-time threshold.
    #[must_use]
    pub fn max_idle(&self) -> Duration {
        self.max_idle
    }

    /// Sets the floor of the dynamic idle-time threshold.
    ///
    /// The value has to be at least 60 seconds, at most one hour, and the
    /// default is five minutes.
    pub fn set_min_idle(&mut self, value: Duration) {
        self.min_idle = MIN_IDLE.limit(value)
    }

    /// Returns the floor of the dynamic idle-time threshold.
    #[must_use]
    pub fn min_idle(&self) -> Duration {
        self.min_idle
    }

    /// Sets the per-name aging reserve.
    ///
    /// Names referenced more recently than this are never aged. The value
    /// has to be at least one second, at most one hour, and the default
    /// is five minutes.
    pub fn set_reserve_idle(&mut self, value: Duration) {
        self.reserve_idle = RESERVE_IDLE.limit(value)
    }

    /// Returns the per-name aging reserve.
    #[must_use]
    pub fn reserve_idle(&self) -> Duration {
        self.reserve_idle
    }

    /// Sets the TTL floor for records learned from the network.
    ///
    /// The value has to be at least one second, at most one hour, and the
    /// default is two minutes.
    pub fn set_min_ttl(&mut self, value: Ttl) {
        self.min_ttl = MIN_TTL.limit(value)
    }

    /// Returns the TTL floor for records learned from the network.
    #[must_use]
    pub fn min_ttl(&self) -> Ttl {
        self.min_ttl
    }

    /// Sets the TTL substituted for records below the floor.
    ///
    /// The value has to be at least one minute, at most one day, and the
    /// default is ten minutes.
    pub fn set_default_ttl(&mut self, value: Ttl) {
        self.default_ttl = DEFAULT_TTL.limit(value)
    }

    /// Returns the TTL substituted for records below the floor.
    #[must_use]
    pub fn default_ttl(&self) -> Ttl {
        self.default_ttl
    }

    /// Sets the effective TTL of database records.
    ///
    /// The value has to be at least one day and the default is one year.
    pub fn set_db_ttl(&mut self, value: Ttl) {
        self.db_ttl = DB_TTL.limit(value)
    }

    /// Returns the effective TTL of database records.
    #[must_use]
    pub fn db_ttl(&self) -> Ttl {
        self.db_ttl
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_dn_count: TARGET_DN_COUNT.default(),
            aging_frequency: AGING_FREQUENCY.default(),
            max_idle: MAX_IDLE.default(),
            min_idle: MIN_IDLE.default(),
            reserve_idle: RESERVE_IDLE.default(),
            min_ttl: MIN_TTL.default(),
            default_ttl: DEFAULT_TTL.default(),
            db_ttl: DB_TTL.default(),
        }
    }
}

//============ Tests =========================================================

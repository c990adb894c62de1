//! The resolver cache.
//!
//! This module implements the in-memory database of domain names and
//! their resource records that answers repeated queries without going
//! back to the network. Names are interned once per class in a hash
//! table; each name owns a list of records kept grouped by type with
//! authoritative entries first. An adaptive aging sweep bounds memory
//! use by evicting expired or idle records and reclaiming names nothing
//! references anymore.
//!
//! The [`Cache`] is an explicit object: create one at process start and
//! hand it to whoever needs it. All state sits behind a single mutex, so
//! individual operations serialize but stay lock-free for their callers'
//! purposes: lookups return deep copies that are safe to use without any
//! lock held.
//!
//! Worker tasks serving queries bracket their cache use with
//! [`get_activity`]/[`put_activity`]. The last worker to leave runs the
//! periodic maintenance alone: a refresh from configuration if one was
//! requested, followed by a non-forced aging sweep. This guarantees the
//! sweep never observes an operation mid-flight.
//!
//! ```
//! use dncache::base::{Class, Name, Rtype, Ttl};
//! use dncache::cache::{Cache, LookupFlags, Record, RecordData};
//!
//! let cache = Cache::new();
//! let name: Name = "host.example".parse().unwrap();
//! let dn = cache.dn_lookup(&name, Class::IN, true).unwrap();
//! cache.rr_attach(
//!     vec![Record::new(
//!         dn,
//!         Class::IN,
//!         Ttl::from_secs(300),
//!         RecordData::A([192, 0, 2, 1].into()),
//!     )],
//!     true,
//! );
//! let answer = cache.rr_lookup(dn, Rtype::A, LookupFlags::default());
//! assert_eq!(answer.len(), 1);
//! ```
//!
//! [`get_activity`]: Cache::get_activity
//! [`put_activity`]: Cache::put_activity

use parking_lot::Mutex;
use std::io;
use std::net::Ipv4Addr;
use std::time::Duration;

use crate::base::{Class, Name, NameError, Rtype, Ttl};

pub use self::clock::{Clock, FakeClock, SystemClock, Timestamp};
pub use self::config::Config;
pub use self::lookup::LookupFlags;
pub use self::record::{Payload, Record, RecordData, Soa};
pub use self::table::DnHandle;

mod aging;
mod clock;
mod config;
mod dump;
mod gate;
mod lookup;
mod merge;
mod record;
mod table;

use self::gate::ActivityGate;
use self::table::DnTable;

//------------ CacheStats ----------------------------------------------------

/// Aggregate counters of a cache.
#[derive(Clone, Copy, Debug, Default)]
pub struct CacheStats {
    /// Number of record lookups.
    pub lookups: u64,

    /// Number of lookups that produced at least one record.
    pub hits: u64,

    /// Number of records offered to the merge engine.
    pub attaches: u64,

    /// Number of records the merge engine collapsed into existing ones.
    pub merges: u64,

    /// Number of records dropped by the anti-spoofing policy.
    pub policy_drops: u64,

    /// Number of records evicted, by merging or aging.
    pub evicted_records: u64,

    /// Number of names reclaimed by sweeps.
    pub freed_names: u64,

    /// Number of sweeps that ran their three passes.
    pub sweeps: u64,
}

//------------ Zone ----------------------------------------------------------

/// A locally served zone.
#[derive(Clone, Debug)]
struct Zone {
    /// The apex of the zone.
    apex: Name,

    /// The zone's minimum TTL, applied when promoting database records.
    min_ttl: Ttl,
}

//------------ CacheInner ----------------------------------------------------

/// Everything behind the cache lock.
struct CacheInner {
    /// The domain name table.
    table: DnTable,

    /// The current "oldest acceptable idle time".
    ///
    /// Halves while the table is over target, relaxes to the configured
    /// ceiling when under.
    threshold: Duration,

    /// When the next scheduled sweep is due.
    next_sweep: Timestamp,

    /// The locally served zones.
    zones: Vec<Zone>,

    /// Aggregate counters.
    stats: CacheStats,

    /// The configuration.
    config: Config,
}

impl CacheInner {
    /// Creates the state for a fresh cache.
    fn new(config: Config) -> Self {
        CacheInner {
            table: DnTable::new(),
            threshold: config.max_idle(),
            next_sweep: Timestamp::ZERO,
            zones: Vec::new(),
            stats: CacheStats::default(),
            config,
        }
    }

    /// Returns the served zone containing the name, if any.
    fn zone_of(&self, handle: DnHandle) -> Option<&Zone> {
        let entry = self.table.get(handle)?;
        self.zones
            .iter()
            .find(|zone| entry.name.is_subdomain_of(&zone.apex))
    }
}

//------------ Cache ---------------------------------------------------------

/// The type of the optional refresh hook.
///
/// Called during the exclusive maintenance pass when a refresh was
/// requested, before the sweep and without the cache lock held. The hook
/// typically re-attaches the static configuration; if it uses the
/// activity gate itself it must enter recursively.
type RefreshHook<C> = Box<dyn Fn(&Cache<C>) + Send + Sync>;

/// An in-memory resolver cache.
///
/// Generic over its time source so aging can be tested deterministically;
/// production use wants the default [`SystemClock`].
pub struct Cache<C: Clock = SystemClock> {
    /// Everything behind the cache lock.
    inner: Mutex<CacheInner>,

    /// The activity gate.
    gate: ActivityGate,

    /// The time source.
    clock: C,

    /// Runs during the exclusive pass when a refresh was requested.
    refresh_hook: Mutex<Option<RefreshHook<C>>>,
}

impl Cache<SystemClock> {
    /// Creates a cache with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Config::new())
    }

    /// Creates a cache with the given configuration.
    #[must_use]
    pub fn with_config(config: Config) -> Self {
        Self::with_clock(config, SystemClock::new())
    }
}

impl Default for Cache<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> Cache<C> {
    /// Creates a cache with the given configuration and time source.
    #[must_use]
    pub fn with_clock(config: Config, clock: C) -> Self {
        Cache {
            inner: Mutex::new(CacheInner::new(config)),
            gate: ActivityGate::new(),
            clock,
            refresh_hook: Mutex::new(None),
        }
    }

    /// Returns the cache's time source.
    #[must_use]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Registers a zone this server is authoritative for.
    ///
    /// Non-database records for names inside a served zone are rejected
    /// on attach, and [`auth_db`] promotes the zone's database records
    /// using `min_ttl` as the TTL floor.
    ///
    /// [`auth_db`]: Self::auth_db
    pub fn add_zone(&self, apex: Name, min_ttl: Ttl) {
        self.inner.lock().zones.push(Zone { apex, min_ttl });
    }

    //--- The domain name table

    /// Looks up a name, optionally interning it.
    ///
    /// Returns `None` only on a miss without `create`. A hit counts as a
    /// reference for aging purposes.
    pub fn dn_lookup(
        &self,
        name: &Name,
        class: Class,
        create: bool,
    ) -> Option<DnHandle> {
        let now = self.clock.now();
        self.inner.lock().table.lookup(name, class, create, now)
    }

    /// Looks up a possibly internationalized name.
    ///
    /// The name is converted to its internal representation first.
    pub fn idn_lookup(
        &self,
        name: &str,
        class: Class,
        create: bool,
    ) -> Result<Option<DnHandle>, NameError> {
        let name = Name::from_idn(name)?;
        Ok(self.dn_lookup(&name, class, create))
    }

    /// Returns the name behind a handle, if it is still cached.
    #[must_use]
    pub fn name_of(&self, dn: DnHandle) -> Option<Name> {
        self.inner.lock().table.get(dn).map(|entry| entry.name.clone())
    }

    /// Returns the number of live names.
    #[must_use]
    pub fn live_names(&self) -> usize {
        self.inner.lock().table.live()
    }

    //--- Records

    /// Attaches a batch of records to their owners.
    ///
    /// Ownership of the records moves into the cache; duplicates are
    /// merged, records for spoofed zones silently dropped. With
    /// `authoritative` every attached record is marked authoritative.
    pub fn rr_attach(&self, records: Vec<Record>, authoritative: bool) {
        let now = self.clock.now();
        self.inner.lock().attach(records, authoritative, now);
    }

    /// Looks up records of a type on a name.
    ///
    /// The returned records are deep copies owned by the caller and safe
    /// to use without any lock held.
    pub fn rr_lookup(
        &self,
        dn: DnHandle,
        qtype: Rtype,
        flags: LookupFlags,
    ) -> Vec<Record> {
        let now = self.clock.now();
        self.inner.lock().lookup(dn, qtype, flags, now)
    }

    //--- Aging

    /// Runs the global aging sweep.
    ///
    /// With `force` the cheap no-op path is skipped. The caller must
    /// guarantee no other cache operation is mid-flight, which is what
    /// the activity gate does for the periodic case.
    pub fn age_all(&self, force: bool) {
        let now = self.clock.now();
        self.inner.lock().age_all(force, now);
    }

    /// Pins a name and everything it transitively references.
    pub fn never_age(&self, dn: DnHandle) {
        self.inner.lock().never_age(dn);
    }

    /// Prepares for a database reload by force-expiring database records.
    pub fn age_db(&self) {
        self.inner.lock().age_db();
    }

    /// Promotes database records of served zones to authoritative.
    pub fn auth_db(&self) {
        self.inner.lock().auth_db();
    }

    //--- The activity gate

    /// Enters the activity gate before using the cache.
    ///
    /// Blocks while an exclusive maintenance pass is running unless
    /// `recursive` says this caller is already inside the gate. Returns
    /// the new number of active callers.
    pub fn get_activity(&self, recursive: bool) -> usize {
        self.gate.enter(recursive)
    }

    /// Leaves the activity gate.
    ///
    /// The last caller out runs the maintenance pass: the refresh hook
    /// if a refresh was requested, then a non-forced sweep.
    pub fn put_activity(&self, recursive: bool) {
        if let Some(refresh) = self.gate.leave(recursive) {
            if refresh {
                if let Some(hook) = self.refresh_hook.lock().as_ref() {
                    hook(self);
                }
            }
            self.age_all(false);
            self.gate.release();
        }
    }

    /// Requests a refresh from configuration.
    ///
    /// The refresh hook runs during the next exclusive maintenance pass.
    pub fn request_refresh(&self) {
        self.gate.request_refresh();
    }

    /// Sets the hook run by a requested refresh.
    pub fn set_refresh_hook<F>(&self, hook: F)
    where
        F: Fn(&Cache<C>) + Send + Sync + 'static,
    {
        *self.refresh_hook.lock() = Some(Box::new(hook));
    }

    //--- Operational tooling

    /// Returns a snapshot of the aggregate counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.inner.lock().stats
    }

    /// Writes a text snapshot of the whole table.
    pub fn dump<W: io::Write>(&self, target: &mut W) -> io::Result<()> {
        let now = self.clock.now();
        self.inner.lock().dump(target, now)
    }

    /// Writes the aggregate counters.
    pub fn write_stats<W: io::Write>(
        &self,
        target: &mut W,
    ) -> io::Result<()> {
        self.inner.lock().write_stats(target)
    }

    /// Synthesizes PTR records for every cached address in a network.
    ///
    /// For each cached A record whose address matches `net` under `mask`,
    /// a database PTR record for `<d>.<c>.<b>.<a>.<suffix>` pointing at
    /// the A record's owner is attached.
    pub fn synthesize_ptrs(
        &self,
        net: Ipv4Addr,
        mask: Ipv4Addr,
        suffix: &Name,
    ) {
        let matches: Vec<(Ipv4Addr, DnHandle)> = {
            let inner = self.inner.lock();
            let mut matches = Vec::new();
            for handle in inner.table.handles() {
                let Some(entry) = inner.table.get(handle) else {
                    continue;
                };
                for rr in &entry.records {
                    if let Some(&RecordData::A(addr)) = rr.data() {
                        if u32::from(addr) & u32::from(mask)
                            == u32::from(net) & u32::from(mask)
                        {
                            matches.push((addr, handle));
                        }
                    }
                }
            }
            matches
        };

        let ttl = self.inner.lock().config.default_ttl();
        for (addr, target) in matches {
            let octets = addr.octets();
            let reverse = format!(
                "{}.{}.{}.{}.{}",
                octets[3], octets[2], octets[1], octets[0], suffix
            );
            let Ok(reverse) = Name::from_ascii(&reverse) else {
                continue;
            };
            let Some(owner) = self.dn_lookup(&reverse, Class::IN, true)
            else {
                continue;
            };
            let mut rr =
                Record::new(owner, Class::IN, ttl, RecordData::Ptr(target));
            rr.set_db(true);
            self.rr_attach(vec![rr], false);
        }
    }
}

//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;
    use crate::base::Rcode;
    use rstest::rstest;

    fn cache() -> Cache<FakeClock> {
        Cache::with_clock(Config::new(), FakeClock::new())
    }

    fn name(name: &str) -> Name {
        name.parse().unwrap()
    }

    fn intern(cache: &Cache<FakeClock>, dn: &str) -> DnHandle {
        cache.dn_lookup(&name(dn), Class::IN, true).unwrap()
    }

    fn a_record(owner: DnHandle, ttl: u64, addr: [u8; 4]) -> Record {
        Record::new(
            owner,
            Class::IN,
            Ttl::from_secs(ttl as u32),
            RecordData::A(addr.into()),
        )
    }

    #[test]
    fn interning_is_case_insensitive() {
        let cache = cache();
        let first = intern(&cache, "Host.Example");
        let again = cache
            .dn_lookup(&name("host.example"), Class::IN, false)
            .unwrap();
        assert_eq!(first, again);
        assert_eq!(cache.live_names(), 1);
        assert!(cache
            .dn_lookup(&name("host.example"), Class::CH, false)
            .is_none());
    }

    #[rstest]
    #[case(300, 3600, 3660)] // the re-attached copy expires later
    #[case(3600, 300, 3600)] // the cached copy expires later
    fn duplicate_keeps_later_expiry(
        #[case] first_ttl: u64,
        #[case] second_ttl: u64,
        #[case] surviving_expire: u64,
    ) {
        let cache = cache();
        let dn = intern(&cache, "host.example");
        cache.rr_attach(vec![a_record(dn, first_ttl, [192, 0, 2, 1])], false);
        cache.clock().adjust_time(Duration::from_secs(60));
        cache.rr_attach(vec![a_record(dn, second_ttl, [192, 0, 2, 1])], false);

        let answer =
            cache.rr_lookup(dn, Rtype::A, LookupFlags::default());
        assert_eq!(answer.len(), 1);
        assert_eq!(
            answer[0].expire(),
            Timestamp::from_secs(surviving_expire)
        );
        assert_eq!(cache.stats().merges, 1);
    }

    #[test]
    fn negative_displaces_positive() {
        let cache = cache();
        let dn = intern(&cache, "gone.example");
        cache.rr_attach(vec![a_record(dn, 300, [192, 0, 2, 1])], false);
        cache.rr_attach(
            vec![Record::negative(
                dn,
                Class::IN,
                Rtype::A,
                Ttl::from_secs(300),
                Rcode::NXDOMAIN,
                None,
            )],
            false,
        );

        let answer =
            cache.rr_lookup(dn, Rtype::A, LookupFlags::default());
        assert_eq!(answer.len(), 1);
        assert!(answer[0].is_negative());
        assert_eq!(answer[0].rcode(), Some(Rcode::NXDOMAIN));
        assert_eq!(cache.stats().evicted_records, 1);
    }

    #[test]
    fn no_negative_short_circuits() {
        let cache = cache();
        let dn = intern(&cache, "gone.example");
        // A database record would answer at a lower tier, but the fresh
        // negative above it must suppress the whole lookup.
        let mut db = a_record(dn, 300, [192, 0, 2, 1]);
        db.set_db(true);
        cache.rr_attach(vec![db], false);
        cache.rr_attach(
            vec![Record::negative(
                dn,
                Class::IN,
                Rtype::A,
                Ttl::from_secs(300),
                Rcode::NXDOMAIN,
                None,
            )],
            false,
        );

        let negated = cache.rr_lookup(
            dn,
            Rtype::A,
            LookupFlags { no_negative: true },
        );
        assert!(negated.is_empty());

        let served =
            cache.rr_lookup(dn, Rtype::A, LookupFlags::default());
        assert_eq!(served.len(), 1);
        assert!(served[0].is_negative());
    }

    #[test]
    fn lookup_prefers_authoritative_database_data() {
        let cache = cache();
        let dn = intern(&cache, "host.example");
        cache.rr_attach(vec![a_record(dn, 300, [192, 0, 2, 1])], false);
        let mut db = a_record(dn, 300, [192, 0, 2, 2]);
        db.set_db(true);
        cache.rr_attach(vec![db], true);

        let answer =
            cache.rr_lookup(dn, Rtype::A, LookupFlags::default());
        assert_eq!(answer.len(), 1);
        assert!(answer[0].is_db() && answer[0].is_auth());
        assert_eq!(
            answer[0].data(),
            Some(&RecordData::A([192, 0, 2, 2].into()))
        );
    }

    #[test]
    fn any_query_spans_types() {
        let cache = cache();
        let dn = intern(&cache, "host.example");
        let ns = intern(&cache, "ns.example");
        cache.rr_attach(
            vec![
                a_record(dn, 300, [192, 0, 2, 1]),
                Record::new(
                    dn,
                    Class::IN,
                    Ttl::from_secs(300),
                    RecordData::Ns(ns),
                ),
                Record::new(
                    dn,
                    Class::IN,
                    Ttl::from_secs(300),
                    RecordData::Mx {
                        preference: 10,
                        exchange: ns,
                    },
                ),
            ],
            false,
        );

        let answer =
            cache.rr_lookup(dn, Rtype::ANY, LookupFlags::default());
        assert_eq!(answer.len(), 3);
    }

    #[test]
    fn stale_record_served_as_last_resort() {
        let cache = cache();
        let dn = intern(&cache, "host.example");
        cache.rr_attach(vec![a_record(dn, 300, [192, 0, 2, 1])], false);
        cache.clock().adjust_time(Duration::from_secs(301));

        let answer =
            cache.rr_lookup(dn, Rtype::A, LookupFlags::default());
        assert_eq!(answer.len(), 1);
        assert!(answer[0].is_expired(cache.clock().now()));
    }

    #[test]
    fn ptr_records_keep_interning_order() {
        let cache = cache();
        let reverse = intern(&cache, "1.2.0.192.in-addr.arpa");
        let first = intern(&cache, "first.example");
        let second = intern(&cache, "second.example");
        // Attach in reverse interning order; the lookup must still see
        // the earlier-interned target first.
        cache.rr_attach(
            vec![Record::new(
                reverse,
                Class::IN,
                Ttl::from_secs(300),
                RecordData::Ptr(second),
            )],
            false,
        );
        cache.rr_attach(
            vec![Record::new(
                reverse,
                Class::IN,
                Ttl::from_secs(300),
                RecordData::Ptr(first),
            )],
            false,
        );

        let answer =
            cache.rr_lookup(reverse, Rtype::PTR, LookupFlags::default());
        assert_eq!(answer.len(), 2);
        assert_eq!(answer[0].data(), Some(&RecordData::Ptr(first)));
        assert_eq!(answer[1].data(), Some(&RecordData::Ptr(second)));
    }

    #[test]
    fn served_zone_rejects_network_records() {
        let cache = cache();
        cache.add_zone(name("example"), Ttl::from_hours(1));
        let dn = intern(&cache, "www.example");
        cache.rr_attach(vec![a_record(dn, 300, [192, 0, 2, 66])], false);
        assert!(cache
            .rr_lookup(dn, Rtype::A, LookupFlags::default())
            .is_empty());
        assert_eq!(cache.stats().policy_drops, 1);

        // Database records for the zone are fine.
        let mut db = a_record(dn, 300, [192, 0, 2, 1]);
        db.set_db(true);
        cache.rr_attach(vec![db], false);
        assert_eq!(
            cache.rr_lookup(dn, Rtype::A, LookupFlags::default()).len(),
            1
        );
    }

    #[test]
    fn lookup_results_are_detached_copies() {
        let cache = cache();
        let dn = intern(&cache, "host.example");
        cache.rr_attach(vec![a_record(dn, 300, [192, 0, 2, 1])], false);
        let answer =
            cache.rr_lookup(dn, Rtype::A, LookupFlags::default());
        assert!(!answer[0].is_cached());
        // Dropping the copy must not disturb the cached original.
        drop(answer);
        assert_eq!(
            cache.rr_lookup(dn, Rtype::A, LookupFlags::default()).len(),
            1
        );
    }
}

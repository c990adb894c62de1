//! Aging out stale records and reclaiming unreferenced names.
//!
//! Memory use is bounded by two cooperating mechanisms: incremental
//! per-name aging that drops expired or long-idle network records, and a
//! periodic global sweep that additionally reclaims names no surviving
//! record references. The sweep adapts an idle-time threshold: while the
//! table is over its target size the threshold halves, making subsequent
//! aging more aggressive; once the table is back under target it relaxes
//! to its ceiling again.
//!
//! The sweep runs in three strict passes over the whole table. A record
//! evicted by pass 1 must not pin its targets in pass 2, so pass 1
//! finishes everywhere before pass 2 starts, and likewise for pass 3.

use std::cmp;

use tracing::{debug, trace};

use super::clock::Timestamp;
use super::table::{DnHandle, MARK_NEVER_AGE, MARK_REACHABLE};
use super::CacheInner;

impl CacheInner {
    /// Incrementally ages a single name.
    ///
    /// Does nothing for recently referenced or pinned names. Otherwise
    /// every network record that has expired, or that has been idle
    /// longer than the current threshold, is evicted. Database records
    /// are never touched here.
    pub(super) fn age_dn(&mut self, handle: DnHandle, now: Timestamp) {
        let threshold = self.threshold;
        let reserve = self.config.reserve_idle();
        let Some(entry) = self.table.get_mut(handle) else {
            return;
        };
        let idle = now.duration_since(entry.referenced);
        if idle < reserve || entry.mark & MARK_NEVER_AGE != 0 {
            return;
        }
        let stale = idle > threshold;
        let before = entry.records.len();
        entry.records.retain_mut(|rr| {
            if !rr.is_db() && (rr.is_expired(now) || stale) {
                rr.set_cached(false);
                false
            } else {
                true
            }
        });
        let evicted = before - entry.records.len();
        if evicted > 0 {
            trace!(
                name = entry.name.as_str(),
                evicted,
                "aged out network records"
            );
            self.stats.evicted_records += evicted as u64;
        }
    }

    /// Runs the global aging sweep.
    ///
    /// Must only be called when no other cache operation is mid-flight;
    /// the activity gate establishes that for the periodic case.
    pub(super) fn age_all(&mut self, force: bool, now: Timestamp) {
        let target = self.config.target_dn_count();
        if !force && self.table.live() < target && now < self.next_sweep {
            // Plenty of room and not due yet: relax the threshold and
            // be done.
            self.threshold = self.config.max_idle();
            return;
        }

        if self.table.live() > target {
            self.threshold =
                cmp::max(self.threshold / 2, self.config.min_idle());
        } else {
            self.threshold = self.config.max_idle();
        }
        self.next_sweep = now
            + cmp::min(self.config.aging_frequency(), self.threshold / 2);

        let handles = self.table.handles();

        // Pass 1: clear the transient marks and age every name.
        for &handle in &handles {
            if let Some(entry) = self.table.get_mut(handle) {
                entry.mark &= !MARK_REACHABLE;
            }
            self.age_dn(handle, now);
        }

        // Pass 2: every surviving record pins the names it references.
        let mut reachable = Vec::new();
        for &handle in &handles {
            if let Some(entry) = self.table.get(handle) {
                for rr in &entry.records {
                    rr.for_each_dn_ref(|target| reachable.push(target));
                }
            }
        }
        for target in reachable {
            if let Some(entry) = self.table.get_mut(target) {
                entry.mark |= MARK_REACHABLE;
            }
        }

        // Pass 3: reclaim names with no records, no references and no
        // pin.
        let mut freed = 0u64;
        for &handle in &handles {
            let Some(entry) = self.table.get(handle) else {
                continue;
            };
            if entry.records.is_empty()
                && entry.mark & (MARK_REACHABLE | MARK_NEVER_AGE) == 0
            {
                self.table.remove(handle);
                freed += 1;
            }
        }
        self.stats.freed_names += freed;
        self.stats.sweeps += 1;
        debug!(
            live = self.table.live(),
            freed,
            threshold = self.threshold.as_secs(),
            "aging sweep finished"
        );
    }

    /// Pins a name and everything it transitively references.
    ///
    /// Pinned names survive every sweep until a database reload clears
    /// the marks. The walk uses the same reference edges as the sweep's
    /// reachability pass but a different, persistent mark bit.
    pub(super) fn never_age(&mut self, handle: DnHandle) {
        let mut work = vec![handle];
        while let Some(current) = work.pop() {
            let Some(entry) = self.table.get_mut(current) else {
                continue;
            };
            if entry.mark & MARK_NEVER_AGE != 0 {
                continue;
            }
            entry.mark |= MARK_NEVER_AGE;
            let entry = self.table.entry(current);
            for rr in &entry.records {
                rr.for_each_dn_ref(|target| work.push(target));
            }
        }
    }

    /// Prepares the cache for a database reload.
    ///
    /// Clears all marks and force-expires every database record so the
    /// reload's attach pass cleanly supersedes the stale configuration.
    pub(super) fn age_db(&mut self) {
        for handle in self.table.handles() {
            let Some(entry) = self.table.get_mut(handle) else {
                continue;
            };
            entry.mark = 0;
            for rr in &mut entry.records {
                if rr.is_db() {
                    rr.set_expire(Timestamp::ZERO);
                }
            }
        }
    }

    /// Promotes database records of locally served zones.
    ///
    /// One scan, interleaved per record: a database record still carrying
    /// the forced-expiry sentinel is evicted; any other database record
    /// gets its TTL raised to the zone's minimum and becomes
    /// authoritative.
    pub(super) fn auth_db(&mut self) {
        let zones = self.zones.clone();
        let mut evicted = 0u64;
        for handle in self.table.handles() {
            let Some(entry) = self.table.get(handle) else {
                continue;
            };
            let Some(zone) =
                zones.iter().find(|z| entry.name.is_subdomain_of(&z.apex))
            else {
                continue;
            };
            let min_ttl = zone.min_ttl;
            let entry = self.table.entry_mut(handle);
            let mut pos = 0;
            while pos < entry.records.len() {
                if entry.records[pos].is_db() {
                    if entry.records[pos].expire() == Timestamp::ZERO {
                        let mut rr = entry.records.remove(pos);
                        rr.set_cached(false);
                        evicted += 1;
                        continue;
                    }
                    let rr = &mut entry.records[pos];
                    rr.set_ttl(rr.ttl().max(min_ttl));
                    rr.set_auth(true);
                }
                pos += 1;
            }
        }
        self.stats.evicted_records += evicted;
    }
}

//! Attaching records to cached names.
//!
//! This is where the record list invariants are enforced: lists stay
//! grouped by type, authoritative entries precede non-authoritative ones
//! within a group, a negative answer drives out its positive counterpart
//! of the same provenance and vice versa, and of two copies of the same
//! answer the one expiring later survives.

use tracing::trace;

use super::clock::Timestamp;
use super::record::{Record, RecordData};
use super::CacheInner;
use crate::base::Rtype;

impl CacheInner {
    /// Attaches a batch of records under one lock acquisition.
    ///
    /// Non-database records claiming a name inside a locally served zone
    /// are silently dropped: an external responder must not be able to
    /// override authoritative local data.
    pub(super) fn attach(
        &mut self,
        records: Vec<Record>,
        authoritative: bool,
        now: Timestamp,
    ) {
        for rr in records {
            if self.table.get(rr.owner()).is_none() {
                // The owner was swept while the caller prepared the
                // record. Nothing to attach it to.
                rr.free();
                continue;
            }
            if !rr.is_db() && self.zone_of(rr.owner()).is_some() {
                trace!(
                    owner = self.dn_name(rr.owner()),
                    rtype = %rr.rtype(),
                    "dropping spoofed record for served zone"
                );
                self.stats.policy_drops += 1;
                rr.free();
                continue;
            }
            self.attach_one(rr, authoritative, now);
        }
    }

    /// Merges a single record into its owner's list.
    pub(super) fn attach_one(
        &mut self,
        mut rr: Record,
        authoritative: bool,
        now: Timestamp,
    ) {
        assert!(!rr.is_cached(), "attempt to attach a cached record");
        self.stats.attaches += 1;
        if authoritative {
            rr.set_auth(true);
        }

        // Database records are effectively permanent whatever TTL they
        // claim. Network records get a floor so a record cannot expire
        // before the query that caused us to fetch it has been answered.
        let ttl = if rr.is_db() {
            self.config.db_ttl()
        } else if rr.ttl() < self.config.min_ttl() {
            self.config.default_ttl()
        } else {
            rr.ttl()
        };
        if !rr.is_db() {
            rr.set_ttl(ttl);
        }
        rr.set_expire(now + ttl);

        let owner = rr.owner();
        let mut list = self.table.take_records(owner);

        // The list is grouped by type; find the start of our group or,
        // for a type not yet present, the end of the list.
        let mut pos = list
            .iter()
            .position(|ex| ex.rtype() == rr.rtype())
            .unwrap_or(list.len());

        while pos < list.len() && list[pos].rtype() == rr.rtype() {
            let ex = &list[pos];
            if ex.is_db() == rr.is_db() && ex.is_auth() == rr.is_auth() {
                if ex.is_negative() != rr.is_negative() {
                    // Negative drives out positive and vice versa. Do
                    // not advance: re-check whatever took this slot.
                    let old = evict_at(&mut list, pos);
                    trace!(
                        owner = self.dn_name(owner),
                        rtype = %old.rtype(),
                        "negative/positive record displaced"
                    );
                    self.stats.evicted_records += 1;
                    continue;
                }
                if ex.is_equivalent(&rr) {
                    // The same answer twice: the later expiry wins.
                    if ex.expire() >= rr.expire() {
                        self.table.put_records(owner, list);
                        self.stats.merges += 1;
                        rr.free();
                        return;
                    }
                    evict_at(&mut list, pos);
                    self.stats.merges += 1;
                    continue;
                }
            }
            // An authoritative record goes in front of the group's
            // non-authoritative tail.
            if rr.is_auth() && !ex.is_auth() {
                break;
            }
            // Positive PTR records keep the interning order of their
            // targets.
            if rr.rtype() == Rtype::PTR
                && !rr.is_negative()
                && !ex.is_negative()
            {
                if let (Some(existing), Some(incoming)) =
                    (self.ptr_ordinal(ex), self.ptr_ordinal(&rr))
                {
                    if existing > incoming {
                        break;
                    }
                }
            }
            pos += 1;
        }

        list.insert(pos, rr);
        list[pos].set_cached(true);

        // If the merge above worked, nothing equal can follow the new
        // record. Finding one means the list was already corrupt.
        for follower in &list[pos + 1..] {
            if follower.rtype() != list[pos].rtype() {
                break;
            }
            assert!(
                !list[pos].is_duplicate(follower),
                "record cache corrupt: duplicate record survived merge"
            );
        }

        self.table.put_records(owner, list);
    }

    /// Returns the interning ordinal of a positive PTR record's target.
    fn ptr_ordinal(&self, rr: &Record) -> Option<u64> {
        match rr.data() {
            Some(&RecordData::Ptr(target)) => {
                self.table.get(target).map(|entry| entry.ordinal)
            }
            _ => None,
        }
    }
}

/// Removes the record at `pos`, unlinking it properly.
fn evict_at(list: &mut Vec<Record>, pos: usize) -> Record {
    let mut rr = list.remove(pos);
    rr.set_cached(false);
    rr
}

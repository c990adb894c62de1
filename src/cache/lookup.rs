//! Answering queries from the cache.
//!
//! A lookup walks the owner's record list through a cascade of priority
//! tiers and returns deep copies of everything the first non-empty tier
//! holds. Copies, never references: the cache's own records must not be
//! aliased outside the lock, which is what makes the result safe to use
//! lock-free afterwards.

use super::clock::Timestamp;
use super::record::Record;
use super::table::DnHandle;
use super::CacheInner;
use crate::base::Rtype;

//------------ LookupFlags ---------------------------------------------------

/// Options of a record lookup.
#[derive(Clone, Copy, Debug, Default)]
pub struct LookupFlags {
    /// Do not answer with cached negative entries.
    ///
    /// If the best available answer is a negative one the lookup returns
    /// nothing at all rather than falling through to worse tiers.
    pub no_negative: bool,
}

/// The priority tiers of the lookup cascade, best first.
///
/// Database-and-authoritative data beats fresh authoritative network
/// data, beats any fresh network data, beats non-authoritative database
/// data, beats whatever is left.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Tier {
    DbAuth,
    NetAuth,
    Net,
    DbPlain,
    Any,
}

/// All tiers in cascade order.
const CASCADE: [Tier; 5] =
    [Tier::DbAuth, Tier::NetAuth, Tier::Net, Tier::DbPlain, Tier::Any];

impl Tier {
    /// Returns whether the record belongs to this tier.
    fn admits(self, rr: &Record, now: Timestamp) -> bool {
        match self {
            Tier::DbAuth => rr.is_db() && rr.is_auth(),
            Tier::NetAuth => {
                !rr.is_db() && rr.is_auth() && !rr.is_expired(now)
            }
            Tier::Net => !rr.is_db() && !rr.is_expired(now),
            Tier::DbPlain => rr.is_db() && !rr.is_auth(),
            Tier::Any => true,
        }
    }

    /// Returns whether the negative short-circuit rule applies here.
    fn short_circuits_negatives(self) -> bool {
        matches!(self, Tier::NetAuth | Tier::Net)
    }
}

impl CacheInner {
    /// Looks up records of a type on a name.
    ///
    /// Returns caller-owned copies of all records of the first non-empty
    /// tier, deduplicated by equivalence keeping the first occurrence. A
    /// query for [`Rtype::ANY`] matches every stored type.
    pub(super) fn lookup(
        &mut self,
        dn: DnHandle,
        qtype: Rtype,
        flags: LookupFlags,
        now: Timestamp,
    ) -> Vec<Record> {
        self.stats.lookups += 1;
        let Some(entry) = self.table.get(dn) else {
            return Vec::new();
        };

        let mut found = Vec::new();
        for tier in CASCADE {
            for rr in &entry.records {
                if !rr.rtype().answers(qtype) || !tier.admits(rr, now) {
                    continue;
                }
                if rr.is_negative() {
                    if flags.no_negative && tier.short_circuits_negatives() {
                        if found.is_empty() {
                            // The best data we have denies the name
                            // exists; do not fall through to worse
                            // tiers looking for a stale positive.
                            return Vec::new();
                        }
                        continue;
                    }
                    if tier == Tier::Any {
                        // The last resort never serves negative-only
                        // leftovers.
                        return Vec::new();
                    }
                }
                found.push(rr.copy_detached());
            }
            if !found.is_empty() {
                break;
            }
        }

        let mut result: Vec<Record> = Vec::with_capacity(found.len());
        for rr in found {
            if !result.iter().any(|kept| kept.is_equivalent(&rr)) {
                result.push(rr);
            }
        }
        if !result.is_empty() {
            self.stats.hits += 1;
        }
        result
    }
}

//! The domain name table.
//!
//! Every name the cache knows is interned exactly once per class in this
//! table: a fixed array of hash buckets whose chains hold handles into a
//! generationed slot arena. The arena replaces the raw node pointers of
//! the original design; a [`DnHandle`] can dangle after a sweep but can
//! never be dereferenced into a slot that has since been reused, because
//! the generation check catches it.
//!
//! Chains append at the tail so the traversal order of a bucket is the
//! interning order, which keeps the aging sweep deterministic.
//!
//! Everything here must run under the cache lock, including the update of
//! the `referenced` stamp on pure reads: that stamp is what the aging
//! machinery bases its eviction decisions on.

use super::clock::Timestamp;
use super::record::Record;
use crate::base::{Class, Name};

/// The number of hash buckets.
///
/// An implementation constant, not a contract. Prime, so the weak
/// rolling hash spreads a little better.
const NUM_BUCKETS: usize = 1009;

/// The name is reachable from a cached record this sweep.
///
/// Transient: recomputed by every sweep.
pub(super) const MARK_REACHABLE: u8 = 0b01;

/// The name is pinned and must never be aged out.
///
/// Persistent until a database reload clears all marks.
pub(super) const MARK_NEVER_AGE: u8 = 0b10;

//------------ DnHandle ------------------------------------------------------

/// A handle to an interned domain name.
///
/// Handles are only meaningful to the cache that issued them. They stay
/// valid as long as the name is alive; using a handle whose name has been
/// swept away is safe and behaves like a lookup miss.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct DnHandle {
    /// Index of the slot in the arena.
    index: u32,

    /// Generation the slot had when the handle was issued.
    generation: u32,
}

impl DnHandle {
    /// Creates a handle for record tests that never touch a table.
    #[cfg(test)]
    pub(crate) fn synthetic(index: u32) -> Self {
        DnHandle {
            index,
            generation: 0,
        }
    }
}

//------------ DnEntry -------------------------------------------------------

/// A live domain name and the records it owns.
pub(super) struct DnEntry {
    /// The interned name.
    pub(super) name: Name,

    /// The class of the name.
    pub(super) class: Class,

    /// When the name was last looked up.
    pub(super) referenced: Timestamp,

    /// GC mark bits.
    pub(super) mark: u8,

    /// Position in the global interning order.
    ///
    /// PTR records preserve the interning order of their targets during
    /// merge; this is the tie-break value that order is read from.
    pub(super) ordinal: u64,

    /// The records owned by this name, grouped by type, authoritative
    /// entries first within each group.
    pub(super) records: Vec<Record>,
}

//------------ Slot ----------------------------------------------------------

/// One arena slot.
struct Slot {
    /// Bumped every time the slot's entry is freed.
    generation: u32,

    /// The entry, if the slot is in use.
    entry: Option<DnEntry>,
}

//------------ DnTable -------------------------------------------------------

/// The hash table of all interned domain names.
pub(super) struct DnTable {
    /// The hash buckets, each a chain of handles in interning order.
    buckets: Vec<Vec<DnHandle>>,

    /// The slot arena.
    slots: Vec<Slot>,

    /// Indices of free slots.
    free: Vec<u32>,

    /// Number of live names.
    live: usize,

    /// The next interning ordinal.
    next_ordinal: u64,
}

impl DnTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        DnTable {
            buckets: (0..NUM_BUCKETS).map(|_| Vec::new()).collect(),
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            next_ordinal: 0,
        }
    }

    /// Returns the number of live names.
    pub fn live(&self) -> usize {
        self.live
    }

    /// The bucket index of a name.
    ///
    /// A case-insensitive rolling hash: `h = h * 13 + (lower(ch) - 'a')`
    /// in wrapping arithmetic, reduced modulo the bucket count.
    fn bucket_of(name: &Name) -> usize {
        let mut hash = 0u32;
        for ch in name.folded_bytes() {
            hash = hash
                .wrapping_mul(13)
                .wrapping_add((ch as u32).wrapping_sub('a' as u32));
        }
        hash as usize % NUM_BUCKETS
    }

    /// Looks up a name, optionally interning it.
    ///
    /// On a hit the `referenced` stamp is set to `now`. On a miss with
    /// `create` a fresh entry is appended to the tail of its bucket
    /// chain.
    pub fn lookup(
        &mut self,
        name: &Name,
        class: Class,
        create: bool,
        now: Timestamp,
    ) -> Option<DnHandle> {
        let bucket = Self::bucket_of(name);
        for &handle in &self.buckets[bucket] {
            let entry = self.slots[handle.index as usize]
                .entry
                .as_mut()
                .expect("bucket chain points at a free slot");
            if entry.class == class && entry.name == *name {
                entry.referenced = now;
                return Some(handle);
            }
        }
        if !create {
            return None;
        }
        let entry = DnEntry {
            name: name.clone(),
            class,
            referenced: now,
            mark: 0,
            ordinal: self.next_ordinal,
            records: Vec::new(),
        };
        self.next_ordinal += 1;
        let handle = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.entry = Some(entry);
                DnHandle {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = u32::try_from(self.slots.len())
                    .expect("domain name table overflow");
                self.slots.push(Slot {
                    generation: 0,
                    entry: Some(entry),
                });
                DnHandle {
                    index,
                    generation: 0,
                }
            }
        };
        self.buckets[bucket].push(handle);
        self.live += 1;
        Some(handle)
    }

    /// Returns the entry of a handle if it is still alive.
    pub fn get(&self, handle: DnHandle) -> Option<&DnEntry> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.entry.as_ref()
    }

    /// Returns the mutable entry of a handle if it is still alive.
    pub fn get_mut(&mut self, handle: DnHandle) -> Option<&mut DnEntry> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.entry.as_mut()
    }

    /// Returns the entry of a handle that is known to be alive.
    pub fn entry(&self, handle: DnHandle) -> &DnEntry {
        self.get(handle).expect("stale domain name handle")
    }

    /// Returns the mutable entry of a handle that is known to be alive.
    pub fn entry_mut(&mut self, handle: DnHandle) -> &mut DnEntry {
        self.get_mut(handle).expect("stale domain name handle")
    }

    /// Moves a name's record list out of the table.
    ///
    /// The merge engine works on the list while consulting other entries
    /// of the arena; the list must be put back with [`put_records`]
    /// before anything else touches the entry.
    ///
    /// [`put_records`]: Self::put_records
    pub fn take_records(&mut self, handle: DnHandle) -> Vec<Record> {
        std::mem::take(&mut self.entry_mut(handle).records)
    }

    /// Puts a record list taken with [`take_records`] back.
    ///
    /// [`take_records`]: Self::take_records
    pub fn put_records(&mut self, handle: DnHandle, records: Vec<Record>) {
        let entry = self.entry_mut(handle);
        debug_assert!(entry.records.is_empty());
        entry.records = records;
    }

    /// Unlinks a name from its bucket and frees its slot.
    ///
    /// Returns the entry. The caller is responsible for having emptied or
    /// otherwise dealt with the record list.
    pub fn remove(&mut self, handle: DnHandle) -> Option<DnEntry> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let entry = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.live -= 1;
        let bucket = Self::bucket_of(&entry.name);
        let chain = &mut self.buckets[bucket];
        let pos = chain
            .iter()
            .position(|&h| h == handle)
            .expect("entry missing from its bucket chain");
        chain.remove(pos);
        Some(entry)
    }

    /// Returns the handles of all live names in bucket traversal order.
    ///
    /// Materialized into a vector so the sweep can walk the table while
    /// mutating entries.
    pub fn handles(&self) -> Vec<DnHandle> {
        let mut out = Vec::with_capacity(self.live);
        for chain in &self.buckets {
            out.extend_from_slice(chain);
        }
        out
    }
}

//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;

    fn name(s: &str) -> Name {
        s.parse().unwrap()
    }

    #[test]
    fn intern_and_hit() {
        let mut table = DnTable::new();
        let now = Timestamp::from_secs(10);
        let h = table
            .lookup(&name("host.example"), Class::IN, true, now)
            .unwrap();
        assert_eq!(table.live(), 1);

        // Case-insensitive hit updates the referenced stamp.
        let later = Timestamp::from_secs(20);
        let h2 = table
            .lookup(&name("HOST.Example"), Class::IN, false, later)
            .unwrap();
        assert_eq!(h, h2);
        assert_eq!(table.entry(h).referenced, later);
        assert_eq!(table.live(), 1);
    }

    #[test]
    fn miss_without_create() {
        let mut table = DnTable::new();
        assert!(table
            .lookup(&name("host.example"), Class::IN, false, Timestamp::ZERO)
            .is_none());
        assert_eq!(table.live(), 0);
    }

    #[test]
    fn distinct_per_class() {
        let mut table = DnTable::new();
        let now = Timestamp::ZERO;
        let a = table
            .lookup(&name("host.example"), Class::IN, true, now)
            .unwrap();
        let b = table
            .lookup(&name("host.example"), Class::CH, true, now)
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(table.live(), 2);
    }

    #[test]
    fn ordinals_follow_interning_order() {
        let mut table = DnTable::new();
        let now = Timestamp::ZERO;
        let a = table.lookup(&name("a.example"), Class::IN, true, now).unwrap();
        let b = table.lookup(&name("b.example"), Class::IN, true, now).unwrap();
        assert!(table.entry(a).ordinal < table.entry(b).ordinal);
    }

    #[test]
    fn stale_handles_do_not_resolve() {
        let mut table = DnTable::new();
        let now = Timestamp::ZERO;
        let h = table
            .lookup(&name("host.example"), Class::IN, true, now)
            .unwrap();
        table.remove(h).unwrap();
        assert_eq!(table.live(), 0);
        assert!(table.get(h).is_none());

        // Slot reuse issues a different generation.
        let h2 = table
            .lookup(&name("other.example"), Class::IN, true, now)
            .unwrap();
        assert_ne!(h, h2);
        assert!(table.get(h).is_none());
        assert!(table.get(h2).is_some());
    }
}

//! Cached resource records.
//!
//! A [`Record`] is one typed DNS answer fact attached to a cached domain
//! name. The variant payload of the C-era cache — a union with a manually
//! managed discriminant — is expressed as the [`RecordData`] enum so that
//! using the wrong accessor for a type simply cannot happen.
//!
//! Records enter the cache by value through [`rr_attach`] and leave it as
//! deep copies through [`rr_lookup`]; a record inside the table is never
//! aliased outside the cache lock. The `cached` flag tracks which side of
//! that line a record is on.
//!
//! [`rr_attach`]: super::Cache::rr_attach
//! [`rr_lookup`]: super::Cache::rr_lookup

use bytes::Bytes;
use std::net::{Ipv4Addr, Ipv6Addr};

use super::clock::Timestamp;
use super::table::DnHandle;
use crate::base::{Class, Rcode, Rtype, Ttl};

//------------ RecordData ----------------------------------------------------

/// The data of a positive cache record.
///
/// Name-valued fields hold handles to other cached domain names; the
/// table interns every name exactly once, so handle equality is name
/// equality. These handles form the reference graph the aging sweep
/// walks: a record keeps the names it mentions alive.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RecordData {
    /// A host address.
    A(Ipv4Addr),

    /// An IPv6 host address.
    Aaaa(Ipv6Addr),

    /// An authoritative name server.
    Ns(DnHandle),

    /// The canonical name for an alias.
    Cname(DnHandle),

    /// A domain name pointer.
    Ptr(DnHandle),

    /// A mailbox domain name.
    Mb(DnHandle),

    /// A mail group member.
    Mg(DnHandle),

    /// A mail rename domain name.
    Mr(DnHandle),

    /// A mail destination (obsolete).
    Md(DnHandle),

    /// A mail forwarder (obsolete).
    Mf(DnHandle),

    /// Mail exchange.
    Mx {
        /// Preference of this exchange, lower is better.
        preference: u16,

        /// The host acting as mail exchange.
        exchange: DnHandle,
    },

    /// Mailbox or mail list information.
    Minfo {
        /// Mailbox responsible for the list.
        rmailbx: DnHandle,

        /// Mailbox receiving error messages.
        emailbx: DnHandle,
    },

    /// Host information.
    Hinfo {
        /// CPU type.
        cpu: Box<str>,

        /// Operating system.
        os: Box<str>,
    },

    /// Start of a zone of authority.
    Soa(Soa),

    /// Server selection.
    Srv {
        /// Priority of the target host, lower is better.
        priority: u16,

        /// Relative weight among entries of the same priority.
        weight: u16,

        /// TCP or UDP port of the service.
        port: u16,

        /// The host providing the service.
        target: DnHandle,
    },

    /// A security key.
    Key {
        /// Key flags.
        flags: u16,

        /// Key protocol.
        protocol: u8,

        /// Cryptographic algorithm.
        algorithm: u8,

        /// The public key material.
        key: Bytes,
    },

    /// A certificate.
    Cert {
        /// Certificate type.
        ctype: u16,

        /// Key tag of the corresponding key.
        key_tag: u16,

        /// Cryptographic algorithm.
        algorithm: u8,

        /// The certificate data.
        cert: Bytes,
    },

    /// A security signature.
    Sig {
        /// The record type covered by the signature.
        type_covered: Rtype,

        /// Cryptographic algorithm.
        algorithm: u8,

        /// Number of labels of the signed name.
        labels: u8,

        /// Original TTL of the covered record set.
        original_ttl: u32,

        /// Expiration time of the signature.
        expiration: u32,

        /// Inception time of the signature.
        inception: u32,

        /// Key tag of the signing key.
        key_tag: u16,

        /// The name of the signer.
        signer: DnHandle,

        /// The signature itself.
        signature: Bytes,
    },

    /// A null record: an uninterpreted blob.
    Null(Bytes),

    /// Text strings.
    Txt(Vec<Bytes>),
}

impl RecordData {
    /// Returns the record type of this data.
    #[must_use]
    pub fn rtype(&self) -> Rtype {
        match self {
            RecordData::A(_) => Rtype::A,
            RecordData::Aaaa(_) => Rtype::AAAA,
            RecordData::Ns(_) => Rtype::NS,
            RecordData::Cname(_) => Rtype::CNAME,
            RecordData::Ptr(_) => Rtype::PTR,
            RecordData::Mb(_) => Rtype::MB,
            RecordData::Mg(_) => Rtype::MG,
            RecordData::Mr(_) => Rtype::MR,
            RecordData::Md(_) => Rtype::MD,
            RecordData::Mf(_) => Rtype::MF,
            RecordData::Mx { .. } => Rtype::MX,
            RecordData::Minfo { .. } => Rtype::MINFO,
            RecordData::Hinfo { .. } => Rtype::HINFO,
            RecordData::Soa(_) => Rtype::SOA,
            RecordData::Srv { .. } => Rtype::SRV,
            RecordData::Key { .. } => Rtype::KEY,
            RecordData::Cert { .. } => Rtype::CERT,
            RecordData::Sig { .. } => Rtype::SIG,
            RecordData::Null(_) => Rtype::NULL,
            RecordData::Txt(_) => Rtype::TXT,
        }
    }

    /// Calls `op` for every domain name this data references.
    ///
    /// This is the single enumeration of reference edges shared by the
    /// sweep's reachability marking and by never-age pinning.
    pub(super) fn for_each_dn_ref<F: FnMut(DnHandle)>(&self, op: &mut F) {
        match *self {
            RecordData::A(_)
            | RecordData::Aaaa(_)
            | RecordData::Hinfo { .. }
            | RecordData::Key { .. }
            | RecordData::Cert { .. }
            | RecordData::Null(_)
            | RecordData::Txt(_) => {}
            RecordData::Ns(target)
            | RecordData::Cname(target)
            | RecordData::Ptr(target)
            | RecordData::Mb(target)
            | RecordData::Mg(target)
            | RecordData::Mr(target)
            | RecordData::Md(target)
            | RecordData::Mf(target)
            | RecordData::Mx {
                exchange: target, ..
            }
            | RecordData::Srv { target, .. }
            | RecordData::Sig { signer: target, .. } => op(target),
            RecordData::Minfo { rmailbx, emailbx } => {
                op(rmailbx);
                op(emailbx);
            }
            RecordData::Soa(ref soa) => {
                // The slave server names are plain strings, not
                // references, and do not keep anything alive.
                op(soa.mname);
                op(soa.rname);
            }
        }
    }
}

//------------ Soa -----------------------------------------------------------

/// The data of a SOA record.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Soa {
    /// The primary name server of the zone.
    pub mname: DnHandle,

    /// The mailbox of the person responsible for the zone.
    pub rname: DnHandle,

    /// Version serial of the zone.
    pub serial: u32,

    /// Refresh interval for secondaries.
    pub refresh: u32,

    /// Retry interval after a failed refresh.
    pub retry: u32,

    /// When the zone data stops being authoritative on a secondary.
    pub expire: u32,

    /// Minimum TTL, also the negative caching TTL of the zone.
    pub minimum: u32,

    /// Names of the zone's secondary servers.
    pub slaves: Vec<Box<str>>,
}

//------------ Payload -------------------------------------------------------

/// Either real record data or a cached negative answer.
///
/// A negative entry is a placeholder stating "this name and type have no
/// data", carrying the response code to replay and, if known, the name
/// owning the SOA record the negative answer was derived from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Payload {
    /// A real answer.
    Positive(RecordData),

    /// A cached negative answer.
    Negative {
        /// The response code of the negative answer.
        rcode: Rcode,

        /// The name owning the governing SOA record.
        soa: Option<DnHandle>,
    },
}

impl Payload {
    /// Returns whether two payloads represent the same answer.
    ///
    /// Positive payloads compare by value. Negative payloads of the same
    /// record type are all the same answer regardless of response code;
    /// the merge step keeps whichever entry wins and with it its code.
    fn same_answer(&self, other: &Payload) -> bool {
        match (self, other) {
            (Payload::Positive(a), Payload::Positive(b)) => a == b,
            (Payload::Negative { .. }, Payload::Negative { .. }) => true,
            _ => false,
        }
    }
}

//------------ Record --------------------------------------------------------

/// A single cached resource record.
#[derive(Clone, Debug)]
pub struct Record {
    /// The cached name owning this record.
    owner: DnHandle,

    /// The record type.
    rtype: Rtype,

    /// The record class.
    class: Class,

    /// Time to live as reported to queries.
    ttl: Ttl,

    /// Absolute expiry time, computed when the record is attached.
    expire: Timestamp,

    /// Whether the record came from the local database rather than from
    /// the network.
    db: bool,

    /// Whether the record is authoritative for its owner's zone.
    auth: bool,

    /// Whether the record is currently linked into the cache.
    cached: bool,

    /// The payload.
    payload: Payload,
}

impl Record {
    /// Creates a new positive record.
    ///
    /// The record starts out as a non-authoritative network record that
    /// is not linked into the cache. The expiry time is computed when the
    /// record is attached.
    #[must_use]
    pub fn new(
        owner: DnHandle,
        class: Class,
        ttl: Ttl,
        data: RecordData,
    ) -> Self {
        Record {
            owner,
            rtype: data.rtype(),
            class,
            ttl,
            expire: Timestamp::ZERO,
            db: false,
            auth: false,
            cached: false,
            payload: Payload::Positive(data),
        }
    }

    /// Creates a new negative record for the given record type.
    #[must_use]
    pub fn negative(
        owner: DnHandle,
        class: Class,
        rtype: Rtype,
        ttl: Ttl,
        rcode: Rcode,
        soa: Option<DnHandle>,
    ) -> Self {
        Record {
            owner,
            rtype,
            class,
            ttl,
            expire: Timestamp::ZERO,
            db: false,
            auth: false,
            cached: false,
            payload: Payload::Negative { rcode, soa },
        }
    }

    /// Returns the handle of the owning name.
    #[must_use]
    pub fn owner(&self) -> DnHandle {
        self.owner
    }

    /// Returns the record type.
    #[must_use]
    pub fn rtype(&self) -> Rtype {
        self.rtype
    }

    /// Returns the record class.
    #[must_use]
    pub fn class(&self) -> Class {
        self.class
    }

    /// Returns the time to live.
    #[must_use]
    pub fn ttl(&self) -> Ttl {
        self.ttl
    }

    pub(super) fn set_ttl(&mut self, ttl: Ttl) {
        self.ttl = ttl;
    }

    /// Returns the absolute expiry time.
    #[must_use]
    pub fn expire(&self) -> Timestamp {
        self.expire
    }

    pub(super) fn set_expire(&mut self, expire: Timestamp) {
        self.expire = expire;
    }

    /// Returns whether the record has expired at the given time.
    #[must_use]
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expire <= now
    }

    /// Returns whether the record came from the local database.
    #[must_use]
    pub fn is_db(&self) -> bool {
        self.db
    }

    /// Marks the record as coming from the local database.
    pub fn set_db(&mut self, db: bool) {
        self.db = db;
    }

    /// Returns whether the record is authoritative.
    #[must_use]
    pub fn is_auth(&self) -> bool {
        self.auth
    }

    /// Sets the authoritative flag.
    pub fn set_auth(&mut self, auth: bool) {
        self.auth = auth;
    }

    /// Returns whether the record is currently linked into the cache.
    #[must_use]
    pub fn is_cached(&self) -> bool {
        self.cached
    }

    pub(super) fn set_cached(&mut self, cached: bool) {
        self.cached = cached;
    }

    /// Returns whether this is a negative record.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        matches!(self.payload, Payload::Negative { .. })
    }

    /// Returns the response code of a negative record.
    #[must_use]
    pub fn rcode(&self) -> Option<Rcode> {
        match self.payload {
            Payload::Negative { rcode, .. } => Some(rcode),
            Payload::Positive(_) => None,
        }
    }

    /// Returns the data of a positive record.
    #[must_use]
    pub fn data(&self) -> Option<&RecordData> {
        match self.payload {
            Payload::Positive(ref data) => Some(data),
            Payload::Negative { .. } => None,
        }
    }

    /// Returns the payload.
    #[must_use]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Produces a deep copy of the record that is not linked anywhere.
    ///
    /// This is how lookup results leave the cache: every owned
    /// sub-structure is duplicated, so the copy can be used without the
    /// cache lock and mutated without affecting the cached original.
    #[must_use]
    pub fn copy_detached(&self) -> Record {
        let mut copy = self.clone();
        copy.cached = false;
        copy
    }

    /// Discards an unlinked record.
    ///
    /// # Panics
    ///
    /// Panics if the record is still linked into the cache. That is a
    /// logic error, not a runtime condition.
    pub fn free(self) {
        assert!(!self.cached, "attempt to free a cached record");
    }

    /// Returns whether two records are the same answer.
    ///
    /// Same owner, same type, same payload value. This is the test the
    /// lookup path deduplicates with.
    #[must_use]
    pub fn is_equivalent(&self, other: &Record) -> bool {
        self.owner == other.owner
            && self.rtype == other.rtype
            && self.payload.same_answer(&other.payload)
    }

    /// Returns whether two records are true duplicates.
    ///
    /// Equivalence plus matching source and authority flags; the merge
    /// step must never leave two of these in one list.
    #[must_use]
    pub fn is_duplicate(&self, other: &Record) -> bool {
        self.is_equivalent(other)
            && self.db == other.db
            && self.auth == other.auth
            && self.is_negative() == other.is_negative()
    }

    /// Calls `op` for every domain name this record keeps alive.
    ///
    /// A negative record is a placeholder, not a full record: it only
    /// pins the name owning its governing SOA record.
    pub(super) fn for_each_dn_ref<F: FnMut(DnHandle)>(&self, mut op: F) {
        match self.payload {
            Payload::Negative { soa, .. } => {
                if let Some(soa) = soa {
                    op(soa)
                }
            }
            Payload::Positive(ref data) => data.for_each_dn_ref(&mut op),
        }
    }
}

//============ Tests =========================================================

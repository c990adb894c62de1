//! Resource Record (RR) TYPEs.

//------------ Rtype ---------------------------------------------------------

int_enum! {
    /// Resource Record Types.
    ///
    /// Each resource record type has a 16 bit type value indicating what kind
    /// of data is present in the record's data. The type wraps these values.
    ///
    /// See the [Resource Record (RR) TYPEs IANA registry] for an overview of
    /// assigned values. The cache only ever stores data for a subset of
    /// these, but unknown values round-trip through the type unharmed.
    ///
    /// [Resource Record (RR) TYPEs IANA registry]: https://www.iana.org/assignments/dns-parameters/dns-parameters.xhtml#dns-parameters-4
    =>
    Rtype, u16;

    /// A host address.
    (A => 1, "A")

    /// An authoritative name server.
    (NS => 2, "NS")

    /// A mail destination (obsolete, use MX).
    (MD => 3, "MD")

    /// A mail forwarder (obsolete, use MX).
    (MF => 4, "MF")

    /// The canonical name for an alias.
    (CNAME => 5, "CNAME")

    /// Marks the start of a zone of authority.
    (SOA => 6, "SOA")

    /// A mailbox domain name.
    (MB => 7, "MB")

    /// A mail group member.
    (MG => 8, "MG")

    /// A mail rename domain name.
    (MR => 9, "MR")

    /// A null resource record.
    (NULL => 10, "NULL")

    /// A well known service description.
    (WKS => 11, "WKS")

    /// A domain name pointer.
    (PTR => 12, "PTR")

    /// Host information.
    (HINFO => 13, "HINFO")

    /// Mailbox or mail list information.
    (MINFO => 14, "MINFO")

    /// Mail exchange.
    (MX => 15, "MX")

    /// Text strings.
    (TXT => 16, "TXT")

    /// For Responsible Person.
    (RP => 17, "RP")

    /// For AFS Data Base location.
    (AFSDB => 18, "AFSDB")

    /// For X.25 PSDN address.
    (X25 => 19, "X25")

    /// For ISDN address.
    (ISDN => 20, "ISDN")

    /// For Route Through.
    (RT => 21, "RT")

    /// For security signature.
    (SIG => 24, "SIG")

    /// For security key.
    (KEY => 25, "KEY")

    /// X.400 mail mapping information.
    (PX => 26, "PX")

    /// A IPv6 host address.
    (AAAA => 28, "AAAA")

    /// Location information.
    (LOC => 29, "LOC")

    /// Server selection.
    (SRV => 33, "SRV")

    /// Naming authority pointer.
    (NAPTR => 35, "NAPTR")

    /// Key exchanger.
    (KX => 36, "KX")

    /// A certificate.
    (CERT => 37, "CERT")

    /// A name that points to the parent in reverse maps (non-standard).
    (DNAME => 39, "DNAME")

    /// Incremental transfer.
    (IXFR => 251, "IXFR")

    /// Transfer of an entire zone.
    (AXFR => 252, "AXFR")

    /// A request for mailbox-related records.
    (MAILB => 253, "MAILB")

    /// A request for mail agent RRs (obsolete, see MX).
    (MAILA => 254, "MAILA")

    /// A request for all records the server/cache has available.
    (ANY => 255, "ANY")
}

int_enum_str_with_prefix!(Rtype, "TYPE", b"TYPE", u16, "unknown record type");

impl Rtype {
    /// Returns whether a record of this type answers a query for `qtype`.
    ///
    /// A query for the ANY pseudo-type matches every stored type.
    #[must_use]
    pub fn answers(self, qtype: Rtype) -> bool {
        qtype == Rtype::ANY || qtype == self
    }
}

//============ Tests =========================================================

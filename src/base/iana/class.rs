//! DNS CLASSes.

//------------ Class ---------------------------------------------------------

int_enum! {
    /// DNS CLASSes.
    ///
    /// The domain name space is partitioned into separate classes for
    /// different network types. That is, each class has its own separate
    /// record tree starting at the root. However, in practice, only the IN
    /// class is really relevant.
    ///
    /// Classes are represented by a 16 bit value. The type wraps these
    /// values. See the [DNS CLASSes IANA registry] for an overview of
    /// assigned values.
    ///
    /// [DNS CLASSes IANA registry]: http://www.iana.org/assignments/dns-parameters/dns-parameters.xhtml#dns-parameters-2
    =>
    Class, u16;

    /// Internet (IN).
    ///
    /// This class is defined in RFC 1035 and really the only one relevant
    /// at all.
    (IN => 1, "IN")

    /// Chaosnet (CH).
    ///
    /// A network protocol developed at MIT in the 1970s. Reused by BIND for
    /// built-in server information zones.
    (CH => 3, "CH")

    /// Hesiod (HS).
    ///
    /// A system information protocol part of MIT's Project Athena.
    (HS => 4, "HS")

    /// Query class None.
    ///
    /// Defined in RFC 2136.
    (NONE => 0xFE, "NONE")

    /// Query class * (ANY).
    (ANY => 0xFF, "*")
}

int_enum_str_with_prefix!(Class, "CLASS", b"CLASS", u16, "unknown class");

//============ Tests =========================================================

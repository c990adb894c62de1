//! DNS response codes.

//------------ Rcode ---------------------------------------------------------

int_enum! {
    /// DNS Response Codes.
    ///
    /// The response code of a response indicates what happened on the server
    /// when trying to answer the query. The cache stores the code of a
    /// negative answer alongside the negative cache entry so it can be
    /// replayed to later queries.
    ///
    /// See the [DNS RCODEs IANA registry] for an overview of assigned
    /// values.
    ///
    /// [DNS RCODEs IANA registry]: https://www.iana.org/assignments/dns-parameters/dns-parameters.xhtml#dns-parameters-6
    =>
    Rcode, u8;

    /// No error condition.
    (NOERROR => 0, "NOERROR")

    /// The name server was unable to interpret the query.
    (FORMERR => 1, "FORMERR")

    /// The name server was unable to process this query due to a problem
    /// with the name server.
    (SERVFAIL => 2, "SERVFAIL")

    /// The domain name referenced in the query does not exist.
    (NXDOMAIN => 3, "NXDOMAIN")

    /// The name server does not support the requested kind of query.
    (NOTIMP => 4, "NOTIMP")

    /// The name server refuses to perform the specified operation for
    /// policy reasons.
    (REFUSED => 5, "REFUSED")
}

int_enum_str_with_prefix!(Rcode, "RCODE", b"RCODE", u8, "unknown rcode");

//============ Tests =========================================================

//! Basics.
//!
//! This module provides the fundamental vocabulary the cache is built
//! from: domain names in their textual form, the IANA parameter types for
//! record types, classes and response codes, and the time-to-live value.
//!
//! The cache never touches the DNS wire format; records arrive from and
//! leave to the protocol layer fully parsed, so none of these types know
//! how to compose or parse messages.

//--- Re-exports

pub use self::iana::{Class, Rcode, Rtype};
pub use self::name::{Name, NameError};
pub use self::ttl::Ttl;

//--- Modules

pub mod iana;
pub mod name;
pub mod ttl;

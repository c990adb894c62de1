//! IANA Definitions for DNS.
//!
//! This module contains types for parameters defined in IANA registries
//! that are relevant for this crate.
//!
//! All types defined hereunder follow the same basic structure. They are
//! newtypes over the raw integer value of the parameter with all
//! well-defined values provided as associated constants. There are two
//! methods `from_int()` and `to_int()` to convert from and to raw integer
//! values as well as implementations of the `From` trait for these.
//! `FromStr` and `Display` are implemented to convert from the string
//! codes to the values and back.
//!
//! While each parameter type has a module of its own, they are all
//! re-exported here. This is mostly so we can have associated types like
//! `FromStrError` without having to resort to devilishly long names.

pub use self::class::Class;
pub use self::rcode::Rcode;
pub use self::rrtype::Rtype;

#[macro_use]
mod macros;

pub mod class;
pub mod rcode;
pub mod rrtype;

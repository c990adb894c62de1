//! An in-memory cache for a caching DNS resolver.
//!
//! This crate provides the data structure at the heart of a resolver:
//! a table interning domain names together with the resource records
//! known for each of them, plus the machinery to keep that table
//! truthful and bounded over time.
//!
//! The crate is organized in two public modules:
//!
//! * [`base`] contains the vocabulary types: domain [names], [classes],
//!   [record types], [response codes], and [TTLs].
//! * [`cache`] contains the cache itself: the [`Cache`] type with its
//!   lookup, attach, and aging operations, [records] and their data,
//!   and the [configuration].
//!
//! See the [`cache`] module documentation for an overview of how the
//! pieces fit together and a usage example.
//!
//! [names]: base::Name
//! [classes]: base::Class
//! [record types]: base::Rtype
//! [response codes]: base::Rcode
//! [TTLs]: base::Ttl
//! [`Cache`]: cache::Cache
//! [records]: cache::Record
//! [configuration]: cache::Config

pub mod base;
pub mod cache;

mod utils;

// Copyright 2024 the zonevet authors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Zonevet checks a single DNS zone from the outside: that every
//! authoritative nameserver returns a consistent, well-formed delegation,
//! and that the DNSSEC chain of trust validates from the zone up to the
//! root.
//!
//! The chain walk validates one zone at a time. For each zone it fetches
//! the `DNSKEY` set from every authoritative server, verifies the
//! self-signature over that set with one of its own keys, then asks the
//! parent zone's servers for `DS` records and confirms that a child key
//! hashes to a parent-supplied digest. The walk repeats on the parent
//! until it reaches the root.
//!
//! Authoritative servers are discovered through a recursive resolver
//! ([`discovery`]); every validation-relevant query afterwards goes
//! directly to the authoritative servers over UDP ([`transport`]). There
//! is no caching and no state across calls.
//!
//! This is a diagnostic, not a validating resolver: it proves no denial
//! of existence, chases no aliases, and compares the root keys against no
//! packaged trust anchor.

#![warn(
    clippy::default_trait_access,
    clippy::dbg_macro,
    clippy::unimplemented,
    missing_copy_implementations,
    missing_docs,
    non_snake_case,
    non_upper_case_globals,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod discovery;
pub mod error;
pub mod ipinfo;
pub mod report;
pub mod transport;
pub mod validator;
pub mod verify;

pub use crate::discovery::{recursive_resolver, Discovery, NsInfo, ResolverDiscovery};
pub use crate::error::{ValidateError, ValidateResult};
pub use crate::transport::{query_rrset, Answer, Transport, UdpTransport};
pub use crate::validator::{parent_name, Validator};
pub use crate::verify::{validate_dnskey, validate_rrsig, KeyInfo};

/// Recursive resolver consulted when none is configured.
pub const DEFAULT_RESOLVER: &str = "8.8.8.8";

// Copyright 2024 the zonevet authors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Error types for delegation and chain-of-trust validation.

use std::net::IpAddr;

use hickory_proto::error::ProtoError;
use hickory_proto::rr::{Name, RecordType};
use thiserror::Error;

/// Result alias for validation operations.
pub type ValidateResult<T> = Result<T, ValidateError>;

/// Failures observed while validating a zone's delegation or its chain of
/// trust.
///
/// Every variant names the domain it was observed for and, where a single
/// server produced it, the address of that server. Cryptographic
/// verification that merely fails is not represented here; see
/// [`crate::verify::validate_rrsig`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ValidateError {
    /// Network failure, timeout, or malformed reply at the wire layer.
    #[error("query for {domain} to {server} failed: {source}")]
    Transport {
        /// The name being queried when the exchange failed.
        domain: Name,
        /// The server the exchange was addressed to.
        server: IpAddr,
        /// The underlying wire-level failure.
        #[source]
        source: ProtoError,
    },

    /// The recursive resolver produced no nameservers for the domain.
    #[error("no nameservers found for {domain}")]
    NoNameservers {
        /// The domain that could not be delegated.
        domain: Name,
    },

    /// A query returned no records of the requested type.
    #[error("no {query_type} records for {domain} from {server}")]
    NoAnswer {
        /// The name that was queried.
        domain: Name,
        /// The record type that was requested.
        query_type: RecordType,
        /// The server that answered without matching records.
        server: IpAddr,
    },

    /// An authoritative server returned no DNSKEY for its own zone.
    #[error("no DNSKEY found for {domain} on {server}")]
    NoDnskey {
        /// The zone missing its keys.
        domain: Name,
        /// The authoritative server that was asked.
        server: IpAddr,
    },

    /// The parent zone's servers returned no DS records for the child.
    #[error("no DS records found for {domain} on {server}")]
    NoDs {
        /// The child zone the DS records were requested for.
        domain: Name,
        /// The parent-zone server that was asked.
        server: IpAddr,
    },

    /// Two DNSKEYs with the same key tag carry different public keys
    /// across the zone's authoritative servers.
    #[error("DNSKEYs with key tag {key_tag} for {domain} differ between servers")]
    InconsistentKeys {
        /// The zone serving the conflicting keys.
        domain: Name,
        /// The shared key tag of the conflicting keys.
        key_tag: u16,
    },

    /// No DNSKEY self-verified the signature over the DNSKEY set within
    /// its validity window.
    #[error("RRSIG on DNSKEY could not be validated by any DNSKEY for {domain} on {server}")]
    DnskeyValidationFailed {
        /// The zone whose key set failed self-verification.
        domain: Name,
        /// The server whose answer failed.
        server: IpAddr,
    },

    /// A parent DS matched a child DNSKEY by key tag but the digests
    /// disagree.
    #[error("DS digest for {domain} (key tag {key_tag}) does not match the child DNSKEY, per {server}")]
    DigestMismatch {
        /// The child zone with the broken linkage.
        domain: Name,
        /// The key tag shared by the DS and the DNSKEY.
        key_tag: u16,
        /// The parent-zone server that supplied the DS.
        server: IpAddr,
    },

    /// No DS key tag published by the parent matched any child DNSKEY.
    #[error("no DNSKEY in {domain} matches a DS in {parent}")]
    NoMatchingKeyTag {
        /// The child zone.
        domain: Name,
        /// The parent zone that was consulted.
        parent: Name,
    },

    /// A failure inside the DNS wire library, such as a key tag or digest
    /// that could not be computed.
    #[error("{0}")]
    Proto(#[from] ProtoError),
}

// Copyright 2024 the zonevet authors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! RRSIG verification against a candidate DNSKEY set.
//!
//! Cryptographic failure here is an ordinary negative result rather than
//! an error: the caller decides whether an unvalidated set is fatal.

use std::time::{SystemTime, UNIX_EPOCH};

use hickory_proto::rr::dnssec::rdata::{DNSSECRData, RRSIG};
use hickory_proto::rr::dnssec::Verifier;
use hickory_proto::rr::{RData, Record};
use log::debug;

/// Serial-number period of the 32-bit RRSIG timestamps (RFC 1982).
const SERIAL_PERIOD: i64 = 1 << 31;

/// Validity window of the signature that verified, canonicalised to
/// absolute Unix seconds near the current wall-clock time.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct KeyInfo {
    /// Signature inception, seconds since the Unix epoch.
    pub start: i64,
    /// Signature expiration, seconds since the Unix epoch.
    pub end: i64,
}

impl KeyInfo {
    /// True when no signature produced a window, the zero value.
    pub fn is_empty(&self) -> bool {
        self.start == 0 && self.end == 0
    }
}

/// Validates a DNSKEY answer section against its own keys: the set must
/// contain the keys and the covering RRSIG over them.
pub fn validate_dnskey(rrset: &[Record]) -> (bool, KeyInfo) {
    validate_rrsig(rrset, rrset)
}

/// Validates `rrset`, one covering RRSIG plus the records it signs,
/// against the candidate `keys`.
///
/// Returns `(true, window)` when at least one DNSKEY verifies the
/// signature and the current time lies within its validity period.
/// An `rrset` with no signed records returns `(false, empty)` untried,
/// which lets callers distinguish an unsigned zone from a broken one.
/// When the cryptography succeeds but the window does not hold, the
/// stale window is still reported alongside `false`.
pub fn validate_rrsig(keys: &[Record], rrset: &[Record]) -> (bool, KeyInfo) {
    validate_rrsig_at(keys, rrset, now_unix())
}

/// As [`validate_rrsig`], with the wall clock supplied by the caller.
/// Deterministic for fixed inputs.
pub fn validate_rrsig_at(keys: &[Record], rrset: &[Record], now: i64) -> (bool, KeyInfo) {
    if rrset.is_empty() {
        return (false, KeyInfo::default());
    }

    let mut sig: Option<(&Record, &RRSIG)> = None;
    let mut cleanset: Vec<Record> = Vec::new();
    for rr in rrset {
        match rr.data() {
            Some(RData::DNSSEC(DNSSECRData::RRSIG(rrsig))) => sig = Some((rr, rrsig)),
            _ => cleanset.push(rr.clone()),
        }
    }
    let Some((sig_record, sig)) = sig else {
        return (false, KeyInfo::default());
    };
    if cleanset.is_empty() {
        return (false, KeyInfo::default());
    }

    let mut stale = KeyInfo::default();
    for rr in keys {
        let Some(RData::DNSSEC(DNSSECRData::DNSKEY(key))) = rr.data() else {
            continue;
        };
        debug!(
            "trying RRSIG (key tag {}) with DNSKEY {:?} key",
            sig.key_tag(),
            key.algorithm(),
        );
        if key
            .verify_rrsig(sig_record.name(), sig_record.dns_class(), sig, &cleanset)
            .is_ok()
        {
            let info = explicit_window(sig, now);
            if validity_period(sig, now) {
                debug!("validation succeeded");
                return (true, info);
            }
            // verified but outside the window; report the window anyway
            stale = info;
        }
        debug!("validation failed");
    }
    (false, stale)
}

/// Current wall-clock time in Unix seconds.
pub fn now_unix() -> i64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_secs() as i64,
        Err(_) => 0,
    }
}

/// Maps a 32-bit serial timestamp to absolute seconds by adding the
/// multiple of 2^31 that lands it nearest `now` (RFC 1982).
fn canonical_time(serial: u32, now: i64) -> i64 {
    let t = i64::from(serial);
    let periods = (now - t + SERIAL_PERIOD / 2).div_euclid(SERIAL_PERIOD);
    t + periods * SERIAL_PERIOD
}

/// The signature's validity window in absolute seconds.
fn explicit_window(sig: &RRSIG, now: i64) -> KeyInfo {
    KeyInfo {
        start: canonical_time(sig.sig_inception(), now),
        end: canonical_time(sig.sig_expiration(), now),
    }
}

/// Serial-arithmetic check that `now` lies within `[inception, expiration]`.
fn validity_period(sig: &RRSIG, now: i64) -> bool {
    let info = explicit_window(sig, now);
    info.start <= now && now <= info.end
}

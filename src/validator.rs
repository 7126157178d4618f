// Copyright 2024 the zonevet authors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Per-zone validation and the walk up the chain of trust.
//!
//! One zone validates in two phases. The DNSKEY phase asks every
//! authoritative server for the zone's keys, collects them in a map keyed
//! by key tag, and checks the self-signature over the key set. The DS
//! phase asks the parent zone's servers for DS records and confirms that
//! a child key hashes to a parent-supplied digest. The chain walk repeats
//! this per label up to the root.

use std::collections::HashMap;
use std::net::IpAddr;

use hickory_proto::rr::dnssec::rdata::{DNSSECRData, DNSKEY};
use hickory_proto::rr::{Name, RData, Record, RecordType};
use log::debug;

use crate::discovery::Discovery;
use crate::error::{ValidateError, ValidateResult};
use crate::transport::Transport;
use crate::verify::validate_dnskey;

/// GOST R 34.11-94, the one assigned DS digest type that is skipped
/// rather than derived.
const DIGEST_GOST: u8 = 3;

/// Parent of `domain`: the name one label shorter. The root is its own
/// parent, the sentinel that terminates the chain walk.
pub fn parent_name(domain: &Name) -> Name {
    domain.base_name()
}

/// Validates zones against their authoritative servers and walks the
/// chain of trust.
pub struct Validator<T, D> {
    transport: T,
    discovery: D,
}

impl<T, D> Validator<T, D>
where
    T: Transport,
    D: Discovery,
{
    /// Constructs a validator over the given transport and discovery.
    pub fn new(transport: T, discovery: D) -> Self {
        Self {
            transport,
            discovery,
        }
    }

    /// Validates every zone from `domain` up to the root, failing fast on
    /// the first zone that does not validate.
    ///
    /// The walk terminates at the root without comparing its keys against
    /// a packaged trust anchor; the root's self-signature is the terminal
    /// check.
    pub async fn validate_chain(&self, domain: &Name) -> ValidateResult<()> {
        let mut domain = domain.clone();
        loop {
            debug!("validating {}", domain);
            self.validate_domain(&domain).await?;
            let parent = parent_name(&domain);
            if parent.is_root() {
                return Ok(());
            }
            domain = parent;
        }
    }

    /// Validates a single zone: the DNSKEY self-signature on every
    /// authoritative server, then digest agreement with the parent's DS
    /// records. The DS phase is skipped for the root zone.
    pub async fn validate_domain(&self, domain: &Name) -> ValidateResult<()> {
        let mut key_map: HashMap<u16, DNSKEY> = HashMap::new();

        let nsinfos = self.discovery.find_ns(domain).await?;
        for ns in &nsinfos {
            for addr in &ns.addrs {
                debug!("asking {} ({}) DNSKEY of {}", ns.name, addr, domain);
                let answer = self.lookup_dnskey(domain, *addr, &mut key_map).await?;
                let (valid, info) = validate_dnskey(&answer);
                if !valid {
                    debug!("RRSIG on DNSKEY not validated by {}", addr);
                    return Err(ValidateError::DnskeyValidationFailed {
                        domain: domain.clone(),
                        server: *addr,
                    });
                }
                debug!(
                    "RRSIG on DNSKEY validated ({} -> {})",
                    info.start, info.end
                );
            }
        }
        debug!("found {} distinct DNSKEYs for {}", key_map.len(), domain);

        if domain.is_root() {
            return Ok(());
        }
        self.validate_parent_ds(domain, &key_map).await
    }

    /// Queries one authoritative server for the zone's DNSKEY set and
    /// merges the keys into `key_map` under their key tags. Returns the
    /// full answer section so the caller can verify the self-signature.
    async fn lookup_dnskey(
        &self,
        domain: &Name,
        server: IpAddr,
        key_map: &mut HashMap<u16, DNSKEY>,
    ) -> ValidateResult<Vec<Record>> {
        let answer = self
            .transport
            .query(domain, RecordType::DNSKEY, server, true)
            .await?;

        let mut found = false;
        for rr in &answer.records {
            if let Some(RData::DNSSEC(DNSSECRData::DNSKEY(key))) = rr.data() {
                found = true;
                let key_tag = key.calculate_key_tag()?;
                if let Some(existing) = key_map.get(&key_tag) {
                    if existing.public_key() != key.public_key() {
                        return Err(ValidateError::InconsistentKeys {
                            domain: domain.clone(),
                            key_tag,
                        });
                    }
                }
                key_map.insert(key_tag, key.clone());
            }
        }
        if !found {
            return Err(ValidateError::NoDnskey {
                domain: domain.clone(),
                server,
            });
        }
        Ok(answer.records)
    }

    /// Asks every authoritative server of the parent zone for the child's
    /// DS records and requires at least one digest to agree with a child
    /// key, with no disagreements.
    async fn validate_parent_ds(
        &self,
        domain: &Name,
        key_map: &HashMap<u16, DNSKEY>,
    ) -> ValidateResult<()> {
        let parent = parent_name(domain);
        debug!("finding NS of parent {}", parent);
        let nsinfos = self.discovery.find_ns(&parent).await?;

        let mut found_key_tag = false;
        for ns in &nsinfos {
            for addr in &ns.addrs {
                debug!("asking parent {} ({}) DS of {}", ns.name, addr, domain);
                let answer = match self
                    .transport
                    .query(domain, RecordType::DS, *addr, true)
                    .await
                {
                    Ok(answer) => answer,
                    Err(e) => {
                        // one unreachable parent server does not decide
                        // the zone; move on to the next nameserver
                        debug!("DS query to {} failed: {}", addr, e);
                        break;
                    }
                };
                if answer.records.is_empty() {
                    return Err(ValidateError::NoDs {
                        domain: domain.clone(),
                        server: *addr,
                    });
                }

                for rr in &answer.records {
                    let Some(RData::DNSSEC(DNSSECRData::DS(parent_ds))) = rr.data() else {
                        continue;
                    };
                    let Some(key) = key_map.get(&parent_ds.key_tag()) else {
                        debug!(
                            "no DNSKEY in {} matches DS key tag {}",
                            domain,
                            parent_ds.key_tag()
                        );
                        continue;
                    };
                    if u8::from(parent_ds.digest_type()) == DIGEST_GOST {
                        // no support for GOST digests
                        continue;
                    }
                    found_key_tag = true;

                    let child_digest = key.to_digest(domain, parent_ds.digest_type())?;
                    if child_digest.as_ref() == parent_ds.digest() {
                        debug!(
                            "{} DS digest agrees (key tag {})",
                            domain,
                            parent_ds.key_tag()
                        );
                    } else {
                        debug!(
                            "{} DS digest mismatch (key tag {})",
                            domain,
                            parent_ds.key_tag()
                        );
                        return Err(ValidateError::DigestMismatch {
                            domain: domain.clone(),
                            key_tag: parent_ds.key_tag(),
                            server: *addr,
                        });
                    }
                }
            }
        }

        if !found_key_tag {
            debug!("no DNSKEY in {} matches any DS in {}", domain, parent);
            return Err(ValidateError::NoMatchingKeyTag {
                domain: domain.clone(),
                parent,
            });
        }
        Ok(())
    }
}

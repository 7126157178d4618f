// Copyright 2024 the zonevet authors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! In-memory servers and signed zone fixtures for the validation tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use hickory_proto::rr::dnssec::rdata::{DNSSECRData, DNSKEY, DS, RRSIG, SIG};
use hickory_proto::rr::dnssec::tbs::rrset_tbs_with_sig;
use hickory_proto::rr::dnssec::{Algorithm, DigestType};
use hickory_proto::rr::{DNSClass, Name, RData, Record, RecordType};
use ring::rand::SystemRandom;
use ring::signature::{Ed25519KeyPair, KeyPair};

use zonevet::{Answer, Discovery, NsInfo, Transport, ValidateError, ValidateResult};

/// An in-memory authoritative server farm: canned answer sections keyed
/// by (name, type, server address). Unknown questions answer empty.
#[derive(Debug, Default, Clone)]
pub struct StaticNet {
    answers: HashMap<(Name, RecordType, IpAddr), Vec<Record>>,
}

impl StaticNet {
    pub fn insert(
        &mut self,
        name: &Name,
        query_type: RecordType,
        server: IpAddr,
        records: Vec<Record>,
    ) {
        self.answers.insert((name.clone(), query_type, server), records);
    }
}

#[async_trait]
impl Transport for StaticNet {
    async fn query(
        &self,
        name: &Name,
        query_type: RecordType,
        server: IpAddr,
        _dnssec: bool,
    ) -> ValidateResult<Answer> {
        let records = self
            .answers
            .get(&(name.clone(), query_type, server))
            .cloned()
            .unwrap_or_default();
        Ok(Answer {
            records,
            rtt: Duration::from_millis(1),
        })
    }
}

/// An in-memory recursive resolver: delegations keyed by zone.
#[derive(Debug, Default, Clone)]
pub struct StaticDelegations {
    delegations: HashMap<Name, Vec<NsInfo>>,
}

impl StaticDelegations {
    pub fn insert(&mut self, zone: &Name, nsinfos: Vec<NsInfo>) {
        self.delegations.insert(zone.clone(), nsinfos);
    }

    pub fn insert_single(&mut self, zone: &Name, ns: &str, addr: IpAddr) {
        self.insert(
            zone,
            vec![NsInfo {
                name: Name::from_utf8(ns).unwrap(),
                addrs: vec![addr],
            }],
        );
    }
}

#[async_trait]
impl Discovery for StaticDelegations {
    async fn find_ns(&self, domain: &Name) -> ValidateResult<Vec<NsInfo>> {
        match self.delegations.get(domain) {
            Some(nsinfos) if !nsinfos.is_empty() => Ok(nsinfos.clone()),
            _ => Err(ValidateError::NoNameservers {
                domain: domain.clone(),
            }),
        }
    }
}

/// A zone with a freshly generated Ed25519 KSK/ZSK pair and a signed
/// DNSKEY set.
pub struct TestZone {
    pub name: Name,
    pub ksk: DNSKEY,
    pub ksk_tag: u16,
    /// DNSKEY records plus the covering RRSIG, as an answer section.
    pub dnskey_rrset: Vec<Record>,
    signing_key: Ed25519KeyPair,
}

impl TestZone {
    /// A zone whose DNSKEY signature is valid for a day on each side of
    /// `now`.
    pub fn signed(name: &str, now: i64) -> Self {
        Self::signed_with_window(name, (now - 86_400) as u32, (now + 86_400) as u32)
    }

    /// A zone with an explicit signature validity window.
    pub fn signed_with_window(name: &str, inception: u32, expiration: u32) -> Self {
        let name = Name::from_utf8(name).unwrap();
        let signing_key = generate_key();
        let zsk_key = generate_key();

        let ksk = DNSKEY::new(
            true,
            true,
            false,
            Algorithm::ED25519,
            signing_key.public_key().as_ref().to_vec(),
        );
        let zsk = DNSKEY::new(
            true,
            false,
            false,
            Algorithm::ED25519,
            zsk_key.public_key().as_ref().to_vec(),
        );
        let ksk_tag = ksk.calculate_key_tag().unwrap();

        let keys = vec![
            dnskey_record(&name, ksk.clone()),
            dnskey_record(&name, zsk),
        ];
        let rrsig = sign_rrset(&keys, &ksk, &signing_key, &name, inception, expiration);
        let mut dnskey_rrset = keys;
        dnskey_rrset.push(rrsig);

        Self {
            name,
            ksk,
            ksk_tag,
            dnskey_rrset,
            signing_key,
        }
    }

    /// The DS record the parent publishes for this zone.
    pub fn ds(&self) -> Record {
        let digest = self
            .ksk
            .to_digest(&self.name, DigestType::SHA256)
            .unwrap()
            .as_ref()
            .to_vec();
        self.ds_record(DigestType::SHA256, digest)
    }

    /// A DS whose digest has the last byte flipped.
    pub fn tampered_ds(&self) -> Record {
        let mut digest = self
            .ksk
            .to_digest(&self.name, DigestType::SHA256)
            .unwrap()
            .as_ref()
            .to_vec();
        *digest.last_mut().unwrap() ^= 0xff;
        self.ds_record(DigestType::SHA256, digest)
    }

    /// A DS declaring the GOST R 34.11-94 digest type.
    pub fn gost_ds(&self) -> Record {
        let gost = DigestType::from_u8(3u8).expect("digest type 3 unknown");
        self.ds_record(gost, vec![0xde, 0xad, 0xbe, 0xef])
    }

    /// A second DNSKEY answer carrying a key with the same key tag as the
    /// KSK but different public key bits.
    pub fn conflicting_dnskey_rrset(&self) -> Vec<Record> {
        let forged = DNSKEY::new(
            true,
            true,
            false,
            Algorithm::ED25519,
            tag_preserving_mutation(self.ksk.public_key()),
        );
        assert_eq!(forged.calculate_key_tag().unwrap(), self.ksk_tag);
        assert_ne!(forged.public_key(), self.ksk.public_key());
        vec![dnskey_record(&self.name, forged)]
    }

    fn ds_record(&self, digest_type: DigestType, digest: Vec<u8>) -> Record {
        let ds = DS::new(self.ksk_tag, Algorithm::ED25519, digest_type, digest);
        Record::from_rdata(
            self.name.clone(),
            3600,
            RData::DNSSEC(DNSSECRData::DS(ds)),
        )
    }
}

/// Serves `zone`'s DNSKEY set from `addr` and registers the delegation.
pub fn host_zone(
    zone: &TestZone,
    ns: &str,
    addr: IpAddr,
    net: &mut StaticNet,
    delegations: &mut StaticDelegations,
) {
    delegations.insert_single(&zone.name, ns, addr);
    net.insert(
        &zone.name,
        RecordType::DNSKEY,
        addr,
        zone.dnskey_rrset.clone(),
    );
}

pub fn dnskey_record(name: &Name, key: DNSKEY) -> Record {
    Record::from_rdata(name.clone(), 3600, RData::DNSSEC(DNSSECRData::DNSKEY(key)))
}

fn generate_key() -> Ed25519KeyPair {
    let rng = SystemRandom::new();
    let pkcs8 = Ed25519KeyPair::generate_pkcs8(&rng).unwrap();
    Ed25519KeyPair::from_pkcs8(pkcs8.as_ref()).unwrap()
}

/// Signs `records` with `key`, producing the covering RRSIG record.
pub fn sign_rrset(
    records: &[Record],
    signing_key: &DNSKEY,
    key: &Ed25519KeyPair,
    signer_name: &Name,
    inception: u32,
    expiration: u32,
) -> Record {
    let name = records[0].name().clone();
    let ttl = records[0].ttl();
    let type_covered = records[0].record_type();
    let key_tag = signing_key.calculate_key_tag().unwrap();

    let pre_sig = SIG::new(
        type_covered,
        Algorithm::ED25519,
        name.num_labels(),
        ttl,
        expiration,
        inception,
        key_tag,
        signer_name.clone(),
        Vec::new(),
    );
    let tbs = rrset_tbs_with_sig(&name, DNSClass::IN, &pre_sig, records).unwrap();
    let signature = key.sign(tbs.as_ref()).as_ref().to_vec();
    let sig = RRSIG::new(
        type_covered,
        Algorithm::ED25519,
        name.num_labels(),
        ttl,
        expiration,
        inception,
        key_tag,
        signer_name.clone(),
        signature,
    );

    let mut record = Record::from_rdata(name, ttl, RData::DNSSEC(DNSSECRData::RRSIG(sig)));
    record.set_record_type(RecordType::RRSIG);
    record
}

/// Swaps two distinct bytes of equal parity, which preserves the
/// RFC 4034 key tag checksum while changing the key bits.
pub fn tag_preserving_mutation(public_key: &[u8]) -> Vec<u8> {
    let mut mutated = public_key.to_vec();
    for i in 0..mutated.len() {
        for j in ((i + 2)..mutated.len()).step_by(2) {
            if mutated[i] != mutated[j] {
                mutated.swap(i, j);
                return mutated;
            }
        }
    }
    panic!("public key has no two distinct bytes of equal parity");
}

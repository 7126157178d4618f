// Copyright 2024 the zonevet authors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Origin ASN and network name enrichment over Team Cymru's DNS
//! interface.
//!
//! The service answers TXT queries under `origin.asn.cymru.com` (IPv4,
//! reversed octets), `origin6.asn.cymru.com` (IPv6, reversed nibbles) and
//! `AS<n>.asn.cymru.com`. Lookups run through the same recursive resolver
//! as nameserver discovery; failures leave the enrichment blank.

use std::net::IpAddr;

use hickory_resolver::TokioAsyncResolver;
use log::debug;

/// Location, origin ASN and network name of one address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IpInfo {
    /// Two-letter country code.
    pub loc: String,
    /// Origin autonomous system number.
    pub asn: String,
    /// Registered name of the autonomous system.
    pub isp: String,
}

/// Client for the Cymru TXT interface.
#[derive(Clone)]
pub struct IpInfoClient {
    resolver: TokioAsyncResolver,
}

impl IpInfoClient {
    /// Constructs a client over an existing stub resolver.
    pub fn new(resolver: TokioAsyncResolver) -> Self {
        Self { resolver }
    }

    /// Looks up country, ASN and AS name for `addr`. Returns `None` when
    /// either TXT lookup fails or parses empty.
    pub async fn lookup(&self, addr: IpAddr) -> Option<IpInfo> {
        let origin = origin_qname(addr);
        let answer = self.first_txt(&origin).await?;
        let (asn, loc) = parse_origin_txt(&answer)?;

        let isp = match self.first_txt(&format!("AS{}.asn.cymru.com.", asn)).await {
            Some(answer) => parse_asname_txt(&answer).unwrap_or_default(),
            None => String::new(),
        };
        Some(IpInfo { loc, asn, isp })
    }

    async fn first_txt(&self, qname: &str) -> Option<String> {
        let lookup = match self.resolver.txt_lookup(qname.to_string()).await {
            Ok(lookup) => lookup,
            Err(e) => {
                debug!("TXT lookup for {} failed: {}", qname, e);
                return None;
            }
        };
        let txt = lookup.iter().next()?;
        let joined = txt
            .txt_data()
            .iter()
            .map(|part| String::from_utf8_lossy(part).into_owned())
            .collect::<Vec<_>>()
            .join("");
        Some(joined)
    }
}

/// Query name for the origin lookup of `addr`.
fn origin_qname(addr: IpAddr) -> String {
    match addr {
        IpAddr::V4(v4) => {
            let o = v4.octets();
            format!("{}.{}.{}.{}.origin.asn.cymru.com.", o[3], o[2], o[1], o[0])
        }
        IpAddr::V6(v6) => {
            let mut nibbles = Vec::with_capacity(32);
            for octet in v6.octets().iter().rev() {
                nibbles.push(format!("{:x}", octet & 0xf));
                nibbles.push(format!("{:x}", octet >> 4));
            }
            format!("{}.origin6.asn.cymru.com.", nibbles.join("."))
        }
    }
}

/// Parses `"23028 | 216.90.108.0/24 | US | arin | 1998-09-25"` into the
/// first origin ASN and the country code.
fn parse_origin_txt(answer: &str) -> Option<(String, String)> {
    let mut fields = answer.split('|').map(str::trim);
    let asn = fields.next()?.split_whitespace().next()?.to_string();
    let _prefix = fields.next()?;
    let loc = fields.next()?.to_string();
    if asn.is_empty() {
        return None;
    }
    Some((asn, loc))
}

/// Parses `"23028 | US | arin | 2002-01-04 | TEAM-CYMRU - ..."` into the
/// registered AS name.
fn parse_asname_txt(answer: &str) -> Option<String> {
    answer.split('|').map(str::trim).nth(4).map(str::to_string)
}

// Copyright 2024 the zonevet authors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Discovery of a zone's authoritative nameservers through a recursive
//! resolver.
//!
//! The resolver is trusted to locate the delegation point; all
//! validation-relevant queries are made directly against the discovered
//! authoritative servers afterwards.

use std::net::IpAddr;

use async_trait::async_trait;
use hickory_proto::rr::Name;
use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use log::debug;

use crate::error::{ValidateError, ValidateResult};

/// An authoritative nameserver and the addresses it resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NsInfo {
    /// Fully qualified name of the nameserver.
    pub name: Name,
    /// Addresses of the nameserver, IPv4 before IPv6, each group in
    /// server-returned order. May be empty when the name does not resolve.
    pub addrs: Vec<IpAddr>,
}

/// Resolution of a domain to its authoritative nameservers.
#[async_trait]
pub trait Discovery: Send + Sync {
    /// Returns the authoritative nameservers of `domain` with their
    /// addresses, or [`ValidateError::NoNameservers`] when none are found.
    async fn find_ns(&self, domain: &Name) -> ValidateResult<Vec<NsInfo>>;
}

/// Builds a stub resolver pointed at `addr` on UDP and TCP port 53.
pub fn recursive_resolver(addr: IpAddr) -> TokioAsyncResolver {
    let config = ResolverConfig::from_parts(
        None,
        Vec::new(),
        NameServerConfigGroup::from_ips_clear(&[addr], 53, true),
    );
    TokioAsyncResolver::tokio(config, ResolverOpts::default())
}

/// [`Discovery`] through a configured recursive resolver.
#[derive(Clone)]
pub struct ResolverDiscovery {
    resolver: TokioAsyncResolver,
}

impl ResolverDiscovery {
    /// Constructs a discovery client over an existing stub resolver, see
    /// [`recursive_resolver`].
    pub fn new(resolver: TokioAsyncResolver) -> Self {
        Self { resolver }
    }

    /// A and AAAA addresses of one nameserver name, v4 first. Lookup
    /// failures shrink the list rather than failing the discovery.
    async fn lookup_addrs(&self, ns: &Name) -> Vec<IpAddr> {
        let mut addrs = Vec::new();
        match self.resolver.ipv4_lookup(ns.clone()).await {
            Ok(lookup) => addrs.extend(lookup.iter().map(|a| IpAddr::V4(a.0))),
            Err(e) => debug!("A lookup for {} failed: {}", ns, e),
        }
        match self.resolver.ipv6_lookup(ns.clone()).await {
            Ok(lookup) => addrs.extend(lookup.iter().map(|aaaa| IpAddr::V6(aaaa.0))),
            Err(e) => debug!("AAAA lookup for {} failed: {}", ns, e),
        }
        addrs
    }
}

#[async_trait]
impl Discovery for ResolverDiscovery {
    async fn find_ns(&self, domain: &Name) -> ValidateResult<Vec<NsInfo>> {
        let lookup = match self.resolver.ns_lookup(domain.clone()).await {
            Ok(lookup) => lookup,
            Err(e) => {
                debug!("NS lookup for {} failed: {}", domain, e);
                return Err(ValidateError::NoNameservers {
                    domain: domain.clone(),
                });
            }
        };

        let mut nsinfos = Vec::new();
        for ns in lookup.iter() {
            let name = ns.0.clone();
            let addrs = self.lookup_addrs(&name).await;
            nsinfos.push(NsInfo { name, addrs });
        }
        if nsinfos.is_empty() {
            return Err(ValidateError::NoNameservers {
                domain: domain.clone(),
            });
        }
        Ok(nsinfos)
    }
}

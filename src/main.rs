// Copyright 2024 the zonevet authors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The zonevet command line program.

// BINARY WARNINGS
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

use std::net::IpAddr;
use std::time::Duration;

use clap::Parser;
use console::style;
use hickory_proto::rr::Name;

use zonevet::ipinfo::IpInfoClient;
use zonevet::report;
use zonevet::{
    recursive_resolver, Discovery, ResolverDiscovery, UdpTransport, Validator, DEFAULT_RESOLVER,
};

/// Delegation and DNSSEC chain-of-trust diagnostics for one DNS zone.
///
/// Prints one row per authoritative nameserver address with the zone
/// serial, round-trip time, origin AS of the address and the observed
/// signature state, then reports the result of walking the chain of
/// trust up to the root.
#[derive(Debug, Parser)]
#[clap(name = "zonevet", version)]
struct Opts {
    /// Domain to check, treated as fully qualified
    domain: String,

    /// Recursive resolver used to discover delegations
    #[clap(short = 'r', long, default_value = DEFAULT_RESOLVER)]
    resolver: IpAddr,

    /// Timeout of one UDP exchange, in seconds
    #[clap(long, default_value_t = 5)]
    timeout: u64,

    /// Enable debug and all logging
    #[clap(long)]
    debug: bool,

    /// Enable info + warning + error logging
    #[clap(long)]
    info: bool,

    /// Enable warning + error logging
    #[clap(long)]
    warn: bool,

    /// Enable error logging
    #[clap(long)]
    error: bool,
}

/// Run the zonevet program
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opts: Opts = Opts::parse();

    // enable logging early
    let log_level = if opts.debug {
        log::LevelFilter::Debug
    } else if opts.info {
        log::LevelFilter::Info
    } else if opts.warn {
        log::LevelFilter::Warn
    } else if opts.error {
        log::LevelFilter::Error
    } else {
        log::LevelFilter::Off
    };

    env_logger::builder()
        .filter_module("zonevet", log_level)
        .filter_module("hickory_proto", log_level)
        .filter_module("hickory_resolver", log_level)
        .filter_module("hickory_client", log_level)
        .write_style(env_logger::WriteStyle::Auto)
        .format_indent(Some(4))
        .init();

    let mut domain = Name::from_utf8(&opts.domain)?;
    domain.set_fqdn(true);

    let resolver = recursive_resolver(opts.resolver);
    let discovery = ResolverDiscovery::new(resolver.clone());
    let transport = UdpTransport::new(Duration::from_secs(opts.timeout));

    let nsinfos = match discovery.find_ns(&domain).await {
        Ok(nsinfos) => nsinfos,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    println!(
        "Checking {domain} via {count} nameservers",
        domain = style(&domain).yellow(),
        count = style(nsinfos.len()).yellow(),
    );

    let validator = Validator::new(transport, discovery);
    let chain_result = validator.validate_chain(&domain).await;

    let ipinfo = IpInfoClient::new(resolver);
    let rows = report::build_report(
        &transport,
        &ipinfo,
        &nsinfos,
        &domain,
        chain_result.is_ok(),
    )
    .await;
    report::render(&mut std::io::stdout(), &rows)?;

    if let Err(e) = chain_result {
        println!("{}: {}", style("DNSSEC").red(), e);
    }
    Ok(())
}

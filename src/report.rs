// Copyright 2024 the zonevet authors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! The tabular per-nameserver report.
//!
//! Each (nameserver, address) pair gets one row: geography and origin AS
//! of the address, SOA serial and round-trip time as seen from that
//! server, and the zone's signature state with its validity window.

use std::io::{self, Write};
use std::net::IpAddr;

use chrono::{TimeZone, Utc};
use console::style;
use hickory_proto::rr::{Name, RData, RecordType};
use log::debug;

use crate::discovery::NsInfo;
use crate::ipinfo::IpInfoClient;
use crate::transport::{query_rrset, Transport};
use crate::verify::{validate_rrsig, KeyInfo};

/// Signature state of the zone as observed from one server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DnssecStatus {
    /// The NS set verified and the whole chain of trust holds.
    Valid,
    /// Signatures are present but did not verify, or the chain is broken.
    Invalid,
    /// The zone serves no DNSKEY records.
    Disabled,
    /// The server could not be asked.
    Error,
}

impl DnssecStatus {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Invalid => "invalid",
            Self::Disabled => "disabled",
            Self::Error => "error",
        }
    }
}

/// One row of the report.
#[derive(Debug, Clone)]
pub struct ReportRow {
    /// Nameserver name; blank on continuation rows of the same server.
    pub ns: String,
    /// Address the row describes.
    pub addr: IpAddr,
    /// Country code of the address, when known.
    pub loc: String,
    /// Origin ASN of the address, when known.
    pub asn: String,
    /// Registered AS name, when known.
    pub isp: String,
    /// Round-trip time of the SOA probe.
    pub rtt: String,
    /// Zone serial as served by this address.
    pub serial: String,
    /// Signature state observed from this address.
    pub status: DnssecStatus,
    /// Start of the signature validity window, when one was reported.
    pub valid_from: String,
    /// End of the signature validity window, when one was reported.
    pub valid_until: String,
}

/// Collects one row per (nameserver, address) pair, serially in server
/// order so output stays deterministic.
pub async fn build_report<T: Transport>(
    transport: &T,
    ipinfo: &IpInfoClient,
    nsinfos: &[NsInfo],
    domain: &Name,
    chain_valid: bool,
) -> Vec<ReportRow> {
    let mut rows = Vec::new();
    for nsinfo in nsinfos {
        let mut first = true;
        for addr in &nsinfo.addrs {
            let ns = if first {
                nsinfo.name.to_string()
            } else {
                String::new()
            };
            first = false;
            rows.push(build_row(transport, ipinfo, domain, ns, *addr, chain_valid).await);
        }
    }
    rows
}

async fn build_row<T: Transport>(
    transport: &T,
    ipinfo: &IpInfoClient,
    domain: &Name,
    ns: String,
    addr: IpAddr,
    chain_valid: bool,
) -> ReportRow {
    let info = ipinfo.lookup(addr).await.unwrap_or_default();

    let (rtt, serial) = match query_rrset(transport, domain, RecordType::SOA, addr, false).await {
        Ok(answer) => {
            let serial = match answer.records[0].data() {
                Some(RData::SOA(soa)) => soa.serial().to_string(),
                _ => "error".to_string(),
            };
            (format!("{}ms", answer.rtt.as_millis()), serial)
        }
        Err(e) => {
            debug!("SOA probe of {} failed: {}", addr, e);
            ("error".to_string(), "error".to_string())
        }
    };

    let keys = match query_rrset(transport, domain, RecordType::DNSKEY, addr, true).await {
        Ok(answer) => answer.records,
        Err(_) => Vec::new(),
    };
    let (status, keyinfo) = match transport.query(domain, RecordType::NS, addr, true).await {
        Ok(answer) => {
            let (valid, keyinfo) = validate_rrsig(&keys, &answer.records);
            let status = if valid && chain_valid {
                DnssecStatus::Valid
            } else if keys.is_empty() && keyinfo.is_empty() {
                DnssecStatus::Disabled
            } else {
                DnssecStatus::Invalid
            };
            (status, keyinfo)
        }
        Err(e) => {
            debug!("NS probe of {} failed: {}", addr, e);
            (DnssecStatus::Error, KeyInfo::default())
        }
    };

    let (valid_from, valid_until) = if keyinfo.is_empty() {
        (String::new(), String::new())
    } else {
        (format_ts(keyinfo.start), format_ts(keyinfo.end))
    };

    ReportRow {
        ns,
        addr,
        loc: info.loc,
        asn: info.asn,
        isp: truncate(&info.isp, 40),
        rtt,
        serial,
        status,
        valid_from,
        valid_until,
    }
}

/// Renders the rows as an aligned table.
pub fn render(out: &mut dyn Write, rows: &[ReportRow]) -> io::Result<()> {
    const HEADER: [&str; 10] = [
        "NS",
        "IP",
        "LOC",
        "ASN",
        "ISP",
        "rtt",
        "Serial",
        "DNSSEC",
        "ValidFrom",
        "ValidUntil",
    ];

    let cells: Vec<[String; 10]> = rows
        .iter()
        .map(|row| {
            [
                row.ns.clone(),
                row.addr.to_string(),
                row.loc.clone(),
                row.asn.clone(),
                row.isp.clone(),
                row.rtt.clone(),
                row.serial.clone(),
                row.status.as_str().to_string(),
                row.valid_from.clone(),
                row.valid_until.clone(),
            ]
        })
        .collect();

    let mut widths: Vec<usize> = HEADER.iter().map(|h| h.len()).collect();
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.len());
        }
    }

    write_row(out, &widths, &HEADER.map(String::from), None)?;
    for (row, cells) in rows.iter().zip(cells.iter()) {
        write_row(out, &widths, cells, Some(row.status))?;
    }
    Ok(())
}

fn write_row(
    out: &mut dyn Write,
    widths: &[usize],
    cells: &[String; 10],
    status: Option<DnssecStatus>,
) -> io::Result<()> {
    const DNSSEC_COL: usize = 7;

    let mut line = Vec::new();
    for (i, (cell, width)) in cells.iter().zip(widths.iter()).enumerate() {
        let padded = format!("{:<width$}", cell, width = width);
        let painted = match (i, status) {
            (DNSSEC_COL, Some(DnssecStatus::Valid)) => style(padded).green().to_string(),
            (DNSSEC_COL, Some(DnssecStatus::Disabled)) => style(padded).yellow().to_string(),
            (DNSSEC_COL, Some(DnssecStatus::Invalid) | Some(DnssecStatus::Error)) => {
                style(padded).red().to_string()
            }
            _ => padded,
        };
        line.push(painted);
    }
    writeln!(out, "{}", line.join(" | "))
}

/// Unix seconds as a UTC timestamp, blank when out of range.
fn format_ts(ts: i64) -> String {
    match Utc.timestamp_opt(ts, 0).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        None => String::new(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_aligns_columns() {
        let rows = vec![ReportRow {
            ns: "ns1.example.com.".to_string(),
            addr: "192.0.2.53".parse().unwrap(),
            loc: "US".to_string(),
            asn: "64496".to_string(),
            isp: "EXAMPLE-AS".to_string(),
            rtt: "12ms".to_string(),
            serial: "2024010101".to_string(),
            status: DnssecStatus::Disabled,
            valid_from: String::new(),
            valid_until: String::new(),
        }];

        let mut buf = Vec::new();
        render(&mut buf, &rows).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        let header = lines.next().unwrap();
        let row = lines.next().unwrap();
        assert!(header.starts_with("NS "));
        assert_eq!(
            header.matches(" | ").count(),
            row.matches(" | ").count(),
        );
        assert!(row.contains("2024010101"));
    }

    #[test]
    fn test_format_ts() {
        assert_eq!(format_ts(0), "1970-01-01 00:00");
        assert!(!format_ts(1_700_000_000).is_empty());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("abcdef", 4), "abcd");
        assert_eq!(truncate("ab", 4), "ab");
    }
}

// Copyright 2024 the zonevet authors
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Single-question UDP exchanges against a named server.

use std::net::{IpAddr, SocketAddr};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use hickory_client::client::AsyncClient;
use hickory_proto::op::{Edns, Message, MessageType, OpCode, Query};
use hickory_proto::rr::{DNSClass, Name, Record, RecordType};
use hickory_proto::udp::UdpClientStream;
use hickory_proto::xfer::{DnsRequest, DnsRequestOptions, FirstAnswer};
use hickory_proto::DnsHandle;
use log::debug;
use tokio::net::UdpSocket;

use crate::error::{ValidateError, ValidateResult};

/// EDNS0 payload size advertised on DNSSEC queries.
const EDNS_PAYLOAD: u16 = 4096;

/// Default timeout for one UDP exchange.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// The answer section of one reply, along with the round-trip time of the
/// exchange that produced it.
#[derive(Debug, Clone)]
pub struct Answer {
    /// Records of the answer section, in server order.
    pub records: Vec<Record>,
    /// Round-trip time of the exchange.
    pub rtt: Duration,
}

/// A single-question DNS exchange addressed to one server.
///
/// The validator is generic over this trait; tests substitute an in-memory
/// implementation serving prepared zones.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends one question for `name` and `query_type` to `server` on UDP
    /// port 53 and returns the answer section of the reply.
    ///
    /// When `dnssec` is set, the query clears `CD` and advertises EDNS0
    /// with the DNSSEC-OK bit and a 4096 byte payload so the server
    /// includes signatures. When unset, `CD` is set and EDNS0 is omitted.
    async fn query(
        &self,
        name: &Name,
        query_type: RecordType,
        server: IpAddr,
        dnssec: bool,
    ) -> ValidateResult<Answer>;
}

/// Plain UDP transport with a fresh client per exchange.
///
/// Truncated replies are not retried over TCP.
#[derive(Debug, Clone, Copy)]
pub struct UdpTransport {
    timeout: Duration,
}

impl UdpTransport {
    /// Constructs a transport with the given per-exchange timeout.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for UdpTransport {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn query(
        &self,
        name: &Name,
        query_type: RecordType,
        server: IpAddr,
        dnssec: bool,
    ) -> ValidateResult<Answer> {
        let message = prep_message(name, query_type, dnssec);

        let stream =
            UdpClientStream::<UdpSocket>::with_timeout(SocketAddr::new(server, 53), self.timeout);
        let (client, bg) = AsyncClient::connect(stream)
            .await
            .map_err(|source| ValidateError::Transport {
                domain: name.clone(),
                server,
                source,
            })?;
        let bg = tokio::spawn(bg);

        let start = Instant::now();
        let response = client
            .send(DnsRequest::new(message, DnsRequestOptions::default()))
            .first_answer()
            .await;
        let rtt = start.elapsed();
        drop(client);
        bg.abort();

        let response = response.map_err(|source| ValidateError::Transport {
            domain: name.clone(),
            server,
            source,
        })?;
        debug!(
            "{} {} from {} answered with {} records in {:?}",
            name,
            query_type,
            server,
            response.answer_count(),
            rtt
        );
        Ok(Answer {
            records: response.answers().to_vec(),
            rtt,
        })
    }
}

/// Builds the query message. The exchange layer below assigns a fresh id
/// on send.
fn prep_message(name: &Name, query_type: RecordType, dnssec: bool) -> Message {
    let mut message = Message::new();
    message
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true)
        .set_checking_disabled(!dnssec);

    let mut query = Query::query(name.clone(), query_type);
    query.set_query_class(DNSClass::IN);
    message.add_query(query);

    if dnssec {
        let edns = message.extensions_mut().get_or_insert_with(Edns::new);
        edns.set_max_payload(EDNS_PAYLOAD);
        edns.set_dnssec_ok(true);
    }
    message
}

/// Wraps [`Transport::query`] and keeps only records of the requested
/// type, failing with [`ValidateError::NoAnswer`] when none remain.
pub async fn query_rrset<T: Transport + ?Sized>(
    transport: &T,
    name: &Name,
    query_type: RecordType,
    server: IpAddr,
    dnssec: bool,
) -> ValidateResult<Answer> {
    let mut answer = transport.query(name, query_type, server, dnssec).await?;
    answer.records.retain(|rr| rr.record_type() == query_type);
    if answer.records.is_empty() {
        return Err(ValidateError::NoAnswer {
            domain: name.clone(),
            query_type,
            server,
        });
    }
    Ok(answer)
}

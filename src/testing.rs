//! Mock upstream resolver for tests.

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;

use crate::dns::{CLASS_IN, Message, Name, Question, TYPE_A};
use crate::transport::MAX_DNS_PACKET_SIZE;

/// How the mock answers one name. Names without a rule get no reply.
#[derive(Clone)]
pub struct Rule {
    pub name: &'static str,
    /// `(type, rdata)` per answer record, written exactly as given.
    pub answers: Vec<(u16, Vec<u8>)>,
    pub delay: Duration,
}

/// Answer `name` with one `IN A` record per address.
pub fn rule(name: &'static str, addrs: &[Ipv4Addr], delay_ms: u64) -> Rule {
    Rule {
        name,
        answers: addrs
            .iter()
            .map(|ip| (TYPE_A, ip.octets().to_vec()))
            .collect(),
        delay: Duration::from_millis(delay_ms),
    }
}

/// Answer `name` with a single record of any type. Pointers in `rdata` are
/// relative to the mock's reply, whose question name sits at offset 12.
pub fn raw_rule(name: &'static str, rtype: u16, rdata: &[u8], delay_ms: u64) -> Rule {
    Rule {
        name,
        answers: vec![(rtype, rdata.to_vec())],
        delay: Duration::from_millis(delay_ms),
    }
}

pub struct MockUpstream {
    pub addr: SocketAddr,
    /// Raw queries as they arrived.
    pub queries: mpsc::UnboundedReceiver<Vec<u8>>,
}

/// Bind a mock upstream on loopback. Each query is answered from its own
/// task so a slow rule never delays a fast one.
pub async fn spawn_upstream(rules: Vec<Rule>) -> MockUpstream {
    let socket = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
    let addr = socket.local_addr().unwrap();
    let rules: Arc<HashMap<Name, Rule>> = Arc::new(
        rules
            .into_iter()
            .map(|r| (r.name.parse().unwrap(), r))
            .collect(),
    );
    let (tx, queries) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut buf = [0u8; MAX_DNS_PACKET_SIZE];
        loop {
            let Ok((len, src)) = socket.recv_from(&mut buf).await else {
                return;
            };
            let _ = tx.send(buf[..len].to_vec());

            let Ok(query) = Message::parse_query(&buf[..len]) else {
                continue;
            };
            let Some(rule) = query.questions.first().and_then(|q| rules.get(&q.name)) else {
                continue;
            };

            let reply = build_dns_response(query.header.id, &query.questions[0], &rule.answers);
            let delay = rule.delay;
            let socket = socket.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = socket.send_to(&reply, src).await;
            });
        }
    });

    MockUpstream { addr, queries }
}

/// Raw query bytes with a chosen ID and flags and one `IN A` question per name.
pub fn build_dns_query(id: u16, flags: u16, domains: &[&str]) -> Vec<u8> {
    let mut query = Vec::new();
    query.extend_from_slice(&id.to_be_bytes());
    query.extend_from_slice(&flags.to_be_bytes());
    query.extend_from_slice(&(domains.len() as u16).to_be_bytes());
    query.extend_from_slice(&[0x00, 0x00]); // Answer RRs
    query.extend_from_slice(&[0x00, 0x00]); // Authority RRs
    query.extend_from_slice(&[0x00, 0x00]); // Additional RRs
    for domain in domains {
        let name: Name = domain.parse().unwrap();
        query.extend_from_slice(&name.to_wire());
        query.extend_from_slice(&[0x00, 0x01]); // Type: A
        query.extend_from_slice(&[0x00, 0x01]); // Class: IN
    }
    query
}

/// An upstream-style reply: the question, then each answer named by a
/// `C0 0C` pointer back to it, TTL 60.
pub fn build_dns_response(id: u16, question: &Question, answers: &[(u16, Vec<u8>)]) -> Vec<u8> {
    let mut response = Vec::with_capacity(MAX_DNS_PACKET_SIZE);
    response.extend_from_slice(&id.to_be_bytes());
    response.extend_from_slice(&[0x81, 0x80]); // Flags: QR RD RA
    response.extend_from_slice(&[0x00, 0x01]); // Questions
    response.extend_from_slice(&(answers.len() as u16).to_be_bytes());
    response.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
    question.encode(&mut response);
    for (rtype, rdata) in answers {
        response.extend_from_slice(&[0xc0, 0x0c]); // Name pointer
        response.extend_from_slice(&rtype.to_be_bytes());
        response.extend_from_slice(&CLASS_IN.to_be_bytes());
        response.extend_from_slice(&[0x00, 0x00, 0x00, 0x3c]); // TTL: 60
        response.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
        response.extend_from_slice(rdata);
    }
    response
}

//! DNS query resolution logic.
//!
//! Handles the core query processing pipeline:
//! 1. Decode the inbound datagram (malformed ones are dropped)
//! 2. Answer non-standard opcodes with NotImplemented
//! 3. Forward every question upstream and merge the answers in question order
//!
//! Transports handle the actual I/O, resolver handles decisions.

use std::net::SocketAddr;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use crate::dns::{
    Flags, Header, Message, OPCODE_QUERY, RCODE_NO_ERROR, RCODE_NOT_IMPLEMENTED, ResourceRecord,
};
use crate::error::Result;
use crate::forwarder::Forwarder;
use crate::stats::{Stats, StatsSnapshot};

/// Default number of questions from one datagram forwarded at once.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Resolver turns inbound query datagrams into response datagrams.
///
/// Holds no per-request state: every call to [`Resolver::handle_query`]
/// decodes its own message and owns the sockets its forwards use.
pub struct Resolver {
    forwarder: Forwarder,
    concurrency: usize,
    stats: Stats,
}

impl Resolver {
    /// Create a resolver forwarding at most `concurrency` questions of one
    /// datagram at a time.
    pub fn new(forwarder: Forwarder, concurrency: usize) -> Self {
        Self {
            forwarder,
            concurrency: concurrency.max(1),
            stats: Stats::new(),
        }
    }

    /// Process one raw query and return the raw response.
    ///
    /// An error means the datagram could not be decoded and must be dropped
    /// without a reply. Upstream failures never surface here; the affected
    /// questions simply contribute no answers.
    pub async fn handle_query(&self, query: &[u8]) -> Result<Vec<u8>> {
        let start_time = Instant::now();

        let request = match Message::parse_query(query) {
            Ok(request) => request,
            Err(e) => {
                self.stats.record_dropped();
                return Err(e);
            }
        };
        let id = request.header.id;

        if request.header.flags.opcode() != OPCODE_QUERY {
            let response = assemble(&request, Vec::new());
            let elapsed_ms = start_time.elapsed().as_secs_f64() * 1000.0;
            self.stats.record_not_implemented(elapsed_ms);
            debug!(
                id,
                opcode = request.header.flags.opcode(),
                "opcode not implemented"
            );
            return Ok(response.to_bytes());
        }

        let mut answers = Vec::with_capacity(request.questions.len());
        let mut failures = 0;
        for (question, result) in request.questions.iter().zip(self.forward_all(&request).await) {
            match result {
                Ok(records) => answers.push(records),
                Err(e) => {
                    warn!(id, name = %question.name, error = %e, "forward failed");
                    failures += 1;
                    answers.push(Vec::new());
                }
            }
        }

        let response = assemble(&request, answers);
        let elapsed_ms = start_time.elapsed().as_secs_f64() * 1000.0;
        self.stats
            .record_answered(response.answers.len(), failures, elapsed_ms);
        debug!(
            id,
            questions = response.questions.len(),
            answers = response.answers.len(),
            elapsed_ms,
            "query answered"
        );

        Ok(response.to_bytes())
    }

    /// Forward every question, at most `concurrency` at a time. Results come
    /// back in question order whatever order the upstream replies in.
    async fn forward_all(&self, request: &Message) -> Vec<Result<Vec<ResourceRecord>>> {
        if self.forwarder.upstream().is_none() {
            return request.questions.iter().map(|_| Ok(Vec::new())).collect();
        }

        let id = request.header.id;
        stream::iter(&request.questions)
            .map(|question| self.forwarder.forward(question, id))
            .buffered(self.concurrency)
            .collect()
            .await
    }

    pub fn upstream(&self) -> Option<SocketAddr> {
        self.forwarder.upstream()
    }

    pub fn stats_snapshot_and_reset(&self) -> StatsSnapshot {
        self.stats.snapshot_and_reset()
    }
}

/// Build the response to `request`.
///
/// `answers` holds one record list per question, in question order. The
/// response echoes the ID, opcode and RD bit, sets QR, and reports
/// NotImplemented for any opcode other than a standard query.
pub fn assemble(request: &Message, answers: Vec<Vec<ResourceRecord>>) -> Message {
    let flags = request.header.flags;
    let opcode = flags.opcode();
    let rcode = if opcode == OPCODE_QUERY {
        RCODE_NO_ERROR
    } else {
        RCODE_NOT_IMPLEMENTED
    };

    let questions = request.questions.clone();
    let answers: Vec<ResourceRecord> = answers.into_iter().flatten().collect();

    Message {
        header: Header {
            qdcount: questions.len() as u16,
            ancount: answers.len() as u16,
            ..Header::new(request.header.id, Flags::response(opcode, flags.rd(), rcode))
        },
        questions,
        answers,
    }
}

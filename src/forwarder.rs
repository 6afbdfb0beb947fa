//! Forwarding of single questions to the upstream resolver.
//!
//! Each forward binds its own ephemeral socket, connects it to the upstream,
//! sends a one-question query and waits for a matching reply until a fixed
//! deadline. The socket is dropped when the forward finishes, so abandoned
//! or timed-out forwards never leak replies into later requests.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::{Instant, timeout_at};
use tracing::debug;

use crate::dns::{Flags, Header, Message, Question, ResourceRecord};
use crate::error::{Error, Result};
use crate::transport::MAX_DNS_PACKET_SIZE;

/// Default bound on a single upstream round trip.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

/// Which transaction ID an upstream query carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum IdPolicy {
    /// Send the client's own ID upstream.
    #[default]
    Reuse,
    /// Draw a fresh random ID for every forward.
    Random,
}

#[derive(Debug, Clone)]
pub struct ForwarderConfig {
    /// Upstream resolver. Without one every forward fails.
    pub upstream: Option<SocketAddr>,
    pub timeout: Duration,
    pub id_policy: IdPolicy,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            upstream: None,
            timeout: DEFAULT_TIMEOUT,
            id_policy: IdPolicy::default(),
        }
    }
}

pub struct Forwarder {
    config: ForwarderConfig,
}

impl Forwarder {
    pub fn new(config: ForwarderConfig) -> Self {
        Self { config }
    }

    pub fn upstream(&self) -> Option<SocketAddr> {
        self.config.upstream
    }

    /// Ask the upstream resolver `question` and return its answer records.
    ///
    /// Datagrams whose ID does not match the one sent, or which are not
    /// responses, are skipped while the deadline lasts.
    pub async fn forward(&self, question: &Question, id: u16) -> Result<Vec<ResourceRecord>> {
        let upstream = self
            .config
            .upstream
            .ok_or_else(|| Error::UpstreamUnavailable("no upstream configured".to_string()))?;

        let query_id = match self.config.id_policy {
            IdPolicy::Reuse => id,
            IdPolicy::Random => rand::random(),
        };
        let query = Message {
            header: Header::new(query_id, Flags::query()),
            questions: vec![question.clone()],
            answers: Vec::new(),
        }
        .to_bytes();

        let bind_addr: SocketAddr = if upstream.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(|e| unavailable(upstream, "bind", e))?;
        socket
            .connect(upstream)
            .await
            .map_err(|e| unavailable(upstream, "connect", e))?;

        let deadline = Instant::now() + self.config.timeout;
        let timed_out = || {
            Error::UpstreamUnavailable(format!(
                "no reply from {} within {:?}",
                upstream, self.config.timeout
            ))
        };

        timeout_at(deadline, socket.send(&query))
            .await
            .map_err(|_| timed_out())?
            .map_err(|e| unavailable(upstream, "send", e))?;

        let mut buf = [0u8; MAX_DNS_PACKET_SIZE];
        loop {
            let len = timeout_at(deadline, socket.recv(&mut buf))
                .await
                .map_err(|_| timed_out())?
                .map_err(|e| unavailable(upstream, "recv", e))?;
            let reply = &buf[..len];

            match Header::parse(reply) {
                Ok(header) if header.id == query_id && header.flags.qr() => {}
                _ => {
                    debug!(%upstream, len, "discarding unmatched upstream datagram");
                    continue;
                }
            }

            let message = Message::parse(reply).map_err(|e| unavailable(upstream, "decode", e))?;
            debug!(
                %upstream,
                name = %question.name,
                rcode = message.header.flags.rcode(),
                answers = message.answers.len(),
                "upstream reply"
            );
            return Ok(message.answers);
        }
    }
}

fn unavailable(upstream: SocketAddr, step: &str, err: impl std::fmt::Display) -> Error {
    Error::UpstreamUnavailable(format!("{} {} failed: {}", upstream, step, err))
}

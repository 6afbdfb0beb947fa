//! UDP transport for DNS queries.
//!
//! A single loop reads the listening socket. Every datagram is then handled
//! in its own local task, so a slow upstream never holds up other clients,
//! and the reply goes back to the datagram's source. Datagrams the resolver
//! cannot decode are dropped without a reply.

use std::io;
use std::net::SocketAddr;
use std::rc::Rc;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::resolver::Resolver;

use super::MAX_DNS_PACKET_SIZE;

/// UDP transport for the forwarder.
pub struct UdpTransport {
    socket: Rc<UdpSocket>,
}

impl UdpTransport {
    /// Bind the listening socket.
    pub async fn bind(addr: SocketAddr) -> io::Result<Self> {
        let socket = Rc::new(UdpSocket::bind(addr).await?);

        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Start the UDP transport on the current `LocalSet`.
    pub fn start(self, resolver: Rc<Resolver>) -> JoinHandle<io::Result<()>> {
        tokio::task::spawn_local(self.serve(resolver))
    }

    /// Receive loop. Returns only when the socket fails irrecoverably.
    ///
    /// Must run inside a `LocalSet`; per-datagram tasks are spawned locally.
    pub async fn serve(self, resolver: Rc<Resolver>) -> io::Result<()> {
        let mut buf = [0u8; MAX_DNS_PACKET_SIZE];

        loop {
            let (len, src) = match self.socket.recv_from(&mut buf).await {
                Ok(r) => r,
                Err(e) if is_transient(&e) => {
                    warn!(error = %e, "UDP recv error");
                    continue;
                }
                Err(e) => {
                    error!(error = %e, "UDP socket failed");
                    return Err(e);
                }
            };

            tokio::task::spawn_local(handle_datagram(
                self.socket.clone(),
                resolver.clone(),
                buf[..len].to_vec(),
                src,
            ));
        }
    }
}

async fn handle_datagram(
    socket: Rc<UdpSocket>,
    resolver: Rc<Resolver>,
    query: Vec<u8>,
    src: SocketAddr,
) {
    let response = match resolver.handle_query(&query).await {
        Ok(response) => response,
        Err(e) if e.is_malformed() => {
            debug!(%src, len = query.len(), error = %e, "dropping malformed datagram");
            return;
        }
        Err(e) => {
            warn!(%src, error = %e, "dropping datagram");
            return;
        }
    };

    if let Err(e) = socket.send_to(&response, src).await {
        warn!(%src, error = %e, "UDP response error");
    }
}

/// Errors a datagram socket reports for a single packet (ICMP feedback,
/// signals) rather than for the socket itself.
fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
    )
}

//! Forwarder orchestration.
//!
//! Binds the transport and runs the server.

use std::io;
use std::net::SocketAddr;
use std::rc::Rc;
use std::time::Duration;

use tracing::{info, warn};

use crate::forwarder::{Forwarder, ForwarderConfig};
use crate::resolver::Resolver;
use crate::transport::udp::UdpTransport;

/// Configuration for the forwarder service.
pub struct ProxyConfig {
    /// Local address to bind (e.g., 0.0.0.0:2053)
    pub bind_addr: SocketAddr,
    /// Upstream resolver, timeout and ID policy
    pub forwarder: ForwarderConfig,
    /// Questions of one datagram forwarded at once
    pub concurrency: usize,
    /// Period of the stats log line; `None` disables it
    pub stats_interval: Option<Duration>,
}

/// Run the forwarder with the given configuration.
///
/// Must be called inside a `LocalSet`. Returns only if binding fails or the
/// listening socket fails irrecoverably.
pub async fn run(config: ProxyConfig) -> io::Result<()> {
    let resolver = Rc::new(Resolver::new(
        Forwarder::new(config.forwarder),
        config.concurrency,
    ));
    let udp = UdpTransport::bind(config.bind_addr).await?;

    info!(bind = %udp.local_addr()?, "DNS forwarder listening");
    match resolver.upstream() {
        Some(upstream) => info!(%upstream, "forwarding to upstream"),
        None => warn!("no upstream resolver configured, every question gets zero answers"),
    }

    if let Some(period) = config.stats_interval {
        let resolver = resolver.clone();
        tokio::task::spawn_local(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await; // Skip first immediate tick
            loop {
                interval.tick().await;
                let stats = resolver.stats_snapshot_and_reset();
                info!(
                    requests = stats.requests,
                    answered = stats.answered,
                    dropped = stats.dropped,
                    not_implemented = stats.not_implemented,
                    upstream_failures = stats.upstream_failures,
                    answers = stats.answers,
                    avg_response_ms = stats.avg_response_ms,
                    "stats"
                );
            }
        });
    }

    udp.serve(resolver).await
}

use clap::Parser;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tracing::error;
use tracing_subscriber::EnvFilter;

use fanout::forwarder::{ForwarderConfig, IdPolicy};
use fanout::proxy::{self, ProxyConfig};
use fanout::resolver::DEFAULT_CONCURRENCY;

#[derive(Parser)]
#[command(name = "fanout")]
#[command(about = "Multi-question DNS forwarder", long_about = None)]
struct Args {
    /// Local port to listen on
    #[arg(short, long, default_value = "2053")]
    port: u16,

    /// Bind address
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: IpAddr,

    /// Upstream DNS resolver (host:port); without one no question is answered
    #[arg(short, long, visible_alias = "upstream")]
    resolver: Option<String>,

    /// Upstream timeout in milliseconds
    #[arg(short, long, default_value = "500")]
    timeout_ms: u64,

    /// Transaction ID used for upstream queries
    #[arg(long, value_enum, default_value_t = IdPolicy::Reuse)]
    upstream_id: IdPolicy,

    /// Questions of one query forwarded concurrently
    #[arg(short, long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Seconds between stats log lines (0 disables)
    #[arg(long, default_value = "60")]
    stats_interval_secs: u64,

    /// Log every query (ignored when RUST_LOG is set)
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "fanout=debug" } else { "fanout=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Resolve `host:port` once at startup.
async fn resolve_upstream(addr: &str) -> io::Result<SocketAddr> {
    tokio::net::lookup_host(addr).await?.next().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("upstream {} did not resolve", addr),
        )
    })
}

async fn run(args: Args) -> io::Result<()> {
    let upstream = match args.resolver.as_deref().map(str::trim) {
        Some(addr) if !addr.is_empty() => Some(resolve_upstream(addr).await?),
        _ => None,
    };

    let config = ProxyConfig {
        bind_addr: SocketAddr::new(args.bind, args.port),
        forwarder: ForwarderConfig {
            upstream,
            timeout: Duration::from_millis(args.timeout_ms),
            id_policy: args.upstream_id,
        },
        concurrency: args.concurrency,
        stats_interval: (args.stats_interval_secs > 0)
            .then(|| Duration::from_secs(args.stats_interval_secs)),
    };

    proxy::run(config).await
}

fn main() -> io::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let local = tokio::task::LocalSet::new();
    local.block_on(&rt, run(args)).inspect_err(|e| {
        error!(error = %e, "fatal");
    })
}

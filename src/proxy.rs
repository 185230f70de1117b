//! DNS proxy orchestration.
//!
//! Binds the transport and runs the proxy until shutdown is requested.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::Result;
use crate::filter::Blocklist;
use crate::pending::{DEFAULT_CAPACITY, PendingTable};
use crate::resolver::Resolver;
use crate::stats::{Stats, StatsSnapshot};
use crate::transport::QueryLogger;
use crate::transport::udp::UdpTransport;

const STATS_INTERVAL: Duration = Duration::from_secs(60);

/// Configuration for the DNS proxy.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Local address to bind the listener on
    pub bind_addr: IpAddr,
    /// Local port to listen on
    pub listen_port: u16,
    /// Upstream DNS server
    pub upstream: SocketAddr,
    /// Name fragments to refuse
    pub blacklist: Blocklist,
    /// Slots in the pending query table
    pub table_capacity: usize,
}

impl ProxyConfig {
    /// Listen on every IPv4 interface, port 53, with a default-sized table.
    pub fn new(upstream: SocketAddr, blacklist: Blocklist) -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            listen_port: 53,
            upstream,
            blacklist,
            table_capacity: DEFAULT_CAPACITY,
        }
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.listen_port)
    }
}

/// Run the DNS proxy with the given configuration.
///
/// Returns once `shutdown` is cancelled; both sockets are closed by then.
pub async fn run(config: ProxyConfig, shutdown: CancellationToken) -> Result<()> {
    let listen_addr = config.listen_addr();
    let udp = UdpTransport::bind(listen_addr, config.upstream).await?;
    let resolver = Resolver::new(config.blacklist);

    info!(
        "DNS proxy listening on {} ({} fragments blacklisted)",
        listen_addr,
        resolver.blocked_count()
    );
    info!("Forwarding to upstream: {}", config.upstream);

    let stats = Arc::new(Stats::new());
    let reporter = tokio::spawn(report_stats(stats.clone()));

    let result = udp
        .run(
            resolver,
            PendingTable::new(config.table_capacity),
            QueryLogger,
            stats.clone(),
            shutdown,
        )
        .await;

    reporter.abort();
    log_snapshot(&stats.snapshot_and_reset());
    info!("DNS proxy stopped");

    result
}

async fn report_stats(stats: Arc<Stats>) {
    let mut interval = tokio::time::interval(STATS_INTERVAL);
    interval.tick().await; // Skip first immediate tick
    loop {
        interval.tick().await;
        log_snapshot(&stats.snapshot_and_reset());
    }
}

fn log_snapshot(snapshot: &StatsSnapshot) {
    info!(
        "[stats] queries={} forwarded={} answered={} format_errors={} not_implemented={} blacklisted={} dropped={}",
        snapshot.queries(),
        snapshot.forwarded,
        snapshot.answered,
        snapshot.format_errors,
        snapshot.not_implemented,
        snapshot.blacklisted,
        snapshot.dropped
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn config(listen_port: u16) -> ProxyConfig {
        ProxyConfig {
            bind_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
            listen_port,
            ..ProxyConfig::new("127.0.0.1:53".parse().unwrap(), Blocklist::default())
        }
    }

    #[test]
    fn new_uses_defaults() {
        let config = ProxyConfig::new("9.9.9.9:53".parse().unwrap(), Blocklist::new(["ads"]));

        assert_eq!(config.listen_addr(), "0.0.0.0:53".parse().unwrap());
        assert_eq!(config.table_capacity, DEFAULT_CAPACITY);
        assert_eq!(config.blacklist.len(), 1);
    }

    #[tokio::test]
    async fn run_returns_once_cancelled() {
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        run(config(0), shutdown).await.unwrap();
    }

    #[tokio::test]
    async fn run_fails_when_port_is_taken() {
        let taken = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();

        let err = run(config(port), CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, Error::Bind { .. }));
    }
}

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use anyhow::{Context, anyhow};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use dnsguard::filter::Blocklist;
use dnsguard::pending::DEFAULT_CAPACITY;
use dnsguard::proxy::{self, ProxyConfig};

#[derive(Parser)]
#[command(name = "dnsguard")]
#[command(about = "Filtering DNS forwarding proxy", long_about = None)]
struct Args {
    /// Upstream DNS server (IP address or hostname)
    #[arg(short, long)]
    server: String,

    /// Upstream DNS server port
    #[arg(long, default_value = "53")]
    server_port: u16,

    /// File with blacklisted name fragments, one per line
    #[arg(short, long)]
    filter: PathBuf,

    /// Local port to listen on
    #[arg(short, long, default_value = "53")]
    port: u16,

    /// Bind address
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: IpAddr,

    /// Log every query and answer passing through the proxy
    #[arg(short, long)]
    verbose: bool,
}

/// Resolve the upstream server, preferring an IPv4 address for hostnames.
async fn resolve_upstream(server: &str, port: u16) -> anyhow::Result<SocketAddr> {
    if let Ok(ip) = server.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, port));
    }

    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((server, port))
        .await
        .with_context(|| format!("failed to resolve upstream server {server}"))?
        .collect();

    addrs
        .iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| anyhow!("no address found for upstream server {server}"))
}

#[cfg(unix)]
async fn wait_for_signal() -> io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate())?;
    let mut quit = signal(SignalKind::quit())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = terminate.recv() => Ok(()),
        _ = quit.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> io::Result<()> {
    tokio::signal::ctrl_c().await
}

async fn run(args: Args) -> anyhow::Result<()> {
    let blacklist = Blocklist::load(&args.filter).context("failed to load blacklist")?;
    let upstream = resolve_upstream(&args.server, args.server_port).await?;

    let config = ProxyConfig {
        bind_addr: args.bind,
        listen_port: args.port,
        upstream,
        blacklist,
        table_capacity: DEFAULT_CAPACITY,
    };

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match wait_for_signal().await {
            Ok(()) => {
                info!("Shutdown requested");
                signal_token.cancel();
            }
            Err(e) => error!("failed to listen for shutdown signals: {e}"),
        }
    });

    proxy::run(config, shutdown)
        .await
        .context("DNS proxy failed")
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    rt.block_on(run(args))
}

//! # netmon-monitor
//!
//! The monitor daemon: resolves configuration, builds the TCP transports,
//! and drives the orchestrator on a single-threaded runtime until
//! interrupted.

#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use netmon_runtime::{Monitor, MonitorConfig, MonitorError};
use netmon_stomp::{TcpAcceptor, TcpConnector};
use tracing::info;

/// Live transport network monitor.
#[derive(Parser, Debug)]
#[command(name = "netmon-monitor", about = "Live transport network monitor")]
struct Cli {
    /// Path to a JSON configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Network layout file or URL (overrides the configuration).
    #[arg(long)]
    layout: Option<String>,

    /// Minimum log level when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    netmon_core::init_subscriber(&cli.log_level);

    let mut config = MonitorConfig::load(cli.config.as_deref())
        .context("failed to load the configuration")?;
    if let Some(layout) = cli.layout {
        config.network_layout_file = Some(layout);
    }

    let connector = TcpConnector::new(
        config.network_events_url.clone(),
        config.network_events_port,
    );
    let acceptor = TcpAcceptor::bind(&config.quiet_route_ip, config.quiet_route_port)
        .await
        .map_err(MonitorError::CouldNotStartStompServer)?;
    info!(
        address = %acceptor.local_addr().context("listener has no local address")?,
        "quiet-route listener bound"
    );

    let mut monitor = Monitor::new(config, &connector, acceptor).await?;
    let handle = monitor.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping");
            handle.stop();
        }
    });

    monitor.run().await?;
    Ok(())
}

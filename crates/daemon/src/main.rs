// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! mx node daemon (mxd)
//!
//! Serves the mutual-exclusion surface to peers and periodically prints to
//! the shared printer once every peer has granted access.

use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

use mx_daemon::lifecycle::{self, Config, NodeArgs};
use mx_daemon::logging::setup_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = NodeArgs::parse();

    // Set up logging
    let _log_guard = setup_logging(args.log_file.as_deref())?;

    let config = match Config::from_args(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return Err(e.into());
        }
    };

    info!(
        node = %config.node,
        listen = %config.listen,
        peers = config.peers.len(),
        "Starting mxd"
    );

    let node = match lifecycle::startup(config).await {
        Ok(node) => node,
        Err(e) => {
            error!("Failed to start node: {}", e);
            return Err(e.into());
        }
    };

    // Set up signal handlers
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!("Node ready, listening on {}", node.local_addr());

    // Signal ready for parent process
    println!("READY");

    let shutdown = async move {
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
            _ = sigint.recv() => info!("Received SIGINT, shutting down..."),
        }
    };

    let cycles = node.run(shutdown).await?;

    info!(cycles, "Node stopped");
    Ok(())
}

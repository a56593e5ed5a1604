// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! mx shared printer (mx-printer)
//!
//! Stateless resource service: prints whatever job it is handed after a
//! short random delay. Exclusive use is the nodes' job, not the printer's.

use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

use mx_daemon::lifecycle::LifecycleError;
use mx_daemon::logging::setup_logging;
use mx_daemon::printer::{PrinterArgs, PrinterService};
use mx_daemon::server;

/// Concurrent connection cap for the printer
const MAX_CONNECTIONS: usize = 64;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = PrinterArgs::parse();

    // Set up logging
    let _log_guard = setup_logging(args.log_file.as_deref())?;

    let addr = args.listen_addr()?;
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            let e = LifecycleError::BindFailed(addr, e);
            error!("Failed to start printer: {}", e);
            return Err(e.into());
        }
    };

    let printer = Arc::new(PrinterService::new(args.min_delay, args.max_delay));

    // Set up signal handlers
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!(
        %addr,
        min_delay = ?args.min_delay,
        max_delay = ?args.max_delay,
        "Printer ready"
    );
    println!("READY");

    tokio::select! {
        _ = server::serve(listener, Arc::clone(&printer), MAX_CONNECTIONS) => {}
        _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        _ = sigint.recv() => info!("Received SIGINT, shutting down..."),
    }

    info!(jobs = printer.jobs(), "Printer stopped");
    Ok(())
}
